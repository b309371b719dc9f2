use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::EngineError;
use crate::fitness::{color_and_difference_change, difference_to_distance, squared_difference_rect};
use crate::geom::BoundingBox;
use crate::render::Surface;
use crate::settings::Config;
use crate::shape::Shape;

use super::state::State;

/// max alpha change applied by one mutation
pub const ALPHA_JITTER: f32 = 0.04;
pub const MIN_MUTATED_ALPHA: f32 = 0.1;

/// relative slack allowed when the incremental change undershoots zero
const INVARIANT_TOLERANCE: f64 = 1e-6;

/// a shape placement. `color` and `distance` are only meaningful after `compute`;
/// until then distance is +inf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub shape: Shape,
    pub alpha: f32,
    pub color: [u8; 3],
    pub distance: f64,
}

impl Step {
    pub fn new(shape: Shape, alpha: f32) -> Self {
        Self {
            shape,
            alpha,
            color: [0, 0, 0],
            distance: f64::INFINITY,
        }
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        self.distance.is_finite()
    }

    /// Score this placement against `state` without touching it: rasterize the shape alone,
    /// fit the best flat color over its covered pixels and derive the resulting distance from
    /// the state's difference plus the incremental change. Safe to call from any thread.
    pub fn compute(mut self, state: &State) -> Result<Step, EngineError> {
        profiling::scope!("Step::compute");
        let raster = Surface::rasterize_shape(&self.shape, self.alpha, state.current.anti_alias())?;
        let fit = color_and_difference_change(
            self.shape.bounding_box(),
            raster.pixels(),
            state.current.pixels(),
            state.target.pixels(),
            self.alpha as f64,
        );

        // nothing covered: exactly the current score, no round trip through difference
        if fit.covered == 0 {
            self.color = fit.color;
            self.distance = state.distance;
            return Ok(self);
        }

        let current_difference = state.difference();
        let mut difference = current_difference + fit.difference_change;
        if difference < 0.0 {
            if -difference > INVARIANT_TOLERANCE * current_difference.max(1.0) {
                log::error!(
                    "incremental score broke its bound: change {} against difference {} ({:?})",
                    fit.difference_change,
                    current_difference,
                    self.shape.geometry()
                );
                return Err(EngineError::InvariantViolation {
                    difference_change: fit.difference_change,
                    current_difference,
                });
            }
            difference = 0.0; // rounding only
        }

        self.color = fit.color;
        self.distance = difference_to_distance(difference, state.pixel_count());
        Ok(self)
    }

    /// Composite onto a clone of the current surface. The new state's distance is recounted
    /// from the pixels actually written, over the shape's bbox (plus a 1px AA margin), so the
    /// rasterizer's rounding never accumulates into the score.
    pub fn apply(&self, state: &State) -> State {
        profiling::scope!("Step::apply");
        debug_assert!(self.is_computed(), "apply before compute");
        let mut current = state.current.clone();
        current.draw_shape(&self.shape, self.color, self.alpha);

        let bb = self.shape.bounding_box();
        let margin = BoundingBox::new(bb.left - 1, bb.top - 1, bb.width + 2, bb.height + 2);
        let Some((x0, y0, x1, y1)) = margin.clip(current.width(), current.height()) else {
            return State::with_difference(Arc::clone(&state.target), current, state.difference());
        };
        let target = state.target.pixels();
        let before = squared_difference_rect(target, state.current.pixels(), x0, y0, x1, y1);
        let after = squared_difference_rect(target, current.pixels(), x0, y0, x1, y1);
        let difference = state.difference() - before + after;
        State::with_difference(Arc::clone(&state.target), current, difference)
    }

    /// new uncomputed step around a mutated shape (and alpha, if enabled)
    pub fn mutate<R: Rng>(&self, cfg: &Config, rng: &mut R) -> Step {
        let shape = self.shape.mutate(rng);
        let alpha = if cfg.mutate_alpha {
            (self.alpha + rng.random_range(-ALPHA_JITTER..ALPHA_JITTER)).clamp(MIN_MUTATED_ALPHA, 1.0)
        } else {
            self.alpha
        };
        Step::new(shape, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn state(target_rgb: [u8; 3], current_rgb: [u8; 3], w: u32, h: u32) -> State {
        let target = Arc::new(Surface::filled(w, h, target_rgb, false).unwrap());
        State::new(target, Surface::filled(w, h, current_rgb, false).unwrap())
    }

    #[test]
    fn test_uncomputed_step_is_infinite() {
        let step = Step::new(Shape::rectangle(0, 0, 2, 2), 0.5);
        assert!(!step.is_computed());
        assert_eq!(step.distance, f64::INFINITY);
    }

    #[test]
    fn test_compute_full_cover_reaches_target() {
        let s = state([255, 255, 255], [0, 0, 0], 10, 10);
        let step = Step::new(Shape::rectangle(0, 0, 10, 10), 1.0).compute(&s).unwrap();
        assert_eq!(step.color, [255, 255, 255]);
        assert!(step.distance < 1e-9);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let s = state([200, 40, 90], [10, 10, 10], 16, 16);
        let step = Step::new(Shape::ellipse((8, 8), 5, 3), 0.5);
        let a = step.clone().compute(&s).unwrap();
        let b = a.clone().compute(&s).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_offscreen_step_scores_like_current() {
        let s = state([255, 0, 0], [0, 0, 0], 8, 8);
        let step = Step::new(Shape::rectangle(-30, -30, -10, -10), 1.0).compute(&s).unwrap();
        assert_eq!(step.distance, s.distance);
    }

    #[test]
    fn test_apply_leaves_previous_state_untouched() {
        let s = state([255, 255, 255], [0, 0, 0], 6, 6);
        let before = s.current.pixels().data.to_vec();
        let step = Step::new(Shape::rectangle(0, 0, 3, 6), 1.0).compute(&s).unwrap();
        let next = step.apply(&s);
        assert_eq!(s.current.pixels().data, &before[..]);
        assert!(next.distance < s.distance);
        assert!(Arc::ptr_eq(&next.target, &s.target));
    }

    #[test]
    fn test_apply_distance_tracks_written_pixels() {
        // grey on grey at partial alpha: the blend lands between u8 levels and gets rounded
        let target = Arc::new(Surface::filled(10, 10, [77, 77, 77], true).unwrap());
        let mut s = State::new(target, Surface::filled(10, 10, [0, 0, 0], true).unwrap());
        for alpha in [0.37f32, 0.61, 0.23, 1.0] {
            let step = Step::new(Shape::rectangle(0, 0, 10, 10), alpha).compute(&s).unwrap();
            s = step.apply(&s);
            let full = State::new(Arc::clone(&s.target), s.current.clone());
            assert!((s.distance - full.distance).abs() < 1e-9, "{} vs {}", s.distance, full.distance);
        }
        // opaque full cover finally matches the target exactly
        assert_eq!(s.distance, 0.0);
    }

    #[test]
    fn test_mutate_alpha_stays_in_range() {
        let cfg = Config::default().with_canvas(50, 50);
        let mut rng = Pcg32::seed_from_u64(9);
        let mut step = Step::new(Shape::rectangle(5, 5, 20, 20), 0.11);
        for _ in 0..500 {
            step = step.mutate(&cfg, &mut rng);
            assert!((MIN_MUTATED_ALPHA..=1.0).contains(&step.alpha));
            assert!(!step.is_computed());
        }

        let fixed = Config::default().with_canvas(50, 50).with_mutate_alpha(false);
        let m = Step::new(Shape::rectangle(5, 5, 20, 20), 0.5).mutate(&fixed, &mut rng);
        assert_eq!(m.alpha, 0.5);
    }
}
