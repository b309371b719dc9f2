// Engine module organization
// state: target + current canvas + distance
// step: a scored shape placement (compute / apply / mutate)
// optimizer: phase A candidate sampling and phase B hill-climb

pub mod optimizer;
pub mod state;
pub mod step;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::sync::Arc;

use crate::analysis::border_average_color;
use crate::error::{EngineError, Error};
use crate::fitness::MetricsSnapshot;
use crate::render::Surface;
use crate::settings::{BackgroundFill, Config};

pub use optimizer::Climb;
pub use state::State;
pub use step::Step;

/// counters for one run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// steps consumed, accepted or not
    pub steps: u32,
    pub accepted: u32,
    /// Step::compute calls over both phases
    pub compute_calls: u64,
}

/// what one call to `Optimizer::advance` did
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Accepted(Step),
    /// best candidate was no better than the current state; nothing changed
    Rejected,
    /// step budget already spent
    Finished,
}

/// Drives a whole run: owns the config snapshot, the rng and the current State.
/// `advance` performs exactly one optimizer step, so a driver can pace, pause or stop
/// the run between steps without ever seeing a half-applied state.
pub struct Optimizer {
    rng: Pcg32,
    cfg: Config,
    state: State,
    background: [u8; 3],
    /// factor the target was shrunk by before scoring
    downscale: f32,
    history: Vec<Step>,
    stats: RunStats,
}

impl Optimizer {
    /// Prepare a run: shrink the target to the compute size, resolve the background fill,
    /// paint the initial canvas and score it. Configuration problems fail here, before any work.
    pub fn start(target: Surface, mut cfg: Config) -> Result<Self, Error> {
        profiling::scope!("Optimizer::start");

        cfg.canvas_width = target.width();
        cfg.canvas_height = target.height();
        cfg.validate()?;

        // auto fill reads the border of the image as given, before any resampling
        let background = match cfg.background {
            BackgroundFill::Auto => border_average_color(target.pixels()),
            BackgroundFill::Fixed(rgb) => rgb,
        };

        let downscale = cfg.compute_scale(target.width(), target.height());
        let target = target.downscaled(downscale)?;
        cfg.canvas_width = target.width();
        cfg.canvas_height = target.height();

        let current = Surface::filled(target.width(), target.height(), background, cfg.anti_alias)?;
        let state = State::new(Arc::new(target), current);

        let seed = cfg.seed.unwrap_or_else(rand::random);
        log::info!(
            "starting run: {}x{} canvas (downscaled {:.2}x), {} steps, {} candidates, background {:?}, seed {}",
            cfg.canvas_width,
            cfg.canvas_height,
            downscale,
            cfg.total_steps,
            cfg.candidates_per_step,
            background,
            seed
        );

        Ok(Self {
            rng: Pcg32::seed_from_u64(seed),
            cfg,
            state,
            background,
            downscale,
            history: Vec::new(),
            stats: RunStats::default(),
        })
    }

    /// One optimizer step: phase A sampling, phase B hill-climb, then commit only on a
    /// strictly lower distance. Either way the step counts toward `total_steps`.
    pub fn advance(&mut self) -> Result<StepOutcome, EngineError> {
        if self.is_finished() {
            return Ok(StepOutcome::Finished);
        }
        profiling::scope!("Optimizer::advance");

        let winner = optimizer::find_best_step(&self.state, &self.cfg, &mut self.rng)?;
        self.stats.compute_calls += self.cfg.candidates_per_step as u64;

        let best = match winner {
            Some(start) => {
                let climb = optimizer::optimize_step(&self.state, &self.cfg, &mut self.rng, start)?;
                self.stats.compute_calls += climb.compute_calls as u64;
                Some(climb.step)
            }
            None => None,
        };

        self.stats.steps += 1;
        let index = self.stats.steps;

        // the rasterizer rounds the blend, so the recounted distance has the final say
        let committed = best
            .filter(|step| step.distance < self.state.distance)
            .map(|step| (step.apply(&self.state), step))
            .filter(|(next, _)| next.distance < self.state.distance);

        match committed {
            Some((next, mut step)) => {
                step.distance = next.distance;
                self.state = next;
                self.stats.accepted += 1;
                log::debug!(
                    "step {index}/{}: accepted {:?} alpha {:.2} color {:?}, distance {:.6}",
                    self.cfg.total_steps,
                    step.shape.kind(),
                    step.alpha,
                    step.color,
                    step.distance
                );
                self.history.push(step.clone());
                Ok(StepOutcome::Accepted(step))
            }
            None => {
                log::debug!("step {index}/{}: no improvement", self.cfg.total_steps);
                Ok(StepOutcome::Rejected)
            }
        }
    }

    /// Advance until the budget is spent. `on_step` sees every consumed step:
    /// the accepted step, or None when it was rejected.
    pub fn run<F>(&mut self, on_step: &mut F) -> Result<RunStats, EngineError>
    where
        F: FnMut(Option<&Step>),
    {
        profiling::scope!("Optimizer::run");
        loop {
            match self.advance()? {
                StepOutcome::Accepted(step) => on_step(Some(&step)),
                StepOutcome::Rejected => on_step(None),
                StepOutcome::Finished => break,
            }
        }
        log::info!(
            "run finished: {} of {} steps accepted, {} compute calls, {:.2}% similar",
            self.stats.accepted,
            self.stats.steps,
            self.stats.compute_calls,
            self.metrics().similarity
        );
        Ok(self.stats)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.stats.steps >= self.cfg.total_steps
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    #[inline]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// accepted steps in order
    #[inline]
    pub fn history(&self) -> &[Step] {
        &self.history
    }

    #[inline]
    pub fn background(&self) -> [u8; 3] {
        self.background
    }

    /// factor the target was shrunk by for scoring (1.0 = untouched)
    #[inline]
    pub fn downscale(&self) -> f32 {
        self.downscale
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_distance(self.state.distance)
    }

    /// replay the accepted history onto the background at `cfg.scale` times the scoring canvas
    pub fn render_output(&self) -> Result<Surface, EngineError> {
        profiling::scope!("render_output");
        let scale = self.cfg.scale;
        let w = ((self.cfg.canvas_width as f32 * scale).round() as u32).max(1);
        let h = ((self.cfg.canvas_height as f32 * scale).round() as u32).max(1);
        let mut out = Surface::filled(w, h, self.background, self.cfg.anti_alias)?;
        for step in &self.history {
            out.draw_shape_scaled(&step.shape, step.color, step.alpha, scale);
        }
        Ok(out)
    }
}
