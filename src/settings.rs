//! run configuration for primitrace.
//! a Config is captured by value when a run starts; callers that want different
//! settings build a new one instead of mutating it mid-run.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// geometric primitive families the optimizer may place
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// 3-point polygon
    Triangle,
    /// axis-aligned quad with edge-wise mutation
    Rectangle,
    /// center + radii
    Ellipse,
    /// n-gon with min_vertices..=max_vertices points
    Polygon,
}

/// how the working canvas is initialised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFill {
    /// average color of the target's one-pixel border ring
    Auto,
    /// explicit RGB color
    Fixed([u8; 3]),
}

impl Default for BackgroundFill {
    fn default() -> Self {
        BackgroundFill::Auto
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// canvas size used for scoring. overwritten from the (downscaled) target at start
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// longest side (pixels) the target is downscaled to before scoring. 0 = never downscale
    pub compute_size: u32,

    /// optimizer steps to consume (accepted or not)
    pub total_steps: u32,
    /// random shapes sampled per step (phase A)
    pub candidates_per_step: u32,
    /// consecutive failed mutations that end the hill-climb (phase B)
    pub mutation_patience: u32,
    /// hard ceiling on hill-climb compute calls per step. 0 = unlimited
    pub max_mutations_per_step: u32,

    /// shape opacity in (0, 1]
    pub alpha: f32,
    /// let the hill-climb perturb alpha as well
    pub mutate_alpha: bool,

    pub shape_kinds: Vec<ShapeKind>,
    /// vertex count range for ShapeKind::Polygon
    pub min_vertices: usize,
    pub max_vertices: usize,

    pub background: BackgroundFill,
    /// output render multiplier (display only, never affects scoring)
    pub scale: f32,
    pub anti_alias: bool,

    /// fixed seed for reproducible runs
    pub seed: Option<u64>,
    /// pause between steps when driven by the worker thread
    pub step_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas_width: 0,
            canvas_height: 0,
            compute_size: 256,

            total_steps: 50,
            candidates_per_step: 200,
            mutation_patience: 30,
            max_mutations_per_step: 10_000,

            alpha: 0.5,
            mutate_alpha: true,

            shape_kinds: vec![ShapeKind::Triangle],
            min_vertices: 3,
            max_vertices: 6,

            background: BackgroundFill::Auto,
            scale: 1.0,
            anti_alias: true,

            seed: None,
            step_delay_ms: 0,
        }
    }
}

impl Config {
    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    pub fn with_compute_size(mut self, size: u32) -> Self {
        self.compute_size = size;
        self
    }

    pub fn with_total_steps(mut self, n: u32) -> Self {
        self.total_steps = n;
        self
    }

    pub fn with_candidates_per_step(mut self, n: u32) -> Self {
        self.candidates_per_step = n;
        self
    }

    pub fn with_mutation_patience(mut self, n: u32) -> Self {
        self.mutation_patience = n;
        self
    }

    pub fn with_max_mutations_per_step(mut self, n: u32) -> Self {
        self.max_mutations_per_step = n;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_mutate_alpha(mut self, enabled: bool) -> Self {
        self.mutate_alpha = enabled;
        self
    }

    pub fn with_shape_kinds(mut self, kinds: &[ShapeKind]) -> Self {
        self.shape_kinds = kinds.to_vec();
        self
    }

    pub fn with_background(mut self, background: BackgroundFill) -> Self {
        self.background = background;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_anti_alias(mut self, enabled: bool) -> Self {
        self.anti_alias = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// downscale factor applied to a width x height target so its longest side fits compute_size
    pub fn compute_scale(&self, width: u32, height: u32) -> f32 {
        if self.compute_size == 0 {
            return 1.0;
        }
        let limit = self.compute_size as f32;
        (width as f32 / limit).max(height as f32 / limit).max(1.0)
    }

    /// number of pixels on the scoring canvas
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.canvas_width as usize * self.canvas_height as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shape_kinds.is_empty() {
            return Err(ConfigError::NoShapeKinds);
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if self.candidates_per_step == 0 {
            return Err(ConfigError::NoCandidates);
        }
        if self.min_vertices < 3 || self.min_vertices > self.max_vertices {
            return Err(ConfigError::InvalidVertexRange {
                min: self.min_vertices,
                max: self.max_vertices,
            });
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ConfigError::InvalidScale(self.scale));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::default().with_canvas(32, 24)
    }

    #[test]
    fn test_default_needs_canvas() {
        assert_eq!(
            Config::default().validate(),
            Err(ConfigError::InvalidDimensions { width: 0, height: 0 })
        );
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_no_shapes() {
        let cfg = valid().with_shape_kinds(&[]);
        assert_eq!(cfg.validate(), Err(ConfigError::NoShapeKinds));
    }

    #[test]
    fn test_validate_alpha_bounds() {
        assert!(valid().with_alpha(0.0).validate().is_err());
        assert!(valid().with_alpha(1.01).validate().is_err());
        assert!(valid().with_alpha(f32::NAN).validate().is_err());
        assert!(valid().with_alpha(1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_vertex_range() {
        let mut cfg = valid();
        cfg.min_vertices = 2;
        assert!(cfg.validate().is_err());
        cfg.min_vertices = 7;
        cfg.max_vertices = 5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_scale() {
        assert!(valid().with_scale(0.0).validate().is_err());
        assert!(valid().with_scale(f32::INFINITY).validate().is_err());
    }

    #[test]
    fn test_compute_scale() {
        let cfg = Config::default().with_compute_size(100);
        assert_eq!(cfg.compute_scale(50, 80), 1.0);
        assert_eq!(cfg.compute_scale(400, 200), 4.0);
        assert_eq!(cfg.with_compute_size(0).compute_scale(4000, 10), 1.0);
    }

    #[test]
    fn test_json_defaults_fill_missing_fields() {
        let cfg: Config =
            serde_json::from_str(r#"{"shape_kinds": ["ellipse", "rectangle"], "background": {"fixed": [1, 2, 3]}}"#)
                .unwrap();
        assert_eq!(cfg.shape_kinds, vec![ShapeKind::Ellipse, ShapeKind::Rectangle]);
        assert_eq!(cfg.background, BackgroundFill::Fixed([1, 2, 3]));
        assert_eq!(cfg.total_steps, Config::default().total_steps);
    }
}
