//! Approximates a raster image with a sequence of flat-colored, alpha-blended primitives.
//!
//! Each optimizer step samples random shapes in parallel, hill-climbs the best one by
//! mutation, and keeps it only if it brings the canvas strictly closer to the target.
//! Candidates are scored incrementally over their bounding box rather than the whole image.

pub mod analysis;
pub mod app_types;
pub mod engine;
pub mod engine_thread;
pub mod error;
pub mod fitness;
pub mod geom;
pub mod render;
pub mod settings;
pub mod shape;

pub use engine::{Optimizer, RunStats, State, Step, StepOutcome};
pub use error::{ConfigError, EngineError, Error};
pub use fitness::MetricsSnapshot;
pub use render::{PixelView, Surface};
pub use settings::{BackgroundFill, Config, ShapeKind};
pub use shape::Shape;
