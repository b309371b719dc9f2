/// configuration problems detected before a run starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one shape kind must be enabled")]
    NoShapeKinds,
    #[error("canvas dimensions must be non-zero (got {width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("alpha must be in (0, 1], got {0}")]
    InvalidAlpha(f32),
    #[error("candidates per step must be at least 1")]
    NoCandidates,
    #[error("invalid polygon vertex range {min}..={max} (minimum is 3)")]
    InvalidVertexRange { min: usize, max: usize },
    #[error("output scale must be positive and finite, got {0}")]
    InvalidScale(f32),
}

/// internal faults surfaced while the optimizer runs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// the incremental score claims an improvement larger than the whole remaining difference
    #[error(
        "difference change {difference_change} exceeds current difference {current_difference}"
    )]
    InvariantViolation {
        difference_change: f64,
        current_difference: f64,
    },
    #[error("surface error: {0}")]
    Surface(String),
    #[error("cannot spawn optimizer thread: {0}")]
    Spawn(String),
}

/// anything that can stop a run from starting or completing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
