use crate::engine::{RunStats, Step};
use crate::error::EngineError;
use crate::fitness::MetricsSnapshot;

// messages from the driver to the engine thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Start,
    Pause,
    Stop,
}

// messages from the engine thread to the driver
#[derive(Clone, Debug)]
pub enum EngineUpdate {
    /// sent once per consumed step
    Step {
        index: u32,
        total: u32,
        accepted: Option<Step>,
        metrics: MetricsSnapshot,
    },
    /// budget spent or stopped; carries the final numbers
    Finished {
        stats: RunStats,
        metrics: MetricsSnapshot,
        history: Vec<Step>,
    },
    Failed(EngineError),
}
