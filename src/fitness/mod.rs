// Fitness module organization
// metrics: difference <-> distance conversions and reported metrics
// difference: full-buffer squared RGB difference
// incremental: bbox-scoped scoring of a single candidate shape

pub mod difference;
pub mod incremental;
pub mod metrics;

pub use difference::{pixel_difference, squared_difference, squared_difference_rect};
pub use incremental::{color_and_difference_change, ColorFit};
pub use metrics::{difference_to_distance, distance_to_difference, MetricsSnapshot};
