use std::sync::Arc;

use crate::fitness::{difference_to_distance, pixel_difference};
use crate::render::Surface;

/// search progress at one point in time: the shared target, the canvas built so far,
/// and the distance between them. replaced wholesale on every accepted step, never mutated.
#[derive(Clone, Debug)]
pub struct State {
    pub target: Arc<Surface>,
    pub current: Surface,
    pub distance: f64,
    // sum of squared u8 deltas, kept alongside so recounts stay integer-exact
    difference: f64,
}

impl State {
    /// full O(P) scan to seed the distance
    pub fn new(target: Arc<Surface>, current: Surface) -> Self {
        profiling::scope!("State::new");
        debug_assert_eq!(
            (target.width(), target.height()),
            (current.width(), current.height())
        );
        let difference = pixel_difference(target.pixels(), current.pixels());
        Self::with_difference(target, current, difference)
    }

    /// trust an already counted difference (e.g. a bbox-restricted recount)
    pub fn with_difference(target: Arc<Surface>, current: Surface, difference: f64) -> Self {
        let distance = difference_to_distance(difference, current.pixel_count());
        Self {
            target,
            current,
            distance,
            difference,
        }
    }

    /// unnormalized difference matching `distance`
    #[inline]
    pub fn difference(&self) -> f64 {
        self.difference
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.current.pixel_count()
    }
}
