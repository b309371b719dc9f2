use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;
use std::cmp::Ordering;

use crate::error::EngineError;
use crate::settings::Config;
use crate::shape::Shape;

use super::state::State;
use super::step::Step;

/// result of one hill-climb
#[derive(Clone, Debug)]
pub struct Climb {
    pub step: Step,
    /// mutations computed (accepted or not)
    pub compute_calls: u32,
    pub improvements: u32,
}

/// Phase A: sample `candidates_per_step` random shapes and keep the lowest distance.
/// Every candidate gets its own rng seeded from `rng`, so the outcome does not depend on
/// how rayon schedules the batch. Ties go to the first candidate.
pub fn find_best_step<R: Rng>(
    state: &State,
    cfg: &Config,
    rng: &mut R,
) -> Result<Option<Step>, EngineError> {
    profiling::scope!("find_best_step");

    // generate seeds for each candidate (ensures reproducibility)
    let seeds: Vec<u64> = (0..cfg.candidates_per_step)
        .map(|_| rng.random::<u64>())
        .collect();

    let candidates: Vec<Step> = seeds
        .par_iter()
        .map(|&seed| {
            profiling::scope!("candidate");
            let mut rng = Pcg32::seed_from_u64(seed);
            Step::new(Shape::create(cfg, &mut rng), cfg.alpha).compute(state)
        })
        .collect::<Result<_, _>>()?;

    Ok(candidates.into_iter().min_by(by_distance))
}

/// distance ordering for candidate selection. a NaN distance is a scoring bug, never a tie
#[inline]
fn by_distance(a: &Step, b: &Step) -> Ordering {
    debug_assert!(!a.distance.is_nan() && !b.distance.is_nan(), "NaN candidate distance");
    a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal)
}

/// Phase B: greedy single-chain local search from `start` against the fixed global state.
/// Adopts a mutation only on strictly lower distance; stops after `mutation_patience`
/// consecutive failures or `max_mutations_per_step` compute calls, whichever comes first.
pub fn optimize_step<R: Rng>(
    state: &State,
    cfg: &Config,
    rng: &mut R,
    start: Step,
) -> Result<Climb, EngineError> {
    profiling::scope!("optimize_step");

    let cap = match cfg.max_mutations_per_step {
        0 => u32::MAX,
        n => n,
    };
    let mut best = start;
    let mut failures = 0u32;
    let mut compute_calls = 0u32;
    let mut improvements = 0u32;

    while failures < cfg.mutation_patience && compute_calls < cap {
        let candidate = best.mutate(cfg, rng).compute(state)?;
        compute_calls += 1;
        if candidate.distance < best.distance {
            best = candidate;
            improvements += 1;
            failures = 0;
        } else {
            failures += 1;
        }
    }

    log::trace!(
        "hill-climb: {compute_calls} mutations, {improvements} improvements, distance {:.6}",
        best.distance
    );
    Ok(Climb {
        step: best,
        compute_calls,
        improvements,
    })
}
