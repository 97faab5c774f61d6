//! Batched single-mutation refinement.
//!
//! Re-runs the scheduler with one recorded downlink assignment knocked out
//! at a sampled slice, keeping the variant only when the total strictly
//! improves. The gain is usually minor and the cost is one full scheduler
//! run per batch, so this is off unless asked for.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::solver::greedy::{self, Replay};
use crate::solver::types::{Constellation, SolverParams, TransmissionResult};

/// Fixed seed: refinement must stay reproducible from run to run.
const SAMPLE_SEED: u64 = 42;

pub fn refine(
    constellation: &Constellation,
    params: &SolverParams,
    mut best: TransmissionResult,
    batches: usize,
) -> TransmissionResult {
    if batches == 0 {
        return best;
    }
    let batch_size = best.assignments.len() / batches;
    if batch_size == 0 {
        return best;
    }

    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    for batch in 0..batches {
        let mutate_at = batch * batch_size + rng.gen_range(0..batch_size);
        let candidate = greedy::schedule(
            constellation,
            params,
            Some(Replay {
                assignments: &best.assignments,
                mutate_at,
            }),
        );
        if candidate.total_data_milli > best.total_data_milli {
            best = candidate;
        }
        info!(
            "refinement batch {}/{}: best {} milli-bytes",
            batch + 1,
            batches,
            best.total_data_milli
        );
    }
    best
}
