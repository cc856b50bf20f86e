//! Replicated runs of one model.

use tracing::info;

use crate::error::{Result, WrapError};
use crate::model::{Model, RunOptions, RunOutcome};
use crate::value::Value;

/// Seeds for `n` replicates: `base + i` when a base is given, random otherwise.
///
/// Fails instead of wrapping when the last seed would not fit in a `u64`.
pub fn replicate_seeds(base: Option<u64>, n: usize) -> Result<Vec<Option<u64>>> {
    let Some(b) = base else {
        return Ok(vec![None; n]);
    };
    (0..n as u64)
        .map(|i| {
            b.checked_add(i).map(Some).ok_or(WrapError::SeedOverflow {
                base: b,
                replicates: n,
            })
        })
        .collect()
}

/// Runs `model` `replicates` times in sequence, stopping at the first error.
pub async fn sublaunch(
    model: &mut Model,
    base: &RunOptions,
    replicates: usize,
) -> Result<Vec<RunOutcome>> {
    let mut outcomes = Vec::with_capacity(replicates);
    for (i, seed) in replicate_seeds(base.seed, replicates)?.into_iter().enumerate() {
        let options = RunOptions {
            seed,
            ..base.clone()
        };
        let outcome = model.run(&options).await?;
        info!(
            replicate = i + 1,
            of = replicates,
            seed = outcome.seed,
            code = ?outcome.output.code,
            "replicate finished"
        );
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Values of `name` across replicates that reported it.
pub fn gather<'a>(outcomes: &'a [RunOutcome], name: &str) -> Vec<&'a Value> {
    outcomes
        .iter()
        .filter_map(|o| o.results.as_ref()?.get(name))
        .collect()
}
