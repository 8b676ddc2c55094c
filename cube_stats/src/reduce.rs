//! Merging of per-block statistics.

use crate::interface::{InvalidStatsSnafu, Result};
use cube_core::CubeStats;
use snafu::ResultExt;

/// Merge any number of statistics mappings into one.
///
/// Inputs may be collector outputs or results of previous reductions; the
/// merge starts from the empty mapping and sums per `(dataset id, metric)`
/// entry with absent entries treated as zero, so heterogeneous metric sets
/// across inputs are fine. Associativity and commutativity of that sum let
/// schedulers reduce partial results in flat folds, pairwise trees or any
/// other shape without affecting the outcome.
///
/// Inputs are only read, never mutated; distributed engines may retain and
/// replay them.
pub fn reduce_stats<'a>(results: impl IntoIterator<Item = &'a CubeStats>) -> Result<CubeStats> {
    let mut result = CubeStats::default();
    for stats in results {
        result.merge(stats).context(InvalidStatsSnafu)?;
    }
    Ok(result)
}
