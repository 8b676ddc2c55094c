//! Per-block statistics collection.

use crate::interface::{InvalidStatsSnafu, Result, StoreHandle};
use cube_core::{CubeStats, TaggedPartition};
use snafu::ResultExt;
use tracing::debug;

/// Gather statistics for one block of tagged partitions.
///
/// The storage handle is resolved exactly once per call, then every
/// partition's metrics are computed and summed onto the running per-dataset
/// mapping, strictly in the given order and one partition at a time. Since
/// all metrics are additive the result does not depend on that order, nor on
/// how the caller sliced the overall partition list into blocks.
///
/// Any failed lookup fails the whole block. Retrying means re-invoking this
/// function from scratch; no intra-block state survives an error.
pub async fn collect_stats_block(
    block: &[TaggedPartition],
    store: &StoreHandle,
) -> Result<CubeStats> {
    let store = store.resolve();

    let mut result = CubeStats::default();
    for TaggedPartition {
        dataset_id,
        partition,
    } in block
    {
        let stats = store.partition_metrics(partition).await?;
        result.fold(dataset_id, &stats).context(InvalidStatsSnafu)?;
    }
    debug!(
        n_partitions = block.len(),
        n_datasets = result.len(),
        "collected stats block"
    );

    Ok(result)
}
