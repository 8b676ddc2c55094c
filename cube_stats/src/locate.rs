//! Partition discovery for statistics runs.

use crate::interface::{CatalogSnafu, DatasetSource, Result};
use cube_core::{DatasetId, TaggedPartition};
use snafu::ResultExt;
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

/// Expand every dataset of a cube into its tagged physical partitions.
///
/// The result covers every partition of every dataset exactly once, visited
/// in dataset id order and grouped the way the catalog exposes them. It is
/// the full unit-of-work list an external scheduler chops into blocks for
/// [`collect_stats_block`](crate::collect_stats_block).
///
/// Enumeration failure of any dataset aborts the whole call; a partition
/// list with holes would make the final statistics silently wrong.
pub fn locate_partitions(
    datasets: &BTreeMap<DatasetId, Arc<dyn DatasetSource>>,
) -> Result<Vec<TaggedPartition>> {
    let mut tagged = Vec::new();

    for (dataset_id, source) in datasets {
        let partitions = source.partitions().context(CatalogSnafu {
            dataset_id: dataset_id.clone(),
        })?;
        debug!(%dataset_id, n_partitions = partitions.len(), "located partitions");

        tagged.extend(partitions.into_iter().map(|partition| TaggedPartition {
            dataset_id: dataset_id.clone(),
            partition,
        }));
    }

    Ok(tagged)
}
