//! Physical partition metrics backed by an object store.

use crate::interface::{Error, PartitionReadSnafu, Result, StatsStore, StorageUnavailableSnafu};
use async_trait::async_trait;
use cube_core::{
    constants::{
        METRIC_NUMBER_OF_FILES, METRIC_NUMBER_OF_PARTITIONS, METRIC_NUMBER_OF_ROWS,
        METRIC_TOTAL_SIZE_BYTES,
    },
    CubePartition, DatasetStats,
};
use object_store::{path::Path, DynObjectStore};
use snafu::IntoError;
use std::sync::Arc;
use tracing::trace;

/// [`StatsStore`] over a key-addressable object store.
///
/// Sizes come from `head` lookups only; no object data is ever read. Row
/// counts are taken from the partition descriptor when the catalog recorded
/// them, since deriving them from the blobs would require reading file
/// footers.
#[derive(Debug)]
pub struct ObjectStoreStatsStore {
    object_store: Arc<DynObjectStore>,
}

impl ObjectStoreStatsStore {
    /// Create a stats store over the given backend.
    pub fn new(object_store: Arc<DynObjectStore>) -> Self {
        Self { object_store }
    }
}

#[async_trait]
impl StatsStore for ObjectStoreStatsStore {
    async fn partition_metrics(&self, partition: &CubePartition) -> Result<DatasetStats> {
        let mut total_size_bytes: i64 = 0;
        for key in &partition.files {
            let location = Path::from(key.as_str());
            let meta = self
                .object_store
                .head(&location)
                .await
                .map_err(|e| head_error(key, e))?;
            trace!(%location, size = meta.size, "resolved partition file");
            total_size_bytes += meta.size as i64;
        }

        Ok(physical_partition_stats(partition, total_size_bytes))
    }
}

/// Classify a failed `head` lookup.
///
/// A missing key is a defect of that partition; anything else is treated as
/// the backend being unreachable for the block. Both fail the block either
/// way, the split only changes what an operator gets to see.
fn head_error(key: &str, e: object_store::Error) -> Error {
    match e {
        e @ object_store::Error::NotFound { .. } => {
            PartitionReadSnafu { key }.into_error(Box::new(e))
        }
        e => StorageUnavailableSnafu.into_error(Box::new(e)),
    }
}

/// Assemble the metric map of one physical partition.
pub(crate) fn physical_partition_stats(
    partition: &CubePartition,
    total_size_bytes: i64,
) -> DatasetStats {
    let mut stats = DatasetStats::from([
        (METRIC_NUMBER_OF_PARTITIONS.to_owned(), 1),
        (
            METRIC_NUMBER_OF_FILES.to_owned(),
            partition.files.len() as i64,
        ),
        (METRIC_TOTAL_SIZE_BYTES.to_owned(), total_size_bytes),
    ]);
    if let Some(row_count) = partition.row_count {
        stats.insert(METRIC_NUMBER_OF_ROWS.to_owned(), row_count as i64);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use cube_core::PartitionKey;
    use object_store::{memory::InMemory, ObjectStore, PutPayload};

    async fn object_store() -> Arc<DynObjectStore> {
        let store = InMemory::new();
        store
            .put(
                &Path::from("sales++seed/day=1/0.parquet"),
                PutPayload::from_static(&[0; 100]),
            )
            .await
            .unwrap();
        store
            .put(
                &Path::from("sales++seed/day=1/1.parquet"),
                PutPayload::from_static(&[0; 28]),
            )
            .await
            .unwrap();
        Arc::new(store)
    }

    fn partition(files: &[&str], row_count: Option<u64>) -> CubePartition {
        CubePartition {
            key: PartitionKey::from("day=1"),
            files: files.iter().map(|f| (*f).to_owned()).collect(),
            row_count,
        }
    }

    #[tokio::test]
    async fn test_partition_metrics() {
        let store = ObjectStoreStatsStore::new(object_store().await);
        let partition = partition(
            &[
                "sales++seed/day=1/0.parquet",
                "sales++seed/day=1/1.parquet",
            ],
            Some(64),
        );

        let stats = store.partition_metrics(&partition).await.unwrap();

        assert_eq!(
            stats,
            DatasetStats::from([
                (METRIC_NUMBER_OF_PARTITIONS.to_owned(), 1),
                (METRIC_NUMBER_OF_FILES.to_owned(), 2),
                (METRIC_TOTAL_SIZE_BYTES.to_owned(), 128),
                (METRIC_NUMBER_OF_ROWS.to_owned(), 64),
            ])
        );
    }

    #[tokio::test]
    async fn test_row_count_metric_is_optional() {
        let store = ObjectStoreStatsStore::new(object_store().await);
        let partition = partition(&["sales++seed/day=1/0.parquet"], None);

        let stats = store.partition_metrics(&partition).await.unwrap();

        assert!(!stats.contains_key(METRIC_NUMBER_OF_ROWS));
        assert_eq!(stats[METRIC_TOTAL_SIZE_BYTES], 100);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = ObjectStoreStatsStore::new(object_store().await);
        let partition = partition(&["sales++seed/day=2/0.parquet"], None);

        assert_matches!(
            store.partition_metrics(&partition).await,
            Err(Error::PartitionRead { key, .. }) if key == "sales++seed/day=2/0.parquet"
        );
    }
}
