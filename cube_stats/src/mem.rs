//! In-memory implementations of the catalog and storage interfaces.
//!
//! Useful for testing and for embeddings whose dataset metadata is already
//! resolved in memory. Both types deliberately support error injection so
//! failure paths of the pipeline can be exercised without a real backend.

use crate::{
    interface::{
        DatasetSource, DynError, PartitionReadSnafu, Result, StatsStore, StorageUnavailableSnafu,
    },
    store::physical_partition_stats,
};
use async_trait::async_trait;
use cube_core::{CubePartition, DatasetStats};
use parking_lot::Mutex;
use snafu::IntoError;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

/// [`DatasetSource`] serving a fixed, pre-grouped partition list.
#[derive(Debug, Default)]
pub struct MemDatasetSource {
    partitions: Vec<CubePartition>,
    corrupt: Option<String>,
}

impl MemDatasetSource {
    /// Source serving the given partitions, in the given order.
    pub fn new(partitions: Vec<CubePartition>) -> Self {
        Self {
            partitions,
            corrupt: None,
        }
    }

    /// Source whose metadata cannot be enumerated.
    pub fn corrupt(descr: impl Into<String>) -> Self {
        Self {
            partitions: vec![],
            corrupt: Some(descr.into()),
        }
    }
}

impl DatasetSource for MemDatasetSource {
    fn partitions(&self) -> Result<Vec<CubePartition>, DynError> {
        match &self.corrupt {
            Some(descr) => Err(descr.clone().into()),
            None => Ok(self.partitions.clone()),
        }
    }
}

/// [`StatsStore`] over an in-memory blob map of storage key to blob size.
#[derive(Debug, Default)]
pub struct MemStore {
    blobs: Mutex<HashMap<String, u64>>,
    unavailable: AtomicBool,
}

impl MemStore {
    /// Record a blob of the given size.
    pub fn put(&self, key: impl Into<String>, size: u64) {
        self.blobs.lock().insert(key.into(), size);
    }

    /// Make every subsequent lookup fail as if the backend were down.
    pub fn set_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatsStore for MemStore {
    async fn partition_metrics(&self, partition: &CubePartition) -> Result<DatasetStats> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageUnavailableSnafu.into_error("connection refused".into()));
        }

        let blobs = self.blobs.lock();
        let mut total_size_bytes: i64 = 0;
        for key in &partition.files {
            let size = *blobs
                .get(key)
                .ok_or_else(|| {
                    PartitionReadSnafu { key: key.as_str() }.into_error("no such key".into())
                })?;
            total_size_bytes += size as i64;
        }

        Ok(physical_partition_stats(partition, total_size_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cube_core::{
        constants::{METRIC_NUMBER_OF_PARTITIONS, METRIC_TOTAL_SIZE_BYTES},
        PartitionKey,
    };

    #[tokio::test]
    async fn test_mem_store_sums_blob_sizes() {
        let store = MemStore::default();
        store.put("a", 1);
        store.put("b", 2);

        let partition = CubePartition {
            key: PartitionKey::from("day=1"),
            files: vec!["a".to_owned(), "b".to_owned()],
            row_count: None,
        };
        let stats = store.partition_metrics(&partition).await.unwrap();

        assert_eq!(stats[METRIC_TOTAL_SIZE_BYTES], 3);
        assert_eq!(stats[METRIC_NUMBER_OF_PARTITIONS], 1);
    }

    #[test]
    fn test_corrupt_source() {
        let source = MemDatasetSource::corrupt("boom");
        assert_eq!(source.partitions().unwrap_err().to_string(), "boom");
    }
}
