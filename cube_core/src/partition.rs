//! Physical partitions and the unit of work dispatched to stats collectors.

use crate::DatasetId;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};

/// Grouping key shared by all files of one physical partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(Arc<str>);

impl PartitionKey {
    /// Returns the underlying string.
    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PartitionKey {
    fn from(s: String) -> Self {
        assert!(!s.is_empty());
        Self(s.into())
    }
}

impl From<&str> for PartitionKey {
    fn from(s: &str) -> Self {
        assert!(!s.is_empty());
        Self(s.into())
    }
}

/// One contiguous stored unit of a dataset.
///
/// A partition groups the blobs that share the same partition-key values.
/// The descriptor carries everything the statistics pipeline needs without
/// touching the blobs themselves: the storage keys and, when the catalog
/// recorded it at write time, the row total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubePartition {
    /// Partition key of this unit.
    pub key: PartitionKey,

    /// Storage keys of the blobs making up this partition.
    pub files: Vec<String>,

    /// Total row count across the files, if the catalog has it recorded.
    pub row_count: Option<u64>,
}

/// The atomic unit of scheduling: one physical partition tagged with its
/// owning dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedPartition {
    /// Dataset the partition belongs to.
    pub dataset_id: DatasetId,

    /// The physical partition to account.
    pub partition: CubePartition,
}
