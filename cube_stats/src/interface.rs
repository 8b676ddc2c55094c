//! Traits and error types for the collaborators of a statistics run.
//!
//! The pipeline consumes two external services: a metadata catalog that
//! resolves datasets to their physical partitions, and a key-addressable
//! storage backend that answers size/metadata lookups. Both are modelled as
//! traits here so the pipeline stays independent of concrete backends.

use async_trait::async_trait;
use cube_core::{CubePartition, DatasetId, DatasetStats, StatsError};
use snafu::Snafu;
use std::{fmt::Debug, sync::Arc};

/// Boxed error produced by interface implementations.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Errors of a cube statistics run.
///
/// None of these is ever downgraded to a partial result: a failure in any
/// block fails the block, and the caller (which owns retry policy) decides
/// what to do. Context selectors are public so that implementations of
/// [`StatsStore`] can construct the storage variants.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A dataset handle failed to enumerate its partitions. Fatal for the
    /// whole statistics run, since the partition set would be incomplete.
    #[snafu(display("cannot enumerate partitions of dataset {dataset_id}: {source}"))]
    Catalog {
        /// Dataset whose metadata could not be read.
        dataset_id: DatasetId,
        /// Underlying catalog error.
        source: DynError,
    },

    /// The storage backend cannot be reached at all. Fatal for the block.
    #[snafu(display("storage backend unavailable: {source}"))]
    StorageUnavailable {
        /// Underlying backend error.
        source: DynError,
    },

    /// The metadata/size lookup for a single partition failed. Fatal for
    /// the containing block, so statistics are never silently incomplete.
    #[snafu(display("cannot read partition file {key:?}: {source}"))]
    PartitionRead {
        /// Storage key that failed to resolve.
        key: String,
        /// Underlying backend error.
        source: DynError,
    },

    /// A statistics contribution was malformed, which indicates upstream
    /// corruption rather than a legitimate value.
    #[snafu(display("invalid stats: {source}"))]
    InvalidStats {
        /// The offending value.
        source: StatsError,
    },
}

/// A specialized `Result` for statistics errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A handle to one dataset's partition metadata, resolved by the catalog.
///
/// Implementations must return the dataset's physical partitions grouped by
/// its partition-key columns, every partition exactly once, and must be
/// deterministic for a fixed dataset state. Enumeration is a read-only
/// traversal of catalog metadata.
pub trait DatasetSource: Debug + Send + Sync {
    /// Enumerate the physical partitions of this dataset.
    fn partitions(&self) -> Result<Vec<CubePartition>, DynError>;
}

/// Storage backend interface: additive metrics of one physical partition.
#[async_trait]
pub trait StatsStore: Debug + Send + Sync {
    /// Compute the metrics of one physical partition.
    ///
    /// Implementations must only report additive metrics. A non-additive
    /// metric (a maximum, say) would survive collection but produce
    /// grouping-dependent results once blocks are reduced.
    async fn partition_metrics(&self, partition: &CubePartition) -> Result<DatasetStats>;
}

/// Zero-argument factory for a [`StatsStore`].
pub type StoreFactory = Arc<dyn Fn() -> Arc<dyn StatsStore> + Send + Sync>;

/// A storage handle that is either ready to use or built on demand.
///
/// Live backend connections do not survive serialization across worker
/// boundaries. A distributed worker therefore receives the deferred form
/// and each collector call constructs a fresh backend connection locally;
/// single-process embeddings can pass an existing store directly.
#[derive(Clone)]
pub enum StoreHandle {
    /// An already-connected store.
    Ready(Arc<dyn StatsStore>),

    /// A factory invoked once per collector call.
    Deferred(StoreFactory),
}

impl StoreHandle {
    /// Wrap a factory into a deferred handle.
    pub fn deferred<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn StatsStore> + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(factory))
    }

    /// Resolve to a usable store.
    pub fn resolve(&self) -> Arc<dyn StatsStore> {
        match self {
            Self::Ready(store) => Arc::clone(store),
            Self::Deferred(factory) => factory(),
        }
    }
}

impl Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(store) => f.debug_tuple("Ready").field(store).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Arc<dyn StatsStore>> for StoreHandle {
    fn from(store: Arc<dyn StatsStore>) -> Self {
        Self::Ready(store)
    }
}
