//! The cube descriptor and dataset identifiers.

use crate::constants::CUBE_UUID_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};
use thiserror::Error;

/// Opaque identifier of one dataset within a cube.
///
/// Implemented as a reference-counted string, cheap to clone into the many
/// scheduling units that carry it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(Arc<str>);

impl DatasetId {
    /// Returns the underlying string.
    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DatasetId {
    fn from(s: String) -> Self {
        assert!(!s.is_empty());
        Self(s.into())
    }
}

impl From<&str> for DatasetId {
    fn from(s: &str) -> Self {
        assert!(!s.is_empty());
        Self(s.into())
    }
}

/// Errors returned when assembling a [`Cube`] from invalid parts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CubeError {
    /// The cube name is empty.
    #[error("cube name must not be empty")]
    EmptyName,

    /// The cube name would collide with the uuid composition scheme.
    #[error("cube name must not contain {CUBE_UUID_SEPARATOR:?}: {name}")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// No dimension columns were given.
    #[error("cube must have at least 1 dimension column")]
    MissingDimensionColumns,

    /// No partition columns were given.
    #[error("cube must have at least 1 partition column")]
    MissingPartitionColumns,

    /// A column was declared both dimension and partition column.
    #[error("column cannot be dimension and partition column at the same time: {column}")]
    OverlappingColumns {
        /// The offending column.
        column: String,
    },
}

/// Specification of a cube: a named collection of datasets that share
/// dimension columns and are physically partitioned by the same partition
/// columns.
///
/// The cube itself is never mutated by the statistics pipeline; it is the
/// frame of reference datasets are checked and addressed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cube {
    name: Arc<str>,
    dimension_columns: Vec<String>,
    partition_columns: Vec<String>,
    seed_dataset: DatasetId,
    index_columns: Vec<String>,
}

impl Cube {
    /// Start building a cube with the given name.
    pub fn builder(name: impl Into<String>) -> CubeBuilder {
        CubeBuilder::new(name)
    }

    /// Name of the cube, also the storage uuid prefix of its datasets.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns spanning the cells of the cube, in order.
    pub fn dimension_columns(&self) -> &[String] {
        &self.dimension_columns
    }

    /// Columns the datasets are physically partitioned by, in order.
    pub fn partition_columns(&self) -> &[String] {
        &self.partition_columns
    }

    /// Id of the dataset that defines which cells exist.
    pub fn seed_dataset(&self) -> &DatasetId {
        &self.seed_dataset
    }

    /// Columns for which index structures are expected, in order.
    pub fn index_columns(&self) -> &[String] {
        &self.index_columns
    }

    /// Storage uuid under which a dataset of this cube is persisted.
    pub fn dataset_uuid(&self, dataset_id: &DatasetId) -> String {
        format!("{}{}{}", self.name, CUBE_UUID_SEPARATOR, dataset_id)
    }
}

/// Builder for [`Cube`].
#[derive(Debug, Default)]
pub struct CubeBuilder {
    name: String,
    dimension_columns: Vec<String>,
    partition_columns: Vec<String>,
    seed_dataset: Option<DatasetId>,
    index_columns: Vec<String>,
}

impl CubeBuilder {
    /// Create a builder for a cube with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a dimension column.
    pub fn dimension_column(mut self, column: impl Into<String>) -> Self {
        self.dimension_columns.push(column.into());
        self
    }

    /// Add a partition column.
    pub fn partition_column(mut self, column: impl Into<String>) -> Self {
        self.partition_columns.push(column.into());
        self
    }

    /// Set the seed dataset id. Defaults to `"seed"`.
    pub fn seed_dataset(mut self, dataset_id: impl Into<DatasetId>) -> Self {
        self.seed_dataset = Some(dataset_id.into());
        self
    }

    /// Add an index column.
    pub fn index_column(mut self, column: impl Into<String>) -> Self {
        self.index_columns.push(column.into());
        self
    }

    /// Validate the parts and build the cube.
    pub fn build(self) -> Result<Cube, CubeError> {
        let Self {
            name,
            dimension_columns,
            partition_columns,
            seed_dataset,
            index_columns,
        } = self;

        if name.is_empty() {
            return Err(CubeError::EmptyName);
        }
        if name.contains(CUBE_UUID_SEPARATOR) {
            return Err(CubeError::InvalidName { name });
        }
        if dimension_columns.is_empty() {
            return Err(CubeError::MissingDimensionColumns);
        }
        if partition_columns.is_empty() {
            return Err(CubeError::MissingPartitionColumns);
        }
        if let Some(column) = dimension_columns
            .iter()
            .find(|c| partition_columns.contains(c))
        {
            return Err(CubeError::OverlappingColumns {
                column: column.clone(),
            });
        }

        Ok(Cube {
            name: name.into(),
            dimension_columns,
            partition_columns,
            seed_dataset: seed_dataset.unwrap_or_else(|| DatasetId::from("seed")),
            index_columns,
        })
    }
}
