//! Checks that a set of persisted datasets forms a consistent cube.
//!
//! Statistics (and every other cross-dataset operation) are only meaningful
//! when the datasets agree on the cube layout, so callers run these checks
//! after resolving the datasets from the catalog and before doing any work
//! with them.

use crate::{constants::CUBE_METADATA_VERSION, Cube, DatasetId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Catalog-side description of one dataset, as far as the consistency
/// checks need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMetadata {
    /// All columns of the dataset, partition columns included.
    pub columns: BTreeSet<String>,

    /// Columns the dataset is physically partitioned by, in order.
    pub partition_keys: Vec<String>,

    /// Version of the on-storage metadata format.
    pub metadata_version: u32,
}

/// Errors returned by [`check_datasets`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsistencyError {
    /// The seed dataset is not part of the resolved datasets.
    #[error("seed data (\"{seed_dataset}\") is missing")]
    MissingSeedDataset {
        /// The expected seed dataset id.
        seed_dataset: DatasetId,
    },

    /// Some datasets were written with a different metadata format version.
    #[error(
        "invalid datasets because metadata version is wrong, expected {expected}: {datasets}"
    )]
    WrongMetadataVersion {
        /// The supported version.
        expected: u32,
        /// Offending datasets with their actual versions, sorted by id.
        datasets: String,
    },

    /// A payload column is provided by more than one dataset.
    #[error("found columns present in multiple datasets: {overlap}")]
    OverlappingPayloadColumns {
        /// Offending columns with the datasets providing them.
        overlap: String,
    },

    /// The seed dataset does not carry all partition columns of the cube.
    #[error("seed dataset \"{dataset_id}\" has missing partition columns: {missing}")]
    MissingPartitionColumns {
        /// The seed dataset id.
        dataset_id: DatasetId,
        /// The missing columns, sorted.
        missing: String,
    },

    /// A dataset provides a cube partition column without partitioning by it.
    #[error("unspecified but provided partition columns in {dataset_id}: {columns}")]
    UnspecifiedPartitionColumns {
        /// The offending dataset id.
        dataset_id: DatasetId,
        /// The offending columns, sorted.
        columns: String,
    },

    /// The seed dataset does not carry all dimension columns of the cube.
    #[error("seed dataset \"{dataset_id}\" has missing dimension columns: {missing}")]
    MissingDimensionColumns {
        /// The seed dataset id.
        dataset_id: DatasetId,
        /// The missing columns, sorted.
        missing: String,
    },

    /// A non-seed dataset shares no dimension column with the cube.
    #[error("dataset \"{dataset_id}\" must have at least 1 of the following dimension columns: {dimensions}")]
    NoDimensionColumn {
        /// The offending dataset id.
        dataset_id: DatasetId,
        /// The cube's dimension columns, in order.
        dimensions: String,
    },
}

/// Payload column subset of the given columns.
///
/// Payload columns are the columns a dataset actually contributes to the
/// cube, everything that is neither dimension nor partition column.
pub fn payload_subset<'a>(
    columns: impl IntoIterator<Item = &'a String>,
    cube: &Cube,
) -> BTreeSet<String> {
    columns
        .into_iter()
        .filter(|c| {
            !cube.dimension_columns().contains(*c) && !cube.partition_columns().contains(*c)
        })
        .cloned()
        .collect()
}

/// Payload columns of the whole cube, over all datasets.
pub fn cube_payload(datasets: &BTreeMap<DatasetId, DatasetMetadata>, cube: &Cube) -> BTreeSet<String> {
    datasets
        .values()
        .flat_map(|ds| payload_subset(&ds.columns, cube))
        .collect()
}

/// Apply sanity checks to persisted cube datasets.
///
/// Checked, in order: the seed dataset is present, every dataset carries the
/// supported metadata version, payload columns do not overlap between
/// datasets, partition columns are declared where provided, and dimension
/// columns are present (all of them in the seed dataset, at least one
/// everywhere else).
///
/// The first violated rule is reported; dataset ids within a report are
/// sorted so messages are deterministic.
pub fn check_datasets(
    datasets: &BTreeMap<DatasetId, DatasetMetadata>,
    cube: &Cube,
) -> Result<(), ConsistencyError> {
    if !datasets.contains_key(cube.seed_dataset()) {
        return Err(ConsistencyError::MissingSeedDataset {
            seed_dataset: cube.seed_dataset().clone(),
        });
    }

    let wrong_version = datasets
        .iter()
        .filter(|(_, ds)| ds.metadata_version != CUBE_METADATA_VERSION)
        .map(|(dataset_id, ds)| format!("{} ({})", dataset_id, ds.metadata_version))
        .collect::<Vec<_>>();
    if !wrong_version.is_empty() {
        return Err(ConsistencyError::WrongMetadataVersion {
            expected: CUBE_METADATA_VERSION,
            datasets: wrong_version.join(", "),
        });
    }

    check_overlap(datasets, cube)?;
    check_partition_columns(datasets, cube)?;
    check_dimension_columns(datasets, cube)?;

    Ok(())
}

/// Check that datasets have no overlapping payload columns.
fn check_overlap(
    datasets: &BTreeMap<DatasetId, DatasetMetadata>,
    cube: &Cube,
) -> Result<(), ConsistencyError> {
    let mut payload_columns: BTreeMap<String, Vec<&DatasetId>> = BTreeMap::new();
    for (dataset_id, ds) in datasets {
        for col in payload_subset(&ds.columns, cube) {
            payload_columns.entry(col).or_default().push(dataset_id);
        }
    }

    let overlap = payload_columns
        .into_iter()
        .filter(|(_, dataset_ids)| dataset_ids.len() > 1)
        .map(|(col, dataset_ids)| {
            format!(
                "{}: {}",
                col,
                dataset_ids
                    .iter()
                    .map(|id| id.inner())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
        .collect::<Vec<_>>();
    if !overlap.is_empty() {
        return Err(ConsistencyError::OverlappingPayloadColumns {
            overlap: overlap.join("; "),
        });
    }

    Ok(())
}

/// Check that required partition columns are present and declared.
///
/// The seed dataset must be partitioned by all of the cube's partition
/// columns. Any dataset providing a cube partition column as a regular
/// column without partitioning by it would silently break partition
/// alignment, so that is rejected as well.
fn check_partition_columns(
    datasets: &BTreeMap<DatasetId, DatasetMetadata>,
    cube: &Cube,
) -> Result<(), ConsistencyError> {
    for (dataset_id, ds) in datasets {
        let partition_keys: BTreeSet<&String> = ds.partition_keys.iter().collect();

        if dataset_id == cube.seed_dataset() {
            let missing = cube
                .partition_columns()
                .iter()
                .filter(|c| !partition_keys.contains(c))
                .cloned()
                .collect::<Vec<_>>();
            if !missing.is_empty() {
                return Err(ConsistencyError::MissingPartitionColumns {
                    dataset_id: dataset_id.clone(),
                    missing: missing.join(", "),
                });
            }
        }

        let unspecified = cube
            .partition_columns()
            .iter()
            .filter(|c| ds.columns.contains(*c) && !partition_keys.contains(c))
            .cloned()
            .collect::<Vec<_>>();
        if !unspecified.is_empty() {
            return Err(ConsistencyError::UnspecifiedPartitionColumns {
                dataset_id: dataset_id.clone(),
                columns: unspecified.join(", "),
            });
        }
    }

    Ok(())
}

/// Check that required dimension columns are present.
///
/// The seed dataset spans the cube, so it needs every dimension column. All
/// other datasets only need some dimension overlap to be joinable at all.
fn check_dimension_columns(
    datasets: &BTreeMap<DatasetId, DatasetMetadata>,
    cube: &Cube,
) -> Result<(), ConsistencyError> {
    for (dataset_id, ds) in datasets {
        if dataset_id == cube.seed_dataset() {
            let missing = cube
                .dimension_columns()
                .iter()
                .filter(|c| !ds.columns.contains(*c))
                .cloned()
                .collect::<Vec<_>>();
            if !missing.is_empty() {
                return Err(ConsistencyError::MissingDimensionColumns {
                    dataset_id: dataset_id.clone(),
                    missing: missing.join(", "),
                });
            }
        } else if !cube
            .dimension_columns()
            .iter()
            .any(|c| ds.columns.contains(c))
        {
            return Err(ConsistencyError::NoDimensionColumn {
                dataset_id: dataset_id.clone(),
                dimensions: cube.dimension_columns().join(", "),
            });
        }
    }

    Ok(())
}
