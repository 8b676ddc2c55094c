//! Constants shared by everything that reads or writes cube datasets.

//
// !!!! WARNING !!!!
//
// Changing any of these constants may break compatibility with cubes that
// are already persisted.
//

/// Version of the dataset metadata format this crate understands.
pub const CUBE_METADATA_VERSION: u32 = 4;

/// Metadata key that marks the seed dataset of a cube.
pub const CUBE_METADATA_KEY_IS_SEED: &str = "cube_is_seed";

/// Metadata key under which a cube's dimension columns are stored.
pub const CUBE_METADATA_DIMENSION_COLUMNS: &str = "cube_dimension_columns";

/// Metadata key under which a cube's partition columns are stored.
pub const CUBE_METADATA_PARTITION_COLUMNS: &str = "cube_partition_columns";

/// Character sequence separating the cube name from the dataset id in the
/// storage uuid of a dataset.
pub const CUBE_UUID_SEPARATOR: &str = "++";

/// Metric name for the number of physical partitions accounted.
pub const METRIC_NUMBER_OF_PARTITIONS: &str = "number_of_partitions";

/// Metric name for the number of stored files accounted.
pub const METRIC_NUMBER_OF_FILES: &str = "number_of_files";

/// Metric name for the summed file sizes in bytes.
pub const METRIC_TOTAL_SIZE_BYTES: &str = "total_size_bytes";

/// Metric name for the summed row counts, where known.
pub const METRIC_NUMBER_OF_ROWS: &str = "number_of_rows";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_separator_valid() {
        // Storage keys embed the separator between cube name and dataset id;
        // it must never collide with characters legal in either part.
        assert!(!CUBE_UUID_SEPARATOR
            .chars()
            .any(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn test_metadata_keys_distinct() {
        let keys = [
            CUBE_METADATA_KEY_IS_SEED,
            CUBE_METADATA_DIMENSION_COLUMNS,
            CUBE_METADATA_PARTITION_COLUMNS,
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
