//! The statistics mapping and its merge algebra.

use crate::DatasetId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Metrics of one dataset: metric name to non-negative value.
///
/// Only additive metrics belong here. Summing additive metrics over any
/// grouping of partitions yields the same totals, which is what allows
/// blocks to be collected independently and reduced in arbitrary order.
pub type DatasetStats = BTreeMap<String, i64>;

/// Errors raised when a statistics contribution is malformed.
///
/// Values are stored as `i64` rather than an unsigned type on purpose:
/// statistics cross process boundaries through deserialization, and a
/// corrupt negative value must surface as an error instead of being
/// reinterpreted at the wire boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    /// A negative value arrived for an inherently non-negative metric.
    #[error("invalid stats value for metric {metric:?} of dataset {dataset_id}: {value}")]
    InvalidStatsValue {
        /// Dataset the value was reported for.
        dataset_id: DatasetId,
        /// Metric name.
        metric: String,
        /// The offending value.
        value: i64,
    },

    /// Accumulating a value overflowed the metric counter.
    #[error("stats value overflow for metric {metric:?} of dataset {dataset_id}")]
    ValueOverflow {
        /// Dataset the value was reported for.
        dataset_id: DatasetId,
        /// Metric name.
        metric: String,
    },
}

/// Aggregated statistics of one cube: dataset id to per-dataset metrics.
///
/// Merging two mappings sums their metrics per `(dataset id, metric)` pair,
/// treating absent entries as zero. The operation is associative and
/// commutative and has the empty mapping as identity, so partial results
/// can be combined in flat folds, pairwise trees or any other reduction
/// shape without changing the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubeStats(BTreeMap<DatasetId, DatasetStats>);

impl CubeStats {
    /// Returns true if no dataset has contributed yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of datasets with contributions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Metrics of the given dataset, if any were contributed.
    pub fn get(&self, dataset_id: &DatasetId) -> Option<&DatasetStats> {
        self.0.get(dataset_id)
    }

    /// Iterate over datasets and their metrics, in dataset id order.
    pub fn iter(&self) -> impl Iterator<Item = (&DatasetId, &DatasetStats)> {
        self.0.iter()
    }

    /// Unwrap into the underlying mapping.
    pub fn into_inner(self) -> BTreeMap<DatasetId, DatasetStats> {
        self.0
    }

    /// Add one metric map onto the accumulator under `dataset_id`.
    ///
    /// Metrics absent from the accumulator start at zero. Negative
    /// contributions and counter overflow are rejected; the accumulator must
    /// be considered poisoned afterwards and discarded.
    pub fn fold(&mut self, dataset_id: &DatasetId, stats: &DatasetStats) -> Result<(), StatsError> {
        let slot = self.0.entry(dataset_id.clone()).or_default();
        for (metric, &value) in stats {
            if value < 0 {
                return Err(StatsError::InvalidStatsValue {
                    dataset_id: dataset_id.clone(),
                    metric: metric.clone(),
                    value,
                });
            }
            let sum = slot.entry(metric.clone()).or_insert(0);
            *sum = sum
                .checked_add(value)
                .ok_or_else(|| StatsError::ValueOverflow {
                    dataset_id: dataset_id.clone(),
                    metric: metric.clone(),
                })?;
        }
        Ok(())
    }

    /// Fold every dataset of `other` into the accumulator.
    pub fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        for (dataset_id, stats) in &other.0 {
            self.fold(dataset_id, stats)?;
        }
        Ok(())
    }
}

impl From<BTreeMap<DatasetId, DatasetStats>> for CubeStats {
    fn from(inner: BTreeMap<DatasetId, DatasetStats>) -> Self {
        Self(inner)
    }
}

impl<'a> IntoIterator for &'a CubeStats {
    type Item = (&'a DatasetId, &'a DatasetStats);
    type IntoIter = std::collections::btree_map::Iter<'a, DatasetId, DatasetStats>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use proptest::{prelude::*, proptest};

    fn stats(entries: &[(&str, &[(&str, i64)])]) -> CubeStats {
        entries
            .iter()
            .map(|(dataset_id, metrics)| {
                (
                    DatasetId::from(*dataset_id),
                    metrics
                        .iter()
                        .map(|(metric, value)| ((*metric).to_owned(), *value))
                        .collect(),
                )
            })
            .collect::<BTreeMap<_, _>>()
            .into()
    }

    #[test]
    fn test_fold_zero_default() {
        // Heterogeneous metric sets per dataset merge without error, missing
        // metrics contribute zero.
        let mut acc = CubeStats::default();
        acc.fold(
            &DatasetId::from("d1"),
            &DatasetStats::from([("rows".to_owned(), 5)]),
        )
        .unwrap();
        acc.fold(
            &DatasetId::from("d1"),
            &DatasetStats::from([("bytes".to_owned(), 100)]),
        )
        .unwrap();

        assert_eq!(acc, stats(&[("d1", &[("rows", 5), ("bytes", 100)])]));
    }

    #[test]
    fn test_fold_sums_existing() {
        let mut acc = stats(&[("d1", &[("rows", 5)])]);
        acc.fold(
            &DatasetId::from("d1"),
            &DatasetStats::from([("rows".to_owned(), 7)]),
        )
        .unwrap();

        assert_eq!(acc, stats(&[("d1", &[("rows", 12)])]));
    }

    #[test]
    fn test_fold_rejects_negative() {
        let mut acc = CubeStats::default();
        let err = acc
            .fold(
                &DatasetId::from("d1"),
                &DatasetStats::from([("rows".to_owned(), -1)]),
            )
            .unwrap_err();

        assert_matches!(
            err,
            StatsError::InvalidStatsValue { metric, value, .. } if metric == "rows" && value == -1
        );
    }

    #[test]
    fn test_fold_rejects_overflow() {
        let mut acc = stats(&[("d1", &[("rows", i64::MAX)])]);
        let err = acc
            .fold(
                &DatasetId::from("d1"),
                &DatasetStats::from([("rows".to_owned(), 1)]),
            )
            .unwrap_err();

        assert_matches!(err, StatsError::ValueOverflow { metric, .. } if metric == "rows");
    }

    #[test]
    fn test_merge_identity() {
        let a = stats(&[("d1", &[("rows", 5)]), ("d2", &[("bytes", 7)])]);

        let mut acc = CubeStats::default();
        acc.merge(&a).unwrap();
        assert_eq!(acc, a);

        let mut acc = a.clone();
        acc.merge(&CubeStats::default()).unwrap();
        assert_eq!(acc, a);
    }

    #[test]
    fn test_serde_roundtrip() {
        let a = stats(&[("d1", &[("rows", 5), ("bytes", 100)])]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, r#"{"d1":{"bytes":100,"rows":5}}"#);

        let back: CubeStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    prop_compose! {
        /// An arbitrary statistics mapping over a small universe of dataset
        /// ids and metric names, so that generated mappings actually collide.
        fn arbitrary_stats()(
            entries in prop::collection::btree_map(
                prop::sample::select(vec!["seed", "enrich", "latest"]),
                prop::collection::btree_map(
                    prop::sample::select(vec!["rows", "bytes", "files"]),
                    0i64..1_000_000,
                    0..3,
                ),
                0..3,
            )
        ) -> CubeStats {
            entries
                .into_iter()
                .map(|(dataset_id, metrics)| {
                    (
                        DatasetId::from(dataset_id),
                        metrics
                            .into_iter()
                            .map(|(metric, value)| (metric.to_owned(), value))
                            .collect(),
                    )
                })
                .collect::<BTreeMap<_, _>>()
                .into()
        }
    }

    proptest! {
        #[test]
        fn merge_commutative(a in arbitrary_stats(), b in arbitrary_stats()) {
            let mut ab = a.clone();
            ab.merge(&b).unwrap();

            let mut ba = b.clone();
            ba.merge(&a).unwrap();

            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn merge_associative(
            a in arbitrary_stats(),
            b in arbitrary_stats(),
            c in arbitrary_stats(),
        ) {
            // (a + b) + c
            let mut left = a.clone();
            left.merge(&b).unwrap();
            left.merge(&c).unwrap();

            // a + (b + c)
            let mut bc = b.clone();
            bc.merge(&c).unwrap();
            let mut right = a.clone();
            right.merge(&bc).unwrap();

            prop_assert_eq!(left, right);
        }

        #[test]
        fn merge_inputs_unchanged(a in arbitrary_stats(), b in arbitrary_stats()) {
            let b_before = b.clone();
            let mut acc = a.clone();
            acc.merge(&b).unwrap();

            prop_assert_eq!(b, b_before);
        }
    }
}
