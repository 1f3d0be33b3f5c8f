//! Trial aggregation and pivoting.
//!
//! This module reduces raw trial records to mean/min/max per
//! (grouping key, system) pair and reshapes the result into the
//! wide form the chart renderer consumes.

use crate::models::{AggregatedPoint, TrialRecord, WideRow, WideTable};
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::warn;

/// Errors raised when a chart asks for data the aggregation does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// A required (grouping key, system) pair has no valid trials.
    #[error("no measurements for system '{system}' at {grouping_key}")]
    MissingKey {
        grouping_key: String,
        system: String,
    },
    /// The input held no valid trials at all.
    #[error("no valid measurements in input")]
    Empty,
}

/// Aggregated points keyed by (grouping key, system), in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    points: IndexMap<(String, String), AggregatedPoint>,
    keys: IndexSet<String>,
    systems: IndexSet<String>,
}

impl Aggregation {
    /// Distinct grouping keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Distinct systems in first-seen order.
    pub fn systems(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Look up one aggregated point.
    pub fn get(&self, grouping_key: &str, system: &str) -> Result<&AggregatedPoint, AggregateError> {
        self.points
            .get(&(grouping_key.to_string(), system.to_string()))
            .ok_or_else(|| AggregateError::MissingKey {
                grouping_key: grouping_key.to_string(),
                system: system.to_string(),
            })
    }

    /// Check that every grouping key has a point for each of `systems`.
    pub fn require<S: AsRef<str>>(&self, systems: &[S]) -> Result<(), AggregateError> {
        if self.is_empty() {
            return Err(AggregateError::Empty);
        }

        for key in &self.keys {
            for system in systems {
                self.get(key, system.as_ref())?;
            }
        }

        Ok(())
    }
}

/// Group records by (grouping key, system) and reduce each group to mean/min/max.
///
/// Records without a usable metric are left out of their group. A key or
/// system only seen on such records does not appear in the result.
/// Records with a blank grouping key or system are dropped.
pub fn aggregate(records: &[TrialRecord]) -> Aggregation {
    let mut groups: IndexMap<(String, String), Vec<f64>> = IndexMap::new();
    let mut unlabeled = 0usize;

    for record in records {
        if record.grouping_key.trim().is_empty() || record.system.trim().is_empty() {
            unlabeled += 1;
            continue;
        }
        let Some(value) = record.valid_metric() else {
            continue;
        };

        groups
            .entry((record.grouping_key.clone(), record.system.clone()))
            .or_default()
            .push(value);
    }

    if unlabeled > 0 {
        warn!(
            "Dropped {} records with a blank grouping key or system",
            unlabeled
        );
    }

    let mut aggregation = Aggregation::default();

    for ((key, system), values) in groups {
        let Some(point) = AggregatedPoint::from_values(&values) else {
            continue;
        };
        aggregation.keys.insert(key.clone());
        aggregation.systems.insert(system.clone());
        aggregation.points.insert((key, system), point);
    }

    aggregation
}

/// Reshape an aggregation into wide form.
///
/// Columns follow system first-seen order; each grouping key appears once.
pub fn pivot(aggregation: &Aggregation, grouping: &str) -> WideTable {
    let systems: Vec<String> = aggregation.systems().map(String::from).collect();

    let rows = aggregation
        .keys()
        .map(|key| WideRow {
            key: key.to_string(),
            cells: systems
                .iter()
                .map(|system| aggregation.get(key, system).ok().copied())
                .collect(),
        })
        .collect();

    WideTable {
        grouping: grouping.to_string(),
        systems,
        rows,
    }
}

impl WideTable {
    /// Project onto the given systems, in the given order.
    ///
    /// The configured order replaces first-seen order, so legends and
    /// colors stay stable across hardware targets.
    ///
    /// Every selected cell must be populated; the first gap is reported
    /// as a missing key.
    pub fn select<S: AsRef<str>>(&self, systems: &[S]) -> Result<WideTable, AggregateError> {
        let mut columns = Vec::with_capacity(systems.len());
        for system in systems {
            let system = system.as_ref();
            let index = self.system_index(system).ok_or_else(|| AggregateError::MissingKey {
                grouping_key: self
                    .rows
                    .first()
                    .map(|r| r.key.clone())
                    .unwrap_or_default(),
                system: system.to_string(),
            })?;
            columns.push((system, index));
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut cells = Vec::with_capacity(columns.len());
            for &(system, index) in &columns {
                let cell = row.cells.get(index).copied().flatten().ok_or_else(|| {
                    AggregateError::MissingKey {
                        grouping_key: row.key.clone(),
                        system: system.to_string(),
                    }
                })?;
                cells.push(Some(cell));
            }
            rows.push(WideRow {
                key: row.key.clone(),
                cells,
            });
        }

        Ok(WideTable {
            grouping: self.grouping.clone(),
            systems: columns.iter().map(|(s, _)| s.to_string()).collect(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(key: &str, system: &str, metric: f64) -> TrialRecord {
        TrialRecord::new(key, system, metric)
    }

    #[test]
    fn test_aggregate_mean_min_max() {
        let records = vec![rec("q1", "A", 10.0), rec("q1", "A", 20.0), rec("q1", "B", 5.0)];

        let agg = aggregate(&records);
        assert_eq!(agg.len(), 2);

        let a = agg.get("q1", "A").unwrap();
        assert_eq!((a.mean, a.min, a.max), (15.0, 10.0, 20.0));

        let b = agg.get("q1", "B").unwrap();
        assert_eq!((b.mean, b.min, b.max), (5.0, 5.0, 5.0));
    }

    #[test]
    fn test_missing_key_is_error_not_zero() {
        let records = vec![rec("q1", "A", 10.0), rec("q1", "B", 5.0)];
        let agg = aggregate(&records);

        let err = agg.get("q1", "C").unwrap_err();
        assert_eq!(
            err,
            AggregateError::MissingKey {
                grouping_key: "q1".to_string(),
                system: "C".to_string(),
            }
        );
        assert!(err.to_string().contains("'C'"));
        assert!(err.to_string().contains("q1"));
    }

    #[test]
    fn test_system_order_is_first_seen() {
        let records = vec![
            rec("q1", "sqlite", 1.0),
            rec("q1", "duckdb", 2.0),
            rec("q2", "sqlite", 3.0),
            rec("q2", "duckdb", 4.0),
        ];

        let table = pivot(&aggregate(&records), "query");
        assert_eq!(table.systems, vec!["sqlite", "duckdb"]);
    }

    #[test]
    fn test_pivot_one_row_per_key() {
        let records = vec![
            rec("1000", "duckdb", 1.0),
            rec("10", "duckdb", 2.0),
            rec("1000", "sqlite", 3.0),
            rec("10", "duckdb", 4.0),
            rec("100", "sqlite", 5.0),
        ];

        let table = pivot(&aggregate(&records), "records");
        let keys: Vec<&str> = table.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["1000", "10", "100"]);
        assert!(table.rows.iter().all(|r| r.cells.len() == 2));

        // "100" was never measured on duckdb
        assert_eq!(table.rows[2].cells[0], None);
        assert!(table.rows[2].cells[1].is_some());
    }

    #[test]
    fn test_missing_metrics_excluded() {
        let records = vec![
            rec("q1", "A", 10.0),
            TrialRecord::missing("q1", "A"),
            rec("q1", "A", f64::NAN),
            TrialRecord::missing("q2", "B"),
        ];

        let agg = aggregate(&records);
        let a = agg.get("q1", "A").unwrap();
        assert_eq!(a.count, 1);
        assert_eq!(a.mean, 10.0);

        // A group with only missing metrics produces no point at all
        assert!(agg.get("q2", "B").is_err());
        assert_eq!(agg.keys().collect::<Vec<_>>(), vec!["q1"]);
    }

    #[test]
    fn test_statistics_invariants() {
        let values = [3.5, 1.25, 9.0, 4.75, 4.75, 0.5, 12.0];
        let records: Vec<TrialRecord> = values
            .iter()
            .enumerate()
            .map(|(i, v)| rec(if i % 2 == 0 { "even" } else { "odd" }, "A", *v))
            .collect();

        let agg = aggregate(&records);
        for key in agg.keys() {
            let p = agg.get(key, "A").unwrap();
            assert!(p.min <= p.mean && p.mean <= p.max);
            let bar = p.error_bar();
            assert!(bar.lo >= 0.0);
            assert!(bar.hi >= 0.0);
        }
    }

    #[test]
    fn test_require_reports_first_gap() {
        let records = vec![
            rec("q1", "A", 1.0),
            rec("q1", "B", 1.0),
            rec("q2", "A", 1.0),
        ];
        let agg = aggregate(&records);

        assert!(agg.require(&["A"]).is_ok());
        assert_eq!(
            agg.require(&["A", "B"]),
            Err(AggregateError::MissingKey {
                grouping_key: "q2".to_string(),
                system: "B".to_string(),
            })
        );
        assert_eq!(aggregate(&[]).require(&["A"]), Err(AggregateError::Empty));
    }

    #[test]
    fn test_select_reorders_columns() {
        let records = vec![
            rec("q1", "duckdb", 1.0),
            rec("q1", "sqlite", 2.0),
            rec("q1", "sqlite_bloom", 3.0),
        ];
        let table = pivot(&aggregate(&records), "query");

        let selected = table.select(&["sqlite", "duckdb"]).unwrap();
        assert_eq!(selected.systems, vec!["sqlite", "duckdb"]);
        assert_eq!(selected.rows[0].cells[0].map(|p| p.mean), Some(2.0));
        assert_eq!(selected.rows[0].cells[1].map(|p| p.mean), Some(1.0));

        let err = table.select(&["sqlite-WAL"]).unwrap_err();
        assert!(matches!(err, AggregateError::MissingKey { ref system, .. } if system == "sqlite-WAL"));
    }

    #[test]
    fn test_blank_labels_dropped() {
        let records = vec![
            rec("q1", "A", 10.0),
            rec("", "A", 3.0),
            rec("q1", " ", 4.0),
        ];

        let agg = aggregate(&records);
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.keys().collect::<Vec<_>>(), vec!["q1"]);
        assert_eq!(agg.systems().collect::<Vec<_>>(), vec!["A"]);
        assert!(agg.require(&["A"]).is_ok());
    }
}
