use core_types::{CoreError, DimensionKey, LongTable, Observation, Period, TableSchema};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::columns;
use crate::pivot::{Pivot, PivotRow};

/// One logical series: a unique key and its observations in period order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionGroup {
    pub key: DimensionKey,
    /// `(period, summed value)`, ascending by period, periods unique.
    pub observations: Vec<(Period, f64)>,
}

impl DimensionGroup {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|(_, v)| *v)
    }
}

/// A long table reduced to one value per `(dimension key, period)`.
///
/// Values of rows sharing a key and period are summed. Groups are sorted by
/// key, so iteration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedFrame {
    dimensions: Vec<String>,
    groups: Vec<DimensionGroup>,
}

impl AggregatedFrame {
    /// Validates `table` against `schema` and aggregates it.
    ///
    /// Missing columns are reported before any row is read. A row with an
    /// unusable key, period or value fails the whole aggregation.
    pub fn from_table(table: &LongTable, schema: &TableSchema) -> Result<Self, CoreError> {
        let cols = columns::resolve(table, schema)?;

        let mut sums: BTreeMap<DimensionKey, BTreeMap<Period, f64>> = BTreeMap::new();
        for row in 0..table.len() {
            let key = cols.key_or_err(table, row)?;
            let period = cols.period(table, row)?;
            let value = cols.value(table, row)?;
            *sums.entry(key).or_default().entry(period).or_insert(0.0) += value;
        }

        let groups: Vec<DimensionGroup> = sums
            .into_iter()
            .map(|(key, series)| DimensionGroup {
                key,
                observations: series.into_iter().collect(),
            })
            .collect();

        info!(
            rows = table.len(),
            groups = groups.len(),
            "Aggregated long table by {:?}",
            schema.dimensions
        );

        Ok(Self {
            dimensions: schema.dimensions.clone(),
            groups,
        })
    }

    /// Builds a frame from observations that are already aggregated or need
    /// summing; duplicates of the same key and period are added together.
    pub fn from_observations<I>(dimensions: Vec<String>, observations: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut sums: BTreeMap<DimensionKey, BTreeMap<Period, f64>> = BTreeMap::new();
        for obs in observations {
            *sums.entry(obs.key).or_default().entry(obs.period).or_insert(0.0) += obs.value;
        }
        Self {
            dimensions,
            groups: sums
                .into_iter()
                .map(|(key, series)| DimensionGroup {
                    key,
                    observations: series.into_iter().collect(),
                })
                .collect(),
        }
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn groups(&self) -> &[DimensionGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of `(key, period)` observations.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.observations.len()).sum()
    }

    /// Every period present in any group, ascending.
    pub fn periods(&self) -> Vec<Period> {
        self.groups
            .iter()
            .flat_map(|g| g.observations.iter().map(|(p, _)| *p))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.groups.iter().flat_map(|g| {
            g.observations.iter().map(|(period, value)| Observation {
                key: g.key.clone(),
                period: *period,
                value: *value,
            })
        })
    }

    /// Pivots to one row per group and one column per period, filling absent
    /// combinations with 0.
    pub fn pivot(&self) -> Pivot {
        let periods = self.periods();
        let position: BTreeMap<Period, usize> =
            periods.iter().enumerate().map(|(i, p)| (*p, i)).collect();

        let rows = self
            .groups
            .iter()
            .map(|group| {
                let mut values = vec![0.0; periods.len()];
                for (period, value) in &group.observations {
                    if let Some(&idx) = position.get(period) {
                        values[idx] = *value;
                    }
                }
                PivotRow {
                    key: group.key.clone(),
                    values,
                }
            })
            .collect();

        debug!(groups = self.groups.len(), periods = periods.len(), "Pivoted frame");
        Pivot::new(self.dimensions.clone(), periods, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Cell;

    fn ledger() -> LongTable {
        LongTable::new(["GL_NAME", "PERIOD", "VALUE"])
            .with_row(vec!["Repairs".into(), "2025-02".into(), 100.0.into()])
            .with_row(vec!["Repairs".into(), "2025-01".into(), 40.0.into()])
            .with_row(vec!["Repairs".into(), "2025-01".into(), 60.0.into()])
            .with_row(vec!["Fuel".into(), "2025-03".into(), Cell::Null])
            .with_row(vec!["Fuel".into(), "2025-01".into(), (-5.0).into()])
    }

    fn schema() -> TableSchema {
        TableSchema::new(["GL_NAME"], "PERIOD", "VALUE")
    }

    #[test]
    fn sums_duplicates_and_sorts() {
        let frame = AggregatedFrame::from_table(&ledger(), &schema()).unwrap();
        let jan = Period::month(2025, 1).unwrap();
        let feb = Period::month(2025, 2).unwrap();
        let mar = Period::month(2025, 3).unwrap();

        assert_eq!(frame.groups().len(), 2);
        assert_eq!(frame.groups()[0].key, DimensionKey::new(["Fuel"]));
        assert_eq!(frame.groups()[0].observations, vec![(jan, -5.0), (mar, 0.0)]);
        assert_eq!(frame.groups()[1].observations, vec![(jan, 100.0), (feb, 100.0)]);
        assert_eq!(frame.periods(), vec![jan, feb, mar]);
        assert_eq!(frame.len(), 4);
    }

    #[test]
    fn pivot_fills_absent_cells_with_zero() {
        let pivot = AggregatedFrame::from_table(&ledger(), &schema()).unwrap().pivot();
        assert_eq!(pivot.rows[0].values, vec![-5.0, 0.0, 0.0]);
        assert_eq!(pivot.rows[1].values, vec![100.0, 100.0, 0.0]);
    }

    #[test]
    fn missing_columns_fail_before_rows_are_read() {
        // The bad value in row 0 would fail too; the shape error must win.
        let table = LongTable::new(["GL_NAME", "VALUE"]).with_row(vec!["A".into(), "oops".into()]);
        let err = AggregatedFrame::from_table(&table, &schema()).unwrap_err();
        assert_eq!(err, CoreError::MissingColumns(vec!["PERIOD".to_string()]));
    }

    #[test]
    fn bad_value_names_row_and_column() {
        let table = LongTable::new(["GL_NAME", "PERIOD", "VALUE"])
            .with_row(vec!["A".into(), "2025-01".into(), "n/a".into()]);
        let err = AggregatedFrame::from_table(&table, &schema()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCell { ref column, row: 0, .. } if column == "VALUE"));
    }

    #[test]
    fn empty_table_gives_empty_frame() {
        let table = LongTable::new(["GL_NAME", "PERIOD", "VALUE"]);
        let frame = AggregatedFrame::from_table(&table, &schema()).unwrap();
        assert!(frame.is_empty());
        assert!(frame.pivot().is_empty());
    }
}
