use core_types::{CoreError, DimensionKey, LongTable, Period, PeriodMode};
use serde::Serialize;
use tracing::debug;

/// Non-period columns a crosstab export may carry next to the period headers:
/// a previous run's status column and row totals.
pub const IGNORED_CROSSTAB_COLUMNS: [&str; 4] = ["ANOMALY_STATUS", "Total", "SUM", "ผลรวม"];

/// One row of a pivot: a dimension key and one value per period column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub key: DimensionKey,
    pub values: Vec<f64>,
}

/// A wide table: one row per dimension group, one column per period in
/// ascending order, no gaps (absent combinations hold 0).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pivot {
    pub dimensions: Vec<String>,
    pub periods: Vec<Period>,
    pub rows: Vec<PivotRow>,
}

impl Pivot {
    pub fn new(dimensions: Vec<String>, periods: Vec<Period>, rows: Vec<PivotRow>) -> Self {
        Self {
            dimensions,
            periods,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.periods.is_empty()
    }

    /// Reads an already-pivoted table whose non-dimension columns are period
    /// headers.
    ///
    /// Headers are read as calendar months when `PeriodMode::detect` says so,
    /// otherwise they are numbered by position. Status and total columns
    /// (`IGNORED_CROSSTAB_COLUMNS`) are dropped before detection. Columns are
    /// reordered by period; blank amounts become 0.
    pub fn from_crosstab(table: &LongTable, dimensions: &[String]) -> Result<Self, CoreError> {
        let missing: Vec<String> = dimensions
            .iter()
            .filter(|d| table.column_index(d).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::MissingColumns(missing));
        }

        let period_columns: Vec<(usize, &str)> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                !dimensions.contains(name) && !IGNORED_CROSSTAB_COLUMNS.contains(&name.as_str())
            })
            .map(|(idx, name)| (idx, name.as_str()))
            .collect();
        let headers: Vec<&str> = period_columns.iter().map(|(_, name)| *name).collect();
        let mode = PeriodMode::detect(&headers);
        debug!(?mode, columns = headers.len(), "Detected crosstab period headers");

        let mut columns: Vec<(Period, usize)> = period_columns
            .iter()
            .enumerate()
            .map(|(position, (idx, name))| {
                Period::from_header(name, position, mode).map(|period| (period, *idx))
            })
            .collect::<Result<_, _>>()?;
        columns.sort_by_key(|(period, _)| *period);

        let dimension_idx: Vec<usize> = dimensions
            .iter()
            .filter_map(|d| table.column_index(d))
            .collect();

        let rows = (0..table.len())
            .map(|row| {
                let key = dimension_idx
                    .iter()
                    .map(|&idx| table.cell(row, idx).key_text())
                    .collect::<Option<Vec<_>>>()
                    .map(DimensionKey)
                    .ok_or_else(|| CoreError::InvalidCell {
                        column: dimensions.join("|"),
                        row,
                        reason: "dimension value cannot be used as a key".to_string(),
                    })?;
                let values = columns
                    .iter()
                    .map(|(_, idx)| {
                        table.cell(row, *idx).to_amount().map_err(|reason| CoreError::InvalidCell {
                            column: table.columns[*idx].clone(),
                            row,
                            reason,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PivotRow { key, values })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(Self {
            dimensions: dimensions.to_vec(),
            periods: columns.into_iter().map(|(period, _)| period).collect(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Cell;

    #[test]
    fn reads_date_headers_in_period_order() {
        let table = LongTable::new(["GL", "2025-02", "2025-01"])
            .with_row(vec!["A".into(), 20.0.into(), 10.0.into()])
            .with_row(vec!["B".into(), Cell::Null, 5.0.into()]);
        let pivot = Pivot::from_crosstab(&table, &["GL".to_string()]).unwrap();

        assert_eq!(
            pivot.periods,
            vec![Period::month(2025, 1).unwrap(), Period::month(2025, 2).unwrap()]
        );
        assert_eq!(pivot.rows[0].values, vec![10.0, 20.0]);
        assert_eq!(pivot.rows[1].values, vec![5.0, 0.0]);
    }

    #[test]
    fn label_headers_are_sequential() {
        let table = LongTable::new(["GL", "Jan", "Feb", "Mar"])
            .with_row(vec!["A".into(), 1.0.into(), 2.0.into(), 3.0.into()]);
        let pivot = Pivot::from_crosstab(&table, &["GL".to_string()]).unwrap();
        assert_eq!(
            pivot.periods,
            vec![Period::Sequence(1), Period::Sequence(2), Period::Sequence(3)]
        );
        assert_eq!(pivot.rows[0].values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn total_column_is_not_a_sequential_period() {
        let table = LongTable::new(["GL", "Jan", "Feb", "Mar", "Total"])
            .with_row(vec!["A".into(), 1.0.into(), 2.0.into(), 3.0.into(), 6.0.into()]);
        let pivot = Pivot::from_crosstab(&table, &["GL".to_string()]).unwrap();
        assert_eq!(
            pivot.periods,
            vec![Period::Sequence(1), Period::Sequence(2), Period::Sequence(3)]
        );
        assert_eq!(pivot.rows[0].values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn status_and_total_columns_are_skipped_in_date_mode() {
        let table = LongTable::new(["GL", "2025-01", "2025-02", "Total", "ANOMALY_STATUS", "ผลรวม"])
            .with_row(vec![
                "A".into(),
                10.0.into(),
                20.0.into(),
                30.0.into(),
                "NORMAL".into(),
                30.0.into(),
            ]);
        let pivot = Pivot::from_crosstab(&table, &["GL".to_string()]).unwrap();
        assert_eq!(
            pivot.periods,
            vec![Period::month(2025, 1).unwrap(), Period::month(2025, 2).unwrap()]
        );
        assert_eq!(pivot.rows[0].values, vec![10.0, 20.0]);
    }

    #[test]
    fn missing_dimension_column() {
        let table = LongTable::new(["GL", "2025-01"]);
        let err = Pivot::from_crosstab(&table, &["COST_CENTER".to_string()]).unwrap_err();
        assert_eq!(err, CoreError::MissingColumns(vec!["COST_CENTER".to_string()]));
    }
}
