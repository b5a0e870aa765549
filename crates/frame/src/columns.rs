use core_types::{CoreError, DimensionKey, LongTable, Period, PeriodSource, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeriodColumns {
    Single(usize),
    YearMonth { year: usize, month: usize },
}

/// Column positions of a schema, resolved against one table.
///
/// Obtained through `resolve`, which checks every required column up front so
/// that no per-row work starts on a table with the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    dimension_names: Vec<String>,
    dimensions: Vec<usize>,
    period: PeriodColumns,
    value_name: String,
    value: usize,
}

/// Resolves every column `schema` needs, failing with the full list of the
/// ones that are missing.
pub fn resolve(table: &LongTable, schema: &TableSchema) -> Result<ResolvedColumns, CoreError> {
    let missing: Vec<String> = schema
        .required_columns()
        .into_iter()
        .filter(|name| table.column_index(name).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::MissingColumns(missing));
    }

    // Presence is established above.
    let index = |name: &str| table.column_index(name).unwrap_or_default();

    let period = match &schema.period {
        PeriodSource::Column(name) => PeriodColumns::Single(index(name)),
        PeriodSource::YearMonth { year, month } => PeriodColumns::YearMonth {
            year: index(year),
            month: index(month),
        },
    };

    Ok(ResolvedColumns {
        dimension_names: schema.dimensions.clone(),
        dimensions: schema.dimensions.iter().map(|d| index(d)).collect(),
        period,
        value_name: schema.value.clone(),
        value: index(&schema.value),
    })
}

impl ResolvedColumns {
    pub fn dimension_names(&self) -> &[String] {
        &self.dimension_names
    }

    /// The dimension key of a row, or `None` when one of its dimension cells
    /// cannot be rendered as text. With no dimensions every row keys as `ALL`.
    pub fn key(&self, table: &LongTable, row: usize) -> Option<DimensionKey> {
        if self.dimensions.is_empty() {
            return Some(DimensionKey::all());
        }
        self.dimensions
            .iter()
            .map(|&idx| table.cell(row, idx).key_text())
            .collect::<Option<Vec<_>>>()
            .map(DimensionKey)
    }

    /// Like `key`, but reports the offending cell as an error.
    pub fn key_or_err(&self, table: &LongTable, row: usize) -> Result<DimensionKey, CoreError> {
        self.key(table, row).ok_or_else(|| {
            let column = self
                .dimensions
                .iter()
                .zip(&self.dimension_names)
                .find(|(idx, _)| table.cell(row, **idx).key_text().is_none())
                .map(|(_, name)| name.clone())
                .unwrap_or_default();
            CoreError::InvalidCell {
                column,
                row,
                reason: "dimension value cannot be used as a key".to_string(),
            }
        })
    }

    pub fn value(&self, table: &LongTable, row: usize) -> Result<f64, CoreError> {
        table
            .cell(row, self.value)
            .to_amount()
            .map_err(|reason| CoreError::InvalidCell {
                column: self.value_name.clone(),
                row,
                reason,
            })
    }

    pub fn period(&self, table: &LongTable, row: usize) -> Result<Period, CoreError> {
        let invalid = |column: usize, reason: String| CoreError::InvalidCell {
            column: table.columns.get(column).cloned().unwrap_or_default(),
            row,
            reason,
        };

        match self.period {
            PeriodColumns::Single(idx) => table
                .cell(row, idx)
                .to_period()
                .map_err(|reason| invalid(idx, reason)),
            PeriodColumns::YearMonth { year, month } => {
                let y = table
                    .cell(row, year)
                    .to_integer()
                    .ok_or_else(|| invalid(year, "year is not an integer".to_string()))?;
                let m = table
                    .cell(row, month)
                    .to_integer()
                    .ok_or_else(|| invalid(month, "month is not an integer".to_string()))?;
                i32::try_from(y)
                    .ok()
                    .zip(u32::try_from(m).ok())
                    .and_then(|(y, m)| Period::month(y, m))
                    .ok_or_else(|| invalid(month, format!("{y}-{m} is not a calendar month")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Cell;

    fn table() -> LongTable {
        LongTable::new(["GL_NAME", "GL_CODE", "YEAR", "MONTH", "VALUE"])
            .with_row(vec!["Repairs".into(), 51642102.into(), 2025.into(), 3.into(), 1500.0.into()])
            .with_row(vec![Cell::Null, "X1".into(), "2025".into(), "13".into(), "12.5".into()])
    }

    fn year_month_schema(dimensions: &[&str]) -> TableSchema {
        TableSchema {
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            period: PeriodSource::YearMonth {
                year: "YEAR".to_string(),
                month: "MONTH".to_string(),
            },
            value: "VALUE".to_string(),
        }
    }

    #[test]
    fn names_every_missing_column() {
        let schema = TableSchema::new(["GL_NAME", "COST_CENTER"], "PERIOD", "AMOUNT");
        let err = resolve(&table(), &schema).unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingColumns(vec![
                "COST_CENTER".to_string(),
                "PERIOD".to_string(),
                "AMOUNT".to_string()
            ])
        );
        assert!(err.to_string().contains("COST_CENTER, PERIOD, AMOUNT"));
    }

    #[test]
    fn reads_key_value_and_year_month_period() {
        let table = table();
        let cols = resolve(&table, &year_month_schema(&["GL_NAME", "GL_CODE"])).unwrap();

        assert_eq!(cols.key(&table, 0), Some(DimensionKey::new(["Repairs", "51642102"])));
        assert_eq!(cols.key(&table, 1), Some(DimensionKey::new(["N/A", "X1"])));
        assert_eq!(cols.value(&table, 1), Ok(12.5));
        assert_eq!(cols.period(&table, 0), Ok(Period::month(2025, 3).unwrap()));

        let err = cols.period(&table, 1).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCell { ref column, row: 1, .. } if column == "MONTH"));
    }

    #[test]
    fn no_dimensions_means_single_key() {
        let table = table();
        let cols = resolve(&table, &year_month_schema(&[])).unwrap();
        assert_eq!(cols.key(&table, 1), Some(DimensionKey::all()));
    }

    #[test]
    fn non_finite_dimension_is_reported() {
        let table = LongTable::new(["D", "PERIOD", "VALUE"])
            .with_row(vec![Cell::Number(f64::INFINITY), "2025-01".into(), 1.0.into()]);
        let cols = resolve(&table, &TableSchema::new(["D"], "PERIOD", "VALUE")).unwrap();
        assert_eq!(cols.key(&table, 0), None);
        assert!(matches!(
            cols.key_or_err(&table, 0),
            Err(CoreError::InvalidCell { ref column, .. }) if column == "D"
        ));
    }
}
