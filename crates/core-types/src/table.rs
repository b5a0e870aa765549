use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::period::Period;

static NULL_CELL: Cell = Cell::Null;

/// A single value of the long-format input table.
///
/// Untagged, so a JSON row such as `["Repairs", "2025-01", 1200.5, null]`
/// deserializes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Null,
}

impl Cell {
    /// The text used when this cell takes part in a dimension key.
    ///
    /// Nulls become `"N/A"`; integral numbers drop their fractional part so
    /// that a GL code read as `51642102.0` keys the same as `"51642102"`.
    /// Non-finite numbers cannot be keyed.
    pub fn key_text(&self) -> Option<String> {
        match self {
            Cell::Text(text) => Some(text.clone()),
            Cell::Null => Some("N/A".to_string()),
            Cell::Number(n) if !n.is_finite() => None,
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// Reads the cell as an amount. Nulls count as zero.
    pub fn to_amount(&self) -> Result<f64, String> {
        match self {
            Cell::Number(n) if n.is_finite() => Ok(*n),
            Cell::Number(n) => Err(format!("non-finite amount {n}")),
            Cell::Null => Ok(0.0),
            Cell::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| format!("'{text}' is not a number"))
            }
        }
    }

    pub fn to_period(&self) -> Result<Period, String> {
        match self {
            Cell::Text(text) => text.parse::<Period>().map_err(|e| e.to_string()),
            Cell::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
                Ok(Period::Sequence(*n as u32))
            }
            Cell::Number(n) => Err(format!("{n} is not a period index")),
            Cell::Null => Err("period is empty".to_string()),
        }
    }

    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            Cell::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

/// A row-oriented long-format table: named columns, one record per row.
///
/// Rows shorter than the header read as null in their missing positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl LongTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Builder-style variant of `push_row`.
    pub fn with_row(mut self, row: Vec<Cell>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_CELL)
    }

    /// All fields of one row by column name, as carried into peer findings.
    pub fn record(&self, row: usize) -> BTreeMap<String, Cell> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), self.cell(row, idx).clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Where the period of each row comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeriodSource {
    /// A single column holding labels such as `2025-01` or sequence numbers.
    Column(String),
    /// Separate YEAR and MONTH columns combined into a calendar month.
    YearMonth { year: String, month: String },
}

impl PeriodSource {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PeriodSource::Column(name) => vec![name.as_str()],
            PeriodSource::YearMonth { year, month } => vec![year.as_str(), month.as_str()],
        }
    }
}

/// Column roles of a long table: which columns identify a series, which one
/// orders it in time and which one carries the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub dimensions: Vec<String>,
    pub period: PeriodSource,
    pub value: String,
}

impl TableSchema {
    pub fn new<I, S>(dimensions: I, period: impl Into<String>, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            period: PeriodSource::Column(period.into()),
            value: value.into(),
        }
    }

    /// Same schema, keyed by a different set of dimensions.
    pub fn with_dimensions(&self, dimensions: &[String]) -> Self {
        Self {
            dimensions: dimensions.to_vec(),
            ..self.clone()
        }
    }

    /// Every column this schema needs, dimensions first.
    pub fn required_columns(&self) -> Vec<&str> {
        self.dimensions
            .iter()
            .map(String::as_str)
            .chain(self.period.columns())
            .chain(std::iter::once(self.value.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_json_rows() {
        let table: LongTable = serde_json::from_str(
            r#"{"columns": ["GL", "PERIOD", "AMOUNT"],
                "rows": [["Repairs", "2025-01", 1200.5], [51642102, "2025-02", null]]}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), &Cell::Text("Repairs".to_string()));
        assert_eq!(table.cell(1, 0).key_text().as_deref(), Some("51642102"));
        assert_eq!(table.cell(1, 2).to_amount(), Ok(0.0));
    }

    #[test]
    fn short_rows_read_as_null() {
        let table = LongTable::new(["A", "B"]).with_row(vec![Cell::from("x")]);
        assert_eq!(table.cell(0, 1), &Cell::Null);
        assert_eq!(table.cell(5, 0), &Cell::Null);
        assert_eq!(table.record(0).get("B"), Some(&Cell::Null));
    }

    #[test]
    fn key_text_rules() {
        assert_eq!(Cell::Null.key_text().as_deref(), Some("N/A"));
        assert_eq!(Cell::from(12.5).key_text().as_deref(), Some("12.5"));
        assert_eq!(Cell::Number(f64::NAN).key_text(), None);
    }

    #[test]
    fn amounts_reject_text() {
        assert_eq!(Cell::from(" 42.5 ").to_amount(), Ok(42.5));
        assert!(Cell::from("(3,000)").to_amount().is_err());
    }

    #[test]
    fn year_month_schema_lists_both_columns() {
        let schema = TableSchema {
            dimensions: vec!["GL".to_string()],
            period: PeriodSource::YearMonth {
                year: "YEAR".to_string(),
                month: "MONTH".to_string(),
            },
            value: "AMOUNT".to_string(),
        };
        assert_eq!(schema.required_columns(), vec!["GL", "YEAR", "MONTH", "AMOUNT"]);
    }
}
