use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// An ordinal time bucket.
///
/// Calendar tables carry `Month` (always stored as the first day of the month);
/// tables whose period headers are plain labels (`1, 2, 3` or month names)
/// carry `Sequence`, numbered by position. Both orders are total, so periods
/// can be sorted and used as map keys directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Period {
    Month(NaiveDate),
    Sequence(u32),
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

impl Period {
    /// Builds a calendar period from separate YEAR / MONTH values.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Period::Month)
    }

    /// Parses a period from a crosstab column header.
    ///
    /// In sequential mode the header text is ignored and the period is the
    /// 1-based column position.
    pub fn from_header(header: &str, position: usize, mode: PeriodMode) -> Result<Self, CoreError> {
        match mode {
            PeriodMode::Date => {
                parse_calendar(header.trim()).ok_or_else(|| CoreError::InvalidPeriod(header.to_string()))
            }
            PeriodMode::Sequential => u32::try_from(position + 1)
                .map(Period::Sequence)
                .map_err(|_| CoreError::InvalidPeriod(header.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month(date) => write!(f, "{}", date.format("%Y-%m")),
            Period::Sequence(n) => write!(f, "P{}", n),
        }
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let trimmed = label.trim();
        if let Some(rest) = trimmed.strip_prefix(['P', 'p']) {
            if let Ok(n) = rest.parse::<u32>() {
                return Ok(Period::Sequence(n));
            }
        }
        if let Ok(n) = trimmed.parse::<u32>() {
            return Ok(Period::Sequence(n));
        }
        parse_calendar(trimmed).ok_or_else(|| CoreError::InvalidPeriod(label.to_string()))
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

impl TryFrom<String> for Period {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn parse_calendar(label: &str) -> Option<Period> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(label, format) {
            return Period::month(date.year(), date.month());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(label, format) {
            return Period::month(stamp.year(), stamp.month());
        }
    }
    // Year-month only: "2025-01", "2025/1".
    let (year, month) = label.split_once(['-', '/'])?;
    if year.len() != 4 {
        return None;
    }
    Period::month(year.parse().ok()?, month.parse().ok()?)
}

/// How the period headers of a crosstab should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMode {
    Date,
    Sequential,
}

impl PeriodMode {
    /// Guesses the mode from a set of headers: the table is calendar-based as
    /// soon as one header contains `-` or `/` and parses as a date.
    ///
    /// This heuristic is known to misjudge short numeric headers; it is kept
    /// for compatibility with existing upload configurations.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> PeriodMode {
        if headers.iter().any(|h| is_date_header(h.as_ref())) {
            PeriodMode::Date
        } else {
            PeriodMode::Sequential
        }
    }
}

pub fn is_date_header(header: &str) -> bool {
    let header = header.trim();
    (header.contains('-') || header.contains('/')) && parse_calendar(header).is_some()
}
