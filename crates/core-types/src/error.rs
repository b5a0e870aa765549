use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Input table is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid cell in column '{column}' at row {row}: {reason}")]
    InvalidCell {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("Unrecognised period label '{0}'")]
    InvalidPeriod(String),

    #[error("Unknown anomaly status '{0}'")]
    UnknownStatus(String),
}
