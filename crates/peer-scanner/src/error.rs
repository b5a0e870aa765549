use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeerError {
    #[error("Invalid detector parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Input(#[from] CoreError),
}
