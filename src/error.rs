use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DfError {
    #[error("Insufficient data: need {needed} points, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("Bearings are parallel, no intersection")]
    ParallelBearings,

    #[error("Source coincides with a station")]
    CoincidentSource,

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown board: {0}")]
    UnknownBoard(String),

    #[error("Malformed message: {0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, DfError>;
