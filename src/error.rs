//! Error types for the projection engine

use thiserror::Error;

/// Errors raised by the projection engine and its input boundary
#[derive(Debug, Error)]
pub enum EngineError {
    /// Retirement age is not below the life expectancy, so there is nothing to simulate
    #[error("invalid simulation period: retirement age {retirement_age} must be below max age {max_age}")]
    InvalidPeriod { retirement_age: u32, max_age: u32 },

    /// Input failed validation at the boundary
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Pension-split optimizer cannot run with the requested configuration
    #[error("invalid optimizer configuration: {0}")]
    InvalidOptimizer(String),

    /// Monte Carlo was asked for zero trials
    #[error("monte carlo requires at least one run")]
    InvalidRunCount,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed value in a table file
    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
