//! Errors
//!
//! Custom error types used throughout the `boostdist` crate.
use thiserror::Error;

/// Errors that can occur while constructing or running a distribution strategy.
#[derive(Debug, Error)]
pub enum DistributionError {
    /// Unknown distribution family, or a dataset the family cannot model.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// Inputs violate the calling contract (lengths, weights, node indices).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A computation produced NaN or an infinite value.
    #[error("Non-finite value produced in {operation} at index {index}.")]
    NonFinite { operation: &'static str, index: usize },
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Configuration could not be read.
    #[error("Unable to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}
