//! Input validation errors.

use thiserror::Error;

/// Rejected caller input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("data key {0:?} is reserved")]
    ReservedDataKey(String),
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}
