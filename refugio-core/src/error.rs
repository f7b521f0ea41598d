//! Error types for refugio.

use thiserror::Error;

/// Errors that can occur in refugio operations.
///
/// Date conflicts are not errors: they come back as values
/// (see [`crate::availability::AvailabilityCheck`]).
#[derive(Error, Debug)]
pub enum RefugioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rental unit not found: {0}")]
    UnitNotFound(String),

    #[error("Invalid date range: {0}")]
    InvalidInterval(String),

    #[error("Invalid booking: {0}")]
    Validation(String),

    #[error("Feed fetch failed: {0}")]
    FeedFetch(String),

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Webhook signature rejected: {0}")]
    Signature(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for refugio operations.
pub type RefugioResult<T> = Result<T, RefugioError>;
