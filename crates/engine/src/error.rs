//! The module contains the errors the engine can throw.
//!
//! The errors split into two families:
//!
//! - ledger errors, raised while validating or aggregating entries:
//!   [`Validation`], [`Overflow`], [`Integrity`] and [`Conflict`];
//! - operational errors raised at the storage boundary: [`KeyNotFound`],
//!   [`ExistingKey`], [`Forbidden`], [`InvalidCursor`] and [`Database`].
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Overflow`]: EngineError::Overflow
//!  [`Integrity`]: EngineError::Integrity
//!  [`Conflict`]: EngineError::Conflict
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`InvalidCursor`]: EngineError::InvalidCursor
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A request broke a ledger rule and was rejected whole.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// An arithmetic step left the `i64` minor-unit range.
    #[error("Amount overflow: {0}")]
    Overflow(String),
    /// Stored entries no longer conserve value. Never repaired silently.
    #[error("Ledger integrity violated: {0}")]
    Integrity(String),
    /// The ledger moved between read and write. Safe to retry.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Overflow(a), Self::Overflow(b)) => a == b,
            (Self::Integrity(a), Self::Integrity(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
