//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when a receipt does not exist.
//! - [`TooManyCandidates`] thrown when a deduction would run the selection
//!   over more eligible receipts than the configured cap.
//! - [`Archive`] thrown when a receipt image cannot be stored or relocated.
//!
//! A duplicate upload is not an error: see [`UploadOutcome`].
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`TooManyCandidates`]: EngineError::TooManyCandidates
//!  [`Archive`]: EngineError::Archive
//!  [`UploadOutcome`]: crate::UploadOutcome
use sea_orm::DbErr;
use thiserror::Error;

use crate::archive::ArchiveError;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid receipt: {0}")]
    InvalidReceipt(String),
    #[error("{count} eligible receipts exceed the selection limit of {limit}")]
    TooManyCandidates { count: usize, limit: usize },
    #[error("Receipt extraction failed: {0}")]
    Extraction(String),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidReceipt(a), Self::InvalidReceipt(b)) => a == b,
            (
                Self::TooManyCandidates { count: a, limit: x },
                Self::TooManyCandidates { count: b, limit: y },
            ) => a == b && x == y,
            (Self::Extraction(a), Self::Extraction(b)) => a == b,
            (Self::Archive(a), Self::Archive(b)) => a.to_string() == b.to_string(),
            (Self::Internal(a), Self::Internal(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
