//! Error types for the tally engine.

use thiserror::Error;

/// All possible errors from the tally engine.
///
/// Lookups that miss (adjusting or removing an unknown name) are not errors;
/// those operations report the miss through their return value instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("name must not be empty")]
    EmptyName,

    #[error("no user selected")]
    NoUserSelected,

    #[error("nothing left to save: every candidate is excluded")]
    NothingToSave,

    #[error("nothing to undo")]
    NothingToUndo,

    // Persistence errors
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Whether this error was caused by operator input rather than storage.
    ///
    /// Validation errors abort the operation and leave state unchanged.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyName | Error::NoUserSelected | Error::NothingToSave | Error::NothingToUndo
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
