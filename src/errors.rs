//! Error types for the prionotes application.
//!
//! This module defines custom error types that categorize the failures
//! a note store operation can report to its caller.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{NoteId, PersistOp};

/// The main error type for the prionotes application.
#[derive(Error, Debug)]
pub enum NoteError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected input: empty note text or an unknown priority.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: NoteId },

    /// The persistence backend failed while mirroring a mutation.
    #[error("Persistence failed while trying to {op} note {id}: {source}")]
    Persistence {
        op: PersistOp,
        id: NoteId,
        #[source]
        source: Box<NoteError>,
    },

    /// Invalid note format or content.
    #[error("Invalid note format: {message}")]
    InvalidFormat { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    #[error("{message}")]
    EditorError { message: String },

    /// A row number, id or id prefix that matches no note.
    #[error("No note matches '{reference}'")]
    UnknownReference { reference: String },

    /// An id prefix that matches more than one note.
    #[error("'{reference}' matches {matches} notes, use a longer prefix")]
    AmbiguousReference { reference: String, matches: usize },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}

impl NoteError {
    /// Shorthand for building a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        NoteError::Validation {
            message: message.into(),
        }
    }

    /// Returns true for errors the caller should answer by re-prompting the user.
    pub fn is_validation(&self) -> bool {
        matches!(self, NoteError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_errors_keep_their_cause() {
        let id = NoteId::new_v4();
        let err = NoteError::Persistence {
            op: PersistOp::Delete,
            id,
            source: Box::new(NoteError::DirectoryError {
                path: PathBuf::from("/nowhere"),
            }),
        };

        let message = err.to_string();
        assert!(message.contains("delete"));
        assert!(message.contains(&id.to_string()));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_shorthand() {
        let err = NoteError::validation("note text is empty");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation failed: note text is empty");
    }
}
