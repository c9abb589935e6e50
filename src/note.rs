//! Core data structures for the prionotes application.
//!
//! This module contains the `Note` entity and its identifier type.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Priority;

/// Stable identifier of a note.
pub type NoteId = Uuid;

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for the note
    pub id: NoteId,
    /// Note text, stored trimmed
    pub text: String,
    /// Priority driving the display colour
    pub priority: Priority,
    /// When the note was created
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Creates a new note with a fresh id, stamped at `created_at`.
    ///
    /// The text is taken as-is; trimming and validation belong to the store.
    pub fn new(text: String, priority: Priority, created_at: DateTime<Utc>) -> Self {
        Note {
            id: Uuid::new_v4(),
            text,
            priority,
            created_at,
        }
    }
}
