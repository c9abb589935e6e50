//! Shared types for the prionotes application.
//!
//! This module contains the crate-wide `Result` alias, the persistence
//! policy types and the CLI subcommands.
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::{NoteError, NoteId, Priority};

/// A specialized Result type for prionotes operations.
pub type Result<T> = std::result::Result<T, NoteError>;

/// The persistence call a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOp {
    Save,
    Delete,
}

impl fmt::Display for PersistOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistOp::Save => f.write_str("save"),
            PersistOp::Delete => f.write_str("delete"),
        }
    }
}

/// How the store treats a failing persistence backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Apply the change in memory, then persist; failures are logged and
    /// recorded but the change stays.
    #[default]
    BestEffort,
    /// Persist first and only apply the change in memory when that succeeds.
    Strict,
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceMode::BestEffort => f.write_str("best_effort"),
            PersistenceMode::Strict => f.write_str("strict"),
        }
    }
}

impl FromStr for PersistenceMode {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(PersistenceMode::BestEffort),
            "strict" => Ok(PersistenceMode::Strict),
            other => Err(NoteError::ConfigError {
                message: format!(
                    "unknown persistence mode '{}', expected best_effort or strict",
                    other
                ),
            }),
        }
    }
}

/// A persistence failure that did not abort the operation that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceFailure {
    /// Which call failed
    pub op: PersistOp,
    /// The note being saved or deleted
    pub id: NoteId,
    /// Rendered error from the backend
    pub message: String,
    /// When the failure was observed
    pub at: DateTime<Utc>,
}

impl PersistenceFailure {
    pub fn new(op: PersistOp, id: NoteId, error: &NoteError) -> Self {
        Self {
            op,
            id,
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

/// Available subcommands for the prionotes application
#[derive(Subcommand)]
pub enum Commands {
    /// Add a new note
    Add {
        /// Text of the note
        text: Option<String>,

        /// Priority of the note: low, medium or high
        #[clap(short, long)]
        priority: Priority,

        /// Write the text in the configured editor
        #[clap(short, long)]
        edit: bool,
    },

    /// List notes, newest first
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Limit the number of notes shown
        #[clap(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show a single note
    Show {
        /// Row number from `list`, note id or unique id prefix
        reference: String,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing note
    Edit {
        /// Row number from `list`, note id or unique id prefix
        reference: String,

        /// New text for the note
        #[clap(short, long)]
        text: Option<String>,

        /// New priority for the note
        #[clap(short, long)]
        priority: Option<Priority>,

        /// Edit the text in the configured editor
        #[clap(short, long)]
        edit: bool,
    },

    /// Delete a note
    Delete {
        /// Row number from `list`, note id or unique id prefix
        reference: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a configuration setting (key=value)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_mode_parses_both_spellings() {
        assert_eq!(
            "best-effort".parse::<PersistenceMode>().unwrap(),
            PersistenceMode::BestEffort
        );
        assert_eq!(
            "STRICT".parse::<PersistenceMode>().unwrap(),
            PersistenceMode::Strict
        );
        assert!("sometimes".parse::<PersistenceMode>().is_err());
    }

    #[test]
    fn persistence_mode_serializes_snake_case() {
        let json = serde_json::to_string(&PersistenceMode::BestEffort).unwrap();
        assert_eq!(json, "\"best_effort\"");
        assert_eq!(PersistenceMode::default(), PersistenceMode::BestEffort);
    }
}
