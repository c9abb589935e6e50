use std::{collections::HashSet, fs, path::Path};

use log::{debug, error, trace, warn};

use crate::{NoteError, Note, Result};

/// Trims note text and rejects it when nothing is left.
pub fn normalize_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NoteError::validation("note text must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Helper method to load a single note from file
pub fn load_note_from_file(path: &Path) -> Result<Note> {
    debug!("Loading note from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to open note file {}: {}", path.display(), e);
        NoteError::Io(e)
    })?;

    let note: Note = serde_json::from_str(&content)?;

    // Validate note
    if note.text.trim().is_empty() {
        let error_mgs = format!("Note from {} has empty text", path.display());
        error!("{}", error_mgs);
        return Err(NoteError::InvalidFormat { message: error_mgs });
    }

    trace!("Successfully loaded note: {}", note.id);
    Ok(note)
}

/// Orders notes newest first and drops records that break the store invariants.
///
/// Duplicate ids keep their first occurrence. The sort is stable, so notes
/// sharing a timestamp keep the order the backend returned them in.
pub fn sanitize_loaded(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    let mut kept: Vec<Note> = notes
        .into_iter()
        .filter(|note| {
            if note.text.trim().is_empty() {
                warn!("Skipping note {} with empty text", note.id);
                return false;
            }
            if !seen.insert(note.id) {
                warn!("Skipping duplicate note {}", note.id);
                return false;
            }
            true
        })
        .collect();

    kept.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    kept
}

/// Shortens text to a single-line preview of at most `max_chars` characters.
pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
