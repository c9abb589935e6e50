use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::{load_note_from_file, Note, NoteError, NoteId, PersistenceAdapter, Result};

/// Stores each note as a pretty-printed JSON document on disk.
///
/// Layout: `notes_dir/<first 2 chars of id>/<id>.json`. Writes go through a
/// temporary file in the target directory and are renamed into place, so a
/// crash never leaves a half-written note behind.
#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    /// Root directory holding the note documents
    notes_dir: PathBuf,
}

impl JsonFileAdapter {
    /// Creates an adapter rooted at `notes_dir`, creating the directory if needed.
    pub fn open(notes_dir: impl Into<PathBuf>) -> Result<Self> {
        let notes_dir = notes_dir.into();

        if !notes_dir.exists() {
            debug!(
                "Notes directory does not exist, creating: {}",
                notes_dir.display()
            );
            fs::create_dir_all(&notes_dir).map_err(|e| {
                error!("Failed to create notes directory: {}", e);
                NoteError::DirectoryError {
                    path: notes_dir.clone(),
                }
            })?;
        }

        info!("Using notes directory {}", notes_dir.display());
        Ok(Self { notes_dir })
    }

    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    /// Helper method to get the file path for a note
    pub fn note_path(&self, note_id: &NoteId) -> PathBuf {
        let id = note_id.to_string();
        self.notes_dir
            .join(&id[0..2])
            .join(format!("{}.json", id))
    }

    /// Removes `dir_path` and its parents up to the notes root while they are empty.
    fn cleanup_empty_directory(&self, dir_path: &Path) {
        // Skip if this is the root notes directory or doesn't exist
        if !dir_path.exists() || dir_path == self.notes_dir {
            return;
        }

        match fs::read_dir(dir_path) {
            Ok(entries) => {
                if entries.count() == 0 {
                    debug!("Removing empty directory: {}", dir_path.display());
                    match fs::remove_dir(dir_path) {
                        Ok(_) => {
                            if let Some(parent) = dir_path.parent() {
                                if parent != self.notes_dir {
                                    self.cleanup_empty_directory(parent);
                                }
                            }
                        }
                        Err(e) => warn!(
                            "Failed to remove empty directory {}: {}",
                            dir_path.display(),
                            e
                        ),
                    }
                }
            }
            Err(e) => warn!("Failed to read directory {}: {}", dir_path.display(), e),
        }
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    /// Loads all notes from disk, skipping files that fail to parse
    fn fetch_all(&self) -> Result<Vec<Note>> {
        if !self.notes_dir.exists() {
            fs::create_dir_all(&self.notes_dir).map_err(NoteError::Io)?;
            info!("Created notes directory: {}", self.notes_dir.display());
            return Ok(Vec::new());
        }

        let mut notes = Vec::new();
        let mut load_errors = 0usize;

        for entry in WalkDir::new(&self.notes_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                match load_note_from_file(path) {
                    Ok(note) => notes.push(note),
                    Err(e) => {
                        warn!("Failed to load note from {}: {}", path.display(), e);
                        load_errors += 1;
                    }
                }
            }
        }

        if load_errors > 0 {
            error!("Encountered {} errors while loading notes", load_errors);
        }

        info!(
            "Loaded {} notes from {}",
            notes.len(),
            self.notes_dir.display()
        );
        Ok(notes)
    }

    /// Saves a note using an atomic replace to prevent data corruption
    fn save(&mut self, note: &Note) -> Result<()> {
        info!("Saving note: {}", note.id);

        let file_path = self.note_path(&note.id);
        debug!("File path for note: {}", file_path.display());

        let dir = match file_path.parent() {
            Some(parent) => parent,
            None => self.notes_dir.as_path(),
        };
        if !dir.exists() {
            debug!("Creating parent directory: {}", dir.display());
            fs::create_dir_all(dir).map_err(|e| {
                error!("Failed to create directory {}: {}", dir.display(), e);
                NoteError::Io(e)
            })?;
        }

        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            NoteError::Io(e)
        })?;

        trace!("Serializing note to JSON");
        let json = serde_json::to_string_pretty(note).map_err(|e| {
            error!("Failed to serialize note: {}", e);
            NoteError::Serialization(e)
        })?;

        temp_file.write_all(json.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            NoteError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            NoteError::Io(e)
        })?;

        debug!("Performing atomic move of temporary file to final location");
        temp_file.persist(&file_path).map_err(|e| {
            error!(
                "Failed to persist file {}: {}",
                file_path.display(),
                e.error
            );
            NoteError::Io(e.error)
        })?;

        info!("Note saved successfully: {}", note.id);
        Ok(())
    }

    fn delete(&mut self, id: &NoteId) -> Result<()> {
        info!("Deleting note: {}", id);
        let file_path = self.note_path(id);

        if !file_path.exists() {
            debug!("Note file doesn't exist on disk: {}", file_path.display());
            return Ok(());
        }

        fs::remove_file(&file_path).map_err(|e| {
            error!(
                "Failed to delete note file {}: {}",
                file_path.display(),
                e
            );
            NoteError::Io(e)
        })?;

        if let Some(parent) = file_path.parent() {
            self.cleanup_empty_directory(parent);
        }

        info!("Note {} successfully deleted", id);
        Ok(())
    }
}
