//! Persistence backends for the note store.
//!
//! The store owns the canonical collection; an adapter only mirrors it.
//! Backends ship for volatile memory (`MemoryAdapter`), JSON files
//! (`JsonFileAdapter`) and asynchronous writes (`WriteBehind`).

use log::{debug, trace};

use crate::{Note, NoteError, NoteId, PersistenceFailure, Result};

/// Durable storage the note store mirrors its mutations to.
pub trait PersistenceAdapter: Send {
    /// Loads every stored note, in any order.
    fn fetch_all(&self) -> Result<Vec<Note>>;

    /// Creates or replaces the stored copy of `note`, keyed by its id.
    fn save(&mut self, note: &Note) -> Result<()>;

    /// Removes the stored copy of a note. Absent ids are not an error.
    fn delete(&mut self, id: &NoteId) -> Result<()>;

    /// Failures the backend observed after a call had already returned.
    ///
    /// Synchronous backends report through their return values and keep the
    /// default.
    fn drain_failures(&mut self) -> Vec<PersistenceFailure> {
        Vec::new()
    }

    /// True when `save` and `delete` return before the write has happened.
    ///
    /// Such a backend cannot report a failure in time to block the change,
    /// so the store refuses to run it in strict mode.
    fn defers_writes(&self) -> bool {
        false
    }
}

impl<A: PersistenceAdapter + ?Sized> PersistenceAdapter for Box<A> {
    fn fetch_all(&self) -> Result<Vec<Note>> {
        (**self).fetch_all()
    }

    fn save(&mut self, note: &Note) -> Result<()> {
        (**self).save(note)
    }

    fn delete(&mut self, id: &NoteId) -> Result<()> {
        (**self).delete(id)
    }

    fn drain_failures(&mut self) -> Vec<PersistenceFailure> {
        (**self).drain_failures()
    }

    fn defers_writes(&self) -> bool {
        (**self).defers_writes()
    }
}

/// Volatile backend keeping notes in process memory.
///
/// Writes can be switched to fail, which lets callers exercise the store's
/// failure handling without touching a disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryAdapter {
    notes: Vec<Note>,
    fail_writes: bool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing set of stored notes.
    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes,
            fail_writes: false,
        }
    }

    /// Makes every following `save` and `delete` fail (or succeed again).
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of stored notes.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.notes.iter().any(|note| &note.id == id)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(NoteError::ApplicationError {
                message: "memory backend is rejecting writes".to_string(),
            });
        }
        Ok(())
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn fetch_all(&self) -> Result<Vec<Note>> {
        trace!("Fetching {} notes from memory", self.notes.len());
        Ok(self.notes.clone())
    }

    fn save(&mut self, note: &Note) -> Result<()> {
        self.check_writable()?;
        match self.notes.iter_mut().find(|stored| stored.id == note.id) {
            Some(stored) => *stored = note.clone(),
            None => self.notes.push(note.clone()),
        }
        debug!("Saved note {} in memory", note.id);
        Ok(())
    }

    fn delete(&mut self, id: &NoteId) -> Result<()> {
        self.check_writable()?;
        self.notes.retain(|note| &note.id != id);
        debug!("Deleted note {} from memory", id);
        Ok(())
    }
}
