//! The authoritative, newest-first collection of notes.
//!
//! `NoteStore` is the single owner of the notes. Every mutation takes
//! `&mut self`, validates and looks up before touching anything, and then
//! mirrors the change to the injected `PersistenceAdapter` according to the
//! configured `PersistenceMode`.

use chrono::{Duration, Utc};
use log::{debug, error, info, warn};

use crate::{
    normalize_text, sanitize_loaded, MemoryAdapter, Note, NoteError, NoteId, PersistOp,
    PersistenceAdapter, PersistenceFailure, PersistenceMode, Priority, Result,
};

/// Owns the ordered note collection and mirrors it to a persistence backend.
pub struct NoteStore<P: PersistenceAdapter> {
    /// Notes, newest first
    notes: Vec<Note>,

    /// Backend every mutation is mirrored to
    adapter: P,

    /// What to do when the backend fails
    mode: PersistenceMode,

    /// Failures swallowed in best-effort mode, oldest first
    failures: Vec<PersistenceFailure>,
}

impl NoteStore<MemoryAdapter> {
    /// An empty store whose notes live only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            notes: Vec::new(),
            adapter: MemoryAdapter::new(),
            mode: PersistenceMode::default(),
            failures: Vec::new(),
        }
    }
}

impl<P: PersistenceAdapter> NoteStore<P> {
    /// Opens a store over `adapter`, loading whatever it already holds.
    ///
    /// Stored notes with blank text or a repeated id are skipped with a warning.
    /// Strict mode is refused over a backend that defers its writes, since
    /// such a backend cannot fail a write before the change is applied.
    pub fn open(adapter: P, mode: PersistenceMode) -> Result<Self> {
        if mode == PersistenceMode::Strict && adapter.defers_writes() {
            return Err(NoteError::ConfigError {
                message: "strict persistence needs a backend that writes synchronously"
                    .to_string(),
            });
        }

        let mut store = Self {
            notes: Vec::new(),
            adapter,
            mode,
            failures: Vec::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Replaces the in-memory collection with a fresh load from the backend.
    ///
    /// Returns the number of notes loaded. A write-behind backend refuses the
    /// load while writes are still queued, because those notes would be
    /// missing from it; the collection is left as it was in that case.
    pub fn reload(&mut self) -> Result<usize> {
        let fetched = self.adapter.fetch_all()?;
        let fetched_count = fetched.len();
        self.notes = sanitize_loaded(fetched);

        if self.notes.len() != fetched_count {
            warn!(
                "Dropped {} invalid notes while loading",
                fetched_count - self.notes.len()
            );
        }
        info!("Loaded {} notes into the store", self.notes.len());
        Ok(self.notes.len())
    }

    /// All notes, newest first.
    pub fn list(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    pub fn adapter(&self) -> &P {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut P {
        &mut self.adapter
    }

    /// Consumes the store and hands back its backend, e.g. to shut it down.
    pub fn into_adapter(self) -> P {
        self.adapter
    }

    /// Creates a note at the head of the list.
    ///
    /// Fails with `Validation` if `text` is blank after trimming.
    pub fn create(&mut self, text: &str, priority: Priority) -> Result<Note> {
        let text = normalize_text(text)?;

        // Stamp strictly after the current head so that head insertion and
        // the descending sort used on load always agree.
        let now = Utc::now();
        let created_at = match self.notes.first() {
            Some(head) if head.created_at >= now => head.created_at + Duration::nanoseconds(1),
            _ => now,
        };

        let note = Note::new(text, priority, created_at);
        debug!("Creating note {} ({})", note.id, priority);

        match self.mode {
            PersistenceMode::Strict => {
                self.persist_strict(PersistOp::Save, note.id, |adapter| adapter.save(&note))?;
                self.notes.insert(0, note.clone());
            }
            PersistenceMode::BestEffort => {
                self.notes.insert(0, note.clone());
                let result = self.adapter.save(&note);
                self.record_if_failed(PersistOp::Save, note.id, result);
            }
        }

        info!("Created note {}", note.id);
        Ok(note)
    }

    /// Replaces the text and priority of an existing note, keeping its id,
    /// creation time and position.
    pub fn update(&mut self, id: &NoteId, text: &str, priority: Priority) -> Result<Note> {
        let position = self.position(id)?;
        let text = normalize_text(text)?;

        let mut updated = self.notes[position].clone();
        updated.text = text;
        updated.priority = priority;
        debug!("Updating note {} ({})", id, priority);

        match self.mode {
            PersistenceMode::Strict => {
                self.persist_strict(PersistOp::Save, *id, |adapter| adapter.save(&updated))?;
                self.notes[position] = updated.clone();
            }
            PersistenceMode::BestEffort => {
                self.notes[position] = updated.clone();
                let result = self.adapter.save(&updated);
                self.record_if_failed(PersistOp::Save, *id, result);
            }
        }

        info!("Updated note {}", id);
        Ok(updated)
    }

    /// Removes a note from the list and from the backend.
    pub fn delete(&mut self, id: &NoteId) -> Result<()> {
        let position = self.position(id)?;
        debug!("Deleting note {}", id);

        match self.mode {
            PersistenceMode::Strict => {
                self.persist_strict(PersistOp::Delete, *id, |adapter| adapter.delete(id))?;
                self.notes.remove(position);
            }
            PersistenceMode::BestEffort => {
                self.notes.remove(position);
                let result = self.adapter.delete(id);
                self.record_if_failed(PersistOp::Delete, *id, result);
            }
        }

        info!("Deleted note {}", id);
        Ok(())
    }

    /// Returns and clears every persistence failure that did not abort an
    /// operation: those recorded in best-effort mode and those the backend
    /// reports after the fact.
    pub fn take_persistence_failures(&mut self) -> Vec<PersistenceFailure> {
        let mut failures = std::mem::take(&mut self.failures);
        failures.extend(self.adapter.drain_failures());
        failures
    }

    fn position(&self, id: &NoteId) -> Result<usize> {
        self.notes
            .iter()
            .position(|note| &note.id == id)
            .ok_or(NoteError::NoteNotFound { id: *id })
    }

    fn persist_strict<F>(&mut self, op: PersistOp, id: NoteId, call: F) -> Result<()>
    where
        F: FnOnce(&mut P) -> Result<()>,
    {
        call(&mut self.adapter).map_err(|e| {
            error!("Failed to {} note {}, leaving store unchanged: {}", op, id, e);
            NoteError::Persistence {
                op,
                id,
                source: Box::new(e),
            }
        })
    }

    fn record_if_failed(&mut self, op: PersistOp, id: NoteId, result: Result<()>) {
        if let Err(e) = result {
            error!(
                "Failed to {} note {}, keeping the in-memory change: {}",
                op, id, e
            );
            self.failures.push(PersistenceFailure::new(op, id, &e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<P: PersistenceAdapter>(store: &NoteStore<P>) -> Vec<(&str, Priority)> {
        store
            .list()
            .iter()
            .map(|note| (note.text.as_str(), note.priority))
            .collect()
    }

    #[test]
    fn create_trims_and_inserts_at_head() {
        let mut store = NoteStore::in_memory();
        store.create("first", Priority::Low).unwrap();
        let second = store.create("  second \n", Priority::High).unwrap();

        assert_eq!(second.text, "second");
        assert_eq!(store.list()[0].id, second.id);
        assert_eq!(
            texts(&store),
            vec![("second", Priority::High), ("first", Priority::Low)]
        );
        assert!(store.list()[0].created_at > store.list()[1].created_at);
    }

    #[test]
    fn blank_text_is_rejected_without_side_effects() {
        let mut store = NoteStore::in_memory();
        store.create("keep", Priority::Medium).unwrap();

        for blank in ["", "   ", "\n\t"] {
            let err = store.create(blank, Priority::High).unwrap_err();
            assert!(err.is_validation());
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.adapter().len(), 1);
    }

    #[test]
    fn update_keeps_identity_and_position() {
        let mut store = NoteStore::in_memory();
        let older = store.create("older", Priority::Low).unwrap();
        store.create("newer", Priority::High).unwrap();

        let updated = store.update(&older.id, " edited ", Priority::Medium).unwrap();

        assert_eq!(updated.id, older.id);
        assert_eq!(updated.created_at, older.created_at);
        assert_eq!(store.list()[1], updated);
        assert_eq!(updated.text, "edited");
    }

    #[test]
    fn update_validates_after_lookup() {
        let mut store = NoteStore::in_memory();
        let note = store.create("note", Priority::Low).unwrap();

        let missing = store.update(&NoteId::new_v4(), "", Priority::Low).unwrap_err();
        assert!(matches!(missing, NoteError::NoteNotFound { .. }));

        let blank = store.update(&note.id, "  ", Priority::High).unwrap_err();
        assert!(blank.is_validation());
        assert_eq!(store.list(), &[note][..]);
    }

    #[test]
    fn delete_unknown_id_leaves_list_alone() {
        let mut store = NoteStore::in_memory();
        store.create("note", Priority::Low).unwrap();

        let err = store.delete(&NoteId::new_v4()).unwrap_err();
        assert!(matches!(err, NoteError::NoteNotFound { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn best_effort_keeps_change_and_records_failure() {
        let mut store = NoteStore::in_memory();
        store.adapter_mut().set_fail_writes(true);

        let note = store.create("unsaved", Priority::High).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.adapter().contains(&note.id));

        let failures = store.take_persistence_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].op, PersistOp::Save);
        assert_eq!(failures[0].id, note.id);
        assert!(store.take_persistence_failures().is_empty());
    }

    #[test]
    fn strict_mode_rolls_nothing_forward_on_failure() {
        let mut store = NoteStore::open(MemoryAdapter::new(), PersistenceMode::Strict).unwrap();
        assert_eq!(store.mode(), PersistenceMode::Strict);
        let note = store.create("saved", Priority::Low).unwrap();
        store.adapter_mut().set_fail_writes(true);

        let err = store.create("lost", Priority::High).unwrap_err();
        assert!(matches!(err, NoteError::Persistence { op: PersistOp::Save, .. }));

        let err = store.update(&note.id, "changed", Priority::High).unwrap_err();
        assert!(matches!(err, NoteError::Persistence { .. }));

        let err = store.delete(&note.id).unwrap_err();
        assert!(matches!(err, NoteError::Persistence { op: PersistOp::Delete, .. }));

        assert_eq!(store.list(), &[note][..]);
        assert!(store.take_persistence_failures().is_empty());
    }

    #[test]
    fn open_sorts_stored_notes_newest_first() {
        let now = Utc::now();
        let old = Note::new("old".into(), Priority::Low, now - Duration::hours(1));
        let new = Note::new("new".into(), Priority::High, now);
        let adapter = MemoryAdapter::with_notes(vec![old.clone(), new.clone()]);

        let store = NoteStore::open(adapter, PersistenceMode::BestEffort).unwrap();
        assert_eq!(store.list(), &[new, old][..]);
    }

    #[test]
    fn create_never_predates_the_head() {
        let future = Utc::now() + Duration::hours(1);
        let ahead = Note::new("from the future".into(), Priority::Low, future);
        let mut store =
            NoteStore::open(MemoryAdapter::with_notes(vec![ahead]), PersistenceMode::BestEffort)
                .unwrap();

        let note = store.create("now", Priority::Medium).unwrap();
        assert_eq!(note.created_at, future + Duration::nanoseconds(1));
        assert_eq!(store.list()[0].id, note.id);
    }

    #[test]
    fn reload_picks_up_backend_changes() {
        let mut store = NoteStore::in_memory();
        store.create("one", Priority::Low).unwrap();
        let outside = Note::new("two".into(), Priority::High, Utc::now());
        store.adapter_mut().save(&outside).unwrap();

        assert_eq!(store.reload().unwrap(), 2);
        assert_eq!(store.list()[0].id, outside.id);
    }
}
