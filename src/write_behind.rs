// src/write_behind.rs - Asynchronous persistence module
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use log::{debug, error, info, trace};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    Note, NoteError, NoteId, PersistOp, PersistenceAdapter, PersistenceFailure, Result,
};

#[derive(Debug, Clone)]
pub struct WriteBehindStatus {
    /// Whether the writer task is running
    pub is_running: bool,
    /// Commands handed to the writer so far
    pub queued: u64,
}

#[derive(Debug, Clone)]
pub enum WriteCommand {
    /// Persist a note
    Save(Note),
    /// Remove a stored note
    Delete(NoteId),
    /// Finish queued work and stop the writer
    Stop,
}

/// Runs an adapter's writes on a background task.
///
/// `save` and `delete` only enqueue and return. The writer applies commands
/// in order; failures come back over a channel and surface on the owning
/// thread through `drain_failures`. The writer never touches the store's
/// collection.
pub struct WriteBehind<A: PersistenceAdapter + 'static> {
    /// The wrapped backend, shared with the writer task
    inner: Arc<Mutex<A>>,

    /// Channel to send commands to the writer task
    command_tx: mpsc::UnboundedSender<WriteCommand>,

    /// Commands queued but not yet applied by the writer task
    pending: Arc<AtomicU64>,

    /// Failures reported by the writer task
    failure_rx: mpsc::UnboundedReceiver<PersistenceFailure>,

    /// Handle to the writer task
    writer_task: Option<JoinHandle<()>>,

    /// Current status of the writer
    status: WriteBehindStatus,
}

impl<A: PersistenceAdapter + 'static> WriteBehind<A> {
    /// Starts the writer task for `inner` on the current tokio runtime.
    pub fn start(inner: A) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| NoteError::ApplicationError {
            message: format!("write-behind persistence needs a tokio runtime: {}", e),
        })?;

        info!("Starting write-behind persistence...");
        let inner = Arc::new(Mutex::new(inner));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicU64::new(0));

        let task = handle.spawn(run_writer(
            Arc::clone(&inner),
            Arc::clone(&pending),
            command_rx,
            failure_tx,
        ));

        Ok(Self {
            inner,
            command_tx,
            pending,
            failure_rx,
            writer_task: Some(task),
            status: WriteBehindStatus {
                is_running: true,
                queued: 0,
            },
        })
    }

    /// Get the current status of the writer
    pub fn status(&self) -> WriteBehindStatus {
        self.status.clone()
    }

    /// Number of saves and deletes the writer has not applied yet.
    pub fn pending_writes(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Lets queued commands finish, then stops the writer task.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(task) = self.writer_task.take() {
            if let Err(e) = self.command_tx.send(WriteCommand::Stop) {
                error!("Failed to send stop command to writer: {}", e);
            }

            if let Err(e) = task.await {
                let error_mgs = format!("Failed to stop write-behind writer: {}", e);
                error!("{}", error_mgs);
                return Err(NoteError::ApplicationError { message: error_mgs });
            }

            self.status.is_running = false;
            info!("Write-behind writer stopped");
        } else {
            debug!("Write-behind writer is not running");
        }

        Ok(())
    }

    fn enqueue(&mut self, command: WriteCommand) -> Result<()> {
        if !self.status.is_running {
            return Err(NoteError::ApplicationError {
                message: "write-behind writer has been shut down".to_string(),
            });
        }

        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.command_tx.send(command) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(NoteError::ApplicationError {
                message: format!("Failed to queue write: {}", e),
            });
        }
        self.status.queued += 1;
        Ok(())
    }
}

impl<A: PersistenceAdapter + 'static> PersistenceAdapter for WriteBehind<A> {
    /// Reads the wrapped backend. Fails while writes are still queued, since
    /// the backend would not yet hold them.
    fn fetch_all(&self) -> Result<Vec<Note>> {
        let pending = self.pending_writes();
        if pending > 0 {
            return Err(NoteError::ApplicationError {
                message: format!(
                    "{} background write{} still queued, shut the writer down before reading",
                    pending,
                    if pending == 1 { " is" } else { "s are" }
                ),
            });
        }

        let inner = self
            .inner
            .lock()
            .map_err(|_| NoteError::ApplicationError {
                message: "write-behind backend lock is poisoned".to_string(),
            })?;
        inner.fetch_all()
    }

    fn save(&mut self, note: &Note) -> Result<()> {
        trace!("Queueing save of note {}", note.id);
        self.enqueue(WriteCommand::Save(note.clone()))
    }

    fn delete(&mut self, id: &NoteId) -> Result<()> {
        trace!("Queueing delete of note {}", id);
        self.enqueue(WriteCommand::Delete(*id))
    }

    fn drain_failures(&mut self) -> Vec<PersistenceFailure> {
        let mut failures = Vec::new();
        while let Ok(failure) = self.failure_rx.try_recv() {
            failures.push(failure);
        }
        failures
    }

    fn defers_writes(&self) -> bool {
        true
    }
}

async fn run_writer<A: PersistenceAdapter + 'static>(
    inner: Arc<Mutex<A>>,
    pending: Arc<AtomicU64>,
    mut command_rx: mpsc::UnboundedReceiver<WriteCommand>,
    failure_tx: mpsc::UnboundedSender<PersistenceFailure>,
) {
    while let Some(command) = command_rx.recv().await {
        let (op, id) = match &command {
            WriteCommand::Save(note) => (PersistOp::Save, note.id),
            WriteCommand::Delete(id) => (PersistOp::Delete, *id),
            WriteCommand::Stop => {
                info!("Write-behind writer stopping...");
                break;
            }
        };

        let backend = Arc::clone(&inner);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut backend = backend.lock().map_err(|_| NoteError::ApplicationError {
                message: "write-behind backend lock is poisoned".to_string(),
            })?;
            match command {
                WriteCommand::Save(note) => backend.save(&note),
                WriteCommand::Delete(id) => backend.delete(&id),
                WriteCommand::Stop => Ok(()),
            }
        })
        .await
        .unwrap_or_else(|e| {
            Err(NoteError::ApplicationError {
                message: format!("write task failed: {}", e),
            })
        });
        pending.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Ok(()) => debug!("Background {} of note {} completed", op, id),
            Err(e) => {
                error!("Background {} of note {} failed: {}", op, id, e);
                if failure_tx.send(PersistenceFailure::new(op, id, &e)).is_err() {
                    debug!("Failure receiver dropped, discarding report");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::tempdir;

    use super::*;
    use crate::{JsonFileAdapter, MemoryAdapter, NoteStore, PersistenceMode, Priority};

    #[tokio::test]
    async fn queued_writes_reach_the_backend_after_shutdown() {
        let mut writer = WriteBehind::start(MemoryAdapter::new()).unwrap();
        let keep = Note::new("keep".into(), Priority::Low, Utc::now());
        let gone = Note::new("gone".into(), Priority::High, Utc::now());

        writer.save(&keep).unwrap();
        writer.save(&gone).unwrap();
        writer.delete(&gone.id).unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(writer.fetch_all().unwrap(), vec![keep]);
        assert_eq!(writer.status().queued, 3);
        assert!(!writer.status().is_running);
        assert!(writer.drain_failures().is_empty());
        assert_eq!(writer.pending_writes(), 0);
    }

    #[tokio::test]
    async fn strict_store_is_refused() {
        let mut backend = MemoryAdapter::new();
        backend.set_fail_writes(true);
        let writer = WriteBehind::start(backend).unwrap();

        let result = NoteStore::open(writer, PersistenceMode::Strict);
        assert!(matches!(result, Err(NoteError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn reload_waits_for_queued_writes() {
        let writer = WriteBehind::start(MemoryAdapter::new()).unwrap();
        let mut store = NoteStore::open(writer, PersistenceMode::BestEffort).unwrap();

        // The current-thread test runtime has not polled the writer yet.
        let note = store.create("queued", Priority::Low).unwrap();
        assert_eq!(store.adapter().pending_writes(), 1);
        assert!(store.reload().is_err());
        assert_eq!(store.list(), &[note.clone()][..]);

        store.adapter_mut().shutdown().await.unwrap();
        assert_eq!(store.reload().unwrap(), 1);
        assert_eq!(store.list(), &[note][..]);
    }

    #[tokio::test]
    async fn failures_are_reported_back_through_the_store() {
        let mut backend = MemoryAdapter::new();
        backend.set_fail_writes(true);
        let writer = WriteBehind::start(backend).unwrap();
        let mut store = NoteStore::open(writer, PersistenceMode::BestEffort).unwrap();

        let note = store.create("queued", Priority::Medium).unwrap();
        assert_eq!(store.len(), 1);

        store.adapter_mut().shutdown().await.unwrap();
        let failures = store.take_persistence_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, note.id);
        assert_eq!(failures[0].op, PersistOp::Save);
    }

    #[tokio::test]
    async fn writes_after_shutdown_are_rejected() {
        let mut writer = WriteBehind::start(MemoryAdapter::new()).unwrap();
        writer.shutdown().await.unwrap();

        let note = Note::new("late".into(), Priority::Low, Utc::now());
        assert!(writer.save(&note).is_err());
        assert!(writer.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn works_over_json_files() {
        let dir = tempdir().unwrap();
        let files = JsonFileAdapter::open(dir.path()).unwrap();
        let mut writer = WriteBehind::start(files.clone()).unwrap();

        let note = Note::new("on disk".into(), Priority::High, Utc::now());
        writer.save(&note).unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(files.fetch_all().unwrap(), vec![note]);
    }

    #[test]
    fn start_without_runtime_fails() {
        assert!(WriteBehind::start(MemoryAdapter::new()).is_err());
    }
}
