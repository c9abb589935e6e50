//! CLI module for the prionotes application
//!
//! This module handles the command-line interface for interacting with the
//! note store. It renders notes and forwards user actions; every rule about
//! what a valid note is lives in the store.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info, warn};
use shell_words::split;
use tempfile::Builder;

use crate::{
    preview, Cli, Commands, Config, JsonFileAdapter, MemoryAdapter, Note, NoteError, NoteId,
    NoteStore, PersistenceAdapter, PersistenceFailure, PersistenceMode, Priority, Result,
    WriteBehind,
};

/// The persistence backends the CLI can run the store on.
pub enum StoreBackend {
    /// Nothing survives the process
    Volatile(MemoryAdapter),
    /// Synchronous JSON files
    Files(JsonFileAdapter),
    /// JSON files written by a background task
    WriteBehind(WriteBehind<JsonFileAdapter>),
}

impl StoreBackend {
    /// Builds the backend described by `config`.
    pub fn from_config(config: &Config, volatile: bool) -> Result<Self> {
        if volatile {
            return Ok(StoreBackend::Volatile(MemoryAdapter::new()));
        }
        config.validate()?;

        let files = JsonFileAdapter::open(&config.notes_dir)?;
        if config.write_behind {
            Ok(StoreBackend::WriteBehind(WriteBehind::start(files)?))
        } else {
            Ok(StoreBackend::Files(files))
        }
    }

    /// Waits for background writes to finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        match self {
            StoreBackend::WriteBehind(writer) => writer.shutdown().await,
            _ => Ok(()),
        }
    }
}

impl PersistenceAdapter for StoreBackend {
    fn fetch_all(&self) -> Result<Vec<Note>> {
        match self {
            StoreBackend::Volatile(memory) => memory.fetch_all(),
            StoreBackend::Files(files) => files.fetch_all(),
            StoreBackend::WriteBehind(writer) => writer.fetch_all(),
        }
    }

    fn save(&mut self, note: &Note) -> Result<()> {
        match self {
            StoreBackend::Volatile(memory) => memory.save(note),
            StoreBackend::Files(files) => files.save(note),
            StoreBackend::WriteBehind(writer) => writer.save(note),
        }
    }

    fn delete(&mut self, id: &NoteId) -> Result<()> {
        match self {
            StoreBackend::Volatile(memory) => memory.delete(id),
            StoreBackend::Files(files) => files.delete(id),
            StoreBackend::WriteBehind(writer) => writer.delete(id),
        }
    }

    fn drain_failures(&mut self) -> Vec<PersistenceFailure> {
        match self {
            StoreBackend::WriteBehind(writer) => writer.drain_failures(),
            _ => Vec::new(),
        }
    }

    fn defers_writes(&self) -> bool {
        matches!(self, StoreBackend::WriteBehind(_))
    }
}

/// Resolves a note reference typed by the user.
///
/// Accepts a 1-based row number as printed by `list`, a full id, or an id
/// prefix that matches exactly one note.
pub fn resolve_reference(notes: &[Note], reference: &str) -> Result<NoteId> {
    let reference = reference.trim();
    let unknown = || NoteError::UnknownReference {
        reference: reference.to_string(),
    };

    // Short all-digit references are row numbers, never id prefixes.
    let is_row_number = !reference.is_empty()
        && reference.len() < 8
        && reference.chars().all(|c| c.is_ascii_digit());
    if is_row_number {
        return match reference.parse::<usize>() {
            Ok(row) if row >= 1 && row <= notes.len() => Ok(notes[row - 1].id),
            _ => Err(unknown()),
        };
    }

    if let Ok(id) = NoteId::parse_str(reference) {
        return notes
            .iter()
            .find(|note| note.id == id)
            .map(|note| note.id)
            .ok_or_else(unknown);
    }

    let prefix = reference.to_lowercase();
    if prefix.is_empty() {
        return Err(unknown());
    }
    let matches: Vec<&Note> = notes
        .iter()
        .filter(|note| note.id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(unknown()),
        [note] => Ok(note.id),
        many => Err(NoteError::AmbiguousReference {
            reference: reference.to_string(),
            matches: many.len(),
        }),
    }
}

/// JSON shape printed by `list --json` and `show --json`.
pub fn note_to_json(note: &Note) -> serde_json::Value {
    serde_json::json!({
        "id": note.id,
        "text": note.text,
        "priority": note.priority,
        "color": note.priority.color().hex(),
        "created_at": note.created_at.to_rfc3339(),
    })
}

/// One line of the `list` output, without colours.
pub fn format_row(row: usize, note: &Note, max_chars: usize) -> String {
    let id = note.id.to_string();
    format!(
        "{:>3}. [{:<6}] {}  ({}, {})",
        row,
        note.priority.as_str(),
        preview(&note.text, max_chars),
        &id[..8],
        note.created_at.format("%Y-%m-%d %H:%M")
    )
}

/// The line printed after the rows of `list`, if any.
pub fn list_footer(total: usize, shown: usize, verbose: bool) -> Option<String> {
    if total == 0 {
        Some("No notes yet.".to_string())
    } else if shown < total {
        Some(format!("... {} more", total - shown))
    } else if verbose {
        Some(format!("\n{} note{}", total, if total == 1 { "" } else { "s" }))
    } else {
        None
    }
}

/// CLI Application handler - processes CLI commands and interfaces with NoteStore
pub struct App {
    /// The note store
    store: NoteStore<StoreBackend>,

    /// Application configuration
    config: Config,

    /// Where `config --set` and `config --reset` write to
    config_path: Option<PathBuf>,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given store and config
    pub fn new(
        store: NoteStore<StoreBackend>,
        config: Config,
        config_path: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        Self {
            store,
            config,
            config_path,
            verbose,
        }
    }

    /// Loads configuration, applies command-line overrides and opens the store.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config_path = cli.config.clone().or_else(Config::default_path);
        let mut config = match &config_path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(notes_dir) = &cli.notes_dir {
            config.notes_dir = notes_dir.clone();
        }
        if cli.strict {
            config.persistence_mode = PersistenceMode::Strict;
        }

        let backend = StoreBackend::from_config(&config, cli.volatile)?;
        let store = NoteStore::open(backend, config.persistence_mode)?;
        Ok(Self::new(store, config, config_path, cli.verbose))
    }

    /// Read-only access to the store, mainly for tests.
    pub fn store(&self) -> &NoteStore<StoreBackend> {
        &self.store
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Add {
                text,
                priority,
                edit,
            } => self.handle_add(text, priority, edit)?,

            Commands::List { json, limit } => self.handle_list(json, limit)?,

            Commands::Show { reference, json } => self.handle_show(&reference, json)?,

            Commands::Edit {
                reference,
                text,
                priority,
                edit,
            } => self.handle_edit(&reference, text, priority, edit)?,

            Commands::Delete { reference, force } => self.handle_delete(&reference, force)?,

            Commands::Config { show, set, reset } => self.handle_config(show, set, reset)?,
        }

        self.report_persistence_failures();
        Ok(())
    }

    /// Flushes background writes and reports anything that failed late.
    pub async fn shutdown(self) -> Result<()> {
        let mut backend = self.store.into_adapter();
        backend.shutdown().await?;

        for failure in backend.drain_failures() {
            print_failure(&failure);
        }
        Ok(())
    }

    fn report_persistence_failures(&mut self) {
        for failure in self.store.take_persistence_failures() {
            print_failure(&failure);
        }
    }

    fn handle_add(&mut self, text: Option<String>, priority: Priority, edit: bool) -> Result<()> {
        let text = match (text, edit) {
            (Some(text), false) => text,
            (initial, _) => self.open_editor_with_content(initial.as_deref().unwrap_or(""))?,
        };

        let note = self.store.create(&text, priority)?;
        println!(
            "Added {} note {}",
            note.priority.style().apply_to(note.priority.as_str()),
            note.id
        );
        Ok(())
    }

    fn handle_list(&self, json: bool, limit: Option<usize>) -> Result<()> {
        let notes = self.store.list();
        let shown = &notes[..limit.unwrap_or(notes.len()).min(notes.len())];

        if json {
            let values: Vec<serde_json::Value> = shown.iter().map(note_to_json).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
            return Ok(());
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);
        let max_chars = term_width.saturating_sub(40).max(20);

        for (i, note) in shown.iter().enumerate() {
            let line = format_row(i + 1, note, max_chars);
            println!("{}", note.priority.style().apply_to(line));
        }

        if let Some(footer) = list_footer(notes.len(), shown.len(), self.verbose) {
            println!("{}", footer);
        }
        Ok(())
    }

    fn handle_show(&self, reference: &str, json: bool) -> Result<()> {
        let id = resolve_reference(self.store.list(), reference)?;
        let note = self
            .store
            .get(&id)
            .ok_or(NoteError::NoteNotFound { id })?;

        if json {
            println!("{}", serde_json::to_string_pretty(&note_to_json(note))?);
            return Ok(());
        }

        println!("ID:       {}", note.id);
        println!(
            "Priority: {}",
            note.priority.style().bold().apply_to(note.priority.label())
        );
        println!("Created:  {}", note.created_at.format("%Y-%m-%d %H:%M:%S"));
        println!("\n{}", note.text);
        Ok(())
    }

    fn handle_edit(
        &mut self,
        reference: &str,
        text: Option<String>,
        priority: Option<Priority>,
        edit: bool,
    ) -> Result<()> {
        let id = resolve_reference(self.store.list(), reference)?;
        let current = self
            .store
            .get(&id)
            .cloned()
            .ok_or(NoteError::NoteNotFound { id })?;

        let new_text = match (text, edit) {
            (Some(text), false) => text,
            (Some(text), true) => self.open_editor_with_content(&text)?,
            (None, true) => self.open_editor_with_content(&current.text)?,
            (None, false) => current.text.clone(),
        };
        let new_priority = priority.unwrap_or(current.priority);

        if new_text.trim() == current.text && new_priority == current.priority {
            println!("Nothing to change.");
            return Ok(());
        }

        let note = self.store.update(&id, &new_text, new_priority)?;
        println!(
            "Updated note {} ({})",
            note.id,
            note.priority.style().apply_to(note.priority.label())
        );
        Ok(())
    }

    fn handle_delete(&mut self, reference: &str, force: bool) -> Result<()> {
        let id = resolve_reference(self.store.list(), reference)?;
        let note = self
            .store
            .get(&id)
            .cloned()
            .ok_or(NoteError::NoteNotFound { id })?;

        if !force {
            println!("You are about to delete the following note:");
            println!("ID:       {}", note.id);
            println!("Priority: {}", note.priority.label());
            println!("Created:  {}", note.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("\n{}", preview(&note.text, 80));

            print!("\nAre you sure you want to delete this note? [y/N]: ");
            stdout().flush().map_err(NoteError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(NoteError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        self.store.delete(&id)?;
        println!("Note {} has been deleted.", note.id);
        Ok(())
    }

    fn handle_config(&mut self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        let path = self.config_path.clone().ok_or_else(|| NoteError::ConfigError {
            message: "No configuration path available on this platform, pass --config"
                .to_string(),
        })?;
        let nothing_else = set.is_none() && !reset;

        if reset {
            self.config = Config::default();
            self.config.save(&path)?;
            println!("Configuration reset to defaults.");
        }

        if let Some(assignment) = set {
            let mut updated = self.config.clone();
            updated.set(&assignment)?;
            updated.save(&path)?;
            self.config = updated;
            println!("Configuration updated.");
        }

        if show || nothing_else {
            println!("Config file: {}", path.display());
            println!("{}", serde_json::to_string_pretty(&self.config)?);
        }
        Ok(())
    }

    fn open_editor_with_content(&self, existing_content: &str) -> Result<String> {
        let temp_file = Builder::new().suffix(".txt").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        self.write_editor_template(&temp_path, existing_content)?;

        let editor_cmd = self.config.get_editor_command();
        info!("Opening editor to write note text. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(process_editor_content(&content))
    }

    fn write_editor_template(&self, path: &Path, existing_content: &str) -> Result<()> {
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;

        writeln!(file, "{}", existing_content)?;
        writeln!(file)?;
        writeln!(file, "<!-- ")?;
        writeln!(
            file,
            "Write the note text above. Leading and trailing blank space is dropped."
        )?;
        writeln!(
            file,
            "Lines that start with <!-- and end with --> are comments and will be ignored."
        )?;
        writeln!(file, "Save and exit the editor when you're done.")?;
        writeln!(file, "-->")?;

        Ok(())
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let path_str = file_path.to_string_lossy();

        let args = split(editor_cmd).map_err(|e| NoteError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let (program, rest) = args.split_first().ok_or_else(|| NoteError::EditorError {
            message: "Empty editor command".to_string(),
        })?;

        debug!("Launching editor {} on {}", program, path_str);
        let status = Command::new(program)
            .args(rest)
            .arg(path_str.as_ref())
            .status()
            .map_err(|e| NoteError::EditorError {
                message: format!("Failed to start editor '{}': {}", program, e),
            })?;

        if !status.success() {
            return Err(NoteError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }
}

/// Drops the comment block the editor template adds.
pub fn process_editor_content(content: &str) -> String {
    let mut in_comment = false;
    content
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if in_comment {
                if trimmed.ends_with("-->") {
                    in_comment = false;
                }
                return false;
            }
            if trimmed.starts_with("<!--") {
                in_comment = !trimmed.ends_with("-->");
                return false;
            }
            true
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

fn print_failure(failure: &PersistenceFailure) {
    warn!(
        "Persistence failure at {}: {} {}: {}",
        failure.at, failure.op, failure.id, failure.message
    );
    eprintln!(
        "{} could not {} note {} on disk: {}",
        console::style("warning:").yellow().bold(),
        failure.op,
        failure.id,
        failure.message
    );
}
