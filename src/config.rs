use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use which::which;

use crate::{NoteError, PersistenceMode, Result};

const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory where notes are stored
    pub notes_dir: PathBuf,

    /// How the store reacts when saving or deleting on disk fails
    pub persistence_mode: PersistenceMode,

    /// Whether disk writes run on a background task
    pub write_behind: bool,

    /// Editor command used by `--edit`
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let notes_dir = project_dirs()
            .map(|dirs| dirs.data_dir().join("notes"))
            .unwrap_or_else(|| PathBuf::from(".prionotes").join("notes"));

        Self {
            notes_dir,
            persistence_mode: PersistenceMode::default(),
            write_behind: false,
            editor_command: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "prionotes")
}

impl Config {
    /// Location of the configuration file when none is given explicitly.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration from `path`, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(
                "No config file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(|e| NoteError::ConfigError {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|_| NoteError::DirectoryError {
            path: dir.to_path_buf(),
        })?;

        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(path).map_err(|e| NoteError::Io(e.error))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Rejects combinations of settings the store cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.persistence_mode == PersistenceMode::Strict && self.write_behind {
            return Err(NoteError::ConfigError {
                message: "persistence_mode=strict cannot be combined with write_behind=true; \
                          background writes report failures only after the change is applied"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Applies a `key=value` setting, leaving the configuration untouched
    /// if the result would be invalid.
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let mut updated = self.clone();
        updated.apply(assignment)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn apply(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| NoteError::ConfigError {
                message: format!("Expected key=value, got '{}'", assignment),
            })?;
        let value = value.trim();

        match key.trim() {
            "notes_dir" => self.notes_dir = PathBuf::from(value),
            "persistence_mode" => self.persistence_mode = value.parse()?,
            "write_behind" => {
                self.write_behind = value.parse().map_err(|_| NoteError::ConfigError {
                    message: format!("write_behind must be true or false, got '{}'", value),
                })?
            }
            "editor_command" => {
                self.editor_command = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            other => {
                return Err(NoteError::ConfigError {
                    message: format!("Unknown configuration key '{}'", other),
                })
            }
        }

        Ok(())
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.notes_dir.ends_with("notes"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.set("persistence_mode=strict").unwrap();
        config.set("write_behind=false").unwrap();
        config.set("editor_command=vim -n").unwrap();
        config.set("notes_dir=/tmp/notes").unwrap();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.persistence_mode, PersistenceMode::Strict);
        assert_eq!(loaded.get_editor_command(), "vim -n");
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"write_behind": true}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.write_behind);
        assert_eq!(config.persistence_mode, PersistenceMode::BestEffort);
    }

    #[test]
    fn bad_settings_are_rejected() {
        let mut config = Config::default();
        assert!(config.set("colour=red").is_err());
        assert!(config.set("write_behind=maybe").is_err());
        assert!(config.set("persistence_mode=sometimes").is_err());
        assert!(config.set("no equals sign").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn strict_mode_rejects_write_behind() {
        let mut config = Config::default();
        config.set("persistence_mode=strict").unwrap();
        assert!(matches!(
            config.set("write_behind=true"),
            Err(NoteError::ConfigError { .. })
        ));
        assert!(!config.write_behind);

        let mut config = Config::default();
        config.set("write_behind=true").unwrap();
        assert!(config.set("persistence_mode=strict").is_err());
        assert_eq!(config.persistence_mode, PersistenceMode::BestEffort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unparsable_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(NoteError::ConfigError { .. })
        ));
    }
}
