//! Snapshot persistence
//!
//! The whole [`SharedState`] is one JSON file. Every save writes a temp file
//! next to it and renames it over the old snapshot, so a reader never sees a
//! half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{Message, SharedState};
use crate::agent::AgentDescriptor;

/// Failures reading or writing the snapshot
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("No simulation state found at {0} (run `startsim init` first)")]
    NotFound(PathBuf),

    #[error("Failed to read state file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse state file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write state file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("State file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Snapshot file store
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create a fresh state for `niche` and persist it
    pub fn initialize(
        &self,
        niche: &str,
        roster: impl IntoIterator<Item = AgentDescriptor>,
    ) -> Result<SharedState, StateError> {
        let state = SharedState::new(niche, roster);
        self.save(&state)?;
        log::info!("Initialized simulation state at {}", self.path.display());
        Ok(state)
    }

    /// Load the existing snapshot
    pub fn load(&self) -> Result<SharedState, StateError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StateError::NotFound(self.path.clone())
            } else {
                StateError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let mut state: SharedState = serde_json::from_str(&content).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })?;

        state.check_roster().map_err(|reason| StateError::Corrupt {
            path: self.path.clone(),
            reason,
        })?;

        log::debug!(
            "Loaded state from {} ({} messages)",
            self.path.display(),
            state.chat_history.len()
        );
        Ok(state)
    }

    /// Replace the snapshot with `state`
    pub fn save(&self, state: &SharedState) -> Result<(), StateError> {
        let write_err = |source: io::Error| StateError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(state).map_err(|e| write_err(io::Error::other(e)))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        Ok(())
    }

    /// Append one message to the history and persist
    pub fn append_message(&self, state: &mut SharedState, message: Message) -> Result<(), StateError> {
        state.chat_history.push(message);
        self.save(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;
    use crate::response::AgentOutput;
    use crate::state::Recipient;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_is_not_found() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(temp.path().join("sim_state.json"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
        assert!(err.to_string().contains("startsim init"));
    }

    #[test]
    fn test_initialize_then_load() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(temp.path().join("nested").join("sim_state.json"));
        let state = store
            .initialize("fintech", vec![AgentDescriptor::for_role(Role::Ceo, "fintech")])
            .unwrap();

        assert!(store.exists());
        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_append_message_persists() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(temp.path().join("sim_state.json"));
        let mut state = store.initialize("fintech", crate::agent::roster("fintech")).unwrap();

        let output = AgentOutput::from_raw(r#"{"decision":"hire"}"#);
        let message = Message::from_output("CEO", Recipient::One(Role::Cto), "Turn", &output);
        store.append_message(&mut state, message).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.chat_history.len(), 1);
        assert_eq!(loaded.chat_history[0].output(), output);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(temp.path().join("sim_state.json"));
        let state = store.initialize("fintech", Vec::new()).unwrap();
        store.save(&state).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name(), "sim_state.json");
    }

    #[test]
    fn test_unparseable_snapshot() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sim_state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = StateStore::new(path).load().unwrap_err();
        assert!(matches!(err, StateError::Parse { .. }));
    }

    #[test]
    fn test_snapshot_missing_role_is_corrupt() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(temp.path().join("sim_state.json"));
        store.initialize("fintech", Vec::new()).unwrap();

        let mut raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        raw["agents"].as_object_mut().unwrap().remove("Marketer");
        fs::write(store.path(), raw.to_string()).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }));
        assert!(err.to_string().contains("Marketer"));
    }

    #[test]
    fn test_snapshot_layout_keys() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(temp.path().join("sim_state.json"));
        store.initialize("fintech", Vec::new()).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let agents: Vec<&String> = raw["agents"].as_object().unwrap().keys().collect();
        assert_eq!(agents, vec!["CEO", "CTO", "Designer", "Marketer"]);
        assert!(raw["documents"]["business_plan"].is_string());
        assert!(raw["chat_history"].as_array().unwrap().is_empty());
        assert_eq!(raw["meta"]["niche"], "fintech");
    }
}
