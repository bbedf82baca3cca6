//! Bookmark state
//!
//! Persists per-stream resume cursors between runs. The file is written
//! after every yielded batch, so a crash mid-sync resumes from the last
//! completed page. Location-scoped streams key their bookmarks as
//! `"{stream}.{location_id}"`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-stream bookmarks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub bookmarks: HashMap<String, String>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume cursor for a stream, if one was persisted
    pub fn get_cursor(&self, stream: &str) -> Option<&str> {
        self.bookmarks.get(stream).map(String::as_str)
    }

    /// Record the cursor to resume a stream from
    pub fn set_cursor(&mut self, stream: &str, cursor: String) {
        self.bookmarks.insert(stream.to_string(), cursor);
    }

    /// Drop a stream's cursor once its paging sequence has completed
    pub fn clear_cursor(&mut self, stream: &str) {
        self.bookmarks.remove(stream);
    }
}

/// File-backed store for [`State`]
#[derive(Debug)]
pub struct StateStore {
    path: Option<PathBuf>,
    state: State,
}

impl StateStore {
    /// Store without persistence (every run starts fresh)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: State::new(),
        }
    }

    /// Load from a state file, starting empty when the file does not exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)
                .map_err(|e| Error::state(format!("failed to parse state file: {e}")))?
        } else {
            State::new()
        };

        Ok(Self {
            path: Some(path),
            state,
        })
    }

    /// Current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Resume cursor for a stream
    pub fn get_cursor(&self, stream: &str) -> Option<String> {
        self.state.get_cursor(stream).map(ToString::to_string)
    }

    /// Update a stream's cursor and persist immediately
    pub fn set_cursor(&mut self, stream: &str, cursor: String) -> Result<()> {
        self.state.set_cursor(stream, cursor);
        self.save()
    }

    /// Remove a stream's cursor and persist immediately
    pub fn clear_cursor(&mut self, stream: &str) -> Result<()> {
        self.state.clear_cursor(stream);
        self.save()
    }

    /// Write the state file atomically (temp file, then rename)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(&self.state)?;
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &contents)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}
