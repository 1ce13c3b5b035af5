// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistence collaborators and the debounced autosave timer.
//!
//! The engine never decides where a document goes. It hands documents to a
//! [`GraphStore`] when the [`Autosave`] timer fires.

use crate::document::Document;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by a graph store
#[derive(Debug, Error)]
pub enum StoreError {
    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unserializable document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for serialized graphs
pub trait GraphStore {
    /// Persist a document, replacing the previous one
    fn save(&mut self, document: &Document) -> Result<(), StoreError>;

    /// Read the last persisted document, if any
    fn load(&self) -> Result<Option<Document>, StoreError>;
}

/// Store writing pretty-printed JSON to a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for a file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphStore for JsonFileStore {
    fn save(&mut self, document: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = document.to_json_pretty()?;
        std::fs::write(&self.path, content)?;
        tracing::debug!("Saved graph to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<Document>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(Document::from_json(&content)?))
    }
}

/// Store keeping every saved document in memory; clones share history
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Vec<Document>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes so far
    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    /// Most recent document
    pub fn last(&self) -> Option<Document> {
        self.saved.lock().last().cloned()
    }
}

impl GraphStore for MemoryStore {
    fn save(&mut self, document: &Document) -> Result<(), StoreError> {
        self.saved.lock().push(document.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Document>, StoreError> {
        Ok(self.last())
    }
}

/// Debounce timer for persistence requests.
///
/// Every request pushes the deadline back, so a burst of edits collapses into
/// one write. The owner polls it from its frame loop.
#[derive(Debug, Clone)]
pub struct Autosave {
    delay: Duration,
    due: Option<Instant>,
}

impl Autosave {
    /// Create a timer with the given debounce delay
    pub fn new(delay: Duration) -> Self {
        Self { delay, due: None }
    }

    /// Debounce delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a write `delay` after `now`, replacing any earlier deadline
    pub fn request(&mut self, now: Instant) {
        self.due = Some(now + self.delay);
    }

    /// Make a pending write due immediately
    pub fn expedite(&mut self, now: Instant) {
        if self.due.is_some() {
            self.due = Some(now);
        }
    }

    /// Whether a write is scheduled
    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Drop the scheduled write
    pub fn cancel(&mut self) {
        self.due = None;
    }

    /// Returns true once when the deadline has passed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, NodeSpec};
    use egui::Pos2;

    #[test]
    fn test_burst_collapses_into_one_write() {
        let start = Instant::now();
        let mut autosave = Autosave::new(Duration::from_millis(100));
        autosave.request(start);
        autosave.request(start + Duration::from_millis(60));
        assert!(!autosave.poll(start + Duration::from_millis(120)));
        assert!(autosave.poll(start + Duration::from_millis(160)));
        assert!(!autosave.poll(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_expedite_only_affects_pending_write() {
        let now = Instant::now();
        let mut autosave = Autosave::new(Duration::from_secs(10));
        autosave.expedite(now);
        assert!(!autosave.is_pending());
        autosave.request(now);
        autosave.expedite(now);
        assert!(autosave.poll(now));
        autosave.request(now);
        autosave.cancel();
        assert!(!autosave.poll(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("graph.json"));
        assert!(store.load().unwrap().is_none());

        let mut graph = Graph::default();
        graph.add_node("Node", Pos2::new(5.0, 5.0), NodeSpec::generic());
        store.save(&graph.serialize()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, graph.serialize());
    }

    #[test]
    fn test_json_file_store_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_memory_store_clones_share_history() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer.save(&Document::default()).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap(), Some(Document::default()));
    }
}
