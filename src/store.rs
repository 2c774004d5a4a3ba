//! In-memory suggestion dataset.
//!
//! The store is built once at startup from a JSON file and is read-only for
//! the serving lifetime, so connection tasks share it without locking:
//! - Records are sorted into a deterministic total order at load time
//! - An id index makes per-query lookup independent of dataset size
//! - Lookups return per-request values, never shared buffers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single dataset entry: an id the client queries by, and the display name
/// returned for it. Ids are not unique; one id may carry several names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuggestionRecord {
    pub id: String,
    pub name: String,
}

/// One match produced for a query.
///
/// `position` is assigned per request, counting matches emitted so far,
/// and is unrelated to the record's absolute index in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub text: String,
    pub position: usize,
}

/// Immutable, pre-sorted, id-indexed collection of suggestion records.
pub struct SuggestionStore {
    /// Records in lexicographic `(id, name)` order.
    records: Vec<SuggestionRecord>,
    /// Id -> indices into `records`, preserving sorted order.
    by_id: HashMap<String, Vec<usize>>,
}

impl SuggestionStore {
    /// Read a JSON array of `{"id": ..., "name": ...}` records from `path`
    /// and build the store. Called once before serving begins.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StoreError::FileRead(path.to_path_buf(), e))?;
        let records: Vec<SuggestionRecord> = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Parse(path.to_path_buf(), e))?;
        Ok(Self::from_records(records))
    }

    /// Build the store from raw records.
    ///
    /// Records are sorted lexicographically by id, ties broken by name, so
    /// the iteration order is total and deterministic for any input file.
    pub fn from_records(mut records: Vec<SuggestionRecord>) -> Self {
        records.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.name.cmp(&b.name)));

        let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_id.entry(record.id.clone()).or_default().push(idx);
        }

        debug!(records = records.len(), ids = by_id.len(), "Store built");
        SuggestionStore { records, by_id }
    }

    /// Look up all records whose id equals `input`, in store order.
    ///
    /// Positions form a contiguous 0-based run. The result is a fresh value
    /// owned by the caller; the store itself is never written to.
    pub fn matches(&self, input: &str) -> Vec<Suggestion> {
        match self.by_id.get(input) {
            Some(indices) => indices
                .iter()
                .enumerate()
                .map(|(position, &idx)| Suggestion {
                    text: self.records[idx].name.clone(),
                    position,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Dataset loading errors. These surface at startup; the server keeps
/// running with the store unavailable rather than crashing.
#[derive(Debug)]
pub enum StoreError {
    FileRead(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::FileRead(path, e) => {
                write!(f, "Failed to read dataset '{}': {}", path.display(), e)
            }
            StoreError::Parse(path, e) => {
                write!(f, "Failed to parse dataset '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StoreError {}
