//! Append-only answer history.
//!
//! Question/answer pairs land in a JSON file so later sessions can reuse
//! them for exact lookups and few-shot prompting. The log is index
//! addressable for update and delete; the tracker is the single writer
//! under the sequential orchestration model.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use formpilot_core_types::{FieldType, HistoryEntry};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file corrupt: {0}")]
    Corrupt(String),

    #[error("history index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Aggregate statistics over the history log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistoryStats {
    pub total_entries: usize,
    pub edited_count: usize,
    pub avg_confidence: f64,
    pub field_types: HashMap<String, usize>,
}

pub struct AnswerHistoryTracker {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl AnswerHistoryTracker {
    /// Open (or create) the history file at `path`.
    ///
    /// A corrupt file is logged and treated as empty rather than aborting
    /// startup; the next save overwrites it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| HistoryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), %err, "history file corrupt, starting empty");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(HistoryError::Io { path, source }),
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<(), HistoryError> {
        let raw = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| HistoryError::Corrupt(err.to_string()))?;
        fs::write(&self.path, raw).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Append one entry and persist.
    pub fn add_entry(&mut self, entry: HistoryEntry) -> Result<(), HistoryError> {
        self.entries.push(entry);
        self.save()
    }

    /// The N most recent entries, oldest of them first.
    pub fn recent_entries(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// All entries recorded for one field type.
    pub fn entries_by_field_type(&self, field_type: FieldType) -> Vec<&HistoryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.field_type == field_type)
            .collect()
    }

    /// Entries whose question or answer contains the query,
    /// case-insensitively.
    pub fn search_entries(&self, query: &str) -> Vec<&HistoryEntry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                entry.question.to_lowercase().contains(&needle)
                    || entry.answer.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Replace an entry's answer, marking it edited and stamping the
    /// modification time.
    pub fn update_entry(&mut self, index: usize, new_answer: &str) -> Result<(), HistoryError> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(HistoryError::OutOfRange { index, len })?;
        entry.answer = new_answer.to_string();
        entry.was_edited = true;
        entry.last_modified = Some(Utc::now());
        self.save()
    }

    /// Remove the entry at `index`.
    pub fn delete_entry(&mut self, index: usize) -> Result<(), HistoryError> {
        let len = self.entries.len();
        if index >= len {
            return Err(HistoryError::OutOfRange { index, len });
        }
        self.entries.remove(index);
        self.save()
    }

    pub fn stats(&self) -> HistoryStats {
        if self.entries.is_empty() {
            return HistoryStats::default();
        }

        let edited_count = self.entries.iter().filter(|entry| entry.was_edited).count();
        let avg_confidence = self
            .entries
            .iter()
            .map(|entry| entry.confidence)
            .sum::<f64>()
            / self.entries.len() as f64;

        let mut field_types: HashMap<String, usize> = HashMap::new();
        for entry in &self.entries {
            *field_types
                .entry(entry.field_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        HistoryStats {
            total_entries: self.entries.len(),
            edited_count,
            avg_confidence,
            field_types,
        }
    }

    /// Write the full log to another JSON file.
    pub fn export_to_json(&self, output: impl AsRef<Path>) -> Result<(), HistoryError> {
        let output = output.as_ref();
        let raw = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| HistoryError::Corrupt(err.to_string()))?;
        fs::write(output, raw).map_err(|source| HistoryError::Io {
            path: output.to_path_buf(),
            source,
        })?;
        info!(path = %output.display(), entries = self.entries.len(), "exported history");
        Ok(())
    }

    /// Append entries from another JSON export.
    pub fn import_from_json(&mut self, input: impl AsRef<Path>) -> Result<usize, HistoryError> {
        let input = input.as_ref();
        let raw = fs::read_to_string(input).map_err(|source| HistoryError::Io {
            path: input.to_path_buf(),
            source,
        })?;
        let imported: Vec<HistoryEntry> =
            serde_json::from_str(&raw).map_err(|err| HistoryError::Corrupt(err.to_string()))?;
        let count = imported.len();
        self.entries.extend(imported);
        self.save()?;
        info!(path = %input.display(), count, "imported history entries");
        Ok(count)
    }

    /// Drop every entry.
    pub fn clear_all(&mut self) -> Result<(), HistoryError> {
        self.entries.clear();
        self.save()
    }
}
