//! Append-only activity log

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sku recorded for actions that touch more than one row
pub const BULK_SKU: &str = "ALL";

/// Kinds of state transitions recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    Upload,
    Add,
    Edit,
    Delete,
    Restore,
    PermanentDelete,
    ClearDeleted,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Upload => "Upload",
            ChangeAction::Add => "Add",
            ChangeAction::Edit => "Edit",
            ChangeAction::Delete => "Delete",
            ChangeAction::Restore => "Restore",
            ChangeAction::PermanentDelete => "PermanentDelete",
            ChangeAction::ClearDeleted => "ClearDeleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Upload" => Some(ChangeAction::Upload),
            "Add" => Some(ChangeAction::Add),
            "Edit" => Some(ChangeAction::Edit),
            "Delete" => Some(ChangeAction::Delete),
            "Restore" => Some(ChangeAction::Restore),
            "PermanentDelete" => Some(ChangeAction::PermanentDelete),
            "ClearDeleted" => Some(ChangeAction::ClearDeleted),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log line. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: ChangeAction,
    pub sku: String,
    pub description: String,
}

impl ChangeLogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        action: ChangeAction,
        sku: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            action,
            sku: sku.into(),
            description: description.into(),
        }
    }

    pub fn is_bulk(&self) -> bool {
        self.sku == BULK_SKU
    }
}

/// Chronological log; entries are only ever appended or cleared wholesale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    entries: Vec<ChangeLogEntry>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ChangeLogEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: ChangeLogEntry) {
        self.entries.push(entry);
    }

    /// Append and return a copy of the new entry
    pub fn record(
        &mut self,
        timestamp: DateTime<Utc>,
        action: ChangeAction,
        sku: impl Into<String>,
        description: impl Into<String>,
    ) -> ChangeLogEntry {
        let entry = ChangeLogEntry::new(timestamp, action, sku, description);
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[ChangeLogEntry] {
        &self.entries
    }

    /// Entries appended at or after `index`
    pub fn since(&self, index: usize) -> &[ChangeLogEntry] {
        self.entries.get(index..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Admin wipe, returns how many entries were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}
