use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, Result};

/// Progress state of a single todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TodoStatus {
    Completed,
    #[default]
    NotStarted,
    InProgress,
    Blocked,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 4] = [
        TodoStatus::Completed,
        TodoStatus::NotStarted,
        TodoStatus::InProgress,
        TodoStatus::Blocked,
    ];

    /// Wire name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Completed => "completed",
            TodoStatus::NotStarted => "not-started",
            TodoStatus::InProgress => "in-progress",
            TodoStatus::Blocked => "blocked",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TodoStatus::Completed)
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = ModelError;

    /// Accepts the wire names plus underscore/space spellings, case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        TodoStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownStatus(s.to_string()))
    }
}

/// One entry of a todo list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub subject: String,
    pub status: TodoStatus,
}

impl TodoItem {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, status: TodoStatus) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            status,
        }
    }
}

/// A personal todo list.
///
/// Field order and wire names follow the `.todolistx` envelope layout
/// (`id`, `text`, `title`, `timeStamp`, `todo`). Content checksums are taken
/// over the serialized form, so the order must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDocument {
    pub id: String,
    pub text: String,
    pub title: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "timeStamp")]
    pub time_stamp: i64,
    #[serde(rename = "todo", default)]
    pub items: Vec<TodoItem>,
}

impl TodoDocument {
    /// Create an empty document with the given id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            title: title.into(),
            time_stamp: 0,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_time_stamp(mut self, time_stamp: i64) -> Self {
        self.time_stamp = time_stamp;
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: TodoItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.status.is_done()).count()
    }

    pub fn item(&self, id: &str) -> Option<&TodoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Check that the document and all of its items carry unique, non-empty ids.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ModelError::EmptyId { what: "document" });
        }
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if item.id.trim().is_empty() {
                return Err(ModelError::EmptyId { what: "item" });
            }
            if !seen.insert(item.id.as_str()) {
                return Err(ModelError::DuplicateItemId {
                    id: item.id.clone(),
                });
            }
        }
        Ok(())
    }
}
