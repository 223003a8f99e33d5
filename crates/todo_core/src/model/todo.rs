//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical todo record and client payload shapes.
//! - Validate client-controlled fields before they reach the store.
//!
//! # Invariants
//! - `id` is monotonically increasing and immutable after insert.
//! - `version` starts at 1 and grows by exactly 1 per successful update.
//! - `title` is non-empty and at most 100 characters.
//! - `description` is non-empty and at most 1000 characters.

use crate::validator::ValidationErrors;
use serde::{Deserialize, Serialize};

/// Store-assigned todo identity.
pub type TodoId = i64;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Canonical todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    /// Unix epoch milliseconds. Not part of the external JSON shape.
    #[serde(skip)]
    pub created_at: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub completed: bool,
    /// Optimistic-locking token; callers echo it back, never change it.
    pub version: i32,
}

impl Todo {
    /// Creates an unsaved record. The store fills `id`, `created_at` and
    /// `version` on insert.
    pub fn new(title: impl Into<String>, description: impl Into<String>, completed: bool) -> Self {
        Self {
            id: 0,
            created_at: 0,
            title: title.into(),
            description: description.into(),
            completed,
            version: 0,
        }
    }

    /// Overwrites only the fields present in `patch`.
    pub fn apply(&mut self, patch: &TodoPatch) {
        if let Some(title) = patch.title.as_ref() {
            self.title = title.clone();
        }
        if let Some(description) = patch.description.as_ref() {
            self.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Client payload for creating a todo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl From<NewTodo> for Todo {
    fn from(value: NewTodo) -> Self {
        Todo::new(value.title, value.description, value.completed)
    }
}

/// Client payload for a partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// Checks client-controlled fields of `todo`.
///
/// # Errors
/// Returns a field-keyed map for every rule that fails.
pub fn validate_todo(todo: &Todo) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    errors.check(!todo.title.is_empty(), "title", "must be provided");
    errors.check(
        todo.title.chars().count() <= TITLE_MAX_CHARS,
        "title",
        "must be no more than 100 characters",
    );

    errors.check(!todo.description.is_empty(), "description", "must be provided");
    errors.check(
        todo.description.chars().count() <= DESCRIPTION_MAX_CHARS,
        "description",
        "must be no more than 1000 characters",
    );

    errors.into_result(())
}
