//! Raw query-value parsing for the todo list use-case.
//!
//! # Responsibility
//! - Read typed values out of a string map with defaults.
//! - Report malformed values as field errors instead of failing fast.
//!
//! # Invariants
//! - Parse errors and filter-validation errors are returned together.

use crate::query::filters::{Filters, TODO_SORT_SAFELIST};
use crate::validator::ValidationErrors;
use std::collections::HashMap;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_SORT: &str = "id";

/// Parsed and validated list parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTodosQuery {
    /// Full-text filter on title; empty matches everything.
    pub title: String,
    /// Full-text filter on description; empty matches everything.
    pub description: String,
    /// `None` disables the completed filter.
    pub completed: Option<bool>,
    pub filters: Filters,
}

impl Default for ListTodosQuery {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            completed: None,
            filters: Filters::todo_defaults(),
        }
    }
}

impl ListTodosQuery {
    /// Builds a list query from raw key/value pairs.
    ///
    /// Recognized keys: `title`, `description`, `completed`, `page`,
    /// `page_size`, `sort`.
    ///
    /// # Errors
    /// Returns every malformed or out-of-range field in one map.
    pub fn from_query_values(values: &HashMap<String, String>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = read_string(values, "title", "");
        let description = read_string(values, "description", "");
        let completed = read_bool(values, "completed", &mut errors);
        let page = read_int(values, "page", DEFAULT_PAGE, &mut errors);
        let page_size = read_int(values, "page_size", DEFAULT_PAGE_SIZE, &mut errors);
        let sort = read_string(values, "sort", DEFAULT_SORT);

        let filters = match Filters::new(page, page_size, sort, TODO_SORT_SAFELIST) {
            Ok(filters) => Some(filters),
            Err(filter_errors) => {
                errors.merge(filter_errors);
                None
            }
        };

        match filters {
            Some(filters) if errors.is_empty() => Ok(Self {
                title,
                description,
                completed,
                filters,
            }),
            _ => Err(errors),
        }
    }
}

/// Returns the value for `key`, or `default` when absent or empty.
pub fn read_string(values: &HashMap<String, String>, key: &str, default: &str) -> String {
    match values.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

/// Parses `key` as an integer, recording an error and returning `default`
/// when the value is malformed.
pub fn read_int(
    values: &HashMap<String, String>,
    key: &str,
    default: i64,
    errors: &mut ValidationErrors,
) -> i64 {
    let Some(value) = values.get(key).filter(|value| !value.is_empty()) else {
        return default;
    };

    match value.trim().parse::<i64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            errors.add(key, "must be an integer value");
            default
        }
    }
}

/// Parses `key` as a boolean. Absent or empty values yield `None`.
///
/// Accepts the spellings `true/false`, `t/f` and `1/0`, case-insensitively.
pub fn read_bool(
    values: &HashMap<String, String>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<bool> {
    let value = values.get(key).filter(|value| !value.is_empty())?;

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => {
            errors.add(key, "must be a boolean value");
            None
        }
    }
}
