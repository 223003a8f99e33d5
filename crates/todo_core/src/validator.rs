//! Field-level validation error accumulation.
//!
//! # Responsibility
//! - Collect field-keyed messages produced by validating functions.
//! - Keep validation pure: every check returns its own error map.
//!
//! # Invariants
//! - The first message recorded for a field wins.
//! - Iteration order is stable (sorted by field name).

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field name → message mapping returned by validating functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Records `message` for `field` unless the field already has one.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    /// Records `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    /// Moves every entry of `other` into `self`, keeping existing messages.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, message) in other.errors {
            self.add(field, message);
        }
    }

    /// Returns `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

/// Returns whether `value` is one of `permitted`.
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.iter().any(|candidate| candidate == value)
}

#[cfg(test)]
mod tests {
    use super::{permitted_value, ValidationErrors};

    #[test]
    fn first_message_for_field_wins() {
        let mut errors = ValidationErrors::new();
        errors.check(false, "page", "must be greater than zero");
        errors.check(false, "page", "must be a maximum of 1000");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("page"), Some("must be greater than zero"));
    }

    #[test]
    fn passing_checks_leave_map_empty() {
        let mut errors = ValidationErrors::new();
        errors.check(true, "title", "must be provided");
        assert!(errors.into_result(7).is_ok_and(|value| value == 7));
    }

    #[test]
    fn display_joins_fields_in_order() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "must be provided");
        errors.add("description", "must be provided");
        assert_eq!(
            errors.to_string(),
            "description: must be provided; title: must be provided"
        );
    }

    #[test]
    fn permitted_value_matches_exactly() {
        let list = ["id", "-id"];
        assert!(permitted_value(&"-id", &list));
        assert!(!permitted_value(&"ID", &list));
    }
}
