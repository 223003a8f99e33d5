//! List-query shaping: filter validation, pagination and result metadata.
//!
//! # Responsibility
//! - Turn raw caller parameters into a validated [`filters::Filters`] value.
//! - Derive ORDER BY / LIMIT / OFFSET inputs for the store.
//! - Summarize a result page with [`metadata::Metadata`].
//!
//! # Invariants
//! - Sort keys reach SQL construction only after allow-list validation.

pub mod filters;
pub mod metadata;
pub mod params;
