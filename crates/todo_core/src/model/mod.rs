//! Domain model for todo records.
//!
//! # Responsibility
//! - Define the record shape shared by the store and the service layer.
//! - Own field-level validation rules for client-supplied values.
//!
//! # Invariants
//! - Identity, creation time and version are assigned by the store only.
//! - Deletion is a hard delete; there are no tombstones.

pub mod todo;
