//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the todo data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate records before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `EditConflict`,
//!   `Timeout`) in addition to DB transport errors.
//! - Every call is bounded by the configured operation timeout.

mod deadline;
pub mod todo_repo;
