//! Core data-access logic for the todo service.
//! This crate is the single source of truth for record invariants:
//! optimistic-locking updates, validated filtering/pagination and
//! pagination metadata.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod validator;

pub use config::{ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_env, logging_status};
pub use model::todo::{validate_todo, NewTodo, Todo, TodoId, TodoPatch};
pub use query::filters::{Filters, SortDirection, TODO_SORT_SAFELIST};
pub use query::metadata::{calculate_metadata, Metadata};
pub use query::params::ListTodosQuery;
pub use repo::todo_repo::{
    RepoError, RepoResult, SqliteTodoRepository, TodoPage, TodoRepository, TodoSearch,
};
pub use service::todo_service::{ServiceError, ServiceResult, TodoService};
pub use validator::ValidationErrors;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
