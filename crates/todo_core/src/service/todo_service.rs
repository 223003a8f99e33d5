//! Todo use-case service.
//!
//! # Responsibility
//! - Provide create/show/update/delete/list entry points for transport layers.
//! - Classify repository failures for the caller.
//!
//! # Invariants
//! - Updates always start from a fresh read and go through the repository's
//!   conditional write; conflicts are never resolved by overwriting.
//! - Field validation is owned by the repository write path; the service
//!   never writes around it.

use crate::model::todo::{NewTodo, Todo, TodoId, TodoPatch};
use crate::query::params::ListTodosQuery;
use crate::repo::todo_repo::{RepoError, TodoPage, TodoRepository, TodoSearch};
use crate::validator::ValidationErrors;
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error classes crossing the core boundary.
///
/// Transport layers map these to their own status codes.
#[derive(Debug)]
pub enum ServiceError {
    NotFound(TodoId),
    /// Another writer advanced the record; re-read and retry.
    EditConflict(TodoId),
    Validation(ValidationErrors),
    /// Engine, connectivity or timeout failure; the whole call may be retried.
    Storage(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::EditConflict(id) => write!(
                f,
                "unable to update todo {id} due to an edit conflict, please try again"
            ),
            Self::Validation(errors) => write!(f, "validation failed: {errors}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::EditConflict { id, .. } => Self::EditConflict(id),
            RepoError::Validation(errors) => Self::Validation(errors),
            other => Self::Storage(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Use-case service wrapper for todo operations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Stores a new todo, returning it with store-assigned
    /// identity, timestamp and version.
    pub fn create_todo(&self, input: NewTodo) -> ServiceResult<Todo> {
        let mut todo = Todo::from(input);
        self.repo.insert(&mut todo)?;
        info!(
            "event=todo_create module=service status=ok id={} version={}",
            todo.id, todo.version
        );
        Ok(todo)
    }

    pub fn show_todo(&self, id: TodoId) -> ServiceResult<Todo> {
        Ok(self.repo.get(id)?)
    }

    /// Applies `patch` to the current record and writes it back if nobody
    /// changed it in between.
    ///
    /// # Errors
    /// - `EditConflict` when the record's version moved after the read.
    /// - `Validation` when the patched record breaks field rules.
    pub fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> ServiceResult<Todo> {
        let mut todo = self.repo.get(id)?;
        todo.apply(patch);
        self.repo.update(&mut todo)?;
        info!(
            "event=todo_update module=service status=ok id={} version={}",
            todo.id, todo.version
        );
        Ok(todo)
    }

    /// Like [`TodoService::update_todo`], but re-reads and re-applies the patch
    /// after each edit conflict, up to `max_attempts` tries in total.
    pub fn update_todo_with_retry(
        &self,
        id: TodoId,
        patch: &TodoPatch,
        max_attempts: u32,
    ) -> ServiceResult<Todo> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.update_todo(id, patch) {
                Err(ServiceError::EditConflict(_)) if attempt < max_attempts => {
                    warn!(
                        "event=todo_update module=service status=retry id={} attempt={}",
                        id, attempt
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub fn delete_todo(&self, id: TodoId) -> ServiceResult<()> {
        self.repo.delete(id)?;
        info!("event=todo_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Returns one page of todos matching an already validated query.
    pub fn list_todos(&self, query: &ListTodosQuery) -> ServiceResult<TodoPage> {
        Ok(self.repo.search(&TodoSearch::from(query))?)
    }

    /// Parses raw query values, then lists. Validation failures stop the call
    /// before any storage access.
    pub fn list_todos_from_query(
        &self,
        values: &HashMap<String, String>,
    ) -> ServiceResult<TodoPage> {
        let query = ListTodosQuery::from_query_values(values)?;
        self.list_todos(&query)
    }
}
