//! Todo repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/get/update/delete/search over the `todos` table.
//! - Enforce optimistic locking on update with a single conditional write.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `update` matches on both `id` and the caller's `version`; the version is
//!   bumped by the same statement. There is no read-then-write path.
//! - Sort identifiers reach SQL only through validated [`Filters`].
//! - Search ordering always ends with `id ASC` so pages are stable.

use super::deadline::{is_deadline_error, DeadlineGuard};
use crate::config::StoreConfig;
use crate::db::{open_pool, DbError, DbPool, PooledConnection};
use crate::model::todo::{validate_todo, Todo, TodoId};
use crate::query::filters::Filters;
use crate::query::metadata::{calculate_metadata, Metadata};
use crate::query::params::ListTodosQuery;
use crate::validator::ValidationErrors;
use log::{debug, error, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

const TODO_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    title,
    description,
    completed,
    version
FROM todos";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Record rejected before reaching storage.
    Validation(ValidationErrors),
    /// No row matches the identity.
    NotFound(TodoId),
    /// The row moved past `expected_version` (or vanished) before the write.
    EditConflict {
        id: TodoId,
        expected_version: i32,
    },
    /// The call exceeded its time bound and was aborted.
    Timeout {
        operation: &'static str,
        limit: Duration,
    },
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    /// Whether re-reading and re-applying the change is the expected recovery.
    pub fn is_edit_conflict(&self) -> bool {
        matches!(self, Self::EditConflict { .. })
    }

    /// Whether retrying the whole operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Db(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::EditConflict {
                id,
                expected_version,
            } => write!(
                f,
                "edit conflict on todo {id}: version {expected_version} is no longer current"
            ),
            Self::Timeout { operation, limit } => {
                write!(f, "{operation} timed out after {}ms", limit.as_millis())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for RepoError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search criteria for [`TodoRepository::search`].
#[derive(Debug, Clone, Copy)]
pub struct TodoSearch<'a> {
    /// Full-text filter on title; blank matches every row.
    pub title: &'a str,
    /// Full-text filter on description; blank matches every row.
    pub description: &'a str,
    /// `None` disables the filter; `Some(flag)` matches `completed = flag`.
    pub completed: Option<bool>,
    pub filters: &'a Filters,
}

impl<'a> TodoSearch<'a> {
    /// Unfiltered search paged by `filters`.
    pub fn all(filters: &'a Filters) -> Self {
        Self {
            title: "",
            description: "",
            completed: None,
            filters,
        }
    }
}

impl<'a> From<&'a ListTodosQuery> for TodoSearch<'a> {
    fn from(value: &'a ListTodosQuery) -> Self {
        Self {
            title: &value.title,
            description: &value.description,
            completed: value.completed,
            filters: &value.filters,
        }
    }
}

/// One page of search results with its pagination summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPage {
    pub items: Vec<Todo>,
    pub metadata: Metadata,
}

/// Repository interface for todo records.
pub trait TodoRepository: Send + Sync {
    /// Persists a new record and writes the assigned `id`, `created_at` and
    /// `version` back into `todo`.
    fn insert(&self, todo: &mut Todo) -> RepoResult<()>;
    /// Loads one record. Ids below 1 are never looked up.
    fn get(&self, id: TodoId) -> RepoResult<Todo>;
    /// Conditionally writes `todo` if its `version` is still current, then
    /// stores the incremented version back into `todo`.
    fn update(&self, todo: &mut Todo) -> RepoResult<()>;
    /// Hard-deletes one record.
    fn delete(&self, id: TodoId) -> RepoResult<()>;
    /// Returns one filtered, ordered page plus pagination metadata.
    fn search(&self, search: &TodoSearch<'_>) -> RepoResult<TodoPage>;
}

/// SQLite-backed todo repository over a shared connection pool.
#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: DbPool,
    operation_timeout: Duration,
}

impl SqliteTodoRepository {
    /// Wraps an already migrated pool.
    pub fn new(pool: DbPool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
        }
    }

    /// Opens (and migrates) the database described by `config`.
    pub fn open(config: &StoreConfig) -> RepoResult<Self> {
        let pool = open_pool(config)?;
        Ok(Self::new(pool, config.operation_timeout))
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Runs `run` on a pooled connection under the per-call deadline.
    ///
    /// The deadline is fixed on entry and shared by pool checkout, lock waits
    /// and statement execution. Interrupted statements, expired lock waits and
    /// pool checkout failures are reported as [`RepoError::Timeout`].
    fn with_connection<T>(
        &self,
        operation: &'static str,
        run: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let deadline = started_at + self.operation_timeout;
        let result = self.checkout(operation, deadline).and_then(|pooled| {
            let conn: &Connection = &pooled;
            conn.busy_timeout(deadline.saturating_duration_since(Instant::now()))?;
            let _deadline = DeadlineGuard::install(conn, deadline);
            run(conn)
        });

        let result = match result {
            Err(RepoError::Db(DbError::Sqlite(err))) if is_deadline_error(&err) => {
                Err(RepoError::Timeout {
                    operation,
                    limit: self.operation_timeout,
                })
            }
            other => other,
        };

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => debug!("event={operation} module=repo status=ok duration_ms={duration_ms}"),
            Err(RepoError::Timeout { .. }) => warn!(
                "event={operation} module=repo status=timeout duration_ms={duration_ms} limit_ms={}",
                self.operation_timeout.as_millis()
            ),
            Err(err) => error!(
                "event={operation} module=repo status=error duration_ms={duration_ms} error={err}"
            ),
        }

        result
    }

    fn checkout(
        &self,
        operation: &'static str,
        deadline: Instant,
    ) -> RepoResult<PooledConnection> {
        self.pool
            .get_timeout(deadline.saturating_duration_since(Instant::now()))
            .map_err(|err| {
                warn!("event={operation} module=repo status=pool_exhausted error={err}");
                RepoError::Timeout {
                    operation,
                    limit: self.operation_timeout,
                }
            })
    }
}

impl TodoRepository for SqliteTodoRepository {
    fn insert(&self, todo: &mut Todo) -> RepoResult<()> {
        validate_todo(todo)?;

        let (id, created_at, version) = self.with_connection("todo_insert", |conn| {
            let assigned = conn.query_row(
                "INSERT INTO todos (title, description, completed)
                 VALUES (?1, ?2, ?3)
                 RETURNING id, created_at, version;",
                params![todo.title.as_str(), todo.description.as_str(), todo.completed],
                |row| {
                    Ok((
                        row.get::<_, TodoId>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i32>(2)?,
                    ))
                },
            )?;
            Ok(assigned)
        })?;

        todo.id = id;
        todo.created_at = created_at;
        todo.version = version;
        Ok(())
    }

    fn get(&self, id: TodoId) -> RepoResult<Todo> {
        if id < 1 {
            return Err(RepoError::NotFound(id));
        }

        let found = self.with_connection("todo_get", |conn| {
            let todo = conn
                .query_row(
                    &format!("{TODO_SELECT_SQL} WHERE id = ?1;"),
                    [id],
                    parse_todo_row,
                )
                .optional()?;
            Ok(todo)
        })?;

        found.ok_or(RepoError::NotFound(id))
    }

    fn update(&self, todo: &mut Todo) -> RepoResult<()> {
        validate_todo(todo)?;

        let new_version: Option<i32> = self.with_connection("todo_update", |conn| {
            let version = conn
                .query_row(
                    "UPDATE todos
                     SET
                        title = ?1,
                        description = ?2,
                        completed = ?3,
                        version = version + 1
                     WHERE id = ?4
                       AND version = ?5
                     RETURNING version;",
                    params![
                        todo.title.as_str(),
                        todo.description.as_str(),
                        todo.completed,
                        todo.id,
                        todo.version,
                    ],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(version)
        })?;

        match new_version {
            Some(version) => {
                todo.version = version;
                Ok(())
            }
            None => {
                debug!(
                    "event=todo_update module=repo status=conflict id={} expected_version={}",
                    todo.id, todo.version
                );
                Err(RepoError::EditConflict {
                    id: todo.id,
                    expected_version: todo.version,
                })
            }
        }
    }

    fn delete(&self, id: TodoId) -> RepoResult<()> {
        if id < 1 {
            return Err(RepoError::NotFound(id));
        }

        let changed = self.with_connection("todo_delete", |conn| {
            Ok(conn.execute("DELETE FROM todos WHERE id = ?1;", [id])?)
        })?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn search(&self, search: &TodoSearch<'_>) -> RepoResult<TodoPage> {
        let filters = search.filters;
        let mut sql = String::from(
            "SELECT
                COUNT(*) OVER () AS total_records,
                id,
                created_at,
                title,
                description,
                completed,
                version
             FROM todos
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(match_expr) = build_match_expression(search.title, search.description) {
            sql.push_str(" AND id IN (SELECT rowid FROM todos_fts WHERE todos_fts MATCH ?)");
            bind_values.push(Value::Text(match_expr));
        }

        if let Some(completed) = search.completed {
            sql.push_str(" AND completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        sql.push_str(&format!(
            " ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
            filters.sort_column(),
            filters.sort_direction().as_sql()
        ));
        bind_values.push(Value::Integer(filters.limit()));
        bind_values.push(Value::Integer(filters.offset()));

        let (items, total_records) = self.with_connection("todo_search", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut items = Vec::new();
            let mut total_records: i64 = 0;

            while let Some(row) = rows.next()? {
                total_records = row.get("total_records")?;
                items.push(parse_todo_row(row)?);
            }

            Ok((items, total_records))
        })?;

        let total_records = u64::try_from(total_records).map_err(|_| {
            RepoError::InvalidData(format!("negative window count `{total_records}`"))
        })?;

        Ok(TodoPage {
            items,
            metadata: calculate_metadata(total_records, filters.page(), filters.page_size()),
        })
    }
}

fn parse_todo_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get("id")?,
        created_at: row.get("created_at")?,
        title: row.get("title")?,
        description: row.get("description")?,
        completed: row.get("completed")?,
        version: row.get("version")?,
    })
}

/// Builds an FTS5 expression requiring every whitespace-separated term of each
/// non-blank filter to appear in its column. Returns `None` when both filters
/// are blank.
fn build_match_expression(title: &str, description: &str) -> Option<String> {
    let terms = column_terms("title", title)
        .chain(column_terms("description", description))
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}

fn column_terms<'a>(column: &'a str, text: &'a str) -> impl Iterator<Item = String> + 'a {
    text.split_whitespace()
        .map(move |term| format!("{column} : {}", escape_fts_term(term)))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
