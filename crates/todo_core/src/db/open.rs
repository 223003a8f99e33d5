//! Connection pool bootstrap for SQLite.
//!
//! # Responsibility
//! - Build file-backed or in-memory connection pools.
//! - Configure per-connection pragmas required by the store.
//! - Apply schema migrations before returning a usable pool.
//!
//! # Invariants
//! - Every pooled connection starts with `foreign_keys=ON` and a busy timeout
//!   equal to the configured operation timeout. Repository calls narrow the
//!   busy timeout to whatever is left of their own deadline.
//! - Returned pools have migrations fully applied.
//! - The in-memory pool holds exactly one connection that is never recycled,
//!   so the database lives as long as the pool.

use super::migrations::apply_migrations;
use super::{DbPool, DbResult};
use crate::config::StoreConfig;
use log::{error, info};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens the database described by `config`.
///
/// Uses a file-backed pool when `database_path` is set, otherwise an
/// in-memory pool.
pub fn open_pool(config: &StoreConfig) -> DbResult<DbPool> {
    match config.database_path.as_deref() {
        Some(path) => open_file_pool(path, config),
        None => open_pool_in_memory(config),
    }
}

/// Opens a single-connection in-memory database and applies migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_pool_in_memory(config: &StoreConfig) -> DbResult<DbPool> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let manager = SqliteConnectionManager::memory()
        .with_init(connection_init(config.operation_timeout));
    let built = r2d2::Pool::builder()
        .max_size(1)
        .min_idle(Some(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_timeout(config.operation_timeout)
        .build(manager);

    finish_open(built, "memory", false, started_at)
}

fn open_file_pool(path: &Path, config: &StoreConfig) -> DbResult<DbPool> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode=file pool_size={}",
        config.pool_size
    );

    let manager =
        SqliteConnectionManager::file(path).with_init(connection_init(config.operation_timeout));
    let built = r2d2::Pool::builder()
        .max_size(config.pool_size.max(1))
        .connection_timeout(config.operation_timeout)
        .build(manager);

    finish_open(built, "file", true, started_at)
}

fn finish_open(
    built: Result<DbPool, r2d2::Error>,
    mode: &'static str,
    use_wal: bool,
    started_at: Instant,
) -> DbResult<DbPool> {
    let pool = match built {
        Ok(pool) => pool,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_pool(&pool, use_wal) {
        Ok(schema_version) => {
            info!(
                "event=db_open module=db status=ok mode={} schema_version={} duration_ms={}",
                mode,
                schema_version,
                started_at.elapsed().as_millis()
            );
            Ok(pool)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_pool(pool: &DbPool, use_wal: bool) -> DbResult<u32> {
    let mut conn = pool.get()?;
    if use_wal {
        // Journal mode is persistent for the file, so once per open is enough.
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
    }
    apply_migrations(&mut conn)
}

fn connection_init(
    busy_timeout: Duration,
) -> impl Fn(&mut Connection) -> rusqlite::Result<()> + Send + Sync + 'static {
    move |conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(busy_timeout)?;
        Ok(())
    }
}
