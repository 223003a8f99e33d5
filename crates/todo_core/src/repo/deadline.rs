//! Per-call execution deadline for pooled SQLite connections.
//!
//! # Invariants
//! - At most one deadline is installed on a connection at a time.
//! - The progress handler is removed when the guard drops, on every exit path,
//!   so a connection returns to the pool without a stale deadline.
//! - The deadline is an absolute instant; time spent before install counts.

use rusqlite::{Connection, ErrorCode};
use std::time::Instant;

/// VM instructions between deadline checks.
const PROGRESS_CHECK_INTERVAL: i32 = 1_000;

/// Interrupts statements on `conn` once `deadline` has passed.
pub(crate) struct DeadlineGuard<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DeadlineGuard<'conn> {
    pub(crate) fn install(conn: &'conn Connection, deadline: Instant) -> Self {
        conn.progress_handler(
            PROGRESS_CHECK_INTERVAL,
            Some(move || Instant::now() >= deadline),
        );
        Self { conn }
    }
}

impl Drop for DeadlineGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

/// Returns whether `err` means the call ran out of time: interrupted by the
/// deadline, or still blocked on a lock when the busy timeout expired.
pub(crate) fn is_deadline_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::OperationInterrupted | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}
