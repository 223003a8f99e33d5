use rusqlite::{Connection, TransactionBehavior};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use todo_core::db::{open_pool, open_pool_in_memory};
use todo_core::{
    Filters, RepoError, SqliteTodoRepository, StoreConfig, Todo, TodoRepository, TodoSearch,
};

const SHORT_TIMEOUT: Duration = Duration::from_millis(100);

#[test]
fn pool_checkout_is_bounded_by_operation_timeout() {
    let config = StoreConfig::default().with_operation_timeout(SHORT_TIMEOUT);
    let pool = open_pool_in_memory(&config).unwrap();
    let repo = SqliteTodoRepository::new(pool.clone(), SHORT_TIMEOUT);

    let _held = pool.get().unwrap();
    let started_at = Instant::now();
    let err = repo.get(1).unwrap_err();

    assert!(
        matches!(err, RepoError::Timeout { operation: "todo_get", .. }),
        "unexpected error: {err}"
    );
    assert!(err.is_transient());
    assert!(started_at.elapsed() < Duration::from_secs(5));
}

#[test]
fn lock_wait_is_bounded_by_operation_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.db");
    let config = StoreConfig::file(&path).with_operation_timeout(SHORT_TIMEOUT);
    let repo = SqliteTodoRepository::open(&config).unwrap();

    let mut blocker = Connection::open(&path).unwrap();
    let tx = blocker
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .unwrap();

    let mut todo = Todo::new("Blocked", "waits on the exclusive lock", false);
    let err = repo.insert(&mut todo).unwrap_err();
    assert!(
        matches!(err, RepoError::Timeout { operation: "todo_insert", .. }),
        "unexpected error: {err}"
    );
    assert_eq!(todo.id, 0);

    tx.rollback().unwrap();
    repo.insert(&mut todo).unwrap();
    assert_eq!(todo.version, 1);
}

#[test]
fn connection_is_reusable_after_a_timeout() {
    let config = StoreConfig::default().with_operation_timeout(SHORT_TIMEOUT);
    let pool = open_pool_in_memory(&config).unwrap();
    let repo = SqliteTodoRepository::new(pool.clone(), SHORT_TIMEOUT);

    {
        let _held = pool.get().unwrap();
        assert!(repo.get(1).is_err());
    }

    let mut todo = Todo::new("After", "pool freed", false);
    repo.insert(&mut todo).unwrap();
    let filters = Filters::default();
    let page = repo.search(&TodoSearch::all(&filters)).unwrap();
    assert_eq!(page.items.len(), 1);
}

#[test]
fn pool_wait_and_lock_wait_share_one_deadline() {
    let limit = Duration::from_millis(400);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.db");
    let config = StoreConfig {
        pool_size: 1,
        ..StoreConfig::file(&path).with_operation_timeout(limit)
    };
    let pool = open_pool(&config).unwrap();
    let repo = SqliteTodoRepository::new(pool.clone(), limit);

    let mut blocker = Connection::open(&path).unwrap();
    let tx = blocker
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .unwrap();

    let (checked_out, wait_for_checkout) = mpsc::channel();
    let holder = thread::spawn(move || {
        let held = pool.get().unwrap();
        checked_out.send(()).unwrap();
        thread::sleep(Duration::from_millis(250));
        drop(held);
    });
    wait_for_checkout.recv().unwrap();

    let started_at = Instant::now();
    let mut todo = Todo::new("Late", "waits for the pool, then the lock", false);
    let err = repo.insert(&mut todo).unwrap_err();
    let elapsed = started_at.elapsed();

    assert!(
        matches!(err, RepoError::Timeout { operation: "todo_insert", .. }),
        "unexpected error: {err}"
    );
    assert!(
        elapsed < limit + Duration::from_millis(150),
        "call ran for {elapsed:?} with a {limit:?} limit"
    );

    holder.join().unwrap();
    tx.rollback().unwrap();
    repo.insert(&mut todo).unwrap();
    assert_eq!(todo.version, 1);
}
