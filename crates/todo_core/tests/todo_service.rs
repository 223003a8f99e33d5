use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use todo_core::{
    NewTodo, RepoResult, ServiceError, SqliteTodoRepository, StoreConfig, Todo, TodoId,
    TodoPage, TodoPatch, TodoRepository, TodoSearch, TodoService,
};

fn memory_service() -> TodoService<SqliteTodoRepository> {
    TodoService::new(SqliteTodoRepository::open(&StoreConfig::default()).unwrap())
}

fn new_todo(title: &str, description: &str, completed: bool) -> NewTodo {
    NewTodo {
        title: title.to_string(),
        description: description.to_string(),
        completed,
    }
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn create_then_show_returns_stored_record() {
    let service = memory_service();

    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();
    assert_eq!(created.version, 1);

    let shown = service.show_todo(created.id).unwrap();
    assert_eq!(shown, created);
}

#[test]
fn create_rejects_invalid_payload_before_storage() {
    let service = memory_service();

    let err = service.create_todo(new_todo("", "", false)).unwrap_err();
    match err {
        ServiceError::Validation(errors) => {
            assert_eq!(errors.get("title"), Some("must be provided"));
            assert_eq!(errors.get("description"), Some("must be provided"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let page = service.list_todos_from_query(&HashMap::new()).unwrap();
    assert!(page.items.is_empty());
}

#[test]
fn partial_update_keeps_untouched_fields() {
    let service = memory_service();
    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();

    let updated = service
        .update_todo(
            created.id,
            &TodoPatch {
                completed: Some(true),
                ..TodoPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.title, "Buy milk");
    assert_eq!(updated.description, "two litres");
    assert!(updated.completed);
    assert_eq!(updated.version, 2);
}

#[test]
fn update_reports_missing_and_invalid_records() {
    let service = memory_service();

    assert!(matches!(
        service.update_todo(77, &TodoPatch::default()).unwrap_err(),
        ServiceError::NotFound(77)
    ));

    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();
    let err = service
        .update_todo(
            created.id,
            &TodoPatch {
                title: Some(String::new()),
                ..TodoPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref errors) if errors.contains("title")));
    assert_eq!(service.show_todo(created.id).unwrap().version, 1);
}

/// Counts writes that reach the store.
struct CountingRepository {
    inner: SqliteTodoRepository,
    writes: AtomicUsize,
}

impl CountingRepository {
    fn open() -> Self {
        Self {
            inner: SqliteTodoRepository::open(&StoreConfig::default()).unwrap(),
            writes: AtomicUsize::new(0),
        }
    }
}

impl TodoRepository for CountingRepository {
    fn insert(&self, todo: &mut Todo) -> RepoResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(todo)
    }

    fn get(&self, id: TodoId) -> RepoResult<Todo> {
        self.inner.get(id)
    }

    fn update(&self, todo: &mut Todo) -> RepoResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(todo)
    }

    fn delete(&self, id: TodoId) -> RepoResult<()> {
        self.inner.delete(id)
    }

    fn search(&self, search: &TodoSearch<'_>) -> RepoResult<TodoPage> {
        self.inner.search(search)
    }
}

#[test]
fn invalid_writes_are_rejected_by_the_store_guard() {
    let service = TodoService::new(CountingRepository::open());

    let err = service.create_todo(new_todo("", "", false)).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref errors) if errors.contains("title")));
    assert_eq!(service.repository().writes.load(Ordering::SeqCst), 1);

    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();
    let err = service
        .update_todo(
            created.id,
            &TodoPatch {
                description: Some(String::new()),
                ..TodoPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref errors) if errors.contains("description")));
    assert_eq!(service.repository().writes.load(Ordering::SeqCst), 3);
    assert_eq!(service.show_todo(created.id).unwrap().version, 1);
}

/// Lets another writer slip in right before the first conditional write.
struct InterferingRepository {
    inner: SqliteTodoRepository,
    interfered: AtomicBool,
}

impl TodoRepository for InterferingRepository {
    fn insert(&self, todo: &mut Todo) -> RepoResult<()> {
        self.inner.insert(todo)
    }

    fn get(&self, id: TodoId) -> RepoResult<Todo> {
        self.inner.get(id)
    }

    fn update(&self, todo: &mut Todo) -> RepoResult<()> {
        if !self.interfered.swap(true, Ordering::SeqCst) {
            let mut other = self.inner.get(todo.id)?;
            other.description = "three litres".to_string();
            self.inner.update(&mut other)?;
        }
        self.inner.update(todo)
    }

    fn delete(&self, id: TodoId) -> RepoResult<()> {
        self.inner.delete(id)
    }

    fn search(&self, search: &TodoSearch<'_>) -> RepoResult<TodoPage> {
        self.inner.search(search)
    }
}

fn interfering_service() -> TodoService<InterferingRepository> {
    TodoService::new(InterferingRepository {
        inner: SqliteTodoRepository::open(&StoreConfig::default()).unwrap(),
        interfered: AtomicBool::new(false),
    })
}

#[test]
fn update_surfaces_edit_conflict_from_concurrent_writer() {
    let service = interfering_service();
    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();

    let patch = TodoPatch {
        completed: Some(true),
        ..TodoPatch::default()
    };
    let err = service.update_todo(created.id, &patch).unwrap_err();
    assert!(matches!(err, ServiceError::EditConflict(id) if id == created.id));

    let stored = service.show_todo(created.id).unwrap();
    assert_eq!(stored.description, "three litres");
    assert!(!stored.completed);
    assert_eq!(stored.version, 2);
}

#[test]
fn update_with_retry_reapplies_patch_on_fresh_read() {
    let service = interfering_service();
    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();

    let patch = TodoPatch {
        completed: Some(true),
        ..TodoPatch::default()
    };
    let updated = service
        .update_todo_with_retry(created.id, &patch, 3)
        .unwrap();

    assert_eq!(updated.description, "three litres");
    assert!(updated.completed);
    assert_eq!(updated.version, 3);
}

#[test]
fn update_with_single_attempt_does_not_retry() {
    let service = interfering_service();
    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();

    let err = service
        .update_todo_with_retry(created.id, &TodoPatch::default(), 1)
        .unwrap_err();
    assert!(matches!(err, ServiceError::EditConflict(_)));
}

#[test]
fn delete_then_show_is_not_found() {
    let service = memory_service();
    let created = service
        .create_todo(new_todo("Buy milk", "two litres", false))
        .unwrap();

    service.delete_todo(created.id).unwrap();
    assert!(matches!(
        service.show_todo(created.id).unwrap_err(),
        ServiceError::NotFound(_)
    ));
    assert!(matches!(
        service.delete_todo(999_999).unwrap_err(),
        ServiceError::NotFound(999_999)
    ));
}

#[test]
fn list_from_query_filters_sorts_and_pages() {
    let service = memory_service();
    let milk = service
        .create_todo(new_todo("Buy milk", "corner shop", false))
        .unwrap();
    let report = service
        .create_todo(new_todo("Write report", "quarterly numbers", true))
        .unwrap();
    let bread = service
        .create_todo(new_todo("Buy bread", "bakery", false))
        .unwrap();

    let page = service
        .list_todos_from_query(&query(&[("title", "buy"), ("sort", "-title")]))
        .unwrap();
    let ids = page.items.iter().map(|todo| todo.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![milk.id, bread.id]);
    assert_eq!(page.metadata.total_records, 2);

    let page = service
        .list_todos_from_query(&query(&[("completed", "true")]))
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, report.id);

    let page = service
        .list_todos_from_query(&query(&[("page", "2"), ("page_size", "2")]))
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, bread.id);
    assert_eq!(page.metadata.last_page, 2);
}

#[test]
fn list_from_query_rejects_invalid_parameters() {
    let service = memory_service();

    let err = service
        .list_todos_from_query(&query(&[("page", "0"), ("sort", "created_at")]))
        .unwrap_err();
    match err {
        ServiceError::Validation(errors) => {
            assert_eq!(errors.get("page"), Some("must be greater than zero"));
            assert_eq!(errors.get("sort"), Some("invalid sort value"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
