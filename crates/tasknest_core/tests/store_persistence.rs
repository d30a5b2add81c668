use tasknest_core::{MemoryKvStore, Note, SqliteKvStore, Store, Task};

#[test]
fn store_state_survives_reopen_from_the_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.sqlite3");

    let task_id;
    let note_id;
    {
        let kv = SqliteKvStore::open(&path, "user-1").unwrap();
        let mut store = Store::open(Box::new(kv)).unwrap();
        task_id = store.add_task(Task::new("persist me")).unwrap();
        note_id = store.add_note(Note::new("durable note")).unwrap();
        store.set_uncategorized_position(2).unwrap();
        store.set_experimental_enabled(true).unwrap();
    }

    let kv = SqliteKvStore::open(&path, "user-1").unwrap();
    let store = Store::open(Box::new(kv)).unwrap();
    assert_eq!(store.task(&task_id).unwrap().title, "persist me");
    assert!(store.notes().iter().any(|note| note.id == note_id));
    assert_eq!(store.uncategorized_position(), 2);
    assert!(store.experimental().is_enabled);
}

#[test]
fn per_user_scopes_do_not_leak_into_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.sqlite3");

    {
        let kv = SqliteKvStore::open(&path, "user-1").unwrap();
        let mut store = Store::open(Box::new(kv)).unwrap();
        store.add_task(Task::new("belongs to user-1")).unwrap();
    }

    let kv = SqliteKvStore::open(&path, "user-2").unwrap();
    let store = Store::open(Box::new(kv)).unwrap();
    assert!(store.tasks().is_empty());
}

#[test]
fn malformed_persisted_tasks_fall_back_to_an_empty_collection() {
    let mut kv = MemoryKvStore::new();
    kv.set_raw("tasks", b"{definitely not json".to_vec());

    let store = Store::open(Box::new(kv)).unwrap();
    assert!(store.tasks().is_empty());
    // Defaults still install around the corrupt value.
    assert_eq!(store.categories().len(), 8);
}

#[test]
fn persisted_hierarchy_corruption_is_repaired_on_open() {
    let mut seed = Store::open(Box::new(MemoryKvStore::new())).unwrap();
    let root = seed.add_task(Task::new("root")).unwrap();
    let mut child = Task::new("child");
    child.parent_task_id = Some(root.clone());
    let child = seed.add_task(child).unwrap();

    // Simulate an older build that persisted a grandchild link.
    let mut kv = MemoryKvStore::new();
    let mut tasks = seed.tasks().to_vec();
    let mut grandchild = Task::new("grandchild");
    grandchild.parent_task_id = Some(child.clone());
    tasks.push(grandchild);
    kv.set_raw("tasks", serde_json::to_vec(&tasks).unwrap());

    let store = Store::open(Box::new(kv)).unwrap();
    let reopened_grandchild = store
        .tasks()
        .iter()
        .find(|task| task.title == "grandchild")
        .unwrap();
    assert!(reopened_grandchild.is_top_level());
    assert_eq!(
        store.task(&child).unwrap().parent_task_id.as_deref(),
        Some(root.as_str())
    );
}

#[test]
fn wire_format_uses_camel_case_fields() {
    let task = Task::new("wire check");
    let encoded = serde_json::to_string(&task).unwrap();
    assert!(encoded.contains("\"createdAt\""));
    assert!(encoded.contains("\"parentTaskId\""));
    assert!(encoded.contains("\"orderIndex\""));
    assert!(!encoded.contains("\"created_at\""));
}
