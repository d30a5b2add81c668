use tasknest_core::{MemoryKvStore, Store, Task, TaskCommand, TaskUndoStack};

fn open_store() -> Store {
    Store::open(Box::new(MemoryKvStore::new())).unwrap()
}

#[test]
fn undo_restores_a_deleted_task_with_its_identity() {
    let mut store = open_store();
    let mut history = TaskUndoStack::new();

    let mut task = Task::new("precious");
    task.categories = vec!["house".to_string()];
    let id = store.add_task(task).unwrap();

    store.delete_task_recorded(&id, &mut history).unwrap();
    assert!(store.task(&id).is_none());
    assert!(history.can_undo());

    assert!(history.undo(&mut store).unwrap());
    let restored = store.task(&id).expect("undo must bring the task back");
    assert_eq!(restored.title, "precious");
    assert_eq!(restored.categories, vec!["house".to_string()]);
}

#[test]
fn redo_replays_the_undone_deletion() {
    let mut store = open_store();
    let mut history = TaskUndoStack::new();
    let id = store.add_task(Task::new("gone again")).unwrap();

    store.delete_task_recorded(&id, &mut history).unwrap();
    history.undo(&mut store).unwrap();
    assert!(history.can_redo());

    assert!(history.redo(&mut store).unwrap());
    assert!(store.task(&id).is_none());
    assert!(history.can_undo());
}

#[test]
fn recording_a_new_command_clears_the_redo_branch() {
    let mut store = open_store();
    let mut history = TaskUndoStack::new();
    let first = store.add_task(Task::new("first")).unwrap();
    let second = store.add_task(Task::new("second")).unwrap();

    store.delete_task_recorded(&first, &mut history).unwrap();
    history.undo(&mut store).unwrap();
    assert!(history.can_redo());

    store.delete_task_recorded(&second, &mut history).unwrap();
    assert!(!history.can_redo());
}

#[test]
fn undo_and_redo_on_empty_stacks_report_false() {
    let mut store = open_store();
    let mut history = TaskUndoStack::new();

    assert!(!history.undo(&mut store).unwrap());
    assert!(!history.redo(&mut store).unwrap());
}

#[test]
fn command_inversion_is_symmetric() {
    let task = Task::new("sample");
    let delete = TaskCommand::Delete(task.clone());
    let add = delete.invert();
    assert!(matches!(add, TaskCommand::Add(ref inner) if inner.id == task.id));
    assert!(matches!(add.invert(), TaskCommand::Delete(ref inner) if inner.id == task.id));
}

#[test]
fn recorded_delete_skips_parents_with_children() {
    let mut store = open_store();
    let mut history = TaskUndoStack::new();

    let parent = store.add_task(Task::new("parent")).unwrap();
    let mut child = Task::new("child");
    child.parent_task_id = Some(parent.clone());
    store.add_task(child).unwrap();

    store.delete_task_recorded(&parent, &mut history).unwrap();
    assert!(store.task(&parent).is_some());
    assert!(!history.can_undo());
}
