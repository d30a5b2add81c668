use std::sync::{Arc, Mutex};

use tasknest_core::{
    MemoryKvStore, Priority, ReminderError, ReminderResult, ReminderScheduling, Store, Task,
};

fn open_store() -> Store {
    Store::open(Box::new(MemoryKvStore::new())).unwrap()
}

fn task_with_order(title: &str, order_index: i64) -> Task {
    let mut task = Task::new(title);
    task.order_index = Some(order_index);
    task
}

#[derive(Default)]
struct RecordingReminders {
    calls: Arc<Mutex<Vec<String>>>,
    fail_schedule: bool,
}

impl RecordingReminders {
    fn shared_calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

impl ReminderScheduling for RecordingReminders {
    fn schedule(
        &self,
        task: &Task,
        at_epoch_ms: i64,
        _categories: &[tasknest_core::Category],
        _reminder_ref: &str,
    ) -> ReminderResult {
        if self.fail_schedule {
            return Err(ReminderError::new("scheduler unavailable"));
        }
        self.calls
            .lock()
            .unwrap()
            .push(format!("schedule:{}:{at_epoch_ms}", task.id));
        Ok(())
    }

    fn cancel(&self, reminder_ref: &str) -> ReminderResult {
        self.calls
            .lock()
            .unwrap()
            .push(format!("cancel:{reminder_ref}"));
        Ok(())
    }
}

#[test]
fn add_task_assigns_an_order_index_when_absent() {
    let mut store = open_store();
    let id = store.add_task(Task::new("first")).unwrap();
    assert!(store.task(&id).unwrap().order_index.is_some());

    let explicit = store.add_task(task_with_order("second", 42)).unwrap();
    assert_eq!(store.task(&explicit).unwrap().order_index, Some(42));
}

#[test]
fn update_task_preserves_identity_and_restamps() {
    let mut store = open_store();
    let id = store.add_task(Task::new("draft")).unwrap();
    let created_at = store.task(&id).unwrap().created_at;

    store
        .update_task(&id, |mut task| {
            task.id = "hijacked".to_string();
            task.title = "final".to_string();
            task.priority = Priority::High;
            task.created_at = 0;
            task
        })
        .unwrap();

    let task = store.task(&id).expect("id must be preserved");
    assert_eq!(task.title, "final");
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.created_at, created_at);
    assert!(store.task("hijacked").is_none());
}

#[test]
fn update_task_on_unknown_id_is_a_no_op() {
    let mut store = open_store();
    store
        .update_task("missing", |mut task| {
            task.title = "never applied".to_string();
            task
        })
        .unwrap();
    assert!(store.tasks().is_empty());
}

#[test]
fn complete_and_restore_roundtrip() {
    let mut store = open_store();
    let id = store.add_task(Task::new("todo")).unwrap();

    store.complete_task(&id).unwrap();
    assert!(store.task(&id).unwrap().is_completed());

    // Completing again is a no-op and keeps the original stamp.
    let completed_at = store.task(&id).unwrap().completed_at;
    store.complete_task(&id).unwrap();
    assert_eq!(store.task(&id).unwrap().completed_at, completed_at);

    store.restore_task(&id).unwrap();
    assert!(!store.task(&id).unwrap().is_completed());
}

#[test]
fn reorder_assigns_descending_indexes_and_omitted_trail() {
    let mut store = open_store();
    let a = store.add_task(task_with_order("a", 3)).unwrap();
    let b = store.add_task(task_with_order("b", 2)).unwrap();
    let c = store.add_task(task_with_order("c", 1)).unwrap();

    store.reorder_tasks(&[c.clone(), a.clone()]).unwrap();

    let ordered: Vec<&str> = store
        .tasks_in_display_order()
        .iter()
        .map(|task| task.id.as_str())
        .collect();
    assert_eq!(ordered, vec![c.as_str(), a.as_str(), b.as_str()]);

    let index_c = store.task(&c).unwrap().order_index.unwrap();
    let index_a = store.task(&a).unwrap().order_index.unwrap();
    assert!(index_c > index_a);
    assert_eq!(store.task(&b).unwrap().order_index, Some(2));
}

#[test]
fn reorder_ignores_unknown_ids() {
    let mut store = open_store();
    let a = store.add_task(task_with_order("a", 1)).unwrap();

    store
        .reorder_tasks(&["ghost".to_string(), a.clone()])
        .unwrap();
    assert_eq!(store.tasks().len(), 1);
    assert!(store.task(&a).unwrap().order_index.unwrap() > 1);
}

#[test]
fn set_reminder_schedules_and_stamps_the_task() {
    let mut store = open_store();
    let reminders = RecordingReminders::default();
    let calls = reminders.shared_calls();
    store.attach_reminders(Box::new(reminders));

    let id = store.add_task(Task::new("call dentist")).unwrap();
    store.set_reminder(&id, 2_000_000_000_000).unwrap();

    let task = store.task(&id).unwrap();
    assert_eq!(task.reminder_date, Some(2_000_000_000_000));
    assert!(task.reminder_ref.is_some());
    assert_eq!(
        calls.lock().unwrap().as_slice(),
        [format!("schedule:{id}:2000000000000")]
    );
}

#[test]
fn failed_scheduling_leaves_the_task_unchanged() {
    let mut store = open_store();
    store.attach_reminders(Box::new(RecordingReminders {
        fail_schedule: true,
        ..RecordingReminders::default()
    }));

    let id = store.add_task(Task::new("call dentist")).unwrap();
    store.set_reminder(&id, 2_000_000_000_000).unwrap();

    let task = store.task(&id).unwrap();
    assert!(task.reminder_date.is_none());
    assert!(task.reminder_ref.is_none());
}

#[test]
fn completing_a_task_cancels_its_reminder() {
    let mut store = open_store();
    let reminders = RecordingReminders::default();
    let calls = reminders.shared_calls();
    store.attach_reminders(Box::new(reminders));

    let id = store.add_task(Task::new("water plants")).unwrap();
    store.set_reminder(&id, 2_000_000_000_000).unwrap();
    let reminder_ref = store.task(&id).unwrap().reminder_ref.clone().unwrap();

    store.complete_task(&id).unwrap();
    let task = store.task(&id).unwrap();
    assert!(task.reminder_date.is_none());
    assert!(task.reminder_ref.is_none());
    assert!(calls
        .lock()
        .unwrap()
        .contains(&format!("cancel:{reminder_ref}")));
}

#[test]
fn remove_reminder_cancels_and_clears() {
    let mut store = open_store();
    let reminders = RecordingReminders::default();
    let calls = reminders.shared_calls();
    store.attach_reminders(Box::new(reminders));

    let id = store.add_task(Task::new("water plants")).unwrap();
    store.set_reminder(&id, 2_000_000_000_000).unwrap();
    let reminder_ref = store.task(&id).unwrap().reminder_ref.clone().unwrap();

    store.remove_reminder(&id).unwrap();
    let task = store.task(&id).unwrap();
    assert!(task.reminder_date.is_none());
    assert!(task.reminder_ref.is_none());
    assert!(calls
        .lock()
        .unwrap()
        .contains(&format!("cancel:{reminder_ref}")));
}

#[test]
fn restoring_a_task_with_past_reminder_clears_it() {
    let mut store = open_store();
    let reminders = RecordingReminders::default();
    store.attach_reminders(Box::new(reminders));

    // A completed task can still carry reminder fields when it arrived that
    // way from outside the local completion flow.
    let id = store.add_task(Task::new("expired")).unwrap();
    store
        .update_task(&id, |mut task| {
            task.completed_at = Some(5_000);
            task.reminder_date = Some(1_000);
            task.reminder_ref = Some("stale-ref".to_string());
            task
        })
        .unwrap();

    store.restore_task(&id).unwrap();
    let task = store.task(&id).unwrap();
    assert!(!task.is_completed());
    assert!(task.reminder_date.is_none());
    assert!(task.reminder_ref.is_none());
}

#[test]
fn restoring_a_task_with_future_reminder_reschedules_it() {
    let mut store = open_store();
    let reminders = RecordingReminders::default();
    let calls = reminders.shared_calls();
    store.attach_reminders(Box::new(reminders));

    let id = store.add_task(Task::new("still relevant")).unwrap();
    store
        .update_task(&id, |mut task| {
            task.completed_at = Some(5_000);
            task.reminder_date = Some(2_000_000_000_000);
            task.reminder_ref = Some("live-ref".to_string());
            task
        })
        .unwrap();

    store.restore_task(&id).unwrap();
    let task = store.task(&id).unwrap();
    assert_eq!(task.reminder_date, Some(2_000_000_000_000));
    assert_eq!(task.reminder_ref.as_deref(), Some("live-ref"));
    assert!(calls
        .lock()
        .unwrap()
        .contains(&format!("schedule:{id}:2000000000000")));
}
