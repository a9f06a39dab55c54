// End-to-end task lifecycle through a file-backed store

use momentum::export::to_csv;
use momentum::{DEFAULT_STORAGE_KEY, FileBackend, Filter, Scope, TaskStatus, TaskStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn open(dir: &Path) -> TaskStore<FileBackend> {
    TaskStore::open(FileBackend::open(dir).unwrap(), DEFAULT_STORAGE_KEY).unwrap()
}

fn active_titles(store: &TaskStore<FileBackend>, filter: Filter) -> Vec<String> {
    store
        .active_tasks_for(filter)
        .iter()
        .map(|t| t.title.clone())
        .collect()
}

#[test]
fn test_daily_flow_survives_restart() {
    let temp = TempDir::new().unwrap();

    let milk_id = {
        let mut store = open(temp.path());
        let milk = store.add("Buy milk", "", None, Filter::Tomorrow);
        store.add("Call dentist", "", Some("14:00".to_string()), Filter::Tomorrow);
        assert_eq!(active_titles(&store, Filter::Tomorrow), vec!["Call dentist", "Buy milk"]);

        store.complete(&milk.id);
        milk.id
    };

    let store = open(temp.path());
    let completed = store.completed_tasks();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, milk_id);
    assert_eq!(completed[0].title, "Buy milk");
    assert!(completed[0].completed_at.is_some());
    assert_eq!(active_titles(&store, Filter::Tomorrow), vec!["Call dentist"]);
    assert_eq!(store.first_active_tomorrow_task().unwrap().due_time.as_deref(), Some("14:00"));
}

#[test]
fn test_stored_document_is_a_json_array() {
    let temp = TempDir::new().unwrap();
    let mut store = open(temp.path());
    let task = store.add("Write report", "draft first", None, Filter::Later);
    store.delete(&task.id);

    let raw = fs::read_to_string(temp.path().join("momentum_tasks.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &value.as_array().unwrap()[0];

    assert_eq!(entry["title"], "Write report");
    assert_eq!(entry["filter"], "later");
    assert_eq!(entry["status"], "deleted");
    assert_eq!(entry["order"], 0);
    assert!(entry["createdAt"].is_string());
    assert!(entry["deletedAt"].is_string());
    assert!(entry.get("completedAt").is_none());
    assert!(entry.get("dueTime").is_none());
}

#[test]
fn test_reads_document_written_by_browser_storage() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("momentum_tasks.json"),
        r#"[{"id":"0b6f","title":"Plan week","description":"","filter":"tomorrow","status":"active","createdAt":"2024-05-01T09:00:00.000Z","order":0},
            {"id":"9ac2","title":"Gym","description":"legs","dueTime":"07:30","filter":"later","status":"deleted","createdAt":"2024-05-01T09:01:00.000Z","deletedAt":"2024-05-02T10:00:00.000Z","order":0}]"#,
    )
    .unwrap();

    let mut store = open(temp.path());
    assert_eq!(active_titles(&store, Filter::Tomorrow), vec!["Plan week"]);
    assert_eq!(store.deleted_tasks().len(), 1);

    assert!(store.recover("9ac2"));
    let gym = store.get("9ac2").unwrap();
    assert_eq!(gym.status, TaskStatus::Active);
    assert_eq!(gym.filter, Filter::Later);
    assert!(gym.deleted_at.is_none());
}

#[test]
fn test_corrupt_document_starts_empty_and_is_replaced() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("momentum_tasks.json"), "this is not json").unwrap();

    let mut store = open(temp.path());
    assert!(store.tasks().is_empty());

    store.add("fresh start", "", None, Filter::Tomorrow);
    let reopened = open(temp.path());
    assert_eq!(active_titles(&reopened, Filter::Tomorrow), vec!["fresh start"]);
}

#[test]
fn test_reorder_persists() {
    let temp = TempDir::new().unwrap();
    let mut store = open(temp.path());
    let a = store.add("a", "", None, Filter::Later);
    let b = store.add("b", "", None, Filter::Later);
    let c = store.add("c", "", None, Filter::Later);

    store.reorder(Filter::Later, &[b.id.as_str(), a.id.as_str(), c.id.as_str()]);

    let reopened = open(temp.path());
    assert_eq!(active_titles(&reopened, Filter::Later), vec!["b", "a", "c"]);
}

#[test]
fn test_reset_removes_document() {
    let temp = TempDir::new().unwrap();
    let mut store = open(temp.path());
    store.add("a", "", None, Filter::Tomorrow);
    store.add("b", "", None, Filter::Later);

    store.reset_all();

    assert!(!temp.path().join("momentum_tasks.json").exists());
    let reopened = open(temp.path());
    assert!(reopened.tasks().is_empty());
    assert!(reopened.completed_tasks().is_empty());
    assert!(reopened.first_active_tomorrow_task().is_none());
}

#[test]
fn test_export_of_deleted_scope() {
    let temp = TempDir::new().unwrap();
    let mut store = open(temp.path());
    let task = store.add("Greet", "He said \"hi\"\nagain", None, Filter::Tomorrow);
    store.add("Untouched", "", None, Filter::Tomorrow);
    store.delete(&task.id);

    let csv = to_csv(store.tasks_in(Scope::Deleted));
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(r#""Greet","He said ""hi"" again",,tomorrow,deleted,"#));
}
