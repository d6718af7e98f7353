use super::*;
use crate::domain::WorkflowStatus;
use crate::validator::validate;
use tempfile::tempdir;

fn store() -> (tempfile::TempDir, WorkflowStore) {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path().join(".specflow")).unwrap();
    (dir, store)
}

fn saved_workflow(store: &WorkflowStore) -> Workflow {
    let workflow = Workflow::new("Checkout", "Card payments", None, None);
    store.save_workflow(&workflow).unwrap();
    workflow
}

#[test]
fn test_open_creates_layout() {
    let (_dir, store) = store();
    assert!(store.paths().workflows_dir().is_dir());
    assert!(store.paths().archive_dir().is_dir());
}

#[test]
fn test_save_and_load_round_trip_with_documents() {
    let (_dir, store) = store();
    let mut workflow = saved_workflow(&store);
    let doc = Document::new(
        Phase::Specify,
        "## Functional Requirements".into(),
        Some(validate(Phase::Specify, "## Functional Requirements")),
    );
    store.save_document(workflow.id, &doc).unwrap();
    workflow.documents.insert(Phase::Specify, doc);
    store.save_workflow(&workflow).unwrap();

    let loaded = store.load_workflow(workflow.id).unwrap().unwrap();
    assert_eq!(loaded, workflow);
    assert_eq!(
        fs::read_to_string(store.paths().phase_file(workflow.id, Phase::Specify)).unwrap(),
        "## Functional Requirements"
    );
}

#[test]
fn test_load_revalidates_body_written_without_descriptor() {
    let (_dir, store) = store();
    let mut workflow = saved_workflow(&store);
    let design = "## Architecture\na\n## Technology Choices\nb\n## Data Model\nc";
    let doc = Document::new(Phase::Design, design.into(), Some(validate(Phase::Design, design)));
    store.save_document(workflow.id, &doc).unwrap();
    workflow.documents.insert(Phase::Design, doc);
    store.save_workflow(&workflow).unwrap();

    // Body replaced but the descriptor write never happened.
    let broken = Document::new(Phase::Design, "## Architecture\nonly".into(), None);
    store.save_document(workflow.id, &broken).unwrap();

    let loaded = store.load_workflow(workflow.id).unwrap().unwrap();
    let doc = loaded.document(Phase::Design).unwrap();
    assert_eq!(doc.content, "## Architecture\nonly");
    assert!(!doc.is_valid());
    assert_eq!(doc.validation_errors().len(), 2);
}

#[test]
fn test_load_unknown_workflow_is_none() {
    let (_dir, store) = store();
    assert!(store.load_workflow(WorkflowId::new()).unwrap().is_none());
    assert!(store
        .load_document(WorkflowId::new(), Phase::Design)
        .unwrap()
        .is_none());
}

#[test]
fn test_save_document_then_history_lists_newest_first() {
    let (_dir, store) = store();
    let workflow = saved_workflow(&store);
    let first = Document::new(Phase::Design, "v1".into(), None);
    let second = Document::new(Phase::Design, "v2".into(), None);
    store.save_document(workflow.id, &first).unwrap();
    let snap = store.save_document(workflow.id, &second).unwrap();

    let history = store.list_document_history(workflow.id, Phase::Design).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, snap.id);
    assert_eq!(history[0].content, "v2");
    assert_eq!(
        store.load_document(workflow.id, Phase::Design).unwrap().as_deref(),
        Some("v2")
    );

    assert_eq!(store.prune_document_history(workflow.id, Phase::Design, 1).unwrap(), 1);
    let history = store.list_document_history(workflow.id, Phase::Design).unwrap();
    assert_eq!(history.len(), 1);
}

#[test]
fn test_save_document_requires_existing_workflow() {
    let (_dir, store) = store();
    let doc = Document::new(Phase::Specify, "x".into(), None);
    assert!(store.save_document(WorkflowId::new(), &doc).is_err());
}

#[cfg(unix)]
#[test]
fn test_failed_phase_write_rolls_back_snapshot() {
    let (_dir, store) = store();
    let workflow = saved_workflow(&store);
    // A directory squatting on the phase file path makes the rename fail.
    fs::create_dir_all(store.paths().phase_file(workflow.id, Phase::Specify).join("blocker"))
        .unwrap();
    let doc = Document::new(Phase::Specify, "content".into(), None);
    assert!(store.save_document(workflow.id, &doc).is_err());
    assert!(store
        .list_document_history(workflow.id, Phase::Specify)
        .unwrap()
        .is_empty());
}

#[test]
fn test_snapshot_load_and_delete() {
    let (_dir, store) = store();
    let workflow = saved_workflow(&store);
    let snap = store
        .save_document(workflow.id, &Document::new(Phase::Implement, "t".into(), None))
        .unwrap();
    let loaded = store
        .load_document_snapshot(workflow.id, Phase::Implement, snap.id)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.content, "t");
    assert!(store
        .delete_document_snapshot(workflow.id, Phase::Implement, snap.id)
        .unwrap());
    assert!(store
        .load_document_snapshot(workflow.id, Phase::Implement, snap.id)
        .unwrap()
        .is_none());
}

#[test]
fn test_list_workflows_sorted_and_skips_garbage() {
    let (_dir, store) = store();
    let mut older = Workflow::new("Older", "d", None, None);
    older.updated_at = older.updated_at - chrono::Duration::hours(1);
    store.save_workflow(&older).unwrap();
    let newer = saved_workflow(&store);
    fs::create_dir_all(store.paths().workflows_dir().join("not-a-uuid")).unwrap();
    let broken = WorkflowId::new();
    fs::create_dir_all(store.paths().workflow_dir(broken)).unwrap();
    fs::write(store.paths().descriptor_path(broken), "{ broken").unwrap();

    let listed = store.list_workflows().unwrap();
    let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert_eq!(listed[0].status, WorkflowStatus::InProgress);
}

#[test]
fn test_delete_workflow_removes_directory() {
    let (_dir, store) = store();
    let workflow = saved_workflow(&store);
    assert!(store.delete_workflow(workflow.id).unwrap());
    assert!(!store.exists(workflow.id));
    assert!(!store.delete_workflow(workflow.id).unwrap());
}
