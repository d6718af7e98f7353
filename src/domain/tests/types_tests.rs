use super::*;

#[test]
fn test_workflow_id_roundtrip_from_string() {
    let id = WorkflowId::new();
    let parsed = WorkflowId::from_string(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
    assert!(WorkflowId::from_string("not-a-uuid").is_err());
}

#[test]
fn test_new_workflow_starts_at_specify_in_progress() {
    let wf = Workflow::new("  Login  ", " Add login ", None, None);
    assert_eq!(wf.current_phase, Phase::Specify);
    assert_eq!(wf.status, WorkflowStatus::InProgress);
    assert!(wf.documents.is_empty());
    assert_eq!(wf.title, "Login");
    assert_eq!(wf.description, "Add login");
    assert!(wf.current_document().is_none());
}

#[test]
fn test_validation_result_from_errors() {
    assert!(ValidationResult::from_errors(vec![]).valid);
    let failed = ValidationResult::from_errors(vec!["Missing required section: Test Plan".into()]);
    assert!(!failed.valid);
    assert_eq!(failed.errors.len(), 1);
}

#[test]
fn test_document_defaults_title_to_phase_display_name() {
    let doc = Document::new(Phase::Implement, "## Tasks".into(), None);
    assert_eq!(doc.metadata.title, "Implementation Plan");
    assert!(!doc.is_valid());
    assert!(doc.validation_errors().is_empty());
}

#[test]
fn test_document_valid_only_when_validation_passed() {
    let doc = Document::new(Phase::Design, "x".into(), Some(ValidationResult::passed()));
    assert!(doc.is_valid());
    let doc = doc.with_title("Custom").with_description("desc");
    assert_eq!(doc.metadata.title, "Custom");
    assert_eq!(doc.metadata.description.as_deref(), Some("desc"));
}

#[test]
fn test_change_intent_parse() {
    assert_eq!("Incremental".parse::<ChangeIntent>().unwrap(), ChangeIntent::Incremental);
    assert_eq!("fresh".parse::<ChangeIntent>().unwrap(), ChangeIntent::Fresh);
    assert!("other".parse::<ChangeIntent>().is_err());
}

#[test]
fn test_summary_copies_listing_fields() {
    let wf = Workflow::new("T", "D", Some(ChangeIntent::Fresh), None);
    let summary = wf.summary();
    assert_eq!(summary.id, wf.id);
    assert_eq!(summary.title, "T");
    assert_eq!(summary.current_phase, Phase::Specify);
    assert_eq!(summary.change_intent, Some(ChangeIntent::Fresh));
}
