use super::*;
use crate::domain::Document;
use proptest::prelude::*;

fn workflow_with(docs: &[(Phase, &str)]) -> Workflow {
    let mut workflow = Workflow::new("t", "d", None, None);
    for (phase, content) in docs {
        workflow
            .documents
            .insert(*phase, Document::new(*phase, content.to_string(), None));
    }
    workflow
}

fn status(delta: &SpecDelta, phase: Phase) -> Option<DeltaStatus> {
    delta.phases.iter().find(|d| d.phase == phase).map(|d| d.status)
}

#[test]
fn test_line_ending_and_trailing_newline_differences_are_unchanged() {
    let baseline = workflow_with(&[(Phase::Specify, "## A\r\n- x\r\n"), (Phase::Design, "## B")]);
    let target = workflow_with(&[(Phase::Specify, "## A\n- x"), (Phase::Design, "## B\n\n")]);
    let delta = compare_workflows(&baseline, &target);
    assert!(!delta.has_changes());
    assert_eq!(status(&delta, Phase::Specify), Some(DeltaStatus::Unchanged));
    assert_eq!(status(&delta, Phase::Design), Some(DeltaStatus::Unchanged));
    assert_eq!(status(&delta, Phase::Implement), None);
}

#[test]
fn test_each_status_is_detected_in_phase_order() {
    let baseline = workflow_with(&[(Phase::Specify, "old"), (Phase::Implement, "tasks")]);
    let target = workflow_with(&[(Phase::Specify, "new"), (Phase::Design, "design")]);
    let delta = compare_workflows(&baseline, &target);

    assert_eq!(delta.baseline_workflow_id, baseline.id);
    assert_eq!(delta.target_workflow_id, target.id);
    assert_eq!(
        delta.phases,
        vec![
            PhaseDelta { phase: Phase::Specify, status: DeltaStatus::Modified },
            PhaseDelta { phase: Phase::Design, status: DeltaStatus::Added },
            PhaseDelta { phase: Phase::Implement, status: DeltaStatus::Removed },
        ]
    );
    assert_eq!(
        delta.changed_phases(),
        vec![Phase::Specify, Phase::Design, Phase::Implement]
    );
}

#[test]
fn test_leading_whitespace_difference_is_a_modification() {
    let baseline = workflow_with(&[(Phase::Design, "## A")]);
    let target = workflow_with(&[(Phase::Design, " ## A")]);
    assert_eq!(
        status(&compare_workflows(&baseline, &target), Phase::Design),
        Some(DeltaStatus::Modified)
    );
}

#[test]
fn test_empty_workflows_have_no_phases() {
    let delta = compare_workflows(&workflow_with(&[]), &workflow_with(&[]));
    assert!(delta.phases.is_empty());
    assert!(!delta.has_changes());
}

#[test]
fn test_status_display_is_uppercase() {
    assert_eq!(DeltaStatus::Added.to_string(), "ADDED");
    assert_eq!(DeltaStatus::Unchanged.to_string(), "UNCHANGED");
}

proptest! {
    #[test]
    fn prop_workflow_compared_with_itself_is_unchanged(
        spec in "[a-z \n]{0,40}",
        design in "[a-z \n]{0,40}",
    ) {
        let workflow = workflow_with(&[(Phase::Specify, &spec), (Phase::Design, &design)]);
        let delta = compare_workflows(&workflow, &workflow);
        prop_assert!(!delta.has_changes());
        prop_assert_eq!(delta.phases.len(), 2);
    }

    #[test]
    fn prop_crlf_conversion_never_changes_status(body in "[a-z]{1,10}(\n[a-z]{0,10}){0,5}") {
        let baseline = workflow_with(&[(Phase::Implement, &body)]);
        let crlf = body.replace('\n', "\r\n");
        let target = workflow_with(&[(Phase::Implement, &crlf)]);
        prop_assert_eq!(
            status(&compare_workflows(&baseline, &target), Phase::Implement),
            Some(DeltaStatus::Unchanged)
        );
    }
}
