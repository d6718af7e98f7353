use super::*;

const REQUIREMENTS_DOC: &str = "# Login\n\n## Functional Requirements\n- sign in\n\n## Non-Functional Requirements\n- fast\n\n## User Scenarios\n- Alice signs in";

const DESIGN_DOC: &str = "## Architecture\nlayers\n\n## Technology Choices\nRust\n\n## Data Model\nUser";

const TASKS_DOC: &str = "## Task List\n- [ ] a\n\n## Implementation Steps\n1. b\n\n## Test Plan\n- unit tests";

#[test]
fn test_complete_documents_validate_for_every_phase() {
    for (phase, doc) in [
        (Phase::Specify, REQUIREMENTS_DOC),
        (Phase::Design, DESIGN_DOC),
        (Phase::Implement, TASKS_DOC),
    ] {
        let result = validate(phase, doc);
        assert!(result.valid, "{phase}: {:?}", result.errors);
        assert!(result.errors.is_empty());
    }
}

#[test]
fn test_empty_document_has_single_error() {
    let result = validate(Phase::Design, "  \n ");
    assert!(!result.valid);
    assert_eq!(result.errors, vec![EMPTY_DOCUMENT.to_string()]);
}

#[test]
fn test_missing_topic_is_named() {
    let doc = "## Architecture\n\n## Data Model\n";
    let result = validate(Phase::Design, doc);
    assert!(!result.valid);
    assert_eq!(
        result.errors,
        vec!["Missing required section: Technology Choices".to_string()]
    );
}

#[test]
fn test_specify_accepts_keyword_label_lines() {
    let doc = "Overview of the feature.\n\n**Functional requirements**\n- sign in\n\nNon-functional requirements:\n- p99 < 100ms\n\n- User scenarios: Alice logs in";
    let result = validate(Phase::Specify, doc);
    assert!(result.valid, "{:?}", result.errors);
}

#[test]
fn test_non_functional_heading_does_not_satisfy_functional() {
    let doc = "## Non-Functional Requirements\n\n## User Scenarios\n";
    assert_eq!(
        missing_topics(Phase::Specify, doc),
        vec!["Functional Requirements"]
    );
}

#[test]
fn test_keyword_form_validates_for_every_phase() {
    for (phase, doc) in [
        (
            Phase::Specify,
            "**Functional requirements**\n- sign in\n\nNon-functional requirements: fast\n\nUser scenarios: Alice",
        ),
        (
            Phase::Design,
            "**Architecture**\n\nTechnology choices: Rust\n\nData model: tables",
        ),
        (
            Phase::Implement,
            "- Tasks: wire the API\n- Implementation steps: in order\n- Test plan: integration",
        ),
    ] {
        let result = validate(phase, doc);
        assert!(result.valid, "{phase}: {:?}", result.errors);
    }
}

#[test]
fn test_headings_inside_code_fences_do_not_count() {
    let doc = "Intro\n\n```text\n## Architecture\n## Technology Choices\n## Data Model\n```";
    let result = validate(Phase::Design, doc);
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 3);

    let labels = "```yaml\nTasks: a\nTest plan: b\n```\n## Implementation Steps\n1. b";
    assert_eq!(
        missing_topics(Phase::Implement, labels),
        vec!["Task List", "Test Plan"]
    );
}

#[test]
fn test_chinese_headings_are_recognised() {
    let specify = "## 功能需求\n- 登录\n## 非功能需求\n- 性能\n## 用户场景\n- 用户登录";
    assert!(validate(Phase::Specify, specify).valid);

    let design = "## 系统架构\n## 技术选型\n## 数据模型";
    assert!(validate(Phase::Design, design).valid);

    let implement = "## 任务列表\n## 实施步骤\n## 测试计划";
    assert!(validate(Phase::Implement, implement).valid);
}

#[test]
fn test_matching_is_case_insensitive() {
    let doc = "## ARCHITECTURE\n## technology CHOICES\n## Data MODEL";
    assert!(validate(Phase::Design, doc).valid);
}

#[test]
fn test_implement_accepts_numbered_labels() {
    let doc = "1. Tasks: wire the API\n2) Implementation steps: in order\n3. Test plan: integration";
    assert!(validate(Phase::Implement, doc).valid);
}

#[test]
fn test_long_prose_line_is_not_a_label() {
    let sentence = format!("{} functional requirement: x", "word ".repeat(30));
    assert!(label_text(&sentence).is_none());
}
