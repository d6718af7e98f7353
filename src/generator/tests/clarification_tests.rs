use super::*;

#[test]
fn test_explicit_section_items_are_extracted() {
    let raw = "Some preamble? not this one.\n\n## Clarification Questions\n\n1. Which users can log in?\n2. **Is SSO required?**\n- Should sessions expire\n\n## Notes\n- Is this ignored?";
    let questions = extract_clarification_questions(raw, 10);
    assert_eq!(questions, vec!["Which users can log in?", "Is SSO required?"]);
}

#[test]
fn test_section_without_question_marks_keeps_all_items() {
    let raw = "## Open Questions
- Should sessions expire
- Which identity provider";
    assert_eq!(
        extract_clarification_questions(raw, 5),
        vec!["Should sessions expire", "Which identity provider"]
    );
}

#[test]
fn test_known_issues_section_is_not_a_questions_section() {
    let raw = "## 已知问题
- 旧版浏览器不支持

用户需要导出数据吗？";
    assert_eq!(
        extract_clarification_questions(raw, 5),
        vec!["用户需要导出数据吗？"]
    );

    let raw = "## 问题
- 是否需要审批？
- 背景说明";
    assert_eq!(extract_clarification_questions(raw, 5), vec!["是否需要审批？"]);
}

#[test]
fn test_chinese_section_heading() {
    let raw = "## 待澄清问题\n1、是否需要支持多租户？\n2、数据保留多久？";
    let questions = extract_clarification_questions(raw, 5);
    assert_eq!(questions, vec!["是否需要支持多租户？", "数据保留多久？"]);
}

#[test]
fn test_label_line_section() {
    let raw = "Questions:\n- Who approves releases?\n- What is the SLA?";
    assert_eq!(extract_clarification_questions(raw, 5).len(), 2);
}

#[test]
fn test_fallback_to_question_lines() {
    let raw = "I have a few doubts.\nWhat database do you use?\nThe API is REST.\n- Do you need audit logs?\n```\nwhy() ?\n```";
    let questions = extract_clarification_questions(raw, 5);
    assert_eq!(
        questions,
        vec!["What database do you use?", "Do you need audit logs?"]
    );
}

#[test]
fn test_max_questions_and_dedup() {
    let raw = "## Questions\n- A?\n- a?\n- B?\n- C?\n- D?";
    let questions = extract_clarification_questions(raw, 2);
    assert_eq!(questions, vec!["A?", "B?"]);
    assert!(extract_clarification_questions(raw, 0).is_empty());
}

#[test]
fn test_no_questions_yields_empty() {
    assert!(extract_clarification_questions("## Plan\n- do things", 5).is_empty());
}

#[test]
fn test_tool_markup_is_ignored() {
    let raw = "<tool_call>lookup?</tool_call>\nHow many tenants?";
    assert_eq!(
        extract_clarification_questions(raw, 5),
        vec!["How many tenants?"]
    );
}
