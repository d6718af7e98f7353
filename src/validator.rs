//! Phase-specific structural validation of generated markdown.
//!
//! Each phase requires a fixed set of topics. A topic is satisfied by a heading
//! or a keyword label line such as `**Functional requirements**` or
//! `- User scenarios:` that mentions one of its aliases, case-insensitively.
//! Lines inside code fences never count.

use crate::domain::ValidationResult;
use crate::phase::Phase;
use crate::sanitizer::{heading_level, unfenced_lines};

pub const EMPTY_DOCUMENT: &str = "Document is empty";

/// Label lines longer than this are treated as prose.
const MAX_LABEL_CHARS: usize = 80;

/// A required section and the words that identify it.
#[derive(Debug, Clone, Copy)]
pub struct Topic {
    pub name: &'static str,
    aliases: &'static [&'static str],
    /// A line that mentions any of these never satisfies the topic.
    excludes: &'static [&'static str],
}

impl Topic {
    fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.aliases.iter().any(|alias| lower.contains(alias))
            && !self.excludes.iter().any(|ex| lower.contains(ex))
    }
}

const NON_FUNCTIONAL: &[&str] = &["non-functional", "nonfunctional", "non functional", "非功能"];

const SPECIFY_TOPICS: &[Topic] = &[
    Topic {
        name: "Functional Requirements",
        aliases: &[
            "functional requirement",
            "functional spec",
            "features",
            "功能需求",
            "功能性需求",
            "功能要求",
        ],
        excludes: NON_FUNCTIONAL,
    },
    Topic {
        name: "Non-Functional Requirements",
        aliases: &[
            "non-functional",
            "nonfunctional",
            "non functional",
            "quality attribute",
            "非功能",
            "质量属性",
        ],
        excludes: &[],
    },
    Topic {
        name: "User Scenarios",
        aliases: &[
            "user scenario",
            "user stor",
            "use case",
            "user journey",
            "用户场景",
            "使用场景",
            "用户故事",
            "用例",
        ],
        excludes: &[],
    },
];

const DESIGN_TOPICS: &[Topic] = &[
    Topic {
        name: "Architecture",
        aliases: &["architecture", "system design", "components", "架构"],
        excludes: &[],
    },
    Topic {
        name: "Technology Choices",
        aliases: &[
            "technology",
            "tech stack",
            "technical choice",
            "技术选型",
            "技术栈",
            "技术方案",
        ],
        excludes: &[],
    },
    Topic {
        name: "Data Model",
        aliases: &[
            "data model",
            "data structure",
            "schema",
            "entities",
            "数据模型",
            "数据结构",
        ],
        excludes: &[],
    },
];

const IMPLEMENT_TOPICS: &[Topic] = &[
    Topic {
        name: "Task List",
        aliases: &["task", "todo", "work item", "任务"],
        excludes: &[],
    },
    Topic {
        name: "Implementation Steps",
        aliases: &[
            "implementation step",
            "implementation plan",
            "step",
            "milestone",
            "roadmap",
            "实施步骤",
            "实现步骤",
            "实施计划",
            "步骤",
        ],
        excludes: &[],
    },
    Topic {
        name: "Test Plan",
        aliases: &[
            "test plan",
            "testing",
            "test strategy",
            "verification",
            "测试计划",
            "测试策略",
            "测试",
        ],
        excludes: &[],
    },
];

pub fn topics_for(phase: Phase) -> &'static [Topic] {
    match phase {
        Phase::Specify => SPECIFY_TOPICS,
        Phase::Design => DESIGN_TOPICS,
        Phase::Implement => IMPLEMENT_TOPICS,
    }
}

/// Validate `content` against the rule set for `phase`.
pub fn validate(phase: Phase, content: &str) -> ValidationResult {
    if content.trim().is_empty() {
        return ValidationResult::from_errors(vec![EMPTY_DOCUMENT.to_string()]);
    }
    let errors = missing_topics(phase, content)
        .into_iter()
        .map(|topic| format!("Missing required section: {}", topic))
        .collect();
    ValidationResult::from_errors(errors)
}

/// Names of required topics not covered by `content`, in rule order.
pub fn missing_topics(phase: Phase, content: &str) -> Vec<&'static str> {
    let candidates = candidate_lines(content);
    topics_for(phase)
        .iter()
        .filter(|topic| !candidates.iter().any(|line| topic.matches(line)))
        .map(|topic| topic.name)
        .collect()
}

/// Heading text and label text of every line outside code fences.
fn candidate_lines(content: &str) -> Vec<&str> {
    unfenced_lines(content)
        .into_iter()
        .filter_map(|line| {
            if heading_level(line).is_some() {
                Some(line.trim().trim_start_matches('#').trim())
            } else {
                label_text(line)
            }
        })
        .collect()
}

/// Extract the label of a keyword line: `**Label**`, `Label:` or `- Label：...`.
fn label_text(line: &str) -> Option<&str> {
    let body = strip_list_marker(line.trim());
    if let Some(rest) = body.strip_prefix("**") {
        return rest.find("**").and_then(|end| rest.get(..end));
    }
    let end = body.find([':', '：'])?;
    let label = body.get(..end)?.trim();
    if label.is_empty() || label.chars().count() > MAX_LABEL_CHARS {
        None
    } else {
        Some(label)
    }
}

fn strip_list_marker(line: &str) -> &str {
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line
            .get(digits..)
            .and_then(|r| r.strip_prefix(". ").or_else(|| r.strip_prefix(") ")))
        {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
