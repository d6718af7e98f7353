//! Extraction of clarification questions from free-form model output.

use crate::sanitizer::{heading_level, strip_tool_markup};
use std::collections::HashSet;

/// Section names that introduce a list of questions (lowercase).
const SECTION_ALIASES: &[&str] = &[
    "clarification question",
    "clarifying question",
    "open question",
    "questions",
    "待澄清问题",
    "澄清问题",
];

/// Titles that only count when they are the whole title, since they also
/// appear inside unrelated titles such as `已知问题`.
const EXACT_SECTION_TITLES: &[&str] = &["问题", "问题列表"];

/// Pull up to `max_questions` questions out of `raw_text`.
///
/// An explicit questions section (heading or label line) wins: its list items
/// are taken in order, keeping only the ones phrased as questions when there
/// are any. Without a section, any line ending in `?` or `？` counts.
/// List markers and emphasis are stripped and duplicates dropped.
pub fn extract_clarification_questions(raw_text: &str, max_questions: usize) -> Vec<String> {
    if max_questions == 0 {
        return Vec::new();
    }
    let text = strip_tool_markup(raw_text);

    let from_section = section_items(&text);
    let candidates = if from_section.is_empty() {
        question_lines(&text)
    } else {
        from_section
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
        .take(max_questions)
        .collect()
}

fn is_section_title(line: &str) -> bool {
    let trimmed = line.trim();
    let title = if heading_level(trimmed).is_some() {
        trimmed.trim_start_matches('#').trim()
    } else if let Some(inner) = trimmed
        .strip_prefix("**")
        .and_then(|rest| rest.split("**").next())
    {
        inner
    } else if let Some(label) = trimmed
        .strip_suffix(':')
        .or_else(|| trimmed.strip_suffix('：'))
    {
        label
    } else {
        return false;
    };
    let lower = title.trim().to_lowercase();
    EXACT_SECTION_TITLES.contains(&lower.as_str())
        || SECTION_ALIASES.iter().any(|alias| lower.contains(alias))
}

fn is_question(text: &str) -> bool {
    text.ends_with('?') || text.ends_with('？')
}

/// List items of the first questions section, up to the next heading.
fn section_items(text: &str) -> Vec<String> {
    let mut lines = text.lines().skip_while(|line| !is_section_title(line));
    if lines.next().is_none() {
        return Vec::new();
    }
    let items: Vec<String> = lines
        .take_while(|line| heading_level(line).is_none())
        .filter_map(list_item)
        .map(clean_question)
        .collect();
    if items.iter().any(|item| is_question(item)) {
        items.into_iter().filter(|item| is_question(item)).collect()
    } else {
        items
    }
}

fn question_lines(text: &str) -> Vec<String> {
    let mut in_fence = false;
    text.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                return false;
            }
            !in_fence
        })
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches('#').trim();
            list_item(line).unwrap_or(line)
        })
        .filter(|line| is_question(line))
        .map(clean_question)
        .collect()
}

/// Body of a bulleted or numbered list line.
fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    for marker in ["- ", "* ", "+ ", "• "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = trimmed.get(digits..)?;
    [". ", ") ", "、", "．"]
        .iter()
        .find_map(|sep| rest.strip_prefix(sep))
        .map(str::trim)
}

fn clean_question(item: &str) -> String {
    let item = item
        .trim_start_matches("[ ]")
        .trim()
        .trim_matches('*')
        .trim_matches('_')
        .trim();
    item.to_string()
}

#[cfg(test)]
#[path = "tests/clarification_tests.rs"]
mod tests;
