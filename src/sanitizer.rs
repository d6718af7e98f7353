//! Cleans raw model output into plausible markdown.
//!
//! The sanitizer is an ordered pipeline of independent stages. Every stage is a
//! total function: when its pattern does not match it returns the input
//! unchanged, so stages can be tested and reasoned about in isolation.
//!
//! 1. [`strip_tool_markup`] then [`strip_leading_narration`]
//! 2. [`decode_json_content`]
//! 3. [`select_markdown_body`]
//!
//! Narration is kept when the text carries a markdown-labeled fence with
//! section headings, since stage 3 extracts that fence and everything around
//! it is discarded anyway.

use regex::Regex;
use std::sync::LazyLock;

/// Pseudo-XML tags models emit around tool invocations and hidden reasoning.
const TOOL_TAGS: &[&str] = &[
    "function_calls",
    "function_results",
    "invoke",
    "parameter",
    "tool_use",
    "tool_call",
    "tool_result",
    "thinking",
];

static TOOL_BLOCK_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TOOL_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(
                r"(?s)<(?:[A-Za-z_]+:)?{tag}\b[^>]*>.*?</(?:[A-Za-z_]+:)?{tag}>"
            ))
            .expect("regex to match a closed tool-invocation block")
        })
        .collect()
});

static TOOL_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"</?(?:[A-Za-z_]+:)?(?:{})\b[^>]*/?>",
        TOOL_TAGS.join("|")
    ))
    .expect("regex to match a stray tool-invocation tag")
});

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("regex to match runs of blank lines")
});

/// Run the full pipeline. Never panics; output is always trimmed.
pub fn sanitize(raw: &str) -> String {
    let text = strip_tool_markup(raw);
    let text = if fenced_markdown_body(&text).is_some() {
        text
    } else {
        strip_leading_narration(&text)
    };
    let text = decode_json_content(&text);
    let text = select_markdown_body(&text);
    text.trim().to_string()
}

/// Remove tool-invocation blocks and any stray opening/closing tags left behind
/// by truncated output.
pub fn strip_tool_markup(text: &str) -> String {
    if !TOOL_TAG_RE.is_match(text) {
        return text.to_string();
    }
    let mut out = text.to_string();
    for re in TOOL_BLOCK_RES.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    let out = TOOL_TAG_RE.replace_all(&out, "");
    BLANK_RUN_RE.replace_all(&out, "\n\n").into_owned()
}

/// Drop everything before the first heading that sits outside a code fence.
/// Text without such a heading is returned unchanged.
pub fn strip_leading_narration(text: &str) -> String {
    let scan = scan_fences(text);
    let first_heading = scan
        .lines
        .iter()
        .position(|line| !line.in_fence && heading_level(line.text).is_some());
    match first_heading {
        Some(index) if index > 0 => scan
            .lines
            .iter()
            .skip(index)
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => text.to_string(),
    }
}

/// If the whole payload is a JSON object with a string `content` field, return
/// that field decoded. Anything else passes through.
pub fn decode_json_content(text: &str) -> String {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return text.to_string();
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => match map.get("content") {
            Some(serde_json::Value::String(content)) => content.clone(),
            _ => text.to_string(),
        },
        _ => text.to_string(),
    }
}

/// Decide between fenced and prose markdown.
///
/// A fence labeled `markdown`/`md` that contains a `##` heading wins and only
/// its interior is kept. Otherwise the text is kept verbatim, including any
/// fences (diagrams and code samples are legitimate document content).
pub fn select_markdown_body(text: &str) -> String {
    fenced_markdown_body(text).unwrap_or_else(|| text.to_string())
}

/// Interior of the first `markdown`/`md` fence that holds a `##` heading.
fn fenced_markdown_body(text: &str) -> Option<String> {
    scan_fences(text)
        .blocks
        .into_iter()
        .find(|block| block.is_markdown() && block.body.lines().any(is_section_heading))
        .map(|block| block.body)
}

/// Heading level (1-6) of an ATX heading line, or `None`.
pub fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = trimmed.get(level..)?;
    if rest.starts_with(' ') || rest.starts_with('\t') {
        if rest.trim().is_empty() {
            None
        } else {
            Some(level)
        }
    } else {
        None
    }
}

fn is_section_heading(line: &str) -> bool {
    heading_level(line).is_some_and(|level| level >= 2)
}

/// Lines of `text` that sit outside every code fence, fence delimiters excluded.
pub fn unfenced_lines(text: &str) -> Vec<&str> {
    scan_fences(text)
        .lines
        .into_iter()
        .filter(|line| !line.in_fence)
        .map(|line| line.text)
        .collect()
}

struct ScannedLine<'a> {
    text: &'a str,
    in_fence: bool,
}

struct FenceBlock {
    label: String,
    body: String,
}

impl FenceBlock {
    fn is_markdown(&self) -> bool {
        matches!(self.label.as_str(), "markdown" | "md")
    }
}

struct FenceScan<'a> {
    lines: Vec<ScannedLine<'a>>,
    blocks: Vec<FenceBlock>,
}

struct OpenFence<'a> {
    marker: char,
    len: usize,
    label: String,
    body: Vec<&'a str>,
    nested: usize,
}

impl OpenFence<'_> {
    fn into_block(self) -> FenceBlock {
        FenceBlock {
            label: self.label,
            body: self.body.join("\n"),
        }
    }
}

/// Parse a fence delimiter line into (marker char, run length, info string).
fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed.get(len..).unwrap_or_default().trim();
    Some((marker, len, info))
}

/// Line-by-line fence scan. Inside a markdown-labeled fence, labeled inner
/// fences nest so an embedded diagram does not close the outer block early.
fn scan_fences(text: &str) -> FenceScan<'_> {
    let mut lines = Vec::new();
    let mut blocks = Vec::new();
    let mut open: Option<OpenFence<'_>> = None;

    for line in text.lines() {
        let marker = fence_marker(line);
        match open.as_mut() {
            None => {
                if let Some((ch, len, info)) = marker {
                    let label = info
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_ascii_lowercase();
                    open = Some(OpenFence {
                        marker: ch,
                        len,
                        label,
                        body: Vec::new(),
                        nested: 0,
                    });
                    lines.push(ScannedLine {
                        text: line,
                        in_fence: true,
                    });
                } else {
                    lines.push(ScannedLine {
                        text: line,
                        in_fence: false,
                    });
                }
            }
            Some(fence) => {
                lines.push(ScannedLine {
                    text: line,
                    in_fence: true,
                });
                let is_markdown = matches!(fence.label.as_str(), "markdown" | "md");
                match marker {
                    Some((ch, len, info)) if ch == fence.marker && len >= fence.len => {
                        if info.is_empty() {
                            if fence.nested > 0 {
                                fence.nested -= 1;
                                fence.body.push(line);
                            } else if let Some(closed) = open.take() {
                                blocks.push(closed.into_block());
                            }
                        } else {
                            if is_markdown {
                                fence.nested += 1;
                            }
                            fence.body.push(line);
                        }
                    }
                    _ => fence.body.push(line),
                }
            }
        }
    }

    if let Some(unclosed) = open {
        blocks.push(unclosed.into_block());
    }

    FenceScan { lines, blocks }
}

#[cfg(test)]
#[path = "tests/sanitizer_tests.rs"]
mod tests;
