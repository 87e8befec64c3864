//! Fenced code block protection and classification.
//!
//! Fenced blocks are lifted out of the source before math and table passes
//! run, so `$` and `|` inside code are never reinterpreted. Each block is
//! classified once by the first word of its info string.

use std::fmt::Write;

use crate::highlight::Highlighter;
use crate::placeholder::{SpanKind, SpanStore, block_replacement};
use crate::state::escape_html;

/// Info string marking a block as program output.
const OUTPUT_TAG: &str = "output";

/// How a code block is presented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FenceKind {
    /// Source code in the named language.
    Highlighted(String),
    /// Program output: never highlighted, never numbered.
    Output,
    /// No language given.
    Plain,
}

impl FenceKind {
    /// Classify a block from its info string.
    ///
    /// ```
    /// use mdoffline_renderer::FenceKind;
    ///
    /// assert_eq!(FenceKind::classify("output"), FenceKind::Output);
    /// assert_eq!(FenceKind::classify("python title=x"), FenceKind::Highlighted("python".to_owned()));
    /// assert_eq!(FenceKind::classify("  "), FenceKind::Plain);
    /// ```
    #[must_use]
    pub fn classify(info: &str) -> Self {
        match info.split_whitespace().next() {
            None => Self::Plain,
            Some(OUTPUT_TAG) => Self::Output,
            Some(lang) => Self::Highlighted(lang.to_owned()),
        }
    }
}

/// Presentation switches for code blocks.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CodeOptions {
    pub highlight: bool,
    pub line_numbers: bool,
}

/// HTML for one code block.
pub(crate) struct RenderedCode {
    pub html: String,
    /// The highlighter produced the body.
    pub highlighted: bool,
}

/// Render a classified block as HTML.
pub(crate) fn render_code_block(
    kind: &FenceKind,
    code: &str,
    options: CodeOptions,
    highlighter: &dyn Highlighter,
) -> RenderedCode {
    let mut out = String::with_capacity(code.len() + 64);
    let mut highlighted_any = false;
    match kind {
        FenceKind::Output => {
            write!(
                out,
                r#"<pre class="output"><code>{}</code></pre>"#,
                escape_html(code)
            )
            .unwrap();
        }
        FenceKind::Highlighted(lang) => {
            let highlighted = if options.highlight {
                highlighter.highlight(lang, code)
            } else {
                None
            };
            let mut classes = Vec::new();
            if highlighted.is_some() {
                classes.push("highlight");
                highlighted_any = true;
            }
            if options.line_numbers {
                classes.push("line-numbers");
            }
            let body = highlighted.unwrap_or_else(|| escape_html(code));
            write!(
                out,
                r#"<pre{}><code class="language-{}">{body}{}</code></pre>"#,
                class_attr(&classes),
                escape_html(lang),
                line_number_rows(code, options.line_numbers)
            )
            .unwrap();
        }
        FenceKind::Plain => {
            let classes: &[&str] = if options.line_numbers {
                &["line-numbers"]
            } else {
                &[]
            };
            write!(
                out,
                "<pre{}><code>{}{}</code></pre>",
                class_attr(classes),
                escape_html(code),
                line_number_rows(code, options.line_numbers)
            )
            .unwrap();
        }
    }
    RenderedCode {
        html: out,
        highlighted: highlighted_any,
    }
}

fn class_attr(classes: &[&str]) -> String {
    if classes.is_empty() {
        String::new()
    } else {
        format!(r#" class="{}""#, classes.join(" "))
    }
}

/// One empty span per source line; CSS counters draw the numbers.
fn line_number_rows(code: &str, enabled: bool) -> String {
    if !enabled {
        return String::new();
    }
    let lines = code.trim_end_matches('\n').split('\n').count();
    let mut out = String::from(r#"<span class="line-numbers-rows" aria-hidden="true">"#);
    for _ in 0..lines {
        out.push_str("<span></span>");
    }
    out.push_str("</span>");
    out
}

/// Opening fence: character, run length and info string.
struct Opening<'a> {
    fence_char: char,
    fence_len: usize,
    info: &'a str,
}

/// Preprocessor that replaces fenced code blocks with placeholders.
///
/// Follows `CommonMark` fence rules: three or more backticks or tildes, a
/// closing fence of the same character at least as long as the opening one,
/// and an unclosed fence running to the end of the input. Content lines lose
/// up to as many leading spaces as the opening fence was indented.
///
/// An opening fence may be indented at most three spaces past the content
/// column of the enclosing list item; deeper lines are indented code.
pub struct FenceClassifier {
    blocks: usize,
}

impl FenceClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self { blocks: 0 }
    }

    /// Replace every fenced block in `input` with a block placeholder.
    pub(crate) fn process(&mut self, input: &str, store: &mut SpanStore) -> String {
        let lines: Vec<&str> = input.split('\n').collect();
        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        let mut lists = ListContext::default();
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx];
            let trimmed = line.trim_start();
            let indent = &line[..line.len() - trimmed.len()];
            let opening = if indent.len() <= lists.fence_indent_limit() {
                detect_fence(trimmed)
            } else {
                None
            };
            let Some(opening) = opening else {
                lists.observe(line);
                output.push(line.to_owned());
                idx += 1;
                continue;
            };

            let close = lines[idx + 1..]
                .iter()
                .position(|l| is_fence_line(l.trim_start(), opening.fence_char, opening.fence_len))
                .map(|offset| idx + 1 + offset);
            let content_end = close.unwrap_or(lines.len());
            let end = close.map_or(lines.len(), |c| c + 1);

            let mut code = String::new();
            for content in &lines[idx + 1..content_end] {
                code.push_str(strip_indent(content, indent.len()));
                code.push('\n');
            }

            let kind = FenceKind::classify(opening.info);
            let raw = lines[idx..end].join("\n");
            let token = store.insert(raw, SpanKind::Fence { kind, code });
            output.push(block_replacement(indent, &token, end - idx));
            self.blocks += 1;
            idx = end;
        }

        tracing::debug!(blocks = self.blocks, "Fence pass completed");
        output.join("\n")
    }

    /// Number of blocks replaced so far.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks
    }
}

impl Default for FenceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Content columns of the list items open at the current line.
#[derive(Default)]
struct ListContext {
    items: Vec<usize>,
    after_blank: bool,
}

impl ListContext {
    /// Deepest indent at which a fence can still open.
    fn fence_indent_limit(&self) -> usize {
        self.items.last().copied().unwrap_or(0) + 3
    }

    fn observe(&mut self, line: &str) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            self.after_blank = true;
            return;
        }
        let indent = line.len() - trimmed.len();
        if let Some(width) = list_marker_width(trimmed) {
            self.items.retain(|&content| content <= indent);
            self.items.push(indent + width);
        } else if self.after_blank {
            // Lazy continuation lines only follow non-blank lines
            self.items.retain(|&content| content <= indent);
        }
        self.after_blank = false;
    }
}

/// Width of a list marker and the spaces after it, if `trimmed` starts an item.
fn list_marker_width(trimmed: &str) -> Option<usize> {
    let bytes = trimmed.as_bytes();
    let marker = match *bytes.first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 || !matches!(bytes.get(digits), Some(b'.' | b')')) {
                return None;
            }
            digits + 1
        }
        _ => return None,
    };
    let spaces = bytes[marker..].iter().take_while(|&&b| b == b' ').count();
    match spaces {
        0 if marker == bytes.len() => Some(marker + 1),
        0 => None,
        1..=4 => Some(marker + spaces),
        // Five or more spaces start indented code inside the item
        _ => Some(marker + 1),
    }
}

/// Detect if a line starts a code fence.
fn detect_fence(trimmed: &str) -> Option<Opening<'_>> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count < 3 {
        return None;
    }

    let info = trimmed[count..].trim();
    // Backtick fences cannot carry backticks in their info string
    if first == '`' && info.contains('`') {
        return None;
    }

    Some(Opening {
        fence_char: first,
        fence_len: count,
        info,
    })
}

/// Check if a line is a valid closing fence.
///
/// The closing fence must:
/// - Use the same character as opening
/// - Be at least as long as opening
/// - Contain only fence characters (optionally followed by whitespace)
fn is_fence_line(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    let first = match trimmed.chars().next() {
        Some(c) if c == expected_char => c,
        _ => return false,
    };

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count < min_len {
        return false;
    }

    trimmed[count..].chars().all(char::is_whitespace)
}

/// Remove up to `width` leading spaces.
fn strip_indent(line: &str, width: usize) -> &str {
    let spaces = line.bytes().take(width).take_while(|&b| b == b' ').count();
    &line[spaces..]
}
