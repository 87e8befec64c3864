//! Math delimiter protection.
//!
//! `$...$` and `$$...$$` spans are replaced with placeholders before Markdown
//! rendering so emphasis and escapes inside TeX survive untouched. The
//! scanner is an explicit state machine with bounded lookahead:
//!
//! - display math is tried before inline math at every `$`
//! - inline code spans are skipped verbatim
//! - `\$` is a literal dollar sign
//! - inline math must close on the same line within [`INLINE_LIMIT`] bytes
//! - display math may span lines but not a blank line, within [`DISPLAY_LIMIT`] bytes

use crate::error::Warning;
use crate::placeholder::{SpanKind, SpanStore};
use crate::state::escape_html;

/// Longest inline math span, in bytes.
pub const INLINE_LIMIT: usize = 256;

/// Longest display math span, in bytes.
pub const DISPLAY_LIMIT: usize = 4096;

/// Turns TeX into HTML.
pub trait MathRenderer: Send + Sync {
    fn render(&self, tex: &str, display: bool) -> String;
}

/// Emits KaTeX-ready markup, typeset in the browser by the embedded KaTeX script.
///
/// Without the script the escaped TeX source is shown as-is.
pub struct KatexMarkup;

impl MathRenderer for KatexMarkup {
    fn render(&self, tex: &str, display: bool) -> String {
        let class = if display { "math-display" } else { "math-inline" };
        format!(r#"<span class="math {class}">{}</span>"#, escape_html(tex))
    }
}

/// Decide whether the text between two single dollars is math.
///
/// Content qualifies when it has no surrounding whitespace, does not start
/// with a digit, has balanced braces, and contains at least one TeX-like
/// token: a backslash, a brace, `^`, `_` or an ASCII letter. This rejects
/// prices such as `$100 or $50` and accepts `$x = 1$`.
#[must_use]
pub fn looks_like_inline_math(content: &str) -> bool {
    let (Some(first), Some(last)) = (content.chars().next(), content.chars().last()) else {
        return false;
    };
    if first.is_whitespace() || last.is_whitespace() || first.is_ascii_digit() {
        return false;
    }

    let mut depth: i32 = 0;
    let mut escaped = false;
    for c in content.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return false;
    }

    content
        .chars()
        .any(|c| c.is_ascii_alphabetic() || matches!(c, '\\' | '{' | '^' | '_'))
}

/// Scanner position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Ordinary text.
    Text,
    /// Inside an inline code span opened by `ticks` backticks.
    CodeSpan { ticks: usize },
    /// After a single `$` at byte `open`.
    Inline { open: usize },
    /// After `$$` at byte `open`.
    Display { open: usize },
}

/// Preprocessor that replaces math spans with placeholders.
pub struct MathProtector {
    warnings: Vec<Warning>,
    spans: usize,
}

impl MathProtector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            spans: 0,
        }
    }

    /// Replace every math span in `input` with a placeholder.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn process(&mut self, input: &str, store: &mut SpanStore) -> String {
        let bytes = input.as_bytes();
        let mut out = String::with_capacity(input.len());
        let mut emitted = 0;
        let mut state = State::Text;
        let mut i = 0;

        loop {
            let Some(&b) = bytes.get(i) else {
                // End of input: give up on any open span and rescan after it
                match state {
                    State::Text | State::CodeSpan { .. } => break,
                    State::Inline { open } => {
                        state = State::Text;
                        i = open + 1;
                    }
                    State::Display { open } => {
                        self.unbalanced(input, open);
                        state = State::Text;
                        i = open + 2;
                    }
                }
                continue;
            };

            match state {
                State::Text => match b {
                    b'\\' => i += 2,
                    b'`' => {
                        let ticks = run_length(bytes, i, b'`');
                        if closing_ticks(bytes, i + ticks, ticks).is_some() {
                            state = State::CodeSpan { ticks };
                        }
                        i += ticks;
                    }
                    b'$' if bytes.get(i + 1) == Some(&b'$') => {
                        state = State::Display { open: i };
                        i += 2;
                    }
                    b'$' => {
                        if opens_inline(bytes, i) {
                            state = State::Inline { open: i };
                        }
                        i += 1;
                    }
                    _ => i += 1,
                },
                State::CodeSpan { ticks } => {
                    if b == b'`' {
                        let run = run_length(bytes, i, b'`');
                        if run == ticks {
                            state = State::Text;
                        }
                        i += run;
                    } else {
                        i += 1;
                    }
                }
                State::Inline { open } => match b {
                    _ if i - open > INLINE_LIMIT || b == b'\n' => {
                        state = State::Text;
                        i = open + 1;
                    }
                    b'\\' => i += 2,
                    b'$' => {
                        let content = &input[open + 1..i];
                        let closes = !bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
                        if closes && looks_like_inline_math(content) {
                            out.push_str(&input[emitted..open]);
                            out.push_str(&self.protect(store, &input[open..=i], content, false));
                            emitted = i + 1;
                            state = State::Text;
                            i += 1;
                        } else {
                            state = State::Text;
                            i = open + 1;
                        }
                    }
                    _ => i += 1,
                },
                State::Display { open } => match b {
                    _ if i - open > DISPLAY_LIMIT || (b == b'\n' && next_line_blank(bytes, i)) => {
                        self.unbalanced(input, open);
                        state = State::Text;
                        i = open + 2;
                    }
                    b'\\' => i += 2,
                    b'$' if bytes.get(i + 1) == Some(&b'$') => {
                        let content = &input[open + 2..i];
                        if !content.trim().is_empty() {
                            out.push_str(&input[emitted..open]);
                            let token = self.protect(store, &input[open..i + 2], content.trim(), true);
                            out.push_str(&token);
                            // Keep the source line count
                            for _ in 0..content.matches('\n').count() {
                                out.push('\n');
                            }
                            emitted = i + 2;
                        }
                        state = State::Text;
                        i += 2;
                    }
                    _ => i += 1,
                },
            }
        }

        out.push_str(&input[emitted.min(input.len())..]);
        tracing::debug!(spans = self.spans, "Math pass completed");
        out
    }

    /// Number of math spans replaced so far.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans
    }

    /// Consume the protector and return the warnings it produced.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    fn protect(&mut self, store: &mut SpanStore, raw: &str, tex: &str, display: bool) -> String {
        self.spans += 1;
        store.insert(
            raw,
            SpanKind::Math {
                display,
                tex: tex.to_owned(),
            },
        )
    }

    fn unbalanced(&mut self, input: &str, open: usize) {
        let line = input[..open].matches('\n').count() + 1;
        tracing::warn!(line, "Unbalanced display math delimiter");
        self.warnings.push(Warning::UnbalancedMath { line });
    }
}

impl Default for MathProtector {
    fn default() -> Self {
        Self::new()
    }
}

fn run_length(bytes: &[u8], start: usize, byte: u8) -> usize {
    bytes[start..].iter().take_while(|&&b| b == byte).count()
}

/// Find a backtick run of exactly `ticks` before the next blank line.
fn closing_ticks(bytes: &[u8], from: usize, ticks: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'`' => {
                let run = run_length(bytes, i, b'`');
                if run == ticks {
                    return Some(i);
                }
                i += run;
            }
            b'\n' if next_line_blank(bytes, i) => return None,
            _ => i += 1,
        }
    }
    None
}

/// A single `$` opens inline math when followed by a non-space, non-digit.
fn opens_inline(bytes: &[u8], i: usize) -> bool {
    bytes
        .get(i + 1)
        .is_some_and(|&next| !next.is_ascii_whitespace() && !next.is_ascii_digit() && next != b'$')
}

/// Whether the line after the newline at `i` is empty or whitespace-only.
fn next_line_blank(bytes: &[u8], i: usize) -> bool {
    bytes[i + 1..]
        .iter()
        .take_while(|&&b| b != b'\n')
        .all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn protect(input: &str) -> (String, Vec<(bool, String)>, Vec<Warning>) {
        let mut store = SpanStore::for_source(input);
        let mut protector = MathProtector::new();
        let output = protector.process(input, &mut store);
        let spans = store
            .unconsumed()
            .map(|span| match &span.kind {
                SpanKind::Math { display, tex } => (*display, tex.clone()),
                other => panic!("unexpected span {other:?}"),
            })
            .collect();
        (output, spans, protector.into_warnings())
    }

    #[test]
    fn test_currency_is_not_math() {
        let (output, spans, warnings) = protect("It costs $100 or $50 today.");
        assert_eq!(output, "It costs $100 or $50 today.");
        assert!(spans.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_simple_inline_math() {
        let (output, spans, _) = protect("Let $x = 1$ hold.");
        assert_eq!(spans, vec![(false, "x = 1".to_owned())]);
        assert!(output.starts_with("Let mdox"));
        assert!(output.ends_with("z hold."));
    }

    #[test]
    fn test_display_before_inline() {
        let (_, spans, _) = protect("$$\\sum_i x_i$$ and $y$");
        assert_eq!(
            spans,
            vec![(true, "\\sum_i x_i".to_owned()), (false, "y".to_owned())]
        );
    }

    #[test]
    fn test_multiline_display_keeps_line_count() {
        let input = "$$\nE = mc^2\n$$\nafter";
        let (output, spans, _) = protect(input);
        assert_eq!(spans, vec![(true, "E = mc^2".to_owned())]);
        assert_eq!(output.split('\n').count(), input.split('\n').count());
    }

    #[test]
    fn test_unclosed_display_warns() {
        let (output, spans, warnings) = protect("text\n$$ a + b\n\nnext $c$");
        assert_eq!(spans, vec![(false, "c".to_owned())]);
        assert_eq!(warnings, vec![Warning::UnbalancedMath { line: 2 }]);
        assert!(output.starts_with("text\n$$ a + b\n\nnext "));
    }

    #[test]
    fn test_escaped_dollar() {
        let (output, spans, _) = protect(r"Price \$x$ here");
        assert!(spans.is_empty());
        assert_eq!(output, r"Price \$x$ here");
    }

    #[test]
    fn test_code_span_is_skipped() {
        let (output, spans, _) = protect("Use `$x$` or ``a $b$ c`` but $z$");
        assert_eq!(spans, vec![(false, "z".to_owned())]);
        assert!(output.starts_with("Use `$x$` or ``a $b$ c`` but "));
    }

    #[test]
    fn test_unclosed_code_span_does_not_hide_math() {
        let (_, spans, _) = protect("a ` b $x$");
        assert_eq!(spans, vec![(false, "x".to_owned())]);
    }

    #[test]
    fn test_inline_math_does_not_cross_lines() {
        let (_, spans, _) = protect("$a\nb$");
        assert!(spans.is_empty());
    }

    #[test]
    fn test_trailing_space_retries_next_dollar() {
        let (_, spans, _) = protect("$a $b$");
        assert_eq!(spans, vec![(false, "b".to_owned())]);
    }

    #[test]
    fn test_emphasis_markers_inside_math() {
        let (_, spans, _) = protect("$a*b*c$");
        assert_eq!(spans, vec![(false, "a*b*c".to_owned())]);
    }

    #[test]
    fn test_looks_like_inline_math() {
        assert!(looks_like_inline_math("x"));
        assert!(looks_like_inline_math("\\alpha"));
        assert!(looks_like_inline_math("{1}"));
        assert!(looks_like_inline_math("x^2"));
        assert!(!looks_like_inline_math(""));
        assert!(!looks_like_inline_math(" x"));
        assert!(!looks_like_inline_math("x "));
        assert!(!looks_like_inline_math("100"));
        assert!(!looks_like_inline_math("1 + 2"));
        assert!(!looks_like_inline_math("a}{"));
        assert!(!looks_like_inline_math("{a"));
        assert!(!looks_like_inline_math("+ - ="));
    }

    #[test]
    fn test_katex_markup() {
        assert_eq!(
            KatexMarkup.render("a<b", false),
            r#"<span class="math math-inline">a&lt;b</span>"#
        );
        assert_eq!(
            KatexMarkup.render("x", true),
            r#"<span class="math math-display">x</span>"#
        );
    }
}
