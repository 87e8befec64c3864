//! Placeholder tokens for content that must bypass the Markdown renderer.
//!
//! Protection passes swap fenced code, math and tables for opaque tokens
//! before rendering, and restoration swaps the tokens back afterwards.
//! Tokens are ASCII alphanumeric so Markdown escaping never alters them, and
//! their prefix is derived from a hash of the source that is re-salted until
//! it does not occur anywhere in the source.

use sha2::{Digest, Sha256};

use crate::fence::FenceKind;
use crate::state::escape_html;
use crate::table::Table;

/// Literal that starts every placeholder prefix.
const TOKEN_TAG: &str = "mdox";

/// Byte that terminates the index digits of a token.
const TOKEN_END: u8 = b'z';

/// What a protected span holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpanKind {
    /// Fenced or indented code block.
    Fence { kind: FenceKind, code: String },
    /// TeX between `$` or `$$` delimiters.
    Math { display: bool, tex: String },
    /// Pipe table parsed from the source.
    Table(Table),
}

impl SpanKind {
    /// Short name used in warnings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fence { .. } => "code block",
            Self::Math { display: true, .. } => "display math",
            Self::Math { display: false, .. } => "inline math",
            Self::Table(_) => "table",
        }
    }
}

/// Content removed from the source and kept aside until restoration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedSpan {
    /// Original source text, used when a plain-text rendition is needed.
    pub raw: String,
    pub kind: SpanKind,
}

struct Slot {
    span: ProtectedSpan,
    consumed: bool,
}

/// Per-document placeholder map.
///
/// Each span is consumed at most once. Tokens that cannot be resolved stay in
/// the text, which the pipeline reports as an error.
pub(crate) struct SpanStore {
    prefix: String,
    slots: Vec<Slot>,
}

impl SpanStore {
    /// Create a store whose token prefix cannot collide with `source`.
    pub(crate) fn for_source(source: &str) -> Self {
        Self {
            prefix: unique_prefix(source),
            slots: Vec::new(),
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Store a span and return the token that stands in for it.
    pub(crate) fn insert(&mut self, raw: impl Into<String>, kind: SpanKind) -> String {
        let index = self.slots.len();
        self.slots.push(Slot {
            span: ProtectedSpan {
                raw: raw.into(),
                kind,
            },
            consumed: false,
        });
        format!("{}{index}{}", self.prefix, char::from(TOKEN_END))
    }

    /// Look up the span a whole-string token refers to without consuming it.
    pub(crate) fn peek_token(&self, text: &str) -> Option<&ProtectedSpan> {
        let (index, len) = self.parse_token(text)?;
        (len == text.len()).then(|| &self.slots[index].span)
    }

    /// Replace every token in `text` with `render(span)`, consuming the spans.
    ///
    /// Rendered output is scanned again, so spans nested inside other spans
    /// (math inside a table cell) are restored too. A token inside a tag, such
    /// as a link destination, gets its escaped source text instead. A token
    /// whose span was already consumed is left in place.
    pub(crate) fn restore<F>(&mut self, text: &str, mut render: F) -> String
    where
        F: FnMut(&ProtectedSpan) -> String,
    {
        let mut current = text.to_owned();
        loop {
            let mut replaced = false;
            let mut out = String::with_capacity(current.len());
            let mut rest = current.as_str();
            while let Some(pos) = rest.find(&self.prefix) {
                out.push_str(&rest[..pos]);
                let candidate = &rest[pos..];
                match self.parse_token(candidate) {
                    Some((index, len)) if !self.slots[index].consumed => {
                        self.slots[index].consumed = true;
                        let span = &self.slots[index].span;
                        if inside_tag(&out) {
                            out.push_str(&escape_html(&span.raw));
                        } else {
                            out.push_str(&render(span));
                        }
                        replaced = true;
                        rest = &candidate[len..];
                    }
                    _ => {
                        out.push_str(&candidate[..self.prefix.len()]);
                        rest = &candidate[self.prefix.len()..];
                    }
                }
            }
            out.push_str(rest);
            current = out;
            if !replaced {
                return current;
            }
        }
    }

    /// Replace tokens with their raw source text without consuming anything.
    pub(crate) fn restore_plain(&self, text: &str) -> String {
        if !text.contains(&self.prefix) {
            return text.to_owned();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find(&self.prefix) {
            out.push_str(&rest[..pos]);
            let candidate = &rest[pos..];
            if let Some((index, len)) = self.parse_token(candidate) {
                out.push_str(&self.slots[index].span.raw);
                rest = &candidate[len..];
            } else {
                out.push_str(&candidate[..self.prefix.len()]);
                rest = &candidate[self.prefix.len()..];
            }
        }
        out.push_str(rest);
        out
    }

    /// Replace tokens with their raw source text and consume their spans.
    ///
    /// Used for content that must come out verbatim, such as code blocks
    /// only the Markdown parser recognizes.
    pub(crate) fn restore_source(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find(&self.prefix) {
            out.push_str(&rest[..pos]);
            let candidate = &rest[pos..];
            match self.parse_token(candidate) {
                Some((index, len)) if !self.slots[index].consumed => {
                    self.slots[index].consumed = true;
                    out.push_str(&self.slots[index].span.raw);
                    rest = &candidate[len..];
                }
                _ => {
                    out.push_str(&candidate[..self.prefix.len()]);
                    rest = &candidate[self.prefix.len()..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Mark the span behind a whole-string token as consumed and return it.
    pub(crate) fn take_token(&mut self, text: &str) -> Option<&ProtectedSpan> {
        let (index, len) = self.parse_token(text)?;
        let slot = &mut self.slots[index];
        if len != text.len() || slot.consumed {
            return None;
        }
        slot.consumed = true;
        Some(&slot.span)
    }

    /// Spans that restoration never reached.
    pub(crate) fn unconsumed(&self) -> impl Iterator<Item = &ProtectedSpan> {
        self.slots
            .iter()
            .filter(|slot| !slot.consumed)
            .map(|slot| &slot.span)
    }

    /// Parse a token at the start of `text`, returning its index and length.
    fn parse_token(&self, text: &str) -> Option<(usize, usize)> {
        let digits = text.strip_prefix(self.prefix.as_str())?;
        let count = digits.bytes().take_while(u8::is_ascii_digit).count();
        if count == 0 || digits.as_bytes().get(count) != Some(&TOKEN_END) {
            return None;
        }
        let index: usize = digits[..count].parse().ok()?;
        (index < self.slots.len()).then_some((index, self.prefix.len() + count + 1))
    }
}

/// Text that replaces a block of `line_count` source lines.
///
/// The token sits on its own line between empty lines so it can neither
/// continue a preceding paragraph nor absorb a following one. Extra empty
/// lines keep the source line count for later passes; a two-line block gains
/// one line.
pub(crate) fn block_replacement(indent: &str, token: &str, line_count: usize) -> String {
    if line_count <= 1 {
        return format!("{indent}{token}");
    }
    let mut out = format!("\n{indent}{token}\n");
    for _ in 3..line_count {
        out.push('\n');
    }
    out
}

/// Whether the end of `html` is inside an unclosed tag.
///
/// Text content has `<` escaped, so any raw `<` opens a tag or comment.
fn inside_tag(html: &str) -> bool {
    html.rfind('<')
        .is_some_and(|open| !html[open..].contains('>'))
}

fn unique_prefix(source: &str) -> String {
    let mut salt: u32 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(salt.to_le_bytes());
        let digest = hasher.finalize();
        let prefix = format!("{TOKEN_TAG}{}", hex::encode(&digest[..6]));
        if !source.contains(&prefix) {
            return prefix;
        }
        salt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn math(tex: &str) -> SpanKind {
        SpanKind::Math {
            display: false,
            tex: tex.to_owned(),
        }
    }

    #[test]
    fn test_prefix_is_deterministic_and_alphanumeric() {
        let a = SpanStore::for_source("hello");
        let b = SpanStore::for_source("hello");
        assert_eq!(a.prefix(), b.prefix());
        assert_eq!(a.prefix().len(), TOKEN_TAG.len() + 12);
        assert!(a.prefix().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_prefix_avoids_source_text() {
        let first = SpanStore::for_source("x").prefix().to_owned();
        // A source containing the natural prefix gets a different one
        let source = format!("x{first}");
        let store = SpanStore::for_source(&source);
        assert!(!source.contains(store.prefix()));
    }

    #[test]
    fn test_restore_consumes_once() {
        let mut store = SpanStore::for_source("doc");
        let token = store.insert("$x$", math("x"));
        let text = format!("a {token} b {token}");

        let restored = store.restore(&text, |span| format!("[{}]", span.raw));

        // Second occurrence is left as a leaked token
        assert_eq!(restored, format!("a [$x$] b {token}"));
        assert_eq!(store.unconsumed().count(), 0);
    }

    #[test]
    fn test_restore_nested_tokens() {
        let mut store = SpanStore::for_source("doc");
        let inner = store.insert("$y$", math("y"));
        let outer = store.insert("table", math(&inner));

        let restored = store.restore(&outer, |span| match &span.kind {
            SpanKind::Math { tex, .. } if span.raw == "table" => format!("<td>{tex}</td>"),
            _ => "Y".to_owned(),
        });

        assert_eq!(restored, "<td>Y</td>");
    }

    #[test]
    fn test_token_followed_by_text() {
        let mut store = SpanStore::for_source("doc");
        for i in 0..12 {
            store.insert(format!("raw{i}"), math("t"));
        }
        // Token 1 directly followed by the digit "1" and a letter
        let text = format!("{}1z1abc", store.prefix());
        let restored = store.restore(&text, |span| span.raw.clone());
        assert_eq!(restored, "raw11abc");
    }

    #[test]
    fn test_restore_plain_does_not_consume() {
        let mut store = SpanStore::for_source("doc");
        let token = store.insert("$x^2$", math("x^2"));
        assert_eq!(store.restore_plain(&format!("Area {token}")), "Area $x^2$");
        assert_eq!(store.unconsumed().count(), 1);
    }

    #[test]
    fn test_restore_source_consumes() {
        let mut store = SpanStore::for_source("doc");
        let token = store.insert("$x_1$", math("x_1"));

        let code = store.restore_source(&format!("cost = {token}\n"));

        assert_eq!(code, "cost = $x_1$\n");
        assert_eq!(store.unconsumed().count(), 0);
    }

    #[test]
    fn test_restore_inside_tag_uses_escaped_source() {
        let mut store = SpanStore::for_source("doc");
        let in_href = store.insert("$a<b$", math("a<b"));
        let in_text = store.insert("$c$", math("c"));
        let text = format!(r#"<a href="http://x/{in_href}">{in_text}</a>"#);

        let restored = store.restore(&text, |_| "<span>m</span>".to_owned());

        assert_eq!(restored, r#"<a href="http://x/$a&lt;b$"><span>m</span></a>"#);
        assert_eq!(store.unconsumed().count(), 0);
    }

    #[test]
    fn test_inside_tag() {
        assert!(inside_tag(r#"<p><a href="x"#));
        assert!(!inside_tag("<p>text"));
        assert!(!inside_tag("plain"));
    }

    #[test]
    fn test_take_token_requires_whole_string() {
        let mut store = SpanStore::for_source("doc");
        let token = store.insert("raw", math("t"));
        assert!(store.take_token(&format!("{token} ")).is_none());
        assert!(store.take_token(&token).is_some());
        assert!(store.take_token(&token).is_none());
    }

    #[test]
    fn test_unknown_index_is_not_a_token() {
        let mut store = SpanStore::for_source("doc");
        let text = format!("{}7z", store.prefix());
        assert_eq!(store.restore(&text, |_| String::new()), text);
    }

    #[test]
    fn test_block_replacement_keeps_line_count() {
        assert_eq!(block_replacement("", "T", 1), "T");
        assert_eq!(block_replacement("", "T", 2), "\nT\n");
        assert_eq!(block_replacement("  ", "T", 4), "\n  T\n\n");
        assert_eq!(block_replacement("", "T", 5).split('\n').count(), 5);
    }
}
