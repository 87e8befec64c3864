//! Buffers and helpers shared by the renderer and the postprocessor.

use std::collections::HashSet;

use crate::fence::FenceKind;

/// State for tracking code block rendering.
#[derive(Default)]
pub(crate) struct CodeBlockState {
    kind: Option<FenceKind>,
    buffer: String,
}

impl CodeBlockState {
    /// Start a new code block.
    pub fn start(&mut self, kind: FenceKind) {
        self.kind = Some(kind);
        self.buffer.clear();
    }

    /// End the current code block and return its kind and content.
    pub fn end(&mut self) -> (FenceKind, String) {
        (
            self.kind.take().unwrap_or(FenceKind::Plain),
            std::mem::take(&mut self.buffer),
        )
    }

    pub fn is_active(&self) -> bool {
        self.kind.is_some()
    }

    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// State for tracking image alt text capture.
#[derive(Default)]
pub(crate) struct ImageState {
    active: bool,
    alt_text: String,
}

impl ImageState {
    pub fn start(&mut self) {
        self.active = true;
        self.alt_text.clear();
    }

    /// End image capture and return the alt text.
    pub fn end(&mut self) -> String {
        self.active = false;
        std::mem::take(&mut self.alt_text)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn push_str(&mut self, text: &str) {
        self.alt_text.push_str(text);
    }
}

/// Plain text and HTML of a top-level heading being rendered.
#[derive(Default)]
pub(crate) struct HeadingState {
    level: Option<u8>,
    text: String,
    html: String,
}

impl HeadingState {
    pub fn start(&mut self, level: u8) {
        self.level = Some(level);
        self.text.clear();
        self.html.clear();
    }

    pub fn is_active(&self) -> bool {
        self.level.is_some()
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn push_html(&mut self, html: &str) {
        self.html.push_str(html);
    }

    /// Complete the heading, returning `(level, text, html)`.
    pub fn finish(&mut self) -> Option<(u8, String, String)> {
        let level = self.level.take()?;
        Some((
            level,
            std::mem::take(&mut self.text).trim().to_owned(),
            std::mem::take(&mut self.html).trim().to_owned(),
        ))
    }
}

/// Hands out document-unique heading ids.
///
/// Explicit ids are reserved up front so generated ids never take them.
#[derive(Default)]
pub(crate) struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    /// Claim an id chosen by the author.
    pub fn reserve(&mut self, id: &str) {
        self.used.insert(id.to_owned());
    }

    /// Generate a unique id for heading text: `slug`, `slug-2`, `slug-3`, ...
    pub fn unique(&mut self, text: &str) -> String {
        let base = slugify(text);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Convert text to a URL-safe slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single dash and trims dashes at both ends. Text without any alphanumeric
/// character becomes `section`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !result.is_empty() {
                result.push('-');
            }
            pending_dash = false;
            result.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if result.is_empty() {
        "section".to_owned()
    } else {
        result
    }
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's New?"), "what-s-new");
        assert_eq!(slugify("  Spaces  "), "spaces");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("snake_case"), "snake-case");
        assert_eq!(slugify("C++ & Rust"), "c-rust");
        assert_eq!(slugify("Über Straße"), "über-straße");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "section");
        assert_eq!(slugify("!!!"), "section");
    }

    #[test]
    fn test_unique_slugs() {
        let mut registry = SlugRegistry::default();
        assert_eq!(registry.unique("FAQ"), "faq");
        assert_eq!(registry.unique("FAQ"), "faq-2");
        assert_eq!(registry.unique("faq"), "faq-3");
        assert_eq!(registry.unique("?"), "section");
        assert_eq!(registry.unique(""), "section-2");
    }

    #[test]
    fn test_reserved_ids_are_skipped() {
        let mut registry = SlugRegistry::default();
        registry.reserve("intro");
        registry.reserve("intro-2");
        assert_eq!(registry.unique("Intro"), "intro-3");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html(r#""quoted""#), "&quot;quoted&quot;");
        assert_eq!(escape_html("it's"), "it&#x27;s");
    }

    #[test]
    fn test_code_block_state() {
        let mut state = CodeBlockState::default();
        assert!(!state.is_active());

        state.start(FenceKind::Highlighted("rust".to_owned()));
        assert!(state.is_active());

        state.push_str("fn main() {}");
        let (kind, content) = state.end();
        assert_eq!(kind, FenceKind::Highlighted("rust".to_owned()));
        assert_eq!(content, "fn main() {}");
        assert!(!state.is_active());
    }

    #[test]
    fn test_heading_state_trims() {
        let mut state = HeadingState::default();
        assert!(state.finish().is_none());

        state.start(2);
        state.push_text(" Title ");
        state.push_html(" <em>Title</em> ");
        assert_eq!(
            state.finish(),
            Some((2, "Title".to_owned(), "<em>Title</em>".to_owned()))
        );
        assert!(!state.is_active());
    }
}
