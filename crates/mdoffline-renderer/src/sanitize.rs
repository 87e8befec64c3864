//! HTML sanitization and context-specific escaping.
//!
//! The allow-list lives in [`Policy`] and is handed to ammonia, which does
//! the actual cleaning. Because ammonia removes content silently, the same
//! policy drives a small tag scanner that reports what is about to be
//! dropped, so authors see a warning instead of missing content.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use ammonia::{Builder, UrlRelative};
use regex::Regex;

pub use crate::state::escape_html;

static SCRIPT_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</(script)").unwrap());
static STYLE_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</(style)").unwrap());

/// Something the sanitizer removed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("<{0}> element")]
    Tag(String),
    #[error("{attribute} attribute on <{tag}>")]
    Attribute { tag: String, attribute: String },
    #[error("URL {0:?}")]
    Url(String),
}

/// Allow-list of elements, attributes and URL schemes.
#[derive(Clone, Debug)]
pub struct Policy {
    pub tags: Vec<&'static str>,
    /// Attributes allowed on every element.
    pub generic_attributes: Vec<&'static str>,
    pub tag_attributes: Vec<(&'static str, Vec<&'static str>)>,
    pub url_schemes: Vec<&'static str>,
    /// Elements removed together with their content.
    pub clean_content_tags: Vec<&'static str>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            tags: vec![
                "a", "blockquote", "br", "code", "dd", "del", "details", "div", "dl", "dt", "em",
                "h1", "h2", "h3", "h4", "h5", "h6", "hr", "img", "input", "kbd", "li", "mark",
                "nav", "ol", "p", "pre", "s", "span", "strong", "sub", "summary", "sup", "table",
                "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
            ],
            generic_attributes: vec![
                "id",
                "class",
                "title",
                "lang",
                "role",
                "tabindex",
                "aria-expanded",
                "aria-hidden",
                "aria-label",
            ],
            tag_attributes: vec![
                ("a", vec!["href"]),
                ("img", vec!["src", "alt", "width", "height"]),
                ("ol", vec!["start"]),
                ("input", vec!["type", "checked", "disabled"]),
                ("td", vec!["align", "colspan", "rowspan"]),
                ("th", vec!["align", "colspan", "rowspan"]),
                ("hr", vec!["data-label"]),
                ("details", vec!["open"]),
            ],
            url_schemes: vec!["http", "https", "mailto"],
            clean_content_tags: vec!["script", "style"],
        }
    }
}

impl Policy {
    /// Configure an ammonia builder with this policy.
    pub fn builder(&self) -> Builder<'static> {
        let tag_attributes: HashMap<&'static str, HashSet<&'static str>> = self
            .tag_attributes
            .iter()
            .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
            .collect();

        let mut builder = Builder::default();
        builder
            .tags(self.tags.iter().copied().collect())
            .generic_attributes(self.generic_attributes.iter().copied().collect())
            .tag_attributes(tag_attributes)
            .url_schemes(self.url_schemes.iter().copied().collect())
            .url_relative(UrlRelative::PassThrough)
            .clean_content_tags(self.clean_content_tags.iter().copied().collect())
            .strip_comments(true);
        builder
    }

    fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }

    fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        self.generic_attributes.contains(&attribute)
            || self
                .tag_attributes
                .iter()
                .any(|(t, attrs)| *t == tag && attrs.contains(&attribute))
    }

    /// Relative references and fragments pass; absolute URLs need an allowed scheme.
    fn allows_url(&self, url: &str) -> bool {
        let url = url.trim();
        let scheme_end = url.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
        match scheme_end {
            Some(pos) if url[pos..].starts_with(':') => {
                let scheme = url[..pos].to_ascii_lowercase();
                self.url_schemes.contains(&scheme.as_str())
            }
            _ => true,
        }
    }
}

/// Policy-driven HTML cleaner.
pub struct Sanitizer {
    policy: Policy,
    builder: Builder<'static>,
}

impl Sanitizer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Policy::default())
    }

    #[must_use]
    pub fn with_policy(policy: Policy) -> Self {
        let builder = policy.builder();
        Self { policy, builder }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Remove everything the policy does not allow.
    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }

    /// Report what [`clean`](Self::clean) would remove, in document order, without duplicates.
    pub fn audit(&self, html: &str) -> Vec<Rejection> {
        let mut rejections = Vec::new();
        let mut report = |rejection: Rejection| {
            if !rejections.contains(&rejection) {
                rejections.push(rejection);
            }
        };

        let lower = html.to_ascii_lowercase();
        let mut pos = 0;
        while let Some(offset) = html[pos..].find('<') {
            let start = pos + offset;
            let rest = &html[start + 1..];

            if rest.starts_with("!--") {
                pos = lower[start..]
                    .find("-->")
                    .map_or(html.len(), |end| start + end + 3);
                continue;
            }
            let Some(tag) = scan_tag(rest) else {
                pos = start + 1;
                continue;
            };
            pos = start + 1 + tag.len;
            if tag.closing {
                continue;
            }

            if self.policy.clean_content_tags.contains(&tag.name.as_str()) {
                report(Rejection::Tag(tag.name.clone()));
                // Skip the element body: its content goes with it
                let close = format!("</{}", tag.name);
                pos = lower[pos..].find(&close).map_or(html.len(), |end| pos + end);
                continue;
            }
            if !self.policy.allows_tag(&tag.name) {
                report(Rejection::Tag(tag.name));
                continue;
            }
            for (attribute, value) in tag.attributes {
                if !self.policy.allows_attribute(&tag.name, &attribute) {
                    report(Rejection::Attribute {
                        tag: tag.name.clone(),
                        attribute,
                    });
                } else if matches!(attribute.as_str(), "href" | "src")
                    && !self.policy.allows_url(&value)
                {
                    report(Rejection::Url(value));
                }
            }
        }
        rejections
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Start tag or end tag found by the audit scanner.
struct ScannedTag {
    name: String,
    closing: bool,
    attributes: Vec<(String, String)>,
    /// Bytes consumed after the `<`.
    len: usize,
}

/// Scan a tag starting right after `<`. Returns `None` if this is not a tag.
fn scan_tag(rest: &str) -> Option<ScannedTag> {
    let bytes = rest.as_bytes();
    let closing = bytes.first() == Some(&b'/');
    let mut i = usize::from(closing);

    let name_start = i;
    if !bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    while bytes.get(i).is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-') {
        i += 1;
    }
    let name = rest[name_start..i].to_ascii_lowercase();

    let mut attributes = Vec::new();
    loop {
        while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace() || *b == b'/') {
            i += 1;
        }
        match bytes.get(i) {
            None => break,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(_) => {}
        }

        let attr_start = i;
        while bytes
            .get(i)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            i += 1;
        }
        let attribute = rest[attr_start..i].to_ascii_lowercase();
        if attribute.is_empty() {
            // Stray `=`
            i += 1;
            continue;
        }

        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = i + 1;
                    let end = rest[value_start..]
                        .find(char::from(quote))
                        .map_or(rest.len(), |e| value_start + e);
                    value = rest[value_start..end].to_owned();
                    i = (end + 1).min(rest.len());
                }
                _ => {
                    let value_start = i;
                    while bytes
                        .get(i)
                        .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
                    {
                        i += 1;
                    }
                    value = rest[value_start..i].to_owned();
                }
            }
        }
        attributes.push((attribute, value));
    }

    Some(ScannedTag {
        name,
        closing,
        attributes,
        len: i,
    })
}

/// Encode `text` as a JSON string literal safe to place inside `<script>`.
///
/// Characters that could end the script element or break JavaScript parsing
/// (`<`, `>`, `&`, U+2028, U+2029) are written as `\uXXXX` escapes.
#[must_use]
pub fn escape_script_json(text: &str) -> String {
    let json = serde_json::Value::String(text.to_owned()).to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a CSS property value.
///
/// Anything outside `[A-Za-z0-9 .,%#-]` becomes a CSS hex escape, so a value
/// can never close the declaration or the style element.
#[must_use]
pub fn escape_css_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | ',' | '%' | '#' | '-') {
            out.push(c);
        } else {
            out.push_str(&format!("\\{:x} ", u32::from(c)));
        }
    }
    out
}

/// Make JavaScript safe to inline in a `<script>` element.
#[must_use]
pub fn escape_script_body(js: &str) -> String {
    SCRIPT_CLOSE_RE.replace_all(js, r"<\/$1").into_owned()
}

/// Make CSS safe to inline in a `<style>` element.
#[must_use]
pub fn escape_style_body(css: &str) -> String {
    STYLE_CLOSE_RE.replace_all(css, r"<\/$1").into_owned()
}
