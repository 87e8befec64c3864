//! Document structure: heading ids, table of contents, sections.
//!
//! Works on the top-level blocks produced by the renderer after placeholders
//! have been restored, and serializes them to the final article HTML.

use std::fmt::Write;
use std::sync::LazyLock;

use mdoffline_config::RenderConfig;
use regex::Regex;

use crate::renderer::{Block, Heading};
use crate::state::{SlugRegistry, escape_html};
use crate::table::Table;

/// Anchor-only block such as `<a id="setup"></a>`, possibly in a paragraph.
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:<p>)?\s*<a\s+(?:id|name)="([^"]+)"\s*>\s*</a>\s*(?:</p>)?\s*$"#).unwrap()
});

/// Comment block labelling the rule below it: `<!-- Section: Label -->`.
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<!--\s*(?:section:\s*)?(.+?)\s*-->\s*$").unwrap());

const MANUAL_TOC_TITLE: &str = "table of contents";

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TocNode {
    /// Heading level (2-4).
    pub level: u8,
    pub title: String,
    /// Anchor ID for linking.
    pub id: String,
    pub children: Vec<TocNode>,
}

/// Heading with its resolved id.
#[derive(Debug)]
struct HeadingNode {
    level: u8,
    text: String,
    html: String,
    id: String,
}

#[derive(Debug)]
enum Item {
    Heading(HeadingNode),
    Table(Table),
    Rule { label: Option<String> },
    Html(String),
}

/// Result of structuring a document.
pub(crate) struct Structured {
    pub html: String,
    pub title: Option<String>,
    pub toc: Vec<TocNode>,
    /// At least one heading was made collapsible.
    pub collapsible: bool,
    /// At least one back-to-top link was emitted.
    pub back_to_top: bool,
}

/// Adds ids, sections and navigation aids to rendered blocks.
pub(crate) struct StructurePostprocessor<'c> {
    config: &'c RenderConfig,
}

impl<'c> StructurePostprocessor<'c> {
    pub fn new(config: &'c RenderConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, blocks: Vec<Block>) -> Structured {
        let blocks = remove_manual_toc(blocks);
        let items = assign_ids(label_rules(blocks));

        let title = items.iter().find_map(|item| match item {
            Item::Heading(h) if h.level == 1 => Some(h.text.clone()),
            _ => None,
        });
        let toc = build_toc(items.iter().filter_map(|item| match item {
            Item::Heading(h) if self.config.toc_levels.includes(h.level) => Some(h),
            _ => None,
        }));

        let mut emitter = Emitter {
            config: self.config,
            out: String::with_capacity(4096),
            collapsible: false,
            back_to_top: false,
        };
        emitter.emit(&items);

        tracing::debug!(
            toc_entries = toc.len(),
            title = title.as_deref().unwrap_or(""),
            "Structure pass completed"
        );

        Structured {
            html: emitter.out,
            title,
            toc,
            collapsible: emitter.collapsible,
            back_to_top: emitter.back_to_top,
        }
    }
}

/// Drop an author-written "Table of Contents" heading and the list after it.
fn remove_manual_toc(blocks: Vec<Block>) -> Vec<Block> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut iter = blocks.into_iter().peekable();
    while let Some(block) = iter.next() {
        if let Block::Heading(h) = &block
            && h.text.trim().eq_ignore_ascii_case(MANUAL_TOC_TITLE)
        {
            if iter
                .peek()
                .is_some_and(|next| matches!(next, Block::Html(html) if is_list(html)))
            {
                iter.next();
            }
            continue;
        }
        out.push(block);
    }
    out
}

fn is_list(html: &str) -> bool {
    let html = html.trim_start();
    html.starts_with("<ul") || html.starts_with("<ol")
}

/// Turn label comments followed by a rule into labelled rules.
fn label_rules(blocks: Vec<Block>) -> Vec<(Block, Option<String>)> {
    let mut out: Vec<(Block, Option<String>)> = Vec::with_capacity(blocks.len());
    for block in blocks {
        if matches!(block, Block::Rule)
            && let Some(label) = out.last().and_then(|(prev, _)| rule_label(prev))
        {
            out.pop();
            out.push((Block::Rule, Some(label)));
            continue;
        }
        out.push((block, None));
    }
    out
}

fn rule_label(block: &Block) -> Option<String> {
    let Block::Html(html) = block else {
        return None;
    };
    LABEL_RE.captures(html).map(|caps| caps[1].trim().to_owned())
}

/// Resolve heading ids, moving explicit anchors onto the following heading.
fn assign_ids(blocks: Vec<(Block, Option<String>)>) -> Vec<Item> {
    // Anchor blocks that have a heading after them
    let mut explicit: Vec<Option<String>> = vec![None; blocks.len()];
    let mut pending: Vec<usize> = Vec::new();
    for (idx, (block, _)) in blocks.iter().enumerate() {
        match block {
            Block::Html(html) => {
                if let Some(caps) = ANCHOR_RE.captures(html) {
                    explicit[idx] = Some(caps[1].to_owned());
                    pending.push(idx);
                }
            }
            Block::Heading(_) => pending.clear(),
            _ => {}
        }
    }
    // Anchors with no heading after them stay in place
    for idx in pending {
        explicit[idx] = None;
    }

    let mut registry = SlugRegistry::default();
    for id in explicit.iter().flatten() {
        registry.reserve(id);
    }

    let mut items = Vec::with_capacity(blocks.len());
    let mut anchor: Option<String> = None;
    for ((block, label), explicit_id) in blocks.into_iter().zip(explicit) {
        if explicit_id.is_some() {
            // Several anchors before one heading: the nearest wins
            anchor = explicit_id;
            continue;
        }
        items.push(match block {
            Block::Heading(Heading { level, text, html }) => {
                let id = anchor.take().unwrap_or_else(|| registry.unique(&text));
                Item::Heading(HeadingNode {
                    level,
                    text,
                    html,
                    id,
                })
            }
            Block::Table(table) => Item::Table(table),
            Block::Rule => Item::Rule { label },
            Block::Html(html) => Item::Html(html),
        });
    }
    items
}

/// Build a nested table of contents with a level stack.
///
/// A heading nests under the nearest preceding heading of a lower level.
fn build_toc<'a>(headings: impl Iterator<Item = &'a HeadingNode>) -> Vec<TocNode> {
    fn attach(stack: &mut Vec<TocNode>, roots: &mut Vec<TocNode>) {
        if let Some(node) = stack.pop() {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => roots.push(node),
            }
        }
    }

    let mut roots = Vec::new();
    let mut stack: Vec<TocNode> = Vec::new();
    for heading in headings {
        while stack.last().is_some_and(|top| top.level >= heading.level) {
            attach(&mut stack, &mut roots);
        }
        stack.push(TocNode {
            level: heading.level,
            title: heading.text.clone(),
            id: heading.id.clone(),
            children: Vec::new(),
        });
    }
    while !stack.is_empty() {
        attach(&mut stack, &mut roots);
    }
    roots
}

/// Whether a section body holds anything besides rules and whitespace.
fn has_content(items: &[Item]) -> bool {
    items.iter().any(|item| match item {
        Item::Rule { .. } => false,
        Item::Html(html) => !html.trim().is_empty(),
        Item::Heading(_) | Item::Table(_) => true,
    })
}

struct Emitter<'c> {
    config: &'c RenderConfig,
    out: String,
    collapsible: bool,
    back_to_top: bool,
}

impl Emitter<'_> {
    fn emit(&mut self, items: &[Item]) {
        let mut idx = 0;
        while idx < items.len() {
            match &items[idx] {
                Item::Heading(heading) if heading.level >= 2 => {
                    let end = items[idx + 1..]
                        .iter()
                        .position(|item| matches!(item, Item::Heading(h) if h.level <= heading.level))
                        .map_or(items.len(), |offset| idx + 1 + offset);
                    self.section(heading, &items[idx + 1..end]);
                    idx = end;
                }
                item => {
                    self.item(item);
                    idx += 1;
                }
            }
        }
    }

    fn section(&mut self, heading: &HeadingNode, body: &[Item]) {
        let content = has_content(body);
        let collapsible = content && self.config.collapsible.includes(heading.level);
        self.heading(heading, collapsible);

        self.out.push_str(r#"<div class="section-body">"#);
        self.emit(body);
        if content && heading.level == 2 && self.config.back_to_top {
            self.out
                .push_str(r##"<div class="back-to-top"><a href="#top">Back to top</a></div>"##);
            self.back_to_top = true;
        }
        self.out.push_str("</div>");
    }

    fn heading(&mut self, heading: &HeadingNode, collapsible: bool) {
        let level = heading.level;
        let id = escape_html(&heading.id);
        write!(self.out, r#"<h{level} id="{id}""#).unwrap();
        if collapsible {
            self.collapsible = true;
            let (class, expanded) = if self.config.start_collapsed {
                ("collapsible collapsed", "false")
            } else {
                ("collapsible", "true")
            };
            write!(
                self.out,
                r#" class="{class}" role="button" tabindex="0" aria-expanded="{expanded}""#
            )
            .unwrap();
        }
        write!(
            self.out,
            r##"><a class="heading-anchor" href="#{id}" aria-label="Anchor link for {}">#</a>{}</h{level}>"##,
            escape_html(&heading.text),
            heading.html
        )
        .unwrap();
    }

    fn item(&mut self, item: &Item) {
        match item {
            Item::Heading(heading) => self.heading(heading, false),
            Item::Table(table) => {
                self.out.push_str(r#"<div class="table-wrapper">"#);
                self.out.push_str(&table.to_html());
                self.out.push_str("</div>");
            }
            Item::Rule { label: Some(label) } => {
                write!(
                    self.out,
                    r#"<hr class="labeled" data-label="{}">"#,
                    escape_html(label)
                )
                .unwrap();
            }
            Item::Rule { label: None } => self.out.push_str("<hr>"),
            Item::Html(html) => self.out.push_str(html),
        }
    }
}
