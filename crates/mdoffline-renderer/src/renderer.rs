//! Markdown renderer adapter.
//!
//! Drives pulldown-cmark and splits its output into top-level blocks so the
//! structure postprocessor can work on headings and rules without reparsing
//! HTML. Everything below the top level is rendered to an HTML string.

use std::fmt::Write;

use pulldown_cmark::{BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::fence::FenceKind;
use crate::placeholder::{SpanKind, SpanStore};
use crate::state::{CodeBlockState, HeadingState, ImageState, escape_html};
use crate::table::Table;

/// Top-level heading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Heading {
    pub level: u8,
    /// Plain text, used for ids and the table of contents.
    pub text: String,
    /// Inline HTML content.
    pub html: String,
}

/// One top-level element of the rendered document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Block {
    Heading(Heading),
    Table(Table),
    Rule,
    Html(String),
}

/// Parser options shared by block and inline rendering.
///
/// Tables are parsed by [`crate::table`], so the extension stays off.
fn parser_options() -> Options {
    Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS | Options::ENABLE_GFM
}

/// Render a document into top-level blocks.
///
/// Code blocks pulldown-cmark finds itself (nested in blockquotes, indented
/// code) are registered in `store` like protected fences, so every code block
/// goes through the same restoration path.
pub(crate) fn render_blocks(markdown: &str, store: &mut SpanStore) -> Vec<Block> {
    let mut renderer = BlockRenderer::new(Some(store));
    for event in Parser::new_ext(markdown, parser_options()) {
        renderer.process_event(event);
    }
    renderer.finish()
}

/// Render inline Markdown without paragraph wrappers.
///
/// Block constructs degrade to their inline content.
///
/// ```ignore
/// assert_eq!(render_inline("**a** `b`"), "<strong>a</strong> <code>b</code>");
/// ```
pub(crate) fn render_inline(markdown: &str) -> String {
    let mut renderer = BlockRenderer::new(None);
    renderer.inline_only = true;
    for event in Parser::new_ext(markdown, parser_options()) {
        renderer.process_event(event);
    }
    renderer
        .finish()
        .into_iter()
        .filter_map(|block| match block {
            Block::Html(html) => Some(html),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_owned()
}

struct BlockRenderer<'s> {
    store: Option<&'s mut SpanStore>,
    blocks: Vec<Block>,
    output: String,
    depth: usize,
    inline_only: bool,
    code: CodeBlockState,
    image: ImageState,
    heading: HeadingState,
    pending_image: Option<(String, String)>,
}

impl<'s> BlockRenderer<'s> {
    fn new(store: Option<&'s mut SpanStore>) -> Self {
        Self {
            store,
            blocks: Vec::new(),
            output: String::with_capacity(4096),
            depth: 0,
            inline_only: false,
            code: CodeBlockState::default(),
            image: ImageState::default(),
            heading: HeadingState::default(),
            pending_image: None,
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }

    /// Close the current top-level block.
    fn flush(&mut self) {
        if let Some((level, text, html)) = self.heading.finish() {
            self.blocks.push(Block::Heading(Heading { level, text, html }));
        }
        let html = std::mem::take(&mut self.output);
        if !html.trim().is_empty() {
            self.blocks.push(Block::Html(html));
        }
    }

    fn push_inline(&mut self, content: &str) {
        if self.image.is_active() {
            // Alt text is plain
            return;
        }
        if self.heading.is_active() {
            self.heading.push_html(content);
        } else {
            self.output.push_str(content);
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => {
                self.start_tag(tag);
                self.depth += 1;
            }
            Event::End(tag) => {
                self.depth = self.depth.saturating_sub(1);
                self.end_tag(tag);
                if self.depth == 0 {
                    self.flush();
                }
            }
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br>"),
            Event::Rule => self.horizontal_rule(),
            Event::TaskListMarker(checked) => {
                let checked = if checked { " checked" } else { "" };
                write!(self.output, r#"<input type="checkbox" disabled{checked}> "#).unwrap();
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not enabled; math is protected before parsing
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        if self.inline_only {
            self.start_inline_only(tag);
            return;
        }
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                let level = heading_level_to_num(level);
                if self.depth == 0 {
                    // Top-level headings become blocks; the tag is written later
                    self.heading.start(level);
                } else {
                    write!(self.output, "<h{level}>").unwrap();
                }
            }
            Tag::BlockQuote(kind) => match kind {
                Some(kind) => write!(
                    self.output,
                    r#"<blockquote class="alert alert-{}">"#,
                    alert_class(kind)
                )
                .unwrap(),
                None => self.output.push_str("<blockquote>"),
            },
            Tag::CodeBlock(kind) => {
                let kind = match kind {
                    CodeBlockKind::Fenced(info) => FenceKind::classify(&info),
                    CodeBlockKind::Indented => FenceKind::Plain,
                };
                self.code.start(kind);
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => write!(self.output, r#"<ol start="{n}">"#).unwrap(),
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::FootnoteDefinition(_)
            | Tag::HtmlBlock
            | Tag::MetadataBlock(_)
            | Tag::Table(_)
            | Tag::TableHead
            | Tag::TableRow
            | Tag::TableCell => {}
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                dest_url, title, ..
            } => {
                let link = link_open(&dest_url, &title);
                self.push_inline(&link);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image.start();
                self.pending_image = Some((dest_url.to_string(), title.to_string()));
            }
        }
    }

    /// Inline mode keeps inline formatting and drops block structure.
    fn start_inline_only(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::CodeBlock(_) => self.code.start(FenceKind::Plain),
            Tag::Emphasis => self.output.push_str("<em>"),
            Tag::Strong => self.output.push_str("<strong>"),
            Tag::Strikethrough => self.output.push_str("<s>"),
            Tag::Superscript => self.output.push_str("<sup>"),
            Tag::Subscript => self.output.push_str("<sub>"),
            Tag::Link {
                dest_url, title, ..
            } => self.output.push_str(&link_open(&dest_url, &title)),
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image.start();
                self.pending_image = Some((dest_url.to_string(), title.to_string()));
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if self.inline_only {
            self.end_inline_only(tag);
            return;
        }
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => {
                if self.depth > 0 || !self.heading.is_active() {
                    write!(self.output, "</h{}>", heading_level_to_num(level)).unwrap();
                }
            }
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>"),
            TagEnd::CodeBlock => self.code_block(),
            TagEnd::List(ordered) => self.output.push_str(if ordered { "</ol>" } else { "</ul>" }),
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::FootnoteDefinition
            | TagEnd::HtmlBlock
            | TagEnd::MetadataBlock(_)
            | TagEnd::Table
            | TagEnd::TableHead
            | TagEnd::TableRow
            | TagEnd::TableCell => {}
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => self.image(),
        }
    }

    fn end_inline_only(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::CodeBlock => {
                let (_, content) = self.code.end();
                write!(self.output, "<code>{}</code>", escape_html(content.trim_end())).unwrap();
            }
            TagEnd::Emphasis => self.output.push_str("</em>"),
            TagEnd::Strong => self.output.push_str("</strong>"),
            TagEnd::Strikethrough => self.output.push_str("</s>"),
            TagEnd::Superscript => self.output.push_str("</sup>"),
            TagEnd::Subscript => self.output.push_str("</sub>"),
            TagEnd::Link => self.output.push_str("</a>"),
            TagEnd::Image => self.image(),
            TagEnd::Item => self.output.push(' '),
            _ => {}
        }
    }

    /// Hand a finished code block to the placeholder store.
    ///
    /// Protection passes ran before the parser knew this was code, so any
    /// tokens in it are put back as source text.
    fn code_block(&mut self) {
        let (kind, code) = self.code.end();
        match self.store.as_deref_mut() {
            Some(store) => {
                let code = store.restore_source(&code);
                let token = store.insert(code.clone(), SpanKind::Fence { kind, code });
                self.output.push_str(&token);
            }
            None => {
                write!(self.output, "<pre><code>{}</code></pre>", escape_html(&code)).unwrap();
            }
        }
    }

    fn image(&mut self) {
        let alt = self.image.end();
        if let Some((src, title)) = self.pending_image.take() {
            let title_attr = if title.is_empty() {
                String::new()
            } else {
                format!(r#" title="{}""#, escape_html(&title))
            };
            let img = format!(
                r#"<img src="{}"{title_attr} alt="{}">"#,
                escape_html(&src),
                escape_html(&alt)
            );
            self.push_inline(&img);
        }
    }

    fn text(&mut self, text: &str) {
        if self.code.is_active() {
            self.code.push_str(text);
        } else if self.image.is_active() {
            self.image.push_str(text);
        } else if self.heading.is_active() {
            self.heading.push_text(text);
            self.heading.push_html(&escape_html(text));
        } else {
            self.output.push_str(&escape_html(text));
        }
    }

    fn inline_code(&mut self, code: &str) {
        if self.image.is_active() {
            self.image.push_str(code);
            return;
        }
        if self.heading.is_active() {
            self.heading.push_text(code);
        }
        let html = format!("<code>{}</code>", escape_html(code));
        self.push_inline(&html);
    }

    fn soft_break(&mut self) {
        if self.code.is_active() {
            self.code.push_str("\n");
        } else if self.heading.is_active() {
            self.heading.push_text(" ");
            self.heading.push_html(" ");
        } else {
            self.output.push('\n');
        }
    }

    fn horizontal_rule(&mut self) {
        if self.inline_only {
            return;
        }
        if self.depth == 0 {
            self.flush();
            self.blocks.push(Block::Rule);
        } else {
            self.output.push_str("<hr>");
        }
    }
}

fn link_open(dest_url: &str, title: &str) -> String {
    if title.is_empty() {
        format!(r#"<a href="{}">"#, escape_html(dest_url))
    } else {
        format!(
            r#"<a href="{}" title="{}">"#,
            escape_html(dest_url),
            escape_html(title)
        )
    }
}

fn alert_class(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}

pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(markdown: &str) -> Vec<Block> {
        let mut store = SpanStore::for_source(markdown);
        render_blocks(markdown, &mut store)
    }

    fn html(html: &str) -> Block {
        Block::Html(html.to_owned())
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(render("Hello, world!"), vec![html("<p>Hello, world!</p>")]);
    }

    #[test]
    fn test_top_level_blocks() {
        let blocks = render("# Title\n\nText\n\n---\n\n## Sub *em*");
        assert_eq!(
            blocks,
            vec![
                Block::Heading(Heading {
                    level: 1,
                    text: "Title".to_owned(),
                    html: "Title".to_owned(),
                }),
                html("<p>Text</p>"),
                Block::Rule,
                Block::Heading(Heading {
                    level: 2,
                    text: "Sub em".to_owned(),
                    html: "Sub <em>em</em>".to_owned(),
                }),
            ]
        );
    }

    #[test]
    fn test_heading_with_inline_code() {
        let blocks = render("## Install `npm`");
        assert_eq!(
            blocks,
            vec![Block::Heading(Heading {
                level: 2,
                text: "Install npm".to_owned(),
                html: "Install <code>npm</code>".to_owned(),
            })]
        );
    }

    #[test]
    fn test_nested_heading_stays_html() {
        let blocks = render("> ## Quoted");
        assert_eq!(blocks, vec![html("<blockquote><h2>Quoted</h2></blockquote>")]);
    }

    #[test]
    fn test_nested_rule_stays_html() {
        let blocks = render("- a\n\n  ***\n");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::Html(h) if h.contains("<hr>")));
    }

    #[test]
    fn test_blockquote_code_goes_to_store() {
        let markdown = "> ```rust\n> let x = 1;\n> ```";
        let mut store = SpanStore::for_source(markdown);
        let blocks = render_blocks(markdown, &mut store);

        let spans: Vec<_> = store.unconsumed().collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].kind,
            SpanKind::Fence {
                kind: FenceKind::Highlighted("rust".to_owned()),
                code: "let x = 1;\n".to_owned(),
            }
        );
        let Block::Html(rendered) = &blocks[0] else {
            panic!("expected html block");
        };
        assert!(rendered.contains(store.prefix()));
    }

    #[test]
    fn test_indented_code_is_plain() {
        let markdown = "    a < b\n";
        let mut store = SpanStore::for_source(markdown);
        render_blocks(markdown, &mut store);
        let span = store.unconsumed().next().unwrap();
        assert_eq!(
            span.kind,
            SpanKind::Fence {
                kind: FenceKind::Plain,
                code: "a < b\n".to_owned(),
            }
        );
    }

    #[test]
    fn test_code_block_gets_protected_source_back() {
        let mut store = SpanStore::for_source("doc");
        let math = store.insert(
            "$x_1$",
            SpanKind::Math {
                display: false,
                tex: "x_1".to_owned(),
            },
        );
        let markdown = format!("    cost = {math}\n");
        render_blocks(&markdown, &mut store);

        let spans: Vec<_> = store.unconsumed().collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].kind,
            SpanKind::Fence {
                kind: FenceKind::Plain,
                code: "cost = $x_1$\n".to_owned(),
            }
        );
    }

    #[test]
    fn test_alert_blockquote() {
        let blocks = render("> [!NOTE]\n> Read **this**.");
        let Block::Html(rendered) = &blocks[0] else {
            panic!("expected html block");
        };
        assert!(rendered.starts_with(r#"<blockquote class="alert alert-note">"#));
        assert!(rendered.contains("<strong>this</strong>"));
    }

    #[test]
    fn test_links_and_images_are_escaped() {
        let blocks = render(r#"[a](http://x.com/?a=1&b=2 "T") ![alt *x*](i.png)"#);
        assert_eq!(
            blocks,
            vec![html(concat!(
                r#"<p><a href="http://x.com/?a=1&amp;b=2" title="T">a</a> "#,
                r#"<img src="i.png" alt="alt x"></p>"#
            ))]
        );
    }

    #[test]
    fn test_task_list() {
        let blocks = render("- [x] done\n- [ ] todo");
        assert_eq!(
            blocks,
            vec![html(concat!(
                r#"<ul><li><input type="checkbox" disabled checked> done</li>"#,
                r#"<li><input type="checkbox" disabled> todo</li></ul>"#
            ))]
        );
    }

    #[test]
    fn test_pipe_rows_are_not_tables() {
        let blocks = render("| a |\n|---|");
        assert!(matches!(&blocks[0], Block::Html(h) if !h.contains("<table>")));
    }

    #[test]
    fn test_raw_html_block_passes_through() {
        let blocks = render("<!-- Section: Intro -->\n\nText");
        assert_eq!(
            blocks,
            vec![html("<!-- Section: Intro -->\n"), html("<p>Text</p>")]
        );
    }

    #[test]
    fn test_render_inline() {
        assert_eq!(render_inline("**a** `b`"), "<strong>a</strong> <code>b</code>");
        assert_eq!(render_inline(r"C:\\dir"), r"C:\dir");
        assert_eq!(render_inline("a < b"), "a &lt; b");
    }

    #[test]
    fn test_render_inline_drops_block_structure() {
        assert_eq!(render_inline("# not a heading"), "not a heading");
    }
}
