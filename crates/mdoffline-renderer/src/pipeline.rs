//! Document transformation pipeline.
//!
//! ```text
//! protect (fences -> math -> tables) -> render -> restore -> structure -> sanitize
//! ```

use mdoffline_config::{RenderConfig, SyntaxTheme, TocMode};

use crate::error::{TransformError, Warning};
use crate::fence::{CodeOptions, FenceClassifier, render_code_block};
use crate::highlight::{Highlighter, SyntectHighlighter};
use crate::math::{KatexMarkup, MathProtector, MathRenderer};
use crate::placeholder::{ProtectedSpan, SpanKind, SpanStore};
use crate::renderer::{Block, render_blocks};
use crate::sanitize::Sanitizer;
use crate::structure::{StructurePostprocessor, TocNode};
use crate::table::TableParser;

/// Optional document parts the template has to include.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetManifest {
    /// Theme of the syntax stylesheet, set when any code block was highlighted.
    pub syntax_theme: Option<SyntaxTheme>,
    /// The document contains math.
    pub katex: bool,
    pub line_numbers: bool,
    pub collapsible: bool,
    pub back_to_top: bool,
    pub search: bool,
    /// `TocMode::None` when there is nothing to list.
    pub toc_mode: TocMode,
    pub embed_source: bool,
}

/// Result of transforming one document.
#[derive(Clone, Debug)]
pub struct Transformed {
    /// Sanitized article HTML.
    pub html: String,
    /// Text of the first H1.
    pub title: Option<String>,
    pub toc: Vec<TocNode>,
    pub warnings: Vec<Warning>,
    pub manifest: AssetManifest,
}

/// Markdown to sanitized HTML transformer.
///
/// Build one per process and share it: construction loads syntax definitions
/// and the sanitizer configuration, and [`transform`](Self::transform) only
/// needs `&self`.
pub struct Pipeline {
    highlighter: Box<dyn Highlighter>,
    math: Box<dyn MathRenderer>,
    sanitizer: Sanitizer,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            highlighter: Box::new(SyntectHighlighter::new()),
            math: Box::new(KatexMarkup),
            sanitizer: Sanitizer::new(),
        }
    }

    #[must_use]
    pub fn with_highlighter<H: Highlighter + 'static>(mut self, highlighter: H) -> Self {
        self.highlighter = Box::new(highlighter);
        self
    }

    #[must_use]
    pub fn with_math_renderer<M: MathRenderer + 'static>(mut self, math: M) -> Self {
        self.math = Box::new(math);
        self
    }

    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Stylesheet for highlighted code in `theme`.
    pub fn syntax_stylesheet(&self, theme: SyntaxTheme) -> Option<String> {
        self.highlighter.stylesheet(theme)
    }

    /// Transform one Markdown document.
    ///
    /// Problems with the input are reported as warnings. The only error is a
    /// placeholder token that survived restoration.
    pub fn transform(
        &self,
        markdown: &str,
        config: &RenderConfig,
    ) -> Result<Transformed, TransformError> {
        let mut store = SpanStore::for_source(markdown);
        let mut warnings = Vec::new();

        let text = FenceClassifier::new().process(markdown, &mut store);
        let text = if config.math {
            let mut protector = MathProtector::new();
            let text = protector.process(&text, &mut store);
            warnings.extend(protector.into_warnings());
            text
        } else {
            text
        };
        let mut tables = TableParser::new();
        let text = tables.process(&text, &mut store);
        warnings.extend(tables.into_warnings());

        let blocks = render_blocks(&text, &mut store);
        let blocks = resolve_blocks(blocks, &mut store);
        let structured = StructurePostprocessor::new(config).process(blocks);

        let mut spans = SpanRenderer {
            highlighter: self.highlighter.as_ref(),
            math: self.math.as_ref(),
            options: CodeOptions {
                highlight: config.syntax_highlight,
                line_numbers: config.line_numbers,
            },
            highlighted: false,
            math_used: false,
            code_blocks: 0,
        };
        let html = unwrap_block_tokens(&structured.html, &mut store, &mut spans);
        let html = store.restore(&html, |span| spans.render(span));

        warnings.extend(store.unconsumed().map(|span| {
            tracing::warn!(kind = span.kind.name(), "Protected span was dropped during rendering");
            Warning::UnconsumedSpan {
                kind: span.kind.name(),
            }
        }));

        if let Some(pos) = html.find(store.prefix()) {
            let token: String = html[pos..]
                .chars()
                .take_while(char::is_ascii_alphanumeric)
                .collect();
            return Err(TransformError::UnresolvedPlaceholder { token });
        }

        warnings.extend(
            self.sanitizer
                .audit(&html)
                .into_iter()
                .map(Warning::SanitizationRejected),
        );
        let html = self.sanitizer.clean(&html);

        let manifest = AssetManifest {
            syntax_theme: spans.highlighted.then_some(config.syntax_theme),
            katex: spans.math_used,
            line_numbers: config.line_numbers && spans.code_blocks > 0,
            collapsible: structured.collapsible,
            back_to_top: structured.back_to_top,
            search: config.search,
            toc_mode: if structured.toc.is_empty() {
                TocMode::None
            } else {
                config.toc_mode
            },
            embed_source: config.embed_source,
        };

        tracing::debug!(
            spans = store.len(),
            warnings = warnings.len(),
            bytes = html.len(),
            "Transform completed"
        );

        Ok(Transformed {
            html,
            title: structured.title,
            toc: structured.toc,
            warnings,
            manifest,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Prepare rendered blocks for the structure pass.
///
/// Paragraphs holding only a table token become table blocks, and heading
/// text gets its protected source back so ids and the table of contents
/// see what the author wrote.
fn resolve_blocks(blocks: Vec<Block>, store: &mut SpanStore) -> Vec<Block> {
    blocks
        .into_iter()
        .map(|block| match block {
            Block::Heading(mut heading) => {
                heading.text = store.restore_plain(&heading.text);
                Block::Heading(heading)
            }
            Block::Html(html) => {
                let table = paragraph_content(&html)
                    .filter(|token| is_table_token(store, token))
                    .and_then(|token| match &store.take_token(token)?.kind {
                        SpanKind::Table(table) => Some(table.clone()),
                        _ => None,
                    });
                table.map_or(Block::Html(html), Block::Table)
            }
            other => other,
        })
        .collect()
}

fn is_table_token(store: &SpanStore, token: &str) -> bool {
    store
        .peek_token(token)
        .is_some_and(|span| matches!(span.kind, SpanKind::Table(_)))
}

fn paragraph_content(html: &str) -> Option<&str> {
    html.trim()
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
}

/// Restore tokens that fill a whole paragraph without the paragraph wrapper.
///
/// A code block or table must not end up inside `<p>`.
fn unwrap_block_tokens(html: &str, store: &mut SpanStore, spans: &mut SpanRenderer<'_>) -> String {
    let open = format!("<p>{}", store.prefix());
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find(&open) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + "<p>".len()..];
        let span = after
            .find("</p>")
            .and_then(|end| store.take_token(&after[..end]).map(|span| (span, end)));
        match span {
            Some((span, end)) => {
                out.push_str(&spans.render_block(span));
                rest = &after[end + "</p>".len()..];
            }
            None => {
                out.push_str("<p>");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Renders protected spans back into HTML and records what was used.
struct SpanRenderer<'p> {
    highlighter: &'p dyn Highlighter,
    math: &'p dyn MathRenderer,
    options: CodeOptions,
    highlighted: bool,
    math_used: bool,
    code_blocks: usize,
}

impl SpanRenderer<'_> {
    fn render(&mut self, span: &ProtectedSpan) -> String {
        match &span.kind {
            SpanKind::Fence { kind, code } => {
                let rendered = render_code_block(kind, code, self.options, self.highlighter);
                self.highlighted |= rendered.highlighted;
                self.code_blocks += 1;
                rendered.html
            }
            SpanKind::Math { display, tex } => {
                self.math_used = true;
                self.math.render(tex, *display)
            }
            SpanKind::Table(table) => {
                format!(r#"<div class="table-wrapper">{}</div>"#, table.to_html())
            }
        }
    }

    /// Render a span that was alone in its paragraph.
    fn render_block(&mut self, span: &ProtectedSpan) -> String {
        match span.kind {
            SpanKind::Math { .. } => format!("<p>{}</p>", self.render(span)),
            _ => self.render(span),
        }
    }
}
