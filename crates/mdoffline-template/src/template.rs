//! Single-file HTML document assembly.
//!
//! Everything the document needs is inlined: stylesheets, vendor scripts and
//! the optional Markdown source. Text that crosses into a different context
//! goes through the matching escaper from `mdoffline-renderer`.

use std::fmt::Write;

use mdoffline_assets::Katex;
use mdoffline_config::{RenderConfig, Theme, TocMode};
use mdoffline_renderer::{
    AssetManifest, TocNode, escape_html, escape_script_body, escape_script_json,
    escape_style_body,
};

use crate::css::stylesheet;
use crate::script::script;

/// Title used when the document has none.
pub const DEFAULT_TITLE: &str = "Document";

/// Everything needed to assemble one document.
pub struct DocumentData<'a> {
    pub title: &'a str,
    /// Sanitized article HTML.
    pub article: &'a str,
    pub toc: &'a [TocNode],
    pub manifest: &'a AssetManifest,
    pub config: &'a RenderConfig,
    /// Markdown source, embedded when the manifest asks for it.
    pub source: Option<&'a str>,
    /// Stylesheet for highlighted code.
    pub syntax_css: Option<&'a str>,
    /// KaTeX library, embedded when the document contains math.
    pub katex: Option<&'a Katex>,
}

/// Render a complete HTML document.
pub fn render_document(doc: &DocumentData<'_>) -> String {
    let manifest = doc.manifest;
    let theme_toggle = doc.config.theme != Theme::Dark;
    let katex = doc.katex.filter(|_| manifest.katex);
    let title = if doc.title.trim().is_empty() {
        DEFAULT_TITLE
    } else {
        doc.title
    };

    let mut html = String::with_capacity(doc.article.len() + 16384);
    html.push_str("<!doctype html>\n");
    let _ = writeln!(
        html,
        "<html lang=\"en\" data-theme=\"{}\">",
        if theme_toggle { "light" } else { "dark" }
    );
    html.push_str("<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(title));
    push_style(&mut html, &stylesheet(doc.config, manifest));
    if let Some(css) = doc.syntax_css.filter(|_| manifest.syntax_theme.is_some()) {
        push_style(&mut html, css);
    }
    if let Some(katex) = katex {
        push_style(&mut html, &katex.css);
    }
    html.push_str("</head>\n<body>\n");
    html.push_str("<a id=\"top\"></a>\n");
    html.push_str("<a class=\"skip\" href=\"#content\">Skip to content</a>\n");

    render_toolbar(&mut html, title, manifest, theme_toggle);
    if manifest.toc_mode == TocMode::Sidebar {
        render_sidebar_toc(&mut html, doc.toc);
    }

    html.push_str("<main role=\"main\">\n");
    if manifest.toc_mode == TocMode::Top {
        render_top_toc(&mut html, doc.toc);
    }
    html.push_str("<article id=\"content\">\n");
    html.push_str(doc.article);
    html.push_str("\n</article>\n</main>\n");

    if let Some(source) = doc.source.filter(|_| manifest.embed_source) {
        let _ = writeln!(
            html,
            "<script id=\"md-source\" type=\"application/json\">{}</script>",
            escape_script_json(source)
        );
    }
    if let Some(katex) = katex {
        push_script(&mut html, &katex.js);
    }
    push_script(&mut html, &script(manifest, theme_toggle, katex.is_some()));
    html.push_str("</body>\n</html>\n");
    html
}

fn push_style(html: &mut String, css: &str) {
    let _ = writeln!(html, "<style>\n{}\n</style>", escape_style_body(css));
}

fn push_script(html: &mut String, js: &str) {
    let _ = writeln!(html, "<script>\n{}\n</script>", escape_script_body(js));
}

/// Render the sticky toolbar.
fn render_toolbar(html: &mut String, title: &str, manifest: &AssetManifest, theme_toggle: bool) {
    html.push_str("<header class=\"toolbar\" role=\"banner\">\n<div class=\"wrap\">\n");
    let _ = writeln!(html, "<div class=\"doc-title\">{}</div>", escape_html(title));
    html.push_str("<div class=\"actions\">\n");
    if theme_toggle {
        html.push_str(
            "<button id=\"themeToggle\" type=\"button\" aria-pressed=\"false\" \
             aria-label=\"Toggle light and dark theme\">Light/Dark</button>\n",
        );
    }
    if manifest.toc_mode == TocMode::Sidebar {
        html.push_str(
            "<button id=\"tocSidebarToggle\" type=\"button\" aria-pressed=\"false\" \
             aria-label=\"Toggle table of contents sidebar\">ToC</button>\n",
        );
    }
    if manifest.embed_source {
        html.push_str(
            "<button id=\"copyMarkdown\" type=\"button\" \
             aria-label=\"Copy Markdown source\">Copy Markdown</button>\n",
        );
    }
    if manifest.search {
        html.push_str(
            "<div class=\"search-wrap\" role=\"search\">\
             <input id=\"searchBox\" type=\"search\" placeholder=\"Search...\" aria-label=\"Search document\">\
             <span id=\"searchCount\" aria-live=\"polite\"></span>\
             <button id=\"searchClear\" type=\"button\" aria-label=\"Clear search\">Clear</button>\
             </div>\n",
        );
    }
    html.push_str("</div>\n</div>\n</header>\n");
}

/// Render the table of contents above the article.
fn render_top_toc(html: &mut String, toc: &[TocNode]) {
    html.push_str("<nav id=\"toc\" aria-label=\"Table of contents\">\n");
    html.push_str("<strong>Table of Contents</strong>\n");
    render_toc_list(html, toc);
    html.push_str("</nav>\n");
}

/// Render the slide-in table of contents and its backdrop.
fn render_sidebar_toc(html: &mut String, toc: &[TocNode]) {
    html.push_str(
        "<aside id=\"toc-sidebar\" class=\"closed\" aria-label=\"Table of contents\" aria-hidden=\"true\">\n",
    );
    html.push_str("<div class=\"toc-header\"><strong>Table of Contents</strong>");
    html.push_str(
        "<button id=\"tocSidebarClose\" type=\"button\" aria-label=\"Close sidebar\">x</button></div>\n",
    );
    render_toc_list(html, toc);
    html.push_str("</aside>\n");
    html.push_str("<div id=\"toc-backdrop\" class=\"hidden\" aria-hidden=\"true\"></div>\n");
}

/// Render ToC entries as nested lists.
fn render_toc_list(html: &mut String, nodes: &[TocNode]) {
    html.push_str("<ul>");
    for node in nodes {
        let _ = write!(
            html,
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&node.id),
            escape_html(&node.title)
        );
        if !node.children.is_empty() {
            render_toc_list(html, &node.children);
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manifest() -> AssetManifest {
        AssetManifest {
            syntax_theme: None,
            katex: false,
            line_numbers: false,
            collapsible: false,
            back_to_top: false,
            search: false,
            toc_mode: TocMode::None,
            embed_source: false,
        }
    }

    fn node(level: u8, title: &str, id: &str, children: Vec<TocNode>) -> TocNode {
        TocNode {
            level,
            title: title.to_owned(),
            id: id.to_owned(),
            children,
        }
    }

    fn render(
        manifest: &AssetManifest,
        config: &RenderConfig,
        toc: &[TocNode],
        source: Option<&str>,
        katex: Option<&Katex>,
    ) -> String {
        render_document(&DocumentData {
            title: "Notes <draft>",
            article: "<p>Hello world</p>",
            toc,
            manifest,
            config,
            source,
            syntax_css: Some(".hl-keyword{color:red}"),
            katex,
        })
    }

    #[test]
    fn test_document_skeleton() {
        let html = render(&manifest(), &RenderConfig::default(), &[], None, None);
        assert!(html.starts_with("<!doctype html>\n<html lang=\"en\" data-theme=\"light\">"));
        assert!(html.contains("<title>Notes &lt;draft&gt;</title>"));
        assert!(html.contains("<div class=\"doc-title\">Notes &lt;draft&gt;</div>"));
        assert!(html.contains("<article id=\"content\">\n<p>Hello world</p>\n</article>"));
        assert!(html.contains("id=\"themeToggle\""));
        assert!(!html.contains("<nav id=\"toc\""));
        assert!(!html.contains("md-source"));
        // Nothing is highlighted, so no syntax stylesheet
        assert!(!html.contains(".hl-keyword"));
        assert!(html.ends_with("</body>\n</html>\n"));
    }

    #[test]
    fn test_empty_title_falls_back() {
        let manifest = manifest();
        let config = RenderConfig::default();
        let html = render_document(&DocumentData {
            title: "  ",
            article: "",
            toc: &[],
            manifest: &manifest,
            config: &config,
            source: None,
            syntax_css: None,
            katex: None,
        });
        assert!(html.contains("<title>Document</title>"));
    }

    #[test]
    fn test_dark_theme_has_no_toggle() {
        let config = RenderConfig {
            theme: Theme::Dark,
            ..RenderConfig::default()
        };
        let html = render(&manifest(), &config, &[], None, None);
        assert!(html.contains("data-theme=\"dark\""));
        assert!(!html.contains("themeToggle"));
    }

    #[test]
    fn test_top_toc() {
        let toc = vec![
            node(2, "Intro & Setup", "intro", vec![node(3, "Install", "install", vec![])]),
            node(2, "Usage", "usage", vec![]),
        ];
        let manifest = AssetManifest {
            toc_mode: TocMode::Top,
            ..manifest()
        };
        let html = render(&manifest, &RenderConfig::default(), &toc, None, None);
        assert!(html.contains(concat!(
            "<ul><li><a href=\"#intro\">Intro &amp; Setup</a>",
            "<ul><li><a href=\"#install\">Install</a></li></ul>\n</li>",
            "<li><a href=\"#usage\">Usage</a></li></ul>\n"
        )));
        assert!(!html.contains("toc-sidebar"));
    }

    #[test]
    fn test_sidebar_toc() {
        let manifest = AssetManifest {
            toc_mode: TocMode::Sidebar,
            ..manifest()
        };
        let html = render(
            &manifest,
            &RenderConfig::default(),
            &[node(2, "A", "a", vec![])],
            None,
            None,
        );
        assert!(html.contains("<aside id=\"toc-sidebar\""));
        assert!(html.contains("<div id=\"toc-backdrop\" class=\"hidden\""));
        assert!(html.contains("id=\"tocSidebarToggle\""));
        assert!(!html.contains("<nav id=\"toc\""));
    }

    #[test]
    fn test_embedded_source_is_escaped() {
        let manifest = AssetManifest {
            embed_source: true,
            ..manifest()
        };
        let html = render(
            &manifest,
            &RenderConfig::default(),
            &[],
            Some("</script><b>x</b>"),
            None,
        );
        assert!(html.contains(concat!(
            r#"<script id="md-source" type="application/json">"#,
            r#""\u003c/script\u003e\u003cb\u003ex\u003c/b\u003e"</script>"#
        )));
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains("id=\"copyMarkdown\""));
    }

    #[test]
    fn test_katex_embedded_only_with_math() {
        let katex = Katex {
            js: "var katex = {}; // </script>".to_owned(),
            css: ".katex{}".to_owned(),
        };
        let without_math = render(&manifest(), &RenderConfig::default(), &[], None, Some(&katex));
        assert!(!without_math.contains(".katex{}"));

        let manifest = AssetManifest {
            katex: true,
            ..manifest()
        };
        let html = render(&manifest, &RenderConfig::default(), &[], None, Some(&katex));
        assert!(html.contains("<style>\n.katex{}\n</style>"));
        assert!(html.contains("var katex = {}; // <\\/script>"));
        assert!(html.contains("katex.render"));
    }

    #[test]
    fn test_syntax_css_included_when_highlighted() {
        let manifest = AssetManifest {
            syntax_theme: Some(mdoffline_config::SyntaxTheme::default()),
            ..manifest()
        };
        let html = render(&manifest, &RenderConfig::default(), &[], None, None);
        assert!(html.contains("<style>\n.hl-keyword{color:red}\n</style>"));
    }

    #[test]
    fn test_search_box() {
        let manifest = AssetManifest {
            search: true,
            ..manifest()
        };
        let html = render(&manifest, &RenderConfig::default(), &[], None, None);
        assert!(html.contains("<input id=\"searchBox\" type=\"search\""));
    }
}
