//! Syntax highlighting collaborator.
//!
//! Token classification is delegated to syntect. Output uses CSS classes
//! rather than inline styles so the sanitizer can keep `style` attributes
//! forbidden and the theme stylesheet is emitted once per document.

use mdoffline_config::SyntaxTheme;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Prefix keeps syntect's scope classes apart from document classes.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Turns source code into highlighted HTML.
pub trait Highlighter: Send + Sync {
    /// Highlight `code` as `language`.
    ///
    /// Returns `None` for unknown languages; the caller then emits escaped text.
    fn highlight(&self, language: &str, code: &str) -> Option<String>;

    /// Stylesheet matching the classes emitted by [`highlight`](Self::highlight).
    fn stylesheet(&self, theme: SyntaxTheme) -> Option<String>;
}

/// Highlighter backed by syntect's bundled grammars and themes.
///
/// Loading the grammar set is expensive; build one instance per process and
/// share it.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl SyntectHighlighter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, language: &str, code: &str) -> Option<String> {
        let syntax = self.syntaxes.find_syntax_by_token(language)?;
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::warn!(language, error = %e, "Highlighting failed, emitting plain code");
                return None;
            }
        }
        Some(generator.finalize())
    }

    fn stylesheet(&self, theme: SyntaxTheme) -> Option<String> {
        let name = theme.syntect_name();
        let Some(theme) = self.themes.themes.get(name) else {
            tracing::warn!(theme = name, "Syntax theme not bundled");
            return None;
        };
        match css_for_theme_with_class_style(theme, CLASS_STYLE) {
            Ok(css) => Some(css),
            Err(e) => {
                tracing::warn!(theme = name, error = %e, "Failed to build syntax theme CSS");
                None
            }
        }
    }
}

/// Highlighter that never highlights.
pub struct NoHighlighter;

impl Highlighter for NoHighlighter {
    fn highlight(&self, _language: &str, _code: &str) -> Option<String> {
        None
    }

    fn stylesheet(&self, _theme: SyntaxTheme) -> Option<String> {
        None
    }
}
