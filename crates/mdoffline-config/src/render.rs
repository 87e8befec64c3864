//! Render options shared by the pipeline and the template assembler.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Visual theme preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Default,
    Github,
    Academic,
    Minimal,
    /// Always dark; the light/dark toggle is not offered.
    Dark,
}

impl Theme {
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Github,
        Self::Academic,
        Self::Minimal,
        Self::Dark,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Github => "github",
            Self::Academic => "academic",
            Self::Minimal => "minimal",
            Self::Dark => "dark",
        }
    }
}

/// Base font size, as a percentage of the browser default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u16")]
pub enum FontSize {
    Small,
    #[default]
    Normal,
    Large,
    ExtraLarge,
}

impl FontSize {
    #[must_use]
    pub fn percent(self) -> u16 {
        match self {
            Self::Small => 90,
            Self::Normal => 100,
            Self::Large => 110,
            Self::ExtraLarge => 125,
        }
    }
}

impl TryFrom<u16> for FontSize {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            90 => Ok(Self::Small),
            100 => Ok(Self::Normal),
            110 => Ok(Self::Large),
            125 => Ok(Self::ExtraLarge),
            other => Err(format!(
                "unsupported font size {other}, expected one of 90, 100, 110, 125"
            )),
        }
    }
}

/// Maximum width of the article column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentWidth {
    Narrow,
    #[default]
    Normal,
    Wide,
    Full,
}

impl ContentWidth {
    /// CSS length for the `--content-width` custom property.
    #[must_use]
    pub fn css(self) -> &'static str {
        match self {
            Self::Narrow => "700px",
            Self::Normal => "900px",
            Self::Wide => "1200px",
            Self::Full => "95vw",
        }
    }
}

/// Where the table of contents is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TocMode {
    #[default]
    Top,
    Sidebar,
    None,
}

/// Heading levels listed in the table of contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum TocLevels {
    #[serde(rename = "h2")]
    H2,
    #[default]
    #[serde(rename = "h2-h3")]
    H2H3,
    #[serde(rename = "h2-h3-h4")]
    H2H3H4,
}

impl TocLevels {
    /// Whether a heading of `level` belongs in the table of contents.
    #[must_use]
    pub fn includes(self, level: u8) -> bool {
        let max = match self {
            Self::H2 => 2,
            Self::H2H3 => 3,
            Self::H2H3H4 => 4,
        };
        (2..=max).contains(&level)
    }
}

/// Heading levels whose sections can be collapsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum CollapsibleMode {
    #[serde(rename = "none")]
    None,
    #[default]
    #[serde(rename = "h2")]
    H2,
    #[serde(rename = "h2-h3")]
    H2H3,
}

impl CollapsibleMode {
    #[must_use]
    pub fn includes(self, level: u8) -> bool {
        match self {
            Self::None => false,
            Self::H2 => level == 2,
            Self::H2H3 => level == 2 || level == 3,
        }
    }

    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

/// Color scheme for highlighted code, named after the bundled syntect themes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyntaxTheme {
    #[default]
    InspiredGithub,
    SolarizedLight,
    SolarizedDark,
    OceanLight,
    OceanDark,
    Eighties,
    Mocha,
}

impl SyntaxTheme {
    /// Key of the theme in syntect's default theme set.
    #[must_use]
    pub fn syntect_name(self) -> &'static str {
        match self {
            Self::InspiredGithub => "InspiredGitHub",
            Self::SolarizedLight => "Solarized (light)",
            Self::SolarizedDark => "Solarized (dark)",
            Self::OceanLight => "base16-ocean.light",
            Self::OceanDark => "base16-ocean.dark",
            Self::Eighties => "base16-eighties.dark",
            Self::Mocha => "base16-mocha.dark",
        }
    }
}

/// Options controlling one document transformation.
///
/// Every pipeline pass is a pure function of the Markdown text and this value.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderConfig {
    pub theme: Theme,
    pub font_size: FontSize,
    pub content_width: ContentWidth,
    pub toc_mode: TocMode,
    pub toc_levels: TocLevels,
    pub collapsible: CollapsibleMode,
    pub start_collapsed: bool,
    pub back_to_top: bool,
    pub search: bool,
    pub syntax_highlight: bool,
    pub syntax_theme: SyntaxTheme,
    /// Line numbers on code blocks. Output blocks never get them.
    pub line_numbers: bool,
    pub math: bool,
    /// Embed the Markdown source as a JSON payload in the document.
    pub embed_source: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_size: FontSize::default(),
            content_width: ContentWidth::default(),
            toc_mode: TocMode::default(),
            toc_levels: TocLevels::default(),
            collapsible: CollapsibleMode::default(),
            start_collapsed: false,
            back_to_top: true,
            search: true,
            syntax_highlight: true,
            syntax_theme: SyntaxTheme::default(),
            line_numbers: false,
            math: true,
            embed_source: true,
        }
    }
}

/// Error returned when a command-line value names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for Theme {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError {
                kind: "theme",
                value: s.to_owned(),
                expected: "default, github, academic, minimal, dark",
            })
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TocMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "sidebar" => Ok(Self::Sidebar),
            "none" => Ok(Self::None),
            _ => Err(ParseEnumError {
                kind: "toc mode",
                value: s.to_owned(),
                expected: "top, sidebar, none",
            }),
        }
    }
}
