//! Markdown to sanitized HTML pipeline.
//!
//! This crate turns one Markdown document into an HTML article fragment plus
//! the metadata the document template needs (title, table of contents and an
//! [`AssetManifest`] of optional scripts and stylesheets).
//!
//! # Architecture
//!
//! Content that the Markdown parser would mangle is cut out first and replaced
//! by opaque placeholder tokens:
//!
//! - [`FenceClassifier`]: fenced code blocks, so `$` and `|` inside code stay literal
//! - [`MathProtector`]: `$...$` and `$$...$$` spans, so TeX survives emphasis rules
//! - [`TableParser`]: pipe tables with escaped pipes and ragged rows
//!
//! The remaining text goes through pulldown-cmark. Tokens are then restored
//! with their rendered HTML, the structure pass adds heading ids, sections and
//! the table of contents, and [`Sanitizer`] cleans the result with ammonia.
//!
//! # Example
//!
//! ```
//! use mdoffline_config::RenderConfig;
//! use mdoffline_renderer::Pipeline;
//!
//! let pipeline = Pipeline::new();
//! let result = pipeline
//!     .transform("# Guide\n\nLet $x^2$ be positive.", &RenderConfig::default())
//!     .unwrap();
//! assert_eq!(result.title.as_deref(), Some("Guide"));
//! assert!(result.manifest.katex);
//! ```

mod error;
mod fence;
mod highlight;
mod math;
mod pipeline;
mod placeholder;
mod renderer;
mod sanitize;
mod state;
mod structure;
pub mod table;

pub use error::{TransformError, Warning};
pub use fence::{FenceClassifier, FenceKind};
pub use highlight::{Highlighter, NoHighlighter, SyntectHighlighter};
pub use math::{KatexMarkup, MathProtector, MathRenderer, looks_like_inline_math};
pub use pipeline::{AssetManifest, Pipeline, Transformed};
pub use placeholder::{ProtectedSpan, SpanKind};
pub use sanitize::{
    Policy, Rejection, Sanitizer, escape_css_value, escape_html, escape_script_body,
    escape_script_json, escape_style_body,
};
pub use state::slugify;
pub use structure::TocNode;
pub use table::{Alignment, Table, TableParser};
