//! Single-file HTML assembly for mdoffline.
//!
//! Takes the output of [`mdoffline_renderer::Pipeline::transform`] and wraps
//! it into a complete, offline HTML document: theme stylesheet, toolbar,
//! table of contents, optional vendor assets and one inline script.

mod css;
mod filename;
mod script;
mod template;

pub use filename::{FALLBACK_FILENAME, sanitize_filename};
pub use template::{DEFAULT_TITLE, DocumentData, render_document};
