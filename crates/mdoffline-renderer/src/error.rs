//! Warnings and errors produced by the transformation pipeline.

use crate::sanitize::Rejection;

/// Recoverable problem found while transforming a document.
///
/// Warnings never stop the pipeline; the affected content degrades to plain
/// text or is dropped by the sanitizer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    /// Table-shaped lines that could not be parsed; left as plain text.
    #[error("line {line}: malformed table ({reason})")]
    MalformedTable { line: usize, reason: String },
    /// Table row with the wrong number of cells; padded or merged.
    #[error("line {line}: table row has {found} cells, expected {expected}")]
    TableRowMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// `$$` without a closing delimiter; left as literal text.
    #[error("line {line}: unbalanced display math delimiter")]
    UnbalancedMath { line: usize },
    /// A protected span whose token disappeared during rendering.
    #[error("{kind} was dropped during rendering")]
    UnconsumedSpan { kind: &'static str },
    /// Content removed by the sanitizer.
    #[error("removed by sanitizer: {0}")]
    SanitizationRejected(Rejection),
}

/// Fatal pipeline error.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// A placeholder token survived restoration and would leak into the output.
    #[error("unresolved placeholder {token} in rendered output")]
    UnresolvedPlaceholder { token: String },
}
