//! Colored terminal reporting for build runs.

use std::fmt::Display;
use std::path::Path;

use console::{Style, Term};

/// Build progress reporter writing to stderr.
pub(crate) struct Output {
    term: Term,
    dim: Style,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            dim: Style::new().dim(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Report which configuration file is in effect.
    pub(crate) fn config(&self, path: &Path) {
        let msg = format!("Using {}", path.display());
        self.line(&self.dim, &msg);
    }

    /// Report a written document (green).
    pub(crate) fn rendered(&self, input: &Path, output: &Path) {
        let msg = format!("{} -> {}", input.display(), output.display());
        self.line(&self.green, &msg);
    }

    /// Report a degraded-input warning for one document (yellow).
    pub(crate) fn warning(&self, input: &Path, warning: &impl Display) {
        let msg = format!("{}: warning: {warning}", input.display());
        self.line(&self.yellow, &msg);
    }

    /// Report a document that could not be written (red).
    pub(crate) fn failed(&self, input: &Path, err: &impl Display) {
        let msg = format!("{}: {err}", input.display());
        self.line(&self.red, &msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.red, msg);
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}
