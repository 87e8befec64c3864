//! Pipe tables with escape-aware cell splitting.
//!
//! Table syntax is handled here instead of by pulldown-cmark so that escaped
//! delimiters (`\|`) and escaped backslashes (`\\|`) follow one rule: a
//! delimiter is escaped iff an odd number of backslashes precedes it.

mod parser;
mod split;
mod unescape;

use std::fmt::Write;

pub use parser::TableParser;
pub use split::{has_unescaped_delimiter, split_row, strip_boundary};
pub use unescape::{cell_markdown, escape_cell, unescape_cell};

use crate::renderer::render_inline;

/// Cell delimiter of pipe tables.
const DELIMITER: char = '|';

/// Column alignment from the separator row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn class_attr(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Left => r#" class="align-left""#,
            Self::Center => r#" class="align-center""#,
            Self::Right => r#" class="align-right""#,
        }
    }
}

/// A parsed pipe table.
///
/// `header` and `rows` hold display text (delimiter and backslash escapes
/// resolved). Every row has exactly as many cells as the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Inline Markdown of every cell, header row first.
    markdown: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from trimmed raw cells.
    ///
    /// Rows must already be fitted to the header's column count.
    pub fn from_raw_cells(
        alignments: Vec<Alignment>,
        header: &[&str],
        rows: &[Vec<&str>],
    ) -> Self {
        let display = |cells: &[&str]| -> Vec<String> {
            cells.iter().map(|c| unescape_cell(c, DELIMITER)).collect()
        };
        let markdown = std::iter::once(header)
            .chain(rows.iter().map(Vec::as_slice))
            .map(|cells| cells.iter().map(|c| cell_markdown(c, DELIMITER)).collect())
            .collect();
        Self {
            alignments,
            header: display(header),
            rows: rows.iter().map(|row| display(row)).collect(),
            markdown,
        }
    }

    /// Render the table as HTML, cells as inline Markdown.
    pub(crate) fn to_html(&self) -> String {
        let mut out = String::with_capacity(256);
        let (header, rows) = self
            .markdown
            .split_first()
            .map_or((&[][..], &[][..]), |(h, r)| (h.as_slice(), r));
        out.push_str("<table><thead><tr>");
        for (cell, align) in header.iter().zip(&self.alignments) {
            write!(out, "<th{}>{}</th>", align.class_attr(), render_inline(cell)).unwrap();
        }
        out.push_str("</tr></thead>");
        if !rows.is_empty() {
            out.push_str("<tbody>");
            for row in rows {
                out.push_str("<tr>");
                for (cell, align) in row.iter().zip(&self.alignments) {
                    write!(out, "<td{}>{}</td>", align.class_attr(), render_inline(cell)).unwrap();
                }
                out.push_str("</tr>");
            }
            out.push_str("</tbody>");
        }
        out.push_str("</table>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_html() {
        let table = Table::from_raw_cells(
            vec![Alignment::Left, Alignment::Right],
            &["Name", r"\| pipe \|"],
            &[vec!["**bold**", r"C:\\dir"]],
        );
        assert_eq!(
            table.to_html(),
            concat!(
                r#"<table><thead><tr><th class="align-left">Name</th>"#,
                r#"<th class="align-right">| pipe |</th></tr></thead>"#,
                r#"<tbody><tr><td class="align-left"><strong>bold</strong></td>"#,
                r#"<td class="align-right">C:\dir</td></tr></tbody></table>"#
            )
        );
    }

    #[test]
    fn test_header_only_table_has_no_body() {
        let table = Table::from_raw_cells(vec![Alignment::None], &["a < b"], &[]);
        assert_eq!(
            table.to_html(),
            "<table><thead><tr><th>a &lt; b</th></tr></thead></table>"
        );
    }

    #[test]
    fn test_markdown_escapes_in_cells_keep_their_meaning() {
        let table = Table::from_raw_cells(
            vec![Alignment::None, Alignment::None],
            &["h", "k"],
            &[vec![r"\*a\*", r"\_x\_ \\*y*"]],
        );

        assert_eq!(table.rows[0], vec![r"\*a\*".to_owned(), r"\_x\_ \*y*".to_owned()]);
        assert_eq!(
            table.to_html(),
            concat!(
                "<table><thead><tr><th>h</th><th>k</th></tr></thead>",
                r"<tbody><tr><td>*a*</td><td>_x_ \<em>y</em></td></tr></tbody></table>"
            )
        );
    }
}
