//! Pipe table detection and parsing.
//!
//! Runs on the source after fenced code has been protected, so pipes inside
//! code never reach it.

use super::split::{has_unescaped_delimiter, split_row};
use super::{Alignment, DELIMITER, Table};
use crate::error::Warning;
use crate::placeholder::{SpanKind, SpanStore, block_replacement};

/// Preprocessor that replaces pipe tables with placeholders.
///
/// A table is a header row with at least one unescaped `|`, a separator row
/// whose cells all look like `:?-+:?`, and the following non-blank rows that
/// contain an unescaped `|`. The header fixes the column count: short rows
/// are padded with empty cells, excess cells are merged into the last one.
pub struct TableParser {
    warnings: Vec<Warning>,
    tables: usize,
}

impl TableParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            tables: 0,
        }
    }

    /// Replace every table in `input` with a block placeholder.
    pub(crate) fn process(&mut self, input: &str, store: &mut SpanStore) -> String {
        let lines: Vec<&str> = input.split('\n').collect();
        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        let mut idx = 0;

        while idx < lines.len() {
            match self.try_table(&lines, idx) {
                Some((table, end)) => {
                    let header = lines[idx];
                    let indent = &header[..header.len() - header.trim_start().len()];
                    let raw = lines[idx..end].join("\n");
                    let token = store.insert(raw, SpanKind::Table(table));
                    output.push(block_replacement(indent, &token, end - idx));
                    self.tables += 1;
                    idx = end;
                }
                None => {
                    output.push(lines[idx].to_owned());
                    idx += 1;
                }
            }
        }

        tracing::debug!(tables = self.tables, "Table pass completed");
        output.join("\n")
    }

    /// Number of tables replaced so far.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables
    }

    /// Consume the parser and return the warnings it produced.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    /// Parse a table starting at `start`, returning it and the index past its last row.
    fn try_table(&mut self, lines: &[&str], start: usize) -> Option<(Table, usize)> {
        let header_line = lines[start];
        let separator_line = *lines.get(start + 1)?;
        if header_line.trim().is_empty() || !has_unescaped_delimiter(header_line, DELIMITER) {
            return None;
        }

        let header = split_row(header_line, DELIMITER);
        let separator = split_row(separator_line, DELIMITER);
        let alignments = parse_separator(&separator)?;
        if header.len() > 1 && !has_unescaped_delimiter(separator_line, DELIMITER) {
            // `a | b` over `---` is a setext heading, not a table
            return None;
        }

        if alignments.len() != header.len() {
            self.warnings.push(Warning::MalformedTable {
                line: start + 1,
                reason: format!(
                    "header has {} cells but separator has {}",
                    header.len(),
                    alignments.len()
                ),
            });
            return None;
        }

        let columns = header.len();
        let mut rows = Vec::new();
        let mut end = start + 2;
        while let Some(line) = lines.get(end) {
            if line.trim().is_empty() || !has_unescaped_delimiter(line, DELIMITER) {
                break;
            }
            rows.push(self.parse_row(line, columns, end + 1));
            end += 1;
        }

        let header: Vec<&str> = header.iter().map(|cell| cell.trim()).collect();
        let rows: Vec<Vec<&str>> = rows.iter().map(|row| trimmed(row)).collect();
        Some((Table::from_raw_cells(alignments, &header, &rows), end))
    }

    /// Split a data row and fit it to `columns` raw cells.
    fn parse_row(&mut self, line: &str, columns: usize, line_num: usize) -> Vec<String> {
        let raw = split_row(line, DELIMITER);
        if raw.len() != columns {
            self.warnings.push(Warning::TableRowMismatch {
                line: line_num,
                expected: columns,
                found: raw.len(),
            });
        }

        let mut cells: Vec<String> = if raw.len() > columns {
            let merged = raw[columns - 1..].join("|");
            raw[..columns - 1]
                .iter()
                .map(|&cell| cell.to_owned())
                .chain(std::iter::once(merged))
                .collect()
        } else {
            raw.iter().map(|&cell| cell.to_owned()).collect()
        };
        cells.resize(columns, String::new());
        cells
    }
}

impl Default for TableParser {
    fn default() -> Self {
        Self::new()
    }
}

fn trimmed(cells: &[String]) -> Vec<&str> {
    cells.iter().map(|cell| cell.trim()).collect()
}

/// Parse separator cells into alignments, or `None` if the row is not a separator.
fn parse_separator(cells: &[&str]) -> Option<Vec<Alignment>> {
    cells
        .iter()
        .map(|cell| {
            let marker = cell.trim();
            let left = marker.starts_with(':');
            let right = marker.len() > 1 && marker.ends_with(':');
            let dashes = marker.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}
