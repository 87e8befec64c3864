//! Escape-aware splitting of pipe table rows.

/// Strip the boundary delimiters of a row.
///
/// A delimiter at the very start of the trimmed row, and an unescaped
/// delimiter at its very end, only mark the row boundary.
pub fn strip_boundary(row: &str, delimiter: char) -> &str {
    let mut inner = row.trim();
    if let Some(rest) = inner.strip_prefix(delimiter) {
        inner = rest;
    }
    if let Some(rest) = inner.strip_suffix(delimiter) {
        let backslashes = rest.chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 0 {
            inner = rest;
        }
    }
    inner
}

/// Split a row into raw cells on unescaped delimiters.
///
/// A delimiter is escaped iff the run of backslashes right before it has odd
/// length, so `\|` is content while `\\|` is a literal backslash followed by
/// a cell boundary. Cells are returned as raw slices (escapes intact,
/// whitespace untrimmed); joining them with the delimiter gives back
/// [`strip_boundary`] of the row.
///
/// ```
/// use mdoffline_renderer::table::split_row;
///
/// assert_eq!(split_row(r"| a \| b | c |", '|'), vec![r" a \| b ", " c "]);
/// assert_eq!(split_row(r"| a \\| b |", '|'), vec![r" a \\", " b "]);
/// ```
pub fn split_row(row: &str, delimiter: char) -> Vec<&str> {
    debug_assert_ne!(delimiter, '\\', "backslash cannot be a delimiter");

    let inner = strip_boundary(row, delimiter);
    let mut cells = Vec::new();
    let mut start = 0;
    let mut backslashes = 0usize;

    for (i, c) in inner.char_indices() {
        if c == '\\' {
            backslashes += 1;
            continue;
        }
        if c == delimiter && backslashes % 2 == 0 {
            cells.push(&inner[start..i]);
            start = i + c.len_utf8();
        }
        backslashes = 0;
    }
    cells.push(&inner[start..]);
    cells
}

/// Whether the row contains at least one unescaped delimiter anywhere.
pub fn has_unescaped_delimiter(row: &str, delimiter: char) -> bool {
    let mut backslashes = 0usize;
    for c in row.chars() {
        if c == '\\' {
            backslashes += 1;
            continue;
        }
        if c == delimiter && backslashes % 2 == 0 {
            return true;
        }
        backslashes = 0;
    }
    false
}
