//! Cell text unescaping for pipe tables.

/// Turn a raw cell into display text.
///
/// Runs in two passes so an escaped backslash right before the delimiter is
/// not mistaken for an escaped delimiter: every `\\` is first parked as a
/// sentinel character absent from the cell, then `\|` becomes `|`, then the
/// sentinel becomes a single `\`. Other backslashes are kept as written.
pub fn unescape_cell(cell: &str, delimiter: char) -> String {
    if !cell.contains('\\') {
        return cell.to_owned();
    }

    let sentinel = sentinel_for(cell).to_string();
    let escaped_delimiter: String = ['\\', delimiter].iter().collect();

    cell.replace(r"\\", &sentinel)
        .replace(&escaped_delimiter, delimiter.encode_utf8(&mut [0; 4]))
        .replace(&sentinel, r"\")
}

/// Turn a raw cell into inline Markdown for rendering.
///
/// Same passes as [`unescape_cell`], except the parked `\\` goes back as
/// `\\`. The inline renderer then shows one backslash, and every other
/// backslash escape keeps its Markdown meaning.
pub fn cell_markdown(cell: &str, delimiter: char) -> String {
    if !cell.contains('\\') {
        return cell.to_owned();
    }

    let sentinel = sentinel_for(cell).to_string();
    let escaped_delimiter: String = ['\\', delimiter].iter().collect();

    cell.replace(r"\\", &sentinel)
        .replace(&escaped_delimiter, delimiter.encode_utf8(&mut [0; 4]))
        .replace(&sentinel, r"\\")
}

/// Inverse of [`unescape_cell`]: escape backslashes, then delimiters.
pub fn escape_cell(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == delimiter {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// First private-use code point that does not occur in `text`.
fn sentinel_for(text: &str) -> char {
    ('\u{E000}'..='\u{F8FF}')
        .find(|&c| !text.contains(c))
        .unwrap_or('\u{FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::split::split_row;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(unescape_cell("plain", '|'), "plain");
    }

    #[test]
    fn test_escaped_delimiter() {
        assert_eq!(unescape_cell(r"\| Header \|", '|'), "| Header |");
    }

    #[test]
    fn test_escaped_backslash() {
        assert_eq!(unescape_cell(r"a\\", '|'), r"a\");
    }

    #[test]
    fn test_escaped_backslash_then_escaped_delimiter() {
        assert_eq!(unescape_cell(r"a\\\|b", '|'), r"a\|b");
    }

    #[test]
    fn test_other_escapes_kept() {
        assert_eq!(unescape_cell(r"\*not emphasis\*", '|'), r"\*not emphasis\*");
    }

    #[test]
    fn test_cell_markdown_resolves_only_delimiters() {
        assert_eq!(cell_markdown(r"\*a\* \| b", '|'), r"\*a\* | b");
        assert_eq!(cell_markdown(r"a\\\|b", '|'), r"a\\|b");
        assert_eq!(cell_markdown("plain", '|'), "plain");
    }

    #[test]
    fn test_sentinel_skips_characters_in_cell() {
        let cell = "\u{E000}\\\\";
        assert_eq!(unescape_cell(cell, '|'), "\u{E000}\\");
    }

    #[test]
    fn test_escape_round_trip_exhaustive() {
        // Every string up to length 6 over the characters that matter
        let alphabet = ['a', '\\', '|'];
        let mut words = vec![String::new()];
        for _ in 0..6 {
            let next: Vec<String> = words
                .iter()
                .flat_map(|w| {
                    alphabet.iter().map(move |c| {
                        let mut s = w.clone();
                        s.push(*c);
                        s
                    })
                })
                .collect();
            for word in &next {
                let escaped = escape_cell(word, '|');
                assert_eq!(unescape_cell(&escaped, '|'), *word, "escaped: {escaped}");
                // An escaped cell never splits
                assert_eq!(split_row(&format!("|{escaped}|"), '|'), vec![escaped.as_str()]);
            }
            words = next;
        }
    }
}
