//! Output file names derived from document titles.

/// Name used when nothing usable is left after cleaning.
pub const FALLBACK_FILENAME: &str = "document.html";

const EXTENSION: &str = ".html";

/// Longest file name produced, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

/// Turn arbitrary text into a safe `.html` file name.
///
/// Keeps word characters, dots and dashes, turns each run of whitespace into
/// `_`, trims leading and trailing `.`, `_` and `-`, and appends `.html`
/// unless the name already ends with it (in any case). Long names are cut on
/// a character boundary so the result fits in 255 bytes.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                cleaned.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '-') {
            cleaned.push(c);
        }
    }

    let trimmed = cleaned.trim_matches(|c| matches!(c, '.' | '_' | '-'));
    let stem = match trimmed.len().checked_sub(EXTENSION.len()) {
        Some(split)
            if trimmed.is_char_boundary(split)
                && trimmed[split..].eq_ignore_ascii_case(EXTENSION) =>
        {
            &trimmed[..split]
        }
        _ => trimmed,
    };
    if stem.trim_matches(|c| matches!(c, '.' | '_' | '-')).is_empty() {
        return FALLBACK_FILENAME.to_owned();
    }

    let mut end = stem.len().min(MAX_FILENAME_BYTES - EXTENSION.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{EXTENSION}", &stem[..end])
}
