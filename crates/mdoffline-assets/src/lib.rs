//! Vendor assets embedded into generated documents.
//!
//! Third-party files (currently KaTeX) are read once from a vendor directory
//! and validated before they are inlined into HTML:
//!
//! - file names must be plain names (`^[A-Za-z0-9][A-Za-z0-9._-]*$`)
//! - the canonical path must stay inside the vendor directory, so symlinks
//!   pointing elsewhere are rejected
//! - files larger than [`MAX_ASSET_BYTES`] are rejected
//! - scripts must be at least [`MIN_SCRIPT_BYTES`] long
//!
//! Missing optional files are not an error: the feature that needs them is
//! disabled and a warning is logged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// KaTeX script file name.
pub const KATEX_JS_FILE: &str = "katex.min.js";
/// KaTeX stylesheet file name.
pub const KATEX_CSS_FILE: &str = "katex.min.css";

/// Largest vendor file accepted (10 MiB).
pub const MAX_ASSET_BYTES: u64 = 10 * 1024 * 1024;

/// Shortest file accepted as a script.
pub const MIN_SCRIPT_BYTES: usize = 100;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());

/// Error loading a vendor file.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// File name with path separators, a leading dot or other characters.
    #[error("Invalid vendor file name: {0:?}")]
    InvalidName(String),
    /// Resolved path escapes the vendor directory.
    #[error("Vendor file {} resolves outside {}", .path.display(), .dir.display())]
    OutsideVendorDir { path: PathBuf, dir: PathBuf },
    /// File exceeds [`MAX_ASSET_BYTES`].
    #[error("Vendor file {name} is too large ({size} bytes)")]
    TooLarge { name: String, size: u64 },
    /// Script that is empty or too short to be real.
    #[error("Vendor script {name} appears invalid: {reason}")]
    InvalidScript { name: String, reason: &'static str },
    /// I/O error.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// KaTeX script and stylesheet.
#[derive(Debug, Clone)]
pub struct Katex {
    pub js: String,
    pub css: String,
}

/// Vendor files loaded once per process and shared read-only.
#[derive(Debug, Default)]
pub struct VendorAssets {
    katex: Option<Katex>,
}

impl VendorAssets {
    /// No vendor files; features that need them are disabled.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Load vendor files from `dir`.
    ///
    /// KaTeX is only read when `need_katex` is set. Missing files disable the
    /// feature; files that exist but fail validation are errors.
    pub fn load(dir: &Path, need_katex: bool) -> Result<Self, AssetError> {
        let katex = if need_katex {
            load_katex(dir)?
        } else {
            None
        };
        Ok(Self { katex })
    }

    /// KaTeX files, if they were requested and found.
    pub fn katex(&self) -> Option<&Katex> {
        self.katex.as_ref()
    }
}

fn load_katex(dir: &Path) -> Result<Option<Katex>, AssetError> {
    let js = resolve(dir, KATEX_JS_FILE)?;
    let css = resolve(dir, KATEX_CSS_FILE)?;
    let (Some(js_path), Some(css_path)) = (js, css) else {
        tracing::warn!(
            dir = %dir.display(),
            "KaTeX files not found in vendor directory, math will not be typeset"
        );
        return Ok(None);
    };

    let js = read_asset(&js_path, KATEX_JS_FILE)?;
    validate_script(KATEX_JS_FILE, &js)?;
    let css = read_asset(&css_path, KATEX_CSS_FILE)?;

    tracing::info!(
        js_bytes = js.len(),
        css_bytes = css.len(),
        "Loaded KaTeX from vendor directory"
    );
    Ok(Some(Katex { js, css }))
}

/// Resolve `name` inside `dir`, returning `None` when the file is missing.
fn resolve(dir: &Path, name: &str) -> Result<Option<PathBuf>, AssetError> {
    if !NAME_RE.is_match(name) {
        return Err(AssetError::InvalidName(name.to_owned()));
    }

    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }

    let canonical_dir = canonicalize(dir)?;
    let canonical = canonicalize(&path)?;
    if !canonical.starts_with(&canonical_dir) {
        return Err(AssetError::OutsideVendorDir {
            path: canonical,
            dir: canonical_dir,
        });
    }
    Ok(Some(canonical))
}

fn canonicalize(path: &Path) -> Result<PathBuf, AssetError> {
    path.canonicalize().map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_asset(path: &Path, name: &str) -> Result<String, AssetError> {
    let io_err = |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_ASSET_BYTES {
        return Err(AssetError::TooLarge {
            name: name.to_owned(),
            size,
        });
    }
    fs::read_to_string(path).map_err(io_err)
}

fn validate_script(name: &str, content: &str) -> Result<(), AssetError> {
    let reason = if content.trim().is_empty() {
        "file is empty"
    } else if content.len() < MIN_SCRIPT_BYTES {
        "file is too short"
    } else {
        return Ok(());
    };
    Err(AssetError::InvalidScript {
        name: name.to_owned(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn katex_js() -> String {
        format!("/* katex */ {}", "var katex = {};\n".repeat(10))
    }

    fn write_katex(dir: &Path) {
        fs::write(dir.join(KATEX_JS_FILE), katex_js()).unwrap();
        fs::write(dir.join(KATEX_CSS_FILE), ".katex { font: inherit; }").unwrap();
    }

    #[test]
    fn test_load_katex() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_katex(temp_dir.path());

        let assets = VendorAssets::load(temp_dir.path(), true).unwrap();
        let katex = assets.katex().unwrap();
        assert_eq!(katex.js, katex_js());
        assert_eq!(katex.css, ".katex { font: inherit; }");
    }

    #[test]
    fn test_katex_not_requested() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_katex(temp_dir.path());

        let assets = VendorAssets::load(temp_dir.path(), false).unwrap();
        assert!(assets.katex().is_none());
    }

    #[test]
    fn test_missing_files_disable_katex() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(KATEX_JS_FILE), katex_js()).unwrap();

        let assets = VendorAssets::load(temp_dir.path(), true).unwrap();
        assert!(assets.katex().is_none());
    }

    #[test]
    fn test_missing_directory_disables_katex() {
        let temp_dir = tempfile::tempdir().unwrap();
        let assets = VendorAssets::load(&temp_dir.path().join("absent"), true).unwrap();
        assert!(assets.katex().is_none());
    }

    #[test]
    fn test_short_script_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_katex(temp_dir.path());
        fs::write(temp_dir.path().join(KATEX_JS_FILE), "var x;").unwrap();

        let err = VendorAssets::load(temp_dir.path(), true).unwrap_err();
        assert!(matches!(
            err,
            AssetError::InvalidScript {
                reason: "file is too short",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_script_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_katex(temp_dir.path());
        fs::write(temp_dir.path().join(KATEX_JS_FILE), "  \n").unwrap();

        let err = VendorAssets::load(temp_dir.path(), true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Vendor script katex.min.js appears invalid: file is empty"
        );
    }

    #[test]
    fn test_oversized_file_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_katex(temp_dir.path());
        let file = fs::File::create(temp_dir.path().join(KATEX_CSS_FILE)).unwrap();
        file.set_len(MAX_ASSET_BYTES + 1).unwrap();

        let err = VendorAssets::load(temp_dir.path(), true).unwrap_err();
        assert!(matches!(err, AssetError::TooLarge { size, .. } if size == MAX_ASSET_BYTES + 1));
    }

    #[test]
    fn test_invalid_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        for name in [".hidden.js", "../katex.min.js", "a/b.js", "", "katex min.js"] {
            assert!(
                matches!(resolve(temp_dir.path(), name), Err(AssetError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(resolve(temp_dir.path(), "katex-0.16.min.js").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_vendor_dir_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let vendor = tempfile::tempdir().unwrap();
        write_katex(outside.path());
        fs::write(vendor.path().join(KATEX_CSS_FILE), ".katex {}").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join(KATEX_JS_FILE),
            vendor.path().join(KATEX_JS_FILE),
        )
        .unwrap();

        let err = VendorAssets::load(vendor.path(), true).unwrap_err();
        assert!(matches!(err, AssetError::OutsideVendorDir { .. }));
    }
}
