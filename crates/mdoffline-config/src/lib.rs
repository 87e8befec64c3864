//! Configuration management for mdoffline.
//!
//! Parses `mdoffline.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Path Expansion
//!
//! `vendor.dir` supports `~`, `${VAR}` and `${VAR:-default}`. Relative
//! directories are resolved against the directory holding the config file.

mod expand;
mod render;

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use render::{
    CollapsibleMode, ContentWidth, FontSize, ParseEnumError, RenderConfig, SyntaxTheme, Theme,
    TocLevels, TocMode,
};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub theme: Option<Theme>,
    pub toc_mode: Option<TocMode>,
    pub math: Option<bool>,
    pub syntax_highlight: Option<bool>,
    pub line_numbers: Option<bool>,
    pub vendor_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdoffline.toml";

/// Default input size limit (5 MiB).
pub const DEFAULT_MAX_MARKDOWN_BYTES: u64 = 5 * 1024 * 1024;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document rendering options.
    pub render: RenderConfig,
    /// Vendor asset configuration (directory as a raw string from TOML).
    vendor: VendorConfigRaw,
    /// Input limits.
    pub limits: LimitsConfig,

    /// Resolved vendor configuration (set after loading).
    #[serde(skip)]
    pub vendor_resolved: VendorConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct VendorConfigRaw {
    dir: Option<String>,
}

/// Resolved vendor asset configuration.
#[derive(Debug, Default)]
pub struct VendorConfig {
    /// Directory holding `katex.min.js` and `katex.min.css`.
    pub dir: PathBuf,
}

/// Input limits.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest Markdown input accepted, in bytes.
    pub max_markdown_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_markdown_bytes: DEFAULT_MAX_MARKDOWN_BYTES,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`vendor.dir`").
        field: String,
        /// Error message (e.g., "${`VENDOR_DIR`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdoffline.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(theme) = settings.theme {
            self.render.theme = theme;
        }
        if let Some(toc_mode) = settings.toc_mode {
            self.render.toc_mode = toc_mode;
        }
        if let Some(math) = settings.math {
            self.render.math = math;
        }
        if let Some(syntax_highlight) = settings.syntax_highlight {
            self.render.syntax_highlight = syntax_highlight;
        }
        if let Some(line_numbers) = settings.line_numbers {
            self.render.line_numbers = line_numbers;
        }
        if let Some(vendor_dir) = &settings.vendor_dir {
            self.vendor_resolved.dir.clone_from(vendor_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            render: RenderConfig::default(),
            vendor: VendorConfigRaw::default(),
            limits: LimitsConfig::default(),
            vendor_resolved: VendorConfig {
                dir: base.join("vendor"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_markdown_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits.max_markdown_bytes must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand and resolve the vendor directory against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let dir = match self.vendor.dir.as_deref() {
            Some(raw) => {
                if raw.trim().is_empty() {
                    return Err(ConfigError::Validation(
                        "vendor.dir cannot be empty".to_owned(),
                    ));
                }
                config_dir.join(expand::expand_path(raw, "vendor.dir")?)
            }
            None => config_dir.join("vendor"),
        };
        self.vendor_resolved = VendorConfig { dir };
        Ok(())
    }
}
