//! CLI error types.

use mdoffline_assets::AssetError;
use mdoffline_config::ConfigError;
use mdoffline_renderer::TransformError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Asset(#[from] AssetError),

    #[error("{0}")]
    Transform(#[from] TransformError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
