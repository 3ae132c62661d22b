//! CLI error types.

use fig_config::ConfigError;
use fig_export::ExportError;
use fig_render::RenderError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("{0}")]
    Validation(String),
}
