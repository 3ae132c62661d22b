//! `fig render` command implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use fig_config::{CliSettings, Config};
use fig_render::{RenderOptions, Renderer};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Diagram source file to render.
    input: PathBuf,

    /// Diagram type (e.g. plantuml, mermaid, graphviz).
    #[arg(short = 't', long = "type")]
    diagram_type: String,

    /// Output format (svg or png).
    #[arg(short, long, default_value = "svg")]
    format: String,

    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover fig.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rendering service URL (overrides config).
    #[arg(long, env = "FIG_SERVER")]
    server: Option<String>,

    /// Bypass the render cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output (show request and cache logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, the render request or writing
    /// the result fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            server_url: self.server,
            cache_enabled: self.no_cache.then_some(false),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if !matches!(self.format.as_str(), "svg" | "png") {
            return Err(CliError::Validation(format!(
                "unsupported format '{}': expected svg or png",
                self.format
            )));
        }

        let renderer = Renderer::new(config.server.url.clone())
            .with_types(config.diagram_types())
            .timeout(config.request.timeout())
            .retries(config.request.retry_count, config.request.retry_delay())
            .headers(config.custom_headers()?)
            .cache_limits(config.cache.max_entries, config.cache.max_age());

        let source = std::fs::read_to_string(&self.input)?;
        let options = RenderOptions {
            format: self.format,
            no_cache: !config.cache.enabled,
            scope: None,
        };
        tracing::info!(
            server = %config.server.url,
            diagram_type = %self.diagram_type,
            format = %options.format,
            "rendering {}",
            self.input.display()
        );

        let content = renderer.render_by_type(&source, &self.diagram_type, &options)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, content)?;
                output.success(&format!("Rendered to {}", path.display()));
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                stdout.write_all(b"\n")?;
            }
        }

        Ok(())
    }
}
