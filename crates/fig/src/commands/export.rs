//! `fig export` command implementation.

use std::path::PathBuf;

use clap::Args;

use fig_config::Config;
use fig_export::{ConvertJob, Converter};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Input document to convert.
    input: PathBuf,

    /// Output file.
    #[arg(short, long)]
    output: PathBuf,

    /// Target format (e.g. html, pdf, docx).
    #[arg(short = 't', long, default_value = "html")]
    format: String,

    /// Produce a standalone document with embedded resources.
    #[arg(long)]
    standalone: bool,

    /// Custom stylesheet.
    #[arg(long)]
    css: Option<PathBuf>,

    /// Metadata entries as key=value.
    #[arg(short = 'M', long = "metadata")]
    metadata: Vec<String>,

    /// Path to configuration file (default: auto-discover fig.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ExportArgs {
    /// Execute the export command.
    ///
    /// # Errors
    ///
    /// Returns an error if the converter is unavailable or the
    /// conversion fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        let converter = Converter::new(config.export.program.clone());
        let version = converter.version()?;
        output.info(&format!("Using {version}"));
        tracing::info!(
            format = %self.format,
            "exporting {} to {}",
            self.input.display(),
            self.output.display()
        );

        let job = ConvertJob {
            input: self.input,
            output: self.output.clone(),
            format: self.format,
            standalone: self.standalone,
            metadata: parse_metadata(&self.metadata)?,
            stylesheet: self.css,
            extra_args: config.export.args.clone(),
        };
        converter.convert(&job)?;

        output.success(&format!("Exported to {}", self.output.display()));
        Ok(())
    }
}

/// Parse `key=value` metadata arguments.
fn parse_metadata(entries: &[String]) -> Result<Vec<(String, String)>, CliError> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .ok_or_else(|| {
                    CliError::Validation(format!(
                        "metadata entry '{entry}' must have the form key=value"
                    ))
                })
        })
        .collect()
}
