//! `fig types` command implementation.

use std::path::PathBuf;

use clap::Args;

use fig_config::Config;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the types command.
#[derive(Args)]
pub(crate) struct TypesArgs {
    /// Path to configuration file (default: auto-discover fig.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Include disabled types in the listing.
    #[arg(long)]
    all: bool,
}

impl TypesArgs {
    /// Execute the types command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails to load.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        let mut table = config.diagram_types();
        table.sort_by(|a, b| a.id.cmp(&b.id));

        for t in &table {
            if !t.enabled && !self.all {
                continue;
            }
            let mut line = format!("{:<12} {}", t.id, t.name);
            if !t.aliases.is_empty() {
                line.push_str(&format!("  (aliases: {})", t.aliases.join(", ")));
            }
            if t.enabled {
                output.info(&line);
            } else {
                line.push_str("  [disabled]");
                output.highlight(&line);
            }
        }

        Ok(())
    }
}
