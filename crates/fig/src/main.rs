//! fig CLI - Remote diagram rendering.
//!
//! Provides commands for:
//! - `render`: Render a single diagram source to SVG or PNG
//! - `types`: List recognized diagram types and their tags
//! - `export`: Convert a document with the configured external tool

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ExportArgs, RenderArgs, TypesArgs};
use output::Output;

/// fig - Remote diagram rendering.
#[derive(Parser)]
#[command(name = "fig", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a diagram source file via the remote service.
    Render(RenderArgs),
    /// List recognized diagram types.
    Types(TypesArgs),
    /// Convert a document with the configured external tool.
    Export(ExportArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let verbose = matches!(&cli.command, Commands::Render(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Types(args) => args.execute(),
        Commands::Export(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
