//! modelspec CLI: inspect, validate and convert model descriptors.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// modelspec: read and write every generation of model descriptor documents
#[derive(Parser, Debug)]
#[command(name = "modelspec", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (for `.modelspec/config.toml`)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Summarize a descriptor file, model directory or zip archive
    Inspect {
        path: PathBuf,
    },
    /// Check that a descriptor decodes and re-encodes cleanly
    Validate {
        path: PathBuf,
    },
    /// Rewrite a descriptor as another format version
    Convert {
        path: PathBuf,
        /// Target format_version (defaults to the configured one)
        #[arg(short, long)]
        to: Option<String>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Output serialization: yaml or json
        #[arg(short, long)]
        format: Option<String>,
    },
    /// List the supported format versions
    Versions,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Write a default workspace configuration file
    Init,
    /// Print the effective configuration
    Show,
    /// Print the configuration file locations
    Path,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config = modelspec_core::config::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Set up tracing: human-readable stderr + optional JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let (json_layer, _guard) = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "modelspec.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    commands::handle_command(cli.command, &workspace, &config)
}
