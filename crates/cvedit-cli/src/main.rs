//! cvedit CLI
//!
//! Command-line interface for cvedit - in-place résumé editing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cvedit_core::Config;

mod commands;
mod output;
mod render;
mod tui;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "cvedit")]
#[command(about = "cvedit - Edit your résumé in place, never press save")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the terminal editor
    Tui,
    /// Print the saved résumé (or the default one)
    Show,
    /// Write the résumé as plain text
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Delete the saved résumé and go back to the default
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, autosave_delay_ms, history_depth, storage_key, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the config file is broken
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Tui) | None => tui::run(config).await,
        Some(Commands::Show) => {
            init_cli_logging();
            commands::show::show(&config, &output)
        }
        Some(Commands::Export { path }) => {
            init_cli_logging();
            commands::export::export(&config, &path, &output)
        }
        Some(Commands::Reset { yes }) => {
            init_cli_logging();
            commands::reset::reset(&config, yes, &output)
        }
        Some(Commands::Config { .. }) => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging for one-shot commands
///
/// Only initializes if CVEDIT_LOG is set; logs go to stderr.
fn init_cli_logging() {
    let Ok(log_level) = std::env::var("CVEDIT_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "cvedit_core={},cvedit_cli={}",
        log_level, log_level
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
