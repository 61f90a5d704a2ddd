//! # pasp CLI
//!
//! Translates `.pasp` templates into server scripts.

use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pasp_build::output::write_atomic;
use pasp_build::BuildError;
use pasp_config::logging::{init_logging, LogLevel};
use pasp_config::{log_cli_debug, Config};
use pasp_scan::StreamWriter;

mod build;

/// pasp - cached template preprocessor
#[derive(Parser)]
#[command(name = "pasp")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (overridden by PASP_LOG or RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate sources whose scripts are missing or stale
    Build(build::BuildArgs),

    /// Translate one file unconditionally
    Translate {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file locations
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    let level = cli
        .log_level
        .or_else(|| config.logging.level.parse().ok())
        .unwrap_or(LogLevel::Warn);
    init_logging(level);

    match cli.command {
        Commands::Build(args) => build::run(args, &config),
        Commands::Translate { input, output } => {
            cmd_translate(&input, output.as_deref(), &config)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                print!("{}", config.to_toml());
                Ok(())
            }
            ConfigCommands::Path => {
                match Config::global_config_path() {
                    Some(path) => println!("Global:  {}", path.display()),
                    None => println!("Global:  (no home directory)"),
                }
                println!("Project: {}", Config::PROJECT_CONFIG);
                Ok(())
            }
        },
    }
}

fn cmd_translate(input: &Path, output: Option<&Path>, config: &Config) -> Result<()> {
    let source =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let summary = match output {
        // Readers of `path` see the old file or the complete new one.
        Some(path) => {
            let mut summary = None;
            write_atomic(path, config.build.sync_output, |sink| {
                let done = pasp_scan::translate(&source, sink).map_err(|e| BuildError::Scan {
                    path: input.to_path_buf(),
                    source: e,
                })?;
                summary = Some(done);
                Ok(())
            })?;
            summary.unwrap_or_default()
        }
        None => {
            let stdout = io::stdout();
            let mut sink = StreamWriter::new(BufWriter::new(stdout.lock()));
            let summary = pasp_scan::translate(&source, &mut sink)
                .with_context(|| format!("Failed to translate {}", input.display()))?;
            sink.flush()?;
            summary
        }
    };

    log_cli_debug!(
        "Translated",
        language = summary.profile.name(),
        directives = summary.directives,
        rewrites = summary.rewrites,
    );
    Ok(())
}
