//! MemsFCR CLI - fault code reader for Rover MEMS 1.6 ECUs
//!
//! Reads live data and diagnostics from an ECU on a serial port, or from a
//! recorded CSV scenario.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memsfcr_core::config::ReaderConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "memsfcr")]
#[command(author, version, about = "Rover MEMS 1.6 fault code reader")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MEMSFCR_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,

    /// Read live data and diagnostics as JSON lines
    Read {
        /// Serial port (defaults to the configured port)
        port: Option<String>,

        /// Number of readings, 0 to read until interrupted
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,

        /// Delay between readings in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,
    },

    /// Play back a recorded CSV scenario as if it were a live ECU
    Replay {
        /// CSV file with 0x80_raw and 0x7d_raw columns
        file: PathBuf,

        /// Number of readings, 0 for one pass over the recording
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,

        /// Delay between readings in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,
    },

    /// Send a raw command and print the response
    Command {
        /// Serial port
        port: String,

        /// Command byte(s) as hex, e.g. `cc` to clear faults
        hex: String,
    },

    /// Show the effective configuration
    Config {
        /// Write the configuration file with the effective values
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("memsfcr_core=debug,memsfcr=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ReaderConfig::default_path().context("Failed to locate config directory")?,
    };
    let config = ReaderConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    match cli.command {
        Commands::Ports => commands::ports()?,

        Commands::Read {
            port,
            count,
            interval_ms,
        } => {
            let port = port.unwrap_or_else(|| config.connection.port_name.clone());
            commands::read(&config, &port, count, interval_ms).await?;
        }

        Commands::Replay {
            file,
            count,
            interval_ms,
        } => {
            commands::replay(&config, &file, count, interval_ms).await?;
        }

        Commands::Command { port, hex } => {
            commands::command(&config, &port, &hex).await?;
        }

        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config
                    .save(&config_path)
                    .with_context(|| format!("Failed to save {}", config_path.display()))?;
                eprintln!("Saved {}", config_path.display());
            }
        }
    }

    Ok(())
}
