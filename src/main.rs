//! Route inspection and configuration checks.
//!
//! ```text
//! api-dispatch routes [--api-root DIR] [--config FILE] [--json]
//! api-dispatch check  [--config FILE]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use api_dispatch::config::{load_config, load_default_config, AppConfig, ConfigError};
use api_dispatch::routing::{resolve_from_config, RouteTable};

#[derive(Parser)]
#[command(name = "api-dispatch")]
#[command(about = "Inspect convention-based API routes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved route table in match order
    Routes {
        /// Api root directory (overrides configuration and API_ROOT)
        #[arg(long)]
        api_root: Option<PathBuf>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Load and validate configuration
    Check {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load(path: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => load_default_config(),
    }
}

fn print_table(table: &RouteTable) {
    let width = table.iter().map(|r| r.pattern.len()).max().unwrap_or(0);
    for route in table.iter() {
        println!(
            "{:<width$}  {:<24}  {}",
            route.pattern,
            route.module_key,
            route.source_file.display(),
            width = width
        );
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Routes {
            api_root,
            config,
            json,
        } => {
            let mut config = load(config.as_ref())?;
            if let Some(root) = api_root {
                config.routing.api_root = root;
            }
            let table = resolve_from_config(&config.routing)?;
            if json {
                println!("{}", serde_json::to_string_pretty(table.routes())?);
            } else {
                print_table(&table);
            }
        }
        Commands::Check { config } => {
            let config = load(config.as_ref())?;
            println!(
                "Configuration OK (api root {}, listening on {})",
                config.routing.api_root.display(),
                config.listener.bind_address
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
