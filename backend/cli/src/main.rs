mod check_cmd;
mod neighbors_cmd;
mod output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use regionhop_config::{config_dir, config_file_path, load_and_prepare, LoggingConfig};

#[derive(Parser)]
#[command(name = "regionhop")]
#[command(about = "regionhop: live agent handoff for partitioned grids")]
#[command(version)]
struct Cli {
    /// Log level when RUST_LOG is not set; overrides `logging.level`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print the report
    CheckConfig {
        /// Config file (defaults to ~/.regionhop/regionhop.yaml)
        path: Option<PathBuf>,
    },
    /// List the neighbors of a region in the configured static grid
    Neighbors {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Region name (case-insensitive)
        #[arg(short, long)]
        region: String,
        /// Radius in meters; defaults to the configured draw distance
        #[arg(long)]
        radius: Option<u32>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn resolve_config(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| config_file_path(&config_dir()))
}

/// Log directory and level: the flag wins over the config's `logging` section.
fn log_target(flag: Option<&str>, logging: Option<&LoggingConfig>) -> (Option<PathBuf>, String) {
    let dir = logging.and_then(|l| l.dir.as_ref()).map(PathBuf::from);
    let level = flag
        .map(str::to_string)
        .or_else(|| logging.and_then(|l| l.level.clone()))
        .unwrap_or_else(|| "warn".to_string());
    (dir, level)
}

/// The logger is not up yet, so a config that fails to load here is only
/// reported by the command itself.
async fn init_logging(config_path: &Path, flag: Option<&str>) {
    let logging = load_and_prepare(config_path)
        .await
        .ok()
        .and_then(|(config, _)| config.logging);
    let (dir, level) = log_target(flag, logging.as_ref());
    regionhop_logging::init_logger(dir.as_deref(), &level);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = match &cli.command {
        Commands::CheckConfig { path } => resolve_config(path.clone()),
        Commands::Neighbors { config, .. } => resolve_config(config.clone()),
    };
    init_logging(&config_path, cli.log_level.as_deref()).await;

    match cli.command {
        Commands::CheckConfig { .. } => {
            let ok = check_cmd::run(&config_path).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Neighbors {
            region,
            radius,
            json,
            ..
        } => {
            neighbors_cmd::run(&config_path, &region, radius, json).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_configured_level_but_keeps_dir() {
        let logging = LoggingConfig {
            level: Some("info".to_string()),
            dir: Some("/var/log/regionhop".to_string()),
        };
        let (dir, level) = log_target(Some("debug"), Some(&logging));
        assert_eq!(dir, Some(PathBuf::from("/var/log/regionhop")));
        assert_eq!(level, "debug");

        let (_, level) = log_target(None, Some(&logging));
        assert_eq!(level, "info");
    }

    #[test]
    fn no_logging_section_means_console_only() {
        let (dir, level) = log_target(None, None);
        assert!(dir.is_none());
        assert_eq!(level, "warn");
    }
}
