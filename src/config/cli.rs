use crate::config::toml_config::TomlSettings;
use crate::config::{parse_catalog_urls, EngineConfig};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "automation-catalog")]
#[command(about = "Browse, resolve and export the automation catalog")]
pub struct Cli {
    /// TOML settings file; replaces the catalog/cache/sync flags below
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(flatten)]
    pub engine: EngineConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List every service with its lifecycle status
    Services,
    /// Show one service
    Service { name: String },
    /// Print the BOM ids a solution is built from
    Resolve { solution: String },
    /// Architecture ids for creating a solution
    Plan {
        solution: Option<String>,
        #[arg(long = "arch")]
        architectures: Vec<String>,
    },
    /// Write the automation bundle of a solution under the data directory
    Export {
        solution: String,
        /// Put manifests at the archive root
        #[arg(long)]
        flatten: bool,
        /// Directory prefix for every archive entry
        #[arg(long)]
        base_path: Option<String>,
    },
    /// Import public solutions and BOMs now
    Sync,
}

impl Cli {
    /// Effective engine configuration, honouring `--config` when given.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        match &self.config {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                let mut config = TomlSettings::from_file(path)?.into_engine_config();
                config.verbose = self.engine.verbose;
                Ok(config)
            }
            None => {
                let mut config = self.engine.clone();
                config.catalog_urls = config
                    .catalog_urls
                    .iter()
                    .flat_map(|raw| parse_catalog_urls(raw))
                    .collect();
                Ok(config)
            }
        }
    }
}
