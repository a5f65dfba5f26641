//! Administrative CLI for the chaincache protocol state cache.

use anyhow::{Context, Result};
use chaincache_core::KeyPath;
use chaincache_core::config::AppConfig;
use chaincache_store::repos::{ArrayRepo, MaintenanceRepo, ScalarRepo};
use chaincache_store::{CacheStore, EntryFilter};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chaincachectl")]
#[command(about = "Inspect and maintain a chaincache protocol state cache")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "CHAINCACHE_CONFIG",
        default_value = "config/chaincache.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Entry counts per protocol and base key
    Summary {
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List cached entries
    List {
        /// Only entries for this protocol
        #[arg(long)]
        protocol: Option<String>,
        /// Only entries for this base key
        #[arg(long)]
        base_key: Option<String>,
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the scalar cached at a key path
    Get {
        protocol: String,
        /// Key path segments, base key first
        #[arg(required = true, num_args = 1..)]
        key: Vec<String>,
    },
    /// Print the length of the array cached at a key path
    Length {
        protocol: String,
        #[arg(required = true, num_args = 1..)]
        key: Vec<String>,
    },
    /// Print array elements in [start, end)
    ReadArray {
        protocol: String,
        #[arg(required = true, num_args = 1..)]
        key: Vec<String>,
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long)]
        end: Option<u64>,
    },
    /// Clear cached entries for a protocol, or one base key within it
    Clear {
        #[arg(long)]
        protocol: String,
        #[arg(long)]
        base_key: Option<String>,
    },
    /// Delete the whole store
    Destroy {
        /// Confirm destruction
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Check that the store can be opened and queried
    Health,
}

/// Load configuration from an optional TOML file overlaid with `CHAINCACHE_` env vars.
fn load_config(config_path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::debug!(config_path = %config_path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", config_path.display());
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("CHAINCACHE_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(Path::new(&cli.config))?;
    let store = chaincache_store::from_config(&config.cache)
        .await
        .context("failed to open cache store")?;

    run(cli.command, store).await
}

async fn run(command: Commands, store: Arc<dyn CacheStore>) -> Result<()> {
    match command {
        Commands::Summary { json } => {
            let summary = store.summarize().await.context("failed to summarize")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if summary.is_empty() {
                println!("No cached entries.");
            } else {
                println!("{:<24} {:<48} {:>10}", "PROTOCOL", "BASE KEY", "ENTRIES");
                for row in summary {
                    println!(
                        "{:<24} {:<48} {:>10}",
                        row.protocol, row.base_key, row.entry_count
                    );
                }
            }
        }
        Commands::List {
            protocol,
            base_key,
            json,
        } => {
            let filter = EntryFilter { protocol, base_key };
            let rows = store
                .list_entries(&filter)
                .await
                .context("failed to list entries")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No cached entries.");
            } else {
                for row in rows {
                    let slot = if row.is_array_item {
                        format!("[{}]", row.index)
                    } else {
                        "scalar".to_string()
                    };
                    println!(
                        "{} {} {} {} = {}",
                        row.protocol,
                        row.base_key,
                        serde_json::to_string(&row.path)?,
                        slot,
                        serde_json::to_string(&row.value)?
                    );
                }
            }
        }
        Commands::Get { protocol, key } => {
            match store.get_scalar(&protocol, &KeyPath::from(key)).await? {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => anyhow::bail!("no scalar cached at that key path"),
            }
        }
        Commands::Length { protocol, key } => {
            let len = store.array_length(&protocol, &KeyPath::from(key)).await?;
            println!("{len}");
        }
        Commands::ReadArray {
            protocol,
            key,
            start,
            end,
        } => {
            let items = store
                .array_range(&protocol, &KeyPath::from(key), start, end)
                .await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Commands::Clear { protocol, base_key } => {
            let removed = match base_key {
                Some(base_key) => store.clear_base_key(&protocol, &base_key).await?,
                None => store.clear_protocol(&protocol).await?,
            };
            println!("Removed {removed} entries.");
        }
        Commands::Destroy { yes } => {
            if !yes {
                anyhow::bail!("refusing to destroy the store without --yes");
            }
            store.destroy().await.context("failed to destroy store")?;
            println!("Store destroyed.");
        }
        Commands::Health => {
            store.health_check().await.context("health check failed")?;
            println!("OK");
        }
    }
    Ok(())
}
