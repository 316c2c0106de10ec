mod app_config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;
use settings_domain::SettingsCache;
use settings_infrastructure::{
    InMemorySettingsCache, RedisSettingsCache, SqliteSettingsRepository,
};
use settings_overlay::{OverlayBuilder, PersistentOverlay};
use tracing::warn;

use crate::app_config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = CliApp::parse();
    cli.run().await
}

/// CLI application entry point
#[derive(clap::Parser, Debug)]
#[command(name = "settings-cli")]
#[command(version = "0.1.0")]
#[command(about = "Persistent settings overlay - command line management tool")]
#[command(long_about = "Manages persisted configuration overrides and the cache entry they are served from")]
struct CliApp {
    #[command(subcommand)]
    command: Commands,

    /// Bootstrap configuration file path
    #[arg(short, long, default_value = "config/settings.toml")]
    config: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cache maintenance
    Cache(CacheCommands),
    /// Read one effective setting
    Get {
        /// Dotted setting key
        key: String,
    },
    /// Persist an override (value parsed as JSON, else taken as a string)
    Set {
        /// Dotted setting key, must be a registered item
        key: String,
        /// New value
        value: String,
    },
    /// Show the whole merged configuration
    Show,
    /// Bootstrap configuration helpers
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
struct CacheCommands {
    #[command(subcommand)]
    action: CacheActions,
}

#[derive(Subcommand, Debug)]
enum CacheActions {
    /// Delete the cache entry and rebuild it from storage
    Rebuild,
}

#[derive(Args, Debug)]
struct ConfigCommands {
    #[command(subcommand)]
    action: ConfigActions,
}

#[derive(Subcommand, Debug)]
enum ConfigActions {
    /// Validate the bootstrap configuration file
    Validate,
    /// Print an example bootstrap configuration
    Example,
}

impl CliApp {
    fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    async fn run(self) -> Result<()> {
        match self.command {
            Commands::Config(config_cmd) => handle_config_commands(config_cmd, &self.config),
            command => {
                let app_config = AppConfig::load(Some(&self.config))
                    .context("Failed to load bootstrap configuration")?;
                let overlay = build_overlay(&app_config).await?;

                match command {
                    Commands::Cache(cache_cmd) => handle_cache_commands(cache_cmd, &overlay).await,
                    Commands::Get { key } => handle_get(&key, &overlay).await,
                    Commands::Set { key, value } => handle_set(&key, value, &overlay).await,
                    Commands::Show => handle_show(&overlay).await,
                    Commands::Config(_) => unreachable!("handled above"),
                }
            }
        }
    }
}

/// Compose the overlay from explicit parts: sqlite storage, redis cache when
/// configured, item registry and cache policy from the bootstrap file.
async fn build_overlay(config: &AppConfig) -> Result<PersistentOverlay> {
    let repository = SqliteSettingsRepository::new_embedded(&config.storage.database_path)
        .await
        .context("Failed to open settings storage")?;

    let cache: Arc<dyn SettingsCache> = match &config.cache.redis_url {
        Some(url) => Arc::new(
            RedisSettingsCache::new(url)
                .await
                .context("Failed to connect to the cache backend")?,
        ),
        None => {
            warn!("No cache.redis_url configured; using an in-process cache");
            Arc::new(InMemorySettingsCache::new())
        }
    };

    let overlay = OverlayBuilder::new()
        .with_base(config.base_settings()?)
        .with_registry(config.registry()?)
        .with_repository(Arc::new(repository))
        .with_cache(cache)
        .with_cache_policy(config.cache_policy()?)
        .build()?;

    Ok(overlay)
}

async fn handle_cache_commands(cache_cmd: CacheCommands, overlay: &PersistentOverlay) -> Result<()> {
    match cache_cmd.action {
        CacheActions::Rebuild => {
            let applied = overlay
                .rebuild_cache()
                .await
                .context("Failed to rebuild the persistent settings cache")?;
            println!("Persistent settings cache rebuilt ({applied} overrides cached)");
            Ok(())
        }
    }
}

async fn handle_get(key: &str, overlay: &PersistentOverlay) -> Result<()> {
    match overlay.get(key).await {
        Some(value) => println!("{value}"),
        None => println!("(not set)"),
    }
    Ok(())
}

async fn handle_set(key: &str, value: String, overlay: &PersistentOverlay) -> Result<()> {
    let parsed = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
    overlay
        .set(key, parsed)
        .await
        .context("Failed to persist setting")?;
    println!("Setting persisted: {key}");
    Ok(())
}

async fn handle_show(overlay: &PersistentOverlay) -> Result<()> {
    let merged = overlay.all().await;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

fn handle_config_commands(config_cmd: ConfigCommands, config_path: &str) -> Result<()> {
    match config_cmd.action {
        ConfigActions::Validate => match AppConfig::load(Some(config_path)) {
            Ok(_) => {
                println!("Configuration file is valid: {config_path}");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Configuration file is invalid: {e}")),
        },
        ConfigActions::Example => {
            println!("{}", generate_example_config());
            Ok(())
        }
    }
}

fn generate_example_config() -> &'static str {
    r#"
# Persistent settings overlay - bootstrap configuration example
defaults_file = "config/defaults.toml"

[storage]
database_path = "sqlite://settings.db"

[cache]
# Omit redis_url to use an in-process cache
redis_url = "redis://127.0.0.1:6379"
key = "settings:overlay:v1"
# Omit ttl_seconds for a never-expiring entry
ttl_seconds = 300

[[items]]
key = "mail.contact.address"
label = "Contact e-mail address"
rules = [{ type = "required" }, { type = "email" }]

[[items]]
key = "app.log_level"
label = "Log level"
rules = [{ type = "one_of", values = ["error", "warn", "info", "debug"] }]
"#
}
