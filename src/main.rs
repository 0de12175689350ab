use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use discord_ghost::bungie::{BungieApi, BungieClient};
use discord_ghost::presence::{DiscordPresence, PresenceProvider};
use discord_ghost::{AppConfig, ManifestCache, PresencePoller, SnapshotProvider};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config_path = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => path,
        None => match AppConfig::default_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        },
    };

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };

    let manifest_dir = match config.manifest_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let api: Arc<dyn BungieApi> = Arc::new(BungieClient::new(config.api_key.clone()));
    let cache = Arc::new(ManifestCache::new(
        Arc::clone(&api),
        manifest_dir,
        config.locale.clone(),
    ));

    // A refresh failure is not fatal: lookups keep working against any
    // previously cached copy, and cycles without one are skipped.
    if let Err(e) = cache.ensure_fresh().await {
        tracing::warn!("world content refresh failed, using any cached copy: {}", e);
    }

    let mut providers: Vec<Box<dyn PresenceProvider>> = Vec::new();
    match DiscordPresence::connect(config.discord_app_id).await {
        Ok(discord) => providers.push(Box::new(discord)),
        Err(e) => {
            tracing::error!("failed to connect to Discord: {}", e);
            std::process::exit(1);
        }
    }

    let snapshots = SnapshotProvider::new(api, config.accounts.clone());
    let poller = Arc::new(PresencePoller::new(
        snapshots,
        cache,
        providers,
        Duration::from_millis(config.poll_interval_ms),
    ));

    poller.start();
    tracing::info!(
        "polling every {}ms; press Ctrl-C to exit",
        config.poll_interval_ms
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    poller.stop();
}
