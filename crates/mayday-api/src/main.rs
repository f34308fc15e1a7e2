//! mayday server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, wires the OneSignal client into the alert engine, and
//! serves the JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use mayday_api::{AppState, ServerConfig};
use mayday_core::{engine::AlertEngine, matcher::ProximityMatcher};
use mayday_push::{OneSignalClient, OneSignalConfig};
use mayday_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Mayday SOS alert server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MAYDAY"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // Wire the push provider into the engine. A missing key is not fatal —
  // dispatches then record error outcomes instead of reaching the network.
  if server_cfg.onesignal_api_key.is_none() {
    tracing::warn!("OneSignal API key not configured; dispatches will record error outcomes");
  }
  let notifier = Arc::new(OneSignalClient::new(OneSignalConfig {
    app_id:  server_cfg.onesignal_app_id.clone(),
    api_key: server_cfg.onesignal_api_key.clone(),
    api_url: server_cfg.onesignal_api_url.clone(),
  }));

  let engine = Arc::new(AlertEngine::new(
    store.clone(),
    notifier,
    ProximityMatcher::new(server_cfg.stale_after()),
  ));

  let app = mayday_api::router(AppState { store, engine });
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
