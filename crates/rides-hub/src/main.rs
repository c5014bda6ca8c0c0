//! rides-hub server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! SQLite store, and serves the WebSocket hub plus the REST API.
//!
//! # Token generation
//!
//! Clients authenticate with signed bearer tokens. To mint one for a
//! user id:
//!
//! ```text
//! rides-hub --issue-token <user-uuid>
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use rides_engine::{
  NotificationEngine, RideLifecycle, RideLocks, TrackingConfig,
  TrackingService,
};
use rides_hub::{
  auth::TokenKey, channel::RideChannels, providers::EstimatedRouteProvider,
  AppState, ServerConfig,
};
use rides_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Campus rides realtime hub")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a signed connection token for this user id and exit.
  #[arg(long, value_name = "USER_ID")]
  issue_token: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("RIDES"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let auth = TokenKey::new(server_cfg.auth_secret.clone());

  // Helper mode: mint a token and exit.
  if let Some(user_id) = cli.issue_token {
    println!("{}", auth.issue(user_id));
    return Ok(());
  }

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;

  let locks = RideLocks::new();
  let notifications = NotificationEngine::new(store.clone());
  let lifecycle = RideLifecycle::new(
    store.clone(),
    store.clone(),
    notifications.clone(),
    locks.clone(),
  );
  let tracking = TrackingService::new(
    store.clone(),
    EstimatedRouteProvider,
    notifications.clone(),
    locks,
    TrackingConfig::default(),
  );

  let state = AppState {
    lifecycle,
    tracking,
    notifications,
    channels: RideChannels::new(),
    auth: Arc::new(auth),
  };

  let app = rides_hub::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
