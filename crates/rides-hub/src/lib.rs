//! Real-time gateway for the campus-rides core.
//!
//! Exposes an axum [`Router`] with a WebSocket endpoint for live
//! tracking plus a small JSON REST surface for reads and notification
//! flags, backed by any [`rides_core::store::RideStore`].

pub mod api;
pub mod auth;
pub mod channel;
pub mod error;
pub mod events;
pub mod providers;
pub mod session;
pub mod ws;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  routing::{get, post},
  Router,
};
use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  route::RouteProvider,
  store::RideStore,
};
use rides_engine::{NotificationEngine, RideLifecycle, TrackingService};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::TokenKey;
use channel::RideChannels;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` (or
/// `RIDES_`-prefixed environment variables).
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  /// Secret used to sign connection tokens.
  pub auth_secret: String,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers and sessions.
#[derive(Clone)]
pub struct AppState<S, D, R> {
  pub lifecycle:     RideLifecycle<S, D>,
  pub tracking:      TrackingService<S, R>,
  pub notifications: NotificationEngine<S>,
  pub channels:      RideChannels,
  pub auth:          Arc<TokenKey>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the hub.
pub fn router<S, D, R>(state: AppState<S, D, R>) -> Router
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/ws", get(ws::handler::<S, D, R>))
    .route(
      "/api/rides/{id}/tracking",
      get(api::get_tracking::<S, D, R>),
    )
    .route("/api/rides/{id}/route", get(api::get_route::<S, D, R>))
    .route("/api/rides/{id}/history", get(api::get_history::<S, D, R>))
    .route(
      "/api/rides/{id}/eta/refresh",
      post(api::refresh_eta::<S, D, R>),
    )
    .route("/api/notifications", get(api::list_notifications::<S, D, R>))
    .route(
      "/api/notifications/unread-count",
      get(api::unread_count::<S, D, R>),
    )
    .route(
      "/api/notifications/{id}/read",
      post(api::mark_read::<S, D, R>),
    )
    .route(
      "/api/notifications/read-all",
      post(api::mark_all_read::<S, D, R>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
