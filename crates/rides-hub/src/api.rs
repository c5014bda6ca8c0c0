//! JSON REST handlers: ride-scoped tracking reads and the
//! notification inbox.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/rides/{id}/tracking` | Participants only |
//! | `GET`  | `/api/rides/{id}/route` | Destination-leg route data |
//! | `GET`  | `/api/rides/{id}/history` | `?limit=` (default 100) |
//! | `POST` | `/api/rides/{id}/eta/refresh` | Fresh provider route |
//! | `GET`  | `/api/notifications` | `?unread_only=&limit=` |
//! | `GET`  | `/api/notifications/unread-count` | |
//! | `POST` | `/api/notifications/{id}/read` | |
//! | `POST` | `/api/notifications/read-all` | |

use axum::{
  extract::{Path, Query, State},
  Json,
};
use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  notification::Notification,
  route::RouteProvider,
  store::RideStore,
  tracking::{LocationSample, TrackingSnapshot},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::Identity, error::Error, AppState};

async fn authorized_ride<S, D, R>(
  state: &AppState<S, D, R>,
  ride_id: Uuid,
  user_id: Uuid,
) -> Result<rides_core::ride::Ride, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let ride = state.lifecycle.ride(ride_id).await?;
  if !ride.is_participant(user_id) {
    return Err(Error::Engine(rides_engine::Error::Unauthorized {
      ride_id,
      user_id,
    }));
  }
  Ok(ride)
}

// ─── Tracking reads ──────────────────────────────────────────────────────────

/// `GET /api/rides/{id}/tracking`
pub async fn get_tracking<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(user_id): Identity,
  Path(ride_id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  authorized_ride(&state, ride_id, user_id).await?;
  Ok(Json(state.tracking.get_tracking(ride_id).await?))
}

/// Destination-leg route data held by the active session.
#[derive(Debug, Serialize)]
pub struct RouteInfo {
  pub polyline:           Option<String>,
  pub distance_km:        Option<f64>,
  pub duration_min:       Option<i64>,
  pub eta_to_pickup_min:  Option<i64>,
  pub eta_to_dropoff_min: Option<i64>,
}

/// `GET /api/rides/{id}/route`
pub async fn get_route<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(user_id): Identity,
  Path(ride_id): Path<Uuid>,
) -> Result<Json<RouteInfo>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  authorized_ride(&state, ride_id, user_id).await?;
  let tracking = state.tracking.get_tracking(ride_id).await?;
  Ok(Json(RouteInfo {
    polyline:           tracking.route_polyline,
    distance_km:        tracking.route_distance_km,
    duration_min:       tracking.route_duration_min,
    eta_to_pickup_min:  tracking.eta_to_pickup_min,
    eta_to_dropoff_min: tracking.eta_to_dropoff_min,
  }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<usize>,
}

/// `GET /api/rides/{id}/history?limit=`
pub async fn get_history<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(user_id): Identity,
  Path(ride_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<LocationSample>>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  authorized_ride(&state, ride_id, user_id).await?;
  let history = state
    .tracking
    .location_history(ride_id, params.limit.unwrap_or(100))
    .await?;
  Ok(Json(history))
}

/// `POST /api/rides/{id}/eta/refresh`
pub async fn refresh_eta<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(user_id): Identity,
  Path(ride_id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  authorized_ride(&state, ride_id, user_id).await?;
  Ok(Json(state.tracking.refresh_eta(ride_id).await?))
}

// ─── Notification inbox ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
  #[serde(default)]
  pub unread_only: bool,
  pub limit:       Option<usize>,
}

/// `GET /api/notifications?unread_only=&limit=`
pub async fn list_notifications<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(user_id): Identity,
  Query(params): Query<NotificationParams>,
) -> Result<Json<Vec<Notification>>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let notifications = state
    .notifications
    .list(user_id, params.unread_only, params.limit.unwrap_or(50))
    .await?;
  Ok(Json(notifications))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
  pub unread: u64,
}

/// `GET /api/notifications/unread-count`
pub async fn unread_count<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(user_id): Identity,
) -> Result<Json<UnreadCount>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let unread = state.notifications.unread_count(user_id).await?;
  Ok(Json(UnreadCount { unread }))
}

/// `POST /api/notifications/{id}/read`
pub async fn mark_read<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(_user_id): Identity,
  Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let notification = state.notifications.mark_read(notification_id).await?;
  Ok(Json(notification))
}

#[derive(Debug, Serialize)]
pub struct MarkedCount {
  pub marked: u64,
}

/// `POST /api/notifications/read-all`
pub async fn mark_all_read<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Identity(user_id): Identity,
) -> Result<Json<MarkedCount>, Error>
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let marked = state.notifications.mark_all_read(user_id).await?;
  Ok(Json(MarkedCount { marked }))
}
