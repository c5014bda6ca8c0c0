//! The wire vocabulary: commands clients send over the socket and
//! events the hub pushes back.
//!
//! Both directions are JSON objects tagged by a `type` field, e.g.
//! `{"type":"ride:join","ride_id":"..."}`.

use rides_core::{
  geo::ProximityStatus,
  notification::Notification,
  ride::{CompletionData, Ride, RideStatus},
  tracking::{LocationUpdate, TrackingSnapshot, TrackingStatus},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Client → hub ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
  /// Join a ride's broadcast group; replies with the current snapshot.
  #[serde(rename = "ride:join")]
  JoinRide { ride_id: Uuid },

  #[serde(rename = "ride:leave")]
  LeaveRide { ride_id: Uuid },

  /// High-frequency driver position report.
  #[serde(rename = "driver:location-update")]
  ReportLocation {
    ride_id: Uuid,
    #[serde(flatten)]
    location: LocationUpdate,
  },

  #[serde(rename = "driver:start-ride")]
  StartRide { ride_id: Uuid },

  #[serde(rename = "driver:complete-ride")]
  CompleteRide {
    ride_id: Uuid,
    #[serde(flatten)]
    completion: CompletionData,
  },

  #[serde(rename = "ride:cancel")]
  CancelRide {
    ride_id: Uuid,
    #[serde(default)]
    reason: Option<String>,
  },

  /// Generic status transition for clients that speak in targets.
  #[serde(rename = "ride:update-status")]
  UpdateStatus { ride_id: Uuid, status: RideStatus },

  /// One-off snapshot request outside the broadcast flow.
  #[serde(rename = "tracking:request")]
  RequestTracking { ride_id: Uuid },
}

// ─── Hub → client ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
  #[serde(rename = "connected")]
  Connected { user_id: Uuid },

  #[serde(rename = "ride:joined")]
  RideJoined { ride_id: Uuid },

  /// Direct snapshot reply (join and `tracking:request`).
  #[serde(rename = "tracking:data")]
  TrackingData { tracking: TrackingSnapshot },

  /// Broadcast on every accepted location report.
  #[serde(rename = "tracking:location-updated")]
  LocationUpdated {
    ride_id:   Uuid,
    tracking:  TrackingSnapshot,
    proximity: ProximityStatus,
  },

  /// Broadcast when an ingest flipped the tracking phase.
  #[serde(rename = "tracking:status-changed")]
  TrackingStatusChanged {
    ride_id:  Uuid,
    previous: TrackingStatus,
    current:  TrackingStatus,
  },

  #[serde(rename = "ride:status-changed")]
  RideStatusChanged { ride: Ride },

  #[serde(rename = "ride:started")]
  RideStarted { ride: Ride },

  #[serde(rename = "ride:completed")]
  RideCompleted { ride: Ride },

  #[serde(rename = "ride:cancelled")]
  RideCancelled { ride: Ride },

  /// Personal-channel push of a stored notification.
  #[serde(rename = "notification")]
  Notification { notification: Notification },

  /// Direct acknowledgment to the connection that issued a lifecycle
  /// command, distinct from the group broadcast.
  #[serde(rename = "ack")]
  Ack { command: &'static str, ride_id: Uuid },

  #[serde(rename = "error")]
  Error { message: String },
}
