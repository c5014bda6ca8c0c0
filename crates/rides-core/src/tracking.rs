//! Tracking session and location-sample entities.
//!
//! A tracking session is the per-ride mutable record of where the
//! driver currently is; location samples are the append-only history
//! behind it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  geo::Coordinate,
};

/// Distance at which the driver counts as having arrived at the pickup
/// or the destination (50 metres).
pub const ARRIVAL_THRESHOLD_KM: f64 = 0.05;

// ─── Tracking status ─────────────────────────────────────────────────────────

/// Fine-grained phase of an active tracking session, independent from
/// (but correlated with) the ride status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
  Idle,
  EnRouteToPickup,
  AtPickup,
  EnRouteToDestination,
  Completed,
}

impl TrackingStatus {
  pub const ALL: [TrackingStatus; 5] = [
    Self::Idle,
    Self::EnRouteToPickup,
    Self::AtPickup,
    Self::EnRouteToDestination,
    Self::Completed,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Idle => "idle",
      Self::EnRouteToPickup => "en_route_to_pickup",
      Self::AtPickup => "at_pickup",
      Self::EnRouteToDestination => "en_route_to_destination",
      Self::Completed => "completed",
    }
  }
}

impl fmt::Display for TrackingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TrackingStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| Error::UnknownTrackingStatus(s.to_string()))
  }
}

// ─── Session snapshot ────────────────────────────────────────────────────────

/// The current state of a ride's tracking session. At most one active
/// snapshot exists per ride; re-dispatch deactivates the prior one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSnapshot {
  pub tracking_id:                Uuid,
  pub ride_id:                    Uuid,
  pub driver_position:            Coordinate,
  pub driver_heading:             f64,
  pub driver_speed:               f64,
  /// Copied from the ride at session start.
  pub pickup:                     Coordinate,
  pub dropoff:                    Coordinate,
  pub distance_to_pickup_km:      f64,
  pub distance_to_destination_km: f64,
  pub eta_to_pickup_min:          Option<i64>,
  pub eta_to_dropoff_min:         Option<i64>,
  /// Destination-leg route data; absent when the route provider was
  /// unavailable at session start.
  pub route_polyline:             Option<String>,
  pub route_distance_km:          Option<f64>,
  pub route_duration_min:         Option<i64>,
  pub tracking_status:            TrackingStatus,
  pub is_active:                  bool,
  pub last_updated:               DateTime<Utc>,
}

/// Input for creating a tracking session.
#[derive(Debug, Clone)]
pub struct NewTrackingSession {
  pub ride_id:                    Uuid,
  pub driver_position:            Coordinate,
  pub pickup:                     Coordinate,
  pub dropoff:                    Coordinate,
  pub distance_to_pickup_km:      f64,
  pub distance_to_destination_km: f64,
  pub eta_to_pickup_min:          Option<i64>,
  pub eta_to_dropoff_min:         Option<i64>,
  pub route_polyline:             Option<String>,
  pub route_distance_km:          Option<f64>,
  pub route_duration_min:         Option<i64>,
  pub tracking_status:            TrackingStatus,
}

/// Explicit partial-update request for the active session row.
#[derive(Debug, Clone, Default)]
pub struct TrackingUpdateFields {
  pub driver_position:            Option<Coordinate>,
  pub driver_heading:             Option<f64>,
  pub driver_speed:               Option<f64>,
  pub distance_to_pickup_km:      Option<f64>,
  pub distance_to_destination_km: Option<f64>,
  pub eta_to_pickup_min:          Option<i64>,
  pub eta_to_dropoff_min:         Option<i64>,
  pub tracking_status:            Option<TrackingStatus>,
}

// ─── Location ingest ─────────────────────────────────────────────────────────

/// One raw location report from the driver's device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationUpdate {
  pub lat:      f64,
  pub lng:      f64,
  #[serde(default)]
  pub heading:  Option<f64>,
  #[serde(default)]
  pub speed:    Option<f64>,
  #[serde(default)]
  pub accuracy: Option<f64>,
}

impl LocationUpdate {
  /// Validate and extract the reported position.
  pub fn position(&self) -> Result<Coordinate> {
    Coordinate::new(self.lat, self.lng)
  }
}

/// Immutable historical location record, appended on every ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSample {
  pub sample_id:       Uuid,
  pub ride_id:         Uuid,
  pub position:        Coordinate,
  pub speed:           f64,
  pub heading:         f64,
  pub accuracy:        Option<f64>,
  /// Tracking status at time of capture.
  pub tracking_status: TrackingStatus,
  pub recorded_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLocationSample {
  pub ride_id:         Uuid,
  pub position:        Coordinate,
  pub speed:           f64,
  pub heading:         f64,
  pub accuracy:        Option<f64>,
  pub tracking_status: TrackingStatus,
}
