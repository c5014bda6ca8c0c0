//! Ride entity and lifecycle status machine.
//!
//! The transition table is the single source of truth for which status
//! changes are legal. Role rules (who may request a transition) are
//! enforced by the service layer on top of it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::Error,
  geo::Coordinate,
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Passenger-facing lifecycle stage of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
  Pending,
  DriverAssigned,
  DriverArriving,
  AtPickup,
  InProgress,
  Completed,
  Cancelled,
}

impl RideStatus {
  pub const ALL: [RideStatus; 7] = [
    Self::Pending,
    Self::DriverAssigned,
    Self::DriverArriving,
    Self::AtPickup,
    Self::InProgress,
    Self::Completed,
    Self::Cancelled,
  ];

  /// The set of statuses this status may legally transition to.
  pub fn allowed_targets(self) -> &'static [RideStatus] {
    match self {
      Self::Pending => &[Self::DriverAssigned, Self::Cancelled],
      Self::DriverAssigned => &[Self::DriverArriving, Self::Cancelled],
      Self::DriverArriving => &[Self::AtPickup, Self::Cancelled],
      Self::AtPickup => &[Self::InProgress, Self::Cancelled],
      Self::InProgress => &[Self::Completed, Self::Cancelled],
      Self::Completed | Self::Cancelled => &[],
    }
  }

  pub fn can_transition_to(self, next: RideStatus) -> bool {
    self.allowed_targets().contains(&next)
  }

  /// Terminal statuses have no outgoing transitions.
  pub fn is_terminal(self) -> bool {
    self.allowed_targets().is_empty()
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::DriverAssigned => "driver_assigned",
      Self::DriverArriving => "driver_arriving",
      Self::AtPickup => "at_pickup",
      Self::InProgress => "in_progress",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for RideStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RideStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| Error::UnknownRideStatus(s.to_string()))
  }
}

/// Which party cancelled a ride, derived from the caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
  Passenger,
  Driver,
}

impl CancelledBy {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Passenger => "passenger",
      Self::Driver => "driver",
    }
  }
}

impl FromStr for CancelledBy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "passenger" => Ok(Self::Passenger),
      "driver" => Ok(Self::Driver),
      other => Err(Error::UnknownRideStatus(other.to_string())),
    }
  }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// One trip instance. Created `pending`; mutated exclusively through
/// validated transitions; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
  pub ride_id:             Uuid,
  pub passenger_id:        Uuid,
  /// Set on assignment; non-null for every status past `pending`.
  pub driver_id:           Option<Uuid>,
  pub vehicle_id:          Option<Uuid>,
  pub pickup:              Coordinate,
  pub dropoff:             Coordinate,
  pub status:              RideStatus,
  pub actual_distance_km:  Option<f64>,
  pub actual_duration_min: Option<i64>,
  pub cancelled_by:        Option<CancelledBy>,
  pub cancellation_reason: Option<String>,
  pub created_at:          DateTime<Utc>,
  pub started_at:          Option<DateTime<Utc>>,
  pub completed_at:        Option<DateTime<Utc>>,
}

impl Ride {
  /// Whether `user_id` is the passenger or the assigned driver.
  pub fn is_participant(&self, user_id: Uuid) -> bool {
    self.passenger_id == user_id || self.driver_id == Some(user_id)
  }
}

/// Input for seeding a new ride (the booking flow itself lives outside
/// this core).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRide {
  pub passenger_id: Uuid,
  pub pickup:       Coordinate,
  pub dropoff:      Coordinate,
}

/// Explicit partial-update request for a ride row. Only the populated
/// fields are written.
#[derive(Debug, Clone, Default)]
pub struct RideUpdateFields {
  pub status:              Option<RideStatus>,
  pub driver_id:           Option<Uuid>,
  pub vehicle_id:          Option<Uuid>,
  pub started_at:          Option<DateTime<Utc>>,
  pub completed_at:        Option<DateTime<Utc>>,
  pub actual_distance_km:  Option<f64>,
  pub actual_duration_min: Option<i64>,
  pub cancelled_by:        Option<CancelledBy>,
  pub cancellation_reason: Option<String>,
}

/// Optional driver-supplied figures accompanying ride completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionData {
  pub actual_distance_km:  Option<f64>,
  pub actual_duration_min: Option<i64>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
