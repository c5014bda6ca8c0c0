//! Notification entity — discrete, point-in-time events directed at one
//! user, derived from continuous tracking state.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Window within which duplicate notifications of the same type for the
/// same (ride, recipient) pair are suppressed.
pub fn debounce_window() -> Duration {
  Duration::minutes(10)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
  DriverAssigned,
  ArrivingSoon,
  DriverNearby,
  DriverArrived,
  RideStarted,
  RideCompleted,
  RideCancelled,
  EtaUpdated,
}

impl NotificationType {
  pub const ALL: [NotificationType; 8] = [
    Self::DriverAssigned,
    Self::ArrivingSoon,
    Self::DriverNearby,
    Self::DriverArrived,
    Self::RideStarted,
    Self::RideCompleted,
    Self::RideCancelled,
    Self::EtaUpdated,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::DriverAssigned => "driver_assigned",
      Self::ArrivingSoon => "arriving_soon",
      Self::DriverNearby => "driver_nearby",
      Self::DriverArrived => "driver_arrived",
      Self::RideStarted => "ride_started",
      Self::RideCompleted => "ride_completed",
      Self::RideCancelled => "ride_cancelled",
      Self::EtaUpdated => "eta_updated",
    }
  }
}

impl fmt::Display for NotificationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for NotificationType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| Error::UnknownNotificationType(s.to_string()))
  }
}

/// A persisted notification. Mutated only to flip `is_read`; never
/// deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub ride_id:         Uuid,
  pub user_id:         Uuid,
  pub kind:            NotificationType,
  pub title:           String,
  pub message:         String,
  /// Structured payload (distance, ETA, who cancelled, ...).
  pub metadata:        serde_json::Value,
  pub is_read:         bool,
  pub created_at:      DateTime<Utc>,
  pub read_at:         Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
  pub ride_id:  Uuid,
  pub user_id:  Uuid,
  pub kind:     NotificationType,
  pub title:    String,
  pub message:  String,
  pub metadata: serde_json::Value,
}
