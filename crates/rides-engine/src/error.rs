//! Error type for the service layer.
//!
//! Authorization and transition errors surface to callers unchanged;
//! they are never retried here.

use rides_core::ride::RideStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("ride not found: {0}")]
  RideNotFound(Uuid),

  #[error("no active tracking session for ride {0}")]
  TrackingNotFound(Uuid),

  #[error("driver not found: {0}")]
  DriverNotFound(Uuid),

  #[error("vehicle not found: {0}")]
  VehicleNotFound(Uuid),

  #[error("notification not found: {0}")]
  NotificationNotFound(Uuid),

  #[error("user {user_id} is not authorized to act on ride {ride_id}")]
  Unauthorized { ride_id: Uuid, user_id: Uuid },

  #[error("cannot move ride to {to} from status {from}; status must be {required}")]
  InvalidTransition {
    from:     RideStatus,
    to:       RideStatus,
    required: &'static str,
  },

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("route computation failed: {0}")]
  RouteUnavailable(String),

  #[error(transparent)]
  Core(#[from] rides_core::Error),

  #[error("storage error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
  /// Wrap a backend error from any store implementation.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// A rejected transition, phrased so the caller learns both the
  /// current status and the status the command requires.
  pub fn invalid_transition(from: RideStatus, to: RideStatus) -> Self {
    let required = match to {
      RideStatus::DriverAssigned => "pending",
      RideStatus::DriverArriving => "driver_assigned",
      RideStatus::AtPickup => "driver_arriving",
      RideStatus::InProgress => "at_pickup",
      RideStatus::Completed => "in_progress",
      RideStatus::Cancelled => "any non-terminal status",
      RideStatus::Pending => "unreachable (rides start pending)",
    };
    Self::InvalidTransition { from, to, required }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
