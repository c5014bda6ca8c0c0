//! Error types for `rides-core`.
//!
//! Only input-shape errors live here. The operation-level taxonomy
//! (not-found, unauthorized, invalid transition, ...) belongs to the
//! service layer in `rides-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("coordinates out of range: lat {lat}, lng {lng}")]
  InvalidCoordinate { lat: f64, lng: f64 },

  #[error("unknown ride status: {0:?}")]
  UnknownRideStatus(String),

  #[error("unknown tracking status: {0:?}")]
  UnknownTrackingStatus(String),

  #[error("unknown notification type: {0:?}")]
  UnknownNotificationType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
