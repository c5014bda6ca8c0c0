//! User and vehicle lookup collaborators, consumed by driver
//! assignment.
//!
//! Profile and vehicle CRUD live outside this core; these traits expose
//! exactly the checks the state machine needs.

use std::future::Future;

use uuid::Uuid;

/// Lookup of driver eligibility and driver statistics.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// `None` when the user does not exist or is not registered as a
  /// driver; `Some(active)` otherwise. The split lets callers
  /// distinguish a missing driver from an inactive one.
  fn driver_active(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send + '_;

  /// Bump the driver's completed-ride counter by one.
  fn increment_completed_rides(
    &self,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Lookup of vehicle eligibility.
pub trait VehicleRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// `None` when the vehicle does not exist or is not owned by
  /// `user_id`; `Some(active)` otherwise.
  fn vehicle_active_owned_by(
    &self,
    vehicle_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send + '_;
}
