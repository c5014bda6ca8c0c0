//! The ride lifecycle state machine.
//!
//! Wraps the pure transition table from `rides_core::ride` with role
//! enforcement, timestamps, tracking side effects, and lifecycle
//! notifications. Every command runs its read-validate-write section
//! under the ride's lock.

use chrono::Utc;
use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  ride::{CancelledBy, CompletionData, Ride, RideStatus, RideUpdateFields},
  store::RideStore,
  tracking::{TrackingStatus, TrackingUpdateFields},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  locks::RideLocks,
  notify::NotificationEngine,
};

#[derive(Clone)]
pub struct RideLifecycle<S, D> {
  store:     S,
  directory: D,
  notifier:  NotificationEngine<S>,
  locks:     RideLocks,
}

impl<S, D> RideLifecycle<S, D>
where
  S: RideStore + Clone,
  D: UserDirectory + VehicleRegistry,
{
  pub fn new(
    store: S,
    directory: D,
    notifier: NotificationEngine<S>,
    locks: RideLocks,
  ) -> Self {
    Self { store, directory, notifier, locks }
  }

  /// Fetch a ride or fail with `RideNotFound`.
  pub async fn ride(&self, ride_id: Uuid) -> Result<Ride> {
    self
      .store
      .get_ride(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RideNotFound(ride_id))
  }

  // ── Commands ──────────────────────────────────────────────────────────

  /// Assign a driver and vehicle to a pending ride. Both ids are set
  /// together with the status change; a ride past `pending` always has
  /// them populated.
  pub async fn assign_driver(
    &self,
    ride_id: Uuid,
    driver_id: Uuid,
    vehicle_id: Uuid,
  ) -> Result<Ride> {
    let _guard = self.locks.acquire(ride_id).await;

    let ride = self.ride(ride_id).await?;
    check_transition(&ride, RideStatus::DriverAssigned)?;

    match self
      .directory
      .driver_active(driver_id)
      .await
      .map_err(Error::store)?
    {
      None => return Err(Error::DriverNotFound(driver_id)),
      Some(false) => {
        return Err(Error::Validation(format!(
          "driver {driver_id} is not active"
        )));
      }
      Some(true) => {}
    }

    match self
      .directory
      .vehicle_active_owned_by(vehicle_id, driver_id)
      .await
      .map_err(Error::store)?
    {
      None => return Err(Error::VehicleNotFound(vehicle_id)),
      Some(false) => {
        return Err(Error::Validation(format!(
          "vehicle {vehicle_id} is not active"
        )));
      }
      Some(true) => {}
    }

    let updated = self
      .store
      .update_ride(ride_id, RideUpdateFields {
        status: Some(RideStatus::DriverAssigned),
        driver_id: Some(driver_id),
        vehicle_id: Some(vehicle_id),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;

    info!(%ride_id, %driver_id, %vehicle_id, "driver assigned");
    self.notifier.notify_driver_assigned(&updated).await;
    Ok(updated)
  }

  /// Start the trip: `at_pickup` to `in_progress`, driver only.
  pub async fn start_ride(&self, ride_id: Uuid, driver_id: Uuid) -> Result<Ride> {
    let _guard = self.locks.acquire(ride_id).await;
    let ride = self.ride(ride_id).await?;
    ensure_driver(&ride, driver_id)?;
    self.start_locked(&ride).await
  }

  /// Complete the trip: `in_progress` to `completed`, driver only.
  pub async fn complete_ride(
    &self,
    ride_id: Uuid,
    driver_id: Uuid,
    data: CompletionData,
  ) -> Result<Ride> {
    let _guard = self.locks.acquire(ride_id).await;
    let ride = self.ride(ride_id).await?;
    ensure_driver(&ride, driver_id)?;
    self.complete_locked(&ride, data).await
  }

  /// Cancel from any non-terminal status. Either participant may
  /// cancel; who cancelled is derived from the caller's identity.
  pub async fn cancel_ride(
    &self,
    ride_id: Uuid,
    user_id: Uuid,
    reason: Option<String>,
  ) -> Result<Ride> {
    let _guard = self.locks.acquire(ride_id).await;

    let ride = self.ride(ride_id).await?;
    if !ride.is_participant(user_id) {
      return Err(Error::Unauthorized { ride_id, user_id });
    }
    self.cancel_locked(&ride, user_id, reason).await
  }

  /// Generic transition entry point: the table plus role rules. The
  /// richer commands above remain the canonical path; this one serves
  /// clients that speak in target statuses.
  pub async fn update_ride_status(
    &self,
    ride_id: Uuid,
    user_id: Uuid,
    new_status: RideStatus,
  ) -> Result<Ride> {
    let _guard = self.locks.acquire(ride_id).await;

    let ride = self.ride(ride_id).await?;
    check_transition(&ride, new_status)?;

    match new_status {
      RideStatus::Cancelled => {
        // Drivers cancel through `cancel_ride`; this path is the
        // passenger's.
        if user_id != ride.passenger_id {
          return Err(Error::Unauthorized { ride_id, user_id });
        }
        self.cancel_locked(&ride, user_id, None).await
      }
      RideStatus::InProgress => {
        ensure_driver(&ride, user_id)?;
        self.start_locked(&ride).await
      }
      RideStatus::Completed => {
        ensure_driver(&ride, user_id)?;
        self.complete_locked(&ride, CompletionData::default()).await
      }
      RideStatus::DriverArriving | RideStatus::AtPickup => {
        ensure_driver(&ride, user_id)?;
        let updated = self
          .store
          .update_ride(ride_id, RideUpdateFields {
            status: Some(new_status),
            ..Default::default()
          })
          .await
          .map_err(Error::store)?;
        info!(%ride_id, status = %new_status, "ride status updated");
        Ok(updated)
      }
      RideStatus::DriverAssigned => Err(Error::Validation(
        "driver assignment must supply driver and vehicle ids".to_string(),
      )),
      // Unreachable past the table check; no status may return to
      // pending.
      RideStatus::Pending => Err(Error::invalid_transition(
        ride.status,
        RideStatus::Pending,
      )),
    }
  }

  // ── Locked transition bodies ──────────────────────────────────────────

  async fn start_locked(&self, ride: &Ride) -> Result<Ride> {
    check_transition(ride, RideStatus::InProgress)?;

    let updated = self
      .store
      .update_ride(ride.ride_id, RideUpdateFields {
        status: Some(RideStatus::InProgress),
        started_at: Some(Utc::now()),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;

    // The driver is now heading for the dropoff.
    self
      .store
      .update_tracking(ride.ride_id, TrackingUpdateFields {
        tracking_status: Some(TrackingStatus::EnRouteToDestination),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;

    info!(ride_id = %ride.ride_id, "ride started");
    self.notifier.notify_ride_started(&updated).await;
    Ok(updated)
  }

  async fn complete_locked(
    &self,
    ride: &Ride,
    data: CompletionData,
  ) -> Result<Ride> {
    check_transition(ride, RideStatus::Completed)?;

    let now = Utc::now();
    let duration = data.actual_duration_min.or_else(|| {
      ride
        .started_at
        .map(|started| ((now - started).num_seconds() as f64 / 60.0).ceil() as i64)
    });

    let mut fields = RideUpdateFields {
      status: Some(RideStatus::Completed),
      completed_at: Some(now),
      actual_distance_km: data.actual_distance_km,
      ..Default::default()
    };
    fields.actual_duration_min = duration;

    let updated = self
      .store
      .update_ride(ride.ride_id, fields)
      .await
      .map_err(Error::store)?;

    self
      .store
      .deactivate_tracking(ride.ride_id)
      .await
      .map_err(Error::store)?;

    if let Some(driver_id) = updated.driver_id {
      // The ride is already terminal; a lost counter bump is logged,
      // not surfaced.
      if let Err(err) = self.directory.increment_completed_rides(driver_id).await
      {
        warn!(%driver_id, %err, "failed to bump completed-ride counter");
      }
    }

    info!(ride_id = %ride.ride_id, "ride completed");
    self.notifier.notify_ride_completed(&updated).await;
    self.locks.discard(ride.ride_id).await;
    Ok(updated)
  }

  async fn cancel_locked(
    &self,
    ride: &Ride,
    user_id: Uuid,
    reason: Option<String>,
  ) -> Result<Ride> {
    check_transition(ride, RideStatus::Cancelled)?;

    let cancelled_by = if user_id == ride.passenger_id {
      CancelledBy::Passenger
    } else {
      CancelledBy::Driver
    };

    let updated = self
      .store
      .update_ride(ride.ride_id, RideUpdateFields {
        status: Some(RideStatus::Cancelled),
        cancelled_by: Some(cancelled_by),
        cancellation_reason: reason,
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;

    self
      .store
      .deactivate_tracking(ride.ride_id)
      .await
      .map_err(Error::store)?;

    info!(
      ride_id = %ride.ride_id,
      by = cancelled_by.as_str(),
      "ride cancelled"
    );
    self.notifier.notify_ride_cancelled(&updated).await;
    self.locks.discard(ride.ride_id).await;
    Ok(updated)
  }
}

fn check_transition(ride: &Ride, to: RideStatus) -> Result<()> {
  if !ride.status.can_transition_to(to) {
    return Err(Error::invalid_transition(ride.status, to));
  }
  Ok(())
}

fn ensure_driver(ride: &Ride, user_id: Uuid) -> Result<()> {
  if ride.driver_id != Some(user_id) {
    return Err(Error::Unauthorized { ride_id: ride.ride_id, user_id });
  }
  Ok(())
}
