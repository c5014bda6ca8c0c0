//! The notification engine: proximity-band alerts derived from
//! location updates, plus the discrete lifecycle notifications fired by
//! the state machine.
//!
//! Everything that *creates* a notification here is best-effort: a
//! storage failure is logged and swallowed, because tracking
//! correctness must not depend on notification delivery. The read/flag
//! operations propagate errors normally.

use chrono::Utc;
use rides_core::{
  geo::{
    self, format_distance, format_duration, haversine_distance_km,
    DEFAULT_AVG_SPEED_KMH,
  },
  notification::{
    debounce_window, NewNotification, Notification, NotificationType,
  },
  ride::{CancelledBy, Ride},
  store::RideStore,
};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct NotificationEngine<S> {
  store: S,
}

impl<S: RideStore> NotificationEngine<S> {
  pub fn new(store: S) -> Self { Self { store } }

  // ── Proximity alerts ──────────────────────────────────────────────────

  /// Evaluate the distance bands for a fresh driver position and emit
  /// at most one notification to the passenger. Returns the created
  /// notification, or `None` when no band matched, the alert was
  /// debounced, or storage failed.
  ///
  /// Only runs while the passenger is still waiting: once the ride is
  /// `in_progress` no proximity alerts fire.
  pub async fn evaluate_proximity(
    &self,
    ride: &Ride,
    driver_position: geo::Coordinate,
  ) -> Option<Notification> {
    if ride.status == rides_core::ride::RideStatus::InProgress {
      return None;
    }

    let distance = haversine_distance_km(driver_position, ride.pickup);
    let eta = geo::simple_eta_minutes(distance, DEFAULT_AVG_SPEED_KMH);

    // Ascending bands, first match wins.
    let (kind, title, message, metadata) = if distance <= 0.1 {
      (
        NotificationType::DriverArrived,
        "Driver Has Arrived",
        "Your driver is waiting for you".to_string(),
        serde_json::json!({ "distance": distance }),
      )
    } else if distance <= 0.5 {
      (
        NotificationType::DriverNearby,
        "Driver Nearby",
        format!("Your driver is {} away", format_distance(distance)),
        serde_json::json!({ "distance": distance, "eta": eta }),
      )
    } else if distance <= 1.0 {
      (
        NotificationType::ArrivingSoon,
        "Driver Arriving Soon",
        format!("Your driver is {} away", format_distance(distance)),
        serde_json::json!({ "distance": distance, "eta": eta }),
      )
    } else {
      return None;
    };

    let since = Utc::now() - debounce_window();
    match self
      .store
      .recent_notification_exists(ride.ride_id, ride.passenger_id, kind, since)
      .await
    {
      Ok(true) => return None,
      Ok(false) => {}
      Err(err) => {
        warn!(ride_id = %ride.ride_id, %err, "debounce check failed");
        return None;
      }
    }

    self
      .create(NewNotification {
        ride_id: ride.ride_id,
        user_id: ride.passenger_id,
        kind,
        title: title.to_string(),
        message,
        metadata,
      })
      .await
  }

  // ── Lifecycle notifications ───────────────────────────────────────────

  pub async fn notify_driver_assigned(&self, ride: &Ride) {
    self
      .create(NewNotification {
        ride_id:  ride.ride_id,
        user_id:  ride.passenger_id,
        kind:     NotificationType::DriverAssigned,
        title:    "Driver Assigned".to_string(),
        message:  "Your driver is on the way!".to_string(),
        metadata: serde_json::json!({
          "driver_id": ride.driver_id,
          "vehicle_id": ride.vehicle_id,
        }),
      })
      .await;
  }

  pub async fn notify_ride_started(&self, ride: &Ride) {
    self
      .create(NewNotification {
        ride_id:  ride.ride_id,
        user_id:  ride.passenger_id,
        kind:     NotificationType::RideStarted,
        title:    "Ride Started".to_string(),
        message:  "Your ride has begun. Enjoy your trip!".to_string(),
        metadata: serde_json::json!({ "started_at": ride.started_at }),
      })
      .await;
  }

  pub async fn notify_ride_completed(&self, ride: &Ride) {
    self
      .create(NewNotification {
        ride_id:  ride.ride_id,
        user_id:  ride.passenger_id,
        kind:     NotificationType::RideCompleted,
        title:    "Ride Completed".to_string(),
        message:  "Thank you for riding with us! Please rate your experience."
          .to_string(),
        metadata: serde_json::json!({
          "completed_at": ride.completed_at,
          "distance": ride.actual_distance_km,
          "duration": ride.actual_duration_min,
        }),
      })
      .await;
  }

  /// Notify the counterparty of a cancellation. A pending ride has no
  /// driver yet, so a passenger cancel may have nobody to notify.
  pub async fn notify_ride_cancelled(&self, ride: &Ride) {
    let (recipient, message) = match ride.cancelled_by {
      Some(CancelledBy::Driver) => {
        (Some(ride.passenger_id), "Your driver has cancelled the ride.")
      }
      _ => (ride.driver_id, "The ride has been cancelled."),
    };
    let Some(recipient) = recipient else { return };

    let message = match &ride.cancellation_reason {
      Some(reason) => format!("{message} Reason: {reason}"),
      None => message.to_string(),
    };

    self
      .create(NewNotification {
        ride_id: ride.ride_id,
        user_id: recipient,
        kind: NotificationType::RideCancelled,
        title: "Ride Cancelled".to_string(),
        message,
        metadata: serde_json::json!({
          "cancelled_by": ride.cancelled_by,
          "reason": ride.cancellation_reason,
          "cancelled_at": Utc::now(),
        }),
      })
      .await;
  }

  pub async fn notify_eta_updated(&self, ride: &Ride, eta_min: i64) {
    self
      .create(NewNotification {
        ride_id:  ride.ride_id,
        user_id:  ride.passenger_id,
        kind:     NotificationType::EtaUpdated,
        title:    "ETA Updated".to_string(),
        message:  format!(
          "Your driver will arrive in {}",
          format_duration(eta_min)
        ),
        metadata: serde_json::json!({ "eta": eta_min }),
      })
      .await;
  }

  async fn create(&self, input: NewNotification) -> Option<Notification> {
    match self.store.create_notification(input).await {
      Ok(notification) => Some(notification),
      Err(err) => {
        warn!(%err, "failed to persist notification");
        None
      }
    }
  }

  // ── Queries and read flags ────────────────────────────────────────────

  pub async fn list(
    &self,
    user_id: Uuid,
    unread_only: bool,
    limit: usize,
  ) -> Result<Vec<Notification>> {
    self
      .store
      .notifications(user_id, unread_only, limit)
      .await
      .map_err(Error::store)
  }

  pub async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
    self.store.unread_count(user_id).await.map_err(Error::store)
  }

  pub async fn mark_read(&self, notification_id: Uuid) -> Result<Notification> {
    self
      .store
      .mark_read(notification_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotificationNotFound(notification_id))
  }

  pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
    self
      .store
      .mark_all_read(user_id)
      .await
      .map_err(Error::store)
  }
}
