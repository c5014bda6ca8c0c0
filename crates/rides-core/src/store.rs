//! The `RideStore` trait — repository-style persistence for rides,
//! tracking sessions, location history, and notifications.
//!
//! Implemented by storage backends (e.g. `rides-store-sqlite`). The
//! service layer (`rides-engine`) depends on this abstraction, not on
//! any concrete backend.
//!
//! Callers are responsible for serialising read-then-write sections per
//! ride (the engine holds a per-ride lock); the store only guarantees
//! that each individual operation is atomic.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  notification::{NewNotification, Notification, NotificationType},
  ride::{NewRide, Ride, RideUpdateFields},
  tracking::{
    LocationSample, NewLocationSample, NewTrackingSession, TrackingSnapshot,
    TrackingUpdateFields,
  },
};

pub trait RideStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Rides ─────────────────────────────────────────────────────────────

  /// Persist a new ride in `pending` status.
  fn create_ride(
    &self,
    input: NewRide,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;

  /// Retrieve a ride by id. Returns `None` if not found.
  fn get_ride(
    &self,
    ride_id: Uuid,
  ) -> impl Future<Output = Result<Option<Ride>, Self::Error>> + Send + '_;

  /// Apply the populated fields of `fields` to the ride row and return
  /// the updated ride. Errors if the ride does not exist.
  fn update_ride(
    &self,
    ride_id: Uuid,
    fields: RideUpdateFields,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;

  // ── Tracking sessions ─────────────────────────────────────────────────

  /// Create a tracking session, deactivating any prior active session
  /// for the same ride in the same atomic step (re-dispatch). The
  /// at-most-one-active-session invariant is upheld here.
  fn create_tracking(
    &self,
    input: NewTrackingSession,
  ) -> impl Future<Output = Result<TrackingSnapshot, Self::Error>> + Send + '_;

  /// The active session for a ride, if any.
  fn active_tracking(
    &self,
    ride_id: Uuid,
  ) -> impl Future<Output = Result<Option<TrackingSnapshot>, Self::Error>> + Send + '_;

  /// Apply a partial update to the active session and return the new
  /// snapshot; `None` when no session is active.
  fn update_tracking(
    &self,
    ride_id: Uuid,
    fields: TrackingUpdateFields,
  ) -> impl Future<Output = Result<Option<TrackingSnapshot>, Self::Error>> + Send + '_;

  /// Mark the active session inactive and `completed`. Idempotent;
  /// returns whether a session was actually closed.
  fn deactivate_tracking(
    &self,
    ride_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Location history — append-only ────────────────────────────────────

  fn append_location(
    &self,
    input: NewLocationSample,
  ) -> impl Future<Output = Result<LocationSample, Self::Error>> + Send + '_;

  /// The most recent `limit` samples for a ride, served oldest-first
  /// (chronological display order).
  fn location_history(
    &self,
    ride_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LocationSample>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn create_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  /// Whether a notification of `kind` for this (ride, recipient) pair
  /// was created at or after `since`. Debounce check; a benign racing
  /// duplicate is tolerated (§ concurrency policy).
  fn recent_notification_exists(
    &self,
    ride_id: Uuid,
    user_id: Uuid,
    kind: NotificationType,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// A user's notifications, newest-first.
  fn notifications(
    &self,
    user_id: Uuid,
    unread_only: bool,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn unread_count(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Flip `is_read`; returns the updated notification or `None` when
  /// missing.
  fn mark_read(
    &self,
    notification_id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Mark all of a user's unread notifications read; returns how many
  /// were flipped.
  fn mark_all_read(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
