//! [`SqliteStore`] — the SQLite implementation of [`RideStore`] and the
//! directory collaborator traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  notification::{NewNotification, Notification, NotificationType},
  ride::{NewRide, Ride, RideStatus, RideUpdateFields},
  store::RideStore,
  tracking::{
    LocationSample, NewLocationSample, NewTrackingSession, TrackingSnapshot,
    TrackingStatus, TrackingUpdateFields,
  },
};

use crate::{
  encode::{
    RawNotification, RawRide, RawSample, RawTracking, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

const RIDE_COLS: &str = "ride_id, passenger_id, driver_id, vehicle_id, \
   pickup_lat, pickup_lng, dropoff_lat, dropoff_lng, ride_status, \
   actual_distance_km, actual_duration_min, cancelled_by, \
   cancellation_reason, created_at, started_at, completed_at";

fn ride_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRide> {
  Ok(RawRide {
    ride_id:             row.get(0)?,
    passenger_id:        row.get(1)?,
    driver_id:           row.get(2)?,
    vehicle_id:          row.get(3)?,
    pickup_lat:          row.get(4)?,
    pickup_lng:          row.get(5)?,
    dropoff_lat:         row.get(6)?,
    dropoff_lng:         row.get(7)?,
    ride_status:         row.get(8)?,
    actual_distance_km:  row.get(9)?,
    actual_duration_min: row.get(10)?,
    cancelled_by:        row.get(11)?,
    cancellation_reason: row.get(12)?,
    created_at:          row.get(13)?,
    started_at:          row.get(14)?,
    completed_at:        row.get(15)?,
  })
}

const TRACKING_COLS: &str = "tracking_id, ride_id, driver_lat, driver_lng, \
   driver_heading, driver_speed, pickup_lat, pickup_lng, dropoff_lat, \
   dropoff_lng, distance_to_pickup_km, distance_to_destination_km, \
   eta_to_pickup_min, eta_to_dropoff_min, route_polyline, \
   route_distance_km, route_duration_min, tracking_status, is_active, \
   last_updated";

fn tracking_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTracking> {
  Ok(RawTracking {
    tracking_id:                row.get(0)?,
    ride_id:                    row.get(1)?,
    driver_lat:                 row.get(2)?,
    driver_lng:                 row.get(3)?,
    driver_heading:             row.get(4)?,
    driver_speed:               row.get(5)?,
    pickup_lat:                 row.get(6)?,
    pickup_lng:                 row.get(7)?,
    dropoff_lat:                row.get(8)?,
    dropoff_lng:                row.get(9)?,
    distance_to_pickup_km:      row.get(10)?,
    distance_to_destination_km: row.get(11)?,
    eta_to_pickup_min:          row.get(12)?,
    eta_to_dropoff_min:         row.get(13)?,
    route_polyline:             row.get(14)?,
    route_distance_km:          row.get(15)?,
    route_duration_min:         row.get(16)?,
    tracking_status:            row.get(17)?,
    is_active:                  row.get(18)?,
    last_updated:               row.get(19)?,
  })
}

const SAMPLE_COLS: &str = "sample_id, ride_id, lat, lng, speed, heading, \
   accuracy, tracking_status, recorded_at";

fn sample_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSample> {
  Ok(RawSample {
    sample_id:       row.get(0)?,
    ride_id:         row.get(1)?,
    lat:             row.get(2)?,
    lng:             row.get(3)?,
    speed:           row.get(4)?,
    heading:         row.get(5)?,
    accuracy:        row.get(6)?,
    tracking_status: row.get(7)?,
    recorded_at:     row.get(8)?,
  })
}

const NOTIFICATION_COLS: &str = "notification_id, ride_id, user_id, \
   notification_type, title, message, metadata, is_read, created_at, read_at";

fn notification_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawNotification> {
  Ok(RawNotification {
    notification_id:   row.get(0)?,
    ride_id:           row.get(1)?,
    user_id:           row.get(2)?,
    notification_type: row.get(3)?,
    title:             row.get(4)?,
    message:           row.get(5)?,
    metadata:          row.get(6)?,
    is_read:           row.get(7)?,
    created_at:        row.get(8)?,
    read_at:           row.get(9)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A campus-rides store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Directory seeding ─────────────────────────────────────────────────

  /// Upsert a user row. The completed-ride counter is preserved on
  /// conflict.
  pub async fn seed_user(
    &self,
    user_id: Uuid,
    is_driver: bool,
    is_active: bool,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, is_driver, is_active) VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id) DO UPDATE SET is_driver = ?2, is_active = ?3",
          rusqlite::params![id_str, is_driver, is_active],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Upsert a vehicle row.
  pub async fn seed_vehicle(
    &self,
    vehicle_id: Uuid,
    owner_id: Uuid,
    is_active: bool,
  ) -> Result<()> {
    let vehicle_str = encode_uuid(vehicle_id);
    let owner_str = encode_uuid(owner_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO vehicles (vehicle_id, owner_id, is_active) VALUES (?1, ?2, ?3)
           ON CONFLICT (vehicle_id) DO UPDATE SET owner_id = ?2, is_active = ?3",
          rusqlite::params![vehicle_str, owner_str, is_active],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The completed-ride counter for a user, if the user exists.
  pub async fn completed_rides(&self, user_id: Uuid) -> Result<Option<i64>> {
    let id_str = encode_uuid(user_id);
    let count = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT completed_rides FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(count)
  }
}

// ─── RideStore impl ──────────────────────────────────────────────────────────

impl RideStore for SqliteStore {
  type Error = Error;

  // ── Rides ─────────────────────────────────────────────────────────────

  async fn create_ride(&self, input: NewRide) -> Result<Ride> {
    let ride = Ride {
      ride_id:             Uuid::new_v4(),
      passenger_id:        input.passenger_id,
      driver_id:           None,
      vehicle_id:          None,
      pickup:              input.pickup,
      dropoff:             input.dropoff,
      status:              RideStatus::Pending,
      actual_distance_km:  None,
      actual_duration_min: None,
      cancelled_by:        None,
      cancellation_reason: None,
      created_at:          Utc::now(),
      started_at:          None,
      completed_at:        None,
    };

    let id_str = encode_uuid(ride.ride_id);
    let passenger_str = encode_uuid(ride.passenger_id);
    let created_str = encode_dt(ride.created_at);
    let (pickup, dropoff) = (ride.pickup, ride.dropoff);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rides (
             ride_id, passenger_id, pickup_lat, pickup_lng,
             dropoff_lat, dropoff_lng, ride_status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
          rusqlite::params![
            id_str,
            passenger_str,
            pickup.lat,
            pickup.lng,
            dropoff.lat,
            dropoff.lng,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(ride)
  }

  async fn get_ride(&self, ride_id: Uuid) -> Result<Option<Ride>> {
    let id_str = encode_uuid(ride_id);

    let raw: Option<RawRide> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RIDE_COLS} FROM rides WHERE ride_id = ?1"),
              rusqlite::params![id_str],
              ride_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRide::into_ride).transpose()
  }

  async fn update_ride(
    &self,
    ride_id: Uuid,
    fields: RideUpdateFields,
  ) -> Result<Ride> {
    let id_str = encode_uuid(ride_id);
    let status_str = fields.status.map(|s| s.as_str().to_owned());
    let driver_str = fields.driver_id.map(encode_uuid);
    let vehicle_str = fields.vehicle_id.map(encode_uuid);
    let started_str = fields.started_at.map(encode_dt);
    let completed_str = fields.completed_at.map(encode_dt);
    let cancelled_by_str = fields.cancelled_by.map(|c| c.as_str().to_owned());
    let actual_distance = fields.actual_distance_km;
    let actual_duration = fields.actual_duration_min;
    let reason = fields.cancellation_reason;

    let raw: Option<RawRide> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing = tx
          .query_row(
            &format!("SELECT {RIDE_COLS} FROM rides WHERE ride_id = ?1"),
            rusqlite::params![id_str],
            ride_from_row,
          )
          .optional()?;

        let Some(mut raw) = existing else {
          return Ok(None);
        };

        if let Some(s) = status_str { raw.ride_status = s; }
        if let Some(d) = driver_str { raw.driver_id = Some(d); }
        if let Some(v) = vehicle_str { raw.vehicle_id = Some(v); }
        if let Some(t) = started_str { raw.started_at = Some(t); }
        if let Some(t) = completed_str { raw.completed_at = Some(t); }
        if let Some(d) = actual_distance { raw.actual_distance_km = Some(d); }
        if let Some(d) = actual_duration { raw.actual_duration_min = Some(d); }
        if let Some(c) = cancelled_by_str { raw.cancelled_by = Some(c); }
        if let Some(r) = reason { raw.cancellation_reason = Some(r); }

        tx.execute(
          "UPDATE rides SET
             driver_id = ?2, vehicle_id = ?3, ride_status = ?4,
             actual_distance_km = ?5, actual_duration_min = ?6,
             cancelled_by = ?7, cancellation_reason = ?8,
             started_at = ?9, completed_at = ?10
           WHERE ride_id = ?1",
          rusqlite::params![
            raw.ride_id,
            raw.driver_id,
            raw.vehicle_id,
            raw.ride_status,
            raw.actual_distance_km,
            raw.actual_duration_min,
            raw.cancelled_by,
            raw.cancellation_reason,
            raw.started_at,
            raw.completed_at,
          ],
        )?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.ok_or(Error::RideNotFound(ride_id))?.into_ride()
  }

  // ── Tracking sessions ─────────────────────────────────────────────────

  async fn create_tracking(
    &self,
    input: NewTrackingSession,
  ) -> Result<TrackingSnapshot> {
    let snapshot = TrackingSnapshot {
      tracking_id:                Uuid::new_v4(),
      ride_id:                    input.ride_id,
      driver_position:            input.driver_position,
      driver_heading:             0.0,
      driver_speed:               0.0,
      pickup:                     input.pickup,
      dropoff:                    input.dropoff,
      distance_to_pickup_km:      input.distance_to_pickup_km,
      distance_to_destination_km: input.distance_to_destination_km,
      eta_to_pickup_min:          input.eta_to_pickup_min,
      eta_to_dropoff_min:         input.eta_to_dropoff_min,
      route_polyline:             input.route_polyline,
      route_distance_km:          input.route_distance_km,
      route_duration_min:         input.route_duration_min,
      tracking_status:            input.tracking_status,
      is_active:                  true,
      last_updated:               Utc::now(),
    };

    let tracking_str = encode_uuid(snapshot.tracking_id);
    let ride_str = encode_uuid(snapshot.ride_id);
    let now_str = encode_dt(snapshot.last_updated);
    let status_str = snapshot.tracking_status.as_str().to_owned();
    let polyline = snapshot.route_polyline.clone();
    let (pos, pickup, dropoff) =
      (snapshot.driver_position, snapshot.pickup, snapshot.dropoff);
    let (d_pickup, d_dest) =
      (snapshot.distance_to_pickup_km, snapshot.distance_to_destination_km);
    let (eta_pickup, eta_dropoff) =
      (snapshot.eta_to_pickup_min, snapshot.eta_to_dropoff_min);
    let (route_distance, route_duration) =
      (snapshot.route_distance_km, snapshot.route_duration_min);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Re-dispatch: close any session still open for this ride.
        tx.execute(
          "UPDATE ride_tracking
             SET is_active = 0, tracking_status = 'completed', last_updated = ?2
           WHERE ride_id = ?1 AND is_active = 1",
          rusqlite::params![ride_str, now_str],
        )?;

        tx.execute(
          "INSERT INTO ride_tracking (
             tracking_id, ride_id, driver_lat, driver_lng,
             driver_heading, driver_speed, pickup_lat, pickup_lng,
             dropoff_lat, dropoff_lng, distance_to_pickup_km,
             distance_to_destination_km, eta_to_pickup_min,
             eta_to_dropoff_min, route_polyline, route_distance_km,
             route_duration_min, tracking_status, is_active,
             created_at, last_updated
           ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, 1, ?17, ?17)",
          rusqlite::params![
            tracking_str,
            ride_str,
            pos.lat,
            pos.lng,
            pickup.lat,
            pickup.lng,
            dropoff.lat,
            dropoff.lng,
            d_pickup,
            d_dest,
            eta_pickup,
            eta_dropoff,
            polyline,
            route_distance,
            route_duration,
            status_str,
            now_str,
          ],
        )?;

        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(snapshot)
  }

  async fn active_tracking(
    &self,
    ride_id: Uuid,
  ) -> Result<Option<TrackingSnapshot>> {
    let ride_str = encode_uuid(ride_id);

    let raw: Option<RawTracking> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TRACKING_COLS} FROM ride_tracking
                 WHERE ride_id = ?1 AND is_active = 1"
              ),
              rusqlite::params![ride_str],
              tracking_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTracking::into_snapshot).transpose()
  }

  async fn update_tracking(
    &self,
    ride_id: Uuid,
    fields: TrackingUpdateFields,
  ) -> Result<Option<TrackingSnapshot>> {
    let ride_str = encode_uuid(ride_id);
    let now_str = encode_dt(Utc::now());
    let position = fields.driver_position;
    let heading = fields.driver_heading;
    let speed = fields.driver_speed;
    let d_pickup = fields.distance_to_pickup_km;
    let d_dest = fields.distance_to_destination_km;
    let eta_pickup = fields.eta_to_pickup_min;
    let eta_dropoff = fields.eta_to_dropoff_min;
    let status_str = fields.tracking_status.map(|s| s.as_str().to_owned());

    let raw: Option<RawTracking> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing = tx
          .query_row(
            &format!(
              "SELECT {TRACKING_COLS} FROM ride_tracking
               WHERE ride_id = ?1 AND is_active = 1"
            ),
            rusqlite::params![ride_str],
            tracking_from_row,
          )
          .optional()?;

        let Some(mut raw) = existing else {
          return Ok(None);
        };

        if let Some(p) = position {
          raw.driver_lat = p.lat;
          raw.driver_lng = p.lng;
        }
        if let Some(h) = heading { raw.driver_heading = h; }
        if let Some(s) = speed { raw.driver_speed = s; }
        if let Some(d) = d_pickup { raw.distance_to_pickup_km = d; }
        if let Some(d) = d_dest { raw.distance_to_destination_km = d; }
        if let Some(e) = eta_pickup { raw.eta_to_pickup_min = Some(e); }
        if let Some(e) = eta_dropoff { raw.eta_to_dropoff_min = Some(e); }
        if let Some(s) = status_str { raw.tracking_status = s; }
        raw.last_updated = now_str;

        tx.execute(
          "UPDATE ride_tracking SET
             driver_lat = ?2, driver_lng = ?3, driver_heading = ?4,
             driver_speed = ?5, distance_to_pickup_km = ?6,
             distance_to_destination_km = ?7, eta_to_pickup_min = ?8,
             eta_to_dropoff_min = ?9, tracking_status = ?10,
             last_updated = ?11
           WHERE tracking_id = ?1",
          rusqlite::params![
            raw.tracking_id,
            raw.driver_lat,
            raw.driver_lng,
            raw.driver_heading,
            raw.driver_speed,
            raw.distance_to_pickup_km,
            raw.distance_to_destination_km,
            raw.eta_to_pickup_min,
            raw.eta_to_dropoff_min,
            raw.tracking_status,
            raw.last_updated,
          ],
        )?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawTracking::into_snapshot).transpose()
  }

  async fn deactivate_tracking(&self, ride_id: Uuid) -> Result<bool> {
    let ride_str = encode_uuid(ride_id);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE ride_tracking
             SET is_active = 0, tracking_status = 'completed', last_updated = ?2
           WHERE ride_id = ?1 AND is_active = 1",
          rusqlite::params![ride_str, now_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Location history — append-only ────────────────────────────────────

  async fn append_location(
    &self,
    input: NewLocationSample,
  ) -> Result<LocationSample> {
    let sample = LocationSample {
      sample_id:       Uuid::new_v4(),
      ride_id:         input.ride_id,
      position:        input.position,
      speed:           input.speed,
      heading:         input.heading,
      accuracy:        input.accuracy,
      tracking_status: input.tracking_status,
      recorded_at:     Utc::now(),
    };

    let sample_str = encode_uuid(sample.sample_id);
    let ride_str = encode_uuid(sample.ride_id);
    let at_str = encode_dt(sample.recorded_at);
    let status_str = sample.tracking_status.as_str().to_owned();
    let pos = sample.position;
    let (speed, heading, accuracy) =
      (sample.speed, sample.heading, sample.accuracy);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ride_location_history (
             sample_id, ride_id, lat, lng, speed, heading, accuracy,
             tracking_status, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            sample_str,
            ride_str,
            pos.lat,
            pos.lng,
            speed,
            heading,
            accuracy,
            status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(sample)
  }

  async fn location_history(
    &self,
    ride_id: Uuid,
    limit: usize,
  ) -> Result<Vec<LocationSample>> {
    let ride_str = encode_uuid(ride_id);
    let limit = limit as i64;

    let mut raws: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SAMPLE_COLS} FROM ride_location_history
           WHERE ride_id = ?1
           ORDER BY recorded_at DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![ride_str, limit], sample_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // Newest N selected above; serve them in chronological order.
    raws.reverse();
    raws.into_iter().map(RawSample::into_sample).collect()
  }

  // ── Notifications ─────────────────────────────────────────────────────

  async fn create_notification(
    &self,
    input: NewNotification,
  ) -> Result<Notification> {
    let notification = Notification {
      notification_id: Uuid::new_v4(),
      ride_id:         input.ride_id,
      user_id:         input.user_id,
      kind:            input.kind,
      title:           input.title,
      message:         input.message,
      metadata:        input.metadata,
      is_read:         false,
      created_at:      Utc::now(),
      read_at:         None,
    };

    let id_str = encode_uuid(notification.notification_id);
    let ride_str = encode_uuid(notification.ride_id);
    let user_str = encode_uuid(notification.user_id);
    let kind_str = notification.kind.as_str().to_owned();
    let title = notification.title.clone();
    let message = notification.message.clone();
    let metadata_str = serde_json::to_string(&notification.metadata)?;
    let at_str = encode_dt(notification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ride_notifications (
             notification_id, ride_id, user_id, notification_type,
             title, message, metadata, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, ride_str, user_str, kind_str, title, message,
            metadata_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn recent_notification_exists(
    &self,
    ride_id: Uuid,
    user_id: Uuid,
    kind: NotificationType,
    since: chrono::DateTime<Utc>,
  ) -> Result<bool> {
    let ride_str = encode_uuid(ride_id);
    let user_str = encode_uuid(user_id);
    let kind_str = kind.as_str().to_owned();
    let since_str = encode_dt(since);

    let exists = self
      .conn
      .call(move |conn| {
        let found: Option<i64> = conn
          .query_row(
            "SELECT 1 FROM ride_notifications
             WHERE ride_id = ?1 AND user_id = ?2
               AND notification_type = ?3 AND created_at >= ?4
             LIMIT 1",
            rusqlite::params![ride_str, user_str, kind_str, since_str],
            |row| row.get(0),
          )
          .optional()?;
        Ok(found.is_some())
      })
      .await?;

    Ok(exists)
  }

  async fn notifications(
    &self,
    user_id: Uuid,
    unread_only: bool,
    limit: usize,
  ) -> Result<Vec<Notification>> {
    let user_str = encode_uuid(user_id);
    let limit = limit as i64;

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let sql = if unread_only {
          format!(
            "SELECT {NOTIFICATION_COLS} FROM ride_notifications
             WHERE user_id = ?1 AND is_read = 0
             ORDER BY created_at DESC LIMIT ?2"
          )
        } else {
          format!(
            "SELECT {NOTIFICATION_COLS} FROM ride_notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2"
          )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, limit], notification_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }

  async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
    let user_str = encode_uuid(user_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM ride_notifications
           WHERE user_id = ?1 AND is_read = 0",
          rusqlite::params![user_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }

  async fn mark_read(
    &self,
    notification_id: Uuid,
  ) -> Result<Option<Notification>> {
    let id_str = encode_uuid(notification_id);
    let now_str = encode_dt(Utc::now());

    let raw: Option<RawNotification> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let n = tx.execute(
          "UPDATE ride_notifications
             SET is_read = 1, read_at = ?2
           WHERE notification_id = ?1 AND is_read = 0",
          rusqlite::params![id_str, now_str],
        )?;
        // Re-marking an already-read notification keeps its original
        // read_at.
        let _ = n;

        let row = tx
          .query_row(
            &format!(
              "SELECT {NOTIFICATION_COLS} FROM ride_notifications
               WHERE notification_id = ?1"
            ),
            rusqlite::params![id_str],
            notification_from_row,
          )
          .optional()?;

        tx.commit()?;
        Ok(row)
      })
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
    let user_str = encode_uuid(user_id);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE ride_notifications
             SET is_read = 1, read_at = ?2
           WHERE user_id = ?1 AND is_read = 0",
          rusqlite::params![user_str, now_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(changed as u64)
  }
}

// ─── Directory impls ─────────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = Error;

  async fn driver_active(&self, user_id: Uuid) -> Result<Option<bool>> {
    let id_str = encode_uuid(user_id);

    let row: Option<(bool, bool)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT is_driver, is_active FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    // A user who is not registered as a driver is indistinguishable
    // from a missing one as far as assignment is concerned.
    Ok(match row {
      Some((true, active)) => Some(active),
      _ => None,
    })
  }

  async fn increment_completed_rides(&self, driver_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(driver_id);

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE users SET completed_rides = completed_rides + 1
           WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(driver_id));
    }
    Ok(())
  }
}

impl VehicleRegistry for SqliteStore {
  type Error = Error;

  async fn vehicle_active_owned_by(
    &self,
    vehicle_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<bool>> {
    let vehicle_str = encode_uuid(vehicle_id);
    let owner_str = encode_uuid(user_id);

    let active: Option<bool> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT is_active FROM vehicles
               WHERE vehicle_id = ?1 AND owner_id = ?2",
              rusqlite::params![vehicle_str, owner_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(active)
  }
}
