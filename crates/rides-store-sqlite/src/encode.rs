//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Status enums are
//! stored as their snake_case string form. Notification metadata is
//! stored as compact JSON. UUIDs are stored as hyphenated lowercase
//! strings.

use chrono::{DateTime, Utc};
use rides_core::{
  geo::Coordinate,
  notification::Notification,
  ride::Ride,
  tracking::{LocationSample, TrackingSnapshot},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `rides` row.
pub struct RawRide {
  pub ride_id:             String,
  pub passenger_id:        String,
  pub driver_id:           Option<String>,
  pub vehicle_id:          Option<String>,
  pub pickup_lat:          f64,
  pub pickup_lng:          f64,
  pub dropoff_lat:         f64,
  pub dropoff_lng:         f64,
  pub ride_status:         String,
  pub actual_distance_km:  Option<f64>,
  pub actual_duration_min: Option<i64>,
  pub cancelled_by:        Option<String>,
  pub cancellation_reason: Option<String>,
  pub created_at:          String,
  pub started_at:          Option<String>,
  pub completed_at:        Option<String>,
}

impl RawRide {
  pub fn into_ride(self) -> Result<Ride> {
    Ok(Ride {
      ride_id:             decode_uuid(&self.ride_id)?,
      passenger_id:        decode_uuid(&self.passenger_id)?,
      driver_id:           self.driver_id.as_deref().map(decode_uuid).transpose()?,
      vehicle_id:          self.vehicle_id.as_deref().map(decode_uuid).transpose()?,
      pickup:              Coordinate { lat: self.pickup_lat, lng: self.pickup_lng },
      dropoff:             Coordinate { lat: self.dropoff_lat, lng: self.dropoff_lng },
      status:              self.ride_status.parse().map_err(Error::Core)?,
      actual_distance_km:  self.actual_distance_km,
      actual_duration_min: self.actual_duration_min,
      cancelled_by:        self
        .cancelled_by
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(Error::Core)?,
      cancellation_reason: self.cancellation_reason,
      created_at:          decode_dt(&self.created_at)?,
      started_at:          self.started_at.as_deref().map(decode_dt).transpose()?,
      completed_at:        self.completed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `ride_tracking` row.
pub struct RawTracking {
  pub tracking_id:                String,
  pub ride_id:                    String,
  pub driver_lat:                 f64,
  pub driver_lng:                 f64,
  pub driver_heading:             f64,
  pub driver_speed:               f64,
  pub pickup_lat:                 f64,
  pub pickup_lng:                 f64,
  pub dropoff_lat:                f64,
  pub dropoff_lng:                f64,
  pub distance_to_pickup_km:      f64,
  pub distance_to_destination_km: f64,
  pub eta_to_pickup_min:          Option<i64>,
  pub eta_to_dropoff_min:         Option<i64>,
  pub route_polyline:             Option<String>,
  pub route_distance_km:          Option<f64>,
  pub route_duration_min:         Option<i64>,
  pub tracking_status:            String,
  pub is_active:                  bool,
  pub last_updated:               String,
}

impl RawTracking {
  pub fn into_snapshot(self) -> Result<TrackingSnapshot> {
    Ok(TrackingSnapshot {
      tracking_id:                decode_uuid(&self.tracking_id)?,
      ride_id:                    decode_uuid(&self.ride_id)?,
      driver_position:            Coordinate { lat: self.driver_lat, lng: self.driver_lng },
      driver_heading:             self.driver_heading,
      driver_speed:               self.driver_speed,
      pickup:                     Coordinate { lat: self.pickup_lat, lng: self.pickup_lng },
      dropoff:                    Coordinate { lat: self.dropoff_lat, lng: self.dropoff_lng },
      distance_to_pickup_km:      self.distance_to_pickup_km,
      distance_to_destination_km: self.distance_to_destination_km,
      eta_to_pickup_min:          self.eta_to_pickup_min,
      eta_to_dropoff_min:         self.eta_to_dropoff_min,
      route_polyline:             self.route_polyline,
      route_distance_km:          self.route_distance_km,
      route_duration_min:         self.route_duration_min,
      tracking_status:            self.tracking_status.parse().map_err(Error::Core)?,
      is_active:                  self.is_active,
      last_updated:               decode_dt(&self.last_updated)?,
    })
  }
}

/// Raw values read directly from a `ride_location_history` row.
pub struct RawSample {
  pub sample_id:       String,
  pub ride_id:         String,
  pub lat:             f64,
  pub lng:             f64,
  pub speed:           f64,
  pub heading:         f64,
  pub accuracy:        Option<f64>,
  pub tracking_status: String,
  pub recorded_at:     String,
}

impl RawSample {
  pub fn into_sample(self) -> Result<LocationSample> {
    Ok(LocationSample {
      sample_id:       decode_uuid(&self.sample_id)?,
      ride_id:         decode_uuid(&self.ride_id)?,
      position:        Coordinate { lat: self.lat, lng: self.lng },
      speed:           self.speed,
      heading:         self.heading,
      accuracy:        self.accuracy,
      tracking_status: self.tracking_status.parse().map_err(Error::Core)?,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `ride_notifications` row.
pub struct RawNotification {
  pub notification_id:   String,
  pub ride_id:           String,
  pub user_id:           String,
  pub notification_type: String,
  pub title:             String,
  pub message:           String,
  pub metadata:          String,
  pub is_read:           bool,
  pub created_at:        String,
  pub read_at:           Option<String>,
}

impl RawNotification {
  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      ride_id:         decode_uuid(&self.ride_id)?,
      user_id:         decode_uuid(&self.user_id)?,
      kind:            self.notification_type.parse().map_err(Error::Core)?,
      title:           self.title,
      message:         self.message,
      metadata:        serde_json::from_str(&self.metadata)?,
      is_read:         self.is_read,
      created_at:      decode_dt(&self.created_at)?,
      read_at:         self.read_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
