//! Pure geospatial math: great-circle distance, bearing, proximity
//! classification, and ETA estimation.
//!
//! Everything here is stateless. Distances are kilometres, bearings are
//! degrees clockwise from north, speeds are km/h.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default assumed average speed for the simple ETA heuristic (city
/// driving).
pub const DEFAULT_AVG_SPEED_KMH: f64 = 40.0;

// ─── Coordinate ──────────────────────────────────────────────────────────────

/// A WGS-84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
  pub lat: f64,
  pub lng: f64,
}

impl Coordinate {
  /// Build a coordinate, rejecting out-of-range values.
  pub fn new(lat: f64, lng: f64) -> Result<Self> {
    if !(-90.0..=90.0).contains(&lat)
      || !(-180.0..=180.0).contains(&lng)
      || !lat.is_finite()
      || !lng.is_finite()
    {
      return Err(Error::InvalidCoordinate { lat, lng });
    }
    Ok(Self { lat, lng })
  }
}

// ─── Distance and bearing ────────────────────────────────────────────────────

/// Great-circle distance between two points, rounded to 2 decimal
/// places.
pub fn haversine_distance_km(from: Coordinate, to: Coordinate) -> f64 {
  round2(haversine_distance_exact_km(from, to))
}

/// Unrounded great-circle distance. Threshold checks (the 50 m arrival
/// flip) use this form so that a 60 m sample does not round down into
/// the arrival band.
pub fn haversine_distance_exact_km(from: Coordinate, to: Coordinate) -> f64 {
  let d_lat = (to.lat - from.lat).to_radians();
  let d_lng = (to.lng - from.lng).to_radians();

  let a = (d_lat / 2.0).sin().powi(2)
    + from.lat.to_radians().cos()
      * to.lat.to_radians().cos()
      * (d_lng / 2.0).sin().powi(2);
  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

  EARTH_RADIUS_KM * c
}

/// Forward azimuth from `from` to `to`, normalised to [0, 360) and
/// rounded to the nearest whole degree.
pub fn bearing_degrees(from: Coordinate, to: Coordinate) -> f64 {
  let lat1 = from.lat.to_radians();
  let lat2 = to.lat.to_radians();
  let d_lng = (to.lng - from.lng).to_radians();

  let y = d_lng.sin() * lat2.cos();
  let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

  let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;
  bearing.round() % 360.0
}

/// 8-wind compass direction for a bearing in degrees.
pub fn compass_direction(bearing: f64) -> &'static str {
  const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
  let index = ((bearing / 45.0).round() as usize) % 8;
  DIRECTIONS[index]
}

// ─── Proximity classification ────────────────────────────────────────────────

/// Distance-based tier used to drive rider-facing messaging.
/// Boundaries are inclusive on the upper bound, evaluated ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityStatus {
  Arrived,
  VeryClose,
  Nearby,
  Approaching,
  Close,
  Far,
}

impl ProximityStatus {
  pub fn message(self, distance_km: f64) -> String {
    match self {
      Self::Arrived => "Arrived at location".to_string(),
      Self::VeryClose => "Very close (within 100m)".to_string(),
      Self::Nearby => "Nearby (within 500m)".to_string(),
      Self::Approaching => "Approaching (within 1km)".to_string(),
      Self::Close | Self::Far => format!("{distance_km:.1} km away"),
    }
  }
}

/// Classify a distance into a [`ProximityStatus`] tier.
pub fn proximity_status(distance_km: f64) -> ProximityStatus {
  let meters = distance_km * 1000.0;
  if meters <= 50.0 {
    ProximityStatus::Arrived
  } else if meters <= 100.0 {
    ProximityStatus::VeryClose
  } else if meters <= 500.0 {
    ProximityStatus::Nearby
  } else if meters <= 1000.0 {
    ProximityStatus::Approaching
  } else if distance_km <= 5.0 {
    ProximityStatus::Close
  } else {
    ProximityStatus::Far
  }
}

// ─── ETA ─────────────────────────────────────────────────────────────────────

/// Whole-minute ETA from distance and an assumed average speed.
pub fn simple_eta_minutes(distance_km: f64, avg_speed_kmh: f64) -> i64 {
  (distance_km / avg_speed_kmh * 60.0).ceil() as i64
}

// ─── Auxiliary helpers ───────────────────────────────────────────────────────

/// Geographic midpoint of two coordinates.
pub fn midpoint(a: Coordinate, b: Coordinate) -> Coordinate {
  let lat1 = a.lat.to_radians();
  let lng1 = a.lng.to_radians();
  let lat2 = b.lat.to_radians();
  let lng2 = b.lng.to_radians();

  let bx = lat2.cos() * (lng2 - lng1).cos();
  let by = lat2.cos() * (lng2 - lng1).sin();

  let lat3 = (lat1.sin() + lat2.sin())
    .atan2(((lat1.cos() + bx).powi(2) + by.powi(2)).sqrt());
  let lng3 = lng1 + by.atan2(lat1.cos() + bx);

  Coordinate { lat: lat3.to_degrees(), lng: lng3.to_degrees() }
}

/// Axis-aligned box around a centre point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub north: f64,
  pub south: f64,
  pub east:  f64,
  pub west:  f64,
}

impl BoundingBox {
  pub fn contains(&self, point: Coordinate) -> bool {
    point.lat >= self.south
      && point.lat <= self.north
      && point.lng >= self.west
      && point.lng <= self.east
  }
}

/// Bounding box with the given radius around `center`.
pub fn bounding_box(center: Coordinate, radius_km: f64) -> BoundingBox {
  let lat = center.lat.to_radians();
  let lng = center.lng.to_radians();
  let radius_radians = radius_km / EARTH_RADIUS_KM;

  let delta_lng = (radius_radians.sin() / lat.cos()).asin();

  BoundingBox {
    north: (lat + radius_radians).to_degrees(),
    south: (lat - radius_radians).to_degrees(),
    east:  (lng + delta_lng).to_degrees(),
    west:  (lng - delta_lng).to_degrees(),
  }
}

/// Average speed implied by moving between two points over `seconds`,
/// rounded to 1 decimal place. Zero when no time elapsed.
pub fn speed_between_kmh(a: Coordinate, b: Coordinate, seconds: f64) -> f64 {
  if seconds <= 0.0 {
    return 0.0;
  }
  let distance = haversine_distance_km(a, b);
  (distance / (seconds / 3600.0) * 10.0).round() / 10.0
}

/// Human-readable distance: metres below 1 km, then km.
pub fn format_distance(distance_km: f64) -> String {
  if distance_km < 1.0 {
    format!("{} m", (distance_km * 1000.0).round() as i64)
  } else if distance_km < 10.0 {
    format!("{distance_km:.1} km")
  } else {
    format!("{} km", distance_km.round() as i64)
  }
}

/// Human-readable duration from whole minutes.
pub fn format_duration(minutes: i64) -> String {
  if minutes < 1 {
    "< 1 min".to_string()
  } else if minutes < 60 {
    format!("{minutes} min")
  } else {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 { format!("{hours}h {mins}m") } else { format!("{hours}h") }
  }
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

// ─── Tests ───────────────────────────────────────────────────────────────────
