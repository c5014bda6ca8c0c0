//! Route providers.
//!
//! A real deployment points this at an external mapping service; the
//! default provider estimates from great-circle distance so the hub
//! works with no network dependency at all.

use std::convert::Infallible;

use rides_core::{
  geo::{haversine_distance_km, simple_eta_minutes, Coordinate,
    DEFAULT_AVG_SPEED_KMH},
  route::{Route, RouteProvider},
};

/// Straight-line estimator: Haversine distance, simple ETA, no
/// polyline or turn-by-turn steps.
#[derive(Clone, Default)]
pub struct EstimatedRouteProvider;

impl RouteProvider for EstimatedRouteProvider {
  type Error = Infallible;

  async fn route(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> Result<Route, Infallible> {
    let distance_km = haversine_distance_km(origin, destination);
    let duration_min = simple_eta_minutes(distance_km, DEFAULT_AVG_SPEED_KMH);
    Ok(Route {
      distance_km,
      duration_min,
      duration_in_traffic_min: duration_min,
      polyline: String::new(),
      steps: Vec::new(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn estimates_from_distance() {
    let provider = EstimatedRouteProvider;
    let a = Coordinate::new(0.0, 0.0).unwrap();
    let b = Coordinate::new(0.02, 0.0).unwrap();

    let route = provider.route(a, b).await.unwrap();
    assert_eq!(route.distance_km, 2.22);
    // ceil(2.22 / 40 * 60)
    assert_eq!(route.duration_min, 4);
    assert_eq!(route.duration_in_traffic_min, route.duration_min);
  }
}
