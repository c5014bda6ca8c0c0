//! The `RouteProvider` collaborator interface.
//!
//! The core consumes route data from an external mapping service; it
//! never computes routes itself. Callers are expected to wrap provider
//! invocations in a bounded timeout and degrade gracefully on failure.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// One turn-by-turn step of a computed route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStep {
  pub distance_km:  f64,
  pub duration_min: i64,
  pub instruction:  String,
}

/// A computed route between two points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
  pub distance_km:             f64,
  pub duration_min:            i64,
  /// Duration adjusted for current traffic; equals `duration_min` when
  /// the provider has no traffic model.
  pub duration_in_traffic_min: i64,
  /// Encoded overview polyline, provider-specific encoding.
  pub polyline:                String,
  pub steps:                   Vec<RouteStep>,
}

/// Abstraction over an external routing/mapping service.
pub trait RouteProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Compute a driving route from `origin` to `destination`.
  fn route(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> impl Future<Output = Result<Route, Self::Error>> + Send + '_;
}
