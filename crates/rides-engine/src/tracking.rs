//! Live tracking: session bootstrap, the high-frequency location
//! ingest path, and read queries.
//!
//! Route providers are consulted only at session start (and on an
//! explicit ETA refresh); the per-sample hot path sticks to Haversine
//! math and the simple speed heuristic.

use std::time::Duration;

use rides_core::{
  geo::{
    haversine_distance_exact_km, haversine_distance_km, proximity_status,
    simple_eta_minutes, Coordinate, ProximityStatus, DEFAULT_AVG_SPEED_KMH,
  },
  ride::Ride,
  route::{Route, RouteProvider},
  store::RideStore,
  tracking::{
    LocationSample, LocationUpdate, NewLocationSample, NewTrackingSession,
    TrackingSnapshot, TrackingStatus, TrackingUpdateFields,
    ARRIVAL_THRESHOLD_KM,
  },
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  locks::RideLocks,
  notify::NotificationEngine,
};

#[derive(Clone)]
pub struct TrackingConfig {
  /// Upper bound on any single route-provider call.
  pub route_timeout:     Duration,
  /// Average speed assumed by the simple ETA heuristic.
  pub assumed_speed_kmh: f64,
}

impl Default for TrackingConfig {
  fn default() -> Self {
    Self {
      route_timeout:     Duration::from_secs(3),
      assumed_speed_kmh: DEFAULT_AVG_SPEED_KMH,
    }
  }
}

/// Driver-to-pickup proximity, as served to rider-facing surfaces.
#[derive(Debug, Clone)]
pub struct ProximityReport {
  pub distance_km: f64,
  pub status:      ProximityStatus,
  pub message:     String,
}

/// Result of one location ingest.
#[derive(Debug, Clone)]
pub struct LocationUpdateOutcome {
  pub ride:            Ride,
  pub tracking:        TrackingSnapshot,
  pub previous_status: TrackingStatus,
  pub status_changed:  bool,
  /// Proximity tier of the driver relative to the pickup point.
  pub proximity:       ProximityStatus,
}

#[derive(Clone)]
pub struct TrackingService<S, R> {
  store:    S,
  routes:   R,
  notifier: NotificationEngine<S>,
  locks:    RideLocks,
  config:   TrackingConfig,
}

impl<S, R> TrackingService<S, R>
where
  S: RideStore + Clone,
  R: RouteProvider,
{
  pub fn new(
    store: S,
    routes: R,
    notifier: NotificationEngine<S>,
    locks: RideLocks,
    config: TrackingConfig,
  ) -> Self {
    Self { store, routes, notifier, locks, config }
  }

  // ── Session bootstrap ─────────────────────────────────────────────────

  /// Open a tracking session for a ride, seeding ETAs and the
  /// destination-leg route. Route failures degrade to the Haversine
  /// heuristic; they never fail the session. An existing active
  /// session is closed by the store in the same step (re-dispatch).
  pub async fn start_tracking(
    &self,
    ride_id: Uuid,
    driver_start: Coordinate,
  ) -> Result<TrackingSnapshot> {
    let _guard = self.locks.acquire(ride_id).await;

    let ride = self
      .store
      .get_ride(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RideNotFound(ride_id))?;

    let pickup_route = self.fetch_route(driver_start, ride.pickup).await;
    let dest_route = self.fetch_route(ride.pickup, ride.dropoff).await;

    let distance_to_pickup = haversine_distance_km(driver_start, ride.pickup);
    let distance_to_destination =
      haversine_distance_km(driver_start, ride.dropoff);

    let eta_to_pickup = pickup_route
      .as_ref()
      .map(|route| route.duration_in_traffic_min)
      .unwrap_or_else(|| {
        simple_eta_minutes(distance_to_pickup, self.config.assumed_speed_kmh)
      });
    let eta_to_dropoff = dest_route
      .as_ref()
      .map(|route| route.duration_in_traffic_min)
      .unwrap_or_else(|| {
        simple_eta_minutes(
          haversine_distance_km(ride.pickup, ride.dropoff),
          self.config.assumed_speed_kmh,
        )
      });

    let snapshot = self
      .store
      .create_tracking(NewTrackingSession {
        ride_id,
        driver_position: driver_start,
        pickup: ride.pickup,
        dropoff: ride.dropoff,
        distance_to_pickup_km: distance_to_pickup,
        distance_to_destination_km: distance_to_destination,
        eta_to_pickup_min: Some(eta_to_pickup),
        eta_to_dropoff_min: Some(eta_to_dropoff),
        route_polyline: dest_route.as_ref().map(|route| route.polyline.clone()),
        route_distance_km: dest_route.as_ref().map(|route| route.distance_km),
        route_duration_min: dest_route.as_ref().map(|route| route.duration_min),
        tracking_status: TrackingStatus::EnRouteToPickup,
      })
      .await
      .map_err(Error::store)?;

    info!(%ride_id, routed = dest_route.is_some(), "tracking started");
    Ok(snapshot)
  }

  // ── Location ingest ───────────────────────────────────────────────────

  /// Ingest one driver location report. Recomputes distances and the
  /// simple ETAs, applies the 50 m arrival flips, persists the
  /// snapshot, and appends to history (best-effort).
  pub async fn update_location(
    &self,
    ride_id: Uuid,
    driver_id: Uuid,
    update: LocationUpdate,
  ) -> Result<LocationUpdateOutcome> {
    let position = update.position()?;

    let _guard = self.locks.acquire(ride_id).await;

    let ride = self
      .store
      .get_ride(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RideNotFound(ride_id))?;
    if ride.driver_id != Some(driver_id) {
      return Err(Error::Unauthorized { ride_id, user_id: driver_id });
    }

    let session = self
      .store
      .active_tracking(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TrackingNotFound(ride_id))?;

    // Threshold checks use the unrounded distance so a 60 m sample
    // does not round down into the 50 m arrival band.
    let exact_to_pickup = haversine_distance_exact_km(position, session.pickup);
    let exact_to_destination =
      haversine_distance_exact_km(position, session.dropoff);

    let previous_status = session.tracking_status;
    let new_status = match previous_status {
      TrackingStatus::EnRouteToPickup
        if exact_to_pickup <= ARRIVAL_THRESHOLD_KM =>
      {
        TrackingStatus::AtPickup
      }
      TrackingStatus::EnRouteToDestination
        if exact_to_destination <= ARRIVAL_THRESHOLD_KM =>
      {
        TrackingStatus::Completed
      }
      status => status,
    };

    let distance_to_pickup = haversine_distance_km(position, session.pickup);
    let distance_to_destination =
      haversine_distance_km(position, session.dropoff);

    let updated = self
      .store
      .update_tracking(ride_id, TrackingUpdateFields {
        driver_position:            Some(position),
        driver_heading:             Some(update.heading.unwrap_or(0.0)),
        driver_speed:               Some(update.speed.unwrap_or(0.0)),
        distance_to_pickup_km:      Some(distance_to_pickup),
        distance_to_destination_km: Some(distance_to_destination),
        eta_to_pickup_min:          Some(simple_eta_minutes(
          distance_to_pickup,
          self.config.assumed_speed_kmh,
        )),
        eta_to_dropoff_min:         Some(simple_eta_minutes(
          distance_to_destination,
          self.config.assumed_speed_kmh,
        )),
        tracking_status:            Some(new_status),
      })
      .await
      .map_err(Error::store)?
      .ok_or(Error::TrackingNotFound(ride_id))?;

    // History is best-effort auditing, not the system of record.
    if let Err(err) = self
      .store
      .append_location(NewLocationSample {
        ride_id,
        position,
        speed: update.speed.unwrap_or(0.0),
        heading: update.heading.unwrap_or(0.0),
        accuracy: update.accuracy,
        tracking_status: new_status,
      })
      .await
    {
      warn!(%ride_id, %err, "failed to append location sample");
    }

    let status_changed = new_status != previous_status;
    if status_changed {
      info!(
        %ride_id,
        from = previous_status.as_str(),
        to = new_status.as_str(),
        "tracking status changed"
      );
    }

    Ok(LocationUpdateOutcome {
      ride,
      tracking: updated,
      previous_status,
      status_changed,
      proximity: proximity_status(distance_to_pickup),
    })
  }

  /// Run the proximity notification bands for a fresh driver position.
  /// Entirely best-effort; called off the ingest critical path.
  pub async fn evaluate_proximity(
    &self,
    ride: &Ride,
    driver_position: Coordinate,
  ) -> Option<rides_core::notification::Notification> {
    self.notifier.evaluate_proximity(ride, driver_position).await
  }

  // ── Session teardown and reads ────────────────────────────────────────

  /// Close the active session. Idempotent; returns whether one was
  /// actually open.
  pub async fn stop_tracking(&self, ride_id: Uuid) -> Result<bool> {
    let _guard = self.locks.acquire(ride_id).await;
    let stopped = self
      .store
      .deactivate_tracking(ride_id)
      .await
      .map_err(Error::store)?;
    if stopped {
      info!(%ride_id, "tracking stopped");
    }
    Ok(stopped)
  }

  pub async fn get_tracking(&self, ride_id: Uuid) -> Result<TrackingSnapshot> {
    self
      .store
      .active_tracking(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TrackingNotFound(ride_id))
  }

  pub async fn location_history(
    &self,
    ride_id: Uuid,
    limit: usize,
  ) -> Result<Vec<LocationSample>> {
    self
      .store
      .location_history(ride_id, limit)
      .await
      .map_err(Error::store)
  }

  /// Where the driver stands relative to the pickup point right now.
  pub async fn proximity_to_pickup(
    &self,
    ride_id: Uuid,
  ) -> Result<ProximityReport> {
    let session = self.get_tracking(ride_id).await?;
    let distance_km =
      haversine_distance_km(session.driver_position, session.pickup);
    let status = proximity_status(distance_km);
    Ok(ProximityReport {
      distance_km,
      status,
      message: status.message(distance_km),
    })
  }

  /// Manually force the session phase, bypassing the distance flips.
  /// Dispatcher tooling uses this to correct a stuck session.
  pub async fn set_tracking_status(
    &self,
    ride_id: Uuid,
    status: TrackingStatus,
  ) -> Result<TrackingSnapshot> {
    let _guard = self.locks.acquire(ride_id).await;
    let updated = self
      .store
      .update_tracking(ride_id, TrackingUpdateFields {
        tracking_status: Some(status),
        ..Default::default()
      })
      .await
      .map_err(Error::store)?
      .ok_or(Error::TrackingNotFound(ride_id))?;
    info!(%ride_id, status = status.as_str(), "tracking status overridden");
    Ok(updated)
  }

  // ── ETA refresh ───────────────────────────────────────────────────────

  /// Recompute the ETA for the current leg from a fresh provider
  /// route. Unlike session start, a provider failure here surfaces as
  /// `RouteUnavailable`; the caller explicitly asked for a route.
  pub async fn refresh_eta(&self, ride_id: Uuid) -> Result<TrackingSnapshot> {
    let _guard = self.locks.acquire(ride_id).await;

    let ride = self
      .store
      .get_ride(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RideNotFound(ride_id))?;
    let session = self
      .store
      .active_tracking(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TrackingNotFound(ride_id))?;

    let pickup_leg = matches!(
      session.tracking_status,
      TrackingStatus::Idle
        | TrackingStatus::EnRouteToPickup
        | TrackingStatus::AtPickup
    );
    let target = if pickup_leg { session.pickup } else { session.dropoff };

    let route = self.route_or_unavailable(session.driver_position, target).await?;
    let eta = route.duration_in_traffic_min;

    let fields = if pickup_leg {
      TrackingUpdateFields { eta_to_pickup_min: Some(eta), ..Default::default() }
    } else {
      TrackingUpdateFields { eta_to_dropoff_min: Some(eta), ..Default::default() }
    };

    let updated = self
      .store
      .update_tracking(ride_id, fields)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TrackingNotFound(ride_id))?;

    if pickup_leg {
      self.notifier.notify_eta_updated(&ride, eta).await;
    }
    Ok(updated)
  }

  // ── Route helpers ─────────────────────────────────────────────────────

  async fn fetch_route(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> Option<Route> {
    match tokio::time::timeout(
      self.config.route_timeout,
      self.routes.route(origin, destination),
    )
    .await
    {
      Ok(Ok(route)) => Some(route),
      Ok(Err(err)) => {
        warn!(%err, "route computation failed");
        None
      }
      Err(_) => {
        warn!("route computation timed out");
        None
      }
    }
  }

  async fn route_or_unavailable(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> Result<Route> {
    match tokio::time::timeout(
      self.config.route_timeout,
      self.routes.route(origin, destination),
    )
    .await
    {
      Ok(Ok(route)) => Ok(route),
      Ok(Err(err)) => Err(Error::RouteUnavailable(err.to_string())),
      Err(_) => Err(Error::RouteUnavailable("timed out".to_string())),
    }
  }
}
