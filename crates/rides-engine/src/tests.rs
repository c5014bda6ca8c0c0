use rides_core::{
  geo::Coordinate,
  notification::NotificationType,
  ride::{CancelledBy, CompletionData, NewRide, Ride, RideStatus},
  route::{Route, RouteProvider},
  store::RideStore,
  tracking::{LocationUpdate, TrackingStatus},
};
use rides_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  Error, NotificationEngine, RideLifecycle, RideLocks, TrackingConfig,
  TrackingService,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("route backend offline")]
struct RouteError;

/// Route provider returning a fixed route, or always failing.
#[derive(Clone)]
struct FixedRoutes {
  fail: bool,
}

impl RouteProvider for FixedRoutes {
  type Error = RouteError;

  async fn route(
    &self,
    _origin: Coordinate,
    _destination: Coordinate,
  ) -> Result<Route, RouteError> {
    if self.fail {
      return Err(RouteError);
    }
    Ok(Route {
      distance_km:             5.0,
      duration_min:            9,
      duration_in_traffic_min: 11,
      polyline:                "abc123".to_string(),
      steps:                   Vec::new(),
    })
  }
}

struct Harness {
  store:     SqliteStore,
  lifecycle: RideLifecycle<SqliteStore, SqliteStore>,
  tracking:  TrackingService<SqliteStore, FixedRoutes>,
  notifier:  NotificationEngine<SqliteStore>,
}

async fn harness(fail_routes: bool) -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let locks = RideLocks::new();
  let notifier = NotificationEngine::new(store.clone());
  let lifecycle = RideLifecycle::new(
    store.clone(),
    store.clone(),
    notifier.clone(),
    locks.clone(),
  );
  let tracking = TrackingService::new(
    store.clone(),
    FixedRoutes { fail: fail_routes },
    notifier.clone(),
    locks,
    TrackingConfig::default(),
  );
  Harness { store, lifecycle, tracking, notifier }
}

/// Metres of latitude expressed in degrees; Haversine over a pure
/// latitude offset reproduces the distance exactly.
fn lat_offset(meters: f64) -> f64 {
  meters / 111_194.93
}

fn pickup() -> Coordinate {
  Coordinate::new(0.0, 0.0).unwrap()
}

fn dropoff() -> Coordinate {
  // Roughly 2.2 km north of the pickup.
  Coordinate::new(0.02, 0.0).unwrap()
}

fn near_pickup(meters: f64) -> Coordinate {
  Coordinate::new(-lat_offset(meters), 0.0).unwrap()
}

struct SeededRide {
  ride:      Ride,
  passenger: Uuid,
  driver:    Uuid,
  vehicle:   Uuid,
}

async fn seeded_ride(h: &Harness) -> SeededRide {
  let passenger = Uuid::new_v4();
  let driver = Uuid::new_v4();
  let vehicle = Uuid::new_v4();
  h.store.seed_user(passenger, false, true).await.unwrap();
  h.store.seed_user(driver, true, true).await.unwrap();
  h.store.seed_vehicle(vehicle, driver, true).await.unwrap();

  let ride = h
    .store
    .create_ride(NewRide { passenger_id: passenger, pickup: pickup(), dropoff: dropoff() })
    .await
    .unwrap();

  SeededRide { ride, passenger, driver, vehicle }
}

/// Drive a fresh ride to `status` through the real commands.
async fn ride_at(h: &Harness, status: RideStatus) -> SeededRide {
  let seeded = seeded_ride(h).await;
  let id = seeded.ride.ride_id;

  if status == RideStatus::Pending {
    return seeded;
  }
  h.lifecycle
    .assign_driver(id, seeded.driver, seeded.vehicle)
    .await
    .unwrap();
  if status == RideStatus::DriverAssigned {
    return seeded;
  }
  h.lifecycle
    .update_ride_status(id, seeded.driver, RideStatus::DriverArriving)
    .await
    .unwrap();
  if status == RideStatus::DriverArriving {
    return seeded;
  }
  h.lifecycle
    .update_ride_status(id, seeded.driver, RideStatus::AtPickup)
    .await
    .unwrap();
  if status == RideStatus::AtPickup {
    return seeded;
  }
  h.lifecycle.start_ride(id, seeded.driver).await.unwrap();
  seeded
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_pair_outside_the_table_is_rejected() {
  let h = harness(false).await;

  for from in RideStatus::ALL {
    for to in RideStatus::ALL {
      if from.can_transition_to(to) {
        continue;
      }
      let seeded = seeded_ride(&h).await;
      let id = seeded.ride.ride_id;
      // Force the starting status at the storage layer.
      h.store
        .update_ride(id, rides_core::ride::RideUpdateFields {
          status: Some(from),
          ..Default::default()
        })
        .await
        .unwrap();

      let err = h
        .lifecycle
        .update_ride_status(id, seeded.passenger, to)
        .await
        .unwrap_err();
      assert!(
        matches!(err, Error::InvalidTransition { from: f, to: t, .. }
          if f == from && t == to),
        "{from} -> {to} produced {err}"
      );
      // The failed command left the row untouched.
      let ride = h.store.get_ride(id).await.unwrap().unwrap();
      assert_eq!(ride.status, from);
    }
  }
}

#[tokio::test]
async fn full_lifecycle_happy_path() {
  let h = harness(false).await;
  let seeded = seeded_ride(&h).await;
  let id = seeded.ride.ride_id;

  let ride = h
    .lifecycle
    .assign_driver(id, seeded.driver, seeded.vehicle)
    .await
    .unwrap();
  assert_eq!(ride.status, RideStatus::DriverAssigned);
  assert_eq!(ride.driver_id, Some(seeded.driver));
  assert_eq!(ride.vehicle_id, Some(seeded.vehicle));

  h.tracking
    .start_tracking(id, near_pickup(2000.0))
    .await
    .unwrap();

  h.lifecycle
    .update_ride_status(id, seeded.driver, RideStatus::DriverArriving)
    .await
    .unwrap();
  h.lifecycle
    .update_ride_status(id, seeded.driver, RideStatus::AtPickup)
    .await
    .unwrap();

  let ride = h.lifecycle.start_ride(id, seeded.driver).await.unwrap();
  assert_eq!(ride.status, RideStatus::InProgress);
  assert!(ride.started_at.is_some());
  // Starting the ride retargets the tracking session.
  let session = h.tracking.get_tracking(id).await.unwrap();
  assert_eq!(session.tracking_status, TrackingStatus::EnRouteToDestination);

  let ride = h
    .lifecycle
    .complete_ride(id, seeded.driver, CompletionData {
      actual_distance_km:  Some(2.2),
      actual_duration_min: None,
    })
    .await
    .unwrap();
  assert_eq!(ride.status, RideStatus::Completed);
  assert!(ride.completed_at.is_some());
  assert_eq!(ride.actual_distance_km, Some(2.2));
  // Derived from started_at when the driver supplies no figure.
  assert!(ride.actual_duration_min.is_some());

  // Session closed, counter bumped, ride terminal.
  assert!(matches!(
    h.tracking.get_tracking(id).await.unwrap_err(),
    Error::TrackingNotFound(_)
  ));
  assert_eq!(h.store.completed_rides(seeded.driver).await.unwrap(), Some(1));
  assert!(
    h.lifecycle
      .cancel_ride(id, seeded.passenger, None)
      .await
      .is_err()
  );

  // The passenger heard about every stage.
  let kinds: Vec<_> = h
    .notifier
    .list(seeded.passenger, false, 50)
    .await
    .unwrap()
    .into_iter()
    .map(|n| n.kind)
    .collect();
  assert!(kinds.contains(&NotificationType::DriverAssigned));
  assert!(kinds.contains(&NotificationType::RideStarted));
  assert!(kinds.contains(&NotificationType::RideCompleted));
}

#[tokio::test]
async fn assignment_checks_driver_and_vehicle() {
  let h = harness(false).await;
  let seeded = seeded_ride(&h).await;
  let id = seeded.ride.ride_id;

  let unknown = Uuid::new_v4();
  assert!(matches!(
    h.lifecycle
      .assign_driver(id, unknown, seeded.vehicle)
      .await
      .unwrap_err(),
    Error::DriverNotFound(d) if d == unknown
  ));

  // The passenger is registered but not as a driver.
  assert!(matches!(
    h.lifecycle
      .assign_driver(id, seeded.passenger, seeded.vehicle)
      .await
      .unwrap_err(),
    Error::DriverNotFound(_)
  ));

  let inactive = Uuid::new_v4();
  h.store.seed_user(inactive, true, false).await.unwrap();
  assert!(matches!(
    h.lifecycle
      .assign_driver(id, inactive, seeded.vehicle)
      .await
      .unwrap_err(),
    Error::Validation(_)
  ));

  // Vehicle owned by someone else.
  let other_driver = Uuid::new_v4();
  h.store.seed_user(other_driver, true, true).await.unwrap();
  assert!(matches!(
    h.lifecycle
      .assign_driver(id, other_driver, seeded.vehicle)
      .await
      .unwrap_err(),
    Error::VehicleNotFound(_)
  ));

  h.store
    .seed_vehicle(seeded.vehicle, seeded.driver, false)
    .await
    .unwrap();
  assert!(matches!(
    h.lifecycle
      .assign_driver(id, seeded.driver, seeded.vehicle)
      .await
      .unwrap_err(),
    Error::Validation(_)
  ));

  // Assignment still never happened.
  let ride = h.store.get_ride(id).await.unwrap().unwrap();
  assert_eq!(ride.status, RideStatus::Pending);
  assert!(ride.driver_id.is_none());
}

#[tokio::test]
async fn role_rules_are_enforced() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::AtPickup).await;
  let id = seeded.ride.ride_id;

  // Only the driver may start.
  assert!(matches!(
    h.lifecycle
      .start_ride(id, seeded.passenger)
      .await
      .unwrap_err(),
    Error::Unauthorized { .. }
  ));
  assert!(matches!(
    h.lifecycle
      .update_ride_status(id, seeded.passenger, RideStatus::InProgress)
      .await
      .unwrap_err(),
    Error::Unauthorized { .. }
  ));

  // Strangers may not cancel.
  assert!(matches!(
    h.lifecycle
      .cancel_ride(id, Uuid::new_v4(), None)
      .await
      .unwrap_err(),
    Error::Unauthorized { .. }
  ));

  // Only the passenger may cancel through the generic path.
  assert!(matches!(
    h.lifecycle
      .update_ride_status(id, seeded.driver, RideStatus::Cancelled)
      .await
      .unwrap_err(),
    Error::Unauthorized { .. }
  ));

  // Assignment never goes through the generic path.
  let fresh = seeded_ride(&h).await;
  assert!(matches!(
    h.lifecycle
      .update_ride_status(
        fresh.ride.ride_id,
        fresh.passenger,
        RideStatus::DriverAssigned
      )
      .await
      .unwrap_err(),
    Error::Validation(_)
  ));
}

#[tokio::test]
async fn cancellation_records_who_and_notifies_the_other_party() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverArriving).await;
  let id = seeded.ride.ride_id;

  h.tracking
    .start_tracking(id, near_pickup(1500.0))
    .await
    .unwrap();

  let ride = h
    .lifecycle
    .cancel_ride(id, seeded.passenger, Some("found another ride".to_string()))
    .await
    .unwrap();
  assert_eq!(ride.status, RideStatus::Cancelled);
  assert_eq!(ride.cancelled_by, Some(CancelledBy::Passenger));
  assert_eq!(ride.cancellation_reason.as_deref(), Some("found another ride"));

  // Tracking torn down with the ride.
  assert!(matches!(
    h.tracking.get_tracking(id).await.unwrap_err(),
    Error::TrackingNotFound(_)
  ));

  // The driver, not the passenger, gets the alert.
  let driver_kinds: Vec<_> = h
    .notifier
    .list(seeded.driver, false, 50)
    .await
    .unwrap()
    .into_iter()
    .map(|n| n.kind)
    .collect();
  assert!(driver_kinds.contains(&NotificationType::RideCancelled));
}

#[tokio::test]
async fn racing_cancel_and_complete_yield_one_winner() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::InProgress).await;
  let id = seeded.ride.ride_id;

  let (cancelled, completed) = tokio::join!(
    h.lifecycle.cancel_ride(id, seeded.passenger, None),
    h.lifecycle
      .complete_ride(id, seeded.driver, CompletionData::default()),
  );

  assert_eq!(
    cancelled.is_ok() as u8 + completed.is_ok() as u8,
    1,
    "exactly one of the racing commands must win"
  );
  let final_status = h.store.get_ride(id).await.unwrap().unwrap().status;
  assert!(final_status.is_terminal());
}

// ─── Tracking ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn arrival_flip_at_forty_meters_but_not_sixty() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  h.tracking
    .start_tracking(id, near_pickup(2000.0))
    .await
    .unwrap();

  let sixty = h
    .tracking
    .update_location(id, seeded.driver, LocationUpdate {
      lat:      near_pickup(60.0).lat,
      lng:      0.0,
      heading:  Some(10.0),
      speed:    Some(20.0),
      accuracy: None,
    })
    .await
    .unwrap();
  assert_eq!(sixty.tracking.tracking_status, TrackingStatus::EnRouteToPickup);
  assert!(!sixty.status_changed);

  let forty = h
    .tracking
    .update_location(id, seeded.driver, LocationUpdate {
      lat:      near_pickup(40.0).lat,
      lng:      0.0,
      heading:  None,
      speed:    None,
      accuracy: None,
    })
    .await
    .unwrap();
  assert_eq!(forty.tracking.tracking_status, TrackingStatus::AtPickup);
  assert!(forty.status_changed);
  assert_eq!(forty.previous_status, TrackingStatus::EnRouteToPickup);
  assert_eq!(
    forty.proximity,
    rides_core::geo::ProximityStatus::Arrived
  );
}

#[tokio::test]
async fn destination_arrival_completes_the_session() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::AtPickup).await;
  let id = seeded.ride.ride_id;

  h.tracking.start_tracking(id, near_pickup(30.0)).await.unwrap();
  h.lifecycle.start_ride(id, seeded.driver).await.unwrap();

  let outcome = h
    .tracking
    .update_location(id, seeded.driver, LocationUpdate {
      lat:      dropoff().lat - lat_offset(30.0),
      lng:      0.0,
      heading:  None,
      speed:    None,
      accuracy: None,
    })
    .await
    .unwrap();
  assert_eq!(outcome.tracking.tracking_status, TrackingStatus::Completed);
  assert!(outcome.status_changed);
}

#[tokio::test]
async fn location_ingest_is_driver_only_and_needs_a_session() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  let sample = LocationUpdate {
    lat: 0.001, lng: 0.0, heading: None, speed: None, accuracy: None,
  };

  // No session yet.
  assert!(matches!(
    h.tracking
      .update_location(id, seeded.driver, sample)
      .await
      .unwrap_err(),
    Error::TrackingNotFound(_)
  ));

  h.tracking.start_tracking(id, near_pickup(900.0)).await.unwrap();

  // Passenger reports are rejected.
  assert!(matches!(
    h.tracking
      .update_location(id, seeded.passenger, sample)
      .await
      .unwrap_err(),
    Error::Unauthorized { .. }
  ));

  // Out-of-range coordinates never reach the store.
  assert!(h
    .tracking
    .update_location(id, seeded.driver, LocationUpdate {
      lat: 95.0, lng: 0.0, heading: None, speed: None, accuracy: None,
    })
    .await
    .is_err());
}

#[tokio::test]
async fn updates_append_history_and_refresh_etas() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  h.tracking
    .start_tracking(id, near_pickup(2224.0))
    .await
    .unwrap();

  for meters in [1800.0, 1200.0, 700.0] {
    h.tracking
      .update_location(id, seeded.driver, LocationUpdate {
        lat:      near_pickup(meters).lat,
        lng:      0.0,
        heading:  Some(0.0),
        speed:    Some(30.0),
        accuracy: Some(5.0),
      })
      .await
      .unwrap();
  }

  let history = h.tracking.location_history(id, 10).await.unwrap();
  assert_eq!(history.len(), 3);
  assert!(history[0].recorded_at <= history[2].recorded_at);

  let session = h.tracking.get_tracking(id).await.unwrap();
  assert_eq!(session.distance_to_pickup_km, 0.7);
  // ceil(0.7 / 40 * 60) = 2 minutes out.
  assert_eq!(session.eta_to_pickup_min, Some(2));
}

#[tokio::test]
async fn route_failure_degrades_to_the_heuristic() {
  let h = harness(true).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  let session = h
    .tracking
    .start_tracking(id, near_pickup(2224.0))
    .await
    .unwrap();

  assert!(session.route_polyline.is_none());
  assert!(session.route_distance_km.is_none());
  // 2.22 km at 40 km/h, rounded up.
  assert_eq!(session.eta_to_pickup_min, Some(4));

  // An explicit refresh is the one place a dead provider surfaces.
  assert!(matches!(
    h.tracking.refresh_eta(id).await.unwrap_err(),
    Error::RouteUnavailable(_)
  ));
}

#[tokio::test]
async fn routed_sessions_carry_provider_data() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  let session = h
    .tracking
    .start_tracking(id, near_pickup(2224.0))
    .await
    .unwrap();
  assert_eq!(session.route_polyline.as_deref(), Some("abc123"));
  assert_eq!(session.route_distance_km, Some(5.0));
  assert_eq!(session.eta_to_dropoff_min, Some(11));

  let refreshed = h.tracking.refresh_eta(id).await.unwrap();
  assert_eq!(refreshed.eta_to_pickup_min, Some(11));

  let kinds: Vec<_> = h
    .notifier
    .list(seeded.passenger, false, 50)
    .await
    .unwrap()
    .into_iter()
    .map(|n| n.kind)
    .collect();
  assert!(kinds.contains(&NotificationType::EtaUpdated));
}

#[tokio::test]
async fn stop_tracking_is_idempotent() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  h.tracking.start_tracking(id, near_pickup(500.0)).await.unwrap();
  assert!(h.tracking.stop_tracking(id).await.unwrap());
  assert!(!h.tracking.stop_tracking(id).await.unwrap());
}

#[tokio::test]
async fn proximity_report_reads_the_current_session() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  h.tracking.start_tracking(id, near_pickup(300.0)).await.unwrap();

  let report = h.tracking.proximity_to_pickup(id).await.unwrap();
  assert_eq!(report.distance_km, 0.3);
  assert_eq!(report.status, rides_core::geo::ProximityStatus::Nearby);
  assert_eq!(report.message, "Nearby (within 500m)");

  h.tracking.stop_tracking(id).await.unwrap();
  assert!(matches!(
    h.tracking.proximity_to_pickup(id).await,
    Err(Error::TrackingNotFound(missing)) if missing == id
  ));
}

#[tokio::test]
async fn manual_status_override_skips_the_distance_flips() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;
  let id = seeded.ride.ride_id;

  h.tracking.start_tracking(id, near_pickup(2000.0)).await.unwrap();

  let forced = h
    .tracking
    .set_tracking_status(id, TrackingStatus::AtPickup)
    .await
    .unwrap();
  assert_eq!(forced.tracking_status, TrackingStatus::AtPickup);
  // Position and distances are untouched by the override.
  assert_eq!(forced.distance_to_pickup_km, 2.0);

  assert!(matches!(
    h.tracking
      .set_tracking_status(Uuid::new_v4(), TrackingStatus::Idle)
      .await,
    Err(Error::TrackingNotFound(_))
  ));
}

// ─── Proximity notifications ─────────────────────────────────────────────────

#[tokio::test]
async fn nearby_band_fires_once_per_window() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverArriving).await;
  let ride = h.store.get_ride(seeded.ride.ride_id).await.unwrap().unwrap();

  let first = h
    .notifier
    .evaluate_proximity(&ride, near_pickup(300.0))
    .await;
  assert_eq!(
    first.map(|n| n.kind),
    Some(NotificationType::DriverNearby)
  );

  // Second sample in the same band, inside the window: suppressed.
  let second = h
    .notifier
    .evaluate_proximity(&ride, near_pickup(250.0))
    .await;
  assert!(second.is_none());

  let nearby: Vec<_> = h
    .notifier
    .list(seeded.passenger, false, 50)
    .await
    .unwrap()
    .into_iter()
    .filter(|n| n.kind == NotificationType::DriverNearby)
    .collect();
  assert_eq!(nearby.len(), 1);
}

#[tokio::test]
async fn bands_map_to_types() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverArriving).await;
  let ride = h.store.get_ride(seeded.ride.ride_id).await.unwrap().unwrap();

  let soon = h
    .notifier
    .evaluate_proximity(&ride, near_pickup(800.0))
    .await;
  assert_eq!(soon.map(|n| n.kind), Some(NotificationType::ArrivingSoon));

  let arrived = h
    .notifier
    .evaluate_proximity(&ride, near_pickup(80.0))
    .await;
  assert_eq!(
    arrived.map(|n| n.kind),
    Some(NotificationType::DriverArrived)
  );

  // Beyond every band: nothing.
  assert!(
    h.notifier
      .evaluate_proximity(&ride, near_pickup(3000.0))
      .await
      .is_none()
  );
}

#[tokio::test]
async fn approach_sequence_walks_the_bands_through_ingest() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverArriving).await;
  let id = seeded.ride.ride_id;

  h.tracking.start_tracking(id, near_pickup(2000.0)).await.unwrap();

  // 800 m, 300 m, 40 m: each sample lands in a tighter band, and the
  // last one flips the session to at_pickup.
  let mut alerts = Vec::new();
  for meters in [800.0, 300.0, 40.0] {
    let outcome = h
      .tracking
      .update_location(id, seeded.driver, LocationUpdate {
        lat:      near_pickup(meters).lat,
        lng:      0.0,
        heading:  None,
        speed:    None,
        accuracy: None,
      })
      .await
      .unwrap();

    if let Some(notification) = h
      .tracking
      .evaluate_proximity(&outcome.ride, outcome.tracking.driver_position)
      .await
    {
      alerts.push(notification.kind);
    }

    if meters == 40.0 {
      assert_eq!(outcome.tracking.tracking_status, TrackingStatus::AtPickup);
      assert!(outcome.status_changed);
    } else {
      assert_eq!(
        outcome.tracking.tracking_status,
        TrackingStatus::EnRouteToPickup
      );
    }
  }

  assert_eq!(alerts, vec![
    NotificationType::ArrivingSoon,
    NotificationType::DriverNearby,
    NotificationType::DriverArrived,
  ]);
}

#[tokio::test]
async fn no_proximity_alerts_while_in_progress() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::InProgress).await;
  let ride = h.store.get_ride(seeded.ride.ride_id).await.unwrap().unwrap();

  assert!(
    h.notifier
      .evaluate_proximity(&ride, near_pickup(200.0))
      .await
      .is_none()
  );
  assert!(
    h.notifier
      .list(seeded.passenger, true, 50)
      .await
      .unwrap()
      .iter()
      .all(|n| n.kind != NotificationType::DriverNearby)
  );
}

#[tokio::test]
async fn notification_read_flow_through_the_engine() {
  let h = harness(false).await;
  let seeded = ride_at(&h, RideStatus::DriverAssigned).await;

  // Assignment created one unread notification.
  assert_eq!(h.notifier.unread_count(seeded.passenger).await.unwrap(), 1);

  let listed = h.notifier.list(seeded.passenger, true, 10).await.unwrap();
  let read = h
    .notifier
    .mark_read(listed[0].notification_id)
    .await
    .unwrap();
  assert!(read.is_read);
  assert_eq!(h.notifier.unread_count(seeded.passenger).await.unwrap(), 0);

  assert!(matches!(
    h.notifier.mark_read(Uuid::new_v4()).await.unwrap_err(),
    Error::NotificationNotFound(_)
  ));

  assert_eq!(h.notifier.mark_all_read(seeded.passenger).await.unwrap(), 0);
}
