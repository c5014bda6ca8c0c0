use chrono::{Duration, Utc};
use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  geo::Coordinate,
  notification::{NewNotification, NotificationType},
  ride::{NewRide, RideStatus, RideUpdateFields},
  store::RideStore,
  tracking::{
    NewLocationSample, NewTrackingSession, TrackingStatus,
    TrackingUpdateFields,
  },
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.unwrap()
}

fn coord(lat: f64, lng: f64) -> Coordinate {
  Coordinate::new(lat, lng).unwrap()
}

async fn seed_ride(store: &SqliteStore) -> rides_core::ride::Ride {
  store
    .create_ride(NewRide {
      passenger_id: Uuid::new_v4(),
      pickup:       coord(40.4168, -3.7038),
      dropoff:      coord(40.4300, -3.6900),
    })
    .await
    .unwrap()
}

fn session_input(ride_id: Uuid) -> NewTrackingSession {
  NewTrackingSession {
    ride_id,
    driver_position: coord(40.4200, -3.7000),
    pickup: coord(40.4168, -3.7038),
    dropoff: coord(40.4300, -3.6900),
    distance_to_pickup_km: 0.52,
    distance_to_destination_km: 1.84,
    eta_to_pickup_min: Some(1),
    eta_to_dropoff_min: Some(3),
    route_polyline: None,
    route_distance_km: None,
    route_duration_min: None,
    tracking_status: TrackingStatus::EnRouteToPickup,
  }
}

// ─── Rides ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_ride() {
  let store = store().await;
  let ride = seed_ride(&store).await;

  assert_eq!(ride.status, RideStatus::Pending);
  assert!(ride.driver_id.is_none());

  let fetched = store.get_ride(ride.ride_id).await.unwrap().unwrap();
  assert_eq!(fetched.ride_id, ride.ride_id);
  assert_eq!(fetched.passenger_id, ride.passenger_id);
  assert_eq!(fetched.pickup, ride.pickup);
  assert_eq!(fetched.status, RideStatus::Pending);

  assert!(store.get_ride(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_ride_writes_only_populated_fields() {
  let store = store().await;
  let ride = seed_ride(&store).await;
  let driver = Uuid::new_v4();
  let vehicle = Uuid::new_v4();

  let updated = store
    .update_ride(ride.ride_id, RideUpdateFields {
      status: Some(RideStatus::DriverAssigned),
      driver_id: Some(driver),
      vehicle_id: Some(vehicle),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.status, RideStatus::DriverAssigned);
  assert_eq!(updated.driver_id, Some(driver));
  assert_eq!(updated.vehicle_id, Some(vehicle));
  // Untouched fields survive.
  assert_eq!(updated.passenger_id, ride.passenger_id);
  assert_eq!(updated.created_at, ride.created_at);
  assert!(updated.started_at.is_none());

  let updated = store
    .update_ride(ride.ride_id, RideUpdateFields {
      status: Some(RideStatus::DriverArriving),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.driver_id, Some(driver));
}

#[tokio::test]
async fn update_missing_ride_errors() {
  let store = store().await;
  let missing = Uuid::new_v4();

  let err = store
    .update_ride(missing, RideUpdateFields {
      status: Some(RideStatus::Cancelled),
      ..Default::default()
    })
    .await
    .unwrap_err();

  assert!(matches!(err, Error::RideNotFound(id) if id == missing));
}

// ─── Tracking sessions ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_tracking_deactivates_prior_session() {
  let store = store().await;
  let ride = seed_ride(&store).await;

  let first = store
    .create_tracking(session_input(ride.ride_id))
    .await
    .unwrap();
  let second = store
    .create_tracking(session_input(ride.ride_id))
    .await
    .unwrap();
  assert_ne!(first.tracking_id, second.tracking_id);

  let active = store.active_tracking(ride.ride_id).await.unwrap().unwrap();
  assert_eq!(active.tracking_id, second.tracking_id);
  assert!(active.is_active);
  assert_eq!(active.tracking_status, TrackingStatus::EnRouteToPickup);
}

#[tokio::test]
async fn update_tracking_applies_partial_fields() {
  let store = store().await;
  let ride = seed_ride(&store).await;
  store
    .create_tracking(session_input(ride.ride_id))
    .await
    .unwrap();

  let updated = store
    .update_tracking(ride.ride_id, TrackingUpdateFields {
      driver_position: Some(coord(40.4180, -3.7020)),
      driver_speed: Some(23.5),
      distance_to_pickup_km: Some(0.21),
      tracking_status: Some(TrackingStatus::EnRouteToPickup),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.driver_position, coord(40.4180, -3.7020));
  assert_eq!(updated.driver_speed, 23.5);
  assert_eq!(updated.distance_to_pickup_km, 0.21);
  // Fields left unset keep their stored values.
  assert_eq!(updated.distance_to_destination_km, 1.84);
  assert_eq!(updated.eta_to_dropoff_min, Some(3));
}

#[tokio::test]
async fn update_tracking_without_session_is_none() {
  let store = store().await;
  let ride = seed_ride(&store).await;

  let updated = store
    .update_tracking(ride.ride_id, TrackingUpdateFields {
      driver_speed: Some(10.0),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(updated.is_none());
}

#[tokio::test]
async fn deactivate_tracking_is_idempotent() {
  let store = store().await;
  let ride = seed_ride(&store).await;
  store
    .create_tracking(session_input(ride.ride_id))
    .await
    .unwrap();

  assert!(store.deactivate_tracking(ride.ride_id).await.unwrap());
  assert!(!store.deactivate_tracking(ride.ride_id).await.unwrap());
  assert!(store.active_tracking(ride.ride_id).await.unwrap().is_none());
}

// ─── Location history ────────────────────────────────────────────────────────

#[tokio::test]
async fn location_history_serves_newest_samples_oldest_first() {
  let store = store().await;
  let ride = seed_ride(&store).await;

  for i in 0..5 {
    store
      .append_location(NewLocationSample {
        ride_id:         ride.ride_id,
        position:        coord(40.4168 + f64::from(i) * 0.001, -3.7038),
        speed:           f64::from(i),
        heading:         0.0,
        accuracy:        None,
        tracking_status: TrackingStatus::EnRouteToPickup,
      })
      .await
      .unwrap();
    // recorded_at ordering must be unambiguous.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  }

  let history = store.location_history(ride.ride_id, 3).await.unwrap();
  assert_eq!(history.len(), 3);
  // The newest three samples, chronological.
  assert_eq!(history[0].speed, 2.0);
  assert_eq!(history[1].speed, 3.0);
  assert_eq!(history[2].speed, 4.0);
  assert!(history[0].recorded_at <= history[1].recorded_at);

  let all = store.location_history(ride.ride_id, 100).await.unwrap();
  assert_eq!(all.len(), 5);
  assert_eq!(all[0].speed, 0.0);
}

// ─── Notifications ───────────────────────────────────────────────────────────

fn notification_input(ride_id: Uuid, user_id: Uuid) -> NewNotification {
  NewNotification {
    ride_id,
    user_id,
    kind: NotificationType::DriverNearby,
    title: "Driver Nearby".into(),
    message: "Your driver is very close!".into(),
    metadata: serde_json::json!({ "distance": 0.3 }),
  }
}

#[tokio::test]
async fn notification_read_flow() {
  let store = store().await;
  let ride = seed_ride(&store).await;
  let user = ride.passenger_id;

  let n1 = store
    .create_notification(notification_input(ride.ride_id, user))
    .await
    .unwrap();
  let _n2 = store
    .create_notification(notification_input(ride.ride_id, user))
    .await
    .unwrap();

  assert_eq!(store.unread_count(user).await.unwrap(), 2);
  assert_eq!(store.notifications(user, true, 50).await.unwrap().len(), 2);

  let read = store
    .mark_read(n1.notification_id)
    .await
    .unwrap()
    .unwrap();
  assert!(read.is_read);
  assert!(read.read_at.is_some());
  assert_eq!(store.unread_count(user).await.unwrap(), 1);
  assert_eq!(store.notifications(user, true, 50).await.unwrap().len(), 1);
  assert_eq!(store.notifications(user, false, 50).await.unwrap().len(), 2);

  assert!(store.mark_read(Uuid::new_v4()).await.unwrap().is_none());

  assert_eq!(store.mark_all_read(user).await.unwrap(), 1);
  assert_eq!(store.unread_count(user).await.unwrap(), 0);
  assert_eq!(store.mark_all_read(user).await.unwrap(), 0);
}

#[tokio::test]
async fn notification_metadata_round_trips() {
  let store = store().await;
  let ride = seed_ride(&store).await;

  let created = store
    .create_notification(notification_input(ride.ride_id, ride.passenger_id))
    .await
    .unwrap();

  let listed = store
    .notifications(ride.passenger_id, false, 10)
    .await
    .unwrap();
  assert_eq!(listed[0].notification_id, created.notification_id);
  assert_eq!(listed[0].metadata, serde_json::json!({ "distance": 0.3 }));
  assert_eq!(listed[0].kind, NotificationType::DriverNearby);
}

#[tokio::test]
async fn recent_notification_window_checks() {
  let store = store().await;
  let ride = seed_ride(&store).await;
  let user = ride.passenger_id;

  store
    .create_notification(notification_input(ride.ride_id, user))
    .await
    .unwrap();

  let since = Utc::now() - Duration::minutes(10);

  assert!(
    store
      .recent_notification_exists(
        ride.ride_id,
        user,
        NotificationType::DriverNearby,
        since
      )
      .await
      .unwrap()
  );
  // Different type: no suppression.
  assert!(
    !store
      .recent_notification_exists(
        ride.ride_id,
        user,
        NotificationType::ArrivingSoon,
        since
      )
      .await
      .unwrap()
  );
  // Different recipient: no suppression.
  assert!(
    !store
      .recent_notification_exists(
        ride.ride_id,
        Uuid::new_v4(),
        NotificationType::DriverNearby,
        since
      )
      .await
      .unwrap()
  );
  // Window entirely in the future: the existing row is too old.
  assert!(
    !store
      .recent_notification_exists(
        ride.ride_id,
        user,
        NotificationType::DriverNearby,
        Utc::now() + Duration::minutes(1)
      )
      .await
      .unwrap()
  );
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn driver_lookup_distinguishes_missing_from_inactive() {
  let store = store().await;
  let driver = Uuid::new_v4();
  let passenger = Uuid::new_v4();

  store.seed_user(driver, true, true).await.unwrap();
  store.seed_user(passenger, false, true).await.unwrap();

  assert_eq!(store.driver_active(driver).await.unwrap(), Some(true));
  // Registered but not a driver.
  assert_eq!(store.driver_active(passenger).await.unwrap(), None);
  // Unknown user.
  assert_eq!(store.driver_active(Uuid::new_v4()).await.unwrap(), None);

  store.seed_user(driver, true, false).await.unwrap();
  assert_eq!(store.driver_active(driver).await.unwrap(), Some(false));
}

#[tokio::test]
async fn completed_ride_counter() {
  let store = store().await;
  let driver = Uuid::new_v4();
  store.seed_user(driver, true, true).await.unwrap();

  assert_eq!(store.completed_rides(driver).await.unwrap(), Some(0));
  store.increment_completed_rides(driver).await.unwrap();
  store.increment_completed_rides(driver).await.unwrap();
  assert_eq!(store.completed_rides(driver).await.unwrap(), Some(2));

  // Re-seeding keeps the counter.
  store.seed_user(driver, true, true).await.unwrap();
  assert_eq!(store.completed_rides(driver).await.unwrap(), Some(2));

  let missing = Uuid::new_v4();
  let err = store.increment_completed_rides(missing).await.unwrap_err();
  assert!(matches!(err, Error::UserNotFound(id) if id == missing));
}

#[tokio::test]
async fn vehicle_lookup_requires_ownership() {
  let store = store().await;
  let owner = Uuid::new_v4();
  let vehicle = Uuid::new_v4();

  store.seed_user(owner, true, true).await.unwrap();
  store.seed_vehicle(vehicle, owner, true).await.unwrap();

  assert_eq!(
    store.vehicle_active_owned_by(vehicle, owner).await.unwrap(),
    Some(true)
  );
  assert_eq!(
    store
      .vehicle_active_owned_by(vehicle, Uuid::new_v4())
      .await
      .unwrap(),
    None
  );
  assert_eq!(
    store
      .vehicle_active_owned_by(Uuid::new_v4(), owner)
      .await
      .unwrap(),
    None
  );

  store.seed_vehicle(vehicle, owner, false).await.unwrap();
  assert_eq!(
    store.vehicle_active_owned_by(vehicle, owner).await.unwrap(),
    Some(false)
  );
}
