//! Per-connection command dispatch.
//!
//! Each inbound command is an independent unit of work; per-ride
//! serialization lives in the engine, not here. Command failures are
//! reported back to the issuing connection only, as `error` events.

use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  ride::Ride,
  route::RouteProvider,
  store::RideStore,
  tracking::LocationUpdate,
};
use rides_engine::Error as EngineError;
use tracing::debug;
use uuid::Uuid;

use crate::{
  channel::{Channel, ConnectionId},
  events::{ClientCommand, ServerEvent},
  AppState,
};

/// Identity of one live connection.
#[derive(Debug, Clone, Copy)]
pub struct Session {
  pub conn_id: ConnectionId,
  pub user_id: Uuid,
}

pub async fn handle_command<S, D, R>(
  state: &AppState<S, D, R>,
  session: Session,
  command: ClientCommand,
) where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  match command {
    ClientCommand::JoinRide { ride_id } => {
      join_ride(state, session, ride_id).await;
    }
    ClientCommand::LeaveRide { ride_id } => {
      state
        .channels
        .unsubscribe(session.conn_id, Channel::Ride(ride_id))
        .await;
    }
    ClientCommand::ReportLocation { ride_id, location } => {
      report_location(state, session, ride_id, location).await;
    }
    ClientCommand::StartRide { ride_id } => {
      match state.lifecycle.start_ride(ride_id, session.user_id).await {
        Ok(ride) => {
          finish_command(state, session, "driver:start-ride", &ride, |ride| {
            ServerEvent::RideStarted { ride }
          })
          .await;
        }
        Err(err) => reject(state, session, err).await,
      }
    }
    ClientCommand::CompleteRide { ride_id, completion } => {
      match state
        .lifecycle
        .complete_ride(ride_id, session.user_id, completion)
        .await
      {
        Ok(ride) => {
          finish_command(state, session, "driver:complete-ride", &ride, |ride| {
            ServerEvent::RideCompleted { ride }
          })
          .await;
        }
        Err(err) => reject(state, session, err).await,
      }
    }
    ClientCommand::CancelRide { ride_id, reason } => {
      match state
        .lifecycle
        .cancel_ride(ride_id, session.user_id, reason)
        .await
      {
        Ok(ride) => {
          finish_command(state, session, "ride:cancel", &ride, |ride| {
            ServerEvent::RideCancelled { ride }
          })
          .await;
        }
        Err(err) => reject(state, session, err).await,
      }
    }
    ClientCommand::UpdateStatus { ride_id, status } => {
      match state
        .lifecycle
        .update_ride_status(ride_id, session.user_id, status)
        .await
      {
        Ok(ride) => {
          finish_command(state, session, "ride:update-status", &ride, |ride| {
            ServerEvent::RideStatusChanged { ride }
          })
          .await;
        }
        Err(err) => reject(state, session, err).await,
      }
    }
    ClientCommand::RequestTracking { ride_id } => {
      request_tracking(state, session, ride_id).await;
    }
  }
}

// ─── Command bodies ──────────────────────────────────────────────────────────

/// Join the ride's broadcast group. Participants only; the snapshot
/// reply goes to this connection, never the group.
async fn join_ride<S, D, R>(
  state: &AppState<S, D, R>,
  session: Session,
  ride_id: Uuid,
) where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let ride = match state.lifecycle.ride(ride_id).await {
    Ok(ride) => ride,
    Err(err) => return reject(state, session, err).await,
  };
  if !ride.is_participant(session.user_id) {
    return reject(state, session, EngineError::Unauthorized {
      ride_id,
      user_id: session.user_id,
    })
    .await;
  }

  state
    .channels
    .subscribe(session.conn_id, Channel::Ride(ride_id))
    .await;
  state
    .channels
    .send_to(session.conn_id, ServerEvent::RideJoined { ride_id })
    .await;
  debug!(%ride_id, user_id = %session.user_id, "joined ride channel");

  if let Ok(tracking) = state.tracking.get_tracking(ride_id).await {
    state
      .channels
      .send_to(session.conn_id, ServerEvent::TrackingData { tracking })
      .await;
  }
}

/// Ingest a location report, broadcast the snapshot, then evaluate
/// proximity bands off the critical path.
async fn report_location<S, D, R>(
  state: &AppState<S, D, R>,
  session: Session,
  ride_id: Uuid,
  location: LocationUpdate,
) where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let outcome = match state
    .tracking
    .update_location(ride_id, session.user_id, location)
    .await
  {
    Ok(outcome) => outcome,
    Err(err) => return reject(state, session, err).await,
  };

  state
    .channels
    .broadcast(Channel::Ride(ride_id), ServerEvent::LocationUpdated {
      ride_id,
      tracking: outcome.tracking.clone(),
      proximity: outcome.proximity,
    })
    .await;

  if outcome.status_changed {
    state
      .channels
      .broadcast(Channel::Ride(ride_id), ServerEvent::TrackingStatusChanged {
        ride_id,
        previous: outcome.previous_status,
        current:  outcome.tracking.tracking_status,
      })
      .await;
  }

  let tracking = state.tracking.clone();
  let channels = state.channels.clone();
  let ride: Ride = outcome.ride;
  let position = outcome.tracking.driver_position;
  tokio::spawn(async move {
    if let Some(notification) =
      tracking.evaluate_proximity(&ride, position).await
    {
      channels
        .send_to_user(notification.user_id, ServerEvent::Notification {
          notification,
        })
        .await;
    }
  });
}

async fn request_tracking<S, D, R>(
  state: &AppState<S, D, R>,
  session: Session,
  ride_id: Uuid,
) where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let ride = match state.lifecycle.ride(ride_id).await {
    Ok(ride) => ride,
    Err(err) => return reject(state, session, err).await,
  };
  if !ride.is_participant(session.user_id) {
    return reject(state, session, EngineError::Unauthorized {
      ride_id,
      user_id: session.user_id,
    })
    .await;
  }

  match state.tracking.get_tracking(ride_id).await {
    Ok(tracking) => {
      state
        .channels
        .send_to(session.conn_id, ServerEvent::TrackingData { tracking })
        .await;
    }
    Err(err) => reject(state, session, err).await,
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Broadcast a lifecycle result to the ride group and acknowledge the
/// issuing connection directly.
async fn finish_command<S, D, R>(
  state: &AppState<S, D, R>,
  session: Session,
  command: &'static str,
  ride: &Ride,
  event: impl Fn(Ride) -> ServerEvent,
) where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  state
    .channels
    .broadcast(Channel::Ride(ride.ride_id), event(ride.clone()))
    .await;
  state
    .channels
    .send_to(session.conn_id, ServerEvent::Ack {
      command,
      ride_id: ride.ride_id,
    })
    .await;
}

async fn reject<S, D, R>(
  state: &AppState<S, D, R>,
  session: Session,
  err: EngineError,
) where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  debug!(user_id = %session.user_id, %err, "command rejected");
  state
    .channels
    .send_to(session.conn_id, ServerEvent::Error { message: err.to_string() })
    .await;
}
