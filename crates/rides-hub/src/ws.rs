//! WebSocket endpoint: handshake authentication and the per-connection
//! pump between the socket and the channel registry.

use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  http::HeaderMap,
  response::{IntoResponse, Response},
};
use futures::{SinkExt as _, StreamExt as _};
use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  route::RouteProvider,
  store::RideStore,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  auth::bearer_token,
  events::{ClientCommand, ServerEvent},
  session::{handle_command, Session},
  AppState, Error,
};

#[derive(Deserialize)]
pub struct WsParams {
  /// Browsers cannot set headers on a WebSocket handshake, so the
  /// token may arrive as a query parameter instead.
  token: Option<String>,
}

/// `GET /ws` — authenticate and upgrade.
pub async fn handler<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  Query(params): Query<WsParams>,
  headers: HeaderMap,
  ws: WebSocketUpgrade,
) -> Response
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let token = params
    .token
    .as_deref()
    .or_else(|| bearer_token(&headers));
  let Some(user_id) = token.and_then(|t| state.auth.verify(t)) else {
    return Error::Unauthorized.into_response();
  };

  ws.on_upgrade(move |socket| run_session(state, socket, user_id))
}

async fn run_session<S, D, R>(
  state: AppState<S, D, R>,
  socket: WebSocket,
  user_id: Uuid,
) where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  let conn_id = Uuid::new_v4();
  let (mut ws_tx, mut ws_rx) = socket.split();
  let (tx, mut rx) = mpsc::unbounded_channel();

  state.channels.register(conn_id, user_id, tx).await;
  state
    .channels
    .send_to(conn_id, ServerEvent::Connected { user_id })
    .await;
  info!(%user_id, %conn_id, "connection opened");

  // Writer: drain the connection's event queue onto the socket.
  let writer = tokio::spawn(async move {
    while let Some(event) = rx.recv().await {
      let text = match serde_json::to_string(&event) {
        Ok(text) => text,
        Err(err) => {
          debug!(%err, "failed to serialise event");
          continue;
        }
      };
      if ws_tx.send(Message::Text(text.into())).await.is_err() {
        break;
      }
    }
  });

  // Reader: dispatch inbound commands until the peer goes away.
  let session = Session { conn_id, user_id };
  while let Some(message) = ws_rx.next().await {
    match message {
      Ok(Message::Text(text)) => {
        match serde_json::from_str::<ClientCommand>(&text) {
          Ok(command) => handle_command(&state, session, command).await,
          Err(err) => {
            state
              .channels
              .send_to(conn_id, ServerEvent::Error {
                message: format!("unrecognised command: {err}"),
              })
              .await;
          }
        }
      }
      Ok(Message::Close(_)) | Err(_) => break,
      // Pings are answered by axum; binary frames are not part of the
      // protocol.
      Ok(_) => {}
    }
  }

  // Silent cleanup; disconnecting never touches ride state.
  state.channels.drop_connection(conn_id).await;
  writer.abort();
  info!(%user_id, %conn_id, "connection closed");
}
