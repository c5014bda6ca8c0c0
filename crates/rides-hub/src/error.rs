//! Error type and axum `IntoResponse` mapping for the hub.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Engine(#[from] rides_engine::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    use rides_engine::Error as Engine;

    let (status, message) = match &self {
      Error::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
      }
      Error::Engine(engine) => match engine {
        Engine::RideNotFound(_)
        | Engine::TrackingNotFound(_)
        | Engine::DriverNotFound(_)
        | Engine::VehicleNotFound(_)
        | Engine::NotificationNotFound(_) => {
          (StatusCode::NOT_FOUND, engine.to_string())
        }
        Engine::Unauthorized { .. } => {
          (StatusCode::FORBIDDEN, engine.to_string())
        }
        Engine::InvalidTransition { .. } => {
          (StatusCode::CONFLICT, engine.to_string())
        }
        Engine::Validation(_) | Engine::Core(_) => {
          (StatusCode::BAD_REQUEST, engine.to_string())
        }
        Engine::RouteUnavailable(_) => {
          (StatusCode::SERVICE_UNAVAILABLE, engine.to_string())
        }
        Engine::Store(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, engine.to_string())
        }
      },
    };

    (status, Json(serde_json::json!({ "error": message }))).into_response()
  }
}
