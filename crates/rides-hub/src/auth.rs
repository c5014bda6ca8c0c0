//! Bearer-token authentication for WebSocket and REST clients.
//!
//! Tokens are minted out of band (an account service in a full
//! deployment, the `--issue-token` CLI flag here) and carry the user id
//! plus an HMAC-style signature over it and the server secret.

use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use rides_core::{
  directory::{UserDirectory, VehicleRegistry},
  route::RouteProvider,
  store::RideStore,
};

use crate::{error::Error, AppState};

/// Signs and verifies connection tokens.
pub struct TokenKey {
  secret: String,
}

impl TokenKey {
  pub fn new(secret: impl Into<String>) -> Self {
    Self { secret: secret.into() }
  }

  /// Mint a token for `user_id`: `base64(user_id) "." hex(signature)`.
  pub fn issue(&self, user_id: Uuid) -> String {
    format!("{}.{}", B64.encode(user_id.to_string()), self.signature(user_id))
  }

  /// Verify a token and extract the user it was minted for.
  pub fn verify(&self, token: &str) -> Option<Uuid> {
    let (payload, signature) = token.split_once('.')?;
    let decoded = B64.decode(payload).ok()?;
    let user_id = std::str::from_utf8(&decoded).ok()?.parse::<Uuid>().ok()?;
    (self.signature(user_id) == signature).then_some(user_id)
  }

  fn signature(&self, user_id: Uuid) -> String {
    let digest = Sha256::digest(format!("{user_id}:{}", self.secret));
    hex::encode(digest)
  }
}

/// Pull a bearer token out of an `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
}

/// Authenticated caller identity, extracted from the bearer token.
pub struct Identity(pub Uuid);

impl<S, D, R> FromRequestParts<AppState<S, D, R>> for Identity
where
  S: RideStore + Clone + Send + Sync + 'static,
  D: UserDirectory + VehicleRegistry + Clone + Send + Sync + 'static,
  R: RouteProvider + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, D, R>,
  ) -> Result<Self, Self::Rejection> {
    bearer_token(&parts.headers)
      .and_then(|token| state.auth.verify(token))
      .map(Identity)
      .ok_or(Error::Unauthorized)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_tokens_verify() {
    let key = TokenKey::new("sekrit");
    let user = Uuid::new_v4();
    let token = key.issue(user);
    assert_eq!(key.verify(&token), Some(user));
  }

  #[test]
  fn tampered_tokens_fail() {
    let key = TokenKey::new("sekrit");
    let user = Uuid::new_v4();
    let token = key.issue(user);

    // Re-signed for another user id.
    let other = key.issue(Uuid::new_v4());
    let (payload, _) = token.split_once('.').unwrap();
    let (_, signature) = other.split_once('.').unwrap();
    assert_eq!(key.verify(&format!("{payload}.{signature}")), None);

    // Wrong secret.
    assert_eq!(TokenKey::new("other").verify(&token), None);

    // Garbage.
    assert_eq!(key.verify("not-a-token"), None);
    assert_eq!(key.verify(""), None);
  }
}
