//! Connection registry and typed broadcast channels.
//!
//! Two kinds of channel exist: one per user (direct notifications) and
//! one per ride (tracking broadcasts). A connection is always a member
//! of its user channel; ride channels are joined explicitly after an
//! authorization check in the session layer.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::events::ServerEvent;

/// Typed channel key. Replaces stringly-typed room names so a user id
/// can never collide with a ride id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
  User(Uuid),
  Ride(Uuid),
}

pub type ConnectionId = Uuid;

#[derive(Default)]
struct Registry {
  senders: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
  members: HashMap<Channel, HashSet<ConnectionId>>,
  joined:  HashMap<ConnectionId, HashSet<Channel>>,
}

impl Registry {
  fn subscribe(&mut self, conn: ConnectionId, channel: Channel) {
    self.members.entry(channel).or_default().insert(conn);
    self.joined.entry(conn).or_default().insert(channel);
  }

  fn unsubscribe(&mut self, conn: ConnectionId, channel: Channel) {
    if let Some(set) = self.members.get_mut(&channel) {
      set.remove(&conn);
      if set.is_empty() {
        self.members.remove(&channel);
      }
    }
    if let Some(set) = self.joined.get_mut(&conn) {
      set.remove(&channel);
    }
  }
}

/// Shared connection/channel registry. Cheap to clone.
#[derive(Clone, Default)]
pub struct RideChannels {
  inner: Arc<Mutex<Registry>>,
}

impl RideChannels {
  pub fn new() -> Self { Self::default() }

  /// Register a freshly-opened connection and put it on its user
  /// channel.
  pub async fn register(
    &self,
    conn: ConnectionId,
    user_id: Uuid,
    sender: mpsc::UnboundedSender<ServerEvent>,
  ) {
    let mut registry = self.inner.lock().await;
    registry.senders.insert(conn, sender);
    registry.subscribe(conn, Channel::User(user_id));
  }

  pub async fn subscribe(&self, conn: ConnectionId, channel: Channel) {
    self.inner.lock().await.subscribe(conn, channel);
  }

  pub async fn unsubscribe(&self, conn: ConnectionId, channel: Channel) {
    self.inner.lock().await.unsubscribe(conn, channel);
  }

  /// Queue `event` for one connection. Dead connections are ignored;
  /// their cleanup happens on disconnect.
  pub async fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
    let registry = self.inner.lock().await;
    if let Some(sender) = registry.senders.get(&conn) {
      let _ = sender.send(event);
    }
  }

  /// Queue `event` for every member of `channel`.
  pub async fn broadcast(&self, channel: Channel, event: ServerEvent) {
    let registry = self.inner.lock().await;
    let Some(members) = registry.members.get(&channel) else { return };
    for conn in members {
      if let Some(sender) = registry.senders.get(conn) {
        let _ = sender.send(event.clone());
      }
    }
  }

  /// Push to every live connection a user has open.
  pub async fn send_to_user(&self, user_id: Uuid, event: ServerEvent) {
    self.broadcast(Channel::User(user_id), event).await;
  }

  /// Silent cleanup on disconnect: drop the sender and leave every
  /// joined channel.
  pub async fn drop_connection(&self, conn: ConnectionId) {
    let mut registry = self.inner.lock().await;
    registry.senders.remove(&conn);
    if let Some(channels) = registry.joined.remove(&conn) {
      for channel in channels {
        if let Some(set) = registry.members.get_mut(&channel) {
          set.remove(&conn);
          if set.is_empty() {
            registry.members.remove(&channel);
          }
        }
      }
    }
  }
}
