//! Per-ride critical sections.
//!
//! Every read-then-write against a ride row or its active tracking
//! session must hold the ride's lock so racing commands observe each
//! other's writes (the loser of a cancel/complete race must see the
//! terminal status and fail).

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-ride async mutexes, keyed by ride id. Cheap to
/// clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct RideLocks {
  inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl RideLocks {
  pub fn new() -> Self { Self::default() }

  /// Acquire the lock for `ride_id`, creating it on first use. The
  /// guard is owned, so it can be held across awaits.
  pub async fn acquire(&self, ride_id: Uuid) -> OwnedMutexGuard<()> {
    let lock = {
      let mut map = self.inner.lock().await;
      Arc::clone(map.entry(ride_id).or_default())
    };
    lock.lock_owned().await
  }

  /// Drop the registry entry for a ride that has reached a terminal
  /// status. Outstanding guards stay valid; a later acquire simply
  /// recreates the entry.
  pub async fn discard(&self, ride_id: Uuid) {
    self.inner.lock().await.remove(&ride_id);
  }
}
