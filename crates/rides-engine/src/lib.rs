//! Service layer for the campus-rides core: the ride lifecycle state
//! machine, live tracking, and the notification engine.
//!
//! All read-then-write sections on a ride or its active tracking
//! session run under a per-ride async lock ([`locks::RideLocks`]);
//! storage backends only need per-operation atomicity.

mod error;
mod lifecycle;
mod locks;
mod notify;
mod tracking;

pub use error::{Error, Result};
pub use lifecycle::RideLifecycle;
pub use locks::RideLocks;
pub use notify::NotificationEngine;
pub use tracking::{
  LocationUpdateOutcome, ProximityReport, TrackingConfig, TrackingService,
};

#[cfg(test)]
mod tests;
