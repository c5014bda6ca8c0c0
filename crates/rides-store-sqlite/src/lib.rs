//! SQLite backend for the campus-rides store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Implements
//! [`rides_core::store::RideStore`] plus the `UserDirectory` and
//! `VehicleRegistry` collaborator traits over the same file.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
