//! Core types and trait definitions for the campus-rides tracking core.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod directory;
pub mod error;
pub mod geo;
pub mod notification;
pub mod ride;
pub mod route;
pub mod store;
pub mod tracking;

pub use error::{Error, Result};
