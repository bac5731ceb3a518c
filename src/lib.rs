//! Kiosk device agent library.
//!
//! Exposes the scheduling engine, action dispatch and remote command
//! channel for the `kioskd` daemon and for integration testing.  All
//! platform access goes through the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod power;
pub mod remote;
pub mod schedule;
pub mod scheduler;
pub mod state;

pub use error::{Error, Result};
