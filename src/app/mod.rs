//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the kiosk agent: schedule
//! application, power-state dispatch, and remote command execution.  All
//! interaction with the device and the cloud happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without a real device.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
