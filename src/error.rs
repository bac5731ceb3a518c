//! Unified error types for the kiosk agent.
//!
//! Port-level errors ([`ConfigError`], [`StorageError`], [`PlatformError`],
//! [`RemoteError`]) live next to the port traits in
//! [`app::ports`](crate::app::ports).  This module adds the schedule parse
//! errors and a single [`Error`] enum every subsystem converts into, so the
//! daemon's top-level loop handles failures uniformly.

use core::fmt;

use crate::app::ports::{ConfigError, PlatformError, RemoteError, StorageError};

// ---------------------------------------------------------------------------
// Top-level agent error
// ---------------------------------------------------------------------------

/// Every fallible operation in the agent funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Schedule data could not be parsed or validated.
    Schedule(ScheduleError),
    /// A platform primitive (lock, wake, alarm, content) failed.
    Platform(PlatformError),
    /// Local key-value storage failed.
    Storage(StorageError),
    /// The remote document store failed.
    Remote(RemoteError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::Platform(e) => write!(f, "platform: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Remote(e) => write!(f, "remote: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ScheduleError> for Error {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

impl From<PlatformError> for Error {
    fn from(e: PlatformError) -> Self {
        Self::Platform(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Schedule errors
// ---------------------------------------------------------------------------

/// Failures while parsing schedule data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The weekly schedule document is not well-formed.  Carries the
    /// parser's description of what went wrong.
    Malformed(String),
    /// A time-of-day string is not a valid 24-hour `HH:MM` value.
    InvalidTime(String),
    /// Persisting a valid schedule failed.
    Storage(StorageError),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed schedule: {msg}"),
            Self::InvalidTime(raw) => write!(f, "invalid time of day '{raw}'"),
            Self::Storage(e) => write!(f, "schedule not persisted: {e}"),
        }
    }
}

impl core::error::Error for ScheduleError {}

impl From<StorageError> for ScheduleError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Agent-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
