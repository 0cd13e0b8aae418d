//! Error types for the monitor.
//!
//! Only bus connection failures are fatal. Everything else is absorbed by
//! the caller and turned into "no data".

use thiserror::Error;

/// Main error type for the monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
   #[error("System bus unavailable: {0}")]
   BusUnavailable(zbus::Error),

   #[error("D-Bus call {method} failed: {source}")]
   BusCallFailed {
      method: &'static str,
      #[source]
      source: zbus::Error,
   },

   #[error("D-Bus error: {0}")]
   DBus(#[from] zbus::Error),

   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Not found: {0}")]
   NotFound(String),

   #[error("External tool failed: {0}")]
   ExternalToolFailure(String),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),
}

impl MonitorError {
   /// Wraps a failed method call, tagging it with the member name.
   pub fn call_failed(method: &'static str) -> impl FnOnce(zbus::Error) -> Self {
      move |source| Self::BusCallFailed { method, source }
   }
}

/// Convenience type alias for Results with `MonitorError`.
pub type Result<T> = std::result::Result<T, MonitorError>;
