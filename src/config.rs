//! Configuration management for the monitor.
//!
//! This module handles loading and saving configuration from disk,
//! including the name-source settings and signal export switch.

use std::{env, fs, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Main configuration structure for the monitor.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
   /// Device-info tool queried as `<tool> info <address>`.
   #[serde(default = "default_info_tool")]
   pub info_tool: String,

   #[serde(default = "default_info_tool_timeout_ms")]
   pub info_tool_timeout_ms: u64,

   /// Cache roots, scanned in order.
   #[serde(default = "default_cache_dirs")]
   pub cache_dirs: Vec<PathBuf>,

   /// Re-publish notifications as signals on the session bus.
   #[serde(default = "default_export_signals")]
   pub export_signals: bool,
}

fn default_info_tool() -> String {
   "bluetoothctl".to_owned()
}

const fn default_info_tool_timeout_ms() -> u64 {
   2000
}

fn default_cache_dirs() -> Vec<PathBuf> {
   let mut dirs = vec![PathBuf::from("/var/lib/bluetooth")];
   if let Some(home) = dirs::home_dir() {
      dirs.push(home.join(".cache").join("bluetooth"));
   }
   dirs
}

const fn default_export_signals() -> bool {
   true
}

impl Default for Config {
   fn default() -> Self {
      Self {
         info_tool: default_info_tool(),
         info_tool_timeout_ms: default_info_tool_timeout_ms(),
         cache_dirs: default_cache_dirs(),
         export_signals: default_export_signals(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      let config_path = Self::config_path()?;

      if config_path.exists() {
         let contents = fs::read_to_string(&config_path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         let config = Self::default();
         config.save()?;
         Ok(config)
      }
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      let config_path = Self::config_path()?;

      if let Some(parent) = config_path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(&config_path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(podmond_home) = env::var("PODMOND_HOME") {
         PathBuf::from(podmond_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(MonitorError::ConfigDirNotFound);
      };

      Ok(config_dir.join("podmond").join("config.toml"))
   }

   pub const fn info_tool_timeout(&self) -> Duration {
      Duration::from_millis(self.info_tool_timeout_ms)
   }
}
