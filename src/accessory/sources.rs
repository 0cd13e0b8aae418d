//! Name sources outside the bus.
//!
//! Two last-resort sources back up the live BlueZ state: the `bluetoothctl`
//! companion tool and the daemon's on-disk device cache.

use std::{
   fs,
   path::{Path, PathBuf},
   process::Stdio,
   time::Duration,
};

use log::debug;
use smol_str::SmolStr;
use tokio::{process::Command, time};
use walkdir::WalkDir;

use crate::error::{MonitorError, Result};

/// Subdirectory depth explored below each cache root.
const MAX_SCAN_DEPTH: usize = 6;
/// Metadata file BlueZ keeps per device.
const INFO_FILE: &str = "info";

/// A command-line tool that prints device details for an address.
pub trait InfoTool {
   /// Returns the tool's stdout for `address`.
   async fn info(&self, address: &str) -> Result<String>;
}

/// Runs `<program> info <address>` with a bounded wait.
#[derive(Debug, Clone)]
pub struct Bluetoothctl {
   program: String,
   timeout: Duration,
}

impl Bluetoothctl {
   pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
      Self {
         program: program.into(),
         timeout,
      }
   }
}

impl InfoTool for Bluetoothctl {
   async fn info(&self, address: &str) -> Result<String> {
      let mut cmd = Command::new(&self.program);
      cmd.arg("info")
         .arg(address)
         .stdin(Stdio::null())
         .stderr(Stdio::null())
         .kill_on_drop(true);

      let output = match time::timeout(self.timeout, cmd.output()).await {
         Ok(Ok(output)) => output,
         Ok(Err(e)) => {
            return Err(MonitorError::ExternalToolFailure(format!(
               "{}: {e}",
               self.program
            )));
         },
         Err(_) => {
            return Err(MonitorError::ExternalToolFailure(format!(
               "{} timed out after {:?}",
               self.program, self.timeout
            )));
         },
      };

      if !output.status.success() {
         return Err(MonitorError::ExternalToolFailure(format!(
            "{} exited with {}",
            self.program, output.status
         )));
      }
      Ok(String::from_utf8_lossy(&output.stdout).into_owned())
   }
}

/// Extracts the value of the first `Name:` line of `bluetoothctl info`
/// output.
pub fn parse_info_name(output: &str) -> Option<SmolStr> {
   output
      .lines()
      .find_map(|line| line.trim_start().strip_prefix("Name:"))
      .map(str::trim)
      .filter(|name| !name.is_empty())
      .map(SmolStr::from)
}

/// A persisted store of device names keyed by address.
pub trait NameCache {
   fn lookup(&self, address: &str) -> Option<SmolStr>;
}

/// Scans cache roots for a per-device directory holding an `info` file.
///
/// Roots are visited in the configured order. Below a root the walk is
/// depth-first with entries sorted by file name, so the first match in that
/// order wins. Symlinks are not followed.
#[derive(Debug, Clone)]
pub struct CacheDirs {
   roots: Vec<PathBuf>,
}

impl CacheDirs {
   pub const fn new(roots: Vec<PathBuf>) -> Self {
      Self { roots }
   }

   fn scan(root: &Path, needle: &str) -> Option<SmolStr> {
      WalkDir::new(root)
         .min_depth(1)
         .max_depth(MAX_SCAN_DEPTH + 1)
         .follow_links(false)
         .sort_by_file_name()
         .into_iter()
         .filter_map(|entry| entry.ok())
         .filter(|entry| entry.file_type().is_dir())
         .filter(|entry| {
            entry
               .file_name()
               .to_str()
               .is_some_and(|name| name.to_ascii_lowercase().contains(needle))
         })
         .find_map(|entry| read_info_name(&entry.path().join(INFO_FILE)))
   }
}

impl NameCache for CacheDirs {
   fn lookup(&self, address: &str) -> Option<SmolStr> {
      let needle = address.trim().to_ascii_lowercase();
      if needle.is_empty() {
         return None;
      }
      self.roots.iter().find_map(|root| {
         let found = Self::scan(root, &needle);
         if found.is_none() {
            debug!("No cached name for {address} under {}", root.display());
         }
         found
      })
   }
}

fn read_info_name(path: &Path) -> Option<SmolStr> {
   parse_cached_name(&fs::read_to_string(path).ok()?)
}

/// Extracts the first `Name=` entry of a BlueZ `info` key file.
pub fn parse_cached_name(contents: &str) -> Option<SmolStr> {
   contents
      .lines()
      .find_map(|line| line.strip_prefix("Name="))
      .map(str::trim)
      .filter(|name| !name.is_empty())
      .map(SmolStr::from)
}
