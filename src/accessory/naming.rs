//! Display-name resolution for accessories.
//!
//! Names are looked up in four tiers, stopping at the first non-empty
//! result:
//!
//! 1. `Name` on the device object (known path, or one guessed from the tree)
//! 2. `Name` on the device as seen by each adapter in turn
//! 3. the `Name:` line printed by the device-info tool
//! 4. the `Name=` entry in the on-disk device cache
//!
//! Resolution never fails. When every tier comes up empty the address
//! itself is used.

use log::{debug, info};
use smol_str::SmolStr;

use crate::{
   accessory::sources::{self, InfoTool, NameCache},
   bluetooth::session::{self, BusSession},
};

/// Shown when even the address is blank.
const UNKNOWN_DEVICE: &str = "Unknown device";

#[derive(Debug, Clone)]
pub struct NameResolver<T, C> {
   tool: T,
   cache: C,
}

impl<T: InfoTool, C: NameCache> NameResolver<T, C> {
   pub const fn new(tool: T, cache: C) -> Self {
      Self { tool, cache }
   }

   /// Resolves a display name for `address`.
   ///
   /// `device_path` short-cuts the first tier when the caller already knows
   /// which object the address belongs to.
   pub async fn resolve(
      &self,
      bus: &impl BusSession,
      address: &str,
      device_path: Option<&str>,
   ) -> SmolStr {
      info!("Attempting to resolve name for device: {address}");

      if let Some(name) = Self::from_device_object(bus, address, device_path).await {
         info!("Found name via device object: {name}");
         return name;
      }
      if let Some(name) = Self::from_adapters(bus, address).await {
         info!("Found name via adapter lookup: {name}");
         return name;
      }
      if let Some(name) = self.from_info_tool(address).await {
         info!("Found name via device-info tool: {name}");
         return name;
      }
      if let Some(name) = self.cache.lookup(address) {
         info!("Found name in cache: {name}");
         return name;
      }

      debug!("Could not resolve device name for {address}");
      if address.trim().is_empty() {
         SmolStr::new_static(UNKNOWN_DEVICE)
      } else {
         SmolStr::from(address)
      }
   }

   async fn from_device_object(
      bus: &impl BusSession,
      address: &str,
      device_path: Option<&str>,
   ) -> Option<SmolStr> {
      let path = match device_path {
         Some(path) => path.to_owned(),
         None => {
            let tree = bus.managed_objects().await.unwrap_or_else(|e| {
               debug!("Enumeration failed, guessing device path: {e}");
               Default::default()
            });
            tree.resolve_device_path(address)
         },
      };
      debug!("Trying Name at {path}");
      name_at(bus, &path).await
   }

   async fn from_adapters(bus: &impl BusSession, address: &str) -> Option<SmolStr> {
      let tree = match bus.managed_objects().await {
         Ok(tree) => tree,
         Err(e) => {
            debug!("Adapter lookup skipped: {e}");
            return None;
         },
      };

      for adapter in tree.adapter_paths() {
         match bus.adapter_device_path(adapter, address).await {
            Ok(path) => {
               if let Some(name) = name_at(bus, &path).await {
                  return Some(name);
               }
            },
            Err(e) => debug!("{adapter} has no device {address}: {e}"),
         }
      }
      None
   }

   async fn from_info_tool(&self, address: &str) -> Option<SmolStr> {
      match self.tool.info(address).await {
         Ok(output) => sources::parse_info_name(&output),
         Err(e) => {
            debug!("Device-info tool gave no name: {e}");
            None
         },
      }
   }
}

async fn name_at(bus: &impl BusSession, path: &str) -> Option<SmolStr> {
   match session::device_string(bus, path, "Name").await {
      Ok(name) if !name.is_empty() => Some(name.into()),
      Ok(_) => None,
      Err(e) => {
         debug!("No Name at {path}: {e}");
         None
      },
   }
}
