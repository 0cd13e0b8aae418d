//! Snapshot of the objects exported by BlueZ.
//!
//! A [`ManagedObjectTree`] is fetched whole on every query and never
//! cached. Paths iterate in lexicographic order, so lookups over the same
//! tree are deterministic.

use std::collections::{BTreeMap, HashMap};

use crate::bluetooth::{
   ADAPTER_IFACE, DEVICE_IFACE,
   props::{self, PropertyMap},
};

/// Interface name -> properties of one object.
pub type InterfaceMap = HashMap<String, PropertyMap>;

/// Prefix shared by all BlueZ adapter and device objects.
const BLUEZ_ROOT: &str = "/org/bluez/";
/// Adapter used when a device path has to be guessed.
const DEFAULT_ADAPTER_PATH: &str = "/org/bluez/hci0";

#[derive(Debug, Default)]
pub struct ManagedObjectTree {
   objects: BTreeMap<String, InterfaceMap>,
}

impl ManagedObjectTree {
   pub fn from_objects(objects: impl IntoIterator<Item = (String, InterfaceMap)>) -> Self {
      Self {
         objects: objects.into_iter().collect(),
      }
   }

   pub fn paths(&self) -> impl Iterator<Item = &str> {
      self.objects.keys().map(String::as_str)
   }

   /// Properties of `interface` on the object at `path`, if present.
   pub fn interface(&self, path: &str, interface: &str) -> Option<&PropertyMap> {
      self.objects.get(path)?.get(interface)
   }

   /// Every object carrying the device interface, with its properties.
   pub fn devices(&self) -> impl Iterator<Item = (&str, &PropertyMap)> {
      self
         .objects
         .iter()
         .filter_map(|(path, ifaces)| Some((path.as_str(), ifaces.get(DEVICE_IFACE)?)))
   }

   /// Paths that follow the adapter naming convention (`/org/bluez/hciN`).
   pub fn adapter_paths(&self) -> Vec<&str> {
      self.paths().filter(|path| is_adapter_path(path)).collect()
   }

   /// Finds the object path for `address`.
   ///
   /// Falls back to a guessed path under `hci0` when nothing in the tree
   /// matches; that object may not exist.
   pub fn resolve_device_path(&self, address: &str) -> String {
      let normalized = normalize_address(address);
      if !normalized.is_empty()
         && let Some(path) = self
            .paths()
            .find(|path| path.to_ascii_lowercase().contains(&normalized))
      {
         return path.to_owned();
      }
      default_device_path(&normalized)
   }

   /// The device registered under `adapter` whose `Address` equals
   /// `address`.
   pub fn device_on_adapter(&self, adapter: &str, address: &str) -> Option<&str> {
      self
         .devices()
         .find(|(_, device)| {
            props::get_string(device, "Adapter").as_deref() == Some(adapter)
               && props::get_string(device, "Address")
                  .is_some_and(|a| a.eq_ignore_ascii_case(address))
         })
         .map(|(path, _)| path)
   }

   /// Whether the object at `path` is a registered adapter.
   pub fn has_adapter(&self, path: &str) -> bool {
      self.interface(path, ADAPTER_IFACE).is_some()
   }
}

/// Lowercases an address and turns its separators into underscores, the
/// form BlueZ uses in object paths.
pub fn normalize_address(address: &str) -> String {
   address.trim().to_ascii_lowercase().replace([':', '-'], "_")
}

pub fn default_device_path(normalized: &str) -> String {
   format!("{DEFAULT_ADAPTER_PATH}/dev_{normalized}")
}

fn is_adapter_path(path: &str) -> bool {
   path
      .strip_prefix(BLUEZ_ROOT)
      .is_some_and(|rest| rest.starts_with("hci") && !rest.contains('/'))
}
