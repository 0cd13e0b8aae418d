//! Recognition of the target accessory class.
//!
//! A device is an accessory of interest when its advertised service list
//! contains [`TARGET_SERVICE`].

use log::debug;
use uuid::Uuid;

use crate::bluetooth::{DEVICE_IFACE, props, session::BusSession};

/// Service identifier advertised by AirPods-class accessories.
pub const TARGET_SERVICE: Uuid = Uuid::from_u128(0x74ec2172_0bad_4d01_8f77_997b2be0722a);
/// [`TARGET_SERVICE`] in the hyphenated form BlueZ reports.
const TARGET_SERVICE_STR: &str = "74ec2172-0bad-4d01-8f77-997b2be0722a";

/// Whether `uuids` contains the target service. Only the hyphenated form
/// matches, in any letter case.
pub fn is_target_accessory<'a>(uuids: impl IntoIterator<Item = &'a str>) -> bool {
   uuids
      .into_iter()
      .any(|u| u.eq_ignore_ascii_case(TARGET_SERVICE_STR))
}

/// Fetches `UUIDs` at `path` and applies [`is_target_accessory`]. Any
/// failure counts as "not an accessory".
pub async fn is_target_accessory_at(bus: &impl BusSession, path: &str) -> bool {
   let value = match bus.property(path, DEVICE_IFACE, "UUIDs").await {
      Ok(value) => value,
      Err(e) => {
         debug!("Could not read UUIDs at {path}: {e}");
         return false;
      },
   };
   props::as_string_set(&value)
      .is_some_and(|uuids| is_target_accessory(uuids.iter().map(String::as_str)))
}
