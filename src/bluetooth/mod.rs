//! BlueZ access layer.
//!
//! This module wraps the system-bus side of the monitor: the bus session,
//! typed property access, the managed-object tree and the connection
//! watcher that ties them together.

pub mod objects;
pub mod props;
pub mod session;
pub mod watcher;

/// Well-known bus name of the BlueZ daemon.
pub const BLUEZ_SERVICE: &str = "org.bluez";
/// Interface carried by remote device objects.
pub const DEVICE_IFACE: &str = "org.bluez.Device1";
/// Interface carried by adapter objects.
pub const ADAPTER_IFACE: &str = "org.bluez.Adapter1";
pub const OBJECT_MANAGER_IFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
