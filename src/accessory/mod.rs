//! Accessory-specific logic.
//!
//! Recognition of the target accessory class and the fallback chain used
//! to find a display name for a device.

pub mod naming;
pub mod recognition;
pub mod sources;
