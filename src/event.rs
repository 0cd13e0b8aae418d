//! Connection notifications produced by the watcher.
//!
//! Events are transient: they carry the hardware address and the best name
//! found at the time of the transition, and are handed straight to the
//! registered [`EventBus`].

use std::sync::Arc;

use smol_str::SmolStr;
use strum::Display;

/// Direction of a connection transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AccessoryEventKind {
   #[strum(to_string = "connected")]
   Connected,
   #[strum(to_string = "disconnected")]
   Disconnected,
}

/// A single connect/disconnect notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryEvent {
   pub address: SmolStr,
   pub name: SmolStr,
   pub kind: AccessoryEventKind,
}

impl AccessoryEvent {
   pub fn connected(address: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
      Self {
         address: address.into(),
         name: name.into(),
         kind: AccessoryEventKind::Connected,
      }
   }

   pub fn disconnected(address: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
      Self {
         address: address.into(),
         name: name.into(),
         kind: AccessoryEventKind::Disconnected,
      }
   }
}

/// Trait for implementing event emission.
pub trait EventBus: Send + Sync {
   /// Emits an event to all registered listeners.
   fn emit(&self, event: AccessoryEvent);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventBus>;
