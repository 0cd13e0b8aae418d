//! Connection watcher for accessories.
//!
//! This module reconciles already-connected accessories at startup, then
//! follows `PropertiesChanged` signals on device objects and turns
//! `Connected` transitions into [`AccessoryEvent`]s.

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::{
   accessory::{
      naming::NameResolver,
      recognition,
      sources::{InfoTool, NameCache},
   },
   bluetooth::{
      DEVICE_IFACE,
      props::{self, PropertyMap},
      session::{self, BusSession, PropertyChange},
   },
   event::{AccessoryEvent, EventSender},
};

/// Drives the bus session and emits connect/disconnect notifications.
///
/// Signals are handled strictly one after another; no state is kept
/// between them.
pub struct ConnectionWatcher<B, T, C> {
   bus: B,
   resolver: NameResolver<T, C>,
   event_tx: EventSender,
}

impl<B, T, C> ConnectionWatcher<B, T, C>
where
   B: BusSession,
   T: InfoTool,
   C: NameCache,
{
   pub const fn new(bus: B, resolver: NameResolver<T, C>, event_tx: EventSender) -> Self {
      Self {
         bus,
         resolver,
         event_tx,
      }
   }

   /// Subscribes to property changes, then reconciles.
   ///
   /// Returns `None` when the subscription failed; reconciliation still
   /// runs in that case.
   pub async fn start(&self) -> Option<mpsc::Receiver<PropertyChange>> {
      let signals = match self.bus.subscribe().await {
         Ok(signals) => Some(signals),
         Err(e) => {
            warn!("Failed to subscribe to PropertiesChanged: {e}");
            None
         },
      };

      if self.reconcile().await {
         info!("Accessories already connected at startup");
      }
      signals
   }

   /// Starts and then handles signals until the stream ends.
   pub async fn run(self) {
      let Some(mut signals) = self.start().await else {
         return;
      };

      info!("Watching for accessory connections");
      while let Some(change) = signals.recv().await {
         self
            .on_signal(&change.interface, &change.changed, &change.sender_path)
            .await;
      }
      info!("Signal stream closed");
   }

   /// Emits `Connected` for every accessory the current tree reports as
   /// connected. Returns whether any was found.
   ///
   /// Names come straight from the snapshot. Devices missing any of the
   /// required properties are skipped as not yet populated.
   pub async fn reconcile(&self) -> bool {
      let tree = match self.bus.managed_objects().await {
         Ok(tree) => tree,
         Err(e) => {
            warn!("Failed to get managed objects: {e}");
            return false;
         },
      };

      let mut found = false;
      for (path, device) in tree.devices() {
         let (Some(uuids), Some(connected), Some(address), Some(name)) = (
            props::get_string_set(device, "UUIDs"),
            props::get_bool(device, "Connected"),
            props::get_string(device, "Address"),
            props::get_string(device, "Name"),
         ) else {
            continue;
         };

         if !connected || !recognition::is_target_accessory(uuids.iter().map(String::as_str)) {
            continue;
         }

         debug!("Found already connected accessory: {address} ({name}) at {path}");
         self.event_tx.emit(AccessoryEvent::connected(address, name));
         found = true;
      }
      found
   }

   /// Handles one `PropertiesChanged` signal emitted by `sender_path`.
   pub async fn on_signal(&self, interface: &str, changed: &PropertyMap, sender_path: &str) {
      if interface != DEVICE_IFACE {
         return;
      }
      let Some(connected) = props::get_bool(changed, "Connected") else {
         return;
      };

      if !recognition::is_target_accessory_at(&self.bus, sender_path).await {
         return;
      }

      let address = match session::device_string(&self.bus, sender_path, "Address").await {
         Ok(address) => address,
         Err(e) => {
            debug!("Dropping signal from {sender_path}, no address: {e}");
            return;
         },
      };

      let name = self
         .resolver
         .resolve(&self.bus, &address, Some(sender_path))
         .await;

      let event = if connected {
         AccessoryEvent::connected(address, name)
      } else {
         AccessoryEvent::disconnected(address, name)
      };
      info!("Accessory {}: {} ({})", event.kind, event.address, event.name);
      self.event_tx.emit(event);
   }
}
