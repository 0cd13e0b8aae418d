//! System bus session.
//!
//! [`BusSession`] is the seam between the monitor and the bus: everything
//! above it works with plain paths, property maps and a channel of
//! [`PropertyChange`] values. [`ZbusSession`] is the production
//! implementation.

use std::collections::HashMap;

use futures::StreamExt;
use log::{debug, warn};
use tokio::sync::mpsc;
use zbus::{
   Connection, MatchRule, Message, MessageStream, message,
   zvariant::{OwnedObjectPath, OwnedValue},
};

use crate::{
   bluetooth::{
      BLUEZ_SERVICE, DEVICE_IFACE, OBJECT_MANAGER_IFACE, PROPERTIES_IFACE,
      objects::{InterfaceMap, ManagedObjectTree},
      props::{self, PropertyMap},
   },
   error::{MonitorError, Result},
};

/// Signals buffered between the bus reader task and the watcher.
const SIGNAL_QUEUE_SIZE: usize = 256;

/// One `PropertiesChanged` signal, with the emitting object's path taken
/// from the message header.
#[derive(Debug)]
pub struct PropertyChange {
   pub interface: String,
   pub changed: PropertyMap,
   pub sender_path: String,
}

impl PropertyChange {
   fn from_message(msg: &Message) -> Option<Self> {
      let header = msg.header();
      let sender_path = header.path()?.as_str().to_owned();
      let (interface, changed, _invalidated): (String, PropertyMap, Vec<String>) =
         msg.body().deserialize().ok()?;
      Some(Self {
         interface,
         changed,
         sender_path,
      })
   }
}

/// Operations the monitor needs from the device manager.
pub trait BusSession {
   /// Fetches the full object tree (`GetManagedObjects`).
   async fn managed_objects(&self) -> Result<ManagedObjectTree>;

   /// Fetches a single property (`Properties.Get`).
   async fn property(&self, path: &str, interface: &str, name: &str) -> Result<OwnedValue>;

   /// Resolves `address` to a device object path on `adapter`.
   async fn adapter_device_path(&self, adapter: &str, address: &str) -> Result<String>;

   /// Subscribes to `PropertiesChanged` from every object.
   async fn subscribe(&self) -> Result<mpsc::Receiver<PropertyChange>>;
}

/// Fetches a string property of the device interface.
pub async fn device_string(bus: &impl BusSession, path: &str, name: &str) -> Result<String> {
   let value = bus.property(path, DEVICE_IFACE, name).await?;
   props::as_string(&value).ok_or_else(|| MonitorError::NotFound(format!("{name} at {path}")))
}

/// Cloneable handle to the system bus.
#[derive(Clone)]
pub struct ZbusSession {
   conn: Connection,
}

impl ZbusSession {
   /// Connects to the system bus.
   pub async fn system() -> Result<Self> {
      let conn = Connection::system()
         .await
         .map_err(MonitorError::BusUnavailable)?;
      Ok(Self { conn })
   }
}

impl BusSession for ZbusSession {
   async fn managed_objects(&self) -> Result<ManagedObjectTree> {
      const METHOD: &str = "GetManagedObjects";
      let reply = self
         .conn
         .call_method(Some(BLUEZ_SERVICE), "/", Some(OBJECT_MANAGER_IFACE), METHOD, &())
         .await
         .map_err(MonitorError::call_failed(METHOD))?;
      let objects: HashMap<OwnedObjectPath, InterfaceMap> = reply
         .body()
         .deserialize()
         .map_err(MonitorError::call_failed(METHOD))?;

      Ok(ManagedObjectTree::from_objects(
         objects
            .into_iter()
            .map(|(path, ifaces)| (path.as_str().to_owned(), ifaces)),
      ))
   }

   async fn property(&self, path: &str, interface: &str, name: &str) -> Result<OwnedValue> {
      const METHOD: &str = "Get";
      let reply = self
         .conn
         .call_method(
            Some(BLUEZ_SERVICE),
            path,
            Some(PROPERTIES_IFACE),
            METHOD,
            &(interface, name),
         )
         .await
         .map_err(MonitorError::call_failed(METHOD))?;
      reply
         .body()
         .deserialize()
         .map_err(MonitorError::call_failed(METHOD))
   }

   async fn adapter_device_path(&self, adapter: &str, address: &str) -> Result<String> {
      // Adapter1 has no address lookup; ask the tree, which records each
      // device's owning adapter.
      let tree = self.managed_objects().await?;
      if !tree.has_adapter(adapter) {
         return Err(MonitorError::NotFound(format!("adapter {adapter}")));
      }
      tree
         .device_on_adapter(adapter, address)
         .map(str::to_owned)
         .ok_or_else(|| MonitorError::NotFound(format!("{address} on {adapter}")))
   }

   async fn subscribe(&self) -> Result<mpsc::Receiver<PropertyChange>> {
      let rule = MatchRule::builder()
         .msg_type(message::Type::Signal)
         .interface(PROPERTIES_IFACE)?
         .member("PropertiesChanged")?
         .build();
      let mut stream =
         MessageStream::for_match_rule(rule, &self.conn, Some(SIGNAL_QUEUE_SIZE)).await?;

      let (tx, rx) = mpsc::channel(SIGNAL_QUEUE_SIZE);
      tokio::spawn(async move {
         while let Some(msg) = stream.next().await {
            let msg = match msg {
               Ok(msg) => msg,
               Err(e) => {
                  warn!("Error reading PropertiesChanged: {e}");
                  continue;
               },
            };
            let Some(change) = PropertyChange::from_message(&msg) else {
               continue;
            };
            if tx.send(change).await.is_err() {
               break;
            }
         }
         debug!("PropertiesChanged stream closed");
      });

      Ok(rx)
   }
}
