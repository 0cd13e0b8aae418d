//! In-memory collaborators for unit tests.

use std::sync::{
   Arc,
   atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use smol_str::SmolStr;
use tokio::sync::mpsc;
use zbus::zvariant::{ObjectPath, OwnedValue, Value};

use crate::{
   accessory::sources::{InfoTool, NameCache},
   bluetooth::{
      ADAPTER_IFACE, DEVICE_IFACE,
      objects::{InterfaceMap, ManagedObjectTree},
      props::PropertyMap,
      session::{BusSession, PropertyChange},
   },
   error::{MonitorError, Result},
   event::{AccessoryEvent, EventBus},
};

pub const TARGET_UUID: &str = "74ec2172-0bad-4d01-8f77-997b2be0722a";

pub fn owned<'a>(value: impl Into<Value<'a>>) -> OwnedValue {
   OwnedValue::try_from(value.into()).unwrap()
}

pub fn change(interface: &str, changed: Vec<(&str, OwnedValue)>, path: &str) -> PropertyChange {
   PropertyChange {
      interface: interface.to_owned(),
      changed: changed
         .into_iter()
         .map(|(k, v)| (k.to_owned(), v))
         .collect(),
      sender_path: path.to_owned(),
   }
}

fn bus_down(method: &'static str) -> MonitorError {
   MonitorError::BusCallFailed {
      method,
      source: zbus::Error::Failure("bus is down".into()),
   }
}

/// A device object as BlueZ would export it. Unset fields are left out of
/// the property map entirely.
#[derive(Debug, Clone)]
pub struct FakeDevice {
   pub path: String,
   pub adapter: String,
   pub address: Option<String>,
   pub name: Option<String>,
   pub connected: Option<bool>,
   pub uuids: Option<Vec<String>>,
}

impl FakeDevice {
   pub fn new(path: &str) -> Self {
      Self {
         path: path.to_owned(),
         adapter: "/org/bluez/hci0".to_owned(),
         address: None,
         name: None,
         connected: None,
         uuids: None,
      }
   }

   /// A fully populated, connected accessory.
   pub fn accessory(path: &str, address: &str, name: &str) -> Self {
      Self::new(path)
         .address(address)
         .name(name)
         .connected(true)
         .uuids(&[TARGET_UUID])
   }

   pub fn adapter(mut self, adapter: &str) -> Self {
      self.adapter = adapter.to_owned();
      self
   }

   pub fn address(mut self, address: &str) -> Self {
      self.address = Some(address.to_owned());
      self
   }

   pub fn name(mut self, name: &str) -> Self {
      self.name = Some(name.to_owned());
      self
   }

   pub const fn connected(mut self, connected: bool) -> Self {
      self.connected = Some(connected);
      self
   }

   pub fn uuids(mut self, uuids: &[&str]) -> Self {
      self.uuids = Some(uuids.iter().map(|u| (*u).to_owned()).collect());
      self
   }

   fn props(&self) -> PropertyMap {
      let mut props = PropertyMap::new();
      props.insert(
         "Adapter".into(),
         owned(ObjectPath::try_from(self.adapter.as_str()).unwrap()),
      );
      if let Some(address) = &self.address {
         props.insert("Address".into(), owned(address.as_str()));
      }
      if let Some(name) = &self.name {
         props.insert("Name".into(), owned(name.as_str()));
      }
      if let Some(connected) = self.connected {
         props.insert("Connected".into(), owned(connected));
      }
      if let Some(uuids) = &self.uuids {
         props.insert("UUIDs".into(), owned(uuids.clone()));
      }
      props
   }
}

pub fn tree_of(adapters: &[&str], devices: &[FakeDevice]) -> ManagedObjectTree {
   let adapters = adapters.iter().map(|path| {
      let mut ifaces = InterfaceMap::new();
      ifaces.insert(ADAPTER_IFACE.to_owned(), PropertyMap::new());
      ((*path).to_owned(), ifaces)
   });
   let devices = devices.iter().map(|device| {
      let mut ifaces = InterfaceMap::new();
      ifaces.insert(DEVICE_IFACE.to_owned(), device.props());
      (device.path.clone(), ifaces)
   });
   ManagedObjectTree::from_objects(adapters.chain(devices))
}

/// Bus session backed by a fixed set of objects.
pub struct FakeBus {
   adapters: Vec<String>,
   devices: Vec<FakeDevice>,
   available: bool,
   signals: Mutex<Option<mpsc::Receiver<PropertyChange>>>,
   enumerations: AtomicUsize,
   adapter_lookups: AtomicUsize,
   property_reads: Mutex<Vec<(String, String)>>,
}

impl FakeBus {
   pub fn new(adapters: &[&str], devices: Vec<FakeDevice>) -> Self {
      Self {
         adapters: adapters.iter().map(|a| (*a).to_owned()).collect(),
         devices,
         available: true,
         signals: Mutex::new(None),
         enumerations: AtomicUsize::new(0),
         adapter_lookups: AtomicUsize::new(0),
         property_reads: Mutex::new(Vec::new()),
      }
   }

   /// Every call fails.
   pub fn unavailable() -> Self {
      Self {
         available: false,
         ..Self::new(&[], vec![])
      }
   }

   /// Attaches a signal channel, returning its sending half.
   pub fn with_signals(self) -> (Self, mpsc::Sender<PropertyChange>) {
      let (tx, rx) = mpsc::channel(16);
      *self.signals.lock() = Some(rx);
      (self, tx)
   }

   pub fn enumerations(&self) -> usize {
      self.enumerations.load(Ordering::SeqCst)
   }

   pub fn adapter_lookups(&self) -> usize {
      self.adapter_lookups.load(Ordering::SeqCst)
   }

   /// `(path, property)` pairs read so far.
   pub fn property_reads(&self) -> Vec<(String, String)> {
      self.property_reads.lock().clone()
   }
}

impl BusSession for FakeBus {
   async fn managed_objects(&self) -> Result<ManagedObjectTree> {
      self.enumerations.fetch_add(1, Ordering::SeqCst);
      if !self.available {
         return Err(bus_down("GetManagedObjects"));
      }
      let adapters: Vec<&str> = self.adapters.iter().map(String::as_str).collect();
      Ok(tree_of(&adapters, &self.devices))
   }

   async fn property(&self, path: &str, interface: &str, name: &str) -> Result<OwnedValue> {
      self
         .property_reads
         .lock()
         .push((path.to_owned(), name.to_owned()));
      if !self.available {
         return Err(bus_down("Get"));
      }
      self
         .devices
         .iter()
         .find(|d| d.path == path && interface == DEVICE_IFACE)
         .and_then(|d| d.props().remove(name))
         .ok_or_else(|| MonitorError::NotFound(format!("{name} at {path}")))
   }

   async fn adapter_device_path(&self, adapter: &str, address: &str) -> Result<String> {
      self.adapter_lookups.fetch_add(1, Ordering::SeqCst);
      if !self.available {
         return Err(bus_down("GetManagedObjects"));
      }
      self
         .devices
         .iter()
         .find(|d| {
            d.adapter == adapter
               && d
                  .address
                  .as_deref()
                  .is_some_and(|a| a.eq_ignore_ascii_case(address))
         })
         .map(|d| d.path.clone())
         .ok_or_else(|| MonitorError::NotFound(format!("{address} on {adapter}")))
   }

   async fn subscribe(&self) -> Result<mpsc::Receiver<PropertyChange>> {
      if !self.available {
         return Err(bus_down("AddMatch"));
      }
      self
         .signals
         .lock()
         .take()
         .ok_or_else(|| MonitorError::NotFound("signal channel".into()))
   }
}

/// Device-info tool with a canned reply.
#[derive(Clone)]
pub struct FakeTool {
   reply: Option<String>,
   calls: Arc<AtomicUsize>,
}

impl FakeTool {
   pub fn replying(output: &str) -> Self {
      Self {
         reply: Some(output.to_owned()),
         calls: Arc::default(),
      }
   }

   pub fn failing() -> Self {
      Self {
         reply: None,
         calls: Arc::default(),
      }
   }

   pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
   }
}

impl InfoTool for FakeTool {
   async fn info(&self, _address: &str) -> Result<String> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self
         .reply
         .clone()
         .ok_or_else(|| MonitorError::ExternalToolFailure("exit status: 1".into()))
   }
}

#[derive(Clone)]
pub struct FakeCache {
   name: Option<SmolStr>,
   calls: Arc<AtomicUsize>,
}

impl FakeCache {
   pub fn with_name(name: &str) -> Self {
      Self {
         name: Some(name.into()),
         calls: Arc::default(),
      }
   }

   pub fn empty() -> Self {
      Self {
         name: None,
         calls: Arc::default(),
      }
   }

   pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
   }
}

impl NameCache for FakeCache {
   fn lookup(&self, _address: &str) -> Option<SmolStr> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.name.clone()
   }
}

/// Collects emitted events.
#[derive(Default)]
pub struct RecordingEvents {
   events: Mutex<Vec<AccessoryEvent>>,
}

impl RecordingEvents {
   pub fn take(&self) -> Vec<AccessoryEvent> {
      std::mem::take(&mut *self.events.lock())
   }
}

impl EventBus for RecordingEvents {
   fn emit(&self, event: AccessoryEvent) {
      self.events.lock().push(event);
   }
}
