use log::info;
use zbus::{interface, object_server::SignalEmitter};

use crate::{
   accessory::{
      naming::NameResolver,
      recognition::TARGET_SERVICE,
      sources::{Bluetoothctl, CacheDirs},
   },
   bluetooth::session::ZbusSession,
};

/// Session-bus face of the monitor.
pub struct MonitorService {
   session: ZbusSession,
   resolver: NameResolver<Bluetoothctl, CacheDirs>,
}

impl MonitorService {
   pub const fn new(session: ZbusSession, resolver: NameResolver<Bluetoothctl, CacheDirs>) -> Self {
      Self { session, resolver }
   }
}

#[interface(name = "org.podmond.Monitor")]
impl MonitorService {
   async fn resolve_name(&self, address: String) -> String {
      let name = self.resolver.resolve(&self.session, &address, None).await;
      info!("Resolved {address} to {name} on request");
      name.to_string()
   }

   // Signals
   #[zbus(signal)]
   pub async fn device_connected(
      emitter: &SignalEmitter<'_>,
      address: &str,
      name: &str,
   ) -> zbus::Result<()>;

   #[zbus(signal)]
   pub async fn device_disconnected(
      emitter: &SignalEmitter<'_>,
      address: &str,
      name: &str,
   ) -> zbus::Result<()>;

   #[zbus(property)]
   async fn target_service(&self) -> String {
      TARGET_SERVICE.to_string()
   }
}
