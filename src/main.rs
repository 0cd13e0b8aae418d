//! AirPods connection monitor.
//!
//! This daemon watches BlueZ on the system D-Bus for AirPods-class
//! accessories connecting and disconnecting, resolves a display name for
//! each, and re-publishes the notifications on the session bus.

use std::{sync::Arc, time::Duration};

use crossbeam::queue::SegQueue;
use log::{debug, info, warn};
use tokio::{select, signal, sync::Notify, time};
use zbus::{Connection, connection, object_server::InterfaceRef};

use accessory::{
   naming::NameResolver,
   sources::{Bluetoothctl, CacheDirs},
};
use bluetooth::{session::ZbusSession, watcher::ConnectionWatcher};
use dbus::MonitorService;
use event::{AccessoryEvent, AccessoryEventKind, EventBus};

mod accessory;
mod bluetooth;
mod config;
mod dbus;
mod error;
mod event;
#[cfg(test)]
mod testing;

use crate::{dbus::MonitorServiceSignals, error::Result};

const SERVICE_NAME: &str = "org.podmond";
const SERVICE_PATH: &str = "/org/podmond/monitor";

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   info!("Starting podmond...");

   let config = config::Config::load()?;
   info!(
      "Loaded configuration with {} cache directories, device-info tool {}",
      config.cache_dirs.len(),
      config.info_tool
   );

   let session = match ZbusSession::system().await {
      Ok(session) => session,
      Err(e) => {
         warn!("Failed to connect to system D-Bus: {e}");
         signal::ctrl_c().await?;
         return Ok(());
      },
   };

   let resolver = NameResolver::new(
      Bluetoothctl::new(config.info_tool.clone(), config.info_tool_timeout()),
      CacheDirs::new(config.cache_dirs.clone()),
   );

   let event_bus = EventProcessor::new();

   // Keeps the session-bus name owned for the lifetime of the process.
   let exported = if config.export_signals {
      let service = MonitorService::new(session.clone(), resolver.clone());
      match export_service(service).await {
         Ok(connection) => {
            info!("podmond D-Bus service started at {SERVICE_NAME}");
            Some(connection)
         },
         Err(e) => {
            warn!("Failed to export session-bus service, notifications stay local: {e}");
            None
         },
      }
   } else {
      None
   };

   event_bus.clone().spawn_dispatcher(exported.as_ref()).await?;

   let watcher = ConnectionWatcher::new(session, resolver, event_bus);
   select! {
      () = watcher.run() => {
         warn!("No longer receiving bus signals, monitor is idle");
      }
      res = signal::ctrl_c() => {
         res?;
         info!("Shutting down podmond...");
         return Ok(());
      }
   }

   signal::ctrl_c().await?;
   info!("Shutting down podmond...");

   Ok(())
}

async fn export_service(service: MonitorService) -> Result<Connection> {
   Ok(connection::Builder::session()?
      .name(SERVICE_NAME)?
      .serve_at(SERVICE_PATH, service)?
      .build()
      .await?)
}

struct EventProcessor {
   queue: SegQueue<AccessoryEvent>,
   notifier: Notify,
}

impl EventProcessor {
   fn new() -> Arc<Self> {
      Arc::new(Self {
         queue: SegQueue::new(),
         notifier: Notify::new(),
      })
   }
}

impl EventProcessor {
   async fn recv(self: &Arc<Self>) -> Option<AccessoryEvent> {
      loop {
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         let notify = self.notifier.notified();
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         if Arc::strong_count(self) == 1 {
            return None;
         }
         let _ = time::timeout(Duration::from_secs(1), notify).await;
      }
   }

   async fn dispatch(
      &self,
      iface: Option<&InterfaceRef<MonitorService>>,
      event: AccessoryEvent,
   ) -> Result<()> {
      debug!("Dispatching {:?}", event);
      let Some(iface) = iface else {
         return Ok(());
      };
      match event.kind {
         AccessoryEventKind::Connected => {
            iface.device_connected(&event.address, &event.name).await?;
         },
         AccessoryEventKind::Disconnected => {
            iface
               .device_disconnected(&event.address, &event.name)
               .await?;
         },
      }
      Ok(())
   }

   async fn spawn_dispatcher(self: Arc<Self>, connection: Option<&Connection>) -> Result<()> {
      let iface = match connection {
         Some(connection) => Some(
            connection
               .object_server()
               .interface::<_, MonitorService>(SERVICE_PATH)
               .await?,
         ),
         None => None,
      };
      tokio::spawn(async move {
         while let Some(event) = self.recv().await {
            if let Err(e) = self.dispatch(iface.as_ref(), event).await {
               warn!("Error dispatching event: {e}");
            }
         }
      });

      Ok(())
   }
}

impl EventBus for EventProcessor {
   fn emit(&self, event: AccessoryEvent) {
      self.queue.push(event);
      self.notifier.notify_waiters();
   }
}
