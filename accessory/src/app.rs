use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use heater_cooler_common::{
    AccessoryConfig, AccessoryError, AccessoryInfo, AccessorySnapshot, AccessoryState,
    ServerState,
};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::{
    gateway::Gateway,
    monitor::{MonitorHandle, TemperatureMonitor},
    notify::ChangeNotifier,
    persistence::{load_settings, KeyValueStore},
    store::AccessoryStore,
};

/// Shared, cheaply clonable view of the application's lifecycle flags.
#[derive(Clone)]
pub struct AppStatus {
    server_state: Arc<AtomicU8>,
    monitor_running: Arc<AtomicBool>,
}

impl AppStatus {
    fn new() -> Self {
        Self {
            server_state: Arc::new(AtomicU8::new(ServerState::Idle.as_u8())),
            monitor_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn server_state(&self) -> ServerState {
        ServerState::from_u8(self.server_state.load(Ordering::Relaxed))
            .unwrap_or(ServerState::Idle)
    }

    pub fn monitor_running(&self) -> bool {
        self.monitor_running.load(Ordering::Relaxed)
    }
}

pub struct HeaterCoolerApp {
    config: AccessoryConfig,
    store: AccessoryStore,
    notifier: ChangeNotifier,
    wake: Arc<Notify>,
    gateway: Gateway,
    status: AppStatus,
    monitor: Option<MonitorHandle>,
}

impl HeaterCoolerApp {
    /// Builds the accessory, seeding it from the key-value store.
    pub async fn create(
        mut config: AccessoryConfig,
        info: AccessoryInfo,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        if config.sanitize() {
            warn!("accessory config had invalid ranges, repaired: {config:?}");
        }
        let settings = load_settings(kv.as_ref(), &config).await;
        let store = AccessoryStore::new(AccessoryState::new(config.clone(), settings));
        let notifier = ChangeNotifier::new();
        let wake = Arc::new(Notify::new());
        let gateway = Gateway::new(
            store.clone(),
            kv,
            notifier.clone(),
            wake.clone(),
            Arc::new(info),
        );

        let snapshot = store.snapshot().await;
        info!(
            "accessory created: active={}, target={}, heating {:.1} C, cooling {:.1} C",
            snapshot.active,
            snapshot.target_state.as_str(),
            snapshot.heating_threshold_c,
            snapshot.cooling_threshold_c
        );

        Self {
            config,
            store,
            notifier,
            wake,
            gateway,
            status: AppStatus::new(),
            monitor: None,
        }
    }

    pub fn gateway(&self) -> Gateway {
        self.gateway.clone()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn status(&self) -> AppStatus {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.monitor
            .as_ref()
            .is_some_and(|monitor| !monitor.is_finished())
    }

    /// Starts the temperature monitor. Calling it while running is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let monitor = TemperatureMonitor::new(
            self.store.clone(),
            self.notifier.clone(),
            self.wake.clone(),
            Duration::from_millis(self.config.monitor_interval_ms),
        );
        self.monitor = Some(monitor.spawn());
        self.status.monitor_running.store(true, Ordering::Relaxed);
    }

    /// Stops the temperature monitor and waits for it to exit.
    pub async fn stop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop().await;
        }
        self.status.monitor_running.store(false, Ordering::Relaxed);
    }

    pub async fn restore_factory_settings(&self) -> Result<(), AccessoryError> {
        self.gateway.restore_factory_settings().await
    }

    pub fn handle_server_state(&self, state: ServerState) {
        let previous = self.status.server_state();
        if previous == state {
            return;
        }
        self.status
            .server_state
            .store(state.as_u8(), Ordering::Relaxed);
        info!(
            "accessory server state: {} -> {}",
            previous.as_str(),
            state.as_str()
        );
    }

    /// Stops the monitor, flushes the persisted fields and returns the final
    /// state.
    pub async fn release(mut self) -> AccessorySnapshot {
        self.stop().await;
        match self.gateway.flush_settings().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("failed to flush accessory settings on release: {err}");
                self.store.snapshot().await
            }
        }
    }
}
