//! Background temperature monitor.
//!
//! Each cycle drifts the simulated temperature, re-derives the operating state
//! under the store lock, then publishes every changed field after the lock is
//! released. Gateway writes that can move the operating state wake the loop
//! early; a wake re-evaluates the state and restarts the drift interval.
//!
//! The loop exits at the next suspension point after `stop` is requested, so
//! shutdown latency is bounded by one cycle. A failed cycle is logged and the
//! loop carries on.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    notify::ChangeNotifier,
    store::{AccessoryStore, CycleOutcome},
};

pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop and waits for it to exit. No mutation or notification
    /// from the loop happens after this returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!("temperature monitor task ended abnormally: {err}");
        }
    }
}

pub struct TemperatureMonitor {
    store: AccessoryStore,
    notifier: ChangeNotifier,
    wake: Arc<Notify>,
    period: Duration,
}

impl TemperatureMonitor {
    pub fn new(
        store: AccessoryStore,
        notifier: ChangeNotifier,
        wake: Arc<Notify>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            wake,
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn spawn(self) -> MonitorHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "temperature monitor started ({} ms interval)",
            self.period.as_millis()
        );

        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let outcome = self.store.advance().await;
                    self.publish("cycle", outcome);
                }
                _ = self.wake.notified() => {
                    interval.reset();
                    let outcome = self.store.reevaluate().await;
                    self.publish("wake", outcome);
                }
            }
        }

        info!("temperature monitor stopped");
    }

    fn publish(&self, trigger: &str, outcome: CycleOutcome) {
        if let Some(fault) = outcome.fault {
            error!("monitor {trigger} corrected accessory state: {fault}");
        }

        let changes = outcome.transition.changes();
        if changes.is_empty() {
            return;
        }
        debug!(
            "monitor {trigger}: {:.1} C, {}",
            outcome.transition.after.current_temp_c,
            outcome.transition.after.current_state.as_str()
        );
        self.notifier.notify_all(&changes);
    }
}

#[cfg(test)]
mod tests {
    use heater_cooler_common::{
        AccessoryConfig, AccessoryState, CurrentHeaterCoolerState, FieldId, FieldValue,
        PersistedSettings, SimulationConfig, TemperatureRange,
    };
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    const PERIOD: Duration = Duration::from_secs(5);

    fn store(active: bool) -> AccessoryStore {
        AccessoryStore::new(AccessoryState::new(
            AccessoryConfig::default(),
            PersistedSettings {
                active,
                ..PersistedSettings::default()
            },
        ))
    }

    fn spawn_monitor(
        store: &AccessoryStore,
        notifier: &ChangeNotifier,
    ) -> (MonitorHandle, Arc<Notify>) {
        let wake = Arc::new(Notify::new());
        let handle =
            TemperatureMonitor::new(store.clone(), notifier.clone(), wake.clone(), PERIOD).spawn();
        (handle, wake)
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_heats_and_notifies() {
        let store = store(true);
        store.set_current_temperature(19.0).await.unwrap();
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        let (handle, _wake) = spawn_monitor(&store, &notifier);

        tokio::time::sleep(PERIOD + Duration::from_millis(100)).await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.field, FieldId::CurrentTemperature);
        assert_eq!(event.value, FieldValue::Float(19.5));
        assert_eq!(store.snapshot().await.current_temp_c, 19.5);

        tokio::time::sleep(PERIOD).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.current_temp_c, 20.0);
        assert_eq!(snapshot.current_state, CurrentHeaterCoolerState::Idle);
        assert_eq!(rx.try_recv().unwrap().field, FieldId::CurrentTemperature);
        assert_eq!(
            rx.try_recv().unwrap().value,
            FieldValue::UInt8(CurrentHeaterCoolerState::Idle.as_u8())
        );

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_changes_after_stop() {
        let store = store(false);
        store.set_current_temperature(30.0).await.unwrap();
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        let (handle, _wake) = spawn_monitor(&store, &notifier);

        tokio::time::sleep(PERIOD + Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_ok());

        handle.stop().await;
        let frozen = store.snapshot().await;

        tokio::time::sleep(PERIOD * 5).await;

        assert_eq!(store.snapshot().await, frozen);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_returns_before_first_cycle() {
        let store = store(true);
        let notifier = ChangeNotifier::new();
        let (handle, _wake) = spawn_monitor(&store, &notifier);
        let before = store.snapshot().await;

        handle.stop().await;

        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn wake_restarts_drift_interval() {
        let store = store(true);
        store.set_current_temperature(25.0).await.unwrap();
        let notifier = ChangeNotifier::new();
        let (handle, wake) = spawn_monitor(&store, &notifier);

        tokio::time::sleep(Duration::from_secs(4)).await;
        wake.notify_one();
        tokio::time::sleep(Duration::from_secs(2)).await;

        // The original tick at 5s was pushed back to 9s by the wake at 4s.
        assert_eq!(store.snapshot().await.current_temp_c, 25.0);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(store.snapshot().await.current_temp_c < 25.0);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn inverted_simulation_band_does_not_stop_monitor() {
        let config = AccessoryConfig {
            simulation: SimulationConfig {
                temperature_range: TemperatureRange::new(60.0, -20.0),
                ..SimulationConfig::default()
            },
            ..AccessoryConfig::default()
        };
        let store = AccessoryStore::new(AccessoryState::new(
            config,
            PersistedSettings {
                active: true,
                ..PersistedSettings::default()
            },
        ));
        store.set_current_temperature(25.0).await.unwrap();
        let notifier = ChangeNotifier::new();
        let (handle, _wake) = spawn_monitor(&store, &notifier);

        tokio::time::sleep(PERIOD * 3 + Duration::from_millis(100)).await;

        assert!(!handle.is_finished());
        assert!(store.snapshot().await.current_temp_c < 25.0);
        handle.stop().await;
    }
}
