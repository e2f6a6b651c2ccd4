//! Characteristic read/write entry points called by the protocol layer.

use std::sync::Arc;

use heater_cooler_common::{
    AccessoryError, AccessoryInfo, AccessorySnapshot, FieldId, FieldValue, ALL_FIELDS,
};
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

use crate::{
    notify::ChangeNotifier,
    persistence::{clear_settings, persist_field, persist_settings, KeyValueStore},
    store::{AccessoryStore, Transition},
};

/// Whether a write modified the accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteResponse {
    Modified,
    Unmodified,
}

#[derive(Clone)]
pub struct Gateway {
    store: AccessoryStore,
    kv: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
    wake: Arc<Notify>,
    info: Arc<AccessoryInfo>,
    /// Orders key-value updates so the stored value always ends at the
    /// in-memory one, whatever order concurrent writes finish persisting in.
    persist_lock: Arc<Mutex<()>>,
}

impl Gateway {
    pub fn new(
        store: AccessoryStore,
        kv: Arc<dyn KeyValueStore>,
        notifier: ChangeNotifier,
        wake: Arc<Notify>,
        info: Arc<AccessoryInfo>,
    ) -> Self {
        Self {
            store,
            kv,
            notifier,
            wake,
            info,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn info(&self) -> &AccessoryInfo {
        &self.info
    }

    pub async fn snapshot(&self) -> AccessorySnapshot {
        self.store.snapshot().await
    }

    pub async fn read_field(&self, field: FieldId) -> Result<FieldValue, AccessoryError> {
        Ok(self.store.read(field).await)
    }

    pub async fn read_all(&self) -> Vec<(FieldId, FieldValue)> {
        let snapshot = self.store.snapshot().await;
        ALL_FIELDS
            .into_iter()
            .map(|field| (field, snapshot.value(field)))
            .collect()
    }

    /// Validates and applies a write. Validation failures leave the accessory
    /// untouched. Persistence failures are logged and do not undo the change.
    pub async fn write_field(
        &self,
        field: FieldId,
        value: FieldValue,
    ) -> Result<WriteResponse, AccessoryError> {
        let transition = match self.store.write(field, value).await {
            Ok(transition) => transition,
            Err(err) => {
                warn!("rejected write to {field}: {err}");
                return Err(err);
            }
        };

        if transition.is_unchanged() {
            return Ok(WriteResponse::Unmodified);
        }

        self.publish(&transition);
        self.persist_current(field).await;
        if field.descriptor().affects_operating_state {
            self.wake.notify_one();
        }

        Ok(WriteResponse::Modified)
    }

    /// Injects a simulated temperature reading.
    pub async fn set_current_temperature(
        &self,
        value: f32,
    ) -> Result<WriteResponse, AccessoryError> {
        let transition = self.store.set_current_temperature(value).await?;
        if transition.is_unchanged() {
            return Ok(WriteResponse::Unmodified);
        }
        self.publish(&transition);
        Ok(WriteResponse::Modified)
    }

    /// Lets an operator locate the accessory. Has no effect on state.
    pub fn identify(&self) -> Result<(), AccessoryError> {
        info!(
            "identify requested: {} ({} {}, serial {})",
            self.info.name, self.info.manufacturer, self.info.model, self.info.serial_number
        );
        Ok(())
    }

    /// Resets the persisted fields to factory defaults and clears the stored
    /// entries. The in-memory reset happens even if clearing storage fails.
    pub async fn restore_factory_settings(&self) -> Result<(), AccessoryError> {
        let _persist = self.persist_lock.lock().await;
        let transition = self.store.restore_defaults().await;
        self.publish(&transition);
        self.wake.notify_one();

        clear_settings(self.kv.as_ref()).await?;
        info!("factory settings restored");
        Ok(())
    }

    /// Writes every persisted field from the current state. Returns the
    /// snapshot that was flushed.
    pub async fn flush_settings(&self) -> Result<AccessorySnapshot, AccessoryError> {
        let _persist = self.persist_lock.lock().await;
        let snapshot = self.store.snapshot().await;
        persist_settings(self.kv.as_ref(), &snapshot.settings()).await?;
        Ok(snapshot)
    }

    /// Stores the live value of `field`, read under the persist lock so a
    /// slower earlier write cannot overwrite a later one.
    async fn persist_current(&self, field: FieldId) {
        let _persist = self.persist_lock.lock().await;
        let value = self.store.snapshot().await.value(field);
        if let Err(err) = persist_field(self.kv.as_ref(), field, value).await {
            warn!("failed to persist {field}: {err}");
        }
    }

    fn publish(&self, transition: &Transition) {
        self.notifier.notify_all(&transition.changes());
    }
}
