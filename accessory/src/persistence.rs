//! Key-value persistence capability and the accessory's use of it.
//!
//! The accessory owns four entries in [`KV_DOMAIN_APP`]; the live temperature
//! and operating state are never stored.

use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use heater_cooler_common::{
    keys::{decode_value, encode_value, persisted_key, KV_DOMAIN_APP, PERSISTED_FIELDS},
    AccessoryConfig, AccessoryError, FieldId, FieldValue, PersistedSettings,
    TargetHeaterCoolerState,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("key-value store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key-value store encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

impl From<PersistenceError> for AccessoryError {
    fn from(err: PersistenceError) -> Self {
        AccessoryError::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, domain: u8, key: u8) -> Result<Option<Vec<u8>>, PersistenceError>;
    async fn set(&self, domain: u8, key: u8, value: &[u8]) -> Result<(), PersistenceError>;
    async fn remove(&self, domain: u8, key: u8) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<(u8, u8), Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, domain: u8, key: u8) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().await.get(&(domain, key)).cloned())
    }

    async fn set(&self, domain: u8, key: u8, value: &[u8]) -> Result<(), PersistenceError> {
        self.entries
            .lock()
            .await
            .insert((domain, key), value.to_vec());
        Ok(())
    }

    async fn remove(&self, domain: u8, key: u8) -> Result<(), PersistenceError> {
        self.entries.lock().await.remove(&(domain, key));
        Ok(())
    }
}

/// Stores all entries in one JSON file, rewritten on every mutation.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn entry_name(domain: u8, key: u8) -> String {
        format!("{domain:02x}.{key:02x}")
    }

    async fn load(&self) -> Result<BTreeMap<String, Vec<u8>>, PersistenceError> {
        match tokio::fs::read(self.path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<(), PersistenceError> {
        let path = self.path.as_ref().clone();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(entries)?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, payload).await?;
        tokio::fs::rename(staging, path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, domain: u8, key: u8) -> Result<Option<Vec<u8>>, PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        Ok(entries.remove(&Self::entry_name(domain, key)))
    }

    async fn set(&self, domain: u8, key: u8, value: &[u8]) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(Self::entry_name(domain, key), value.to_vec());
        self.save(&entries).await
    }

    async fn remove(&self, domain: u8, key: u8) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(&Self::entry_name(domain, key)).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

/// Reads the persisted settings, falling back to defaults for missing,
/// unreadable or invalid entries.
pub async fn load_settings(kv: &dyn KeyValueStore, config: &AccessoryConfig) -> PersistedSettings {
    let mut settings = PersistedSettings::default();

    for field in PERSISTED_FIELDS {
        let Some(key) = persisted_key(field) else {
            continue;
        };
        let raw = match kv.get(KV_DOMAIN_APP, key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(err) => {
                warn!("failed to load persisted {field}: {err}");
                continue;
            }
        };
        let Some(value) = decode_value(field, &raw) else {
            warn!("ignoring malformed persisted {field} ({} bytes)", raw.len());
            continue;
        };
        if !apply_persisted(&mut settings, field, value) {
            warn!("ignoring invalid persisted {field}: {value:?}");
        }
    }

    if settings.sanitize(config) {
        warn!("persisted thresholds were out of range, using defaults");
    }
    settings
}

fn apply_persisted(settings: &mut PersistedSettings, field: FieldId, value: FieldValue) -> bool {
    match (field, value) {
        (FieldId::Active, FieldValue::UInt8(raw)) => match raw {
            0 | 1 => {
                settings.active = raw == 1;
                true
            }
            _ => false,
        },
        (FieldId::TargetHeaterCoolerState, FieldValue::UInt8(raw)) => {
            match TargetHeaterCoolerState::from_u8(raw) {
                Some(target) => {
                    settings.target_state = target;
                    true
                }
                None => false,
            }
        }
        (FieldId::CoolingThresholdTemperature, FieldValue::Float(value)) => {
            settings.cooling_threshold_c = value;
            true
        }
        (FieldId::HeatingThresholdTemperature, FieldValue::Float(value)) => {
            settings.heating_threshold_c = value;
            true
        }
        _ => false,
    }
}

/// Stores one field. Fields the accessory does not persist are ignored.
pub async fn persist_field(
    kv: &dyn KeyValueStore,
    field: FieldId,
    value: FieldValue,
) -> Result<(), PersistenceError> {
    match persisted_key(field) {
        Some(key) => kv.set(KV_DOMAIN_APP, key, &encode_value(value)).await,
        None => Ok(()),
    }
}

pub async fn persist_settings(
    kv: &dyn KeyValueStore,
    settings: &PersistedSettings,
) -> Result<(), PersistenceError> {
    let values = [
        (FieldId::Active, FieldValue::UInt8(u8::from(settings.active))),
        (
            FieldId::TargetHeaterCoolerState,
            FieldValue::UInt8(settings.target_state.as_u8()),
        ),
        (
            FieldId::CoolingThresholdTemperature,
            FieldValue::Float(settings.cooling_threshold_c),
        ),
        (
            FieldId::HeatingThresholdTemperature,
            FieldValue::Float(settings.heating_threshold_c),
        ),
    ];

    for (field, value) in values {
        persist_field(kv, field, value).await?;
    }
    Ok(())
}

/// Removes every entry the accessory owns. Attempts all keys and returns the
/// first failure.
pub async fn clear_settings(kv: &dyn KeyValueStore) -> Result<(), PersistenceError> {
    let mut first_error = None;
    for field in PERSISTED_FIELDS {
        let Some(key) = persisted_key(field) else {
            continue;
        };
        if let Err(err) = kv.remove(KV_DOMAIN_APP, key).await {
            warn!("failed to remove persisted {field}: {err}");
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
