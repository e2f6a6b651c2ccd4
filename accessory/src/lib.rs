pub mod app;
pub mod gateway;
pub mod monitor;
pub mod notify;
pub mod persistence;
pub mod server;
pub mod store;

pub use app::{AppStatus, HeaterCoolerApp};
pub use gateway::{Gateway, WriteResponse};
pub use monitor::{MonitorHandle, TemperatureMonitor};
pub use notify::{ChangeEvent, ChangeNotifier};
pub use persistence::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistenceError};
pub use store::{AccessoryStore, CycleOutcome, Transition};
