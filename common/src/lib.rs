pub mod characteristic;
pub mod config;
pub mod error;
pub mod keys;
pub mod simulation;
pub mod state;
pub mod transition;
pub mod types;

pub use characteristic::{CharacteristicFormat, FieldId, FieldValue, ALL_FIELDS};
pub use config::{
    AccessoryConfig, AccessoryInfo, Capabilities, PersistedSettings, RuntimeConfig,
    SimulationConfig, TemperatureRange,
};
pub use error::AccessoryError;
pub use state::{AccessorySnapshot, AccessoryState};
pub use transition::{derive_operating_state, OperatingInputs};
pub use types::{CurrentHeaterCoolerState, ServerState, TargetHeaterCoolerState};
