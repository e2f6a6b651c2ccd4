use serde::{Deserialize, Serialize};

use crate::types::TargetHeaterCoolerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub cooling_supported: bool,
    pub heating_supported: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            cooling_supported: true,
            heating_supported: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min_c: f32,
    pub max_c: f32,
}

impl TemperatureRange {
    pub const fn new(min_c: f32, max_c: f32) -> Self {
        Self { min_c, max_c }
    }

    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && (self.min_c..=self.max_c).contains(&value)
    }

    /// Swaps inverted bounds and replaces non-finite ones with `fallback`.
    /// Returns `true` if anything was adjusted.
    pub fn sanitize(&mut self, fallback: TemperatureRange) -> bool {
        if !self.min_c.is_finite() || !self.max_c.is_finite() {
            *self = fallback;
            return true;
        }
        if self.min_c > self.max_c {
            std::mem::swap(&mut self.min_c, &mut self.max_c);
            return true;
        }
        false
    }
}

/// Parameters of the temperature drift simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub ambient_temp_c: f32,
    /// Step per cycle while heating or cooling.
    pub active_drift_c: f32,
    /// Step per cycle toward ambient while idle or inactive.
    pub ambient_drift_c: f32,
    pub temperature_range: TemperatureRange,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ambient_temp_c: 22.0,
            active_drift_c: 0.5,
            ambient_drift_c: 0.1,
            temperature_range: TemperatureRange::new(-20.0, 60.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryConfig {
    pub capabilities: Capabilities,
    pub cooling_threshold_range: TemperatureRange,
    pub heating_threshold_range: TemperatureRange,
    pub enforce_threshold_order: bool,
    pub monitor_interval_ms: u64,
    pub simulation: SimulationConfig,
}

impl SimulationConfig {
    pub fn sanitize(&mut self) -> bool {
        let defaults = Self::default();
        let mut adjusted = self.temperature_range.sanitize(defaults.temperature_range);

        if !self.ambient_temp_c.is_finite() {
            self.ambient_temp_c = defaults.ambient_temp_c;
            adjusted = true;
        }
        let range = self.temperature_range;
        if !range.contains(self.ambient_temp_c) {
            self.ambient_temp_c = self.ambient_temp_c.clamp(range.min_c, range.max_c);
            adjusted = true;
        }

        for (step, default) in [
            (&mut self.active_drift_c, defaults.active_drift_c),
            (&mut self.ambient_drift_c, defaults.ambient_drift_c),
        ] {
            if !step.is_finite() || *step < 0.0 {
                *step = default;
                adjusted = true;
            }
        }

        adjusted
    }
}

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            cooling_threshold_range: TemperatureRange::new(10.0, 35.0),
            heating_threshold_range: TemperatureRange::new(0.0, 25.0),
            enforce_threshold_order: true,
            monitor_interval_ms: 5_000,
            simulation: SimulationConfig::default(),
        }
    }
}

impl AccessoryConfig {
    /// Repairs ranges and simulation parameters that would make the accessory
    /// reject every write or stall the monitor. Returns `true` if anything was
    /// adjusted.
    pub fn sanitize(&mut self) -> bool {
        let defaults = Self::default();
        let mut adjusted = self
            .cooling_threshold_range
            .sanitize(defaults.cooling_threshold_range);
        adjusted |= self
            .heating_threshold_range
            .sanitize(defaults.heating_threshold_range);
        adjusted |= self.simulation.sanitize();

        if self.monitor_interval_ms == 0 {
            self.monitor_interval_ms = defaults.monitor_interval_ms;
            adjusted = true;
        }

        adjusted
    }
}

/// The values the accessory owns in the key-value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    pub active: bool,
    pub target_state: TargetHeaterCoolerState,
    pub cooling_threshold_c: f32,
    pub heating_threshold_c: f32,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            active: false,
            target_state: TargetHeaterCoolerState::Automatic,
            cooling_threshold_c: 26.0,
            heating_threshold_c: 20.0,
        }
    }
}

impl PersistedSettings {
    /// Replaces values the config would reject. Returns `true` if anything was
    /// adjusted.
    pub fn sanitize(&mut self, config: &AccessoryConfig) -> bool {
        let defaults = Self::default();
        let mut adjusted = false;

        if !config.cooling_threshold_range.contains(self.cooling_threshold_c) {
            self.cooling_threshold_c = defaults.cooling_threshold_c;
            adjusted = true;
        }
        if !config.heating_threshold_range.contains(self.heating_threshold_c) {
            self.heating_threshold_c = defaults.heating_threshold_c;
            adjusted = true;
        }
        if config.enforce_threshold_order && self.heating_threshold_c > self.cooling_threshold_c {
            self.cooling_threshold_c = defaults.cooling_threshold_c;
            self.heating_threshold_c = defaults.heating_threshold_c;
            adjusted = true;
        }

        adjusted
    }
}

/// Static information published by the accessory information service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_revision: String,
    pub hardware_revision: String,
}

impl Default for AccessoryInfo {
    fn default() -> Self {
        Self {
            name: "Heater Cooler".to_string(),
            manufacturer: "Acme".to_string(),
            model: "HeaterCooler1,1".to_string(),
            serial_number: "099DB48E9E28".to_string(),
            firmware_revision: "1".to_string(),
            hardware_revision: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub accessory: AccessoryConfig,
    pub info: AccessoryInfo,
    pub http_port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            accessory: AccessoryConfig::default(),
            info: AccessoryInfo::default(),
            http_port: 8080,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sanitize_replaces_out_of_range_thresholds() {
        let config = AccessoryConfig::default();
        let mut settings = PersistedSettings {
            cooling_threshold_c: 100.0,
            heating_threshold_c: f32::NAN,
            ..PersistedSettings::default()
        };

        assert!(settings.sanitize(&config));
        assert_eq!(settings, PersistedSettings::default());
    }

    #[test]
    fn sanitize_resets_inverted_thresholds() {
        let config = AccessoryConfig::default();
        let mut settings = PersistedSettings {
            cooling_threshold_c: 15.0,
            heating_threshold_c: 24.0,
            ..PersistedSettings::default()
        };

        assert!(settings.sanitize(&config));
        assert_eq!(settings.cooling_threshold_c, 26.0);
        assert_eq!(settings.heating_threshold_c, 20.0);
    }

    #[test]
    fn sanitize_keeps_inverted_thresholds_when_order_is_not_enforced() {
        let config = AccessoryConfig {
            enforce_threshold_order: false,
            ..AccessoryConfig::default()
        };
        let mut settings = PersistedSettings {
            cooling_threshold_c: 15.0,
            heating_threshold_c: 24.0,
            ..PersistedSettings::default()
        };

        assert!(!settings.sanitize(&config));
        assert_eq!(settings.cooling_threshold_c, 15.0);
    }

    #[test]
    fn accessory_config_sanitize_repairs_ranges() {
        let mut config = AccessoryConfig {
            cooling_threshold_range: TemperatureRange::new(35.0, 10.0),
            heating_threshold_range: TemperatureRange::new(f32::NAN, 25.0),
            monitor_interval_ms: 0,
            simulation: SimulationConfig {
                ambient_temp_c: 80.0,
                active_drift_c: f32::INFINITY,
                ambient_drift_c: -0.1,
                temperature_range: TemperatureRange::new(60.0, -20.0),
            },
            ..AccessoryConfig::default()
        };

        assert!(config.sanitize());
        assert_eq!(config.cooling_threshold_range, TemperatureRange::new(10.0, 35.0));
        assert_eq!(config.heating_threshold_range, TemperatureRange::new(0.0, 25.0));
        assert_eq!(config.monitor_interval_ms, 5_000);
        assert_eq!(
            config.simulation.temperature_range,
            TemperatureRange::new(-20.0, 60.0)
        );
        assert_eq!(config.simulation.ambient_temp_c, 60.0);
        assert_eq!(config.simulation.active_drift_c, 0.5);
        assert_eq!(config.simulation.ambient_drift_c, 0.1);
    }

    #[test]
    fn accessory_config_sanitize_keeps_valid_config() {
        let mut config = AccessoryConfig::default();
        assert!(!config.sanitize());
    }

    #[test]
    fn partial_runtime_config_uses_defaults() {
        let raw = r#"{ "accessory": { "capabilities": { "cooling_supported": false } }, "http_port": 9000 }"#;
        let runtime: RuntimeConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(runtime.http_port, 9000);
        assert!(!runtime.accessory.capabilities.cooling_supported);
        assert!(runtime.accessory.capabilities.heating_supported);
        assert_eq!(runtime.accessory.monitor_interval_ms, 5_000);
        assert_eq!(runtime.info, AccessoryInfo::default());
    }
}
