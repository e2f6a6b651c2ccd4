use serde::Serialize;

use crate::{
    characteristic::{FieldId, FieldValue, ALL_FIELDS},
    config::{AccessoryConfig, Capabilities, PersistedSettings},
    error::AccessoryError,
    simulation::advance_temperature,
    transition::{derive_operating_state, OperatingInputs},
    types::{active_as_u8, active_from_u8, CurrentHeaterCoolerState, TargetHeaterCoolerState},
};

/// Consistent copy of every characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccessorySnapshot {
    pub active: bool,
    #[serde(rename = "currentTemperature")]
    pub current_temp_c: f32,
    #[serde(rename = "currentState")]
    pub current_state: CurrentHeaterCoolerState,
    #[serde(rename = "targetState")]
    pub target_state: TargetHeaterCoolerState,
    #[serde(rename = "coolingThreshold")]
    pub cooling_threshold_c: f32,
    #[serde(rename = "heatingThreshold")]
    pub heating_threshold_c: f32,
}

impl AccessorySnapshot {
    pub fn value(&self, field: FieldId) -> FieldValue {
        match field {
            FieldId::Active => FieldValue::UInt8(active_as_u8(self.active)),
            FieldId::CurrentTemperature => FieldValue::Float(self.current_temp_c),
            FieldId::CurrentHeaterCoolerState => FieldValue::UInt8(self.current_state.as_u8()),
            FieldId::TargetHeaterCoolerState => FieldValue::UInt8(self.target_state.as_u8()),
            FieldId::CoolingThresholdTemperature => FieldValue::Float(self.cooling_threshold_c),
            FieldId::HeatingThresholdTemperature => FieldValue::Float(self.heating_threshold_c),
        }
    }

    /// Fields whose value differs in `after`, with their new values.
    pub fn changed_fields(&self, after: &AccessorySnapshot) -> Vec<(FieldId, FieldValue)> {
        ALL_FIELDS
            .into_iter()
            .filter_map(|field| {
                let new_value = after.value(field);
                (self.value(field) != new_value).then_some((field, new_value))
            })
            .collect()
    }

    pub fn operating_inputs(&self, capabilities: Capabilities) -> OperatingInputs {
        OperatingInputs {
            active: self.active,
            target: self.target_state,
            current_temp_c: self.current_temp_c,
            heating_threshold_c: self.heating_threshold_c,
            cooling_threshold_c: self.cooling_threshold_c,
            capabilities,
        }
    }

    pub fn settings(&self) -> PersistedSettings {
        PersistedSettings {
            active: self.active,
            target_state: self.target_state,
            cooling_threshold_c: self.cooling_threshold_c,
            heating_threshold_c: self.heating_threshold_c,
        }
    }

    pub fn check_invariants(&self, config: &AccessoryConfig) -> Result<(), AccessoryError> {
        if !self.current_temp_c.is_finite() {
            return Err(AccessoryError::InvariantViolation(format!(
                "current temperature is not finite ({})",
                self.current_temp_c
            )));
        }

        let expected = derive_operating_state(&self.operating_inputs(config.capabilities));
        if self.current_state != expected {
            return Err(AccessoryError::InvariantViolation(format!(
                "current state {} does not match derived state {}",
                self.current_state.as_str(),
                expected.as_str()
            )));
        }

        if config.enforce_threshold_order && self.heating_threshold_c > self.cooling_threshold_c {
            return Err(AccessoryError::InvariantViolation(format!(
                "heating threshold {} above cooling threshold {}",
                self.heating_threshold_c, self.cooling_threshold_c
            )));
        }

        Ok(())
    }
}

/// Authoritative accessory state. All mutation goes through validated setters
/// which re-derive the operating state before returning, so a caller holding
/// the state behind one lock never exposes a half-applied transition.
#[derive(Debug, Clone)]
pub struct AccessoryState {
    config: AccessoryConfig,

    active: bool,
    current_temp_c: f32,
    current_state: CurrentHeaterCoolerState,
    target_state: TargetHeaterCoolerState,
    cooling_threshold_c: f32,
    heating_threshold_c: f32,
}

impl AccessoryState {
    pub fn new(mut config: AccessoryConfig, mut settings: PersistedSettings) -> Self {
        config.sanitize();
        settings.sanitize(&config);
        let current_temp_c = config.simulation.ambient_temp_c;
        let mut state = Self {
            config,
            active: settings.active,
            current_temp_c,
            current_state: CurrentHeaterCoolerState::Inactive,
            target_state: settings.target_state,
            cooling_threshold_c: settings.cooling_threshold_c,
            heating_threshold_c: settings.heating_threshold_c,
        };
        state.refresh_operating_state();
        state
    }

    pub fn config(&self) -> &AccessoryConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.config.capabilities
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_temp_c(&self) -> f32 {
        self.current_temp_c
    }

    pub fn current_state(&self) -> CurrentHeaterCoolerState {
        self.current_state
    }

    pub fn target_state(&self) -> TargetHeaterCoolerState {
        self.target_state
    }

    pub fn cooling_threshold_c(&self) -> f32 {
        self.cooling_threshold_c
    }

    pub fn heating_threshold_c(&self) -> f32 {
        self.heating_threshold_c
    }

    pub fn settings(&self) -> PersistedSettings {
        self.snapshot().settings()
    }

    pub fn snapshot(&self) -> AccessorySnapshot {
        AccessorySnapshot {
            active: self.active,
            current_temp_c: self.current_temp_c,
            current_state: self.current_state,
            target_state: self.target_state,
            cooling_threshold_c: self.cooling_threshold_c,
            heating_threshold_c: self.heating_threshold_c,
        }
    }

    pub fn read(&self, field: FieldId) -> FieldValue {
        self.snapshot().value(field)
    }

    /// Validates `value` for `field` and applies it. Returns whether anything
    /// changed. On error the state is untouched.
    pub fn write(&mut self, field: FieldId, value: FieldValue) -> Result<bool, AccessoryError> {
        if !field.is_writable() {
            return Err(AccessoryError::ReadOnly(field));
        }
        if value.format() != field.format() {
            return Err(AccessoryError::validation(
                field,
                format!("expected {:?} value", field.format()),
            ));
        }

        match field {
            FieldId::Active => {
                let active = value
                    .as_u8()
                    .and_then(active_from_u8)
                    .ok_or_else(|| AccessoryError::validation(field, "expected 0 or 1"))?;
                Ok(self.set_active(active))
            }
            FieldId::TargetHeaterCoolerState => {
                let target = value
                    .as_u8()
                    .and_then(TargetHeaterCoolerState::from_u8)
                    .ok_or_else(|| AccessoryError::validation(field, "expected 0, 1 or 2"))?;
                Ok(self.set_target_state(target))
            }
            FieldId::CoolingThresholdTemperature => {
                let value = value.as_f32().unwrap_or(f32::NAN);
                self.set_cooling_threshold(value)
            }
            FieldId::HeatingThresholdTemperature => {
                let value = value.as_f32().unwrap_or(f32::NAN);
                self.set_heating_threshold(value)
            }
            FieldId::CurrentTemperature | FieldId::CurrentHeaterCoolerState => {
                Err(AccessoryError::ReadOnly(field))
            }
        }
    }

    pub fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        self.refresh_operating_state() || changed
    }

    pub fn set_target_state(&mut self, target: TargetHeaterCoolerState) -> bool {
        let changed = self.target_state != target;
        self.target_state = target;
        self.refresh_operating_state() || changed
    }

    pub fn set_cooling_threshold(&mut self, value: f32) -> Result<bool, AccessoryError> {
        let field = FieldId::CoolingThresholdTemperature;
        let range = self.config.cooling_threshold_range;
        if !range.contains(value) {
            return Err(AccessoryError::validation(
                field,
                format!("{value} outside {}..={}", range.min_c, range.max_c),
            ));
        }
        if self.config.enforce_threshold_order && value < self.heating_threshold_c {
            return Err(AccessoryError::validation(
                field,
                format!(
                    "{value} below heating threshold {}",
                    self.heating_threshold_c
                ),
            ));
        }

        let changed = (self.cooling_threshold_c - value).abs() > f32::EPSILON;
        self.cooling_threshold_c = value;
        Ok(self.refresh_operating_state() || changed)
    }

    pub fn set_heating_threshold(&mut self, value: f32) -> Result<bool, AccessoryError> {
        let field = FieldId::HeatingThresholdTemperature;
        let range = self.config.heating_threshold_range;
        if !range.contains(value) {
            return Err(AccessoryError::validation(
                field,
                format!("{value} outside {}..={}", range.min_c, range.max_c),
            ));
        }
        if self.config.enforce_threshold_order && value > self.cooling_threshold_c {
            return Err(AccessoryError::validation(
                field,
                format!(
                    "{value} above cooling threshold {}",
                    self.cooling_threshold_c
                ),
            ));
        }

        let changed = (self.heating_threshold_c - value).abs() > f32::EPSILON;
        self.heating_threshold_c = value;
        Ok(self.refresh_operating_state() || changed)
    }

    /// Injects a temperature reading, bypassing the drift model.
    pub fn set_current_temperature(&mut self, value: f32) -> Result<bool, AccessoryError> {
        let range = self.config.simulation.temperature_range;
        if !range.contains(value) {
            return Err(AccessoryError::validation(
                FieldId::CurrentTemperature,
                format!("{value} outside {}..={}", range.min_c, range.max_c),
            ));
        }

        let changed = (self.current_temp_c - value).abs() > f32::EPSILON;
        self.current_temp_c = value;
        Ok(self.refresh_operating_state() || changed)
    }

    /// One simulation step: drift the temperature according to the current
    /// operating state, then re-derive the state from the new reading.
    ///
    /// A detected inconsistency is corrected before returning and reported as
    /// an error so the caller can log it; the state is valid either way.
    pub fn advance(&mut self) -> Result<(), AccessoryError> {
        let fault = self.verify().err();

        let next = advance_temperature(
            self.current_temp_c,
            self.current_state,
            self.heating_threshold_c,
            self.cooling_threshold_c,
            &self.config.simulation,
        );
        self.current_temp_c = next;
        self.refresh_operating_state();

        let fault = fault.or_else(|| self.verify().err());
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Checks the invariants and repairs any violation by recomputation.
    pub fn verify(&mut self) -> Result<(), AccessoryError> {
        let result = self.snapshot().check_invariants(&self.config);
        if result.is_err() {
            if !self.current_temp_c.is_finite() {
                self.current_temp_c = self.config.simulation.ambient_temp_c;
            }
            if self.config.enforce_threshold_order
                && self.heating_threshold_c > self.cooling_threshold_c
            {
                let defaults = PersistedSettings::default();
                self.cooling_threshold_c = defaults.cooling_threshold_c;
                self.heating_threshold_c = defaults.heating_threshold_c;
            }
            self.refresh_operating_state();
        }
        result
    }

    /// Resets every persisted field to its factory default. The live
    /// temperature is kept.
    pub fn restore_defaults(&mut self) {
        let defaults = PersistedSettings::default();
        self.active = defaults.active;
        self.target_state = defaults.target_state;
        self.cooling_threshold_c = defaults.cooling_threshold_c;
        self.heating_threshold_c = defaults.heating_threshold_c;
        self.refresh_operating_state();
    }

    fn refresh_operating_state(&mut self) -> bool {
        let next = derive_operating_state(&self.snapshot().operating_inputs(self.capabilities()));
        let changed = next != self.current_state;
        self.current_state = next;
        changed
    }
}
