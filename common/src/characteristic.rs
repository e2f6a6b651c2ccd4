//! Characteristic identifiers and values exchanged with the protocol layer.
//!
//! Every externally visible field of the Heater Cooler service is addressed by a
//! [`FieldId`]. Per-field rules (value format, writability, whether a change
//! can move the operating state) live in a single lookup table so the read and
//! write paths dispatch through one pair of functions.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AccessoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldId {
    Active,
    CurrentTemperature,
    CurrentHeaterCoolerState,
    TargetHeaterCoolerState,
    CoolingThresholdTemperature,
    HeatingThresholdTemperature,
}

pub const ALL_FIELDS: [FieldId; 6] = [
    FieldId::Active,
    FieldId::CurrentTemperature,
    FieldId::CurrentHeaterCoolerState,
    FieldId::TargetHeaterCoolerState,
    FieldId::CoolingThresholdTemperature,
    FieldId::HeatingThresholdTemperature,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacteristicFormat {
    UInt8,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub format: CharacteristicFormat,
    pub writable: bool,
    /// Writing this field may change the derived operating state.
    pub affects_operating_state: bool,
}

const fn descriptor(
    format: CharacteristicFormat,
    writable: bool,
    affects_operating_state: bool,
) -> FieldDescriptor {
    FieldDescriptor {
        format,
        writable,
        affects_operating_state,
    }
}

impl FieldId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::CurrentTemperature => "currentTemperature",
            Self::CurrentHeaterCoolerState => "currentHeaterCoolerState",
            Self::TargetHeaterCoolerState => "targetHeaterCoolerState",
            Self::CoolingThresholdTemperature => "coolingThresholdTemperature",
            Self::HeatingThresholdTemperature => "heatingThresholdTemperature",
        }
    }

    pub fn descriptor(self) -> FieldDescriptor {
        use CharacteristicFormat::{Float, UInt8};

        match self {
            Self::Active => descriptor(UInt8, true, true),
            Self::CurrentTemperature => descriptor(Float, false, false),
            Self::CurrentHeaterCoolerState => descriptor(UInt8, false, false),
            Self::TargetHeaterCoolerState => descriptor(UInt8, true, true),
            Self::CoolingThresholdTemperature => descriptor(Float, true, true),
            Self::HeatingThresholdTemperature => descriptor(Float, true, true),
        }
    }

    pub fn format(self) -> CharacteristicFormat {
        self.descriptor().format
    }

    pub fn is_writable(self) -> bool {
        self.descriptor().writable
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldId {
    type Err = AccessoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ALL_FIELDS
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| AccessoryError::InvalidField(value.to_string()))
    }
}

/// A characteristic value in its wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    UInt8(u8),
    Float(f32),
}

impl FieldValue {
    pub fn format(self) -> CharacteristicFormat {
        match self {
            Self::UInt8(_) => CharacteristicFormat::UInt8,
            Self::Float(_) => CharacteristicFormat::Float,
        }
    }

    pub fn as_u8(self) -> Option<u8> {
        match self {
            Self::UInt8(value) => Some(value),
            Self::Float(_) => None,
        }
    }

    pub fn as_f32(self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(value),
            Self::UInt8(_) => None,
        }
    }

    /// Converts a JSON number into the format expected by `field`.
    pub fn from_json_number(
        field: FieldId,
        number: &serde_json::Number,
    ) -> Result<Self, AccessoryError> {
        match field.format() {
            CharacteristicFormat::UInt8 => number
                .as_u64()
                .and_then(|value| u8::try_from(value).ok())
                .map(Self::UInt8)
                .ok_or_else(|| AccessoryError::validation(field, "expected an integer 0-255")),
            CharacteristicFormat::Float => number
                .as_f64()
                .map(|value| Self::Float(value as f32))
                .ok_or_else(|| AccessoryError::validation(field, "expected a number")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_names_case_insensitively() {
        assert_eq!(
            "coolingThresholdTemperature".parse::<FieldId>(),
            Ok(FieldId::CoolingThresholdTemperature)
        );
        assert_eq!("ACTIVE".parse::<FieldId>(), Ok(FieldId::Active));
        assert_eq!(
            "brightness".parse::<FieldId>(),
            Err(AccessoryError::InvalidField("brightness".to_string()))
        );
    }

    #[test]
    fn derived_fields_are_read_only() {
        assert!(!FieldId::CurrentTemperature.is_writable());
        assert!(!FieldId::CurrentHeaterCoolerState.is_writable());
        assert!(FieldId::Active.is_writable());
        assert!(FieldId::HeatingThresholdTemperature.descriptor().affects_operating_state);
    }

    #[test]
    fn json_numbers_follow_field_format() {
        let integer = serde_json::Number::from(1u8);
        assert_eq!(
            FieldValue::from_json_number(FieldId::TargetHeaterCoolerState, &integer),
            Ok(FieldValue::UInt8(1))
        );
        assert_eq!(
            FieldValue::from_json_number(FieldId::CoolingThresholdTemperature, &integer),
            Ok(FieldValue::Float(1.0))
        );

        let too_large = serde_json::Number::from(300u16);
        assert!(FieldValue::from_json_number(FieldId::Active, &too_large)
            .unwrap_err()
            .is_validation());

        let fraction = serde_json::Number::from_f64(0.5).unwrap();
        assert!(FieldValue::from_json_number(FieldId::Active, &fraction).is_err());
    }
}
