use crate::characteristic::{CharacteristicFormat, FieldId, FieldValue};

pub const KV_DOMAIN_APP: u8 = 0x00;

pub const KV_KEY_ACTIVE: u8 = 0x00;
pub const KV_KEY_TARGET_STATE: u8 = 0x01;
pub const KV_KEY_COOLING_THRESHOLD: u8 = 0x02;
pub const KV_KEY_HEATING_THRESHOLD: u8 = 0x03;

pub const PERSISTED_FIELDS: [FieldId; 4] = [
    FieldId::Active,
    FieldId::TargetHeaterCoolerState,
    FieldId::CoolingThresholdTemperature,
    FieldId::HeatingThresholdTemperature,
];

pub fn persisted_key(field: FieldId) -> Option<u8> {
    match field {
        FieldId::Active => Some(KV_KEY_ACTIVE),
        FieldId::TargetHeaterCoolerState => Some(KV_KEY_TARGET_STATE),
        FieldId::CoolingThresholdTemperature => Some(KV_KEY_COOLING_THRESHOLD),
        FieldId::HeatingThresholdTemperature => Some(KV_KEY_HEATING_THRESHOLD),
        FieldId::CurrentTemperature | FieldId::CurrentHeaterCoolerState => None,
    }
}

pub fn encode_value(value: FieldValue) -> Vec<u8> {
    match value {
        FieldValue::UInt8(value) => vec![value],
        FieldValue::Float(value) => value.to_le_bytes().to_vec(),
    }
}

/// Decodes a stored entry. Returns `None` for entries of the wrong size.
pub fn decode_value(field: FieldId, bytes: &[u8]) -> Option<FieldValue> {
    match field.format() {
        CharacteristicFormat::UInt8 => match bytes {
            [value] => Some(FieldValue::UInt8(*value)),
            _ => None,
        },
        CharacteristicFormat::Float => {
            let raw: [u8; 4] = bytes.try_into().ok()?;
            Some(FieldValue::Float(f32::from_le_bytes(raw)))
        }
    }
}
