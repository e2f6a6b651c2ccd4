use thiserror::Error;

use crate::characteristic::FieldId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessoryError {
    #[error("invalid value for {field}: {reason}")]
    Validation { field: FieldId, reason: String },

    #[error("unknown characteristic: {0}")]
    InvalidField(String),

    #[error("characteristic {0} is read-only")]
    ReadOnly(FieldId),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("internal invariant violation: {0}")]
    InvariantViolation(String),
}

impl AccessoryError {
    pub fn validation(field: FieldId, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
