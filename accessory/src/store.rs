//! Lock-guarded handle over the single [`AccessoryState`].
//!
//! Every operation takes the lock once, applies its change (including the
//! re-derived operating state) and captures before/after snapshots inside the
//! same critical section. Diffing, persistence and notification happen on the
//! returned [`Transition`] after the lock is released.

use std::sync::Arc;

use heater_cooler_common::{AccessoryError, AccessorySnapshot, AccessoryState, FieldId, FieldValue};
use tokio::sync::Mutex;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub before: AccessorySnapshot,
    pub after: AccessorySnapshot,
}

impl Transition {
    pub fn changes(&self) -> Vec<(FieldId, FieldValue)> {
        self.before.changed_fields(&self.after)
    }

    pub fn is_unchanged(&self) -> bool {
        self.before == self.after
    }
}

/// Result of one monitor cycle. `fault` carries an invariant violation that
/// was detected and already corrected during the cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub transition: Transition,
    pub fault: Option<AccessoryError>,
}

#[derive(Clone)]
pub struct AccessoryStore {
    state: Arc<Mutex<AccessoryState>>,
}

impl AccessoryStore {
    pub fn new(state: AccessoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn snapshot(&self) -> AccessorySnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn read(&self, field: FieldId) -> FieldValue {
        let mut state = self.state.lock().await;
        if let Err(err) = state.verify() {
            error!("corrected accessory state before read of {field}: {err}");
        }
        state.read(field)
    }

    pub async fn write(
        &self,
        field: FieldId,
        value: FieldValue,
    ) -> Result<Transition, AccessoryError> {
        let mut state = self.state.lock().await;
        let before = state.snapshot();
        state.write(field, value)?;
        Ok(Transition {
            before,
            after: state.snapshot(),
        })
    }

    pub async fn set_current_temperature(&self, value: f32) -> Result<Transition, AccessoryError> {
        let mut state = self.state.lock().await;
        let before = state.snapshot();
        state.set_current_temperature(value)?;
        Ok(Transition {
            before,
            after: state.snapshot(),
        })
    }

    /// Drift the temperature one step and re-derive the operating state.
    pub async fn advance(&self) -> CycleOutcome {
        let mut state = self.state.lock().await;
        let before = state.snapshot();
        let fault = state.advance().err();
        CycleOutcome {
            transition: Transition {
                before,
                after: state.snapshot(),
            },
            fault,
        }
    }

    /// Re-derive the operating state without moving the temperature.
    pub async fn reevaluate(&self) -> CycleOutcome {
        let mut state = self.state.lock().await;
        let before = state.snapshot();
        let fault = state.verify().err();
        CycleOutcome {
            transition: Transition {
                before,
                after: state.snapshot(),
            },
            fault,
        }
    }

    pub async fn restore_defaults(&self) -> Transition {
        let mut state = self.state.lock().await;
        let before = state.snapshot();
        state.restore_defaults();
        Transition {
            before,
            after: state.snapshot(),
        }
    }
}
