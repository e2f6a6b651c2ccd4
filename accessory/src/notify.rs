//! Change notifications owed to subscribed controllers.
//!
//! The accessory only decides that a value changed; delivery belongs to
//! whoever subscribes (the protocol layer). Publishing never blocks and never
//! fails from the caller's point of view.

use heater_cooler_common::{FieldId, FieldValue};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub field: FieldId,
    pub value: FieldValue,
}

#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn notify_changed(&self, field: FieldId, value: FieldValue) {
        if self.sender.send(ChangeEvent { field, value }).is_err() {
            debug!("no subscribers for {field} change");
        }
    }

    pub fn notify_all(&self, changes: &[(FieldId, FieldValue)]) {
        for (field, value) in changes {
            self.notify_changed(*field, *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_each_change() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.notify_all(&[
            (FieldId::Active, FieldValue::UInt8(1)),
            (FieldId::CurrentTemperature, FieldValue::Float(21.5)),
        ]);

        assert_eq!(
            rx.recv().await.unwrap(),
            ChangeEvent {
                field: FieldId::Active,
                value: FieldValue::UInt8(1)
            }
        );
        assert_eq!(rx.recv().await.unwrap().field, FieldId::CurrentTemperature);
    }

    #[test]
    fn notifying_without_subscribers_is_harmless() {
        let notifier = ChangeNotifier::new();
        notifier.notify_changed(FieldId::Active, FieldValue::UInt8(0));

        let mut late = notifier.subscribe();
        notifier.notify_changed(FieldId::Active, FieldValue::UInt8(1));
        assert_eq!(late.try_recv().unwrap().value, FieldValue::UInt8(1));
        assert!(late.try_recv().is_err());
    }
}
