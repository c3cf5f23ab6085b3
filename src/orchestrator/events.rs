//! Change events published for UI-facing subscribers.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::models::stage::StageStatus;

/// Events emitted as stage state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Started {
        project_id: String,
        stage_id: String,
    },
    Completed {
        project_id: String,
        stage_id: String,
        /// Dependents unblocked by this completion.
        unblocked: Vec<String>,
        /// Recomputed aggregate project progress.
        progress: u8,
    },
    Reset {
        project_id: String,
        stage_id: String,
        reason: Option<String>,
    },
    Blocked {
        project_id: String,
        stage_id: String,
    },
    Unblocked {
        project_id: String,
        stage_id: String,
    },
    /// Generic status change not covered by a more specific event.
    StatusChanged {
        project_id: String,
        stage_id: String,
        from: StageStatus,
        to: StageStatus,
    },
    /// A blocked stage with a pre-assigned owner became ready. High
    /// priority: someone is waiting to pick this up.
    ReadyForOwner {
        project_id: String,
        stage_id: String,
        assigned_to: String,
    },
}

/// Channel-based fan-out to in-process subscribers.
///
/// Events are not persisted and carry no delivery or ordering guarantee
/// across concurrent mutations. Disconnected subscribers are dropped on
/// the next publish.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<StageEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; the receiver sees every event published
    /// after this call.
    pub fn subscribe(&self) -> Receiver<StageEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    pub fn publish(&self, event: StageEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_receives_published_events() {
        let bus = EventBus::new();
        let rx = bus.subscribe();

        bus.publish(StageEvent::Started {
            project_id: "p".to_string(),
            stage_id: "s".to_string(),
        });

        let event = rx.try_recv().expect("Should receive event");
        assert!(matches!(event, StageEvent::Started { .. }));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);

        // Publishing to a dropped receiver must not error or leak.
        bus.publish(StageEvent::Unblocked {
            project_id: "p".to_string(),
            stage_id: "s".to_string(),
        });

        let rx2 = bus.subscribe();
        bus.publish(StageEvent::Unblocked {
            project_id: "p".to_string(),
            stage_id: "s".to_string(),
        });
        assert!(rx2.try_recv().is_ok());
    }
}
