//! Typed Engine Event Bus
//!
//! Engine events (playhead ticks, input level) arrive on an independent
//! asynchronous channel. Listeners subscribe with a typed receiver and get a
//! subscription id back for cancellation; per subscriber, delivery order is
//! the emission order, since each subscription is a single mpsc channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::engine::EngineEvent;

/// Handle identifying one subscription on an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A registered listener: the id to cancel with and the typed receiver to
/// consume. Dropping the subscription also stops delivery; the bus prunes
/// the closed channel on the next emit.
#[derive(Debug)]
pub struct EventSubscription {
    pub id: SubscriptionId,
    pub receiver: UnboundedReceiver<EngineEvent>,
}

/// Fan-out point for engine events.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<(SubscriptionId, UnboundedSender<EngineEvent>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    /// Register a listener.
    pub fn subscribe(&self) -> EventSubscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("event bus lock poisoned")
            .push((id, tx));
        EventSubscription { id, receiver: rx }
    }

    /// Unregister a listener. Unknown ids are ignored.
    pub fn cancel(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .expect("event bus lock poisoned")
            .retain(|(sub_id, _)| *sub_id != id);
    }

    /// Deliver an event to every live subscriber, pruning closed channels.
    pub fn emit(&self, event: EngineEvent) {
        self.subscribers
            .lock()
            .expect("event bus lock poisoned")
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("event bus lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivery_matches_emission_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(EngineEvent::PlayheadUpdate {
                position: i as f64,
            });
        }
        bus.emit(EngineEvent::InputLevel { level: 0.7 });

        for i in 0..5 {
            assert_eq!(
                sub.receiver.recv().await.unwrap(),
                EngineEvent::PlayheadUpdate {
                    position: i as f64
                }
            );
        }
        assert_eq!(
            sub.receiver.recv().await.unwrap(),
            EngineEvent::InputLevel { level: 0.7 }
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.cancel(sub.id);
        assert_eq!(bus.subscriber_count(), 0);

        // Emitting with no subscribers is fine
        bus.emit(EngineEvent::InputLevel { level: 0.1 });
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned_on_emit() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let mut kept = bus.subscribe();
        drop(sub);

        bus.emit(EngineEvent::PlayheadUpdate { position: 1.0 });
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_fan_out_to_multiple_subscribers() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(EngineEvent::PlayheadUpdate { position: 2.5 });

        let expected = EngineEvent::PlayheadUpdate { position: 2.5 };
        assert_eq!(a.receiver.recv().await.unwrap(), expected);
        assert_eq!(b.receiver.recv().await.unwrap(), expected);
    }
}
