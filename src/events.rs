//! Lossy broadcast of player events to subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;

/// Concrete payload the core emits; a front-end can render now-playing and
/// queue depth from this stream without polling.
#[derive(Debug, Clone, Serialize)]
pub enum PlayerEvent {
    ClipStarted { name: String, hidden: bool },
    ClipEnded { name: String, skipped: bool, hidden: bool },
    QueueChanged { len: usize },
    LibraryChanged { set: String, count: usize },
}

type SubscriberMap = Arc<RwLock<HashMap<u64, mpsc::Sender<PlayerEvent>>>>;

/// A live subscription. Dropping it (or calling `unsubscribe` explicitly)
/// removes the subscriber, which closes its receiver.
pub struct Subscription {
    id: u64,
    subscribers: SubscriberMap,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work; this just makes the intent explicit at call sites.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscribers.write().remove(&self.id);
    }
}

pub struct EventBus {
    subscribers: SubscriberMap,
    inbox_tx: mpsc::Sender<PlayerEvent>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Spawns the fan-out dispatcher task and returns the bus. `inbox_capacity`
    /// bounds how many unpublished events may queue before `publish` starts
    /// dropping; `subscriber_capacity` is each subscriber's individual buffer.
    pub fn new(inbox_capacity: usize) -> Self {
        let (inbox_tx, mut inbox_rx) = mpsc::channel::<PlayerEvent>(inbox_capacity);
        let subscribers: SubscriberMap = Arc::new(RwLock::new(HashMap::new()));
        let dispatcher_subscribers = Arc::clone(&subscribers);

        tokio::spawn(async move {
            while let Some(event) = inbox_rx.recv().await {
                let senders: Vec<_> = dispatcher_subscribers
                    .read()
                    .values()
                    .cloned()
                    .collect();
                for sender in senders {
                    // A slow subscriber loses this event rather than
                    // stalling every other subscriber or the publisher.
                    let _ = sender.try_send(event.clone());
                }
            }
        });

        EventBus {
            subscribers,
            inbox_tx,
            next_id: AtomicU64::new(0),
        }
    }

    /// Never blocks: drops the event if the inbox is full.
    pub fn publish(&self, event: PlayerEvent) {
        let _ = self.inbox_tx.try_send(event);
    }

    pub fn subscribe(&self, capacity: usize) -> (mpsc::Receiver<PlayerEvent>, Subscription) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(capacity);
        self.subscribers.write().insert(id, tx);
        (
            rx,
            Subscription {
                id,
                subscribers: Arc::clone(&self.subscribers),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(8);
        let (mut rx, _sub) = bus.subscribe(8);
        bus.publish(PlayerEvent::QueueChanged { len: 3 });
        let event = rx.recv().await.unwrap();
        matches!(event, PlayerEvent::QueueChanged { len: 3 });
    }

    #[tokio::test]
    async fn unsubscribing_closes_the_receiver() {
        let bus = EventBus::new(8);
        let (mut rx, sub) = bus.subscribe(8);
        sub.unsubscribe();
        // give the dispatcher a moment to process any in-flight state
        tokio::task::yield_now().await;
        bus.publish(PlayerEvent::QueueChanged { len: 1 });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(rx.recv().await.is_none() || rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_the_event() {
        let bus = EventBus::new(8);
        let (mut rx1, _s1) = bus.subscribe(8);
        let (mut rx2, _s2) = bus.subscribe(8);
        bus.publish(PlayerEvent::LibraryChanged {
            set: "songs".into(),
            count: 10,
        });
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }
}
