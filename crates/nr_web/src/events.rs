use std::collections::HashMap;
use std::sync::RwLock;

use nr_core::{Event, EventSink};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// One broadcast channel per user, created on first subscribe.
/// Events for users without a live subscriber are dropped.
pub struct EventHub {
    capacity: usize,
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<Event>>>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<Event> {
        let mut rooms = self.rooms.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        rooms
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, user_id: Uuid) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        rooms.get(&user_id).map_or(0, |tx| tx.receiver_count())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    /// Removes the user's room once its last subscriber is gone.
    pub fn release(&self, user_id: Uuid) {
        let mut rooms = self.rooms.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if rooms.get(&user_id).is_some_and(|tx| tx.receiver_count() == 0) {
            rooms.remove(&user_id);
            debug!("Closed event room of {}", user_id);
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventSink for EventHub {
    fn emit(&self, user_id: Uuid, event: Event) {
        let rooms = self.rooms.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        match rooms.get(&user_id) {
            Some(tx) => {
                let delivered = tx.send(event).unwrap_or(0);
                debug!("Relayed event to {} socket(s) of {}", delivered, user_id);
            }
            None => debug!("Dropped {} for {}: nobody listening", event.event, user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_core::events::{PROCESS_COMPLETED, PROCESS_STARTED};
    use serde_json::json;

    #[tokio::test]
    async fn test_events_reach_only_their_user() {
        let hub = EventHub::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut alice_rx = hub.subscribe(alice);
        let mut bob_rx = hub.subscribe(bob);

        hub.emit(alice, Event::new(PROCESS_STARTED, json!({"articleId": "a1"})));

        let received = alice_rx.recv().await.unwrap();
        assert_eq!(received.event, PROCESS_STARTED);
        assert_eq!(received.data["articleId"], "a1");
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_without_subscriber_is_dropped() {
        let hub = EventHub::default();
        let user = Uuid::new_v4();
        hub.emit(user, Event::new(PROCESS_STARTED, json!({})));

        let mut rx = hub.subscribe(user);
        hub.emit(user, Event::new(PROCESS_COMPLETED, json!({})));
        assert_eq!(rx.recv().await.unwrap().event, PROCESS_COMPLETED);
        assert_eq!(hub.subscriber_count(user), 1);

        drop(rx);
        hub.release(user);
        assert_eq!(hub.subscriber_count(user), 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn test_release_keeps_rooms_with_listeners() {
        let hub = EventHub::default();
        let user = Uuid::new_v4();
        let first = hub.subscribe(user);
        let mut second = hub.subscribe(user);

        drop(first);
        hub.release(user);
        assert_eq!(hub.room_count(), 1);
        hub.emit(user, Event::new(PROCESS_COMPLETED, json!({})));
        assert_eq!(second.recv().await.unwrap().event, PROCESS_COMPLETED);

        drop(second);
        hub.release(user);
        hub.release(Uuid::new_v4());
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_missed_events() {
        let hub = EventHub::new(2);
        let user = Uuid::new_v4();
        let mut rx = hub.subscribe(user);
        for i in 0..4 {
            hub.emit(user, Event::new(PROCESS_STARTED, json!({ "n": i })));
        }
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().data["n"], 2);
    }
}
