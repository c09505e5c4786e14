// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Realtime bus — per-channel in-process queues for SSE delivery.
//!
//! Channels follow two naming conventions: `library:{id}` for file,
//! directory, and share events, and `user:{id}` for notifications. Each
//! subscriber holds a bounded queue tied to one transport connection;
//! publishers enqueue without blocking and a slow subscriber loses events
//! rather than stalling the publisher. Delivery is best-effort
//! at-most-once within the process; cross-process fan-out is out of scope.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::events::RealtimeEvent;

const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

type SubscriberId = u64;
type Subscribers = DashMap<SubscriberId, mpsc::Sender<RealtimeEvent>>;

/// A handle owned by one SSE connection. Dropping the receiver without
/// calling [`RealtimeBus::unsubscribe`] leaves a dead sender behind that
/// is cleaned up on the next publish, but explicit unsubscription on every
/// exit path is the contract.
pub struct Subscription {
    pub channel: String,
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<RealtimeEvent>,
}

#[derive(Default)]
pub struct RealtimeBus {
    channels: DashMap<String, Arc<Subscribers>>,
    next_id: AtomicU64,
}

impl RealtimeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: &str) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let subscribers = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .clone();
        subscribers.insert(id, sender);

        debug!(channel, subscriber = id, "subscribed");
        Subscription {
            channel: channel.to_string(),
            id,
            receiver,
        }
    }

    pub fn unsubscribe(&self, channel: &str, id: SubscriberId) {
        if let Some(subscribers) = self.channels.get(channel) {
            subscribers.remove(&id);
            debug!(channel, subscriber = id, "unsubscribed");
        }
        // Drop empty channels so the map does not grow without bound.
        if let Some(subscribers) = self.channels.get(channel) {
            if subscribers.is_empty() {
                drop(subscribers);
                self.channels.remove_if(channel, |_, subs| subs.is_empty());
            }
        }
    }

    /// Publish to every subscriber of `channel`. Never blocks and never
    /// fails the caller; full or closed queues are logged per subscriber.
    pub fn publish(&self, channel: &str, event_type: &str, data: Value) {
        let Some(subscribers) = self.channels.get(channel) else {
            return;
        };

        let event = RealtimeEvent::new(event_type, data);
        let mut dead: Vec<SubscriberId> = Vec::new();

        for entry in subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(channel, subscriber = *entry.key(), "subscriber queue full; event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(*entry.key());
                }
            }
        }

        for id in dead {
            subscribers.remove(&id);
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |s| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = RealtimeBus::new();
        let mut sub = bus.subscribe("library:abc");

        bus.publish("library:abc", "file_uploaded", json!({"n": 1}));
        bus.publish("library:abc", "file_deleted", json!({"n": 2}));

        let first = sub.receiver.recv().await.unwrap();
        let second = sub.receiver.recv().await.unwrap();
        assert_eq!(first.event_type, "file_uploaded");
        assert_eq!(second.event_type, "file_deleted");
        assert_eq!(first.data["n"], 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = RealtimeBus::new();
        bus.publish("library:none", "x", json!({}));
        assert_eq!(bus.subscriber_count("library:none"), 0);
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let bus = RealtimeBus::new();
        let mut a = bus.subscribe("library:a");
        let _b = bus.subscribe("library:b");

        bus.publish("library:a", "only_a", json!({}));

        let event = a.receiver.recv().await.unwrap();
        assert_eq!(event.event_type, "only_a");
        assert_eq!(bus.subscriber_count("library:b"), 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_queue() {
        let bus = RealtimeBus::new();
        let sub = bus.subscribe("user:u1");
        assert_eq!(bus.subscriber_count("user:u1"), 1);
        bus.unsubscribe("user:u1", sub.id);
        assert_eq!(bus.subscriber_count("user:u1"), 0);
    }

    #[tokio::test]
    async fn closed_receivers_are_pruned_on_publish() {
        let bus = RealtimeBus::new();
        let sub = bus.subscribe("user:u1");
        drop(sub.receiver);

        bus.publish("user:u1", "ping", json!({}));
        assert_eq!(bus.subscriber_count("user:u1"), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let bus = RealtimeBus::new();
        let mut sub = bus.subscribe("library:x");

        for i in 0..(SUBSCRIBER_QUEUE_CAPACITY + 50) {
            bus.publish("library:x", "e", json!({ "i": i }));
        }

        // The subscriber still gets the first events; the overflow was
        // dropped, not queued.
        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.data["i"], 0);
    }
}
