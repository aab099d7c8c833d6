//! TopicBus - named topics with bounded per-subscriber queues
//!
//! A publish never blocks: every subscriber owns a bounded `async_channel`
//! queue and a message is dropped for any subscriber whose queue is full.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_channel::{Receiver, Sender, TryRecvError, TrySendError};
use contracts::BusMessage;
use tracing::{debug, info, instrument, warn};

use crate::error::BusError;
use crate::metrics::{PublisherMetrics, PublisherSnapshot};

struct SubscriberSlot {
    id: u64,
    tx: Sender<BusMessage>,
    dropped: Arc<AtomicU64>,
}

#[derive(Default)]
struct BusInner {
    topics: Mutex<HashMap<String, Vec<SubscriberSlot>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl BusInner {
    // The map only ever holds complete slots, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<SubscriberSlot>>> {
        self.topics.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// In-process topic bus
///
/// Cheap to clone; all clones share the same topic table.
#[derive(Clone, Default)]
pub struct TopicBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for TopicBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicBus")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl TopicBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a publisher for `topic`
    pub fn advertise(&self, topic: &str) -> Result<Publisher, BusError> {
        if self.is_closed() {
            return Err(BusError::BusClosed);
        }
        debug!(topic = %topic, "publisher advertised");
        Ok(Publisher {
            topic: topic.to_string(),
            bus: self.clone(),
            metrics: Arc::new(PublisherMetrics::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Subscribe to `topic` with a queue of `capacity` messages
    ///
    /// A capacity of 0 is raised to 1.
    pub fn subscribe(&self, topic: &str, capacity: usize) -> Result<Subscription, BusError> {
        if self.is_closed() {
            return Err(BusError::BusClosed);
        }
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let dropped = Arc::new(AtomicU64::new(0));

        self.inner
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(SubscriberSlot {
                id,
                tx,
                dropped: Arc::clone(&dropped),
            });

        debug!(topic = %topic, subscriber_id = id, capacity, "subscribed");
        Ok(Subscription {
            token: SubscriptionToken {
                topic: topic.to_string(),
                id,
                bus: self.clone(),
                dropped,
            },
            rx,
        })
    }

    /// Remove a subscriber; returns `false` if it was already gone
    ///
    /// Dropping the slot drops the only sender, so the subscriber's `recv`
    /// drains what is queued and then returns `None`.
    pub fn unsubscribe(&self, topic: &str, id: u64) -> bool {
        let mut topics = self.inner.lock();
        let Some(slots) = topics.get_mut(topic) else {
            return false;
        };
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        let removed = slots.len() != before;
        if slots.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Number of live subscribers on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.lock().get(topic).map_or(0, Vec::len)
    }

    /// Close every subscription and refuse new publishers/subscribers
    #[instrument(name = "topic_bus_shutdown", skip(self))]
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained: Vec<_> = self.inner.lock().drain().collect();
        info!(topics = drained.len(), "Bus shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Deliver to every subscriber of `topic`; returns (delivered, dropped)
    fn deliver(&self, topic: &str, message: &BusMessage) -> (usize, usize) {
        let mut topics = self.inner.lock();
        let Some(slots) = topics.get_mut(topic) else {
            return (0, 0);
        };

        let mut delivered = 0;
        let mut dropped = 0;
        slots.retain(|slot| match slot.tx.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                slot.dropped.fetch_add(1, Ordering::Relaxed);
                dropped += 1;
                true
            }
            // Receiver side went away without unsubscribing
            Err(TrySendError::Closed(_)) => false,
        });
        if slots.is_empty() {
            topics.remove(topic);
        }
        (delivered, dropped)
    }
}

/// Publishing end of a topic
#[derive(Debug)]
pub struct Publisher {
    topic: String,
    bus: TopicBus,
    metrics: Arc<PublisherMetrics>,
    closed: AtomicBool,
}

impl Publisher {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish without blocking
    ///
    /// Returns the number of subscribers that received the message. A topic
    /// without subscribers is not an error. If any subscriber queue is full
    /// the message is still delivered to the others and `QueueFull` is
    /// returned.
    pub fn publish(&self, message: BusMessage) -> Result<usize, BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::PublisherClosed {
                topic: self.topic.clone(),
            });
        }
        if self.bus.is_closed() {
            return Err(BusError::BusClosed);
        }

        self.metrics.inc_publish_count();
        let (delivered, dropped) = self.bus.deliver(&self.topic, &message);
        self.metrics.add_delivered(delivered as u64);

        if dropped > 0 {
            self.metrics.add_dropped(dropped as u64);
            warn!(
                topic = %self.topic,
                kind = %message.kind(),
                dropped,
                "Subscriber queue full, message dropped"
            );
            return Err(BusError::QueueFull {
                topic: self.topic.clone(),
                dropped,
            });
        }
        Ok(delivered)
    }

    /// Close the publisher; returns `false` if it was already closed
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            debug!(topic = %self.topic, "publisher closed");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> PublisherSnapshot {
        self.metrics.snapshot()
    }
}

/// Detached handle that can cancel a subscription owned elsewhere
#[derive(Debug, Clone)]
pub struct SubscriptionToken {
    topic: String,
    id: u64,
    bus: TopicBus,
    dropped: Arc<AtomicU64>,
}

impl SubscriptionToken {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Messages dropped for this subscriber because its queue was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Idempotent
    pub fn unsubscribe(&self) -> bool {
        self.bus.unsubscribe(&self.topic, self.id)
    }
}

/// Receiving end of a topic
///
/// Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    token: SubscriptionToken,
    rx: Receiver<BusMessage>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.token.topic
    }

    pub fn id(&self) -> u64 {
        self.token.id
    }

    pub fn token(&self) -> SubscriptionToken {
        self.token.clone()
    }

    /// Next message; `None` once unsubscribed (or the bus shut down) and drained
    pub async fn recv(&self) -> Option<BusMessage> {
        self.rx.recv().await.ok()
    }

    pub fn try_recv(&self) -> Option<BusMessage> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    /// Messages currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn dropped_count(&self) -> u64 {
        self.token.dropped_count()
    }

    /// Idempotent
    pub fn unsubscribe(&self) -> bool {
        self.token.unsubscribe()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Header, Time, Vector3, Vector3Stamped};

    fn position(x: f64) -> BusMessage {
        Vector3Stamped {
            header: Header::new(Time::from_secs_f64(x), "odom"),
            vector: Vector3::new(x, 0.0, 0.0),
        }
        .into()
    }

    #[tokio::test]
    async fn test_publish_fanout() {
        let bus = TopicBus::new();
        let sub1 = bus.subscribe("/position", 4).unwrap();
        let sub2 = bus.subscribe("/position", 4).unwrap();
        let publisher = bus.advertise("/position").unwrap();

        assert_eq!(publisher.publish(position(1.0)).unwrap(), 2);
        assert_eq!(sub1.recv().await, Some(position(1.0)));
        assert_eq!(sub2.recv().await, Some(position(1.0)));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = TopicBus::new();
        let publisher = bus.advertise("/nobody").unwrap();
        assert_eq!(publisher.publish(position(1.0)).unwrap(), 0);
        assert_eq!(publisher.metrics().publish_count, 1);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = TopicBus::new();
        let sub = bus.subscribe("/a", 4).unwrap();
        let publisher = bus.advertise("/b").unwrap();
        publisher.publish(position(1.0)).unwrap();
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_queue_full_drops_without_blocking() {
        let bus = TopicBus::new();
        let slow = bus.subscribe("/t", 2).unwrap();
        let fast = bus.subscribe("/t", 16).unwrap();
        let publisher = bus.advertise("/t").unwrap();

        for i in 0..5 {
            let result = publisher.publish(position(i as f64));
            if i < 2 {
                assert_eq!(result.unwrap(), 2);
            } else {
                let err = result.unwrap_err();
                assert!(err.is_queue_full());
            }
        }

        assert_eq!(slow.len(), 2);
        assert_eq!(slow.dropped_count(), 3);
        // the healthy subscriber still got everything
        assert_eq!(fast.len(), 5);
        assert_eq!(publisher.metrics().dropped_count, 3);
        assert_eq!(publisher.metrics().delivered_count, 7);
    }

    #[test]
    fn test_queue_keeps_oldest() {
        let bus = TopicBus::new();
        let sub = bus.subscribe("/t", 1).unwrap();
        let publisher = bus.advertise("/t").unwrap();
        publisher.publish(position(1.0)).unwrap();
        let _ = publisher.publish(position(2.0));
        assert_eq!(sub.try_recv(), Some(position(1.0)));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let bus = TopicBus::new();
        let sub = bus.subscribe("/t", 4).unwrap();
        let publisher = bus.advertise("/t").unwrap();

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert_eq!(bus.subscriber_count("/t"), 0);

        assert_eq!(publisher.publish(position(1.0)).unwrap(), 0);
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = TopicBus::new();
        {
            let _sub = bus.subscribe("/t", 4).unwrap();
            assert_eq!(bus.subscriber_count("/t"), 1);
        }
        assert_eq!(bus.subscriber_count("/t"), 0);
    }

    #[tokio::test]
    async fn test_token_unsubscribe_ends_recv_loop() {
        let bus = TopicBus::new();
        let sub = bus.subscribe("/t", 4).unwrap();
        let token = sub.token();

        let task = tokio::spawn(async move {
            let mut n = 0;
            while sub.recv().await.is_some() {
                n += 1;
            }
            n
        });

        let publisher = bus.advertise("/t").unwrap();
        publisher.publish(position(1.0)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(token.unsubscribe());

        assert_eq!(task.await.unwrap(), 1);
    }

    #[test]
    fn test_publisher_close() {
        let bus = TopicBus::new();
        let publisher = bus.advertise("/t").unwrap();
        assert!(publisher.close());
        assert!(!publisher.close());
        assert!(matches!(
            publisher.publish(position(1.0)),
            Err(BusError::PublisherClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown() {
        let bus = TopicBus::new();
        let sub = bus.subscribe("/t", 4).unwrap();
        let publisher = bus.advertise("/t").unwrap();

        bus.shutdown();
        bus.shutdown();

        assert!(matches!(
            publisher.publish(position(1.0)),
            Err(BusError::BusClosed)
        ));
        assert!(matches!(bus.subscribe("/t", 1), Err(BusError::BusClosed)));
        assert_eq!(sub.recv().await, None);
    }
}
