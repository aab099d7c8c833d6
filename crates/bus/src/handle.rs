//! SinkHandle - drives a sink from its own subscription in a worker task

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{BusMessage, MessageSink};

use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::topic::{Subscription, SubscriptionToken};

/// Handle to a running sink worker
///
/// The subscription queue is the sink's isolated buffer: a slow sink only
/// ever fills its own queue, and the publisher drops for it alone.
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Cancels the worker's subscription
    token: SubscriptionToken,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task consuming `subscription` into `sink`
    pub fn spawn<S: MessageSink + Send + 'static>(sink: S, subscription: Subscription) -> Self {
        let name = sink.name().to_string();
        let token = subscription.token();
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, subscription, worker_metrics, worker_name).await;
        });

        Self {
            name,
            token,
            metrics,
            worker_handle,
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Topic the sink is attached to
    pub fn topic(&self) -> &str {
        self.token.topic()
    }

    /// Get current metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.token.dropped_count())
    }

    /// Shutdown the sink worker gracefully
    ///
    /// Already queued messages are still written before the sink is closed.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        // Removing the subscription closes the queue once drained
        self.token.unsubscribe();
        // Wait for worker to finish
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Sink worker: write whatever is queued, flush once the queue runs dry
///
/// A burst of outputs from one cycle is written back to back and flushed
/// together; the sink is closed after the subscription is removed and the
/// remaining queue has been written.
#[instrument(
    name = "sink_worker_loop",
    skip(sink, subscription, metrics),
    fields(sink = %name, topic = %subscription.topic())
)]
async fn sink_worker<S: MessageSink>(
    mut sink: S,
    subscription: Subscription,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!("Sink worker started");

    while let Some(first) = subscription.recv().await {
        let mut batch = 1usize;
        write_one(&mut sink, &subscription, &metrics, first).await;
        while let Some(next) = subscription.try_recv() {
            batch += 1;
            write_one(&mut sink, &subscription, &metrics, next).await;
        }
        metrics.set_queue_len(subscription.len());

        if let Err(e) = sink.flush().await {
            warn!(error = %e, batch, "Flush failed");
        }
    }

    if let Err(e) = sink.close().await {
        error!(error = %e, "Close failed on shutdown");
    }
    debug!(writes = metrics.write_count(), "Sink worker stopped");
}

async fn write_one<S: MessageSink>(
    sink: &mut S,
    subscription: &Subscription,
    metrics: &SinkMetrics,
    message: BusMessage,
) {
    match sink.write(subscription.topic(), &message).await {
        Ok(()) => metrics.inc_write_count(),
        Err(e) => {
            // a failed write never stops the worker
            metrics.inc_failure_count();
            error!(kind = %message.kind(), error = %e, "Write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::TopicBus;
    use contracts::{ContractError, Header, Time, Vector3Stamped};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock sink for testing
    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        flushes: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MessageSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(
            &mut self,
            _topic: &str,
            _message: &BusMessage,
        ) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            self.flushes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn message(i: u64) -> BusMessage {
        Vector3Stamped {
            header: Header::new(Time::from_secs_f64(i as f64), "odom"),
            ..Default::default()
        }
        .into()
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let bus = TopicBus::new();
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: "test".to_string(),
            write_count: Arc::clone(&write_count),
            flushes: Arc::new(AtomicU64::new(0)),
            should_fail: false,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, bus.subscribe("/position", 10).unwrap());
        let publisher = bus.advertise("/position").unwrap();

        for i in 0..5 {
            assert_eq!(publisher.publish(message(i)).unwrap(), 1);
        }

        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let bus = TopicBus::new();
        let sink = MockSink {
            name: "slow".to_string(),
            write_count: Arc::new(AtomicU64::new(0)),
            flushes: Arc::new(AtomicU64::new(0)),
            should_fail: false,
            delay_ms: 100, // Slow sink
        };

        // Small queue capacity
        let handle = SinkHandle::spawn(sink, bus.subscribe("/t", 2).unwrap());
        let publisher = bus.advertise("/t").unwrap();

        // Send more than queue can hold
        for i in 0..10 {
            let _ = publisher.publish(message(i));
        }

        // Some should have been dropped
        assert!(handle.metrics().dropped_count > 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let bus = TopicBus::new();
        let sink = MockSink {
            name: "failing".to_string(),
            write_count: Arc::new(AtomicU64::new(0)),
            flushes: Arc::new(AtomicU64::new(0)),
            should_fail: true,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, bus.subscribe("/t", 10).unwrap());
        let publisher = bus.advertise("/t").unwrap();

        for i in 0..3 {
            publisher.publish(message(i)).unwrap();
        }

        // Give worker time to process
        sleep(Duration::from_millis(50)).await;

        // Should have recorded failures
        assert_eq!(handle.metrics().failure_count, 3);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_handle_flushes_per_burst() {
        let bus = TopicBus::new();
        let write_count = Arc::new(AtomicU64::new(0));
        let flushes = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: "burst".to_string(),
            write_count: Arc::clone(&write_count),
            flushes: Arc::clone(&flushes),
            should_fail: false,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, bus.subscribe("/t", 16).unwrap());
        let publisher = bus.advertise("/t").unwrap();

        // queued before the worker gets to run: one burst
        for i in 0..6 {
            publisher.publish(message(i)).unwrap();
        }
        sleep(Duration::from_millis(50)).await;
        assert_eq!(write_count.load(Ordering::Relaxed), 6);
        assert_eq!(flushes.load(Ordering::Relaxed), 1);

        handle.shutdown().await;
    }
}
