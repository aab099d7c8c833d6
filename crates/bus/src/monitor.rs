//! OutputMonitor - fan-out of output topics to log sinks

use tracing::{info, instrument};

use crate::error::BusError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::LogSink;
use crate::topic::TopicBus;

/// Per-sink report line
#[derive(Debug, Clone)]
pub struct SinkReport {
    pub name: String,
    pub topic: String,
    pub metrics: MetricsSnapshot,
}

/// Watches a set of topics, one sink worker per topic
pub struct OutputMonitor {
    handles: Vec<SinkHandle>,
}

impl OutputMonitor {
    /// Attach a `LogSink` to each topic
    #[instrument(name = "output_monitor_attach", skip(bus, topics))]
    pub fn attach<'a>(
        bus: &TopicBus,
        topics: impl IntoIterator<Item = &'a str>,
        queue_capacity: usize,
    ) -> Result<Self, BusError> {
        let mut handles = Vec::new();
        for topic in topics {
            let subscription = bus.subscribe(topic, queue_capacity)?;
            let sink = LogSink::new(format!("log:{topic}"));
            handles.push(SinkHandle::spawn(sink, subscription));
        }
        info!(sinks = handles.len(), "Output monitor attached");
        Ok(Self { handles })
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<SinkReport> {
        self.handles
            .iter()
            .map(|h| SinkReport {
                name: h.name().to_string(),
                topic: h.topic().to_string(),
                metrics: h.metrics(),
            })
            .collect()
    }

    /// Detach and drain every sink
    #[instrument(name = "output_monitor_shutdown", skip(self))]
    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown().await;
        }
        info!("Output monitor shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Imu, InsVelocity};

    #[tokio::test]
    async fn test_monitor_counts_writes_per_topic() {
        let bus = TopicBus::new();
        let monitor = OutputMonitor::attach(&bus, ["/imu", "/ins_velocity"], 10).unwrap();
        assert_eq!(monitor.sink_count(), 2);

        let imu = bus.advertise("/imu").unwrap();
        let velocity = bus.advertise("/ins_velocity").unwrap();
        for _ in 0..3 {
            imu.publish(Imu::default().into()).unwrap();
        }
        velocity.publish(InsVelocity::default().into()).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let reports = monitor.metrics();
        let imu_report = reports.iter().find(|r| r.topic == "/imu").unwrap();
        assert_eq!(imu_report.metrics.write_count, 3);
        assert_eq!(imu_report.name, "log:/imu");

        monitor.shutdown().await;
        assert_eq!(bus.subscriber_count("/imu"), 0);
    }

    #[tokio::test]
    async fn test_attach_on_closed_bus() {
        let bus = TopicBus::new();
        bus.shutdown();
        assert!(matches!(
            OutputMonitor::attach(&bus, ["/imu"], 10),
            Err(BusError::BusClosed)
        ));
    }
}
