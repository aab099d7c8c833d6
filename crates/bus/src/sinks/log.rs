//! LogSink - logs message summaries via tracing

use contracts::{BusMessage, ContractError, MessageSink};
use tracing::{debug, info, instrument};

/// Sink that logs message summaries for debugging
pub struct LogSink {
    name: String,
    count: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    /// Messages logged so far
    pub fn count(&self) -> u64 {
        self.count
    }

    fn log_message_summary(&self, topic: &str, message: &BusMessage) {
        let header = message.header();
        match message {
            BusMessage::PointCloud(cloud) => debug!(
                sink = %self.name,
                topic = %topic,
                stamp = header.stamp.as_secs_f64(),
                points = cloud.num_points(),
                bytes = cloud.data.len(),
                "PointCloud2 received"
            ),
            BusMessage::GpsWithHeading(gps) => debug!(
                sink = %self.name,
                topic = %topic,
                stamp = header.stamp.as_secs_f64(),
                latitude = gps.gps.latitude,
                longitude = gps.gps.longitude,
                heading = gps.heading,
                "GpsWithHeading received"
            ),
            other => debug!(
                sink = %self.name,
                topic = %topic,
                kind = %other.kind(),
                stamp = header.stamp.as_secs_f64(),
                frame_id = %header.frame_id,
                "Message received"
            ),
        }
    }
}

impl MessageSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, message),
        fields(sink = %self.name, kind = %message.kind())
    )]
    async fn write(&mut self, topic: &str, message: &BusMessage) -> Result<(), ContractError> {
        self.count += 1;
        self.log_message_summary(topic, message);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, messages = self.count, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{GpsWithHeading, PointCloud2};

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        sink.write("/rslidar_points", &PointCloud2::default().into())
            .await
            .unwrap();
        sink.write("/gps", &GpsWithHeading::default().into())
            .await
            .unwrap();
        assert_eq!(sink.count(), 2);
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
