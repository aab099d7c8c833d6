//! The six output publishers

use bus::{BusError, Publisher, PublisherSnapshot, TopicBus};
use contracts::OutputTopics;
use tracing::{debug, error};

use crate::builder::OutputBatch;

/// Result of publishing one message of a batch
#[derive(Debug)]
pub struct TopicOutcome {
    pub topic: String,
    pub result: Result<usize, BusError>,
}

impl TopicOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// One publisher per output topic
///
/// Order is fixed: lidar, gps, odom, velocity, imu, position.
#[derive(Debug)]
pub struct OutputPublishers {
    publishers: [Publisher; 6],
}

impl OutputPublishers {
    /// Advertise all six topics
    pub fn advertise(bus: &TopicBus, topics: &OutputTopics) -> Result<Self, BusError> {
        let publishers = [
            bus.advertise(&topics.lidar)?,
            bus.advertise(&topics.gps)?,
            bus.advertise(&topics.odom)?,
            bus.advertise(&topics.velocity)?,
            bus.advertise(&topics.imu)?,
            bus.advertise(&topics.position)?,
        ];
        debug!(topics = ?topics.all(), "output publishers advertised");
        Ok(Self { publishers })
    }

    /// Publish a whole batch
    ///
    /// A failing topic does not stop the others. Failures are logged here and
    /// returned to the caller for counting.
    pub fn publish_batch(&self, batch: OutputBatch) -> Vec<TopicOutcome> {
        self.publishers
            .iter()
            .zip(batch.into_messages())
            .map(|(publisher, message)| {
                let result = publisher.publish(message);
                let success = result.is_ok();
                observability::record_publish(publisher.topic(), success);
                if let Err(e) = &result {
                    error!(topic = %publisher.topic(), error = %e, "Publish failed");
                }
                TopicOutcome {
                    topic: publisher.topic().to_string(),
                    result,
                }
            })
            .collect()
    }

    /// Close every publisher; returns how many were still open
    pub fn close_all(&self) -> usize {
        self.publishers.iter().filter(|p| p.close()).count()
    }

    pub fn is_closed(&self) -> bool {
        self.publishers.iter().all(Publisher::is_closed)
    }

    pub fn metrics(&self) -> Vec<(String, PublisherSnapshot)> {
        self.publishers
            .iter()
            .map(|p| (p.topic().to_string(), p.metrics()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::OutputBuilder;
    use contracts::{MessageKind, HEADING_YAW_OFFSET_DEG};
    use ingestion::SensorFrame;

    fn topics() -> OutputTopics {
        OutputTopics {
            lidar: "/out/lidar".into(),
            gps: "/out/gps".into(),
            odom: "/out/odom".into(),
            velocity: "/out/velocity".into(),
            imu: "/out/imu".into(),
            position: "/out/position".into(),
        }
    }

    fn batch() -> OutputBatch {
        OutputBuilder::new("base_link", HEADING_YAW_OFFSET_DEG).build(&SensorFrame::default())
    }

    #[tokio::test]
    async fn test_batch_reaches_each_topic() {
        let bus = TopicBus::new();
        let gps_sub = bus.subscribe("/out/gps", 4).unwrap();
        let pos_sub = bus.subscribe("/out/position", 4).unwrap();
        let publishers = OutputPublishers::advertise(&bus, &topics()).unwrap();

        let outcomes = publishers.publish_batch(batch());
        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(TopicOutcome::is_ok));

        assert_eq!(gps_sub.try_recv().unwrap().kind(), MessageKind::GpsWithHeading);
        assert_eq!(pos_sub.try_recv().unwrap().kind(), MessageKind::Vector3Stamped);
    }

    #[tokio::test]
    async fn test_full_queue_isolated_to_topic() {
        let bus = TopicBus::new();
        let _imu_sub = bus.subscribe("/out/imu", 1).unwrap();
        let publishers = OutputPublishers::advertise(&bus, &topics()).unwrap();

        publishers.publish_batch(batch());
        let outcomes = publishers.publish_batch(batch());
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_ok()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].topic, "/out/imu");
        assert!(failed[0].result.as_ref().unwrap_err().is_queue_full());
    }

    #[tokio::test]
    async fn test_close_all_once() {
        let bus = TopicBus::new();
        let publishers = OutputPublishers::advertise(&bus, &topics()).unwrap();
        assert_eq!(publishers.close_all(), 6);
        assert_eq!(publishers.close_all(), 0);
        assert!(publishers.is_closed());

        let outcomes = publishers.publish_batch(batch());
        assert!(outcomes.iter().all(|o| !o.is_ok()));
    }
}
