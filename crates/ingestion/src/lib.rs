//! # Ingestion
//!
//! Sensor input side of the bridge.
//!
//! Responsibilities:
//! - Keep the latest value of every input stream (`LatestValueStore`)
//! - Validate incoming samples and discard malformed ones
//! - Run one subscription handler per input topic (`InputAdapter`)
//! - Poll vehicle kinematics on demand (`KinematicsPoller`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{InputAdapter, IngestionMetrics, LatestValueStore};
//!
//! let store = Arc::new(LatestValueStore::new(&config.frame_id));
//! let metrics = Arc::new(IngestionMetrics::new());
//! let mut adapter = InputAdapter::start(
//!     &bus,
//!     &config.input_topics(),
//!     config.queue_capacity,
//!     store.clone(),
//!     metrics,
//! )?;
//!
//! let frame = store.snapshot();
//! adapter.stop().await;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockSensorSource;
//!
//! let source = MockSensorSource::lidar("/carla/ego_vehicle/lidar", 10.0, 2048);
//! source.start(&bus)?;
//! ```

mod adapter;
mod error;
mod metrics;
mod mock;
mod poller;
mod store;
mod validate;

// Re-exports
pub use adapter::{handle_message, InputAdapter, InputStream};
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot, StreamCounts};
pub use mock::{LidarPoint, MockSensorConfig, MockSensorSource, POINT_STEP};
pub use poller::KinematicsPoller;
pub use store::{LatestValueStore, SensorFrame, StreamRevisions};
pub use validate::{validate_imu, validate_kinematics, validate_nav_sat_fix, validate_point_cloud};
