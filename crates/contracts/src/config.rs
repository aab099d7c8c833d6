//! BridgeConfig - Config Loader output
//!
//! Mirrors the flat key layout of the bridge's JSON/TOML stack file: a publish
//! period, one topic per input/output stream, and a few optional knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Offset subtracted from the simulator yaw to obtain the GPS heading (degrees).
///
/// The simulator's yaw zero and the GPS heading zero point along different
/// axes. Whether the sign is right is still an open question upstream, so the
/// value is overridable through `heading_offset_deg`.
pub const HEADING_YAW_OFFSET_DEG: f64 = 90.0;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BridgeConfig {
    /// Publish period in seconds, must be > 0
    #[validate(range(exclusive_min = 0.0))]
    pub loop_rate: f64,

    #[validate(length(min = 1))]
    pub gnss_sub_topic: String,

    #[validate(length(min = 1))]
    pub imu_sub_topic: String,

    #[validate(length(min = 1))]
    pub lidar_sub_topic: String,

    #[validate(length(min = 1))]
    pub lidar_pub_topic: String,

    #[validate(length(min = 1))]
    pub gps_pub_topic: String,

    #[validate(length(min = 1))]
    pub odom_pub_topic: String,

    #[validate(length(min = 1))]
    pub velocity_pub_topic: String,

    #[validate(length(min = 1))]
    pub imu_pub_topic: String,

    #[validate(length(min = 1))]
    pub position_pub_topic: String,

    /// Frame stamped onto every output header
    #[serde(default = "default_frame_id")]
    #[validate(length(min = 1))]
    pub frame_id: String,

    /// Child frame of the odometry output
    #[serde(default = "default_child_frame_id")]
    #[validate(length(min = 1))]
    pub child_frame_id: String,

    /// Heading = yaw - heading_offset_deg
    #[serde(default = "default_heading_offset")]
    pub heading_offset_deg: f64,

    /// Per-subscription queue depth
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Mock-mode simulation settings
    #[serde(default)]
    #[validate(nested)]
    pub simulation: SimulationConfig,
}

fn default_frame_id() -> String {
    "odom".to_string()
}

fn default_child_frame_id() -> String {
    "base_link".to_string()
}

fn default_heading_offset() -> f64 {
    HEADING_YAW_OFFSET_DEG
}

fn default_queue_capacity() -> usize {
    10
}

impl BridgeConfig {
    /// Topics the bridge subscribes to
    pub fn input_topics(&self) -> InputTopics {
        InputTopics {
            lidar: self.lidar_sub_topic.clone(),
            gnss: self.gnss_sub_topic.clone(),
            imu: self.imu_sub_topic.clone(),
        }
    }

    /// Topics the bridge publishes to
    pub fn output_topics(&self) -> OutputTopics {
        OutputTopics {
            lidar: self.lidar_pub_topic.clone(),
            gps: self.gps_pub_topic.clone(),
            odom: self.odom_pub_topic.clone(),
            velocity: self.velocity_pub_topic.clone(),
            imu: self.imu_pub_topic.clone(),
            position: self.position_pub_topic.clone(),
        }
    }

    /// Publish period, `None` if `loop_rate` is not a usable positive duration
    pub fn loop_period(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.loop_rate)
            .ok()
            .filter(|period| !period.is_zero())
    }
}

/// Subscribed topic names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTopics {
    pub lidar: String,
    pub gnss: String,
    pub imu: String,
}

impl InputTopics {
    pub fn all(&self) -> [&str; 3] {
        [&self.lidar, &self.gnss, &self.imu]
    }
}

/// Published topic names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTopics {
    pub lidar: String,
    pub gps: String,
    pub odom: String,
    pub velocity: String,
    pub imu: String,
    pub position: String,
}

impl OutputTopics {
    pub fn all(&self) -> [&str; 6] {
        [
            &self.lidar,
            &self.gps,
            &self.odom,
            &self.velocity,
            &self.imu,
            &self.position,
        ]
    }
}

/// Mock-mode simulation settings
///
/// Only used when the bridge runs against the built-in simulated vehicle and
/// mock sensors instead of a live simulator.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SimulationConfig {
    /// Role name of the simulated ego vehicle
    #[validate(length(min = 1))]
    pub vehicle_id: String,

    #[validate(range(exclusive_min = 0.0))]
    pub lidar_hz: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub gnss_hz: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub imu_hz: f64,

    /// Points per synthetic LiDAR sweep
    #[validate(range(min = 1))]
    pub lidar_points: u32,

    /// Ground speed along the scripted trajectory (m/s)
    #[validate(range(min = 0.0))]
    pub speed_mps: f64,

    /// Radius of the scripted circular trajectory (m)
    #[validate(range(exclusive_min = 0.0))]
    pub turn_radius_m: f64,

    /// Geodetic reference of the map origin
    pub origin: GeoOrigin,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vehicle_id: "ego_vehicle".to_string(),
            lidar_hz: 10.0,
            gnss_hz: 20.0,
            imu_hz: 50.0,
            lidar_points: 2048,
            speed_mps: 5.0,
            turn_radius_m: 30.0,
            origin: GeoOrigin::default(),
        }
    }
}

/// Geodetic reference (degrees, meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoOrigin {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}
