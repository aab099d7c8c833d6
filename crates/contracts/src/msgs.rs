//! Wire messages carried on the topic bus.
//!
//! Field layout follows the ROS 2 `std_msgs` / `geometry_msgs` / `sensor_msgs`
//! definitions that CARLA's native publisher emits, plus the
//! `sensor_driver_msgs` types produced by the bridge.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Simulation timestamp (seconds + nanoseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    const NANOS_PER_SEC: f64 = 1_000_000_000.0;

    /// Build a stamp from CARLA simulation seconds.
    ///
    /// Non-finite input yields the zero stamp.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() {
            return Self::default();
        }
        let whole = secs.floor();
        let mut sec = whole as i32;
        let mut nanosec = ((secs - whole) * Self::NANOS_PER_SEC).round() as u32;
        if nanosec >= 1_000_000_000 {
            sec += 1;
            nanosec -= 1_000_000_000;
        }
        Self { sec, nanosec }
    }

    /// Seconds as `f64`
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 / Self::NANOS_PER_SEC
    }

    /// Whether this is the zero stamp (no sample received yet)
    pub fn is_zero(&self) -> bool {
        self.sec == 0 && self.nanosec == 0
    }
}

/// Message header: stamp + coordinate frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

impl Header {
    pub fn new(stamp: Time, frame_id: impl Into<String>) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// 3D point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation quaternion (w is the scalar part)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Quaternion {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Linear + angular velocity pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

/// `nav_msgs/Odometry` without covariance blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,
    pub child_frame_id: String,
    pub pose: Pose,
    pub twist: Twist,
}

/// `geometry_msgs/Vector3Stamped`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3Stamped {
    pub header: Header,
    pub vector: Vector3,
}

/// Point field datatypes (subset used by CARLA)
pub mod point_field {
    pub const INT8: u8 = 1;
    pub const UINT8: u8 = 2;
    pub const INT16: u8 = 3;
    pub const UINT16: u8 = 4;
    pub const INT32: u8 = 5;
    pub const UINT32: u8 = 6;
    pub const FLOAT32: u8 = 7;
    pub const FLOAT64: u8 = 8;
}

/// One named channel inside a point record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

impl PointField {
    pub fn new(name: impl Into<String>, offset: u32, datatype: u8) -> Self {
        Self {
            name: name.into(),
            offset,
            datatype,
            count: 1,
        }
    }
}

/// `sensor_msgs/PointCloud2`
///
/// The point buffer is opaque to the bridge and is forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Bytes,
    pub is_dense: bool,
}

impl PointCloud2 {
    /// Number of points (`height * width`)
    pub fn num_points(&self) -> u64 {
        self.height as u64 * self.width as u64
    }
}

/// GNSS receiver status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavSatStatus {
    pub status: i8,
    pub service: u16,
}

impl NavSatStatus {
    pub const STATUS_NO_FIX: i8 = -1;
    pub const STATUS_FIX: i8 = 0;
    pub const SERVICE_GPS: u16 = 1;
}

/// Covariance type for `NavSatFix::position_covariance`
pub mod covariance_type {
    pub const UNKNOWN: u8 = 0;
    pub const APPROXIMATED: u8 = 1;
    pub const DIAGONAL_KNOWN: u8 = 2;
    pub const KNOWN: u8 = 3;
}

/// `sensor_msgs/NavSatFix`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavSatFix {
    pub header: Header,
    pub status: NavSatStatus,
    /// Degrees, positive north
    pub latitude: f64,
    /// Degrees, positive east
    pub longitude: f64,
    /// Meters above the WGS 84 ellipsoid
    pub altitude: f64,
    pub position_covariance: [f64; 9],
    pub position_covariance_type: u8,
}

/// `sensor_msgs/Imu`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    pub header: Header,
    pub orientation: Quaternion,
    pub orientation_covariance: [f64; 9],
    pub angular_velocity: Vector3,
    pub angular_velocity_covariance: [f64; 9],
    pub linear_acceleration: Vector3,
    pub linear_acceleration_covariance: [f64; 9],
}

/// `sensor_driver_msgs/GpswithHeading`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsWithHeading {
    pub header: Header,
    pub gps: NavSatFix,
    /// Degrees
    pub roll: f64,
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub heading: f64,
}

/// `sensor_driver_msgs/OdometrywithGps`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdometryWithGps {
    pub header: Header,
    pub gps: NavSatFix,
    pub odometry: Odometry,
}

/// `sensor_driver_msgs/InsVelocity`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsVelocity {
    pub header: Header,
    pub angular_velocity: Vector3,
    pub linear_velocity: Vector3,
}
