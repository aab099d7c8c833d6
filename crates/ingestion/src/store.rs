//! Latest-value state store
//!
//! One `SensorFrame` per bridge, written by the input handlers and the
//! kinematics poller and read as a whole by the publish cycle. Every access
//! goes through the same mutex, so a snapshot never mixes a half-applied
//! write.

use std::sync::{Mutex, MutexGuard};

use contracts::{Header, Imu, NavSatFix, PointCloud2, VehicleKinematics};

/// Write counters per stream; zero means the stream never delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamRevisions {
    pub lidar: u64,
    pub gnss: u64,
    pub imu: u64,
    pub kinematics: u64,
}

/// Latest value of every input stream
///
/// Before the first sample of a stream its field holds the message default
/// (all zeros, identity orientation).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFrame {
    /// Stamp of the latest LiDAR sample, configured frame id
    pub header: Header,
    pub lidar: PointCloud2,
    pub gnss: NavSatFix,
    pub imu: Imu,
    pub kinematics: VehicleKinematics,
    pub revisions: StreamRevisions,
}

/// Mutex-guarded [`SensorFrame`]
///
/// Last write wins: samples are stored in arrival order, so a late sample
/// with an older stamp replaces a newer one.
#[derive(Debug)]
pub struct LatestValueStore {
    frame_id: String,
    state: Mutex<SensorFrame>,
}

impl LatestValueStore {
    pub fn new(frame_id: impl Into<String>) -> Self {
        let frame_id = frame_id.into();
        let state = SensorFrame {
            header: Header::new(Default::default(), frame_id.clone()),
            ..Default::default()
        };
        Self {
            frame_id,
            state: Mutex::new(state),
        }
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// Store a point cloud; its stamp becomes the frame stamp
    pub fn write_lidar(&self, cloud: PointCloud2) {
        let mut state = self.lock();
        state.header = Header::new(cloud.header.stamp, self.frame_id.clone());
        state.lidar = cloud;
        state.revisions.lidar += 1;
    }

    pub fn write_gnss(&self, fix: NavSatFix) {
        let mut state = self.lock();
        state.gnss = fix;
        state.revisions.gnss += 1;
    }

    pub fn write_imu(&self, imu: Imu) {
        let mut state = self.lock();
        state.imu = imu;
        state.revisions.imu += 1;
    }

    pub fn write_kinematics(&self, kinematics: VehicleKinematics) {
        let mut state = self.lock();
        state.kinematics = kinematics;
        state.revisions.kinematics += 1;
    }

    /// Consistent copy of the whole frame
    ///
    /// The point buffer is reference counted, so this does not copy point data.
    pub fn snapshot(&self) -> SensorFrame {
        self.lock().clone()
    }

    pub fn revisions(&self) -> StreamRevisions {
        self.lock().revisions
    }

    // Writers replace whole fields, so the state behind a poisoned lock is intact.
    fn lock(&self) -> MutexGuard<'_, SensorFrame> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
