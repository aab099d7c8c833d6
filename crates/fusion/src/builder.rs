//! 输出消息构建
//!
//! 从一份 `SensorFrame` 快照派生六条输出消息。构建是纯函数，不访问 store，
//! 因此同一批消息一定来自同一时刻的状态。

use contracts::{
    BridgeConfig, BusMessage, GpsWithHeading, Header, Imu, InsVelocity, NavSatFix, Odometry,
    OdometryWithGps, Point, PointCloud2, Pose, Vector3Stamped,
};
use ingestion::SensorFrame;

use crate::convert::{
    heading_from_yaw, kinematics_to_twist, position_to_vector, rotation_to_quaternion,
};

/// 一个发布周期的六条输出
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBatch {
    pub lidar: PointCloud2,
    pub gps: GpsWithHeading,
    pub odom: OdometryWithGps,
    pub velocity: InsVelocity,
    pub imu: Imu,
    pub position: Vector3Stamped,
}

impl OutputBatch {
    /// 按 (lidar, gps, odom, velocity, imu, position) 顺序转为总线消息
    pub fn into_messages(self) -> [BusMessage; 6] {
        [
            self.lidar.into(),
            self.gps.into(),
            self.odom.into(),
            self.velocity.into(),
            self.imu.into(),
            self.position.into(),
        ]
    }
}

/// 输出消息构建器
#[derive(Debug, Clone)]
pub struct OutputBuilder {
    child_frame_id: String,
    heading_offset_deg: f64,
}

impl OutputBuilder {
    pub fn new(child_frame_id: impl Into<String>, heading_offset_deg: f64) -> Self {
        Self {
            child_frame_id: child_frame_id.into(),
            heading_offset_deg,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.child_frame_id, config.heading_offset_deg)
    }

    /// 从快照构建全部输出
    ///
    /// 六条消息使用同一个 header（最新 LiDAR 时间戳 + 配置的 frame id）。
    pub fn build(&self, frame: &SensorFrame) -> OutputBatch {
        let header = frame.header.clone();
        let kinematics = &frame.kinematics;
        let gps_fix = reframe(&frame.gnss, &header);

        let mut lidar = frame.lidar.clone();
        lidar.header = header.clone();

        let mut imu = frame.imu.clone();
        imu.header = header.clone();

        let rotation = kinematics.rotation();
        let gps = GpsWithHeading {
            header: header.clone(),
            gps: gps_fix.clone(),
            roll: rotation.roll,
            pitch: rotation.pitch,
            heading: heading_from_yaw(rotation.yaw, self.heading_offset_deg),
        };

        let position = position_to_vector(kinematics.location());
        let twist = kinematics_to_twist(&kinematics.velocity, &kinematics.angular_velocity);
        let odom = OdometryWithGps {
            header: header.clone(),
            gps: gps_fix,
            odometry: Odometry {
                header: header.clone(),
                child_frame_id: self.child_frame_id.clone(),
                pose: Pose {
                    position: Point {
                        x: position.x,
                        y: position.y,
                        z: position.z,
                    },
                    orientation: rotation_to_quaternion(rotation),
                },
                twist,
            },
        };

        let mut velocity = InsVelocity {
            header: header.clone(),
            angular_velocity: frame.imu.angular_velocity,
            linear_velocity: twist.linear,
        };
        // kinematics wins over the IMU reading
        velocity.angular_velocity = twist.angular;

        let position = Vector3Stamped {
            header,
            vector: position,
        };

        OutputBatch {
            lidar,
            gps,
            odom,
            velocity,
            imu,
            position,
        }
    }
}

/// Nested fix keeps its own stamp; only the frame id is replaced
fn reframe(fix: &NavSatFix, header: &Header) -> NavSatFix {
    NavSatFix {
        header: Header::new(fix.header.stamp, header.frame_id.clone()),
        ..fix.clone()
    }
}
