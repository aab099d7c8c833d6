//! Mock 传感器源
//!
//! 用于无 CARLA 环境的运行与测试：按配置频率向 bus 发布合成的
//! LiDAR / GNSS / IMU 消息，替代模拟器自带的传感器发布。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bus::{BusError, TopicBus};
use bytemuck::{Pod, Zeroable};
use bytes::Bytes;
use contracts::{
    covariance_type, point_field, BusMessage, GeoOrigin, Header, Imu, InputTopics, NavSatFix,
    NavSatStatus, PointCloud2, PointField, Quaternion, SimulationConfig, Time, Vector3,
    VehicleKinematics, VehicleStateSource,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::adapter::InputStream;

/// WGS 84 赤道半径 (m)
const EARTH_RADIUS_M: f64 = 6_378_137.0;

const GRAVITY: f64 = 9.81;

/// LiDAR 点 (x, y, z, intensity: f32)，与 CARLA LidarDetection 布局一致
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LidarPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

/// 每点字节数
pub const POINT_STEP: u32 = std::mem::size_of::<LidarPoint>() as u32;

/// Mock 传感器源配置
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// 传感器类型
    pub stream: InputStream,

    /// 发布 topic
    pub topic: String,

    /// 发送频率 (Hz)
    pub frequency_hz: f64,

    /// LiDAR 点数（仅 Lidar）
    pub lidar_points: u32,

    /// 地图原点经纬度（仅 GNSS）
    pub origin: GeoOrigin,

    /// 消息 frame id
    pub frame_id: String,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            stream: InputStream::Lidar,
            topic: "/carla/ego_vehicle/lidar".to_string(),
            frequency_hz: 10.0,
            lidar_points: 2048,
            origin: GeoOrigin::default(),
            frame_id: "ego_vehicle".to_string(),
        }
    }
}

/// Mock 传感器源
///
/// 可选绑定车辆状态源：GNSS 位置与 IMU 角速度随车辆轨迹变化。
pub struct MockSensorSource {
    config: MockSensorConfig,
    vehicle: Option<Arc<dyn VehicleStateSource>>,
    running: Arc<AtomicBool>,
}

impl MockSensorSource {
    /// 创建新的 Mock 传感器源
    pub fn new(config: MockSensorConfig) -> Self {
        Self {
            config,
            vehicle: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 创建 Mock LiDAR 源
    pub fn lidar(topic: &str, frequency_hz: f64, num_points: u32) -> Self {
        Self::new(MockSensorConfig {
            stream: InputStream::Lidar,
            topic: topic.to_string(),
            frequency_hz,
            lidar_points: num_points,
            ..Default::default()
        })
    }

    /// 创建 Mock GNSS 源
    pub fn gnss(topic: &str, frequency_hz: f64, origin: GeoOrigin) -> Self {
        Self::new(MockSensorConfig {
            stream: InputStream::Gnss,
            topic: topic.to_string(),
            frequency_hz,
            origin,
            ..Default::default()
        })
    }

    /// 创建 Mock IMU 源
    pub fn imu(topic: &str, frequency_hz: f64) -> Self {
        Self::new(MockSensorConfig {
            stream: InputStream::Imu,
            topic: topic.to_string(),
            frequency_hz,
            ..Default::default()
        })
    }

    /// 按仿真配置创建三路源
    pub fn from_simulation(sim: &SimulationConfig, topics: &InputTopics) -> Vec<Self> {
        vec![
            Self::lidar(&topics.lidar, sim.lidar_hz, sim.lidar_points),
            Self::gnss(&topics.gnss, sim.gnss_hz, sim.origin),
            Self::imu(&topics.imu, sim.imu_hz),
        ]
    }

    /// 绑定车辆状态源
    pub fn with_vehicle(mut self, vehicle: Arc<dyn VehicleStateSource>) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn config(&self) -> &MockSensorConfig {
        &self.config
    }

    /// 启动 Mock 源，向 bus 发布
    ///
    /// 重复启动返回 `None`。
    pub fn start(&self, bus: &TopicBus) -> Result<Option<JoinHandle<()>>, BusError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        let publisher = match bus.advertise(&self.config.topic) {
            Ok(publisher) => publisher,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let config = self.config.clone();
        let vehicle = self.vehicle.clone();
        let running = Arc::clone(&self.running);
        let period = Duration::from_secs_f64(1.0 / config.frequency_hz.max(0.001));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let start_time = Instant::now();
            let mut seq: u64 = 0;

            debug!(
                topic = %config.topic,
                stream = %config.stream,
                frequency_hz = config.frequency_hz,
                "mock sensor source started"
            );

            loop {
                interval.tick().await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                seq += 1;

                let stamp = Time::from_secs_f64(start_time.elapsed().as_secs_f64());
                let kinematics = vehicle.as_ref().and_then(|v| v.kinematics().ok());
                let message = generate(&config, seq, stamp, kinematics.as_ref());

                match publisher.publish(message) {
                    Ok(delivered) => {
                        trace!(topic = %config.topic, seq, delivered, "mock sample sent")
                    }
                    Err(BusError::QueueFull { .. }) => {
                        trace!(topic = %config.topic, seq, "mock sample dropped")
                    }
                    Err(e) => {
                        debug!(topic = %config.topic, error = %e, "mock sensor publisher closed");
                        break;
                    }
                }
            }

            publisher.close();
            running.store(false, Ordering::SeqCst);
            debug!(topic = %config.topic, "mock sensor source stopped");
        });

        Ok(Some(handle))
    }

    /// 停止 Mock 源 (下一个 tick 生效)
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// 生成一条合成消息
pub fn generate(
    config: &MockSensorConfig,
    seq: u64,
    stamp: Time,
    kinematics: Option<&VehicleKinematics>,
) -> BusMessage {
    let header = Header::new(stamp, config.frame_id.clone());
    match config.stream {
        InputStream::Lidar => synthetic_cloud(header, config.lidar_points, seq).into(),
        InputStream::Gnss => synthetic_fix(header, &config.origin, kinematics).into(),
        InputStream::Imu => synthetic_imu(header, kinematics).into(),
    }
}

/// 环形扫描点云，半径随 seq 缓慢变化
pub fn synthetic_cloud(header: Header, num_points: u32, seq: u64) -> PointCloud2 {
    let radius = 10.0 + 2.0 * (seq as f32 * 0.1).sin();
    let points: Vec<LidarPoint> = (0..num_points)
        .map(|i| {
            let angle = i as f32 / num_points.max(1) as f32 * std::f32::consts::TAU;
            LidarPoint {
                x: radius * angle.cos(),
                y: radius * angle.sin(),
                z: -1.5,
                intensity: 0.5,
            }
        })
        .collect();

    PointCloud2 {
        header,
        height: 1,
        width: num_points,
        fields: vec![
            PointField::new("x", 0, point_field::FLOAT32),
            PointField::new("y", 4, point_field::FLOAT32),
            PointField::new("z", 8, point_field::FLOAT32),
            PointField::new("intensity", 12, point_field::FLOAT32),
        ],
        is_bigendian: false,
        point_step: POINT_STEP,
        row_step: POINT_STEP * num_points,
        data: Bytes::copy_from_slice(bytemuck::cast_slice(&points)),
        is_dense: true,
    }
}

/// 由车辆位置推算经纬度 (局部平面近似)
///
/// CARLA 的 y 轴指向南，纬度随 -y 增加。
pub fn synthetic_fix(
    header: Header,
    origin: &GeoOrigin,
    kinematics: Option<&VehicleKinematics>,
) -> NavSatFix {
    let location = kinematics.map(|k| *k.location()).unwrap_or_default();
    let latitude = origin.latitude + (-location.y / EARTH_RADIUS_M).to_degrees();
    let lon_scale = EARTH_RADIUS_M * origin.latitude.to_radians().cos();
    let longitude = origin.longitude + (location.x / lon_scale).to_degrees();

    NavSatFix {
        header,
        status: NavSatStatus {
            status: NavSatStatus::STATUS_FIX,
            service: NavSatStatus::SERVICE_GPS,
        },
        latitude,
        longitude,
        altitude: origin.altitude + location.z,
        position_covariance: [0.0; 9],
        position_covariance_type: covariance_type::UNKNOWN,
    }
}

/// 静止加速度计 + 车辆角速度 (deg/s -> rad/s)
pub fn synthetic_imu(header: Header, kinematics: Option<&VehicleKinematics>) -> Imu {
    let (angular_velocity, orientation) = match kinematics {
        Some(k) => {
            let w = k.angular_velocity;
            let half_yaw = k.rotation().yaw.to_radians() / 2.0;
            (
                Vector3::new(w.x.to_radians(), w.y.to_radians(), w.z.to_radians()),
                Quaternion {
                    x: 0.0,
                    y: 0.0,
                    z: half_yaw.sin(),
                    w: half_yaw.cos(),
                },
            )
        }
        None => (Vector3::default(), Quaternion::default()),
    };

    Imu {
        header,
        orientation,
        angular_velocity,
        linear_acceleration: Vector3::new(0.0, 0.0, GRAVITY),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate_imu, validate_nav_sat_fix, validate_point_cloud};

    #[test]
    fn test_synthetic_cloud_layout() {
        let cloud = synthetic_cloud(Header::default(), 100, 1);
        assert!(validate_point_cloud(&cloud).is_ok());
        assert_eq!(cloud.point_step, 16);
        assert_eq!(cloud.data.len(), 1600);

        let first: LidarPoint = bytemuck::pod_read_unaligned(&cloud.data[..16]);
        assert_eq!(first.z, -1.5);
        assert_eq!(first.intensity, 0.5);
    }

    #[test]
    fn test_synthetic_fix_follows_vehicle() {
        let origin = GeoOrigin {
            latitude: 49.0,
            longitude: 8.0,
            altitude: 100.0,
        };
        let mut k = VehicleKinematics::default();
        k.transform.location.y = -1000.0;
        k.transform.location.z = 2.0;

        let fix = synthetic_fix(Header::default(), &origin, Some(&k));
        assert!(validate_nav_sat_fix(&fix).is_ok());
        assert!(fix.latitude > origin.latitude);
        assert_eq!(fix.longitude, origin.longitude);
        assert_eq!(fix.altitude, 102.0);
    }

    #[test]
    fn test_synthetic_imu_units() {
        let mut k = VehicleKinematics::default();
        k.angular_velocity = Vector3::new(0.0, 0.0, 180.0);
        let imu = synthetic_imu(Header::default(), Some(&k));
        assert!(validate_imu(&imu).is_ok());
        assert!((imu.angular_velocity.z - std::f64::consts::PI).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_mock_source_publishes_on_bus() {
        let bus = TopicBus::new();
        let sub = bus.subscribe("/mock/imu", 10).unwrap();
        let source = MockSensorSource::imu("/mock/imu", 200.0);

        let handle = source.start(&bus).unwrap().unwrap();
        assert!(source.start(&bus).unwrap().is_none());

        for _ in 0..3 {
            let message = sub.recv().await.unwrap();
            assert!(matches!(message, BusMessage::Imu(_)));
        }

        source.stop();
        handle.await.unwrap();
        assert!(!source.is_running());
    }

    #[test]
    fn test_from_simulation() {
        let topics = InputTopics {
            lidar: "/l".into(),
            gnss: "/g".into(),
            imu: "/i".into(),
        };
        let sources = MockSensorSource::from_simulation(&SimulationConfig::default(), &topics);
        let streams: Vec<_> = sources.iter().map(|s| s.config().stream).collect();
        assert_eq!(
            streams,
            vec![InputStream::Lidar, InputStream::Gnss, InputStream::Imu]
        );
        assert_eq!(sources[0].config().lidar_points, 2048);
    }
}
