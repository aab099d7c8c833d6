//! 输入样本校验
//!
//! 非法样本会被丢弃，store 中保留上一次的合法值。

use contracts::{Imu, NavSatFix, PointCloud2, VehicleKinematics};

use crate::error::{IngestionError, Result};

const LIDAR: &str = "lidar";
const GNSS: &str = "gnss";
const IMU: &str = "imu";
const KINEMATICS: &str = "kinematics";

/// 点云布局校验
///
/// - `point_step * width <= row_step`
/// - `data.len() == height * row_step`
pub fn validate_point_cloud(cloud: &PointCloud2) -> Result<()> {
    let packed_row = cloud.point_step as u64 * cloud.width as u64;
    if packed_row > cloud.row_step as u64 {
        return Err(IngestionError::malformed(
            LIDAR,
            format!(
                "point_step {} * width {} exceeds row_step {}",
                cloud.point_step, cloud.width, cloud.row_step
            ),
        ));
    }

    let expected = cloud.height as u64 * cloud.row_step as u64;
    if cloud.data.len() as u64 != expected {
        return Err(IngestionError::malformed(
            LIDAR,
            format!(
                "data length {} != height {} * row_step {}",
                cloud.data.len(),
                cloud.height,
                cloud.row_step
            ),
        ));
    }
    Ok(())
}

/// GNSS 校验：数值有限，经纬度在合法范围内
pub fn validate_nav_sat_fix(fix: &NavSatFix) -> Result<()> {
    for (name, value) in [
        ("latitude", fix.latitude),
        ("longitude", fix.longitude),
        ("altitude", fix.altitude),
    ] {
        if !value.is_finite() {
            return Err(IngestionError::malformed(
                GNSS,
                format!("{name} is not finite"),
            ));
        }
    }
    if !(-90.0..=90.0).contains(&fix.latitude) {
        return Err(IngestionError::malformed(
            GNSS,
            format!("latitude {} out of [-90, 90]", fix.latitude),
        ));
    }
    if !(-180.0..=180.0).contains(&fix.longitude) {
        return Err(IngestionError::malformed(
            GNSS,
            format!("longitude {} out of [-180, 180]", fix.longitude),
        ));
    }
    Ok(())
}

/// IMU 校验：姿态、角速度、线加速度均为有限值
pub fn validate_imu(imu: &Imu) -> Result<()> {
    if !imu.orientation.is_finite() {
        return Err(IngestionError::malformed(IMU, "orientation is not finite"));
    }
    if !imu.angular_velocity.is_finite() {
        return Err(IngestionError::malformed(
            IMU,
            "angular_velocity is not finite",
        ));
    }
    if !imu.linear_acceleration.is_finite() {
        return Err(IngestionError::malformed(
            IMU,
            "linear_acceleration is not finite",
        ));
    }
    Ok(())
}

/// 车辆状态校验
pub fn validate_kinematics(kinematics: &VehicleKinematics) -> Result<()> {
    let location = kinematics.location();
    let rotation = kinematics.rotation();
    let finite = [
        location.x,
        location.y,
        location.z,
        rotation.pitch,
        rotation.yaw,
        rotation.roll,
    ]
    .iter()
    .all(|v| v.is_finite())
        && kinematics.velocity.is_finite()
        && kinematics.angular_velocity.is_finite();

    if finite {
        Ok(())
    } else {
        Err(IngestionError::malformed(
            KINEMATICS,
            "non-finite transform or velocity",
        ))
    }
}
