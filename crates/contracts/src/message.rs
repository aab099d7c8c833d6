//! BusMessage - the payload carried on every bus topic

use serde::{Deserialize, Serialize};

use crate::{
    GpsWithHeading, Header, Imu, InsVelocity, NavSatFix, OdometryWithGps, PointCloud2,
    Vector3Stamped,
};

/// Message carried on a topic
///
/// One variant per schema the bridge consumes or produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusMessage {
    PointCloud(PointCloud2),
    NavSatFix(NavSatFix),
    Imu(Imu),
    GpsWithHeading(GpsWithHeading),
    OdometryWithGps(OdometryWithGps),
    InsVelocity(InsVelocity),
    Vector3Stamped(Vector3Stamped),
}

/// Schema tag of a [`BusMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    PointCloud,
    NavSatFix,
    Imu,
    GpsWithHeading,
    OdometryWithGps,
    InsVelocity,
    Vector3Stamped,
}

impl MessageKind {
    /// ROS-style type name, used in logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PointCloud => "sensor_msgs/PointCloud2",
            Self::NavSatFix => "sensor_msgs/NavSatFix",
            Self::Imu => "sensor_msgs/Imu",
            Self::GpsWithHeading => "sensor_driver_msgs/GpswithHeading",
            Self::OdometryWithGps => "sensor_driver_msgs/OdometrywithGps",
            Self::InsVelocity => "sensor_driver_msgs/InsVelocity",
            Self::Vector3Stamped => "geometry_msgs/Vector3Stamped",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

impl BusMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::PointCloud(_) => MessageKind::PointCloud,
            Self::NavSatFix(_) => MessageKind::NavSatFix,
            Self::Imu(_) => MessageKind::Imu,
            Self::GpsWithHeading(_) => MessageKind::GpsWithHeading,
            Self::OdometryWithGps(_) => MessageKind::OdometryWithGps,
            Self::InsVelocity(_) => MessageKind::InsVelocity,
            Self::Vector3Stamped(_) => MessageKind::Vector3Stamped,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Self::PointCloud(m) => &m.header,
            Self::NavSatFix(m) => &m.header,
            Self::Imu(m) => &m.header,
            Self::GpsWithHeading(m) => &m.header,
            Self::OdometryWithGps(m) => &m.header,
            Self::InsVelocity(m) => &m.header,
            Self::Vector3Stamped(m) => &m.header,
        }
    }
}

macro_rules! impl_from_message {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for BusMessage {
                fn from(msg: $ty) -> Self {
                    BusMessage::$variant(msg)
                }
            }
        )*
    };
}

impl_from_message!(
    PointCloud2 => PointCloud,
    NavSatFix => NavSatFix,
    Imu => Imu,
    GpsWithHeading => GpsWithHeading,
    OdometryWithGps => OdometryWithGps,
    InsVelocity => InsVelocity,
    Vector3Stamped => Vector3Stamped,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Time;

    #[test]
    fn test_kind_and_header() {
        let msg: BusMessage = Vector3Stamped {
            header: Header::new(Time::from_secs_f64(3.5), "odom"),
            ..Default::default()
        }
        .into();
        assert_eq!(msg.kind(), MessageKind::Vector3Stamped);
        assert_eq!(msg.header().frame_id, "odom");
        assert_eq!(msg.kind().to_string(), "geometry_msgs/Vector3Stamped");
    }
}
