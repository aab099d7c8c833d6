//! Simulator frame → output frame conversion
//!
//! Pure functions. Locations and velocities are copied field by field; only
//! the heading carries an offset.

use contracts::{Location, Quaternion, Rotation, Twist, Vector3};
use nalgebra::{UnitQuaternion, Vector3 as NVector3};

pub use contracts::HEADING_YAW_OFFSET_DEG;

/// Location (m) as a vector
pub fn position_to_vector(location: &Location) -> Vector3 {
    Vector3::new(location.x, location.y, location.z)
}

/// Linear (m/s) + angular (deg/s) velocity as a twist, units unchanged
pub fn kinematics_to_twist(linear: &Vector3, angular: &Vector3) -> Twist {
    Twist {
        linear: *linear,
        angular: *angular,
    }
}

/// GPS heading from simulator yaw, both in degrees
///
/// `heading = yaw - offset`; callers normally pass the configured
/// `heading_offset_deg`, which defaults to [`HEADING_YAW_OFFSET_DEG`].
pub fn heading_from_yaw(yaw_deg: f64, offset_deg: f64) -> f64 {
    yaw_deg - offset_deg
}

/// Euclidean norm of a velocity (m/s)
pub fn speed_magnitude(velocity: &Vector3) -> f64 {
    NVector3::new(velocity.x, velocity.y, velocity.z).norm()
}

/// Roll/pitch/yaw in degrees to a unit quaternion
pub fn rotation_to_quaternion(rotation: &Rotation) -> Quaternion {
    let q = UnitQuaternion::from_euler_angles(
        rotation.roll.to_radians(),
        rotation.pitch.to_radians(),
        rotation.yaw.to_radians(),
    );
    let q = q.quaternion();
    Quaternion {
        x: q.i,
        y: q.j,
        z: q.k,
        w: q.w,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_heading_from_yaw() {
        assert_eq!(heading_from_yaw(90.0, HEADING_YAW_OFFSET_DEG), 0.0);
        assert_eq!(heading_from_yaw(0.0, HEADING_YAW_OFFSET_DEG), -90.0);
        assert_eq!(heading_from_yaw(-45.0, 0.0), -45.0);
    }

    #[test]
    fn test_position_copy() {
        let v = position_to_vector(&Location {
            x: 10.0,
            y: -20.0,
            z: 30.5,
        });
        assert_eq!(v, Vector3::new(10.0, -20.0, 30.5));
    }

    #[test]
    fn test_twist_copy() {
        let twist = kinematics_to_twist(&Vector3::new(1.0, 0.0, 0.0), &Vector3::new(0.0, 0.0, 0.5));
        assert_eq!(twist.linear.x, 1.0);
        assert_eq!(twist.angular.z, 0.5);
    }

    #[test]
    fn test_speed_magnitude() {
        assert!(close(speed_magnitude(&Vector3::new(3.0, 4.0, 0.0)), 5.0));
        assert_eq!(speed_magnitude(&Vector3::default()), 0.0);
    }

    #[test]
    fn test_quaternion_identity_and_yaw() {
        let q = rotation_to_quaternion(&Rotation::default());
        assert!(close(q.w, 1.0) && close(q.z, 0.0));

        let q = rotation_to_quaternion(&Rotation {
            yaw: 90.0,
            ..Default::default()
        });
        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert!(close(q.w, half));
        assert!(close(q.z, half));
        assert!(close(q.x, 0.0) && close(q.y, 0.0));
    }
}
