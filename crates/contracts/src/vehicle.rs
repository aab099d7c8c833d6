//! Vehicle state as reported by the simulator
//!
//! All values are in the simulator's native frame: meters, degrees,
//! meters/second and degrees/second.

use serde::{Deserialize, Serialize};

use crate::Vector3;

/// Position (x, y, z) in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation (pitch, yaw, roll) in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Location + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Location,
    pub rotation: Rotation,
}

/// Kinematic state of the ego vehicle at the moment of a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleKinematics {
    pub transform: Transform,
    /// m/s
    pub velocity: Vector3,
    /// deg/s
    pub angular_velocity: Vector3,
}

impl VehicleKinematics {
    pub fn location(&self) -> &Location {
        &self.transform.location
    }

    pub fn rotation(&self) -> &Rotation {
        &self.transform.rotation
    }
}

/// Actuation command applied to the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    /// [0, 1]
    pub throttle: f64,
    /// [-1, 1]
    pub steer: f64,
    /// [0, 1]
    pub brake: f64,
    pub hand_brake: bool,
    pub reverse: bool,
    pub manual_gear_shift: bool,
    /// -1 reverse, 0 neutral, >0 forward
    pub gear: i32,
}

impl Default for VehicleControl {
    fn default() -> Self {
        Self {
            throttle: 0.0,
            steer: 0.0,
            brake: 0.0,
            hand_brake: false,
            reverse: false,
            manual_gear_shift: false,
            gear: 0,
        }
    }
}

/// Vehicle light bitmask (CARLA `VehicleLightState` layout)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleLightState(u32);

impl VehicleLightState {
    pub const NONE: Self = Self(0);
    pub const POSITION: Self = Self(0x1);
    pub const LOW_BEAM: Self = Self(0x1 << 1);
    pub const HIGH_BEAM: Self = Self(0x1 << 2);
    pub const BRAKE: Self = Self(0x1 << 3);
    pub const RIGHT_BLINKER: Self = Self(0x1 << 4);
    pub const LEFT_BLINKER: Self = Self(0x1 << 5);
    pub const REVERSE: Self = Self(0x1 << 6);
    pub const FOG: Self = Self(0x1 << 7);
    pub const INTERIOR: Self = Self(0x1 << 8);
    pub const SPECIAL1: Self = Self(0x1 << 9);
    pub const SPECIAL2: Self = Self(0x1 << 10);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set or clear `flag`
    pub fn set(&mut self, flag: Self, enabled: bool) {
        if enabled {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }
}

impl std::ops::BitOr for VehicleLightState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
