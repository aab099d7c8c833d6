//! Simulated vehicle
//!
//! Stands in for the simulator's ego vehicle in mock runs. Kinematics come
//! from a closed-form circular path evaluated at the elapsed wall time; no
//! dynamics are simulated, so applied controls are only recorded.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use contracts::{
    ContractError, Location, Rotation, SimulationConfig, Transform, Vector3, VehicleActuator,
    VehicleControl, VehicleKinematics, VehicleLightState, VehicleStateSource,
};
use tracing::{debug, info};

#[derive(Debug)]
struct SimState {
    start: Instant,
    control: VehicleControl,
    lights: VehicleLightState,
    restarts: u64,
}

/// Vehicle driving a circle of `radius_m` at constant `speed_mps`
#[derive(Debug)]
pub struct SimulatedVehicle {
    id: String,
    speed_mps: f64,
    radius_m: f64,
    state: Mutex<SimState>,
}

impl SimulatedVehicle {
    pub fn new(id: impl Into<String>, speed_mps: f64, radius_m: f64) -> Self {
        Self {
            id: id.into(),
            speed_mps,
            radius_m,
            state: Mutex::new(SimState {
                start: Instant::now(),
                control: VehicleControl::default(),
                lights: VehicleLightState::NONE,
                restarts: 0,
            }),
        }
    }

    pub fn from_config(sim: &SimulationConfig) -> Self {
        Self::new(&sim.vehicle_id, sim.speed_mps, sim.turn_radius_m)
    }

    /// Kinematics `t` seconds after (re)start
    ///
    /// Starts at the origin heading along +x (yaw 0) and turns towards +y.
    pub fn kinematics_at(&self, t: f64) -> VehicleKinematics {
        let omega = if self.radius_m > 0.0 {
            self.speed_mps / self.radius_m
        } else {
            0.0
        };
        let theta = omega * t;
        let (sin, cos) = theta.sin_cos();

        VehicleKinematics {
            transform: Transform {
                location: Location {
                    x: self.radius_m * sin,
                    y: self.radius_m * (1.0 - cos),
                    z: 0.0,
                },
                rotation: Rotation {
                    pitch: 0.0,
                    yaw: normalize_deg(theta.to_degrees()),
                    roll: 0.0,
                },
            },
            velocity: Vector3::new(self.speed_mps * cos, self.speed_mps * sin, 0.0),
            angular_velocity: Vector3::new(0.0, 0.0, omega.to_degrees()),
        }
    }

    /// Put the vehicle back at the start of its path
    pub fn restart(&self) {
        let mut state = self.lock();
        state.start = Instant::now();
        state.control = VehicleControl::default();
        state.lights = VehicleLightState::NONE;
        state.restarts += 1;
        info!(vehicle = %self.id, restarts = state.restarts, "Simulated vehicle restarted");
    }

    pub fn restarts(&self) -> u64 {
        self.lock().restarts
    }

    pub fn last_control(&self) -> VehicleControl {
        self.lock().control
    }

    pub fn light_state(&self) -> VehicleLightState {
        self.lock().lights
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Wrap into (-180, 180]
fn normalize_deg(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

impl VehicleStateSource for SimulatedVehicle {
    fn vehicle_id(&self) -> &str {
        &self.id
    }

    fn kinematics(&self) -> Result<VehicleKinematics, ContractError> {
        let elapsed = self.lock().start.elapsed().as_secs_f64();
        Ok(self.kinematics_at(elapsed))
    }
}

impl VehicleActuator for SimulatedVehicle {
    fn apply_control(&self, control: &VehicleControl) -> Result<(), ContractError> {
        self.lock().control = *control;
        Ok(())
    }

    fn set_light_state(&self, lights: VehicleLightState) -> Result<(), ContractError> {
        self.lock().lights = lights;
        debug!(vehicle = %self.id, lights = lights.bits(), "light state changed");
        Ok(())
    }
}
