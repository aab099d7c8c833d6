//! Vehicle collaborator traits
//!
//! The simulator only answers synchronous queries for vehicle kinematics; it
//! never pushes them. These traits decouple the bridge from the concrete
//! simulator client so real and scripted vehicles are handled the same way.

use crate::{ContractError, VehicleControl, VehicleKinematics, VehicleLightState};

/// Polled source of ego-vehicle kinematics
///
/// Implementations may block (a simulator round-trip); callers run the query
/// off the async executor.
///
/// # Example
///
/// ```ignore
/// let vehicle: Arc<dyn VehicleStateSource> = Arc::new(simulated_vehicle);
/// let kinematics = vehicle.kinematics()?;
/// println!("yaw = {}", kinematics.rotation().yaw);
/// ```
pub trait VehicleStateSource: Send + Sync {
    /// Vehicle role name (used for logging)
    fn vehicle_id(&self) -> &str;

    /// Location, rotation, linear and angular velocity as of the call
    fn kinematics(&self) -> Result<VehicleKinematics, ContractError>;
}

/// Actuation side of the vehicle
pub trait VehicleActuator: Send + Sync {
    /// Apply a control command
    fn apply_control(&self, control: &VehicleControl) -> Result<(), ContractError>;

    /// Replace the vehicle light bitmask
    fn set_light_state(&self, lights: VehicleLightState) -> Result<(), ContractError>;
}
