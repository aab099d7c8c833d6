//! # Vehicle
//!
//! Vehicle-side collaborators of the bridge.
//!
//! Responsibilities:
//! - Answer kinematics queries (`VehicleStateSource`) without a live simulator
//! - Accept control commands and light state (`VehicleActuator`)
//! - Turn held keys into vehicle control (`KeyboardController`)
//!
//! `SimulatedVehicle` follows a scripted circular path for mock runs;
//! `ScriptedVehicle` returns fixed values and injected failures for tests.

pub mod control;
pub mod scripted;
pub mod simulated;

pub use contracts::{VehicleActuator, VehicleStateSource};
pub use control::{ControlOutcome, KeyEvent, KeyState, KeyboardController};
pub use scripted::ScriptedVehicle;
pub use simulated::SimulatedVehicle;
