//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Frames and units
//! - Inbound/outbound messages follow ROS message layouts (`msgs`)
//! - Vehicle kinematics stay in the simulator frame: meters, degrees, m/s, deg/s
//! - Header stamps use CARLA simulation time

mod config;
mod error;
mod message;
mod msgs;
mod sink;
mod vehicle;
mod vehicle_source;

pub use config::*;
pub use error::*;
pub use message::{BusMessage, MessageKind};
pub use msgs::*;
pub use sink::{LocalMessageSink, MessageSink};
pub use vehicle::*;
pub use vehicle_source::{VehicleActuator, VehicleStateSource};
