//! # Fusion
//!
//! 车辆信息融合转发。
//!
//! 负责：
//! - 仿真坐标 / 单位转换 (`convert`)
//! - 从状态快照构建六条输出消息
//! - 定时发布周期调度
//! - `VehicleInfoBridge` 生命周期
//!
//! ## 使用示例
//!
//! ```ignore
//! use fusion::VehicleInfoBridge;
//!
//! let bus = TopicBus::new();
//! let vehicle: Arc<dyn VehicleStateSource> =
//!     Arc::new(SimulatedVehicle::from_config(&config.simulation));
//!
//! let mut bridge = VehicleInfoBridge::new(config, bus.clone(), vehicle)?;
//! bridge.start()?;
//! // ...
//! bridge.stop().await;
//! println!("{}", bridge.summary());
//! ```

mod bridge;
mod builder;
pub mod convert;
mod cycle;
mod error;
mod metrics;
mod publishers;
mod scheduler;

// Re-exports
pub use bridge::{BridgeState, VehicleInfoBridge};
pub use builder::{OutputBatch, OutputBuilder};
pub use convert::{
    heading_from_yaw, kinematics_to_twist, position_to_vector, rotation_to_quaternion,
    speed_magnitude, HEADING_YAW_OFFSET_DEG,
};
pub use cycle::{CycleReport, PublishCycle};
pub use error::{BridgeError, Result};
pub use metrics::BridgeMetrics;
pub use publishers::{OutputPublishers, TopicOutcome};
pub use scheduler::SchedulerHandle;
