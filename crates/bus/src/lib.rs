//! # Bus
//!
//! 进程内 topic 总线。
//!
//! 负责：
//! - 按 topic 名称广播 `BusMessage`
//! - 每个订阅者独立的有界队列，满则丢弃，发布端永不阻塞
//! - 输出 topic 上挂载 sink worker (日志/监控)

pub mod error;
pub mod handle;
pub mod metrics;
pub mod monitor;
pub mod sinks;
pub mod topic;

pub use contracts::{BusMessage, MessageSink};
pub use error::BusError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, PublisherMetrics, PublisherSnapshot, SinkMetrics};
pub use monitor::{OutputMonitor, SinkReport};
pub use sinks::LogSink;
pub use topic::{Publisher, Subscription, SubscriptionToken, TopicBus};
