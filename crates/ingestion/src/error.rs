//! Ingestion 错误类型

use contracts::MessageKind;
use thiserror::Error;

/// Ingestion 错误
///
/// 均为可恢复错误：记录日志与计数后丢弃样本，保留上一次的值。
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 样本数值非法 (NaN / 越界 / 点云长度不一致)
    #[error("malformed {stream} sample: {reason}")]
    MalformedSample {
        /// 输入流名称
        stream: &'static str,
        /// 原因
        reason: String,
    },

    /// topic 上收到了非预期的消息类型
    #[error("unexpected {actual} on {stream} stream, expected {expected}")]
    UnexpectedMessage {
        stream: &'static str,
        expected: MessageKind,
        actual: MessageKind,
    },

    /// 车辆状态查询失败
    #[error("kinematics query failed for '{vehicle}': {message}")]
    KinematicsQuery {
        /// 车辆 ID
        vehicle: String,
        /// 错误消息
        message: String,
    },

    /// 订阅失败
    #[error("failed to subscribe to '{topic}': {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: bus::BusError,
    },

    /// 处理任务需要 tokio 运行时
    #[error("input adapter must be started from within a tokio runtime")]
    NoRuntime,
}

impl IngestionError {
    pub fn malformed(stream: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedSample {
            stream,
            reason: reason.into(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
