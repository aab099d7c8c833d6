//! 输入适配器
//!
//! 为 LiDAR / GNSS / IMU 各启动一个订阅处理任务，负责：
//! 1. 从 bus 订阅读取消息
//! 2. 校验样本
//! 3. 写入 `LatestValueStore`
//!
//! 处理任务从不发布消息；非法样本只记录并丢弃，不会终止任务。

use std::sync::Arc;

use bus::{Subscription, SubscriptionToken, TopicBus};
use contracts::{BusMessage, InputTopics, MessageKind};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;
use crate::store::LatestValueStore;
use crate::validate::{validate_imu, validate_nav_sat_fix, validate_point_cloud};

/// 输入流
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputStream {
    Lidar,
    Gnss,
    Imu,
}

impl InputStream {
    pub const ALL: [InputStream; 3] = [Self::Lidar, Self::Gnss, Self::Imu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lidar => "lidar",
            Self::Gnss => "gnss",
            Self::Imu => "imu",
        }
    }

    /// 该流上唯一接受的消息类型
    pub fn expected_kind(&self) -> MessageKind {
        match self {
            Self::Lidar => MessageKind::PointCloud,
            Self::Gnss => MessageKind::NavSatFix,
            Self::Imu => MessageKind::Imu,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Lidar => 0,
            Self::Gnss => 1,
            Self::Imu => 2,
        }
    }

    /// 该流在配置中对应的订阅 topic
    pub fn topic<'a>(&self, topics: &'a InputTopics) -> &'a str {
        match self {
            Self::Lidar => &topics.lidar,
            Self::Gnss => &topics.gnss,
            Self::Imu => &topics.imu,
        }
    }
}

impl std::fmt::Display for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 校验一条消息并写入 store
///
/// 出错时 store 不变。
pub fn handle_message(
    stream: InputStream,
    message: BusMessage,
    store: &LatestValueStore,
) -> Result<()> {
    match (stream, message) {
        (InputStream::Lidar, BusMessage::PointCloud(cloud)) => {
            validate_point_cloud(&cloud)?;
            store.write_lidar(cloud);
        }
        (InputStream::Gnss, BusMessage::NavSatFix(fix)) => {
            validate_nav_sat_fix(&fix)?;
            store.write_gnss(fix);
        }
        (InputStream::Imu, BusMessage::Imu(imu)) => {
            validate_imu(&imu)?;
            store.write_imu(imu);
        }
        (stream, other) => {
            return Err(IngestionError::UnexpectedMessage {
                stream: stream.as_str(),
                expected: stream.expected_kind(),
                actual: other.kind(),
            });
        }
    }
    Ok(())
}

struct HandlerWorker {
    stream: InputStream,
    token: SubscriptionToken,
    handle: JoinHandle<()>,
}

/// 三路订阅处理任务
pub struct InputAdapter {
    workers: Vec<HandlerWorker>,
    metrics: Arc<IngestionMetrics>,
}

impl InputAdapter {
    /// 订阅三个输入 topic 并启动处理任务
    ///
    /// 先完成全部订阅再启动任务；任一订阅失败时已建立的订阅随 drop 取消。
    /// 必须在 tokio 运行时内调用，否则在订阅之前返回 `NoRuntime`。
    #[instrument(
        name = "input_adapter_start",
        skip(bus, topics, store, metrics),
        fields(lidar = %topics.lidar, gnss = %topics.gnss, imu = %topics.imu)
    )]
    pub fn start(
        bus: &TopicBus,
        topics: &InputTopics,
        queue_capacity: usize,
        store: Arc<LatestValueStore>,
        metrics: Arc<IngestionMetrics>,
    ) -> Result<Self> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(IngestionError::NoRuntime);
        }

        let mut subscriptions = Vec::with_capacity(InputStream::ALL.len());
        for stream in InputStream::ALL {
            let topic = stream.topic(topics);
            let subscription = bus.subscribe(topic, queue_capacity).map_err(|source| {
                IngestionError::Subscribe {
                    topic: topic.to_string(),
                    source,
                }
            })?;
            subscriptions.push((stream, subscription));
        }

        let workers = subscriptions
            .into_iter()
            .map(|(stream, subscription)| {
                let token = subscription.token();
                let store = Arc::clone(&store);
                let metrics = Arc::clone(&metrics);
                let handle = tokio::spawn(async move {
                    run_handler(stream, subscription, store, metrics).await;
                });
                HandlerWorker {
                    stream,
                    token,
                    handle,
                }
            })
            .collect();

        info!("Input adapter started");
        Ok(Self { workers, metrics })
    }

    pub fn is_listening(&self) -> bool {
        !self.workers.is_empty()
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// 取消全部订阅并等待处理任务退出
    ///
    /// 幂等：第二次调用无任何效果。
    #[instrument(name = "input_adapter_stop", skip(self))]
    pub async fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for worker in &self.workers {
            worker.token.unsubscribe();
        }
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.handle.await {
                error!(stream = %worker.stream, error = ?e, "Input handler panicked");
            }
        }
        info!("Input adapter stopped");
    }
}

impl Drop for InputAdapter {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.token.unsubscribe();
        }
    }
}

#[instrument(
    name = "input_handler_loop",
    skip(subscription, store, metrics),
    fields(stream = %stream, topic = %subscription.topic())
)]
async fn run_handler(
    stream: InputStream,
    subscription: Subscription,
    store: Arc<LatestValueStore>,
    metrics: Arc<IngestionMetrics>,
) {
    debug!(stream = %stream, "Input handler started");

    while let Some(message) = subscription.recv().await {
        match handle_message(stream, message, &store) {
            Ok(()) => {
                metrics.record_accepted(stream);
                observability::record_sample(stream.as_str(), true);
                trace!(stream = %stream, "sample stored");
            }
            Err(e) => {
                metrics.record_rejected(stream);
                observability::record_sample(stream.as_str(), false);
                warn!(stream = %stream, error = %e, "Malformed sample discarded");
            }
        }
    }

    debug!(stream = %stream, "Input handler stopped");
}
