//! 单个发布周期
//!
//! 顺序：查询车辆状态 → 快照 → 构建 → 发布。

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::Time;
use ingestion::{KinematicsPoller, LatestValueStore};
use observability::CycleSample;
use tracing::{error, instrument, trace};

use crate::builder::OutputBuilder;
use crate::publishers::OutputPublishers;

/// 一个周期的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// 周期耗时
    pub duration: Duration,
    /// 本批消息的时间戳
    pub stamp: Time,
    /// 成功发布的 topic 数
    pub published: usize,
    /// 发布失败的 topic
    pub failed_topics: Vec<String>,
    /// 车辆状态查询是否成功
    pub kinematics_ok: bool,
}

impl CycleReport {
    pub fn is_overrun(&self, period: Duration) -> bool {
        self.duration > period
    }

    pub fn to_sample(&self, period: Duration) -> CycleSample {
        CycleSample {
            duration_ms: self.duration.as_secs_f64() * 1000.0,
            overrun: self.is_overrun(period),
            published: self.published,
            failed_topics: self.failed_topics.clone(),
            kinematics_ok: self.kinematics_ok,
        }
    }
}

/// 发布周期所需的全部组件
#[derive(Clone)]
pub struct PublishCycle {
    poller: KinematicsPoller,
    store: Arc<LatestValueStore>,
    builder: OutputBuilder,
    publishers: Arc<OutputPublishers>,
}

impl PublishCycle {
    pub fn new(
        poller: KinematicsPoller,
        store: Arc<LatestValueStore>,
        builder: OutputBuilder,
        publishers: Arc<OutputPublishers>,
    ) -> Self {
        Self {
            poller,
            store,
            builder,
            publishers,
        }
    }

    /// 执行一次完整周期
    ///
    /// 车辆状态查询是阻塞调用，放在 blocking 线程池中执行并等待完成。
    /// 查询失败时沿用上一次的状态继续发布。
    #[instrument(name = "publish_cycle", skip(self), level = "debug")]
    pub async fn run_once(&self) -> CycleReport {
        let start = Instant::now();

        let poller = self.poller.clone();
        let kinematics_ok = match tokio::task::spawn_blocking(move || poller.poll()).await {
            Ok(result) => result.is_ok(),
            Err(e) => {
                error!(error = %e, "Kinematics poll task failed");
                false
            }
        };

        let frame = self.store.snapshot();
        let stamp = frame.header.stamp;
        let batch = self.builder.build(&frame);
        let outcomes = self.publishers.publish_batch(batch);

        let mut published = 0;
        let mut failed_topics = Vec::new();
        for outcome in outcomes {
            if outcome.is_ok() {
                published += 1;
            } else {
                failed_topics.push(outcome.topic);
            }
        }

        let duration = start.elapsed();
        observability::record_cycle(duration.as_secs_f64() * 1000.0);
        trace!(published, failed = failed_topics.len(), "cycle done");

        CycleReport {
            duration,
            stamp,
            published,
            failed_topics,
            kinematics_ok,
        }
    }
}
