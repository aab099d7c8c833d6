//! VehicleInfoBridge 生命周期
//!
//! 状态机：Idle → Running → Stopped。
//!
//! - `new`: 校验配置，分配本实例的 store
//! - `start`: advertise 六个输出 → 订阅三个输入 → 启动调度任务
//! - `stop`: 停止调度 → 取消订阅 → 关闭输出，幂等

use std::sync::Arc;
use std::time::Duration;

use bus::{PublisherSnapshot, TopicBus};
use contracts::{BridgeConfig, ContractError, VehicleStateSource};
use ingestion::{IngestionMetrics, InputAdapter, KinematicsPoller, LatestValueStore, SensorFrame};
use observability::MetricsSummary;
use tracing::{info, instrument, warn};

use crate::builder::OutputBuilder;
use crate::cycle::PublishCycle;
use crate::error::{BridgeError, Result};
use crate::metrics::BridgeMetrics;
use crate::publishers::OutputPublishers;
use crate::scheduler::SchedulerHandle;

/// Bridge 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Running,
    Stopped,
}

impl BridgeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 运行期资源
struct RunningParts {
    publishers: Arc<OutputPublishers>,
    adapter: InputAdapter,
    scheduler: SchedulerHandle,
}

/// 车辆信息融合转发 bridge
pub struct VehicleInfoBridge {
    config: BridgeConfig,
    period: Duration,
    bus: TopicBus,
    vehicle: Arc<dyn VehicleStateSource>,
    store: Arc<LatestValueStore>,
    ingestion_metrics: Arc<IngestionMetrics>,
    metrics: Arc<BridgeMetrics>,
    state: BridgeState,
    running: Option<RunningParts>,
}

impl VehicleInfoBridge {
    /// 创建 bridge
    ///
    /// 配置非法时返回 `BridgeError::Config`，此时尚未建立任何订阅。
    pub fn new(
        config: BridgeConfig,
        bus: TopicBus,
        vehicle: Arc<dyn VehicleStateSource>,
    ) -> Result<Self> {
        config_loader::validate(&config)?;
        let period = config.loop_period().ok_or_else(|| {
            ContractError::config_validation("loop_rate", "must be a positive duration")
        })?;

        let store = Arc::new(LatestValueStore::new(&config.frame_id));
        Ok(Self {
            config,
            period,
            bus,
            vehicle,
            store,
            ingestion_metrics: Arc::new(IngestionMetrics::new()),
            metrics: Arc::new(BridgeMetrics::new()),
            state: BridgeState::Idle,
            running: None,
        })
    }

    /// 启动 bridge
    ///
    /// 运行中再次调用无效果；`stop` 之后调用返回 `InvalidState`。
    /// 中途失败时已创建的资源全部释放，状态保持 Idle。
    /// 处理任务与调度器由 tokio 承载：运行时之外调用返回 `NoRuntime`，
    /// 不会创建任何订阅或发布者。
    #[instrument(
        name = "bridge_start",
        skip(self),
        fields(vehicle = %self.vehicle.vehicle_id(), loop_rate = self.config.loop_rate)
    )]
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            BridgeState::Running => return Ok(()),
            BridgeState::Stopped => {
                return Err(BridgeError::InvalidState {
                    state: BridgeState::Stopped.as_str(),
                    operation: "start",
                })
            }
            BridgeState::Idle => {}
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(BridgeError::NoRuntime);
        }

        let publishers = Arc::new(OutputPublishers::advertise(
            &self.bus,
            &self.config.output_topics(),
        )?);

        let adapter = match InputAdapter::start(
            &self.bus,
            &self.config.input_topics(),
            self.config.queue_capacity,
            Arc::clone(&self.store),
            Arc::clone(&self.ingestion_metrics),
        ) {
            Ok(adapter) => adapter,
            Err(e) => {
                publishers.close_all();
                warn!(error = %e, "Bridge start failed, publishers closed");
                return Err(e.into());
            }
        };

        let poller = KinematicsPoller::new(
            Arc::clone(&self.vehicle),
            Arc::clone(&self.store),
            Arc::clone(&self.ingestion_metrics),
        );
        let cycle = PublishCycle::new(
            poller,
            Arc::clone(&self.store),
            OutputBuilder::from_config(&self.config),
            Arc::clone(&publishers),
        );
        let scheduler = SchedulerHandle::spawn(cycle, self.period, Arc::clone(&self.metrics));

        self.running = Some(RunningParts {
            publishers,
            adapter,
            scheduler,
        });
        self.state = BridgeState::Running;
        info!(
            inputs = ?self.config.input_topics().all(),
            outputs = ?self.config.output_topics().all(),
            "Vehicle info bridge started"
        );
        Ok(())
    }

    /// 停止 bridge
    ///
    /// 幂等；未启动或启动失败时调用同样安全。
    #[instrument(name = "bridge_stop", skip(self), fields(state = %self.state))]
    pub async fn stop(&mut self) {
        if let Some(mut parts) = self.running.take() {
            parts.scheduler.cancel().await;
            parts.adapter.stop().await;
            let closed = parts.publishers.close_all();
            info!(
                cycles = self.metrics.cycles(),
                overruns = self.metrics.overruns(),
                publishers_closed = closed,
                "Vehicle info bridge stopped"
            );
        }
        self.state = BridgeState::Stopped;
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BridgeState::Running
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> SensorFrame {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Arc<LatestValueStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    pub fn ingestion_metrics(&self) -> &Arc<IngestionMetrics> {
        &self.ingestion_metrics
    }

    /// 各输出 topic 的发布计数，未运行时为空
    pub fn publisher_metrics(&self) -> Vec<(String, PublisherSnapshot)> {
        self.running
            .as_ref()
            .map(|parts| parts.publishers.metrics())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}
