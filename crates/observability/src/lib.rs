//! # Observability
//!
//! 桥接进程的日志与指标出口。
//!
//! - `tracing` 订阅器：JSON / Pretty / Compact 三种输出，`RUST_LOG` 优先
//! - Prometheus 导出：发布周期、超时、输入样本、运动学轮询、输出发布
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: Some(9000),
//!     default_log_level: "debug".into(),
//! })?;
//!
//! observability::record_cycle(report.duration_ms);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use ::metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_cycle, record_kinematics_poll, record_overrun, record_publish, record_sample,
    BridgeMetricsAggregator, CycleSample, MetricsSummary, RunningStats, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 不导出)
    pub metrics_port: Option<u16>,
    /// `RUST_LOG` 未设置时使用的过滤表达式
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging, one event per line
    #[default]
    Json,
    Pretty,
    Compact,
}

/// 按配置安装 tracing 订阅器，并按需启动 Prometheus 导出
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format).with_filter(filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// 仅启动 Prometheus 导出（tracing 已初始化时使用）
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    }
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    describe_bridge_metrics();
    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

fn describe_bridge_metrics() {
    describe_counter!("carla_bridge_cycles_total", "Publish cycles completed");
    describe_histogram!(
        "carla_bridge_cycle_duration_ms",
        Unit::Milliseconds,
        "Wall time of one publish cycle"
    );
    describe_counter!(
        "carla_bridge_overruns_total",
        "Ticks skipped because the previous cycle was still running"
    );
    describe_counter!(
        "carla_bridge_publish_total",
        "Output messages handed to the bus, by topic and status"
    );
    describe_counter!(
        "carla_bridge_samples_total",
        "Input samples received, by stream and status"
    );
    describe_counter!(
        "carla_bridge_kinematics_poll_total",
        "Vehicle kinematics queries, by status"
    );
}
