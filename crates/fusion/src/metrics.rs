//! Bridge 运行指标
//!
//! 原子计数器供测试与状态查询读取，聚合器用于退出时的摘要。

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use observability::{BridgeMetricsAggregator, CycleSample, MetricsSummary};

/// 发布周期指标
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// 已完成的周期数
    cycles: AtomicU64,
    /// 超时周期数
    overruns: AtomicU64,
    /// 成功发布的消息数
    published: AtomicU64,
    /// 发布失败数
    publish_failures: AtomicU64,
    /// 正在执行的周期数
    in_flight: AtomicUsize,
    /// 同时执行周期数的峰值
    max_in_flight: AtomicUsize,
    aggregator: Mutex<BridgeMetricsAggregator>,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// 标记周期开始
    pub(crate) fn enter_cycle(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    pub(crate) fn exit_cycle(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// 记录一个完成的周期
    pub fn record(&self, sample: &CycleSample) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.published
            .fetch_add(sample.published as u64, Ordering::Relaxed);
        self.publish_failures
            .fetch_add(sample.failed_topics.len() as u64, Ordering::Relaxed);
        if sample.overrun {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        self.aggregator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .update(sample);
    }

    pub fn summary(&self) -> MetricsSummary {
        self.aggregator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .summary()
    }
}
