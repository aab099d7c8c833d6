//! Bridge 指标收集模块
//!
//! 发布周期、输入样本与车辆状态查询的运行指标。

use std::collections::HashMap;

use metrics::{counter, histogram};

/// 记录一次完成的发布周期
pub fn record_cycle(duration_ms: f64) {
    counter!("carla_bridge_cycles_total").increment(1);
    histogram!("carla_bridge_cycle_duration_ms").record(duration_ms);
}

/// 记录周期超时 (执行时间超过 loop_rate)
pub fn record_overrun() {
    counter!("carla_bridge_overruns_total").increment(1);
}

/// 记录单个输出 topic 的发布结果
pub fn record_publish(topic: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "carla_bridge_publish_total",
        "topic" => topic.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录输入样本 (接受 / 丢弃)
pub fn record_sample(stream: &'static str, accepted: bool) {
    let status = if accepted { "accepted" } else { "rejected" };
    counter!(
        "carla_bridge_samples_total",
        "stream" => stream,
        "status" => status
    )
    .increment(1);
}

/// 记录车辆状态查询结果
pub fn record_kinematics_poll(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("carla_bridge_kinematics_poll_total", "status" => status).increment(1);
}

/// 单个发布周期的结果
#[derive(Debug, Clone, Default)]
pub struct CycleSample {
    /// 周期执行耗时 (毫秒)
    pub duration_ms: f64,
    /// 是否超时
    pub overrun: bool,
    /// 成功发布的 topic 数
    pub published: usize,
    /// 发布失败的 topic
    pub failed_topics: Vec<String>,
    /// 车辆状态查询是否成功
    pub kinematics_ok: bool,
}

/// Bridge 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct BridgeMetricsAggregator {
    /// 总周期数
    pub total_cycles: u64,

    /// 超时周期数
    pub overruns: u64,

    /// 成功发布的消息总数
    pub total_published: u64,

    /// 发布失败总数
    pub publish_failures: u64,

    /// 车辆状态查询失败数
    pub kinematics_failures: u64,

    /// 周期耗时统计
    pub cycle_stats: RunningStats,

    /// 各 topic 发布失败次数
    pub topic_failures: HashMap<String, u64>,
}

impl BridgeMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, sample: &CycleSample) {
        self.total_cycles += 1;
        self.total_published += sample.published as u64;
        self.cycle_stats.push(sample.duration_ms);

        if sample.overrun {
            self.overruns += 1;
        }
        if !sample.kinematics_ok {
            self.kinematics_failures += 1;
        }
        for topic in &sample.failed_topics {
            self.publish_failures += 1;
            *self.topic_failures.entry(topic.clone()).or_insert(0) += 1;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_cycles: self.total_cycles,
            overruns: self.overruns,
            total_published: self.total_published,
            publish_failures: self.publish_failures,
            kinematics_failures: self.kinematics_failures,
            overrun_rate: if self.total_cycles > 0 {
                self.overruns as f64 / self.total_cycles as f64 * 100.0
            } else {
                0.0
            },
            cycle_duration_ms: self.cycle_stats.summary(),
            topic_failures: self.topic_failures.clone(),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_cycles: u64,
    pub overruns: u64,
    pub total_published: u64,
    pub publish_failures: u64,
    pub kinematics_failures: u64,
    pub overrun_rate: f64,
    pub cycle_duration_ms: StatsSummary,
    pub topic_failures: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bridge Metrics Summary ===")?;
        writeln!(f, "Publish cycles: {}", self.total_cycles)?;
        writeln!(
            f,
            "Overruns: {} ({:.2}%)",
            self.overruns, self.overrun_rate
        )?;
        writeln!(f, "Messages published: {}", self.total_published)?;
        writeln!(f, "Publish failures: {}", self.publish_failures)?;
        writeln!(f, "Kinematics query failures: {}", self.kinematics_failures)?;
        writeln!(f, "Cycle duration (ms): {}", self.cycle_duration_ms)?;

        if !self.topic_failures.is_empty() {
            writeln!(f, "Publish failures by topic:")?;
            let mut topics: Vec<_> = self.topic_failures.iter().collect();
            topics.sort();
            for (topic, count) in topics {
                writeln!(f, "  {}: {}", topic, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 周期耗时的在线统计 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 样本方差 (n - 1)，少于两个样本时为 0
    pub fn variance(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => self.m2 / (n - 1) as f64,
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            min: self.min,
            max: self.max,
            mean: self.mean,
            std_dev: self.variance().sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);

        let summary = stats.summary();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert!((summary.std_dev - 2.5f64.sqrt()).abs() < 1e-10);
        assert_eq!(RunningStats::default().summary().to_string(), "N/A");
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = BridgeMetricsAggregator::new();

        aggregator.update(&CycleSample {
            duration_ms: 4.0,
            overrun: false,
            published: 6,
            failed_topics: vec![],
            kinematics_ok: true,
        });
        aggregator.update(&CycleSample {
            duration_ms: 120.0,
            overrun: true,
            published: 5,
            failed_topics: vec!["/rslidar_points".to_string()],
            kinematics_ok: false,
        });

        assert_eq!(aggregator.total_cycles, 2);
        assert_eq!(aggregator.overruns, 1);
        assert_eq!(aggregator.total_published, 11);
        assert_eq!(aggregator.publish_failures, 1);
        assert_eq!(aggregator.kinematics_failures, 1);
        assert_eq!(aggregator.topic_failures.get("/rslidar_points"), Some(&1));

        let summary = aggregator.summary();
        assert!((summary.overrun_rate - 50.0).abs() < 1e-10);
        assert_eq!(summary.cycle_duration_ms.count, 2);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_cycles: 100,
            overruns: 5,
            total_published: 600,
            overrun_rate: 5.0,
            cycle_duration_ms: StatsSummary {
                count: 100,
                min: 1.0,
                max: 12.0,
                mean: 3.0,
                std_dev: 1.5,
            },
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Publish cycles: 100"));
        assert!(output.contains("5.00%"));
    }

    #[test]
    fn test_record_helpers_without_recorder() {
        // No global recorder installed: calls are no-ops and must not panic
        record_cycle(1.0);
        record_overrun();
        record_publish("/gps", true);
        record_sample("lidar", false);
        record_kinematics_poll(true);
    }
}
