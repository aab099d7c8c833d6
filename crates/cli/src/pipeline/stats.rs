//! Run statistics.

use std::time::Duration;

use bus::SinkReport;
use ingestion::StreamCounts;
use observability::MetricsSummary;

/// Statistics from a bridge run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Completed publish cycles
    pub cycles: u64,

    /// Cycles that took longer than the period
    pub overruns: u64,

    /// Output messages delivered to the bus
    pub messages_published: u64,

    /// Output messages that failed to publish
    pub publish_failures: u64,

    /// Input samples stored, per stream
    pub samples_accepted: StreamCounts,

    /// Input samples discarded as malformed, per stream
    pub samples_rejected: StreamCounts,

    /// Kinematics queries and failed queries
    pub kinematics_polls: u64,
    pub kinematics_failures: u64,

    /// Output monitor sinks
    pub sinks: Vec<SinkReport>,

    /// Cycle aggregation from the bridge
    pub bridge_summary: MetricsSummary,
}

impl PipelineStats {
    /// Publish cycles per second
    pub fn cycle_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.cycles as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Bridge Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Publish cycles: {}", self.cycles);
        println!("   ├─ Cycle rate: {:.2} Hz", self.cycle_rate());
        println!("   ├─ Overruns: {}", self.overruns);
        println!("   ├─ Messages published: {}", self.messages_published);
        println!("   └─ Publish failures: {}", self.publish_failures);

        println!("\n📥 Inputs");
        println!(
            "   ├─ LiDAR: {} accepted, {} rejected",
            self.samples_accepted.lidar, self.samples_rejected.lidar
        );
        println!(
            "   ├─ GNSS: {} accepted, {} rejected",
            self.samples_accepted.gnss, self.samples_rejected.gnss
        );
        println!(
            "   ├─ IMU: {} accepted, {} rejected",
            self.samples_accepted.imu, self.samples_rejected.imu
        );
        println!(
            "   └─ Kinematics: {} polls, {} failed",
            self.kinematics_polls, self.kinematics_failures
        );

        if !self.sinks.is_empty() {
            println!("\n📤 Output Monitor");
            for sink in &self.sinks {
                println!(
                    "   ├─ {}: {} written, {} dropped",
                    sink.topic, sink.metrics.write_count, sink.metrics.dropped_count
                );
            }
        }

        println!("\n{}", self.bridge_summary);
    }
}
