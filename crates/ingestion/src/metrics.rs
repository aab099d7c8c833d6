//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

use crate::adapter::InputStream;

/// Ingestion metrics
///
/// Per-stream counters are indexed by [`InputStream::index`].
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Samples written to the store
    accepted: [AtomicU64; 3],

    /// Samples discarded as malformed
    rejected: [AtomicU64; 3],

    /// Kinematics queries issued
    kinematics_polls: AtomicU64,

    /// Kinematics queries that failed
    kinematics_failures: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self, stream: InputStream) {
        self.accepted[stream.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, stream: InputStream) {
        self.rejected[stream.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_kinematics_poll(&self, success: bool) {
        self.kinematics_polls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.kinematics_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counts = |counters: &[AtomicU64; 3]| StreamCounts {
            lidar: counters[InputStream::Lidar.index()].load(Ordering::Relaxed),
            gnss: counters[InputStream::Gnss.index()].load(Ordering::Relaxed),
            imu: counters[InputStream::Imu.index()].load(Ordering::Relaxed),
        };
        MetricsSnapshot {
            accepted: counts(&self.accepted),
            rejected: counts(&self.rejected),
            kinematics_polls: self.kinematics_polls.load(Ordering::Relaxed),
            kinematics_failures: self.kinematics_failures.load(Ordering::Relaxed),
        }
    }
}

/// Per-stream counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamCounts {
    pub lidar: u64,
    pub gnss: u64,
    pub imu: u64,
}

impl StreamCounts {
    pub fn total(&self) -> u64 {
        self.lidar + self.gnss + self.imu
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub accepted: StreamCounts,
    pub rejected: StreamCounts,
    pub kinematics_polls: u64,
    pub kinematics_failures: u64,
}
