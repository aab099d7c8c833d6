//! Publish cycle scheduler
//!
//! A single task ticking at `loop_rate`. Cycles are awaited inside the loop,
//! so they never overlap; ticks missed while a slow cycle runs are skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::cycle::PublishCycle;
use crate::metrics::BridgeMetrics;

/// Running scheduler task
#[derive(Debug)]
pub struct SchedulerHandle {
    period: Duration,
    cancel_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Spawn the scheduler; the first cycle runs one period after this call
    pub fn spawn(cycle: PublishCycle, period: Duration, metrics: Arc<BridgeMetrics>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run_scheduler(cycle, period, metrics, cancel_rx));
        info!(period_ms = period.as_secs_f64() * 1000.0, "Publish scheduler started");
        Self {
            period,
            cancel_tx,
            handle: Some(handle),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking and wait for the in-flight cycle to finish
    ///
    /// Idempotent.
    #[instrument(name = "scheduler_cancel", skip(self))]
    pub async fn cancel(&mut self) {
        let _ = self.cancel_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(error = ?e, "Publish scheduler panicked");
            }
            info!("Publish scheduler stopped");
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
    }
}

async fn run_scheduler(
    cycle: PublishCycle,
    period: Duration,
    metrics: Arc<BridgeMetrics>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel_rx.changed() => break,
            _ = interval.tick() => {}
        }
        if *cancel_rx.borrow() {
            break;
        }

        metrics.enter_cycle();
        let report = cycle.run_once().await;
        metrics.exit_cycle();

        let sample = report.to_sample(period);
        if sample.overrun {
            observability::record_overrun();
            warn!(
                duration_ms = sample.duration_ms,
                period_ms = period.as_secs_f64() * 1000.0,
                "Publish cycle overran its period"
            );
        }
        metrics.record(&sample);
    }

    debug!(cycles = metrics.cycles(), "scheduler loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::OutputBuilder;
    use crate::publishers::OutputPublishers;
    use bus::TopicBus;
    use contracts::{OutputTopics, VehicleKinematics, VehicleStateSource, HEADING_YAW_OFFSET_DEG};
    use ingestion::{IngestionMetrics, KinematicsPoller, LatestValueStore};
    use vehicle::ScriptedVehicle;

    fn topics() -> OutputTopics {
        OutputTopics {
            lidar: "/out/lidar".into(),
            gps: "/out/gps".into(),
            odom: "/out/odom".into(),
            velocity: "/out/velocity".into(),
            imu: "/out/imu".into(),
            position: "/out/position".into(),
        }
    }

    fn cycle(bus: &TopicBus, vehicle: Arc<ScriptedVehicle>) -> PublishCycle {
        let store = Arc::new(LatestValueStore::new("odom"));
        let source: Arc<dyn VehicleStateSource> = vehicle;
        PublishCycle::new(
            KinematicsPoller::new(source, Arc::clone(&store), Arc::new(IngestionMetrics::new())),
            store,
            OutputBuilder::new("base_link", HEADING_YAW_OFFSET_DEG),
            Arc::new(OutputPublishers::advertise(bus, &topics()).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_first_tick_after_one_period() {
        let bus = TopicBus::new();
        let vehicle = Arc::new(ScriptedVehicle::new("ego", VehicleKinematics::default()));
        let metrics = Arc::new(BridgeMetrics::new());
        let mut scheduler = SchedulerHandle::spawn(
            cycle(&bus, Arc::clone(&vehicle)),
            Duration::from_millis(200),
            Arc::clone(&metrics),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(vehicle.poll_count(), 0);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(vehicle.poll_count() >= 1);

        scheduler.cancel().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_cancel_stops_cycles() {
        let bus = TopicBus::new();
        let vehicle = Arc::new(ScriptedVehicle::new("ego", VehicleKinematics::default()));
        let metrics = Arc::new(BridgeMetrics::new());
        let mut scheduler = SchedulerHandle::spawn(
            cycle(&bus, Arc::clone(&vehicle)),
            Duration::from_millis(20),
            Arc::clone(&metrics),
        );

        tokio::time::sleep(Duration::from_millis(110)).await;
        scheduler.cancel().await;
        scheduler.cancel().await;

        let cycles = metrics.cycles();
        assert!(cycles >= 2, "expected several cycles, got {cycles}");
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(metrics.cycles(), cycles);
        assert_eq!(vehicle.poll_count(), cycles);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_cycle_overruns_without_overlap() {
        let bus = TopicBus::new();
        let vehicle = Arc::new(ScriptedVehicle::new("ego", VehicleKinematics::default()));
        vehicle.set_delay(Duration::from_millis(80));
        let metrics = Arc::new(BridgeMetrics::new());
        let mut scheduler = SchedulerHandle::spawn(
            cycle(&bus, vehicle),
            Duration::from_millis(30),
            Arc::clone(&metrics),
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        scheduler.cancel().await;

        assert!(metrics.cycles() >= 2);
        assert_eq!(metrics.overruns(), metrics.cycles());
        assert_eq!(metrics.max_in_flight(), 1);
    }
}
