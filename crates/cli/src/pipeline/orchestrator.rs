//! Bridge orchestrator - wires mock sensors, the simulated vehicle, the
//! bridge and the output monitor together.
//!
//! Without a simulator connection the inputs come from `MockSensorSource`s
//! bound to a `SimulatedVehicle`, so GNSS and IMU follow the same trajectory
//! as the polled kinematics.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bus::{OutputMonitor, TopicBus};
use contracts::{BridgeConfig, VehicleStateSource};
use fusion::VehicleInfoBridge;
use ingestion::MockSensorSource;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vehicle::SimulatedVehicle;

use super::PipelineStats;
use crate::{hud, manual};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated bridge configuration
    pub bridge: BridgeConfig,

    /// Stop after this long (None = until shutdown signal)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Drive the simulated vehicle from stdin
    pub manual: bool,

    /// HUD status line period (None = disabled)
    pub hud_interval: Option<Duration>,
}

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Signal,
    Duration,
    Quit,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the duration elapses or the manual
    /// driver quits, then tear everything down in order
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let bridge_config = &self.config.bridge;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        info!("Running in MOCK mode (no CARLA server required)");

        let bus = TopicBus::new();
        let vehicle = Arc::new(SimulatedVehicle::from_config(&bridge_config.simulation));
        let source: Arc<dyn VehicleStateSource> = vehicle.clone();

        // Output monitor
        let monitor = OutputMonitor::attach(
            &bus,
            bridge_config.output_topics().all(),
            bridge_config.queue_capacity,
        )
        .context("Failed to attach output monitor")?;

        // Bridge
        let mut bridge =
            VehicleInfoBridge::new(bridge_config.clone(), bus.clone(), Arc::clone(&source))
                .context("Failed to create bridge")?;
        bridge.start().context("Failed to start bridge")?;

        // Mock sensors
        let input_topics = bridge_config.input_topics();
        let sources: Vec<MockSensorSource> =
            MockSensorSource::from_simulation(&bridge_config.simulation, &input_topics)
                .into_iter()
                .map(|s| s.with_vehicle(Arc::clone(&source)))
                .collect();
        let mut source_handles = Vec::with_capacity(sources.len());
        for mock in &sources {
            match mock.start(&bus) {
                Ok(Some(handle)) => source_handles.push(handle),
                Ok(None) => {}
                Err(e) => {
                    warn!(topic = %mock.config().topic, error = %e, "Failed to start mock sensor")
                }
            }
        }
        info!(active_sensors = source_handles.len(), "Mock sensors started");

        // HUD and manual control
        let hud_handle = self
            .config
            .hud_interval
            .map(|interval| hud::spawn(Arc::clone(&vehicle), interval));
        let (manual_handle, quit_rx) = if self.config.manual {
            let (handle, quit_rx) = manual::spawn(Arc::clone(&vehicle));
            (Some(handle), Some(quit_rx))
        } else {
            (None, None)
        };

        info!(duration = ?self.config.duration, "Bridge running (MOCK mode)");

        let reason = wait_for_stop(shutdown, self.config.duration, quit_rx).await;
        info!(reason = ?reason, "Shutting down bridge...");

        // Shutdown: inputs first, then the bridge, then the observers
        for mock in &sources {
            mock.stop();
        }
        join_all(source_handles, "mock sensor").await;
        bridge.stop().await;

        for handle in [hud_handle, manual_handle].into_iter().flatten() {
            handle.abort();
        }

        let sinks = monitor.metrics();
        monitor.shutdown().await;
        bus.shutdown();

        let ingestion = bridge.ingestion_metrics().snapshot();
        let metrics = bridge.metrics();
        let stats = PipelineStats {
            duration: start_time.elapsed(),
            cycles: metrics.cycles(),
            overruns: metrics.overruns(),
            messages_published: metrics.published(),
            publish_failures: metrics.publish_failures(),
            samples_accepted: ingestion.accepted,
            samples_rejected: ingestion.rejected,
            kinematics_polls: ingestion.kinematics_polls,
            kinematics_failures: ingestion.kinematics_failures,
            sinks,
            bridge_summary: bridge.summary(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            cycles = stats.cycles,
            rate_hz = format!("{:.2}", stats.cycle_rate()),
            "Bridge shutdown complete"
        );

        Ok(stats)
    }
}

async fn wait_for_stop(
    shutdown: impl Future<Output = ()>,
    duration: Option<Duration>,
    quit_rx: Option<tokio::sync::oneshot::Receiver<()>>,
) -> StopReason {
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    let quit = async {
        match quit_rx {
            Some(rx) => {
                // a dropped sender means manual control died; keep running
                if rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown => StopReason::Signal,
        _ = deadline => StopReason::Duration,
        _ = quit => StopReason::Quit,
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>, what: &str) {
    for handle in handles {
        match tokio::time::timeout(Duration::from_secs(2), handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "{} task failed", what),
            Err(_) => warn!("{} task did not stop in time", what),
        }
    }
}
