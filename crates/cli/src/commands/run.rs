//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(loop_rate) = args.loop_rate {
        info!(loop_rate, "Overriding loop rate from CLI");
        config_loader::ConfigLoader::override_loop_rate(&mut config, loop_rate)
            .context("Invalid --loop-rate override")?;
    }

    info!(
        loop_rate = config.loop_rate,
        frame_id = %config.frame_id,
        heading_offset_deg = config.heading_offset_deg,
        vehicle = %config.simulation.vehicle_id,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        bridge: config,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        manual: args.manual,
        hud_interval: (args.hud_interval.is_finite() && args.hud_interval > 0.0)
            .then(|| Duration::from_secs_f64(args.hud_interval)),
    };

    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting bridge...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Bridge execution failed")?;

    info!(
        cycles = stats.cycles,
        overruns = stats.overruns,
        duration_secs = stats.duration.as_secs_f64(),
        "Bridge completed successfully"
    );
    stats.print_summary();

    info!("CARLA Bridge finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping bridge...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::BridgeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Loop rate: {}s", config.loop_rate);
    println!("Frame: {} -> {}", config.frame_id, config.child_frame_id);
    println!("Heading offset: {} deg", config.heading_offset_deg);

    let inputs = config.input_topics();
    println!("\nInputs:");
    println!("  LiDAR: {}", inputs.lidar);
    println!("  GNSS:  {}", inputs.gnss);
    println!("  IMU:   {}", inputs.imu);

    let outputs = config.output_topics();
    println!("\nOutputs:");
    println!("  LiDAR:    {}", outputs.lidar);
    println!("  GPS:      {}", outputs.gps);
    println!("  Odom:     {}", outputs.odom);
    println!("  Velocity: {}", outputs.velocity);
    println!("  IMU:      {}", outputs.imu);
    println!("  Position: {}", outputs.position);
    println!();
}
