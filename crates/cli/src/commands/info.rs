//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::BridgeConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    loop_rate: f64,
    frame_id: String,
    child_frame_id: String,
    heading_offset_deg: f64,
    queue_capacity: usize,
    inputs: Vec<TopicInfo>,
    outputs: Vec<TopicInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<SimulationInfo>,
}

#[derive(Serialize)]
struct TopicInfo {
    stream: &'static str,
    topic: String,
    message_type: &'static str,
}

#[derive(Serialize)]
struct SimulationInfo {
    vehicle_id: String,
    lidar_hz: f64,
    gnss_hz: f64,
    imu_hz: f64,
    lidar_points: u32,
    speed_mps: f64,
    turn_radius_m: f64,
    origin: [f64; 3],
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args.simulation);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &BridgeConfig, with_simulation: bool) -> ConfigInfo {
    let inputs = config.input_topics();
    let outputs = config.output_topics();

    let simulation = with_simulation.then(|| {
        let sim = &config.simulation;
        SimulationInfo {
            vehicle_id: sim.vehicle_id.clone(),
            lidar_hz: sim.lidar_hz,
            gnss_hz: sim.gnss_hz,
            imu_hz: sim.imu_hz,
            lidar_points: sim.lidar_points,
            speed_mps: sim.speed_mps,
            turn_radius_m: sim.turn_radius_m,
            origin: [sim.origin.latitude, sim.origin.longitude, sim.origin.altitude],
        }
    });

    ConfigInfo {
        loop_rate: config.loop_rate,
        frame_id: config.frame_id.clone(),
        child_frame_id: config.child_frame_id.clone(),
        heading_offset_deg: config.heading_offset_deg,
        queue_capacity: config.queue_capacity,
        inputs: vec![
            topic("lidar", &inputs.lidar, "sensor_msgs/PointCloud2"),
            topic("gnss", &inputs.gnss, "sensor_msgs/NavSatFix"),
            topic("imu", &inputs.imu, "sensor_msgs/Imu"),
        ],
        outputs: vec![
            topic("lidar", &outputs.lidar, "sensor_msgs/PointCloud2"),
            topic("gps", &outputs.gps, "sensor_driver_msgs/GpswithHeading"),
            topic("odom", &outputs.odom, "sensor_driver_msgs/OdometrywithGps"),
            topic("velocity", &outputs.velocity, "sensor_driver_msgs/InsVelocity"),
            topic("imu", &outputs.imu, "sensor_msgs/Imu"),
            topic("position", &outputs.position, "geometry_msgs/Vector3Stamped"),
        ],
        simulation,
    }
}

fn topic(stream: &'static str, topic: &str, message_type: &'static str) -> TopicInfo {
    TopicInfo {
        stream,
        topic: topic.to_string(),
        message_type,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CARLA Bridge Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⏱  Publishing");
    println!(
        "   ├─ Loop rate: {}s ({:.1} Hz)",
        info.loop_rate,
        1.0 / info.loop_rate
    );
    println!("   ├─ Frame: {} → {}", info.frame_id, info.child_frame_id);
    println!("   ├─ Heading offset: {}°", info.heading_offset_deg);
    println!("   └─ Queue capacity: {}", info.queue_capacity);

    println!("\n📥 Inputs");
    print_topics(&info.inputs);

    println!("\n📤 Outputs");
    print_topics(&info.outputs);

    if let Some(ref sim) = info.simulation {
        println!("\n🚗 Simulation");
        println!("   ├─ Vehicle: {}", sim.vehicle_id);
        println!(
            "   ├─ Sensor rates: lidar {} Hz, gnss {} Hz, imu {} Hz",
            sim.lidar_hz, sim.gnss_hz, sim.imu_hz
        );
        println!("   ├─ LiDAR points: {}", sim.lidar_points);
        println!(
            "   ├─ Trajectory: {} m/s on a {} m circle",
            sim.speed_mps, sim.turn_radius_m
        );
        println!(
            "   └─ Origin: ({}, {}, {})",
            sim.origin[0], sim.origin[1], sim.origin[2]
        );
    }

    println!();
}

fn print_topics(topics: &[TopicInfo]) {
    for (i, t) in topics.iter().enumerate() {
        let branch = if i + 1 == topics.len() { "└─" } else { "├─" };
        println!("   {} {:<9} {} ({})", branch, t.stream, t.topic, t.message_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BridgeConfig {
        config_loader::ConfigLoader::load_from_str(
            r#"{
                "loop_rate": 0.1,
                "gnss_sub_topic": "/carla/ego/gnss",
                "imu_sub_topic": "/carla/ego/imu",
                "lidar_sub_topic": "/carla/ego/lidar",
                "lidar_pub_topic": "/sensor/lidar",
                "gps_pub_topic": "/sensor/gps",
                "odom_pub_topic": "/sensor/odom",
                "velocity_pub_topic": "/sensor/velocity",
                "imu_pub_topic": "/sensor/imu",
                "position_pub_topic": "/sensor/position"
            }"#,
            config_loader::ConfigFormat::Json,
        )
        .unwrap()
    }

    #[test]
    fn test_info_json_shape() {
        let info = build_config_info(&config(), false);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["outputs"].as_array().unwrap().len(), 6);
        assert_eq!(json["inputs"][0]["topic"], "/carla/ego/lidar");
        assert!(json.get("simulation").is_none());
    }

    #[test]
    fn test_info_with_simulation() {
        let info = build_config_info(&config(), true);
        let sim = info.simulation.unwrap();
        assert_eq!(sim.vehicle_id, "ego_vehicle");
        assert_eq!(sim.lidar_points, 2048);
    }
}
