//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeConfig, HEADING_YAW_OFFSET_DEG};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    loop_rate: f64,
    publish_hz: f64,
    input_topics: usize,
    output_topics: usize,
    frame_id: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    loop_rate: config.loop_rate,
                    publish_hz: 1.0 / config.loop_rate,
                    input_topics: config.input_topics().all().len(),
                    output_topics: config.output_topics().all().len(),
                    frame_id: config.frame_id.clone(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let lidar_period = 1.0 / config.simulation.lidar_hz;
    if config.loop_rate < lidar_period {
        warnings.push(format!(
            "loop_rate {}s is shorter than the mock LiDAR period {:.3}s - \
             outputs will repeat stamps",
            config.loop_rate, lidar_period
        ));
    }

    if config.heading_offset_deg != HEADING_YAW_OFFSET_DEG {
        warnings.push(format!(
            "heading_offset_deg overridden to {} (default {})",
            config.heading_offset_deg, HEADING_YAW_OFFSET_DEG
        ));
    }

    if config.queue_capacity == 1 {
        warnings.push("queue_capacity = 1 - bursts will drop input samples".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!(
                "\n  Loop rate: {}s ({:.1} Hz)",
                summary.loop_rate, summary.publish_hz
            );
            println!("  Input topics: {}", summary.input_topics);
            println!("  Output topics: {}", summary.output_topics);
            println!("  Frame: {}", summary.frame_id);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
