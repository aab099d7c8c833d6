//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (`validator` derive): loop_rate > 0, topic 非空, queue_capacity >= 1
//! - loop_rate / heading_offset_deg 为有限值
//! - 发布 topic 两两不同
//! - 发布 topic 不与订阅 topic 重合 (避免自激回环)

use std::collections::HashSet;

use contracts::{BridgeConfig, ContractError};
use validator::Validate;

/// 校验 BridgeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_rules(config)?;
    validate_finite(config)?;
    validate_publish_topics_distinct(config)?;
    validate_no_feedback_loop(config)?;
    Ok(())
}

/// 字段级规则
fn validate_rules(config: &BridgeConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let mut fields: Vec<_> = errors.errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        ContractError::config_validation(fields.join(", "), errors.to_string())
    })
}

/// NaN 会绕过 range 规则，单独检查
fn validate_finite(config: &BridgeConfig) -> Result<(), ContractError> {
    if !config.loop_rate.is_finite() || config.loop_period().is_none() {
        return Err(ContractError::config_validation(
            "loop_rate",
            format!("loop_rate must be a finite positive number, got {}", config.loop_rate),
        ));
    }
    if !config.heading_offset_deg.is_finite() {
        return Err(ContractError::config_validation(
            "heading_offset_deg",
            format!(
                "heading_offset_deg must be finite, got {}",
                config.heading_offset_deg
            ),
        ));
    }
    Ok(())
}

/// 校验发布 topic 唯一性
fn validate_publish_topics_distinct(config: &BridgeConfig) -> Result<(), ContractError> {
    let outputs = config.output_topics();
    let mut seen = HashSet::new();
    for topic in outputs.all() {
        if !seen.insert(topic) {
            return Err(ContractError::config_validation(
                format!("publish_topics[{topic}]"),
                "duplicate publish topic",
            ));
        }
    }
    Ok(())
}

/// 发布 topic 不得与订阅 topic 相同
fn validate_no_feedback_loop(config: &BridgeConfig) -> Result<(), ContractError> {
    let inputs = config.input_topics();
    let outputs = config.output_topics();
    let subscribed: HashSet<_> = inputs.all().into_iter().collect();

    for topic in outputs.all() {
        if subscribed.contains(topic) {
            return Err(ContractError::config_validation(
                format!("publish_topics[{topic}]"),
                format!("topic '{topic}' is both published and subscribed by the bridge"),
            ));
        }
    }
    Ok(())
}
