//! # Config Loader
//!
//! 桥接配置的读取入口：TOML / JSON 解析，随后统一校验。
//!
//! 缺少任一必填键、`loop_rate` 非正、输出 topic 与输入重名等情况都在
//! 此处返回错误，桥接不会以部分配置启动。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("configs/bridge.toml")).unwrap();
//! println!("Loop rate: {}s", config.loop_rate);
//! ```

mod parser;
mod validator;

pub use contracts::BridgeConfig;
pub use parser::ConfigFormat;
pub use crate::validator::validate;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从文件加载，格式由扩展名决定 (.toml / .json)
    pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ContractError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "unsupported config format: {} (expected .toml or .json)",
                    path.display()
                ))
            })?;

        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// 从字符串加载
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validate(&config)?;
        Ok(config)
    }

    /// 覆盖发布周期并重新校验
    ///
    /// 校验失败时原配置不变。
    pub fn override_loop_rate(
        config: &mut BridgeConfig,
        loop_rate: f64,
    ) -> Result<(), ContractError> {
        let mut candidate = config.clone();
        candidate.loop_rate = loop_rate;
        validate(&candidate)?;
        *config = candidate;
        Ok(())
    }
}
