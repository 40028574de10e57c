//! 定位器配置
//!
//! 配置来源按优先级从低到高：默认值 -> TOML 文件 -> 环境变量。

mod loader;

pub use loader::ConfigLoader;

use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

pub const ENV_MAX_DEPTH: &str = "LOCATOR_MAX_DEPTH";
pub const ENV_TRACE: &str = "LOCATOR_TRACE";
pub const ENV_STATS: &str = "LOCATOR_STATS";

const DEFAULT_MAX_DEPTH: usize = 64;

/// 容器运行时配置，子作用域继承父作用域的配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorConfig {
    /// 单次解析链允许的最大深度
    ///
    /// 超过该深度的解析链即使没有环也会以 `DepthExceeded` 失败。默认值 64
    /// 只用来截住失控的递归；依赖图本身更深时需要调大，可通过
    /// `LOCATOR_MAX_DEPTH` 或配置文件的 `max_depth` 设置。
    pub max_depth: usize,
    /// 是否为每次解析输出 trace 日志
    pub trace_resolutions: bool,
    /// 是否收集容器统计信息
    pub collect_stats: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            trace_resolutions: false,
            collect_stats: true,
        }
    }
}

/// Partial configuration as read from a TOML file
#[derive(Deserialize, Debug, Default)]
pub struct PartialLocatorConfig {
    max_depth: Option<usize>,
    trace_resolutions: Option<bool>,
    collect_stats: Option<bool>,
}

impl LocatorConfig {
    /// 合并文件配置与环境变量，环境变量优先
    pub fn from_partial_and_env(
        partial: Option<PartialLocatorConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();
        let defaults = Self::default();

        let max_depth = match env_map.get(ENV_MAX_DEPTH) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_DEPTH.to_string(),
                value: raw.clone(),
            })?,
            None => partial.max_depth.unwrap_or(defaults.max_depth),
        };

        let trace_resolutions = match env_map.get(ENV_TRACE) {
            Some(raw) => parse_flag(ENV_TRACE, raw)?,
            None => partial.trace_resolutions.unwrap_or(defaults.trace_resolutions),
        };

        let collect_stats = match env_map.get(ENV_STATS) {
            Some(raw) => parse_flag(ENV_STATS, raw)?,
            None => partial.collect_stats.unwrap_or(defaults.collect_stats),
        };

        let config = LocatorConfig {
            max_depth,
            trace_resolutions,
            collect_stats,
        };
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 字符串解析（不读取环境变量）
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let partial: PartialLocatorConfig = toml::from_str(content)
            .map_err(|e| ConfigError::TomlParse("<inline>".to_string(), e))?;
        Self::from_partial_and_env(Some(partial), &HashMap::new())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_depth".to_string(),
                value: self.max_depth.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
