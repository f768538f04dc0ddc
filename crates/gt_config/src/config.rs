// crates/gt_config/src/config.rs

//! GeoTransConfig - 上下文配置
//!
//! 定义坐标操作上下文的所有可配置项：搜索策略默认值、
//! 格网缓存、网络开关和格网搜索路径。JSON 序列化，缺失字段取默认值。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::policy::{CrsExtentUse, GridAvailability, PivotUse, SpatialCriterion};

/// 网络开关环境变量
pub const ENV_NETWORK: &str = "GEOTRANS_NETWORK";
/// 格网搜索路径环境变量（路径列表，按平台分隔符分隔）
pub const ENV_GRID_PATH: &str = "GEOTRANS_GRID_PATH";

/// 上下文配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeoTransConfig {
    /// 搜索策略默认值
    #[serde(default)]
    pub search: SearchDefaults,

    /// 格网缓存
    #[serde(default)]
    pub grid_cache: GridCacheConfig,

    /// 网络访问
    #[serde(default)]
    pub network: NetworkConfig,

    /// 格网文件搜索路径
    #[serde(default)]
    pub grid_search_paths: Vec<PathBuf>,
}

/// 搜索策略默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDefaults {
    /// 权威机构限制（`None` 表示任意，按偏好表排序）
    #[serde(default)]
    pub authority: Option<String>,

    /// 期望精度 [m]，0 表示不过滤
    #[serde(default)]
    pub desired_accuracy: f64,

    /// 是否允许粗略（ballpark）变换
    #[serde(default = "default_true")]
    pub allow_ballpark: bool,

    /// 空间判据
    #[serde(default)]
    pub spatial_criterion: SpatialCriterion,

    /// 格网可用性使用方式
    #[serde(default)]
    pub grid_availability: GridAvailability,

    /// 枢纽 CRS 使用方式
    #[serde(default)]
    pub pivot_use: PivotUse,

    /// 是否丢弃已被取代的操作
    #[serde(default = "default_true")]
    pub discard_superseded: bool,

    /// 是否允许已废弃的操作
    #[serde(default)]
    pub allow_deprecated: bool,

    /// CRS 适用范围组合方式
    #[serde(default)]
    pub crs_extent_use: CrsExtentUse,
}

fn default_true() -> bool {
    true
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            authority: None,
            desired_accuracy: 0.0,
            allow_ballpark: default_true(),
            spatial_criterion: SpatialCriterion::default(),
            grid_availability: GridAvailability::default(),
            pivot_use: PivotUse::default(),
            discard_superseded: default_true(),
            allow_deprecated: false,
            crs_extent_use: CrsExtentUse::default(),
        }
    }
}

/// 格网缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCacheConfig {
    /// 是否启用缓存
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 最大缓存大小 [MB]
    #[serde(default = "default_cache_size")]
    pub max_size_mb: u64,

    /// 缓存条目存活时间 [s]
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_size() -> u64 {
    300
}
fn default_cache_ttl() -> u64 {
    86_400
}

impl Default for GridCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_size_mb: default_cache_size(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// 网络配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// 是否允许格网提供者访问网络
    #[serde(default)]
    pub enabled: bool,

    /// 远程格网端点
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "https://cdn.proj.org".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
        }
    }
}

impl GeoTransConfig {
    /// 从 JSON 文本加载配置
    ///
    /// # Errors
    /// JSON 无效或配置值无效时返回错误
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: GeoTransConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    ///
    /// # Errors
    /// 文件无法读取、JSON 无效或配置值无效时返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// 保存配置到文件
    ///
    /// # Errors
    /// 序列化或写入失败时返回错误
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置有效性
    ///
    /// # Errors
    /// 任一配置值越界时返回 `ConfigError::InvalidValue`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let accuracy = self.search.desired_accuracy;
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err(ConfigError::invalid_value(
                "search.desired_accuracy",
                accuracy,
                "期望精度必须为非负有限值",
            ));
        }

        if let Some(auth) = &self.search.authority {
            if auth.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "search.authority",
                    auth,
                    "权威机构名称不能为空",
                ));
            }
        }

        if self.grid_cache.enabled && self.grid_cache.max_size_mb == 0 {
            return Err(ConfigError::invalid_value(
                "grid_cache.max_size_mb",
                0,
                "启用缓存时大小必须为正",
            ));
        }

        if self.network.enabled && self.network.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("network.endpoint".to_string()));
        }

        Ok(())
    }

    /// 使用进程环境变量覆盖配置
    ///
    /// # Errors
    /// 环境变量取值无法识别时返回错误
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// 使用给定的键值来源覆盖配置
    ///
    /// # Errors
    /// 取值无法识别时返回错误
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_NETWORK) {
            self.network.enabled = match value.trim().to_uppercase().as_str() {
                "ON" | "1" | "YES" | "TRUE" => true,
                "OFF" | "0" | "NO" | "FALSE" | "" => false,
                _ => {
                    return Err(ConfigError::invalid_value(
                        ENV_NETWORK,
                        value,
                        "期望 ON/OFF",
                    ))
                }
            };
        }

        if let Some(value) = lookup(ENV_GRID_PATH) {
            let paths: Vec<PathBuf> = std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !paths.is_empty() {
                // 环境变量中的路径优先于配置文件
                let mut merged = paths;
                merged.extend(self.grid_search_paths.drain(..));
                self.grid_search_paths = merged;
            }
        }

        Ok(())
    }
}
