// crates/gt_config/src/lib.rs

//! GeoTrans Config Layer
//!
//! 配置层，提供坐标操作上下文的默认搜索策略、格网缓存与网络设置。
//!
//! # 模块概览
//!
//! - [`policy`]: 搜索策略中的离散选项（空间判据、格网可用性、枢纽使用）
//! - [`config`]: GeoTransConfig 上下文配置（JSON + 环境变量覆盖）
//! - [`error`]: 配置错误类型
//!
//! # 示例
//!
//! ```
//! use gt_config::{GeoTransConfig, PivotUse};
//!
//! let config = GeoTransConfig::from_json(r#"{ "search": { "pivot_use": "never" } }"#).unwrap();
//! assert_eq!(config.search.pivot_use, PivotUse::Never);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod policy;

// 重导出核心类型
pub use config::{GeoTransConfig, GridCacheConfig, NetworkConfig, SearchDefaults};
pub use error::ConfigError;
pub use policy::{CrsExtentUse, GridAvailability, PivotUse, SpatialCriterion};
