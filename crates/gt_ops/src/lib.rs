// crates/gt_ops/src/lib.rs

//! GeoTrans 操作层
//!
//! 在 `gt_geo` 的 CRS 与操作模型之上提供：
//!
//! - [`registry`]: 权威注册表 trait 与内置 EPSG 子集
//! - [`grid`]: 格网提供者（内存、目录）与 NTv2/GTX 解码
//! - [`context`]: 上下文（配置、注册表、格网缓存、最近错误）
//! - [`resolver`]: 候选操作搜索与排序
//! - [`executor`]: 管线编译与执行
//! - [`transformer`]: 按点选择操作的变换器
//! - [`api`]: 对外调用面
//!
//! # 示例
//!
//! ```
//! use gt_ops::prelude::*;
//!
//! let ctx = Context::new();
//! let nad27 = parse_crs(&ctx, "EPSG:4267").unwrap();
//! let nad83 = parse_crs(&ctx, "EPSG:4269").unwrap();
//! let policy = ctx
//!     .default_policy()
//!     .with_spatial_criterion(SpatialCriterion::PartialIntersection)
//!     .with_grid_availability(GridAvailability::Ignore);
//! let ops = resolve_operations(&ctx, &nad27, &nad83, &policy).unwrap();
//! assert!(!ops[0].is_ballpark());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod context;
pub mod executor;
pub mod grid;
pub mod registry;
pub mod resolver;
pub mod transformer;

/// 预导入模块
pub mod prelude {
    pub use crate::api::{
        apply, apply_batch, operation_to_proj_string, parse_crs, parse_operation, resolve_operations,
        roundtrip, set_current_context, suggested_operation, transform_bounds, with_current_context,
    };
    pub use crate::context::Context;
    pub use crate::executor::{self, Pipeline};
    pub use crate::grid::{CachePolicy, DirectoryGridProvider, GridProvider, MemoryGridProvider};
    pub use crate::registry::{BuiltinRegistry, Registry};
    pub use crate::resolver::{resolve, SearchPolicy};
    pub use crate::transformer::Transformer;
    pub use gt_config::{CrsExtentUse, GeoTransConfig, GridAvailability, PivotUse, SpatialCriterion};
    pub use gt_foundation::{GtError, GtResult, TransformErrorKind};
    pub use gt_geo::prelude::*;
}

// 重导出常用类型
pub use context::Context;
pub use executor::Pipeline;
pub use resolver::SearchPolicy;
pub use transformer::Transformer;
