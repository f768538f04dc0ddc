// crates/gt_foundation/src/lib.rs

//! GeoTrans Foundation Layer
//!
//! 基础层，提供整个项目共享的错误类型、解析诊断与数值容差。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `GtError` 与逐点数值错误类别 `TransformErrorKind`
//! - [`validation`]: 解析诊断（致命错误 + 非致命警告）
//! - [`tolerance`]: 等价比较与迭代求解使用的容差
//!
//! # 示例
//!
//! ```
//! use gt_foundation::{
//!     error::{GtError, GtResult},
//!     validation::ValidationReport,
//! };
//!
//! fn parse(text: &str) -> GtResult<u32> {
//!     let mut report = ValidationReport::new();
//!     if text.is_empty() {
//!         report.add_error("空定义");
//!     }
//!     Ok(report.finish(text.len() as u32)?.value)
//! }
//!
//! assert!(parse("").is_err());
//! assert_eq!(parse("abc").unwrap(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod tolerance;
pub mod validation;

// 重导出常用类型
pub use error::{GtError, GtResult, TransformErrorKind};
pub use tolerance::Tolerance;
pub use validation::{ParseError, Parsed, ValidationReport};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{GtError, GtResult, TransformErrorKind};
    pub use crate::tolerance::Tolerance;
    pub use crate::validation::{ParseError, Parsed, ValidationReport};
    pub use crate::{ensure, require};
}
