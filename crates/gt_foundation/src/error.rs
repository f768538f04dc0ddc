// crates/gt_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `GtError` 枚举和 `GtResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! 1. **构造期错误**: 解析失败、CRS 不满足不变量、API 误用，立即以 `Err` 返回
//! 2. **逐点数值错误**: 不在此枚举中，见 [`TransformErrorKind`]，
//!    以无穷大坐标 + 上下文错误状态的形式报告，不展开调用栈
//!
//! # 示例
//!
//! ```
//! use gt_foundation::error::{GtError, GtResult};
//!
//! fn check_operation() -> GtResult<()> {
//!     Err(GtError::operation_invalid("操作不可逆"))
//! }
//! ```

use crate::validation::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type GtResult<T> = Result<T, GtError>;

/// GeoTrans 错误类型
#[derive(Error, Debug)]
pub enum GtError {
    // ========================================================================
    // IO 相关错误
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    // ========================================================================
    // 构造期错误
    // ========================================================================
    /// 定义解析失败（语法错误致命，警告仅供参考）
    #[error("{0}")]
    Parse(ParseError),

    /// CRS 不满足不变量
    #[error("无效的坐标参考系统: {message}")]
    CrsInvalid {
        /// 具体原因
        message: String,
    },

    /// 坐标操作无效（例如请求不可逆操作的逆变换）
    #[error("无效的坐标操作: {message}")]
    OperationInvalid {
        /// 具体原因
        message: String,
    },

    /// API 误用
    #[error("API 误用: {message}")]
    ApiMisuse {
        /// 具体原因
        message: String,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound {
        /// 资源名称
        resource: String,
    },

    /// 功能未实现
    #[error("功能未实现: {feature}")]
    NotImplemented {
        /// 未实现的功能描述
        feature: String,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl GtError {
    /// 从IO错误创建
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 从IO错误创建（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 无效 CRS
    pub fn crs_invalid(message: impl Into<String>) -> Self {
        Self::CrsInvalid {
            message: message.into(),
        }
    }

    /// 无效操作
    pub fn operation_invalid(message: impl Into<String>) -> Self {
        Self::OperationInvalid {
            message: message.into(),
        }
    }

    /// API 误用
    pub fn api_misuse(message: impl Into<String>) -> Self {
        Self::ApiMisuse {
            message: message.into(),
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 资源未找到
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 功能未实现
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 是否为解析错误
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// 若为解析错误，返回其诊断信息
    #[must_use]
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl GtError {
    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> GtResult<()> {
        if value < min || value > max || value.is_nan() {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for GtError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<ParseError> for GtError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<serde_json::Error> for GtError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

// ========================================================================
// 逐点数值错误
// ========================================================================

/// 逐坐标的数值失败类别
///
/// 这些失败从不以 `Err` 形式返回：坐标被置为全无穷大，
/// 类别记录在执行上下文上供调用方查询。
/// 数值编码沿用 PROJ 的错误码分组（坐标变换类 2049 起，其他类 4097 起）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformErrorKind {
    /// 无效坐标（非有限值、纬度超过 ±90° 等）
    InvalidCoordinate,
    /// 坐标超出投影方法的定义域
    OutsideProjectionDomain,
    /// 该点没有可用的操作
    NoOperation,
    /// 坐标落在格网覆盖范围之外
    OutsideGrid,
    /// 坐标落在格网的无数据单元
    GridAtNodata,
    /// 逆变换不可用
    NoInverse,
    /// 格网资源不可用（提供者打开/读取失败）
    ResourceUnavailable,
    /// 网络访问失败
    NetworkError,
}

impl TransformErrorKind {
    /// 数值错误码
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidCoordinate => 2049,
            Self::OutsideProjectionDomain => 2050,
            Self::NoOperation => 2051,
            Self::OutsideGrid => 2052,
            Self::GridAtNodata => 2053,
            Self::NoInverse => 4099,
            Self::ResourceUnavailable => 4100,
            Self::NetworkError => 4101,
        }
    }

    /// 可读的错误描述
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidCoordinate => "Invalid coordinate",
            Self::OutsideProjectionDomain => "Coordinate is outside projection domain",
            Self::NoOperation => "No operation found matching criteria",
            Self::OutsideGrid => "Point is outside the grid",
            Self::GridAtNodata => "Point hits a nodata cell of the grid",
            Self::NoInverse => "Inverse operation not available",
            Self::ResourceUnavailable => "Grid resource unavailable",
            Self::NetworkError => "Network error when accessing a remote resource",
        }
    }

    /// 是否属于坐标变换类错误（而非资源类）
    #[must_use]
    pub const fn is_coordinate_error(self) -> bool {
        self.code() < 4097
    }
}

impl std::fmt::Display for TransformErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

// ========================================================================
// 宏
// ========================================================================

/// 条件不满足时提前返回错误
///
/// ```
/// use gt_foundation::{ensure, error::{GtError, GtResult}};
///
/// fn positive(v: f64) -> GtResult<f64> {
///     ensure!(v > 0.0, GtError::invalid_input("必须为正数"));
///     Ok(v)
/// }
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

/// 解包 `Option`，为 `None` 时提前返回错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr $(,)?) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GtError::config("测试配置错误");
        assert!(err.to_string().contains("配置错误"));
    }

    #[test]
    fn test_operation_invalid_display() {
        let err = GtError::operation_invalid("no inverse");
        assert!(err.to_string().contains("no inverse"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let mut report = crate::validation::ValidationReport::new();
        report.add_error("unexpected token");
        let err: GtError = report.into_parse_error().into();
        assert!(err.is_parse_error());
        assert_eq!(err.as_parse_error().map(|e| e.grammar_errors.len()), Some(1));
    }

    #[test]
    fn test_check_range() {
        assert!(GtError::check_range("lat", 45.0, -90.0, 90.0).is_ok());
        assert!(GtError::check_range("lat", 91.0, -90.0, 90.0).is_err());
        assert!(GtError::check_range("lat", f64::NAN, -90.0, 90.0).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: GtError = io_err.into();
        assert!(matches!(err, GtError::Io { .. }));
    }

    #[test]
    fn test_transform_error_codes() {
        assert_eq!(TransformErrorKind::OutsideGrid.code(), 2052);
        assert!(TransformErrorKind::GridAtNodata.is_coordinate_error());
        assert!(!TransformErrorKind::NetworkError.is_coordinate_error());
        assert!(TransformErrorKind::InvalidCoordinate
            .to_string()
            .contains("Invalid coordinate"));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: i32) -> GtResult<()> {
            ensure!(value > 0, GtError::invalid_input("value must be positive"));
            Ok(())
        }

        assert!(check(1).is_ok());
        assert!(check(-1).is_err());
    }

    #[test]
    fn test_require_macro() {
        fn get_value(opt: Option<i32>) -> GtResult<i32> {
            let v = require!(opt, GtError::not_found("value"));
            Ok(v)
        }

        assert_eq!(get_value(Some(42)).unwrap(), 42);
        assert!(get_value(None).is_err());
    }
}
