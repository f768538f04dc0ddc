// crates/gt_geo/src/error.rs
//! 地理模型错误类型
//!
//! 包含椭球、基准、坐标系统、CRS 与坐标操作模型相关的错误。
//! 所有错误可转换为 `gt_foundation::GtError` 向上传播。
//!
//! # 错误分类
//!
//! - **不变量错误**：椭球参数无效、坐标轴数量与 CRS 类型不符
//! - **操作错误**：串联操作相邻步骤 CRS 不一致、方法不支持
//! - **解析错误**：定义字符串语法错误（附带警告列表）

use gt_foundation::{GtError, ParseError};
use thiserror::Error;

/// Geo 模块结果类型
pub type GeoResult<T> = Result<T, GeoError>;

/// 地理模型错误
#[derive(Error, Debug)]
pub enum GeoError {
    /// 椭球参数无效
    #[error("椭球参数无效: {message}")]
    InvalidEllipsoid {
        /// 失败原因
        message: String,
    },

    /// CRS 不满足不变量
    #[error("CRS 无效: {message}")]
    InvalidCrs {
        /// 失败原因
        message: String,
    },

    /// 坐标操作无效
    #[error("坐标操作无效: {message}")]
    InvalidOperation {
        /// 失败原因
        message: String,
    },

    /// 不支持的方法
    #[error("不支持的方法: {method}")]
    UnsupportedMethod {
        /// 方法名称
        method: String,
    },

    /// 缺少必需参数
    #[error("方法 {method} 缺少参数: {parameter}")]
    MissingParameter {
        /// 方法名称
        method: String,
        /// 参数名称
        parameter: String,
    },

    /// 坐标超出有效范围
    #[error("{coord_type} 超出范围: {value:.6} (允许范围: {min} 到 {max})")]
    CoordinateOutOfRange {
        /// 坐标类型（如"纬度"、"UTM带号"）
        coord_type: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 定义解析失败
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// 基础层错误
    #[error("基础层错误: {0}")]
    Foundation(#[from] GtError),
}

// ============================================================================
// 转换实现
// ============================================================================

impl From<GeoError> for GtError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::InvalidEllipsoid { message } => {
                GtError::crs_invalid(format!("椭球参数无效: {message}"))
            }
            GeoError::InvalidCrs { message } => GtError::crs_invalid(message),
            GeoError::InvalidOperation { message } => GtError::operation_invalid(message),
            GeoError::UnsupportedMethod { method } => {
                GtError::operation_invalid(format!("不支持的方法: {method}"))
            }
            GeoError::MissingParameter { method, parameter } => {
                GtError::operation_invalid(format!("方法 {method} 缺少参数: {parameter}"))
            }
            GeoError::CoordinateOutOfRange {
                coord_type,
                value,
                min,
                max,
            } => GtError::out_of_range(coord_type, value, min, max),
            GeoError::Parse(err) => GtError::Parse(err),
            GeoError::Foundation(err) => err,
        }
    }
}

// ============================================================================
// 便捷构造函数
// ============================================================================

impl GeoError {
    /// 椭球参数无效
    #[inline]
    pub fn invalid_ellipsoid(message: impl Into<String>) -> Self {
        Self::InvalidEllipsoid {
            message: message.into(),
        }
    }

    /// CRS 无效
    #[inline]
    pub fn invalid_crs(message: impl Into<String>) -> Self {
        Self::InvalidCrs {
            message: message.into(),
        }
    }

    /// 坐标操作无效
    #[inline]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// 不支持的方法
    #[inline]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// 缺少参数
    #[inline]
    pub fn missing_parameter(method: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            method: method.into(),
            parameter: parameter.into(),
        }
    }

    /// 坐标越界
    #[inline]
    pub fn coordinate_out_of_range(
        coord_type: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Self {
        Self::CoordinateOutOfRange {
            coord_type,
            value,
            min,
            max,
        }
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_crs_to_gt_error() {
        let err: GtError = GeoError::invalid_crs("坐标轴数量不符").into();
        assert!(matches!(err, GtError::CrsInvalid { .. }));
        assert!(err.to_string().contains("坐标轴数量不符"));
    }

    #[test]
    fn test_invalid_operation_to_gt_error() {
        let err: GtError = GeoError::invalid_operation("相邻步骤 CRS 不一致").into();
        assert!(matches!(err, GtError::OperationInvalid { .. }));
    }

    #[test]
    fn test_parse_error_roundtrip() {
        let geo: GeoError = ParseError::grammar("缺少 ']'").into();
        let err: GtError = geo.into();
        assert_eq!(
            err.as_parse_error().map(|e| e.grammar_errors[0].clone()),
            Some("缺少 ']'".to_string())
        );
    }

    #[test]
    fn test_coordinate_out_of_range_display() {
        let err = GeoError::coordinate_out_of_range("UTM带号", 61.0, 1.0, 60.0);
        assert!(err.to_string().contains("UTM带号"));
    }
}
