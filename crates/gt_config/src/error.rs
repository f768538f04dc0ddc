// crates/gt_config/src/error.rs

//! 配置层错误类型

use gt_foundation::GtError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(String),
}

impl ConfigError {
    /// 无效值
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for GtError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => GtError::io_with_source("读取配置失败", e),
            other => GtError::config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid_value("search.desired_accuracy", -1.0, "不能为负");
        assert!(err.to_string().contains("desired_accuracy"));
    }

    #[test]
    fn test_into_gt_error() {
        let err: GtError = ConfigError::Missing("grid_cache".into()).into();
        assert!(matches!(err, GtError::Config { .. }));
    }
}
