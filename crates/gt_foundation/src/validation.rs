// crates/gt_foundation/src/validation.rs

//! 定义解析诊断工具
//!
//! 解析 WKT / proj-string 定义时产生两类相互独立的诊断：
//!
//! - **错误**（语法错误等）：致命，终止构造
//! - **警告**（如"缺少参数，使用默认值"）：非致命，随结果一同返回
//!
//! # 示例
//!
//! ```
//! use gt_foundation::validation::ValidationReport;
//!
//! let mut report = ValidationReport::new();
//! report.add_warning("PRIMEM 缺失，假定为 Greenwich");
//! let parsed = report.finish(42).unwrap();
//! assert_eq!(parsed.value, 42);
//! assert_eq!(parsed.warnings.len(), 1);
//! ```

use std::fmt;

/// 诊断报告
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    /// 错误列表
    pub errors: Vec<String>,
    /// 警告列表
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// 创建空的报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加错误
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 是否有警告
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 警告数量
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// 是否通过（无错误）
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 合并另一个报告
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// 转换为解析错误（无论是否有错误）
    pub fn into_parse_error(self) -> ParseError {
        ParseError {
            grammar_errors: self.errors,
            warnings: self.warnings,
        }
    }

    /// 结束解析：有错误时返回 `ParseError`，否则携带警告返回值
    ///
    /// # Errors
    /// 报告中存在任何错误时返回 `ParseError`
    pub fn finish<T>(self, value: T) -> Result<Parsed<T>, ParseError> {
        if self.has_errors() {
            Err(self.into_parse_error())
        } else {
            Ok(Parsed {
                value,
                warnings: self.warnings,
            })
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "诊断报告:")?;
        writeln!(f, "  错误: {} 个", self.error_count())?;
        writeln!(f, "  警告: {} 个", self.warning_count())?;

        if self.has_errors() {
            writeln!(f, "\n错误详情:")?;
            for (i, err) in self.errors.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, err)?;
            }
        }

        if self.has_warnings() {
            writeln!(f, "\n警告详情:")?;
            for (i, warn) in self.warnings.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, warn)?;
            }
        }

        Ok(())
    }
}

/// 解析失败
///
/// 语法错误与语义警告是两个独立的有序列表。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseError {
    /// 语法错误（致命）
    pub grammar_errors: Vec<String>,
    /// 语义警告（非致命）
    pub warnings: Vec<String>,
}

impl ParseError {
    /// 单条语法错误
    pub fn grammar(message: impl Into<String>) -> Self {
        Self {
            grammar_errors: vec![message.into()],
            warnings: Vec::new(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "解析失败: ")?;
        if self.grammar_errors.is_empty() {
            write!(f, "未知错误")?;
        } else {
            write!(f, "{}", self.grammar_errors.join("; "))?;
        }
        if !self.warnings.is_empty() {
            write!(f, " (警告: {})", self.warnings.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// 成功解析的值及其警告
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    /// 解析得到的值
    pub value: T,
    /// 语义警告
    pub warnings: Vec<String>,
}

impl<T> Parsed<T> {
    /// 无警告的结果
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// 映射内部值，保留警告
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            warnings: self.warnings,
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
    fn test_validation_report_new() {
        let report = ValidationReport::new();
        assert!(!report.has_errors());
        assert!(!report.has_warnings());
        assert!(report.is_valid());
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let mut report = ValidationReport::new();
        report.add_warning("missing parameter, default assumed");

        assert!(report.has_warnings());
        assert!(report.is_valid());
        let parsed = report.finish("crs").expect("warnings are not fatal");
        assert_eq!(parsed.warnings, vec!["missing parameter, default assumed".to_string()]);
    }

    #[test]
    fn test_errors_are_fatal_and_keep_warnings() {
        let mut report = ValidationReport::new();
        report.add_warning("w1");
        report.add_error("e1");
        report.add_error("e2");

        let err = report.finish(()).unwrap_err();
        assert_eq!(err.grammar_errors, vec!["e1".to_string(), "e2".to_string()]);
        assert_eq!(err.warnings, vec!["w1".to_string()]);
    }

    #[test]
    fn test_validation_report_merge() {
        let mut report1 = ValidationReport::new();
        report1.add_error("error 1");

        let mut report2 = ValidationReport::new();
        report2.add_error("error 2");
        report2.add_warning("warning 1");

        report1.merge(report2);
        assert_eq!(report1.error_count(), 2);
        assert_eq!(report1.warning_count(), 1);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::grammar("第 3 列: 意外的字符 ']'");
        let s = err.to_string();
        assert!(s.contains("解析失败"));
        assert!(s.contains("第 3 列"));
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidationReport::new();
        report.add_error("test error");
        report.add_warning("test warning");

        let s = format!("{}", report);
        assert!(s.contains("错误: 1 个"));
        assert!(s.contains("警告: 1 个"));
    }

    #[test]
    fn test_parsed_map() {
        let parsed = Parsed {
            value: 2,
            warnings: vec!["w".into()],
        };
        let mapped = parsed.map(|v| v * 10);
        assert_eq!(mapped.value, 20);
        assert_eq!(mapped.warnings.len(), 1);
    }
}
