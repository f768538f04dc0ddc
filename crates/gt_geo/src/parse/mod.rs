// crates/gt_geo/src/parse/mod.rs
//! CRS 与坐标操作定义的解析
//!
//! 三种输入格式：
//!
//! - proj-string：`+proj=utm +zone=50 +datum=WGS84 +type=crs`
//! - WKT1 / WKT2：`GEOGCRS["WGS 84", ...]`
//! - 权威引用：`EPSG:4326`、`urn:ogc:def:crs:EPSG::4326`、`+init=epsg:4326`
//!
//! 权威引用本身不含定义，由 [`Definition::Reference`] 返回，交给注册表解析。
//!
//! # 示例
//!
//! ```
//! use gt_geo::parse::{parse_definition, Definition};
//!
//! match parse_definition("+proj=longlat +datum=WGS84 +type=crs").unwrap() {
//!     Definition::Crs(parsed) => assert!(parsed.value.is_geographic()),
//!     Definition::Reference(_) => unreachable!(),
//! }
//! assert!(matches!(parse_definition("EPSG:4326"), Ok(Definition::Reference(_))));
//! ```

pub mod proj_string;
pub mod wkt;

pub use proj_string::{ProjParam, ProjStep, ProjStringParser};
pub use wkt::{WktNode, WktParser, WktValue};

use crate::crs::Crs;
use crate::identifier::Identifier;
use crate::operation::Operation;
use gt_foundation::{ParseError, Parsed};

/// 定义解析结果
#[derive(Debug, Clone)]
pub enum Definition {
    /// 权威引用，需要注册表查找
    Reference(Identifier),
    /// 完整的 CRS 定义
    Crs(Parsed<Crs>),
}

/// 按格式识别并解析 CRS 定义
///
/// # Errors
/// 文本为空、格式无法识别或解析失败时返回 [`ParseError`]
pub fn parse_definition(text: &str) -> Result<Definition, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::grammar("空的 CRS 定义"));
    }
    if let Some(init) = text
        .split_whitespace()
        .find(|t| t.starts_with("+init=") || t.starts_with("init="))
    {
        let init = init.trim_start_matches('+');
        return Identifier::parse_reference(&format!("+{init}"))
            .map(Definition::Reference)
            .ok_or_else(|| ParseError::grammar(format!("无效的引用 {init}")));
    }
    if wkt::looks_like_wkt(text) {
        return WktParser::new().parse_crs(text).map(Definition::Crs);
    }
    if is_proj_string(text) {
        return ProjStringParser::new().parse_crs(text).map(Definition::Crs);
    }
    Identifier::parse_reference(text)
        .map(Definition::Reference)
        .ok_or_else(|| ParseError::grammar(format!("无法识别的 CRS 定义格式: {text}")))
}

/// 解析坐标操作定义
///
/// 接受 `+proj=pipeline ...`、单步 proj-string 与 WKT `CONVERSION[...]`。
///
/// # Errors
/// 格式无法识别或解析失败时返回 [`ParseError`]
pub fn parse_operation(text: &str) -> Result<Parsed<Operation>, ParseError> {
    let text = text.trim();
    if wkt::looks_like_wkt(text) {
        return WktParser::new().parse_operation(text);
    }
    if is_proj_string(text) {
        return proj_string::parse_operation(text);
    }
    Err(ParseError::grammar(format!("无法识别的操作定义格式: {text}")))
}

fn is_proj_string(text: &str) -> bool {
    text.split_whitespace()
        .any(|t| t.starts_with("+proj=") || t.starts_with("proj="))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_formats() {
        assert!(matches!(
            parse_definition("urn:ogc:def:crs:EPSG::4326"),
            Ok(Definition::Reference(id)) if id.code == "4326"
        ));
        assert!(matches!(
            parse_definition("+init=epsg:32631 +type=crs"),
            Ok(Definition::Reference(id)) if id.code == "32631"
        ));
        assert!(matches!(
            parse_definition("proj=utm zone=31 datum=WGS84 type=crs"),
            Ok(Definition::Crs(_))
        ));
        assert!(matches!(
            parse_definition(r#"VERT_CS["h", VERT_DATUM["d", 2005], UNIT["metre", 1]]"#),
            Ok(Definition::Crs(p)) if p.value.is_vertical()
        ));
    }

    #[test]
    fn test_unrecognized_definition() {
        let err = parse_definition("not a crs").unwrap_err();
        assert_eq!(err.grammar_errors.len(), 1);
        assert!(parse_definition("   ").is_err());
    }

    #[test]
    fn test_parse_operation_formats() {
        let op = parse_operation("+proj=pipeline +step +proj=axisswap +order=2,1")
            .unwrap()
            .value;
        assert!(op.single().unwrap().method.is_proj_pipeline());
        let conv = parse_operation(
            r#"CONVERSION["m", METHOD["Mercator (variant A)", ID["EPSG", 9804]],
               PARAMETER["Longitude of natural origin", 110, ANGLEUNIT["degree", 0.0174532925199433]]]"#,
        )
        .unwrap()
        .value;
        assert!(conv.is_conversion());
        assert!(parse_operation("EPSG:1234").is_err());
    }
}
