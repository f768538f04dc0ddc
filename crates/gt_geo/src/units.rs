// crates/gt_geo/src/units.rs

//! 计量单位
//!
//! 角度单位以弧度为 SI 基准，长度单位以米为基准，比例单位以 1 为基准。

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// 单位类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// 角度
    Angular,
    /// 长度
    Linear,
    /// 比例（无量纲）
    Scale,
    /// 时间
    Time,
    /// 参数/未知
    Parametric,
}

/// 计量单位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// 名称
    pub name: Cow<'static, str>,
    /// 类别
    pub kind: UnitKind,
    /// 到 SI 单位的换算系数
    pub to_si: f64,
}

impl Unit {
    /// 米
    pub const METRE: Self = Self::constant("metre", UnitKind::Linear, 1.0);
    /// 千米
    pub const KILOMETRE: Self = Self::constant("kilometre", UnitKind::Linear, 1000.0);
    /// 国际英尺
    pub const FOOT: Self = Self::constant("foot", UnitKind::Linear, 0.3048);
    /// 美国测量英尺
    pub const US_SURVEY_FOOT: Self =
        Self::constant("US survey foot", UnitKind::Linear, 0.304_800_609_601_219_2);
    /// 弧度
    pub const RADIAN: Self = Self::constant("radian", UnitKind::Angular, 1.0);
    /// 度
    pub const DEGREE: Self =
        Self::constant("degree", UnitKind::Angular, 0.017_453_292_519_943_295);
    /// 百分度
    pub const GRAD: Self = Self::constant("grad", UnitKind::Angular, 0.015_707_963_267_948_967);
    /// 角秒
    pub const ARC_SECOND: Self =
        Self::constant("arc-second", UnitKind::Angular, 4.848_136_811_095_36e-6);
    /// 单位比例
    pub const UNITY: Self = Self::constant("unity", UnitKind::Scale, 1.0);
    /// 百万分之一
    pub const PARTS_PER_MILLION: Self = Self::constant("parts per million", UnitKind::Scale, 1e-6);
    /// 年
    pub const YEAR: Self = Self::constant("year", UnitKind::Time, 31_556_925.445);
    /// 秒
    pub const SECOND: Self = Self::constant("second", UnitKind::Time, 1.0);

    const fn constant(name: &'static str, kind: UnitKind, to_si: f64) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind,
            to_si,
        }
    }

    /// 自定义单位
    #[must_use]
    pub fn new(name: impl Into<String>, kind: UnitKind, to_si: f64) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            kind,
            to_si,
        }
    }

    /// 数值转换到 SI
    #[inline]
    #[must_use]
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.to_si
    }

    /// 数值从 SI 转换
    #[inline]
    #[must_use]
    pub fn from_si(&self, value: f64) -> f64 {
        value / self.to_si
    }

    /// 按名称识别常用单位（大小写与拼写变体不敏感）
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        let key = name.trim().to_lowercase().replace(['_', ' '], "");
        let unit = match key.as_str() {
            "metre" | "meter" | "m" => Self::METRE,
            "kilometre" | "kilometer" | "km" => Self::KILOMETRE,
            "foot" | "ft" | "internationalfoot" => Self::FOOT,
            "ussurveyfoot" | "usfoot" | "us-ft" | "footus" => Self::US_SURVEY_FOOT,
            "radian" | "rad" => Self::RADIAN,
            "degree" | "deg" | "degreeminutesecondhemisphere" => Self::DEGREE,
            "grad" | "gon" | "grade" => Self::GRAD,
            "arc-second" | "arcsecond" | "arcsec" => Self::ARC_SECOND,
            "unity" | "scaleunity" => Self::UNITY,
            "partspermillion" | "ppm" => Self::PARTS_PER_MILLION,
            "year" | "a" => Self::YEAR,
            "second" | "s" => Self::SECOND,
            _ => return None,
        };
        Some(unit)
    }

    /// proj-string 的 `+units=` 名称
    #[must_use]
    pub fn proj_name(&self) -> Option<&'static str> {
        if self.kind != UnitKind::Linear {
            return None;
        }
        let known: [(&'static str, f64); 4] = [
            ("m", 1.0),
            ("km", 1000.0),
            ("ft", 0.3048),
            ("us-ft", 0.304_800_609_601_219_2),
        ];
        known
            .iter()
            .find(|(_, f)| (f - self.to_si).abs() < 1e-12)
            .map(|(n, _)| *n)
    }

    /// 与另一个单位是否等价（同类且换算系数一致）
    #[must_use]
    pub fn is_equivalent_to(&self, other: &Unit) -> bool {
        self.kind == other.kind && (self.to_si - other.to_si).abs() <= 1e-10 * self.to_si.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_factor() {
        assert!((Unit::DEGREE.to_si(180.0) - std::f64::consts::PI).abs() < 1e-15);
        assert!((Unit::DEGREE.from_si(std::f64::consts::FRAC_PI_2) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(Unit::by_name("Meter"), Some(Unit::METRE));
        assert_eq!(Unit::by_name("US survey foot"), Some(Unit::US_SURVEY_FOOT));
        assert_eq!(Unit::by_name("furlong"), None);
    }

    #[test]
    fn test_equivalence_ignores_name() {
        let custom = Unit::new("metres", UnitKind::Linear, 1.0);
        assert_ne!(custom, Unit::METRE);
        assert!(custom.is_equivalent_to(&Unit::METRE));
        assert!(!Unit::FOOT.is_equivalent_to(&Unit::METRE));
    }

    #[test]
    fn test_proj_name() {
        assert_eq!(Unit::US_SURVEY_FOOT.proj_name(), Some("us-ft"));
        assert_eq!(Unit::DEGREE.proj_name(), None);
    }
}
