// crates/gt_geo/src/ellipsoid.rs
//! 椭球体定义
//!
//! 提供地球椭球体参数，支持 WGS84、GRS80、Clarke 1866、Bessel 等标准椭球体。
//! 椭球由长半轴和第二参数（反扁率或短半轴）定义，短半轴始终可推导。
//!
//! # 示例
//!
//! ```
//! use gt_geo::ellipsoid::Ellipsoid;
//!
//! let wgs84 = Ellipsoid::WGS84;
//! println!("长半轴: {} m", wgs84.a);
//! println!("第一偏心率平方: {}", wgs84.e2());
//! assert!(wgs84.is_semi_minor_computed());
//! ```

use crate::error::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// 定义椭球时给出的第二参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecondParameter {
    /// 反扁率（短半轴由计算得出）
    InverseFlattening,
    /// 短半轴（直接给出）
    SemiMinorAxis,
}

/// 地球椭球体
///
/// 定义椭球体的几何参数，并提供派生参数的计算方法。不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// 名称
    pub name: Cow<'static, str>,
    /// 长半轴 (m)
    pub a: f64,
    /// 扁率 (flattening)，球体为 0
    pub f: f64,
    /// 定义时使用的第二参数
    pub second: SecondParameter,
}

/// 由反扁率计算扁率（反扁率 0 表示球体）
fn flattening(rf: f64) -> f64 {
    if rf == 0.0 {
        0.0
    } else {
        1.0 / rf
    }
}

impl Ellipsoid {
    // ========================================================================
    // 预定义椭球体
    // ========================================================================

    /// WGS84 椭球体 (EPSG:7030)
    pub const WGS84: Self = Self::constant("WGS 84", 6_378_137.0, 1.0 / 298.257_223_563);

    /// GRS 1980 椭球体 (EPSG:7019)
    pub const GRS80: Self = Self::constant("GRS 1980", 6_378_137.0, 1.0 / 298.257_222_101);

    /// CGCS2000 椭球体 (EPSG:1024)，与 GRS80 参数相同
    pub const CGCS2000: Self = Self::constant("CGCS2000", 6_378_137.0, 1.0 / 298.257_222_101);

    /// Clarke 1866 椭球体 (EPSG:7008)，以短半轴定义
    pub const CLARKE_1866: Self = Self {
        name: Cow::Borrowed("Clarke 1866"),
        a: 6_378_206.4,
        f: (6_378_206.4 - 6_356_583.8) / 6_378_206.4,
        second: SecondParameter::SemiMinorAxis,
    };

    /// 国际椭球体 1924 (EPSG:7022)
    pub const INTERNATIONAL_1924: Self = Self::constant("International 1924", 6_378_388.0, 1.0 / 297.0);

    /// 克拉索夫斯基椭球体 (EPSG:7024)
    pub const KRASSOWSKY: Self = Self::constant("Krassowsky 1940", 6_378_245.0, 1.0 / 298.3);

    /// Bessel 1841 椭球体 (EPSG:7004)
    pub const BESSEL_1841: Self = Self::constant("Bessel 1841", 6_377_397.155, 1.0 / 299.152_812_8);

    /// Airy 1830 椭球体 (EPSG:7001)
    pub const AIRY_1830: Self = Self::constant("Airy 1830", 6_377_563.396, 1.0 / 299.324_964_6);

    /// 澳大利亚国家椭球体 (EPSG:7003)
    pub const AUSTRALIAN_NATIONAL: Self =
        Self::constant("Australian National Spheroid", 6_378_160.0, 1.0 / 298.25);

    /// 正球体（半径 6370997 m）
    pub const SPHERE: Self = Self::constant("Sphere", 6_370_997.0, 0.0);

    const fn constant(name: &'static str, a: f64, f: f64) -> Self {
        Self {
            name: Cow::Borrowed(name),
            a,
            f,
            second: SecondParameter::InverseFlattening,
        }
    }

    // ========================================================================
    // 构造方法
    // ========================================================================

    /// 从长半轴和反扁率创建椭球体（反扁率 0 表示球体）
    ///
    /// # Errors
    /// 长半轴非正或反扁率落在 (0, 1] 内时返回错误
    pub fn from_inverse_flattening(
        name: impl Into<String>,
        a: f64,
        rf: f64,
    ) -> GeoResult<Self> {
        if rf != 0.0 && (!rf.is_finite() || rf <= 1.0) {
            return Err(GeoError::invalid_ellipsoid(format!("反扁率无效: {rf}")));
        }
        Self::checked(Self {
            name: Cow::Owned(name.into()),
            a,
            f: flattening(rf),
            second: SecondParameter::InverseFlattening,
        })
    }

    /// 从长半轴和短半轴创建椭球体
    ///
    /// # Errors
    /// 长半轴非正或短半轴不在 (0, a] 内时返回错误
    pub fn from_semi_axes(name: impl Into<String>, a: f64, b: f64) -> GeoResult<Self> {
        if !(b > 0.0 && b <= a) {
            return Err(GeoError::invalid_ellipsoid(format!("短半轴无效: b={b}, a={a}")));
        }
        Self::checked(Self {
            name: Cow::Owned(name.into()),
            a,
            f: (a - b) / a,
            second: SecondParameter::SemiMinorAxis,
        })
    }

    /// 创建半径为 `r` 的球体
    ///
    /// # Errors
    /// 半径非正时返回错误
    pub fn sphere(name: impl Into<String>, r: f64) -> GeoResult<Self> {
        Self::from_inverse_flattening(name, r, 0.0)
    }

    fn checked(ellipsoid: Self) -> GeoResult<Self> {
        ellipsoid.validate()?;
        Ok(ellipsoid)
    }

    /// 验证不变量：a > 0，0 ≤ f < 1
    ///
    /// # Errors
    /// 不满足时返回 `GeoError::InvalidEllipsoid`
    pub fn validate(&self) -> GeoResult<()> {
        if !(self.a.is_finite() && self.a > 0.0) {
            return Err(GeoError::invalid_ellipsoid(format!("长半轴无效: {}", self.a)));
        }
        if !(0.0..1.0).contains(&self.f) {
            return Err(GeoError::invalid_ellipsoid(format!("扁率无效: {}", self.f)));
        }
        Ok(())
    }

    /// 从 EPSG 椭球体代码获取
    #[must_use]
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            7030 => Some(Self::WGS84),
            7019 => Some(Self::GRS80),
            1024 => Some(Self::CGCS2000),
            7008 => Some(Self::CLARKE_1866),
            7022 => Some(Self::INTERNATIONAL_1924),
            7024 => Some(Self::KRASSOWSKY),
            7004 => Some(Self::BESSEL_1841),
            7001 => Some(Self::AIRY_1830),
            7003 => Some(Self::AUSTRALIAN_NATIONAL),
            _ => None,
        }
    }

    /// 从 proj-string 的 `+ellps=` 名称获取
    #[must_use]
    pub fn from_proj_name(name: &str) -> Option<Self> {
        PROJ_ELLIPSOIDS
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, e)| e.clone())
    }

    /// 对应的 proj-string `+ellps=` 名称（按参数匹配）
    #[must_use]
    pub fn proj_name(&self) -> Option<&'static str> {
        PROJ_ELLIPSOIDS
            .iter()
            .find(|(_, e)| e.same_shape(self))
            .map(|(key, _)| *key)
    }

    /// 几何形状是否相同（忽略名称）
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        (self.a - other.a).abs() <= 1e-10 * self.a && (self.f - other.f).abs() <= 1e-14
    }

    // ========================================================================
    // 派生参数（几何常量）
    // ========================================================================

    /// 短半轴 b = a(1-f)
    #[inline]
    #[must_use]
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.f)
    }

    /// 反扁率（球体返回 0）
    #[inline]
    #[must_use]
    pub fn inverse_flattening(&self) -> f64 {
        if self.f == 0.0 {
            0.0
        } else {
            1.0 / self.f
        }
    }

    /// 短半轴是否由计算得出
    #[inline]
    #[must_use]
    pub fn is_semi_minor_computed(&self) -> bool {
        self.second == SecondParameter::InverseFlattening
    }

    /// 是否为球体
    #[inline]
    #[must_use]
    pub fn is_sphere(&self) -> bool {
        self.f == 0.0
    }

    /// 第一偏心率的平方 e² = 2f - f²
    #[inline]
    #[must_use]
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// 第一偏心率 e = √e²
    #[inline]
    #[must_use]
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// 第二偏心率的平方 e'² = e²/(1-e²)
    #[inline]
    #[must_use]
    pub fn ep2(&self) -> f64 {
        let e2 = self.e2();
        e2 / (1.0 - e2)
    }

    /// 第三扁率 n = (a-b)/(a+b) = f/(2-f)
    #[inline]
    #[must_use]
    pub fn n(&self) -> f64 {
        self.f / (2.0 - self.f)
    }

    /// 子午圈曲率半径 M = a(1-e²) / (1-e²sin²φ)^(3/2)
    #[inline]
    #[must_use]
    pub fn meridional_radius(&self, lat_rad: f64) -> f64 {
        let sin_lat = lat_rad.sin();
        let e2 = self.e2();
        self.a * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5)
    }

    /// 卯酉圈曲率半径 N = a / √(1-e²sin²φ)
    #[inline]
    #[must_use]
    pub fn prime_vertical_radius(&self, lat_rad: f64) -> f64 {
        let sin_lat = lat_rad.sin();
        let e2 = self.e2();
        self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

impl std::fmt::Display for Ellipsoid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_sphere() {
            write!(f, "{}(R={})", self.name, self.a)
        } else {
            write!(f, "{}(a={}, f=1/{:.9})", self.name, self.a, self.inverse_flattening())
        }
    }
}

/// proj-string 椭球名称表
static PROJ_ELLIPSOIDS: [(&str, Ellipsoid); 9] = [
    ("WGS84", Ellipsoid::WGS84),
    ("GRS80", Ellipsoid::GRS80),
    ("clrk66", Ellipsoid::CLARKE_1866),
    ("intl", Ellipsoid::INTERNATIONAL_1924),
    ("krass", Ellipsoid::KRASSOWSKY),
    ("bessel", Ellipsoid::BESSEL_1841),
    ("airy", Ellipsoid::AIRY_1830),
    ("aust_SA", Ellipsoid::AUSTRALIAN_NATIONAL),
    ("sphere", Ellipsoid::SPHERE),
];

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_parameters() {
        let e = Ellipsoid::WGS84;
        assert!((e.a - 6_378_137.0).abs() < 1e-6);
        // 短半轴标准值约 6356752.314245
        assert!((e.b() - 6_356_752.314_245).abs() < 0.001);
        assert!((e.e2() - 0.006_694_379_990_14).abs() < 1e-12);
        assert!(e.is_semi_minor_computed());
    }

    #[test]
    fn test_clarke_1866_semi_minor_given() {
        let e = Ellipsoid::CLARKE_1866;
        assert!(!e.is_semi_minor_computed());
        assert!((e.b() - 6_356_583.8).abs() < 1e-6);
        assert!((e.inverse_flattening() - 294.978_698_2).abs() < 1e-6);
    }

    #[test]
    fn test_grs80_vs_wgs84() {
        let wgs84 = Ellipsoid::WGS84;
        let grs80 = Ellipsoid::GRS80;
        assert_eq!(wgs84.a, grs80.a);
        assert!((wgs84.f - grs80.f).abs() > 1e-12);
        assert!(!wgs84.same_shape(&grs80));
        assert!(grs80.same_shape(&Ellipsoid::CGCS2000));
    }

    #[test]
    fn test_curvature_radius() {
        let e = Ellipsoid::WGS84;
        let m_equator = e.meridional_radius(0.0);
        let n_equator = e.prime_vertical_radius(0.0);
        assert!(n_equator > m_equator);
        assert!((n_equator - e.a).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_ellipsoids() {
        assert!(Ellipsoid::from_inverse_flattening("bad", -1.0, 298.0).is_err());
        assert!(Ellipsoid::from_inverse_flattening("bad", 6_378_137.0, 0.5).is_err());
        assert!(Ellipsoid::from_semi_axes("bad", 6_378_137.0, 7_000_000.0).is_err());
        let sphere = Ellipsoid::sphere("ball", 6_371_000.0).expect("sphere");
        assert!(sphere.is_sphere());
        assert_eq!(sphere.inverse_flattening(), 0.0);
    }

    #[test]
    fn test_from_epsg_and_proj_name() {
        assert_eq!(Ellipsoid::from_epsg(7030), Some(Ellipsoid::WGS84));
        assert_eq!(Ellipsoid::from_epsg(9999), None);
        assert_eq!(Ellipsoid::from_proj_name("clrk66"), Some(Ellipsoid::CLARKE_1866));
        assert_eq!(Ellipsoid::GRS80.proj_name(), Some("GRS80"));
        let renamed = Ellipsoid::from_inverse_flattening("x", 6_378_388.0, 297.0).unwrap();
        assert_eq!(renamed.proj_name(), Some("intl"));
    }
}
