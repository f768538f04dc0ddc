// crates/gt_geo/src/projection/mod.rs
//! 纯 Rust 实现的投影与点变换核心
//!
//! 支持的投影方法：
//! - Transverse Mercator (EPSG 9807)，UTM 与高斯-克吕格均为其特例
//! - Mercator variant A (EPSG 9804)
//! - Popular Visualisation Pseudo Mercator (EPSG 1024)
//!
//! 以及执行器使用的数值核心：大地/地心坐标互换、Helmert 七参数、二维仿射。
//!
//! # 算法特点
//!
//! - 横轴墨卡托使用 Karney (2011) 算法，精度达亚毫米级
//! - 投影以静态分派枚举表示，编译期确定方法，逐点调用无虚函数开销
//! - 所有接口角度为弧度，长度为米
//!
//! # 示例
//!
//! ```
//! use gt_geo::ellipsoid::Ellipsoid;
//! use gt_geo::operation::Operation;
//! use gt_geo::projection::Projection;
//!
//! let utm = Operation::utm(50, false).unwrap();
//! let proj = Projection::from_conversion(utm.single().unwrap(), &Ellipsoid::WGS84).unwrap();
//!
//! let (x, y) = proj.forward(117f64.to_radians(), 40f64.to_radians()).unwrap();
//! assert!((x - 500_000.0).abs() < 1e-6);
//!
//! let (lon, lat) = proj.inverse(x, y).unwrap();
//! assert!((lat.to_degrees() - 40.0).abs() < 1e-10);
//! ```

pub mod affine;
pub mod geocentric;
pub mod helmert;
pub(crate) mod math_utils;
pub mod mercator;
pub mod transverse_mercator;

pub use affine::Affine;
pub use geocentric::GeocentricConverter;
pub use helmert::{Helmert, RotationConvention};
pub use math_utils::adjlon;
pub use mercator::{Mercator, PseudoMercator};
pub use transverse_mercator::{TransverseMercator, TransverseMercatorParams};

use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, GeoResult};
use crate::operation::{methods, params, SingleOperation};
use gt_foundation::TransformErrorKind;

// ============================================================================
// 投影枚举
// ============================================================================

/// 投影（静态分派）
#[derive(Debug, Clone)]
pub enum Projection {
    /// 横轴墨卡托
    TransverseMercator(TransverseMercator),
    /// 墨卡托 (variant A)
    Mercator(Mercator),
    /// Web 墨卡托
    PseudoMercator(PseudoMercator),
}

impl Projection {
    /// 方法代码是否为支持的投影
    #[must_use]
    pub fn supports(method_code: u32) -> bool {
        matches!(
            method_code,
            methods::TRANSVERSE_MERCATOR | methods::MERCATOR_A | methods::PSEUDO_MERCATOR
        )
    }

    /// 由转换操作与基础椭球创建
    ///
    /// # Errors
    /// 方法不支持或缺少必需参数时返回错误
    pub fn from_conversion(conversion: &SingleOperation, ellipsoid: &Ellipsoid) -> GeoResult<Self> {
        let code = conversion
            .method
            .code
            .ok_or_else(|| GeoError::unsupported_method(conversion.method.name.clone()))?;
        let fe = conversion.value_or(params::FALSE_EASTING, 0.0);
        let fn_ = conversion.value_or(params::FALSE_NORTHING, 0.0);
        let lat0 = conversion.value_or(params::LATITUDE_OF_ORIGIN, 0.0);

        match code {
            methods::TRANSVERSE_MERCATOR => {
                let lon0 = conversion.required(params::LONGITUDE_OF_ORIGIN)?;
                let k0 = conversion.value_or(params::SCALE_FACTOR, 1.0);
                Ok(Self::TransverseMercator(TransverseMercator::new(
                    TransverseMercatorParams {
                        ellipsoid: ellipsoid.clone(),
                        central_meridian: lon0.to_degrees(),
                        lat_origin: lat0.to_degrees(),
                        scale_factor: k0,
                        false_easting: fe,
                        false_northing: fn_,
                    },
                )))
            }
            methods::MERCATOR_A => {
                if lat0 != 0.0 {
                    return Err(GeoError::invalid_operation(
                        "Mercator (variant A) 的纬度原点必须为 0",
                    ));
                }
                let lon0 = conversion.value_or(params::LONGITUDE_OF_ORIGIN, 0.0);
                let k0 = conversion.value_or(params::SCALE_FACTOR, 1.0);
                Ok(Self::Mercator(Mercator::new(ellipsoid, lon0, k0, fe, fn_)))
            }
            methods::PSEUDO_MERCATOR => {
                let lon0 = conversion.value_or(params::LONGITUDE_OF_ORIGIN, 0.0);
                Ok(Self::PseudoMercator(PseudoMercator::new(
                    ellipsoid, lon0, fe, fn_,
                )))
            }
            _ => Err(GeoError::unsupported_method(conversion.method.name.clone())),
        }
    }

    /// 正向投影：(λ, φ) [rad] → (E, N) [m]
    #[inline]
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        match self {
            Self::TransverseMercator(p) => p.forward(lon.to_degrees(), lat.to_degrees()),
            Self::Mercator(p) => p.forward(lon, lat),
            Self::PseudoMercator(p) => p.forward(lon, lat),
        }
    }

    /// 逆向投影：(E, N) [m] → (λ, φ) [rad]
    #[inline]
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformErrorKind> {
        match self {
            Self::TransverseMercator(p) => p
                .inverse(x, y)
                .map(|(lon, lat)| (lon.to_radians(), lat.to_radians())),
            Self::Mercator(p) => p.inverse(x, y),
            Self::PseudoMercator(p) => p.inverse(x, y),
        }
    }

    /// 投影名称
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransverseMercator(_) => "Transverse Mercator",
            Self::Mercator(_) => "Mercator (variant A)",
            Self::PseudoMercator(_) => "Popular Visualisation Pseudo Mercator",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Method, Operation};

    #[test]
    fn test_from_utm_conversion() {
        let op = Operation::utm(31, false).unwrap();
        let proj = Projection::from_conversion(op.single().unwrap(), &Ellipsoid::WGS84).unwrap();
        assert!(matches!(proj, Projection::TransverseMercator(_)));
        let (x, y) = proj.forward(3f64.to_radians(), 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_web_mercator_roundtrip() {
        let op = Operation::pseudo_mercator();
        let proj = Projection::from_conversion(op.single().unwrap(), &Ellipsoid::WGS84).unwrap();
        let (lon, lat) = (2.35f64.to_radians(), 48.85f64.to_radians());
        let (x, y) = proj.forward(lon, lat).unwrap();
        let (lon2, lat2) = proj.inverse(x, y).unwrap();
        assert!((lon - lon2).abs() < 1e-12 && (lat - lat2).abs() < 1e-12);
    }

    #[test]
    fn test_unsupported_method() {
        let op = SingleOperation::new(Method::named("Lambert Conic Conformal (2SP)"), vec![]);
        assert!(matches!(
            Projection::from_conversion(&op, &Ellipsoid::WGS84),
            Err(GeoError::UnsupportedMethod { .. })
        ));
    }

    #[test]
    fn test_missing_central_meridian() {
        let op = SingleOperation::new(Method::epsg(methods::TRANSVERSE_MERCATOR), vec![]);
        assert!(matches!(
            Projection::from_conversion(&op, &Ellipsoid::WGS84),
            Err(GeoError::MissingParameter { .. })
        ));
    }
}
