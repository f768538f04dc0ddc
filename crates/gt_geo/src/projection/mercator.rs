// crates/gt_geo/src/projection/mercator.rs
//! 墨卡托投影
//!
//! - Mercator (variant A)：椭球正轴墨卡托，基于共形纬度
//! - Popular Visualisation Pseudo Mercator：椭球面经纬度直接套用球面公式
//!
//! 两者在极点都没有定义，纬度为 ±90° 时报告 `OutsideProjectionDomain`。
//! 伪墨卡托不对纬度做 ±85.051° 截断。

use super::math_utils::{adjlon, tauf, taupf};
use crate::ellipsoid::Ellipsoid;
use gt_foundation::TransformErrorKind;
use std::f64::consts::FRAC_PI_2;

fn check_geographic(lon: f64, lat: f64) -> Result<(), TransformErrorKind> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > FRAC_PI_2 {
        return Err(TransformErrorKind::InvalidCoordinate);
    }
    if (lat.abs() - FRAC_PI_2).abs() < 1e-12 {
        return Err(TransformErrorKind::OutsideProjectionDomain);
    }
    Ok(())
}

/// Mercator (variant A)，角度单位为弧度
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    a: f64,
    es: f64,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Mercator {
    /// 创建投影
    #[must_use]
    pub fn new(
        ellipsoid: &Ellipsoid,
        lon0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            a: ellipsoid.a,
            es: ellipsoid.e(),
            lon0,
            k0,
            false_easting,
            false_northing,
        }
    }

    /// 正向投影
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        check_geographic(lon, lat)?;
        let ak0 = self.a * self.k0;
        let x = ak0 * adjlon(lon - self.lon0);
        let y = ak0 * taupf(lat.tan(), self.es).asinh();
        Ok((x + self.false_easting, y + self.false_northing))
    }

    /// 逆向投影
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformErrorKind> {
        if !x.is_finite() || !y.is_finite() {
            return Err(TransformErrorKind::InvalidCoordinate);
        }
        let ak0 = self.a * self.k0;
        let lon = (x - self.false_easting) / ak0 + self.lon0;
        let taup = ((y - self.false_northing) / ak0).sinh();
        let lat = tauf(taup, self.es).atan();
        Ok((adjlon(lon), lat))
    }
}

/// Popular Visualisation Pseudo Mercator，角度单位为弧度
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoMercator {
    a: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl PseudoMercator {
    /// 创建投影（只使用椭球长半轴）
    #[must_use]
    pub fn new(ellipsoid: &Ellipsoid, lon0: f64, false_easting: f64, false_northing: f64) -> Self {
        Self {
            a: ellipsoid.a,
            lon0,
            false_easting,
            false_northing,
        }
    }

    /// 正向投影
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        check_geographic(lon, lat)?;
        let x = self.a * adjlon(lon - self.lon0);
        let y = self.a * lat.tan().asinh();
        Ok((x + self.false_easting, y + self.false_northing))
    }

    /// 逆向投影
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformErrorKind> {
        if !x.is_finite() || !y.is_finite() {
            return Err(TransformErrorKind::InvalidCoordinate);
        }
        let lon = (x - self.false_easting) / self.a + self.lon0;
        let lat = ((y - self.false_northing) / self.a).sinh().atan();
        Ok((adjlon(lon), lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudo_mercator_known_values() {
        let proj = PseudoMercator::new(&Ellipsoid::WGS84, 0.0, 0.0, 0.0);
        let (x, y) = proj.forward(180f64.to_radians(), 0.0).unwrap();
        assert!((x - 20_037_508.342_789_244).abs() < 1e-6);
        assert!(y.abs() < 1e-9);

        let (_, y) = proj
            .forward(0.0, 85.051_128_779_806_59_f64.to_radians())
            .unwrap();
        assert!((y - 20_037_508.342_789_244).abs() < 1e-3);
    }

    #[test]
    fn test_pseudo_mercator_not_clamped() {
        let proj = PseudoMercator::new(&Ellipsoid::WGS84, 0.0, 0.0, 0.0);
        let (_, y) = proj.forward(0.0, 89.0f64.to_radians()).unwrap();
        assert!(y > 20_037_508.342_789_244);
        let (_, lat) = proj.inverse(0.0, y).unwrap();
        assert!((lat.to_degrees() - 89.0).abs() < 1e-12);
    }

    #[test]
    fn test_poles_outside_domain() {
        let merc = Mercator::new(&Ellipsoid::WGS84, 0.0, 1.0, 0.0, 0.0);
        assert_eq!(
            merc.forward(0.0, FRAC_PI_2),
            Err(TransformErrorKind::OutsideProjectionDomain)
        );
        assert_eq!(
            merc.forward(0.0, 1.6),
            Err(TransformErrorKind::InvalidCoordinate)
        );
    }

    #[test]
    fn test_mercator_a_roundtrip() {
        // EPSG 示例 (Makassar / NEIEZ)：Bessel 1841, λ0 = 110°E, k0 = 0.997, FE = 3900000, FN = 900000
        let merc = Mercator::new(
            &Ellipsoid::BESSEL_1841,
            110f64.to_radians(),
            0.997,
            3_900_000.0,
            900_000.0,
        );
        let (x, y) = merc
            .forward(120f64.to_radians(), (-3f64).to_radians())
            .unwrap();
        assert!((x - 5_009_726.58).abs() < 0.01, "x = {x}");
        assert!((y - 569_150.82).abs() < 0.01, "y = {y}");

        let (lon, lat) = merc.inverse(x, y).unwrap();
        assert!((lon.to_degrees() - 120.0).abs() < 1e-11);
        assert!((lat.to_degrees() + 3.0).abs() < 1e-11);
    }
}
