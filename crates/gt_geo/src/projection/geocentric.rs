// crates/gt_geo/src/projection/geocentric.rs
//! 大地坐标 ↔ 地心直角坐标

use crate::ellipsoid::Ellipsoid;
use gt_foundation::{Tolerance, TransformErrorKind};
use std::f64::consts::FRAC_PI_2;

/// 大地坐标与地心坐标互换（角度为弧度，长度为米）
#[derive(Debug, Clone, PartialEq)]
pub struct GeocentricConverter {
    a: f64,
    e2: f64,
    tolerance: Tolerance,
}

impl GeocentricConverter {
    /// 使用默认容差创建
    #[must_use]
    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        Self::with_tolerance(ellipsoid, Tolerance::default())
    }

    /// 指定迭代容差
    #[must_use]
    pub fn with_tolerance(ellipsoid: &Ellipsoid, tolerance: Tolerance) -> Self {
        Self {
            a: ellipsoid.a,
            e2: ellipsoid.e2(),
            tolerance,
        }
    }

    #[inline]
    fn prime_vertical(&self, sin_lat: f64) -> f64 {
        self.a / (1.0 - self.e2 * sin_lat * sin_lat).sqrt()
    }

    /// (λ, φ, h) → (X, Y, Z)
    pub fn forward(&self, lon: f64, lat: f64, h: f64) -> Result<[f64; 3], TransformErrorKind> {
        if !lon.is_finite() || !lat.is_finite() || !h.is_finite() || lat.abs() > FRAC_PI_2 {
            return Err(TransformErrorKind::InvalidCoordinate);
        }
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let n = self.prime_vertical(sin_lat);
        Ok([
            (n + h) * cos_lat * cos_lon,
            (n + h) * cos_lat * sin_lon,
            (n * (1.0 - self.e2) + h) * sin_lat,
        ])
    }

    /// (X, Y, Z) → (λ, φ, h)，迭代求解
    ///
    /// 椭球高使用 `p·cosφ + Z·sinφ − a²/N`，在极点附近同样稳定。
    pub fn inverse(&self, x: f64, y: f64, z: f64) -> Result<[f64; 3], TransformErrorKind> {
        if !x.is_finite() || !y.is_finite() || !z.is_finite() {
            return Err(TransformErrorKind::InvalidCoordinate);
        }
        let p = x.hypot(y);
        let lon = y.atan2(x);

        let mut lat = z.atan2(p * (1.0 - self.e2));
        let mut h = 0.0;
        for _ in 0..self.tolerance.max_iterations.max(1) {
            let (sin_lat, cos_lat) = lat.sin_cos();
            let n = self.prime_vertical(sin_lat);
            h = p * cos_lat + z * sin_lat - self.a * self.a / n;
            let next = z.atan2(p * (1.0 - self.e2 * n / (n + h)));
            let delta = (next - lat).abs();
            lat = next;
            if delta < self.tolerance.convergence {
                break;
            }
        }
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = self.prime_vertical(sin_lat);
        h = if p == 0.0 && z == 0.0 {
            h
        } else {
            p * cos_lat + z * sin_lat - self.a * self.a / n
        };
        Ok([lon, lat, h])
    }
}
