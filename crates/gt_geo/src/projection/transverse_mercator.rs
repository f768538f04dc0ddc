// crates/gt_geo/src/projection/transverse_mercator.rs
//! 高精度横轴墨卡托投影（Karney 2011 算法）
//!
//! 实现基于 Krüger 级数的横轴墨卡托投影，精度可达亚毫米级。
//! UTM 与高斯-克吕格都是它的参数特例。
//!
//! # 参考文献
//!
//! Karney, C. F. F. (2011). "Transverse Mercator with an accuracy of a few nanometers".
//! Journal of Geodesy, 85(8), 475-485.
//!
//! # 算法特点
//!
//! - 使用 6 阶 Krüger 级数展开
//! - 在全球范围内（除极点附近）精度达到纳米级
//! - 支持任意椭球体参数与非零纬度原点

use super::math_utils::{ang_diff, ang_normalize, polyval, sincosd, tauf, taupf};
use crate::ellipsoid::Ellipsoid;
use gt_foundation::TransformErrorKind;
use num_complex::Complex64;
use std::f64::consts::PI;

// ============================================================================
// 系数表 (GeographicLib)
// ============================================================================

/// 6阶 alpha 系数 (正向投影)
const ALPHA_COEFFS: &[&[f64]] = &[
    // alp[1]/n^1
    &[31564.0, -66675.0, 34440.0, 47250.0, -100800.0, 75600.0, 151200.0],
    // alp[2]/n^2
    &[-1983433.0, 863232.0, 748608.0, -1161216.0, 524160.0, 1935360.0],
    // alp[3]/n^3
    &[670412.0, 406647.0, -533952.0, 184464.0, 725760.0],
    // alp[4]/n^4
    &[6601661.0, -7732800.0, 2230245.0, 7257600.0],
    // alp[5]/n^5
    &[-13675556.0, 3438171.0, 7983360.0],
    // alp[6]/n^6
    &[212378941.0, 319334400.0],
];

/// 6阶 beta 系数 (逆向投影)
const BETA_COEFFS: &[&[f64]] = &[
    // bet[1]/n^1
    &[384796.0, -382725.0, -6720.0, 932400.0, -1612800.0, 1209600.0, 2419200.0],
    // bet[2]/n^2
    &[-1118711.0, 1695744.0, -1174656.0, 258048.0, 80640.0, 3870720.0],
    // bet[3]/n^3
    &[22276.0, -16929.0, -15984.0, 12852.0, 362880.0],
    // bet[4]/n^4
    &[-830251.0, -158400.0, 197865.0, 7257600.0],
    // bet[5]/n^5
    &[-435388.0, 453717.0, 15966720.0],
    // bet[6]/n^6
    &[20648693.0, 638668800.0],
];

/// b1 系数 (rectifying radius)
const B1_COEFFS: &[f64] = &[1.0, 4.0, 64.0, 256.0, 256.0];

/// 级数阶数
const MAX_ORDER: usize = 6;

// ============================================================================
// 参数
// ============================================================================

/// 横轴墨卡托投影参数（角度单位为度）
#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercatorParams {
    /// 椭球体
    pub ellipsoid: Ellipsoid,
    /// 中央子午线 (度)
    pub central_meridian: f64,
    /// 纬度原点 (度)
    pub lat_origin: f64,
    /// 比例因子
    pub scale_factor: f64,
    /// 假东 (米)
    pub false_easting: f64,
    /// 假北 (米)
    pub false_northing: f64,
}

impl TransverseMercatorParams {
    /// UTM 参数
    #[must_use]
    pub fn utm(zone: u8, north: bool, ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            central_meridian: f64::from(zone) * 6.0 - 183.0,
            lat_origin: 0.0,
            scale_factor: 0.9996,
            false_easting: 500_000.0,
            false_northing: if north { 0.0 } else { 10_000_000.0 },
        }
    }
}

// ============================================================================
// 预计算
// ============================================================================

/// 预计算的级数系数
#[derive(Debug, Clone)]
struct TmComputed {
    e2: f64,
    es: f64,
    e2m: f64,
    b1: f64,
    a1: f64,
    alp: [f64; MAX_ORDER],
    bet: [f64; MAX_ORDER],
}

impl TmComputed {
    fn new(ellipsoid: &Ellipsoid) -> Self {
        let a = ellipsoid.a;
        let f = ellipsoid.f;
        let e2 = f * (2.0 - f);
        let es = if f < 0.0 { -1.0 } else { 1.0 } * e2.abs().sqrt();
        let e2m = 1.0 - e2;
        let n = f / (2.0 - f);

        let n2 = n * n;
        let b1 = polyval(&B1_COEFFS[..B1_COEFFS.len() - 1], n2)
            / (B1_COEFFS[B1_COEFFS.len() - 1] * (1.0 + n));
        let a1 = b1 * a;

        let mut alp = [0.0; MAX_ORDER];
        let mut bet = [0.0; MAX_ORDER];
        let mut d = n;
        for l in 0..MAX_ORDER {
            let coeffs_a = ALPHA_COEFFS[l];
            let coeffs_b = BETA_COEFFS[l];
            let m = coeffs_a.len() - 1;
            alp[l] = d * polyval(&coeffs_a[..m], n) / coeffs_a[m];
            bet[l] = d * polyval(&coeffs_b[..m], n) / coeffs_b[m];
            d *= n;
        }

        Self {
            e2,
            es,
            e2m,
            b1,
            a1,
            alp,
            bet,
        }
    }
}

/// 正向结果（不含假东假北）
#[derive(Debug, Clone, Copy)]
struct ForwardResult {
    x: f64,
    y: f64,
    gamma: f64,
    k: f64,
}

// ============================================================================
// 投影
// ============================================================================

/// 横轴墨卡托投影（系数在构造时预计算）
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    params: TransverseMercatorParams,
    tm: TmComputed,
    /// 纬度原点在中央子午线上的北向坐标
    y_origin: f64,
}

impl TransverseMercator {
    /// 由参数创建
    #[must_use]
    pub fn new(params: TransverseMercatorParams) -> Self {
        let tm = TmComputed::new(&params.ellipsoid);
        let mut proj = Self {
            params,
            tm,
            y_origin: 0.0,
        };
        if proj.params.lat_origin != 0.0 {
            proj.y_origin = proj
                .forward_internal(proj.params.central_meridian, proj.params.lat_origin)
                .map_or(0.0, |r| r.y);
        }
        proj
    }

    /// 参数
    #[must_use]
    pub fn params(&self) -> &TransverseMercatorParams {
        &self.params
    }

    fn forward_internal(&self, lon: f64, lat: f64) -> Result<ForwardResult, TransformErrorKind> {
        if !lon.is_finite() || !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(TransformErrorKind::InvalidCoordinate);
        }
        let tm = &self.tm;
        let k0 = self.params.scale_factor;

        let lon_diff = ang_diff(self.params.central_meridian, lon);

        let latsign = if lat.is_sign_negative() { -1.0 } else { 1.0 };
        let lonsign = if lon_diff.is_sign_negative() { -1.0 } else { 1.0 };
        let lat = lat.abs();
        let lon_diff = lon_diff.abs();

        let backside = lon_diff > 90.0;
        let lon_diff = if backside { 180.0 - lon_diff } else { lon_diff };

        let (sphi, cphi) = sincosd(lat);
        let (slam, clam) = sincosd(lon_diff);

        let (xip, etap, mut gamma, mut k);
        if lat == 90.0 {
            xip = PI / 2.0;
            etap = 0.0;
            gamma = lon_diff;
            k = (1.0 + tm.e2m.sqrt()) / 2.0 / tm.e2m.sqrt().sqrt();
        } else {
            let tau = sphi / cphi;
            let taup = taupf(tau, tm.es);

            xip = taup.atan2(clam);
            etap = (slam / taup.hypot(clam)).asinh();

            // 收敛角和比例因子 (Gauss-Schreiber)
            gamma = (slam * taup).atan2(clam * taup.hypot(1.0)).to_degrees();
            k = (tm.e2m + tm.e2 * cphi * cphi).sqrt() * tau.hypot(1.0) / taup.hypot(clam);
        }

        // Clenshaw 求和
        let c0 = (2.0 * xip).cos();
        let ch0 = (2.0 * etap).cosh();
        let s0 = (2.0 * xip).sin();
        let sh0 = (2.0 * etap).sinh();

        let a = Complex64::new(2.0 * c0 * ch0, -2.0 * s0 * sh0);

        let mut y0 = Complex64::new(0.0, 0.0);
        let mut y1 = Complex64::new(0.0, 0.0);
        let mut z0 = Complex64::new(0.0, 0.0);
        let mut z1 = Complex64::new(0.0, 0.0);

        for j in (0..MAX_ORDER).rev() {
            let tmp_y = y0;
            let tmp_z = z0;
            y0 = a * y0 - y1 + tm.alp[j];
            z0 = a * z0 - z1 + (2 * (j + 1)) as f64 * tm.alp[j];
            y1 = tmp_y;
            z1 = tmp_z;
        }

        let sin_zeta = Complex64::new(s0 * ch0, c0 * sh0);
        let y_result = Complex64::new(xip, etap) + sin_zeta * y0;
        let z_result = Complex64::new(1.0, 0.0) - z1 + (a / 2.0) * z0;

        let mut xi = y_result.re;
        let eta = y_result.im;

        gamma -= z_result.im.atan2(z_result.re).to_degrees();
        k = k0 * tm.b1 * k * z_result.norm();

        if backside {
            xi = PI - xi;
            gamma = 180.0 - gamma;
        }

        Ok(ForwardResult {
            x: tm.a1 * k0 * eta * lonsign,
            y: tm.a1 * k0 * xi * latsign,
            gamma: gamma * latsign * lonsign,
            k,
        })
    }

    /// 正向投影：经纬度（度）-> 东向、北向（米）
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        let r = self.forward_internal(lon, lat)?;
        Ok((
            r.x + self.params.false_easting,
            r.y - self.y_origin + self.params.false_northing,
        ))
    }

    /// 逆向投影：东向、北向（米）-> 经纬度（度）
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformErrorKind> {
        if !x.is_finite() || !y.is_finite() {
            return Err(TransformErrorKind::InvalidCoordinate);
        }
        let tm = &self.tm;
        let k0 = self.params.scale_factor;

        let xi = (y - self.params.false_northing + self.y_origin) / (tm.a1 * k0);
        let eta = (x - self.params.false_easting) / (tm.a1 * k0);

        let xisign = if xi.is_sign_negative() { -1.0 } else { 1.0 };
        let etasign = if eta.is_sign_negative() { -1.0 } else { 1.0 };
        let xi = xi.abs();
        let eta = eta.abs();

        let backside = xi > PI / 2.0;
        let xi = if backside { PI - xi } else { xi };

        let c0 = (2.0 * xi).cos();
        let ch0 = (2.0 * eta).cosh();
        let s0 = (2.0 * xi).sin();
        let sh0 = (2.0 * eta).sinh();

        let a = Complex64::new(2.0 * c0 * ch0, -2.0 * s0 * sh0);

        let mut y0 = Complex64::new(0.0, 0.0);
        let mut y1 = Complex64::new(0.0, 0.0);
        for j in (0..MAX_ORDER).rev() {
            let tmp = y0;
            y0 = a * y0 - y1 - tm.bet[j];
            y1 = tmp;
        }

        let sin_zeta = Complex64::new(s0 * ch0, c0 * sh0);
        let y_result = Complex64::new(xi, eta) + sin_zeta * y0;

        let xip = y_result.re;
        let etap = y_result.im;

        let s = etap.sinh();
        let c = xip.cos().max(0.0);
        let r = s.hypot(c);

        let (mut lon, lat);
        if r == 0.0 {
            lon = 0.0;
            lat = 90.0;
        } else {
            lon = s.atan2(c).to_degrees();
            let tau = tauf(xip.sin() / r, tm.es);
            lat = tau.atan().to_degrees();
        }
        if !lat.is_finite() || !lon.is_finite() {
            return Err(TransformErrorKind::OutsideProjectionDomain);
        }

        if backside {
            lon = 180.0 - lon;
        }
        let lat = lat * xisign;
        lon *= etasign;

        Ok((ang_normalize(lon + self.params.central_meridian), lat))
    }

    /// 点比例因子
    #[must_use]
    pub fn scale_factor_at(&self, lon: f64, lat: f64) -> f64 {
        self.forward_internal(lon, lat).map_or(f64::NAN, |r| r.k)
    }

    /// 子午线收敛角 [rad]
    #[must_use]
    pub fn convergence_angle(&self, lon: f64, lat: f64) -> f64 {
        self.forward_internal(lon, lat)
            .map_or(f64::NAN, |r| r.gamma.to_radians())
    }
}

// ============================================================================
// 测试
// ============================================================================
