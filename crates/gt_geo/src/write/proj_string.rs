// crates/gt_geo/src/write/proj_string.rs
//! CRS 导出为 proj-string
//!
//! 输出与 [`crate::parse::ProjStringParser`] 可互相往返：
//!
//! ```
//! use gt_geo::crs::Crs;
//!
//! let utm = Crs::utm_zone(31, true).unwrap();
//! assert_eq!(
//!     utm.to_proj_string().unwrap(),
//!     "+proj=utm +zone=31 +datum=WGS84 +units=m +no_defs +type=crs"
//! );
//! assert_eq!(
//!     utm.geodetic_crs().unwrap().to_proj_string().unwrap(),
//!     "+proj=longlat +datum=WGS84 +no_defs +type=crs"
//! );
//! ```

use crate::crs::{Crs, CrsKind};
use crate::cs::{AxisDirection, CoordinateSystem};
use crate::datum::{normalized_datum_name, Datum};
use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, GeoResult};
use crate::operation::{methods, params, Operation, SingleOperation};
use crate::units::Unit;
use std::f64::consts::PI;

/// 弧度 → 角秒
const RAD_TO_ARCSEC: f64 = 648_000.0 / PI;

impl Crs {
    /// 导出为 proj-string
    ///
    /// # Errors
    /// CRS 含有 proj-string 无法表达的成分（工程/时间 CRS、不支持的投影方法、
    /// 非 WGS 84 枢纽的绑定 CRS）时返回错误
    pub fn to_proj_string(&self) -> GeoResult<String> {
        let mut out = Vec::new();
        write_crs(self, &mut out)?;
        out.push("+no_defs".to_string());
        out.push("+type=crs".to_string());
        Ok(out.join(" "))
    }
}

impl Operation {
    /// 投影转换导出为单个 proj-string 步骤，可附带椭球参数
    ///
    /// ```
    /// use gt_geo::ellipsoid::Ellipsoid;
    /// use gt_geo::operation::Operation;
    ///
    /// let utm = Operation::utm(32, false).unwrap();
    /// assert_eq!(utm.to_proj_step(None).unwrap(), "+proj=utm +zone=32");
    /// assert_eq!(
    ///     utm.to_proj_step(Some(&Ellipsoid::WGS84)).unwrap(),
    ///     "+proj=utm +zone=32 +ellps=WGS84"
    /// );
    /// ```
    ///
    /// # Errors
    /// 不是单一操作或投影方法无法用 proj-string 表达时返回错误
    pub fn to_proj_step(&self, ellipsoid: Option<&Ellipsoid>) -> GeoResult<String> {
        let mut out = Vec::new();
        write_conversion(self, &mut out)?;
        if let Some(e) = ellipsoid {
            write_ellipsoid(e, &mut out);
        }
        Ok(out.join(" "))
    }
}

fn write_crs(crs: &Crs, out: &mut Vec<String>) -> GeoResult<()> {
    match &crs.kind {
        CrsKind::Geographic2D { datum, cs } | CrsKind::Geographic3D { datum, cs } => {
            out.push("+proj=longlat".to_string());
            write_datum(datum, out)?;
            write_axis(cs, out);
        }
        CrsKind::Geocentric { datum, cs } => {
            out.push("+proj=geocent".to_string());
            write_datum(datum, out)?;
            write_units(cs.horizontal_unit().unwrap_or(&Unit::METRE), out);
        }
        CrsKind::Projected {
            base,
            conversion,
            cs,
        } => {
            let datum = base
                .datum()
                .ok_or_else(|| GeoError::invalid_crs("投影 CRS 的基础 CRS 缺少基准"))?;
            write_conversion(conversion, out)?;
            write_datum(datum, out)?;
            write_axis(cs, out);
            write_units(cs.horizontal_unit().unwrap_or(&Unit::METRE), out);
        }
        CrsKind::Vertical {
            cs, geoid_grids, ..
        } => {
            if !geoid_grids.is_empty() {
                out.push(format!("+geoidgrids={}", geoid_grids.join(",")));
            }
            let metre = Unit::METRE;
            let unit = cs.axes.first().map_or(&metre, |a| &a.unit);
            match unit.proj_name() {
                Some(name) => out.push(format!("+vunits={name}")),
                None => {
                    return Err(GeoError::invalid_crs(format!(
                        "垂直单位 {} 无法用 proj-string 表达",
                        unit.name
                    )))
                }
            }
        }
        CrsKind::Compound { components } => {
            for component in components {
                write_crs(component, out)?;
            }
        }
        CrsKind::Bound {
            base,
            hub,
            transformation,
        } => {
            if normalized_datum_name(hub.datum().map(Datum::name).unwrap_or_default()) != "wgs1984" {
                return Err(GeoError::invalid_crs(format!(
                    "proj-string 只能表达到 WGS 84 的绑定，枢纽为 {}",
                    hub.name
                )));
            }
            write_crs(base, out)?;
            write_binding(transformation, out)?;
        }
        CrsKind::Engineering { .. } | CrsKind::Temporal { .. } | CrsKind::Other { .. } => {
            return Err(GeoError::invalid_crs(format!(
                "{:?} CRS 无法用 proj-string 表达",
                crs.crs_type()
            )));
        }
    }
    Ok(())
}

fn write_datum(datum: &Datum, out: &mut Vec<String>) -> GeoResult<()> {
    let frame = datum
        .geodetic_frame()
        .ok_or_else(|| GeoError::invalid_crs(format!("{} 不是大地基准", datum.name())))?;
    let pm = &frame.prime_meridian;
    match datum.proj_datum_name() {
        Some(name) => out.push(format!("+datum={name}")),
        None => write_ellipsoid(&frame.ellipsoid, out),
    }
    if !pm.is_greenwich() {
        match pm.proj_name() {
            Some(name) => out.push(format!("+pm={name}")),
            None => out.push(format!("+pm={}", pm.longitude_rad().to_degrees())),
        }
    }
    Ok(())
}

fn write_ellipsoid(e: &Ellipsoid, out: &mut Vec<String>) {
    match e.proj_name() {
        Some(name) => out.push(format!("+ellps={name}")),
        None if e.is_sphere() => out.push(format!("+R={}", e.a)),
        None => {
            out.push(format!("+a={}", e.a));
            out.push(format!("+rf={}", e.inverse_flattening()));
        }
    }
}

/// 仅在含有反向轴时输出 `+axis`
fn write_axis(cs: &CoordinateSystem, out: &mut Vec<String>) {
    let reversed = cs.axes.iter().any(|a| {
        matches!(
            a.direction,
            AxisDirection::West | AxisDirection::South | AxisDirection::Down
        )
    });
    if reversed {
        if let Some(axis) = cs.proj_axis() {
            out.push(format!("+axis={axis}"));
        }
    }
}

fn write_units(unit: &Unit, out: &mut Vec<String>) {
    match unit.proj_name() {
        Some(name) => out.push(format!("+units={name}")),
        None => out.push(format!("+to_meter={}", unit.to_si)),
    }
}

fn single(op: &Operation) -> GeoResult<&SingleOperation> {
    op.single()
        .ok_or_else(|| GeoError::invalid_operation(format!("{} 不是单一操作", op.name)))
}

fn write_conversion(conversion: &Operation, out: &mut Vec<String>) -> GeoResult<()> {
    let s = single(conversion)?;
    let deg = |code| s.value_or(code, 0.0).to_degrees();
    let lat_0 = deg(params::LATITUDE_OF_ORIGIN);
    let lon_0 = deg(params::LONGITUDE_OF_ORIGIN);
    let k = s.value_or(params::SCALE_FACTOR, 1.0);
    let x_0 = s.value_or(params::FALSE_EASTING, 0.0);
    let y_0 = s.value_or(params::FALSE_NORTHING, 0.0);

    match s.method.code {
        Some(methods::TRANSVERSE_MERCATOR) => {
            if let Some((zone, south)) = utm_zone(lat_0, lon_0, k, x_0, y_0) {
                out.push("+proj=utm".to_string());
                out.push(format!("+zone={zone}"));
                if south {
                    out.push("+south".to_string());
                }
            } else {
                out.push("+proj=tmerc".to_string());
                out.push(format!("+lat_0={lat_0}"));
                out.push(format!("+lon_0={lon_0}"));
                out.push(format!("+k={k}"));
                out.push(format!("+x_0={x_0}"));
                out.push(format!("+y_0={y_0}"));
            }
        }
        Some(methods::MERCATOR_A) => {
            out.push("+proj=merc".to_string());
            out.push(format!("+lon_0={lon_0}"));
            out.push(format!("+k={k}"));
            out.push(format!("+x_0={x_0}"));
            out.push(format!("+y_0={y_0}"));
        }
        Some(methods::PSEUDO_MERCATOR) => out.push("+proj=webmerc".to_string()),
        _ => return Err(GeoError::unsupported_method(s.method.name.clone())),
    }
    Ok(())
}

/// 参数符合 UTM 定义时返回 (带号, 是否南半球)
fn utm_zone(lat_0: f64, lon_0: f64, k: f64, x_0: f64, y_0: f64) -> Option<(u8, bool)> {
    if lat_0 != 0.0 || (k - 0.9996).abs() > 1e-12 || x_0 != 500_000.0 {
        return None;
    }
    let south = match y_0 {
        v if v == 0.0 => false,
        v if v == 10_000_000.0 => true,
        _ => return None,
    };
    let zone = (lon_0 + 183.0) / 6.0;
    if (zone - zone.round()).abs() > 1e-9 || !(1.0..=60.0).contains(&zone.round()) {
        return None;
    }
    Some((zone.round() as u8, south))
}

fn write_binding(transformation: &Operation, out: &mut Vec<String>) -> GeoResult<()> {
    let s = single(transformation)?;
    let v = |code| s.value_or(code, 0.0);
    let translation = [v(params::TX), v(params::TY), v(params::TZ)];
    match s.method.code {
        Some(methods::GEOCENTRIC_TRANSLATION_GEOG2D | methods::GEOCENTRIC_TRANSLATION_GEOCENTRIC) => {
            out.push(format!(
                "+towgs84={},{},{}",
                translation[0], translation[1], translation[2]
            ));
        }
        Some(
            code @ (methods::POSITION_VECTOR_GEOG2D
            | methods::POSITION_VECTOR_GEOCENTRIC
            | methods::COORDINATE_FRAME_GEOG2D
            | methods::COORDINATE_FRAME_GEOCENTRIC),
        ) => {
            // proj-string 的 towgs84 使用位置矢量约定
            let sign = if matches!(
                code,
                methods::COORDINATE_FRAME_GEOG2D | methods::COORDINATE_FRAME_GEOCENTRIC
            ) {
                -1.0
            } else {
                1.0
            };
            let r = [params::RX, params::RY, params::RZ].map(|c| sign * v(c) * RAD_TO_ARCSEC);
            let ds = v(params::SCALE_DIFFERENCE) * 1e6;
            out.push(format!(
                "+towgs84={},{},{},{},{},{},{}",
                translation[0], translation[1], translation[2], r[0], r[1], r[2], ds
            ));
        }
        Some(methods::NTV2) => {
            let file = s.file(params::NTV2_FILE).ok_or_else(|| {
                GeoError::missing_parameter(s.method.name.clone(), "Latitude and longitude difference file")
            })?;
            out.push(format!("+nadgrids={file}"));
        }
        Some(methods::GEOGRAPHIC2D_OFFSETS)
            if v(params::LATITUDE_OFFSET) == 0.0 && v(params::LONGITUDE_OFFSET) == 0.0 =>
        {
            out.push("+nadgrids=@null".to_string());
        }
        _ => return Err(GeoError::unsupported_method(s.method.name.clone())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::compare::Criterion;
    use crate::crs::Crs;
    use crate::parse::ProjStringParser;

    fn roundtrip(text: &str) {
        let crs = ProjStringParser::new().parse_crs(text).unwrap().value;
        let written = crs.to_proj_string().unwrap();
        let again = ProjStringParser::new().parse_crs(&written).unwrap().value;
        assert!(
            crs.is_equivalent_to(&again, Criterion::Equivalent, None),
            "{text} -> {written}"
        );
    }

    #[test]
    fn test_wgs84_geographic() {
        assert_eq!(
            Crs::wgs84().to_proj_string().unwrap(),
            "+proj=longlat +datum=WGS84 +no_defs +type=crs"
        );
    }

    #[test]
    fn test_roundtrips() {
        roundtrip("+proj=longlat +ellps=intl +towgs84=-87,-98,-121 +type=crs");
        roundtrip("+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 +ellps=airy +units=m +type=crs");
        roundtrip("+proj=utm +zone=33 +south +ellps=GRS80 +units=us-ft +type=crs");
        roundtrip("+proj=merc +lon_0=110 +k=0.997 +x_0=3900000 +y_0=900000 +ellps=bessel +type=crs");
        roundtrip("+proj=geocent +datum=WGS84 +units=m +type=crs");
        roundtrip("+proj=longlat +datum=WGS84 +geoidgrids=egm96_15.gtx +vunits=m +type=crs");
        roundtrip("+proj=longlat +a=6378000 +rf=300 +pm=paris +type=crs");
        roundtrip("+proj=longlat +datum=NAD27 +nadgrids=@null +type=crs");
    }

    #[test]
    fn test_vertical_units() {
        use crate::datum::VerticalFrame;
        use crate::units::Unit;

        let metre = Crs::vertical("NAVD88 height", VerticalFrame::new("NAVD88"), &Unit::METRE);
        assert!(metre.to_proj_string().unwrap().contains("+vunits=m"));
        let foot = Crs::vertical("NGVD29 height (ft)", VerticalFrame::new("NGVD29"), &Unit::FOOT);
        assert!(foot.to_proj_string().unwrap().contains("+vunits=ft"));
        let cubit = Unit::new("cubit", crate::units::UnitKind::Linear, 0.4572);
        assert!(Crs::vertical("h", VerticalFrame::new("X"), &cubit)
            .to_proj_string()
            .is_err());
    }

    #[test]
    fn test_web_mercator() {
        let s = Crs::web_mercator().to_proj_string().unwrap();
        assert_eq!(s, "+proj=webmerc +datum=WGS84 +units=m +no_defs +type=crs");
    }

    #[test]
    fn test_seven_parameter_towgs84() {
        let text = "+proj=longlat +ellps=bessel +towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7 +type=crs";
        let crs = ProjStringParser::new().parse_crs(text).unwrap().value;
        let written = crs.to_proj_string().unwrap();
        assert!(written.contains("+towgs84=598.1,73.7,418.2,"), "{written}");
        roundtrip(text);
    }
}
