// crates/gt_geo/src/write/wkt.rs
//! CRS 导出为单行 WKT2-2019
//!
//! ```
//! use gt_geo::crs::Crs;
//!
//! let wkt = Crs::wgs84().to_wkt().unwrap();
//! assert!(wkt.starts_with(r#"GEOGCRS["WGS 84",DATUM["World Geodetic System 1984""#));
//! assert!(wkt.ends_with(r#"ID["EPSG",4326]]"#));
//! ```

use crate::area::Area;
use crate::crs::{Crs, CrsKind};
use crate::cs::{AxisInfo, CoordinateSystem, CsKind};
use crate::datum::{Datum, GeodeticFrame, PrimeMeridian};
use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, GeoResult};
use crate::identifier::Identifier;
use crate::operation::{Operation, Param, ParamValue};
use crate::units::{Unit, UnitKind};
use std::fmt::Write as _;

impl Crs {
    /// 导出为单行 WKT2-2019
    ///
    /// # Errors
    /// 含有无法用 WKT 表达的成分（如文本参数）时返回错误
    pub fn to_wkt(&self) -> GeoResult<String> {
        let mut w = WktWriter::default();
        w.crs(self, false)?;
        Ok(w.out)
    }
}

#[derive(Default)]
struct WktWriter {
    out: String,
}

impl WktWriter {
    fn quoted(&mut self, text: &str) {
        self.out.push('"');
        self.out.push_str(&text.replace('"', "\"\""));
        self.out.push('"');
    }

    fn number(&mut self, v: f64) {
        let _ = write!(self.out, "{v}");
    }

    /// `KEYWORD["name"`，调用者负责闭合
    fn open(&mut self, keyword: &str, name: &str) {
        self.out.push_str(keyword);
        self.out.push('[');
        self.quoted(name);
    }

    fn close(&mut self) {
        self.out.push(']');
    }

    fn sep(&mut self) {
        self.out.push(',');
    }

    fn unit(&mut self, unit: &Unit) {
        let keyword = match unit.kind {
            UnitKind::Angular => "ANGLEUNIT",
            UnitKind::Linear => "LENGTHUNIT",
            UnitKind::Scale => "SCALEUNIT",
            UnitKind::Time => "TIMEUNIT",
            UnitKind::Parametric => "UNIT",
        };
        self.open(keyword, &unit.name);
        self.sep();
        self.number(unit.to_si);
        self.close();
    }

    fn id(&mut self, id: Option<&Identifier>) {
        let Some(id) = id else { return };
        self.sep();
        self.out.push_str("ID[");
        self.quoted(&id.authority);
        self.sep();
        match id.numeric_code() {
            Some(code) => {
                let _ = write!(self.out, "{code}");
            }
            None => self.quoted(&id.code),
        }
        self.close();
    }

    fn usage(&mut self, area: Option<&Area>) {
        let Some(area) = area else { return };
        self.sep();
        self.out.push_str("USAGE[SCOPE[\"unknown\"],");
        if let Some(name) = &area.name {
            self.open("AREA", name);
            self.close();
            self.sep();
        }
        let _ = write!(
            self.out,
            "BBOX[{},{},{},{}]]",
            area.south, area.west, area.north, area.east
        );
    }

    fn trailer(&mut self, crs: &Crs) {
        self.usage(crs.area.as_ref());
        self.id(crs.id.as_ref());
        if let Some(remark) = &crs.remarks {
            self.sep();
            self.open("REMARK", remark);
            self.close();
        }
    }

    // ------------------------------------------------------------------------
    // 基准
    // ------------------------------------------------------------------------

    fn ellipsoid(&mut self, e: &Ellipsoid) {
        self.open("ELLIPSOID", &e.name);
        self.sep();
        self.number(e.a);
        self.sep();
        self.number(if e.is_sphere() { 0.0 } else { e.inverse_flattening() });
        self.sep();
        self.unit(&Unit::METRE);
        self.close();
    }

    fn prime_meridian(&mut self, pm: &PrimeMeridian) {
        self.sep();
        self.open("PRIMEM", &pm.name);
        self.sep();
        self.number(pm.longitude);
        self.sep();
        self.unit(&pm.unit);
        self.close();
    }

    fn geodetic_frame(&mut self, frame: &GeodeticFrame) {
        if let Some(epoch) = frame.frame_reference_epoch {
            self.out.push_str("DYNAMIC[FRAMEEPOCH[");
            self.number(epoch);
            self.out.push_str("]],");
        }
        self.open("DATUM", &frame.name);
        self.sep();
        self.ellipsoid(&frame.ellipsoid);
        self.id(frame.id.as_ref());
        self.close();
    }

    fn datum(&mut self, datum: &Datum) {
        match datum {
            Datum::Geodetic(frame) => self.geodetic_frame(frame),
            Datum::Vertical(frame) => {
                self.open("VDATUM", &frame.name);
                self.id(frame.id.as_ref());
                self.close();
            }
            Datum::Ensemble(ensemble) => {
                self.open("ENSEMBLE", &ensemble.name);
                for member in &ensemble.members {
                    self.sep();
                    self.open("MEMBER", member.name());
                    self.id(member.id());
                    self.close();
                }
                if let Some(e) = datum.ellipsoid() {
                    self.sep();
                    self.ellipsoid(e);
                }
                self.out.push_str(",ENSEMBLEACCURACY[");
                self.number(ensemble.accuracy);
                self.close();
                self.id(ensemble.id.as_ref());
                self.close();
            }
            Datum::Engineering { name } => {
                self.open("EDATUM", name);
                self.close();
            }
            Datum::Temporal { name, origin } => {
                self.open("TDATUM", name);
                self.out.push_str(",TIMEORIGIN[");
                self.quoted(origin);
                self.close();
                self.close();
            }
        }
    }

    // ------------------------------------------------------------------------
    // 坐标系
    // ------------------------------------------------------------------------

    fn axis(&mut self, axis: &AxisInfo, order: usize) {
        self.sep();
        let label = if axis.abbreviation.is_empty() {
            axis.name.clone()
        } else {
            format!("{} ({})", axis.name, axis.abbreviation)
        };
        self.open("AXIS", &label);
        self.sep();
        self.out.push_str(axis.direction.wkt_name());
        let _ = write!(self.out, ",ORDER[{order}]");
        self.sep();
        self.unit(&axis.unit);
        self.close();
    }

    fn cs(&mut self, cs: &CoordinateSystem) {
        let _ = write!(
            self.out,
            ",CS[{},{}]",
            cs.kind.wkt_name(),
            cs.dimension()
        );
        for (i, axis) in cs.axes.iter().enumerate() {
            self.axis(axis, i + 1);
        }
    }

    // ------------------------------------------------------------------------
    // 操作
    // ------------------------------------------------------------------------

    fn param(&mut self, param: &Param) -> GeoResult<()> {
        self.sep();
        match &param.value {
            ParamValue::Measure { value, unit } => {
                self.open("PARAMETER", &param.name);
                self.sep();
                self.number(*value);
                self.sep();
                self.unit(unit);
            }
            ParamValue::Integer(v) => {
                self.open("PARAMETER", &param.name);
                let _ = write!(self.out, ",{v}");
            }
            ParamValue::File(file) => {
                self.open("PARAMETERFILE", &param.name);
                self.sep();
                self.quoted(file);
            }
            ParamValue::Text(_) => {
                return Err(GeoError::invalid_operation(format!(
                    "文本参数 {} 无法用 WKT 表达",
                    param.name
                )));
            }
        }
        if let Some(code) = param.code {
            self.id(Some(&Identifier::epsg(code)));
        }
        self.close();
        Ok(())
    }

    fn method_and_params(&mut self, op: &Operation) -> GeoResult<()> {
        let single = op
            .single()
            .ok_or_else(|| GeoError::invalid_operation(format!("{} 不是单一操作", op.name)))?;
        self.sep();
        self.open("METHOD", &single.method.name);
        if let Some(code) = single.method.code {
            self.id(Some(&Identifier::epsg(code)));
        }
        self.close();
        for p in &single.params {
            self.param(p)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // CRS
    // ------------------------------------------------------------------------

    fn crs(&mut self, crs: &Crs, as_base: bool) -> GeoResult<()> {
        match &crs.kind {
            CrsKind::Geographic2D { datum, cs }
            | CrsKind::Geographic3D { datum, cs }
            | CrsKind::Geocentric { datum, cs } => {
                let keyword = match (as_base, cs.kind) {
                    (true, _) => "BASEGEOGCRS",
                    (false, CsKind::Cartesian) => "GEODCRS",
                    (false, _) => "GEOGCRS",
                };
                self.open(keyword, &crs.name);
                self.sep();
                self.datum(datum);
                if let Some(pm) = datum.prime_meridian() {
                    self.prime_meridian(pm);
                }
                if as_base {
                    let unit = cs.horizontal_unit().cloned().unwrap_or(Unit::DEGREE);
                    self.sep();
                    self.unit(&unit);
                    self.id(crs.id.as_ref());
                } else {
                    self.cs(cs);
                    self.trailer(crs);
                }
                self.close();
            }
            CrsKind::Projected {
                base,
                conversion,
                cs,
            } => {
                self.open("PROJCRS", &crs.name);
                self.sep();
                self.crs(base, true)?;
                self.sep();
                self.open("CONVERSION", &conversion.name);
                self.method_and_params(conversion)?;
                self.id(conversion.id.as_ref());
                self.close();
                self.cs(cs);
                self.trailer(crs);
                self.close();
            }
            CrsKind::Vertical {
                datum,
                cs,
                geoid_grids,
            } => {
                self.open("VERTCRS", &crs.name);
                self.sep();
                self.datum(datum);
                self.cs(cs);
                for grid in geoid_grids {
                    self.sep();
                    self.open("GEOIDMODEL", grid);
                    self.close();
                }
                self.trailer(crs);
                self.close();
            }
            CrsKind::Compound { components } => {
                self.open("COMPOUNDCRS", &crs.name);
                for component in components {
                    self.sep();
                    self.crs(component, false)?;
                }
                self.trailer(crs);
                self.close();
            }
            CrsKind::Bound {
                base,
                hub,
                transformation,
            } => {
                self.out.push_str("BOUNDCRS[SOURCECRS[");
                self.crs(base, false)?;
                self.out.push_str("],TARGETCRS[");
                self.crs(hub, false)?;
                self.out.push_str("],");
                self.open("ABRIDGEDTRANSFORMATION", &transformation.name);
                self.method_and_params(transformation)?;
                self.id(transformation.id.as_ref());
                self.close();
                self.close();
            }
            CrsKind::Engineering { datum, cs } | CrsKind::Temporal { datum, cs } => {
                let keyword = if matches!(crs.kind, CrsKind::Engineering { .. }) {
                    "ENGCRS"
                } else {
                    "TIMECRS"
                };
                self.open(keyword, &crs.name);
                self.sep();
                self.datum(datum);
                self.cs(cs);
                self.trailer(crs);
                self.close();
            }
            CrsKind::Other { .. } => {
                return Err(GeoError::invalid_crs(format!(
                    "CRS {} 无法用 WKT 表达",
                    crs.name
                )));
            }
        }
        Ok(())
    }
}
