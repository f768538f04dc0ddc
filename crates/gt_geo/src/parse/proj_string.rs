// crates/gt_geo/src/parse/proj_string.rs
//! proj-string 解析
//!
//! 紧凑的 `+key=value` 形式，支持两类输入：
//!
//! - CRS 定义：`+proj=utm +zone=32 +datum=WGS84 +type=crs`
//! - 操作定义：单步 `+proj=helmert ...` 或 `+proj=pipeline +step ... +step ...`
//!
//! 未知参数产生警告而不是错误。

use crate::crs::{Crs, CrsKind};
use crate::cs::{CoordinateSystem, CsKind};
use crate::datum::{Datum, GeodeticFrame, PrimeMeridian, VerticalFrame};
use crate::ellipsoid::Ellipsoid;
use crate::operation::{methods, params, Method, Operation, Param, UNKNOWN_ACCURACY};
use crate::units::{Unit, UnitKind};
use gt_foundation::{ParseError, Parsed, ValidationReport};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// 词法
// ============================================================================

/// 单个 `+key[=value]` 参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjParam {
    /// 键（不含 `+`）
    pub key: String,
    /// 值，标志参数为 `None`
    pub value: Option<String>,
}

impl fmt::Display for ProjParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "+{}={}", self.key, v),
            None => write!(f, "+{}", self.key),
        }
    }
}

/// 切分 proj-string
///
/// # Errors
/// 出现空键或空值时返回语法错误
pub fn tokenize(text: &str) -> Result<Vec<ProjParam>, ParseError> {
    let mut report = ValidationReport::new();
    let mut out = Vec::new();
    for (i, raw) in text.split_whitespace().enumerate() {
        let token = raw.strip_prefix('+').unwrap_or(raw);
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        };
        if key.is_empty() {
            report.add_error(format!("第 {} 个参数 '{raw}' 缺少键", i + 1));
            continue;
        }
        if value.is_some_and(str::is_empty) {
            report.add_error(format!("参数 +{key} 缺少取值"));
            continue;
        }
        out.push(ProjParam {
            key: key.to_string(),
            value: value.map(str::to_string),
        });
    }
    if out.is_empty() && !report.has_errors() {
        report.add_error("空的 proj-string");
    }
    report.finish(out).map(|p| p.value)
}

// ============================================================================
// 管线步骤
// ============================================================================

/// 单个操作步骤：`+proj=name [+inv] params...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjStep {
    /// 方法名（`+proj=` 的值）
    pub name: String,
    /// 是否取逆
    pub inverse: bool,
    /// 其余参数（保持原顺序）
    pub params: Vec<ProjParam>,
}

impl ProjStep {
    /// 由参数列表创建；缺少 `+proj=` 时返回 `None`
    #[must_use]
    pub fn from_params(tokens: Vec<ProjParam>) -> Option<Self> {
        let mut name = None;
        let mut inverse = false;
        let mut params = Vec::new();
        for t in tokens {
            match (t.key.as_str(), &t.value) {
                ("proj", Some(v)) if name.is_none() => name = Some(v.clone()),
                ("inv", None) => inverse = !inverse,
                _ => params.push(t),
            }
        }
        Some(Self {
            name: name?,
            inverse,
            params,
        })
    }

    /// 取值
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .and_then(|p| p.value.as_deref())
    }

    /// 是否含有该键（标志或取值）
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.params.iter().any(|p| p.key == key)
    }

    /// 取数值
    ///
    /// # Errors
    /// 值不是合法数值时返回描述
    pub fn number(&self, key: &str) -> Result<Option<f64>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => parse_number(v)
                .map(Some)
                .ok_or_else(|| format!("+{key}={v} 不是有效数值")),
        }
    }

    /// 取逗号分隔的数值列表
    ///
    /// # Errors
    /// 任一分量不是合法数值时返回描述
    pub fn numbers(&self, key: &str) -> Result<Option<Vec<f64>>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .split(',')
                .map(|s| parse_number(s).ok_or_else(|| format!("+{key}={v} 含无效数值 '{s}'")))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
        }
    }
}

impl ProjStep {
    /// 步骤引用的椭球（`+datum` / `+ellps` / `+a` / `+R`，均缺省时为 GRS80）
    ///
    /// # Errors
    /// 基准或椭球名称未知、椭球参数无效时返回
    pub fn ellipsoid(&self) -> Result<Ellipsoid, ParseError> {
        let mut parser = ProjStringParser::new();
        let frame = parser.geodetic_frame(self);
        match frame {
            Some(frame) if !parser.report.has_errors() => Ok((*frame.ellipsoid).clone()),
            _ => Err(parser.report.into_parse_error()),
        }
    }

    /// 投影步骤（`utm` / `tmerc` / `merc` / `webmerc`）对应的投影转换
    ///
    /// # Errors
    /// 参数缺失或无效时返回
    pub fn projection_conversion(&self) -> Result<Operation, ParseError> {
        let mut parser = ProjStringParser::new();
        let op = parser.conversion(self);
        match op {
            Some(op) if !parser.report.has_errors() => Ok(op),
            _ => Err(parser.report.into_parse_error()),
        }
    }
}

impl fmt::Display for ProjStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+proj={}", self.name)?;
        if self.inverse {
            write!(f, " +inv")?;
        }
        for p in &self.params {
            write!(f, " {p}")?;
        }
        Ok(())
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let v: f64 = text.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

/// 解析操作 proj-string 为步骤列表
///
/// `+proj=pipeline` 之前与第一个 `+step` 之前的全局参数会附加到每个步骤
/// （步骤自身同名参数优先）。单步字符串返回一个步骤。
///
/// # Errors
/// 语法错误或步骤缺少 `+proj=` 时返回
pub fn parse_steps(text: &str) -> Result<Vec<ProjStep>, ParseError> {
    let tokens = tokenize(text)?;
    let is_pipeline = tokens
        .iter()
        .any(|t| t.key == "proj" && t.value.as_deref() == Some("pipeline"));
    if !is_pipeline {
        let step = ProjStep::from_params(tokens)
            .ok_or_else(|| ParseError::grammar("缺少 +proj= 参数"))?;
        return Ok(vec![step]);
    }

    let mut report = ValidationReport::new();
    let mut globals: Vec<ProjParam> = Vec::new();
    let mut groups: Vec<Vec<ProjParam>> = Vec::new();
    for t in tokens {
        if t.key == "step" && t.value.is_none() {
            groups.push(Vec::new());
            continue;
        }
        if t.key == "proj" && t.value.as_deref() == Some("pipeline") {
            if !groups.is_empty() {
                report.add_error("管线不能嵌套 +proj=pipeline");
            }
            continue;
        }
        match groups.last_mut() {
            Some(group) => group.push(t),
            None => globals.push(t),
        }
    }
    if groups.is_empty() {
        report.add_error("管线没有 +step");
    }

    let mut steps = Vec::with_capacity(groups.len());
    for (i, mut group) in groups.into_iter().enumerate() {
        for g in &globals {
            if g.key != "type" && !group.iter().any(|p| p.key == g.key) {
                group.push(g.clone());
            }
        }
        match ProjStep::from_params(group) {
            Some(step) => steps.push(step),
            None => report.add_error(format!("第 {} 个 +step 缺少 +proj=", i + 1)),
        }
    }
    report.finish(steps).map(|p| p.value)
}

// ============================================================================
// CRS 解析
// ============================================================================

/// CRS 定义中可识别的键
const CRS_KEYS: &[&str] = &[
    "proj", "datum", "ellps", "a", "b", "rf", "f", "R", "towgs84", "nadgrids", "pm", "units",
    "to_meter", "axis", "zone", "south", "lat_0", "lon_0", "k", "k_0", "x_0", "y_0", "no_defs",
    "type", "wktext", "vunits", "geoidgrids", "lat_ts", "title",
];

/// proj-string CRS 解析器
#[derive(Debug, Default)]
pub struct ProjStringParser {
    report: ValidationReport,
}

impl ProjStringParser {
    /// 创建解析器
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 CRS 定义
    ///
    /// # Errors
    /// 语法错误或语义上无法构造 CRS 时返回 `ParseError`
    pub fn parse_crs(mut self, text: &str) -> Result<Parsed<Crs>, ParseError> {
        let tokens = tokenize(text)?;
        let mut step = ProjStep {
            name: String::new(),
            inverse: false,
            params: Vec::new(),
        };
        for t in tokens {
            if t.key == "proj" && step.name.is_empty() {
                step.name = t.value.clone().unwrap_or_default();
            } else {
                step.params.push(t);
            }
        }
        if step.name == "pipeline" {
            return Err(ParseError::grammar("+proj=pipeline 描述的是操作而不是 CRS"));
        }
        if let Some(t) = step.get("type") {
            if t != "crs" {
                self.report.add_error(format!("+type={t} 不是 CRS 定义"));
            }
        }
        for p in &step.params {
            if !CRS_KEYS.contains(&p.key.as_str()) {
                self.report
                    .add_warning(format!("未知参数 {p} 已忽略"));
            }
        }

        let crs = self.build(&step);
        match crs {
            Some(crs) if !self.report.has_errors() => self.report.finish(crs),
            _ => {
                if !self.report.has_errors() {
                    self.report.add_error("无法由 proj-string 构造 CRS");
                }
                Err(self.report.into_parse_error())
            }
        }
    }

    fn number(&mut self, step: &ProjStep, key: &str) -> Option<f64> {
        match step.number(key) {
            Ok(v) => v,
            Err(e) => {
                self.report.add_error(e);
                None
            }
        }
    }

    fn build(&mut self, step: &ProjStep) -> Option<Crs> {
        if step.name.is_empty() {
            if step.has("vunits") || step.has("geoidgrids") {
                return Some(self.vertical(step));
            }
            self.report.add_error("缺少 +proj= 参数");
            return None;
        }

        let frame = self.geodetic_frame(step)?;
        let linear = self.linear_unit(step);
        let datum = Datum::Geodetic(frame);

        let horizontal = match step.name.as_str() {
            "longlat" | "latlong" | "lonlat" | "latlon" => {
                let cs = self.axes(step, CsKind::Ellipsoidal, &Unit::DEGREE, 2)?;
                Crs::geographic_2d("unknown", datum, cs)
            }
            "geocent" | "cart" => {
                let mut cs = CoordinateSystem::geocentric();
                for axis in &mut cs.axes {
                    axis.unit = linear.clone();
                }
                Crs::new("unknown", CrsKind::Geocentric { datum, cs })
            }
            "utm" | "tmerc" | "etmerc" | "merc" | "webmerc" => {
                let conversion = self.conversion(step)?;
                let base = Crs::geographic_2d(
                    "unknown",
                    datum,
                    CoordinateSystem::ellipsoidal_2d_lon_lat(&Unit::DEGREE),
                );
                let cs = self.axes(step, CsKind::Cartesian, &linear, 2)?;
                Crs::projected("unknown", base, conversion, cs)
            }
            other => {
                self.report
                    .add_error(format!("不支持的投影 +proj={other}"));
                return None;
            }
        };

        let horizontal = self.bind(step, horizontal)?;
        if step.has("geoidgrids") {
            let vertical = self.vertical(step);
            return Some(Crs::compound("unknown", vec![horizontal, vertical]));
        }
        Some(horizontal)
    }

    fn geodetic_frame(&mut self, step: &ProjStep) -> Option<GeodeticFrame> {
        let pm = match step.get("pm") {
            None => PrimeMeridian::greenwich(),
            Some(name) => match PrimeMeridian::from_proj_name(name) {
                Some(pm) => pm,
                None => match parse_number(name) {
                    Some(lon) => PrimeMeridian::new(name, lon, Unit::DEGREE),
                    None => {
                        self.report.add_error(format!("未知的本初子午线 +pm={name}"));
                        return None;
                    }
                },
            },
        };

        if let Some(name) = step.get("datum") {
            let Some(mut frame) = GeodeticFrame::from_proj_datum(name) else {
                self.report.add_error(format!("未知的基准 +datum={name}"));
                return None;
            };
            if !pm.is_greenwich() {
                frame.prime_meridian = Arc::new(pm);
            }
            return Some(frame);
        }

        let ellipsoid = self.ellipsoid(step)?;
        let name = format!(
            "Unknown based on {} ellipsoid",
            ellipsoid
                .proj_name()
                .map_or_else(|| ellipsoid.name.to_string(), str::to_string)
        );
        Some(GeodeticFrame::new(name, ellipsoid, pm))
    }

    fn ellipsoid(&mut self, step: &ProjStep) -> Option<Ellipsoid> {
        if let Some(name) = step.get("ellps") {
            let found = Ellipsoid::from_proj_name(name);
            if found.is_none() {
                self.report.add_error(format!("未知的椭球 +ellps={name}"));
            }
            return found;
        }
        let built = if let Some(r) = self.number(step, "R") {
            Ellipsoid::sphere("unknown", r)
        } else if let Some(a) = self.number(step, "a") {
            if let Some(b) = self.number(step, "b") {
                Ellipsoid::from_semi_axes("unknown", a, b)
            } else if let Some(rf) = self.number(step, "rf") {
                Ellipsoid::from_inverse_flattening("unknown", a, rf)
            } else if let Some(f) = self.number(step, "f") {
                let rf = if f == 0.0 { 0.0 } else { 1.0 / f };
                Ellipsoid::from_inverse_flattening("unknown", a, rf)
            } else {
                self.report.add_warning("只给出 +a，按球体处理");
                Ellipsoid::sphere("unknown", a)
            }
        } else {
            if self.report.has_errors() {
                return None;
            }
            self.report
                .add_warning("未指定椭球，假定为 GRS80");
            Ok(Ellipsoid::GRS80)
        };
        match built {
            Ok(e) => Some(e),
            Err(e) => {
                self.report.add_error(e.to_string());
                None
            }
        }
    }

    fn linear_unit(&mut self, step: &ProjStep) -> Unit {
        if let Some(factor) = self.number(step, "to_meter") {
            if factor > 0.0 {
                return Unit::new("unknown", UnitKind::Linear, factor);
            }
            self.report.add_error(format!("+to_meter={factor} 必须为正数"));
        }
        match step.get("units") {
            None => Unit::METRE,
            Some(name) => match Unit::by_name(name).filter(|u| u.kind == UnitKind::Linear) {
                Some(u) => u,
                None => {
                    self.report.add_error(format!("未知的长度单位 +units={name}"));
                    Unit::METRE
                }
            },
        }
    }

    fn axes(
        &mut self,
        step: &ProjStep,
        kind: CsKind,
        unit: &Unit,
        dimension: usize,
    ) -> Option<CoordinateSystem> {
        match step.get("axis") {
            Some(axis) => match CoordinateSystem::from_proj_axis(axis, kind, unit, &Unit::METRE, dimension) {
                Ok(cs) => Some(cs),
                Err(e) => {
                    self.report.add_error(e.to_string());
                    None
                }
            },
            None => Some(match kind {
                CsKind::Ellipsoidal => CoordinateSystem::ellipsoidal_2d_lon_lat(unit),
                _ => CoordinateSystem::cartesian_en(unit),
            }),
        }
    }

    fn conversion(&mut self, step: &ProjStep) -> Option<Operation> {
        let lat_0 = self.number(step, "lat_0").unwrap_or(0.0);
        let lon_0 = self.number(step, "lon_0").unwrap_or(0.0);
        let k = self
            .number(step, "k_0")
            .or_else(|| self.number(step, "k"))
            .unwrap_or(1.0);
        let x_0 = self.number(step, "x_0").unwrap_or(0.0);
        let y_0 = self.number(step, "y_0").unwrap_or(0.0);

        match step.name.as_str() {
            "utm" => {
                let Some(zone) = self.number(step, "zone") else {
                    self.report.add_error("+proj=utm 缺少 +zone");
                    return None;
                };
                if zone.fract() != 0.0 || !(1.0..=60.0).contains(&zone) {
                    self.report.add_error(format!("+zone={zone} 无效"));
                    return None;
                }
                match Operation::utm(zone as u8, step.has("south")) {
                    Ok(op) => Some(op),
                    Err(e) => {
                        self.report.add_error(e.to_string());
                        None
                    }
                }
            }
            "tmerc" | "etmerc" => Some(Operation::transverse_mercator(
                "unknown", lat_0, lon_0, k, x_0, y_0,
            )),
            "merc" => {
                if self.number(step, "lat_ts").is_some_and(|v| v != 0.0) {
                    self.report
                        .add_error("不支持 +lat_ts 非零的墨卡托投影 (variant B)");
                    return None;
                }
                if lat_0 != 0.0 {
                    self.report.add_warning("墨卡托投影忽略 +lat_0");
                }
                Some(Operation::mercator_a("unknown", lon_0, k, x_0, y_0))
            }
            _ => Some(Operation::pseudo_mercator()),
        }
    }

    /// `+towgs84` / `+nadgrids` 生成到 WGS 84 的绑定 CRS
    fn bind(&mut self, step: &ProjStep, crs: Crs) -> Option<Crs> {
        let towgs84 = match step.numbers("towgs84") {
            Ok(v) => v,
            Err(e) => {
                self.report.add_error(e);
                return None;
            }
        };
        let nadgrids = step.get("nadgrids");
        if towgs84.is_none() && nadgrids.is_none() {
            return Some(crs);
        }
        let source = crs.geodetic_crs()?.clone();
        let name = format!("Transformation from {} to WGS84", source.name);

        let (method, op_params) = if let Some(values) = towgs84 {
            match values.as_slice() {
                [tx, ty, tz] => (
                    Method::epsg(methods::GEOCENTRIC_TRANSLATION_GEOG2D),
                    vec![
                        Param::measure(params::TX, *tx, Unit::METRE),
                        Param::measure(params::TY, *ty, Unit::METRE),
                        Param::measure(params::TZ, *tz, Unit::METRE),
                    ],
                ),
                [tx, ty, tz, rx, ry, rz, ds] => (
                    Method::epsg(methods::POSITION_VECTOR_GEOG2D),
                    Operation::helmert_params([*tx, *ty, *tz], [*rx, *ry, *rz], *ds),
                ),
                _ => {
                    self.report
                        .add_error("+towgs84 需要 3 个或 7 个数值");
                    return None;
                }
            }
        } else {
            let grids = nadgrids.unwrap_or_default();
            let file = grids.split(',').next().unwrap_or_default();
            let file = file.strip_prefix('@').unwrap_or(file);
            if file == "null" {
                (
                    Method::epsg(methods::GEOGRAPHIC2D_OFFSETS),
                    vec![
                        Param::measure(params::LATITUDE_OFFSET, 0.0, Unit::ARC_SECOND),
                        Param::measure(params::LONGITUDE_OFFSET, 0.0, Unit::ARC_SECOND),
                    ],
                )
            } else {
                (
                    Method::epsg(methods::NTV2),
                    vec![Param::file(params::NTV2_FILE, file)],
                )
            }
        };

        match Operation::transformation(
            name,
            source,
            Crs::wgs84(),
            method,
            op_params,
            UNKNOWN_ACCURACY,
        ) {
            Ok(op) => Some(Crs::bound(crs, Crs::wgs84(), op)),
            Err(e) => {
                self.report.add_error(e.to_string());
                None
            }
        }
    }

    fn vertical(&mut self, step: &ProjStep) -> Crs {
        let unit = match step.get("vunits") {
            None => Unit::METRE,
            Some(name) => Unit::by_name(name)
                .filter(|u| u.kind == UnitKind::Linear)
                .unwrap_or_else(|| {
                    self.report.add_error(format!("未知的垂直单位 +vunits={name}"));
                    Unit::METRE
                }),
        };
        let mut crs = Crs::vertical("unknown", VerticalFrame::new("unknown"), &unit);
        if let Some(grids) = step.get("geoidgrids") {
            if let CrsKind::Vertical { geoid_grids, .. } = &mut crs.kind {
                *geoid_grids = grids
                    .split(',')
                    .map(|g| g.strip_prefix('@').unwrap_or(g).to_string())
                    .collect();
            }
        }
        crs
    }
}

// ============================================================================
// 操作解析
// ============================================================================

/// 解析操作 proj-string
///
/// - 管线与无法映射到内置方法的单步字符串作为 PROJ 管线操作保存，执行时编译
/// - `helmert` 单步映射为 Helmert 变换（精度未知）
/// - `utm` / `tmerc` / `merc` / `webmerc` 单步映射为投影转换
///
/// # Errors
/// 语法错误时返回 `ParseError`
pub fn parse_operation(text: &str) -> Result<Parsed<Operation>, ParseError> {
    let steps = parse_steps(text)?;
    let mut report = ValidationReport::new();

    if let [step] = steps.as_slice() {
        if !step.inverse {
            if let Some(op) = single_step_operation(step, &mut report) {
                return report.finish(op);
            }
            if report.has_errors() {
                return Err(report.into_parse_error());
            }
        }
    }

    let normalized = steps_to_string(&steps);
    let op = Operation::conversion(
        normalized.clone(),
        Method::proj_pipeline(),
        vec![Param::text("PROJ string", normalized)],
    );
    report.finish(op)
}

/// 步骤列表重新拼接为规范 proj-string
#[must_use]
pub fn steps_to_string(steps: &[ProjStep]) -> String {
    match steps {
        [single] => single.to_string(),
        _ => {
            let mut s = String::from("+proj=pipeline");
            for step in steps {
                s.push_str(" +step ");
                s.push_str(&step.to_string());
            }
            s
        }
    }
}

fn single_step_operation(step: &ProjStep, report: &mut ValidationReport) -> Option<Operation> {
    let mut number = |key: &str| match step.number(key) {
        Ok(v) => v,
        Err(e) => {
            report.add_error(e);
            None
        }
    };
    match step.name.as_str() {
        "helmert" => {
            let t = [
                number("x").unwrap_or(0.0),
                number("y").unwrap_or(0.0),
                number("z").unwrap_or(0.0),
            ];
            let r = [
                number("rx").unwrap_or(0.0),
                number("ry").unwrap_or(0.0),
                number("rz").unwrap_or(0.0),
            ];
            let s = number("s").unwrap_or(0.0);
            let translation_only = r == [0.0; 3] && s == 0.0;
            let code = match step.get("convention") {
                _ if translation_only => methods::GEOCENTRIC_TRANSLATION_GEOCENTRIC,
                Some("position_vector") => methods::POSITION_VECTOR_GEOCENTRIC,
                Some("coordinate_frame") => methods::COORDINATE_FRAME_GEOCENTRIC,
                Some(other) => {
                    report.add_error(format!("未知的 Helmert 约定 +convention={other}"));
                    return None;
                }
                None => {
                    report.add_error("含旋转的 +proj=helmert 需要 +convention");
                    return None;
                }
            };
            let op_params = if translation_only {
                Operation::helmert_params(t, r, s)[..3].to_vec()
            } else {
                Operation::helmert_params(t, r, s)
            };
            Some(Operation::conversion("Helmert transformation", Method::epsg(code), op_params))
        }
        "utm" | "tmerc" | "etmerc" | "merc" | "webmerc" => {
            if step.has("ellps") || step.has("datum") || step.has("a") || step.has("R") {
                // 带椭球参数的单步投影作为管线保存，执行时使用其椭球
                return None;
            }
            let mut parser = ProjStringParser::new();
            let op = parser.conversion(step);
            report.merge(parser.report);
            op
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CrsType;
    use crate::operation::OperationKind;

    #[test]
    fn test_tokenize() {
        let t = tokenize("+proj=utm +zone=32 +south +no_defs").unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t[2], ProjParam { key: "south".into(), value: None });
        assert!(tokenize("+proj=utm +zone=").is_err());
        assert!(tokenize("   ").is_err());
    }

    #[test]
    fn test_parse_utm_crs() {
        let parsed = ProjStringParser::new()
            .parse_crs("+proj=utm +zone=32 +datum=WGS84 +type=crs")
            .unwrap();
        let crs = parsed.value;
        assert_eq!(crs.crs_type(), CrsType::Projected);
        assert!(parsed.warnings.is_empty());
        let conv = crs.conversion().unwrap().single().unwrap();
        assert!((conv.value(params::LONGITUDE_OF_ORIGIN).unwrap().to_degrees() - 9.0).abs() < 1e-12);
        assert!(crs.validate().is_ok());
    }

    #[test]
    fn test_unknown_parameter_warns() {
        let parsed = ProjStringParser::new()
            .parse_crs("+proj=longlat +ellps=GRS80 +foo=bar +type=crs")
            .unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("+foo=bar"));
    }

    #[test]
    fn test_missing_ellipsoid_defaults_with_warning() {
        let parsed = ProjStringParser::new().parse_crs("+proj=longlat").unwrap();
        assert!(parsed.value.ellipsoid().unwrap().same_shape(&Ellipsoid::GRS80));
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_grammar_errors() {
        let err = ProjStringParser::new()
            .parse_crs("+proj=utm +datum=WGS84")
            .unwrap_err();
        assert!(!err.grammar_errors.is_empty());

        let err = ProjStringParser::new()
            .parse_crs("+proj=lcc +ellps=GRS80")
            .unwrap_err();
        assert!(err.grammar_errors[0].contains("lcc"));

        let err = ProjStringParser::new()
            .parse_crs("+proj=longlat +datum=NOPE")
            .unwrap_err();
        assert!(err.grammar_errors[0].contains("NOPE"));
    }

    #[test]
    fn test_towgs84_bound() {
        let crs = ProjStringParser::new()
            .parse_crs("+proj=longlat +ellps=intl +towgs84=-87,-98,-121 +type=crs")
            .unwrap()
            .value;
        assert!(crs.is_bound());
        let CrsKind::Bound { transformation, hub, .. } = &crs.kind else {
            panic!("expected bound CRS");
        };
        assert_eq!(hub.id.as_ref().map(ToString::to_string).as_deref(), Some("EPSG:4326"));
        assert_eq!(
            transformation.single().unwrap().method.code,
            Some(methods::GEOCENTRIC_TRANSLATION_GEOG2D)
        );
        assert!(!transformation.has_known_accuracy());
    }

    #[test]
    fn test_axis_and_units() {
        let crs = ProjStringParser::new()
            .parse_crs("+proj=tmerc +lon_0=3 +k=0.9996 +x_0=500000 +ellps=GRS80 +units=us-ft +axis=neu +type=crs")
            .unwrap()
            .value;
        let cs = crs.cs().unwrap();
        assert!(!cs.is_east_first());
        assert!(cs.axes[0].unit.is_equivalent_to(&Unit::US_SURVEY_FOOT));
    }

    #[test]
    fn test_geoidgrids_compound() {
        let crs = ProjStringParser::new()
            .parse_crs("+proj=longlat +datum=WGS84 +geoidgrids=@egm96_15.gtx +vunits=m +type=crs")
            .unwrap()
            .value;
        assert!(crs.is_compound());
        assert_eq!(crs.dimension(), 3);
    }

    #[test]
    fn test_parse_pipeline_steps() {
        let steps = parse_steps(
            "+proj=pipeline +ellps=GRS80 +step +proj=axisswap +order=2,1 +step +inv +proj=utm +zone=32",
        )
        .unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "axisswap");
        assert_eq!(steps[0].get("ellps"), Some("GRS80"));
        assert!(steps[1].inverse);
        assert_eq!(steps[1].number("zone").unwrap(), Some(32.0));

        assert!(parse_steps("+proj=pipeline +ellps=GRS80").is_err());
        assert!(parse_steps("+proj=pipeline +step +zone=3").is_err());
    }

    #[test]
    fn test_step_ellipsoid_and_conversion() {
        let steps = parse_steps("+proj=utm +zone=33 +south +ellps=intl").unwrap();
        let step = &steps[0];
        assert!(step.ellipsoid().unwrap().same_shape(&Ellipsoid::INTERNATIONAL_1924));
        let conv = step.projection_conversion().unwrap();
        let single = conv.single().unwrap();
        assert!((single.value(params::FALSE_NORTHING).unwrap() - 10_000_000.0).abs() < 1e-9);

        let bad = parse_steps("+proj=tmerc +ellps=nope").unwrap();
        assert!(bad[0].ellipsoid().is_err());
        let bad = parse_steps("+proj=utm +ellps=GRS80").unwrap();
        assert!(bad[0].projection_conversion().is_err());
    }

    #[test]
    fn test_helmert_operation_has_unknown_accuracy() {
        let op = parse_operation(
            "+proj=helmert +x=1 +y=2 +z=3 +rx=0.1 +ry=0.2 +rz=0.3 +s=1.5 +convention=position_vector",
        )
        .unwrap()
        .value;
        assert_eq!(op.accuracy(), UNKNOWN_ACCURACY);
        let single = op.single().unwrap();
        assert_eq!(single.method.code, Some(methods::POSITION_VECTOR_GEOCENTRIC));
        assert!((single.value(params::SCALE_DIFFERENCE).unwrap() - 1.5e-6).abs() < 1e-18);
    }

    #[test]
    fn test_pipeline_operation_kept_as_text() {
        let op = parse_operation("+proj=pipeline +step +proj=axisswap +order=2,1")
            .unwrap()
            .value;
        let OperationKind::Conversion(single) = &op.kind else {
            panic!("expected conversion");
        };
        assert!(single.method.is_proj_pipeline());
        assert_eq!(
            single.text("PROJ string"),
            Some("+proj=axisswap +order=2,1")
        );
    }
}
