// crates/gt_geo/src/parse/wkt.rs
//! WKT 解析
//!
//! 支持 WKT2 (2015/2019) 与 WKT1 (OGC 01-009) 的常用子集：
//!
//! | WKT2 | WKT1 |
//! |------|------|
//! | `GEOGCRS` / `GEODCRS` | `GEOGCS` / `GEOCCS` |
//! | `PROJCRS` | `PROJCS` |
//! | `VERTCRS` | `VERT_CS` |
//! | `COMPOUNDCRS` | `COMPD_CS` |
//! | `BOUNDCRS` | `TOWGS84[...]` |
//! | `ENGCRS` / `TIMECRS` | |
//!
//! 括号可使用 `[]` 或 `()`，但必须成对匹配。字符串内以 `""` 表示一个引号。
//!
//! 诊断分两类：语法错误（致命）与语义警告（如缺少单位时采用默认值）。

use crate::area::Area;
use crate::crs::{Crs, CrsKind};
use crate::cs::{AxisDirection, AxisInfo, CoordinateSystem, CsKind};
use crate::datum::{
    normalized_datum_name, Datum, DatumEnsemble, GeodeticFrame, PrimeMeridian, VerticalFrame,
};
use crate::ellipsoid::Ellipsoid;
use crate::identifier::Identifier;
use crate::operation::{
    method_code_by_name, method_name, methods, param_code_by_name, param_name, params, Method,
    Operation, Param, ParamValue, UNKNOWN_ACCURACY,
};
use crate::units::{Unit, UnitKind};
use gt_foundation::{ParseError, Parsed, ValidationReport};

/// 最大嵌套深度
const MAX_DEPTH: usize = 64;

// ============================================================================
// 语法树
// ============================================================================

/// WKT 取值
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    /// 子节点 `KEYWORD[...]`
    Node(WktNode),
    /// 带引号的字符串
    Str(String),
    /// 数值
    Num(f64),
    /// 无引号的枚举值（如 `east`）
    Ident(String),
}

/// WKT 节点
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    /// 关键字（保持原样）
    pub keyword: String,
    /// 子项（有序）
    pub children: Vec<WktValue>,
}

impl WktNode {
    /// 关键字是否为给定之一（大小写不敏感）
    #[must_use]
    pub fn is(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.keyword.eq_ignore_ascii_case(k))
    }

    /// 全部子节点
    pub fn nodes(&self) -> impl Iterator<Item = &WktNode> {
        self.children.iter().filter_map(|c| match c {
            WktValue::Node(n) => Some(n),
            _ => None,
        })
    }

    /// 第一个关键字匹配的子节点
    #[must_use]
    pub fn child(&self, keywords: &[&str]) -> Option<&WktNode> {
        self.nodes().find(|n| n.is(keywords))
    }

    /// 所有关键字匹配的子节点
    pub fn children_of<'a>(&'a self, keywords: &'a [&'a str]) -> impl Iterator<Item = &'a WktNode> {
        self.nodes().filter(move |n| n.is(keywords))
    }

    /// 第 `i` 个子项为字符串时返回
    #[must_use]
    pub fn str_at(&self, i: usize) -> Option<&str> {
        match self.children.get(i) {
            Some(WktValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// 第 `i` 个子项为数值时返回
    #[must_use]
    pub fn num_at(&self, i: usize) -> Option<f64> {
        match self.children.get(i) {
            Some(WktValue::Num(v)) => Some(*v),
            _ => None,
        }
    }

    /// 第 `i` 个子项为字符串或无引号标识时返回
    #[must_use]
    pub fn text_at(&self, i: usize) -> Option<&str> {
        match self.children.get(i) {
            Some(WktValue::Str(s) | WktValue::Ident(s)) => Some(s),
            _ => None,
        }
    }

    /// 名称（第一个子项）
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.str_at(0)
    }
}

// ============================================================================
// 词法与语法
// ============================================================================

struct Reader<'a> {
    chars: Vec<char>,
    pos: usize,
    report: &'a mut ValidationReport,
}

impl Reader<'_> {
    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&mut self, message: impl AsRef<str>) {
        self.report
            .add_error(format!("位置 {}: {}", self.pos, message.as_ref()));
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn node(&mut self, depth: usize) -> Option<WktNode> {
        self.skip_ws();
        let keyword = self.word();
        if keyword.is_empty() {
            self.error("期望关键字");
            return None;
        }
        self.skip_ws();
        let close = match self.peek() {
            Some('[') => ']',
            Some('(') => ')',
            _ => {
                self.error(format!("关键字 {keyword} 后期望 '[' 或 '('"));
                return None;
            }
        };
        self.pos += 1;
        self.body(keyword, close, depth)
    }

    fn body(&mut self, keyword: String, close: char, depth: usize) -> Option<WktNode> {
        if depth >= MAX_DEPTH {
            self.error("嵌套层数过深");
            return None;
        }
        let mut children = Vec::new();
        self.skip_ws();
        if self.peek() == Some(close) {
            self.pos += 1;
            return Some(WktNode { keyword, children });
        }
        loop {
            children.push(self.value(depth)?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    return Some(WktNode { keyword, children });
                }
                Some(c) => {
                    self.error(format!("{keyword} 中期望 ',' 或 '{close}'，得到 '{c}'"));
                    return None;
                }
                None => {
                    self.error(format!("{keyword} 缺少结束符 '{close}'"));
                    return None;
                }
            }
        }
    }

    fn value(&mut self, depth: usize) -> Option<WktValue> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.string().map(WktValue::Str),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.number().map(WktValue::Num)
            }
            Some(c) if c.is_alphabetic() => {
                let word = self.word();
                self.skip_ws();
                match self.peek() {
                    Some(open @ ('[' | '(')) => {
                        self.pos += 1;
                        let close = if open == '[' { ']' } else { ')' };
                        self.body(word, close, depth + 1).map(WktValue::Node)
                    }
                    _ => Some(WktValue::Ident(word)),
                }
            }
            Some(c) => {
                self.error(format!("意外的字符 '{c}'"));
                None
            }
            None => {
                self.error("意外的输入结束");
                None
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('"') if self.chars.get(self.pos + 1) == Some(&'"') => {
                    out.push('"');
                    self.pos += 2;
                }
                Some('"') => {
                    self.pos += 1;
                    return Some(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                None => {
                    self.error("字符串未闭合");
                    return None;
                }
            }
        }
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                self.pos = start;
                self.error(format!("无效的数值 '{text}'"));
                None
            }
        }
    }
}

/// 解析 WKT 文本为语法树
///
/// # Errors
/// 括号不匹配、字符串未闭合、数值无效或存在多余内容时返回语法错误
pub fn parse_tree(text: &str) -> Result<WktNode, ParseError> {
    let mut report = ValidationReport::new();
    let mut reader = Reader {
        chars: text.chars().collect(),
        pos: 0,
        report: &mut report,
    };
    let node = reader.node(0);
    if node.is_some() {
        reader.skip_ws();
        if reader.pos < reader.chars.len() {
            reader.error("根节点之后存在多余内容");
        }
    }
    match node {
        Some(node) if !report.has_errors() => report.finish(node).map(|p| p.value),
        _ => Err(report.into_parse_error()),
    }
}

/// 文本是否以 WKT 关键字开头
#[must_use]
pub fn looks_like_wkt(text: &str) -> bool {
    let text = text.trim_start();
    let word: String = text
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let rest = text[word.len()..].trim_start();
    !word.is_empty() && (rest.starts_with('[') || rest.starts_with('('))
}

// ============================================================================
// 关键字表
// ============================================================================

const GEODETIC_CRS: &[&str] = &[
    "GEOGCRS",
    "GEOGRAPHICCRS",
    "GEODCRS",
    "GEODETICCRS",
    "BASEGEOGCRS",
    "BASEGEODCRS",
];
const PROJECTED_CRS: &[&str] = &["PROJCRS", "PROJECTEDCRS"];
const VERTICAL_CRS: &[&str] = &["VERTCRS", "VERTICALCRS", "BASEVERTCRS"];
const DATUM: &[&str] = &["DATUM", "GEODETICDATUM", "TRF"];
const VERTICAL_DATUM: &[&str] = &["VDATUM", "VERTICALDATUM", "VRF", "VERT_DATUM"];
const ELLIPSOID: &[&str] = &["ELLIPSOID", "SPHEROID"];
const UNIT: &[&str] = &["ANGLEUNIT", "LENGTHUNIT", "SCALEUNIT", "TIMEUNIT", "UNIT"];
const ID: &[&str] = &["ID", "AUTHORITY"];
const CRS_KEYWORDS: &[&str] = &[
    "GEOGCRS",
    "GEOGRAPHICCRS",
    "GEODCRS",
    "GEODETICCRS",
    "BASEGEOGCRS",
    "BASEGEODCRS",
    "PROJCRS",
    "PROJECTEDCRS",
    "VERTCRS",
    "VERTICALCRS",
    "BASEVERTCRS",
    "COMPOUNDCRS",
    "BOUNDCRS",
    "ENGCRS",
    "ENGINEERINGCRS",
    "TIMECRS",
    "GEOGCS",
    "PROJCS",
    "GEOCCS",
    "VERT_CS",
    "COMPD_CS",
];

// ============================================================================
// 语义构造
// ============================================================================

/// WKT 定义解析器
///
/// # 示例
///
/// ```
/// use gt_geo::parse::wkt::WktParser;
///
/// let wkt = r#"GEOGCRS["WGS 84",
///     DATUM["World Geodetic System 1984", ELLIPSOID["WGS 84", 6378137, 298.257223563]],
///     CS[ellipsoidal, 2],
///     AXIS["latitude", north, ANGLEUNIT["degree", 0.0174532925199433]],
///     AXIS["longitude", east, ANGLEUNIT["degree", 0.0174532925199433]],
///     ID["EPSG", 4326]]"#;
/// let parsed = WktParser::new().parse_crs(wkt).unwrap();
/// assert!(parsed.value.is_geographic());
/// assert_eq!(parsed.value.id.unwrap().code, "4326");
/// ```
#[derive(Debug, Default)]
pub struct WktParser {
    report: ValidationReport,
}

impl WktParser {
    /// 创建解析器
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 CRS 定义
    ///
    /// # Errors
    /// 语法错误或无法构造 CRS 时返回 [`ParseError`]，其中同时带有已收集的警告
    pub fn parse_crs(mut self, text: &str) -> Result<Parsed<Crs>, ParseError> {
        let root = parse_tree(text)?;
        let crs = self.crs(&root);
        if let Some(crs) = &crs {
            if let Err(e) = crs.validate() {
                self.report.add_error(e.to_string());
            }
        }
        match crs {
            Some(crs) if !self.report.has_errors() => self.report.finish(crs),
            _ => {
                if !self.report.has_errors() {
                    self.report.add_error("无法由 WKT 构造 CRS");
                }
                Err(self.report.into_parse_error())
            }
        }
    }

    /// 解析 `CONVERSION[...]` 或 `COORDINATEOPERATION[...]`
    ///
    /// # Errors
    /// 语法错误、根关键字不是操作或缺少必需元素时返回错误
    pub fn parse_operation(mut self, text: &str) -> Result<Parsed<Operation>, ParseError> {
        let root = parse_tree(text)?;
        let op = if root.is(&["CONVERSION", "DERIVINGCONVERSION"]) {
            self.conversion(&root, &Unit::DEGREE, &Unit::METRE)
        } else if root.is(&["COORDINATEOPERATION"]) {
            self.coordinate_operation(&root)
        } else {
            self.report
                .add_error(format!("{} 不是坐标操作", root.keyword));
            None
        };
        match op {
            Some(op) if !self.report.has_errors() => self.report.finish(op),
            _ => {
                if !self.report.has_errors() {
                    self.report.add_error("无法由 WKT 构造坐标操作");
                }
                Err(self.report.into_parse_error())
            }
        }
    }

    fn crs(&mut self, node: &WktNode) -> Option<Crs> {
        let kw = node.keyword.to_ascii_uppercase();
        match kw.as_str() {
            _ if node.is(GEODETIC_CRS) => self.geodetic(node),
            _ if node.is(PROJECTED_CRS) => self.projected(node),
            _ if node.is(VERTICAL_CRS) => self.vertical(node),
            "COMPOUNDCRS" | "COMPD_CS" => self.compound(node),
            "BOUNDCRS" => self.bound(node),
            "ENGCRS" | "ENGINEERINGCRS" => self.engineering(node),
            "TIMECRS" => self.temporal(node),
            "GEOGCS" => self.geogcs(node),
            "PROJCS" => self.projcs(node),
            "GEOCCS" => self.geoccs(node),
            "VERT_CS" => self.vert_cs(node),
            _ => {
                self.report
                    .add_error(format!("不支持的 CRS 关键字 {}", node.keyword));
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // 公共元素
    // ------------------------------------------------------------------------

    fn name(&mut self, node: &WktNode) -> String {
        if let Some(name) = node.name() {
            return name.to_string();
        }
        self.report
            .add_error(format!("{} 缺少名称字符串", node.keyword));
        String::new()
    }

    fn unit(&mut self, node: &WktNode, default_kind: UnitKind) -> Option<Unit> {
        let kind = match node.keyword.to_ascii_uppercase().as_str() {
            "ANGLEUNIT" => UnitKind::Angular,
            "LENGTHUNIT" => UnitKind::Linear,
            "SCALEUNIT" => UnitKind::Scale,
            "TIMEUNIT" => UnitKind::Time,
            _ => default_kind,
        };
        let name = self.name(node);
        let factor = match node.num_at(1) {
            Some(f) if f > 0.0 => f,
            _ => {
                self.report
                    .add_error(format!("单位 {name} 缺少有效的换算系数"));
                return None;
            }
        };
        let known = Unit::by_name(&name)
            .filter(|u| u.kind == kind && (u.to_si - factor).abs() <= 1e-10 * factor);
        Some(known.unwrap_or_else(|| Unit::new(name, kind, factor)))
    }

    fn unit_child(&mut self, node: &WktNode, default_kind: UnitKind) -> Option<Unit> {
        let unit_node = node.child(UNIT)?;
        self.unit(unit_node, default_kind)
    }

    fn identifier(node: &WktNode) -> Option<Identifier> {
        let id = node.child(ID)?;
        let authority = id.str_at(0)?;
        let code = match id.children.get(1)? {
            WktValue::Num(v) => format!("{v}"),
            WktValue::Str(s) | WktValue::Ident(s) => s.clone(),
            WktValue::Node(_) => return None,
        };
        Some(Identifier::new(authority, code))
    }

    /// `USAGE`/`BBOX`/`AREA`/`REMARK` 与标识符
    fn decorate(&mut self, node: &WktNode, mut crs: Crs) -> Crs {
        crs.id = Self::identifier(node);
        let scope = node.child(&["USAGE"]).unwrap_or(node);
        if let Some(area) = self.area(scope) {
            crs.area = Some(area);
        }
        if let Some(remark) = node.child(&["REMARK"]).and_then(WktNode::name) {
            crs.remarks = Some(remark.to_string());
        }
        crs
    }

    fn area(&mut self, scope: &WktNode) -> Option<Area> {
        let bbox = scope.child(&["BBOX"])?;
        let values: Vec<f64> = (0..4).filter_map(|i| bbox.num_at(i)).collect();
        let &[south, west, north, east] = values.as_slice() else {
            self.report.add_warning("BBOX 需要 4 个数值，已忽略");
            return None;
        };
        let result = match scope.child(&["AREA"]).and_then(WktNode::name) {
            Some(name) => Area::named(name, west, south, east, north),
            None => Area::new(west, south, east, north),
        };
        match result {
            Ok(area) => Some(area),
            Err(e) => {
                self.report.add_warning(format!("BBOX 无效，已忽略: {e}"));
                None
            }
        }
    }

    fn ellipsoid(&mut self, datum: &WktNode) -> Option<Ellipsoid> {
        let Some(node) = datum.child(ELLIPSOID) else {
            self.report
                .add_error(format!("{} 缺少 ELLIPSOID", datum.keyword));
            return None;
        };
        let name = self.name(node);
        let (Some(a), Some(rf)) = (node.num_at(1), node.num_at(2)) else {
            self.report
                .add_error(format!("椭球 {name} 需要长半轴与反扁率"));
            return None;
        };
        let unit = self
            .unit_child(node, UnitKind::Linear)
            .unwrap_or(Unit::METRE);
        let result = Ellipsoid::from_inverse_flattening(name.clone(), unit.to_si(a), rf);
        match result {
            Ok(e) => Some(e),
            Err(err) => {
                self.report.add_error(err.to_string());
                None
            }
        }
    }

    fn prime_meridian(&mut self, crs: &WktNode, angle_unit: &Unit, required: bool) -> PrimeMeridian {
        let Some(node) = crs.child(&["PRIMEM", "PRIMEMERIDIAN"]) else {
            if required {
                self.report
                    .add_warning(format!("{} 缺少 PRIMEM，假定为 Greenwich", crs.keyword));
            }
            return PrimeMeridian::greenwich();
        };
        let name = self.name(node);
        let longitude = node.num_at(1).unwrap_or_else(|| {
            self.report
                .add_warning(format!("本初子午线 {name} 缺少经度，假定为 0"));
            0.0
        });
        if longitude == 0.0 && name.eq_ignore_ascii_case("greenwich") {
            return PrimeMeridian::greenwich();
        }
        let unit = self
            .unit_child(node, UnitKind::Angular)
            .unwrap_or_else(|| angle_unit.clone());
        PrimeMeridian::new(name, longitude, unit)
    }

    // ------------------------------------------------------------------------
    // 坐标系
    // ------------------------------------------------------------------------

    /// 解析 `AXIS["name (abbr)", direction, ORDER[n], UNIT[...]]`
    fn axis(&mut self, node: &WktNode, fallback: Option<&Unit>, kind: CsKind) -> Option<(usize, AxisInfo)> {
        let raw = self.name(node);
        let (name, abbreviation) = match (raw.rfind('('), raw.ends_with(')')) {
            (Some(open), true) => (
                raw[..open].trim().to_string(),
                raw[open + 1..raw.len() - 1].trim().to_string(),
            ),
            _ => (raw.clone(), String::new()),
        };
        let Some(direction) = node.text_at(1).and_then(AxisDirection::from_wkt_name) else {
            self.report
                .add_error(format!("轴 {raw} 缺少有效的方向"));
            return None;
        };
        let order = node
            .child(&["ORDER"])
            .and_then(|o| o.num_at(0))
            .map_or(usize::MAX, |v| v as usize);

        let linear = matches!(direction, AxisDirection::Up | AxisDirection::Down)
            || matches!(kind, CsKind::Cartesian | CsKind::Vertical);
        let wanted = if kind == CsKind::Temporal {
            UnitKind::Time
        } else if linear {
            UnitKind::Linear
        } else {
            UnitKind::Angular
        };
        let unit = match self.unit_child(node, wanted) {
            Some(u) => u,
            None => match fallback.filter(|u| u.kind == wanted) {
                Some(u) => u.clone(),
                None => self.default_unit(wanted, &raw),
            },
        };
        Some((order, AxisInfo::new(name, abbreviation, direction, unit)))
    }

    fn default_unit(&mut self, kind: UnitKind, axis: &str) -> Unit {
        match kind {
            UnitKind::Angular => {
                self.report
                    .add_warning(format!("轴 {axis} 缺少单位，假定为 degree"));
                Unit::DEGREE
            }
            UnitKind::Time => Unit::YEAR,
            _ => {
                self.report
                    .add_warning(format!("轴 {axis} 缺少单位，假定为 metre"));
                Unit::METRE
            }
        }
    }

    /// WKT2 `CS[type, dim]` 与同级 `AXIS`、单位
    fn cs_wkt2(&mut self, crs: &WktNode) -> Option<CoordinateSystem> {
        let Some(cs_node) = crs.child(&["CS"]) else {
            self.report
                .add_error(format!("{} 缺少 CS", crs.keyword));
            return None;
        };
        let kind_name = cs_node.text_at(0).unwrap_or_default();
        let Some(kind) = CsKind::from_wkt_name(kind_name) else {
            self.report
                .add_error(format!("不支持的坐标系类型 {kind_name}"));
            return None;
        };
        let fallback = self.unit_child(crs, UnitKind::Linear);
        let mut axes = Vec::new();
        for axis in crs.children_of(&["AXIS"]) {
            axes.push(self.axis(axis, fallback.as_ref(), kind)?);
        }
        axes.sort_by_key(|(order, _)| *order);
        let axes: Vec<AxisInfo> = axes.into_iter().map(|(_, a)| a).collect();
        if let Some(dim) = cs_node.num_at(1) {
            if dim as usize != axes.len() {
                self.report.add_error(format!(
                    "CS 声明 {} 维，但给出 {} 个轴",
                    dim as usize,
                    axes.len()
                ));
                return None;
            }
        }
        if axes.is_empty() {
            self.report
                .add_error(format!("{} 没有 AXIS", crs.keyword));
            return None;
        }
        Some(CoordinateSystem::new(kind, axes))
    }

    /// WKT1 `AXIS` 列表，没有时返回 `None`
    fn axes_wkt1(&mut self, crs: &WktNode, unit: &Unit, kind: CsKind) -> Option<Vec<AxisInfo>> {
        let mut axes = Vec::new();
        for axis in crs.children_of(&["AXIS"]) {
            let (_, info) = self.axis(axis, Some(unit), kind)?;
            axes.push(info);
        }
        (!axes.is_empty()).then_some(axes)
    }

    // ------------------------------------------------------------------------
    // WKT2
    // ------------------------------------------------------------------------

    fn geodetic_datum(&mut self, crs: &WktNode, angle_unit: &Unit) -> Option<Datum> {
        let pm = self.prime_meridian(crs, angle_unit, false);
        if let Some(node) = crs.child(DATUM) {
            let name = self.name(node);
            let ellipsoid = self.ellipsoid(node)?;
            let mut frame = GeodeticFrame::new(name, ellipsoid, pm);
            frame.id = Self::identifier(node);
            if let Some(epoch) = crs
                .child(&["DYNAMIC"])
                .and_then(|d| d.child(&["FRAMEEPOCH"]))
                .and_then(|e| e.num_at(0))
            {
                frame = frame.with_epoch(epoch);
            }
            return Some(Datum::Geodetic(frame));
        }
        if let Some(node) = crs.child(&["ENSEMBLE"]) {
            let name = self.name(node);
            let ellipsoid = self.ellipsoid(node)?;
            let members = node
                .children_of(&["MEMBER"])
                .map(|m| {
                    let mut frame = GeodeticFrame::new(
                        m.name().unwrap_or_default(),
                        ellipsoid.clone(),
                        pm.clone(),
                    );
                    frame.id = Self::identifier(m);
                    Datum::Geodetic(frame)
                })
                .collect();
            return self.ensemble(node, name, members);
        }
        self.report
            .add_error(format!("{} 缺少 DATUM 或 ENSEMBLE", crs.keyword));
        None
    }

    fn ensemble(&mut self, node: &WktNode, name: String, members: Vec<Datum>) -> Option<Datum> {
        let Some(accuracy) = node
            .child(&["ENSEMBLEACCURACY"])
            .and_then(|a| a.num_at(0))
        else {
            self.report
                .add_error(format!("基准集合 {name} 缺少 ENSEMBLEACCURACY"));
            return None;
        };
        if members.is_empty() {
            self.report
                .add_error(format!("基准集合 {name} 没有 MEMBER"));
            return None;
        }
        Some(Datum::Ensemble(DatumEnsemble {
            name,
            members,
            accuracy,
            id: Self::identifier(node),
        }))
    }

    fn geodetic(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let crs_unit = self.unit_child(node, UnitKind::Angular);
        let angle_unit = crs_unit
            .clone()
            .filter(|u| u.kind == UnitKind::Angular)
            .unwrap_or(Unit::DEGREE);
        let datum = self.geodetic_datum(node, &angle_unit)?;

        let is_base = node.is(&["BASEGEOGCRS", "BASEGEODCRS"]);
        let cs = if is_base && node.child(&["CS"]).is_none() {
            // 基础 CRS 可省略坐标系，按纬度、经度处理
            CoordinateSystem::ellipsoidal_2d_lat_lon(&angle_unit)
        } else {
            self.cs_wkt2(node)?
        };
        let kind = match (cs.kind, cs.dimension()) {
            (CsKind::Ellipsoidal, 2) => CrsKind::Geographic2D { datum, cs },
            (CsKind::Ellipsoidal, 3) => CrsKind::Geographic3D { datum, cs },
            (CsKind::Cartesian, 3) => CrsKind::Geocentric { datum, cs },
            (kind, dim) => {
                self.report
                    .add_error(format!("大地 CRS 不支持 {dim} 维 {kind} 坐标系"));
                return None;
            }
        };
        Some(self.decorate(node, Crs::new(name, kind)))
    }

    fn projected(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let Some(base_node) = node.child(&["BASEGEOGCRS", "BASEGEODCRS"]) else {
            self.report
                .add_error(format!("投影 CRS {name} 缺少 BASEGEOGCRS"));
            return None;
        };
        let base = self.geodetic(base_node)?;
        let Some(conv_node) = node.child(&["CONVERSION"]) else {
            self.report
                .add_error(format!("投影 CRS {name} 缺少 CONVERSION"));
            return None;
        };
        let angle_unit = base
            .cs()
            .and_then(CoordinateSystem::horizontal_unit)
            .cloned()
            .unwrap_or(Unit::DEGREE);
        let length_unit = self
            .unit_child(node, UnitKind::Linear)
            .unwrap_or(Unit::METRE);
        let conversion = self.conversion(conv_node, &angle_unit, &length_unit)?;
        let cs = self.cs_wkt2(node)?;
        if cs.kind != CsKind::Cartesian {
            self.report
                .add_error(format!("投影 CRS 需要笛卡尔坐标系，得到 {}", cs.kind));
            return None;
        }
        Some(self.decorate(node, Crs::projected(name, base, conversion, cs)))
    }

    fn vertical(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let datum = if let Some(d) = node.child(VERTICAL_DATUM) {
            let mut frame = VerticalFrame::new(self.name(d));
            frame.id = Self::identifier(d);
            Datum::Vertical(frame)
        } else if let Some(e) = node.child(&["ENSEMBLE"]) {
            let ensemble_name = self.name(e);
            let members = e
                .children_of(&["MEMBER"])
                .map(|m| Datum::Vertical(VerticalFrame::new(m.name().unwrap_or_default())))
                .collect();
            self.ensemble(e, ensemble_name, members)?
        } else {
            self.report
                .add_error(format!("垂直 CRS {name} 缺少 VDATUM"));
            return None;
        };
        let cs = if node.is(&["BASEVERTCRS"]) && node.child(&["CS"]).is_none() {
            CoordinateSystem::vertical_up(&Unit::METRE)
        } else {
            self.cs_wkt2(node)?
        };
        let geoid_grids = node
            .children_of(&["GEOIDMODEL"])
            .filter_map(WktNode::name)
            .map(str::to_string)
            .collect();
        let crs = Crs::new(
            name,
            CrsKind::Vertical {
                datum,
                cs,
                geoid_grids,
            },
        );
        Some(self.decorate(node, crs))
    }

    fn compound(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let mut components = Vec::new();
        for child in node.children_of(CRS_KEYWORDS) {
            components.push(self.crs(child)?);
        }
        if components.len() < 2 {
            self.report
                .add_error(format!("复合 CRS {name} 至少需要 2 个分量"));
            return None;
        }
        Some(self.decorate(node, Crs::compound(name, components)))
    }

    fn inner_crs(&mut self, node: &WktNode, wrapper: &str) -> Option<Crs> {
        let Some(inner) = node
            .child(&[wrapper])
            .and_then(|w| w.child(CRS_KEYWORDS))
        else {
            self.report
                .add_error(format!("{} 缺少 {wrapper}", node.keyword));
            return None;
        };
        self.crs(inner)
    }

    fn bound(&mut self, node: &WktNode) -> Option<Crs> {
        let base = self.inner_crs(node, "SOURCECRS")?;
        let hub = self.inner_crs(node, "TARGETCRS")?;
        let Some(t) = node.child(&["ABRIDGEDTRANSFORMATION"]) else {
            self.report
                .add_error("BOUNDCRS 缺少 ABRIDGEDTRANSFORMATION");
            return None;
        };
        let name = self.name(t);
        let (method, op_params) = self.method_and_params(t, &Unit::ARC_SECOND, &Unit::METRE)?;
        let source = base.geodetic_crs().cloned().unwrap_or_else(|| base.clone());
        match Operation::transformation(name, source, hub.clone(), method, op_params, UNKNOWN_ACCURACY) {
            Ok(mut op) => {
                op.id = Self::identifier(t);
                Some(Crs::bound(base, hub, op))
            }
            Err(e) => {
                self.report.add_error(e.to_string());
                None
            }
        }
    }

    fn engineering(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let Some(d) = node.child(&["EDATUM", "ENGINEERINGDATUM"]) else {
            self.report
                .add_error(format!("工程 CRS {name} 缺少 EDATUM"));
            return None;
        };
        let datum = Datum::Engineering { name: self.name(d) };
        let cs = self.cs_wkt2(node)?;
        Some(self.decorate(node, Crs::new(name, CrsKind::Engineering { datum, cs })))
    }

    fn temporal(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let Some(d) = node.child(&["TDATUM", "TIMEDATUM"]) else {
            self.report
                .add_error(format!("时间 CRS {name} 缺少 TDATUM"));
            return None;
        };
        let origin = d
            .child(&["TIMEORIGIN"])
            .and_then(|o| match o.children.first() {
                Some(WktValue::Str(s) | WktValue::Ident(s)) => Some(s.clone()),
                Some(WktValue::Num(v)) => Some(format!("{v}")),
                _ => None,
            })
            .unwrap_or_default();
        let datum = Datum::Temporal {
            name: self.name(d),
            origin,
        };
        let cs = self.cs_wkt2(node)?;
        Some(self.decorate(node, Crs::new(name, CrsKind::Temporal { datum, cs })))
    }

    // ------------------------------------------------------------------------
    // 操作
    // ------------------------------------------------------------------------

    fn method_and_params(
        &mut self,
        node: &WktNode,
        angle_unit: &Unit,
        length_unit: &Unit,
    ) -> Option<(Method, Vec<Param>)> {
        let method = match node.child(&["METHOD", "PROJECTION"]) {
            Some(m) => {
                let name = self.name(m);
                let code = Self::identifier(m)
                    .filter(Identifier::is_epsg)
                    .and_then(|id| id.numeric_code())
                    .or_else(|| method_code_by_name(&name));
                match code {
                    Some(c) if method_name(c).is_some() => Method::epsg(c),
                    Some(c) => Method {
                        name,
                        code: Some(c),
                    },
                    None => Method::named(name),
                }
            }
            None => {
                self.report
                    .add_error(format!("{} 缺少 METHOD", node.keyword));
                return None;
            }
        };

        let mut out = Vec::new();
        for p in node.children_of(&["PARAMETER"]) {
            let name = self.name(p);
            let code = Self::identifier(p)
                .filter(Identifier::is_epsg)
                .and_then(|id| id.numeric_code())
                .or_else(|| param_code_by_name(&name));
            let Some(value) = p.num_at(1) else {
                self.report
                    .add_error(format!("参数 {name} 缺少数值"));
                return None;
            };
            let unit = match self.unit_child(p, UnitKind::Linear) {
                Some(u) => u,
                None => {
                    let unit = default_param_unit(code, angle_unit, length_unit);
                    // WKT1 PARAMETER 不带单位
                    if !node.is(&["PROJCS"]) {
                        self.report.add_warning(format!(
                            "参数 {name} 缺少单位，假定为 {}",
                            unit.name
                        ));
                    }
                    unit
                }
            };
            out.push(Param {
                name: code.and_then(param_name).map_or(name, str::to_string),
                code,
                value: ParamValue::Measure { value, unit },
            });
        }
        for p in node.children_of(&["PARAMETERFILE"]) {
            let name = self.name(p);
            let Some(file) = p.str_at(1) else {
                self.report
                    .add_error(format!("参数文件 {name} 缺少文件名"));
                return None;
            };
            let code = Self::identifier(p)
                .filter(Identifier::is_epsg)
                .and_then(|id| id.numeric_code())
                .or_else(|| param_code_by_name(&name));
            out.push(Param {
                name,
                code,
                value: ParamValue::File(file.to_string()),
            });
        }
        Some((method, out))
    }

    fn conversion(&mut self, node: &WktNode, angle_unit: &Unit, length_unit: &Unit) -> Option<Operation> {
        let name = self.name(node);
        let (method, op_params) = self.method_and_params(node, angle_unit, length_unit)?;
        let mut op = Operation::conversion(name, method, op_params);
        op.id = Self::identifier(node);
        Some(op)
    }

    fn coordinate_operation(&mut self, node: &WktNode) -> Option<Operation> {
        let name = self.name(node);
        let source = self.inner_crs(node, "SOURCECRS")?;
        let target = self.inner_crs(node, "TARGETCRS")?;
        let (method, op_params) = self.method_and_params(node, &Unit::DEGREE, &Unit::METRE)?;
        let accuracy = node
            .child(&["OPERATIONACCURACY"])
            .and_then(|a| a.num_at(0))
            .unwrap_or(UNKNOWN_ACCURACY);
        match Operation::transformation(name, source, target, method, op_params, accuracy) {
            Ok(mut op) => {
                op.id = Self::identifier(node);
                let scope = node.child(&["USAGE"]).unwrap_or(node);
                op.area = self.area(scope);
                Some(op)
            }
            Err(e) => {
                self.report.add_error(e.to_string());
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // WKT1
    // ------------------------------------------------------------------------

    fn wkt1_datum(&mut self, crs: &WktNode, angle_unit: &Unit) -> Option<(Datum, Option<Vec<f64>>)> {
        let Some(node) = crs.child(&["DATUM"]) else {
            self.report
                .add_error(format!("{} 缺少 DATUM", crs.keyword));
            return None;
        };
        let name = self.name(node);
        let ellipsoid = self.ellipsoid(node)?;
        let pm = self.prime_meridian(crs, angle_unit, true);
        let mut frame = GeodeticFrame::new(name, ellipsoid, pm);
        frame.id = Self::identifier(node);
        let towgs84 = node.child(&["TOWGS84"]).map(|t| {
            t.children
                .iter()
                .filter_map(|c| match c {
                    WktValue::Num(v) => Some(*v),
                    _ => None,
                })
                .collect()
        });
        Some((Datum::Geodetic(frame), towgs84))
    }

    fn geogcs(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let unit = self.unit_child(node, UnitKind::Angular).unwrap_or_else(|| {
            self.report
                .add_warning(format!("GEOGCS {name} 缺少 UNIT，假定为 degree"));
            Unit::DEGREE
        });
        let (datum, towgs84) = self.wkt1_datum(node, &unit)?;
        let cs = match self.axes_wkt1(node, &unit, CsKind::Ellipsoidal) {
            Some(axes) => CoordinateSystem::new(CsKind::Ellipsoidal, axes),
            // OGC 01-009 缺省轴序为经度、纬度
            None => CoordinateSystem::ellipsoidal_2d_lon_lat(&unit),
        };
        let crs = self.decorate(node, Crs::geographic_2d(name, datum, cs));
        self.towgs84(crs, towgs84)
    }

    fn geoccs(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let unit = self.unit_child(node, UnitKind::Linear).unwrap_or_else(|| {
            self.report
                .add_warning(format!("GEOCCS {name} 缺少 UNIT，假定为 metre"));
            Unit::METRE
        });
        let (datum, towgs84) = self.wkt1_datum(node, &Unit::DEGREE)?;
        let cs = CoordinateSystem::new(
            CsKind::Cartesian,
            vec![
                AxisInfo::new("Geocentric X", "X", AxisDirection::GeocentricX, unit.clone()),
                AxisInfo::new("Geocentric Y", "Y", AxisDirection::GeocentricY, unit.clone()),
                AxisInfo::new("Geocentric Z", "Z", AxisDirection::GeocentricZ, unit),
            ],
        );
        let crs = self.decorate(node, Crs::new(name, CrsKind::Geocentric { datum, cs }));
        self.towgs84(crs, towgs84)
    }

    fn projcs(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let Some(geogcs) = node.child(&["GEOGCS"]) else {
            self.report
                .add_error(format!("PROJCS {name} 缺少 GEOGCS"));
            return None;
        };
        let bound_base = self.geogcs(geogcs)?;
        let (base, binding) = match bound_base.kind {
            CrsKind::Bound {
                base,
                hub,
                transformation,
            } => (*base, Some((hub, transformation))),
            _ => (bound_base, None),
        };
        let angle_unit = base
            .cs()
            .and_then(CoordinateSystem::horizontal_unit)
            .cloned()
            .unwrap_or(Unit::DEGREE);
        let length_unit = self.unit_child(node, UnitKind::Linear).unwrap_or_else(|| {
            self.report
                .add_warning(format!("PROJCS {name} 缺少 UNIT，假定为 metre"));
            Unit::METRE
        });

        let mut conversion = if node.child(&["PROJECTION"]).is_some() {
            let (method, op_params) = self.method_and_params(node, &angle_unit, &length_unit)?;
            Operation::conversion(name.clone(), method, op_params)
        } else {
            self.report
                .add_error(format!("PROJCS {name} 缺少 PROJECTION"));
            return None;
        };
        if is_spherical_web_mercator(node) {
            conversion = Operation::pseudo_mercator();
        }

        let cs = match self.axes_wkt1(node, &length_unit, CsKind::Cartesian) {
            Some(axes) => CoordinateSystem::new(CsKind::Cartesian, axes),
            None => CoordinateSystem::cartesian_en(&length_unit),
        };
        let crs = self.decorate(node, Crs::projected(name, base, conversion, cs));
        Some(match binding {
            Some((hub, transformation)) => Crs::bound(crs, *hub, *transformation),
            None => crs,
        })
    }

    fn vert_cs(&mut self, node: &WktNode) -> Option<Crs> {
        let name = self.name(node);
        let Some(d) = node.child(VERTICAL_DATUM) else {
            self.report
                .add_error(format!("VERT_CS {name} 缺少 VERT_DATUM"));
            return None;
        };
        let mut frame = VerticalFrame::new(self.name(d));
        frame.id = Self::identifier(d);
        let unit = self.unit_child(node, UnitKind::Linear).unwrap_or_else(|| {
            self.report
                .add_warning(format!("VERT_CS {name} 缺少 UNIT，假定为 metre"));
            Unit::METRE
        });
        let mut crs = Crs::vertical(name, frame, &unit);
        if let Some(axes) = self.axes_wkt1(node, &unit, CsKind::Vertical) {
            if let CrsKind::Vertical { cs, .. } = &mut crs.kind {
                *cs = CoordinateSystem::new(CsKind::Vertical, axes);
            }
        }
        Some(self.decorate(node, crs))
    }

    /// `TOWGS84[...]` 生成到 WGS 84 的绑定 CRS
    fn towgs84(&mut self, crs: Crs, values: Option<Vec<f64>>) -> Option<Crs> {
        let Some(values) = values else {
            return Some(crs);
        };
        let datum_name = crs.datum().map(Datum::name).unwrap_or_default();
        if normalized_datum_name(datum_name) == "wgs1984" {
            return Some(crs);
        }
        let (method, op_params) = match values.as_slice() {
            [tx, ty, tz] | [tx, ty, tz, 0.0, 0.0, 0.0, 0.0] => (
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
                self.report.add_error("TOWGS84 需要 3 个或 7 个数值");
                return None;
            }
        };
        let source = crs.geodetic_crs().cloned().unwrap_or_else(|| crs.clone());
        let name = format!("Transformation from {} to WGS84", source.name);
        match Operation::transformation(name, source, Crs::wgs84(), method, op_params, UNKNOWN_ACCURACY) {
            Ok(op) => Some(Crs::bound(crs, Crs::wgs84(), op)),
            Err(e) => {
                self.report.add_error(e.to_string());
                None
            }
        }
    }
}

/// 参数缺少单位时的默认单位
fn default_param_unit(code: Option<u32>, angle_unit: &Unit, length_unit: &Unit) -> Unit {
    match code {
        Some(
            params::LATITUDE_OF_ORIGIN
            | params::LONGITUDE_OF_ORIGIN,
        ) => angle_unit.clone(),
        Some(params::RX | params::RY | params::RZ | params::LATITUDE_OFFSET | params::LONGITUDE_OFFSET) => {
            Unit::ARC_SECOND
        }
        Some(params::SCALE_FACTOR) => Unit::UNITY,
        Some(params::SCALE_DIFFERENCE) => Unit::PARTS_PER_MILLION,
        _ => length_unit.clone(),
    }
}

/// GDAL 风格的 `EXTENSION["PROJ4", "+proj=merc +a=6378137 +b=6378137 ..."]`
fn is_spherical_web_mercator(projcs: &WktNode) -> bool {
    let Some(ext) = projcs
        .children_of(&["EXTENSION"])
        .find(|e| e.name().is_some_and(|n| n.eq_ignore_ascii_case("PROJ4")))
        .and_then(|e| e.str_at(1))
    else {
        return false;
    };
    let has = |needle: &str| ext.split_whitespace().any(|t| t == needle);
    has("+proj=merc") && has("+a=6378137") && has("+b=6378137")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Criterion;

    const WGS84_WKT2: &str = r#"GEOGCRS["WGS 84",
        ENSEMBLE["World Geodetic System 1984 ensemble",
            MEMBER["World Geodetic System 1984 (Transit)"],
            MEMBER["World Geodetic System 1984 (G2139)"],
            ELLIPSOID["WGS 84",6378137,298.257223563,LENGTHUNIT["metre",1]],
            ENSEMBLEACCURACY[2.0]],
        PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]],
        CS[ellipsoidal,2],
            AXIS["geodetic latitude (Lat)",north,ORDER[1],ANGLEUNIT["degree",0.0174532925199433]],
            AXIS["geodetic longitude (Lon)",east,ORDER[2],ANGLEUNIT["degree",0.0174532925199433]],
        USAGE[SCOPE["Horizontal component of 3D system."],
            AREA["World."],BBOX[-90,-180,90,180]],
        ID["EPSG",4326]]"#;

    const UTM_WKT1: &str = r#"PROJCS["WGS 84 / UTM zone 31N",
        GEOGCS["WGS 84",
            DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],
                AUTHORITY["EPSG","6326"]],
            PRIMEM["Greenwich",0],
            UNIT["degree",0.0174532925199433],
            AUTHORITY["EPSG","4326"]],
        PROJECTION["Transverse_Mercator"],
        PARAMETER["latitude_of_origin",0],
        PARAMETER["central_meridian",3],
        PARAMETER["scale_factor",0.9996],
        PARAMETER["false_easting",500000],
        PARAMETER["false_northing",0],
        UNIT["metre",1],
        AXIS["Easting",EAST],
        AXIS["Northing",NORTH],
        AUTHORITY["EPSG","32631"]]"#;

    #[test]
    fn test_parse_tree_brackets_and_escapes() {
        let tree = parse_tree(r#"REMARK("say ""hi""", 1.5e3, east, X[])"#).unwrap();
        assert_eq!(tree.str_at(0), Some(r#"say "hi""#));
        assert_eq!(tree.num_at(1), Some(1500.0));
        assert_eq!(tree.text_at(2), Some("east"));
        assert!(tree.child(&["x"]).is_some());
    }

    #[test]
    fn test_grammar_errors_have_positions() {
        for bad in [
            "GEOGCRS[\"x\"",
            "GEOGCRS[\"x\")",
            "GEOGCRS[\"unterminated]",
            "GEOGCRS[\"x\", 1.2.3]",
            "GEOGCRS[\"x\"] trailing",
        ] {
            let err = parse_tree(bad).unwrap_err();
            assert!(!err.grammar_errors.is_empty(), "{bad}");
            assert!(err.grammar_errors[0].starts_with("位置"), "{bad}");
        }
    }

    #[test]
    fn test_wkt2_geographic_ensemble() {
        let parsed = WktParser::new().parse_crs(WGS84_WKT2).unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let crs = parsed.value;
        assert!(matches!(crs.kind, CrsKind::Geographic2D { .. }));
        assert_eq!(crs.datum().and_then(Datum::ensemble_accuracy), Some(2.0));
        let cs = crs.cs().unwrap();
        assert_eq!(cs.axes[0].direction, AxisDirection::North);
        assert_eq!(cs.axes[0].abbreviation, "Lat");
        let area = crs.area.as_ref().unwrap();
        assert_eq!((area.west, area.north), (-180.0, 90.0));
        assert!(crs.is_equivalent_to(&Crs::wgs84(), Criterion::Equivalent, None));
    }

    #[test]
    fn test_wkt1_projected_utm() {
        let parsed = WktParser::new().parse_crs(UTM_WKT1).unwrap();
        let crs = parsed.value;
        assert!(crs.is_projected());
        assert_eq!(crs.id, Some(Identifier::epsg(32631)));
        let conv = crs.conversion().unwrap().single().unwrap();
        assert_eq!(conv.method.code, Some(methods::TRANSVERSE_MERCATOR));
        let lon0 = conv.value(params::LONGITUDE_OF_ORIGIN).unwrap();
        assert!((lon0.to_degrees() - 3.0).abs() < 1e-12);
        assert!((conv.value(params::SCALE_FACTOR).unwrap() - 0.9996).abs() < 1e-15);
        // WKT1 GEOGCS 缺省轴序为经度在前
        let base = crs.geodetic_crs().unwrap();
        assert_eq!(base.cs().unwrap().axes[0].direction, AxisDirection::East);
    }

    #[test]
    fn test_missing_units_and_primem_warn() {
        let wkt = r#"GEOGCS["test", DATUM["D_test", SPHEROID["GRS 1980", 6378137, 298.257222101]]]"#;
        let parsed = WktParser::new().parse_crs(wkt).unwrap();
        assert!(parsed.warnings.iter().any(|w| w.contains("UNIT")));
        assert!(parsed.warnings.iter().any(|w| w.contains("PRIMEM")));
        assert_eq!(
            parsed.value.cs().unwrap().axes[0].unit,
            Unit::DEGREE
        );
    }

    #[test]
    fn test_towgs84_gives_bound_crs() {
        let wkt = r#"GEOGCS["ED50",
            DATUM["European_Datum_1950", SPHEROID["International 1924",6378388,297],
                TOWGS84[-87,-98,-121,0,0,0,0]],
            PRIMEM["Greenwich",0], UNIT["degree",0.0174532925199433]]"#;
        let crs = WktParser::new().parse_crs(wkt).unwrap().value;
        let CrsKind::Bound { transformation, hub, .. } = &crs.kind else {
            panic!("expected bound CRS");
        };
        assert!(hub.is_geographic());
        let single = transformation.single().unwrap();
        assert_eq!(single.method.code, Some(methods::GEOCENTRIC_TRANSLATION_GEOG2D));
        assert_eq!(single.value(params::TX), Some(-87.0));
    }

    #[test]
    fn test_wkt2_projected_with_base_default_axes() {
        let wkt = r#"PROJCRS["WGS 84 / Pseudo-Mercator",
            BASEGEOGCRS["WGS 84",
                DATUM["World Geodetic System 1984", ELLIPSOID["WGS 84",6378137,298.257223563]],
                ANGLEUNIT["degree",0.0174532925199433]],
            CONVERSION["Popular Visualisation Pseudo-Mercator",
                METHOD["Popular Visualisation Pseudo Mercator", ID["EPSG",1024]],
                PARAMETER["Latitude of natural origin",0,ANGLEUNIT["degree",0.0174532925199433]],
                PARAMETER["Longitude of natural origin",0,ANGLEUNIT["degree",0.0174532925199433]],
                PARAMETER["False easting",0,LENGTHUNIT["metre",1]],
                PARAMETER["False northing",0,LENGTHUNIT["metre",1]]],
            CS[Cartesian,2],
                AXIS["easting (X)",east,ORDER[1]],
                AXIS["northing (Y)",north,ORDER[2]],
            LENGTHUNIT["metre",1],
            ID["EPSG",3857]]"#;
        let parsed = WktParser::new().parse_crs(wkt).unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let crs = parsed.value;
        let base = crs.geodetic_crs().unwrap();
        assert_eq!(base.cs().unwrap().axes[0].direction, AxisDirection::North);
        assert!(crs.is_equivalent_to(&Crs::web_mercator(), Criterion::Equivalent, None));
    }

    #[test]
    fn test_axis_count_mismatch() {
        let wkt = r#"GEOGCRS["x",
            DATUM["d", ELLIPSOID["WGS 84",6378137,298.257223563]],
            CS[ellipsoidal,3],
            AXIS["latitude",north,ANGLEUNIT["degree",0.0174532925199433]],
            AXIS["longitude",east,ANGLEUNIT["degree",0.0174532925199433]]]"#;
        let err = WktParser::new().parse_crs(wkt).unwrap_err();
        assert!(err.grammar_errors.iter().any(|e| e.contains("3 维")));
    }

    #[test]
    fn test_compound_and_vertical() {
        let wkt = r#"COMPOUNDCRS["WGS 84 + EGM96 height",
            GEOGCRS["WGS 84",
                DATUM["World Geodetic System 1984", ELLIPSOID["WGS 84",6378137,298.257223563]],
                CS[ellipsoidal,2],
                AXIS["latitude",north,ANGLEUNIT["degree",0.0174532925199433]],
                AXIS["longitude",east,ANGLEUNIT["degree",0.0174532925199433]]],
            VERTCRS["EGM96 height",
                VDATUM["EGM96 geoid"],
                CS[vertical,1],
                AXIS["gravity-related height (H)",up,LENGTHUNIT["metre",1]],
                GEOIDMODEL["egm96_15.gtx"]]]"#;
        let crs = WktParser::new().parse_crs(wkt).unwrap().value;
        assert!(crs.is_compound());
        let v = crs.vertical_component().unwrap();
        let CrsKind::Vertical { geoid_grids, .. } = &v.kind else {
            panic!("expected vertical");
        };
        assert_eq!(geoid_grids, &vec!["egm96_15.gtx".to_string()]);
        assert_eq!(crs.dimension(), 3);
    }

    #[test]
    fn test_unsupported_keyword() {
        let err = WktParser::new().parse_crs("FOO[\"x\"]").unwrap_err();
        assert!(err.grammar_errors[0].contains("FOO"));
    }

    #[test]
    fn test_parse_conversion_operation() {
        let wkt = r#"CONVERSION["UTM zone 50N",
            METHOD["Transverse Mercator",ID["EPSG",9807]],
            PARAMETER["Latitude of natural origin",0,ANGLEUNIT["degree",0.0174532925199433]],
            PARAMETER["Longitude of natural origin",117,ANGLEUNIT["degree",0.0174532925199433]],
            PARAMETER["Scale factor at natural origin",0.9996,SCALEUNIT["unity",1]],
            PARAMETER["False easting",500000,LENGTHUNIT["metre",1]],
            PARAMETER["False northing",0]]"#;
        let parsed = WktParser::new().parse_operation(wkt).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        let op = parsed.value;
        assert!(op.is_conversion());
        let utm = Operation::utm(50, false).unwrap();
        assert!(crate::compare::operation_equivalent(&op, &utm));
    }

    #[test]
    fn test_looks_like_wkt() {
        assert!(looks_like_wkt("  GEOGCS[\"x\"]"));
        assert!(looks_like_wkt("PROJCRS (\"x\")"));
        assert!(!looks_like_wkt("+proj=longlat"));
        assert!(!looks_like_wkt("EPSG:4326"));
    }
}
