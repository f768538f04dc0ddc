// crates/gt_geo/src/operation.rs
//! 坐标操作模型
//!
//! 坐标操作分三类：
//! - **Conversion**：不改变参考框架（投影、地理/地心互换、仿射）
//! - **Transformation**：改变参考框架（Helmert、格网平移、偏移量）
//! - **Concatenated**：有序步骤串联，相邻步骤的 CRS 必须一致
//!
//! 精度单位为米，`-1` 表示未知，绝不代表"零误差"。

use crate::area::Area;
use crate::compare::Criterion;
use crate::crs::Crs;
use crate::error::{GeoError, GeoResult};
use crate::identifier::Identifier;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 未知精度
pub const UNKNOWN_ACCURACY: f64 = -1.0;

// ============================================================================
// 方法与参数代码
// ============================================================================

/// EPSG 方法代码
pub mod methods {
    /// Transverse Mercator
    pub const TRANSVERSE_MERCATOR: u32 = 9807;
    /// Mercator (variant A)
    pub const MERCATOR_A: u32 = 9804;
    /// Popular Visualisation Pseudo Mercator
    pub const PSEUDO_MERCATOR: u32 = 1024;
    /// Geographic/geocentric conversions
    pub const GEOGRAPHIC_GEOCENTRIC: u32 = 9602;
    /// Geocentric translations (geog2D domain)
    pub const GEOCENTRIC_TRANSLATION_GEOG2D: u32 = 9603;
    /// Position Vector transformation (geog2D domain)
    pub const POSITION_VECTOR_GEOG2D: u32 = 9606;
    /// Coordinate Frame rotation (geog2D domain)
    pub const COORDINATE_FRAME_GEOG2D: u32 = 9607;
    /// Geocentric translations (geocentric domain)
    pub const GEOCENTRIC_TRANSLATION_GEOCENTRIC: u32 = 1031;
    /// Coordinate Frame rotation (geocentric domain)
    pub const COORDINATE_FRAME_GEOCENTRIC: u32 = 1032;
    /// Position Vector transformation (geocentric domain)
    pub const POSITION_VECTOR_GEOCENTRIC: u32 = 1033;
    /// NTv2
    pub const NTV2: u32 = 9615;
    /// NADCON
    pub const NADCON: u32 = 9613;
    /// Geographic2D offsets
    pub const GEOGRAPHIC2D_OFFSETS: u32 = 9619;
    /// Vertical Offset
    pub const VERTICAL_OFFSET: u32 = 9616;
    /// Geographic3D to GravityRelatedHeight (gtx)
    pub const GEOID_GTX: u32 = 9665;
    /// Affine parametric transformation
    pub const AFFINE: u32 = 9624;
    /// Longitude rotation
    pub const LONGITUDE_ROTATION: u32 = 9601;
    /// Axis Order Reversal (2D)
    pub const AXIS_ORDER_REVERSAL_2D: u32 = 9843;
    /// Axis Order Reversal (Geographic3D horizontal)
    pub const AXIS_ORDER_REVERSAL_3D: u32 = 9844;
    /// Geographic3D to 2D conversion
    pub const GEOGRAPHIC3D_TO_2D: u32 = 9659;
    /// Change of Vertical Unit
    pub const CHANGE_OF_VERTICAL_UNIT: u32 = 1069;
}

/// EPSG 参数代码
pub mod params {
    /// Latitude of natural origin
    pub const LATITUDE_OF_ORIGIN: u32 = 8801;
    /// Longitude of natural origin
    pub const LONGITUDE_OF_ORIGIN: u32 = 8802;
    /// Scale factor at natural origin
    pub const SCALE_FACTOR: u32 = 8805;
    /// False easting
    pub const FALSE_EASTING: u32 = 8806;
    /// False northing
    pub const FALSE_NORTHING: u32 = 8807;
    /// X-axis translation
    pub const TX: u32 = 8605;
    /// Y-axis translation
    pub const TY: u32 = 8606;
    /// Z-axis translation
    pub const TZ: u32 = 8607;
    /// X-axis rotation
    pub const RX: u32 = 8608;
    /// Y-axis rotation
    pub const RY: u32 = 8609;
    /// Z-axis rotation
    pub const RZ: u32 = 8610;
    /// Scale difference
    pub const SCALE_DIFFERENCE: u32 = 8611;
    /// Latitude offset
    pub const LATITUDE_OFFSET: u32 = 8601;
    /// Longitude offset
    pub const LONGITUDE_OFFSET: u32 = 8602;
    /// Vertical Offset
    pub const VERTICAL_OFFSET: u32 = 8603;
    /// Latitude and longitude difference file
    pub const NTV2_FILE: u32 = 8656;
    /// Latitude difference file
    pub const NADCON_LATITUDE_FILE: u32 = 8657;
    /// Longitude difference file
    pub const NADCON_LONGITUDE_FILE: u32 = 8658;
    /// Geoid (height correction) model file
    pub const GEOID_FILE: u32 = 8666;
    /// A0
    pub const A0: u32 = 8623;
    /// A1
    pub const A1: u32 = 8624;
    /// A2
    pub const A2: u32 = 8625;
    /// B0
    pub const B0: u32 = 8639;
    /// B1
    pub const B1: u32 = 8640;
    /// B2
    pub const B2: u32 = 8641;
}

/// 方法的标准名称
#[must_use]
pub fn method_name(code: u32) -> Option<&'static str> {
    let name = match code {
        methods::TRANSVERSE_MERCATOR => "Transverse Mercator",
        methods::MERCATOR_A => "Mercator (variant A)",
        methods::PSEUDO_MERCATOR => "Popular Visualisation Pseudo Mercator",
        methods::GEOGRAPHIC_GEOCENTRIC => "Geographic/geocentric conversions",
        methods::GEOCENTRIC_TRANSLATION_GEOG2D => "Geocentric translations (geog2D domain)",
        methods::POSITION_VECTOR_GEOG2D => "Position Vector transformation (geog2D domain)",
        methods::COORDINATE_FRAME_GEOG2D => "Coordinate Frame rotation (geog2D domain)",
        methods::GEOCENTRIC_TRANSLATION_GEOCENTRIC => "Geocentric translations (geocentric domain)",
        methods::COORDINATE_FRAME_GEOCENTRIC => "Coordinate Frame rotation (geocentric domain)",
        methods::POSITION_VECTOR_GEOCENTRIC => "Position Vector transformation (geocentric domain)",
        methods::NTV2 => "NTv2",
        methods::NADCON => "NADCON",
        methods::GEOGRAPHIC2D_OFFSETS => "Geographic2D offsets",
        methods::VERTICAL_OFFSET => "Vertical Offset",
        methods::GEOID_GTX => "Geographic3D to GravityRelatedHeight (gtx)",
        methods::AFFINE => "Affine parametric transformation",
        methods::LONGITUDE_ROTATION => "Longitude rotation",
        methods::AXIS_ORDER_REVERSAL_2D => "Axis Order Reversal (2D)",
        methods::AXIS_ORDER_REVERSAL_3D => "Axis Order Reversal (Geographic3D horizontal)",
        methods::GEOGRAPHIC3D_TO_2D => "Geographic3D to 2D conversion",
        methods::CHANGE_OF_VERTICAL_UNIT => "Change of Vertical Unit",
        _ => return None,
    };
    Some(name)
}

/// 参数的标准名称
#[must_use]
pub fn param_name(code: u32) -> Option<&'static str> {
    let name = match code {
        params::LATITUDE_OF_ORIGIN => "Latitude of natural origin",
        params::LONGITUDE_OF_ORIGIN => "Longitude of natural origin",
        params::SCALE_FACTOR => "Scale factor at natural origin",
        params::FALSE_EASTING => "False easting",
        params::FALSE_NORTHING => "False northing",
        params::TX => "X-axis translation",
        params::TY => "Y-axis translation",
        params::TZ => "Z-axis translation",
        params::RX => "X-axis rotation",
        params::RY => "Y-axis rotation",
        params::RZ => "Z-axis rotation",
        params::SCALE_DIFFERENCE => "Scale difference",
        params::LATITUDE_OFFSET => "Latitude offset",
        params::LONGITUDE_OFFSET => "Longitude offset",
        params::VERTICAL_OFFSET => "Vertical Offset",
        params::NTV2_FILE => "Latitude and longitude difference file",
        params::NADCON_LATITUDE_FILE => "Latitude difference file",
        params::NADCON_LONGITUDE_FILE => "Longitude difference file",
        params::GEOID_FILE => "Geoid (height correction) model file",
        params::A0 => "A0",
        params::A1 => "A1",
        params::A2 => "A2",
        params::B0 => "B0",
        params::B1 => "B1",
        params::B2 => "B2",
        _ => return None,
    };
    Some(name)
}

/// 按名称反查参数代码（大小写和空白不敏感）
#[must_use]
pub fn param_code_by_name(name: &str) -> Option<u32> {
    let key = squeeze(name);
    (8600..8700)
        .chain(8800..8810)
        .find(|&c| param_name(c).is_some_and(|n| squeeze(n) == key))
        .or_else(|| match key.as_str() {
            "latitudeoforigin" | "latitudeofcenter" => Some(params::LATITUDE_OF_ORIGIN),
            "centralmeridian" | "longitudeofcenter" | "longitudeoforigin" => {
                Some(params::LONGITUDE_OF_ORIGIN)
            }
            "scalefactor" => Some(params::SCALE_FACTOR),
            _ => None,
        })
}

/// 按名称反查方法代码
#[must_use]
pub fn method_code_by_name(name: &str) -> Option<u32> {
    let key = squeeze(name);
    let by_table = [
        methods::TRANSVERSE_MERCATOR,
        methods::MERCATOR_A,
        methods::PSEUDO_MERCATOR,
        methods::GEOGRAPHIC_GEOCENTRIC,
        methods::GEOCENTRIC_TRANSLATION_GEOG2D,
        methods::POSITION_VECTOR_GEOG2D,
        methods::COORDINATE_FRAME_GEOG2D,
        methods::GEOCENTRIC_TRANSLATION_GEOCENTRIC,
        methods::COORDINATE_FRAME_GEOCENTRIC,
        methods::POSITION_VECTOR_GEOCENTRIC,
        methods::NTV2,
        methods::NADCON,
        methods::GEOGRAPHIC2D_OFFSETS,
        methods::VERTICAL_OFFSET,
        methods::GEOID_GTX,
        methods::AFFINE,
        methods::LONGITUDE_ROTATION,
        methods::AXIS_ORDER_REVERSAL_2D,
        methods::AXIS_ORDER_REVERSAL_3D,
        methods::GEOGRAPHIC3D_TO_2D,
        methods::CHANGE_OF_VERTICAL_UNIT,
    ]
    .into_iter()
    .find(|&c| method_name(c).is_some_and(|n| squeeze(n) == key));
    by_table.or_else(|| match key.as_str() {
        // WKT1 PROJECTION 名称
        "transversemercator" | "gausskruger" => Some(methods::TRANSVERSE_MERCATOR),
        "mercator1sp" | "mercator" => Some(methods::MERCATOR_A),
        "popularvisualisationpseudomercator" | "mercatorauxiliarysphere" => {
            Some(methods::PSEUDO_MERCATOR)
        }
        _ => None,
    })
}

fn squeeze(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

// ============================================================================
// 方法、参数
// ============================================================================

/// 方法标识
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    /// 名称
    pub name: String,
    /// EPSG 方法代码
    pub code: Option<u32>,
}

impl Method {
    /// 由 EPSG 代码创建（名称取标准名称）
    #[must_use]
    pub fn epsg(code: u32) -> Self {
        Self {
            name: method_name(code).unwrap_or("Unknown").to_string(),
            code: Some(code),
        }
    }

    /// 无代码的命名方法
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let code = method_code_by_name(&name);
        Self { name, code }
    }

    /// PROJ 管线方法（参数为 proj-string 文本）
    #[must_use]
    pub fn proj_pipeline() -> Self {
        Self {
            name: PROJ_PIPELINE_METHOD.to_string(),
            code: None,
        }
    }

    /// 是否为 PROJ 管线方法
    #[must_use]
    pub fn is_proj_pipeline(&self) -> bool {
        self.name == PROJ_PIPELINE_METHOD
    }
}

/// PROJ 管线方法名
pub const PROJ_PIPELINE_METHOD: &str = "PROJ-based coordinate operation";

/// 参数取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// 带单位的数值
    Measure {
        /// 数值
        value: f64,
        /// 单位
        unit: Unit,
    },
    /// 文件名（格网）
    File(String),
    /// 文本
    Text(String),
    /// 整数
    Integer(i64),
}

/// 操作参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// 名称
    pub name: String,
    /// EPSG 参数代码
    pub code: Option<u32>,
    /// 取值
    pub value: ParamValue,
}

impl Param {
    /// 按 EPSG 代码创建数值参数
    #[must_use]
    pub fn measure(code: u32, value: f64, unit: Unit) -> Self {
        Self {
            name: param_name(code).unwrap_or("Unknown").to_string(),
            code: Some(code),
            value: ParamValue::Measure { value, unit },
        }
    }

    /// 按 EPSG 代码创建文件参数
    pub fn file(code: u32, file: impl Into<String>) -> Self {
        Self {
            name: param_name(code).unwrap_or("Unknown").to_string(),
            code: Some(code),
            value: ParamValue::File(file.into()),
        }
    }

    /// 文本参数
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            value: ParamValue::Text(value.into()),
        }
    }

    /// 数值的 SI 形式
    #[must_use]
    pub fn si_value(&self) -> Option<f64> {
        match &self.value {
            ParamValue::Measure { value, unit } => Some(unit.to_si(*value)),
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::File(_) | ParamValue::Text(_) => None,
        }
    }
}

/// 单一操作：方法 + 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleOperation {
    /// 方法
    pub method: Method,
    /// 参数
    pub params: Vec<Param>,
}

impl SingleOperation {
    /// 创建
    #[must_use]
    pub fn new(method: Method, params: Vec<Param>) -> Self {
        Self { method, params }
    }

    /// 按 EPSG 参数代码查找参数
    #[must_use]
    pub fn param(&self, code: u32) -> Option<&Param> {
        self.params.iter().find(|p| {
            p.code == Some(code)
                || (p.code.is_none() && param_code_by_name(&p.name) == Some(code))
        })
    }

    /// 按代码取 SI 数值
    #[must_use]
    pub fn value(&self, code: u32) -> Option<f64> {
        self.param(code).and_then(Param::si_value)
    }

    /// 按代码取 SI 数值，缺失时返回默认值
    #[must_use]
    pub fn value_or(&self, code: u32, default: f64) -> f64 {
        self.value(code).unwrap_or(default)
    }

    /// 按代码取必需的 SI 数值
    pub fn required(&self, code: u32) -> GeoResult<f64> {
        self.value(code).ok_or_else(|| {
            GeoError::missing_parameter(
                self.method.name.clone(),
                param_name(code).unwrap_or("unknown"),
            )
        })
    }

    /// 按代码取文件名
    #[must_use]
    pub fn file(&self, code: u32) -> Option<&str> {
        match &self.param(code)?.value {
            ParamValue::File(f) | ParamValue::Text(f) => Some(f),
            _ => None,
        }
    }

    /// 按名称取文本
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.params.iter().find_map(|p| match &p.value {
            ParamValue::Text(t) if p.name == name => Some(t.as_str()),
            _ => None,
        })
    }

    /// 引用的格网文件
    #[must_use]
    pub fn grid_files(&self) -> Vec<String> {
        self.params
            .iter()
            .filter_map(|p| match &p.value {
                ParamValue::File(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// 坐标操作
// ============================================================================

/// 变换方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// 正向
    Forward,
    /// 反向
    Inverse,
}

impl Direction {
    /// 相反方向
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }
}

/// 操作种类（封闭枚举）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationKind {
    /// 坐标转换（不改变参考框架）
    Conversion(SingleOperation),
    /// 坐标变换（改变参考框架）
    Transformation(SingleOperation),
    /// 串联操作
    Concatenated(Vec<Operation>),
}

/// 坐标操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// 名称
    pub name: String,
    /// 标识符
    pub id: Option<Identifier>,
    /// 源 CRS（通用转换可为空）
    pub source_crs: Option<Arc<Crs>>,
    /// 目标 CRS
    pub target_crs: Option<Arc<Crs>>,
    /// 精度 [m]，-1 表示未知
    accuracy: f64,
    /// 使用范围
    pub area: Option<Area>,
    /// 是否已废弃
    pub deprecated: bool,
    /// 是否为 ballpark 操作
    pub ballpark: bool,
    /// 取代本操作的操作
    pub superseded_by: Vec<Identifier>,
    /// 所需格网
    pub grids: Vec<String>,
    /// 单一操作是否以反向执行
    pub inverted: bool,
    /// 种类
    pub kind: OperationKind,
}

impl Operation {
    fn base(name: String, kind: OperationKind) -> Self {
        let grids = match &kind {
            OperationKind::Conversion(s) | OperationKind::Transformation(s) => s.grid_files(),
            OperationKind::Concatenated(_) => Vec::new(),
        };
        Self {
            name,
            id: None,
            source_crs: None,
            target_crs: None,
            accuracy: UNKNOWN_ACCURACY,
            area: None,
            deprecated: false,
            ballpark: false,
            superseded_by: Vec::new(),
            grids,
            inverted: false,
            kind,
        }
    }

    /// 创建坐标转换（无端点 CRS）
    pub fn conversion(name: impl Into<String>, method: Method, params: Vec<Param>) -> Self {
        Self::base(
            name.into(),
            OperationKind::Conversion(SingleOperation::new(method, params)),
        )
    }

    /// 创建坐标变换
    pub fn transformation(
        name: impl Into<String>,
        source: Crs,
        target: Crs,
        method: Method,
        params: Vec<Param>,
        accuracy: f64,
    ) -> GeoResult<Self> {
        let mut op = Self::base(
            name.into(),
            OperationKind::Transformation(SingleOperation::new(method, params)),
        );
        op.source_crs = Some(Arc::new(source));
        op.target_crs = Some(Arc::new(target));
        op.set_accuracy(accuracy)?;
        Ok(op)
    }

    /// 串联操作，校验相邻步骤 CRS 一致
    ///
    /// 步骤 i 的目标 CRS 必须与步骤 i+1 的源 CRS 等价（忽略轴序）。
    /// 精度为各步骤之和，任一步骤未知则为未知。
    pub fn concatenated(name: impl Into<String>, steps: Vec<Operation>) -> GeoResult<Self> {
        let name = name.into();
        if steps.is_empty() {
            return Err(GeoError::invalid_operation(format!("串联操作 '{name}' 没有步骤")));
        }
        for (i, pair) in steps.windows(2).enumerate() {
            let (Some(out), Some(inp)) = (&pair[0].target_crs, &pair[1].source_crs) else {
                return Err(GeoError::invalid_operation(format!(
                    "串联操作 '{name}' 第 {i} 步与第 {} 步缺少 CRS",
                    i + 1
                )));
            };
            if !out.is_equivalent_to(inp, Criterion::EquivalentExceptAxisOrder, None) {
                return Err(GeoError::invalid_operation(format!(
                    "串联操作 '{name}' 第 {i} 步的目标 CRS '{}' 与第 {} 步的源 CRS '{}' 不一致",
                    out.name,
                    i + 1,
                    inp.name
                )));
            }
        }

        let accuracy = if steps.iter().all(Operation::has_known_accuracy) {
            steps.iter().map(|s| s.accuracy).sum()
        } else {
            UNKNOWN_ACCURACY
        };
        let area = steps
            .iter()
            .filter_map(|s| s.area.clone())
            .try_fold(None::<Area>, |acc, a| match acc {
                None => Some(Some(a)),
                Some(prev) => prev.intersection(&a).map(Some),
            })
            .flatten();
        let mut grids: Vec<String> = Vec::new();
        for g in steps.iter().flat_map(|s| s.grids.iter()) {
            if !grids.contains(g) {
                grids.push(g.clone());
            }
        }

        let mut op = Self::base(name, OperationKind::Concatenated(Vec::new()));
        op.source_crs = steps.first().and_then(|s| s.source_crs.clone());
        op.target_crs = steps.last().and_then(|s| s.target_crs.clone());
        op.accuracy = accuracy;
        op.area = area;
        op.ballpark = steps.iter().any(|s| s.ballpark);
        op.deprecated = steps.iter().any(|s| s.deprecated);
        op.grids = grids;
        op.kind = OperationKind::Concatenated(steps);
        Ok(op)
    }

    // ------------------------------------------------------------------------
    // 构建器
    // ------------------------------------------------------------------------

    /// 设置标识符
    #[must_use]
    pub fn with_id(mut self, id: Identifier) -> Self {
        self.id = Some(id);
        self
    }

    /// 设置使用范围
    #[must_use]
    pub fn with_area(mut self, area: Area) -> Self {
        self.area = Some(area);
        self
    }

    /// 设置端点 CRS
    #[must_use]
    pub fn with_crs(mut self, source: Option<Crs>, target: Option<Crs>) -> Self {
        self.source_crs = source.map(Arc::new);
        self.target_crs = target.map(Arc::new);
        self
    }

    /// 精度 [m]，-1 表示未知
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// 设置精度（非负或 -1）
    pub fn set_accuracy(&mut self, accuracy: f64) -> GeoResult<()> {
        if !(accuracy >= 0.0 || accuracy == UNKNOWN_ACCURACY) {
            return Err(GeoError::invalid_operation(format!(
                "精度必须为非负数或 -1，实际为 {accuracy}"
            )));
        }
        self.accuracy = accuracy;
        Ok(())
    }

    /// 标记为精确操作（精度 0）
    #[must_use]
    pub fn exact(mut self) -> Self {
        self.accuracy = 0.0;
        self
    }

    /// 标记为 ballpark
    #[must_use]
    pub fn as_ballpark(mut self) -> Self {
        self.ballpark = true;
        self.accuracy = UNKNOWN_ACCURACY;
        self
    }

    // ------------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------------

    /// 是否为 ballpark 操作（结果可能只是近似）
    #[inline]
    #[must_use]
    pub fn is_ballpark(&self) -> bool {
        self.ballpark
    }

    /// 精度是否已知
    #[inline]
    #[must_use]
    pub fn has_known_accuracy(&self) -> bool {
        self.accuracy >= 0.0
    }

    /// 是否为坐标转换
    #[must_use]
    pub fn is_conversion(&self) -> bool {
        matches!(self.kind, OperationKind::Conversion(_))
    }

    /// 是否为串联操作
    #[must_use]
    pub fn is_concatenated(&self) -> bool {
        matches!(self.kind, OperationKind::Concatenated(_))
    }

    /// 串联步骤（单一操作返回空切片）
    #[must_use]
    pub fn steps(&self) -> &[Operation] {
        match &self.kind {
            OperationKind::Concatenated(steps) => steps,
            _ => &[],
        }
    }

    /// 单一操作的方法与参数
    #[must_use]
    pub fn single(&self) -> Option<&SingleOperation> {
        match &self.kind {
            OperationKind::Conversion(s) | OperationKind::Transformation(s) => Some(s),
            OperationKind::Concatenated(_) => None,
        }
    }

    /// 是否需要格网
    #[must_use]
    pub fn requires_grids(&self) -> bool {
        !self.grids.is_empty()
    }

    /// 是否被指定标识符的操作取代
    #[must_use]
    pub fn is_superseded_by(&self, id: &Identifier) -> bool {
        self.superseded_by.contains(id)
    }

    // ------------------------------------------------------------------------
    // 派生操作
    // ------------------------------------------------------------------------

    /// 反向操作：交换端点，串联操作逆序并逐步取反
    #[must_use]
    pub fn inverse(&self) -> Operation {
        let mut inv = self.clone();
        std::mem::swap(&mut inv.source_crs, &mut inv.target_crs);
        inv.name = match self.name.strip_prefix("Inverse of ") {
            Some(original) => original.to_string(),
            None => format!("Inverse of {}", self.name),
        };
        // 反向后不再对应原标识符
        inv.id = None;
        inv.superseded_by.clear();
        match &mut inv.kind {
            OperationKind::Concatenated(steps) => {
                let reversed: Vec<Operation> = steps.iter().rev().map(Operation::inverse).collect();
                *steps = reversed;
            }
            OperationKind::Conversion(_) | OperationKind::Transformation(_) => {
                inv.inverted = !self.inverted;
            }
        }
        inv
    }

    /// 可视化归一化：端点 CRS 改为东向在前
    ///
    /// 执行器据此在编译时插入轴交换步骤。
    #[must_use]
    pub fn normalize_for_visualization(&self) -> Operation {
        let mut op = self.clone();
        op.source_crs = self.source_crs.as_ref().map(|c| Arc::new(c.east_first()));
        op.target_crs = self.target_crs.as_ref().map(|c| Arc::new(c.east_first()));
        if let OperationKind::Concatenated(steps) = &mut op.kind {
            if let Some(first) = steps.first_mut() {
                first.source_crs = op.source_crs.clone();
            }
            if let Some(last) = steps.last_mut() {
                last.target_crs = op.target_crs.clone();
            }
        }
        op
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(id) = &self.id {
            write!(f, " ({id})")?;
        }
        Ok(())
    }
}

// ============================================================================
// 常用转换
// ============================================================================

impl Operation {
    /// 横轴墨卡托转换
    #[must_use]
    pub fn transverse_mercator(
        name: impl Into<String>,
        lat_0: f64,
        lon_0: f64,
        k_0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self::conversion(
            name,
            Method::epsg(methods::TRANSVERSE_MERCATOR),
            vec![
                Param::measure(params::LATITUDE_OF_ORIGIN, lat_0, Unit::DEGREE),
                Param::measure(params::LONGITUDE_OF_ORIGIN, lon_0, Unit::DEGREE),
                Param::measure(params::SCALE_FACTOR, k_0, Unit::UNITY),
                Param::measure(params::FALSE_EASTING, false_easting, Unit::METRE),
                Param::measure(params::FALSE_NORTHING, false_northing, Unit::METRE),
            ],
        )
    }

    /// UTM 带转换
    pub fn utm(zone: u8, south: bool) -> GeoResult<Self> {
        if !(1..=60).contains(&zone) {
            return Err(GeoError::coordinate_out_of_range(
                "UTM带号",
                f64::from(zone),
                1.0,
                60.0,
            ));
        }
        let lon_0 = f64::from(zone) * 6.0 - 183.0;
        let hemisphere = if south { 'S' } else { 'N' };
        let mut op = Self::transverse_mercator(
            format!("UTM zone {zone}{hemisphere}"),
            0.0,
            lon_0,
            0.9996,
            500_000.0,
            if south { 10_000_000.0 } else { 0.0 },
        );
        let code_base = if south { 17000 } else { 16000 };
        op.id = Some(Identifier::epsg(code_base + u32::from(zone)));
        Ok(op)
    }

    /// 墨卡托 A 变体
    #[must_use]
    pub fn mercator_a(
        name: impl Into<String>,
        lon_0: f64,
        k_0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self::conversion(
            name,
            Method::epsg(methods::MERCATOR_A),
            vec![
                Param::measure(params::LATITUDE_OF_ORIGIN, 0.0, Unit::DEGREE),
                Param::measure(params::LONGITUDE_OF_ORIGIN, lon_0, Unit::DEGREE),
                Param::measure(params::SCALE_FACTOR, k_0, Unit::UNITY),
                Param::measure(params::FALSE_EASTING, false_easting, Unit::METRE),
                Param::measure(params::FALSE_NORTHING, false_northing, Unit::METRE),
            ],
        )
    }

    /// Web 墨卡托
    #[must_use]
    pub fn pseudo_mercator() -> Self {
        let mut op = Self::conversion(
            "Popular Visualisation Pseudo-Mercator",
            Method::epsg(methods::PSEUDO_MERCATOR),
            vec![
                Param::measure(params::LATITUDE_OF_ORIGIN, 0.0, Unit::DEGREE),
                Param::measure(params::LONGITUDE_OF_ORIGIN, 0.0, Unit::DEGREE),
                Param::measure(params::FALSE_EASTING, 0.0, Unit::METRE),
                Param::measure(params::FALSE_NORTHING, 0.0, Unit::METRE),
            ],
        );
        op.id = Some(Identifier::epsg(3856));
        op
    }

    /// Helmert 七参数变换参数表
    ///
    /// 平移单位为米，旋转为角秒，尺度为 ppm。
    #[must_use]
    pub fn helmert_params(t: [f64; 3], r: [f64; 3], ds_ppm: f64) -> Vec<Param> {
        vec![
            Param::measure(params::TX, t[0], Unit::METRE),
            Param::measure(params::TY, t[1], Unit::METRE),
            Param::measure(params::TZ, t[2], Unit::METRE),
            Param::measure(params::RX, r[0], Unit::ARC_SECOND),
            Param::measure(params::RY, r[1], Unit::ARC_SECOND),
            Param::measure(params::RZ, r[2], Unit::ARC_SECOND),
            Param::measure(params::SCALE_DIFFERENCE, ds_ppm, Unit::PARTS_PER_MILLION),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cs::CoordinateSystem;
    use crate::datum::{Datum, GeodeticFrame, PrimeMeridian};
    use crate::ellipsoid::Ellipsoid;

    #[test]
    fn test_utm_conversion_params() {
        let op = Operation::utm(32, false).unwrap();
        let single = op.single().unwrap();
        assert_eq!(single.method.code, Some(methods::TRANSVERSE_MERCATOR));
        assert!((single.value(params::LONGITUDE_OF_ORIGIN).unwrap().to_degrees() - 9.0).abs() < 1e-12);
        assert!((single.value(params::SCALE_FACTOR).unwrap() - 0.9996).abs() < 1e-15);
        assert_eq!(op.id, Some(Identifier::epsg(16032)));
        assert!(Operation::utm(61, false).is_err());
    }

    #[test]
    fn test_accuracy_invariant() {
        let mut op = Operation::pseudo_mercator();
        assert!(op.set_accuracy(-0.5).is_err());
        assert!(op.set_accuracy(f64::NAN).is_err());
        assert!(op.set_accuracy(-1.0).is_ok());
        assert!(op.set_accuracy(0.0).is_ok());
        assert!(op.has_known_accuracy());
    }

    fn geographic(name: &str, frame: &str, ellipsoid: Ellipsoid, code: u32) -> Crs {
        let frame = GeodeticFrame::new(frame, ellipsoid, PrimeMeridian::greenwich());
        Crs::geographic_2d(name, Datum::Geodetic(frame), CoordinateSystem::ellipsoidal_2d_lat_lon(&Unit::DEGREE))
            .with_id(Identifier::epsg(code))
    }

    fn translation(name: &str, source: &Crs, target: &Crs, accuracy: f64) -> Operation {
        Operation::transformation(
            name,
            source.clone(),
            target.clone(),
            Method::epsg(methods::GEOCENTRIC_TRANSLATION_GEOG2D),
            Vec::new(),
            accuracy,
        )
        .unwrap()
    }

    #[test]
    fn test_concatenated_rejects_mismatched_steps() {
        let wgs84 = Crs::wgs84();
        let etrs89 = geographic("ETRS89", "European Terrestrial Reference System 1989", Ellipsoid::GRS80, 4258);
        let ed50 = geographic("ED50", "European Datum 1950", Ellipsoid::INTERNATIONAL_1924, 4230);
        let rgf93 = geographic("RGF93 v1", "Reseau Geodesique Francais 1993 v1", Ellipsoid::GRS80, 4171);

        let a = translation("WGS 84 to ETRS89", &wgs84, &etrs89, 1.0);
        let b = translation("ED50 to RGF93 v1", &ed50, &rgf93, 1.0);
        assert!(Operation::concatenated("a + b", vec![a.clone(), b]).is_err());

        // 缺少 CRS 的步骤同样无法校验
        let bare = Operation::pseudo_mercator();
        assert!(Operation::concatenated("a + bare", vec![a, bare]).is_err());
    }

    #[test]
    fn test_concatenated_accepts_axis_order_difference() {
        let etrs89 = geographic("ETRS89", "European Terrestrial Reference System 1989", Ellipsoid::GRS80, 4258);
        let ed50 = geographic("ED50", "European Datum 1950", Ellipsoid::INTERNATIONAL_1924, 4230);
        let rgf93 = geographic("RGF93 v1", "Reseau Geodesique Francais 1993 v1", Ellipsoid::GRS80, 4171);

        let first = translation("ED50 to ETRS89", &ed50, &etrs89, 1.0);
        let second = translation("ETRS89 to RGF93 v1", &etrs89.east_first(), &rgf93, 0.5);
        let op = Operation::concatenated("ED50 to RGF93 v1", vec![first, second]).unwrap();

        assert!(op.is_concatenated());
        assert_eq!(op.steps().len(), 2);
        assert_eq!(op.source_crs.as_ref().and_then(|c| c.id.clone()), Some(Identifier::epsg(4230)));
        assert_eq!(op.target_crs.as_ref().and_then(|c| c.id.clone()), Some(Identifier::epsg(4171)));
        assert!((op.accuracy() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_param_lookup_by_name() {
        let single = SingleOperation::new(
            Method::named("Transverse_Mercator"),
            vec![Param {
                name: "central_meridian".into(),
                code: None,
                value: ParamValue::Measure {
                    value: 117.0,
                    unit: Unit::DEGREE,
                },
            }],
        );
        assert_eq!(single.method.code, Some(methods::TRANSVERSE_MERCATOR));
        assert!((single.value(params::LONGITUDE_OF_ORIGIN).unwrap().to_degrees() - 117.0).abs() < 1e-12);
        assert!(single.required(params::SCALE_FACTOR).is_err());
    }

    #[test]
    fn test_helmert_units() {
        let p = Operation::helmert_params([1.0, 2.0, 3.0], [1.0, 0.0, 0.0], 2.0);
        let single = SingleOperation::new(Method::epsg(methods::POSITION_VECTOR_GEOG2D), p);
        assert!((single.value(params::RX).unwrap() - 4.848_136_811_095_36e-6).abs() < 1e-18);
        assert!((single.value(params::SCALE_DIFFERENCE).unwrap() - 2e-6).abs() < 1e-18);
    }

    #[test]
    fn test_inverse_name_and_flag() {
        let op = Operation::utm(33, true).unwrap();
        let inv = op.inverse();
        assert_eq!(inv.name, "Inverse of UTM zone 33S");
        assert!(inv.inverted);
        let back = inv.inverse();
        assert_eq!(back.name, "UTM zone 33S");
        assert!(!back.inverted);
    }

    #[test]
    fn test_grid_files_collected() {
        let op = Operation::conversion(
            "NTv2 shift",
            Method::epsg(methods::NTV2),
            vec![Param::file(params::NTV2_FILE, "ntv2_0.gsb")],
        );
        assert!(op.requires_grids());
        assert_eq!(op.grids, vec!["ntv2_0.gsb".to_string()]);
    }

    #[test]
    fn test_empty_concatenation_rejected() {
        assert!(Operation::concatenated("empty", Vec::new()).is_err());
    }
}
