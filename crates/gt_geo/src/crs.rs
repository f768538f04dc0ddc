// crates/gt_geo/src/crs.rs
//! 坐标参考系统 (CRS) 模型
//!
//! CRS 种类是封闭枚举 [`CrsKind`]：地理 2D/3D、地心、投影、垂直、复合、
//! 绑定、工程、时间和其它。投影 CRS 拥有基础地理 CRS 与一个坐标转换。
//!
//! # 示例
//!
//! ```
//! use gt_geo::crs::Crs;
//!
//! let wgs84 = Crs::wgs84();
//! assert!(wgs84.is_geographic());
//!
//! let utm = Crs::utm_zone(50, true).unwrap();
//! assert!(utm.is_projected());
//! assert!(utm.validate().is_ok());
//! ```

use crate::area::Area;
use crate::compare::{self, AliasResolver, Criterion};
use crate::cs::{AxisInfo, AxisDirection, CoordinateSystem, CsKind};
use crate::datum::{Datum, GeodeticFrame, PrimeMeridian, VerticalFrame};
use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, GeoResult};
use crate::identifier::Identifier;
use crate::operation::{Operation, OperationKind};
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CRS 种类
// ============================================================================

/// CRS 类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsType {
    /// 二维地理
    Geographic2D,
    /// 三维地理
    Geographic3D,
    /// 地心
    Geocentric,
    /// 投影
    Projected,
    /// 垂直
    Vertical,
    /// 复合
    Compound,
    /// 绑定
    Bound,
    /// 工程
    Engineering,
    /// 时间
    Temporal,
    /// 其它
    Other,
}

/// CRS 种类（封闭枚举）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrsKind {
    /// 二维地理 CRS
    Geographic2D {
        /// 大地基准
        datum: Datum,
        /// 椭球坐标系（2 轴）
        cs: CoordinateSystem,
    },
    /// 三维地理 CRS
    Geographic3D {
        /// 大地基准
        datum: Datum,
        /// 椭球坐标系（3 轴）
        cs: CoordinateSystem,
    },
    /// 地心 CRS
    Geocentric {
        /// 大地基准
        datum: Datum,
        /// 笛卡尔坐标系（3 轴）
        cs: CoordinateSystem,
    },
    /// 投影 CRS
    Projected {
        /// 基础地理 CRS
        base: Box<Crs>,
        /// 投影转换
        conversion: Box<Operation>,
        /// 笛卡尔坐标系
        cs: CoordinateSystem,
    },
    /// 垂直 CRS
    Vertical {
        /// 垂直基准
        datum: Datum,
        /// 垂直坐标系（1 轴）
        cs: CoordinateSystem,
        /// 大地水准面格网（到椭球高）
        geoid_grids: Vec<String>,
    },
    /// 复合 CRS
    Compound {
        /// 有序分量
        components: Vec<Crs>,
    },
    /// 绑定 CRS：带有到枢纽 CRS 的变换
    Bound {
        /// 基础 CRS
        base: Box<Crs>,
        /// 枢纽 CRS
        hub: Box<Crs>,
        /// 基础 -> 枢纽 的变换
        transformation: Box<Operation>,
    },
    /// 工程 CRS
    Engineering {
        /// 工程基准
        datum: Datum,
        /// 坐标系
        cs: CoordinateSystem,
    },
    /// 时间 CRS
    Temporal {
        /// 时间基准
        datum: Datum,
        /// 时间坐标系（1 轴）
        cs: CoordinateSystem,
    },
    /// 其它
    Other {
        /// 坐标系
        cs: Option<CoordinateSystem>,
    },
}

/// 坐标参考系统
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    /// 名称
    pub name: String,
    /// 标识符（匿名 CRS 为 `None`）
    pub id: Option<Identifier>,
    /// 使用范围
    pub area: Option<Area>,
    /// 是否已废弃
    pub deprecated: bool,
    /// 备注
    pub remarks: Option<String>,
    /// 种类
    pub kind: CrsKind,
}

// ============================================================================
// 构造
// ============================================================================

impl Crs {
    /// 由名称和种类创建匿名 CRS
    pub fn new(name: impl Into<String>, kind: CrsKind) -> Self {
        Self {
            name: name.into(),
            id: None,
            area: None,
            deprecated: false,
            remarks: None,
            kind,
        }
    }

    /// 二维地理 CRS
    pub fn geographic_2d(name: impl Into<String>, datum: Datum, cs: CoordinateSystem) -> Self {
        Self::new(name, CrsKind::Geographic2D { datum, cs })
    }

    /// 三维地理 CRS
    pub fn geographic_3d(name: impl Into<String>, datum: Datum, cs: CoordinateSystem) -> Self {
        Self::new(name, CrsKind::Geographic3D { datum, cs })
    }

    /// 地心 CRS
    pub fn geocentric(name: impl Into<String>, datum: Datum) -> Self {
        Self::new(
            name,
            CrsKind::Geocentric {
                datum,
                cs: CoordinateSystem::geocentric(),
            },
        )
    }

    /// 投影 CRS
    pub fn projected(
        name: impl Into<String>,
        base: Crs,
        conversion: Operation,
        cs: CoordinateSystem,
    ) -> Self {
        Self::new(
            name,
            CrsKind::Projected {
                base: Box::new(base),
                conversion: Box::new(conversion),
                cs,
            },
        )
    }

    /// 垂直 CRS
    pub fn vertical(name: impl Into<String>, frame: VerticalFrame, unit: &Unit) -> Self {
        Self::new(
            name,
            CrsKind::Vertical {
                datum: Datum::Vertical(frame),
                cs: CoordinateSystem::vertical_up(unit),
                geoid_grids: Vec::new(),
            },
        )
    }

    /// 复合 CRS
    pub fn compound(name: impl Into<String>, components: Vec<Crs>) -> Self {
        Self::new(name, CrsKind::Compound { components })
    }

    /// 绑定 CRS，名称取基础 CRS 的名称
    #[must_use]
    pub fn bound(base: Crs, hub: Crs, transformation: Operation) -> Self {
        let name = base.name.clone();
        let area = base.area.clone();
        let mut crs = Self::new(
            name,
            CrsKind::Bound {
                base: Box::new(base),
                hub: Box::new(hub),
                transformation: Box::new(transformation),
            },
        );
        crs.area = area;
        crs
    }

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

    // ------------------------------------------------------------------------
    // 常用 CRS
    // ------------------------------------------------------------------------

    /// WGS 84 (EPSG:4326)，纬度在前
    #[must_use]
    pub fn wgs84() -> Self {
        Self::geographic_2d(
            "WGS 84",
            Datum::Geodetic(GeodeticFrame::wgs84()),
            CoordinateSystem::ellipsoidal_2d_lat_lon(&Unit::DEGREE),
        )
        .with_id(Identifier::epsg(4326))
        .with_area(Area::world())
    }

    /// WGS 84 三维 (EPSG:4979)
    #[must_use]
    pub fn wgs84_3d() -> Self {
        Self::geographic_3d(
            "WGS 84",
            Datum::Geodetic(GeodeticFrame::wgs84()),
            CoordinateSystem::ellipsoidal_3d_lat_lon_h(&Unit::DEGREE, &Unit::METRE),
        )
        .with_id(Identifier::epsg(4979))
        .with_area(Area::world())
    }

    /// WGS 84 地心 (EPSG:4978)
    #[must_use]
    pub fn wgs84_geocentric() -> Self {
        Self::geocentric("WGS 84", Datum::Geodetic(GeodeticFrame::wgs84()))
            .with_id(Identifier::epsg(4978))
            .with_area(Area::world())
    }

    /// CGCS2000 (EPSG:4490)
    #[must_use]
    pub fn cgcs2000() -> Self {
        let mut frame = GeodeticFrame::new(
            "China 2000",
            Ellipsoid::CGCS2000,
            PrimeMeridian::greenwich(),
        );
        frame.id = Some(Identifier::epsg(1043));
        Self::geographic_2d(
            "China Geodetic Coordinate System 2000",
            Datum::Geodetic(frame),
            CoordinateSystem::ellipsoidal_2d_lat_lon(&Unit::DEGREE),
        )
        .with_id(Identifier::epsg(4490))
    }

    /// WGS 84 上的 UTM 投影（EPSG:326xx / 327xx）
    pub fn utm_zone(zone: u8, north: bool) -> GeoResult<Self> {
        let conversion = Operation::utm(zone, !north)?;
        let code_base = if north { 32600 } else { 32700 };
        let code = code_base + u32::from(zone);
        let hemisphere = if north { 'N' } else { 'S' };
        Ok(Self::projected(
            format!("WGS 84 / UTM zone {zone}{hemisphere}"),
            Self::wgs84(),
            conversion,
            CoordinateSystem::cartesian_en(&Unit::METRE),
        )
        .with_id(Identifier::epsg(code)))
    }

    /// 由经纬度（度）计算所在 UTM 带
    pub fn auto_utm(lon: f64, lat: f64) -> GeoResult<Self> {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::coordinate_out_of_range("经度", lon, -180.0, 180.0));
        }
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60);
        Self::utm_zone(zone as u8, lat >= 0.0)
    }

    /// Web 墨卡托 (EPSG:3857)
    #[must_use]
    pub fn web_mercator() -> Self {
        Self::projected(
            "WGS 84 / Pseudo-Mercator",
            Self::wgs84(),
            Operation::pseudo_mercator(),
            CoordinateSystem::cartesian_en(&Unit::METRE),
        )
        .with_id(Identifier::epsg(3857))
        .with_area(Area {
            west: -180.0,
            south: -85.06,
            east: 180.0,
            north: 85.06,
            name: Some("World between 85.06°S and 85.06°N".to_string()),
        })
    }

    /// CGCS2000 高斯-克吕格 3 度带（中央经线 = 3 × 带号）
    ///
    /// 带号 25-45 有 EPSG 代码 (4534-4554)，其它带号为匿名 CRS。
    pub fn gauss_kruger_3(zone: u8) -> GeoResult<Self> {
        if !(1..=120).contains(&zone) {
            return Err(GeoError::coordinate_out_of_range(
                "高斯-克吕格3度带号",
                f64::from(zone),
                1.0,
                120.0,
            ));
        }
        let cm = f64::from(zone) * 3.0;
        let code = (25..=45)
            .contains(&zone)
            .then(|| 4534 + u32::from(zone - 25));
        Ok(Self::gauss_kruger(cm, code))
    }

    /// CGCS2000 高斯-克吕格 6 度带（中央经线 = 6 × 带号 - 3）
    ///
    /// 带号 13-23 有 EPSG 代码 (4502-4512)。
    pub fn gauss_kruger_6(zone: u8) -> GeoResult<Self> {
        if !(1..=60).contains(&zone) {
            return Err(GeoError::coordinate_out_of_range(
                "高斯-克吕格6度带号",
                f64::from(zone),
                1.0,
                60.0,
            ));
        }
        let cm = f64::from(zone) * 6.0 - 3.0;
        let code = (13..=23)
            .contains(&zone)
            .then(|| 4502 + u32::from(zone - 13));
        Ok(Self::gauss_kruger(cm, code))
    }

    fn gauss_kruger(cm: f64, code: Option<u32>) -> Self {
        let name = format!("CGCS2000 / Gauss-Kruger CM {cm}E");
        let conversion =
            Operation::transverse_mercator(format!("Gauss-Kruger CM {cm}E"), 0.0, cm, 1.0, 500_000.0, 0.0);
        let mut crs = Self::projected(
            name,
            Self::cgcs2000(),
            conversion,
            CoordinateSystem::cartesian_ne(&Unit::METRE),
        );
        crs.id = code.map(Identifier::epsg);
        crs
    }
}

// ============================================================================
// 查询
// ============================================================================

impl Crs {
    /// 类型标签
    #[must_use]
    pub fn crs_type(&self) -> CrsType {
        match &self.kind {
            CrsKind::Geographic2D { .. } => CrsType::Geographic2D,
            CrsKind::Geographic3D { .. } => CrsType::Geographic3D,
            CrsKind::Geocentric { .. } => CrsType::Geocentric,
            CrsKind::Projected { .. } => CrsType::Projected,
            CrsKind::Vertical { .. } => CrsType::Vertical,
            CrsKind::Compound { .. } => CrsType::Compound,
            CrsKind::Bound { .. } => CrsType::Bound,
            CrsKind::Engineering { .. } => CrsType::Engineering,
            CrsKind::Temporal { .. } => CrsType::Temporal,
            CrsKind::Other { .. } => CrsType::Other,
        }
    }

    /// 是否为地理 CRS（2D 或 3D）
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        matches!(
            self.kind,
            CrsKind::Geographic2D { .. } | CrsKind::Geographic3D { .. }
        )
    }

    /// 是否为投影 CRS
    #[must_use]
    pub fn is_projected(&self) -> bool {
        matches!(self.kind, CrsKind::Projected { .. })
    }

    /// 是否为地心 CRS
    #[must_use]
    pub fn is_geocentric(&self) -> bool {
        matches!(self.kind, CrsKind::Geocentric { .. })
    }

    /// 是否为垂直 CRS
    #[must_use]
    pub fn is_vertical(&self) -> bool {
        matches!(self.kind, CrsKind::Vertical { .. })
    }

    /// 是否为复合 CRS
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self.kind, CrsKind::Compound { .. })
    }

    /// 是否为绑定 CRS
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self.kind, CrsKind::Bound { .. })
    }

    /// 自身基准（投影/绑定/复合 CRS 返回 `None`）
    #[must_use]
    pub fn datum(&self) -> Option<&Datum> {
        match &self.kind {
            CrsKind::Geographic2D { datum, .. }
            | CrsKind::Geographic3D { datum, .. }
            | CrsKind::Geocentric { datum, .. }
            | CrsKind::Vertical { datum, .. }
            | CrsKind::Engineering { datum, .. }
            | CrsKind::Temporal { datum, .. } => Some(datum),
            CrsKind::Projected { .. }
            | CrsKind::Compound { .. }
            | CrsKind::Bound { .. }
            | CrsKind::Other { .. } => None,
        }
    }

    /// 自身坐标系（复合/绑定 CRS 返回 `None`）
    #[must_use]
    pub fn cs(&self) -> Option<&CoordinateSystem> {
        match &self.kind {
            CrsKind::Geographic2D { cs, .. }
            | CrsKind::Geographic3D { cs, .. }
            | CrsKind::Geocentric { cs, .. }
            | CrsKind::Projected { cs, .. }
            | CrsKind::Vertical { cs, .. }
            | CrsKind::Engineering { cs, .. }
            | CrsKind::Temporal { cs, .. } => Some(cs),
            CrsKind::Other { cs } => cs.as_ref(),
            CrsKind::Compound { .. } | CrsKind::Bound { .. } => None,
        }
    }

    /// 底层大地 CRS（地理或地心）
    ///
    /// 投影 CRS 返回其基础 CRS，绑定 CRS 返回其基础的大地 CRS，复合 CRS 返回首个分量的大地 CRS。
    #[must_use]
    pub fn geodetic_crs(&self) -> Option<&Crs> {
        match &self.kind {
            CrsKind::Geographic2D { .. } | CrsKind::Geographic3D { .. } | CrsKind::Geocentric { .. } => {
                Some(self)
            }
            CrsKind::Projected { base, .. } | CrsKind::Bound { base, .. } => base.geodetic_crs(),
            CrsKind::Compound { components } => components.first().and_then(Crs::geodetic_crs),
            _ => None,
        }
    }

    /// 水平大地基准
    #[must_use]
    pub fn horizontal_datum(&self) -> Option<&Datum> {
        self.geodetic_crs().and_then(Crs::datum)
    }

    /// 椭球体
    #[must_use]
    pub fn ellipsoid(&self) -> Option<&Ellipsoid> {
        self.horizontal_datum().and_then(Datum::ellipsoid)
    }

    /// 维度
    #[must_use]
    pub fn dimension(&self) -> usize {
        match &self.kind {
            CrsKind::Compound { components } => components.iter().map(Crs::dimension).sum(),
            CrsKind::Bound { base, .. } => base.dimension(),
            _ => self.cs().map_or(0, CoordinateSystem::dimension),
        }
    }

    /// 投影 CRS 的转换
    #[must_use]
    pub fn conversion(&self) -> Option<&Operation> {
        match &self.kind {
            CrsKind::Projected { conversion, .. } => Some(conversion),
            _ => None,
        }
    }

    /// 复合 CRS 的垂直分量
    #[must_use]
    pub fn vertical_component(&self) -> Option<&Crs> {
        match &self.kind {
            CrsKind::Compound { components } => components.iter().find_map(|c| match &c.kind {
                CrsKind::Vertical { .. } => Some(c),
                CrsKind::Bound { base, .. } if base.is_vertical() => Some(c),
                _ => None,
            }),
            CrsKind::Vertical { .. } => Some(self),
            _ => None,
        }
    }

    /// 复合 CRS 的水平分量
    #[must_use]
    pub fn horizontal_component(&self) -> Option<&Crs> {
        match &self.kind {
            CrsKind::Compound { components } => components.first(),
            _ => Some(self),
        }
    }

    /// 地理 CRS 升为三维（保留轴序，追加椭球高）
    #[must_use]
    pub fn to_geographic_3d(&self) -> Option<Crs> {
        match &self.kind {
            CrsKind::Geographic3D { .. } => Some(self.clone()),
            CrsKind::Geographic2D { datum, cs } => {
                let mut axes = cs.axes.clone();
                axes.push(AxisInfo::new(
                    "Ellipsoidal height",
                    "h",
                    AxisDirection::Up,
                    Unit::METRE,
                ));
                let mut crs = Crs::geographic_3d(
                    self.name.clone(),
                    datum.clone(),
                    CoordinateSystem::new(CsKind::Ellipsoidal, axes),
                );
                crs.area = self.area.clone();
                Some(crs)
            }
            _ => None,
        }
    }

    /// 东向在前的变体（用于可视化）
    #[must_use]
    pub fn east_first(&self) -> Crs {
        let mut crs = self.clone();
        match &mut crs.kind {
            CrsKind::Geographic2D { cs, .. }
            | CrsKind::Geographic3D { cs, .. }
            | CrsKind::Projected { cs, .. }
            | CrsKind::Engineering { cs, .. } => *cs = cs.east_first(),
            CrsKind::Compound { components } => {
                for c in components.iter_mut() {
                    *c = c.east_first();
                }
            }
            CrsKind::Bound { base, .. } => **base = base.east_first(),
            CrsKind::Geocentric { .. }
            | CrsKind::Vertical { .. }
            | CrsKind::Temporal { .. }
            | CrsKind::Other { .. } => {}
        }
        crs
    }

    /// 等价比较
    #[must_use]
    pub fn is_equivalent_to(
        &self,
        other: &Crs,
        criterion: Criterion,
        resolver: Option<&dyn AliasResolver>,
    ) -> bool {
        compare::crs_equivalent(self, other, criterion, resolver)
    }
}

// ============================================================================
// 校验
// ============================================================================

impl Crs {
    /// 校验结构不变量
    ///
    /// 坐标轴数量与类别必须符合 CRS 种类，椭球参数必须有效。
    pub fn validate(&self) -> GeoResult<()> {
        match &self.kind {
            CrsKind::Geographic2D { datum, cs } => {
                self.check_geodetic_datum(datum)?;
                self.check_cs(cs, CsKind::Ellipsoidal, &[2])
            }
            CrsKind::Geographic3D { datum, cs } => {
                self.check_geodetic_datum(datum)?;
                self.check_cs(cs, CsKind::Ellipsoidal, &[3])
            }
            CrsKind::Geocentric { datum, cs } => {
                self.check_geodetic_datum(datum)?;
                self.check_cs(cs, CsKind::Cartesian, &[3])
            }
            CrsKind::Projected {
                base,
                conversion,
                cs,
            } => {
                if !base.is_geographic() {
                    return Err(GeoError::invalid_crs(format!(
                        "投影 CRS '{}' 的基础 CRS 必须为地理 CRS",
                        self.name
                    )));
                }
                base.validate()?;
                if !matches!(conversion.kind, OperationKind::Conversion(_)) {
                    return Err(GeoError::invalid_crs(format!(
                        "投影 CRS '{}' 的定义操作必须为坐标转换",
                        self.name
                    )));
                }
                self.check_cs(cs, CsKind::Cartesian, &[2, 3])
            }
            CrsKind::Vertical { datum, cs, .. } => {
                if !datum.is_vertical() {
                    return Err(GeoError::invalid_crs(format!(
                        "垂直 CRS '{}' 需要垂直基准",
                        self.name
                    )));
                }
                self.check_cs(cs, CsKind::Vertical, &[1])
            }
            CrsKind::Compound { components } => {
                if components.len() < 2 {
                    return Err(GeoError::invalid_crs(format!(
                        "复合 CRS '{}' 至少需要两个分量",
                        self.name
                    )));
                }
                if components.iter().any(Crs::is_compound) {
                    return Err(GeoError::invalid_crs(format!(
                        "复合 CRS '{}' 不能嵌套复合 CRS",
                        self.name
                    )));
                }
                components.iter().try_for_each(Crs::validate)
            }
            CrsKind::Bound {
                base,
                hub,
                transformation,
            } => {
                if base.is_bound() {
                    return Err(GeoError::invalid_crs(format!(
                        "绑定 CRS '{}' 的基础不能为绑定 CRS",
                        self.name
                    )));
                }
                base.validate()?;
                hub.validate()?;
                if transformation.is_concatenated() {
                    return Err(GeoError::invalid_crs(format!(
                        "绑定 CRS '{}' 的变换必须为单一操作",
                        self.name
                    )));
                }
                Ok(())
            }
            CrsKind::Engineering { cs, .. } => {
                if cs.axes.is_empty() {
                    return Err(GeoError::invalid_crs(format!(
                        "工程 CRS '{}' 没有坐标轴",
                        self.name
                    )));
                }
                Ok(())
            }
            CrsKind::Temporal { cs, .. } => self.check_cs(cs, CsKind::Temporal, &[1]),
            CrsKind::Other { .. } => Ok(()),
        }
    }

    fn check_geodetic_datum(&self, datum: &Datum) -> GeoResult<()> {
        let ellipsoid = datum.ellipsoid().ok_or_else(|| {
            GeoError::invalid_crs(format!("CRS '{}' 需要大地基准", self.name))
        })?;
        ellipsoid.validate()
    }

    fn check_cs(&self, cs: &CoordinateSystem, kind: CsKind, dims: &[usize]) -> GeoResult<()> {
        if cs.kind != kind {
            return Err(GeoError::invalid_crs(format!(
                "CRS '{}' 的坐标系类别应为 {kind}，实际为 {}",
                self.name, cs.kind
            )));
        }
        if !dims.contains(&cs.dimension()) {
            return Err(GeoError::invalid_crs(format!(
                "CRS '{}' 的坐标轴数量 {} 与类型 {:?} 不符",
                self.name,
                cs.dimension(),
                self.crs_type()
            )));
        }
        cs.validate_units()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(id) = &self.id {
            write!(f, " ({id})")?;
        }
        Ok(())
    }
}

// ============================================================================
// 测试
// ============================================================================
