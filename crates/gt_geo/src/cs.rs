// crates/gt_geo/src/cs.rs
//! 坐标系统与坐标轴
//!
//! 坐标轴顺序由 CRS 显式给出，不假定 (x, y)。
//! 执行器依据轴方向和单位把坐标归一化为内部规范形式。

use crate::error::{GeoError, GeoResult};
use crate::units::{Unit, UnitKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 坐标轴方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    /// 北
    North,
    /// 南
    South,
    /// 东
    East,
    /// 西
    West,
    /// 上
    Up,
    /// 下
    Down,
    /// 地心 X
    GeocentricX,
    /// 地心 Y
    GeocentricY,
    /// 地心 Z
    GeocentricZ,
    /// 未来
    Future,
    /// 过去
    Past,
    /// 其它
    Other,
}

/// 轴在规范形式中承担的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRole {
    /// 经度 / 东向 / 地心 X
    First,
    /// 纬度 / 北向 / 地心 Y
    Second,
    /// 高程 / 地心 Z
    Third,
    /// 时间
    Time,
}

impl AxisDirection {
    /// WKT 关键字
    #[must_use]
    pub fn wkt_name(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Up => "up",
            Self::Down => "down",
            Self::GeocentricX => "geocentricX",
            Self::GeocentricY => "geocentricY",
            Self::GeocentricZ => "geocentricZ",
            Self::Future => "future",
            Self::Past => "past",
            Self::Other => "unspecified",
        }
    }

    /// 从 WKT 关键字解析（大小写不敏感）
    #[must_use]
    pub fn from_wkt_name(name: &str) -> Option<Self> {
        let dir = match name.to_lowercase().as_str() {
            "north" => Self::North,
            "south" => Self::South,
            "east" => Self::East,
            "west" => Self::West,
            "up" => Self::Up,
            "down" => Self::Down,
            "geocentricx" => Self::GeocentricX,
            "geocentricy" => Self::GeocentricY,
            "geocentricz" => Self::GeocentricZ,
            "future" => Self::Future,
            "past" => Self::Past,
            "other" | "unspecified" => Self::Other,
            _ => return None,
        };
        Some(dir)
    }

    /// 规范角色与符号（相对规范方向为 -1 表示反向）
    #[must_use]
    pub fn role(self) -> Option<(AxisRole, f64)> {
        match self {
            Self::East | Self::GeocentricX => Some((AxisRole::First, 1.0)),
            Self::West => Some((AxisRole::First, -1.0)),
            Self::North | Self::GeocentricY => Some((AxisRole::Second, 1.0)),
            Self::South => Some((AxisRole::Second, -1.0)),
            Self::Up | Self::GeocentricZ => Some((AxisRole::Third, 1.0)),
            Self::Down => Some((AxisRole::Third, -1.0)),
            Self::Future => Some((AxisRole::Time, 1.0)),
            Self::Past => Some((AxisRole::Time, -1.0)),
            Self::Other => None,
        }
    }

    /// proj-string `+axis=` 字母
    #[must_use]
    pub fn proj_letter(self) -> Option<char> {
        match self {
            Self::East => Some('e'),
            Self::West => Some('w'),
            Self::North => Some('n'),
            Self::South => Some('s'),
            Self::Up => Some('u'),
            Self::Down => Some('d'),
            _ => None,
        }
    }

    fn from_proj_letter(c: char) -> Option<Self> {
        match c {
            'e' => Some(Self::East),
            'w' => Some(Self::West),
            'n' => Some(Self::North),
            's' => Some(Self::South),
            'u' => Some(Self::Up),
            'd' => Some(Self::Down),
            _ => None,
        }
    }
}

/// 坐标轴描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisInfo {
    /// 名称
    pub name: String,
    /// 缩写
    pub abbreviation: String,
    /// 方向
    pub direction: AxisDirection,
    /// 单位
    pub unit: Unit,
}

impl AxisInfo {
    /// 创建坐标轴
    pub fn new(
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        direction: AxisDirection,
        unit: Unit,
    ) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
            direction,
            unit,
        }
    }

    fn longitude(unit: &Unit) -> Self {
        Self::new("Geodetic longitude", "Lon", AxisDirection::East, unit.clone())
    }

    fn latitude(unit: &Unit) -> Self {
        Self::new("Geodetic latitude", "Lat", AxisDirection::North, unit.clone())
    }

    fn ellipsoidal_height(unit: &Unit) -> Self {
        Self::new("Ellipsoidal height", "h", AxisDirection::Up, unit.clone())
    }

    /// 与另一轴是否等价（忽略名称与缩写）
    #[must_use]
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.direction == other.direction && self.unit.is_equivalent_to(&other.unit)
    }
}

/// 坐标系统类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CsKind {
    /// 椭球坐标系
    Ellipsoidal,
    /// 笛卡尔坐标系
    Cartesian,
    /// 垂直坐标系
    Vertical,
    /// 时间坐标系
    Temporal,
    /// 其它
    Other,
}

impl CsKind {
    /// WKT2 关键字
    #[must_use]
    pub fn wkt_name(self) -> &'static str {
        match self {
            Self::Ellipsoidal => "ellipsoidal",
            Self::Cartesian => "Cartesian",
            Self::Vertical => "vertical",
            Self::Temporal => "TemporalDateTime",
            Self::Other => "ordinal",
        }
    }

    /// 从 WKT2 关键字解析
    #[must_use]
    pub fn from_wkt_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ellipsoidal" => Some(Self::Ellipsoidal),
            "cartesian" => Some(Self::Cartesian),
            "vertical" => Some(Self::Vertical),
            "temporal" | "temporaldatetime" | "temporalcount" | "temporalmeasure" => {
                Some(Self::Temporal)
            }
            "ordinal" | "parametric" | "affine" | "polar" | "spherical" | "cylindrical"
            | "linear" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for CsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wkt_name())
    }
}

/// 坐标系统：类别 + 有序坐标轴
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    /// 类别
    pub kind: CsKind,
    /// 有序坐标轴
    pub axes: Vec<AxisInfo>,
}

impl CoordinateSystem {
    /// 创建坐标系统
    #[must_use]
    pub fn new(kind: CsKind, axes: Vec<AxisInfo>) -> Self {
        Self { kind, axes }
    }

    /// 纬度、经度（EPSG 地理 CRS 的权威轴序）
    #[must_use]
    pub fn ellipsoidal_2d_lat_lon(unit: &Unit) -> Self {
        Self::new(
            CsKind::Ellipsoidal,
            vec![AxisInfo::latitude(unit), AxisInfo::longitude(unit)],
        )
    }

    /// 经度、纬度（proj-string 地理 CRS 的轴序）
    #[must_use]
    pub fn ellipsoidal_2d_lon_lat(unit: &Unit) -> Self {
        Self::new(
            CsKind::Ellipsoidal,
            vec![AxisInfo::longitude(unit), AxisInfo::latitude(unit)],
        )
    }

    /// 纬度、经度、椭球高
    #[must_use]
    pub fn ellipsoidal_3d_lat_lon_h(unit: &Unit, height_unit: &Unit) -> Self {
        Self::new(
            CsKind::Ellipsoidal,
            vec![
                AxisInfo::latitude(unit),
                AxisInfo::longitude(unit),
                AxisInfo::ellipsoidal_height(height_unit),
            ],
        )
    }

    /// 经度、纬度、椭球高
    #[must_use]
    pub fn ellipsoidal_3d_lon_lat_h(unit: &Unit, height_unit: &Unit) -> Self {
        Self::new(
            CsKind::Ellipsoidal,
            vec![
                AxisInfo::longitude(unit),
                AxisInfo::latitude(unit),
                AxisInfo::ellipsoidal_height(height_unit),
            ],
        )
    }

    /// 东、北
    #[must_use]
    pub fn cartesian_en(unit: &Unit) -> Self {
        Self::new(
            CsKind::Cartesian,
            vec![
                AxisInfo::new("Easting", "E", AxisDirection::East, unit.clone()),
                AxisInfo::new("Northing", "N", AxisDirection::North, unit.clone()),
            ],
        )
    }

    /// 北、东
    #[must_use]
    pub fn cartesian_ne(unit: &Unit) -> Self {
        Self::new(
            CsKind::Cartesian,
            vec![
                AxisInfo::new("Northing", "X", AxisDirection::North, unit.clone()),
                AxisInfo::new("Easting", "Y", AxisDirection::East, unit.clone()),
            ],
        )
    }

    /// 地心笛卡尔 X, Y, Z（米）
    #[must_use]
    pub fn geocentric() -> Self {
        Self::new(
            CsKind::Cartesian,
            vec![
                AxisInfo::new("Geocentric X", "X", AxisDirection::GeocentricX, Unit::METRE),
                AxisInfo::new("Geocentric Y", "Y", AxisDirection::GeocentricY, Unit::METRE),
                AxisInfo::new("Geocentric Z", "Z", AxisDirection::GeocentricZ, Unit::METRE),
            ],
        )
    }

    /// 重力相关高（向上）
    #[must_use]
    pub fn vertical_up(unit: &Unit) -> Self {
        Self::new(
            CsKind::Vertical,
            vec![AxisInfo::new(
                "Gravity-related height",
                "H",
                AxisDirection::Up,
                unit.clone(),
            )],
        )
    }

    /// 时间轴
    #[must_use]
    pub fn temporal() -> Self {
        Self::new(
            CsKind::Temporal,
            vec![AxisInfo::new("Time", "T", AxisDirection::Future, Unit::YEAR)],
        )
    }

    /// 由 proj-string `+axis=` 值构造（如 `enu`、`neu`、`wsu`）
    ///
    /// 前两个字母为水平轴，第三个（可选）为垂直轴。
    pub fn from_proj_axis(
        value: &str,
        kind: CsKind,
        horizontal_unit: &Unit,
        vertical_unit: &Unit,
        dimension: usize,
    ) -> GeoResult<Self> {
        let letters: Vec<char> = value.to_lowercase().chars().collect();
        if letters.len() != 3 {
            return Err(GeoError::invalid_crs(format!("+axis={value} 必须为 3 个字母")));
        }
        let mut axes = Vec::with_capacity(dimension);
        let mut roles = Vec::with_capacity(3);
        for &c in letters.iter().take(dimension) {
            let dir = AxisDirection::from_proj_letter(c)
                .ok_or_else(|| GeoError::invalid_crs(format!("+axis={value} 含无效字母 '{c}'")))?;
            let role = dir.role().map(|(r, _)| r);
            if roles.contains(&role) {
                return Err(GeoError::invalid_crs(format!("+axis={value} 轴方向重复")));
            }
            roles.push(role);
            let axis = match (kind, dir) {
                (CsKind::Ellipsoidal, AxisDirection::East | AxisDirection::West) => {
                    AxisInfo::new("Longitude", "lon", dir, horizontal_unit.clone())
                }
                (CsKind::Ellipsoidal, AxisDirection::North | AxisDirection::South) => {
                    AxisInfo::new("Latitude", "lat", dir, horizontal_unit.clone())
                }
                (_, AxisDirection::Up | AxisDirection::Down) => {
                    AxisInfo::new("Height", "h", dir, vertical_unit.clone())
                }
                (_, AxisDirection::East | AxisDirection::West) => {
                    AxisInfo::new("Easting", "E", dir, horizontal_unit.clone())
                }
                _ => AxisInfo::new("Northing", "N", dir, horizontal_unit.clone()),
            };
            axes.push(axis);
        }
        if axes.len() >= 3 && axes[2].direction.role().map(|r| r.0) != Some(AxisRole::Third) {
            return Err(GeoError::invalid_crs(format!("+axis={value} 第三轴必须为垂直轴")));
        }
        Ok(Self::new(kind, axes))
    }

    /// 维度
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// 按 proj-string 字母输出轴序（无法表达时返回 `None`）
    #[must_use]
    pub fn proj_axis(&self) -> Option<String> {
        let mut s: String = self
            .axes
            .iter()
            .map(|a| a.direction.proj_letter())
            .collect::<Option<String>>()?;
        if s.len() == 2 {
            s.push('u');
        }
        Some(s)
    }

    /// 第一轴是否为东/西向
    #[must_use]
    pub fn is_east_first(&self) -> bool {
        self.axes.first().is_some_and(|a| {
            matches!(
                a.direction,
                AxisDirection::East | AxisDirection::West | AxisDirection::GeocentricX
            )
        })
    }

    /// 东向在前的变体（用于可视化）
    ///
    /// 若前两轴为北/东顺序则交换，否则原样返回。
    #[must_use]
    pub fn east_first(&self) -> Self {
        let mut cs = self.clone();
        let swap = cs.axes.len() >= 2
            && matches!(
                cs.axes[0].direction,
                AxisDirection::North | AxisDirection::South
            )
            && matches!(
                cs.axes[1].direction,
                AxisDirection::East | AxisDirection::West
            );
        if swap {
            cs.axes.swap(0, 1);
        }
        cs
    }

    /// 首个水平轴的单位
    #[must_use]
    pub fn horizontal_unit(&self) -> Option<&Unit> {
        self.axes
            .iter()
            .find(|a| {
                a.direction
                    .role()
                    .is_some_and(|(r, _)| matches!(r, AxisRole::First | AxisRole::Second))
            })
            .map(|a| &a.unit)
    }

    /// 角度轴是否都使用角度单位、长度轴都使用长度单位
    pub fn validate_units(&self) -> GeoResult<()> {
        for axis in &self.axes {
            let expected = match (self.kind, axis.direction.role().map(|r| r.0)) {
                (CsKind::Ellipsoidal, Some(AxisRole::First | AxisRole::Second)) => {
                    UnitKind::Angular
                }
                (CsKind::Temporal, _) | (_, Some(AxisRole::Time)) => UnitKind::Time,
                (CsKind::Other, _) => continue,
                _ => UnitKind::Linear,
            };
            if axis.unit.kind != expected {
                return Err(GeoError::invalid_crs(format!(
                    "坐标轴 '{}' 的单位 '{}' 类别不符",
                    axis.name, axis.unit.name
                )));
            }
        }
        Ok(())
    }

    /// 是否等价（忽略名称）
    #[must_use]
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.axes.len() == other.axes.len()
            && self
                .axes
                .iter()
                .zip(&other.axes)
                .all(|(a, b)| a.is_equivalent_to(b))
    }

    /// 忽略轴序的等价比较
    #[must_use]
    pub fn is_equivalent_ignoring_order(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.axes.len() == other.axes.len()
            && self
                .axes
                .iter()
                .all(|a| other.axes.iter().any(|b| a.is_equivalent_to(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proj_axis_parsing() {
        let cs = CoordinateSystem::from_proj_axis(
            "neu",
            CsKind::Ellipsoidal,
            &Unit::DEGREE,
            &Unit::METRE,
            2,
        )
        .unwrap();
        assert_eq!(cs.axes[0].direction, AxisDirection::North);
        assert_eq!(cs.axes[1].direction, AxisDirection::East);
        assert!(!cs.is_east_first());
        assert_eq!(cs.proj_axis().as_deref(), Some("neu"));
    }

    #[test]
    fn test_proj_axis_rejects_duplicates() {
        let err = CoordinateSystem::from_proj_axis(
            "nnu",
            CsKind::Cartesian,
            &Unit::METRE,
            &Unit::METRE,
            3,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_east_first() {
        let cs = CoordinateSystem::ellipsoidal_2d_lat_lon(&Unit::DEGREE);
        let swapped = cs.east_first();
        assert!(swapped.is_east_first());
        assert!(cs.is_equivalent_ignoring_order(&swapped));
        assert!(!cs.is_equivalent_to(&swapped));
    }

    #[test]
    fn test_validate_units() {
        let bad = CoordinateSystem::ellipsoidal_2d_lat_lon(&Unit::METRE);
        assert!(bad.validate_units().is_err());
        assert!(CoordinateSystem::geocentric().validate_units().is_ok());
        assert!(CoordinateSystem::cartesian_en(&Unit::US_SURVEY_FOOT)
            .validate_units()
            .is_ok());
    }

    #[test]
    fn test_roles() {
        assert_eq!(AxisDirection::West.role(), Some((AxisRole::First, -1.0)));
        assert_eq!(AxisDirection::GeocentricZ.role(), Some((AxisRole::Third, 1.0)));
        assert_eq!(AxisDirection::Other.role(), None);
    }
}
