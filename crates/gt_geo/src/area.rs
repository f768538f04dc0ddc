// crates/gt_geo/src/area.rs
//! 使用范围（地理边界框）
//!
//! 以度为单位的 west/south/east/north 边界框，`west > east` 表示跨越反子午线。

use crate::error::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 地理边界框（度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// 西边界经度
    pub west: f64,
    /// 南边界纬度
    pub south: f64,
    /// 东边界经度
    pub east: f64,
    /// 北边界纬度
    pub north: f64,
    /// 名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// 经度区间 [lo, hi]，均在 [-180, 180] 内
type LonInterval = (f64, f64);

impl Area {
    /// 创建边界框并校验
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> GeoResult<Self> {
        let area = Self {
            west,
            south,
            east,
            north,
            name: None,
        };
        area.validate()?;
        Ok(area)
    }

    /// 创建带名称的边界框
    pub fn named(
        name: impl Into<String>,
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    ) -> GeoResult<Self> {
        let mut area = Self::new(west, south, east, north)?;
        area.name = Some(name.into());
        Ok(area)
    }

    /// 全球范围
    #[must_use]
    pub fn world() -> Self {
        Self {
            west: -180.0,
            south: -90.0,
            east: 180.0,
            north: 90.0,
            name: Some("World".to_string()),
        }
    }

    /// 校验边界取值
    pub fn validate(&self) -> GeoResult<()> {
        let finite = [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(GeoError::invalid_crs("边界框包含非有限值"));
        }
        if !(-180.0..=180.0).contains(&self.west) || !(-180.0..=180.0).contains(&self.east) {
            return Err(GeoError::coordinate_out_of_range(
                "经度",
                if (-180.0..=180.0).contains(&self.west) {
                    self.east
                } else {
                    self.west
                },
                -180.0,
                180.0,
            ));
        }
        if self.south < -90.0 || self.north > 90.0 || self.south > self.north {
            return Err(GeoError::invalid_crs(format!(
                "纬度范围无效: south={} north={}",
                self.south, self.north
            )));
        }
        Ok(())
    }

    /// 是否跨越反子午线
    #[inline]
    #[must_use]
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// 经度跨度（度）
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.east - self.west + 360.0
        } else {
            self.east - self.west
        }
    }

    /// 面积（平方度），用于排序
    #[must_use]
    pub fn area_size(&self) -> f64 {
        self.lon_span() * (self.north - self.south)
    }

    /// 是否覆盖全部经度
    #[must_use]
    pub fn is_global_in_longitude(&self) -> bool {
        self.lon_span() >= 360.0
    }

    fn intervals(&self) -> Vec<LonInterval> {
        if self.is_global_in_longitude() {
            vec![(-180.0, 180.0)]
        } else if self.crosses_antimeridian() {
            vec![(self.west, 180.0), (-180.0, self.east)]
        } else {
            vec![(self.west, self.east)]
        }
    }

    /// 是否包含点（经度自动归一化到 [-180, 180]）
    #[must_use]
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        if !lon.is_finite() || !lat.is_finite() || lat < self.south || lat > self.north {
            return false;
        }
        let lon = normalize_lon(lon);
        self.intervals()
            .iter()
            .any(|&(lo, hi)| lon >= lo && lon <= hi)
    }

    /// 是否完全包含另一边界框
    #[must_use]
    pub fn contains(&self, other: &Area) -> bool {
        if other.south < self.south || other.north > self.north {
            return false;
        }
        let mine = self.intervals();
        other
            .intervals()
            .iter()
            .all(|&(lo, hi)| mine.iter().any(|&(a, b)| lo >= a && hi <= b))
    }

    /// 是否相交
    #[must_use]
    pub fn intersects(&self, other: &Area) -> bool {
        if other.south > self.north || other.north < self.south {
            return false;
        }
        let mine = self.intervals();
        other
            .intervals()
            .iter()
            .any(|&(lo, hi)| mine.iter().any(|&(a, b)| lo <= b && hi >= a))
    }

    /// 交集（不相交返回 `None`）
    #[must_use]
    pub fn intersection(&self, other: &Area) -> Option<Area> {
        if !self.intersects(other) {
            return None;
        }
        let south = self.south.max(other.south);
        let north = self.north.min(other.north);

        let mut pieces: Vec<LonInterval> = Vec::new();
        for &(lo, hi) in &other.intervals() {
            for &(a, b) in &self.intervals() {
                let l = lo.max(a);
                let h = hi.min(b);
                if l <= h {
                    pieces.push((l, h));
                }
            }
        }

        // 相接于 ±180 的两段合并为跨反子午线的区间
        let east_piece = pieces.iter().find(|p| p.1 >= 180.0).copied();
        let west_piece = pieces.iter().find(|p| p.0 <= -180.0).copied();
        let (west, east) = match (east_piece, west_piece) {
            (Some(e), Some(w)) if pieces.len() == 2 && e != w => (e.0, w.1),
            _ => pieces
                .iter()
                .copied()
                .max_by(|x, y| (x.1 - x.0).total_cmp(&(y.1 - y.0)))?,
        };

        Some(Area {
            west,
            south,
            east,
            north,
            name: None,
        })
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name} ")?;
        }
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.west, self.south, self.east, self.north
        )
    }
}

/// 经度归一化到 [-180, 180]
#[must_use]
pub fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let r = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if r == -180.0 && lon > 0.0 {
        180.0
    } else {
        r
    }
}
