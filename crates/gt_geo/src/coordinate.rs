// crates/gt_geo/src/coordinate.rs
//! 四分量坐标
//!
//! 分量含义（经纬度/东北向、单位、时间）完全由所使用的 CRS 或操作决定，类型本身不携带语义。

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// 四分量坐标 `[x, y, z, t]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate(pub [f64; 4]);

impl Coordinate {
    /// 全为无穷大的坐标（数值失败标记）
    pub const ERROR: Self = Self([f64::INFINITY; 4]);

    /// 创建四分量坐标
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, t: f64) -> Self {
        Self([x, y, z, t])
    }

    /// 二维坐标（z = 0，t = 0）
    #[inline]
    #[must_use]
    pub const fn xy(x: f64, y: f64) -> Self {
        Self([x, y, 0.0, 0.0])
    }

    /// 三维坐标（t = 0）
    #[inline]
    #[must_use]
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z, 0.0])
    }

    /// 第一分量
    #[inline]
    #[must_use]
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    /// 第二分量
    #[inline]
    #[must_use]
    pub fn y(&self) -> f64 {
        self.0[1]
    }

    /// 第三分量
    #[inline]
    #[must_use]
    pub fn z(&self) -> f64 {
        self.0[2]
    }

    /// 第四分量
    #[inline]
    #[must_use]
    pub fn t(&self) -> f64 {
        self.0[3]
    }

    /// 是否为失败标记（任一分量为无穷大）
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.0.iter().any(|v| v.is_infinite())
    }

    /// 前三个分量是否都有限
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0[..3].iter().all(|v| v.is_finite())
    }

    /// 与另一坐标前三分量的欧氏距离
    #[must_use]
    pub fn distance_3d(&self, other: &Self) -> f64 {
        let dx = self.0[0] - other.0[0];
        let dy = self.0[1] - other.0[1];
        let dz = self.0[2] - other.0[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Index<usize> for Coordinate {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Coordinate {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

impl From<[f64; 4]> for Coordinate {
    fn from(v: [f64; 4]) -> Self {
        Self(v)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Self::xy(x, y)
    }
}

impl From<(f64, f64, f64)> for Coordinate {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self::xyz(x, y, z)
    }
}
