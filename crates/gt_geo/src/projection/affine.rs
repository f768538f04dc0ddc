// crates/gt_geo/src/projection/affine.rs
//! 二维仿射参数变换 (EPSG 9624)
//!
//! 变换公式：
//! - X' = A0 + A1·X + A2·Y
//! - Y' = B0 + B1·X + B2·Y

use serde::{Deserialize, Serialize};

/// 仿射变换
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    /// X 平移
    pub a0: f64,
    /// X 对 X 的系数
    pub a1: f64,
    /// X 对 Y 的系数
    pub a2: f64,
    /// Y 平移
    pub b0: f64,
    /// Y 对 X 的系数
    pub b1: f64,
    /// Y 对 Y 的系数
    pub b2: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    /// 恒等变换
    #[must_use]
    pub const fn identity() -> Self {
        Self::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0])
    }

    /// 由 [A0, A1, A2] 与 [B0, B1, B2] 创建
    #[must_use]
    pub const fn new(a: [f64; 3], b: [f64; 3]) -> Self {
        Self {
            a0: a[0],
            a1: a[1],
            a2: a[2],
            b0: b[0],
            b1: b[1],
            b2: b[2],
        }
    }

    /// 平移
    #[must_use]
    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new([tx, 1.0, 0.0], [ty, 0.0, 1.0])
    }

    /// 应用正向变换
    #[inline]
    #[must_use]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a0 + self.a1 * x + self.a2 * y,
            self.b0 + self.b1 * x + self.b2 * y,
        )
    }

    /// 行列式
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a1 * self.b2 - self.a2 * self.b1
    }

    /// 逆变换，奇异矩阵返回 `None`
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < 1e-15 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let a1 = self.b2 * inv_det;
        let a2 = -self.a2 * inv_det;
        let b1 = -self.b1 * inv_det;
        let b2 = self.a1 * inv_det;
        Some(Self {
            a0: -(a1 * self.a0 + a2 * self.b0),
            a1,
            a2,
            b0: -(b1 * self.a0 + b2 * self.b0),
            b1,
            b2,
        })
    }

    /// 组合：先应用 `other`，再应用 `self`
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            a0: self.a0 + self.a1 * other.a0 + self.a2 * other.b0,
            a1: self.a1 * other.a1 + self.a2 * other.b1,
            a2: self.a1 * other.a2 + self.a2 * other.b2,
            b0: self.b0 + self.b1 * other.a0 + self.b2 * other.b0,
            b1: self.b1 * other.a1 + self.b2 * other.b1,
            b2: self.b1 * other.a2 + self.b2 * other.b2,
        }
    }

    /// 是否为恒等变换
    #[must_use]
    pub fn is_identity(&self) -> bool {
        let id = Self::identity();
        [
            self.a0 - id.a0,
            self.a1 - id.a1,
            self.a2 - id.a2,
            self.b0 - id.b0,
            self.b1 - id.b1,
            self.b2 - id.b2,
        ]
        .iter()
        .all(|d| d.abs() < 1e-10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Affine::identity();
        assert_eq!(t.apply(10.0, 20.0), (10.0, 20.0));
        assert!(t.is_identity());
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = Affine::new([1000.0, 0.5, 0.1], [-200.0, -0.2, 2.0]);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(12.0, 34.0);
        let (x2, y2) = inv.apply(x, y);
        assert!((x2 - 12.0).abs() < 1e-10 && (y2 - 34.0).abs() < 1e-10);
        assert!(t.compose(&inv).is_identity());
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let t = Affine::new([0.0, 1.0, 2.0], [0.0, 2.0, 4.0]);
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_compose_order() {
        let scale = Affine::new([0.0, 2.0, 0.0], [0.0, 0.0, 2.0]);
        let shift = Affine::translation(1.0, 1.0);
        // 先平移再缩放
        assert_eq!(scale.compose(&shift).apply(0.0, 0.0), (2.0, 2.0));
        // 先缩放再平移
        assert_eq!(shift.compose(&scale).apply(0.0, 0.0), (1.0, 1.0));
    }
}
