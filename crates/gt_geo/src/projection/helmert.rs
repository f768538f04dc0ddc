// crates/gt_geo/src/projection/helmert.rs
//! 七参数 Helmert 变换（地心直角坐标）
//!
//! 位置矢量约定 (EPSG 9606/1033)：
//!
//! ```text
//! X' = T + (1 + ds) · R · X
//!
//!     |  1   -rz   ry |
//! R = |  rz   1   -rx |
//!     | -ry   rx   1  |
//! ```
//!
//! 坐标框架约定 (EPSG 9607/1032) 使用 R 的转置。
//! 逆变换使用矩阵的精确逆，而不是对参数取反。

use serde::{Deserialize, Serialize};

/// 旋转约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationConvention {
    /// 位置矢量
    PositionVector,
    /// 坐标框架
    CoordinateFrame,
}

/// 七参数 Helmert 变换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Helmert {
    /// 平移 [m]
    pub translation: [f64; 3],
    /// 旋转 [rad]
    pub rotation: [f64; 3],
    /// 尺度差（无量纲，ppm 已换算）
    pub scale_difference: f64,
    /// 旋转约定
    pub convention: RotationConvention,
    matrix: [[f64; 3]; 3],
    inverse_matrix: [[f64; 3]; 3],
}

impl Helmert {
    /// 创建变换
    ///
    /// 矩阵奇异（旋转参数病态）时返回 `None`。
    #[must_use]
    pub fn new(
        translation: [f64; 3],
        rotation: [f64; 3],
        scale_difference: f64,
        convention: RotationConvention,
    ) -> Option<Self> {
        let [rx, ry, rz] = rotation;
        let m = 1.0 + scale_difference;
        let pv = [[1.0, -rz, ry], [rz, 1.0, -rx], [-ry, rx, 1.0]];
        let r = match convention {
            RotationConvention::PositionVector => pv,
            RotationConvention::CoordinateFrame => transpose(&pv),
        };
        let matrix = r.map(|row| row.map(|v| v * m));
        let inverse_matrix = invert3(&matrix)?;
        Some(Self {
            translation,
            rotation,
            scale_difference,
            convention,
            matrix,
            inverse_matrix,
        })
    }

    /// 仅平移
    #[must_use]
    pub fn translation(t: [f64; 3]) -> Self {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        Self {
            translation: t,
            rotation: [0.0; 3],
            scale_difference: 0.0,
            convention: RotationConvention::PositionVector,
            matrix: identity,
            inverse_matrix: identity,
        }
    }

    /// 是否为纯平移
    #[must_use]
    pub fn is_translation_only(&self) -> bool {
        self.rotation == [0.0; 3] && self.scale_difference == 0.0
    }

    /// 正向变换
    #[must_use]
    pub fn forward(&self, p: [f64; 3]) -> [f64; 3] {
        let r = mul(&self.matrix, p);
        [
            r[0] + self.translation[0],
            r[1] + self.translation[1],
            r[2] + self.translation[2],
        ]
    }

    /// 逆向变换
    #[must_use]
    pub fn inverse(&self, p: [f64; 3]) -> [f64; 3] {
        let d = [
            p[0] - self.translation[0],
            p[1] - self.translation[1],
            p[2] - self.translation[2],
        ];
        mul(&self.inverse_matrix, d)
    }
}

fn transpose(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

#[inline]
fn mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// 3x3 矩阵求逆（伴随矩阵法）
fn invert3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
    let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
    let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
    if det.abs() < 1e-15 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            c00 * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            c01 * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            c02 * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}
