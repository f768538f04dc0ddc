// crates/gt_foundation/src/tolerance.rs

//! 数值容差配置
//!
//! 等价性比较与迭代求解共用的容差阈值，通过参数注入使用。

use serde::{Deserialize, Serialize};

/// 数值容差配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// 相对容差（椭球参数、比例因子等）
    pub relative: f64,
    /// 角度绝对容差 [rad]
    pub angle: f64,
    /// 长度绝对容差 [m]
    pub linear: f64,
    /// 迭代收敛容差 [rad]
    pub convergence: f64,
    /// 最大迭代次数
    pub max_iterations: usize,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            relative: 1e-10,
            angle: 1e-12,
            linear: 1e-6,
            convergence: 1e-12,
            max_iterations: 10,
        }
    }
}

impl Tolerance {
    /// 创建宽松配置（别名比较、可视化用途）
    pub fn loose() -> Self {
        Self {
            relative: 1e-7,
            angle: 1e-9,
            linear: 1e-3,
            ..Default::default()
        }
    }

    /// 混合相对/绝对容差判断接近
    #[inline]
    pub fn is_close(&self, a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        let diff = (a - b).abs();
        diff <= self.relative * a.abs().max(b.abs()).max(1.0)
    }

    /// 判断角度（弧度）接近
    #[inline]
    pub fn is_angle_close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.angle.max(self.relative * a.abs().max(b.abs()))
    }

    /// 判断长度（米）接近
    #[inline]
    pub fn is_linear_close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.linear
    }

    /// 判断迭代是否收敛
    #[inline]
    pub fn is_converged(&self, step: f64) -> bool {
        step.abs() < self.convergence
    }
}
