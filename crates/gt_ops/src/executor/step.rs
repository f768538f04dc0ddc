// crates/gt_ops/src/executor/step.rs

//! 管线步骤
//!
//! 编译后的管线是 [`Step`] 的有序列表。每个步骤原地修改 4 分量坐标，
//! 失败时返回 [`TransformErrorKind`]，由调用方写成全无穷坐标。
//!
//! 步骤之间约定的中间形式：地理坐标为 (λ, φ) 弧度（格林尼治）+ 米，
//! 投影与地心坐标为米。

use crate::grid::Grid;
use gt_foundation::TransformErrorKind;
use gt_geo::ellipsoid::Ellipsoid;
use gt_geo::projection::{Affine, GeocentricConverter, Helmert, Projection, RotationConvention};
use gt_geo::units::{Unit, UnitKind};
use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

/// 弧度 → 角秒
const RAD_TO_ARCSEC: f64 = 648_000.0 / PI;

/// 纬度越界的容许量 [rad]
const LAT_EPS: f64 = 1e-12;

/// 相消判断的数值容差
const EPS: f64 = 1e-12;

/// 恒等的轴映射
pub const IDENTITY_ORDER: [usize; 4] = [0, 1, 2, 3];

/// 单个执行步骤（封闭枚举，静态分派）
#[derive(Debug, Clone)]
pub enum Step {
    /// 轴重排与翻转：`out[dest[i]] = signs[i] · in[i]`
    AxisSwap {
        /// 每个输入分量的目标位置
        dest: [usize; 4],
        /// 每个输入分量的符号
        signs: [f64; 4],
    },
    /// 单位换算
    UnitConvert {
        /// 水平输入单位
        xy_in: Unit,
        /// 水平输出单位
        xy_out: Unit,
        /// 垂直输入单位
        z_in: Unit,
        /// 垂直输出单位
        z_out: Unit,
    },
    /// 本初子午线改正：`λ += offset`
    PrimeMeridian {
        /// 经度偏移 [rad]
        offset: f64,
    },
    /// 大地坐标 → 地心坐标（`inverse` 时反向）
    Cart {
        /// 椭球
        ellipsoid: Ellipsoid,
        /// 数值核心
        converter: GeocentricConverter,
        /// 是否取逆
        inverse: bool,
    },
    /// 地心坐标 Helmert 变换
    Helmert {
        /// 参数
        helmert: Helmert,
        /// 是否取逆
        inverse: bool,
    },
    /// 地图投影
    Projection {
        /// 数值核心
        projection: Projection,
        /// proj-string 形式的定义（不含 `+inv`）
        definition: String,
        /// 是否取逆
        inverse: bool,
    },
    /// 经纬度常量偏移 [rad]
    GeogOffset {
        /// 经度偏移
        dlon: f64,
        /// 纬度偏移
        dlat: f64,
    },
    /// 高程常量偏移 [m]
    VerticalOffset {
        /// 偏移
        dz: f64,
    },
    /// 水平格网改正
    HGridShift {
        /// 格网名称
        name: String,
        /// 已加载格网；不可用时为 `None`
        grid: Option<Arc<Grid>>,
        /// 是否取逆
        inverse: bool,
    },
    /// 垂直格网改正：`z += multiplier · N(λ, φ)`
    VGridShift {
        /// 格网名称
        name: String,
        /// 已加载格网；不可用时为 `None`
        grid: Option<Arc<Grid>>,
        /// 乘数
        multiplier: f64,
    },
    /// 二维仿射
    Affine {
        /// 正向参数
        forward: Affine,
        /// 逆参数（奇异时为 `None`）
        inverse: Option<Affine>,
    },
    /// 把选中分量压栈
    Push {
        /// 选中的分量
        axes: [bool; 4],
    },
    /// 从栈中恢复选中分量
    Pop {
        /// 选中的分量
        axes: [bool; 4],
    },
    /// 空操作
    Noop,
}

#[inline]
fn check_lat(lat: f64) -> Result<(), TransformErrorKind> {
    if lat.abs() > FRAC_PI_2 + LAT_EPS {
        return Err(TransformErrorKind::InvalidCoordinate);
    }
    Ok(())
}

fn factor(from: &Unit, to: &Unit) -> f64 {
    from.to_si / to.to_si
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPS * a.abs().max(b.abs()).max(1.0)
}

impl Step {
    /// 轴交换步骤
    pub fn axis_swap(dest: [usize; 4], signs: [f64; 4]) -> Self {
        Self::AxisSwap { dest, signs }
    }

    /// 地心转换步骤
    pub fn cart(ellipsoid: &Ellipsoid, inverse: bool) -> Self {
        Self::Cart {
            ellipsoid: ellipsoid.clone(),
            converter: GeocentricConverter::new(ellipsoid),
            inverse,
        }
    }

    /// 仿射步骤（逆由矩阵求得）
    pub fn affine(forward: Affine) -> Self {
        Self::Affine {
            forward,
            inverse: forward.inverse(),
        }
    }

    /// 只压入/弹出高程分量
    pub fn push_z() -> Self {
        Self::Push {
            axes: [false, false, true, false],
        }
    }

    /// 见 [`Self::push_z`]
    pub fn pop_z() -> Self {
        Self::Pop {
            axes: [false, false, true, false],
        }
    }

    // ========================================================================
    // 执行
    // ========================================================================

    /// 原地执行
    ///
    /// # Errors
    /// 坐标超出方法定义域、格网未覆盖/无数据/不可用时返回对应错误
    pub fn apply(&self, c: &mut [f64; 4], stack: &mut Vec<f64>) -> Result<(), TransformErrorKind> {
        match self {
            Self::AxisSwap { dest, signs } => {
                let input = *c;
                for i in 0..4 {
                    c[dest[i]] = signs[i] * input[i];
                }
            }
            Self::UnitConvert {
                xy_in,
                xy_out,
                z_in,
                z_out,
            } => {
                let f = factor(xy_in, xy_out);
                c[0] *= f;
                c[1] *= f;
                c[2] *= factor(z_in, z_out);
            }
            Self::PrimeMeridian { offset } => c[0] += offset,
            Self::Cart {
                converter, inverse, ..
            } => {
                let out = if *inverse {
                    converter.inverse(c[0], c[1], c[2])?
                } else {
                    check_lat(c[1])?;
                    converter.forward(c[0], c[1], c[2])?
                };
                c[..3].copy_from_slice(&out);
            }
            Self::Helmert { helmert, inverse } => {
                let p = [c[0], c[1], c[2]];
                let out = if *inverse {
                    helmert.inverse(p)
                } else {
                    helmert.forward(p)
                };
                c[..3].copy_from_slice(&out);
            }
            Self::Projection {
                projection,
                inverse,
                ..
            } => {
                let (x, y) = if *inverse {
                    projection.inverse(c[0], c[1])?
                } else {
                    check_lat(c[1])?;
                    projection.forward(c[0], c[1])?
                };
                c[0] = x;
                c[1] = y;
            }
            Self::GeogOffset { dlon, dlat } => {
                check_lat(c[1])?;
                c[0] += dlon;
                c[1] += dlat;
            }
            Self::VerticalOffset { dz } => c[2] += dz,
            Self::HGridShift { grid, inverse, .. } => {
                check_lat(c[1])?;
                let grid = grid
                    .as_deref()
                    .and_then(Grid::as_horizontal)
                    .ok_or(TransformErrorKind::ResourceUnavailable)?;
                let (lon, lat) = if *inverse {
                    grid.inverse(c[0], c[1])?
                } else {
                    grid.forward(c[0], c[1])?
                };
                c[0] = lon;
                c[1] = lat;
            }
            Self::VGridShift {
                grid, multiplier, ..
            } => {
                let grid = grid
                    .as_deref()
                    .and_then(Grid::as_vertical)
                    .ok_or(TransformErrorKind::ResourceUnavailable)?;
                c[2] += multiplier * grid.value(c[0], c[1])?;
            }
            Self::Affine { forward, .. } => {
                let (x, y) = forward.apply(c[0], c[1]);
                c[0] = x;
                c[1] = y;
            }
            Self::Push { axes } => {
                for i in 0..4 {
                    if axes[i] {
                        stack.push(c[i]);
                    }
                }
            }
            Self::Pop { axes } => {
                for i in (0..4).rev() {
                    if axes[i] {
                        c[i] = stack.pop().ok_or(TransformErrorKind::NoOperation)?;
                    }
                }
            }
            Self::Noop => {}
        }
        Ok(())
    }

    // ========================================================================
    // 代数
    // ========================================================================

    /// 逆步骤；奇异仿射没有逆
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let inv = match self {
            Self::AxisSwap { dest, signs } => {
                let mut d = IDENTITY_ORDER;
                let mut s = [1.0; 4];
                for i in 0..4 {
                    d[dest[i]] = i;
                    s[dest[i]] = signs[i];
                }
                Self::AxisSwap { dest: d, signs: s }
            }
            Self::UnitConvert {
                xy_in,
                xy_out,
                z_in,
                z_out,
            } => Self::UnitConvert {
                xy_in: xy_out.clone(),
                xy_out: xy_in.clone(),
                z_in: z_out.clone(),
                z_out: z_in.clone(),
            },
            Self::PrimeMeridian { offset } => Self::PrimeMeridian { offset: -offset },
            Self::Cart {
                ellipsoid,
                converter,
                inverse,
            } => Self::Cart {
                ellipsoid: ellipsoid.clone(),
                converter: converter.clone(),
                inverse: !inverse,
            },
            Self::Helmert { helmert, inverse } => Self::Helmert {
                helmert: helmert.clone(),
                inverse: !inverse,
            },
            Self::Projection {
                projection,
                definition,
                inverse,
            } => Self::Projection {
                projection: projection.clone(),
                definition: definition.clone(),
                inverse: !inverse,
            },
            Self::GeogOffset { dlon, dlat } => Self::GeogOffset {
                dlon: -dlon,
                dlat: -dlat,
            },
            Self::VerticalOffset { dz } => Self::VerticalOffset { dz: -dz },
            Self::HGridShift {
                name,
                grid,
                inverse,
            } => Self::HGridShift {
                name: name.clone(),
                grid: grid.clone(),
                inverse: !inverse,
            },
            Self::VGridShift {
                name,
                grid,
                multiplier,
            } => Self::VGridShift {
                name: name.clone(),
                grid: grid.clone(),
                multiplier: -multiplier,
            },
            Self::Affine { forward, inverse } => Self::Affine {
                forward: (*inverse)?,
                inverse: Some(*forward),
            },
            Self::Push { axes } => Self::Pop { axes: *axes },
            Self::Pop { axes } => Self::Push { axes: *axes },
            Self::Noop => Self::Noop,
        };
        Some(inv)
    }

    /// 是否为恒等步骤
    pub fn is_identity(&self) -> bool {
        match self {
            Self::AxisSwap { dest, signs } => {
                *dest == IDENTITY_ORDER && signs.iter().all(|&s| s == 1.0)
            }
            Self::UnitConvert {
                xy_in,
                xy_out,
                z_in,
                z_out,
            } => approx(factor(xy_in, xy_out), 1.0) && approx(factor(z_in, z_out), 1.0),
            Self::PrimeMeridian { offset } => *offset == 0.0,
            Self::GeogOffset { dlon, dlat } => *dlon == 0.0 && *dlat == 0.0,
            Self::VerticalOffset { dz } => *dz == 0.0,
            Self::Affine { forward, .. } => forward.is_identity(),
            Self::Noop => true,
            Self::Cart { .. }
            | Self::Helmert { .. }
            | Self::Projection { .. }
            | Self::HGridShift { .. }
            | Self::VGridShift { .. }
            | Self::Push { .. }
            | Self::Pop { .. } => false,
        }
    }

    /// 与紧随其后的步骤是否互逆
    pub fn cancels(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::AxisSwap { dest: d1, signs: s1 }, Self::AxisSwap { dest: d2, signs: s2 }) => {
                (0..4).all(|i| d2[d1[i]] == i && s1[i] * s2[d1[i]] == 1.0)
            }
            (
                Self::UnitConvert {
                    xy_in: a_in,
                    xy_out: a_out,
                    z_in: az_in,
                    z_out: az_out,
                },
                Self::UnitConvert {
                    xy_in: b_in,
                    xy_out: b_out,
                    z_in: bz_in,
                    z_out: bz_out,
                },
            ) => {
                approx(factor(a_in, a_out) * factor(b_in, b_out), 1.0)
                    && approx(factor(az_in, az_out) * factor(bz_in, bz_out), 1.0)
            }
            (Self::PrimeMeridian { offset: a }, Self::PrimeMeridian { offset: b }) => {
                approx(a + b, 0.0)
            }
            (
                Self::Cart {
                    ellipsoid: e1,
                    inverse: i1,
                    ..
                },
                Self::Cart {
                    ellipsoid: e2,
                    inverse: i2,
                    ..
                },
            ) => i1 != i2 && e1.same_shape(e2),
            (Self::Push { axes: a }, Self::Pop { axes: b }) => a == b,
            _ => false,
        }
    }

    // ========================================================================
    // 导出
    // ========================================================================

    /// 导出为单个 proj-string 步骤；空操作返回 `None`
    pub fn to_proj(&self) -> Option<String> {
        let text = match self {
            Self::AxisSwap { dest, signs } => {
                let mut order = [0i64; 4];
                for i in 0..4 {
                    let sign = if signs[i] < 0.0 { -1 } else { 1 };
                    order[dest[i]] = sign * (i as i64 + 1);
                }
                let used = (0..4)
                    .rposition(|k| order[k] != k as i64 + 1)
                    .map_or(2, |k| (k + 1).max(2));
                let list: Vec<String> = order[..used].iter().map(ToString::to_string).collect();
                format!("+proj=axisswap +order={}", list.join(","))
            }
            Self::UnitConvert {
                xy_in,
                xy_out,
                z_in,
                z_out,
            } => {
                let mut s = String::from("+proj=unitconvert");
                if !approx(factor(xy_in, xy_out), 1.0) {
                    s.push_str(&format!(
                        " +xy_in={} +xy_out={}",
                        unit_token(xy_in),
                        unit_token(xy_out)
                    ));
                }
                if !approx(factor(z_in, z_out), 1.0) {
                    s.push_str(&format!(
                        " +z_in={} +z_out={}",
                        unit_token(z_in),
                        unit_token(z_out)
                    ));
                }
                s
            }
            Self::PrimeMeridian { offset } => {
                format!("+proj=geogoffset +dlon={}", offset * RAD_TO_ARCSEC)
            }
            Self::Cart {
                ellipsoid, inverse, ..
            } => with_inv("+proj=cart", *inverse, &ellipsoid_tokens(ellipsoid)),
            Self::Helmert { helmert, inverse } => {
                let [x, y, z] = helmert.translation;
                let mut params = format!("+x={x} +y={y} +z={z}");
                if !helmert.is_translation_only() {
                    let [rx, ry, rz] = helmert.rotation.map(|r| r * RAD_TO_ARCSEC);
                    let convention = match helmert.convention {
                        RotationConvention::PositionVector => "position_vector",
                        RotationConvention::CoordinateFrame => "coordinate_frame",
                    };
                    params.push_str(&format!(
                        " +rx={rx} +ry={ry} +rz={rz} +s={} +convention={convention}",
                        helmert.scale_difference * 1e6
                    ));
                }
                with_inv("+proj=helmert", *inverse, &params)
            }
            Self::Projection {
                definition,
                inverse,
                ..
            } => match definition.split_once(' ') {
                Some((head, rest)) => with_inv(head, *inverse, rest),
                None => with_inv(definition, *inverse, ""),
            },
            Self::GeogOffset { dlon, dlat } => format!(
                "+proj=geogoffset +dlat={} +dlon={}",
                dlat * RAD_TO_ARCSEC,
                dlon * RAD_TO_ARCSEC
            ),
            Self::VerticalOffset { dz } => format!("+proj=geogoffset +dh={dz}"),
            Self::HGridShift { name, inverse, .. } => {
                with_inv("+proj=hgridshift", *inverse, &format!("+grids={name}"))
            }
            Self::VGridShift {
                name, multiplier, ..
            } => format!("+proj=vgridshift +grids={name} +multiplier={multiplier}"),
            Self::Affine { forward: a, .. } => format!(
                "+proj=affine +xoff={} +yoff={} +s11={} +s12={} +s21={} +s22={}",
                a.a0, a.b0, a.a1, a.a2, a.b1, a.b2
            ),
            Self::Push { axes } => format!("+proj=push {}", axis_flags(axes)),
            Self::Pop { axes } => format!("+proj=pop {}", axis_flags(axes)),
            Self::Noop => return None,
        };
        Some(text)
    }
}

fn with_inv(head: &str, inverse: bool, params: &str) -> String {
    let mut s = head.to_string();
    if inverse {
        s.push_str(" +inv");
    }
    if !params.is_empty() {
        s.push(' ');
        s.push_str(params);
    }
    s
}

fn axis_flags(axes: &[bool; 4]) -> String {
    axes.iter()
        .enumerate()
        .filter(|(_, &on)| on)
        .map(|(i, _)| format!("+v_{}", i + 1))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `+ellps=` / `+R=` / `+a= +rf=`
pub(crate) fn ellipsoid_tokens(e: &Ellipsoid) -> String {
    match e.proj_name() {
        Some(name) => format!("+ellps={name}"),
        None if e.is_sphere() => format!("+R={}", e.a),
        None => format!("+a={} +rf={}", e.a, e.inverse_flattening()),
    }
}

/// unitconvert 使用的单位记号
fn unit_token(unit: &Unit) -> String {
    if unit.kind == UnitKind::Angular {
        for (token, known) in [("rad", Unit::RADIAN), ("deg", Unit::DEGREE), ("grad", Unit::GRAD)] {
            if unit.is_equivalent_to(&known) {
                return token.to_string();
            }
        }
    }
    unit.proj_name()
        .map_or_else(|| unit.to_si.to_string(), str::to_string)
}
