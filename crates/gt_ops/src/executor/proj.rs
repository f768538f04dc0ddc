// crates/gt_ops/src/executor/proj.rs

//! proj-string 管线 → 步骤
//!
//! 管线文本不经过端点归一化：每个步骤按 PROJ 的约定直接处理坐标
//! （角度为弧度，长度为米）。

use super::compile::invert;
use super::step::{Step, IDENTITY_ORDER};
use crate::context::Context;
use crate::grid::Grid;
use gt_foundation::{GtError, GtResult};
use gt_geo::parse::proj_string::{parse_steps, ProjStep};
use gt_geo::prelude::*;
use gt_geo::projection::{Affine, Helmert, RotationConvention};
use gt_geo::units::UnitKind;
use std::f64::consts::PI;
use std::sync::Arc;

/// 角秒 → 弧度
const ARCSEC_TO_RAD: f64 = PI / 648_000.0;

/// 编译管线文本
///
/// # Errors
/// 语法错误、未知步骤或参数无效时返回错误
pub(crate) fn compile(ctx: &Context, text: &str) -> GtResult<Vec<Step>> {
    let mut out = Vec::new();
    for step in parse_steps(text)? {
        let compiled = compile_step(ctx, &step)?;
        if step.inverse {
            let inverted = invert(&compiled).ok_or_else(|| {
                GtError::operation_invalid(format!("+proj={} 没有逆", step.name))
            })?;
            out.extend(inverted);
        } else {
            out.extend(compiled);
        }
    }
    Ok(out)
}

fn number(step: &ProjStep, key: &str, default: f64) -> GtResult<f64> {
    step.number(key)
        .map(|v| v.unwrap_or(default))
        .map_err(GtError::invalid_input)
}

fn compile_step(ctx: &Context, step: &ProjStep) -> GtResult<Vec<Step>> {
    let steps = match step.name.as_str() {
        "noop" | "longlat" | "latlong" | "lonlat" | "latlon" => vec![Step::Noop],
        "axisswap" => vec![axis_swap(step)?],
        "unitconvert" => vec![unit_convert(step)?],
        "cart" => vec![Step::cart(&step.ellipsoid()?, false)],
        "helmert" => vec![helmert(step)?],
        "utm" | "tmerc" | "etmerc" | "merc" | "webmerc" => {
            let ellipsoid = step.ellipsoid()?;
            let conversion = step.projection_conversion()?;
            let single = conversion
                .single()
                .ok_or_else(|| GtError::internal("投影转换不是单一操作"))?;
            vec![Step::Projection {
                projection: Projection::from_conversion(single, &ellipsoid)?,
                definition: conversion.to_proj_step(Some(&ellipsoid))?,
                inverse: false,
            }]
        }
        "hgridshift" => {
            let (name, grid) = load_first(ctx, step, |g| g.as_horizontal().is_some())?;
            vec![Step::HGridShift {
                name,
                grid,
                inverse: false,
            }]
        }
        "vgridshift" => {
            let (name, grid) = load_first(ctx, step, |g| g.as_vertical().is_some())?;
            vec![Step::VGridShift {
                name,
                grid,
                multiplier: number(step, "multiplier", -1.0)?,
            }]
        }
        "affine" => vec![Step::affine(Affine::new(
            [
                number(step, "xoff", 0.0)?,
                number(step, "s11", 1.0)?,
                number(step, "s12", 0.0)?,
            ],
            [
                number(step, "yoff", 0.0)?,
                number(step, "s21", 0.0)?,
                number(step, "s22", 1.0)?,
            ],
        ))],
        "geogoffset" => {
            let mut out = vec![Step::GeogOffset {
                dlon: number(step, "dlon", 0.0)? * ARCSEC_TO_RAD,
                dlat: number(step, "dlat", 0.0)? * ARCSEC_TO_RAD,
            }];
            let dh = number(step, "dh", 0.0)?;
            if dh != 0.0 {
                out.push(Step::VerticalOffset { dz: dh });
            }
            out
        }
        "push" => vec![Step::Push {
            axes: axis_flags(step),
        }],
        "pop" => vec![Step::Pop {
            axes: axis_flags(step),
        }],
        other => {
            return Err(GtError::operation_invalid(format!(
                "不支持的管线步骤 +proj={other}"
            )))
        }
    };
    Ok(steps)
}

/// `+order=2,1,-3`：输出第 k 个分量取自输入第 |o_k| 个分量（负号表示翻转）
fn axis_swap(step: &ProjStep) -> GtResult<Step> {
    let order = step
        .numbers("order")
        .map_err(GtError::invalid_input)?
        .ok_or_else(|| GtError::invalid_input("+proj=axisswap 需要 +order"))?;
    if order.is_empty() || order.len() > 4 {
        return Err(GtError::invalid_input("+order 需要 1 到 4 个分量"));
    }

    let mut dest = IDENTITY_ORDER;
    let mut signs = [1.0; 4];
    let mut seen = [false; 4];
    for (k, &o) in order.iter().enumerate() {
        let index = o.abs();
        if index.fract() != 0.0 || !(1.0..=4.0).contains(&index) {
            return Err(GtError::invalid_input(format!("+order 分量 {o} 无效")));
        }
        let i = index as usize - 1;
        if seen[i] {
            return Err(GtError::invalid_input(format!("+order 分量 {o} 重复")));
        }
        seen[i] = true;
        dest[i] = k;
        signs[i] = o.signum();
    }
    let permutation = (0..4).all(|k| dest.iter().filter(|&&d| d == k).count() == 1);
    if !permutation {
        return Err(GtError::invalid_input("+order 不是坐标分量的排列"));
    }
    Ok(Step::axis_swap(dest, signs))
}

fn unit_of(token: &str, linear_default: bool) -> GtResult<Unit> {
    if let Some(unit) = Unit::by_name(token) {
        return Ok(unit);
    }
    let factor: f64 = token
        .parse()
        .ok()
        .filter(|f: &f64| f.is_finite() && *f > 0.0)
        .ok_or_else(|| GtError::invalid_input(format!("未知单位 {token}")))?;
    let kind = if linear_default {
        UnitKind::Linear
    } else {
        UnitKind::Angular
    };
    Ok(Unit::new(token, kind, factor))
}

fn unit_pair(step: &ProjStep, input: &str, output: &str) -> GtResult<(Unit, Unit)> {
    match (step.get(input), step.get(output)) {
        (Some(i), Some(o)) => Ok((unit_of(i, true)?, unit_of(o, true)?)),
        (None, None) => Ok((Unit::METRE, Unit::METRE)),
        _ => Err(GtError::invalid_input(format!(
            "+{input} 与 +{output} 必须同时给出"
        ))),
    }
}

fn unit_convert(step: &ProjStep) -> GtResult<Step> {
    let (xy_in, xy_out) = unit_pair(step, "xy_in", "xy_out")?;
    let (z_in, z_out) = unit_pair(step, "z_in", "z_out")?;
    Ok(Step::UnitConvert {
        xy_in,
        xy_out,
        z_in,
        z_out,
    })
}

fn helmert(step: &ProjStep) -> GtResult<Step> {
    let t = [
        number(step, "x", 0.0)?,
        number(step, "y", 0.0)?,
        number(step, "z", 0.0)?,
    ];
    let r = [
        number(step, "rx", 0.0)? * ARCSEC_TO_RAD,
        number(step, "ry", 0.0)? * ARCSEC_TO_RAD,
        number(step, "rz", 0.0)? * ARCSEC_TO_RAD,
    ];
    let ds = number(step, "s", 0.0)? * 1e-6;

    let helmert = if r == [0.0; 3] && ds == 0.0 {
        Helmert::translation(t)
    } else {
        let convention = match step.get("convention") {
            Some("position_vector") => RotationConvention::PositionVector,
            Some("coordinate_frame") => RotationConvention::CoordinateFrame,
            Some(other) => {
                return Err(GtError::invalid_input(format!(
                    "未知的 Helmert 约定 +convention={other}"
                )))
            }
            None => return Err(GtError::invalid_input("含旋转的 +proj=helmert 需要 +convention")),
        };
        Helmert::new(t, r, ds, convention)
            .ok_or_else(|| GtError::operation_invalid("Helmert 矩阵奇异"))?
    };
    Ok(Step::Helmert {
        helmert,
        inverse: false,
    })
}

/// `+grids=a,@b`：取第一个可加载的格网；`@` 前缀表示可选
fn load_first(
    ctx: &Context,
    step: &ProjStep,
    accept: impl Fn(&Grid) -> bool,
) -> GtResult<(String, Option<Arc<Grid>>)> {
    let list = step
        .get("grids")
        .ok_or_else(|| GtError::invalid_input(format!("+proj={} 需要 +grids", step.name)))?;
    let names: Vec<&str> = list.split(',').map(|n| n.trim_start_matches('@')).collect();
    for name in &names {
        if let Ok(grid) = ctx.load_grid(name) {
            if accept(&grid) {
                return Ok(((*name).to_string(), Some(grid)));
            }
        }
    }
    let first = names.first().copied().unwrap_or_default();
    Ok((first.to_string(), None))
}

fn axis_flags(step: &ProjStep) -> [bool; 4] {
    [1, 2, 3, 4].map(|i| step.has(&format!("v_{i}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_config::GeoTransConfig;

    fn ctx() -> Context {
        Context::with_config(GeoTransConfig::default())
    }

    fn run(steps: &[Step], c: [f64; 4]) -> [f64; 4] {
        let mut c = c;
        let mut stack = Vec::new();
        for s in steps {
            s.apply(&mut c, &mut stack).unwrap();
        }
        c
    }

    #[test]
    fn test_axisswap_order() {
        let steps = compile(&ctx(), "+proj=axisswap +order=2,1").unwrap();
        assert_eq!(run(&steps, [1.0, 2.0, 3.0, 4.0]), [2.0, 1.0, 3.0, 4.0]);
        let flip = compile(&ctx(), "+proj=axisswap +order=1,-2").unwrap();
        assert_eq!(run(&flip, [1.0, 2.0, 3.0, 4.0]), [1.0, -2.0, 3.0, 4.0]);
        assert!(compile(&ctx(), "+proj=axisswap +order=1,1").is_err());
        assert!(compile(&ctx(), "+proj=axisswap +order=5").is_err());
    }

    #[test]
    fn test_three_axis_rotation() {
        let steps = compile(&ctx(), "+proj=axisswap +order=3,1,2").unwrap();
        assert_eq!(run(&steps, [1.0, 2.0, 3.0, 0.0]), [3.0, 1.0, 2.0, 0.0]);
        assert_eq!(steps[0].to_proj().unwrap(), "+proj=axisswap +order=3,1,2");
    }

    #[test]
    fn test_inverse_step() {
        let steps =
            compile(&ctx(), "+proj=pipeline +step +inv +proj=unitconvert +xy_in=deg +xy_out=rad")
                .unwrap();
        let out = run(&steps, [PI, 0.0, 0.0, 0.0]);
        assert!((out[0] - 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_helmert_requires_convention() {
        assert!(compile(&ctx(), "+proj=helmert +x=1 +rx=1").is_err());
        let steps = compile(&ctx(), "+proj=helmert +x=1 +y=2 +z=3").unwrap();
        assert_eq!(run(&steps, [0.0; 4]), [1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_unknown_step() {
        assert!(compile(&ctx(), "+proj=krovak").is_err());
    }

    #[test]
    fn test_missing_grid_is_deferred() {
        let steps = compile(&ctx(), "+proj=hgridshift +grids=@absent.gsb").unwrap();
        match &steps[0] {
            Step::HGridShift { name, grid, .. } => {
                assert_eq!(name, "absent.gsb");
                assert!(grid.is_none());
            }
            other => panic!("unexpected step {other:?}"),
        }
    }
}
