// crates/gt_ops/src/executor/mod.rs

//! 管线执行器
//!
//! 把解析得到的 [`Operation`] 编译为 [`Pipeline`]（步骤列表），
//! 再对单个坐标或批量坐标按指定方向执行。
//!
//! # 失败语义
//!
//! - 编译失败（方法不支持、请求不可逆操作的逆）返回 `Err`
//! - 逐点数值失败（超出定义域、格网未覆盖或无数据、格网不可用）
//!   返回全无穷坐标，错误类别记录在上下文上
//!
//! # 示例
//!
//! ```
//! use gt_ops::prelude::*;
//!
//! let ctx = Context::with_config(GeoTransConfig::default());
//! let utm = Crs::utm_zone(32, true).unwrap();
//! let ops = resolve(&ctx, &Crs::wgs84(), &utm, &ctx.default_policy()).unwrap();
//! let out = executor::apply(&ctx, &ops[0], Direction::Forward, Coordinate::xy(0.0, 9.0)).unwrap();
//! assert!((out.x() - 500_000.0).abs() < 1e-6);
//! ```

mod compile;
mod proj;
mod step;

pub use step::Step;

use crate::context::Context;
use gt_foundation::{GtError, GtResult, TransformErrorKind};
use gt_geo::prelude::*;
use rayon::prelude::*;

/// 批量执行切换到并行的坐标数量
pub const PARALLEL_THRESHOLD: usize = 1000;

// ============================================================================
// 编译后的管线
// ============================================================================

/// 编译后的管线
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    forward: Vec<Step>,
    inverse: Option<Vec<Step>>,
}

impl Pipeline {
    /// 编译操作
    ///
    /// # Errors
    /// 方法不支持、坐标轴无法识别或参数无效时返回 `OperationInvalid`
    pub fn compile(ctx: &Context, op: &Operation) -> GtResult<Self> {
        let forward = compile::operation_steps(ctx, op)?;
        let inverse = compile::invert(&forward);
        tracing::debug!(
            "编译操作 {}：{} 个步骤{}",
            op.name,
            forward.len(),
            if inverse.is_some() { "" } else { "（不可逆）" }
        );
        Ok(Self {
            name: op.name.clone(),
            forward,
            inverse,
        })
    }

    /// 由 proj-string 管线文本直接编译（不做端点归一化）
    ///
    /// # Errors
    /// 语法错误或步骤不支持时返回错误
    pub fn from_proj_string(ctx: &Context, text: &str) -> GtResult<Self> {
        let forward = compile::optimize(proj::compile(ctx, text)?);
        let inverse = compile::invert(&forward);
        Ok(Self {
            name: text.to_string(),
            forward,
            inverse,
        })
    }

    /// 操作名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 正向步骤
    pub fn steps(&self) -> &[Step] {
        &self.forward
    }

    /// 是否可逆
    pub fn is_invertible(&self) -> bool {
        self.inverse.is_some()
    }

    /// 对单个坐标执行
    ///
    /// # Errors
    /// 输入非有限、超出定义域或格网失败时返回对应类别；没有逆时返回 `NoInverse`
    pub fn run(&self, direction: Direction, coord: Coordinate) -> Result<Coordinate, TransformErrorKind> {
        let steps = match direction {
            Direction::Forward => &self.forward,
            Direction::Inverse => self.inverse.as_ref().ok_or(TransformErrorKind::NoInverse)?,
        };
        if !coord.is_finite() {
            return Err(TransformErrorKind::InvalidCoordinate);
        }
        let mut c = coord.0;
        let mut stack = Vec::new();
        for step in steps {
            step.apply(&mut c, &mut stack)?;
        }
        let out = Coordinate(c);
        if !out.is_finite() {
            return Err(TransformErrorKind::OutsideProjectionDomain);
        }
        Ok(out)
    }

    /// 导出为 proj-string
    pub fn to_proj_string(&self) -> String {
        let parts: Vec<String> = self.forward.iter().filter_map(Step::to_proj).collect();
        match parts.as_slice() {
            [] => "+proj=noop".to_string(),
            [single] => single.clone(),
            _ => {
                let mut s = String::from("+proj=pipeline");
                for p in &parts {
                    s.push_str(" +step ");
                    s.push_str(p);
                }
                s
            }
        }
    }

    /// 请求方向可执行，否则返回 `OperationInvalid`
    fn require(&self, direction: Direction) -> GtResult<()> {
        if direction == Direction::Inverse && !self.is_invertible() {
            return Err(GtError::operation_invalid(format!(
                "操作 {} 没有逆",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// 执行
// ============================================================================

/// 对单个坐标执行操作
///
/// 数值失败返回 [`Coordinate::ERROR`]，错误类别写入 `ctx.last_error()`。
///
/// # Errors
/// 操作无法编译或请求了不可逆操作的逆时返回 `Err`
pub fn apply(ctx: &Context, op: &Operation, direction: Direction, coord: Coordinate) -> GtResult<Coordinate> {
    let pipeline = Pipeline::compile(ctx, op)?;
    pipeline.require(direction)?;
    Ok(run_recording(ctx, &pipeline, direction, coord))
}

fn run_recording(ctx: &Context, pipeline: &Pipeline, direction: Direction, coord: Coordinate) -> Coordinate {
    pipeline.run(direction, coord).unwrap_or_else(|kind| {
        ctx.set_last_error(kind);
        Coordinate::ERROR
    })
}

/// 批量执行，返回 (结果, 是否有任一失败)
///
/// 输出顺序与输入一致；超过 [`PARALLEL_THRESHOLD`] 个坐标时并行执行。
/// 上下文错误记录为第一个失败元素的类别。
///
/// # Errors
/// 同 [`apply`]
pub fn apply_batch(
    ctx: &Context,
    op: &Operation,
    direction: Direction,
    coords: &[Coordinate],
) -> GtResult<(Vec<Coordinate>, bool)> {
    let pipeline = Pipeline::compile(ctx, op)?;
    pipeline.require(direction)?;

    let run = |c: &Coordinate| pipeline.run(direction, *c);
    let results: Vec<Result<Coordinate, TransformErrorKind>> = if coords.len() > PARALLEL_THRESHOLD {
        coords.par_iter().map(run).collect()
    } else {
        coords.iter().map(run).collect()
    };

    let first_error = results.iter().find_map(|r| r.as_ref().err().copied());
    if let Some(kind) = first_error {
        ctx.set_last_error(kind);
        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::debug!("批量执行 {}：{}/{} 个坐标失败", op.name, failed, coords.len());
    }
    let out = results
        .into_iter()
        .map(|r| r.unwrap_or(Coordinate::ERROR))
        .collect();
    Ok((out, first_error.is_some()))
}

/// 往返诊断：执行 n 次（正向 + 逆向），返回起止坐标前三个分量的欧氏距离
///
/// 中途失败时返回无穷大。
///
/// # Errors
/// 操作无法编译或不可逆时返回 `Err`
pub fn roundtrip(
    ctx: &Context,
    op: &Operation,
    direction: Direction,
    n: usize,
    coord: Coordinate,
) -> GtResult<f64> {
    let pipeline = Pipeline::compile(ctx, op)?;
    pipeline.require(direction)?;
    pipeline.require(direction.reverse())?;

    let mut c = coord;
    for _ in 0..n {
        let result = pipeline
            .run(direction, c)
            .and_then(|mid| pipeline.run(direction.reverse(), mid));
        match result {
            Ok(next) => c = next,
            Err(kind) => {
                ctx.set_last_error(kind);
                return Ok(f64::INFINITY);
            }
        }
    }
    Ok(coord.distance_3d(&c))
}

/// 变换矩形范围
///
/// 每条边加密 `densify` 个内点后逐点变换，返回成功点的
/// `[xmin, ymin, xmax, ymax]`；全部失败时返回全无穷并记录错误。
///
/// # Errors
/// 同 [`apply`]
pub fn transform_bounds(
    ctx: &Context,
    op: &Operation,
    direction: Direction,
    bounds: [f64; 4],
    densify: usize,
) -> GtResult<[f64; 4]> {
    let [xmin, ymin, xmax, ymax] = bounds;
    if !(xmin <= xmax && ymin <= ymax) {
        return Err(GtError::invalid_input(format!("无效范围 {bounds:?}")));
    }
    let pipeline = Pipeline::compile(ctx, op)?;
    pipeline.require(direction)?;

    let segments = densify + 1;
    let lerp = |a: f64, b: f64, i: usize| a + (b - a) * i as f64 / segments as f64;
    let mut points = Vec::with_capacity(4 * segments);
    for i in 0..segments {
        points.push(Coordinate::xy(lerp(xmin, xmax, i), ymin));
        points.push(Coordinate::xy(xmax, lerp(ymin, ymax, i)));
        points.push(Coordinate::xy(lerp(xmax, xmin, i), ymax));
        points.push(Coordinate::xy(xmin, lerp(ymax, ymin, i)));
    }

    let mut out = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
    let mut any = false;
    let mut first_error = None;
    for p in points {
        match pipeline.run(direction, p) {
            Ok(c) => {
                any = true;
                out[0] = out[0].min(c.x());
                out[1] = out[1].min(c.y());
                out[2] = out[2].max(c.x());
                out[3] = out[3].max(c.y());
            }
            Err(kind) => {
                first_error.get_or_insert(kind);
            }
        }
    }
    if !any {
        if let Some(kind) = first_error {
            ctx.set_last_error(kind);
        }
        return Ok([f64::INFINITY; 4]);
    }
    Ok(out)
}

/// 坐标在 CRS 中对应的经纬度（度，格林尼治）
///
/// 用于按点选择操作；无法定位时返回 `None`。
pub fn geographic_position(crs: &Crs, coord: Coordinate) -> Option<(f64, f64)> {
    let mut steps = compile::normalize_in(crs).ok()?;
    let horizontal = strip_bound(crs.horizontal_component().unwrap_or(crs));
    match &horizontal.kind {
        CrsKind::Geographic2D { .. } | CrsKind::Geographic3D { .. } => {}
        CrsKind::Projected { conversion, .. } => {
            let ellipsoid = horizontal.ellipsoid()?;
            let projection = Projection::from_conversion(conversion.single()?, ellipsoid).ok()?;
            steps.push(Step::Projection {
                projection,
                definition: String::new(),
                inverse: true,
            });
            if let Some(pm) = horizontal
                .horizontal_datum()
                .and_then(Datum::prime_meridian)
                .filter(|pm| !pm.is_greenwich())
            {
                steps.push(Step::PrimeMeridian {
                    offset: pm.longitude_rad(),
                });
            }
        }
        CrsKind::Geocentric { .. } => steps.push(Step::cart(horizontal.ellipsoid()?, true)),
        _ => return None,
    }

    let mut c = coord.0;
    let mut stack = Vec::new();
    for step in &steps {
        step.apply(&mut c, &mut stack).ok()?;
    }
    let (lon, lat) = (c[0].to_degrees(), c[1].to_degrees());
    (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
}

fn strip_bound(crs: &Crs) -> &Crs {
    match &crs.kind {
        CrsKind::Bound { base, .. } => strip_bound(base),
        _ => crs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_config::GeoTransConfig;
    use gt_geo::operation::methods;

    fn ctx() -> Context {
        Context::with_config(GeoTransConfig::default())
    }

    fn projection_op() -> Operation {
        let utm = Crs::utm_zone(32, true).unwrap();
        let base = utm.geodetic_crs().unwrap().clone();
        utm.conversion()
            .unwrap()
            .clone()
            .with_crs(Some(base), Some(utm.clone()))
    }

    #[test]
    fn test_apply_forward_inverse() {
        let ctx = ctx();
        let op = projection_op();
        let c = Coordinate::xy(48.0, 10.0);
        let en = apply(&ctx, &op, Direction::Forward, c).unwrap();
        assert!(en.x() > 500_000.0 && en.y() > 5_000_000.0);
        let back = apply(&ctx, &op, Direction::Inverse, en).unwrap();
        assert!(back.distance_3d(&c) < 1e-9);
        assert_eq!(ctx.last_error(), None);
    }

    #[test]
    fn test_out_of_domain_latitude() {
        let ctx = ctx();
        let op = projection_op();
        let out = apply(&ctx, &op, Direction::Forward, Coordinate::xy(91.0, 9.0)).unwrap();
        assert!(out.is_error());
        assert_eq!(ctx.last_error(), Some(TransformErrorKind::InvalidCoordinate));
    }

    #[test]
    fn test_non_finite_input() {
        let ctx = ctx();
        let out = apply(&ctx, &projection_op(), Direction::Forward, Coordinate::xy(f64::NAN, 9.0)).unwrap();
        assert!(out.is_error());
    }

    #[test]
    fn test_batch_order_and_flag() {
        let ctx = ctx();
        let op = projection_op();
        let coords: Vec<Coordinate> = (0..(PARALLEL_THRESHOLD + 10))
            .map(|i| {
                if i == 7 {
                    Coordinate::xy(95.0, 9.0)
                } else {
                    Coordinate::xy(i as f64 * 0.05 - 40.0, 9.0)
                }
            })
            .collect();
        let (out, failed) = apply_batch(&ctx, &op, Direction::Forward, &coords).unwrap();
        assert!(failed);
        assert_eq!(out.len(), coords.len());
        assert!(out[7].is_error());
        for (i, c) in out.iter().enumerate().filter(|(i, _)| *i != 7) {
            let expected = apply(&ctx, &op, Direction::Forward, coords[i]).unwrap();
            assert_eq!(*c, expected, "element {i}");
        }

        let (_, any_failed) = apply_batch(&ctx, &op, Direction::Forward, &coords[..5]).unwrap();
        assert!(!any_failed);
    }

    #[test]
    fn test_singular_affine_inverse_rejected() {
        let ctx = ctx();
        let op = Operation::conversion(
            "Singular affine",
            Method::epsg(methods::AFFINE),
            vec![
                Param::measure(gt_geo::operation::params::A1, 1.0, Unit::UNITY),
                Param::measure(gt_geo::operation::params::A2, 1.0, Unit::UNITY),
                Param::measure(gt_geo::operation::params::B1, 1.0, Unit::UNITY),
                Param::measure(gt_geo::operation::params::B2, 1.0, Unit::UNITY),
            ],
        );
        let fwd = apply(&ctx, &op, Direction::Forward, Coordinate::xy(1.0, 2.0)).unwrap();
        assert_eq!(fwd, Coordinate::xy(3.0, 3.0));
        assert!(apply(&ctx, &op, Direction::Inverse, fwd).is_err());
        assert!(roundtrip(&ctx, &op, Direction::Forward, 1, fwd).is_err());
    }

    #[test]
    fn test_roundtrip_distance() {
        let ctx = ctx();
        let d = roundtrip(&ctx, &projection_op(), Direction::Forward, 10, Coordinate::xy(48.0, 10.0)).unwrap();
        assert!(d < 1e-8, "{d}");
    }

    #[test]
    fn test_transform_bounds() {
        let ctx = ctx();
        let b = transform_bounds(&ctx, &projection_op(), Direction::Forward, [47.0, 8.0, 49.0, 10.0], 10).unwrap();
        assert!(b[0] < 500_000.0 && b[2] > 500_000.0);
        assert!(b[1] < b[3]);
        assert!(transform_bounds(&ctx, &projection_op(), Direction::Forward, [1.0, 0.0, 0.0, 1.0], 0).is_err());
    }

    #[test]
    fn test_proj_string_export() {
        let ctx = ctx();
        let pipeline = Pipeline::compile(&ctx, &projection_op()).unwrap();
        assert_eq!(
            pipeline.to_proj_string(),
            "+proj=pipeline +step +proj=axisswap +order=2,1 \
             +step +proj=unitconvert +xy_in=deg +xy_out=rad \
             +step +proj=utm +zone=32 +ellps=WGS84"
        );
        let reparsed = Pipeline::from_proj_string(&ctx, &pipeline.to_proj_string()).unwrap();
        let c = Coordinate::xy(48.0, 10.0);
        let a = pipeline.run(Direction::Forward, c).unwrap();
        let b = reparsed.run(Direction::Forward, c).unwrap();
        assert!(a.distance_3d(&b) < 1e-6);
    }

    #[test]
    fn test_geographic_position() {
        let utm = Crs::utm_zone(32, true).unwrap();
        let (lon, lat) = geographic_position(&utm, Coordinate::xy(500_000.0, 0.0)).unwrap();
        assert!((lon - 9.0).abs() < 1e-9 && lat.abs() < 1e-9);
        let (lon, lat) = geographic_position(&Crs::wgs84(), Coordinate::xy(40.0, -100.0)).unwrap();
        assert!((lon + 100.0).abs() < 1e-12 && (lat - 40.0).abs() < 1e-12);
    }
}
