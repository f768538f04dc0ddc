// crates/gt_ops/src/executor/compile.rs

//! 操作 → 步骤列表
//!
//! 单一操作编译为 `normalize_in(源)` + 方法步骤 + `normalize_out(目标)`；
//! 串联操作逐步编译后拼接。最后消去相邻的互逆步骤与恒等步骤，
//! 因此串联中间的轴/单位往返不会留在结果中。

use super::proj;
use super::step::{Step, IDENTITY_ORDER};
use crate::context::Context;
use crate::resolver::{NULL_METHOD, UNIT_CHANGE_METHOD};
use gt_foundation::{GtError, GtResult};
use gt_geo::cs::{AxisInfo, AxisRole};
use gt_geo::ellipsoid::Ellipsoid;
use gt_geo::operation::{methods, params, SingleOperation};
use gt_geo::prelude::*;
use gt_geo::projection::{Affine, Helmert, RotationConvention};
use gt_geo::units::UnitKind;

// ============================================================================
// 入口
// ============================================================================

/// 编译操作（正向）
pub(crate) fn operation_steps(ctx: &Context, op: &Operation) -> GtResult<Vec<Step>> {
    let steps = compile_op(ctx, op)?;
    Ok(optimize(steps))
}

/// 整个步骤列表的逆；任一步骤不可逆时返回 `None`
pub(crate) fn invert(steps: &[Step]) -> Option<Vec<Step>> {
    steps.iter().rev().map(Step::inverse).collect()
}

fn compile_op(ctx: &Context, op: &Operation) -> GtResult<Vec<Step>> {
    if op.is_concatenated() {
        let mut out = Vec::new();
        for step in op.steps() {
            out.extend(compile_op(ctx, step)?);
        }
        return Ok(out);
    }
    let single = op
        .single()
        .ok_or_else(|| GtError::internal("非串联操作缺少方法"))?;

    if single.method.is_proj_pipeline() {
        let text = single
            .text("PROJ string")
            .ok_or_else(|| GtError::operation_invalid(format!("操作 {} 缺少管线定义", op.name)))?;
        let steps = proj::compile(ctx, text)?;
        return if op.inverted {
            invert(&steps).ok_or_else(|| not_invertible(&op.name))
        } else {
            Ok(steps)
        };
    }

    // 反向的单一操作：按原方向（端点交换回来）编译后整体取逆
    let (src, tgt) = if op.inverted {
        (op.target_crs.as_deref(), op.source_crs.as_deref())
    } else {
        (op.source_crs.as_deref(), op.target_crs.as_deref())
    };
    let mut steps = Vec::new();
    if let Some(src) = src {
        steps.extend(normalize_in(src)?);
    }
    steps.extend(method_steps(ctx, op, single, src, tgt)?);
    if let Some(tgt) = tgt {
        steps.extend(normalize_out(tgt)?);
    }

    if op.inverted {
        invert(&steps).ok_or_else(|| not_invertible(&op.name))
    } else {
        Ok(steps)
    }
}

fn not_invertible(name: &str) -> GtError {
    GtError::operation_invalid(format!("操作 {name} 含有不可逆步骤"))
}

/// 去掉恒等步骤并消去相邻互逆步骤
pub(crate) fn optimize(steps: Vec<Step>) -> Vec<Step> {
    let mut out: Vec<Step> = Vec::with_capacity(steps.len());
    for step in steps {
        if step.is_identity() {
            continue;
        }
        if out.last().is_some_and(|last| last.cancels(&step)) {
            out.pop();
            continue;
        }
        out.push(step);
    }
    out
}

// ============================================================================
// 归一化
// ============================================================================

/// CRS 的全部坐标轴（复合 CRS 展开，绑定 CRS 取基础）
fn axes_of(crs: &Crs) -> Vec<&AxisInfo> {
    match &crs.kind {
        CrsKind::Compound { components } => components.iter().flat_map(axes_of).collect(),
        CrsKind::Bound { base, .. } => axes_of(base),
        _ => crs.cs().map(|cs| cs.axes.iter().collect()).unwrap_or_default(),
    }
}

fn strip_bound(crs: &Crs) -> &Crs {
    match &crs.kind {
        CrsKind::Bound { base, .. } => strip_bound(base),
        _ => crs,
    }
}

/// 水平部分（复合取首个分量，去掉绑定）
fn horizontal(crs: &Crs) -> &Crs {
    strip_bound(crs.horizontal_component().unwrap_or(crs))
}

/// 输入轴 → 规范位置的映射
fn axis_order(crs: &Crs) -> GtResult<([usize; 4], [f64; 4])> {
    let mut dest = IDENTITY_ORDER;
    let mut signs = [1.0; 4];

    // 单独的垂直 CRS：唯一的轴就在高程位置
    if strip_bound(crs).is_vertical() {
        if let Some((_, sign)) = axes_of(crs).first().and_then(|a| a.direction.role()) {
            signs[2] = sign;
        }
        return Ok((dest, signs));
    }

    let axes = axes_of(crs);
    if axes.len() > 4 {
        return Err(GtError::operation_invalid(format!(
            "{} 有 {} 个坐标轴",
            crs.name,
            axes.len()
        )));
    }
    let mut used = [false; 4];
    for (i, axis) in axes.iter().enumerate() {
        let (role, sign) = axis.direction.role().ok_or_else(|| {
            GtError::operation_invalid(format!("{} 的坐标轴 {} 方向未知", crs.name, axis.name))
        })?;
        let slot = match role {
            AxisRole::First => 0,
            AxisRole::Second => 1,
            AxisRole::Third => 2,
            AxisRole::Time => 3,
        };
        if used[slot] {
            return Err(GtError::operation_invalid(format!(
                "{} 的坐标轴方向重复",
                crs.name
            )));
        }
        used[slot] = true;
        dest[i] = slot;
        signs[i] = sign;
    }
    if axes.len() >= 2 && !(used[0] && used[1]) {
        return Err(GtError::operation_invalid(format!(
            "{} 缺少水平坐标轴",
            crs.name
        )));
    }

    // 未占用的输入位置依次填入未占用的规范位置
    let mut free = (0..4).filter(|s| !used[*s]);
    for d in dest.iter_mut().skip(axes.len()) {
        *d = free.next().unwrap_or(0);
    }
    Ok((dest, signs))
}

fn xy_unit(crs: &Crs) -> Unit {
    let h = horizontal(crs);
    if h.is_vertical() {
        return Unit::METRE;
    }
    h.cs()
        .and_then(CoordinateSystem::horizontal_unit)
        .cloned()
        .unwrap_or(Unit::METRE)
}

fn z_unit(crs: &Crs) -> Unit {
    let third = |c: &Crs| -> Option<Unit> {
        c.cs()?
            .axes
            .iter()
            .find(|a| matches!(a.direction.role(), Some((AxisRole::Third, _))))
            .map(|a| a.unit.clone())
    };
    let crs = strip_bound(crs);
    match &crs.kind {
        CrsKind::Compound { .. } => crs
            .vertical_component()
            .map(strip_bound)
            .and_then(|v| v.cs()?.axes.first().map(|a| a.unit.clone()))
            .unwrap_or(Unit::METRE),
        CrsKind::Vertical { cs, .. } => cs.axes.first().map_or(Unit::METRE, |a| a.unit.clone()),
        _ => third(crs).unwrap_or(Unit::METRE),
    }
}

fn si_of(unit: &Unit) -> Unit {
    if unit.kind == UnitKind::Angular {
        Unit::RADIAN
    } else {
        Unit::METRE
    }
}

/// 本初子午线经度 [rad]，格林尼治或非地理 CRS 为 `None`
fn prime_meridian_offset(crs: &Crs) -> Option<f64> {
    let h = horizontal(crs);
    h.horizontal_datum()
        .and_then(Datum::prime_meridian)
        .filter(|pm| !pm.is_greenwich())
        .map(PrimeMeridian::longitude_rad)
}

/// CRS 坐标 → 规范形式
pub(crate) fn normalize_in(crs: &Crs) -> GtResult<Vec<Step>> {
    let (dest, signs) = axis_order(crs)?;
    let xy = xy_unit(crs);
    let z = z_unit(crs);
    let mut steps = vec![
        Step::axis_swap(dest, signs),
        Step::UnitConvert {
            xy_out: si_of(&xy),
            xy_in: xy,
            z_out: Unit::METRE,
            z_in: z,
        },
    ];
    if horizontal(crs).is_geographic() {
        if let Some(offset) = prime_meridian_offset(crs) {
            steps.push(Step::PrimeMeridian { offset });
        }
    }
    Ok(steps)
}

/// 规范形式 → CRS 坐标
pub(crate) fn normalize_out(crs: &Crs) -> GtResult<Vec<Step>> {
    let steps = normalize_in(crs)?;
    invert(&steps).ok_or_else(|| GtError::internal("归一化步骤不可逆"))
}

// ============================================================================
// 方法
// ============================================================================

fn method_steps(
    ctx: &Context,
    op: &Operation,
    single: &SingleOperation,
    src: Option<&Crs>,
    tgt: Option<&Crs>,
) -> GtResult<Vec<Step>> {
    let Some(code) = single.method.code else {
        let name = single.method.name.as_str();
        if name == NULL_METHOD || name == UNIT_CHANGE_METHOD {
            return Ok(Vec::new());
        }
        return Err(unsupported(op));
    };

    let steps = match code {
        c if Projection::supports(c) => projection_steps(op, single, src, tgt)?,
        methods::GEOGRAPHIC_GEOCENTRIC => {
            let inverse = src.is_some_and(|s| strip_bound(s).is_geocentric());
            vec![Step::cart(&ellipsoid_of(src, tgt), inverse)]
        }
        methods::GEOCENTRIC_TRANSLATION_GEOG2D
        | methods::GEOCENTRIC_TRANSLATION_GEOCENTRIC
        | methods::POSITION_VECTOR_GEOG2D
        | methods::POSITION_VECTOR_GEOCENTRIC
        | methods::COORDINATE_FRAME_GEOG2D
        | methods::COORDINATE_FRAME_GEOCENTRIC => helmert_steps(op, single, code, src, tgt)?,
        methods::GEOGRAPHIC2D_OFFSETS => vec![Step::GeogOffset {
            dlon: single.value_or(params::LONGITUDE_OFFSET, 0.0),
            dlat: single.value_or(params::LATITUDE_OFFSET, 0.0),
        }],
        methods::LONGITUDE_ROTATION => vec![Step::GeogOffset {
            dlon: single.value_or(params::LONGITUDE_OFFSET, 0.0),
            dlat: 0.0,
        }],
        methods::VERTICAL_OFFSET => vec![Step::VerticalOffset {
            dz: single.value_or(params::VERTICAL_OFFSET, 0.0),
        }],
        methods::NTV2 => {
            let name = grid_file(op, single, params::NTV2_FILE)?;
            let grid = ctx.load_grid(name).ok().filter(|g| g.as_horizontal().is_some());
            vec![Step::HGridShift {
                name: name.to_string(),
                grid,
                inverse: false,
            }]
        }
        methods::GEOID_GTX => {
            let name = grid_file(op, single, params::GEOID_FILE)?;
            let grid = ctx.load_grid(name).ok().filter(|g| g.as_vertical().is_some());
            vec![Step::VGridShift {
                name: name.to_string(),
                grid,
                multiplier: -1.0,
            }]
        }
        methods::AFFINE => vec![Step::affine(Affine::new(
            [
                single.value_or(params::A0, 0.0),
                single.value_or(params::A1, 1.0),
                single.value_or(params::A2, 0.0),
            ],
            [
                single.value_or(params::B0, 0.0),
                single.value_or(params::B1, 0.0),
                single.value_or(params::B2, 1.0),
            ],
        ))],
        // 轴序、维度与单位的变化已由两端归一化完成
        methods::AXIS_ORDER_REVERSAL_2D
        | methods::AXIS_ORDER_REVERSAL_3D
        | methods::GEOGRAPHIC3D_TO_2D
        | methods::CHANGE_OF_VERTICAL_UNIT => Vec::new(),
        _ => return Err(unsupported(op)),
    };
    Ok(steps)
}

fn unsupported(op: &Operation) -> GtError {
    let method = op
        .single()
        .map_or("?", |s| s.method.name.as_str());
    GtError::operation_invalid(format!("操作 {} 的方法 {} 不支持执行", op.name, method))
}

fn grid_file<'a>(op: &Operation, single: &'a SingleOperation, code: u32) -> GtResult<&'a str> {
    single
        .file(code)
        .ok_or_else(|| GtError::operation_invalid(format!("操作 {} 缺少格网文件参数", op.name)))
}

fn ellipsoid_of(src: Option<&Crs>, tgt: Option<&Crs>) -> Ellipsoid {
    src.and_then(Crs::ellipsoid)
        .or_else(|| tgt.and_then(Crs::ellipsoid))
        .cloned()
        .unwrap_or(Ellipsoid::GRS80)
}

fn projection_steps(
    op: &Operation,
    single: &SingleOperation,
    src: Option<&Crs>,
    tgt: Option<&Crs>,
) -> GtResult<Vec<Step>> {
    let ellipsoid = ellipsoid_of(src, tgt);
    let projection = Projection::from_conversion(single, &ellipsoid)?;
    let definition = op.to_proj_step(Some(&ellipsoid))?;

    let mut steps = Vec::new();
    // 投影参数相对于基础 CRS 的本初子午线
    if let Some(offset) = src.or(tgt).and_then(prime_meridian_offset) {
        steps.push(Step::PrimeMeridian { offset: -offset });
    }
    steps.push(Step::Projection {
        projection,
        definition,
        inverse: false,
    });
    Ok(steps)
}

/// 该端是否保留输入高程（二维或高程另有来源）
fn keeps_height(crs: &Crs) -> bool {
    match &crs.kind {
        CrsKind::Geographic2D { .. } | CrsKind::Compound { .. } | CrsKind::Projected { .. } => true,
        CrsKind::Bound { base, .. } => keeps_height(base),
        _ => false,
    }
}

fn helmert_steps(
    op: &Operation,
    single: &SingleOperation,
    code: u32,
    src: Option<&Crs>,
    tgt: Option<&Crs>,
) -> GtResult<Vec<Step>> {
    let t = [
        single.value_or(params::TX, 0.0),
        single.value_or(params::TY, 0.0),
        single.value_or(params::TZ, 0.0),
    ];
    let convention = match code {
        methods::GEOCENTRIC_TRANSLATION_GEOG2D | methods::GEOCENTRIC_TRANSLATION_GEOCENTRIC => None,
        methods::POSITION_VECTOR_GEOG2D | methods::POSITION_VECTOR_GEOCENTRIC => {
            Some(RotationConvention::PositionVector)
        }
        _ => Some(RotationConvention::CoordinateFrame),
    };
    let helmert = match convention {
        None => Helmert::translation(t),
        Some(convention) => {
            let r = [
                single.value_or(params::RX, 0.0),
                single.value_or(params::RY, 0.0),
                single.value_or(params::RZ, 0.0),
            ];
            let ds = single.value_or(params::SCALE_DIFFERENCE, 0.0);
            Helmert::new(t, r, ds, convention).ok_or_else(|| {
                GtError::operation_invalid(format!("操作 {} 的 Helmert 矩阵奇异", op.name))
            })?
        }
    };

    let geographic = |c: Option<&Crs>| {
        c.and_then(Crs::geodetic_crs)
            .filter(|g| g.is_geographic())
            .and_then(Crs::ellipsoid)
            .cloned()
    };
    let keep_z = src.is_some_and(keeps_height) || tgt.is_some_and(keeps_height);

    let mut steps = Vec::new();
    if keep_z {
        steps.push(Step::push_z());
    }
    if let Some(e) = geographic(src) {
        steps.push(Step::cart(&e, false));
    }
    steps.push(Step::Helmert {
        helmert,
        inverse: false,
    });
    if let Some(e) = geographic(tgt) {
        steps.push(Step::cart(&e, true));
    }
    if keep_z {
        steps.push(Step::pop_z());
    }
    Ok(steps)
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
    fn test_normalize_lat_lon_degrees() {
        let steps = normalize_in(&Crs::wgs84()).unwrap();
        let out = run(&steps, [45.0, 10.0, 5.0, 0.0]);
        assert!((out[0] - 10f64.to_radians()).abs() < 1e-15);
        assert!((out[1] - 45f64.to_radians()).abs() < 1e-15);
        assert_eq!(out[2], 5.0);
        let back = run(&normalize_out(&Crs::wgs84()).unwrap(), out);
        assert!((back[0] - 45.0).abs() < 1e-12 && (back[1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_roundtrip_cancels() {
        let wgs = Crs::wgs84();
        let mut steps = normalize_out(&wgs).unwrap();
        steps.extend(normalize_in(&wgs).unwrap());
        assert!(optimize(steps).is_empty());
    }

    #[test]
    fn test_axis_swap_conversion_compiles_to_swap() {
        let src = Crs::wgs84();
        let tgt = src.east_first();
        let op = Operation::conversion(
            "Axis order reversal",
            Method::epsg(methods::AXIS_ORDER_REVERSAL_2D),
            Vec::new(),
        )
        .with_crs(Some(src), Some(tgt))
        .exact();
        let steps = operation_steps(&ctx(), &op).unwrap();
        assert_eq!(steps.len(), 1);
        let out = run(&steps, [45.0, 10.0, 0.0, 0.0]);
        assert_eq!(out, [10.0, 45.0, 0.0, 0.0]);
    }

    #[test]
    fn test_projection_steps() {
        let utm = Crs::utm_zone(32, true).unwrap();
        let base = utm.geodetic_crs().unwrap().clone();
        let op = utm
            .conversion()
            .unwrap()
            .clone()
            .with_crs(Some(base), Some(utm.clone()));
        let steps = operation_steps(&ctx(), &op).unwrap();
        let out = run(&steps, [0.0, 9.0, 0.0, 0.0]);
        assert!((out[0] - 500_000.0).abs() < 1e-6, "{}", out[0]);
        assert!(out[1].abs() < 1e-6);

        let inverse = operation_steps(&ctx(), &op.inverse()).unwrap();
        let back = run(&inverse, out);
        assert!(back[0].abs() < 1e-9 && (back[1] - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_method() {
        let op = Operation::conversion("Mystery", Method::named("Mystery"), Vec::new());
        assert!(operation_steps(&ctx(), &op).is_err());
    }
}
