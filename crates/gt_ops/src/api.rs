// crates/gt_ops/src/api.rs

//! 对外调用面
//!
//! 以显式 [`Context`] 为第一个参数的自由函数。解析警告通过 `tracing::warn!` 输出，
//! 数值失败的约定见 [`crate::executor`]。
//!
//! [`with_current_context`] 是唯一的“当前上下文”访问入口，仅供边界层
//! （绑定、命令行）使用；核心代码始终显式传递上下文。

use crate::context::Context;
use crate::executor::{self, Pipeline};
use crate::registry::{resolve_crs, ObjectCategory};
use crate::resolver::{self, SearchPolicy};
use gt_foundation::{GtError, GtResult, Parsed};
use gt_geo::prelude::*;
use std::cell::RefCell;

// ============================================================================
// 解析
// ============================================================================

fn report_warnings<T>(what: &str, parsed: Parsed<T>) -> T {
    for warning in &parsed.warnings {
        tracing::warn!("{}: {}", what, warning);
    }
    parsed.value
}

/// 解析 CRS 定义（权威引用、WKT 或 proj-string）
///
/// 权威引用通过上下文的注册表解析。
///
/// ```
/// use gt_ops::prelude::*;
///
/// let ctx = Context::new();
/// let crs = parse_crs(&ctx, "EPSG:4326").unwrap();
/// assert!(crs.is_geographic());
/// ```
///
/// # Errors
/// 语法错误返回 `GtError::Parse`；引用在注册表中不存在时返回 `NotFound`
pub fn parse_crs(ctx: &Context, definition: &str) -> GtResult<Crs> {
    let parsed = match parse_definition(definition)? {
        Definition::Reference(id) => resolve_crs(ctx.registry(), &id)?,
        Definition::Crs(parsed) => parsed,
    };
    let crs = report_warnings(definition, parsed);
    crs.validate()?;
    Ok(crs)
}

/// 解析坐标操作定义（权威引用、proj-string 管线或 WKT `CONVERSION`）
///
/// # Errors
/// 语法错误返回 `GtError::Parse`；引用在注册表中不存在时返回 `NotFound`
pub fn parse_operation(ctx: &Context, text: &str) -> GtResult<Operation> {
    if let Some(id) = Identifier::parse_reference(text) {
        let definition = ctx
            .registry()
            .lookup_definition(&id.authority, &id.code, ObjectCategory::CoordinateOperation)
            .ok_or_else(|| GtError::not_found(format!("坐标操作 {id}")))?;
        let parsed = gt_geo::parse::parse_operation(&definition)?;
        return Ok(report_warnings(text, parsed).with_id(id));
    }
    let parsed = gt_geo::parse::parse_operation(text)?;
    Ok(report_warnings(text, parsed))
}

// ============================================================================
// 解析与执行
// ============================================================================

/// 解析源到目标的候选操作（按排序）
///
/// # Errors
/// 端点 CRS 无效时返回错误；没有候选时返回空列表
pub fn resolve_operations(
    ctx: &Context,
    source: &Crs,
    target: &Crs,
    policy: &SearchPolicy,
) -> GtResult<Vec<Operation>> {
    resolver::resolve(ctx, source, target, policy)
}

/// 执行单个坐标，见 [`executor::apply`]
///
/// # Errors
/// 同 [`executor::apply`]
pub fn apply(ctx: &Context, op: &Operation, direction: Direction, coord: Coordinate) -> GtResult<Coordinate> {
    executor::apply(ctx, op, direction, coord)
}

/// 批量执行，见 [`executor::apply_batch`]
///
/// # Errors
/// 同 [`executor::apply`]
pub fn apply_batch(
    ctx: &Context,
    op: &Operation,
    direction: Direction,
    coords: &[Coordinate],
) -> GtResult<(Vec<Coordinate>, bool)> {
    executor::apply_batch(ctx, op, direction, coords)
}

/// 往返诊断，见 [`executor::roundtrip`]
///
/// # Errors
/// 同 [`executor::roundtrip`]
pub fn roundtrip(
    ctx: &Context,
    op: &Operation,
    direction: Direction,
    n: usize,
    coord: Coordinate,
) -> GtResult<f64> {
    executor::roundtrip(ctx, op, direction, n, coord)
}

/// 变换矩形范围，见 [`executor::transform_bounds`]
///
/// # Errors
/// 同 [`executor::transform_bounds`]
pub fn transform_bounds(
    ctx: &Context,
    op: &Operation,
    direction: Direction,
    bounds: [f64; 4],
    densify: usize,
) -> GtResult<[f64; 4]> {
    executor::transform_bounds(ctx, op, direction, bounds, densify)
}

/// 按坐标位置选择候选，见 [`resolver::suggested_operation`]
pub fn suggested_operation(operations: &[Operation], direction: Direction, coord: Coordinate) -> usize {
    resolver::suggested_operation(operations, direction, coord)
}

/// 编译操作并导出为 proj-string 管线
///
/// # Errors
/// 操作无法编译时返回错误
pub fn operation_to_proj_string(ctx: &Context, op: &Operation) -> GtResult<String> {
    Ok(Pipeline::compile(ctx, op)?.to_proj_string())
}

// ============================================================================
// 当前上下文
// ============================================================================

thread_local! {
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// 以本线程的当前上下文调用 `f`，首次使用时以默认配置创建
///
/// `f` 内不得再次调用 [`with_current_context`] 或 [`set_current_context`]。
pub fn with_current_context<R>(f: impl FnOnce(&Context) -> R) -> R {
    CURRENT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let ctx = slot.get_or_insert_with(Context::new);
        f(ctx)
    })
}

/// 替换本线程的当前上下文，返回原上下文
pub fn set_current_context(ctx: Context) -> Option<Context> {
    CURRENT.with(|cell| cell.borrow_mut().replace(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_foundation::TransformErrorKind;

    #[test]
    fn test_parse_crs_reference_and_text() {
        let ctx = Context::new();
        let wgs84 = parse_crs(&ctx, "EPSG:4326").unwrap();
        assert_eq!(wgs84.id, Some(Identifier::epsg(4326)));

        let utm = parse_crs(&ctx, "+proj=utm +zone=32 +datum=WGS84 +type=crs").unwrap();
        assert!(utm.is_projected());
    }

    #[test]
    fn test_parse_crs_errors() {
        let ctx = Context::new();
        assert!(matches!(parse_crs(&ctx, "not a crs"), Err(GtError::Parse(_))));
        assert!(parse_crs(&ctx, "EPSG:999999").is_err());
    }

    #[test]
    fn test_parse_operation_reference() {
        let ctx = Context::new();
        let op = parse_operation(&ctx, "EPSG:16031").unwrap();
        assert_eq!(op.id, Some(Identifier::epsg(16031)));
        assert!(!op.is_ballpark());
    }

    #[test]
    fn test_operation_to_proj_string() {
        let ctx = Context::new();
        let op = parse_operation(&ctx, "+proj=pipeline +step +proj=axisswap +order=2,1").unwrap();
        assert_eq!(
            operation_to_proj_string(&ctx, &op).unwrap(),
            "+proj=axisswap +order=2,1"
        );
    }

    #[test]
    fn test_current_context() {
        let previous = set_current_context(Context::new());
        assert!(previous.is_none());
        with_current_context(|ctx| ctx.set_last_error(TransformErrorKind::NoOperation));
        assert_eq!(
            with_current_context(Context::last_error),
            Some(TransformErrorKind::NoOperation)
        );
        let replaced = set_current_context(Context::new()).unwrap();
        assert_eq!(replaced.last_error(), Some(TransformErrorKind::NoOperation));
        assert_eq!(with_current_context(Context::last_error), None);
    }
}
