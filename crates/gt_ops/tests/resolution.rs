//! 操作解析集成测试
//!
//! 以内置注册表复现北美、欧洲、澳大利亚的基准变换搜索场景。

mod common;

use common::{context, epsg, permissive};
use gt_ops::prelude::*;

#[test]
fn test_nad27_to_nad83_regional_candidates() {
    let ctx = context();
    let (nad27, nad83) = (epsg(&ctx, 4267), epsg(&ctx, 4269));
    let ops = resolve_operations(&ctx, &nad27, &nad83, &permissive(&ctx)).unwrap();

    assert!(ops.len() >= 4, "候选数量 {}", ops.len());
    assert!(!ops[0].is_ballpark());
    assert!(ops.last().unwrap().is_ballpark());
    assert_eq!(ops.iter().filter(|op| op.is_ballpark()).count(), 1);
    for op in &ops[..ops.len() - 1] {
        assert_eq!(op.grids.len(), 1, "{}", op.name);
    }
}

#[test]
fn test_suggested_operation_by_position() {
    let ctx = context();
    let (nad27, nad83) = (epsg(&ctx, 4267), epsg(&ctx, 4269));
    let ops = resolve_operations(&ctx, &nad27, &nad83, &permissive(&ctx)).unwrap();

    let conus = suggested_operation(&ops, Direction::Forward, Coordinate::xy(40.0, -100.0));
    assert_eq!(ops[conus].name, "NAD27 to NAD83 (1)");

    // 阿拉斯加范围跨越反子午线
    let alaska = suggested_operation(&ops, Direction::Forward, Coordinate::xy(64.0, -150.0));
    assert_eq!(ops[alaska].name, "NAD27 to NAD83 (2)");
    let aleutians = suggested_operation(&ops, Direction::Forward, Coordinate::xy(52.0, 175.0));
    assert_eq!(ops[aleutians].name, "NAD27 to NAD83 (2)");

    // 逆向时坐标位于目标 CRS
    let inverse: Vec<Operation> = ops.iter().map(Operation::inverse).collect();
    let back = suggested_operation(&inverse, Direction::Inverse, Coordinate::xy(40.0, -100.0));
    assert_eq!(ops[back].name, "NAD27 to NAD83 (1)");
}

#[test]
fn test_grid_availability_filters() {
    let ctx = context();
    let (nad27, nad83) = (epsg(&ctx, 4267), epsg(&ctx, 4269));
    let policy = ctx
        .default_policy()
        .with_spatial_criterion(SpatialCriterion::PartialIntersection)
        .with_grid_availability(GridAvailability::DiscardIfUnavailable);
    let ops = resolve_operations(&ctx, &nad27, &nad83, &policy).unwrap();

    // 格网均不可用：只剩 ballpark
    assert_eq!(ops.len(), 1);
    assert!(ops[0].is_ballpark());
}

#[test]
fn test_ballpark_only_pair() {
    let ctx = context();
    let (nad27, etrs89) = (epsg(&ctx, 4267), epsg(&ctx, 4258));

    let ops = resolve_operations(&ctx, &nad27, &etrs89, &permissive(&ctx)).unwrap();
    assert_eq!(ops.len(), 1);
    assert!(ops[0].is_ballpark());
    assert!(ops[0].area.is_none());

    let none = resolve_operations(&ctx, &nad27, &etrs89, &permissive(&ctx).with_ballpark(false))
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_pivot_concatenation() {
    let ctx = context();
    let (ed50, rgf93) = (epsg(&ctx, 4230), epsg(&ctx, 4171));

    let ops = resolve_operations(&ctx, &ed50, &rgf93, &permissive(&ctx)).unwrap();
    assert_eq!(
        ops[0].name,
        "ED50 to ETRS89 (10) + Inverse of RGF93 v1 to ETRS89 (1)"
    );
    assert!(!ops[0].is_ballpark());

    let steps = ops[0].steps();
    assert_eq!(steps.len(), 2);
    let leg1_target = steps[0].target_crs.as_deref().unwrap();
    let leg2_source = steps[1].source_crs.as_deref().unwrap();
    assert!(leg1_target.is_equivalent_to(leg2_source, Criterion::Equivalent, None));
    assert_eq!(leg1_target.id, Some(Identifier::epsg(4258)));

    let direct_only = permissive(&ctx).with_pivot_use(PivotUse::Never);
    let ops = resolve_operations(&ctx, &ed50, &rgf93, &direct_only).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].name, "Ballpark geographic offset from ED50 to RGF93 v1");
}

#[test]
fn test_allowed_pivots_restrict_search() {
    let ctx = context();
    let (ed50, rgf93) = (epsg(&ctx, 4230), epsg(&ctx, 4171));
    let policy = permissive(&ctx).with_allowed_pivots(vec![Identifier::epsg(4326)]);
    let ops = resolve_operations(&ctx, &ed50, &rgf93, &policy).unwrap();
    assert!(ops.iter().all(Operation::is_ballpark));
}

#[test]
fn test_discard_superseded() {
    let ctx = context();
    let (agd84, wgs84) = (epsg(&ctx, 4203), epsg(&ctx, 4326));

    let keep = resolve_operations(&ctx, &agd84, &wgs84, &permissive(&ctx).with_discard_superseded(false))
        .unwrap();
    let discard = resolve_operations(&ctx, &agd84, &wgs84, &permissive(&ctx).with_discard_superseded(true))
        .unwrap();
    assert_eq!(keep.len(), discard.len() + 1);
    assert!(keep.iter().any(|op| op.name == "AGD84 to WGS 84 (3)"));
    assert!(!discard.iter().any(|op| op.name == "AGD84 to WGS 84 (3)"));
    // 已废弃的操作默认不出现
    assert!(!keep.iter().any(|op| op.name == "AGD84 to WGS 84 (1)"));
}

#[test]
fn test_ranking_prefers_accuracy_within_same_area() {
    let ctx = context();
    let (agd84, wgs84) = (epsg(&ctx, 4203), epsg(&ctx, 4326));
    let ops = resolve_operations(&ctx, &agd84, &wgs84, &permissive(&ctx)).unwrap();

    let regional: Vec<&Operation> = ops.iter().filter(|op| !op.is_ballpark()).collect();
    for pair in regional.windows(2) {
        assert!(pair[0].accuracy() <= pair[1].accuracy(), "{} / {}", pair[0].name, pair[1].name);
    }
    assert_eq!(regional[0].name, "AGD84 to WGS 84 (9)");
}

#[test]
fn test_projected_to_geographic() {
    let ctx = context();
    let utm = epsg(&ctx, 32632);
    let ops = resolve_operations(&ctx, &utm, &Crs::wgs84(), &ctx.default_policy()).unwrap();
    assert!(!ops.is_empty());
    assert!(!ops[0].is_ballpark());

    let out = apply(&ctx, &ops[0], Direction::Forward, Coordinate::xy(500_000.0, 0.0)).unwrap();
    assert!(out.x().abs() < 1e-9);
    assert!((out.y() - 9.0).abs() < 1e-9);
}

#[test]
fn test_parse_crs_utm_base() {
    let ctx = context();
    let utm = parse_crs(&ctx, "+proj=utm +zone=32 +datum=WGS84 +type=crs").unwrap();
    assert!(utm.is_projected());
    let base = utm.geodetic_crs().unwrap();
    assert!(base
        .to_proj_string()
        .unwrap()
        .contains("+proj=longlat +datum=WGS84"));
}

#[test]
fn test_helmert_from_proj_string_has_unknown_accuracy() {
    let ctx = context();
    let op = parse_operation(&ctx, "+proj=helmert +x=10 +y=20 +z=30").unwrap();
    assert_eq!(op.accuracy(), -1.0);
    assert!(!op.is_ballpark());
}
