//! 管线执行集成测试
//!
//! 投影、基准变换、串联操作的数值行为与失败语义。

mod common;

use common::{context, epsg, permissive};
use gt_ops::prelude::*;

fn utm32_forward(ctx: &Context) -> Operation {
    let utm = epsg(ctx, 32632);
    let ops = resolve_operations(ctx, &Crs::wgs84(), &utm, &ctx.default_policy()).unwrap();
    ops.into_iter().next().unwrap()
}

#[test]
fn test_utm_roundtrip_inside_area() {
    let ctx = context();
    let op = utm32_forward(&ctx);
    for (lat, lon) in [(0.0, 9.0), (45.0, 7.5), (60.0, 11.9), (-30.0, 6.1)] {
        let d = roundtrip(&ctx, &op, Direction::Forward, 10, Coordinate::xy(lat, lon)).unwrap();
        assert!(d < 1e-9, "({lat}, {lon}) 往返误差 {d}");
    }
}

#[test]
fn test_out_of_domain_sets_flag_without_panic() {
    let ctx = context();
    let op = utm32_forward(&ctx);
    let coords = [
        Coordinate::xy(45.0, 9.0),
        Coordinate::xy(91.0, 9.0),
        Coordinate::xy(-120.0, 9.0),
        Coordinate::xy(f64::NAN, 9.0),
    ];
    let (out, failed) = apply_batch(&ctx, &op, Direction::Forward, &coords).unwrap();
    assert!(failed);
    assert!(out[0].is_finite());
    for c in &out[1..] {
        assert!(c.is_error());
        assert!(c.0.iter().all(|v| *v == f64::INFINITY));
    }
    assert_eq!(ctx.last_error(), Some(TransformErrorKind::InvalidCoordinate));
}

#[test]
fn test_batch_flag_iff_some_output_infinite() {
    let ctx = context();
    let op = utm32_forward(&ctx);

    let good: Vec<Coordinate> = (0..50).map(|i| Coordinate::xy(f64::from(i), 9.0)).collect();
    let (out, failed) = apply_batch(&ctx, &op, Direction::Forward, &good).unwrap();
    assert!(!failed);
    assert!(out.iter().all(Coordinate::is_finite));
    assert!(ctx.last_error().is_none());
}

#[test]
fn test_parallel_batch_preserves_order() {
    let ctx = context();
    let op = utm32_forward(&ctx);

    let n = executor::PARALLEL_THRESHOLD * 3;
    let coords: Vec<Coordinate> = (0..n)
        .map(|i| Coordinate::xy(-80.0 + 160.0 * i as f64 / n as f64, 9.0))
        .collect();
    let (out, failed) = apply_batch(&ctx, &op, Direction::Forward, &coords).unwrap();
    assert!(!failed);
    assert_eq!(out.len(), n);
    for (i, (c, o)) in coords.iter().zip(&out).enumerate() {
        let single = apply(&ctx, &op, Direction::Forward, *c).unwrap();
        assert_eq!(single, *o, "第 {i} 个坐标");
    }
    // 北向坐标随纬度单调增
    assert!(out.windows(2).all(|w| w[0].y() < w[1].y()));
}

#[test]
fn test_pivot_operation_roundtrip() {
    let ctx = context();
    let (ed50, rgf93) = (epsg(&ctx, 4230), epsg(&ctx, 4171));
    let ops = resolve_operations(&ctx, &ed50, &rgf93, &permissive(&ctx)).unwrap();
    let op = &ops[0];

    let paris = Coordinate::xy(48.85, 2.35);
    let out = apply(&ctx, op, Direction::Forward, paris).unwrap();
    assert!(out.is_finite());
    // ED50 → ETRS89 在巴黎约为 -2.6" 纬度、-3.4" 经度量级
    assert!((out.x() - paris.x()).abs() < 0.01);
    assert!((out.y() - paris.y()).abs() < 0.01);
    assert!(out.distance_3d(&paris) > 1e-5);

    let d = roundtrip(&ctx, op, Direction::Forward, 5, paris).unwrap();
    assert!(d < 1e-8, "往返误差 {d}");
}

#[test]
fn test_ballpark_is_identity() {
    let ctx = context();
    let (nad27, etrs89) = (epsg(&ctx, 4267), epsg(&ctx, 4258));
    let ops = resolve_operations(&ctx, &nad27, &etrs89, &permissive(&ctx)).unwrap();
    let c = Coordinate::xy(45.0, -75.0);
    let out = apply(&ctx, &ops[0], Direction::Forward, c).unwrap();
    assert!((out.x() - c.x()).abs() < 1e-12);
    assert!((out.y() - c.y()).abs() < 1e-12);
}

#[test]
fn test_singular_affine_inverse_rejected() {
    let ctx = context();
    let op = parse_operation(&ctx, "+proj=affine +s11=1 +s12=2 +s21=2 +s22=4").unwrap();
    let forward = apply(&ctx, &op, Direction::Forward, Coordinate::xy(1.0, 1.0)).unwrap();
    assert_eq!((forward.x(), forward.y()), (3.0, 6.0));
    assert!(matches!(
        apply(&ctx, &op, Direction::Inverse, Coordinate::xy(1.0, 1.0)),
        Err(GtError::OperationInvalid { .. })
    ));
}

#[test]
fn test_pipeline_text_execution() {
    let ctx = context();
    let op = parse_operation(
        &ctx,
        "+proj=pipeline +step +proj=axisswap +order=2,1 +step +proj=unitconvert +xy_in=deg +xy_out=rad \
         +step +proj=utm +zone=32 +ellps=WGS84",
    )
    .unwrap();
    let out = apply(&ctx, &op, Direction::Forward, Coordinate::xy(0.0, 9.0)).unwrap();
    assert!((out.x() - 500_000.0).abs() < 1e-6);
    assert!(out.y().abs() < 1e-6);

    let back = apply(&ctx, &op, Direction::Inverse, out).unwrap();
    assert!(back.x().abs() < 1e-9);
    assert!((back.y() - 9.0).abs() < 1e-9);
}

#[test]
fn test_proj_string_export_roundtrips() {
    let ctx = context();
    let op = utm32_forward(&ctx);
    let text = operation_to_proj_string(&ctx, &op).unwrap();
    assert!(text.starts_with("+proj=pipeline"));
    assert!(text.contains("+proj=utm +zone=32"));

    let reparsed = parse_operation(&ctx, &text).unwrap();
    let c = Coordinate::xy(47.0, 8.0);
    let a = apply(&ctx, &op, Direction::Forward, c).unwrap();
    let b = apply(&ctx, &reparsed, Direction::Forward, c).unwrap();
    assert!(a.distance_3d(&b) < 1e-9);
}

#[test]
fn test_transform_bounds_covers_corners() {
    let ctx = context();
    let op = utm32_forward(&ctx);
    // [xmin, ymin, xmax, ymax] 按输入轴顺序（纬度、经度）
    let bounds = transform_bounds(&ctx, &op, Direction::Forward, [40.0, 6.0, 50.0, 12.0], 10).unwrap();
    let sw = apply(&ctx, &op, Direction::Forward, Coordinate::xy(40.0, 6.0)).unwrap();
    let ne = apply(&ctx, &op, Direction::Forward, Coordinate::xy(50.0, 12.0)).unwrap();
    assert!(bounds[0] <= sw.x() && sw.x() <= bounds[2]);
    assert!(bounds[1] <= sw.y() && ne.y() <= bounds[3]);
    assert!(bounds[2] > 500_000.0 && bounds[0] < 500_000.0);
}

#[test]
fn test_transformer_batch() {
    let ctx = context();
    let utm = epsg(&ctx, 32632);
    let transformer = Transformer::new(&ctx, &Crs::wgs84(), &utm, &ctx.default_policy()).unwrap();
    transformer.require_operations().unwrap();
    let (out, failed) = transformer.transform_batch(
        Direction::Forward,
        &[Coordinate::xy(45.0, 9.0), Coordinate::xy(46.0, 9.0)],
    );
    assert!(!failed);
    assert!(out[0].y() < out[1].y());
    assert!(transformer.last_used_operation().is_some());
}

#[test]
fn test_current_context_boundary() {
    let op = with_current_context(utm32_forward);
    let out = with_current_context(|ctx| apply(ctx, &op, Direction::Forward, Coordinate::xy(0.0, 9.0)))
        .unwrap();
    assert!((out.x() - 500_000.0).abs() < 1e-6);
}
