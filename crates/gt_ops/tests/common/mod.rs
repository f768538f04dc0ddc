//! 集成测试公共工具
//!
//! 合成 NTv2 / GTX 格网字节与常用上下文。

#![allow(dead_code)]

use gt_ops::prelude::*;
use std::sync::Arc;

/// 默认配置的上下文（不读取环境变量）
pub fn context() -> Context {
    Context::with_config(GeoTransConfig::default())
}

/// 以内存提供者为格网来源的上下文
pub fn context_with_grids(grids: &[(&str, Vec<u8>)]) -> (Context, Arc<MemoryGridProvider>) {
    let provider = Arc::new(MemoryGridProvider::new());
    for (name, bytes) in grids {
        provider.insert(*name, bytes.clone());
    }
    let ctx = context().with_grid_provider(provider.clone());
    (ctx, provider)
}

/// 注册表中的 EPSG CRS
pub fn epsg(ctx: &Context, code: u32) -> Crs {
    parse_crs(ctx, &format!("EPSG:{code}")).unwrap()
}

/// 部分相交、忽略格网可用性的策略
pub fn permissive(ctx: &Context) -> SearchPolicy {
    ctx.default_policy()
        .with_spatial_criterion(SpatialCriterion::PartialIntersection)
        .with_grid_availability(GridAvailability::Ignore)
}

// ============================================================================
// NTv2
// ============================================================================

fn key(out: &mut Vec<u8>, name: &str) {
    let mut k = [b' '; 8];
    k[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&k);
}

fn record_text(out: &mut Vec<u8>, name: &str, value: &str) {
    key(out, name);
    let mut v = [b' '; 8];
    v[..value.len()].copy_from_slice(value.as_bytes());
    out.extend_from_slice(&v);
}

fn record_int(out: &mut Vec<u8>, name: &str, value: i32) {
    key(out, name);
    out.extend_from_slice(&value.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
}

fn record_float(out: &mut Vec<u8>, name: &str, value: f64) {
    key(out, name);
    out.extend_from_slice(&value.to_le_bytes());
}

/// 单子网格 NTv2（小端），范围以度给出（东经为正），偏移为常数角秒（东、北为正）
pub fn ntv2_constant(
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    step: f64,
    dlon_arcsec: f32,
    dlat_arcsec: f32,
) -> Vec<u8> {
    let cols = ((east - west) / step).round() as i32 + 1;
    let rows = ((north - south) / step).round() as i32 + 1;

    let mut out = Vec::new();
    record_int(&mut out, "NUM_OREC", 11);
    record_int(&mut out, "NUM_SREC", 11);
    record_int(&mut out, "NUM_FILE", 1);
    record_text(&mut out, "GS_TYPE", "SECONDS");
    record_text(&mut out, "VERSION", "NTv2.0");
    record_text(&mut out, "SYSTEM_F", "NAD27");
    record_text(&mut out, "SYSTEM_T", "NAD83");
    record_float(&mut out, "MAJOR_F", 6_378_206.4);
    record_float(&mut out, "MINOR_F", 6_356_583.8);
    record_float(&mut out, "MAJOR_T", 6_378_137.0);
    record_float(&mut out, "MINOR_T", 6_356_752.314_140);
    record_text(&mut out, "SUB_NAME", "SYNTH");
    record_text(&mut out, "PARENT", "NONE");
    record_text(&mut out, "CREATED", "");
    record_text(&mut out, "UPDATED", "");
    record_float(&mut out, "S_LAT", south * 3600.0);
    record_float(&mut out, "N_LAT", north * 3600.0);
    // 文件中经度以西为正
    record_float(&mut out, "E_LONG", -east * 3600.0);
    record_float(&mut out, "W_LONG", -west * 3600.0);
    record_float(&mut out, "LAT_INC", step * 3600.0);
    record_float(&mut out, "LONG_INC", step * 3600.0);
    record_int(&mut out, "GS_COUNT", rows * cols);
    for _ in 0..rows * cols {
        for v in [dlat_arcsec, -dlon_arcsec, 0.0, 0.0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

// ============================================================================
// GTX
// ============================================================================

/// 常数值 GTX 格网，范围以度给出
pub fn gtx_constant(west: f64, south: f64, step: f64, rows: i32, cols: i32, value: f32) -> Vec<u8> {
    let mut out = Vec::new();
    for v in [south, west, step, step] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&rows.to_be_bytes());
    out.extend_from_slice(&cols.to_be_bytes());
    for _ in 0..rows * cols {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out
}
