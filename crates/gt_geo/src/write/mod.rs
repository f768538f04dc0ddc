// crates/gt_geo/src/write/mod.rs
//! CRS 导出
//!
//! - [`Crs::to_proj_string`](crate::crs::Crs::to_proj_string)：紧凑的 `+key=value` 形式
//! - [`Crs::to_wkt`](crate::crs::Crs::to_wkt)：单行 WKT2-2019

mod proj_string;
mod wkt;
