// crates/gt_geo/src/lib.rs
//! GeoTrans 地理模型层
//!
//! 提供坐标参考系统 (CRS) 的数据模型、定义解析与导出，以及执行器使用的投影数值核心。
//!
//! # 模块
//!
//! - `units` / `ellipsoid` / `datum` / `cs`：单位、椭球、基准与坐标系
//! - `crs`：CRS 封闭枚举及其不变量
//! - `operation`：坐标操作（转换、变换、串联）与 EPSG 方法/参数代码
//! - `compare`：三个严格级别的等价比较
//! - `parse` / `write`：proj-string、WKT 的解析与导出
//! - `projection`：横轴墨卡托、墨卡托、地心转换、Helmert、仿射
//!
//! # 示例
//!
//! ```
//! use gt_geo::prelude::*;
//!
//! let parsed = parse_definition("+proj=utm +zone=50 +datum=WGS84 +type=crs").unwrap();
//! let Definition::Crs(parsed) = parsed else { unreachable!() };
//! let utm = parsed.value;
//! assert!(utm.is_projected());
//!
//! let epsg = Crs::utm_zone(50, true).unwrap();
//! assert!(utm.is_equivalent_to(&epsg, Criterion::Equivalent, None));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod area;
pub mod compare;
pub mod coordinate;
pub mod crs;
pub mod cs;
pub mod datum;
pub mod ellipsoid;
pub mod error;
pub mod identifier;
pub mod operation;
pub mod parse;
pub mod projection;
pub mod units;
pub mod write;

/// 预导入模块
pub mod prelude {
    pub use crate::area::Area;
    pub use crate::compare::{AliasResolver, Criterion};
    pub use crate::coordinate::Coordinate;
    pub use crate::crs::{Crs, CrsKind, CrsType};
    pub use crate::cs::{AxisDirection, AxisInfo, CoordinateSystem, CsKind};
    pub use crate::datum::{Datum, GeodeticFrame, PrimeMeridian, VerticalFrame};
    pub use crate::ellipsoid::Ellipsoid;
    pub use crate::error::{GeoError, GeoResult};
    pub use crate::identifier::Identifier;
    pub use crate::operation::{Direction, Method, Operation, OperationKind, Param};
    pub use crate::parse::{parse_definition, parse_operation, Definition};
    pub use crate::projection::Projection;
    pub use crate::units::Unit;
}

// 重导出常用类型
pub use compare::Criterion;
pub use coordinate::Coordinate;
pub use crs::Crs;
pub use error::{GeoError, GeoResult};
pub use operation::Operation;
