// crates/gt_geo/src/compare.rs
//! 等价比较
//!
//! 三个严格程度：
//! - `Strict`：结构完全一致
//! - `Equivalent`：忽略名称、标识符、范围和备注，数值按相对容差比较
//! - `EquivalentExceptAxisOrder`：在 `Equivalent` 基础上忽略轴序，可借助别名解析器

use crate::crs::{Crs, CrsKind};
use crate::datum::{normalized_datum_name, Datum};
use crate::operation::{Operation, OperationKind, ParamValue, SingleOperation};
use gt_foundation::Tolerance;
use serde::{Deserialize, Serialize};

/// 比较严格程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Criterion {
    /// 结构完全一致
    Strict,
    /// 语义等价
    #[default]
    Equivalent,
    /// 语义等价且忽略轴序
    EquivalentExceptAxisOrder,
}

/// 名称别名解析（由注册表实现）
pub trait AliasResolver {
    /// 名称的规范形式，未知名称返回 `None`
    fn canonical_name(&self, name: &str) -> Option<String>;
}

/// CRS 等价比较
pub(crate) fn crs_equivalent(
    a: &Crs,
    b: &Crs,
    criterion: Criterion,
    resolver: Option<&dyn AliasResolver>,
) -> bool {
    if criterion == Criterion::Strict {
        return a == b;
    }
    let cs_eq = |x: &crate::cs::CoordinateSystem, y: &crate::cs::CoordinateSystem| match criterion {
        Criterion::EquivalentExceptAxisOrder => x.is_equivalent_ignoring_order(y),
        _ => x.is_equivalent_to(y),
    };

    match (&a.kind, &b.kind) {
        (
            CrsKind::Geographic2D { datum: da, cs: ca },
            CrsKind::Geographic2D { datum: db, cs: cb },
        )
        | (
            CrsKind::Geographic3D { datum: da, cs: ca },
            CrsKind::Geographic3D { datum: db, cs: cb },
        )
        | (
            CrsKind::Geocentric { datum: da, cs: ca },
            CrsKind::Geocentric { datum: db, cs: cb },
        )
        | (
            CrsKind::Engineering { datum: da, cs: ca },
            CrsKind::Engineering { datum: db, cs: cb },
        )
        | (
            CrsKind::Temporal { datum: da, cs: ca },
            CrsKind::Temporal { datum: db, cs: cb },
        ) => datum_equivalent(da, db, criterion, resolver) && cs_eq(ca, cb),
        (
            CrsKind::Vertical {
                datum: da,
                cs: ca,
                geoid_grids: ga,
            },
            CrsKind::Vertical {
                datum: db,
                cs: cb,
                geoid_grids: gb,
            },
        ) => datum_equivalent(da, db, criterion, resolver) && cs_eq(ca, cb) && ga == gb,
        (
            CrsKind::Projected {
                base: ba,
                conversion: oa,
                cs: ca,
            },
            CrsKind::Projected {
                base: bb,
                conversion: ob,
                cs: cb,
            },
        ) => {
            // 基础 CRS 的轴序不影响投影坐标
            let base_resolver = match criterion {
                Criterion::EquivalentExceptAxisOrder => resolver,
                _ => None,
            };
            crs_equivalent(ba, bb, Criterion::EquivalentExceptAxisOrder, base_resolver)
                && operation_equivalent(oa, ob)
                && cs_eq(ca, cb)
        }
        (CrsKind::Compound { components: xa }, CrsKind::Compound { components: xb }) => {
            xa.len() == xb.len()
                && xa
                    .iter()
                    .zip(xb)
                    .all(|(x, y)| crs_equivalent(x, y, criterion, resolver))
        }
        (
            CrsKind::Bound {
                base: ba,
                hub: ha,
                transformation: ta,
            },
            CrsKind::Bound {
                base: bb,
                hub: hb,
                transformation: tb,
            },
        ) => {
            crs_equivalent(ba, bb, criterion, resolver)
                && crs_equivalent(ha, hb, criterion, resolver)
                && operation_equivalent(ta, tb)
        }
        (CrsKind::Other { cs: ca }, CrsKind::Other { cs: cb }) => match (ca, cb) {
            (Some(x), Some(y)) => cs_eq(x, y),
            (None, None) => true,
            _ => false,
        },
        _ => false,
    }
}

/// 基准等价比较
///
/// 大地基准比较规范化名称、椭球形状与本初子午线经度；
/// 其它基准只比较规范化名称。
#[must_use]
pub fn datum_equivalent(
    a: &Datum,
    b: &Datum,
    criterion: Criterion,
    resolver: Option<&dyn AliasResolver>,
) -> bool {
    if criterion == Criterion::Strict {
        return a == b;
    }
    let canonical = |name: &str| {
        let alias = match criterion {
            Criterion::EquivalentExceptAxisOrder => {
                resolver.and_then(|r| r.canonical_name(name))
            }
            _ => None,
        };
        normalized_datum_name(alias.as_deref().unwrap_or(name))
    };
    if canonical(a.name()) != canonical(b.name()) {
        return false;
    }
    match (a.geodetic_frame(), b.geodetic_frame()) {
        (Some(fa), Some(fb)) => {
            fa.ellipsoid.same_shape(&fb.ellipsoid)
                && (fa.prime_meridian.longitude_rad() - fb.prime_meridian.longitude_rad()).abs()
                    < Tolerance::default().angle
        }
        (None, None) => a.is_vertical() == b.is_vertical(),
        _ => false,
    }
}

/// 操作等价比较：方法与参数（SI 数值，相对容差）
#[must_use]
pub fn operation_equivalent(a: &Operation, b: &Operation) -> bool {
    if a.inverted != b.inverted {
        return false;
    }
    match (&a.kind, &b.kind) {
        (OperationKind::Conversion(x), OperationKind::Conversion(y))
        | (OperationKind::Transformation(x), OperationKind::Transformation(y)) => {
            single_equivalent(x, y)
        }
        (OperationKind::Concatenated(xa), OperationKind::Concatenated(xb)) => {
            xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| operation_equivalent(x, y))
        }
        _ => false,
    }
}

fn single_equivalent(a: &SingleOperation, b: &SingleOperation) -> bool {
    let same_method = match (a.method.code, b.method.code) {
        (Some(x), Some(y)) => x == y,
        _ => a.method.name.eq_ignore_ascii_case(&b.method.name),
    };
    if !same_method {
        return false;
    }
    let tol = Tolerance::default();
    let covers = |x: &SingleOperation, y: &SingleOperation| {
        x.params.iter().all(|p| {
            let other = match p.code {
                Some(code) => y.param(code),
                None => y.params.iter().find(|q| q.name == p.name),
            };
            match (p.si_value(), other) {
                (Some(v), Some(q)) => q.si_value().is_some_and(|w| tol.is_close(v, w)),
                // 缺省参数视为 0
                (Some(v), None) => v.abs() < tol.relative,
                (None, Some(q)) => match (&p.value, &q.value) {
                    (ParamValue::File(f), ParamValue::File(g))
                    | (ParamValue::Text(f), ParamValue::Text(g)) => f == g,
                    _ => false,
                },
                (None, None) => false,
            }
        })
    };
    covers(a, b) && covers(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cs::CoordinateSystem;
    use crate::datum::{DatumEnsemble, GeodeticFrame, PrimeMeridian};
    use crate::ellipsoid::Ellipsoid;
    use crate::identifier::Identifier;
    use crate::units::Unit;

    fn wgs84_lon_lat() -> Crs {
        Crs::geographic_2d(
            "unknown",
            Datum::Geodetic(GeodeticFrame::new(
                "WGS_1984",
                Ellipsoid::WGS84,
                PrimeMeridian::greenwich(),
            )),
            CoordinateSystem::ellipsoidal_2d_lon_lat(&Unit::DEGREE),
        )
    }

    #[test]
    fn test_strict_vs_equivalent() {
        let a = Crs::wgs84();
        let mut b = Crs::wgs84();
        b.name = "WGS84 renamed".into();
        b.id = None;
        assert!(!a.is_equivalent_to(&b, Criterion::Strict, None));
        assert!(a.is_equivalent_to(&b, Criterion::Equivalent, None));
    }

    #[test]
    fn test_axis_order_levels() {
        let a = Crs::wgs84();
        let b = wgs84_lon_lat();
        assert!(!a.is_equivalent_to(&b, Criterion::Equivalent, None));
        assert!(a.is_equivalent_to(&b, Criterion::EquivalentExceptAxisOrder, None));
    }

    #[test]
    fn test_ensemble_matches_frame_by_name() {
        let ensemble = Datum::Ensemble(DatumEnsemble {
            name: "World Geodetic System 1984 ensemble".into(),
            members: vec![Datum::Geodetic(GeodeticFrame::wgs84())],
            accuracy: 2.0,
            id: Some(Identifier::epsg(6326)),
        });
        let frame = Datum::Geodetic(GeodeticFrame::wgs84());
        assert!(datum_equivalent(&ensemble, &frame, Criterion::Equivalent, None));
    }

    #[test]
    fn test_alias_resolver_only_at_loosest_level() {
        struct Aliases;
        impl AliasResolver for Aliases {
            fn canonical_name(&self, name: &str) -> Option<String> {
                (name == "NAD83 (original)").then(|| "North American Datum 1983".to_string())
            }
        }
        let a = Datum::Geodetic(GeodeticFrame::new(
            "NAD83 (original)",
            Ellipsoid::GRS80,
            PrimeMeridian::greenwich(),
        ));
        let b = Datum::Geodetic(GeodeticFrame::new(
            "North American Datum 1983",
            Ellipsoid::GRS80,
            PrimeMeridian::greenwich(),
        ));
        assert!(!datum_equivalent(&a, &b, Criterion::Equivalent, Some(&Aliases)));
        assert!(datum_equivalent(
            &a,
            &b,
            Criterion::EquivalentExceptAxisOrder,
            Some(&Aliases)
        ));
    }

    #[test]
    fn test_different_ellipsoid_not_equivalent() {
        let a = Datum::Geodetic(GeodeticFrame::new(
            "Same name",
            Ellipsoid::GRS80,
            PrimeMeridian::greenwich(),
        ));
        let b = Datum::Geodetic(GeodeticFrame::new(
            "Same name",
            Ellipsoid::INTERNATIONAL_1924,
            PrimeMeridian::greenwich(),
        ));
        assert!(!datum_equivalent(&a, &b, Criterion::Equivalent, None));
    }

    #[test]
    fn test_projected_parameters_compared_numerically() {
        let a = Crs::utm_zone(32, true).unwrap();
        let b = Crs::utm_zone(33, true).unwrap();
        let mut c = Crs::utm_zone(32, true).unwrap();
        c.name = "custom".into();
        assert!(!a.is_equivalent_to(&b, Criterion::Equivalent, None));
        assert!(a.is_equivalent_to(&c, Criterion::Equivalent, None));
    }
}
