// crates/gt_ops/src/registry/builtin.rs

//! 内置只读注册表
//!
//! 覆盖 EPSG 的一个小子集：
//!
//! - 地理 CRS：WGS 84 (2D/3D/地心)、NAD27、NAD83、ETRS89、ED50、RGF93 v1、AGD84、CGCS2000
//! - 投影 CRS：WGS 84 / UTM 各带、Web 墨卡托、CGCS2000 高斯-克吕格带
//! - 垂直 CRS：NAVD88 height
//! - 北美、欧洲、澳大利亚的若干基准变换
//!
//! CRS 定义按需导出为 WKT，UTM 与高斯-克吕格带按代码动态生成。

use super::{ObjectCategory, OperationRecord, Registry, RegistryAliases};
use gt_geo::compare::{datum_equivalent, AliasResolver};
use gt_geo::datum::normalized_datum_name;
use gt_geo::error::GeoError;
use gt_geo::operation::{methods, params};
use gt_geo::prelude::*;
use std::collections::HashMap;

const EPSG: &str = "EPSG";

/// 内置注册表
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    crs: Vec<Crs>,
    operations: Vec<Operation>,
    areas: Vec<Area>,
    /// 规范化别名 → 规范名称
    aliases: HashMap<String, String>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinRegistry {
    /// 创建内置注册表
    pub fn new() -> Self {
        let areas = catalog_areas();
        let crs = catalog_crs(&areas);
        let operations = catalog_operations(&crs, &areas).unwrap_or_else(|e| {
            tracing::error!("内置操作目录构建失败: {e}");
            Vec::new()
        });
        let aliases = ALIASES
            .iter()
            .map(|(alias, canonical)| (normalized_datum_name(alias), (*canonical).to_string()))
            .collect();
        Self {
            crs,
            operations,
            areas,
            aliases,
        }
    }

    /// 登记的操作数量
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// 按 EPSG 代码取 CRS（含动态生成的投影带）
    pub fn crs_by_code(&self, code: u32) -> Option<Crs> {
        if let Some(crs) = self
            .crs
            .iter()
            .find(|c| c.id.as_ref().and_then(Identifier::numeric_code) == Some(code))
        {
            return Some(crs.clone());
        }
        // 代码区间内的换算结果均不超过 u8
        let zone = |base: u32| u8::try_from(code - base).ok();
        match code {
            32601..=32660 => Crs::utm_zone(zone(32600)?, true).ok(),
            32701..=32760 => Crs::utm_zone(zone(32700)?, false).ok(),
            4502..=4512 => Crs::gauss_kruger_6(zone(4502)? + 13).ok(),
            4534..=4554 => Crs::gauss_kruger_3(zone(4534)? + 25).ok(),
            _ => None,
        }
    }

    fn crs_by_id(&self, id: &Identifier) -> Option<Crs> {
        if !id.authority.eq_ignore_ascii_case(EPSG) {
            return None;
        }
        self.crs_by_code(id.numeric_code()?)
    }

    fn conversion_by_code(code: u32) -> Option<Operation> {
        let zone = |base: u32| u8::try_from(code - base).ok();
        match code {
            16001..=16060 => Operation::utm(zone(16000)?, false).ok(),
            17001..=17060 => Operation::utm(zone(17000)?, true).ok(),
            3856 => Some(Operation::pseudo_mercator()),
            _ => None,
        }
    }

    /// 与给定 CRS 直接相连的 CRS（按登记顺序去重）
    fn neighbours(&self, id: &Identifier) -> Vec<Identifier> {
        let mut out: Vec<Identifier> = Vec::new();
        for op in &self.operations {
            let (Some(src), Some(tgt)) = (crs_id(op.source_crs.as_deref()), crs_id(op.target_crs.as_deref()))
            else {
                continue;
            };
            let other = if src == id {
                tgt
            } else if tgt == id {
                src
            } else {
                continue;
            };
            if !out.contains(other) {
                out.push(other.clone());
            }
        }
        out
    }
}

fn crs_id(crs: Option<&Crs>) -> Option<&Identifier> {
    crs.and_then(|c| c.id.as_ref())
}

impl Registry for BuiltinRegistry {
    fn lookup_definition(
        &self,
        authority: &str,
        code: &str,
        category: ObjectCategory,
    ) -> Option<String> {
        if !authority.eq_ignore_ascii_case(EPSG) {
            return None;
        }
        let code: u32 = code.trim().parse().ok()?;
        match category {
            ObjectCategory::Crs => self.crs_by_code(code)?.to_wkt().ok(),
            // 只有投影转换有文本定义
            ObjectCategory::CoordinateOperation => {
                Self::conversion_by_code(code)?.to_proj_step(None).ok()
            }
        }
    }

    fn operations_between(&self, source: &Identifier, target: &Identifier) -> Vec<OperationRecord> {
        self.operations
            .iter()
            .filter_map(|op| {
                let src = crs_id(op.source_crs.as_deref())?;
                let tgt = crs_id(op.target_crs.as_deref())?;
                let reversed = if src == source && tgt == target {
                    false
                } else if src == target && tgt == source {
                    true
                } else {
                    return None;
                };
                Some(OperationRecord {
                    operation: op.clone(),
                    reversed,
                })
            })
            .collect()
    }

    fn authority_preference(&self) -> Vec<String> {
        vec![EPSG.to_string(), "PROJ".to_string()]
    }

    fn pivot_candidates(&self, source: &Identifier, target: &Identifier) -> Vec<Identifier> {
        let to_target = self.neighbours(target);
        self.neighbours(source)
            .into_iter()
            .filter(|id| id != source && id != target && to_target.contains(id))
            .collect()
    }

    fn area_by_name(&self, name: &str) -> Option<Area> {
        let query = name.trim().to_lowercase();
        let named = |a: &&Area| a.name.as_deref().map(str::to_lowercase);
        self.areas
            .iter()
            .find(|a| named(a).is_some_and(|n| n == query))
            .or_else(|| {
                self.areas
                    .iter()
                    .find(|a| named(a).is_some_and(|n| n.contains(&query)))
            })
            .cloned()
    }

    fn identify(&self, crs: &Crs) -> Option<Identifier> {
        if let Some(id) = &crs.id {
            if self.crs_by_id(id).is_some() {
                return Some(id.clone());
            }
        }
        let aliases: &dyn AliasResolver = &RegistryAliases(self);
        if let Some(found) = self.crs.iter().find(|c| {
            c.is_equivalent_to(crs, Criterion::EquivalentExceptAxisOrder, Some(aliases))
        }) {
            return found.id.clone();
        }
        let datum = crs.datum()?;
        let want_vertical = crs.is_vertical();
        self.crs
            .iter()
            .filter(|c| {
                if want_vertical {
                    c.is_vertical()
                } else {
                    c.crs_type() == CrsType::Geographic2D
                }
            })
            .find(|c| {
                c.datum().is_some_and(|d| {
                    datum_equivalent(d, datum, Criterion::EquivalentExceptAxisOrder, Some(aliases))
                })
            })
            .and_then(|c| c.id.clone())
    }

    fn canonical_name(&self, name: &str) -> Option<String> {
        self.aliases.get(&normalized_datum_name(name)).cloned()
    }
}

// ============================================================================
// 目录数据
// ============================================================================

/// 基准别名：(别名, 规范名称)
const ALIASES: [(&str, &str); 10] = [
    ("ED50", "European Datum 1950"),
    ("European_Datum_1950", "European Datum 1950"),
    ("RGF93", "Reseau Geodesique Francais 1993 v1"),
    ("RGF93 v1", "Reseau Geodesique Francais 1993 v1"),
    ("Reseau_Geodesique_Francais_1993", "Reseau Geodesique Francais 1993 v1"),
    ("AGD84", "Australian Geodetic Datum 1984"),
    ("GDA84", "Australian Geodetic Datum 1984"),
    ("CGCS2000", "China 2000"),
    ("China_2000", "China 2000"),
    ("NAVD88", "North American Vertical Datum 1988"),
];

fn area(name: &str, west: f64, south: f64, east: f64, north: f64) -> Area {
    Area {
        west,
        south,
        east,
        north,
        name: Some(name.to_string()),
    }
}

fn catalog_areas() -> Vec<Area> {
    vec![
        Area::world(),
        area("North America - NAD27", 167.65, 7.15, -47.74, 83.17),
        area("North America - NAD83", 167.65, 14.92, -40.73, 86.46),
        area("USA - CONUS", -124.79, 24.41, -66.91, 49.38),
        area("USA - Alaska", 172.42, 51.3, -129.99, 71.4),
        area("Canada", -141.01, 40.04, -47.74, 86.46),
        area("Europe - ETRS89", -16.1, 32.88, 40.18, 84.73),
        area("Europe - ED50", -16.1, 25.71, 48.61, 84.73),
        area("France", -9.86, 41.15, 10.38, 51.56),
        area("Australia", 109.23, -38.53, 153.61, -9.37),
        area("China", 73.62, 16.7, 134.77, 53.56),
    ]
}

fn named_area(areas: &[Area], name: &str) -> Area {
    areas
        .iter()
        .find(|a| a.name.as_deref() == Some(name))
        .cloned()
        .unwrap_or_else(Area::world)
}

fn geographic(
    code: u32,
    name: &str,
    datum: &str,
    datum_code: u32,
    ellipsoid: Ellipsoid,
    area: Area,
) -> Crs {
    let mut frame = GeodeticFrame::new(datum, ellipsoid, PrimeMeridian::greenwich());
    frame.id = Some(Identifier::epsg(datum_code));
    Crs::geographic_2d(
        name,
        Datum::Geodetic(frame),
        CoordinateSystem::ellipsoidal_2d_lat_lon(&Unit::DEGREE),
    )
    .with_id(Identifier::epsg(code))
    .with_area(area)
}

fn catalog_crs(areas: &[Area]) -> Vec<Crs> {
    let a = |name| named_area(areas, name);
    let mut navd88 = VerticalFrame::new("North American Vertical Datum 1988");
    navd88.id = Some(Identifier::epsg(5103));
    vec![
        Crs::wgs84(),
        Crs::wgs84_3d(),
        Crs::wgs84_geocentric(),
        Crs::web_mercator(),
        Crs::cgcs2000().with_area(a("China")),
        geographic(
            4267,
            "NAD27",
            "North American Datum 1927",
            6267,
            Ellipsoid::CLARKE_1866,
            a("North America - NAD27"),
        ),
        geographic(
            4269,
            "NAD83",
            "North American Datum 1983",
            6269,
            Ellipsoid::GRS80,
            a("North America - NAD83"),
        ),
        geographic(
            4258,
            "ETRS89",
            "European Terrestrial Reference System 1989",
            6258,
            Ellipsoid::GRS80,
            a("Europe - ETRS89"),
        ),
        geographic(
            4230,
            "ED50",
            "European Datum 1950",
            6230,
            Ellipsoid::INTERNATIONAL_1924,
            a("Europe - ED50"),
        ),
        geographic(
            4171,
            "RGF93 v1",
            "Reseau Geodesique Francais 1993 v1",
            6171,
            Ellipsoid::GRS80,
            a("France"),
        ),
        geographic(
            4203,
            "AGD84",
            "Australian Geodetic Datum 1984",
            6203,
            Ellipsoid::AUSTRALIAN_NATIONAL,
            a("Australia"),
        ),
        Crs::vertical("NAVD88 height", navd88, &Unit::METRE)
            .with_id(Identifier::epsg(5703))
            .with_area(a("North America - NAD27")),
    ]
}

fn translation(t: [f64; 3]) -> Vec<Param> {
    vec![
        Param::measure(params::TX, t[0], Unit::METRE),
        Param::measure(params::TY, t[1], Unit::METRE),
        Param::measure(params::TZ, t[2], Unit::METRE),
    ]
}

fn ntv2(file: &str) -> Vec<Param> {
    vec![Param::file(params::NTV2_FILE, file)]
}

/// 操作目录条目：(代码, 名称, 源, 目标, 方法, 参数, 精度, 区域)
type Entry = (u32, &'static str, u32, u32, u32, Vec<Param>, f64, &'static str);

fn catalog_operations(crs: &[Crs], areas: &[Area]) -> Result<Vec<Operation>, GeoError> {
    let find = |code: u32| {
        crs.iter()
            .find(|c| c.id.as_ref().and_then(Identifier::numeric_code) == Some(code))
            .cloned()
            .ok_or_else(|| GeoError::invalid_crs(format!("目录中缺少 EPSG:{code}")))
    };
    let seven = Operation::helmert_params;

    let entries: Vec<Entry> = vec![
        (1241, "NAD27 to NAD83 (1)", 4267, 4269, methods::NTV2, ntv2("us_noaa_conus.gsb"), 0.15, "USA - CONUS"),
        (1243, "NAD27 to NAD83 (2)", 4267, 4269, methods::NTV2, ntv2("us_noaa_alaska.gsb"), 0.5, "USA - Alaska"),
        (1313, "NAD27 to NAD83 (4)", 4267, 4269, methods::NTV2, ntv2("ca_nrc_ntv2_0.gsb"), 1.5, "Canada"),
        (1188, "NAD83 to WGS 84 (1)", 4269, 4326, methods::GEOCENTRIC_TRANSLATION_GEOG2D, translation([0.0; 3]), 4.0, "North America - NAD83"),
        (1311, "ED50 to ETRS89 (10)", 4230, 4258, methods::GEOCENTRIC_TRANSLATION_GEOG2D, translation([-84.0, -97.0, -117.0]), 1.0, "France"),
        (1671, "RGF93 v1 to ETRS89 (1)", 4171, 4258, methods::GEOCENTRIC_TRANSLATION_GEOG2D, translation([0.0; 3]), 1.0, "France"),
        (1149, "ETRS89 to WGS 84 (1)", 4258, 4326, methods::GEOCENTRIC_TRANSLATION_GEOG2D, translation([0.0; 3]), 1.0, "Europe - ETRS89"),
        (1235, "AGD84 to WGS 84 (1)", 4203, 4326, methods::GEOCENTRIC_TRANSLATION_GEOG2D, translation([-116.0, -50.47, 141.69]), 5.0, "Australia"),
        (1236, "AGD84 to WGS 84 (2)", 4203, 4326, methods::GEOCENTRIC_TRANSLATION_GEOG2D, translation([-117.763, -51.51, 139.061]), 5.0, "Australia"),
        (1559, "AGD84 to WGS 84 (3)", 4203, 4326, methods::COORDINATE_FRAME_GEOG2D, seven([-117.763, -51.51, 139.061], [-0.292, -0.443, -0.277], -0.191), 3.0, "Australia"),
        (1804, "AGD84 to WGS 84 (6)", 4203, 4326, methods::GEOCENTRIC_TRANSLATION_GEOG2D, translation([-134.0, -48.0, 149.0]), 10.0, "Australia"),
        (1806, "AGD84 to WGS 84 (7)", 4203, 4326, methods::POSITION_VECTOR_GEOG2D, seven([-117.763, -51.51, 139.061], [0.292, 0.443, 0.277], -0.191), 2.0, "Australia"),
        (15786, "AGD84 to WGS 84 (9)", 4203, 4326, methods::NTV2, ntv2("au_icsm_National_84_02_07_01.gsb"), 1.0, "Australia"),
    ];

    let mut operations = Vec::with_capacity(entries.len());
    for (code, name, src, tgt, method, op_params, accuracy, area_name) in entries {
        let op = Operation::transformation(name, find(src)?, find(tgt)?, Method::epsg(method), op_params, accuracy)?
            .with_id(Identifier::epsg(code))
            .with_area(named_area(areas, area_name));
        operations.push(op);
    }
    for op in &mut operations {
        match op.id.as_ref().and_then(Identifier::numeric_code) {
            Some(1235) => op.deprecated = true,
            Some(1559) => op.superseded_by.push(Identifier::epsg(1806)),
            _ => {}
        }
    }
    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_builds() {
        let registry = BuiltinRegistry::new();
        assert_eq!(registry.operation_count(), 13);
        assert!(registry.crs_by_code(4267).is_some());
        assert!(registry.crs_by_code(5703).unwrap().is_vertical());
    }

    #[test]
    fn test_dynamic_codes() {
        let registry = BuiltinRegistry::new();
        assert_eq!(registry.crs_by_code(32631).unwrap().name, "WGS 84 / UTM zone 31N");
        assert_eq!(registry.crs_by_code(32750).unwrap().name, "WGS 84 / UTM zone 50S");
        assert_eq!(
            registry.crs_by_code(4513 + 26).unwrap().id,
            Some(Identifier::epsg(4539))
        );
        assert!(registry.crs_by_code(32661).is_none());
    }

    #[test]
    fn test_lookup_definition() {
        let registry = BuiltinRegistry::new();
        let wkt = registry
            .lookup_definition("epsg", "4326", ObjectCategory::Crs)
            .unwrap();
        assert!(wkt.starts_with("GEOGCRS[\"WGS 84\""));
        assert_eq!(
            registry
                .lookup_definition("EPSG", "16031", ObjectCategory::CoordinateOperation)
                .as_deref(),
            Some("+proj=utm +zone=31")
        );
        assert!(registry
            .lookup_definition("ESRI", "4326", ObjectCategory::Crs)
            .is_none());
        assert!(registry
            .lookup_definition("EPSG", "abc", ObjectCategory::Crs)
            .is_none());
    }

    #[test]
    fn test_operations_between_both_directions() {
        let registry = BuiltinRegistry::new();
        let forward = registry.operations_between(&Identifier::epsg(4267), &Identifier::epsg(4269));
        assert_eq!(forward.len(), 3);
        assert!(forward.iter().all(|r| !r.reversed));
        let backward = registry.operations_between(&Identifier::epsg(4269), &Identifier::epsg(4267));
        assert_eq!(backward.len(), 3);
        assert!(backward.iter().all(|r| r.reversed));
    }

    #[test]
    fn test_pivot_candidates() {
        let registry = BuiltinRegistry::new();
        assert_eq!(
            registry.pivot_candidates(&Identifier::epsg(4230), &Identifier::epsg(4171)),
            vec![Identifier::epsg(4258)]
        );
        assert!(registry
            .pivot_candidates(&Identifier::epsg(4267), &Identifier::epsg(4258))
            .is_empty());
    }

    #[test]
    fn test_area_by_name() {
        let registry = BuiltinRegistry::new();
        assert_eq!(registry.area_by_name("france").unwrap().west, -9.86);
        assert!(registry.area_by_name("CONUS").is_some());
        assert!(registry.area_by_name("Atlantis").is_none());
    }

    #[test]
    fn test_identify_anonymous() {
        let registry = BuiltinRegistry::new();
        let mut nad27 = registry.crs_by_code(4267).unwrap();
        nad27.id = None;
        nad27.name = "unnamed".into();
        assert_eq!(registry.identify(&nad27), Some(Identifier::epsg(4267)));

        // 三维地理 CRS 按基准识别到二维条目
        let nad27_3d = nad27.to_geographic_3d().unwrap();
        assert_eq!(registry.identify(&nad27_3d), Some(Identifier::epsg(4267)));

        let mut geocentric = Crs::wgs84_geocentric();
        geocentric.id = None;
        assert_eq!(registry.identify(&geocentric), Some(Identifier::epsg(4978)));
    }

    #[test]
    fn test_superseded_and_deprecated_flags() {
        let registry = BuiltinRegistry::new();
        let records = registry.operations_between(&Identifier::epsg(4203), &Identifier::epsg(4326));
        assert_eq!(records.len(), 6);
        assert_eq!(records.iter().filter(|r| r.operation.deprecated).count(), 1);
        assert!(records
            .iter()
            .any(|r| r.operation.is_superseded_by(&Identifier::epsg(1806))));
    }
}
