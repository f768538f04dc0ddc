// crates/gt_geo/src/datum.rs
//! 本初子午线、基准与基准集合
//!
//! 大地基准引用共享只读的椭球体和本初子午线（`Arc`）。
//! 基准种类是封闭枚举 [`Datum`]，构造时确定，使用处穷尽匹配。

use crate::ellipsoid::Ellipsoid;
use crate::identifier::Identifier;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 本初子午线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimeMeridian {
    /// 名称
    pub name: String,
    /// 相对 Greenwich 的经度（以 `unit` 计）
    pub longitude: f64,
    /// 角度单位
    pub unit: Unit,
}

impl PrimeMeridian {
    /// Greenwich
    #[must_use]
    pub fn greenwich() -> Self {
        Self {
            name: "Greenwich".to_string(),
            longitude: 0.0,
            unit: Unit::DEGREE,
        }
    }

    /// 创建本初子午线
    pub fn new(name: impl Into<String>, longitude: f64, unit: Unit) -> Self {
        Self {
            name: name.into(),
            longitude,
            unit,
        }
    }

    /// 相对 Greenwich 的经度 [rad]
    #[inline]
    #[must_use]
    pub fn longitude_rad(&self) -> f64 {
        self.unit.to_si(self.longitude)
    }

    /// 是否为 Greenwich
    #[must_use]
    pub fn is_greenwich(&self) -> bool {
        self.longitude_rad() == 0.0
    }

    /// 按 proj-string `+pm=` 名称获取
    #[must_use]
    pub fn from_proj_name(name: &str) -> Option<Self> {
        // 经度单位为度
        let (label, lon) = match name.to_lowercase().as_str() {
            "greenwich" => ("Greenwich", 0.0),
            "paris" => ("Paris", 2.337_229_166_666_667),
            "ferro" => ("Ferro", -17.666_666_666_666_67),
            "rome" => ("Rome", 12.452_333_333_333_33),
            "madrid" => ("Madrid", -3.687_938_888_888_889),
            "oslo" => ("Oslo", 10.722_916_666_666_67),
            "bern" => ("Bern", 7.439_583_333_333_333),
            _ => return None,
        };
        Some(Self::new(label, lon, Unit::DEGREE))
    }

    /// 对应的 proj-string 名称
    #[must_use]
    pub fn proj_name(&self) -> Option<&'static str> {
        ["paris", "ferro", "rome", "madrid", "oslo", "bern"]
            .into_iter()
            .find(|n| {
                Self::from_proj_name(n)
                    .is_some_and(|pm| (pm.longitude_rad() - self.longitude_rad()).abs() < 1e-12)
            })
    }
}

impl Default for PrimeMeridian {
    fn default() -> Self {
        Self::greenwich()
    }
}

/// 大地参考框架
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeodeticFrame {
    /// 名称
    pub name: String,
    /// 椭球体（共享只读）
    pub ellipsoid: Arc<Ellipsoid>,
    /// 本初子午线（共享只读）
    pub prime_meridian: Arc<PrimeMeridian>,
    /// 动态框架的参考历元（十进制年）
    pub frame_reference_epoch: Option<f64>,
    /// 标识符
    pub id: Option<Identifier>,
}

impl GeodeticFrame {
    /// 创建静态大地参考框架
    pub fn new(name: impl Into<String>, ellipsoid: Ellipsoid, prime_meridian: PrimeMeridian) -> Self {
        Self {
            name: name.into(),
            ellipsoid: Arc::new(ellipsoid),
            prime_meridian: Arc::new(prime_meridian),
            frame_reference_epoch: None,
            id: None,
        }
    }

    /// WGS 84 (EPSG:6326)
    #[must_use]
    pub fn wgs84() -> Self {
        let mut frame = Self::new(
            "World Geodetic System 1984",
            Ellipsoid::WGS84,
            PrimeMeridian::greenwich(),
        );
        frame.id = Some(Identifier::epsg(6326));
        frame
    }

    /// 按 proj-string `+datum=` 名称获取
    #[must_use]
    pub fn from_proj_datum(name: &str) -> Option<Self> {
        let (_, full, ellipsoid, code) = PROJ_DATUMS
            .iter()
            .find(|(n, ..)| n.eq_ignore_ascii_case(name))?;
        let mut frame = Self::new(*full, ellipsoid.clone(), PrimeMeridian::greenwich());
        frame.id = Some(Identifier::epsg(*code));
        Some(frame)
    }

    /// 对应的 proj-string `+datum=` 名称
    #[must_use]
    pub fn proj_datum_name(&self) -> Option<&'static str> {
        let key = normalized_datum_name(&self.name);
        PROJ_DATUMS
            .iter()
            .find(|(_, full, ellipsoid, _)| {
                normalized_datum_name(full) == key
                    && ellipsoid.same_shape(&self.ellipsoid)
                    && self.prime_meridian.is_greenwich()
            })
            .map(|(n, ..)| *n)
    }

    /// 设置参考历元（动态框架）
    #[must_use]
    pub fn with_epoch(mut self, epoch: f64) -> Self {
        self.frame_reference_epoch = Some(epoch);
        self
    }

    /// 是否为动态框架
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.frame_reference_epoch.is_some()
    }
}

/// proj-string 基准名称表：(名称, 全称, 椭球, EPSG 基准代码)
static PROJ_DATUMS: [(&str, &str, Ellipsoid, u32); 5] = [
    ("WGS84", "World Geodetic System 1984", Ellipsoid::WGS84, 6326),
    ("NAD83", "North American Datum 1983", Ellipsoid::GRS80, 6269),
    ("NAD27", "North American Datum 1927", Ellipsoid::CLARKE_1866, 6267),
    ("OSGB36", "Ordnance Survey of Great Britain 1936", Ellipsoid::AIRY_1830, 6277),
    ("potsdam", "Deutsches Hauptdreiecksnetz", Ellipsoid::BESSEL_1841, 6314),
];

/// 垂直参考框架
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalFrame {
    /// 名称
    pub name: String,
    /// 动态框架的参考历元
    pub frame_reference_epoch: Option<f64>,
    /// 标识符
    pub id: Option<Identifier>,
}

impl VerticalFrame {
    /// 创建垂直参考框架
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_reference_epoch: None,
            id: None,
        }
    }
}

/// 基准集合：在给定精度内可互换的一组基准
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumEnsemble {
    /// 名称
    pub name: String,
    /// 成员（有序）
    pub members: Vec<Datum>,
    /// 集合精度 [m]
    pub accuracy: f64,
    /// 标识符
    pub id: Option<Identifier>,
}

/// 基准（封闭枚举）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    /// 大地参考框架
    Geodetic(GeodeticFrame),
    /// 垂直参考框架
    Vertical(VerticalFrame),
    /// 基准集合
    Ensemble(DatumEnsemble),
    /// 工程基准
    Engineering {
        /// 名称
        name: String,
    },
    /// 时间基准
    Temporal {
        /// 名称
        name: String,
        /// 时间原点（ISO 8601 文本）
        origin: String,
    },
}

impl Datum {
    /// 名称
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Geodetic(f) => &f.name,
            Self::Vertical(f) => &f.name,
            Self::Ensemble(e) => &e.name,
            Self::Engineering { name } | Self::Temporal { name, .. } => name,
        }
    }

    /// 标识符
    #[must_use]
    pub fn id(&self) -> Option<&Identifier> {
        match self {
            Self::Geodetic(f) => f.id.as_ref(),
            Self::Vertical(f) => f.id.as_ref(),
            Self::Ensemble(e) => e.id.as_ref(),
            Self::Engineering { .. } | Self::Temporal { .. } => None,
        }
    }

    /// 若为大地基准（或大地基准集合），返回代表框架
    ///
    /// 集合返回第一个成员，其椭球与本初子午线即集合的椭球与本初子午线。
    #[must_use]
    pub fn geodetic_frame(&self) -> Option<&GeodeticFrame> {
        match self {
            Self::Geodetic(f) => Some(f),
            Self::Ensemble(e) => e.members.first().and_then(Datum::geodetic_frame),
            _ => None,
        }
    }

    /// 椭球体（仅大地基准）
    #[must_use]
    pub fn ellipsoid(&self) -> Option<&Ellipsoid> {
        self.geodetic_frame().map(|f| f.ellipsoid.as_ref())
    }

    /// 本初子午线（仅大地基准）
    #[must_use]
    pub fn prime_meridian(&self) -> Option<&PrimeMeridian> {
        self.geodetic_frame().map(|f| f.prime_meridian.as_ref())
    }

    /// 是否为大地基准（含大地基准集合）
    #[must_use]
    pub fn is_geodetic(&self) -> bool {
        self.geodetic_frame().is_some()
    }

    /// 是否为垂直基准（含垂直基准集合）
    #[must_use]
    pub fn is_vertical(&self) -> bool {
        match self {
            Self::Vertical(_) => true,
            Self::Ensemble(e) => e.members.first().is_some_and(Datum::is_vertical),
            _ => false,
        }
    }

    /// 对应的 proj-string `+datum=` 名称（按基准自身名称判断）
    #[must_use]
    pub fn proj_datum_name(&self) -> Option<&'static str> {
        let frame = self.geodetic_frame()?;
        let probe = GeodeticFrame {
            name: self.name().to_string(),
            ..frame.clone()
        };
        probe.proj_datum_name()
    }

    /// 集合精度（非集合返回 `None`）
    #[must_use]
    pub fn ensemble_accuracy(&self) -> Option<f64> {
        match self {
            Self::Ensemble(e) => Some(e.accuracy),
            _ => None,
        }
    }
}

/// 规范化基准名称，用于忽略装饰差异的比较
///
/// 去掉 `D_` 前缀和非字母数字字符并转小写，"World Geodetic System 1984" 与 "WGS_1984" 视为同名。
#[must_use]
pub fn normalized_datum_name(name: &str) -> String {
    let name = name.strip_prefix("D_").unwrap_or(name);
    let squeezed: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    match squeezed.as_str() {
        "worldgeodeticsystem1984" | "wgs1984" | "wgs84" | "worldgeodeticsystem1984ensemble" => {
            "wgs1984".to_string()
        }
        "northamericandatum1983" | "nad83" | "northamerican1983" => "nad83".to_string(),
        "northamericandatum1927" | "nad27" | "northamerican1927" => "nad27".to_string(),
        "europeanterrestrialreferencesystem1989" | "etrs89"
        | "europeanterrestrialreferencesystem1989ensemble" => "etrs89".to_string(),
        _ => squeezed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_meridian_paris() {
        let pm = PrimeMeridian::from_proj_name("paris").expect("paris");
        assert!((pm.longitude_rad().to_degrees() - 2.337_229_166_666_667).abs() < 1e-12);
        assert_eq!(pm.proj_name(), Some("paris"));
        assert!(PrimeMeridian::greenwich().is_greenwich());
        assert_eq!(PrimeMeridian::greenwich().proj_name(), None);
    }

    #[test]
    fn test_prime_meridian_grad_unit() {
        let pm = PrimeMeridian::new("Paris", 2.596_921_296_296_3, Unit::GRAD);
        let paris = PrimeMeridian::from_proj_name("paris").unwrap();
        assert!((pm.longitude_rad() - paris.longitude_rad()).abs() < 1e-10);
    }

    #[test]
    fn test_dynamic_frame() {
        let frame = GeodeticFrame::wgs84().with_epoch(2010.0);
        assert!(frame.is_dynamic());
        assert!(!GeodeticFrame::wgs84().is_dynamic());
    }

    #[test]
    fn test_ensemble_exposes_first_member() {
        let members = vec![
            Datum::Geodetic(GeodeticFrame::new(
                "World Geodetic System 1984 (Transit)",
                Ellipsoid::WGS84,
                PrimeMeridian::greenwich(),
            )),
            Datum::Geodetic(GeodeticFrame::new(
                "World Geodetic System 1984 (G730)",
                Ellipsoid::WGS84,
                PrimeMeridian::greenwich(),
            )),
        ];
        let ensemble = Datum::Ensemble(DatumEnsemble {
            name: "World Geodetic System 1984 ensemble".into(),
            members,
            accuracy: 2.0,
            id: Some(Identifier::epsg(6326)),
        });
        assert!(ensemble.is_geodetic());
        assert_eq!(ensemble.ellipsoid(), Some(&Ellipsoid::WGS84));
        assert_eq!(ensemble.ensemble_accuracy(), Some(2.0));
        assert!(!ensemble.is_vertical());
    }

    #[test]
    fn test_proj_datum_table() {
        let nad27 = GeodeticFrame::from_proj_datum("nad27").expect("NAD27");
        assert_eq!(nad27.name, "North American Datum 1927");
        assert_eq!(nad27.proj_datum_name(), Some("NAD27"));
        assert_eq!(GeodeticFrame::wgs84().proj_datum_name(), Some("WGS84"));
        assert!(GeodeticFrame::from_proj_datum("unknown").is_none());
    }

    #[test]
    fn test_normalized_datum_name() {
        assert_eq!(normalized_datum_name("World Geodetic System 1984"), "wgs1984");
        assert_eq!(normalized_datum_name("D_WGS_1984"), "wgs1984");
        assert_eq!(normalized_datum_name("North American Datum 1927"), "nad27");
        assert_eq!(normalized_datum_name("Reseau Geodesique Francais 1993"), "reseaugeodesiquefrancais1993");
    }
}
