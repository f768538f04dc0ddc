// crates/gt_ops/src/resolver.rs

//! 坐标操作解析
//!
//! 给定源与目标 CRS 和搜索策略，返回排好序的候选操作列表。
//!
//! 解析分两层：
//!
//! 1. **结构分解**：绑定 CRS 经由其变换与枢纽、投影 CRS 经由逆投影到基础 CRS、
//!    复合 CRS 拆为水平与垂直两部分，直到两端都是大地 CRS（或垂直 CRS）。
//! 2. **大地核心**：同一基准只需转换；否则查注册表的直接操作，
//!    按需经由单个枢纽 CRS 串联，再按策略过滤，必要时补上 ballpark 操作。
//!
//! 最后按固定规则排序：非 ballpark 优先、（按需）格网可用优先、
//! 适用范围小者优先、精度高者优先、权威优先级、名称。

use crate::context::Context;
use crate::executor;
use crate::registry::{resolve_crs, OperationRecord};
use gt_config::{CrsExtentUse, GridAvailability, PivotUse, SearchDefaults, SpatialCriterion};
use gt_foundation::{GtError, GtResult};
use gt_geo::compare::datum_equivalent;
use gt_geo::operation::{methods, params, UNKNOWN_ACCURACY};
use gt_geo::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// 恒等操作的方法名
pub const NULL_METHOD: &str = "Null transformation";

/// 地理坐标单位变更的方法名（数值上由执行器的规范化完成）
pub const UNIT_CHANGE_METHOD: &str = "Change of geographic coordinate units";

// ============================================================================
// 搜索策略
// ============================================================================

/// 操作搜索策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPolicy {
    /// 限定权威（`None` 或 `"any"` 表示不限）
    pub authority: Option<String>,
    /// 期望精度 [m]，0 表示不限
    pub desired_accuracy: f64,
    /// 允许 ballpark 操作
    pub allow_ballpark: bool,
    /// 空间判据
    pub spatial_criterion: SpatialCriterion,
    /// 格网可用性
    pub grid_availability: GridAvailability,
    /// 枢纽使用方式
    pub pivot_use: PivotUse,
    /// 允许的枢纽 CRS（为空时由注册表提供候选）
    pub allowed_pivots: Vec<Identifier>,
    /// 丢弃已被候选集中其它操作取代的操作
    pub discard_superseded: bool,
    /// 允许已废弃的操作
    pub allow_deprecated: bool,
    /// 未给出感兴趣区域时 CRS 适用范围的组合方式
    pub crs_extent_use: CrsExtentUse,
    /// 感兴趣区域
    pub area_of_interest: Option<Area>,
    /// 感兴趣区域名称（由注册表解析）
    pub area_of_interest_name: Option<String>,
}

impl From<&SearchDefaults> for SearchPolicy {
    fn from(defaults: &SearchDefaults) -> Self {
        Self {
            authority: defaults.authority.clone(),
            desired_accuracy: defaults.desired_accuracy,
            allow_ballpark: defaults.allow_ballpark,
            spatial_criterion: defaults.spatial_criterion,
            grid_availability: defaults.grid_availability,
            pivot_use: defaults.pivot_use,
            allowed_pivots: Vec::new(),
            discard_superseded: defaults.discard_superseded,
            allow_deprecated: defaults.allow_deprecated,
            crs_extent_use: defaults.crs_extent_use,
            area_of_interest: None,
            area_of_interest_name: None,
        }
    }
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self::from(&SearchDefaults::default())
    }
}

impl SearchPolicy {
    /// 设置空间判据
    #[must_use]
    pub fn with_spatial_criterion(mut self, criterion: SpatialCriterion) -> Self {
        self.spatial_criterion = criterion;
        self
    }

    /// 设置格网可用性
    #[must_use]
    pub fn with_grid_availability(mut self, availability: GridAvailability) -> Self {
        self.grid_availability = availability;
        self
    }

    /// 设置枢纽使用方式
    #[must_use]
    pub fn with_pivot_use(mut self, pivot_use: PivotUse) -> Self {
        self.pivot_use = pivot_use;
        self
    }

    /// 限定枢纽 CRS
    #[must_use]
    pub fn with_allowed_pivots(mut self, pivots: Vec<Identifier>) -> Self {
        self.allowed_pivots = pivots;
        self
    }

    /// 是否允许 ballpark
    #[must_use]
    pub fn with_ballpark(mut self, allow: bool) -> Self {
        self.allow_ballpark = allow;
        self
    }

    /// 是否丢弃被取代的操作
    #[must_use]
    pub fn with_discard_superseded(mut self, discard: bool) -> Self {
        self.discard_superseded = discard;
        self
    }

    /// 是否允许已废弃的操作
    #[must_use]
    pub fn with_allow_deprecated(mut self, allow: bool) -> Self {
        self.allow_deprecated = allow;
        self
    }

    /// 设置期望精度 [m]
    #[must_use]
    pub fn with_desired_accuracy(mut self, accuracy: f64) -> Self {
        self.desired_accuracy = accuracy;
        self
    }

    /// 限定权威
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// 设置 CRS 适用范围的组合方式
    #[must_use]
    pub fn with_crs_extent_use(mut self, extent_use: CrsExtentUse) -> Self {
        self.crs_extent_use = extent_use;
        self
    }

    /// 设置感兴趣区域
    #[must_use]
    pub fn with_area_of_interest(mut self, area: Area) -> Self {
        self.area_of_interest = Some(area);
        self
    }

    /// 按名称设置感兴趣区域
    #[must_use]
    pub fn with_area_of_interest_name(mut self, name: impl Into<String>) -> Self {
        self.area_of_interest_name = Some(name.into());
        self
    }

    fn authority_allows(&self, op: &Operation) -> bool {
        match self.authority.as_deref() {
            None => true,
            Some(a) if a.eq_ignore_ascii_case("any") => true,
            Some(a) => op
                .id
                .as_ref()
                .is_some_and(|id| id.authority.eq_ignore_ascii_case(a)),
        }
    }
}

// ============================================================================
// 感兴趣区域
// ============================================================================

#[derive(Debug, Clone)]
enum Aoi {
    Unrestricted,
    Single(Area),
    Both(Area, Area),
}

impl Aoi {
    fn accepts(&self, area: Option<&Area>, criterion: SpatialCriterion) -> bool {
        let world = Area::world();
        let area = area.unwrap_or(&world);
        let check = |aoi: &Area| match criterion {
            SpatialCriterion::StrictContainment => area.contains(aoi),
            SpatialCriterion::PartialIntersection => area.intersects(aoi),
        };
        match self {
            Self::Unrestricted => true,
            Self::Single(a) => check(a),
            Self::Both(a, b) => check(a) && check(b),
        }
    }

    fn covered_by(&self, area: Option<&Area>) -> bool {
        let Some(area) = area else { return true };
        match self {
            Self::Unrestricted => area.contains(&Area::world()),
            Self::Single(a) => area.contains(a),
            Self::Both(a, b) => area.contains(a) && area.contains(b),
        }
    }
}

fn crs_area(crs: &Crs) -> Option<Area> {
    crs.area.clone().or_else(|| match &crs.kind {
        CrsKind::Projected { base, .. } | CrsKind::Bound { base, .. } => crs_area(base),
        CrsKind::Compound { components } => components.first().and_then(crs_area),
        _ => None,
    })
}

fn area_of_interest(ctx: &Context, policy: &SearchPolicy, source: &Crs, target: &Crs) -> Aoi {
    if let Some(area) = &policy.area_of_interest {
        return Aoi::Single(area.clone());
    }
    if let Some(name) = &policy.area_of_interest_name {
        match ctx.registry().area_by_name(name) {
            Some(area) => return Aoi::Single(area),
            None => tracing::warn!("未知的区域名称 '{}'，按未指定处理", name),
        }
    }
    match (policy.crs_extent_use, crs_area(source), crs_area(target)) {
        (CrsExtentUse::None, _, _) | (_, None, None) => Aoi::Unrestricted,
        (_, Some(a), None) | (_, None, Some(a)) => Aoi::Single(a),
        (CrsExtentUse::Both, Some(a), Some(b)) => Aoi::Both(a, b),
        (CrsExtentUse::Intersection, Some(a), Some(b)) => match a.intersection(&b) {
            Some(i) => Aoi::Single(i),
            None => {
                tracing::debug!("源与目标适用范围不相交，不做空间过滤");
                Aoi::Unrestricted
            }
        },
        (CrsExtentUse::Smallest, Some(a), Some(b)) => {
            if a.area_size() <= b.area_size() {
                Aoi::Single(a)
            } else {
                Aoi::Single(b)
            }
        }
    }
}

// ============================================================================
// 候选路径
// ============================================================================

/// 展平的候选步骤序列，附带来源记录的标识，用于取代关系判断
#[derive(Debug, Clone, Default)]
struct Candidate {
    steps: Vec<Operation>,
    record_ids: Vec<Identifier>,
    superseded_by: Vec<Identifier>,
}

impl Candidate {
    fn identity() -> Self {
        Self::default()
    }

    fn single(op: Operation) -> Self {
        let steps = if op.is_concatenated() {
            op.steps().to_vec()
        } else {
            vec![op]
        };
        Self {
            steps,
            ..Self::default()
        }
    }

    fn from_record(record: &OperationRecord) -> Self {
        let mut c = Self::single(record.oriented());
        c.record_ids.extend(record.operation.id.clone());
        c.superseded_by = record.operation.superseded_by.clone();
        c
    }

    fn then(mut self, other: Self) -> Self {
        self.steps.extend(other.steps);
        self.record_ids.extend(other.record_ids);
        self.superseded_by.extend(other.superseded_by);
        self
    }

    fn inverse(&self) -> Self {
        Self {
            steps: self.steps.iter().rev().map(Operation::inverse).collect(),
            record_ids: self.record_ids.clone(),
            superseded_by: self.superseded_by.clone(),
        }
    }

    /// 每个步骤的端点 CRS 经 `f` 映射（用于把水平步骤提升到复合 CRS）
    fn lift(self, f: impl Fn(&Crs) -> Crs) -> Self {
        let steps = self
            .steps
            .into_iter()
            .map(|s| {
                let source = s.source_crs.as_deref().map(&f);
                let target = s.target_crs.as_deref().map(&f);
                s.with_crs(source, target)
            })
            .collect();
        Self { steps, ..self }
    }

    fn is_ballpark(&self) -> bool {
        self.steps.iter().any(Operation::is_ballpark)
    }

    fn area(&self) -> Option<Area> {
        self.steps
            .iter()
            .filter_map(|s| s.area.clone())
            .try_fold(None::<Area>, |acc, a| match acc {
                None => Some(Some(a)),
                Some(prev) => prev.intersection(&a).map(Some),
            })
            .flatten()
    }

    fn accuracy(&self) -> f64 {
        if self.steps.iter().all(Operation::has_known_accuracy) {
            self.steps.iter().map(Operation::accuracy).sum()
        } else {
            UNKNOWN_ACCURACY
        }
    }

    fn grids(&self) -> impl Iterator<Item = &String> {
        self.steps.iter().flat_map(|s| s.grids.iter())
    }

    fn build(self, source: &Crs, target: &Crs) -> GeoResult<Operation> {
        let mut steps = self.steps;
        match steps.len() {
            0 => {
                Ok(Operation::conversion(
                    format!("Null transformation from {} to {}", source.name, target.name),
                    Method::named(NULL_METHOD),
                    Vec::new(),
                )
                .with_crs(Some(source.clone()), Some(target.clone()))
                .exact())
            }
            1 => Ok(steps.remove(0)),
            _ => {
                let name = steps
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ");
                Operation::concatenated(name, steps)
            }
        }
    }
}

/// 各段候选的笛卡尔积，按段顺序串联
fn product(segments: Vec<Vec<Candidate>>) -> Vec<Candidate> {
    segments
        .into_iter()
        .fold(vec![Candidate::identity()], |acc, segment| {
            acc.iter()
                .flat_map(|a| segment.iter().map(move |b| a.clone().then(b.clone())))
                .collect()
        })
}

fn synthesized(
    name: String,
    source: &Crs,
    target: &Crs,
    method: u32,
    op_params: Vec<Param>,
) -> Option<Operation> {
    match Operation::transformation(
        name,
        source.clone(),
        target.clone(),
        Method::epsg(method),
        op_params,
        UNKNOWN_ACCURACY,
    ) {
        Ok(op) => Some(op),
        Err(e) => {
            tracing::error!("合成操作失败: {}", e);
            None
        }
    }
}

fn conversion_between(name: String, method: Method, source: &Crs, target: &Crs) -> Candidate {
    let op = Operation::conversion(name, method, Vec::new())
        .with_crs(Some(source.clone()), Some(target.clone()))
        .exact();
    Candidate::single(op)
}

/// 投影 CRS 的正向投影步骤（基础 CRS → 投影 CRS）
fn projection_step(projected: &Crs) -> Option<Candidate> {
    match &projected.kind {
        CrsKind::Projected {
            base, conversion, ..
        } => {
            let op = conversion
                .as_ref()
                .clone()
                .with_crs(Some(base.as_ref().clone()), Some(projected.clone()))
                .exact();
            Some(Candidate::single(op))
        }
        CrsKind::Bound { base, .. } => projection_step(base),
        _ => None,
    }
}

fn geographic_base(crs: &Crs) -> Option<&Crs> {
    match &crs.kind {
        CrsKind::Geographic2D { .. } | CrsKind::Geographic3D { .. } => Some(crs),
        CrsKind::Projected { base, .. } | CrsKind::Bound { base, .. } => geographic_base(base),
        _ => None,
    }
}

fn strip_bound(crs: &Crs) -> &Crs {
    match &crs.kind {
        CrsKind::Bound { base, .. } => strip_bound(base),
        _ => crs,
    }
}

fn is_geodetic(crs: &Crs) -> bool {
    crs.is_geographic() || crs.is_geocentric()
}

fn with_vertical(horizontal: &Crs, vertical: &Crs) -> Crs {
    Crs::compound(
        format!("{} + {}", horizontal.name, vertical.name),
        vec![horizontal.clone(), vertical.clone()],
    )
}

fn east_first(crs: &Crs) -> bool {
    crs.cs().is_some_and(CoordinateSystem::is_east_first)
}

/// 绑定 CRS 的变换，端点缺失时补为基础大地 CRS 与枢纽
fn bound_transformation(base: &Crs, hub: &Crs, transformation: &Operation) -> Option<Operation> {
    let source = transformation
        .source_crs
        .as_deref()
        .or_else(|| base.geodetic_crs())?
        .clone();
    let target = transformation.target_crs.as_deref().unwrap_or(hub).clone();
    Some(transformation.clone().with_crs(Some(source), Some(target)))
}

// ============================================================================
// 搜索
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Leg {
    pivots: bool,
    ballpark: bool,
}

struct Search<'a> {
    ctx: &'a Context,
    policy: &'a SearchPolicy,
    aoi: Aoi,
}

impl Search<'_> {
    fn equivalent(&self, a: &Crs, b: &Crs, criterion: Criterion) -> bool {
        let aliases = self.ctx.aliases();
        a.is_equivalent_to(b, criterion, Some(&aliases))
    }

    fn same_datum(&self, a: &Crs, b: &Crs) -> bool {
        let aliases = self.ctx.aliases();
        match (a.datum(), b.datum()) {
            (Some(x), Some(y)) => {
                datum_equivalent(x, y, Criterion::EquivalentExceptAxisOrder, Some(&aliases))
            }
            _ => false,
        }
    }

    fn grids_available(&self, candidate: &Candidate) -> bool {
        candidate.grids().all(|g| self.ctx.is_grid_available(g))
    }

    /// 结构分解入口
    fn paths(&self, src: &Crs, tgt: &Crs, leg: Leg) -> Vec<Candidate> {
        if self.equivalent(src, tgt, Criterion::Equivalent) {
            return vec![Candidate::identity()];
        }
        match (&src.kind, &tgt.kind) {
            (
                CrsKind::Bound {
                    base,
                    hub,
                    transformation,
                },
                _,
            ) => {
                let Some(t) = bound_transformation(base, hub, transformation) else {
                    return Vec::new();
                };
                let (t_src, t_tgt) = match (t.source_crs.clone(), t.target_crs.clone()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Vec::new(),
                };
                product(vec![
                    self.paths(base, &t_src, leg),
                    vec![Candidate::single(t)],
                    self.paths(&t_tgt, tgt, leg),
                ])
            }
            (
                _,
                CrsKind::Bound {
                    base,
                    hub,
                    transformation,
                },
            ) => {
                let Some(t) = bound_transformation(base, hub, transformation) else {
                    return Vec::new();
                };
                let (t_src, t_tgt) = match (t.source_crs.clone(), t.target_crs.clone()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Vec::new(),
                };
                product(vec![
                    self.paths(src, &t_tgt, leg),
                    vec![Candidate::single(t.inverse())],
                    self.paths(&t_src, base, leg),
                ])
            }
            (CrsKind::Compound { .. }, CrsKind::Compound { .. }) => {
                self.compound_to_compound(src, tgt, leg)
            }
            (CrsKind::Compound { .. }, _) => self.from_compound(src, tgt, leg),
            (_, CrsKind::Compound { .. }) => self.to_compound(src, tgt, leg),
            (CrsKind::Projected { base, .. }, _) => match projection_step(src) {
                Some(p) => product(vec![vec![p.inverse()], self.paths(base, tgt, leg)]),
                None => Vec::new(),
            },
            (_, CrsKind::Projected { base, .. }) => match projection_step(tgt) {
                Some(p) => product(vec![self.paths(src, base, leg), vec![p]]),
                None => Vec::new(),
            },
            (CrsKind::Vertical { .. }, CrsKind::Vertical { .. }) => self.vertical(src, tgt, leg),
            _ if is_geodetic(src) && is_geodetic(tgt) => self.geodetic(src, tgt, leg),
            _ => {
                tracing::debug!(
                    "不支持的 CRS 组合: {:?} -> {:?}",
                    src.crs_type(),
                    tgt.crs_type()
                );
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------------
    // 复合 CRS
    // ------------------------------------------------------------------------

    /// 复合 CRS（水平地理 + 垂直）到其三维地理 CRS 的垂直段
    fn vertical_legs(&self, hg: &Crs, vertical: &Crs, g3: &Crs, leg: Leg) -> Vec<Candidate> {
        let vertical = strip_bound(vertical);
        let hv = with_vertical(hg, vertical);
        let grids: &[String] = match &vertical.kind {
            CrsKind::Vertical { geoid_grids, .. } => geoid_grids,
            _ => &[],
        };
        let mut out: Vec<Candidate> = grids
            .iter()
            .filter_map(|grid| {
                let op = synthesized(
                    format!("{} to {} ({})", g3.name, vertical.name, grid),
                    g3,
                    &hv,
                    methods::GEOID_GTX,
                    vec![Param::file(params::GEOID_FILE, grid.as_str())],
                )?;
                Some(Candidate::single(op.inverse()))
            })
            .filter(|c| {
                self.policy.grid_availability != GridAvailability::DiscardIfUnavailable
                    || self.grids_available(c)
            })
            .collect();
        if out.is_empty() && leg.ballpark && self.policy.allow_ballpark {
            out.extend(self.ballpark_vertical(&hv, g3));
        }
        out
    }

    fn from_compound(&self, src: &Crs, tgt: &Crs, leg: Leg) -> Vec<Candidate> {
        let CrsKind::Compound { components } = &src.kind else {
            return Vec::new();
        };
        let (Some(h), Some(v)) = (components.first(), src.vertical_component()) else {
            return Vec::new();
        };
        let Some(hg) = geographic_base(h) else {
            return Vec::new();
        };
        let Some(g3) = hg.to_geographic_3d() else {
            return Vec::new();
        };
        let unproject = projection_step(h)
            .map(|p| p.inverse().lift(|c| with_vertical(c, v)))
            .unwrap_or_default();
        let rest_src = match &h.kind {
            CrsKind::Bound {
                hub,
                transformation,
                ..
            } => Crs::bound(g3.clone(), hub.as_ref().clone(), transformation.as_ref().clone()),
            _ => g3.clone(),
        };
        product(vec![
            vec![unproject],
            self.vertical_legs(hg, v, &g3, leg),
            self.paths(&rest_src, tgt, leg),
        ])
    }

    fn to_compound(&self, src: &Crs, tgt: &Crs, leg: Leg) -> Vec<Candidate> {
        let CrsKind::Compound { components } = &tgt.kind else {
            return Vec::new();
        };
        let (Some(h), Some(v)) = (components.first(), tgt.vertical_component()) else {
            return Vec::new();
        };
        let Some(hg) = geographic_base(h) else {
            return Vec::new();
        };
        let Some(g3) = hg.to_geographic_3d() else {
            return Vec::new();
        };
        let project = projection_step(h)
            .map(|p| p.lift(|c| with_vertical(c, v)))
            .unwrap_or_default();
        let first_tgt = match &h.kind {
            CrsKind::Bound {
                hub,
                transformation,
                ..
            } => Crs::bound(g3.clone(), hub.as_ref().clone(), transformation.as_ref().clone()),
            _ => g3.clone(),
        };
        let vertical: Vec<Candidate> = self
            .vertical_legs(hg, v, &g3, leg)
            .iter()
            .map(Candidate::inverse)
            .collect();
        product(vec![
            self.paths(src, &first_tgt, leg),
            vertical,
            vec![project],
        ])
    }

    fn compound_to_compound(&self, src: &Crs, tgt: &Crs, leg: Leg) -> Vec<Candidate> {
        let (Some(hs), Some(vs), Some(ht), Some(vt)) = (
            src.horizontal_component(),
            src.vertical_component(),
            tgt.horizontal_component(),
            tgt.vertical_component(),
        ) else {
            return Vec::new();
        };
        let direct_vertical = self.vertical(
            strip_bound(vs),
            strip_bound(vt),
            Leg {
                pivots: false,
                ballpark: false,
            },
        );
        if !direct_vertical.is_empty() {
            let horizontal = self
                .paths(hs, ht, leg)
                .into_iter()
                .map(|c| c.lift(|crs| with_vertical(crs, vs)))
                .collect();
            let vertical = direct_vertical
                .into_iter()
                .map(|c| c.lift(|crs| with_vertical(ht, crs)))
                .collect();
            return product(vec![horizontal, vertical]);
        }

        // 垂直基准无直接联系时经由目标的三维地理 CRS
        let Some(g3) = geographic_base(ht).and_then(Crs::to_geographic_3d) else {
            return Vec::new();
        };
        product(vec![
            self.from_compound(src, &g3, leg),
            self.to_compound(&g3, tgt, leg),
        ])
    }

    // ------------------------------------------------------------------------
    // 垂直 CRS
    // ------------------------------------------------------------------------

    fn vertical(&self, src: &Crs, tgt: &Crs, leg: Leg) -> Vec<Candidate> {
        if self.same_datum(src, tgt) {
            return self.same_datum_conversion(src, tgt).into_iter().collect();
        }
        let found = self.filter(self.direct(src, tgt));
        let mut found = self.discard_superseded(found);
        if found.is_empty() && leg.ballpark && self.policy.allow_ballpark {
            found.extend(self.ballpark_vertical(src, tgt));
        }
        found
    }

    fn ballpark_vertical(&self, src: &Crs, tgt: &Crs) -> Option<Candidate> {
        let op = synthesized(
            format!("Ballpark vertical transformation from {} to {}", src.name, tgt.name),
            src,
            tgt,
            methods::VERTICAL_OFFSET,
            vec![Param::measure(params::VERTICAL_OFFSET, 0.0, Unit::METRE)],
        )?;
        Some(Candidate::single(op.as_ballpark()))
    }

    // ------------------------------------------------------------------------
    // 大地核心
    // ------------------------------------------------------------------------

    fn geodetic(&self, src: &Crs, tgt: &Crs, leg: Leg) -> Vec<Candidate> {
        if self.same_datum(src, tgt) {
            return self.same_datum_conversion(src, tgt).into_iter().collect();
        }
        let mut found = self.filter(self.direct(src, tgt));
        let want_pivots = match self.policy.pivot_use {
            PivotUse::Never => false,
            PivotUse::IfNoDirect => found.is_empty(),
            PivotUse::Always => true,
        };
        if leg.pivots && want_pivots {
            let via = self.filter(self.via_pivots(src, tgt));
            found.extend(via);
        }
        let mut found = self.discard_superseded(found);
        if leg.ballpark && self.needs_ballpark(&found) {
            found.extend(self.ballpark_geodetic(src, tgt));
        }
        found
    }

    /// 同一（或等价）基准之间的转换；完全等价时为恒等
    fn same_datum_conversion(&self, src: &Crs, tgt: &Crs) -> Option<Candidate> {
        if self.equivalent(src, tgt, Criterion::Equivalent) {
            return Some(Candidate::identity());
        }
        if !self.same_datum(src, tgt) {
            return None;
        }
        let method = match (&src.kind, &tgt.kind) {
            (CrsKind::Geographic2D { .. }, CrsKind::Geographic2D { .. })
            | (CrsKind::Geographic3D { .. }, CrsKind::Geographic3D { .. }) => {
                if east_first(src) == east_first(tgt) {
                    Method::named(UNIT_CHANGE_METHOD)
                } else if src.dimension() == 3 {
                    Method::epsg(methods::AXIS_ORDER_REVERSAL_3D)
                } else {
                    Method::epsg(methods::AXIS_ORDER_REVERSAL_2D)
                }
            }
            (CrsKind::Geographic2D { .. }, CrsKind::Geographic3D { .. })
            | (CrsKind::Geographic3D { .. }, CrsKind::Geographic2D { .. }) => {
                Method::epsg(methods::GEOGRAPHIC3D_TO_2D)
            }
            (CrsKind::Geographic2D { .. } | CrsKind::Geographic3D { .. }, CrsKind::Geocentric { .. })
            | (CrsKind::Geocentric { .. }, CrsKind::Geographic2D { .. } | CrsKind::Geographic3D { .. }) => {
                Method::epsg(methods::GEOGRAPHIC_GEOCENTRIC)
            }
            (CrsKind::Geocentric { .. }, CrsKind::Geocentric { .. }) => Method::named(NULL_METHOD),
            (CrsKind::Vertical { .. }, CrsKind::Vertical { .. }) => {
                Method::epsg(methods::CHANGE_OF_VERTICAL_UNIT)
            }
            _ => return None,
        };
        Some(conversion_between(
            format!("Conversion from {} to {}", src.name, tgt.name),
            method,
            src,
            tgt,
        ))
    }

    /// 注册表中可代表该 CRS 的标识符；三维/地心 CRS 附带同基准二维 CRS 的标识符
    fn registry_ids(&self, crs: &Crs) -> Vec<Identifier> {
        let registry = self.ctx.registry();
        let mut ids: Vec<Identifier> = registry.identify(crs).into_iter().collect();
        if matches!(
            crs.kind,
            CrsKind::Geographic3D { .. } | CrsKind::Geocentric { .. }
        ) {
            if let Some(datum) = crs.datum() {
                let flat = Crs::geographic_2d(
                    crs.name.clone(),
                    datum.clone(),
                    CoordinateSystem::ellipsoidal_2d_lat_lon(&Unit::DEGREE),
                );
                if let Some(id) = registry.identify(&flat) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        ids
    }

    fn record_allowed(&self, op: &Operation) -> bool {
        (self.policy.allow_deprecated || !op.deprecated) && self.policy.authority_allows(op)
    }

    /// 注册表中的直接操作，端点与注册 CRS 不完全等价时补上同基准转换
    fn direct(&self, src: &Crs, tgt: &Crs) -> Vec<Candidate> {
        let registry = self.ctx.registry();
        let src_ids = self.registry_ids(src);
        let tgt_ids = self.registry_ids(tgt);
        let mut seen: Vec<Identifier> = Vec::new();
        let mut out = Vec::new();
        for s in &src_ids {
            for t in &tgt_ids {
                if s == t {
                    continue;
                }
                for record in registry.operations_between(s, t) {
                    if !self.record_allowed(&record.operation) {
                        continue;
                    }
                    if let Some(id) = &record.operation.id {
                        if seen.contains(id) {
                            continue;
                        }
                        seen.push(id.clone());
                    }
                    if let Some(c) = self.wrap(src, tgt, Candidate::from_record(&record)) {
                        out.push(c);
                    }
                }
            }
        }
        out
    }

    fn wrap(&self, src: &Crs, tgt: &Crs, core: Candidate) -> Option<Candidate> {
        let pre = match core.steps.first().and_then(|s| s.source_crs.as_deref()) {
            Some(op_src) => self.same_datum_conversion(src, op_src)?,
            None => Candidate::identity(),
        };
        let post = match core.steps.last().and_then(|s| s.target_crs.as_deref()) {
            Some(op_tgt) => self.same_datum_conversion(op_tgt, tgt)?,
            None => Candidate::identity(),
        };
        Some(pre.then(core).then(post))
    }

    fn leg(&self, src: &Crs, tgt: &Crs) -> Vec<Candidate> {
        if self.same_datum(src, tgt) {
            self.same_datum_conversion(src, tgt).into_iter().collect()
        } else {
            self.direct(src, tgt)
        }
    }

    fn via_pivots(&self, src: &Crs, tgt: &Crs) -> Vec<Candidate> {
        let registry = self.ctx.registry();
        let src_ids = self.registry_ids(src);
        let tgt_ids = self.registry_ids(tgt);
        let pivots: Vec<Identifier> = if self.policy.allowed_pivots.is_empty() {
            let mut found = Vec::new();
            for s in &src_ids {
                for t in &tgt_ids {
                    for p in registry.pivot_candidates(s, t) {
                        if !found.contains(&p) {
                            found.push(p);
                        }
                    }
                }
            }
            found
        } else {
            self.policy.allowed_pivots.clone()
        };

        let mut out = Vec::new();
        for id in pivots {
            if src_ids.contains(&id) || tgt_ids.contains(&id) {
                continue;
            }
            let pivot = match resolve_crs(registry, &id) {
                Ok(parsed) => parsed.value,
                Err(e) => {
                    tracing::debug!("跳过枢纽 {}: {}", id, e);
                    continue;
                }
            };
            let first = self.leg(src, &pivot);
            let second = self.leg(&pivot, tgt);
            for a in &first {
                for b in &second {
                    if !self.joins(a, &pivot, b) {
                        tracing::error!("经由枢纽 {} 的两段端点不一致，丢弃该候选", id);
                        continue;
                    }
                    out.push(a.clone().then(b.clone()));
                }
            }
        }
        out
    }

    fn joins(&self, first: &Candidate, pivot: &Crs, second: &Candidate) -> bool {
        let matches = |crs: Option<&Crs>| {
            crs.map_or(true, |c| {
                self.equivalent(c, pivot, Criterion::EquivalentExceptAxisOrder)
            })
        };
        matches(first.steps.last().and_then(|s| s.target_crs.as_deref()))
            && matches(second.steps.first().and_then(|s| s.source_crs.as_deref()))
    }

    fn filter(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|c| {
                if !self
                    .aoi
                    .accepts(c.area().as_ref(), self.policy.spatial_criterion)
                {
                    return false;
                }
                let accuracy = c.accuracy();
                if self.policy.desired_accuracy > 0.0
                    && !(accuracy >= 0.0 && accuracy <= self.policy.desired_accuracy)
                {
                    return false;
                }
                self.policy.grid_availability != GridAvailability::DiscardIfUnavailable
                    || self.grids_available(c)
            })
            .collect()
    }

    fn discard_superseded(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        if !self.policy.discard_superseded {
            return candidates;
        }
        let ids: Vec<Identifier> = candidates
            .iter()
            .flat_map(|c| c.record_ids.iter().cloned())
            .collect();
        candidates.retain(|c| !c.superseded_by.iter().any(|s| ids.contains(s)));
        candidates
    }

    fn needs_ballpark(&self, found: &[Candidate]) -> bool {
        self.policy.allow_ballpark
            && !found
                .iter()
                .any(|c| !c.is_ballpark() && self.aoi.covered_by(c.area().as_ref()))
    }

    fn ballpark_geodetic(&self, src: &Crs, tgt: &Crs) -> Option<Candidate> {
        let op = if src.is_geographic() && tgt.is_geographic() {
            synthesized(
                format!("Ballpark geographic offset from {} to {}", src.name, tgt.name),
                src,
                tgt,
                methods::GEOGRAPHIC2D_OFFSETS,
                vec![
                    Param::measure(params::LATITUDE_OFFSET, 0.0, Unit::ARC_SECOND),
                    Param::measure(params::LONGITUDE_OFFSET, 0.0, Unit::ARC_SECOND),
                ],
            )?
        } else {
            synthesized(
                format!("Ballpark geocentric translation from {} to {}", src.name, tgt.name),
                src,
                tgt,
                methods::GEOCENTRIC_TRANSLATION_GEOCENTRIC,
                vec![
                    Param::measure(params::TX, 0.0, Unit::METRE),
                    Param::measure(params::TY, 0.0, Unit::METRE),
                    Param::measure(params::TZ, 0.0, Unit::METRE),
                ],
            )?
        };
        Some(Candidate::single(op.as_ballpark()))
    }
}

// ============================================================================
// 排序
// ============================================================================

struct Ranked {
    op: Operation,
    grids_available: bool,
}

/// 注册表标识与方向构成的去重键；任一步骤缺少标识时为 `None`
fn signature(op: &Operation) -> Option<Vec<(Identifier, bool)>> {
    if op.is_concatenated() {
        op.steps()
            .iter()
            .map(|s| s.id.clone().map(|id| (id, s.inverted)))
            .collect()
    } else {
        op.id.clone().map(|id| vec![(id, op.inverted)])
    }
}

fn area_size(op: &Operation) -> f64 {
    op.area
        .as_ref()
        .map_or_else(|| Area::world().area_size(), Area::area_size)
}

fn accuracy_key(op: &Operation) -> f64 {
    if op.has_known_accuracy() {
        op.accuracy()
    } else {
        f64::INFINITY
    }
}

fn authority_rank(op: &Operation, preference: &[String]) -> usize {
    op.id
        .as_ref()
        .or_else(|| op.steps().iter().find_map(|s| s.id.as_ref()))
        .and_then(|id| {
            preference
                .iter()
                .position(|p| p.eq_ignore_ascii_case(&id.authority))
        })
        .unwrap_or(preference.len())
}

fn rank(a: &Ranked, b: &Ranked, availability: GridAvailability, preference: &[String]) -> Ordering {
    a.op.ballpark
        .cmp(&b.op.ballpark)
        .then_with(|| match availability {
            GridAvailability::UseRegardless => b.grids_available.cmp(&a.grids_available),
            _ => Ordering::Equal,
        })
        .then_with(|| area_size(&a.op).total_cmp(&area_size(&b.op)))
        .then_with(|| accuracy_key(&a.op).total_cmp(&accuracy_key(&b.op)))
        .then_with(|| authority_rank(&a.op, preference).cmp(&authority_rank(&b.op, preference)))
        .then_with(|| a.op.name.cmp(&b.op.name))
}

// ============================================================================
// 入口
// ============================================================================

/// 解析源到目标的候选操作，按优先级排序
///
/// 空列表不是错误：表示在策略约束下不存在可用操作。
///
/// # Errors
/// 源或目标 CRS 违反结构不变量时返回 `CrsInvalid`
pub fn resolve(
    ctx: &Context,
    source: &Crs,
    target: &Crs,
    policy: &SearchPolicy,
) -> GtResult<Vec<Operation>> {
    for (role, crs) in [("源", source), ("目标", target)] {
        crs.validate()
            .map_err(|e| GtError::crs_invalid(format!("{role} CRS '{}' 无效: {e}", crs.name)))?;
    }

    let search = Search {
        ctx,
        policy,
        aoi: area_of_interest(ctx, policy, source, target),
    };
    let leg = Leg {
        pivots: policy.pivot_use != PivotUse::Never,
        ballpark: true,
    };

    let mut ranked: Vec<Ranked> = Vec::new();
    let mut signatures: HashSet<Vec<(Identifier, bool)>> = HashSet::new();
    for candidate in search.paths(source, target, leg) {
        let grids_available = search.grids_available(&candidate);
        match candidate.build(source, target) {
            Ok(op) => {
                let duplicate = match signature(&op) {
                    Some(sig) => !signatures.insert(sig),
                    None => ranked.iter().any(|r| r.op == op),
                };
                if !duplicate {
                    ranked.push(Ranked {
                        op,
                        grids_available,
                    });
                }
            }
            Err(e) => tracing::error!("候选操作无法串联: {}", e),
        }
    }

    let preference = ctx.registry().authority_preference();
    ranked.sort_by(|a, b| rank(a, b, policy.grid_availability, &preference));
    let operations: Vec<Operation> = ranked.into_iter().map(|r| r.op).collect();

    tracing::debug!(
        "{} -> {}: {} 个候选操作{}",
        source.name,
        target.name,
        operations.len(),
        operations
            .first()
            .map(|op| format!("，首选 '{}'", op.name))
            .unwrap_or_default()
    );
    Ok(operations)
}

/// 按坐标位置选择候选操作
///
/// 坐标位于该方向的输入 CRS 中；返回第一个适用范围包含该点的操作下标，
/// 都不包含（或无法定位）时返回 0。
pub fn suggested_operation(
    operations: &[Operation],
    direction: Direction,
    coord: Coordinate,
) -> usize {
    operations
        .iter()
        .position(|op| {
            let input = match direction {
                Direction::Forward => op.source_crs.as_deref(),
                Direction::Inverse => op.target_crs.as_deref(),
            };
            let Some(area) = &op.area else { return true };
            input
                .and_then(|crs| executor::geographic_position(crs, coord))
                .is_some_and(|(lon, lat)| area.contains_point(lon, lat))
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::resolve_crs;

    fn epsg(ctx: &Context, code: u32) -> Crs {
        resolve_crs(ctx.registry(), &Identifier::epsg(code))
            .unwrap()
            .value
    }

    fn context() -> Context {
        Context::with_config(gt_config::GeoTransConfig::default())
    }

    #[test]
    fn test_same_crs_is_null() {
        let ctx = context();
        let wgs84 = epsg(&ctx, 4326);
        let ops = resolve(&ctx, &wgs84, &wgs84, &SearchPolicy::default()).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].name.starts_with("Null transformation"));
        assert_eq!(ops[0].accuracy(), 0.0);
    }

    #[test]
    fn test_dedup_signature_uses_identity_not_name() {
        let a = Operation::pseudo_mercator().with_id(Identifier::epsg(1));
        let mut b = Operation::pseudo_mercator().with_id(Identifier::epsg(2));
        b.name = a.name.clone();
        assert_ne!(signature(&a), signature(&b));
        // 反向操作不再带标识，按结构比较
        assert_eq!(signature(&a.inverse()), None);

        let mut bare = Operation::pseudo_mercator();
        bare.id = None;
        assert_eq!(signature(&bare), None);
    }

    #[test]
    fn test_same_datum_axis_swap() {
        let ctx = context();
        let lat_lon = epsg(&ctx, 4326);
        let lon_lat = lat_lon.east_first();
        let ops = resolve(&ctx, &lat_lon, &lon_lat, &SearchPolicy::default()).unwrap();
        assert_eq!(ops.len(), 1);
        let single = ops[0].single().unwrap();
        assert_eq!(single.method.code, Some(methods::AXIS_ORDER_REVERSAL_2D));
        assert!(!ops[0].is_ballpark());
    }

    #[test]
    fn test_geographic_to_geocentric() {
        let ctx = context();
        let ops = resolve(
            &ctx,
            &epsg(&ctx, 4326),
            &Crs::wgs84_geocentric(),
            &SearchPolicy::default(),
        )
        .unwrap();
        assert_eq!(
            ops[0].single().unwrap().method.code,
            Some(methods::GEOGRAPHIC_GEOCENTRIC)
        );
    }

    #[test]
    fn test_projected_decomposition() {
        let ctx = context();
        let utm = epsg(&ctx, 32631);
        let ops = resolve(&ctx, &utm, &epsg(&ctx, 4326), &SearchPolicy::default()).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].name.starts_with("Inverse of"), "{}", ops[0].name);
    }

    #[test]
    fn test_accuracy_filter() {
        let ctx = context();
        let policy = SearchPolicy::default()
            .with_desired_accuracy(2.5)
            .with_ballpark(false);
        let ops = resolve(&ctx, &epsg(&ctx, 4203), &epsg(&ctx, 4326), &policy).unwrap();
        assert!(!ops.is_empty());
        assert!(ops.iter().all(|op| op.accuracy() >= 0.0 && op.accuracy() <= 2.5));
    }

    #[test]
    fn test_authority_filter() {
        let ctx = context();
        let policy = SearchPolicy::default()
            .with_authority("PROJ")
            .with_ballpark(false);
        let ops = resolve(&ctx, &epsg(&ctx, 4203), &epsg(&ctx, 4326), &policy).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_deprecated_allowed() {
        let ctx = context();
        let base = SearchPolicy::default().with_ballpark(false);
        let without = resolve(&ctx, &epsg(&ctx, 4203), &epsg(&ctx, 4326), &base).unwrap();
        let with = resolve(
            &ctx,
            &epsg(&ctx, 4203),
            &epsg(&ctx, 4326),
            &base.clone().with_allow_deprecated(true),
        )
        .unwrap();
        assert_eq!(with.len(), without.len() + 1);
        assert!(!without.iter().any(|op| op.deprecated));
    }

    #[test]
    fn test_unknown_area_name_falls_through() {
        let ctx = context();
        let policy = SearchPolicy::default().with_area_of_interest_name("Atlantis");
        let ops = resolve(&ctx, &epsg(&ctx, 4230), &epsg(&ctx, 4171), &policy).unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_invalid_crs_rejected() {
        let ctx = context();
        let mut broken = epsg(&ctx, 4326);
        if let CrsKind::Geographic2D { cs, .. } = &mut broken.kind {
            cs.axes.clear();
        }
        let err = resolve(&ctx, &broken, &epsg(&ctx, 4326), &SearchPolicy::default()).unwrap_err();
        assert!(matches!(err, GtError::CrsInvalid { .. }));
    }

    #[test]
    fn test_policy_from_defaults() {
        let defaults = SearchDefaults::default();
        let policy = SearchPolicy::from(&defaults);
        assert_eq!(policy.pivot_use, PivotUse::IfNoDirect);
        assert!(policy.discard_superseded);
        assert!(policy.allowed_pivots.is_empty());
    }

    #[test]
    fn test_aoi_checks() {
        let france = Area::new(-9.86, 41.15, 10.38, 51.56).unwrap();
        let europe = Area::new(-16.1, 32.88, 40.18, 84.73).unwrap();
        let aoi = Aoi::Single(france.clone());
        assert!(aoi.accepts(Some(&europe), SpatialCriterion::StrictContainment));
        assert!(aoi.accepts(None, SpatialCriterion::StrictContainment));
        assert!(!Aoi::Single(europe.clone()).accepts(Some(&france), SpatialCriterion::StrictContainment));
        assert!(Aoi::Single(europe).accepts(Some(&france), SpatialCriterion::PartialIntersection));
        assert!(!Aoi::Unrestricted.covered_by(Some(&france)));
        assert!(Aoi::Unrestricted.covered_by(None));
    }
}
