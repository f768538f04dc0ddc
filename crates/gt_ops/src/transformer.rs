// crates/gt_ops/src/transformer.rs

//! 按点选择操作的变换器
//!
//! 一次解析得到若干区域性候选（例如分区域的基准变换）后，
//! 变换器对每个坐标选择适用范围包含该点的第一个候选；
//! 候选执行失败（格网缺失、点在格网外）时依次尝试下一个适用的非 ballpark 候选。
//! ballpark 只在没有非 ballpark 候选适用于该点时使用，不作为失败后的退路。

use crate::context::Context;
use crate::executor::{self, Pipeline, PARALLEL_THRESHOLD};
use crate::resolver::{self, SearchPolicy};
use gt_foundation::{GtError, GtResult, TransformErrorKind};
use gt_geo::prelude::*;
use parking_lot::Mutex;
use rayon::prelude::*;

/// 候选操作及其编译结果
#[derive(Debug)]
struct Candidate {
    operation: Operation,
    pipeline: Pipeline,
}

/// 变换器
#[derive(Debug)]
pub struct Transformer<'ctx> {
    ctx: &'ctx Context,
    candidates: Vec<Candidate>,
    last_used: Mutex<Option<usize>>,
}

impl<'ctx> Transformer<'ctx> {
    /// 解析源到目标的候选操作并逐个编译
    ///
    /// 无法编译的候选被跳过（记录警告）；没有任何候选时仍返回变换器，
    /// 此时每次变换都失败并记录 `NoOperation`。
    ///
    /// # Errors
    /// 端点 CRS 无效时返回错误
    pub fn new(ctx: &'ctx Context, source: &Crs, target: &Crs, policy: &SearchPolicy) -> GtResult<Self> {
        let operations = resolver::resolve(ctx, source, target, policy)?;
        let candidates = operations
            .into_iter()
            .filter_map(|operation| match Pipeline::compile(ctx, &operation) {
                Ok(pipeline) => Some(Candidate {
                    operation,
                    pipeline,
                }),
                Err(e) => {
                    tracing::warn!("跳过无法执行的候选 {}: {}", operation.name, e);
                    None
                }
            })
            .collect();
        Ok(Self {
            ctx,
            candidates,
            last_used: Mutex::new(None),
        })
    }

    /// 由单个操作创建
    ///
    /// # Errors
    /// 操作无法编译时返回错误
    pub fn from_operation(ctx: &'ctx Context, operation: Operation) -> GtResult<Self> {
        let pipeline = Pipeline::compile(ctx, &operation)?;
        Ok(Self {
            ctx,
            candidates: vec![Candidate {
                operation,
                pipeline,
            }],
            last_used: Mutex::new(None),
        })
    }

    /// 全部可执行的候选（按排序）
    pub fn operations(&self) -> Vec<&Operation> {
        self.candidates.iter().map(|c| &c.operation).collect()
    }

    /// 最近一次成功使用的操作
    pub fn last_used_operation(&self) -> Option<&Operation> {
        let index = (*self.last_used.lock())?;
        self.candidates.get(index).map(|c| &c.operation)
    }

    /// 变换单个坐标
    ///
    /// 失败时返回 [`Coordinate::ERROR`] 并在上下文上记录错误。
    pub fn transform(&self, direction: Direction, coord: Coordinate) -> Coordinate {
        match self.run(direction, coord) {
            Ok((index, out)) => {
                *self.last_used.lock() = Some(index);
                out
            }
            Err(kind) => {
                self.ctx.set_last_error(kind);
                Coordinate::ERROR
            }
        }
    }

    /// 批量变换，返回 (结果, 是否有任一失败)；输出顺序与输入一致
    pub fn transform_batch(&self, direction: Direction, coords: &[Coordinate]) -> (Vec<Coordinate>, bool) {
        let run = |c: &Coordinate| self.run(direction, *c);
        let results: Vec<Result<(usize, Coordinate), TransformErrorKind>> =
            if coords.len() > PARALLEL_THRESHOLD {
                coords.par_iter().map(run).collect()
            } else {
                coords.iter().map(run).collect()
            };

        if let Some(index) = results.iter().rev().find_map(|r| r.as_ref().ok().map(|(i, _)| *i)) {
            *self.last_used.lock() = Some(index);
        }
        let first_error = results.iter().find_map(|r| r.as_ref().err().copied());
        if let Some(kind) = first_error {
            self.ctx.set_last_error(kind);
        }
        let out = results
            .into_iter()
            .map(|r| r.map_or(Coordinate::ERROR, |(_, c)| c))
            .collect();
        (out, first_error.is_some())
    }

    /// 依次尝试适用范围包含该点的候选
    ///
    /// 有非 ballpark 候选适用时只在它们之间尝试；
    /// 没有候选包含该点（或无法定位）时只尝试排序第一的候选。
    fn run(&self, direction: Direction, coord: Coordinate) -> Result<(usize, Coordinate), TransformErrorKind> {
        if self.candidates.is_empty() {
            return Err(TransformErrorKind::NoOperation);
        }
        let applicable: Vec<usize> = (0..self.candidates.len())
            .filter(|&i| Self::applies(&self.candidates[i].operation, direction, coord))
            .collect();
        let regional: Vec<usize> = applicable
            .iter()
            .copied()
            .filter(|&i| !self.candidates[i].operation.is_ballpark())
            .collect();
        let order = match (regional.is_empty(), applicable.is_empty()) {
            (false, _) => regional,
            (true, false) => applicable,
            (true, true) => vec![0],
        };

        let mut first_error = None;
        for index in order {
            match self.candidates[index].pipeline.run(direction, coord) {
                Ok(out) => return Ok((index, out)),
                Err(kind) => {
                    first_error.get_or_insert(kind);
                }
            }
        }
        Err(first_error.unwrap_or(TransformErrorKind::NoOperation))
    }

    fn applies(op: &Operation, direction: Direction, coord: Coordinate) -> bool {
        let Some(area) = &op.area else { return true };
        let input = match direction {
            Direction::Forward => op.source_crs.as_deref(),
            Direction::Inverse => op.target_crs.as_deref(),
        };
        input
            .and_then(|crs| executor::geographic_position(crs, coord))
            .is_some_and(|(lon, lat)| area.contains_point(lon, lat))
    }

    /// 要求存在至少一个候选
    ///
    /// # Errors
    /// 没有候选时返回 `NotFound`
    pub fn require_operations(&self) -> GtResult<()> {
        if self.candidates.is_empty() {
            return Err(GtError::not_found("可执行的坐标操作"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_config::GeoTransConfig;

    #[test]
    fn test_single_operation_transformer() {
        let ctx = Context::with_config(GeoTransConfig::default());
        let utm = Crs::utm_zone(32, true).unwrap();
        let transformer =
            Transformer::new(&ctx, &Crs::wgs84(), &utm, &ctx.default_policy()).unwrap();
        transformer.require_operations().unwrap();
        assert!(transformer.last_used_operation().is_none());

        let out = transformer.transform(Direction::Forward, Coordinate::xy(0.0, 9.0));
        assert!((out.x() - 500_000.0).abs() < 1e-6);
        assert!(transformer.last_used_operation().is_some());

        let bad = transformer.transform(Direction::Forward, Coordinate::xy(100.0, 9.0));
        assert!(bad.is_error());
        assert_eq!(ctx.last_error(), Some(TransformErrorKind::InvalidCoordinate));
    }

    #[test]
    fn test_batch_preserves_order() {
        let ctx = Context::with_config(GeoTransConfig::default());
        let utm = Crs::utm_zone(32, true).unwrap();
        let transformer =
            Transformer::new(&ctx, &Crs::wgs84(), &utm, &ctx.default_policy()).unwrap();
        let coords = [Coordinate::xy(10.0, 9.0), Coordinate::xy(95.0, 9.0), Coordinate::xy(20.0, 9.0)];
        let (out, failed) = transformer.transform_batch(Direction::Forward, &coords);
        assert!(failed);
        assert!(out[1].is_error());
        assert!(out[0].y() < out[2].y());
    }
}
