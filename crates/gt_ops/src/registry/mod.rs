// crates/gt_ops/src/registry/mod.rs

//! 权威注册表
//!
//! 解析器只通过 [`Registry`] trait 访问权威数据库：按代码查定义文本、
//! 按端点查坐标操作、权威优先级、枢纽候选、命名区域与别名。
//!
//! 内置实现见 [`BuiltinRegistry`]，覆盖一个小的 EPSG 子集。

pub mod builtin;

pub use builtin::BuiltinRegistry;

use gt_foundation::{GtError, GtResult, Parsed};
use gt_geo::compare::AliasResolver;
use gt_geo::parse::{parse_definition, Definition};
use gt_geo::prelude::*;

/// 引用链的最大深度
const MAX_REFERENCE_DEPTH: usize = 8;

/// 注册对象类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    /// 坐标参考系统
    Crs,
    /// 坐标操作
    CoordinateOperation,
}

/// 注册表中的操作记录
#[derive(Debug, Clone)]
pub struct OperationRecord {
    /// 按注册方向存储的操作
    pub operation: Operation,
    /// 查询方向与注册方向相反
    pub reversed: bool,
}

impl OperationRecord {
    /// 按查询方向取出操作（反向记录取逆）
    pub fn oriented(&self) -> Operation {
        if self.reversed {
            self.operation.inverse()
        } else {
            self.operation.clone()
        }
    }
}

/// 只读权威注册表
pub trait Registry: Send + Sync {
    /// 按权威与代码查找定义文本（WKT 或 proj-string）
    fn lookup_definition(&self, authority: &str, code: &str, category: ObjectCategory)
        -> Option<String>;

    /// 两个 CRS 之间登记的单一操作，不区分方向
    fn operations_between(&self, source: &Identifier, target: &Identifier) -> Vec<OperationRecord>;

    /// 权威优先级（靠前者优先）
    fn authority_preference(&self) -> Vec<String>;

    /// 同时与源和目标直接相连的 CRS
    fn pivot_candidates(&self, source: &Identifier, target: &Identifier) -> Vec<Identifier>;

    /// 按名称查找区域
    fn area_by_name(&self, name: &str) -> Option<Area>;

    /// 识别匿名 CRS：先完全等价，再按基准等价
    fn identify(&self, crs: &Crs) -> Option<Identifier>;

    /// 名称别名的规范形式
    fn canonical_name(&self, name: &str) -> Option<String>;
}

/// 注册表的别名解析适配器
pub struct RegistryAliases<'a>(pub &'a dyn Registry);

impl AliasResolver for RegistryAliases<'_> {
    fn canonical_name(&self, name: &str) -> Option<String> {
        self.0.canonical_name(name)
    }
}

/// 由标识符取出 CRS，定义本身为引用时继续解析
///
/// 注册表定义中缺少标识符时补上查询所用的标识符。
///
/// # Errors
/// 注册表中不存在、引用链过长或定义解析失败时返回错误
pub fn resolve_crs(registry: &dyn Registry, id: &Identifier) -> GtResult<Parsed<Crs>> {
    let mut current = id.clone();
    for _ in 0..MAX_REFERENCE_DEPTH {
        let text = registry
            .lookup_definition(&current.authority, &current.code, ObjectCategory::Crs)
            .ok_or_else(|| GtError::not_found(format!("CRS {current}")))?;
        match parse_definition(&text)? {
            Definition::Reference(next) => current = next,
            Definition::Crs(parsed) => {
                return Ok(parsed.map(|mut crs| {
                    crs.id.get_or_insert(current);
                    crs
                }))
            }
        }
    }
    Err(GtError::invalid_input(format!("CRS 引用链过长: {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_crs() {
        let registry = BuiltinRegistry::new();
        let crs = resolve_crs(&registry, &Identifier::epsg(4267)).unwrap().value;
        assert_eq!(crs.name, "NAD27");
        assert_eq!(crs.id, Some(Identifier::epsg(4267)));
        assert!(crs.area.is_some());
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = BuiltinRegistry::new();
        let err = resolve_crs(&registry, &Identifier::epsg(1)).unwrap_err();
        assert!(matches!(err, GtError::NotFound { .. }));
    }

    #[test]
    fn test_oriented_record() {
        let registry = BuiltinRegistry::new();
        let records = registry.operations_between(&Identifier::epsg(4258), &Identifier::epsg(4171));
        assert_eq!(records.len(), 1);
        assert!(records[0].reversed);
        let op = records[0].oriented();
        assert_eq!(op.name, "Inverse of RGF93 v1 to ETRS89 (1)");
        assert_eq!(op.source_crs.as_ref().unwrap().id, Some(Identifier::epsg(4258)));
    }

    #[test]
    fn test_alias_adapter() {
        let registry = BuiltinRegistry::new();
        let aliases = RegistryAliases(&registry);
        assert_eq!(
            aliases.canonical_name("ED50").as_deref(),
            Some("European Datum 1950")
        );
    }
}
