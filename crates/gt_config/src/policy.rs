// crates/gt_config/src/policy.rs

//! 操作搜索策略枚举
//!
//! 搜索策略中每个离散选项都是一个可序列化的枚举，
//! 既能出现在 JSON 配置中，也能从环境变量/命令行字符串解析。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 空间判据：操作适用范围与感兴趣区域的关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpatialCriterion {
    /// 操作适用范围必须完全包含感兴趣区域
    #[default]
    StrictContainment,
    /// 操作适用范围与感兴趣区域相交即可
    PartialIntersection,
}

/// 格网可用性的使用方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridAvailability {
    /// 不查询格网可用性
    Ignore,
    /// 丢弃需要不可用格网的操作
    #[default]
    DiscardIfUnavailable,
    /// 保留所有操作，可用格网的操作排在前面
    UseRegardless,
}

/// 枢纽（中间）CRS 的使用方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PivotUse {
    /// 从不经由枢纽
    Never,
    /// 仅在没有可接受的直接操作时经由枢纽
    #[default]
    IfNoDirect,
    /// 总是同时搜索枢纽路径
    Always,
}

/// 源/目标 CRS 适用范围如何组合为默认感兴趣区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrsExtentUse {
    /// 不使用 CRS 适用范围（全球）
    None,
    /// 源和目标范围都必须满足空间判据
    Both,
    /// 使用两者的交集
    #[default]
    Intersection,
    /// 使用两者中较小的一个
    Smallest,
}

/// 策略值解析错误
#[derive(Debug, Clone)]
pub struct PolicyParseError {
    /// 期望的类型
    pub kind: &'static str,
    /// 无法识别的输入
    pub value: String,
}

impl std::fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "无效的{}取值: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for PolicyParseError {}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace(['-', ' '], "_")
}

impl FromStr for SpatialCriterion {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "strict_containment" | "strict" | "contains" => Ok(Self::StrictContainment),
            "partial_intersection" | "partial" | "intersects" => Ok(Self::PartialIntersection),
            _ => Err(PolicyParseError {
                kind: "空间判据",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for GridAvailability {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "ignore" | "ignored" => Ok(Self::Ignore),
            "discard_if_unavailable" | "discard" => Ok(Self::DiscardIfUnavailable),
            "use_regardless" | "known_available" => Ok(Self::UseRegardless),
            _ => Err(PolicyParseError {
                kind: "格网可用性",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for PivotUse {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "never" | "off" => Ok(Self::Never),
            "if_no_direct" | "if_no_direct_transformation" => Ok(Self::IfNoDirect),
            "always" | "on" => Ok(Self::Always),
            _ => Err(PolicyParseError {
                kind: "枢纽使用",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for CrsExtentUse {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "none" => Ok(Self::None),
            "both" => Ok(Self::Both),
            "intersection" => Ok(Self::Intersection),
            "smallest" => Ok(Self::Smallest),
            _ => Err(PolicyParseError {
                kind: "CRS 范围使用",
                value: s.to_string(),
            }),
        }
    }
}
