// crates/gt_geo/src/identifier.rs

//! 权威机构标识符 (authority, code)

use serde::{Deserialize, Serialize};
use std::fmt;

/// 权威机构标识符，如 `EPSG:4326`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// 权威机构（保存为大写）
    pub authority: String,
    /// 代码
    pub code: String,
}

impl Identifier {
    /// 创建标识符
    pub fn new(authority: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            authority: authority.into().to_uppercase(),
            code: code.into(),
        }
    }

    /// EPSG 标识符
    pub fn epsg(code: u32) -> Self {
        Self::new("EPSG", code.to_string())
    }

    /// 解析 `AUTH:CODE`、`urn:ogc:def:crs:AUTH::CODE` 或 `+init=auth:code` 形式的引用
    #[must_use]
    pub fn parse_reference(text: &str) -> Option<Self> {
        let text = text.trim();

        if let Some(rest) = text.strip_prefix("+init=") {
            let (auth, code) = rest.split_once(':')?;
            return Self::checked(auth, code);
        }

        let lower = text.to_lowercase();
        if lower.starts_with("urn:ogc:def:") {
            // urn:ogc:def:crs:EPSG:<version>:4326，版本号可为空
            let parts: Vec<&str> = text.split(':').collect();
            if parts.len() >= 6 {
                return Self::checked(parts[4], parts[parts.len() - 1]);
            }
            return None;
        }

        let (auth, code) = text.split_once(':')?;
        if auth.is_empty() || code.contains(char::is_whitespace) || auth.contains(['[', '+', '=']) {
            return None;
        }
        Self::checked(auth, code)
    }

    fn checked(auth: &str, code: &str) -> Option<Self> {
        let auth = auth.trim();
        let code = code.trim();
        if auth.is_empty()
            || code.is_empty()
            || !auth.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        Some(Self::new(auth, code))
    }

    /// 代码的数值形式（非数值代码返回 `None`）
    #[must_use]
    pub fn numeric_code(&self) -> Option<u32> {
        self.code.parse().ok()
    }

    /// 是否为 EPSG 标识符
    #[must_use]
    pub fn is_epsg(&self) -> bool {
        self.authority == "EPSG"
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}
