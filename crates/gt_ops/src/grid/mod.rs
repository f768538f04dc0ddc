// crates/gt_ops/src/grid/mod.rs

//! 格网资源提供者
//!
//! 核心不直接做 I/O：格网文件经由 [`GridProvider`] 打开为字节句柄，
//! 再解码为内存中的 [`Grid`]。提供者的任何失败（缺失、短读、头部损坏）
//! 在执行层都归为逐点数值失败，不会使调用方崩溃。
//!
//! 支持的格式：
//!
//! - NTv2 (`.gsb`)：水平格网，多子格网，自动识别字节序
//! - GTX (`.gtx`)：垂直格网，大端序

pub mod gtx;
pub mod ntv2;

pub use gtx::VerticalGrid;
pub use ntv2::{HorizontalGrid, Subgrid};

use gt_config::{GeoTransConfig, GridCacheConfig};
use gt_foundation::{GtError, GtResult};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// 缓存策略
// ============================================================================

/// 格网缓存策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// 是否启用缓存
    pub enabled: bool,
    /// 最大缓存大小 [MB]
    pub max_size_mb: u64,
    /// 条目存活时间 [s]
    pub ttl_secs: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&GridCacheConfig::default())
    }
}

impl From<&GridCacheConfig> for CachePolicy {
    fn from(config: &GridCacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_size_mb: config.max_size_mb,
            ttl_secs: config.ttl_secs,
        }
    }
}

impl CachePolicy {
    /// 最大缓存字节数
    pub fn max_bytes(&self) -> usize {
        usize::try_from(self.max_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

// ============================================================================
// 提供者接口
// ============================================================================

/// 按字节区间读取的格网句柄
pub trait GridHandle: Send {
    /// 总字节数
    fn len(&self) -> u64;

    /// 是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从 `offset` 处读取，返回实际读取的字节数（文件末尾返回 0）
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> GtResult<usize>;

    /// 读满缓冲区，不足时返回错误
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> GtResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(GtError::io(format!(
                    "短读: 偏移 {offset} 处需要 {} 字节，仅读到 {filled} 字节",
                    buf.len()
                )));
            }
            filled += n;
        }
        Ok(())
    }
}

/// 格网资源提供者
pub trait GridProvider: Send + Sync {
    /// 格网是否可用
    fn is_available(&self, name: &str) -> bool;

    /// 打开格网以供读取
    fn open_for_read(&self, name: &str) -> GtResult<Box<dyn GridHandle>>;

    /// 当前缓存策略
    fn cache_policy(&self) -> CachePolicy;

    /// 设置缓存策略
    fn set_cache_policy(&self, policy: CachePolicy);
}

// ============================================================================
// 内存提供者
// ============================================================================

/// 以名称索引字节缓冲区的提供者
#[derive(Debug, Default)]
pub struct MemoryGridProvider {
    grids: RwLock<HashMap<String, Arc<[u8]>>>,
    policy: Mutex<CachePolicy>,
}

impl MemoryGridProvider {
    /// 创建空提供者
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记格网字节
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.grids.write().insert(name.into(), bytes.into());
    }

    /// 移除格网
    pub fn remove(&self, name: &str) -> bool {
        self.grids.write().remove(name).is_some()
    }

    /// 格网数量
    pub fn len(&self) -> usize {
        self.grids.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.grids.read().is_empty()
    }
}

impl GridProvider for MemoryGridProvider {
    fn is_available(&self, name: &str) -> bool {
        self.grids.read().contains_key(name)
    }

    fn open_for_read(&self, name: &str) -> GtResult<Box<dyn GridHandle>> {
        let data = self
            .grids
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GtError::not_found(format!("格网 {name}")))?;
        Ok(Box::new(MemoryGridHandle { data }))
    }

    fn cache_policy(&self) -> CachePolicy {
        *self.policy.lock()
    }

    fn set_cache_policy(&self, policy: CachePolicy) {
        *self.policy.lock() = policy;
    }
}

/// 内存字节句柄
#[derive(Debug, Clone)]
pub struct MemoryGridHandle {
    data: Arc<[u8]>,
}

impl GridHandle for MemoryGridHandle {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> GtResult<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

// ============================================================================
// 目录提供者
// ============================================================================

/// 在搜索路径中查找格网文件的提供者
#[derive(Debug, Default)]
pub struct DirectoryGridProvider {
    search_paths: Vec<PathBuf>,
    policy: Mutex<CachePolicy>,
}

impl DirectoryGridProvider {
    /// 由搜索路径创建
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            policy: Mutex::new(CachePolicy::default()),
        }
    }

    /// 由配置创建（搜索路径与缓存策略）
    pub fn from_config(config: &GeoTransConfig) -> Self {
        Self {
            search_paths: config.grid_search_paths.clone(),
            policy: Mutex::new(CachePolicy::from(&config.grid_cache)),
        }
    }

    /// 搜索路径
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// 查找格网文件：绝对路径直接使用，否则按搜索路径顺序查找
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }
        self.search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|p| p.is_file())
    }
}

impl GridProvider for DirectoryGridProvider {
    fn is_available(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    fn open_for_read(&self, name: &str) -> GtResult<Box<dyn GridHandle>> {
        let path = self
            .locate(name)
            .ok_or_else(|| GtError::file_not_found(name))?;
        let file = File::open(&path)
            .map_err(|e| GtError::io_with_source(format!("无法打开格网 {}", path.display()), e))?;
        let len = file
            .metadata()
            .map_err(|e| GtError::io_with_source(format!("无法读取格网元数据 {}", path.display()), e))?
            .len();
        Ok(Box::new(FileGridHandle { file, len }))
    }

    fn cache_policy(&self) -> CachePolicy {
        *self.policy.lock()
    }

    fn set_cache_policy(&self, policy: CachePolicy) {
        *self.policy.lock() = policy;
    }
}

/// 文件字节句柄
#[derive(Debug)]
pub struct FileGridHandle {
    file: File,
    len: u64,
}

impl GridHandle for FileGridHandle {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> GtResult<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(self.file.read(buf)?)
    }
}

// ============================================================================
// 解码后的格网
// ============================================================================

/// 内存中的格网
#[derive(Debug, Clone)]
pub enum Grid {
    /// 水平偏移格网
    Horizontal(HorizontalGrid),
    /// 垂直偏移格网
    Vertical(VerticalGrid),
}

impl Grid {
    /// 由句柄解码，按内容识别 NTv2，按扩展名识别 GTX
    ///
    /// # Errors
    /// 格式无法识别或数据损坏时返回错误
    pub fn decode(name: &str, handle: &mut dyn GridHandle) -> GtResult<Self> {
        if handle.len() >= 8 {
            let mut magic = [0u8; 8];
            handle.read_exact_at(0, &mut magic)?;
            if &magic == ntv2::MAGIC {
                return ntv2::decode(name, handle).map(Self::Horizontal);
            }
        }
        if name.to_lowercase().ends_with(".gtx") {
            return gtx::decode(name, handle).map(Self::Vertical);
        }
        Err(GtError::invalid_input(format!("无法识别的格网格式: {name}")))
    }

    /// 名称
    pub fn name(&self) -> &str {
        match self {
            Self::Horizontal(g) => &g.name,
            Self::Vertical(g) => &g.name,
        }
    }

    /// 内存占用估计（字节）
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Horizontal(g) => g.byte_size(),
            Self::Vertical(g) => g.byte_size(),
        }
    }

    /// 水平格网
    pub fn as_horizontal(&self) -> Option<&HorizontalGrid> {
        match self {
            Self::Horizontal(g) => Some(g),
            Self::Vertical(_) => None,
        }
    }

    /// 垂直格网
    pub fn as_vertical(&self) -> Option<&VerticalGrid> {
        match self {
            Self::Vertical(g) => Some(g),
            Self::Horizontal(_) => None,
        }
    }
}

/// 单元内双线性插值，`fx`/`fy` 为单元内相对位置 [0, 1]
#[inline]
pub(crate) fn bilinear(fx: f64, fy: f64, v00: f64, v10: f64, v01: f64, v11: f64) -> f64 {
    let bottom = v00 + (v10 - v00) * fx;
    let top = v01 + (v11 - v01) * fx;
    bottom + (top - bottom) * fy
}

/// 节点格局部坐标：返回 (列, 行, fx, fy)，点在格网外时返回 `None`
///
/// 落在东/北边界上的点归入最后一个单元。
pub(crate) fn locate_cell(x: f64, y: f64, cols: usize, rows: usize) -> Option<(usize, usize, f64, f64)> {
    const EDGE: f64 = 1e-9;
    if cols < 2 || rows < 2 || !x.is_finite() || !y.is_finite() {
        return None;
    }
    let max_x = (cols - 1) as f64;
    let max_y = (rows - 1) as f64;
    if x < -EDGE || y < -EDGE || x > max_x + EDGE || y > max_y + EDGE {
        return None;
    }
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let col = (x.floor() as usize).min(cols - 2);
    let row = (y.floor() as usize).min(rows - 2);
    Some((col, row, x - col as f64, y - row as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_provider() {
        let provider = MemoryGridProvider::new();
        assert!(!provider.is_available("a.gtx"));
        provider.insert("a.gtx", vec![1u8, 2, 3, 4]);
        assert!(provider.is_available("a.gtx"));

        let mut handle = provider.open_for_read("a.gtx").unwrap();
        assert_eq!(handle.len(), 4);
        let mut buf = [0u8; 3];
        assert_eq!(handle.read_at(2, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[3, 4]);
        assert_eq!(handle.read_at(10, &mut buf).unwrap(), 0);
        assert!(handle.read_exact_at(2, &mut buf).is_err());

        assert!(provider.remove("a.gtx"));
        assert!(provider.open_for_read("a.gtx").is_err());
    }

    #[test]
    fn test_cache_policy_roundtrip() {
        let provider = MemoryGridProvider::new();
        assert_eq!(provider.cache_policy(), CachePolicy::default());
        let policy = CachePolicy {
            enabled: false,
            max_size_mb: 1,
            ttl_secs: 5,
        };
        provider.set_cache_policy(policy);
        assert_eq!(provider.cache_policy(), policy);
        assert_eq!(policy.max_bytes(), 1024 * 1024);
    }

    #[test]
    fn test_directory_provider() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("g.gtx"), [7u8; 16]).unwrap();
        let provider = DirectoryGridProvider::new(vec![dir.path().to_path_buf()]);
        assert!(provider.is_available("g.gtx"));
        assert!(!provider.is_available("missing.gtx"));

        let mut handle = provider.open_for_read("g.gtx").unwrap();
        assert_eq!(handle.len(), 16);
        let mut buf = [0u8; 4];
        handle.read_exact_at(12, &mut buf).unwrap();
        assert_eq!(buf, [7; 4]);

        let err = provider.open_for_read("missing.gtx").err().unwrap();
        assert!(matches!(err, GtError::FileNotFound { .. }));
    }

    #[test]
    fn test_unknown_format() {
        let provider = MemoryGridProvider::new();
        provider.insert("x.bin", vec![0u8; 64]);
        let mut handle = provider.open_for_read("x.bin").unwrap();
        assert!(Grid::decode("x.bin", handle.as_mut()).is_err());
    }

    #[test]
    fn test_locate_cell() {
        assert_eq!(locate_cell(0.5, 0.25, 3, 3), Some((0, 0, 0.5, 0.25)));
        // 东北角归入最后一个单元
        assert_eq!(locate_cell(2.0, 2.0, 3, 3), Some((1, 1, 1.0, 1.0)));
        assert!(locate_cell(-0.1, 0.0, 3, 3).is_none());
        assert!(locate_cell(f64::NAN, 0.0, 3, 3).is_none());
    }

    #[test]
    fn test_bilinear() {
        assert!((bilinear(0.5, 0.5, 0.0, 1.0, 2.0, 3.0) - 1.5).abs() < 1e-12);
        assert!((bilinear(0.0, 1.0, 0.0, 1.0, 2.0, 3.0) - 2.0).abs() < 1e-12);
    }
}
