// crates/gt_ops/src/context.rs

//! 执行上下文
//!
//! 上下文集中持有注册表、格网提供者、已解码格网的缓存、网络开关与最近一次
//! 逐点数值错误。上下文可在线程间共享（内部可变状态由锁保护）；
//! 克隆得到的上下文共享注册表与提供者，但拥有独立的缓存和错误状态。

use crate::grid::{CachePolicy, DirectoryGridProvider, Grid, GridProvider};
use crate::registry::{BuiltinRegistry, Registry, RegistryAliases};
use crate::resolver::SearchPolicy;
use gt_config::GeoTransConfig;
use gt_foundation::TransformErrorKind;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 缓存中的已解码格网
#[derive(Clone)]
struct CachedGrid {
    grid: Arc<Grid>,
    loaded_at: Instant,
}

/// 坐标操作上下文
pub struct Context {
    config: GeoTransConfig,
    registry: Arc<dyn Registry>,
    grid_provider: Arc<dyn GridProvider>,
    grid_cache: RwLock<HashMap<String, CachedGrid>>,
    last_error: Mutex<Option<TransformErrorKind>>,
}

impl Context {
    /// 默认上下文：内置注册表、默认配置叠加环境变量、目录格网提供者
    pub fn new() -> Self {
        let mut config = GeoTransConfig::default();
        if let Err(e) = config.apply_env_overrides() {
            tracing::warn!("忽略无效的环境变量配置: {}", e);
        }
        Self::with_config(config)
    }

    /// 由配置创建（内置注册表、按配置搜索路径的目录提供者）
    pub fn with_config(config: GeoTransConfig) -> Self {
        let provider = DirectoryGridProvider::from_config(&config);
        provider.set_cache_policy(CachePolicy::from(&config.grid_cache));
        Self {
            registry: Arc::new(BuiltinRegistry::new()),
            grid_provider: Arc::new(provider),
            grid_cache: RwLock::new(HashMap::new()),
            last_error: Mutex::new(None),
            config,
        }
    }

    /// 替换注册表
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// 替换格网提供者，并清空已缓存的格网
    #[must_use]
    pub fn with_grid_provider(mut self, provider: Arc<dyn GridProvider>) -> Self {
        self.grid_provider = provider;
        self.grid_cache.get_mut().clear();
        self
    }

    /// 当前配置
    pub fn config(&self) -> &GeoTransConfig {
        &self.config
    }

    /// 注册表
    pub fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    /// 基于注册表的名称别名解析
    pub fn aliases(&self) -> RegistryAliases<'_> {
        RegistryAliases(self.registry.as_ref())
    }

    /// 格网提供者
    pub fn grid_provider(&self) -> &dyn GridProvider {
        self.grid_provider.as_ref()
    }

    /// 由配置中的搜索默认值构造的策略
    pub fn default_policy(&self) -> SearchPolicy {
        SearchPolicy::from(&self.config.search)
    }

    // ------------------------------------------------------------------------
    // 网络
    // ------------------------------------------------------------------------

    /// 是否允许网络获取格网
    pub fn is_network_enabled(&self) -> bool {
        self.config.network.enabled
    }

    /// 设置网络开关
    pub fn set_network_enabled(&mut self, enabled: bool) {
        tracing::info!("网络获取 {}", if enabled { "启用" } else { "关闭" });
        self.config.network.enabled = enabled;
    }

    // ------------------------------------------------------------------------
    // 错误状态
    // ------------------------------------------------------------------------

    /// 最近一次逐点数值错误
    pub fn last_error(&self) -> Option<TransformErrorKind> {
        *self.last_error.lock()
    }

    /// 记录逐点数值错误
    pub fn set_last_error(&self, kind: TransformErrorKind) {
        *self.last_error.lock() = Some(kind);
    }

    /// 清除错误状态
    pub fn clear_last_error(&self) {
        *self.last_error.lock() = None;
    }

    /// 最近一次错误的数值码（无错误时为 0）
    pub fn errno(&self) -> i32 {
        self.last_error().map_or(0, TransformErrorKind::code)
    }

    // ------------------------------------------------------------------------
    // 格网
    // ------------------------------------------------------------------------

    /// 格网是否可由提供者打开
    pub fn is_grid_available(&self, name: &str) -> bool {
        self.grid_provider.is_available(name)
    }

    /// 更新缓存策略（同步到提供者）
    pub fn set_cache_policy(&self, policy: CachePolicy) {
        self.grid_provider.set_cache_policy(policy);
        if !policy.enabled {
            self.clear_grid_cache();
        }
    }

    /// 已缓存的格网数量
    pub fn cached_grid_count(&self) -> usize {
        self.grid_cache.read().len()
    }

    /// 清空格网缓存
    pub fn clear_grid_cache(&self) {
        self.grid_cache.write().clear();
    }

    /// 加载并解码格网，命中缓存时直接返回
    ///
    /// # Errors
    /// 提供者无法打开或格网损坏时返回 `ResourceUnavailable`
    pub fn load_grid(&self, name: &str) -> Result<Arc<Grid>, TransformErrorKind> {
        let policy = self.grid_provider.cache_policy();
        let ttl = Duration::from_secs(policy.ttl_secs);

        if policy.enabled {
            if let Some(entry) = self.grid_cache.read().get(name) {
                if entry.loaded_at.elapsed() < ttl {
                    return Ok(Arc::clone(&entry.grid));
                }
            }
        }

        let grid = self
            .grid_provider
            .open_for_read(name)
            .and_then(|mut handle| Grid::decode(name, handle.as_mut()))
            .map_err(|e| {
                tracing::warn!("格网 {} 不可用: {}", name, e);
                TransformErrorKind::ResourceUnavailable
            })?;
        let grid = Arc::new(grid);
        tracing::debug!("已加载格网 {} ({} 字节)", name, grid.byte_size());

        if policy.enabled {
            self.cache_grid(name, &grid, policy);
        }
        Ok(grid)
    }

    fn cache_grid(&self, name: &str, grid: &Arc<Grid>, policy: CachePolicy) {
        let max_bytes = policy.max_bytes();
        let size = grid.byte_size();
        if size > max_bytes {
            tracing::debug!("格网 {} 超出缓存上限，不缓存", name);
            return;
        }

        let ttl = Duration::from_secs(policy.ttl_secs);
        let mut cache = self.grid_cache.write();
        cache.retain(|_, e| e.loaded_at.elapsed() < ttl);
        cache.remove(name);

        let mut used: usize = cache.values().map(|e| e.grid.byte_size()).sum();
        while used + size > max_bytes {
            let oldest = cache
                .iter()
                .min_by_key(|(_, e)| e.loaded_at)
                .map(|(k, _)| k.clone());
            let Some(key) = oldest else { break };
            if let Some(evicted) = cache.remove(&key) {
                used -= evicted.grid.byte_size();
                tracing::debug!("逐出缓存格网 {}", key);
            }
        }

        cache.insert(
            name.to_string(),
            CachedGrid {
                grid: Arc::clone(grid),
                loaded_at: Instant::now(),
            },
        );
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            grid_provider: Arc::clone(&self.grid_provider),
            grid_cache: RwLock::new(HashMap::new()),
            last_error: Mutex::new(None),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("cached_grids", &self.cached_grid_count())
            .field("last_error", &self.last_error())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MemoryGridProvider;

    fn gtx_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        for v in [0.0f64, 0.0, 1.0, 1.0] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out.extend_from_slice(&2i32.to_be_bytes());
        out.extend_from_slice(&2i32.to_be_bytes());
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    fn memory_context() -> (Context, Arc<MemoryGridProvider>) {
        let provider = Arc::new(MemoryGridProvider::new());
        provider.insert("a.gtx", gtx_bytes());
        let ctx = Context::with_config(GeoTransConfig::default())
            .with_grid_provider(provider.clone());
        (ctx, provider)
    }

    #[test]
    fn test_error_state() {
        let ctx = Context::with_config(GeoTransConfig::default());
        assert_eq!(ctx.errno(), 0);
        ctx.set_last_error(TransformErrorKind::OutsideGrid);
        assert_eq!(ctx.errno(), 2052);
        let cloned = ctx.clone();
        assert_eq!(cloned.last_error(), None);
        ctx.clear_last_error();
        assert_eq!(ctx.last_error(), None);
    }

    #[test]
    fn test_load_grid_cached() {
        let (ctx, provider) = memory_context();
        let first = ctx.load_grid("a.gtx").unwrap();
        assert_eq!(ctx.cached_grid_count(), 1);
        provider.remove("a.gtx");
        let second = ctx.load_grid("a.gtx").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_load_grid_missing() {
        let (ctx, _) = memory_context();
        assert_eq!(
            ctx.load_grid("missing.gtx").unwrap_err(),
            TransformErrorKind::ResourceUnavailable
        );
    }

    #[test]
    fn test_cache_disabled() {
        let (ctx, _) = memory_context();
        ctx.set_cache_policy(CachePolicy {
            enabled: false,
            max_size_mb: 0,
            ttl_secs: 0,
        });
        ctx.load_grid("a.gtx").unwrap();
        assert_eq!(ctx.cached_grid_count(), 0);
    }

    #[test]
    fn test_network_toggle() {
        let mut ctx = Context::with_config(GeoTransConfig::default());
        let initial = ctx.is_network_enabled();
        ctx.set_network_enabled(!initial);
        assert_eq!(ctx.is_network_enabled(), !initial);
    }
}
