//! 分层依赖解析容器
//!
//! 提供类型安全的绑定声明和解析功能，支持：
//! - 瞬态、单例、实例、别名四种生命周期
//! - 具名绑定与多绑定解析
//! - 父子作用域（子作用域遮蔽父作用域的同名绑定）
//! - 基于解析帧链的循环依赖检测
//! - 急切绑定与延迟（after-resolve）属性注入

mod binding;
mod builder;
mod context;
mod key;
mod stats;
mod table;

pub use builder::{AsClause, BindingBuilder, EagerClause};
pub use context::{AfterResolveFn, Context};
pub use key::BindingKey;
pub use stats::ContainerStats;

use crate::config::LocatorConfig;
use crate::errors::{LocatorError, LocatorResult};
use crate::infrastructure::module::ModuleLoader;
use crate::infrastructure::provider::Provider;
use binding::{Binding, EagerBinding};
use dashmap::DashMap;
use parking_lot::Mutex;
use stats::{InnerStats, StatEvent};
use std::any::TypeId;
use std::sync::Arc;
use table::{AnyBindingTable, BindingTable};

/// 绑定的生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// 每次解析都执行工厂
    Transient,
    /// 首次解析时创建并缓存，之后总是返回同一实例
    Singleton,
    /// 总是返回预先提供的实例，从不执行工厂
    Instance,
    /// 转发到另一个能力标识的解析
    Alias,
}

pub(crate) struct ContainerInner {
    id: uuid::Uuid,
    /// 子容器持有父容器的强引用
    parent: Option<Container>,
    level: usize,
    /// 能力类型 -> 该类型的绑定表
    tables: DashMap<TypeId, Arc<dyn AnyBindingTable>>,
    pending_eager: Mutex<Vec<Arc<dyn EagerBinding>>>,
    /// 顶层解析失败时留下的延迟回调，等待下一次成功的解析
    deferred: Mutex<Vec<AfterResolveFn>>,
    config: LocatorConfig,
    stats: Arc<InnerStats>,
}

/// 作用域容器
///
/// 句柄可以廉价克隆，所有克隆共享同一份绑定。容器在最后一个句柄
/// （包括子容器持有的父引用）释放时销毁，连同其缓存的单例一起。
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    /// 创建根容器
    pub fn create() -> Self {
        Self::with_config(LocatorConfig::default())
    }

    pub fn with_config(config: LocatorConfig) -> Self {
        Self::build(None, config)
    }

    fn build(parent: Option<Container>, config: LocatorConfig) -> Self {
        let level = parent.as_ref().map(|p| p.inner.level + 1).unwrap_or(0);
        let inner = ContainerInner {
            id: uuid::Uuid::new_v4(),
            parent,
            level,
            tables: DashMap::new(),
            pending_eager: Mutex::new(Vec::new()),
            deferred: Mutex::new(Vec::new()),
            stats: Arc::new(InnerStats::new(config.collect_stats)),
            config,
        };
        Self { inner: Arc::new(inner) }
    }

    /// 创建子作用域
    ///
    /// 子作用域可以新增绑定或遮蔽父作用域的绑定，但不能删除；
    /// 未解析到的标识回退到父作用域查找。
    pub fn enter_child_scope(&self) -> Container {
        let child = Self::build(Some(self.clone()), self.inner.config.clone());
        tracing::debug!(
            parent = %self.inner.id,
            child = %child.inner.id,
            "Entered child scope at level {}",
            child.inner.level
        );
        child
    }

    pub fn id(&self) -> uuid::Uuid {
        self.inner.id
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// 作用域层级，根容器为 0
    pub fn level(&self) -> usize {
        self.inner.level
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.inner.config
    }

    /// 声明默认（无名）绑定
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<BindingBuilder<T>> {
        self.bind_named::<T>("")
    }

    /// 声明具名绑定；本容器内同一标识已存在时失败，祖先中的同名绑定不冲突
    pub fn bind_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> LocatorResult<BindingBuilder<T>> {
        let key = BindingKey::of::<T>(name);
        let table = self.table_or_insert::<T>()?;
        let binding = table.register(key, self.inner.stats.clone())?;
        self.inner.stats.binding_registered();
        tracing::debug!(scope = %self.inner.id, "Bound {}", binding.key());
        Ok(BindingBuilder::new(binding, self.clone()))
    }

    /// 获取可用的根上下文
    ///
    /// 第一次调用时强制创建所有待处理的急切绑定，之后再调用不会重复执行；
    /// 之前失败的解析暂存的延迟回调也在这里执行。
    pub fn context(&self) -> LocatorResult<Context<'static>> {
        self.force_eager_bindings()?;
        Ok(Context::root(self))
    }

    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Arc<T>> {
        self.context()?.resolve::<T>()
    }

    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> LocatorResult<Arc<T>> {
        self.context()?.resolve_named::<T>(name)
    }

    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Option<Arc<T>>> {
        self.context()?.try_resolve::<T>()
    }

    pub fn try_resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> LocatorResult<Option<Arc<T>>> {
        self.context()?.try_resolve_named::<T>(name)
    }

    /// 存在性检查，不触发急切绑定
    pub fn can_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.can_resolve_named::<T>("")
    }

    pub fn can_resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> bool {
        let mut scope = Some(self);
        while let Some(container) = scope {
            if container.table::<T>().is_some_and(|table| table.exists(name)) {
                return true;
            }
            scope = container.parent();
        }
        false
    }

    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Vec<Arc<T>>> {
        self.context()?.resolve_all::<T>()
    }

    /// 创建绑定到本容器的 Provider
    pub fn provider<T: ?Sized + Send + Sync + 'static>(&self) -> Provider<T> {
        Provider::new(self.clone())
    }

    /// 模块加载入口：`container.modules().add(FoodModule)?.add(AnimalModule)?`
    pub fn modules(&self) -> ModuleLoader<'_> {
        ModuleLoader::new(self)
    }

    /// 本作用域自身的绑定标识（不含祖先），按类型名和名称排序
    pub fn bound_keys(&self) -> Vec<BindingKey> {
        let mut keys: Vec<BindingKey> = self
            .inner
            .tables
            .iter()
            .flat_map(|entry| entry.value().keys())
            .collect();
        keys.sort_by(|a, b| {
            a.type_name()
                .cmp(b.type_name())
                .then_with(|| a.name().cmp(b.name()))
        });
        keys
    }

    pub fn pending_eager_count(&self) -> usize {
        self.inner.pending_eager.lock().len()
    }

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        self.inner.stats.snapshot()
    }

    /// 重置统计信息（绑定数量保留）
    pub fn reset_stats(&self) {
        self.inner.stats.reset();
    }

    /// 暂存的延迟回调数量
    pub fn pending_deferred_count(&self) -> usize {
        self.inner.deferred.lock().len()
    }

    pub(crate) fn stash_deferred(&self, callbacks: Vec<AfterResolveFn>) {
        if callbacks.is_empty() {
            return;
        }
        self.inner.deferred.lock().extend(callbacks);
    }

    /// 取出暂存的回调并接上本次解析登记的回调，暂存的在前
    pub(crate) fn take_deferred(&self, local: Vec<AfterResolveFn>) -> Vec<AfterResolveFn> {
        let mut pending = std::mem::take(&mut *self.inner.deferred.lock());
        pending.extend(local);
        pending
    }

    pub(crate) fn record_deferred_run(&self) {
        self.inner.stats.record(StatEvent::DeferredRun);
    }

    pub(crate) fn enqueue_eager(&self, binding: Arc<dyn EagerBinding>) {
        tracing::debug!(scope = %self.inner.id, "Queued eager binding {}", binding.key());
        self.inner.pending_eager.lock().push(binding);
    }

    fn force_eager_bindings(&self) -> LocatorResult<()> {
        let pending = std::mem::take(&mut *self.inner.pending_eager.lock());
        if pending.is_empty() && self.pending_deferred_count() == 0 {
            return Ok(());
        }

        if !pending.is_empty() {
            tracing::debug!(scope = %self.inner.id, "Forcing {} eager bindings", pending.len());
        }
        let ctx = Context::root(self);
        for (index, binding) in pending.iter().enumerate() {
            if let Err(err) = binding.force(&ctx) {
                // 未成功强制的绑定放回队列，下次获取上下文时重试
                let mut queue = self.inner.pending_eager.lock();
                let mut requeued = pending[index..].to_vec();
                requeued.append(&mut queue);
                *queue = requeued;
                drop(queue);
                // 已强制成功的单例保留它们登记的回调
                return ctx.finish(Err(err));
            }
            self.inner.stats.record(StatEvent::EagerForced);
        }
        // 急切绑定登记的回调，以及之前失败的解析留下的回调
        ctx.finish(Ok(()))
    }

    fn table<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<BindingTable<T>>> {
        let erased = self
            .inner
            .tables
            .get(&TypeId::of::<T>())
            .map(|entry| entry.value().clone())?;
        erased.into_any().downcast::<BindingTable<T>>().ok()
    }

    fn table_or_insert<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Arc<BindingTable<T>>> {
        let erased = self
            .inner
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(BindingTable::<T>::new()) as Arc<dyn AnyBindingTable>)
            .value()
            .clone();
        erased.into_any().downcast::<BindingTable<T>>().map_err(|_| {
            LocatorError::BindingIssue(format!(
                "Binding table type mismatch for <{}>",
                std::any::type_name::<T>()
            ))
        })
    }

    /// 沿作用域链查找绑定：先本容器，再逐级父容器
    fn find_binding<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<Binding<T>>> {
        let mut scope = Some(self);
        while let Some(container) = scope {
            if let Some(binding) = container.table::<T>().and_then(|table| table.lookup(name)) {
                return Some(binding);
            }
            scope = container.parent();
        }
        None
    }

    /// 解析入口：找到绑定则在给定帧上执行访问器，找不到返回 `None`
    pub(crate) fn resolve_in<T: ?Sized + Send + Sync + 'static>(
        &self,
        frame: &Context<'_>,
    ) -> LocatorResult<Option<Arc<T>>> {
        self.inner.stats.record(StatEvent::Resolution);
        match self.find_binding::<T>(frame.name()) {
            Some(binding) => binding.get(frame).map(Some),
            None => Ok(None),
        }
    }

    /// 收集作用域链上某能力类型的全部绑定，本作用域在前
    pub(crate) fn visit_all<T: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<Binding<T>>> {
        let mut all = Vec::new();
        let mut scope = Some(self);
        while let Some(container) = scope {
            if let Some(table) = container.table::<T>() {
                all.extend(table.all());
            }
            scope = container.parent();
        }
        all
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::create()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("level", &self.inner.level)
            .field("tables", &self.inner.tables.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Port(u16);

    #[test]
    fn test_bind_and_resolve() {
        let container = Container::create();
        container.bind::<Port>().unwrap().to_instance(Arc::new(Port(8080)));

        let port = container.resolve::<Port>().unwrap();
        assert_eq!(port.0, 8080);
        assert!(container.can_resolve::<Port>());
        assert!(!container.can_resolve_named::<Port>("admin"));
    }

    #[test]
    fn test_child_scope_inherits_config_and_level() {
        let config = LocatorConfig {
            max_depth: 8,
            ..LocatorConfig::default()
        };
        let root = Container::with_config(config.clone());
        let child = root.enter_child_scope();
        let grandchild = child.enter_child_scope();

        assert_eq!(grandchild.config(), &config);
        assert_eq!(grandchild.level(), 2);
        assert_eq!(grandchild.parent().map(|p| p.id()), Some(child.id()));
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_bound_keys_are_own_scope_and_sorted() {
        let root = Container::create();
        root.bind_named::<String>("b").unwrap().to_instance(Arc::new("b".to_string()));
        root.bind_named::<String>("a").unwrap().to_instance(Arc::new("a".to_string()));
        let child = root.enter_child_scope();
        child.bind::<Port>().unwrap().to_instance(Arc::new(Port(1)));

        let names: Vec<String> = root.bound_keys().iter().map(|k| k.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(child.bound_keys(), vec![BindingKey::of::<Port>("")]);
        assert_eq!(root.stats().registered_bindings, 2);
    }

    #[test]
    fn test_failed_eager_binding_is_requeued() {
        let container = Container::create();
        container
            .bind::<Port>()
            .unwrap()
            .to_self(|ctx| {
                let base = ctx.resolve::<u16>()?;
                Ok(Port(*base))
            })
            .as_singleton()
            .eagerly();

        assert!(container.context().is_err());
        assert_eq!(container.pending_eager_count(), 1);

        container.bind::<u16>().unwrap().to_instance(Arc::new(9000));
        assert!(container.context().is_ok());
        assert_eq!(container.pending_eager_count(), 0);
        assert_eq!(container.resolve::<Port>().unwrap().0, 9000);
    }

    #[test]
    fn test_stats_disabled_by_config() {
        let container = Container::with_config(LocatorConfig {
            collect_stats: false,
            ..LocatorConfig::default()
        });
        container.bind::<Port>().unwrap().to_instance(Arc::new(Port(1)));
        container.resolve::<Port>().unwrap();

        let stats = container.stats();
        assert_eq!(stats.total_resolutions, 0);
        assert_eq!(stats.instance_hits, 0);
        assert_eq!(stats.registered_bindings, 1);
    }

    #[test]
    fn test_container_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Container>();
    }
}
