//! 容器统计信息

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// 统计事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatEvent {
    Resolution,
    SingletonHit,
    SingletonMiss,
    TransientCreation,
    InstanceHit,
    AliasForward,
    EagerForced,
    DeferredRun,
}

/// 内部容器统计信息（原子计数器）
#[derive(Default)]
pub(crate) struct InnerStats {
    enabled: bool,
    total_resolutions: AtomicU64,
    singleton_cache_hits: AtomicU64,
    singleton_cache_misses: AtomicU64,
    transient_creations: AtomicU64,
    instance_hits: AtomicU64,
    alias_forwards: AtomicU64,
    eager_bindings_forced: AtomicU64,
    deferred_callbacks_run: AtomicU64,
    registered_bindings: AtomicUsize,
}

impl InnerStats {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub(crate) fn record(&self, event: StatEvent) {
        if !self.enabled {
            return;
        }
        let counter = match event {
            StatEvent::Resolution => &self.total_resolutions,
            StatEvent::SingletonHit => &self.singleton_cache_hits,
            StatEvent::SingletonMiss => &self.singleton_cache_misses,
            StatEvent::TransientCreation => &self.transient_creations,
            StatEvent::InstanceHit => &self.instance_hits,
            StatEvent::AliasForward => &self.alias_forwards,
            StatEvent::EagerForced => &self.eager_bindings_forced,
            StatEvent::DeferredRun => &self.deferred_callbacks_run,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 绑定数量不受开关影响，它是容器状态而不是计数
    pub(crate) fn binding_registered(&self) {
        self.registered_bindings.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.total_resolutions.load(Ordering::Relaxed),
            singleton_cache_hits: self.singleton_cache_hits.load(Ordering::Relaxed),
            singleton_cache_misses: self.singleton_cache_misses.load(Ordering::Relaxed),
            transient_creations: self.transient_creations.load(Ordering::Relaxed),
            instance_hits: self.instance_hits.load(Ordering::Relaxed),
            alias_forwards: self.alias_forwards.load(Ordering::Relaxed),
            eager_bindings_forced: self.eager_bindings_forced.load(Ordering::Relaxed),
            deferred_callbacks_run: self.deferred_callbacks_run.load(Ordering::Relaxed),
            registered_bindings: self.registered_bindings.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.total_resolutions,
            &self.singleton_cache_hits,
            &self.singleton_cache_misses,
            &self.transient_creations,
            &self.instance_hits,
            &self.alias_forwards,
            &self.eager_bindings_forced,
            &self.deferred_callbacks_run,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 容器统计信息快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 向本容器发起的解析次数
    pub total_resolutions: u64,
    /// 单例缓存命中次数
    pub singleton_cache_hits: u64,
    /// 单例缓存未命中次数（即单例工厂执行次数）
    pub singleton_cache_misses: u64,
    /// 瞬态服务创建次数
    pub transient_creations: u64,
    /// 实例绑定命中次数
    pub instance_hits: u64,
    /// 别名转发次数
    pub alias_forwards: u64,
    /// 被强制创建的急切绑定数量
    pub eager_bindings_forced: u64,
    /// 已执行的延迟回调数量
    pub deferred_callbacks_run: u64,
    /// 本容器自身的绑定数量
    pub registered_bindings: usize,
}

impl ContainerStats {
    /// 获取缓存命中率（百分比）
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.singleton_cache_hits + self.singleton_cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.singleton_cache_hits as f64 / total as f64) * 100.0
        }
    }

    /// 获取性能指标摘要
    pub fn performance_summary(&self) -> String {
        format!(
            "Container Performance: {} total resolutions, {:.1}% cache hit rate, {} registered bindings, {} deferred callbacks",
            self.total_resolutions,
            self.cache_hit_rate(),
            self.registered_bindings,
            self.deferred_callbacks_run
        )
    }
}
