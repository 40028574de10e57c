//! 单个能力标识的构造策略

use super::context::Context;
use super::key::BindingKey;
use super::stats::{InnerStats, StatEvent};
use super::Lifecycle;
use crate::errors::{LocatorError, LocatorResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// 类型化工厂：给定解析上下文，产出一个实例
pub(crate) type FactoryFn<T> =
    Arc<dyn Fn(&Context<'_>) -> LocatorResult<Arc<T>> + Send + Sync>;

struct BindingState<T: ?Sized> {
    lifecycle: Option<Lifecycle>,
    factory: Option<FactoryFn<T>>,
    /// 单例缓存或实例绑定的值，由绑定独占持有
    cached: Option<Arc<T>>,
    eager: bool,
}

pub(crate) struct Binding<T: ?Sized> {
    key: BindingKey,
    state: RwLock<BindingState<T>>,
    stats: Arc<InnerStats>,
}

impl<T: ?Sized + Send + Sync + 'static> Binding<T> {
    pub(crate) fn new(key: BindingKey, stats: Arc<InnerStats>) -> Self {
        Self {
            key,
            state: RwLock::new(BindingState {
                lifecycle: None,
                factory: None,
                cached: None,
                eager: false,
            }),
            stats,
        }
    }

    pub(crate) fn key(&self) -> &BindingKey {
        &self.key
    }

    pub(crate) fn lifecycle(&self) -> Option<Lifecycle> {
        self.state.read().lifecycle
    }

    pub(crate) fn is_eager(&self) -> bool {
        self.state.read().eager
    }

    pub(crate) fn set_instance(&self, instance: Arc<T>) {
        let mut state = self.state.write();
        state.lifecycle = Some(Lifecycle::Instance);
        state.factory = None;
        state.cached = Some(instance);
    }

    pub(crate) fn set_factory(&self, factory: FactoryFn<T>, lifecycle: Lifecycle) {
        let mut state = self.state.write();
        state.lifecycle = Some(lifecycle);
        state.factory = Some(factory);
        state.cached = None;
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.state.write().lifecycle = Some(lifecycle);
    }

    pub(crate) fn mark_eager(&self) {
        self.state.write().eager = true;
    }

    /// 访问器：按生命周期返回实例
    ///
    /// 执行工厂期间不持有任何锁，工厂可以自由地再次进入容器。
    pub(crate) fn get(&self, ctx: &Context<'_>) -> LocatorResult<Arc<T>> {
        let (lifecycle, factory) = {
            let state = self.state.read();
            match state.lifecycle {
                None => {
                    tracing::warn!("Binding {} has no construction strategy", self.key);
                    return Err(LocatorError::BindingIssue(format!(
                        "No construction strategy selected for {}",
                        self.key
                    )));
                }
                Some(Lifecycle::Instance) => {
                    self.stats.record(StatEvent::InstanceHit);
                    return state.cached.clone().ok_or_else(|| {
                        LocatorError::BindingIssue(format!("Instance binding {} holds no value", self.key))
                    });
                }
                Some(Lifecycle::Singleton) => {
                    if let Some(cached) = &state.cached {
                        self.stats.record(StatEvent::SingletonHit);
                        return Ok(cached.clone());
                    }
                }
                Some(Lifecycle::Transient) | Some(Lifecycle::Alias) => {}
            }
            let lifecycle = state.lifecycle.unwrap_or(Lifecycle::Transient);
            (lifecycle, state.factory.clone())
        };

        let factory = factory.ok_or_else(|| {
            LocatorError::BindingIssue(format!("Binding {} has no factory", self.key))
        })?;

        match lifecycle {
            Lifecycle::Singleton => {
                self.stats.record(StatEvent::SingletonMiss);
                let created = Self::create(&factory, ctx)?;
                let mut state = self.state.write();
                // 并发首次解析时以先写入的实例为准
                Ok(state.cached.get_or_insert(created).clone())
            }
            Lifecycle::Alias => {
                self.stats.record(StatEvent::AliasForward);
                Self::create(&factory, ctx)
            }
            _ => {
                self.stats.record(StatEvent::TransientCreation);
                Self::create(&factory, ctx)
            }
        }
    }

    /// 执行工厂；失败时撤销该工厂自己登记的延迟回调
    fn create(factory: &FactoryFn<T>, ctx: &Context<'_>) -> LocatorResult<Arc<T>> {
        let mark = ctx.pending_after_resolve();
        let created = factory(ctx);
        if created.is_err() {
            ctx.discard_after_resolve_since(mark);
        }
        created
    }
}

/// 急切绑定的类型擦除接口
pub(crate) trait EagerBinding: Send + Sync {
    fn key(&self) -> &BindingKey;

    /// 通过一个合成帧强制执行访问器，丢弃结果
    fn force(&self, ctx: &Context<'_>) -> LocatorResult<()>;
}

impl<T: ?Sized + Send + Sync + 'static> EagerBinding for Binding<T> {
    fn key(&self) -> &BindingKey {
        &self.key
    }

    fn force(&self, ctx: &Context<'_>) -> LocatorResult<()> {
        let frame = ctx.enter_frame(self.key.clone());
        self.get(&frame).map(|_| ())
    }
}
