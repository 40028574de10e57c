//! 绑定声明子句
//!
//! `bind::<T>()` 返回 [`BindingBuilder`]，选择构造方式后得到 [`AsClause`]
//! 选择生命周期，单例还可以通过 [`EagerClause::eagerly`] 标记为急切创建：
//!
//! ```ignore
//! container.bind::<dyn Animal>()?.to::<Cow, _>(|_| Ok(Arc::new(Cow)))
//!     .as_singleton()
//!     .eagerly();
//! ```
//!
//! 只调用 `to*` 而不选择生命周期时按瞬态处理。

use super::binding::{Binding, FactoryFn};
use super::context::Context;
use super::{Container, Lifecycle};
use crate::errors::LocatorResult;
use std::sync::Arc;

pub struct BindingBuilder<T: ?Sized> {
    binding: Arc<Binding<T>>,
    container: Container,
}

impl<T: ?Sized + Send + Sync + 'static> BindingBuilder<T> {
    pub(crate) fn new(binding: Arc<Binding<T>>, container: Container) -> Self {
        Self { binding, container }
    }

    /// 绑定到预先创建的实例，从不执行工厂
    ///
    /// 宿主自己也持有的值直接传入它的 `Arc` 克隆即可，容器只释放自己那一份。
    pub fn to_instance(self, instance: Arc<T>) {
        self.binding.set_instance(instance);
    }

    /// 由工厂直接构造 `T` 本身
    pub fn to_self<F>(self, factory: F) -> AsClause<T>
    where
        T: Sized,
        F: Fn(&Context<'_>) -> LocatorResult<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn<T> = Arc::new(move |ctx: &Context<'_>| -> LocatorResult<Arc<T>> {
            ctx.set_concrete_type::<T>()?;
            Ok(Arc::new(factory(ctx)?))
        });
        self.with_factory(factory, Lifecycle::Transient)
    }

    /// 由工厂构造具体类型 `I`，以能力 `T` 交付
    pub fn to<I, F>(self, factory: F) -> AsClause<T>
    where
        I: ?Sized + 'static,
        F: Fn(&Context<'_>) -> LocatorResult<Arc<T>> + Send + Sync + 'static,
    {
        let factory: FactoryFn<T> = Arc::new(move |ctx: &Context<'_>| -> LocatorResult<Arc<T>> {
            ctx.set_concrete_type::<I>()?;
            factory(ctx)
        });
        self.with_factory(factory, Lifecycle::Transient)
    }

    /// 转发到同一能力的另一个名称
    pub fn alias_self(self, name: &str) -> AsClause<T> {
        let target = name.to_string();
        let factory: FactoryFn<T> = Arc::new(move |ctx: &Context<'_>| -> LocatorResult<Arc<T>> {
            ctx.resolve_named::<T>(&target)
        });
        self.with_factory(factory, Lifecycle::Alias)
    }

    /// 转发到另一能力的同名绑定
    pub fn alias<U, C>(self, convert: C) -> AsClause<T>
    where
        U: ?Sized + Send + Sync + 'static,
        C: Fn(Arc<U>) -> Arc<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn<T> = Arc::new(move |ctx: &Context<'_>| -> LocatorResult<Arc<T>> {
            let target = ctx.resolve_named::<U>(ctx.name())?;
            Ok(convert(target))
        });
        self.with_factory(factory, Lifecycle::Alias)
    }

    /// 转发到另一能力的指定名称
    pub fn alias_named<U, C>(self, name: &str, convert: C) -> AsClause<T>
    where
        U: ?Sized + Send + Sync + 'static,
        C: Fn(Arc<U>) -> Arc<T> + Send + Sync + 'static,
    {
        let target = name.to_string();
        let factory: FactoryFn<T> = Arc::new(move |ctx: &Context<'_>| -> LocatorResult<Arc<T>> {
            let resolved = ctx.resolve_named::<U>(&target)?;
            Ok(convert(resolved))
        });
        self.with_factory(factory, Lifecycle::Alias)
    }

    fn with_factory(self, factory: FactoryFn<T>, lifecycle: Lifecycle) -> AsClause<T> {
        self.binding.set_factory(factory, lifecycle);
        AsClause {
            binding: self.binding,
            container: self.container,
        }
    }
}

pub struct AsClause<T: ?Sized> {
    binding: Arc<Binding<T>>,
    container: Container,
}

impl<T: ?Sized + Send + Sync + 'static> AsClause<T> {
    /// 首次解析时创建并缓存
    pub fn as_singleton(self) -> EagerClause<T> {
        self.binding.set_lifecycle(Lifecycle::Singleton);
        EagerClause {
            binding: self.binding,
            container: self.container,
        }
    }

    /// 每次解析都重新创建；别名保持逐次转发
    pub fn as_transient(self) {
        if self.binding.lifecycle() != Some(Lifecycle::Alias) {
            self.binding.set_lifecycle(Lifecycle::Transient);
        }
    }
}

pub struct EagerClause<T: ?Sized> {
    binding: Arc<Binding<T>>,
    container: Container,
}

impl<T: ?Sized + Send + Sync + 'static> EagerClause<T> {
    /// 在容器第一次交出上下文时强制创建
    pub fn eagerly(self) {
        if self.binding.is_eager() {
            return;
        }
        self.binding.mark_eager();
        self.container.enqueue_eager(self.binding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LocatorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Animal: Send + Sync {
        fn noise(&self) -> &'static str;
    }

    struct Cow;

    impl Animal for Cow {
        fn noise(&self) -> &'static str {
            "moo"
        }
    }

    #[test]
    fn test_unfinished_binding_reports_issue() {
        let container = Container::create();
        let _ = container.bind::<dyn Animal>().unwrap();

        let err = container.resolve::<dyn Animal>().err().unwrap();
        assert!(matches!(err, LocatorError::BindingIssue(_)));
    }

    #[test]
    fn test_to_without_lifecycle_is_transient() {
        let container = Container::create();
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        container.bind::<dyn Animal>().unwrap().to::<Cow, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Cow))
        });

        let first = container.resolve::<dyn Animal>().unwrap();
        let second = container.resolve::<dyn Animal>().unwrap();
        assert_eq!(first.noise(), "moo");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_eagerly_enqueues_once() {
        let container = Container::create();
        container
            .bind::<dyn Animal>()
            .unwrap()
            .to::<Cow, _>(|_| Ok(Arc::new(Cow)))
            .as_singleton()
            .eagerly();
        assert_eq!(container.pending_eager_count(), 1);

        container.context().unwrap();
        assert_eq!(container.pending_eager_count(), 0);
        assert_eq!(container.stats().eager_bindings_forced, 1);
    }

    #[test]
    fn test_alias_as_transient_keeps_forwarding() {
        let container = Container::create();
        container
            .bind_named::<String>("real")
            .unwrap()
            .to_self(|_| Ok("value".to_string()))
            .as_singleton();
        container.bind::<String>().unwrap().alias_self("real").as_transient();

        let via_alias = container.resolve::<String>().unwrap();
        let direct = container.resolve_named::<String>("real").unwrap();
        assert!(Arc::ptr_eq(&via_alias, &direct));
        assert_eq!(container.stats().alias_forwards, 1);
    }
}
