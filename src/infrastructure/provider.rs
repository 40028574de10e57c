//! 服务提供者
//!
//! Provider 是一个脱离当前解析链的延迟解析句柄：每次 `get` 都从所属容器
//! 的全新根上下文开始，因此不参与调用方的循环检测。

use super::container::Container;
use crate::errors::LocatorResult;
use std::marker::PhantomData;
use std::sync::Arc;

/// 某一能力的提供者
pub struct Provider<T: ?Sized> {
    container: Container,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> {
    pub(crate) fn new(container: Container) -> Self {
        Self {
            container,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> LocatorResult<Arc<T>> {
        self.get_named("")
    }

    pub fn get_named(&self, name: &str) -> LocatorResult<Arc<T>> {
        self.container.context()?.resolve_named::<T>(name)
    }

    pub fn try_get(&self) -> LocatorResult<Option<Arc<T>>> {
        self.try_get_named("")
    }

    pub fn try_get_named(&self, name: &str) -> LocatorResult<Option<Arc<T>>> {
        self.container.context()?.try_resolve_named::<T>(name)
    }
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("service", &std::any::type_name::<T>())
            .field("scope", &self.container.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_resolves_lazily() {
        let container = Container::create();
        let provider = container.provider::<String>();
        assert!(provider.try_get().unwrap().is_none());

        container.bind::<String>().unwrap().to_instance(Arc::new("late".to_string()));
        assert_eq!(provider.get().unwrap().as_str(), "late");
    }

    #[test]
    fn test_provider_inside_factory_starts_fresh_chain() {
        struct Node {
            next: Provider<Node>,
        }

        let container = Container::create();
        container
            .bind::<Node>()
            .unwrap()
            .to_self(|ctx| Ok(Node { next: ctx.provider::<Node>()? }))
            .as_singleton();

        // 工厂内部取得自身的 Provider 不会被判定为循环
        let node = container.resolve::<Node>().unwrap();
        let again = node.next.get().unwrap();
        assert!(Arc::ptr_eq(&node, &again));
    }
}
