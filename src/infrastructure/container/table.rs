//! 按能力类型划分的绑定表

use super::binding::Binding;
use super::key::BindingKey;
use super::stats::InnerStats;
use crate::errors::{LocatorError, LocatorResult};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 单个能力类型的绑定表：名称 -> 绑定
///
/// 使用有序映射，多绑定解析按名称字典序返回。
pub(crate) struct BindingTable<T: ?Sized> {
    bindings: RwLock<BTreeMap<String, Arc<Binding<T>>>>,
}

impl<T: ?Sized + Send + Sync + 'static> BindingTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            bindings: RwLock::new(BTreeMap::new()),
        }
    }

    /// 在本表中登记新绑定；同名已存在时报 DuplicateBinding
    pub(crate) fn register(
        &self,
        key: BindingKey,
        stats: Arc<InnerStats>,
    ) -> LocatorResult<Arc<Binding<T>>> {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(key.name()) {
            return Err(LocatorError::DuplicateBinding {
                type_name: key.type_name().to_string(),
                name: key.name().to_string(),
            });
        }
        let name = key.name().to_string();
        let binding = Arc::new(Binding::new(key, stats));
        bindings.insert(name, binding.clone());
        Ok(binding)
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<Binding<T>>> {
        self.bindings.read().get(name).cloned()
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    pub(crate) fn all(&self) -> Vec<Arc<Binding<T>>> {
        self.bindings.read().values().cloned().collect()
    }
}

/// 类型擦除的绑定表，容器按 `TypeId` 存放
pub(crate) trait AnyBindingTable: Send + Sync {
    fn keys(&self) -> Vec<BindingKey>;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: ?Sized + Send + Sync + 'static> AnyBindingTable for BindingTable<T> {
    fn keys(&self) -> Vec<BindingKey> {
        self.bindings
            .read()
            .values()
            .map(|binding| binding.key().clone())
            .collect()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
