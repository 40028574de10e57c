//! 能力标识：能力类型 + 可选名称

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 绑定表的键，也是循环检测时比较的对象
///
/// 相等性只看 `TypeId` 和名称，`type_name` 仅用于诊断输出。
#[derive(Clone)]
pub struct BindingKey {
    type_id: TypeId,
    type_name: &'static str,
    name: String,
}

impl BindingKey {
    pub fn of<T: ?Sized + 'static>(name: &str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: name.to_string(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 空名称表示默认绑定
    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }
}

impl PartialEq for BindingKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for BindingKey {}

impl Hash for BindingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>({})", self.type_name, self.name)
    }
}

impl fmt::Debug for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingKey")
            .field("type", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}
