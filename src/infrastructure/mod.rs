//! 基础设施层
//!
//! 提供具体的技术实现，包括：
//! - 作用域容器与解析上下文
//! - 延迟解析的 Provider
//! - 模块化的绑定声明

// 容器实现
pub mod container;
pub mod module;
pub mod provider;

// 重新导出API
pub use container::{
    AfterResolveFn, AsClause, BindingBuilder, BindingKey, Container, ContainerStats, Context,
    EagerClause, Lifecycle,
};
pub use module::{Module, ModuleLoader};
pub use provider::Provider;
