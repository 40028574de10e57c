//! 分层服务定位器
//!
//! 绑定声明在作用域容器中，子作用域可以遮蔽父作用域的绑定；解析过程
//! 沿帧链做循环检测，并支持急切绑定和解析完成后的延迟注入。

pub mod config;
pub mod errors;
pub mod infrastructure;

// Re-export commonly used items for convenience
pub use config::{ConfigLoader, LocatorConfig};
pub use errors::{ConfigError, LocatorError, LocatorResult};
pub use infrastructure::{
    AfterResolveFn, AsClause, BindingBuilder, BindingKey, Container, ContainerStats, Context,
    EagerClause, Lifecycle, Module, ModuleLoader, Provider,
};
