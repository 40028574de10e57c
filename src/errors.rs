use thiserror::Error;

/// 服务定位器错误
///
/// 所有失败都会同步返回给调用方，容器内部不做任何重试。
#[derive(Debug, Error)]
pub enum LocatorError {
    /// 同一容器内对同一标识重复绑定
    #[error("Duplicate binding for <{type_name}> named '{name}'")]
    DuplicateBinding { type_name: String, name: String },

    /// 整个作用域链上都找不到绑定
    #[error("Unable to resolve <{type_name}>  resolve path = {path}")]
    UnableToResolve { type_name: String, path: String },

    /// 解析链上出现重复标识
    #[error("Recursive resolve path = {path}")]
    RecursiveResolve { path: String },

    /// 绑定使用问题（一次性字段被重复写入、未选择构造策略等）
    #[error("Binding issue: {0}")]
    BindingIssue(String),

    /// 工厂函数报告的创建失败
    #[error("Failed to create service '{service_type}': {reason}")]
    CreationFailed { service_type: String, reason: String },

    /// 解析深度超过配置上限
    #[error("Resolve depth {depth} exceeds the configured limit, resolve path = {path}")]
    DepthExceeded { depth: usize, path: String },

    /// 上下文或 Provider 所属的容器已经释放
    #[error("The owning container has been released")]
    ScopeReleased,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Module '{module}' failed to load: {source}")]
    Module {
        module: String,
        #[source]
        source: Box<LocatorError>,
    },
}

impl LocatorError {
    /// 把工厂内部的任意错误包装成 `CreationFailed`
    pub fn creation<T: ?Sized>(reason: impl std::fmt::Display) -> Self {
        LocatorError::CreationFailed {
            service_type: std::any::type_name::<T>().to_string(),
            reason: reason.to_string(),
        }
    }

    /// 是否属于“找不到绑定”，try 系列接口只吞掉这一类错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, LocatorError::UnableToResolve { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

pub type LocatorResult<T> = Result<T, LocatorError>;
