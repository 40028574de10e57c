//! 模块抽象层
//!
//! 模块把一组相关绑定打包在一起，加载模块只是对 `bind` 的集中调用。

use super::container::Container;
use crate::errors::{LocatorError, LocatorResult};

/// 模块接口
pub trait Module {
    /// 模块名称，默认取类型名
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 把模块的绑定声明到容器中
    fn load(&self, binder: &Container) -> LocatorResult<()>;
}

/// 链式加载模块：`container.modules().add(FoodModule)?.add(AnimalModule)?`
pub struct ModuleLoader<'c> {
    container: &'c Container,
}

impl<'c> ModuleLoader<'c> {
    pub(crate) fn new(container: &'c Container) -> Self {
        Self { container }
    }

    pub fn add<M: Module>(&self, module: M) -> LocatorResult<&Self> {
        self.add_ref(&module)
    }

    /// 加载借用的模块，失败时包装为 `LocatorError::Module`
    pub fn add_ref<M: Module + ?Sized>(&self, module: &M) -> LocatorResult<&Self> {
        let name = module.name().to_string();
        module.load(self.container).map_err(|source| {
            log::warn!("Module {} failed to load: {}", name, source);
            LocatorError::Module {
                module: name.clone(),
                source: Box::new(source),
            }
        })?;
        log::info!("Loaded module {} into scope {}", name, self.container.id());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct PortModule;

    impl Module for PortModule {
        fn name(&self) -> &str {
            "ports"
        }

        fn load(&self, binder: &Container) -> LocatorResult<()> {
            binder.bind_named::<u16>("http")?.to_instance(Arc::new(80));
            binder.bind_named::<u16>("https")?.to_instance(Arc::new(443));
            Ok(())
        }
    }

    struct HostModule;

    impl Module for HostModule {
        fn load(&self, binder: &Container) -> LocatorResult<()> {
            binder.bind::<String>()?.to_instance(Arc::new("localhost".to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_modules_chain() {
        let container = Container::create();
        container.modules().add(PortModule).unwrap().add(HostModule).unwrap();

        assert_eq!(*container.resolve_named::<u16>("https").unwrap(), 443);
        assert_eq!(container.resolve::<String>().unwrap().as_str(), "localhost");
    }

    #[test]
    fn test_loading_twice_names_the_module() {
        let container = Container::create();
        container.modules().add(PortModule).unwrap();

        let err = container.modules().add(PortModule).err().unwrap();
        match err {
            LocatorError::Module { module, source } => {
                assert_eq!(module, "ports");
                assert!(matches!(*source, LocatorError::DuplicateBinding { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_module_name_is_type_name() {
        assert!(HostModule.name().ends_with("HostModule"));
    }
}
