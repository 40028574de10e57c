//! 配置、模块与 Provider 的端到端测试

use service_locator::{
    ConfigLoader, Container, LocatorError, LocatorResult, Module, Provider,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("service_locator=trace"))
        .with_test_writer()
        .try_init();
}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English {
    name: Arc<String>,
}

impl Greeter for English {
    fn greet(&self) -> String {
        format!("Hello, {}", self.name)
    }
}

struct GreetingModule;

impl Module for GreetingModule {
    fn name(&self) -> &str {
        "greeting"
    }

    fn load(&self, binder: &Container) -> LocatorResult<()> {
        binder
            .bind::<dyn Greeter>()?
            .to::<English, _>(|ctx| Ok(Arc::new(English { name: ctx.resolve::<String>()? })))
            .as_singleton();
        Ok(())
    }
}

struct NameModule(&'static str);

impl Module for NameModule {
    fn load(&self, binder: &Container) -> LocatorResult<()> {
        binder.bind::<String>()?.to_instance(Arc::new(self.0.to_string()));
        Ok(())
    }
}

/// 持有 Provider 的服务，在需要时才解析依赖
struct Mailer {
    greeter: Provider<dyn Greeter>,
}

#[test]
fn test_container_from_config_file() -> anyhow::Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("locator.toml");
    fs::write(&config_path, "max_depth = 2\ntrace_resolutions = true\n")?;

    let config = ConfigLoader::with_path(&config_path).without_env().load_config()?;
    assert_eq!(config.max_depth, 2);
    assert!(config.trace_resolutions);

    let container = Container::with_config(config);
    container.modules().add(GreetingModule)?.add(NameModule("world"))?;

    assert_eq!(container.resolve::<dyn Greeter>()?.greet(), "Hello, world");

    // 子作用域继承深度限制
    let child = container.enter_child_scope();
    assert_eq!(child.config().max_depth, 2);
    Ok(())
}

#[test]
fn test_depth_limit_from_config_blocks_deep_chain() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("locator.toml");
    fs::write(&config_path, "max_depth = 1\n")?;

    let config = ConfigLoader::with_path(&config_path).without_env().load_config()?;
    let container = Container::with_config(config);
    container.modules().add(GreetingModule)?.add(NameModule("world"))?;

    let err = container.resolve::<dyn Greeter>().err().unwrap();
    assert!(matches!(err, LocatorError::DepthExceeded { .. }));
    Ok(())
}

#[test]
fn test_child_module_overrides_parent_dependency() -> anyhow::Result<()> {
    let root = Container::create();
    root.modules().add(GreetingModule)?.add(NameModule("root"))?;

    let child = root.enter_child_scope();
    child.modules().add(GreetingModule)?.add(NameModule("child"))?;

    assert_eq!(root.resolve::<dyn Greeter>()?.greet(), "Hello, root");
    assert_eq!(child.resolve::<dyn Greeter>()?.greet(), "Hello, child");
    assert_eq!(child.bound_keys().len(), 2);
    Ok(())
}

#[test]
fn test_provider_defers_resolution() -> anyhow::Result<()> {
    let container = Container::create();
    container
        .bind::<Mailer>()?
        .to_self(|ctx| Ok(Mailer { greeter: ctx.provider::<dyn Greeter>()? }))
        .as_singleton();

    // 依赖尚未绑定时 Mailer 仍可创建
    let mailer = container.resolve::<Mailer>()?;
    assert!(mailer.greeter.try_get()?.is_none());

    container.modules().add(GreetingModule)?.add(NameModule("later"))?;
    assert_eq!(mailer.greeter.get()?.greet(), "Hello, later");
    Ok(())
}

#[test]
fn test_provider_reports_released_scope() {
    let container = Container::create();
    let child = container.enter_child_scope();
    let provider = child.context().unwrap().provider::<String>().unwrap();
    let context = child.context().unwrap();
    drop(child);

    // Provider 持有容器，上下文只持有弱引用
    assert!(provider.try_get().unwrap().is_none());
    drop(provider);
    assert!(matches!(
        context.resolve::<String>(),
        Err(LocatorError::ScopeReleased)
    ));
}

#[test]
fn test_stats_summary_after_workload() -> anyhow::Result<()> {
    let container = Container::create();
    container.modules().add(GreetingModule)?.add(NameModule("stats"))?;

    for _ in 0..4 {
        container.resolve::<dyn Greeter>()?;
    }

    let stats = container.stats();
    assert_eq!(stats.registered_bindings, 2);
    assert_eq!(stats.singleton_cache_misses, 1);
    assert_eq!(stats.singleton_cache_hits, 3);
    assert_eq!(stats.cache_hit_rate(), 75.0);
    assert!(stats.performance_summary().contains("75.0% cache hit rate"));

    container.reset_stats();
    assert_eq!(container.stats().total_resolutions, 0);
    assert_eq!(container.stats().registered_bindings, 2);
    Ok(())
}
