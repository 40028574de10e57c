//! 解析上下文（解析帧）
//!
//! 每一次 resolve 调用都会创建一个新的帧，帧之间通过父引用串成一条链，
//! 一直回溯到根帧。这条链用于：
//! - 循环解析检测（同一标识在链上出现两次即为循环）
//! - 渲染诊断用的解析路径 `resolve<T>(name) -> resolve<U>(name).to<Impl>`
//! - 登记延迟回调：只有根帧持有回调队列，根帧完成顶层解析后统一执行
//!
//! 帧只存在于调用栈上，持有容器的弱引用，不会延长容器的生命周期。

use super::key::BindingKey;
use super::{Container, ContainerInner};
use crate::infrastructure::provider::Provider;
use crate::errors::{LocatorError, LocatorResult};
use std::cell::{OnceCell, RefCell};
use std::sync::{Arc, Weak};

/// 延迟回调，执行时拿到一个全新的根上下文
pub type AfterResolveFn = Box<dyn FnOnce(&Context<'_>) -> LocatorResult<()> + Send>;

/// 根帧队列中的回调，记录登记它的帧深度
struct Deferred {
    depth: usize,
    callback: AfterResolveFn,
}

pub struct Context<'a> {
    container: Weak<ContainerInner>,
    root: Option<&'a Context<'a>>,
    parent: Option<&'a Context<'a>>,
    key: Option<BindingKey>,
    concrete_type: OnceCell<&'static str>,
    depth: usize,
    deferred: RefCell<Vec<Deferred>>,
}

impl Context<'static> {
    /// 新的根帧，绑定到给定容器
    pub(crate) fn root(container: &Container) -> Self {
        Self {
            container: Arc::downgrade(&container.inner),
            root: None,
            parent: None,
            key: None,
            concrete_type: OnceCell::new(),
            depth: 0,
            deferred: RefCell::new(Vec::new()),
        }
    }
}

impl<'a> Context<'a> {
    /// 在当前帧下创建子帧
    pub(crate) fn enter_frame(&self, key: BindingKey) -> Context<'_> {
        Context {
            container: self.container.clone(),
            root: Some(self.root_frame()),
            parent: Some(self),
            key: Some(key),
            concrete_type: OnceCell::new(),
            depth: self.depth + 1,
            deferred: RefCell::new(Vec::new()),
        }
    }

    fn root_frame(&self) -> &Context<'_> {
        match self.root {
            Some(root) => root,
            None => self,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent(&self) -> Option<&Context<'_>> {
        self.parent
    }

    /// 当前帧请求的能力标识；根帧没有
    pub fn key(&self) -> Option<&BindingKey> {
        self.key.as_ref()
    }

    /// 当前帧请求的名称，根帧为空串
    pub fn name(&self) -> &str {
        self.key.as_ref().map(|key| key.name()).unwrap_or("")
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 获取所属容器；容器已释放时返回 ScopeReleased
    pub fn container(&self) -> LocatorResult<Container> {
        self.container
            .upgrade()
            .map(|inner| Container { inner })
            .ok_or(LocatorError::ScopeReleased)
    }

    /// 记录本帧实际构造的具体类型，每帧只能写一次
    pub fn set_concrete_type<I: ?Sized + 'static>(&self) -> LocatorResult<()> {
        self.concrete_type
            .set(std::any::type_name::<I>())
            .map_err(|_| LocatorError::BindingIssue("Concrete type on Context already set".to_string()))
    }

    pub fn concrete_type_name(&self) -> Option<&'static str> {
        self.concrete_type.get().copied()
    }

    /// 渲染从根到本帧的解析路径
    pub fn resolve_path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(frame) = current {
            if let Some(key) = &frame.key {
                let mut segment = format!("resolve<{}>({})", key.type_name(), key.name());
                if let Some(concrete) = frame.concrete_type.get() {
                    segment.push_str(&format!(".to<{}>", concrete));
                }
                segments.push(segment);
            }
            current = frame.parent;
        }
        segments.reverse();
        segments.join(" -> ")
    }

    /// Resolve an interface, fails if not able to resolve
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Arc<T>> {
        self.resolve_named::<T>("")
    }

    /// Resolve a named interface, fails if not able to resolve
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> LocatorResult<Arc<T>> {
        let result = self.descend::<T>(name).and_then(|found| match found {
            Ok(instance) => Ok(instance),
            Err(path) => Err(LocatorError::UnableToResolve {
                type_name: std::any::type_name::<T>().to_string(),
                path,
            }),
        });
        self.finish(result)
    }

    /// Try to resolve an interface, `None` when nothing is bound
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Option<Arc<T>>> {
        self.try_resolve_named::<T>("")
    }

    /// 与 resolve 相同的循环检测，只把“找不到”变成 `None`
    pub fn try_resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> LocatorResult<Option<Arc<T>>> {
        let result = self.descend::<T>(name).map(Result::ok);
        self.finish(result)
    }

    pub fn can_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<bool> {
        self.can_resolve_named::<T>("")
    }

    /// 仅检查绑定是否存在，不实例化也不做循环检测
    pub fn can_resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> LocatorResult<bool> {
        Ok(self.container()?.can_resolve_named::<T>(name))
    }

    /// 解析作用域链上某能力类型的全部绑定
    ///
    /// 先本作用域再祖先，每一层按名称字典序，每个绑定使用独立的检测帧。
    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Vec<Arc<T>>> {
        let result = (|| -> LocatorResult<Vec<Arc<T>>> {
            let container = self.container()?;
            let mut all = Vec::new();
            for binding in container.visit_all::<T>() {
                let frame = self.enter_frame(binding.key().clone());
                frame.guard(&container)?;
                all.push(binding.get(&frame)?);
            }
            Ok(all)
        })();
        self.finish(result)
    }

    /// 创建一个脱离当前解析链的 Provider
    pub fn provider<T: ?Sized + Send + Sync + 'static>(&self) -> LocatorResult<Provider<T>> {
        Ok(Provider::new(self.container()?))
    }

    /// 登记延迟回调，总是追加到根帧的队列
    pub fn after_resolve<F>(&self, callback: F)
    where
        F: FnOnce(&Context<'_>) -> LocatorResult<()> + Send + 'static,
    {
        self.root_frame().deferred.borrow_mut().push(Deferred {
            depth: self.depth,
            callback: Box::new(callback),
        });
    }

    pub fn pending_after_resolve(&self) -> usize {
        self.root_frame().deferred.borrow().len()
    }

    /// 丢弃本帧（及其祖先帧）在 `mark` 之后登记的回调
    ///
    /// 更深的帧登记的回调属于已经构造成功的依赖，保留。
    pub(crate) fn discard_after_resolve_since(&self, mark: usize) {
        let depth = self.depth;
        let mut index = 0;
        self.root_frame().deferred.borrow_mut().retain(|entry| {
            let keep = index < mark || entry.depth > depth;
            index += 1;
            keep
        });
    }

    /// 进入子帧、检测、委托容器查找
    ///
    /// 外层 `Err` 为真正的失败；内层 `Err` 携带“找不到”时的解析路径。
    fn descend<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> LocatorResult<Result<Arc<T>, String>> {
        let container = self.container()?;
        let frame = self.enter_frame(BindingKey::of::<T>(name));
        frame.guard(&container)?;

        if container.config().trace_resolutions {
            tracing::trace!(scope = %container.id(), "resolving {}", frame.resolve_path());
        }

        match container.resolve_in::<T>(&frame)? {
            Some(instance) => Ok(Ok(instance)),
            None => Ok(Err(frame.resolve_path())),
        }
    }

    /// 深度限制与循环检测
    fn guard(&self, container: &Container) -> LocatorResult<()> {
        if self.depth > container.config().max_depth {
            return Err(LocatorError::DepthExceeded {
                depth: self.depth,
                path: self.resolve_path(),
            });
        }

        let Some(key) = &self.key else {
            return Ok(());
        };
        let mut ancestor = self.parent;
        while let Some(frame) = ancestor {
            if frame.key.as_ref() == Some(key) {
                let path = self.resolve_path();
                tracing::warn!("Recursive resolve detected: {}", path);
                return Err(LocatorError::RecursiveResolve { path });
            }
            ancestor = frame.parent;
        }
        Ok(())
    }

    /// 调用返回前的收尾：只有根帧会执行延迟回调队列
    ///
    /// 失败时回调暂存到容器，由下一次成功的顶层解析执行。
    pub(crate) fn finish<R>(&self, result: LocatorResult<R>) -> LocatorResult<R> {
        if !self.is_root() {
            return result;
        }

        let local: Vec<AfterResolveFn> = std::mem::take(&mut *self.deferred.borrow_mut())
            .into_iter()
            .map(|entry| entry.callback)
            .collect();
        let Ok(container) = self.container() else {
            return result;
        };

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                if !local.is_empty() {
                    tracing::debug!(
                        scope = %container.id(),
                        "Keeping {} after-resolve callbacks until the next successful resolve",
                        local.len()
                    );
                    container.stash_deferred(local);
                }
                return Err(err);
            }
        };

        let pending = container.take_deferred(local);
        if pending.is_empty() {
            return Ok(value);
        }

        tracing::debug!(scope = %container.id(), "Running {} after-resolve callbacks", pending.len());
        let mut pending = pending.into_iter();
        while let Some(callback) = pending.next() {
            let ctx = Context::root(&container);
            // 回调自身解析时登记的回调在它自己的根帧上收尾
            let outcome = callback(&ctx);
            if let Err(err) = ctx.finish(outcome) {
                container.stash_deferred(pending.collect());
                return Err(err);
            }
            container.record_deferred_run();
        }
        Ok(value)
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("path", &self.resolve_path())
            .field("depth", &self.depth)
            .finish()
    }
}
