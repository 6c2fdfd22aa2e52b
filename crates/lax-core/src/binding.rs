//! # 上下文绑定（Context Binding）
//!
//! ## 核心意图（Why）
//! - 行为对象只有一个：[`LaxCore`] 在进程内惰性创建并按引用共享，本身不持有上下文；
//! - 每个调用上下文通过 [`LaxCore::attach`] 得到一个 [`Lax`]，其中只保存上下文相关字段，
//!   API 表面无需为每个上下文重新分配。
//!
//! ## 使用方式（How）
//! ```
//! use std::rc::Rc;
//! use lax_core::test_stubs::ScriptedContext;
//!
//! let context = ScriptedContext::new().with_operation("c.getContacts");
//! let lax = lax_core::attach(Rc::new(context.clone()));
//! let contacts = lax.enqueue("c.getContacts");
//! assert_eq!(context.inflight(), 1);
//! # drop(contacts);
//! ```

use std::{rc::Rc, sync::OnceLock};

use serde_json::Value;

use crate::{
    action::{ActionBuilder, ActionRequest},
    bridge,
    configuration::LaxSettings,
    error::{ActionError, ErrorKind, ErrorRegistry, LaxError},
    future::{LaxPromise, Marshal},
    host::ActionContext,
    record::RecordServiceAdapter,
    router,
};

static CORE: OnceLock<LaxCore> = OnceLock::new();

/// 进程级共享的行为对象。
#[derive(Debug)]
pub struct LaxCore {
    registry: &'static ErrorRegistry,
}

impl LaxCore {
    /// 获取共享实例，首次访问时创建。
    pub fn shared() -> &'static LaxCore {
        CORE.get_or_init(|| LaxCore {
            registry: ErrorRegistry::global(),
        })
    }

    /// 以默认配置绑定上下文。
    pub fn attach(&'static self, context: Rc<dyn ActionContext>) -> Lax {
        self.attach_with(context, LaxSettings::default())
    }

    /// 以给定配置绑定上下文。
    pub fn attach_with(&'static self, context: Rc<dyn ActionContext>, settings: LaxSettings) -> Lax {
        Lax {
            core: self,
            marshal: Marshal::new(context.clone()),
            context,
            settings: Rc::new(settings),
        }
    }

    /// 错误种类注册表。
    pub fn errors(&self) -> &'static ErrorRegistry {
        self.registry
    }

    /// 登记自定义错误种类，返回被替换的同名旧描述符。
    pub fn register_error(&self, kind: ErrorKind) -> Option<ErrorKind> {
        self.registry.register(kind)
    }
}

/// 以默认配置将共享核心绑定到 `context`。
pub fn attach(context: Rc<dyn ActionContext>) -> Lax {
    LaxCore::shared().attach(context)
}

/// 以给定配置将共享核心绑定到 `context`。
pub fn attach_with(context: Rc<dyn ActionContext>, settings: LaxSettings) -> Lax {
    LaxCore::shared().attach_with(context, settings)
}

/// 绑定到某个调用上下文的 API。
///
/// # 契约说明（What）
/// - 克隆只复制引用，所有克隆共享同一上下文与配置；
/// - 返回 Future 的入口从不同步失败：配置阶段的错误以宿主契约种类的拒绝交付。
#[derive(Clone)]
pub struct Lax {
    core: &'static LaxCore,
    context: Rc<dyn ActionContext>,
    marshal: Marshal,
    settings: Rc<LaxSettings>,
}

impl Lax {
    /// 共享核心。
    pub fn core(&self) -> &'static LaxCore {
        self.core
    }

    /// 绑定的上下文。
    pub fn context(&self) -> &Rc<dyn ActionContext> {
        &self.context
    }

    /// 绑定配置。
    pub fn settings(&self) -> &LaxSettings {
        &self.settings
    }

    /// 执行包装句柄。
    pub fn marshal(&self) -> &Marshal {
        &self.marshal
    }

    /// 错误种类注册表，可按名称查找种类。
    pub fn errors(&self) -> &'static ErrorRegistry {
        self.core.errors()
    }

    /// 登记自定义错误种类。
    pub fn register_error(&self, kind: ErrorKind) -> Option<ErrorKind> {
        self.core.register_error(kind)
    }

    /// 以无参数、无标志的方式提交远程操作。
    pub fn enqueue(&self, name: impl Into<String>) -> LaxPromise<Value> {
        self.enqueue_with(ActionRequest::new(name))
    }

    /// 提交远程操作并返回其结果 Future。
    ///
    /// # 执行步骤（How）
    /// 1. 通过上下文解析操作句柄，未知名称直接返回已拒绝的 Future；
    /// 2. 写入参数与标志（含绑定默认标志）后立即提交，提交本身不阻塞；
    /// 3. 回调结果经 [`router::route_with_fallback`] 分类。
    pub fn enqueue_with(&self, request: ActionRequest) -> LaxPromise<Value> {
        let Some(mut handle) = self.context.resolve_operation(&request.name) else {
            tracing::warn!(operation = %request.name, "operation is not exposed by the context");
            return self.reject(LaxError::UnknownOperation { name: request.name }.into());
        };
        request.configure(handle.as_mut(), self.settings.default_options);

        let (callback, settled) = bridge::completion(
            self.context.clone(),
            self.settings.guard_context_validity,
            request.name.as_str(),
        );
        tracing::debug!(operation = %request.name, "submitting action");
        handle.submit(callback);

        let fallback = self.settings.fallback_message.clone();
        let operation = request.name;
        LaxPromise::from_future(self.marshal.clone(), async move {
            let response = settled.await?;
            tracing::debug!(operation = %operation, state = %response.state, "routing response");
            router::route_with_fallback(response, &fallback)
        })
    }

    /// 为显式回调路径创建构建器。
    pub fn action(&self, name: &str) -> Result<ActionBuilder, LaxError> {
        let handle = self
            .context
            .resolve_operation(name)
            .ok_or_else(|| LaxError::UnknownOperation {
                name: name.to_owned(),
            })?;
        Ok(ActionBuilder::new(
            name,
            handle,
            self.context.clone(),
            self.marshal.clone(),
            self.settings.clone(),
        ))
    }

    /// 定位记录服务并返回其 Future 适配器。
    pub fn lds(&self, id: &str) -> Result<RecordServiceAdapter, LaxError> {
        let service = self
            .context
            .record_service(id)
            .ok_or_else(|| LaxError::RecordServiceNotFound { id: id.to_owned() })?;
        Ok(RecordServiceAdapter::new(id, service, self.clone()))
    }

    /// 以给定值兑现的 Future。
    pub fn resolve<T: 'static>(&self, value: T) -> LaxPromise<T> {
        LaxPromise::resolved(self.marshal.clone(), value)
    }

    /// 以给定错误拒绝的 Future。
    pub fn reject<T: 'static>(&self, error: ActionError) -> LaxPromise<T> {
        LaxPromise::rejected(self.marshal.clone(), error)
    }
}

impl std::fmt::Debug for Lax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lax")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_stubs::ScriptedContext;

    #[test]
    fn every_binding_shares_one_core() {
        let first = attach(Rc::new(ScriptedContext::new()));
        let second = attach(Rc::new(ScriptedContext::new()));
        assert!(std::ptr::eq(first.core(), second.core()));
        assert!(std::ptr::eq(first.errors(), ErrorRegistry::global()));
    }

    #[test]
    fn bindings_keep_their_own_context() {
        let left = ScriptedContext::new().with_operation("c.left");
        let right = ScriptedContext::new().with_operation("c.right");
        let lax_left = attach(Rc::new(left.clone()));
        let lax_right = attach(Rc::new(right.clone()));

        let _pending_left = lax_left.enqueue("c.left");
        let _pending_right = lax_right.enqueue("c.right");
        assert_eq!(left.submitted_names(), vec!["c.left".to_owned()]);
        assert_eq!(right.submitted_names(), vec!["c.right".to_owned()]);
    }

    #[test]
    fn unknown_builder_operation_fails_synchronously() {
        let lax = attach(Rc::new(ScriptedContext::new()));
        assert!(matches!(
            lax.action("c.missing"),
            Err(LaxError::UnknownOperation { .. })
        ));
        assert!(matches!(
            lax.lds("recordHandler"),
            Err(LaxError::RecordServiceNotFound { .. })
        ));
    }
}
