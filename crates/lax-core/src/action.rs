//! # 远程操作请求与 ActionBuilder
//!
//! ## 定位（Why）
//! - [`ActionRequest`] 是提交给 Future 路径（`enqueue`/`enqueue_all`）的不可变请求；
//! - [`ActionBuilder`] 服务于必须以“显式回调”形式提交的操作（例如需要标记为可缓存），
//!   它不返回 Future，由 `enqueue` 终结。
//!
//! ## 契约（What）
//! - 构建器方法按值消费并返回 `Self`，`enqueue(self)` 消费构建器：提交后无法再次配置；
//! - `set_then`/`set_catch` 只保留最后一次注册的回调，不做组合；
//! - 回调经由上下文的执行包装运行；回调 panic 只记录日志，不会逃逸到宿主。

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    configuration::LaxSettings,
    error::ActionError,
    future::Marshal,
    host::{ActionContext, OperationHandle},
    router,
};

/// 远程操作参数。
pub type Params = Map<String, Value>;

/// 提交标志。
///
/// 同时接受宿主的 `isBackground`/`isStorable` 写法。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionOptions {
    #[serde(alias = "isBackground")]
    pub background: bool,
    #[serde(alias = "isStorable")]
    pub storable: bool,
}

impl ActionOptions {
    /// 两组标志取并集。
    pub fn union(self, other: ActionOptions) -> ActionOptions {
        ActionOptions {
            background: self.background || other.background,
            storable: self.storable || other.storable,
        }
    }

    /// 将标志写入操作句柄。
    pub(crate) fn apply(self, handle: &mut dyn OperationHandle) {
        if self.background {
            handle.set_background();
        }
        if self.storable {
            handle.set_storable();
        }
    }
}

/// 一次远程操作请求。
///
/// # 契约说明（What）
/// - `name`：上下文可解析的操作标识，例如 `c.getContacts`；
/// - `params`：可选参数；为 `None` 时不调用 `set_params`；
/// - `options`：提交标志，会与绑定配置中的默认标志取并集。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    #[serde(default)]
    pub params: Option<Params>,
    #[serde(default)]
    pub options: ActionOptions,
}

impl ActionRequest {
    /// 只含名称的请求。
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
            options: ActionOptions::default(),
        }
    }

    /// 设置参数。
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// 设置单个参数。
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value);
        self
    }

    /// 设置提交标志。
    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    /// 标记为后台执行。
    pub fn background(mut self) -> Self {
        self.options.background = true;
        self
    }

    /// 标记为可缓存。
    pub fn storable(mut self) -> Self {
        self.options.storable = true;
        self
    }

    /// 将参数与标志写入句柄。
    pub(crate) fn configure(&self, handle: &mut dyn OperationHandle, defaults: ActionOptions) {
        if let Some(params) = &self.params {
            handle.set_params(params.clone());
        }
        self.options.union(defaults).apply(handle);
    }
}

type SuccessCallback = Box<dyn FnOnce(Value)>;
type FailureCallback = Box<dyn FnOnce(ActionError)>;

/// 单次使用的操作构建器。
///
/// # 教案式说明
/// - **意图 (Why)**：某些操作必须以回调形式提交（可缓存、后台），不能走 Future 链；
/// - **契约 (What)**：
///   - 独占一个 [`OperationHandle`]，配置方法直接作用于该句柄；
///   - `enqueue` 挂接唯一的内部回调：路由响应后调用成功或失败回调，不返回任何值；
///   - 上下文失效时（且配置开启守卫），完成结果被静默丢弃；
/// - **风险 (Trade-offs)**：未注册失败回调时，失败只体现在 `debug` 日志中。
#[must_use = "ActionBuilder 只有在调用 enqueue 后才会提交"]
pub struct ActionBuilder {
    name: String,
    handle: Box<dyn OperationHandle>,
    context: Rc<dyn ActionContext>,
    marshal: Marshal,
    settings: Rc<LaxSettings>,
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
}

impl ActionBuilder {
    pub(crate) fn new(
        name: impl Into<String>,
        mut handle: Box<dyn OperationHandle>,
        context: Rc<dyn ActionContext>,
        marshal: Marshal,
        settings: Rc<LaxSettings>,
    ) -> Self {
        settings.default_options.apply(handle.as_mut());
        Self {
            name: name.into(),
            handle,
            context,
            marshal,
            settings,
            on_success: None,
            on_failure: None,
        }
    }

    /// 操作名称。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 设置参数。
    pub fn set_params(mut self, params: Params) -> Self {
        self.handle.set_params(params);
        self
    }

    /// 标记结果可缓存。
    pub fn set_storable(mut self) -> Self {
        self.handle.set_storable();
        self
    }

    /// 标记为后台执行。
    pub fn set_background(mut self) -> Self {
        self.handle.set_background();
        self
    }

    /// 注册成功回调；重复调用时后者覆盖前者。
    pub fn set_then<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Value) + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// 注册失败回调；重复调用时后者覆盖前者。
    pub fn set_catch<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(ActionError) + 'static,
    {
        self.on_failure = Some(Box::new(callback));
        self
    }

    /// 提交操作并消费构建器。
    pub fn enqueue(self) {
        let ActionBuilder {
            name,
            handle,
            context,
            marshal,
            settings,
            on_success,
            on_failure,
        } = self;

        tracing::debug!(operation = %name, "submitting action through builder");
        handle.submit(Box::new(move |response| {
            if settings.guard_context_validity && !context.is_valid() {
                tracing::warn!(operation = %name, "context is no longer valid; completion dropped");
                return;
            }
            match router::route_with_fallback(response, &settings.fallback_message) {
                Ok(value) => {
                    if let Some(callback) = on_success {
                        deliver(&marshal, &name, callback, value);
                    }
                }
                Err(error) => match on_failure {
                    Some(callback) => deliver(&marshal, &name, callback, error),
                    None => tracing::debug!(operation = %name, %error, "unhandled action failure"),
                },
            }
        }));
    }
}

/// 运行构建器回调；此路径没有后续链，失败只能记录。
fn deliver<A>(marshal: &Marshal, name: &str, callback: Box<dyn FnOnce(A)>, arg: A) {
    if let Err(error) = marshal.invoke(callback, arg) {
        tracing::error!(operation = %name, %error, "action builder callback failed");
    }
}
