//! # 上下文绑定 Future（LaxPromise）
//!
//! ## 设计背景（Why）
//! - 宿主的 Future 只提供 `then`/`catch` 原语；调用方需要按错误种类过滤、`error`/`incomplete`
//!   快捷方式与 `finally`，并且每个处理器都必须经由宿主的安全执行包装运行；
//! - 宿主为单线程事件循环，因此内部使用 [`LocalBoxFuture`]，不要求 `Send`。
//!
//! ## 契约说明（What）
//! - 每个链式方法都消费 `self` 并返回新的 `LaxPromise`，原 Future 不会被就地修改；
//! - 处理器返回值通过 [`IntoStage`] 决定下一阶段：`Ok` 兑现、`Err` 拒绝、`LaxPromise` 展平；
//! - 处理器 panic 被捕获并转为 [`HANDLER_PANIC`](crate::error::HANDLER_PANIC) 拒绝，
//!   后续 `catch` 仍可观察到它；
//! - 未被任何过滤器接住的拒绝原样传递到链尾。
//!
//! ## 执行逻辑（How）
//! - 内部 Future 只在本模块的组合器与响应路由中被解包；
//! - 处理器调用统一经过 [`Marshal::invoke`]：先交给上下文的 `marshal`，再在其中以
//!   `catch_unwind` 执行。

use std::{
    fmt,
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::{
    error::{ActionError, ErrorKind, ErrorRegistry},
    host::ActionContext,
};

/// 一次结算的结果。
pub type Outcome<T> = Result<T, ActionError>;

/// 链上的一个阶段。
pub type Stage<T> = LocalBoxFuture<'static, Outcome<T>>;

/// 处理器返回值到下一阶段的转换。
///
/// # 契约说明（What）
/// - `Result<U, ActionError>`：`Ok` 兑现为 `U`，`Err` 成为新的拒绝；
/// - `LaxPromise<U>`：展平为链的下一阶段；
/// - `()`：以单元值兑现，便于只产生副作用的处理器。
pub trait IntoStage {
    /// 下一阶段兑现的值类型。
    type Output: 'static;

    /// 转换为阶段 Future。
    fn into_stage(self) -> Stage<Self::Output>;
}

impl<T: 'static> IntoStage for Result<T, ActionError> {
    type Output = T;

    fn into_stage(self) -> Stage<T> {
        future::ready(self).boxed_local()
    }
}

impl<T: 'static> IntoStage for LaxPromise<T> {
    type Output = T;

    fn into_stage(self) -> Stage<T> {
        self.stage
    }
}

impl IntoStage for () {
    type Output = ();

    fn into_stage(self) -> Stage<()> {
        future::ready(Ok(())).boxed_local()
    }
}

/// 宿主安全执行包装的句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：把“在宿主上下文中运行回调 + 捕获 panic”收敛到一处；
/// - **契约 (What)**：`invoke` 要么返回处理器的结果，要么返回分类后的拒绝，从不向宿主抛出 panic。
#[derive(Clone)]
pub struct Marshal {
    context: Rc<dyn ActionContext>,
}

impl Marshal {
    /// 基于调用上下文创建句柄。
    pub fn new(context: Rc<dyn ActionContext>) -> Self {
        Self { context }
    }

    /// 在宿主上下文中执行处理器。
    ///
    /// # 执行步骤（How）
    /// 1. 将处理器与参数放入一次性槽位，交由 `ActionContext::marshal` 调用；
    /// 2. 处理器在 `catch_unwind` 中运行，panic 转为 `HandlerPanic`；
    /// 3. 若 `marshal` 未执行回调，返回宿主契约违例。
    pub fn invoke<A, R>(&self, handler: impl FnOnce(A) -> R, arg: A) -> Outcome<R> {
        let mut pending = Some((handler, arg));
        let mut outcome = None;
        self.context.marshal(&mut || {
            if let Some((handler, arg)) = pending.take() {
                outcome = Some(panic::catch_unwind(AssertUnwindSafe(move || handler(arg))));
            }
        });

        match outcome {
            Some(Ok(value)) => Ok(value),
            Some(Err(payload)) => {
                let error = ActionError::from_panic(payload);
                tracing::debug!(message = error.message(), "handler panicked; rejecting");
                Err(error)
            }
            None => {
                tracing::warn!("execution marshal did not run the handler");
                Err(ActionError::host_contract(
                    "execution marshal did not run the handler",
                ))
            }
        }
    }
}

impl fmt::Debug for Marshal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshal").finish_non_exhaustive()
    }
}

/// 上下文绑定的可链式 Future。
///
/// 可直接 `.await`，得到 `Result<T, ActionError>`。
#[must_use = "LaxPromise 需要被链接、轮询或 await 才会交付结果"]
pub struct LaxPromise<T> {
    stage: Stage<T>,
    marshal: Marshal,
}

impl<T: 'static> LaxPromise<T> {
    /// 包装任意结果 Future。
    pub fn from_future<F>(marshal: Marshal, future: F) -> Self
    where
        F: Future<Output = Outcome<T>> + 'static,
    {
        Self {
            stage: future.boxed_local(),
            marshal,
        }
    }

    /// 已兑现的 Future。
    pub fn resolved(marshal: Marshal, value: T) -> Self {
        Self::from_future(marshal, future::ready(Ok(value)))
    }

    /// 已拒绝的 Future。
    pub fn rejected(marshal: Marshal, error: ActionError) -> Self {
        Self::from_future(marshal, future::ready(Err(error)))
    }

    /// 本 Future 使用的执行包装。
    pub fn marshal(&self) -> &Marshal {
        &self.marshal
    }

    /// 兑现时运行 `on_fulfilled`；拒绝原样传递。
    pub fn then<F, R>(self, on_fulfilled: F) -> LaxPromise<R::Output>
    where
        F: FnOnce(T) -> R + 'static,
        R: IntoStage,
    {
        let stage = self.stage;
        let marshal = self.marshal.clone();
        LaxPromise::from_future(self.marshal, async move {
            let value = stage.await?;
            marshal.invoke(on_fulfilled, value)?.into_stage().await
        })
    }

    /// 同时挂接兑现与拒绝处理器，二者产出同一类型。
    pub fn then_or<F, G, R, S>(self, on_fulfilled: F, on_rejected: G) -> LaxPromise<R::Output>
    where
        F: FnOnce(T) -> R + 'static,
        G: FnOnce(ActionError) -> S + 'static,
        R: IntoStage,
        S: IntoStage<Output = R::Output>,
    {
        let stage = self.stage;
        let marshal = self.marshal.clone();
        LaxPromise::from_future(self.marshal, async move {
            match stage.await {
                Ok(value) => marshal.invoke(on_fulfilled, value)?.into_stage().await,
                Err(error) => marshal.invoke(on_rejected, error)?.into_stage().await,
            }
        })
    }

    /// 以普通值变换兑现结果。
    pub fn map<U, F>(self, transform: F) -> LaxPromise<U>
    where
        U: 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.then(move |value| Ok::<U, ActionError>(transform(value)))
    }

    /// 不过滤种类的 catch：任何拒绝都交给 `handler`。
    pub fn catch<F, R>(self, handler: F) -> LaxPromise<T>
    where
        F: FnOnce(ActionError) -> R + 'static,
        R: IntoStage<Output = T>,
    {
        self.catch_filtered(Vec::new(), handler)
    }

    /// 仅当拒绝值属于 `kind` 时运行 `handler`。
    ///
    /// 判定前按名称经 [`ErrorRegistry::global`] 解析 `kind`：同名种类已登记（包括内建种类）时，
    /// 以注册表中的描述符为准，调用方描述符上的匹配函数不再生效。
    pub fn catch_kind<F, R>(self, kind: &ErrorKind, handler: F) -> LaxPromise<T>
    where
        F: FnOnce(ActionError) -> R + 'static,
        R: IntoStage<Output = T>,
    {
        self.catch_filtered(vec![kind.clone()], handler)
    }

    /// 拒绝值属于 `kinds` 中任一种类时运行 `handler`，否则原样传递给下一阶段。
    ///
    /// `kinds` 为空时等价于 [`catch`](Self::catch)，接住所有拒绝。
    /// 每个种类的解析方式同 [`catch_kind`](Self::catch_kind)。
    pub fn catch_kinds<I, F, R>(self, kinds: I, handler: F) -> LaxPromise<T>
    where
        I: IntoIterator<Item = ErrorKind>,
        F: FnOnce(ActionError) -> R + 'static,
        R: IntoStage<Output = T>,
    {
        self.catch_filtered(kinds.into_iter().collect(), handler)
    }

    /// `catch_kind(ApexActionError, handler)` 的简写。
    pub fn error<F, R>(self, handler: F) -> LaxPromise<T>
    where
        F: FnOnce(ActionError) -> R + 'static,
        R: IntoStage<Output = T>,
    {
        self.catch_kind(&ErrorKind::apex_action(), handler)
    }

    /// `catch_kind(IncompleteActionError, handler)` 的简写。
    pub fn incomplete<F, R>(self, handler: F) -> LaxPromise<T>
    where
        F: FnOnce(ActionError) -> R + 'static,
        R: IntoStage<Output = T>,
    {
        self.catch_kind(&ErrorKind::incomplete_action(), handler)
    }

    /// 无论结果如何都运行 `on_settled`，且不改变结算值。
    ///
    /// `on_settled` panic 时，其拒绝取代原结果。
    pub fn finally<F>(self, on_settled: F) -> LaxPromise<T>
    where
        F: FnOnce() + 'static,
    {
        let stage = self.stage;
        let marshal = self.marshal.clone();
        LaxPromise::from_future(self.marshal, async move {
            let settled = stage.await;
            marshal.invoke(move |()| on_settled(), ())?;
            settled
        })
    }

    /// `kinds` 为空表示兜底过滤器。
    fn catch_filtered<F, R>(self, kinds: Vec<ErrorKind>, handler: F) -> LaxPromise<T>
    where
        F: FnOnce(ActionError) -> R + 'static,
        R: IntoStage<Output = T>,
    {
        let stage = self.stage;
        let marshal = self.marshal.clone();
        LaxPromise::from_future(self.marshal, async move {
            match stage.await {
                Ok(value) => Ok(value),
                Err(error) if accepts(&kinds, &error) => {
                    marshal.invoke(handler, error)?.into_stage().await
                }
                Err(error) => Err(error),
            }
        })
    }
}

/// 过滤器判定：按顺序遍历请求的种类，以注册表中的最新描述符做双重匹配。
fn accepts(kinds: &[ErrorKind], error: &ActionError) -> bool {
    if kinds.is_empty() {
        return true;
    }
    let registry = ErrorRegistry::global();
    kinds
        .iter()
        .any(|kind| registry.resolve(kind).matches(error))
}

impl<T> Future for LaxPromise<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().stage.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for LaxPromise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaxPromise").finish_non_exhaustive()
    }
}
