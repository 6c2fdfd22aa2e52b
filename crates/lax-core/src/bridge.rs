//! 回调到 Future 的桥接。
//!
//! 宿主回调被包装为 `oneshot` 发送端：
//! - 上下文失效且开启守卫时，完成结果被丢弃，对应 Future 永不结算；
//! - 宿主未调用回调就将其丢弃时，Future 以宿主契约违例拒绝；只有开启守卫且上下文已失效时，
//!   才视为完成结果被丢弃而永不结算；
//! - Future 先于回调被丢弃时，迟到的结果被忽略。

use std::rc::Rc;

use futures::{
    channel::oneshot,
    future::{self, FutureExt, LocalBoxFuture},
};

use crate::{error::ActionError, future::Outcome, host::ActionContext};

/// 创建一对“宿主回调 + 等待结果的 Future”。
pub(crate) fn completion<R: 'static>(
    context: Rc<dyn ActionContext>,
    guard_validity: bool,
    origin: impl Into<String>,
) -> (Box<dyn FnOnce(R)>, LocalBoxFuture<'static, Outcome<R>>) {
    let origin: Rc<str> = Rc::from(origin.into());
    let (sender, receiver) = oneshot::channel::<R>();

    let callback_context = context.clone();
    let callback_origin = origin.clone();
    let callback: Box<dyn FnOnce(R)> = Box::new(move |payload| {
        if guard_validity && !callback_context.is_valid() {
            tracing::warn!(origin = %callback_origin, "context is no longer valid; completion dropped");
            return;
        }
        if sender.send(payload).is_err() {
            tracing::debug!(origin = %callback_origin, "completion arrived after its future was dropped");
        }
    });

    let settled = async move {
        match receiver.await {
            Ok(payload) => Ok(payload),
            Err(oneshot::Canceled) if guard_validity && !context.is_valid() => {
                future::pending().await
            }
            Err(oneshot::Canceled) => {
                tracing::warn!(origin = %origin, "host dropped the callback without invoking it");
                Err(ActionError::host_contract(format!(
                    "`{origin}` callback was dropped without a response"
                )))
            }
        }
    }
    .boxed_local();

    (callback, settled)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::{executor::LocalPool, task::LocalSpawnExt};
    use tracing_test::traced_test;

    use super::*;
    use crate::{error::HOST_CONTRACT_ERROR, host::OperationHandle};

    struct Toggle(Cell<bool>);

    impl ActionContext for Toggle {
        fn resolve_operation(&self, _name: &str) -> Option<Box<dyn OperationHandle>> {
            None
        }

        fn is_valid(&self) -> bool {
            self.0.get()
        }
    }

    #[test]
    fn dropped_callback_on_live_context_is_a_contract_violation() {
        let context = Rc::new(Toggle(Cell::new(true)));
        let (callback, settled) = completion::<u8>(context, true, "c.lost");
        drop(callback);
        let err = futures::executor::block_on(settled).expect_err("应拒绝");
        assert_eq!(err.name(), HOST_CONTRACT_ERROR);
        assert!(err.message().contains("c.lost"));
    }

    #[traced_test]
    #[test]
    fn completion_after_teardown_never_settles() {
        let context = Rc::new(Toggle(Cell::new(true)));
        let (callback, settled) = completion::<u8>(context.clone(), true, "c.late");
        let observed = Rc::new(Cell::new(false));

        let mut pool = LocalPool::new();
        let flag = observed.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = settled.await;
                flag.set(true);
            })
            .expect("本地任务应可派发");

        context.0.set(false);
        callback(7);
        pool.run_until_stalled();
        assert!(!observed.get(), "失效上下文上的完成结果应被丢弃");
        assert!(logs_contain("completion dropped"));
    }

    #[test]
    fn guard_can_be_disabled() {
        let context = Rc::new(Toggle(Cell::new(false)));
        let (callback, settled) = completion::<u8>(context.clone(), false, "c.unguarded");
        callback(9);
        assert_eq!(futures::executor::block_on(settled).ok(), Some(9));

        // 守卫关闭时，失效上下文上被丢弃的回调同样是契约违例。
        let (callback, settled) = completion::<u8>(context, false, "c.dropped");
        drop(callback);
        let err = futures::executor::block_on(settled).expect_err("应拒绝");
        assert_eq!(err.name(), HOST_CONTRACT_ERROR);
        assert!(err.message().contains("c.dropped"));
    }
}
