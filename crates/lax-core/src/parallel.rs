//! # 并行组合（enqueue_all）
//!
//! ## 契约说明（What）
//! - 所有请求在调用时同步提交，提交顺序与输入顺序一致；
//! - 全部兑现时，结果按输入顺序排列，与完成先后无关；
//! - 任一请求拒绝时，组合 Future 以时间上最先到达的拒绝结算，其余请求继续运行但结果被丢弃；
//! - 任一成员永不结算且无成员拒绝时，组合 Future 同样永不结算。

use futures::{
    future::FutureExt,
    stream::{FuturesUnordered, StreamExt},
};
use serde_json::Value;

use crate::{
    action::ActionRequest,
    binding::Lax,
    future::{LaxPromise, Marshal},
};

impl Lax {
    /// 并行提交多个远程操作。
    ///
    /// 空输入立即以空列表兑现。
    pub fn enqueue_all<I>(&self, requests: I) -> LaxPromise<Vec<Value>>
    where
        I: IntoIterator<Item = ActionRequest>,
    {
        let members: Vec<LaxPromise<Value>> = requests
            .into_iter()
            .map(|request| self.enqueue_with(request))
            .collect();
        tracing::debug!(count = members.len(), "enqueued actions in parallel");
        all(self.marshal().clone(), members)
    }
}

/// 将一组 Future 合并为按输入顺序排列的结果列表，首个到达的拒绝即终止。
///
/// # 执行逻辑（How）
/// - 成员以 `(下标, 结果)` 的形式放入 [`FuturesUnordered`]，按唤醒顺序产出；
/// - 兑现值写入对应下标的槽位，遇到第一个 `Err` 立即返回，未完成的成员随之被丢弃。
pub fn all<T: 'static>(marshal: Marshal, members: Vec<LaxPromise<T>>) -> LaxPromise<Vec<T>> {
    LaxPromise::from_future(marshal, async move {
        let mut slots: Vec<Option<T>> = members.iter().map(|_| None).collect();
        let mut pending: FuturesUnordered<_> = members
            .into_iter()
            .enumerate()
            .map(|(index, member)| FutureExt::map(member, move |outcome| (index, outcome)))
            .collect();

        while let Some((index, outcome)) = pending.next().await {
            let value = outcome?;
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(value);
            }
        }
        Ok(slots.into_iter().flatten().collect())
    })
}
