//! # 记录服务适配器
//!
//! 将宿主记录服务的三个回调式操作包装为 [`LaxPromise`]：
//! - `get_new_record`：回调无参数，成功时以单元值兑现；模板加载错误由宿主写入自身状态，
//!   此处只有回调被丢弃这类契约违例会拒绝；
//! - `save_record` / `delete_record`：按记录词表路由（`SUCCESS`/`DRAFT` 兑现为原始响应）。

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::{
    binding::Lax,
    bridge,
    future::{LaxPromise, Outcome},
    host::RecordService,
    response::{RawResponse, ResponseCallback},
    router,
};

type PendingResponse = LocalBoxFuture<'static, Outcome<RawResponse>>;

/// `getNewRecord` 的请求参数。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewRecordRequest {
    pub entity_api_name: Option<String>,
    pub record_type_id: Option<String>,
    pub skip_cache: bool,
}

impl NewRecordRequest {
    /// 指定对象类型的模板请求。
    pub fn for_entity(entity_api_name: impl Into<String>) -> Self {
        Self {
            entity_api_name: Some(entity_api_name.into()),
            ..Self::default()
        }
    }

    /// 指定记录类型。
    pub fn with_record_type(mut self, record_type_id: impl Into<String>) -> Self {
        self.record_type_id = Some(record_type_id.into());
        self
    }

    /// 跳过宿主缓存。
    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }
}

/// 绑定到单个记录服务的 Future 适配器。
#[derive(Clone)]
pub struct RecordServiceAdapter {
    id: String,
    service: Rc<dyn RecordService>,
    lax: Lax,
}

impl RecordServiceAdapter {
    pub(crate) fn new(id: &str, service: Rc<dyn RecordService>, lax: Lax) -> Self {
        Self {
            id: id.to_owned(),
            service,
            lax,
        }
    }

    /// 记录服务在上下文中的标识。
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 加载新记录模板。
    pub fn get_new_record(&self, request: NewRecordRequest) -> LaxPromise<()> {
        let (callback, settled) = bridge::completion::<()>(
            self.lax.context().clone(),
            self.lax.settings().guard_context_validity,
            format!("{}.getNewRecord", self.id),
        );
        tracing::debug!(service = %self.id, entity = ?request.entity_api_name, "loading record template");
        self.service
            .get_new_record(request, Box::new(move || callback(())));
        LaxPromise::from_future(self.lax.marshal().clone(), settled)
    }

    /// 保存当前记录。
    pub fn save_record(&self) -> LaxPromise<RawResponse> {
        let (callback, settled) = self.response_bridge("saveRecord");
        self.service.save_record(callback);
        self.routed(settled)
    }

    /// 删除当前记录。
    pub fn delete_record(&self) -> LaxPromise<RawResponse> {
        let (callback, settled) = self.response_bridge("deleteRecord");
        self.service.delete_record(callback);
        self.routed(settled)
    }

    fn response_bridge(&self, operation: &str) -> (ResponseCallback, PendingResponse) {
        tracing::debug!(service = %self.id, operation, "submitting record operation");
        bridge::completion(
            self.lax.context().clone(),
            self.lax.settings().guard_context_validity,
            format!("{}.{operation}", self.id),
        )
    }

    fn routed(&self, settled: PendingResponse) -> LaxPromise<RawResponse> {
        let fallback = self.lax.settings().fallback_message.clone();
        LaxPromise::from_future(self.lax.marshal().clone(), async move {
            router::route_record_with_fallback(settled.await?, &fallback)
        })
    }
}

impl std::fmt::Debug for RecordServiceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordServiceAdapter")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
