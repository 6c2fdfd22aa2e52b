//! # host：核心与宿主协作者之间的唯一边界
//!
//! ## 定位（Why）
//! - 传输、记录服务、组件创建都由宿主实现，核心只消费它们的回调契约；
//! - 所有用户回调在交给 Future 或宿主之前，都要经过 [`ActionContext::marshal`]，
//!   以便在宿主要求的执行上下文中运行。
//!
//! ## 线程模型（What）
//! - 宿主是单线程协作式调度，trait 均不要求 `Send`；
//! - 每个回调恰好被宿主调用一次；宿主也可能在上下文销毁后丢弃回调而不调用。

use std::rc::Rc;

use serde_json::Value;

use crate::{
    action::Params,
    component::ComponentSpec,
    record::NewRecordRequest,
    response::{ResponseCallback, ResponseState},
};

/// 调用上下文：解析远程操作、报告存活状态、提供安全执行包装。
///
/// # 教案式说明
/// - **意图 (Why)**：替代“把 API 挂到外部对象上”的做法，以显式依赖注入传入上下文；
/// - **契约 (What)**：
///   - `resolve_operation` 对未暴露的操作名返回 `None`；
///   - `is_valid` 为 `false` 时，在途完成结果会被静默丢弃；
///   - `marshal` 必须同步执行 `body` 恰好一次，缺省实现直接调用；
/// - **风险 (Trade-offs)**：若 `marshal` 未执行 `body`，对应处理器的结果会以宿主契约违例拒绝。
pub trait ActionContext {
    /// 为给定名称创建新的操作句柄。
    fn resolve_operation(&self, name: &str) -> Option<Box<dyn OperationHandle>>;

    /// 上下文是否仍存活。
    fn is_valid(&self) -> bool {
        true
    }

    /// 在宿主要求的执行上下文中运行 `body`。
    fn marshal(&self, body: &mut dyn FnMut()) {
        body()
    }

    /// 按标识查找记录服务。
    fn record_service(&self, _id: &str) -> Option<Rc<dyn RecordService>> {
        None
    }

    /// 组件工厂。
    fn component_factory(&self) -> Option<Rc<dyn ComponentFactory>> {
        None
    }
}

/// 单个远程操作的句柄，提交后即被消费。
pub trait OperationHandle {
    /// 设置调用参数。
    fn set_params(&mut self, params: Params);

    /// 标记结果可缓存。
    fn set_storable(&mut self);

    /// 标记为后台执行。
    fn set_background(&mut self);

    /// 提交操作；`callback` 稍后由传输层恰好调用一次。
    fn submit(self: Box<Self>, callback: ResponseCallback);
}

/// 宿主托管的记录服务。
pub trait RecordService {
    /// 加载新记录模板；完成时以无参回调通知，错误写入宿主侧状态而不经回调传递。
    fn get_new_record(&self, request: NewRecordRequest, callback: Box<dyn FnOnce()>);

    /// 保存当前记录。
    fn save_record(&self, callback: ResponseCallback);

    /// 删除当前记录。
    fn delete_record(&self, callback: ResponseCallback);
}

/// 组件创建回调收到的结果。
///
/// - `components`：与请求逐项对齐的宿主组件；
/// - `statuses`：逐项状态（`SUCCESS`/`INCOMPLETE`/`ERROR`）；
/// - `status`：整体状态；
/// - `error_message`：整体失败时的说明，可能为空。
#[derive(Clone, Debug)]
pub struct CreationOutcome {
    pub components: Vec<ComponentHandle>,
    pub statuses: Vec<ResponseState>,
    pub status: ResponseState,
    pub error_message: String,
}

/// 宿主组件的不透明句柄。
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentHandle {
    descriptor: String,
    attributes: Value,
}

impl ComponentHandle {
    /// 由宿主构造句柄。
    pub fn new(descriptor: impl Into<String>, attributes: Value) -> Self {
        Self {
            descriptor: descriptor.into(),
            attributes,
        }
    }

    /// 组件描述符，例如 `aura:text`。
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// 创建时使用的属性。
    pub fn attributes(&self) -> &Value {
        &self.attributes
    }
}

/// 宿主组件工厂。
pub trait ComponentFactory {
    /// 批量创建组件，完成后恰好调用一次 `callback`。
    fn create_components(
        &self,
        specs: Vec<ComponentSpec>,
        callback: Box<dyn FnOnce(CreationOutcome)>,
    );
}
