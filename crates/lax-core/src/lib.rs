#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "lax-core: 将宿主回调式异步操作桥接为可链式组合、按错误种类过滤的 Future。"]
#![doc = ""]
#![doc = "== 执行模型 =="]
#![doc = "宿主是单线程协作式事件循环：所有 Future 均为 `!Send`，用户处理器经由上下文的执行包装运行，panic 被捕获为 `HandlerPanic` 拒绝。"]
#![doc = ""]
#![doc = "== 入口 =="]
#![doc = "通过 [`attach`] 把进程级共享的 [`LaxCore`] 绑定到一个 [`host::ActionContext`]，得到 [`Lax`]；之后的 `enqueue`、`enqueue_all`、`action`、`lds`、`create_component` 都基于该绑定。"]

pub mod action;
pub mod binding;
mod bridge;
pub mod component;
pub mod configuration;
pub mod error;
pub mod future;
pub mod host;
pub mod observability;
pub mod parallel;
pub mod record;
pub mod response;
pub mod router;
/// 测试桩命名空间，集中提供脚本化的宿主实现，供单元测试、集成测试与文档示例复用。
///
/// # 设计背景（Why）
/// - 宿主协作者（传输、记录服务、组件工厂）都是 trait，测试需要可控的完成时机；
/// - 统一维护可避免各测试文件重复实现同一套桩对象。
///
/// # 使用方式（How）
/// - `use lax_core::test_stubs::ScriptedContext;` 后按需 `with_operation`/`with_response` 配置；
/// - 未自动应答的操作停留在在途队列中，由测试通过 `respond` 决定完成顺序。
pub mod test_stubs;

pub use action::{ActionBuilder, ActionOptions, ActionRequest, Params};
pub use binding::{Lax, LaxCore, attach, attach_with};
pub use component::{ComponentSpec, CreatedComponent, CreatedComponents};
pub use configuration::LaxSettings;
pub use error::{
    APEX_ACTION_ERROR, ActionError, ErrorEntry, ErrorKind, ErrorRegistry, HANDLER_PANIC,
    HOST_CONTRACT_ERROR, INCOMPLETE_ACTION_ERROR, LaxError,
};
pub use future::{IntoStage, LaxPromise, Marshal, Outcome};
pub use observability::install_subscriber;
pub use record::{NewRecordRequest, RecordServiceAdapter};
pub use response::{RawResponse, ResponseState};
