//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 所有经由 Future 链传播的拒绝值都收敛为 [`ActionError`]：分类只在响应路由边界发生一次，
//!   上层只转发或被 `catch` 过滤器转换；
//! - 同步配置阶段的失败（未知操作名、缺失记录服务等）以 [`LaxError`] 表达，
//!   需要时可转换为宿主契约种类的 [`ActionError`]。
//!
//! ## 设计要求（What）
//! - 两类错误均派生 `thiserror::Error`；
//! - `ActionError` 构造后不可变，字段只通过访问器读取。

pub mod kind;
pub mod registry;

use std::{any::Any, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use kind::{
    APEX_ACTION_ERROR, ErrorKind, HANDLER_PANIC, HOST_CONTRACT_ERROR, INCOMPLETE_ACTION_ERROR,
    KindMatcher,
};
pub use registry::ErrorRegistry;

use crate::response::RawResponse;

/// 宿主回调附带的单条错误条目。
///
/// 至少包含 `message`；其余字段（如 `fieldErrors`、`pageErrors`）原样保存在 `details` 中。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ErrorEntry {
    /// 只含消息的条目。
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Map::new(),
        }
    }

    /// 附加额外字段。
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// 经过分类的拒绝值。
///
/// # 教案式说明
/// - **意图 (Why)**：为 `catch`/`error`/`incomplete` 提供统一的判别结构；
/// - **契约 (What)**：
///   - `name`：判别名，取自错误种类或调用方手工打标；
///   - `message`：首条错误条目的消息，或固定兜底文案；
///   - `entries`：宿主给出的原始条目，可能为空；
///   - `kind`：构造时使用的正式种类，手工打标的值为 `None`；
///   - `response`：原始响应，仅用于诊断；
/// - **风险 (Trade-offs)**：保留整份原始响应会延长其生命周期，响应体较大时需留意内存。
#[derive(Clone, Debug, Error)]
#[error("{name}: {message}")]
pub struct ActionError {
    name: Arc<str>,
    message: String,
    entries: Vec<ErrorEntry>,
    kind: Option<ErrorKind>,
    response: Option<Arc<RawResponse>>,
}

impl ActionError {
    /// 以正式种类构造错误值。
    pub fn new(kind: &ErrorKind, message: impl Into<String>) -> Self {
        Self {
            name: Arc::from(kind.name()),
            message: message.into(),
            entries: Vec::new(),
            kind: Some(kind.clone()),
            response: None,
        }
    }

    /// 仅以名称打标的错误值，对应“带 name 字段的普通对象”。
    pub fn tagged(name: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            entries: Vec::new(),
            kind: None,
            response: None,
        }
    }

    /// `ApexActionError` 快捷构造。
    pub fn apex(message: impl Into<String>) -> Self {
        Self::new(&ErrorKind::apex_action(), message)
    }

    /// `IncompleteActionError` 快捷构造。
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::new(&ErrorKind::incomplete_action(), message)
    }

    /// 宿主契约违例。
    pub fn host_contract(message: impl Into<String>) -> Self {
        Self::new(&ErrorKind::host_contract(), message)
    }

    /// 将 panic 负载转换为拒绝值。
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
            (*text).to_owned()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "handler panicked".to_owned()
        };
        Self::new(&ErrorKind::handler_panic(), message)
    }

    /// 附带原始错误条目。
    pub fn with_entries(mut self, entries: Vec<ErrorEntry>) -> Self {
        self.entries = entries;
        self
    }

    /// 附带原始响应。
    pub fn with_response(mut self, response: Arc<RawResponse>) -> Self {
        self.response = Some(response);
        self
    }

    /// 判别名。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 人类可读消息。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 原始错误条目。
    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    /// 构造时使用的正式种类。
    pub fn kind(&self) -> Option<&ErrorKind> {
        self.kind.as_ref()
    }

    /// 产生该错误的原始响应。
    pub fn response(&self) -> Option<&RawResponse> {
        self.response.as_deref()
    }

    /// 按双重匹配规则判断是否属于 `kind`。
    pub fn is(&self, kind: &ErrorKind) -> bool {
        kind.matches(self)
    }
}

/// 同步配置阶段的错误。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“宿主环境缺少协作者”与“远程操作失败”；
/// - **契约 (What)**：通过 [`From<LaxError>`](From) 转换为宿主契约种类的 [`ActionError`]，
///   使返回 Future 的入口可以直接以拒绝形式交付。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LaxError {
    /// 上下文无法解析给定的操作名。
    #[error("operation `{name}` is not exposed by the bound context")]
    UnknownOperation { name: String },

    /// 上下文中找不到给定标识的记录服务。
    #[error("record service `{id}` was not found in the bound context")]
    RecordServiceNotFound { id: String },

    /// 上下文未提供组件工厂。
    #[error("the bound context does not provide a component factory")]
    ComponentFactoryUnavailable,

    /// 配置文本无法解析。
    #[error("invalid lax settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// 全局 tracing Subscriber 已存在。
    #[error("a global tracing subscriber is already installed")]
    SubscriberInstalled,
}

impl From<LaxError> for ActionError {
    fn from(value: LaxError) -> Self {
        ActionError::host_contract(value.to_string())
    }
}
