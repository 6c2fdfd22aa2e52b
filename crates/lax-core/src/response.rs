//! 宿主回调交付的原始响应。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ErrorEntry;

/// 响应完成状态。
///
/// # 契约说明（What）
/// - 远程操作使用 `SUCCESS`/`ERROR`/`INCOMPLETE`；记录服务额外使用 `DRAFT`；
/// - 其余文本保存在 [`ResponseState::Unrecognized`] 中，由路由器按各自词表处置。
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ResponseState {
    Success,
    Draft,
    Error,
    Incomplete,
    Unrecognized(String),
}

impl ResponseState {
    /// 宿主使用的文本形式。
    pub fn as_str(&self) -> &str {
        match self {
            ResponseState::Success => "SUCCESS",
            ResponseState::Draft => "DRAFT",
            ResponseState::Error => "ERROR",
            ResponseState::Incomplete => "INCOMPLETE",
            ResponseState::Unrecognized(other) => other,
        }
    }
}

impl From<&str> for ResponseState {
    fn from(value: &str) -> Self {
        match value {
            "SUCCESS" => ResponseState::Success,
            "DRAFT" => ResponseState::Draft,
            "ERROR" => ResponseState::Error,
            "INCOMPLETE" => ResponseState::Incomplete,
            other => ResponseState::Unrecognized(other.to_owned()),
        }
    }
}

impl FromStr for ResponseState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ResponseState::from(s))
    }
}

impl fmt::Display for ResponseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResponseState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResponseState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(ResponseState::from(text.as_str()))
    }
}

/// 宿主交付给回调的原始响应。
///
/// # 教案式说明
/// - **意图 (Why)**：路由器只依赖状态、返回值与错误条目三项，其余宿主细节不进入核心；
/// - **契约 (What)**：失败时 `errors` 可能为空；成功时 `return_value` 可能为 `null`；
/// - **序列化**：字段名沿用宿主的驼峰写法，便于直接从 JSON 构造。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    pub state: ResponseState,
    #[serde(default)]
    pub return_value: Value,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

impl RawResponse {
    /// 成功响应。
    pub fn success(return_value: Value) -> Self {
        Self {
            state: ResponseState::Success,
            return_value,
            errors: Vec::new(),
        }
    }

    /// 以给定状态与错误条目构造的失败响应。
    pub fn failure(state: ResponseState, errors: Vec<ErrorEntry>) -> Self {
        Self {
            state,
            return_value: Value::Null,
            errors,
        }
    }

    /// `ERROR` 状态、单条消息的便捷构造。
    pub fn error(message: impl Into<String>) -> Self {
        Self::failure(ResponseState::Error, vec![ErrorEntry::new(message)])
    }

    /// `INCOMPLETE` 状态、无条目的便捷构造。
    pub fn incomplete() -> Self {
        Self::failure(ResponseState::Incomplete, Vec::new())
    }

    /// 完成状态。
    pub fn state(&self) -> &ResponseState {
        &self.state
    }

    /// 返回值。
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    /// 错误条目。
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }
}

/// 宿主回调签名：恰好调用一次，传入原始响应。
pub type ResponseCallback = Box<dyn FnOnce(RawResponse)>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_states_are_preserved() {
        let state: ResponseState = "ABORTED".parse().unwrap_or(ResponseState::Success);
        assert_eq!(state, ResponseState::Unrecognized("ABORTED".into()));
        assert_eq!(state.to_string(), "ABORTED");
    }

    #[test]
    fn deserializes_host_shape() {
        let response: RawResponse = serde_json::from_value(json!({
            "state": "ERROR",
            "errors": [{ "message": "Script-thrown exception" }]
        }))
        .expect("宿主响应应可解析");
        assert_eq!(response.state(), &ResponseState::Error);
        assert_eq!(response.return_value(), &Value::Null);
        assert_eq!(response.errors()[0].message, "Script-thrown exception");
    }
}
