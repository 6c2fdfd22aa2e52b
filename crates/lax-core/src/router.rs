//! # 响应路由（Response Router）
//!
//! ## 核心意图（Why）
//! - 宿主回调只给出“状态 + 错误条目”，本模块把一次回调调用归类为成功值或 [`ActionError`]；
//! - 分类只在此处发生一次，上层 Future 链不会再检查原始响应。
//!
//! ## 行为契约（What）
//! - 远程操作词表：`SUCCESS` 成功；`INCOMPLETE` → `IncompleteActionError`；其余 → `ApexActionError`；
//! - 记录服务词表：`SUCCESS`/`DRAFT` 成功；`INCOMPLETE` → `IncompleteActionError`；
//!   `ERROR` → `ApexActionError`；其余 → 宿主契约违例；
//! - 失败消息取首条错误条目，条目为空时使用兜底文案（默认 [`UNKNOWN_ERROR`]）。

use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::{ActionError, ErrorKind},
    response::{RawResponse, ResponseState},
};

/// 错误条目为空时的兜底消息。
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// 以默认兜底文案路由远程操作响应。
pub fn route(response: RawResponse) -> Result<Value, ActionError> {
    route_with_fallback(response, UNKNOWN_ERROR)
}

/// 路由远程操作响应。
///
/// # 执行步骤（How）
/// 1. `SUCCESS`：交出 `return_value`；
/// 2. 否则按状态选择种类，并以原始响应构造错误值。
pub fn route_with_fallback(response: RawResponse, fallback: &str) -> Result<Value, ActionError> {
    match response.state {
        ResponseState::Success => Ok(response.return_value),
        ResponseState::Incomplete => Err(classify(
            &ErrorKind::incomplete_action(),
            response,
            fallback,
        )),
        _ => Err(classify(&ErrorKind::apex_action(), response, fallback)),
    }
}

/// 以默认兜底文案路由记录服务响应。
pub fn route_record(response: RawResponse) -> Result<RawResponse, ActionError> {
    route_record_with_fallback(response, UNKNOWN_ERROR)
}

/// 路由记录服务响应；成功时交出整份响应。
pub fn route_record_with_fallback(
    response: RawResponse,
    fallback: &str,
) -> Result<RawResponse, ActionError> {
    let state = response.state.clone();
    match state {
        ResponseState::Success | ResponseState::Draft => Ok(response),
        ResponseState::Incomplete => Err(classify(
            &ErrorKind::incomplete_action(),
            response,
            fallback,
        )),
        ResponseState::Error => Err(classify(&ErrorKind::apex_action(), response, fallback)),
        ResponseState::Unrecognized(state) => {
            tracing::warn!(state = %state, "record service reported an undocumented state");
            Err(undocumented_state("record service", &state, response))
        }
    }
}

/// 首条错误条目的消息；条目为空时返回兜底文案。
pub fn first_message<'a>(response: &'a RawResponse, fallback: &'a str) -> &'a str {
    response
        .errors
        .first()
        .map(|entry| entry.message.as_str())
        .unwrap_or(fallback)
}

/// 以给定种类构造错误值，消息取首条错误条目。
fn classify(kind: &ErrorKind, response: RawResponse, fallback: &str) -> ActionError {
    let message = first_message(&response, fallback).to_owned();
    attach(ActionError::new(kind, message), response)
}

/// 宿主报告了词表之外的状态；消息固定描述违例本身，不读取错误条目。
pub(crate) fn undocumented_state(origin: &str, state: &str, response: RawResponse) -> ActionError {
    let message = format!("{origin} reported undocumented state `{state}`");
    attach(ActionError::host_contract(message), response)
}

fn attach(error: ActionError, response: RawResponse) -> ActionError {
    let entries = response.errors.clone();
    error.with_entries(entries).with_response(Arc::new(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{APEX_ACTION_ERROR, ErrorEntry, HOST_CONTRACT_ERROR, INCOMPLETE_ACTION_ERROR};
    use proptest::prelude::*;
    use serde_json::json;

    fn entries_strategy() -> impl Strategy<Value = Vec<ErrorEntry>> {
        prop::collection::vec("[a-zA-Z0-9 .:]{0,24}".prop_map(ErrorEntry::new), 0..4)
    }

    proptest! {
        #[test]
        fn prop_success_yields_return_value(n in any::<i64>(), text in ".{0,16}") {
            let value = json!({ "n": n, "text": text });
            let routed = route(RawResponse::success(value.clone()));
            prop_assert_eq!(routed.ok(), Some(value));
        }

        #[test]
        fn prop_error_uses_first_entry_or_fallback(entries in entries_strategy()) {
            let expected = entries
                .first()
                .map(|entry| entry.message.clone())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_owned());
            let err = route(RawResponse::failure(ResponseState::Error, entries.clone()))
                .expect_err("ERROR 状态必须拒绝");
            prop_assert_eq!(err.name(), APEX_ACTION_ERROR);
            prop_assert_eq!(err.message(), expected.as_str());
            prop_assert_eq!(err.entries(), entries.as_slice());
        }

        #[test]
        fn prop_incomplete_ignores_entries(entries in entries_strategy()) {
            let err = route(RawResponse::failure(ResponseState::Incomplete, entries))
                .expect_err("INCOMPLETE 状态必须拒绝");
            prop_assert_eq!(err.name(), INCOMPLETE_ACTION_ERROR);
        }
    }

    #[test]
    fn rejection_retains_source_response() {
        let response = RawResponse::error("Insufficient access");
        let err = route(response.clone()).expect_err("应拒绝");
        assert_eq!(err.response(), Some(&response));
    }

    #[test]
    fn remote_vocabulary_treats_unknown_states_as_apex() {
        let response = RawResponse::failure(ResponseState::Unrecognized("ABORTED".into()), vec![]);
        let err = route(response).expect_err("未知状态不应成功");
        assert_eq!(err.name(), APEX_ACTION_ERROR);
        assert_eq!(err.message(), UNKNOWN_ERROR);
    }

    #[test]
    fn remote_vocabulary_does_not_accept_drafts() {
        let response = RawResponse::failure(ResponseState::Draft, vec![]);
        assert!(route(response).is_err());
    }

    #[test]
    fn record_vocabulary() {
        let draft = RawResponse::failure(ResponseState::Draft, vec![]);
        assert_eq!(route_record(draft.clone()).ok(), Some(draft));

        let err = route_record(RawResponse::error("duplicate value")).expect_err("ERROR 应拒绝");
        assert_eq!(err.name(), APEX_ACTION_ERROR);
        assert_eq!(err.message(), "duplicate value");

        let err = route_record(RawResponse::incomplete()).expect_err("INCOMPLETE 应拒绝");
        assert_eq!(err.name(), INCOMPLETE_ACTION_ERROR);

        let odd = RawResponse::failure(
            ResponseState::Unrecognized("LOADING".into()),
            vec![ErrorEntry::new("ignored")],
        );
        let err = route_record(odd).expect_err("未登记状态是宿主契约违例");
        assert_eq!(err.name(), HOST_CONTRACT_ERROR);
        assert!(err.message().contains("LOADING"));
    }

    #[test]
    fn custom_fallback_is_used() {
        let err = route_with_fallback(RawResponse::failure(ResponseState::Error, vec![]), "no detail")
            .expect_err("应拒绝");
        assert_eq!(err.message(), "no detail");
    }
}
