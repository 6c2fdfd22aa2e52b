//! # 日志安装入口
//!
//! 库本身只通过 `tracing` 宏发出事件，不主动安装 Subscriber。宿主或测试若需要把事件打印出来，
//! 可调用一次 [`install_subscriber`]。

use std::sync::OnceLock;

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

use crate::error::LaxError;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// 安装 `fmt + EnvFilter` 组成的全局 Subscriber。
///
/// # 教案式说明
/// - **意图 (Why)**：提供一步到位的日志输出，过滤级别沿用 `RUST_LOG`，未设置时为 `info`；
/// - **契约 (What)**：重复调用，或外部已设置全局 Subscriber 时，返回 [`LaxError::SubscriberInstalled`]；
/// - **执行 (How)**：先检查本模块与 `tracing` 的全局状态，再组装 `registry` 并设置为全局默认。
pub fn install_subscriber() -> Result<(), LaxError> {
    if INSTALLED.get().is_some() || dispatcher::has_been_set() {
        return Err(LaxError::SubscriberInstalled);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| LaxError::SubscriberInstalled)?;

    INSTALLED.set(()).map_err(|_| LaxError::SubscriberInstalled)
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
