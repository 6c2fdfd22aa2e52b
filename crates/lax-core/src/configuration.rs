//! # 绑定配置（LaxSettings）
//!
//! ## 定位（Why）
//! - 同一个共享核心可绑定到多个上下文，每次绑定可以携带自己的配置；
//! - 配置既可在代码中构造，也可从 TOML 文本加载。
//!
//! ## 示例
//! ```toml
//! guard_context_validity = true
//! fallback_message = "Unknown error"
//!
//! [default_options]
//! storable = true
//! ```

use serde::{Deserialize, Serialize};

use crate::{action::ActionOptions, error::LaxError, router::UNKNOWN_ERROR};

/// 每次绑定的配置。
///
/// # 契约说明（What）
/// - `default_options`：与每个请求的标志取并集；
/// - `guard_context_validity`：为 `true` 时，上下文失效后到达的完成结果被丢弃；
/// - `fallback_message`：错误条目为空时使用的消息。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaxSettings {
    pub default_options: ActionOptions,
    pub guard_context_validity: bool,
    pub fallback_message: String,
}

impl Default for LaxSettings {
    fn default() -> Self {
        Self {
            default_options: ActionOptions::default(),
            guard_context_validity: true,
            fallback_message: UNKNOWN_ERROR.to_owned(),
        }
    }
}

impl LaxSettings {
    /// 从 TOML 文本加载；缺省字段取默认值。
    pub fn from_toml_str(text: &str) -> Result<Self, LaxError> {
        Ok(toml::from_str(text)?)
    }

    /// 覆盖默认提交标志。
    pub fn with_default_options(mut self, options: ActionOptions) -> Self {
        self.default_options = options;
        self
    }

    /// 开启或关闭上下文存活守卫。
    pub fn with_context_guard(mut self, enabled: bool) -> Self {
        self.guard_context_validity = enabled;
        self
    }

    /// 覆盖兜底消息。
    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = LaxSettings::from_toml_str("").expect("空文档应可解析");
        assert_eq!(settings, LaxSettings::default());
        assert!(settings.guard_context_validity);
        assert_eq!(settings.fallback_message, "Unknown error");
    }

    #[test]
    fn partial_document_overrides_fields() {
        let settings = LaxSettings::from_toml_str(
            r#"
            guard_context_validity = false

            [default_options]
            background = true
            "#,
        )
        .expect("配置应可解析");
        assert!(!settings.guard_context_validity);
        assert!(settings.default_options.background);
        assert!(!settings.default_options.storable);
    }

    #[test]
    fn malformed_document_is_reported() {
        let err = LaxSettings::from_toml_str("guard_context_validity = \"yes\"")
            .expect_err("类型错误应被拒绝");
        assert!(matches!(err, LaxError::Settings(_)));
    }
}
