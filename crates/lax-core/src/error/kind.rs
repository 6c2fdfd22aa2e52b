//! # 错误种类描述符（ErrorKind）
//!
//! ## 角色定位（Why）
//! - `catch` 过滤链需要“按种类”识别拒绝值，而 Rust 没有原型链可供 `instanceof` 检查，
//!   因此每个种类以显式描述符表达：名称 + 可选父种类 + 可选匹配函数；
//! - 描述符可克隆、可跨线程共享，便于同时存放在进程级注册表与调用方手中。
//!
//! ## 匹配规则（What）
//! 1. 主规则：名称相等；若描述符带自定义匹配函数，则由该函数取代名称比较；
//! 2. 辅助规则：错误值若携带正式种类，则沿其父链查找与本描述符同名的祖先（“类型派生”）。
//!
//! 仅以名称打标的错误值（[`ActionError::tagged`]）只会命中主规则。

use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, LazyLock},
};

use super::ActionError;

/// `ApexActionError` 的稳定名称：远程操作以 `ERROR` 状态结束。
pub const APEX_ACTION_ERROR: &str = "ApexActionError";
/// `IncompleteActionError` 的稳定名称：操作未能完成（离线、取消等）。
pub const INCOMPLETE_ACTION_ERROR: &str = "IncompleteActionError";
/// 宿主违反回调契约时使用的名称，例如未登记的响应状态或回调被丢弃。
pub const HOST_CONTRACT_ERROR: &str = "HostContractError";
/// 处理器 panic 被捕获后转换为拒绝值时使用的名称。
pub const HANDLER_PANIC: &str = "HandlerPanic";

/// 自定义匹配函数签名。
pub type KindMatcher = Arc<dyn Fn(&ActionError) -> bool + Send + Sync>;

static APEX: LazyLock<ErrorKind> = LazyLock::new(|| ErrorKind::new(APEX_ACTION_ERROR));
static INCOMPLETE: LazyLock<ErrorKind> =
    LazyLock::new(|| ErrorKind::new(INCOMPLETE_ACTION_ERROR));
static HOST_CONTRACT: LazyLock<ErrorKind> = LazyLock::new(|| ErrorKind::new(HOST_CONTRACT_ERROR));
static PANIC: LazyLock<ErrorKind> = LazyLock::new(|| ErrorKind::new(HANDLER_PANIC));

/// 错误种类描述符。
///
/// # 教案式说明
/// - **意图 (Why)**：为 `catch_kinds` 提供可比较的“类型引用”，同时允许运行期注册新的种类；
/// - **契约 (What)**：
///   - `name` 是判别名，注册表以其为键；
///   - `parent` 形成单继承链，用于类型派生匹配；
///   - `matcher` 若存在，则替代默认的名称相等判定；
/// - **执行 (How)**：内部以 `Arc` 共享，克隆只增加引用计数。
#[derive(Clone)]
pub struct ErrorKind {
    inner: Arc<KindInner>,
}

struct KindInner {
    name: Cow<'static, str>,
    parent: Option<ErrorKind>,
    matcher: Option<KindMatcher>,
}

impl ErrorKind {
    /// 以名称创建没有父种类的描述符。
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            inner: Arc::new(KindInner {
                name: name.into(),
                parent: None,
                matcher: None,
            }),
        }
    }

    /// 创建继承自 `parent` 的描述符。
    ///
    /// 以该种类构造的错误值，同时可被 `parent` 及其所有祖先的过滤器捕获。
    pub fn extending(name: impl Into<Cow<'static, str>>, parent: &ErrorKind) -> Self {
        Self {
            inner: Arc::new(KindInner {
                name: name.into(),
                parent: Some(parent.clone()),
                matcher: None,
            }),
        }
    }

    /// 替换主匹配规则。
    ///
    /// # 契约说明（What）
    /// - `matcher` 返回 `true` 即视为命中；
    /// - 类型派生规则仍会在 `matcher` 返回 `false` 后补充检查；
    /// - `LaxPromise` 的过滤器按名称经全局注册表解析种类：同名种类已登记（包括内建种类）时，
    ///   生效的是注册表中的匹配规则。要让 `matcher` 参与过滤，需先通过
    ///   [`ErrorRegistry::register`](crate::error::ErrorRegistry::register) 登记该描述符。
    pub fn with_matcher<F>(self, matcher: F) -> Self
    where
        F: Fn(&ActionError) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(KindInner {
                name: self.inner.name.clone(),
                parent: self.inner.parent.clone(),
                matcher: Some(Arc::new(matcher)),
            }),
        }
    }

    /// 内建种类：`ApexActionError`。
    pub fn apex_action() -> ErrorKind {
        APEX.clone()
    }

    /// 内建种类：`IncompleteActionError`。
    pub fn incomplete_action() -> ErrorKind {
        INCOMPLETE.clone()
    }

    /// 宿主契约违例种类。
    pub fn host_contract() -> ErrorKind {
        HOST_CONTRACT.clone()
    }

    /// 处理器 panic 种类。
    pub fn handler_panic() -> ErrorKind {
        PANIC.clone()
    }

    /// 判别名。
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// 父种类。
    pub fn parent(&self) -> Option<&ErrorKind> {
        self.inner.parent.as_ref()
    }

    /// 判断本种类是否为 `ancestor` 自身或其后代。
    pub fn descends_from(&self, ancestor: &ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind.name() == ancestor.name() {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// 判断拒绝值是否属于本种类。
    ///
    /// # 执行逻辑（How）
    /// 1. 主规则：自定义匹配函数，缺省为名称相等；
    /// 2. 辅助规则：错误值的正式种类沿父链派生自本种类。
    pub fn matches(&self, error: &ActionError) -> bool {
        let primary = match &self.inner.matcher {
            Some(matcher) => matcher(error),
            None => error.name() == self.name(),
        };
        primary || error.kind().is_some_and(|kind| kind.descends_from(self))
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorKind")
            .field("name", &self.name())
            .field("parent", &self.parent().map(ErrorKind::name))
            .field("custom_matcher", &self.inner.matcher.is_some())
            .finish()
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
