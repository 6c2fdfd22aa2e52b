//! # ErrorRegistry：进程级错误种类目录
//!
//! ## 核心意图（Why）
//! - 调用方可在运行期登记自定义种类，随后任何 Future 的 `catch` 过滤都能按名称解析到最新描述符；
//! - 注册表随进程存活，没有移除操作。
//!
//! ## 行为契约（What）
//! - 初始即包含 `ApexActionError`、`IncompleteActionError` 以及两个内部种类；
//! - `register` 以 `name` 为键覆盖写入（后写者胜），返回被替换的旧描述符；
//! - 读取路径无全局锁，底层为 `DashMap` 分片。

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use super::kind::ErrorKind;

static GLOBAL: OnceLock<ErrorRegistry> = OnceLock::new();

/// 错误种类注册表。
#[derive(Debug)]
pub struct ErrorRegistry {
    kinds: DashMap<Arc<str>, ErrorKind>,
}

impl ErrorRegistry {
    /// 创建已写入内建种类的注册表。
    pub fn seeded() -> Self {
        let registry = Self {
            kinds: DashMap::new(),
        };
        for kind in [
            ErrorKind::apex_action(),
            ErrorKind::incomplete_action(),
            ErrorKind::host_contract(),
            ErrorKind::handler_panic(),
        ] {
            registry.register(kind);
        }
        registry
    }

    /// 进程级共享实例，首次访问时初始化。
    pub fn global() -> &'static ErrorRegistry {
        GLOBAL.get_or_init(ErrorRegistry::seeded)
    }

    /// 登记新的种类。
    ///
    /// # 契约说明（What）
    /// - **输入**：任意描述符；名称冲突时覆盖旧值；
    /// - **返回**：若存在同名旧描述符则返回之；
    /// - **后置条件**：之后所有按该名称解析的过滤器都使用新描述符。
    pub fn register(&self, kind: ErrorKind) -> Option<ErrorKind> {
        let previous = self.kinds.insert(Arc::from(kind.name()), kind);
        if let Some(old) = &previous {
            tracing::debug!(kind = old.name(), "error kind re-registered");
        }
        previous
    }

    /// 按名称查找描述符。
    pub fn get(&self, name: &str) -> Option<ErrorKind> {
        self.kinds.get(name).map(|entry| entry.value().clone())
    }

    /// 是否已登记给定名称。
    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// 将调用方持有的描述符解析为注册表中的最新版本；未登记时原样返回。
    pub fn resolve(&self, kind: &ErrorKind) -> ErrorKind {
        self.get(kind.name()).unwrap_or_else(|| kind.clone())
    }

    /// 全部已登记名称，按字典序排列。
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kinds
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort();
        names
    }

    /// 已登记种类数量。
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// 注册表是否为空。
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::seeded()
    }
}
