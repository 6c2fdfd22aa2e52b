//! # 组件创建适配器
//!
//! ## 定位（Why）
//! - 宿主的组件工厂以回调报告整体状态、逐项状态与错误说明；
//! - 本模块将其包装为 [`LaxPromise`]，分类规则与远程操作一致：
//!   `SUCCESS` 兑现，`INCOMPLETE` 为未完成种类，`ERROR` 为 Apex 种类，其余状态视为宿主契约违例。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    binding::Lax,
    bridge,
    error::{ActionError, LaxError},
    future::LaxPromise,
    host::{ComponentHandle, CreationOutcome},
    response::ResponseState,
};

/// 单个组件的创建请求。
///
/// 同时可以从宿主的 `["aura:text", {...}]` 二元组解析。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpecShape")]
pub struct ComponentSpec {
    pub descriptor: String,
    #[serde(default)]
    pub attributes: Value,
}

impl ComponentSpec {
    pub fn new(descriptor: impl Into<String>, attributes: Value) -> Self {
        Self {
            descriptor: descriptor.into(),
            attributes,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpecShape {
    Pair(String, Value),
    Named {
        descriptor: String,
        #[serde(default)]
        attributes: Value,
    },
}

impl From<SpecShape> for ComponentSpec {
    fn from(shape: SpecShape) -> Self {
        match shape {
            SpecShape::Pair(descriptor, attributes) => Self::new(descriptor, attributes),
            SpecShape::Named {
                descriptor,
                attributes,
            } => Self::new(descriptor, attributes),
        }
    }
}

/// `create_component` 的兑现值。
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedComponent {
    pub component: ComponentHandle,
    pub status: ResponseState,
}

/// `create_components` 的兑现值，与请求逐项对齐。
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedComponents {
    pub components: Vec<ComponentHandle>,
    pub statuses: Vec<ResponseState>,
}

impl Lax {
    /// 创建单个组件。
    pub fn create_component(
        &self,
        descriptor: impl Into<String>,
        attributes: Value,
    ) -> LaxPromise<CreatedComponent> {
        self.create_components(vec![ComponentSpec::new(descriptor, attributes)])
            .then(|created| {
                let CreatedComponents {
                    components,
                    statuses,
                } = created;
                match (components.into_iter().next(), statuses.into_iter().next()) {
                    (Some(component), Some(status)) => Ok(CreatedComponent { component, status }),
                    _ => Err(ActionError::host_contract(
                        "component factory returned no component for a single request",
                    )),
                }
            })
    }

    /// 批量创建组件。
    ///
    /// # 契约说明（What）
    /// - 上下文未提供组件工厂时，返回以宿主契约种类拒绝的 Future；
    /// - 兑现值中的组件与状态数量必须与请求一致，否则视为宿主契约违例。
    pub fn create_components(&self, specs: Vec<ComponentSpec>) -> LaxPromise<CreatedComponents> {
        let Some(factory) = self.context().component_factory() else {
            tracing::warn!("context does not provide a component factory");
            return self.reject(LaxError::ComponentFactoryUnavailable.into());
        };

        let requested = specs.len();
        let (callback, settled) = bridge::completion::<CreationOutcome>(
            self.context().clone(),
            self.settings().guard_context_validity,
            "createComponents",
        );
        tracing::debug!(requested, "creating components");
        factory.create_components(specs, callback);

        let fallback = self.settings().fallback_message.clone();
        LaxPromise::from_future(self.marshal().clone(), async move {
            route_creation(settled.await?, requested, &fallback)
        })
    }
}

/// 按整体状态分类组件创建结果。
fn route_creation(
    outcome: CreationOutcome,
    requested: usize,
    fallback: &str,
) -> Result<CreatedComponents, ActionError> {
    let CreationOutcome {
        components,
        statuses,
        status,
        error_message,
    } = outcome;

    match status {
        ResponseState::Success => {
            if components.len() != requested || statuses.len() != requested {
                return Err(ActionError::host_contract(format!(
                    "component factory returned {} components and {} statuses for {requested} requests",
                    components.len(),
                    statuses.len(),
                )));
            }
            Ok(CreatedComponents {
                components,
                statuses,
            })
        }
        ResponseState::Incomplete => Err(ActionError::incomplete(message_or(error_message, fallback))),
        ResponseState::Error => Err(ActionError::apex(message_or(error_message, fallback))),
        other => {
            tracing::warn!(state = %other, "component factory reported an undocumented state");
            Err(ActionError::host_contract(format!(
                "component factory reported undocumented state `{other}`"
            )))
        }
    }
}

fn message_or(message: String, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}
