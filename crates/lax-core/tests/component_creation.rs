use std::rc::Rc;

use futures::executor::block_on;
use lax_core::{
    APEX_ACTION_ERROR, ComponentSpec, HOST_CONTRACT_ERROR, INCOMPLETE_ACTION_ERROR,
    ResponseState, attach,
    test_stubs::{ScriptedComponentFactory, ScriptedContext},
};
use serde_json::{Value, json};

fn bind(factory: ScriptedComponentFactory) -> (lax_core::Lax, Rc<ScriptedComponentFactory>) {
    let factory = Rc::new(factory);
    let context = ScriptedContext::new().with_component_factory(factory.clone());
    (attach(Rc::new(context)), factory)
}

#[test]
fn single_component_fulfils_with_component_and_status() {
    let (lax, factory) = bind(ScriptedComponentFactory::new());

    let created = block_on(lax.create_component("ui:button", json!({ "label": "Save" })))
        .expect("应创建成功");
    assert_eq!(created.component.descriptor(), "ui:button");
    assert_eq!(created.component.attributes(), &json!({ "label": "Save" }));
    assert_eq!(created.status, ResponseState::Success);
    assert_eq!(factory.requests().len(), 1);
}

#[test]
fn batch_results_are_index_aligned() {
    let (lax, factory) = bind(ScriptedComponentFactory::new());
    let specs: Vec<ComponentSpec> = serde_json::from_value(json!([
        ["aura:text", { "value": "Name" }],
        ["ui:inputText", { "value": "Ada" }]
    ]))
    .expect("请求应可解析");

    let created = block_on(lax.create_components(specs.clone())).expect("应创建成功");
    let descriptors: Vec<&str> = created.components.iter().map(|c| c.descriptor()).collect();
    assert_eq!(descriptors, vec!["aura:text", "ui:inputText"]);
    assert_eq!(created.statuses, vec![ResponseState::Success; 2]);
    assert_eq!(factory.requests(), vec![specs]);
}

#[test]
fn unknown_descriptor_rejects_with_the_host_message() {
    let (lax, _factory) = bind(ScriptedComponentFactory::new().with_unknown("ui:missing"));

    let err = block_on(lax.create_components(vec![
        ComponentSpec::new("aura:text", Value::Null),
        ComponentSpec::new("ui:missing", Value::Null),
    ]))
    .expect_err("未知组件应拒绝");
    assert_eq!(err.name(), APEX_ACTION_ERROR);
    assert_eq!(err.message(), "unknown component `ui:missing`");
}

#[test]
fn empty_error_message_falls_back() {
    let (lax, _factory) =
        bind(ScriptedComponentFactory::new().with_status(ResponseState::Error, ""));
    let err = block_on(lax.create_component("ui:button", Value::Null)).expect_err("应拒绝");
    assert_eq!(err.message(), "Unknown error");
}

#[test]
fn incomplete_creation_is_classified() {
    let (lax, _factory) =
        bind(ScriptedComponentFactory::new().with_status(ResponseState::Incomplete, "offline"));
    let err = block_on(lax.create_component("ui:button", Value::Null)).expect_err("应拒绝");
    assert_eq!(err.name(), INCOMPLETE_ACTION_ERROR);
    assert_eq!(err.message(), "offline");
}

#[test]
fn missing_factory_rejects_as_contract_violation() {
    let lax = attach(Rc::new(ScriptedContext::new()));
    let err = block_on(lax.create_component("ui:button", Value::Null)).expect_err("应拒绝");
    assert_eq!(err.name(), HOST_CONTRACT_ERROR);
    assert!(err.message().contains("component factory"));
}
