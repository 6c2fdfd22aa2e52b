use std::rc::Rc;

use futures::executor::block_on;
use lax_core::{
    APEX_ACTION_ERROR, ActionError, ErrorKind, ErrorRegistry, HANDLER_PANIC, HOST_CONTRACT_ERROR,
    INCOMPLETE_ACTION_ERROR, attach, test_stubs::ScriptedContext,
};

fn lax() -> lax_core::Lax {
    attach(Rc::new(ScriptedContext::new()))
}

#[test]
fn builtin_kinds_are_always_registered() {
    let names = lax().errors().names();
    for builtin in [
        APEX_ACTION_ERROR,
        INCOMPLETE_ACTION_ERROR,
        HOST_CONTRACT_ERROR,
        HANDLER_PANIC,
    ] {
        assert!(names.iter().any(|name| name == builtin), "缺少内建种类 {builtin}");
    }
}

#[test]
fn registered_kind_matches_plain_tagged_values() {
    let lax = lax();
    let custom = ErrorKind::new("CustomClientError");
    assert!(lax.register_error(custom.clone()).is_none());
    assert_eq!(lax.errors().get("CustomClientError"), Some(custom.clone()));

    // 错误值没有正式种类，只携带同名判别名。
    let plain = ActionError::tagged("CustomClientError", "client side validation failed");
    assert!(plain.kind().is_none());

    let promise = lax
        .reject::<&'static str>(plain)
        .catch_kind(&custom, |error| {
            assert_eq!(error.message(), "client side validation failed");
            Ok::<_, ActionError>("handled")
        });
    assert_eq!(block_on(promise).ok(), Some("handled"));
}

#[test]
fn re_registration_takes_effect_for_existing_descriptors() {
    let lax = lax();
    let held = ErrorKind::new("FlakyNetworkError");
    lax.register_error(held.clone());

    let replaced = lax.register_error(
        ErrorKind::new("FlakyNetworkError")
            .with_matcher(|error| error.message().starts_with("socket")),
    );
    assert_eq!(replaced.map(|kind| kind.name().to_owned()).as_deref(), Some("FlakyNetworkError"));

    // 调用方仍持有旧描述符，过滤时按名称解析到最新版本。
    let promise = lax
        .reject::<u8>(ActionError::tagged("TransportError", "socket closed"))
        .catch_kind(&held, |_| Ok::<_, ActionError>(1));
    assert_eq!(block_on(promise).ok(), Some(1));
}

#[test]
fn descendants_of_custom_kinds_are_caught_by_ancestors() {
    let lax = lax();
    let validation = ErrorKind::new("ValidationError");
    let required = ErrorKind::extending("RequiredFieldError", &validation);
    lax.register_error(validation.clone());
    lax.register_error(required.clone());

    let promise = lax
        .reject::<()>(ActionError::new(&required, "LastName is required"))
        .catch_kind(&validation, |error| {
            assert_eq!(error.kind().map(ErrorKind::name), Some("RequiredFieldError"));
        });
    assert!(block_on(promise).is_ok());
    assert!(required.descends_from(&validation));
    assert!(!validation.descends_from(&required));
}

#[test]
fn isolated_registry_does_not_leak_into_the_global_one() {
    let local = ErrorRegistry::seeded();
    local.register(ErrorKind::new("LocalOnlyError"));
    assert!(local.contains("LocalOnlyError"));
    assert!(!ErrorRegistry::global().contains("LocalOnlyError"));
}

#[test]
fn display_joins_name_and_message() {
    let error = ActionError::tagged("CustomClientError", "bad input");
    assert_eq!(error.to_string(), "CustomClientError: bad input");
}

#[test]
fn registered_descriptor_overrides_a_caller_matcher_of_the_same_name() {
    let lax = lax();

    // 内建种类已登记，调用方描述符上的匹配函数不参与过滤。
    let shadowed = ErrorKind::new(APEX_ACTION_ERROR).with_matcher(|_| false);
    let promise = lax
        .reject::<u8>(ActionError::apex("server failed"))
        .catch_kind(&shadowed, |_| Ok::<_, ActionError>(1));
    assert_eq!(block_on(promise).ok(), Some(1));

    // 未登记的名称按调用方描述符原样匹配。
    let unregistered = ErrorKind::new("UnlistedMatcherError")
        .with_matcher(|error| error.message().starts_with("quota"));
    let promise = lax
        .reject::<u8>(ActionError::tagged("ServerLimitError", "quota exceeded"))
        .catch_kind(&unregistered, |_| Ok::<_, ActionError>(2));
    assert_eq!(block_on(promise).ok(), Some(2));
}
