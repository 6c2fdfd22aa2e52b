use std::rc::Rc;

use lax_core::{
    ActionError, ActionRequest, ErrorKind, RawResponse, attach, test_stubs::ScriptedContext,
};
use serde_json::json;

#[tokio::test(flavor = "current_thread")]
async fn sequential_awaits_compose_like_a_chain() {
    let context = ScriptedContext::new()
        .with_response("c.getParentValue", RawResponse::success(json!({ "id": "001" })))
        .with_response("c.getChildValues", RawResponse::success(json!(["x", "y"])));
    let lax = attach(Rc::new(context.clone()));

    let parent = lax.enqueue("c.getParentValue").await.expect("父记录应可获取");
    let children = lax
        .enqueue_with(
            ActionRequest::new("c.getChildValues").with_param("parentId", parent["id"].clone()),
        )
        .await
        .expect("子记录应可获取");

    assert_eq!(children, json!(["x", "y"]));
    let submissions = context.submissions();
    assert_eq!(
        submissions[1].params.as_ref().and_then(|p| p.get("parentId")),
        Some(&json!("001"))
    );
}

#[tokio::test(flavor = "current_thread")]
async fn awaited_rejection_keeps_its_kind() {
    let context = ScriptedContext::new().with_response("c.offline", RawResponse::incomplete());
    let lax = attach(Rc::new(context));

    let err: ActionError = lax.enqueue("c.offline").await.expect_err("应拒绝");
    assert!(err.is(&ErrorKind::incomplete_action()));
}

#[tokio::test(flavor = "current_thread")]
async fn parallel_results_can_be_awaited() {
    let context = ScriptedContext::new()
        .with_response("c.a", RawResponse::success(json!(1)))
        .with_response("c.b", RawResponse::success(json!(2)));
    let lax = attach(Rc::new(context));

    let values = lax
        .enqueue_all([ActionRequest::new("c.a"), ActionRequest::new("c.b")])
        .await
        .expect("应全部兑现");
    assert_eq!(values, vec![json!(1), json!(2)]);
}
