use lax_core::{LaxError, install_subscriber};

#[test]
fn subscriber_installs_only_once() {
    assert!(install_subscriber().is_ok());
    assert!(matches!(
        install_subscriber(),
        Err(LaxError::SubscriberInstalled)
    ));
    tracing::info!("subscriber installed");
}
