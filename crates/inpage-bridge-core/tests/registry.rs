use inpage_bridge_core::{ProviderError, RequestRegistry};
use serde_json::json;

#[test]
fn ids_are_strictly_increasing() {
    let registry = RequestRegistry::default();
    let a = registry.next_id();
    let b = registry.next_id();
    let c = registry.next_id();
    assert!(a < b && b < c);
}

#[tokio::test]
async fn settle_delivers_result_once() {
    let registry = RequestRegistry::default();
    let id = registry.next_id();
    let handle = registry.register(id, "eth_sign").expect("register");
    registry.mark_posted(id).expect("posted");
    assert!(registry.is_pending(id));

    assert!(registry.settle(id, Ok(json!("0xsig"))));
    assert!(!registry.settle(id, Ok(json!("0xlate"))));
    assert_eq!(registry.pending_count(), 0);
    assert_eq!(handle.wait().await.expect("result"), json!("0xsig"));
}

#[tokio::test]
async fn host_error_rejects_the_waiter() {
    let registry = RequestRegistry::default();
    let id = registry.next_id();
    let handle = registry.register(id, "personal_sign").expect("register");
    registry.mark_posted(id).expect("posted");

    let payload = json!({ "code": 4001, "message": "User rejected" });
    assert!(registry.settle(id, Err(ProviderError::HostRejection(payload.clone()))));
    let err = handle.wait().await.expect_err("rejected");
    assert_eq!(err, ProviderError::HostRejection(payload));
    assert_eq!(err.code(), 4001);
}

#[test]
fn unknown_id_is_a_no_op() {
    let registry = RequestRegistry::default();
    let id = registry.next_id();
    let _handle = registry.register(id, "eth_sign").expect("register");
    registry.mark_posted(id).expect("posted");

    assert!(!registry.settle(id + 100, Ok(json!(null))));
    assert_eq!(registry.pending_count(), 1);
    assert!(registry.is_pending(id));
}

#[test]
fn duplicate_registration_is_rejected() {
    let registry = RequestRegistry::default();
    let id = registry.next_id();
    let _first = registry.register(id, "eth_sign").expect("register");
    let err = registry.register(id, "eth_sign").expect_err("duplicate");
    assert_eq!(err, ProviderError::DuplicateId(id));
}

#[test]
fn settle_before_post_is_ignored() {
    let registry = RequestRegistry::default();
    let id = registry.next_id();
    let _handle = registry.register(id, "eth_sign").expect("register");
    assert!(!registry.settle(id, Ok(json!("0x"))));
    assert!(registry.is_pending(id));
}

#[tokio::test]
async fn abandon_fails_the_waiter() {
    let registry = RequestRegistry::default();
    let id = registry.next_id();
    let handle = registry.register(id, "eth_signTypedData_v4").expect("register");
    assert!(registry.abandon(id, ProviderError::HostTimeout(50)));
    assert_eq!(
        handle.wait().await.expect_err("abandoned"),
        ProviderError::HostTimeout(50)
    );
    assert_eq!(registry.pending_count(), 0);
}
