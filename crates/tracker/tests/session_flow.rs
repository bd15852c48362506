//! End-to-end hit assembly through a session with a recording transport.

use std::sync::Arc;

use ssga_core::{ParamValue, ParameterSet, ProductField};
use ssga_tracker::{
    FailureReason, HitOutcome, IdentityStore, MemoryIdentityStore, NullIdentityStore,
    RecordingTransport, RequestContext, TrackingSession, Transaction, Transport,
    CHECKOUT_PAYMENT,
};

fn build(store: Arc<dyn IdentityStore>, status: u16) -> (TrackingSession, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::with_status(status));
    let session = TrackingSession::builder("UA-1000-1")
        .identity_store(store)
        .request_context(RequestContext::new("shop.example.com", "/checkout"))
        .transport(transport.clone() as Arc<dyn Transport>)
        .build();
    (session, transport)
}

fn text(params: &ParameterSet, key: &str) -> Option<String> {
    params.get(key).map(|v| v.to_string())
}

#[test]
fn test_persisted_cookie_is_recovered_without_write_back() {
    let store = Arc::new(MemoryIdentityStore::new().with_value("_ga", "GA1.2.1234567.7654321"));
    let (session, transport) = build(store.clone(), 200);

    assert_eq!(session.client_id(), "1234567");
    assert_eq!(session.persisted_token(), "GA1.2.1234567.7654321");
    assert_eq!(store.get("_ga").as_deref(), Some("GA1.2.1234567.7654321"));

    assert!(session.send_pageview(ParameterSet::new()).is_delivered());
    assert_eq!(text(&transport.last().unwrap(), "cid").as_deref(), Some("1234567"));
}

#[test]
fn test_purchase_example_parameters() {
    let (session, transport) = build(Arc::new(MemoryIdentityStore::new()), 200);
    let items = vec![ProductField::from_attributes([
        ("id", serde_json::json!(1)),
        ("name", serde_json::json!("Widget")),
        ("price", serde_json::json!(9.99)),
        ("quantity", serde_json::json!(2)),
        ("position", serde_json::json!(1)),
    ])];

    let outcome = session.send_purchase(
        &items,
        &Transaction::new("T100", "Shop", 19.98),
        ParameterSet::new(),
    );
    assert_eq!(outcome, HitOutcome::Delivered);

    let hit = transport.last().unwrap();
    for (key, expected) in [
        ("pa", "purchase"),
        ("ti", "T100"),
        ("ta", "Shop"),
        ("tr", "19.98"),
        ("pr1id", "1"),
        ("pr1nm", "Widget"),
        ("pr1pr", "9.99"),
        ("pr1qt", "2"),
        ("t", "pageview"),
        ("v", "1"),
        ("tid", "UA-1000-1"),
    ] {
        assert_eq!(text(&hit, key).as_deref(), Some(expected), "key {key}");
    }
    for absent in ["ts", "tt", "tcc", "pr1br", "pr1ca", "pr1va"] {
        assert!(!hit.contains_key(absent), "{absent} should not be sent");
    }
}

#[test]
fn test_refund_events_share_client_id() {
    let (session, transport) = build(Arc::new(NullIdentityStore), 200);
    session.send_refund("T100", ParameterSet::new());
    session.send_event("Ecommerce", "Refund", ParameterSet::new());

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].get("cid"), sent[1].get("cid"));
    assert_eq!(text(&sent[0], "pa").as_deref(), Some("refund"));
    assert_eq!(text(&sent[0], "ni").as_deref(), Some("1"));
}

#[test]
fn test_checkout_with_wrong_items_never_sends() {
    let (session, transport) = build(Arc::new(MemoryIdentityStore::new()), 200);
    let outcome = session.send_checkout(
        &[ProductField::from_attributes([("name", serde_json::json!("no slot"))])],
        CHECKOUT_PAYMENT,
        "Visa",
        ParameterSet::new(),
    );
    assert_eq!(outcome.failure(), Some(&FailureReason::EmptyProductList));
    assert_eq!(outcome.as_bool(), Some(false));
    assert_eq!(transport.count(), 0);
}

#[test]
fn test_checkout_caller_params_cannot_touch_locked_keys() {
    let (session, transport) = build(Arc::new(MemoryIdentityStore::new()), 200);
    let cid = session.client_id().to_string();
    let outcome = session.send_checkout(
        &[ProductField::at_position(3).with_name("Lamp")],
        CHECKOUT_PAYMENT,
        "Visa",
        ParameterSet::new().with("cid", "other").with("cos", 5),
    );
    assert!(outcome.is_delivered());

    let hit = transport.last().unwrap();
    assert_eq!(hit.get("cid"), Some(&ParamValue::Str(cid)));
    assert_eq!(text(&hit, "cos").as_deref(), Some("5"));
    assert_eq!(text(&hit, "pr3nm").as_deref(), Some("Lamp"));
}

#[test]
fn test_rejected_and_unavailable_outcomes_are_distinct() {
    let (session, _) = build(Arc::new(MemoryIdentityStore::new()), 301);
    assert_eq!(
        session.send_pageview(ParameterSet::new()),
        HitOutcome::Failed(FailureReason::Rejected(301))
    );

    let unavailable = TrackingSession::new(
        "UA-1000-1",
        Arc::new(MemoryIdentityStore::new()),
        Arc::new(RecordingTransport::unavailable()),
    );
    let outcome = unavailable.send_event("a", "b", ParameterSet::new());
    assert!(outcome.is_unknown());
    assert_eq!(outcome.as_bool(), None);
}
