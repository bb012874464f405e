use authgate_license::{decode_ack, decode_init, decode_profile, LicenseError, Subscription};
use pretty_assertions::assert_eq;

#[test]
fn init_success_yields_session_id() {
    let id = decode_init(r#"{"success":true,"sessionid":"abc123","message":"Initialized"}"#).unwrap();
    assert_eq!(id, "abc123");
}

#[test]
fn init_empty_session_id_is_decode_error() {
    let err = decode_init(r#"{"success":true,"sessionid":""}"#).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn rejection_carries_message() {
    let err = decode_init(r#"{"success":false,"message":"Application is disabled"}"#).unwrap_err();
    match err {
        LicenseError::Rejected(msg) => assert_eq!(msg, "Application is disabled"),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn rejection_ignores_malformed_payload() {
    // Rejection is decided by the envelope alone.
    let err = decode_profile(r#"{"success":false,"message":"Key expired","info":42}"#).unwrap_err();
    assert!(err.is_rejected());
}

#[test]
fn not_json_is_decode_error() {
    assert!(decode_init("not json").unwrap_err().is_decode());
    assert!(decode_profile("").unwrap_err().is_decode());
    assert!(decode_ack("{").unwrap_err().is_decode());
}

#[test]
fn missing_success_flag_is_decode_error() {
    let err = decode_ack(r#"{"message":"hello"}"#).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn non_boolean_success_flag_is_decode_error() {
    let err = decode_ack(r#"{"success":"true"}"#).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn profile_reads_first_subscription() {
    let body = r#"{
        "success": true,
        "message": "Logged in!",
        "info": {
            "username": "alice",
            "ip": "127.0.0.1",
            "subscriptions": [
                {"subscription": "pro", "key": "K1", "expiry": "1767139200", "timeleft": 100},
                {"subscription": "beta", "key": "K2", "expiry": "1767225600", "timeleft": 200}
            ]
        }
    }"#;

    let profile = decode_profile(body).unwrap();

    assert_eq!(profile.username, "alice");
    assert_eq!(profile.subscription, "pro");
    assert_eq!(profile.expiry, "1767139200");
    assert_eq!(
        profile.subscriptions,
        vec![
            Subscription {
                tier: "pro".to_string(),
                expiry: "1767139200".to_string()
            },
            Subscription {
                tier: "beta".to_string(),
                expiry: "1767225600".to_string()
            },
        ]
    );
    assert_eq!(
        profile.expires_at().unwrap().format("%Y-%m-%d").to_string(),
        "2025-12-31"
    );
}

#[test]
fn empty_subscriptions_is_decode_error_not_panic() {
    let err = decode_profile(r#"{"success":true,"info":{"username":"bob","subscriptions":[]}}"#)
        .unwrap_err();
    assert!(err.is_decode());
    assert!(err.to_string().contains("no subscriptions"));
}

#[test]
fn absent_subscriptions_is_decode_error() {
    let err = decode_profile(r#"{"success":true,"info":{"username":"bob"}}"#).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn missing_info_is_decode_error() {
    let err = decode_profile(r#"{"success":true}"#).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn missing_username_is_decode_error() {
    let body = r#"{"success":true,"info":{"subscriptions":[{"subscription":"pro","expiry":"1"}]}}"#;
    assert!(decode_profile(body).unwrap_err().is_decode());
}

#[test]
fn subscription_missing_expiry_is_decode_error() {
    let body = r#"{"success":true,"info":{"username":"a","subscriptions":[{"subscription":"pro"}]}}"#;
    assert!(decode_profile(body).unwrap_err().is_decode());
}

#[test]
fn ack_returns_server_message() {
    assert_eq!(
        decode_ack(r#"{"success":true,"message":"Successfully registered"}"#).unwrap(),
        Some("Successfully registered".to_string())
    );
    assert_eq!(decode_ack(r#"{"success":true}"#).unwrap(), None);
}
