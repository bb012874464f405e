//! Shared test helpers for licensing client tests.

#![allow(dead_code)]

use async_trait::async_trait;
use authgate_license::{
    AppIdentity, DeviceId, FormRequest, HttpReply, LicenseError, LicenseResult, Session, Transport,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const INIT_OK: &str = r#"{"success":true,"sessionid":"abc123"}"#;

pub const LOGIN_OK: &str = r#"{"success":true,"info":{"username":"alice","subscriptions":[{"subscription":"pro","expiry":"2025-12-31"}]}}"#;

pub const NO_SUBSCRIPTIONS: &str =
    r#"{"success":true,"info":{"username":"bob","subscriptions":[]}}"#;

pub const REGISTER_OK: &str = r#"{"success":true,"message":"Successfully registered"}"#;

/// Transport that replays canned replies and records every request.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<LicenseResult<HttpReply>>>,
    requests: Mutex<Vec<FormRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a 200 reply with `body`.
    pub fn reply(&self, body: &str) {
        self.reply_with_status(200, body);
    }

    pub fn reply_with_status(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
    }

    pub fn fail(&self, err: LicenseError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<FormRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> FormRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_form(&self, request: &FormRequest) -> LicenseResult<HttpReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LicenseError::Network("no canned reply".to_string())))
    }
}

pub fn test_app() -> AppIdentity {
    AppIdentity::new("TestApp", "owner-0001", "1.0")
}

pub fn test_device() -> DeviceId {
    DeviceId::from_raw("HWID-test")
}

/// A fresh, uninitialized session over `transport`.
pub fn session(transport: &Arc<MockTransport>) -> Session<Arc<MockTransport>> {
    Session::with_device_id(test_app(), Arc::clone(transport), test_device())
}

/// A session that has completed `init` with token `abc123`.
pub async fn initialized_session(
    transport: &Arc<MockTransport>,
) -> Session<Arc<MockTransport>> {
    let mut session = session(transport);
    transport.reply(INIT_OK);
    assert!(session.initialize().await);
    session
}
