//! Session manager: the licensing state machine.
//!
//! ```text
//! uninitialized --initialize--> initialized --login/license--> authenticated
//!                                    ^                              |
//!                                    +------------logout------------+
//! ```
//!
//! Authenticating calls made before `initialize()` fail locally and never
//! reach the transport. Every failure is folded into an [`AuthOutcome`] at
//! this boundary; nothing here is fatal.

use crate::config::AppIdentity;
use crate::decode::{decode_ack, decode_init, decode_profile, UserProfile};
use crate::device::DeviceId;
use crate::error::{LicenseError, LicenseResult};
use crate::transport::{FormRequest, RequestKind, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Uniform result of an authenticating operation, shown to the user as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
    pub username: String,
    pub subscription: String,
    pub expiry: String,
}

impl AuthOutcome {
    fn authenticated(profile: &UserProfile, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            username: profile.username.clone(),
            subscription: profile.subscription.clone(),
            expiry: profile.expiry.clone(),
        }
    }

    pub(crate) fn acknowledged(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            ..Default::default()
        }
    }

    /// Failure outcome carrying the user-facing text for `err`.
    #[must_use]
    pub fn failure(err: LicenseError) -> Self {
        Self {
            success: false,
            message: err.into_message(),
            ..Default::default()
        }
    }
}

/// Point-in-time copy of the session state, safe to hand to other threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub initialized: bool,
    pub authenticated: bool,
    pub profile: Option<UserProfile>,
}

/// A licensing session bound to one application identity.
pub struct Session<T> {
    app: AppIdentity,
    device_id: DeviceId,
    transport: T,
    session_token: String,
    initialized: bool,
    authenticated: bool,
    profile: Option<UserProfile>,
}

impl<T: Transport> Session<T> {
    /// Creates a session using this host's derived device ID.
    pub fn new(app: AppIdentity, transport: T) -> Self {
        Self::with_device_id(app, transport, DeviceId::generate())
    }

    /// Creates a session with an explicit device ID.
    pub fn with_device_id(app: AppIdentity, transport: T, device_id: DeviceId) -> Self {
        Self {
            app,
            device_id,
            transport,
            session_token: String::new(),
            initialized: false,
            authenticated: false,
            profile: None,
        }
    }

    // ==================== Operations ====================

    /// Opens a session with the server.
    ///
    /// Returns `true` once initialized. Calling again after success is a
    /// no-op that keeps the existing session token.
    pub async fn initialize(&mut self) -> bool {
        match self.try_initialize().await {
            Ok(()) => true,
            Err(e) => {
                warn!("KeyAuth initialization failed: {}", e);
                false
            }
        }
    }

    /// Like [`Session::initialize`], but reports why it failed.
    pub async fn try_initialize(&mut self) -> LicenseResult<()> {
        if self.initialized {
            debug!("Session already initialized, skipping init request");
            return Ok(());
        }

        let request = FormRequest::new(RequestKind::Init)
            .param("name", self.app.name.clone())
            .param("ownerid", self.app.owner_id.clone())
            .param("ver", self.app.version.clone());

        let body = self.exchange(&request).await?;
        self.session_token = decode_init(&body)?;
        self.initialized = true;
        info!("KeyAuth session initialized for {} v{}", self.app.name, self.app.version);
        Ok(())
    }

    /// Authenticates with a username and password.
    pub async fn login(&mut self, username: &str, password: &str) -> AuthOutcome {
        let result = self.try_login(username, password).await;
        self.finish_auth(RequestKind::Login, result, "Login successful")
    }

    /// Authenticates with a license key alone.
    pub async fn license_login(&mut self, key: &str) -> AuthOutcome {
        let result = self.try_license_login(key).await;
        self.finish_auth(RequestKind::License, result, "License login successful")
    }

    /// Creates an account bound to a license key.
    ///
    /// Registration does not authenticate the session; the user still has
    /// to log in afterwards.
    pub async fn register(&mut self, username: &str, password: &str, key: &str) -> AuthOutcome {
        match self.try_register(username, password, key).await {
            Ok(_) => {
                info!("Registered account {}", username);
                AuthOutcome::acknowledged("Registration successful")
            }
            Err(e) => {
                warn!("register failed: {}", e);
                AuthOutcome::failure(e)
            }
        }
    }

    /// Drops authentication and clears the profile. Local only.
    pub fn logout(&mut self) {
        if self.authenticated {
            info!("Logged out {}", self.username());
        }
        self.authenticated = false;
        self.profile = None;
    }

    /// Login returning the profile or the typed error.
    pub async fn try_login(&mut self, username: &str, password: &str) -> LicenseResult<UserProfile> {
        let request = self
            .authed_request(RequestKind::Login)?
            .param("username", username)
            .param("pass", password);
        self.authenticate(request).await
    }

    /// License login returning the profile or the typed error.
    pub async fn try_license_login(&mut self, key: &str) -> LicenseResult<UserProfile> {
        let request = self.authed_request(RequestKind::License)?.param("key", key);
        self.authenticate(request).await
    }

    /// Registration returning the server's message or the typed error.
    pub async fn try_register(
        &mut self,
        username: &str,
        password: &str,
        key: &str,
    ) -> LicenseResult<Option<String>> {
        let request = self
            .authed_request(RequestKind::Register)?
            .param("username", username)
            .param("pass", password)
            .param("key", key);
        let body = self.exchange(&request).await?;
        decode_ack(&body)
    }

    // ==================== Queries ====================

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.authenticated
    }

    /// The profile, only while authenticated.
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref().filter(|_| self.authenticated)
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.profile().map_or("", |p| p.username.as_str())
    }

    #[must_use]
    pub fn subscription(&self) -> &str {
        self.profile().map_or("", |p| p.subscription.as_str())
    }

    #[must_use]
    pub fn expiry(&self) -> &str {
        self.profile().map_or("", |p| p.expiry.as_str())
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Token issued by `init`; empty until initialized.
    #[must_use]
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            initialized: self.initialized,
            authenticated: self.authenticated,
            profile: self.profile().cloned(),
        }
    }

    // ==================== Internals ====================

    /// Starts a request carrying `hwid` and `sessionid`, or fails fast
    /// when the session was never initialized.
    fn authed_request(&self, kind: RequestKind) -> LicenseResult<FormRequest> {
        if !self.initialized {
            return Err(LicenseError::NotInitialized);
        }
        Ok(FormRequest::new(kind)
            .param("hwid", self.device_id.as_str())
            .param("sessionid", self.session_token.clone()))
    }

    /// Sends a request and returns the body of a 200 reply.
    async fn exchange(&self, request: &FormRequest) -> LicenseResult<String> {
        let reply = self.transport.post_form(request).await?;
        if !reply.is_ok() {
            return Err(LicenseError::Network(format!("HTTP status {}", reply.status)));
        }
        Ok(reply.body)
    }

    async fn authenticate(&mut self, request: FormRequest) -> LicenseResult<UserProfile> {
        let body = self.exchange(&request).await?;
        let profile = decode_profile(&body)?;
        self.authenticated = true;
        self.profile = Some(profile.clone());
        Ok(profile)
    }

    fn finish_auth(
        &self,
        kind: RequestKind,
        result: LicenseResult<UserProfile>,
        success_message: &str,
    ) -> AuthOutcome {
        match result {
            Ok(profile) => {
                info!("{} succeeded for {} ({})", kind, profile.username, profile.subscription);
                AuthOutcome::authenticated(&profile, success_message)
            }
            Err(e) => {
                warn!("{} failed: {}", kind, e);
                AuthOutcome::failure(e)
            }
        }
    }
}
