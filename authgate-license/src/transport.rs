//! HTTP transport for the KeyAuth API.
//!
//! Every call is a single form-encoded POST to the configured base URL.
//! There are no retries; connection, DNS, TLS and timeout failures all
//! surface as [`LicenseError::Network`].

use crate::config::ClientConfig;
use crate::error::{LicenseError, LicenseResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parameter names whose values must never appear in logs.
const SECRET_FIELDS: &[&str] = &["pass", "key", "ownerid", "sessionid"];

/// The request types understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Init,
    Login,
    License,
    Register,
}

impl RequestKind {
    /// Value sent as the `type` form field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Login => "login",
            Self::License => "license",
            Self::Register => "register",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single API request: its kind plus ordered form parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct FormRequest {
    kind: RequestKind,
    params: Vec<(&'static str, String)>,
}

impl FormRequest {
    /// Starts a request; the `type` field is emitted first.
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            params: vec![("type", kind.as_str().to_string())],
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// All parameters, including `type`, in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Looks up a parameter value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `application/x-www-form-urlencoded` body for this request.
    #[must_use]
    pub fn to_body(&self) -> String {
        encode_form(self.params.iter().map(|(k, v)| (*k, v.as_str())))
    }
}

// Secrets are redacted so requests can be traced safely.
impl fmt::Debug for FormRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.params {
            if SECRET_FIELDS.contains(name) {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

/// Percent-encodes key/value pairs into a form body.
///
/// Both keys and values are encoded, so `&`, `=`, `%`, `+` and spaces in
/// credentials survive the trip to the server intact.
pub fn encode_form<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Raw HTTP reply: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Sends form requests to the licensing API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one POST and returns the raw reply.
    ///
    /// Only transport-level failures are errors here; status handling is
    /// left to the caller.
    async fn post_form(&self, request: &FormRequest) -> LicenseResult<HttpReply>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post_form(&self, request: &FormRequest) -> LicenseResult<HttpReply> {
        (**self).post_form(request).await
    }
}

/// `reqwest`-backed transport with TLS verification and a fixed timeout.
pub struct HttpTransport {
    client: Client,
    api_url: String,
}

impl HttpTransport {
    /// Builds a transport from the client config.
    ///
    /// Unless the config opts in to plain HTTP, the client refuses any
    /// non-TLS connection, including redirects to one.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the config is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &ClientConfig) -> LicenseResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .https_only(!config.allow_insecure_http)
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LicenseError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// Endpoint every request is posted to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, request: &FormRequest) -> LicenseResult<HttpReply> {
        debug!("POST {} type={}", self.api_url, request.kind());

        let response = self
            .client
            .post(&self.api_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(request.to_body())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("{} reply: HTTP {} ({} bytes)", request.kind(), status, body.len());

        Ok(HttpReply { status, body })
    }
}
