//! Response decoding.
//!
//! Every reply is a JSON object with a top-level `success` flag. Decoding
//! happens in two steps: the envelope decides between rejection and
//! success, then the success payload is parsed for the fields the caller
//! needs. Garbage from the server is always [`LicenseError::Decode`], never
//! a rejection.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Message used when a rejection carries no text of its own.
const DEFAULT_REJECTION: &str = "request rejected";

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitBody {
    sessionid: String,
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    info: InfoBody,
}

#[derive(Debug, Deserialize)]
struct InfoBody {
    username: String,
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

/// One subscription attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription tier name.
    #[serde(rename = "subscription")]
    pub tier: String,
    /// Expiry as sent by the server.
    pub expiry: String,
}

/// Profile of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    /// Tier of the first subscription.
    pub subscription: String,
    /// Expiry of the first subscription.
    pub expiry: String,
    /// Every subscription the server listed, in server order.
    pub subscriptions: Vec<Subscription>,
}

impl UserProfile {
    /// Interprets the expiry as Unix seconds or a `YYYY-MM-DD` date.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_expiry(&self.expiry)
    }
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parses the envelope and turns `success=false` into a rejection.
fn check_envelope(body: &str) -> LicenseResult<Envelope> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if !envelope.success {
        let message = envelope
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
        return Err(LicenseError::Rejected(message));
    }
    Ok(envelope)
}

/// Decodes an `init` reply into its session ID.
pub fn decode_init(body: &str) -> LicenseResult<String> {
    check_envelope(body)?;
    let init: InitBody = serde_json::from_str(body)?;
    if init.sessionid.is_empty() {
        return Err(LicenseError::Decode("empty sessionid".to_string()));
    }
    Ok(init.sessionid)
}

/// Decodes a `login` or `license` reply into the user's profile.
///
/// An account without subscriptions is a decode failure.
pub fn decode_profile(body: &str) -> LicenseResult<UserProfile> {
    check_envelope(body)?;
    let ProfileBody { info } = serde_json::from_str(body)?;

    let first = info
        .subscriptions
        .first()
        .cloned()
        .ok_or_else(|| LicenseError::Decode("account has no subscriptions".to_string()))?;

    Ok(UserProfile {
        username: info.username,
        subscription: first.tier,
        expiry: first.expiry,
        subscriptions: info.subscriptions,
    })
}

/// Decodes a reply where only success matters (`register`).
///
/// Returns the server's message, if it sent one.
pub fn decode_ack(body: &str) -> LicenseResult<Option<String>> {
    let envelope = check_envelope(body)?;
    Ok(envelope.message.filter(|m| !m.is_empty()))
}
