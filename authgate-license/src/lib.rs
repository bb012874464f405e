//! KeyAuth licensing client for authgate.
//!
//! This crate handles:
//! - Form-encoded POSTs to the KeyAuth API over verified TLS
//! - Decoding replies into profiles, telling rejections apart from garbage
//! - The session state machine (init, login, license login, register, logout)
//! - A device identifier sent as `hwid`
//! - A background worker so callers on a UI thread never block on the network
//!
//! # Example
//!
//! ```rust,no_run
//! use authgate_license::{AppIdentity, ClientConfig, HttpTransport, Session};
//!
//! # async fn run() -> authgate_license::LicenseResult<()> {
//! let config = ClientConfig::new(AppIdentity::new("MyApp", "owner-id", "1.0"));
//! let transport = HttpTransport::new(&config)?;
//! let mut session = Session::new(config.app.clone(), transport);
//!
//! if session.initialize().await {
//!     let outcome = session.license_login("KEY-XXXX").await;
//!     println!("{}", outcome.message);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod decode;
mod device;
mod error;
mod session;
mod transport;
mod worker;

pub use config::{
    AppIdentity, ClientConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
pub use decode::{decode_ack, decode_init, decode_profile, Subscription, UserProfile};
pub use device::DeviceId;
pub use error::{LicenseError, LicenseResult};
pub use session::{AuthOutcome, Session, SessionSnapshot};
pub use transport::{encode_form, FormRequest, HttpReply, HttpTransport, RequestKind, Transport};
pub use worker::{PendingAuth, SessionHandle};
