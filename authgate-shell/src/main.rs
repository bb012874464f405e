//! authgate shell
//!
//! Front-end that stands where the login window's event handlers sit: it
//! opens a KeyAuth session on a background worker, submits one
//! authenticating request, and keeps the foreground responsive with a
//! pending indicator until the worker answers.
//!
//! Usage:
//!   authgate-shell --config authgate.toml license --key XXXX-XXXX
//!   AUTHGATE_PASSWORD=hunter2 authgate-shell login --username alice
//!
//! Secrets may come from `AUTHGATE_PASSWORD` and `AUTHGATE_KEY` instead of
//! the command line, which keeps them out of shell history and `ps`.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use authgate_license::{AuthOutcome, ClientConfig, HttpTransport, PendingAuth, Session, SessionHandle};
use clap::{Parser, Subcommand};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "authgate-shell")]
#[command(about = "Authenticate against KeyAuth before loading")]
struct Args {
    /// Path to the licensing config file
    #[arg(short, long, default_value = "authgate.toml")]
    config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with a username and password
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "AUTHGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in with a license key alone
    License {
        #[arg(short, long, env = "AUTHGATE_KEY", hide_env_values = true)]
        key: String,
    },
    /// Register a new account against a license key
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "AUTHGATE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(short, long, env = "AUTHGATE_KEY", hide_env_values = true)]
        key: String,
    },
}

impl Command {
    /// The only client-side check the login form ever made.
    fn validate(&self) -> Result<()> {
        match self {
            Self::Login { username, password } => {
                ensure!(!username.is_empty(), "username must not be empty");
                ensure!(!password.is_empty(), "password must not be empty");
            }
            Self::License { key } => {
                ensure!(!key.is_empty(), "license key must not be empty");
            }
            Self::Register {
                username,
                password,
                key,
            } => {
                ensure!(!username.is_empty(), "username must not be empty");
                ensure!(!password.is_empty(), "password must not be empty");
                ensure!(!key.is_empty(), "license key must not be empty");
            }
        }
        Ok(())
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Logging in",
            Self::License { .. } => "Checking license",
            Self::Register { .. } => "Registering",
        }
    }

    fn dispatch(&self, handle: &SessionHandle) -> PendingAuth {
        match self {
            Self::Login { username, password } => handle.login(username, password),
            Self::License { key } => handle.license_login(key),
            Self::Register {
                username,
                password,
                key,
            } => handle.register(username, password, key),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    args.command.validate()?;

    let config = ClientConfig::load_from(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let transport = HttpTransport::new(&config).context("failed to build HTTP transport")?;
    debug!("KeyAuth endpoint: {}", transport.api_url());
    let session = Session::new(config.app.clone(), transport);
    debug!("Device ID: {}", session.device_id());

    let handle = SessionHandle::spawn(session);

    let init = show_pending("Connecting", handle.initialize()).await;
    if !init.success {
        bail!("KeyAuth initialization failed: {}", init.message);
    }

    let outcome = show_pending(args.command.label(), args.command.dispatch(&handle)).await;
    report(&outcome);

    if !outcome.success {
        bail!("{}", outcome.message);
    }
    if handle.is_logged_in() {
        info!("Access granted");
    }
    Ok(())
}

/// Polls `pending` the way a frame loop would, drawing a spinner meanwhile.
async fn show_pending(label: &str, mut pending: PendingAuth) -> AuthOutcome {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut frame = 0usize;
    let mut stderr = std::io::stderr();

    let outcome = loop {
        ticker.tick().await;
        if let Some(outcome) = pending.try_take() {
            break outcome;
        }
        let _ = write!(stderr, "\r{label}... {}", SPINNER[frame % SPINNER.len()]);
        let _ = stderr.flush();
        frame += 1;
    };

    if frame > 0 {
        let _ = writeln!(stderr, "\r{label}... done");
    }
    outcome
}

fn report(outcome: &AuthOutcome) {
    println!("{}", outcome.message);
    if outcome.success && !outcome.username.is_empty() {
        println!("  user:         {}", outcome.username);
        println!("  subscription: {}", outcome.subscription);
        println!("  expires:      {}", outcome.expiry);
    }
}
