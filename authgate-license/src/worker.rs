//! Background session worker.
//!
//! The UI thread must not block on the network, so the [`Session`] is moved
//! into a tokio task and driven through a command channel. The task is the
//! only writer: commands run strictly one after another, which also keeps a
//! double-clicked login from racing itself. Results come back on a oneshot
//! per command, and the latest state is published on a `watch` channel for
//! non-blocking reads.

use crate::error::LicenseError;
use crate::session::{AuthOutcome, Session, SessionSnapshot};
use crate::transport::Transport;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

type Reply = oneshot::Sender<AuthOutcome>;

enum Command {
    Initialize(Reply),
    Login {
        username: String,
        password: String,
        reply: Reply,
    },
    License {
        key: String,
        reply: Reply,
    },
    Register {
        username: String,
        password: String,
        key: String,
        reply: Reply,
    },
    Logout(Reply),
}

/// Cloneable handle to a session running on a background task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionSnapshot>,
    in_flight: Arc<AtomicUsize>,
}

impl SessionHandle {
    /// Moves `session` onto a new tokio task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T>(session: Session<T>) -> Self
    where
        T: Transport + 'static,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(session.snapshot());
        let in_flight = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run(session, rx, state_tx, Arc::clone(&in_flight)));

        Self {
            commands,
            state,
            in_flight,
        }
    }

    pub fn initialize(&self) -> PendingAuth {
        self.submit(Command::Initialize)
    }

    pub fn login(&self, username: &str, password: &str) -> PendingAuth {
        let (username, password) = (username.to_string(), password.to_string());
        self.submit(|reply| Command::Login {
            username,
            password,
            reply,
        })
    }

    pub fn license_login(&self, key: &str) -> PendingAuth {
        let key = key.to_string();
        self.submit(|reply| Command::License { key, reply })
    }

    pub fn register(&self, username: &str, password: &str, key: &str) -> PendingAuth {
        let (username, password, key) = (username.to_string(), password.to_string(), key.to_string());
        self.submit(|reply| Command::Register {
            username,
            password,
            key,
            reply,
        })
    }

    /// Queues a logout behind any pending commands.
    pub fn logout(&self) -> PendingAuth {
        self.submit(Command::Logout)
    }

    /// Latest published session state. Never blocks.
    #[must_use]
    pub fn state(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().authenticated
    }

    /// True while any command is queued or running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn submit(&self, make: impl FnOnce(Reply) -> Command) -> PendingAuth {
        let (reply, rx) = oneshot::channel();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.commands.send(make(reply)).is_err() {
            // The rejected command owns the reply sender, so `rx` is closed.
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        PendingAuth { rx: Some(rx) }
    }
}

/// A result that is still being computed by the worker.
#[derive(Debug)]
pub struct PendingAuth {
    rx: Option<oneshot::Receiver<AuthOutcome>>,
}

impl PendingAuth {
    /// Returns the outcome if it is ready, without blocking.
    ///
    /// Yields `Some` exactly once; later calls return `None`.
    pub fn try_take(&mut self) -> Option<AuthOutcome> {
        let rx = self.rx.as_mut()?;
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => AuthOutcome::failure(LicenseError::WorkerClosed),
        };
        self.rx = None;
        Some(outcome)
    }

    /// True once the outcome has been taken.
    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.rx.is_none()
    }

    /// Waits for the outcome.
    pub async fn wait(mut self) -> AuthOutcome {
        match self.rx.take() {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| AuthOutcome::failure(LicenseError::WorkerClosed)),
            None => AuthOutcome::failure(LicenseError::WorkerClosed),
        }
    }
}

async fn run<T: Transport>(
    mut session: Session<T>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<SessionSnapshot>,
    in_flight: Arc<AtomicUsize>,
) {
    while let Some(command) = commands.recv().await {
        let (outcome, reply) = apply(&mut session, command).await;

        // Publish state before replying so the caller never sees a result
        // ahead of the state it produced.
        state.send_replace(session.snapshot());
        in_flight.fetch_sub(1, Ordering::SeqCst);

        // The caller may have dropped its PendingAuth.
        let _ = reply.send(outcome);
    }
    debug!("Session worker stopped: all handles dropped");
}

async fn apply<T: Transport>(session: &mut Session<T>, command: Command) -> (AuthOutcome, Reply) {
    match command {
        Command::Initialize(reply) => {
            let outcome = match session.try_initialize().await {
                Ok(()) => AuthOutcome::acknowledged("KeyAuth initialized"),
                Err(e) => {
                    warn!("KeyAuth initialization failed: {}", e);
                    AuthOutcome::failure(e)
                }
            };
            (outcome, reply)
        }
        Command::Login {
            username,
            password,
            reply,
        } => (session.login(&username, &password).await, reply),
        Command::License { key, reply } => (session.license_login(&key).await, reply),
        Command::Register {
            username,
            password,
            key,
            reply,
        } => (session.register(&username, &password, &key).await, reply),
        Command::Logout(reply) => {
            session.logout();
            (AuthOutcome::acknowledged("Logged out"), reply)
        }
    }
}
