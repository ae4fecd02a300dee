//! Session runner
//!
//! Owns the [`Session`] and serializes everything that touches it: the
//! countdown tick, the status poll and panel commands arriving through a
//! [`SessionHandle`]. Timers live inside [`SessionRunner::run`] and are
//! dropped with it.

use shared::error::{AppError, AppResult};
use shared::models::{ConfigurationSnapshot, ConnectionState};
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::session::{CheckoutOutcome, ConfigEdit, Quote, Session};
use crate::pricing::Coupon;

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<AppResult<T>>;

/// Snapshot edit shipped to the runner
pub struct SnapshotEdit(Box<dyn FnOnce(&mut ConfigurationSnapshot) + Send>);

impl SnapshotEdit {
    pub fn new(edit: impl FnOnce(&mut ConfigurationSnapshot) + Send + 'static) -> Self {
        Self(Box::new(edit))
    }
}

impl fmt::Debug for SnapshotEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SnapshotEdit(..)")
    }
}

/// Panel actions forwarded to the runner
#[derive(Debug)]
pub enum SessionCommand {
    Connect(Reply<ConnectionState>),
    ManualCheck(Reply<ConnectionState>),
    Disconnect(Reply<()>),
    Restart(Reply<()>),
    ToggleAssistant(Reply<bool>),
    ToggleInstagramAssistant(Reply<bool>),
    SaveConfig(Reply<()>),
    Checkout(Reply<CheckoutOutcome>),
    Ask { message: String, reply: Reply<String> },
    ClearChatHistory(Reply<()>),
    EditConfig { edit: SnapshotEdit, reply: Reply<ConfigEdit> },
    SetOfficialApiOnly { enabled: bool, reply: Reply<ConfigEdit> },
    SetOfficialApiCoexistence { enabled: bool, reply: Reply<ConfigEdit> },
    SetExtraChannels { count: i64, reply: Reply<ConfigEdit> },
    ApplyCoupon { code: String, reply: Reply<Coupon> },
    ClearCoupon(Reply<()>),
    Quote(oneshot::Sender<Quote>),
    SetViewFocused(bool),
}

/// Cloneable sender side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> SessionCommand) -> AppResult<T> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(build(tx)).await.map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())?
    }

    pub async fn connect(&self) -> AppResult<ConnectionState> {
        self.request(SessionCommand::Connect).await
    }

    pub async fn manual_check(&self) -> AppResult<ConnectionState> {
        self.request(SessionCommand::ManualCheck).await
    }

    pub async fn disconnect(&self) -> AppResult<()> {
        self.request(SessionCommand::Disconnect).await
    }

    pub async fn restart(&self) -> AppResult<()> {
        self.request(SessionCommand::Restart).await
    }

    pub async fn toggle_assistant(&self) -> AppResult<bool> {
        self.request(SessionCommand::ToggleAssistant).await
    }

    pub async fn toggle_instagram_assistant(&self) -> AppResult<bool> {
        self.request(SessionCommand::ToggleInstagramAssistant).await
    }

    pub async fn save_config(&self) -> AppResult<()> {
        self.request(SessionCommand::SaveConfig).await
    }

    pub async fn checkout(&self) -> AppResult<CheckoutOutcome> {
        self.request(SessionCommand::Checkout).await
    }

    pub async fn ask(&self, message: impl Into<String>) -> AppResult<String> {
        let message = message.into();
        self.request(|reply| SessionCommand::Ask { message, reply })
            .await
    }

    pub async fn clear_chat_history(&self) -> AppResult<()> {
        self.request(SessionCommand::ClearChatHistory).await
    }

    /// Edit the snapshot locally; nothing is persisted until [`Self::save_config`]
    pub async fn edit_config<F>(&self, edit: F) -> AppResult<ConfigEdit>
    where
        F: FnOnce(&mut ConfigurationSnapshot) + Send + 'static,
    {
        let edit = SnapshotEdit::new(edit);
        self.request(|reply| SessionCommand::EditConfig { edit, reply })
            .await
    }

    pub async fn set_official_api_only(&self, enabled: bool) -> AppResult<ConfigEdit> {
        self.request(|reply| SessionCommand::SetOfficialApiOnly { enabled, reply })
            .await
    }

    pub async fn set_official_api_coexistence(&self, enabled: bool) -> AppResult<ConfigEdit> {
        self.request(|reply| SessionCommand::SetOfficialApiCoexistence { enabled, reply })
            .await
    }

    pub async fn set_extra_channels(&self, count: i64) -> AppResult<ConfigEdit> {
        self.request(|reply| SessionCommand::SetExtraChannels { count, reply })
            .await
    }

    pub async fn apply_coupon(&self, code: impl Into<String>) -> AppResult<Coupon> {
        let code = code.into();
        self.request(|reply| SessionCommand::ApplyCoupon { code, reply })
            .await
    }

    pub async fn clear_coupon(&self) -> AppResult<()> {
        self.request(SessionCommand::ClearCoupon).await
    }

    pub async fn quote(&self) -> AppResult<Quote> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Quote(tx))
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn set_view_focused(&self, focused: bool) -> AppResult<()> {
        self.tx
            .send(SessionCommand::SetViewFocused(focused))
            .await
            .map_err(|_| stopped())
    }
}

fn stopped() -> AppError {
    AppError::internal("Session runner is not running")
}

pub struct SessionRunner {
    session: Session,
    commands: mpsc::Receiver<SessionCommand>,
    shutdown: CancellationToken,
}

impl SessionRunner {
    pub fn new(session: Session, shutdown: CancellationToken) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let runner = Self {
            session,
            commands: rx,
            shutdown,
        };
        (runner, SessionHandle { tx })
    }

    /// Drive the session until shutdown, then hand it back
    pub async fn run(mut self) -> Session {
        let settings = self.session.settings().clone();
        let mut tick = tokio::time::interval(settings.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poll = tokio::time::interval(settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            tenant = %self.session.identity().user_id,
            tick_ms = settings.tick_interval.as_millis() as u64,
            poll_ms = settings.poll_interval.as_millis() as u64,
            "Session runner started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Session runner received shutdown signal");
                    break;
                }
                _ = tick.tick() => {
                    self.session.tick().await;
                }
                _ = poll.tick() => {
                    if self.session.connection().should_poll() {
                        self.session.poll_status().await;
                    }
                }
                Some(command) = self.commands.recv() => {
                    self.handle(command).await;
                }
            }
        }

        tracing::info!("Session runner stopped");
        self.session
    }

    async fn handle(&mut self, command: SessionCommand) {
        let session = &mut self.session;
        // A dropped receiver only means the caller stopped waiting
        match command {
            SessionCommand::Connect(reply) => {
                let _ = reply.send(session.initiate_connect().await);
            }
            SessionCommand::ManualCheck(reply) => {
                let _ = reply.send(session.manual_check().await);
            }
            SessionCommand::Disconnect(reply) => {
                let _ = reply.send(session.disconnect().await);
            }
            SessionCommand::Restart(reply) => {
                let _ = reply.send(session.restart().await);
            }
            SessionCommand::ToggleAssistant(reply) => {
                let _ = reply.send(session.toggle_assistant().await);
            }
            SessionCommand::ToggleInstagramAssistant(reply) => {
                let _ = reply.send(session.toggle_instagram_assistant().await);
            }
            SessionCommand::SaveConfig(reply) => {
                let _ = reply.send(session.save_config().await);
            }
            SessionCommand::Checkout(reply) => {
                let _ = reply.send(session.checkout().await);
            }
            SessionCommand::Ask { message, reply } => {
                let _ = reply.send(session.ask_assistant(&message).await);
            }
            SessionCommand::ClearChatHistory(reply) => {
                let _ = reply.send(session.clear_chat_history().await);
            }
            SessionCommand::EditConfig { edit, reply } => {
                let _ = reply.send(session.edit_config(edit.0));
            }
            SessionCommand::SetOfficialApiOnly { enabled, reply } => {
                let _ = reply.send(session.set_official_api_only(enabled));
            }
            SessionCommand::SetOfficialApiCoexistence { enabled, reply } => {
                let _ = reply.send(session.set_official_api_coexistence(enabled));
            }
            SessionCommand::SetExtraChannels { count, reply } => {
                let _ = reply.send(session.set_extra_channels(count));
            }
            SessionCommand::ApplyCoupon { code, reply } => {
                let _ = reply.send(session.apply_coupon(&code).map_err(AppError::from));
            }
            SessionCommand::ClearCoupon(reply) => {
                session.clear_coupon();
                let _ = reply.send(Ok(()));
            }
            SessionCommand::Quote(reply) => {
                let _ = reply.send(session.quote());
            }
            SessionCommand::SetViewFocused(focused) => {
                session.set_connection_view_focused(focused);
            }
        }
    }
}
