use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::api::TicketSource;
use crate::config::ClientConfig;
use crate::error::{DeskError, Result};
use crate::model::RealtimeEvent;
use crate::notify::Notifier;
use crate::realtime::connector::{FrameStream, RealtimeConnector};
use crate::realtime::dispatch::EventDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Disconnected => write!(f, "disconnected"),
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Connected => write!(f, "connected"),
        }
    }
}

/// Single realtime connection with fixed-interval reconnect.
///
/// Each attempt first obtains a one-time ticket over REST and only then
/// opens the socket with `?ticket=` in the URL, so the bearer token never
/// ends up in a URL. Attempts repeat every `reconnect_interval` for as long
/// as the channel runs. There is no backoff and no retry cap.
pub struct RealtimeChannel {
    realtime_url: String,
    reconnect_interval: Duration,
    notice_after: u32,
    tickets: Arc<dyn TicketSource>,
    connector: Arc<dyn RealtimeConnector>,
    dispatcher: Arc<EventDispatcher>,
    notifier: Notifier,
    state: watch::Sender<ChannelState>,
}

impl RealtimeChannel {
    pub fn new(
        config: &ClientConfig,
        tickets: Arc<dyn TicketSource>,
        connector: Arc<dyn RealtimeConnector>,
        dispatcher: Arc<EventDispatcher>,
        notifier: Notifier,
    ) -> Self {
        let (state, _rx) = watch::channel(ChannelState::Disconnected);
        Self {
            realtime_url: config.realtime_url.clone(),
            reconnect_interval: config.reconnect_interval(),
            notice_after: config.reconnect_notice_after,
            tickets,
            connector,
            dispatcher,
            notifier,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// The realtime URL with `ticket` appended as a query parameter.
    pub fn connection_url(&self, ticket: &str) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.realtime_url).map_err(|e| {
            DeskError::Config(format!("invalid realtime url {}: {}", self.realtime_url, e))
        })?;
        url.query_pairs_mut().append_pair("ticket", ticket);
        Ok(url.to_string())
    }

    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Connect, pump events, reconnect; until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut failures: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.set_state(ChannelState::Connecting);
            match self.open().await {
                Ok(frames) => {
                    self.set_state(ChannelState::Connected);
                    if failures >= self.notice_after {
                        self.notifier.info("Live updates restored.");
                    }
                    failures = 0;
                    tracing::info!("Realtime channel connected");

                    let stopped = self.pump(frames, &shutdown).await;
                    self.set_state(ChannelState::Disconnected);
                    if stopped {
                        break;
                    }
                    tracing::info!(
                        retry_ms = self.reconnect_interval.as_millis() as u64,
                        "Realtime channel closed, reconnecting"
                    );
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    self.set_state(ChannelState::Disconnected);
                    tracing::warn!(
                        attempt = failures,
                        retry_ms = self.reconnect_interval.as_millis() as u64,
                        error = %e,
                        "Realtime connection attempt failed"
                    );
                    if failures == self.notice_after {
                        self.notifier
                            .warning("Live updates are unavailable. Still trying to reconnect.");
                    }
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.reconnect_interval) => {}
            }
        }

        self.set_state(ChannelState::Disconnected);
        tracing::info!("Realtime channel stopped");
    }

    /// Ticket first, then socket. No ticket means no connect attempt.
    async fn open(&self) -> Result<FrameStream> {
        let ticket = self.tickets.issue_realtime_ticket().await?;
        let url = self.connection_url(&ticket)?;
        self.connector.connect(&url).await
    }

    /// Feed frames to the dispatcher. Returns true when stopped by
    /// `shutdown`, false when the connection ended.
    async fn pump(&self, mut frames: FrameStream, shutdown: &CancellationToken) -> bool {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return true,
                frame = frames.next() => {
                    match frame {
                        Some(Ok(text)) => match RealtimeEvent::parse(&text) {
                            Ok(event) => {
                                self.dispatcher.dispatch(event).await;
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Malformed realtime frame skipped");
                            }
                        },
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Realtime connection error");
                            return false;
                        }
                        None => return false,
                    }
                }
            }
        }
    }

    fn set_state(&self, state: ChannelState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Realtime state changed");
        }
    }
}
