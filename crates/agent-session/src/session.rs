//! Connect / listen / dispatch / reconnect loop.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use linkcast_protocol::constants::READ_CHUNK_SIZE;
use linkcast_protocol::{Command, FrameDecoder};

use crate::SessionError;
use crate::dialer::{Dialer, TcpDialer};
use crate::opener::UrlOpener;
use crate::types::{ConnectionState, SessionConfig, SessionEvent};

/// One Agent's connection to the Hub.
///
/// Owns at most one transport at a time: [`listen`](Self::listen) consumes
/// the stream returned by [`connect`](Self::connect) and drops it before
/// returning, so a new dial never overlaps an open connection.
pub struct AgentSession {
    config: SessionConfig,
    opener: Arc<dyn UrlOpener>,
    dialer: Arc<dyn Dialer>,
    state: ConnectionState,
    events: Option<mpsc::Sender<SessionEvent>>,
}

impl AgentSession {
    pub fn new(config: SessionConfig, opener: impl UrlOpener) -> Self {
        Self {
            config,
            opener: Arc::new(opener),
            dialer: Arc::new(TcpDialer::default()),
            state: ConnectionState::Disconnected,
            events: None,
        }
    }

    /// Replaces the default TCP dialer.
    pub fn with_dialer(mut self, dialer: impl Dialer) -> Self {
        self.dialer = Arc::new(dialer);
        self
    }

    /// Publishes [`SessionEvent`]s to `tx`. Events are dropped if the
    /// channel is full.
    pub fn with_events(mut self, tx: mpsc::Sender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Dials the Hub until it answers.
    ///
    /// Waits `retry_interval` after each failure. With `max_retries == 0`
    /// this only returns on success; otherwise it gives up after that many
    /// attempts and leaves the session `Disconnected`.
    pub async fn connect(&mut self) -> Result<TcpStream, SessionError> {
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            self.set_state(ConnectionState::Connecting);

            let result = self.dialer.dial(&self.config.host, self.config.port).await;
            match result {
                Ok(stream) => {
                    info!(
                        host = %self.config.host,
                        port = self.config.port,
                        attempt,
                        "connected to hub"
                    );
                    self.set_state(ConnectionState::Connected);
                    return Ok(stream);
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);

                    if self.config.retries_exhausted(attempt) {
                        warn!(attempt, error = %e, "maximum connection retries reached, giving up");
                        self.emit(SessionEvent::DialFailed {
                            attempt,
                            error: e.to_string(),
                            retry_in: None,
                        });
                        return Err(SessionError::GaveUp { attempts: attempt });
                    }

                    let delay = self.config.retry_interval;
                    warn!(
                        attempt,
                        error = %e,
                        retry_in = ?delay,
                        "connection failed, retrying"
                    );
                    self.emit(SessionEvent::DialFailed {
                        attempt,
                        error: e.to_string(),
                        retry_in: Some(delay),
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Reads commands from `stream` and dispatches them in arrival order.
    ///
    /// Undecodable input is logged and skipped; only a read error or EOF
    /// ends the loop, after which the session is `Disconnected`.
    pub async fn listen(&mut self, mut stream: TcpStream) {
        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) => {
                    info!("hub closed the connection");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!("error receiving data: {e}");
                    break;
                }
            };

            for frame in decoder.push(&buf[..n]) {
                match frame {
                    Ok(command) => {
                        self.emit(SessionEvent::CommandReceived(command.clone()));
                        self.dispatch(&command).await;
                    }
                    Err(e) if e.is_unknown_action() => {
                        warn!("ignoring command: {e}");
                        self.emit(SessionEvent::Ignored(e.to_string()));
                    }
                    Err(e) => {
                        warn!("received invalid command: {e}");
                        self.emit(SessionEvent::DecodeFailed(e.to_string()));
                    }
                }
            }
        }

        drop(stream);
        self.set_state(ConnectionState::Disconnected);
    }

    /// Performs the URL opens requested by `command`.
    ///
    /// Multi-URL commands open strictly in order with `open_delay` between
    /// consecutive URLs.
    pub async fn dispatch(&self, command: &Command) {
        match command {
            Command::OpenOne { url } => {
                info!(%url, "opening URL");
                self.open(url).await;
            }
            Command::OpenMany { urls } => {
                info!(count = urls.len(), "opening multiple URLs");
                for (i, url) in urls.iter().enumerate() {
                    if i > 0 {
                        tokio::time::sleep(self.config.open_delay).await;
                    }
                    self.open(url).await;
                }
            }
        }
    }

    /// Connects, listens, and reconnects for as long as the process runs.
    ///
    /// Only returns if a bounded retry policy gives up.
    pub async fn run(&mut self) -> SessionError {
        loop {
            let stream = match self.connect().await {
                Ok(stream) => stream,
                Err(e) => return e,
            };
            info!("listening for commands");
            self.listen(stream).await;
            info!("connection lost, reconnecting");
        }
    }

    async fn open(&self, url: &str) {
        let opener = Arc::clone(&self.opener);
        let url = url.to_owned();
        if let Err(e) = tokio::task::spawn_blocking(move || opener.open(&url)).await {
            warn!("url opener panicked: {e}");
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        debug!(from = %self.state, to = %state, "session state");
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&mut self, event: SessionEvent) {
        let Some(tx) = &self.events else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("session event channel full, dropping event"),
            Err(TrySendError::Closed(_)) => {
                debug!("session event receiver dropped, no longer publishing");
                self.events = None;
            }
        }
    }
}
