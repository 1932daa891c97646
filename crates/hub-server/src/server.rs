//! The Hub: listener, accept loop, per-peer readers and broadcast.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use linkcast_protocol::Command;
use linkcast_protocol::constants::{
    DEFAULT_BIND, DEFAULT_PORT, LISTEN_BACKLOG, PEER_READ_SIZE, WRITE_TIMEOUT,
};

use crate::HubError;
use crate::event::{HubEvent, LogSink};
use crate::registry::{Peer, Registry};

/// Pause after a failed `accept` so persistent errors (EMFILE) do not spin.
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(50);

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address to bind (all interfaces by default).
    pub bind: IpAddr,
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// Upper bound for one write to one peer during a broadcast.
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            port: DEFAULT_PORT,
            write_timeout: WRITE_TIMEOUT,
        }
    }
}

/// Result of [`Hub::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    pub local_addr: SocketAddr,
    /// `true` if the Hub was already running and nothing was bound.
    pub already_running: bool,
}

/// Result of [`Hub::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopped {
    pub was_running: bool,
    /// Connections closed by this call.
    pub closed: usize,
}

/// Per-broadcast delivery accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub succeeded: usize,
    pub failed: usize,
}

struct Running {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
}

/// The controller Hub.
///
/// Owns the listening socket and the registry of connected Agents.
pub struct Hub {
    config: RwLock<HubConfig>,
    registry: Registry,
    /// Serializes start/stop; `Some` while running.
    running: Mutex<Option<Running>>,
    log_sink: RwLock<Option<LogSink>>,
    next_peer_id: AtomicU64,
}

impl Hub {
    /// Creates a stopped Hub.
    pub fn new(config: HubConfig) -> Arc<Self> {
        Arc::new(Self {
            config: RwLock::new(config),
            registry: Registry::default(),
            running: Mutex::new(None),
            log_sink: RwLock::new(None),
            next_peer_id: AtomicU64::new(1),
        })
    }

    /// Installs the callback receiving every [`HubEvent`], replacing any
    /// previous one.
    pub fn on_log<F>(&self, callback: F)
    where
        F: Fn(&HubEvent) + Send + Sync + 'static,
    {
        let mut sink = self.log_sink.write().unwrap_or_else(PoisonError::into_inner);
        *sink = Some(Arc::new(callback));
    }

    /// Returns a copy of the current configuration.
    pub fn config(&self) -> HubConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Changes the address used by the next [`start`](Self::start).
    ///
    /// Has no effect on a running listener; see [`restart`](Self::restart).
    pub fn set_address(&self, bind: IpAddr, port: u16) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.bind = bind;
        config.port = port;
    }

    /// Number of currently registered Agents.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Addresses of the registered Agents, sorted.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.registry.addresses()
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Address the listener is bound to, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Binds the listener and spawns the accept loop.
    ///
    /// Calling this while running is a no-op that reports the existing
    /// listener. Bind failures are returned, not retried.
    pub async fn start(self: &Arc<Self>) -> Result<Started, HubError> {
        let mut running = self.running.lock().await;
        if let Some(r) = running.as_ref() {
            return Ok(Started {
                local_addr: r.local_addr,
                already_running: true,
            });
        }

        let config = self.config();
        let addr = SocketAddr::new(config.bind, config.port);
        let listener = bind_listener(addr).map_err(|source| HubError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let cancel = CancellationToken::new();
        let accept_task = tokio::spawn(Arc::clone(self).accept_loop(listener, cancel.clone()));

        *running = Some(Running {
            local_addr,
            cancel,
            accept_task,
        });
        drop(running);

        self.emit(HubEvent::Started { addr: local_addr });
        Ok(Started {
            local_addr,
            already_running: false,
        })
    }

    /// Stops accepting, closes every registered connection (best-effort) and
    /// releases the listening socket. Idempotent.
    pub async fn stop(&self) -> Stopped {
        let mut guard = self.running.lock().await;
        let Some(running) = guard.take() else {
            return Stopped {
                was_running: false,
                closed: 0,
            };
        };

        running.cancel.cancel();

        // The accept task owns the listener; once it returns the port is free
        // and no further peers can be registered.
        if let Err(e) = running.accept_task.await {
            tracing::error!("accept task failed: {e}");
        }

        let peers = self.registry.drain();
        let closed = peers.len();
        join_all(peers.iter().map(|p| p.close())).await;

        self.emit(HubEvent::Stopped { closed });
        Stopped {
            was_running: true,
            closed,
        }
    }

    /// Records `bind:port` as the configured address, then [`start`](Self::start)s.
    ///
    /// On a running Hub the new address only takes effect on the next start.
    pub async fn start_on(self: &Arc<Self>, bind: IpAddr, port: u16) -> Result<Started, HubError> {
        self.set_address(bind, port);
        self.start().await
    }

    /// Stops and starts again, picking up any [`set_address`](Self::set_address)
    /// change.
    pub async fn restart(self: &Arc<Self>) -> Result<Started, HubError> {
        self.stop().await;
        self.start().await
    }

    /// Sends `command` to every registered Agent.
    ///
    /// Writes run concurrently against a snapshot of the registry, each bounded
    /// by the configured write timeout. Any peer whose write fails or times out
    /// is removed and closed; it has to dial back in to rejoin.
    pub async fn broadcast(&self, command: &Command) -> Result<BroadcastReport, HubError> {
        let payload = linkcast_protocol::encode(command)?;
        let timeout = self.config().write_timeout;
        let peers = self.registry.snapshot();

        let results = join_all(peers.into_iter().map(|(addr, peer)| {
            let payload = &payload;
            async move {
                let result = write_peer(&peer, payload, timeout).await;
                (addr, peer, result)
            }
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (addr, peer, result) in results {
            match result {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    if let Some(removed) = self.registry.remove_if(addr, peer.id) {
                        removed.close_in_background();
                    }
                    self.emit(HubEvent::WriteFailed {
                        addr,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.emit(HubEvent::Broadcast {
            action: command.action(),
            succeeded: report.succeeded,
            failed: report.failed,
        });
        Ok(report)
    }

    fn emit(&self, event: HubEvent) {
        event.trace();
        let sink = self
            .log_sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink(&event);
        }
    }

    /// Accepts connections until `cancel` fires. Dropping the listener on
    /// return closes the socket.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("accept loop stopping");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => self.register(stream, peer_addr, &cancel),
                        Err(e) => {
                            self.emit(HubEvent::AcceptFailed { reason: e.to_string() });
                            tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                        }
                    }
                }
            }
        }
    }

    /// Inserts (or replaces) the registry entry and spawns the peer's reader.
    fn register(
        self: &Arc<Self>,
        stream: TcpStream,
        addr: SocketAddr,
        server_cancel: &CancellationToken,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %addr, "set_nodelay failed: {e}");
        }

        let (reader, writer) = stream.into_split();
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        let cancel = server_cancel.child_token();

        let peer = Peer::new(id, writer, cancel.clone());
        match self.registry.insert(addr, peer) {
            Some(old) => {
                old.close_in_background();
                self.emit(HubEvent::PeerReplaced { addr });
            }
            None => self.emit(HubEvent::PeerConnected { addr }),
        }

        tokio::spawn(Arc::clone(self).read_peer(addr, id, reader, cancel));
    }

    /// Watches one peer for disconnection.
    ///
    /// Inbound bytes are informational only; they are logged and discarded.
    async fn read_peer(
        self: Arc<Self>,
        addr: SocketAddr,
        id: u64,
        mut reader: OwnedReadHalf,
        cancel: CancellationToken,
    ) {
        let mut buf = vec![0u8; PEER_READ_SIZE];
        loop {
            tokio::select! {
                // Whoever cancelled already took the entry out.
                _ = cancel.cancelled() => return,

                result = reader.read(&mut buf) => {
                    match result {
                        Ok(0) => break,
                        Ok(n) => {
                            let text = String::from_utf8_lossy(&buf[..n]).trim_end().to_string();
                            self.emit(HubEvent::PeerMessage { addr, text });
                        }
                        Err(e) => {
                            tracing::debug!(peer = %addr, "read error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        if let Some(peer) = self.registry.remove_if(addr, id) {
            peer.close().await;
            self.emit(HubEvent::PeerDisconnected { addr });
        }
    }
}

/// Binds with `SO_REUSEADDR` and the configured backlog.
fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

async fn write_peer(peer: &Peer, payload: &[u8], timeout: Duration) -> std::io::Result<()> {
    let write = async {
        let mut writer = peer.writer.lock().await;
        writer.write_all(payload).await?;
        writer.flush().await
    };
    match tokio::time::timeout(timeout, write).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "write timed out",
        )),
    }
}
