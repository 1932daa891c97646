//! Live-connection table shared by the accept loop, per-peer readers and
//! broadcasts.
//!
//! All mutation goes through one `std::sync::Mutex`. The lock is never held
//! across an `.await`: broadcasts take a snapshot, write outside the lock,
//! then come back to evict failures.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio_util::sync::CancellationToken;

/// Bound on the best-effort shutdown of a peer's write half.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// One registered connection.
///
/// Cheap to clone: the write half sits behind an `Arc`, so snapshots share
/// the same transport.
#[derive(Clone)]
pub(crate) struct Peer {
    /// Distinguishes successive connections from the same address.
    pub(crate) id: u64,
    pub(crate) writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    /// Stops the peer's reader task.
    pub(crate) cancel: CancellationToken,
}

impl Peer {
    pub(crate) fn new(id: u64, writer: OwnedWriteHalf, cancel: CancellationToken) -> Self {
        Self {
            id,
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            cancel,
        }
    }

    /// Stops the reader and shuts down the write half. Errors are ignored.
    pub(crate) async fn close(&self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let mut writer = self.writer.lock().await;
            let _ = writer.shutdown().await;
        })
        .await;
    }

    /// Like [`close`](Self::close) but does not wait for it.
    pub(crate) fn close_in_background(self) {
        self.cancel.cancel();
        tokio::spawn(async move { self.close().await });
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    peers: Mutex<HashMap<SocketAddr, Peer>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, Peer>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `peer`, returning the entry it replaced (if any).
    pub(crate) fn insert(&self, addr: SocketAddr, peer: Peer) -> Option<Peer> {
        self.lock().insert(addr, peer)
    }

    /// Removes the entry for `addr` only if it is still connection `id`.
    ///
    /// Returns the removed peer.
    pub(crate) fn remove_if(&self, addr: SocketAddr, id: u64) -> Option<Peer> {
        let mut peers = self.lock();
        if peers.get(&addr).is_some_and(|p| p.id == id) {
            peers.remove(&addr)
        } else {
            None
        }
    }

    /// Consistent copy of the current entries.
    pub(crate) fn snapshot(&self) -> Vec<(SocketAddr, Peer)> {
        self.lock()
            .iter()
            .map(|(addr, peer)| (*addr, peer.clone()))
            .collect()
    }

    /// Empties the registry, handing back everything that was in it.
    pub(crate) fn drain(&self) -> Vec<Peer> {
        self.lock().drain().map(|(_, peer)| peer).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn addresses(&self) -> Vec<SocketAddr> {
        let mut addrs: Vec<SocketAddr> = self.lock().keys().copied().collect();
        addrs.sort();
        addrs
    }
}
