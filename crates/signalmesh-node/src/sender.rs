use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use signalmesh_transport::LoopbackSocket;
use signalmesh_wire::{encode_with_config, signal_name, WireConfig};
use tracing::{debug, warn};

use crate::error::SendError;
use crate::peer::PeerDirectory;
use crate::stats::Counters;

/// Outcome of a broadcast: which peers got a datagram written to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

impl BroadcastReport {
    /// True when every configured peer was written to.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Cloneable send handle for a mesh socket.
///
/// Sends are synchronous non-blocking writes, so handlers can emit signals
/// directly from the receive loop. Before the socket starts, and after it
/// stops, every send fails with [`SendError::NotBound`].
#[derive(Debug, Clone)]
pub struct MeshSender {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    socket: RwLock<Option<LoopbackSocket>>,
    peers: Arc<PeerDirectory>,
    wire: WireConfig,
    counters: Arc<Counters>,
}

impl MeshSender {
    pub(crate) fn new(peers: Arc<PeerDirectory>, wire: WireConfig, counters: Arc<Counters>) -> Self {
        Self {
            inner: Arc::new(Inner {
                socket: RwLock::new(None),
                peers,
                wire,
                counters,
            }),
        }
    }

    pub(crate) fn bind(&self, socket: LoopbackSocket) {
        *self
            .inner
            .socket
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(socket);
    }

    /// Drop the send handle. Returns `true` only for the call that released it.
    pub(crate) fn release(&self) -> bool {
        self.inner
            .socket
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Whether sends can currently reach the OS.
    pub fn is_bound(&self) -> bool {
        self.inner
            .socket
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Configured peers.
    pub fn peers(&self) -> &PeerDirectory {
        &self.inner.peers
    }

    /// Encode and write one datagram to `127.0.0.1:port`. No retry.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        signal: u16,
        payload: &T,
        port: u16,
    ) -> Result<(), SendError> {
        let result = match encode_with_config(signal, payload, &self.inner.wire) {
            Ok(datagram) => self.write(&datagram, port),
            Err(err) => {
                self.inner.counters.send_failure();
                Err(SendError::from(err))
            }
        };

        if let Err(err) = &result {
            warn!(
                signal,
                signal_name = signal_name(signal),
                port,
                error = %err,
                "send failed"
            );
        }
        result
    }

    /// Send to a named peer. Returns `false`, without writing, when the name
    /// is not configured. A failed write is logged and still returns `true`.
    pub fn send_to_peer<T: Serialize + ?Sized>(&self, name: &str, signal: u16, payload: &T) -> bool {
        let Some(peer) = self.inner.peers.get(name) else {
            warn!(
                peer = name,
                signal,
                signal_name = signal_name(signal),
                "unknown peer; nothing sent"
            );
            return false;
        };
        let _ = self.send(signal, payload, peer.port);
        true
    }

    /// Send to every configured peer. One peer failing does not stop the rest.
    pub fn broadcast<T: Serialize + ?Sized>(&self, signal: u16, payload: &T) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let datagram = match encode_with_config(signal, payload, &self.inner.wire) {
            Ok(datagram) => datagram,
            Err(err) => {
                warn!(signal, error = %err, "broadcast payload did not encode");
                for peer in self.inner.peers.iter() {
                    self.inner.counters.send_failure();
                    report.failed.push(peer.name.clone());
                }
                return report;
            }
        };

        for peer in self.inner.peers.iter() {
            match self.write(&datagram, peer.port) {
                Ok(()) => report.delivered.push(peer.name.clone()),
                Err(err) => {
                    warn!(
                        peer = %peer.name,
                        port = peer.port,
                        signal,
                        error = %err,
                        "broadcast to peer failed"
                    );
                    report.failed.push(peer.name.clone());
                }
            }
        }

        debug!(
            signal,
            signal_name = signal_name(signal),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "broadcast complete"
        );
        report
    }

    fn write(&self, datagram: &[u8], port: u16) -> Result<(), SendError> {
        let guard = self
            .inner
            .socket
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let result = match guard.as_ref() {
            Some(socket) => socket
                .send_to(datagram, port)
                .map(|_| ())
                .map_err(SendError::from),
            None => Err(SendError::NotBound),
        };

        match &result {
            Ok(()) => self.inner.counters.sent(),
            Err(_) => self.inner.counters.send_failure(),
        }
        result
    }
}
