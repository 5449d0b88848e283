use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use signalmesh_transport::LoopbackSocket;
use signalmesh_tumbler::Tumbler;
use signalmesh_wire::{decode_with_config, signal_name, Message, WireConfig};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::admission::Admission;
use crate::config::MeshConfig;
use crate::dispatch::{HandlerResult, SignalDispatcher};
use crate::error::{MeshError, Result, SendError};
use crate::peer::PeerDirectory;
use crate::sender::{BroadcastReport, MeshSender};
use crate::stats::{Counters, MeshStats};

/// Receive buffer; covers the largest IPv4 UDP payload.
const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Lifecycle of a [`MeshSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SocketState {
    Unbound,
    Starting,
    Listening,
    Stopped,
    /// The receive loop hit a fatal socket error.
    Failed,
}

impl std::fmt::Display for SocketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SocketState::Unbound => "unbound",
            SocketState::Starting => "starting",
            SocketState::Listening => "listening",
            SocketState::Stopped => "stopped",
            SocketState::Failed => "failed",
        };
        f.write_str(name)
    }
}

enum Registry {
    Open(SignalDispatcher),
    Frozen(Arc<SignalDispatcher>),
}

/// One mesh node: a loopback UDP port, its peers, and its handlers.
///
/// Register handlers, then [`start`](Self::start). The handler registry is
/// frozen at start; later registrations fail with
/// [`MeshError::RegistryFrozen`].
pub struct MeshSocket {
    port: u16,
    wire: WireConfig,
    peers: Arc<PeerDirectory>,
    registry: Registry,
    admission: Admission,
    sender: MeshSender,
    counters: Arc<Counters>,
    state: Arc<watch::Sender<SocketState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl MeshSocket {
    /// Build a socket from config with an empty handler registry.
    pub fn new(config: MeshConfig) -> Result<Self> {
        Self::with_dispatcher(config, SignalDispatcher::new())
    }

    /// Build a socket around an already-populated handler registry.
    pub fn with_dispatcher(config: MeshConfig, dispatcher: SignalDispatcher) -> Result<Self> {
        config.validate()?;
        let peers = Arc::new(config.peer_directory()?);
        let wire = config.wire_config();
        let counters = Arc::new(Counters::default());
        let tumbler = config.tumbler()?.map(Arc::new);
        let (state, _) = watch::channel(SocketState::Unbound);

        Ok(Self {
            port: config.port,
            wire,
            sender: MeshSender::new(Arc::clone(&peers), wire, Arc::clone(&counters)),
            peers,
            registry: Registry::Open(dispatcher),
            admission: Admission {
                tumbler,
                ..Admission::default()
            },
            counters,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            task: None,
            local_addr: None,
        })
    }

    /// Gate dispatch on a whitelist, replacing any configured one.
    pub fn with_tumbler(mut self, tumbler: Arc<Tumbler>) -> Self {
        self.admission.tumbler = Some(tumbler);
        self
    }

    /// Validate payloads against per-signal schemas before dispatch.
    #[cfg(feature = "schema")]
    pub fn with_schema_registry(
        mut self,
        registry: Arc<signalmesh_schema::SchemaRegistry>,
    ) -> Self {
        self.admission.schema = Some(registry);
        self
    }

    /// Append a handler for one signal. Fails once the socket has started.
    pub fn on<F>(&mut self, signal: u16, handler: F) -> Result<&mut Self>
    where
        F: Fn(&Message, SocketAddr) -> HandlerResult + Send + Sync + 'static,
    {
        self.open_registry()?.on(signal, handler);
        Ok(self)
    }

    /// Append a global observer. Fails once the socket has started.
    pub fn on_any<F>(&mut self, handler: F) -> Result<&mut Self>
    where
        F: Fn(&Message, SocketAddr) -> HandlerResult + Send + Sync + 'static,
    {
        self.open_registry()?.on_any(handler);
        Ok(self)
    }

    fn open_registry(&mut self) -> Result<&mut SignalDispatcher> {
        match &mut self.registry {
            Registry::Open(dispatcher) => Ok(dispatcher),
            Registry::Frozen(_) => Err(MeshError::RegistryFrozen),
        }
    }

    /// Bind the port and spawn the receive loop.
    ///
    /// Returns once the OS has confirmed the bind. A bind failure is returned
    /// as [`MeshError::Bind`], never retried, and leaves the socket `Unbound`
    /// so the owner can decide whether to run without mesh connectivity.
    /// Must be called from within a tokio runtime.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let current = self.state();
        if current != SocketState::Unbound {
            return Err(MeshError::InvalidState(current));
        }
        self.state.send_replace(SocketState::Starting);

        let (recv_socket, send_socket) = match bind_halves(self.port) {
            Ok(halves) => halves,
            Err(err) => {
                self.state.send_replace(SocketState::Unbound);
                error!(port = self.port, error = %err, "mesh socket failed to start");
                return Err(err);
            }
        };
        let local_addr = send_socket.local_addr();

        let dispatcher = match std::mem::replace(
            &mut self.registry,
            Registry::Frozen(Arc::new(SignalDispatcher::new())),
        ) {
            Registry::Open(dispatcher) => Arc::new(dispatcher),
            Registry::Frozen(dispatcher) => dispatcher,
        };
        self.registry = Registry::Frozen(Arc::clone(&dispatcher));
        self.sender.bind(send_socket);

        let receiver = Receiver {
            dispatcher,
            admission: self.admission.clone(),
            wire: self.wire,
            counters: Arc::clone(&self.counters),
            state: Arc::clone(&self.state),
            sender: self.sender.clone(),
            cancel: self.cancel.clone(),
        };
        self.task = Some(tokio::spawn(receiver.run(recv_socket)));
        self.local_addr = Some(local_addr);
        self.state.send_replace(SocketState::Listening);

        info!(
            %local_addr,
            peers = self.peers.len(),
            whitelist = self.admission.tumbler.as_ref().map(|t| t.name()),
            "mesh socket listening"
        );
        Ok(local_addr)
    }

    /// Stop receiving and release the socket. Safe from any state, idempotent.
    ///
    /// The receive task winds down asynchronously; use
    /// [`shutdown`](Self::shutdown) to also wait for the port to be released.
    pub fn stop(&mut self) {
        if self.state() == SocketState::Stopped {
            return;
        }
        self.cancel.cancel();
        let released = self.sender.release();
        self.state.send_replace(SocketState::Stopped);
        info!(port = self.port, released, "mesh socket stopped");
    }

    /// Stop and wait for the receive task to exit.
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "receive task ended abnormally");
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SocketState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions, including a fatal receive error.
    pub fn subscribe(&self) -> watch::Receiver<SocketState> {
        self.state.subscribe()
    }

    /// Address bound by the last successful `start()`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Cloneable send handle, usable from handlers.
    pub fn sender(&self) -> MeshSender {
        self.sender.clone()
    }

    /// Encode and write one datagram to `127.0.0.1:port`.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        signal: u16,
        payload: &T,
        port: u16,
    ) -> std::result::Result<(), SendError> {
        self.sender.send(signal, payload, port)
    }

    /// Send to a named peer; `false` when the name is not configured.
    pub fn send_to_peer<T: Serialize + ?Sized>(&self, name: &str, signal: u16, payload: &T) -> bool {
        self.sender.send_to_peer(name, signal, payload)
    }

    /// Send to every configured peer.
    pub fn broadcast<T: Serialize + ?Sized>(&self, signal: u16, payload: &T) -> BroadcastReport {
        self.sender.broadcast(signal, payload)
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    /// The admission whitelist, if one is attached.
    pub fn tumbler(&self) -> Option<&Arc<Tumbler>> {
        self.admission.tumbler.as_ref()
    }

    pub fn stats(&self) -> MeshStats {
        self.counters.snapshot()
    }
}

impl Drop for MeshSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.sender.release();
    }
}

impl std::fmt::Debug for MeshSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshSocket")
            .field("port", &self.port)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr)
            .field("peers", &self.peers.len())
            .finish()
    }
}

fn bind_halves(port: u16) -> Result<(UdpSocket, LoopbackSocket)> {
    let socket = LoopbackSocket::bind(port).map_err(MeshError::Bind)?;
    let send_half = socket.try_clone()?;
    let recv_half = socket.into_tokio()?;
    Ok((recv_half, send_half))
}

/// Errors after which the socket is still usable.
fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionRefused
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}

struct Receiver {
    dispatcher: Arc<SignalDispatcher>,
    admission: Admission,
    wire: WireConfig,
    counters: Arc<Counters>,
    state: Arc<watch::Sender<SocketState>>,
    sender: MeshSender,
    cancel: CancellationToken,
}

impl Receiver {
    async fn run(self, socket: UdpSocket) {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => match result {
                    Ok((len, from)) => self.handle_datagram(&buf[..len], from),
                    Err(err) => {
                        if !self.handle_receive_error(&err) {
                            return;
                        }
                    }
                },
            }
        }

        debug!("receive loop exited");
    }

    /// Returns `false` when the loop must exit.
    fn handle_receive_error(&self, err: &std::io::Error) -> bool {
        if is_transient(err.kind()) {
            debug!(error = %err, "transient receive error");
            return true;
        }
        error!(error = %err, "fatal receive error; mesh socket no longer listening");
        self.sender.release();
        self.state.send_replace(SocketState::Failed);
        false
    }

    fn handle_datagram(&self, datagram: &[u8], from: SocketAddr) {
        self.counters.received();

        let message = match decode_with_config(datagram, &self.wire) {
            Ok(message) => message,
            Err(err) => {
                self.counters.decode_failure();
                warn!(%from, size = datagram.len(), error = %err, "dropping undecodable datagram");
                return;
            }
        };

        if let Err(rejection) = self.admission.admit(&message) {
            self.counters.rejected();
            debug!(
                %from,
                signal = message.signal,
                signal_name = signal_name(message.signal),
                reason = %rejection,
                "dropping unadmitted message"
            );
            return;
        }

        let outcome = self.dispatcher.dispatch(&message, from);
        self.counters.dispatched(outcome.failures());
    }
}
