use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Loopback address for a port.
pub fn loopback_addr(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
}

/// A non-blocking UDP socket bound to `127.0.0.1`.
///
/// The socket can be duplicated with [`LoopbackSocket::try_clone`] so one
/// handle drives the receive loop while another is used for sends.
#[derive(Debug)]
pub struct LoopbackSocket {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl LoopbackSocket {
    /// Bind `127.0.0.1:port`. Port `0` asks the OS for an ephemeral port.
    ///
    /// Returns only once the OS has confirmed the bind. Never retried.
    pub fn bind(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(loopback_addr(port))
            .map_err(|source| TransportError::Bind { port, source })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::Bind { port, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| TransportError::Bind { port, source })?;

        info!(%local_addr, "bound loopback udp socket");

        Ok(Self { socket, local_addr })
    }

    /// Write one datagram to `127.0.0.1:port`.
    ///
    /// Fire-and-forget: success means the OS accepted the datagram, nothing more.
    pub fn send_to(&self, datagram: &[u8], port: u16) -> Result<usize> {
        self.send_to_addr(datagram, loopback_addr(port))
    }

    /// Write one datagram to an explicit address.
    pub fn send_to_addr(&self, datagram: &[u8], addr: SocketAddr) -> Result<usize> {
        loop {
            match self.socket.send_to(datagram, addr) {
                Ok(written) if written == datagram.len() => {
                    debug!(%addr, size = written, "sent datagram");
                    return Ok(written);
                }
                Ok(written) => {
                    return Err(TransportError::ShortWrite {
                        addr,
                        written,
                        expected: datagram.len(),
                    })
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(TransportError::Send { addr, source }),
            }
        }
    }

    /// Duplicate the underlying socket handle.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            socket: self.socket.try_clone()?,
            local_addr: self.local_addr,
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Port the socket is bound to.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Register the socket with the current tokio runtime for async receives.
    ///
    /// Must be called from within a runtime context.
    #[cfg(feature = "async")]
    pub fn into_tokio(self) -> Result<tokio::net::UdpSocket> {
        Ok(tokio::net::UdpSocket::from_std(self.socket)?)
    }
}
