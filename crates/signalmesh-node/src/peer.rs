use std::collections::HashSet;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use signalmesh_transport::loopback_addr;

use crate::error::ConfigError;

/// A named node reachable on a loopback port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub name: String,
    pub port: u16,
}

impl Peer {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    /// Loopback socket address of the peer.
    pub fn addr(&self) -> SocketAddr {
        loopback_addr(self.port)
    }
}

/// Statically configured peers, read-only once built.
///
/// Lookups are linear: a mesh has a handful of peers and order matters for
/// broadcast, which visits peers in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerDirectory {
    peers: Vec<Peer>,
}

impl PeerDirectory {
    /// Build a directory, rejecting empty or duplicate names and port 0.
    pub fn new(peers: impl IntoIterator<Item = Peer>) -> Result<Self, ConfigError> {
        let peers: Vec<Peer> = peers.into_iter().collect();
        let mut seen = HashSet::with_capacity(peers.len());

        for peer in &peers {
            if peer.name.trim().is_empty() {
                return Err(ConfigError::InvalidPeer {
                    name: peer.name.clone(),
                    reason: "name must not be empty".to_string(),
                });
            }
            if peer.port == 0 {
                return Err(ConfigError::InvalidPeer {
                    name: peer.name.clone(),
                    reason: "port must be non-zero".to_string(),
                });
            }
            if !seen.insert(peer.name.as_str()) {
                return Err(ConfigError::DuplicatePeer(peer.name.clone()));
            }
        }

        Ok(Self { peers })
    }

    /// Look up a peer by name.
    pub fn get(&self, name: &str) -> Option<&Peer> {
        self.peers.iter().find(|peer| peer.name == name)
    }

    /// Find the configured name for a sender address, if any.
    pub fn name_of(&self, addr: SocketAddr) -> Option<&str> {
        if !addr.ip().is_loopback() {
            return None;
        }
        self.peers
            .iter()
            .find(|peer| peer.port == addr.port())
            .map(|peer| peer.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peer> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn unchecked(peers: Vec<Peer>) -> Self {
        Self { peers }
    }
}

impl<'a> IntoIterator for &'a PeerDirectory {
    type Item = &'a Peer;
    type IntoIter = std::slice::Iter<'a, Peer>;

    fn into_iter(self) -> Self::IntoIter {
        self.peers.iter()
    }
}
