use std::path::Path;

use serde::{Deserialize, Serialize};
use signalmesh_tumbler::Tumbler;
use signalmesh_wire::{signal_from_name, WireConfig, HEADER_SIZE, MAX_DATAGRAM_SIZE};

use crate::error::ConfigError;
use crate::peer::{Peer, PeerDirectory};

/// Node configuration.
///
/// ```json
/// {
///   "port": 41002,
///   "peers": [{ "name": "builder", "port": 41001 }],
///   "tumbler": { "name": "inspector", "allow": ["BUILD_STARTED", 208] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Loopback port this node binds. `0` picks an ephemeral port.
    pub port: u16,
    /// Named peers, in broadcast order.
    #[serde(default)]
    pub peers: Vec<Peer>,
    /// Admission whitelist. Absent means every decoded signal is admitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumbler: Option<TumblerConfig>,
    /// Largest datagram this node will encode.
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,
    /// Drop datagrams carrying a protocol version other than ours.
    #[serde(default)]
    pub strict_version: bool,
}

/// Whitelist section of the node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TumblerConfig {
    #[serde(default = "default_tumbler_name")]
    pub name: String,
    #[serde(default)]
    pub allow: Vec<SignalRef>,
}

/// A signal given either by code or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalRef {
    Code(u16),
    Name(String),
}

impl SignalRef {
    pub fn resolve(&self) -> Result<u16, ConfigError> {
        match self {
            SignalRef::Code(code) => Ok(*code),
            SignalRef::Name(name) => {
                signal_from_name(name).ok_or_else(|| ConfigError::UnknownSignal(name.clone()))
            }
        }
    }
}

fn default_max_datagram_size() -> usize {
    MAX_DATAGRAM_SIZE
}

fn default_tumbler_name() -> String {
    "default".to_string()
}

impl MeshConfig {
    /// A config with no peers and no whitelist.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            peers: Vec::new(),
            tumbler: None,
            max_datagram_size: MAX_DATAGRAM_SIZE,
            strict_version: false,
        }
    }

    /// Add a named peer.
    pub fn with_peer(mut self, name: impl Into<String>, port: u16) -> Self {
        self.peers.push(Peer::new(name, port));
        self
    }

    /// Set the admission whitelist.
    pub fn with_tumbler(mut self, name: impl Into<String>, allow: &[u16]) -> Self {
        self.tumbler = Some(TumblerConfig {
            name: name.into(),
            allow: allow.iter().copied().map(SignalRef::Code).collect(),
        });
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check the datagram limit, peers and whitelist entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(HEADER_SIZE..=MAX_DATAGRAM_SIZE).contains(&self.max_datagram_size) {
            return Err(ConfigError::DatagramSize {
                size: self.max_datagram_size,
                min: HEADER_SIZE,
                max: MAX_DATAGRAM_SIZE,
            });
        }
        let peers = self.peer_directory()?;
        if self.port != 0 {
            if let Some(peer) = peers.iter().find(|peer| peer.port == self.port) {
                return Err(ConfigError::InvalidPeer {
                    name: peer.name.clone(),
                    reason: format!("port {} is this node's own port", self.port),
                });
            }
        }
        self.tumbler()?;
        Ok(())
    }

    /// Build the peer directory.
    pub fn peer_directory(&self) -> Result<PeerDirectory, ConfigError> {
        PeerDirectory::new(self.peers.iter().cloned())
    }

    /// Build the configured tumbler, if any.
    pub fn tumbler(&self) -> Result<Option<Tumbler>, ConfigError> {
        let Some(section) = &self.tumbler else {
            return Ok(None);
        };
        let codes = section
            .allow
            .iter()
            .map(SignalRef::resolve)
            .collect::<Result<Vec<u16>, ConfigError>>()?;
        Ok(Some(Tumbler::new(section.name.clone(), codes)))
    }

    /// Codec settings derived from this config.
    pub fn wire_config(&self) -> WireConfig {
        WireConfig {
            max_datagram_size: self.max_datagram_size,
            strict_version: self.strict_version,
        }
    }
}
