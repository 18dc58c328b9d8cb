use std::{
    default::Default,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
};

use crate::constants::{DEFAULT_MAX_PEERS, TEXT_RECORD_SIZE};

/// Transport protocol the relay binding is negotiated over.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum RelayProtocol {
    /// Plain UDP to the relay.
    #[default]
    Udp,
    /// DTLS-secured UDP to the relay.
    Dtls,
}

impl RelayProtocol {
    /// Returns the connection type name relay services expect.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayProtocol::Udp => "udp",
            RelayProtocol::Dtls => "dtls",
        }
    }
}

#[derive(Clone, Debug)]
/// Configuration options to tune session setup and the per-tick pump.
pub struct Config {
    /// Local address endpoints bind to. Defaults to the IPv4 wildcard with an ephemeral port.
    pub bind_address: SocketAddr,
    /// Peers a hosted session admits when `create_session` is given zero.
    pub default_max_peers: u32,
    /// Transport protocol requested from the relay.
    pub relay_protocol: RelayProtocol,
    /// Max payload size in bytes accepted by `send` and `broadcast`.
    pub max_payload_size: usize,
    /// Initial capacity reserved for the host connection registry.
    pub registry_capacity_hint: usize,
    /// Release the held relay allocation during `shutdown` (default: true).
    /// When false the allocation is left to expire server-side.
    pub release_on_shutdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            default_max_peers: DEFAULT_MAX_PEERS,
            relay_protocol: RelayProtocol::Udp,
            max_payload_size: TEXT_RECORD_SIZE,
            registry_capacity_hint: DEFAULT_MAX_PEERS as usize,
            release_on_shutdown: true,
        }
    }
}
