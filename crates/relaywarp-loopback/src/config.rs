use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Configuration options for the in-process relay.
#[derive(Clone, Debug)]
pub struct LoopbackConfig {
    /// Address reported as the relay server in routing data.
    pub relay_address: SocketAddr,
    /// Largest peer capacity a host allocation may request.
    pub max_capacity: u32,
    /// Size in bytes of the per-allocation session key.
    pub key_size: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            relay_address: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 3478)),
            max_capacity: 100,
            key_size: 64,
        }
    }
}
