//! Relay allocations and the routing data derived from them.
//!
//! An allocation is a rendezvous slot on a relay server. The host creates
//! one and shares its join code; each peer joins with that code and gets an
//! allocation of its own whose routing data points back at the host.

use std::{fmt, net::SocketAddr};

use uuid::Uuid;

use crate::config::RelayProtocol;

/// Stable identity assigned to a participant by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps a provider-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relay-side identifier of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(Uuid);

impl AllocationId {
    /// Generates a fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing uuid.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the raw bytes, as carried inside connection data.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Rebuilds an id from connection data bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque routing blob the relay uses to recognise one side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionData(pub [u8; 16]);

impl From<AllocationId> for ConnectionData {
    fn from(id: AllocationId) -> Self {
        ConnectionData(*id.as_bytes())
    }
}

/// Everything an endpoint needs to route datagrams through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayServerData {
    /// Address of the relay server.
    pub relay_address: SocketAddr,
    /// Allocation this endpoint speaks for.
    pub allocation_id: AllocationId,
    /// This side's connection data.
    pub connection_data: ConnectionData,
    /// The host's connection data; present only for join allocations.
    pub host_connection_data: Option<ConnectionData>,
    /// Key used to authenticate with the relay.
    pub key: Vec<u8>,
    /// Protocol the binding runs over.
    pub protocol: RelayProtocol,
}

impl RelayServerData {
    /// Returns true when routing data targets a host (join allocation).
    pub fn is_joining(&self) -> bool {
        self.host_connection_data.is_some()
    }

    /// Returns true when the binding is DTLS-secured.
    pub fn is_secure(&self) -> bool {
        self.protocol == RelayProtocol::Dtls
    }
}

/// Allocation created by the hosting participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAllocation {
    /// Relay-side id.
    pub allocation_id: AllocationId,
    /// Peers the allocation admits besides the host.
    pub capacity: u32,
    /// Routing data for the host endpoint.
    pub server_data: RelayServerData,
}

/// Allocation obtained by a peer joining with a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayJoinAllocation {
    /// Relay-side id of the peer's own allocation.
    pub allocation_id: AllocationId,
    /// Id of the host allocation that was joined.
    pub host_allocation_id: AllocationId,
    /// Routing data for the peer endpoint.
    pub server_data: RelayServerData,
}
