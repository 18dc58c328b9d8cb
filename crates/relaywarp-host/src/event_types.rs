//! Event and state types for the broker layer.
//!
//! This module defines the types the broker exposes to the application:
//! - `BrokerEvent`: Events emitted to the user (sign-in, connections, data, disconnections)
//! - `SessionRole`: Which side of a relay session this broker has taken
//! - `Lifecycle`: How far session setup has progressed

use relaywarp_core::{connection::ConnectionHandle, join_code::JoinCode, relay::ParticipantId};
use relaywarp_protocol::record::TextRecord;

/// Events that can occur and are pushed through the event receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// Sign-in succeeded. Emitted once per broker.
    SignedIn(ParticipantId),
    /// Host: a connection was accepted. Peer: the host accepted our connect request.
    Connected(ConnectionHandle),
    /// A record arrived on a connection.
    Data {
        /// Connection the record arrived on.
        connection: ConnectionHandle,
        /// The decoded record.
        record: TextRecord,
    },
    /// The remote side closed the connection or timed out.
    Disconnected(ConnectionHandle),
}

/// Observable role of a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRole {
    /// No role selected yet. Also the state after a failed setup attempt.
    Uninitialized,
    /// Sign-in in flight under the given display name.
    AuthenticatingAs(String),
    /// Hosting an allocation and accepting connections.
    Hosting,
    /// Joined the allocation named by the code.
    Joining(JoinCode),
}

/// Setup progress. Moves forward only; `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Nothing has happened yet.
    Uninitialized,
    /// Sign-in in flight.
    Authenticating,
    /// Signed in, no role yet.
    Authenticated,
    /// Allocation negotiation in flight for a chosen role.
    RoleSelected,
    /// Endpoint bound (and listening or connecting); no tick has run yet.
    Bound,
    /// At least one tick has run against the bound endpoint.
    Active,
    /// Resources released. No re-entry.
    Disposed,
}
