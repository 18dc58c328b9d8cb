//! Transport driver abstraction for pluggable relay endpoints.

use std::net::SocketAddr;

use crate::{connection::ConnectionHandle, error::Result, relay::RelayServerData};

/// Low-level event popped from an endpoint for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// An outbound connect attempt completed.
    Connect,
    /// A datagram arrived.
    Data(Vec<u8>),
    /// The remote side closed the link or timed out.
    Disconnect,
}

/// Creates endpoints from relay routing data.
///
/// This trait lets various drivers (a real relay client, an in-process relay,
/// a scripted test double) be plugged into the session broker without
/// coupling to a concrete implementation.
pub trait DriverFactory {
    /// Endpoint type produced by this factory.
    type Endpoint: Endpoint;

    /// Creates an unbound endpoint routed through the relay described by `server_data`.
    fn create(&mut self, server_data: &RelayServerData) -> Result<Self::Endpoint>;
}

/// Unreliable-datagram endpoint layered over a relay route.
///
/// Every method returns immediately; nothing here may block the tick.
pub trait Endpoint {
    /// Binds the endpoint to a local address.
    fn bind(&mut self, address: SocketAddr) -> Result<()>;

    /// Returns true once `bind` has succeeded and until `dispose`.
    fn is_bound(&self) -> bool;

    /// Puts a bound endpoint into listening mode so it can accept connections.
    fn listen(&mut self) -> Result<()>;

    /// Returns the next pending incoming connection, or `None` when there are no more.
    fn accept(&mut self) -> Option<ConnectionHandle>;

    /// Issues a connect request toward the host the endpoint is routed to.
    ///
    /// The returned handle starts out connecting; a [`NetworkEvent::Connect`]
    /// is popped for it once the host accepts.
    fn connect(&mut self) -> Result<ConnectionHandle>;

    /// Queues one datagram for the connection.
    fn send(&mut self, connection: ConnectionHandle, payload: &[u8]) -> Result<()>;

    /// Closes one connection from this side.
    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<()>;

    /// Pops the next event for a connection, or `None` when its queue is empty.
    fn pop_event(&mut self, connection: ConnectionHandle) -> Option<NetworkEvent>;

    /// Runs driver upkeep: keeps the relay binding alive and flushes queues.
    fn maintain(&mut self);

    /// Releases every resource held by the endpoint. Safe to call repeatedly.
    fn dispose(&mut self);
}
