#![warn(missing_docs)]

//! Relaywarp: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports the types
//! needed to host or join a relay-mediated session:
//!
//! - The broker and its events (`SessionBroker`, `BrokerEvent`)
//! - Wire records and join codes (`TextRecord`, `JoinCode`)
//! - Core configuration (`Config`, `RelayProtocol`)
//! - The collaborator boundaries, and the in-process loopback relay
//!
//! Example
//! ```ignore
//! use relaywarp::{loopback_broker, BrokerEvent, Config, LoopbackRelay, TextRecord};
//!
//! let relay = LoopbackRelay::default();
//! let mut host = loopback_broker(&relay, Config::default());
//! host.authenticate("Host").await?;
//! let code = host.create_session(4).await?;
//!
//! let mut peer = loopback_broker(&relay, Config::default());
//! peer.authenticate("Guest").await?;
//! peer.join_session(code.as_str()).await?;
//!
//! loop {
//!     host.tick();
//!     peer.tick();
//!     while let Some(event) = host.recv() {
//!         if let BrokerEvent::Connected(connection) = event {
//!             host.send(connection, &TextRecord::new("welcome")?)?;
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;

// Core config, errors and collaborator boundaries
pub use relaywarp_core::{
    config::{Config, RelayProtocol},
    connection::ConnectionHandle,
    error::{AllocationError, ErrorKind, IdentityError, Result},
    join_code::JoinCode,
    relay::{AllocationId, ParticipantId, RelayServerData},
    services::{AllocationService, IdentityProvider},
    transport::{DriverFactory, Endpoint, NetworkEvent},
};
// Host: the session broker and its events
pub use relaywarp_host::{
    random_profile_name, BrokerEvent, Lifecycle, SessionBroker, SessionRole, TickReport,
};
// In-process relay
pub use relaywarp_loopback::{Fault, LoopbackConfig, LoopbackDriverFactory, LoopbackRelay};
// Peer link state
pub use relaywarp_peer::LinkState;
// Protocol: wire records
pub use relaywarp_protocol::record::TextRecord;

/// Creates a broker whose identity, allocation and transport collaborators
/// are all served by `relay`.
pub fn loopback_broker(
    relay: &LoopbackRelay,
    config: Config,
) -> SessionBroker<LoopbackDriverFactory> {
    SessionBroker::new(
        config,
        Arc::new(relay.clone()),
        Arc::new(relay.clone()),
        LoopbackDriverFactory::new(relay.clone()),
    )
}

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        loopback_broker, random_profile_name, BrokerEvent, Config, ConnectionHandle, ErrorKind,
        JoinCode, Lifecycle, LoopbackRelay, SessionBroker, SessionRole, TextRecord,
    };
}
