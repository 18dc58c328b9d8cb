#![warn(missing_docs)]

//! relaywarp-host: session broker, connection registry and event pump.

/// Session broker owning one role and its endpoint.
pub mod broker;
/// Event and state types (BrokerEvent, SessionRole, Lifecycle).
pub mod event_types;
/// Per-tick event pump and event sinks.
pub mod pump;
/// Ordered registry of host connections with two-phase removal.
pub mod registry;

pub use broker::{random_profile_name, SessionBroker};
pub use event_types::{BrokerEvent, Lifecycle, SessionRole};
pub use pump::{ChannelSink, EventSink, TickReport};
pub use registry::ConnectionRegistry;
