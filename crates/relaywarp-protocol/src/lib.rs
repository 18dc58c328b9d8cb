#![warn(missing_docs)]

//! relaywarp-protocol: wire records and relay frames.

/// Frames routed between endpoints through the relay.
pub mod frame;
/// Fixed-capacity text records, one per data event.
pub mod record;

pub use frame::{FrameKind, FrameTag, RelayFrame};
pub use record::TextRecord;
