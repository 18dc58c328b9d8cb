#![warn(missing_docs)]

//! relaywarp-loopback: an in-process relay.
//!
//! `LoopbackRelay` implements all three collaborator boundaries a session
//! broker needs:
//! - `IdentityProvider`: anonymous sign-in with profile-name validation
//! - `AllocationService`: create/join/release with join codes and capacity limits
//! - `DriverFactory`: endpoints that exchange relay frames through per-allocation
//!   mailboxes, delivered when each endpoint runs `maintain()`
//!
//! Everything resolves immediately and deterministically, which makes it the
//! test double for the broker and the transport behind the demo. One-shot
//! faults can be injected to exercise setup rollback paths.

/// Loopback relay configuration.
pub mod config;
/// Endpoints and the factory that creates them.
pub mod endpoint;
/// Shared relay state and the identity/allocation services.
pub mod relay;

pub use config::LoopbackConfig;
pub use endpoint::{LoopbackDriverFactory, LoopbackEndpoint};
pub use relay::{Fault, LoopbackRelay};
