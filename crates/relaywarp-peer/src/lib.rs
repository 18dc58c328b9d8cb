#![warn(missing_docs)]

//! relaywarp-peer: the single outbound link of the peer role.

mod link;
mod link_state;

pub use link::PeerLink;
pub use link_state::LinkState;
