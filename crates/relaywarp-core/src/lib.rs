#![warn(missing_docs)]

//! relaywarp-core: foundational types shared across the workspace.
//!
//! This crate provides the vocabulary every other layer speaks:
//! - Configuration types
//! - Error handling
//! - Relay routing data, allocation ids and join codes
//! - Connection handles and their sentinel value
//! - The transport driver boundary (factory + endpoint)
//! - The identity and allocation service boundaries
//!
//! Behavior lives in the specialized crates:
//! - `relaywarp-protocol`: wire records and relay frames
//! - `relaywarp-peer`: the single outbound link of the peer role
//! - `relaywarp-host`: session broker, connection registry and event pump

/// Protocol constants shared across layers.
pub mod constants {
    /// Number of characters in a join code.
    pub const JOIN_CODE_LEN: usize = 6;
    /// Characters a relay-issued join code is drawn from.
    ///
    /// Vowels and easily confused glyphs are left out so codes read back
    /// unambiguously when shared by voice.
    pub const JOIN_CODE_ALPHABET: &[u8] = b"6789BCDFGHJKLMNPQRTWXYZ";
    /// Byte size of a text record on the wire, length prefix included.
    pub const TEXT_RECORD_SIZE: usize = 32;
    /// Maximum UTF-8 content bytes a single text record carries.
    ///
    /// 32 bytes minus the two-byte length prefix and one byte of terminator slack.
    pub const TEXT_RECORD_CAPACITY: usize = TEXT_RECORD_SIZE - 3;
    /// Peers a hosted allocation admits when the caller does not choose.
    pub const DEFAULT_MAX_PEERS: u32 = 5;
    /// Maximum length of a profile name accepted at sign-in.
    pub const MAX_PROFILE_NAME_LEN: usize = 30;
}

/// Configuration options for the session broker.
pub mod config;
/// Connection handles and their sentinel value.
pub mod connection;
/// Error types and results.
pub mod error;
/// Join codes that name a hosted allocation.
pub mod join_code;
/// Relay allocations, routing data and participant identity.
pub mod relay;
/// Identity and allocation service boundaries.
pub mod services;
/// Transport driver abstraction for pluggable relay endpoints.
pub mod transport;
