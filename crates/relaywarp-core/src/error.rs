//! Error types for session setup and transport operations.
//!
//! Setup-phase failures surface to the caller as [`ErrorKind`]. The per-tick
//! pump never produces one: transient per-connection problems are resolved
//! where they occur and only logged.

use std::{net::SocketAddr, result};

use thiserror::Error;

use crate::join_code::JoinCode;

/// Result alias used throughout relaywarp.
pub type Result<T> = result::Result<T, ErrorKind>;

/// Failures reported by an identity provider during sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The profile name was empty, too long or contained unsupported characters.
    #[error("invalid profile name {0:?}")]
    InvalidProfileName(String),
    /// The provider refused the sign-in.
    #[error("sign-in rejected: {0}")]
    Rejected(String),
    /// The provider could not be reached.
    #[error("identity service unreachable: {0}")]
    Unreachable(String),
}

/// Failures reported by a relay allocation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The join code is not well formed.
    #[error("malformed join code {0:?}")]
    InvalidJoinCode(String),
    /// No live allocation answers to the join code.
    #[error("no allocation found for join code {0}")]
    JoinCodeNotFound(JoinCode),
    /// The requested capacity is outside what the service grants.
    #[error("requested capacity {requested} outside 1..={max}")]
    CapacityExceeded {
        /// Peers the caller asked for.
        requested: u32,
        /// Largest capacity the service grants.
        max: u32,
    },
    /// The allocation has no room for another peer.
    #[error("allocation is full")]
    AllocationFull,
    /// The allocation id is unknown or already released.
    #[error("unknown allocation {0}")]
    UnknownAllocation(String),
    /// The service does not support explicit release.
    #[error("allocation release not supported by this service")]
    ReleaseUnsupported,
    /// The service could not be reached.
    #[error("allocation service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Enumeration of the ways a text record can fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodingErrorKind {
    /// Fewer bytes than the length prefix announced.
    #[error("record truncated")]
    Truncated,
    /// Length prefix larger than record capacity.
    #[error("record length exceeds capacity")]
    LengthOverflow,
    /// Content is not valid UTF-8.
    #[error("record is not valid utf-8")]
    InvalidUtf8,
    /// Relay frame tag is unknown.
    #[error("unknown frame tag")]
    FrameTag,
}

/// Top-level error for every relaywarp operation.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Authentication was rejected or the provider was unreachable.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// The relay service rejected a create, join or release request.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    /// The endpoint could not bind to its local address.
    #[error("failed to bind endpoint to {address}: {reason}")]
    Bind {
        /// Address the bind was attempted on.
        address: SocketAddr,
        /// Driver-reported cause.
        reason: String,
    },
    /// The endpoint could not enter listening mode.
    #[error("failed to listen: {0}")]
    Listen(String),
    /// The endpoint is not bound yet.
    #[error("endpoint is not bound")]
    NotBound,
    /// The connection exists but has not finished connecting.
    #[error("connection is not established")]
    NotConnected,
    /// The handle does not name a live connection on this endpoint.
    #[error("unknown connection handle")]
    UnknownConnection,
    /// Payload is larger than the configured maximum.
    #[error("payload of {size} bytes exceeds maximum of {max}")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Received or supplied bytes are not a valid record.
    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingErrorKind),
    /// A session operation requires a prior successful authentication.
    #[error("participant is not authenticated")]
    NotAuthenticated,
    /// A role is already active; roles never switch.
    #[error("a session role is already active")]
    RoleAlreadySelected,
    /// The operation belongs to the other role.
    #[error("operation not available in the current role")]
    WrongRole,
    /// The broker has been disposed.
    #[error("session broker has been disposed")]
    Disposed,
}
