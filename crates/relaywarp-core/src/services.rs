//! Identity and allocation service boundaries.
//!
//! Both services sit behind the network, so their operations are async.
//! Implementations must be cancellation-tolerant: the broker never resumes a
//! dropped request, it starts a new one.

use async_trait::async_trait;

use crate::{
    error::{AllocationError, IdentityError},
    join_code::JoinCode,
    relay::{AllocationId, ParticipantId, RelayAllocation, RelayJoinAllocation},
};

/// Performs anonymous sign-in under a profile name.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in and returns the participant's stable identity.
    async fn sign_in(&self, profile_name: &str) -> Result<ParticipantId, IdentityError>;
}

/// Creates, joins and releases relay allocations.
#[async_trait]
pub trait AllocationService: Send + Sync {
    /// Creates a host allocation admitting `capacity` peers and returns it with its join code.
    async fn create_allocation(
        &self,
        capacity: u32,
    ) -> Result<(RelayAllocation, JoinCode), AllocationError>;

    /// Joins the host allocation named by `code`.
    async fn join_allocation(&self, code: &JoinCode)
        -> Result<RelayJoinAllocation, AllocationError>;

    /// Releases an allocation before it expires server-side.
    ///
    /// Services without an explicit release report
    /// [`AllocationError::ReleaseUnsupported`].
    async fn release_allocation(&self, _id: &AllocationId) -> Result<(), AllocationError> {
        Err(AllocationError::ReleaseUnsupported)
    }
}
