use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use rand::Rng;
use relaywarp_core::{
    config::RelayProtocol,
    constants::{JOIN_CODE_ALPHABET, JOIN_CODE_LEN, MAX_PROFILE_NAME_LEN},
    error::{AllocationError, IdentityError},
    join_code::JoinCode,
    relay::{
        AllocationId, ParticipantId, RelayAllocation, RelayJoinAllocation, RelayServerData,
    },
    services::{AllocationService, IdentityProvider},
};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::config::LoopbackConfig;

/// One-shot failure to inject into the next matching operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// The next sign-in is rejected.
    SignIn,
    /// The next create or join reports the service unavailable.
    Allocation,
    /// The next endpoint bind fails.
    Bind,
    /// The next endpoint listen fails.
    Listen,
}

#[derive(Debug)]
enum SlotKind {
    Host { capacity: u32, join_code: JoinCode, peers: HashSet<AllocationId> },
    Peer { host: AllocationId },
}

#[derive(Debug)]
struct RelayState {
    config: LoopbackConfig,
    allocations: HashMap<AllocationId, SlotKind>,
    join_codes: HashMap<JoinCode, AllocationId>,
    mailboxes: HashMap<AllocationId, VecDeque<Vec<u8>>>,
    faults: HashSet<Fault>,
    available: bool,
}

/// Shared handle to the in-process relay. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoopbackRelay {
    inner: Arc<Mutex<RelayState>>,
}

impl Default for LoopbackRelay {
    fn default() -> Self {
        Self::new(LoopbackConfig::default())
    }
}

impl LoopbackRelay {
    /// Creates an empty relay.
    pub fn new(config: LoopbackConfig) -> Self {
        let state = RelayState {
            config,
            allocations: HashMap::new(),
            join_codes: HashMap::new(),
            mailboxes: HashMap::new(),
            faults: HashSet::new(),
            available: true,
        };
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, RelayState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms a one-shot fault for the next matching operation.
    pub fn inject_fault(&self, fault: Fault) {
        self.state().faults.insert(fault);
    }

    /// Simulates the identity and allocation services going offline or coming back.
    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// Number of live (unreleased) allocations, host and peer.
    pub fn allocation_count(&self) -> usize {
        self.state().allocations.len()
    }

    /// Returns true if the allocation exists and has not been released.
    pub fn is_allocated(&self, id: &AllocationId) -> bool {
        self.state().allocations.contains_key(id)
    }

    /// Returns true if an endpoint is currently bound for the allocation.
    pub fn has_bound_endpoint(&self, id: &AllocationId) -> bool {
        self.state().mailboxes.contains_key(id)
    }

    /// Frames waiting in an allocation's mailbox.
    pub fn pending_frames(&self, id: &AllocationId) -> usize {
        self.state().mailboxes.get(id).map_or(0, VecDeque::len)
    }

    pub(crate) fn take_fault(&self, fault: Fault) -> bool {
        self.state().faults.remove(&fault)
    }

    /// Opens the mailbox an endpoint receives on. Fails for unknown allocations
    /// and for allocations that already have a bound endpoint.
    pub(crate) fn open_mailbox(&self, id: &AllocationId) -> Result<(), String> {
        let mut state = self.state();
        if !state.allocations.contains_key(id) {
            return Err(format!("allocation {} is not live on the relay", id));
        }
        if state.mailboxes.contains_key(id) {
            return Err(format!("allocation {} already has a bound endpoint", id));
        }
        state.mailboxes.insert(*id, VecDeque::new());
        Ok(())
    }

    pub(crate) fn close_mailbox(&self, id: &AllocationId) {
        self.state().mailboxes.remove(id);
    }

    /// Delivers an encoded frame. Frames to allocations without a bound
    /// endpoint are dropped, as datagrams are.
    pub(crate) fn post(&self, to: &AllocationId, frame: Vec<u8>) {
        match self.state().mailboxes.get_mut(to) {
            Some(mailbox) => mailbox.push_back(frame),
            None => trace!("Dropping frame to unbound allocation {}", to),
        }
    }

    pub(crate) fn drain_mailbox(&self, id: &AllocationId) -> Vec<Vec<u8>> {
        self.state()
            .mailboxes
            .get_mut(id)
            .map(|mailbox| mailbox.drain(..).collect())
            .unwrap_or_default()
    }

    fn check_available(state: &RelayState) -> Result<(), AllocationError> {
        if !state.available {
            return Err(AllocationError::ServiceUnavailable("relay offline".into()));
        }
        Ok(())
    }

    fn server_data(
        config: &LoopbackConfig,
        allocation_id: AllocationId,
        host: Option<AllocationId>,
    ) -> RelayServerData {
        let mut rng = rand::thread_rng();
        let key = (0..config.key_size).map(|_| rng.gen::<u8>()).collect();
        RelayServerData {
            relay_address: config.relay_address,
            allocation_id,
            connection_data: allocation_id.into(),
            host_connection_data: host.map(Into::into),
            key,
            protocol: RelayProtocol::Udp,
        }
    }

    fn generate_join_code(state: &RelayState) -> Result<JoinCode, AllocationError> {
        let mut rng = rand::thread_rng();
        loop {
            let raw: String = (0..JOIN_CODE_LEN)
                .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
                .collect();
            let code = JoinCode::parse(&raw)?;
            if !state.join_codes.contains_key(&code) {
                return Ok(code);
            }
        }
    }
}

/// Returns true if `name` is acceptable as a profile name.
fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_PROFILE_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl IdentityProvider for LoopbackRelay {
    async fn sign_in(&self, profile_name: &str) -> Result<ParticipantId, IdentityError> {
        let mut state = self.state();
        if !state.available {
            return Err(IdentityError::Unreachable("relay offline".into()));
        }
        if state.faults.remove(&Fault::SignIn) {
            return Err(IdentityError::Rejected("injected fault".into()));
        }
        if !is_valid_profile_name(profile_name) {
            return Err(IdentityError::InvalidProfileName(profile_name.to_string()));
        }
        let id = ParticipantId::new(Uuid::new_v4().simple().to_string());
        debug!("Signed in profile {} as {}", profile_name, id);
        Ok(id)
    }
}

#[async_trait]
impl AllocationService for LoopbackRelay {
    async fn create_allocation(
        &self,
        capacity: u32,
    ) -> Result<(RelayAllocation, JoinCode), AllocationError> {
        let mut state = self.state();
        Self::check_available(&state)?;
        if state.faults.remove(&Fault::Allocation) {
            return Err(AllocationError::ServiceUnavailable("injected fault".into()));
        }
        let max = state.config.max_capacity;
        if capacity == 0 || capacity > max {
            return Err(AllocationError::CapacityExceeded { requested: capacity, max });
        }

        let allocation_id = AllocationId::new_v4();
        let join_code = Self::generate_join_code(&state)?;
        let server_data = Self::server_data(&state.config, allocation_id, None);

        state.allocations.insert(
            allocation_id,
            SlotKind::Host { capacity, join_code: join_code.clone(), peers: HashSet::new() },
        );
        state.join_codes.insert(join_code.clone(), allocation_id);
        info!(
            "Created allocation {} for {} peers with join code {}",
            allocation_id, capacity, join_code
        );

        Ok((RelayAllocation { allocation_id, capacity, server_data }, join_code))
    }

    async fn join_allocation(
        &self,
        code: &JoinCode,
    ) -> Result<RelayJoinAllocation, AllocationError> {
        let mut state = self.state();
        Self::check_available(&state)?;
        if state.faults.remove(&Fault::Allocation) {
            return Err(AllocationError::ServiceUnavailable("injected fault".into()));
        }
        let host_id = *state
            .join_codes
            .get(code)
            .ok_or_else(|| AllocationError::JoinCodeNotFound(code.clone()))?;

        let allocation_id = AllocationId::new_v4();
        match state.allocations.get_mut(&host_id) {
            Some(SlotKind::Host { capacity, peers, .. }) => {
                if peers.len() >= *capacity as usize {
                    return Err(AllocationError::AllocationFull);
                }
                peers.insert(allocation_id);
            }
            _ => return Err(AllocationError::JoinCodeNotFound(code.clone())),
        }

        let server_data = Self::server_data(&state.config, allocation_id, Some(host_id));
        state.allocations.insert(allocation_id, SlotKind::Peer { host: host_id });
        info!("Allocation {} joined host allocation {} via {}", allocation_id, host_id, code);

        Ok(RelayJoinAllocation { allocation_id, host_allocation_id: host_id, server_data })
    }

    async fn release_allocation(&self, id: &AllocationId) -> Result<(), AllocationError> {
        let mut state = self.state();
        Self::check_available(&state)?;
        let slot = state
            .allocations
            .remove(id)
            .ok_or_else(|| AllocationError::UnknownAllocation(id.to_string()))?;
        match slot {
            SlotKind::Host { join_code, .. } => {
                state.join_codes.remove(&join_code);
            }
            SlotKind::Peer { host } => {
                if let Some(SlotKind::Host { peers, .. }) = state.allocations.get_mut(&host) {
                    peers.remove(id);
                }
            }
        }
        state.mailboxes.remove(id);
        debug!("Released allocation {}", id);
        Ok(())
    }
}
