//! The session broker: one owned value per application session.
//!
//! A broker signs the local participant in, then takes exactly one role:
//! hosting an allocation other peers join through a join code, or joining
//! someone else's allocation. Setup is async because it talks to remote
//! services. Everything after setup is driven by [`SessionBroker::tick`],
//! which never blocks and never fails.

use std::{fmt, sync::Arc};

use crossbeam_channel::{unbounded, Receiver};
use rand::Rng;
use relaywarp_core::{
    config::Config,
    connection::ConnectionHandle,
    error::{AllocationError, ErrorKind, Result},
    join_code::JoinCode,
    relay::{AllocationId, ParticipantId, RelayAllocation, RelayJoinAllocation, RelayServerData},
    services::{AllocationService, IdentityProvider},
    transport::{DriverFactory, Endpoint},
};
use relaywarp_peer::{LinkState, PeerLink};
use relaywarp_protocol::record::TextRecord;
use tracing::{debug, info, warn};

use crate::{
    event_types::{BrokerEvent, Lifecycle, SessionRole},
    pump::{pump_host, pump_peer, ChannelSink, EventSink, TickReport},
    registry::ConnectionRegistry,
};

/// Returns a display name of the form `Player123` for callers without one.
pub fn random_profile_name() -> String {
    format!("Player{}", rand::thread_rng().gen_range(100..1000))
}

#[derive(Debug, Default)]
enum Identity {
    #[default]
    Anonymous,
    AuthenticatingAs(String),
    SignedIn(ParticipantId),
}

struct HostSession<E> {
    allocation: RelayAllocation,
    join_code: JoinCode,
    endpoint: E,
    registry: ConnectionRegistry,
}

struct PeerSession<E> {
    allocation: RelayJoinAllocation,
    join_code: JoinCode,
    endpoint: E,
    link: PeerLink,
}

/// Role-specific state. Hosting and joining cannot coexist.
enum ActiveRole<E> {
    None,
    Hosting(HostSession<E>),
    Joining(PeerSession<E>),
}

impl<E: Endpoint> ActiveRole<E> {
    fn is_none(&self) -> bool {
        matches!(self, ActiveRole::None)
    }

    fn allocation_id(&self) -> Option<AllocationId> {
        match self {
            ActiveRole::None => None,
            ActiveRole::Hosting(session) => Some(session.allocation.allocation_id),
            ActiveRole::Joining(session) => Some(session.allocation.allocation_id),
        }
    }

    fn endpoint(&self) -> Option<&E> {
        match self {
            ActiveRole::None => None,
            ActiveRole::Hosting(session) => Some(&session.endpoint),
            ActiveRole::Joining(session) => Some(&session.endpoint),
        }
    }

    /// Disposes the endpoint and drops every handle.
    fn teardown(&mut self) {
        match self {
            ActiveRole::None => {}
            ActiveRole::Hosting(session) => {
                session.endpoint.dispose();
                session.registry.clear();
            }
            ActiveRole::Joining(session) => {
                session.endpoint.dispose();
                session.link.reset();
            }
        }
    }
}

/// Brokers one relay session for the local participant.
///
/// Setup operations take `&mut self`, so they never overlap with each other
/// or with [`tick`](Self::tick). Events are delivered through an unbounded
/// channel read with [`recv`](Self::recv) or [`event_receiver`](Self::event_receiver).
pub struct SessionBroker<F: DriverFactory> {
    config: Config,
    identity_provider: Arc<dyn IdentityProvider>,
    allocation_service: Arc<dyn AllocationService>,
    factory: F,
    identity: Identity,
    role: ActiveRole<F::Endpoint>,
    lifecycle: Lifecycle,
    event_sink: ChannelSink,
    event_receiver: Receiver<BrokerEvent>,
}

impl<F: DriverFactory> fmt::Debug for SessionBroker<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBroker")
            .field("config", &self.config)
            .field("identity", &self.identity)
            .field("role", &self.role())
            .field("lifecycle", &self.lifecycle)
            .field("factory", &"<factory>")
            .finish()
    }
}

impl<F: DriverFactory> SessionBroker<F> {
    /// Creates a broker wired to its collaborators. Nothing happens until
    /// [`authenticate`](Self::authenticate) is called.
    pub fn new(
        config: Config,
        identity_provider: Arc<dyn IdentityProvider>,
        allocation_service: Arc<dyn AllocationService>,
        factory: F,
    ) -> Self {
        let (event_sender, event_receiver) = unbounded();
        Self {
            config,
            identity_provider,
            allocation_service,
            factory,
            identity: Identity::Anonymous,
            role: ActiveRole::None,
            lifecycle: Lifecycle::Uninitialized,
            event_sink: ChannelSink::new(event_sender),
            event_receiver,
        }
    }

    /// Signs the participant in under `profile_name`.
    ///
    /// Once signed in, further calls return the existing identity without
    /// contacting the provider. A failed attempt leaves the broker
    /// unauthenticated and may be retried.
    pub async fn authenticate(&mut self, profile_name: &str) -> Result<ParticipantId> {
        self.ensure_not_disposed()?;
        if let Identity::SignedIn(participant) = &self.identity {
            return Ok(participant.clone());
        }

        self.identity = Identity::AuthenticatingAs(profile_name.to_string());
        self.lifecycle = Lifecycle::Authenticating;

        match self.identity_provider.sign_in(profile_name).await {
            Ok(participant) => {
                info!("Signed in as {} ({})", profile_name, participant);
                self.identity = Identity::SignedIn(participant.clone());
                self.lifecycle = Lifecycle::Authenticated;
                self.event_sink.send(BrokerEvent::SignedIn(participant.clone()));
                Ok(participant)
            }
            Err(err) => {
                warn!("Sign-in as {} failed: {}", profile_name, err);
                self.identity = Identity::Anonymous;
                self.lifecycle = Lifecycle::Uninitialized;
                Err(err.into())
            }
        }
    }

    /// Hosts a new session admitting up to `max_peers` peers and returns
    /// the code peers join with. Zero selects the configured default.
    ///
    /// On failure the endpoint created in the attempt is disposed, the fresh
    /// allocation released, and the broker left without a role.
    pub async fn create_session(&mut self, max_peers: u32) -> Result<JoinCode> {
        self.ensure_can_select_role()?;
        let capacity = if max_peers == 0 { self.config.default_max_peers } else { max_peers };
        self.lifecycle = Lifecycle::RoleSelected;

        let (mut allocation, join_code) =
            match self.allocation_service.create_allocation(capacity).await {
                Ok(created) => created,
                Err(err) => return Err(self.setup_failed("Creating an allocation", err.into())),
            };
        allocation.server_data.protocol = self.config.relay_protocol;

        let opened = self.open_endpoint(&allocation.server_data, |endpoint| endpoint.listen());
        let endpoint = match opened {
            Ok((endpoint, ())) => endpoint,
            Err(err) => {
                self.release_quietly(&allocation.allocation_id).await;
                return Err(self.setup_failed("Hosting", err));
            }
        };

        info!(
            "Hosting allocation {} for {} peers with join code {}",
            allocation.allocation_id, capacity, join_code
        );
        self.role = ActiveRole::Hosting(HostSession {
            allocation,
            join_code: join_code.clone(),
            endpoint,
            registry: ConnectionRegistry::with_capacity(self.config.registry_capacity_hint),
        });
        self.lifecycle = Lifecycle::Bound;
        Ok(join_code)
    }

    /// Joins the session named by `code` and issues a connect request to its host.
    ///
    /// The code is trimmed and upper-cased before lookup. Rollback on
    /// failure is the same as for [`create_session`](Self::create_session).
    pub async fn join_session(&mut self, code: &str) -> Result<()> {
        self.ensure_can_select_role()?;
        let join_code = JoinCode::parse(code)?;
        self.lifecycle = Lifecycle::RoleSelected;

        let mut allocation = match self.allocation_service.join_allocation(&join_code).await {
            Ok(allocation) => allocation,
            Err(err) => return Err(self.setup_failed("Joining", err.into())),
        };
        allocation.server_data.protocol = self.config.relay_protocol;

        let opened = self.open_endpoint(&allocation.server_data, |endpoint| endpoint.connect());
        let (endpoint, handle) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                self.release_quietly(&allocation.allocation_id).await;
                return Err(self.setup_failed("Joining", err));
            }
        };

        info!("Joined allocation {} via {}", allocation.host_allocation_id, join_code);
        let mut link = PeerLink::new();
        link.connect_issued(handle);
        self.role = ActiveRole::Joining(PeerSession { allocation, join_code, endpoint, link });
        self.lifecycle = Lifecycle::Bound;
        Ok(())
    }

    /// Runs one pump iteration. A no-op before setup completes and after disposal.
    pub fn tick(&mut self) -> TickReport {
        if self.lifecycle == Lifecycle::Disposed {
            return TickReport::default();
        }
        let report = match &mut self.role {
            ActiveRole::None => return TickReport::default(),
            ActiveRole::Hosting(session) => {
                pump_host(&mut session.endpoint, &mut session.registry, &mut self.event_sink)
            }
            ActiveRole::Joining(session) => {
                pump_peer(&mut session.endpoint, &mut session.link, &mut self.event_sink)
            }
        };
        if report.ran && self.lifecycle == Lifecycle::Bound {
            self.lifecycle = Lifecycle::Active;
        }
        report
    }

    /// Sends one record on a connection.
    ///
    /// Host: `connection` must be a live registry handle. Peer: it must be
    /// the link handle and the host must have accepted it.
    pub fn send(&mut self, connection: ConnectionHandle, record: &TextRecord) -> Result<()> {
        self.ensure_not_disposed()?;
        let payload = self.encode(record)?;
        match &mut self.role {
            ActiveRole::None => Err(ErrorKind::NotBound),
            ActiveRole::Hosting(session) => {
                if !session.registry.contains(connection) {
                    return Err(ErrorKind::UnknownConnection);
                }
                session.endpoint.send(connection, &payload)
            }
            ActiveRole::Joining(session) => {
                if !session.link.holds(connection) {
                    return Err(ErrorKind::UnknownConnection);
                }
                if !session.link.is_connected() {
                    return Err(ErrorKind::NotConnected);
                }
                session.endpoint.send(connection, &payload)
            }
        }
    }

    /// Sends one record to every live connection of a hosted session and
    /// returns how many accepted it. Per-connection failures are logged.
    pub fn broadcast(&mut self, record: &TextRecord) -> Result<usize> {
        self.ensure_not_disposed()?;
        let payload = self.encode(record)?;
        let ActiveRole::Hosting(session) = &mut self.role else {
            return Err(ErrorKind::WrongRole);
        };
        let mut sent = 0;
        for connection in session.registry.valid() {
            match session.endpoint.send(connection, &payload) {
                Ok(()) => sent += 1,
                Err(err) => warn!("Broadcast to {} failed: {}", connection, err),
            }
        }
        Ok(sent)
    }

    /// Closes one connection from this side.
    ///
    /// Host: the slot is invalidated and removed by the next tick's sweep.
    /// Peer: the link is reset immediately. No `Disconnected` event is
    /// emitted for a locally initiated close.
    pub fn disconnect(&mut self, connection: ConnectionHandle) -> Result<()> {
        self.ensure_not_disposed()?;
        match &mut self.role {
            ActiveRole::None => Err(ErrorKind::NotBound),
            ActiveRole::Hosting(session) => {
                if !session.registry.contains(connection) {
                    return Err(ErrorKind::UnknownConnection);
                }
                session.endpoint.disconnect(connection)?;
                session.registry.invalidate_handle(connection);
                debug!("Disconnected {}", connection);
                Ok(())
            }
            ActiveRole::Joining(session) => {
                if !session.link.holds(connection) {
                    return Err(ErrorKind::UnknownConnection);
                }
                session.endpoint.disconnect(connection)?;
                session.link.reset();
                debug!("Disconnected from the host");
                Ok(())
            }
        }
    }

    /// Releases the endpoint and every handle. Safe to call in any state and
    /// more than once.
    ///
    /// The relay allocation is not released here; use
    /// [`shutdown`](Self::shutdown) for that.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        if let Some(allocation_id) = self.role.allocation_id() {
            warn!("Allocation {} left to expire server-side", allocation_id);
        }
        self.teardown();
    }

    /// Disposes the broker, then releases the held allocation when
    /// [`Config::release_on_shutdown`] is set.
    ///
    /// The broker is disposed even if the release fails. A service without
    /// explicit release is not an error.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.lifecycle == Lifecycle::Disposed {
            return Ok(());
        }
        let allocation_id = self.role.allocation_id();
        self.teardown();

        let Some(allocation_id) = allocation_id else {
            return Ok(());
        };
        if !self.config.release_on_shutdown {
            info!("Allocation {} left to expire server-side", allocation_id);
            return Ok(());
        }
        match self.allocation_service.release_allocation(&allocation_id).await {
            Ok(()) => {
                info!("Released allocation {}", allocation_id);
                Ok(())
            }
            Err(AllocationError::ReleaseUnsupported) => {
                debug!("Allocation {} left to expire server-side", allocation_id);
                Ok(())
            }
            Err(err) => {
                warn!("Releasing allocation {} failed: {}", allocation_id, err);
                Err(err.into())
            }
        }
    }

    /// Observable role.
    pub fn role(&self) -> SessionRole {
        match (&self.role, &self.identity) {
            (ActiveRole::Hosting(_), _) => SessionRole::Hosting,
            (ActiveRole::Joining(session), _) => SessionRole::Joining(session.join_code.clone()),
            (ActiveRole::None, Identity::AuthenticatingAs(name)) => {
                SessionRole::AuthenticatingAs(name.clone())
            }
            (ActiveRole::None, _) => SessionRole::Uninitialized,
        }
    }

    /// Setup progress.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Identity obtained at sign-in.
    pub fn participant(&self) -> Option<&ParticipantId> {
        match &self.identity {
            Identity::SignedIn(participant) => Some(participant),
            _ => None,
        }
    }

    /// Join code of the hosted or joined session.
    pub fn join_code(&self) -> Option<&JoinCode> {
        match &self.role {
            ActiveRole::None => None,
            ActiveRole::Hosting(session) => Some(&session.join_code),
            ActiveRole::Joining(session) => Some(&session.join_code),
        }
    }

    /// Returns true while the role's endpoint is bound.
    pub fn is_bound(&self) -> bool {
        self.role.endpoint().map_or(false, Endpoint::is_bound)
    }

    /// Host: every registry slot in acceptance order, including slots
    /// invalidated this tick. Empty for any other role.
    pub fn connections(&self) -> &[ConnectionHandle] {
        match &self.role {
            ActiveRole::Hosting(session) => session.registry.as_slice(),
            _ => &[],
        }
    }

    /// Peer: the link handle, which is the sentinel once disconnected.
    pub fn peer_connection(&self) -> Option<ConnectionHandle> {
        match &self.role {
            ActiveRole::Joining(session) => Some(session.link.handle()),
            _ => None,
        }
    }

    /// Peer: the link state.
    pub fn link_state(&self) -> Option<LinkState> {
        match &self.role {
            ActiveRole::Joining(session) => Some(session.link.state()),
            _ => None,
        }
    }

    /// Returns true if `connection` is a live handle of the active role.
    pub fn is_connection_valid(&self, connection: ConnectionHandle) -> bool {
        match &self.role {
            ActiveRole::None => false,
            ActiveRole::Hosting(session) => session.registry.contains(connection),
            ActiveRole::Joining(session) => session.link.holds(connection),
        }
    }

    /// Allocation held by the active role.
    pub fn allocation_id(&self) -> Option<AllocationId> {
        self.role.allocation_id()
    }

    /// The role's endpoint, read-only.
    pub fn endpoint(&self) -> Option<&F::Endpoint> {
        self.role.endpoint()
    }

    /// Receives the next event, if any.
    pub fn recv(&mut self) -> Option<BrokerEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Returns a handle to the event receiver channel.
    pub fn event_receiver(&self) -> &Receiver<BrokerEvent> {
        &self.event_receiver
    }

    /// Returns the broker configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn ensure_not_disposed(&self) -> Result<()> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(ErrorKind::Disposed);
        }
        Ok(())
    }

    fn ensure_can_select_role(&self) -> Result<()> {
        self.ensure_not_disposed()?;
        if !self.role.is_none() {
            return Err(ErrorKind::RoleAlreadySelected);
        }
        if !matches!(self.identity, Identity::SignedIn(_)) {
            return Err(ErrorKind::NotAuthenticated);
        }
        Ok(())
    }

    fn encode(&self, record: &TextRecord) -> Result<Vec<u8>> {
        let payload = record.encode();
        if payload.len() > self.config.max_payload_size {
            return Err(ErrorKind::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }
        Ok(payload)
    }

    /// Creates and binds an endpoint, then runs the role-specific step.
    /// The endpoint is disposed if any step fails.
    fn open_endpoint<T>(
        &mut self,
        server_data: &RelayServerData,
        prepare: impl FnOnce(&mut F::Endpoint) -> Result<T>,
    ) -> Result<(F::Endpoint, T)> {
        let mut endpoint = self.factory.create(server_data)?;
        let prepared =
            endpoint.bind(self.config.bind_address).and_then(|()| prepare(&mut endpoint));
        match prepared {
            Ok(value) => Ok((endpoint, value)),
            Err(err) => {
                endpoint.dispose();
                Err(err)
            }
        }
    }

    async fn release_quietly(&self, allocation_id: &AllocationId) {
        match self.allocation_service.release_allocation(allocation_id).await {
            Ok(()) => debug!("Released allocation {} after failed setup", allocation_id),
            Err(AllocationError::ReleaseUnsupported) => {
                debug!("Allocation {} left to expire server-side", allocation_id)
            }
            Err(err) => warn!("Releasing allocation {} failed: {}", allocation_id, err),
        }
    }

    fn setup_failed(&mut self, step: &str, err: ErrorKind) -> ErrorKind {
        warn!("{} failed: {}", step, err);
        self.lifecycle = Lifecycle::Authenticated;
        err
    }

    fn teardown(&mut self) {
        self.role.teardown();
        self.role = ActiveRole::None;
        self.lifecycle = Lifecycle::Disposed;
        debug!("Broker disposed");
    }
}

impl<F: DriverFactory> Drop for SessionBroker<F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::Mutex};

    use async_trait::async_trait;
    use relaywarp_core::{error::IdentityError, transport::NetworkEvent};

    use super::*;

    #[derive(Default)]
    struct CountingIdentity {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl IdentityProvider for CountingIdentity {
        async fn sign_in(
            &self,
            profile_name: &str,
        ) -> std::result::Result<ParticipantId, IdentityError> {
            *self.calls.lock().unwrap() += 1;
            if profile_name.is_empty() {
                return Err(IdentityError::InvalidProfileName(String::new()));
            }
            Ok(ParticipantId::new(format!("id-{}", profile_name)))
        }
    }

    struct NoAllocations;

    #[async_trait]
    impl AllocationService for NoAllocations {
        async fn create_allocation(
            &self,
            _capacity: u32,
        ) -> std::result::Result<(RelayAllocation, JoinCode), AllocationError> {
            Err(AllocationError::ServiceUnavailable("offline".into()))
        }

        async fn join_allocation(
            &self,
            code: &JoinCode,
        ) -> std::result::Result<RelayJoinAllocation, AllocationError> {
            Err(AllocationError::JoinCodeNotFound(code.clone()))
        }
    }

    struct InertEndpoint;

    impl Endpoint for InertEndpoint {
        fn bind(&mut self, _address: SocketAddr) -> Result<()> {
            Ok(())
        }
        fn is_bound(&self) -> bool {
            false
        }
        fn listen(&mut self) -> Result<()> {
            Ok(())
        }
        fn accept(&mut self) -> Option<ConnectionHandle> {
            None
        }
        fn connect(&mut self) -> Result<ConnectionHandle> {
            Err(ErrorKind::NotBound)
        }
        fn send(&mut self, _connection: ConnectionHandle, _payload: &[u8]) -> Result<()> {
            Ok(())
        }
        fn disconnect(&mut self, _connection: ConnectionHandle) -> Result<()> {
            Ok(())
        }
        fn pop_event(&mut self, _connection: ConnectionHandle) -> Option<NetworkEvent> {
            None
        }
        fn maintain(&mut self) {}
        fn dispose(&mut self) {}
    }

    struct InertFactory;

    impl DriverFactory for InertFactory {
        type Endpoint = InertEndpoint;

        fn create(&mut self, _server_data: &RelayServerData) -> Result<InertEndpoint> {
            Ok(InertEndpoint)
        }
    }

    fn broker() -> (SessionBroker<InertFactory>, Arc<CountingIdentity>) {
        let identity = Arc::new(CountingIdentity::default());
        let broker = SessionBroker::new(
            Config::default(),
            identity.clone(),
            Arc::new(NoAllocations),
            InertFactory,
        );
        (broker, identity)
    }

    #[test]
    fn test_random_profile_name_shape() {
        for _ in 0..50 {
            let name = random_profile_name();
            let number: u32 = name.strip_prefix("Player").unwrap().parse().unwrap();
            assert!((100..1000).contains(&number));
        }
    }

    #[test]
    fn test_new_broker_is_uninitialized() {
        let (mut broker, _) = broker();
        assert_eq!(broker.role(), SessionRole::Uninitialized);
        assert_eq!(broker.lifecycle(), Lifecycle::Uninitialized);
        assert!(!broker.is_bound());
        assert!(broker.connections().is_empty());
        assert_eq!(broker.tick(), TickReport::default());
        assert!(broker.recv().is_none());
    }

    #[tokio::test]
    async fn test_authenticate_is_idempotent() {
        let (mut broker, identity) = broker();
        let first = broker.authenticate("P1").await.unwrap();
        let second = broker.authenticate("P2").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(*identity.calls.lock().unwrap(), 1);
        assert_eq!(broker.recv(), Some(BrokerEvent::SignedIn(first)));
        assert_eq!(broker.recv(), None);
    }

    #[tokio::test]
    async fn test_failed_authentication_can_be_retried() {
        let (mut broker, _) = broker();
        assert!(matches!(broker.authenticate("").await, Err(ErrorKind::Identity(_))));
        assert_eq!(broker.lifecycle(), Lifecycle::Uninitialized);
        assert!(broker.participant().is_none());

        broker.authenticate("P1").await.unwrap();
        assert_eq!(broker.lifecycle(), Lifecycle::Authenticated);
    }

    #[tokio::test]
    async fn test_role_requires_authentication() {
        let (mut broker, _) = broker();
        assert!(matches!(broker.create_session(2).await, Err(ErrorKind::NotAuthenticated)));
        assert!(matches!(broker.join_session("BCDFGH").await, Err(ErrorKind::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_allocation_failure_leaves_broker_pre_role() {
        let (mut broker, _) = broker();
        broker.authenticate("P1").await.unwrap();

        let err = broker.create_session(3).await.unwrap_err();
        assert!(matches!(err, ErrorKind::Allocation(AllocationError::ServiceUnavailable(_))));
        assert_eq!(broker.role(), SessionRole::Uninitialized);
        assert_eq!(broker.lifecycle(), Lifecycle::Authenticated);
        assert!(broker.allocation_id().is_none());
    }

    #[tokio::test]
    async fn test_malformed_join_code_is_rejected_before_lookup() {
        let (mut broker, _) = broker();
        broker.authenticate("P1").await.unwrap();
        let err = broker.join_session("AB-1").await.unwrap_err();
        assert!(matches!(err, ErrorKind::Allocation(AllocationError::InvalidJoinCode(_))));
        assert_eq!(broker.lifecycle(), Lifecycle::Authenticated);
    }

    #[tokio::test]
    async fn test_disposed_broker_rejects_operations() {
        let (mut broker, _) = broker();
        broker.dispose();
        broker.dispose();
        assert_eq!(broker.lifecycle(), Lifecycle::Disposed);
        assert!(matches!(broker.authenticate("P1").await, Err(ErrorKind::Disposed)));
        assert!(matches!(broker.create_session(1).await, Err(ErrorKind::Disposed)));
        let record = TextRecord::new("hi").unwrap();
        assert!(matches!(broker.broadcast(&record), Err(ErrorKind::Disposed)));
        assert!(broker.shutdown().await.is_ok());
    }

    #[test]
    fn test_no_connection_is_valid_without_role() {
        let (broker, _) = broker();
        assert!(!broker.is_connection_valid(ConnectionHandle::new(1, 1)));
        assert!(broker.peer_connection().is_none());
        assert!(broker.link_state().is_none());
    }
}
