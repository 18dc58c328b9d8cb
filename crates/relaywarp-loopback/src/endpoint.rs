use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
};

use rand::Rng;
use relaywarp_core::{
    connection::ConnectionHandle,
    error::{ErrorKind, Result},
    relay::{AllocationId, RelayServerData},
    transport::{DriverFactory, Endpoint, NetworkEvent},
};
use relaywarp_protocol::frame::{FrameKind, RelayFrame};
use tracing::{debug, trace, warn};

use crate::relay::{Fault, LoopbackRelay};

const EPHEMERAL_PORTS: std::ops::RangeInclusive<u16> = 49152..=65535;

/// Creates [`LoopbackEndpoint`]s routed through a shared [`LoopbackRelay`].
#[derive(Debug, Clone)]
pub struct LoopbackDriverFactory {
    relay: LoopbackRelay,
}

impl LoopbackDriverFactory {
    /// Creates a factory for endpoints on `relay`.
    pub fn new(relay: LoopbackRelay) -> Self {
        Self { relay }
    }
}

impl DriverFactory for LoopbackDriverFactory {
    type Endpoint = LoopbackEndpoint;

    fn create(&mut self, server_data: &RelayServerData) -> Result<LoopbackEndpoint> {
        Ok(LoopbackEndpoint::new(self.relay.clone(), server_data.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Host side: connect request received, waiting for `accept`.
    PendingAccept,
    /// Peer side: connect request sent, waiting for the host.
    Connecting,
    Established,
    /// Disconnect event queued; the link goes away once it is popped.
    Closed,
}

#[derive(Debug)]
struct Link {
    handle: ConnectionHandle,
    remote: AllocationId,
    phase: Phase,
    events: VecDeque<NetworkEvent>,
}

/// Endpoint exchanging relay frames through a [`LoopbackRelay`] mailbox.
///
/// Outgoing frames are queued and handed to the relay on `maintain`, which
/// also drains the endpoint's mailbox into per-connection event queues.
#[derive(Debug)]
pub struct LoopbackEndpoint {
    relay: LoopbackRelay,
    server_data: RelayServerData,
    local_address: Option<SocketAddr>,
    listening: bool,
    disposed: bool,
    links: HashMap<u32, Link>,
    by_remote: HashMap<AllocationId, u32>,
    pending_accepts: VecDeque<u32>,
    outbox: Vec<(AllocationId, FrameKind)>,
    next_id: u32,
}

impl LoopbackEndpoint {
    fn new(relay: LoopbackRelay, server_data: RelayServerData) -> Self {
        Self {
            relay,
            server_data,
            local_address: None,
            listening: false,
            disposed: false,
            links: HashMap::new(),
            by_remote: HashMap::new(),
            pending_accepts: VecDeque::new(),
            outbox: Vec::new(),
            next_id: 1,
        }
    }

    /// Local address assigned by `bind`.
    pub fn local_address(&self) -> Option<SocketAddr> {
        self.local_address
    }

    /// Returns true once `listen` has succeeded.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Allocation this endpoint speaks for.
    pub fn allocation_id(&self) -> AllocationId {
        self.server_data.allocation_id
    }

    /// Connections not yet fully torn down.
    pub fn connection_count(&self) -> usize {
        self.links.len()
    }

    fn open_link(&mut self, remote: AllocationId, phase: Phase) -> ConnectionHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let handle = ConnectionHandle::new(id, 1);
        self.links.insert(id, Link { handle, remote, phase, events: VecDeque::new() });
        self.by_remote.insert(remote, id);
        handle
    }

    fn link_mut(&mut self, handle: ConnectionHandle) -> Option<&mut Link> {
        if !handle.is_created() {
            return None;
        }
        self.links.get_mut(&handle.id()).filter(|link| link.handle == handle)
    }

    fn remove_link(&mut self, id: u32) {
        if let Some(link) = self.links.remove(&id) {
            if self.by_remote.get(&link.remote) == Some(&id) {
                self.by_remote.remove(&link.remote);
            }
        }
    }

    fn flush(&mut self) {
        let sender = self.server_data.connection_data;
        for (to, kind) in self.outbox.drain(..) {
            match RelayFrame::new(sender, kind).encode() {
                Ok(bytes) => self.relay.post(&to, bytes),
                Err(err) => warn!("Dropping unencodable frame to {}: {}", to, err),
            }
        }
    }

    fn handle_frame(&mut self, frame: RelayFrame) {
        let remote = AllocationId::from_bytes(frame.sender.0);
        let existing = self.by_remote.get(&remote).copied();

        match frame.kind {
            FrameKind::Connect => {
                if !self.listening {
                    trace!("Refusing connect from {}: not listening", remote);
                    self.outbox.push((remote, FrameKind::Disconnect));
                } else if existing.is_none() {
                    let handle = self.open_link(remote, Phase::PendingAccept);
                    self.pending_accepts.push_back(handle.id());
                    debug!("Connect request from {} queued as {}", remote, handle);
                }
            }
            FrameKind::Accept => {
                if let Some(link) = existing.and_then(|id| self.links.get_mut(&id)) {
                    if link.phase == Phase::Connecting {
                        link.phase = Phase::Established;
                        link.events.push_back(NetworkEvent::Connect);
                    }
                }
            }
            FrameKind::Data(payload) => match existing.and_then(|id| self.links.get_mut(&id)) {
                Some(link) if link.phase == Phase::Established => {
                    link.events.push_back(NetworkEvent::Data(payload));
                }
                _ => trace!("Dropping data from {} without an established link", remote),
            },
            FrameKind::Disconnect => {
                let Some(id) = existing else {
                    return;
                };
                let pending = self.links.get(&id).map(|link| link.phase == Phase::PendingAccept);
                if pending == Some(true) {
                    self.pending_accepts.retain(|pending_id| *pending_id != id);
                    self.remove_link(id);
                } else if let Some(link) = self.links.get_mut(&id) {
                    link.phase = Phase::Closed;
                    link.events.push_back(NetworkEvent::Disconnect);
                    self.by_remote.remove(&remote);
                }
            }
        }
    }
}

impl Endpoint for LoopbackEndpoint {
    fn bind(&mut self, address: SocketAddr) -> Result<()> {
        let fail = |reason: String| Err(ErrorKind::Bind { address, reason });
        if self.disposed {
            return fail("endpoint disposed".into());
        }
        if self.local_address.is_some() {
            return fail("endpoint already bound".into());
        }
        if self.relay.take_fault(Fault::Bind) {
            return fail("injected fault".into());
        }
        if let Err(reason) = self.relay.open_mailbox(&self.server_data.allocation_id) {
            return fail(reason);
        }

        let mut local = address;
        if local.port() == 0 {
            local.set_port(rand::thread_rng().gen_range(EPHEMERAL_PORTS));
        }
        self.local_address = Some(local);
        debug!("Bound {} to relay {}", local, self.server_data.relay_address);
        Ok(())
    }

    fn is_bound(&self) -> bool {
        !self.disposed && self.local_address.is_some()
    }

    fn listen(&mut self) -> Result<()> {
        if !self.is_bound() {
            return Err(ErrorKind::Listen("endpoint is not bound".into()));
        }
        if self.server_data.is_joining() {
            return Err(ErrorKind::Listen("join allocations cannot listen".into()));
        }
        if self.relay.take_fault(Fault::Listen) {
            return Err(ErrorKind::Listen("injected fault".into()));
        }
        self.listening = true;
        Ok(())
    }

    fn accept(&mut self) -> Option<ConnectionHandle> {
        if !self.listening {
            return None;
        }
        while let Some(id) = self.pending_accepts.pop_front() {
            if let Some(link) = self.links.get_mut(&id) {
                link.phase = Phase::Established;
                let (handle, remote) = (link.handle, link.remote);
                self.outbox.push((remote, FrameKind::Accept));
                return Some(handle);
            }
        }
        None
    }

    fn connect(&mut self) -> Result<ConnectionHandle> {
        if !self.is_bound() {
            return Err(ErrorKind::NotBound);
        }
        let host = match self.server_data.host_connection_data {
            Some(data) => AllocationId::from_bytes(data.0),
            None => return Err(ErrorKind::WrongRole),
        };
        if let Some(id) = self.by_remote.get(&host).copied() {
            self.remove_link(id);
        }
        let handle = self.open_link(host, Phase::Connecting);
        self.outbox.push((host, FrameKind::Connect));
        Ok(handle)
    }

    fn send(&mut self, connection: ConnectionHandle, payload: &[u8]) -> Result<()> {
        let link = self.link_mut(connection).ok_or(ErrorKind::UnknownConnection)?;
        if link.phase != Phase::Established {
            return Err(ErrorKind::NotConnected);
        }
        let remote = link.remote;
        self.outbox.push((remote, FrameKind::Data(payload.to_vec())));
        Ok(())
    }

    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<()> {
        let link = self.link_mut(connection).ok_or(ErrorKind::UnknownConnection)?;
        let (id, remote, phase) = (connection.id(), link.remote, link.phase);
        if phase != Phase::Closed {
            self.outbox.push((remote, FrameKind::Disconnect));
        }
        self.pending_accepts.retain(|pending_id| *pending_id != id);
        self.remove_link(id);
        Ok(())
    }

    fn pop_event(&mut self, connection: ConnectionHandle) -> Option<NetworkEvent> {
        let link = self.link_mut(connection)?;
        let event = link.events.pop_front();
        if event == Some(NetworkEvent::Disconnect) {
            self.remove_link(connection.id());
        }
        event
    }

    fn maintain(&mut self) {
        if !self.is_bound() {
            return;
        }
        self.flush();
        for bytes in self.relay.drain_mailbox(&self.server_data.allocation_id) {
            match RelayFrame::decode(&bytes) {
                Ok(frame) => self.handle_frame(frame),
                Err(err) => warn!("Dropping malformed relay frame: {}", err),
            }
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if self.is_bound() {
            let live: Vec<AllocationId> = self
                .links
                .values()
                .filter(|link| link.phase != Phase::Closed)
                .map(|link| link.remote)
                .collect();
            for remote in live {
                self.outbox.push((remote, FrameKind::Disconnect));
            }
            self.flush();
            self.relay.close_mailbox(&self.server_data.allocation_id);
        }
        self.links.clear();
        self.by_remote.clear();
        self.pending_accepts.clear();
        self.outbox.clear();
        self.listening = false;
        self.local_address = None;
        self.disposed = true;
        debug!("Disposed endpoint for allocation {}", self.server_data.allocation_id);
    }
}

impl Drop for LoopbackEndpoint {
    fn drop(&mut self) {
        self.dispose();
    }
}
