use relaywarp_core::connection::ConnectionHandle;
use tracing::{debug, trace};

use crate::link_state::LinkState;

/// The one connection a joining peer maintains toward its host.
///
/// There is no collection to mutate mid-iteration, so a disconnect resets
/// the handle to the sentinel immediately.
#[derive(Debug, Default)]
pub struct PeerLink {
    handle: ConnectionHandle,
    state: LinkState,
}

impl PeerLink {
    /// Creates an unconnected link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the handle returned by the endpoint's connect request.
    pub fn connect_issued(&mut self, handle: ConnectionHandle) {
        debug!("Connect request issued as {}", handle);
        self.handle = handle;
        self.state =
            if handle.is_created() { LinkState::Connecting } else { LinkState::Unconnected };
    }

    /// Marks the link accepted by the host. Returns false if there is no live handle.
    pub fn mark_connected(&mut self) -> bool {
        if !self.handle.is_created() {
            trace!("Connect event without a live handle ignored");
            return false;
        }
        self.state = LinkState::Connected;
        true
    }

    /// Drops the link, returning the handle it held.
    pub fn reset(&mut self) -> ConnectionHandle {
        self.state = LinkState::Unconnected;
        std::mem::take(&mut self.handle)
    }

    /// Returns the current handle, possibly the sentinel.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// Returns the link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Returns true if `handle` is the live handle of this link.
    pub fn holds(&self, handle: ConnectionHandle) -> bool {
        handle.is_created() && self.handle == handle
    }

    /// Returns true once the host has accepted the link.
    pub fn is_connected(&self) -> bool {
        self.state.is_established()
    }
}
