/// Peer link state machine.
///
/// Tracks the single outbound link of the peer role from the connect
/// request through acceptance to the moment the host goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No link; the handle is the sentinel
    #[default]
    Unconnected,

    /// Connect request issued, waiting for the host to accept
    Connecting,

    /// Host accepted - data can flow
    Connected,
}

impl LinkState {
    /// Returns true if the link holds a live handle
    pub fn is_active(&self) -> bool {
        matches!(self, LinkState::Connecting | LinkState::Connected)
    }

    /// Returns true if the host has accepted the link
    pub fn is_established(&self) -> bool {
        matches!(self, LinkState::Connected)
    }

    /// Returns true while waiting for the host
    pub fn is_connecting(&self) -> bool {
        matches!(self, LinkState::Connecting)
    }
}
