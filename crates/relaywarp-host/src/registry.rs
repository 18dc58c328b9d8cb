use relaywarp_core::{connection::ConnectionHandle, transport::Endpoint};
use tracing::debug;

/// Ordered set of live connections for a hosting endpoint.
///
/// Insertion order is acceptance order. A disconnected slot is overwritten
/// with [`ConnectionHandle::INVALID`] while events are being drained and is
/// only removed by the next [`sweep_stale`](Self::sweep_stale), so the
/// collection never shrinks under an index-based iteration.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Vec<ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Creates an empty registry with room for `capacity` connections.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { connections: Vec::with_capacity(capacity) }
    }

    /// Number of slots, stale ones included.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Returns the handle in slot `index`.
    pub fn get(&self, index: usize) -> Option<ConnectionHandle> {
        self.connections.get(index).copied()
    }

    /// All slots in acceptance order.
    pub fn as_slice(&self) -> &[ConnectionHandle] {
        &self.connections
    }

    /// Iterates over the slots that still hold a live handle.
    pub fn valid(&self) -> impl Iterator<Item = ConnectionHandle> + '_ {
        self.connections.iter().copied().filter(ConnectionHandle::is_created)
    }

    /// Returns true if `handle` is live and held by some slot.
    pub fn contains(&self, handle: ConnectionHandle) -> bool {
        handle.is_created() && self.connections.contains(&handle)
    }

    /// Appends a handle. The sentinel is never stored.
    pub fn push(&mut self, handle: ConnectionHandle) -> bool {
        if !handle.is_created() {
            return false;
        }
        self.connections.push(handle);
        true
    }

    /// Overwrites slot `index` with the sentinel, returning what it held.
    pub fn invalidate(&mut self, index: usize) -> Option<ConnectionHandle> {
        self.connections.get_mut(index).map(std::mem::take)
    }

    /// Invalidates the slot holding `handle`. Returns false if no slot holds it.
    pub fn invalidate_handle(&mut self, handle: ConnectionHandle) -> bool {
        if !handle.is_created() {
            return false;
        }
        match self.connections.iter().position(|held| *held == handle) {
            Some(index) => {
                self.connections[index] = ConnectionHandle::INVALID;
                true
            }
            None => false,
        }
    }

    /// Removes every invalidated slot. Relative order of the rest is kept.
    /// Returns how many slots were removed.
    pub fn sweep_stale(&mut self) -> usize {
        let before = self.connections.len();
        self.connections.retain(ConnectionHandle::is_created);
        let removed = before - self.connections.len();
        if removed > 0 {
            debug!("Stale connections removed: {}", removed);
        }
        removed
    }

    /// Accepts every pending connection on `endpoint`, appending each in
    /// arrival order, and returns the newly appended handles.
    pub fn drain_accepts<E: Endpoint>(&mut self, endpoint: &mut E) -> &[ConnectionHandle] {
        let start = self.connections.len();
        while let Some(handle) = endpoint.accept() {
            debug!("Accepted an incoming connection {}", handle);
            self.push(handle);
        }
        &self.connections[start..]
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.connections.clear();
    }
}
