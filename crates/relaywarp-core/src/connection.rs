use std::fmt;

/// Lightweight token naming one peer link over an endpoint.
///
/// Handles are issued by an endpoint's `accept` or `connect`. The
/// `Default` value is [`ConnectionHandle::INVALID`], the sentinel that marks
/// a slot whose link is gone. A handle must be re-checked every tick before
/// use because the remote side can disconnect at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ConnectionHandle {
    id: u32,
    generation: u32,
}

impl ConnectionHandle {
    /// The sentinel handle. Never names a live connection.
    pub const INVALID: ConnectionHandle = ConnectionHandle { id: 0, generation: 0 };

    /// Creates a handle. A zero `generation` yields the sentinel.
    pub fn new(id: u32, generation: u32) -> Self {
        if generation == 0 {
            return Self::INVALID;
        }
        Self { id, generation }
    }

    /// Returns true unless this is the sentinel.
    pub fn is_created(&self) -> bool {
        self.generation != 0
    }

    /// Endpoint-local slot id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Generation of the slot; distinguishes reuse of the same id.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_created() {
            write!(f, "conn#{}.{}", self.id, self.generation)
        } else {
            f.write_str("conn#invalid")
        }
    }
}
