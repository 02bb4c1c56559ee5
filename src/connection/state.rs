//! Client connection lifecycle.

/// Connection state.
///
/// `Idle -> Handshaking -> Open -> Closing -> Closed`, with any failure during
/// the handshake going straight to `Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Created, `connect()` not called yet.
    #[default]
    Idle,
    /// Transport open or handshake in progress.
    Handshaking,
    /// Connection is open and ready for data transfer.
    Open,
    /// Close frame being sent, teardown in progress.
    Closing,
    /// Connection is fully closed.
    Closed,
}

impl ConnectionState {
    /// Check if the connection holds or is acquiring a transport.
    ///
    /// Returns `true` for `Handshaking`, `Open`, or `Closing` states.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Handshaking | ConnectionState::Open | ConnectionState::Closing
        )
    }

    /// Check if sending data is allowed in this state.
    ///
    /// Returns `true` only for `Open` state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if `connect()` may start from this state.
    #[must_use]
    #[inline]
    pub const fn can_connect(&self) -> bool {
        matches!(self, ConnectionState::Idle)
    }

    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Handshaking => write!(f, "Handshaking"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
