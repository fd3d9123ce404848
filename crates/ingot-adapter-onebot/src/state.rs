//! Explicit connection lifecycle state machine.
//!
//! The supervisor drives every transition through
//! [`ConnectionState::can_transition`], so the legal lifecycle is encoded in
//! one place and testable without sockets:
//!
//! ```text
//! Disconnected ──▶ Connecting ──▶ Connected ──▶ Disconnected ──▶ …
//!       │               │                            ▲
//!       └───────────────┴──────▶ Closing ────────────┘  (terminal)
//! ```

/// Lifecycle state of the single logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live socket; the reconnect loop may dial.
    Disconnected,
    /// A dial is in flight.
    Connecting,
    /// A live socket exists and a listener is bound to it.
    Connected,
    /// Shutdown was requested; the next state is `Disconnected`, terminally.
    Closing,
}

impl ConnectionState {
    /// Returns whether moving from `self` to `next` is a legal transition.
    pub fn can_transition(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            // Dial attempt and its two outcomes.
            (Disconnected, Connecting) => true,
            (Connecting, Connected) => true,
            (Connecting, Disconnected) => true,
            // Read or write error on a live connection.
            (Connected, Disconnected) => true,
            // Externally requested shutdown, from any non-closing state.
            (Disconnected | Connecting | Connected, Closing) => true,
            (Closing, Disconnected) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn dial_lifecycle_is_legal() {
        assert!(Disconnected.can_transition(Connecting));
        assert!(Connecting.can_transition(Connected));
        assert!(Connecting.can_transition(Disconnected));
        assert!(Connected.can_transition(Disconnected));
    }

    #[test]
    fn shutdown_is_reachable_from_anywhere_and_terminal() {
        assert!(Disconnected.can_transition(Closing));
        assert!(Connecting.can_transition(Closing));
        assert!(Connected.can_transition(Closing));
        assert!(Closing.can_transition(Disconnected));
        assert!(!Closing.can_transition(Connecting));
        assert!(!Closing.can_transition(Connected));
    }

    #[test]
    fn illegal_edges_are_rejected() {
        assert!(!Disconnected.can_transition(Connected));
        assert!(!Connected.can_transition(Connecting));
        assert!(!Connected.can_transition(Connected));
        assert!(!Closing.can_transition(Closing));
    }
}
