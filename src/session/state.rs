//! Session lifecycle states.

/// Lifecycle of one streaming session.
///
/// `Idle -> Connecting -> AwaitingSessionAck -> Active -> Closing -> Closed`,
/// with `Error` reachable from any non-terminal state. Only the session
/// worker transitions states; observers read them through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    /// Connected; the session-configuration message is sent and the service
    /// has not yet acknowledged it.
    AwaitingSessionAck,
    Active,
    Closing,
    Closed,
    Error,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }

    /// True while the session is running toward or in the active state.
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingSessionAck | Self::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(SessionState::Closed.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(!SessionState::Active.is_terminal());
        assert!(!SessionState::Closing.is_terminal());
    }

    #[test]
    fn streaming_states() {
        assert!(SessionState::Connecting.is_streaming());
        assert!(SessionState::AwaitingSessionAck.is_streaming());
        assert!(SessionState::Active.is_streaming());
        assert!(!SessionState::Idle.is_streaming());
        assert!(!SessionState::Closing.is_streaming());
        assert!(!SessionState::Closed.is_streaming());
    }
}
