use std::fmt;

use crate::error::{Error, Result};

/// Lifecycle of one connection. Transitions are driven by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unconnected,
    Connecting,
    /// Handshake done; calls flow both ways.
    Connected,
    Closed,
    Errored,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }

    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Unconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Closed)
                | (Connecting, Errored)
                | (Connected, Closed)
                | (Connected, Errored)
        )
    }

    pub fn transition(self, next: ConnectionState) -> Result<ConnectionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Unconnected => "UNCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Closed => "CLOSED",
            ConnectionState::Errored => "ERRORED",
        };
        f.write_str(name)
    }
}
