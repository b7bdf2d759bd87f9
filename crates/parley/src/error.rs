use parley_core::ConnectionState;
use thiserror::Error;

/// Unified error type for `parley`.
///
/// Aggregates errors from the runtime contract and the transports into a
/// single type for application-level handling and for the endpoint's error
/// hook.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Wire, dispatch or state machine error.
    #[error("Runtime error: {0}")]
    Core(#[from] parley_core::Error),

    /// Error moving frames.
    #[error("Transport error: {0}")]
    Transport(#[from] parley_transport::TransportError),

    /// The peer did not complete the handshake.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The peer addressed a different route than this endpoint serves.
    #[error("Peer addressed route `{actual}`, expected `{expected}`")]
    RouteMismatch { expected: String, actual: String },

    /// Neither an explicit address nor a default host is configured.
    #[error("No address configured for route `{route}`")]
    NoAddress { route: String },

    /// An address string that is not `tcp://host:port[/route]`.
    #[error("Invalid address `{input}`: {reason}")]
    InvalidAddress { input: String, reason: &'static str },

    /// The connection ended before reaching `Connected`.
    #[error("Endpoint is not connected (state {0})")]
    NotConnected(ConnectionState),

    /// The endpoint task panicked or was cancelled.
    #[error("Endpoint task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ParleyError>;
