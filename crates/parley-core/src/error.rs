use thiserror::Error;

use crate::state::ConnectionState;

/// Errors raised by the runtime contract.
#[derive(Error, Debug)]
pub enum Error {
    /// Bincode could not encode or decode a value.
    #[error("bincode wire error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON could not encode or decode a value.
    #[error("json wire error: {0}")]
    Json(#[from] serde_json::Error),

    /// A resolved inbound call carried an argument that does not decode to the
    /// declared parameter type.
    #[error("argument {index} of `{method}` could not be coerced: {source}")]
    Coercion {
        method: String,
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// A resolved inbound call is shorter than its table entry claims.
    #[error("argument {index} missing from `{method}` envelope")]
    MissingArgument { method: String, index: usize },

    /// The state machine refused a transition.
    #[error("invalid connection state transition {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The outbound side of the connection is gone.
    #[error("link closed")]
    LinkClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
