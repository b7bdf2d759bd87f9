//! # parley
//!
//! Typed, bidirectional, fire-and-forget RPC between two paired endpoints,
//! such as a host and its dedicated worker or a client and a server.
//!
//! Declare both sides as traits in one module and name the side you want to
//! call:
//!
//! ```ignore
//! #[parley::remote_pair(Worker)]
//! mod split_rpc {
//!     use parley::Callback;
//!
//!     #[route("split_worker")]
//!     pub trait Worker {
//!         fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>);
//!     }
//!
//!     pub trait Host {
//!         fn split_done(&self, callback: Callback<Vec<String>>, parts: Vec<String>);
//!     }
//! }
//! ```
//!
//! The macro generates `split_rpc::WorkerProxyImpl`, which implements
//! `Worker` by forwarding every call to the peer, and a dispatcher that
//! routes the peer's calls to your local `Host` implementation. Run it with
//! an [`Endpoint`].

// Generated code names this crate as `::parley`, including inside its own tests.
extern crate self as parley;

pub mod config;
pub mod endpoint;
mod error;
pub mod telemetry;
pub mod worker;

pub use parley_macros::remote_pair;

pub use parley_core as runtime;
pub use parley_transport as transport;

pub use config::{Address, EndpointConfig, EndpointConfigBuilder};
pub use endpoint::{Endpoint, EndpointHandle, ErrorHook};
pub use error::{ParleyError, Result};
pub use parley_core::{
    Callback, CallbackRegistry, ConnectionState, Dispatched, DispatchTable, Envelope, Frame,
    GeneratedUnit, Link, MethodDescriptor, RemoteAware, WireFormat, WireSerializer,
    PROTOCOL_VERSION,
};
pub use worker::{create_dedicated_worker, DedicatedWorker};

#[doc(hidden)]
pub mod __private {
    pub use parley_core::*;
}
