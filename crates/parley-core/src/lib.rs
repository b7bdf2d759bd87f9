//! Runtime contract shared by `parley` generated code and the endpoint runtime.
//!
//! Generated proxies build [`Envelope`]s through a [`Link`]; generated
//! dispatchers resolve inbound envelopes through a [`DispatchTable`] and decode
//! arguments with a closure-scoped [`WireSerializer`].

mod callback;
mod dispatch;
mod envelope;
mod error;
mod link;
mod serializer;
mod state;
mod traits;
mod wire;

pub use callback::{Callback, CallbackRegistry};
pub use dispatch::{dispatch, Dispatched, Dispatcher, DispatchTable, Inbound, MethodDescriptor};
pub use envelope::{Envelope, Frame, PROTOCOL_VERSION};
pub use error::{Error, Result};
pub use link::{CallBuilder, Link, OutboundSink};
pub use serializer::{Supports, WireSerializer};
pub use state::ConnectionState;
pub use traits::{GeneratedUnit, RemoteAware};
pub use wire::WireFormat;
