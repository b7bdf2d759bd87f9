//! Generator core behind `#[parley::remote_pair]`.
//!
//! Given a proxied interface and its peer, [`generate`] produces one unit:
//! a forwarding proxy for the proxied side, a dispatcher that routes inbound
//! calls to a local peer implementation, and two serializers scoped to the
//! types each direction actually carries.
//!
//! The crate is plain Rust over `syn` so every stage can be unit tested; the
//! proc-macro crate only wires the host's capabilities into [`generate`].

pub mod analyzer;
pub mod capabilities;
pub mod closure;
pub mod dispatcher;
pub mod error;
pub mod naming;
pub mod proxy;
pub mod serializer;
pub mod unit;

pub use analyzer::{
    analyze_interface, analyze_pair, strip_helper_attributes, AnalyzedPair, Direction,
    InterfaceModel, Param, RemoteInterfacePair, RemoteMethod, INFRASTRUCTURE_ACCESSORS,
};
pub use capabilities::{
    CodegenOptions, CompilerCapabilities, SerializerSpec, SerializerSynthesis, SourceEmission,
    SyntacticIntrospection, TokenEmitter, TypeIntrospection,
};
pub use closure::{build_closure, type_key, TypeClosure};
pub use error::{ErrorKind, GenerationError, Result};
pub use naming::{UnitNames, PROXY_SUFFIX};
pub use serializer::SerdeSynthesis;
pub use unit::{generate, GeneratedUnit};
