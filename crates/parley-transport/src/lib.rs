//! Frame transports.
//!
//! A transport moves opaque frames between two endpoints and splits into an
//! independent sink and stream so reading and writing can run as separate
//! tasks.

mod error;
pub mod transport;
pub mod worker;

pub use error::{Result, TransportError};
pub use transport::{
    DuplexListener, DuplexTransport, FrameSink, FrameStream, TcpFrameSink, TcpFrameStream,
    Transport, DEFAULT_MAX_FRAME_LEN,
};
pub use worker::{channel, WorkerPort, WorkerSink, WorkerStream};
