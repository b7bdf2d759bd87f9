use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::wire::WireFormat;

/// Version carried in the handshake. Peers speaking another version are refused.
pub const PROTOCOL_VERSION: u16 = 1;

/// One remote call in one direction: a wire method name plus its arguments,
/// each already encoded by the direction's serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    method: String,
    args: Vec<Vec<u8>>,
}

impl Envelope {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Vec::new(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Number of arguments, the second half of the dispatch key.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Appends an argument that is already in wire form.
    pub fn push_raw(&mut self, bytes: Vec<u8>) {
        self.args.push(bytes);
    }
}

/// Everything that crosses a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// First frame in each direction. `route` is the routing path the sender
    /// addresses.
    Hello { protocol: u16, route: String },
    /// A single call.
    Call(Envelope),
}

impl Frame {
    pub fn hello(route: impl Into<String>) -> Self {
        Frame::Hello {
            protocol: PROTOCOL_VERSION,
            route: route.into(),
        }
    }

    pub fn encode(&self, format: WireFormat) -> Result<Vec<u8>> {
        format.encode(self)
    }

    pub fn decode(format: WireFormat, bytes: &[u8]) -> Result<Self> {
        format.decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_keeps_argument_order() {
        let mut envelope = Envelope::new("split");
        envelope.push_raw(vec![1]);
        envelope.push_raw(vec![2, 2]);

        assert_eq!(envelope.method(), "split");
        assert_eq!(envelope.arity(), 2);
        assert_eq!(envelope.args(), &[vec![1], vec![2, 2]]);
    }

    #[test]
    fn test_frame_hello_carries_protocol() {
        let frame = Frame::hello("worker.js");
        let bytes = frame.encode(WireFormat::Bincode).unwrap();
        match Frame::decode(WireFormat::Bincode, &bytes).unwrap() {
            Frame::Hello { protocol, route } => {
                assert_eq!(protocol, PROTOCOL_VERSION);
                assert_eq!(route, "worker.js");
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
