use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::serializer::Supports;
use crate::wire::WireFormat;

/// The endpoint runtime's outbound half, as seen by generated proxies.
pub trait OutboundSink: Send + Sync + 'static {
    /// Queues one envelope. Must not block.
    fn send(&self, envelope: Envelope) -> Result<()>;

    /// Reports a failure that has no caller to return to.
    fn fault(&self, error: Error);
}

/// Cloneable handle generated proxies send through.
#[derive(Clone)]
pub struct Link {
    sink: Arc<dyn OutboundSink>,
    format: WireFormat,
}

impl Link {
    pub fn new(sink: Arc<dyn OutboundSink>, format: WireFormat) -> Self {
        Self { sink, format }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Starts an envelope for `method`.
    pub fn call(&self, method: &str) -> CallBuilder<'_> {
        CallBuilder {
            link: self,
            envelope: Envelope::new(method),
            error: None,
        }
    }

    /// Fire-and-forget send. Failures go to the connection's error hook.
    pub fn send(&self, envelope: Envelope) {
        if let Err(err) = self.sink.send(envelope) {
            self.sink.fault(err);
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").field("format", &self.format).finish()
    }
}

/// Accumulates arguments for one call; the first encoding error wins.
pub struct CallBuilder<'a> {
    link: &'a Link,
    envelope: Envelope,
    error: Option<Error>,
}

impl CallBuilder<'_> {
    pub fn arg<S, T>(mut self, value: &T) -> Self
    where
        S: Supports<T>,
        T: Serialize + DeserializeOwned,
    {
        if self.error.is_none() {
            match S::encode(self.link.format, value) {
                Ok(bytes) => self.envelope.push_raw(bytes),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    pub fn build(self) -> Result<Envelope> {
        match self.error {
            None => Ok(self.envelope),
            Some(err) => Err(err),
        }
    }

    pub fn send(self) {
        let link = self.link;
        match self.build() {
            Ok(envelope) => link.send(envelope),
            Err(err) => {
                tracing::warn!(error = %err, "dropping outbound call that failed to encode");
                link.sink.fault(err);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::serializer::WireSerializer;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) sent: Mutex<Vec<Envelope>>,
        pub(crate) faults: Mutex<Vec<String>>,
        pub(crate) closed: bool,
    }

    impl OutboundSink for RecordingSink {
        fn send(&self, envelope: Envelope) -> Result<()> {
            if self.closed {
                return Err(Error::LinkClosed);
            }
            self.sent.lock().unwrap().push(envelope);
            Ok(())
        }

        fn fault(&self, error: Error) {
            self.faults.lock().unwrap().push(error.to_string());
        }
    }

    struct Strings;

    impl WireSerializer for Strings {
        const NAME: &'static str = "tests::Strings";
        const TYPES: &'static [&'static str] = &["String", "u32"];
    }

    impl Supports<String> for Strings {}
    impl Supports<u32> for Strings {}

    #[test]
    fn test_call_builds_one_envelope_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let link = Link::new(sink.clone(), WireFormat::Bincode);

        link.call("split")
            .arg::<Strings, _>(&"a,b,c".to_string())
            .arg::<Strings, _>(&",".to_string())
            .send();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method(), "split");
        let first: String = WireFormat::Bincode.decode(&sent[0].args()[0]).unwrap();
        let second: String = WireFormat::Bincode.decode(&sent[0].args()[1]).unwrap();
        assert_eq!((first.as_str(), second.as_str()), ("a,b,c", ","));
    }

    #[test]
    fn test_closed_sink_reports_fault() {
        let sink = Arc::new(RecordingSink {
            closed: true,
            ..Default::default()
        });
        let link = Link::new(sink.clone(), WireFormat::Json);

        link.call("ping").send();

        assert!(sink.sent.lock().unwrap().is_empty());
        assert_eq!(sink.faults.lock().unwrap().len(), 1);
    }
}
