#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use parley::transport::{FrameSink, FrameStream, Transport, WorkerPort};
use parley::{Callback, CallbackRegistry, Envelope, Frame, ParleyError, RemoteAware, WireFormat};
use tokio::sync::mpsc;

#[parley::remote_pair(Worker, Host)]
pub mod split_rpc {
    use parley::Callback;

    #[route("split_worker")]
    pub trait Worker {
        fn ping(&self);
        fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>);
    }

    #[route("host")]
    pub trait Host {
        fn pong(&self);
        fn split_done(&self, callback: Callback<Vec<String>>, parts: Vec<String>);
    }
}

pub use split_rpc::{Host, HostProxyImpl, Worker, WorkerProxyImpl};

/// Host side: calls the worker, receives pongs and split results.
pub struct HostSide {
    worker: Option<WorkerProxyImpl>,
    pub pending: Arc<CallbackRegistry<Vec<String>>>,
    pongs: mpsc::UnboundedSender<()>,
}

impl HostSide {
    pub fn new(
        pending: Arc<CallbackRegistry<Vec<String>>>,
    ) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (pongs, rx) = mpsc::unbounded_channel();
        (
            Self {
                worker: None,
                pending,
                pongs,
            },
            rx,
        )
    }
}

impl RemoteAware<WorkerProxyImpl> for HostSide {
    fn set_remote(&mut self, remote: WorkerProxyImpl) {
        self.worker = Some(remote);
    }

    fn get_remote(&self) -> Option<&WorkerProxyImpl> {
        self.worker.as_ref()
    }
}

impl Host for HostSide {
    fn pong(&self) {
        let _ = self.pongs.send(());
    }

    fn split_done(&self, callback: Callback<Vec<String>>, parts: Vec<String>) {
        self.pending.complete(callback, parts);
    }
}

/// Worker side: splits strings and answers through the host proxy.
#[derive(Default)]
pub struct WorkerSide {
    host: Option<HostProxyImpl>,
}

impl RemoteAware<HostProxyImpl> for WorkerSide {
    fn set_remote(&mut self, remote: HostProxyImpl) {
        self.host = Some(remote);
    }

    fn get_remote(&self) -> Option<&HostProxyImpl> {
        self.host.as_ref()
    }
}

impl Worker for WorkerSide {
    fn ping(&self) {
        if let Some(host) = self.get_remote() {
            host.pong();
        }
    }

    fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>) {
        let parts = input.split(pattern.as_str()).map(str::to_string).collect();
        if let Some(host) = self.get_remote() {
            host.split_done(callback, parts);
        }
    }
}

/// Collects everything an endpoint's error hook sees.
#[derive(Clone, Default)]
pub struct Faults(Arc<Mutex<Vec<String>>>);

impl Faults {
    pub fn hook(&self) -> Box<dyn Fn(&ParleyError) + Send + Sync> {
        let seen = Arc::clone(&self.0);
        Box::new(move |err: &ParleyError| seen.lock().unwrap().push(err.to_string()))
    }

    pub fn seen(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Hand-driven peer for feeding raw envelopes to an endpoint.
pub struct RawPeer {
    sink: <WorkerPort as Transport>::Sink,
    stream: <WorkerPort as Transport>::Stream,
}

impl RawPeer {
    /// Completes the handshake from the peer's side.
    pub async fn attach(port: WorkerPort, route: &str) -> Self {
        let (mut sink, mut stream) = port.split();
        let hello = Frame::hello(route).encode(WireFormat::Bincode).unwrap();
        sink.send(Bytes::from(hello)).await.unwrap();
        let first = stream.recv().await.unwrap().unwrap();
        assert!(matches!(
            Frame::decode(WireFormat::Bincode, &first).unwrap(),
            Frame::Hello { .. }
        ));
        Self { sink, stream }
    }

    pub async fn send(&mut self, envelope: Envelope) {
        let frame = Frame::Call(envelope).encode(WireFormat::Bincode).unwrap();
        self.sink.send(Bytes::from(frame)).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &'static [u8]) {
        self.sink.send(Bytes::from_static(bytes)).await.unwrap();
    }

    /// Next call the endpoint sent to this peer.
    pub async fn recv(&mut self) -> Option<Envelope> {
        let bytes = self.stream.recv().await.unwrap()?;
        match Frame::decode(WireFormat::Bincode, &bytes).unwrap() {
            Frame::Call(envelope) => Some(envelope),
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

/// Envelope with each argument encoded as bincode.
pub fn envelope(method: &str, args: &[Vec<u8>]) -> Envelope {
    let mut envelope = Envelope::new(method);
    for arg in args {
        envelope.push_raw(arg.clone());
    }
    envelope
}

pub fn encode<T: serde::Serialize>(value: &T) -> Vec<u8> {
    WireFormat::Bincode.encode(value).unwrap()
}
