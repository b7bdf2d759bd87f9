//! In-process worker channels.
//!
//! A dedicated worker and the thread that spawned it talk through a pair of
//! unbounded queues. Dropping or closing one side ends the other side's
//! stream.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::transport::{FrameSink, FrameStream, Transport};

/// One end of a worker channel.
#[derive(Debug)]
pub struct WorkerPort {
    label: String,
    tx: mpsc::UnboundedSender<Bytes>,
    rx: mpsc::UnboundedReceiver<Bytes>,
}

/// Creates a connected pair of ports. `label` names the worker in logs.
pub fn channel(label: impl Into<String>) -> (WorkerPort, WorkerPort) {
    let label = label.into();
    let (host_tx, worker_rx) = mpsc::unbounded_channel();
    let (worker_tx, host_rx) = mpsc::unbounded_channel();
    (
        WorkerPort {
            label: format!("host<->{label}"),
            tx: host_tx,
            rx: host_rx,
        },
        WorkerPort {
            label: format!("{label}<->host"),
            tx: worker_tx,
            rx: worker_rx,
        },
    )
}

impl Transport for WorkerPort {
    type Sink = WorkerSink;
    type Stream = WorkerStream;

    fn peer(&self) -> String {
        self.label.clone()
    }

    fn split(self) -> (WorkerSink, WorkerStream) {
        (WorkerSink { tx: Some(self.tx) }, WorkerStream { rx: self.rx })
    }
}

#[derive(Debug)]
pub struct WorkerSink {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
}

#[async_trait]
impl FrameSink for WorkerSink {
    async fn send(&mut self, frame: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

#[derive(Debug)]
pub struct WorkerStream {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

#[async_trait]
impl FrameStream for WorkerStream {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }
}
