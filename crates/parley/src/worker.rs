//! Dedicated workers.
//!
//! A dedicated worker is an endpoint running on its own task, connected to
//! the spawning side through an in-process channel instead of a socket.

use parley_core::{Dispatcher, GeneratedUnit, RemoteAware};

use crate::endpoint::{Endpoint, EndpointHandle};

/// Handles for both sides of a dedicated worker.
pub struct DedicatedWorker<HU, H, WU, W> {
    /// The spawning side; its proxy calls into the worker.
    pub host: EndpointHandle<HU, H>,
    pub worker: EndpointHandle<WU, W>,
}

/// Starts `worker` as a dedicated worker of `host`.
///
/// The channel is labelled with the host unit's route, the path the worker
/// would be loaded from.
pub fn create_dedicated_worker<HU, H, WU, W>(
    host: Endpoint<HU, H>,
    worker: Endpoint<WU, W>,
) -> DedicatedWorker<HU, H, WU, W>
where
    HU: GeneratedUnit + Dispatcher<H>,
    H: RemoteAware<HU> + Send + 'static,
    WU: GeneratedUnit + Dispatcher<W>,
    W: RemoteAware<WU> + Send + 'static,
{
    let (host_port, worker_port) = parley_transport::channel(HU::ROUTE);
    tracing::debug!(route = HU::ROUTE, worker = WU::NAME, "Spawning dedicated worker");
    DedicatedWorker {
        worker: worker.spawn(worker_port),
        host: host.spawn(host_port),
    }
}
