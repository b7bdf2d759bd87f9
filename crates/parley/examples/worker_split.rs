//! A host hands string splitting to a dedicated worker and gets the parts
//! back through a callback token.
//!
//! Run with `RUST_LOG` unset to see endpoint state changes at info level.

use std::sync::Arc;

use parley::telemetry::{shutdown_tracing, TelemetryConfig};
use parley::{
    create_dedicated_worker, Callback, CallbackRegistry, Endpoint, ParleyError, RemoteAware,
};
use tokio::sync::oneshot;

#[parley::remote_pair(Worker, Host)]
mod split_rpc {
    use parley::Callback;

    #[route("split_worker")]
    pub trait Worker {
        fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>);
    }

    #[route("host")]
    pub trait Host {
        fn split_done(&self, callback: Callback<Vec<String>>, parts: Vec<String>);
    }
}

use split_rpc::{Host, HostProxyImpl, Worker, WorkerProxyImpl};

struct SplitHost {
    worker: Option<WorkerProxyImpl>,
    pending: Arc<CallbackRegistry<Vec<String>>>,
}

impl RemoteAware<WorkerProxyImpl> for SplitHost {
    fn set_remote(&mut self, remote: WorkerProxyImpl) {
        self.worker = Some(remote);
    }

    fn get_remote(&self) -> Option<&WorkerProxyImpl> {
        self.worker.as_ref()
    }
}

impl Host for SplitHost {
    fn split_done(&self, callback: Callback<Vec<String>>, parts: Vec<String>) {
        if !self.pending.complete(callback, parts) {
            tracing::warn!(id = callback.id(), "Worker answered an unknown callback");
        }
    }
}

#[derive(Default)]
struct SplitWorker {
    host: Option<HostProxyImpl>,
}

impl RemoteAware<HostProxyImpl> for SplitWorker {
    fn set_remote(&mut self, remote: HostProxyImpl) {
        self.host = Some(remote);
    }

    fn get_remote(&self) -> Option<&HostProxyImpl> {
        self.host.as_ref()
    }
}

impl Worker for SplitWorker {
    fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>) {
        let parts = input.split(pattern.as_str()).map(str::to_string).collect();
        if let Some(host) = self.get_remote() {
            host.split_done(callback, parts);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    TelemetryConfig::builder()
        .service_name("worker-split")
        .log_level("info")
        .build()
        .init()?;

    let pending = Arc::new(CallbackRegistry::new());
    let host = SplitHost {
        worker: None,
        pending: Arc::clone(&pending),
    };

    let pair = create_dedicated_worker(
        Endpoint::<WorkerProxyImpl, _>::new(host)
            .on_error(|err: &ParleyError| tracing::error!(%err, "Host fault")),
        Endpoint::<HostProxyImpl, _>::new(SplitWorker::default()),
    );
    pair.host.connected().await?;

    let (tx, rx) = oneshot::channel();
    let callback = pending.register(move |parts| {
        let _ = tx.send(parts);
    });
    pair.host.remote().split(
        "parley,splits,strings,off,thread".to_string(),
        ",".to_string(),
        callback,
    );

    let parts = rx.await?;
    println!("Worker returned {} parts: {parts:?}", parts.len());

    pair.host.close();
    pair.host.join().await?;
    shutdown_tracing();
    Ok(())
}
