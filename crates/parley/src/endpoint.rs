//! Endpoint runtime.
//!
//! An endpoint owns the local implementation of the peer interface and a
//! transport. After a `Hello` exchange it hands the generated proxy to the
//! local side through [`RemoteAware::set_remote`]; from then on inbound frames
//! are dispatched in order on the reader task and outbound calls drain through
//! a writer task.

use std::sync::Arc;

use bytes::Bytes;
use parley_core::{
    dispatch, ConnectionState, Dispatched, Dispatcher, Envelope, Error, Frame, GeneratedUnit,
    Inbound, Link, OutboundSink, RemoteAware, PROTOCOL_VERSION,
};
use parley_transport::{DuplexListener, DuplexTransport, FrameSink, FrameStream, Transport};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::EndpointConfig;
use crate::error::{ParleyError, Result};

/// Receives every fault that has no caller to return to.
pub type ErrorHook = Arc<dyn Fn(&ParleyError) + Send + Sync>;

type AttachHook<U> = Box<dyn Fn(&U) + Send + Sync>;

enum Outbound {
    Call(Envelope),
    Close,
}

#[derive(Clone)]
struct Faults {
    unit: &'static str,
    hook: Option<ErrorHook>,
}

impl Faults {
    fn report(&self, error: &ParleyError) {
        tracing::warn!(unit = self.unit, %error, "endpoint fault");
        if let Some(hook) = &self.hook {
            hook(error);
        }
    }
}

/// Outbound half handed to generated proxies through their [`Link`].
struct ChannelSink {
    tx: mpsc::UnboundedSender<Outbound>,
    faults: Faults,
}

impl OutboundSink for ChannelSink {
    fn send(&self, envelope: Envelope) -> parley_core::Result<()> {
        self.tx
            .send(Outbound::Call(envelope))
            .map_err(|_| Error::LinkClosed)
    }

    fn fault(&self, error: Error) {
        self.faults.report(&error.into());
    }
}

struct StateCell {
    unit: &'static str,
    tx: watch::Sender<ConnectionState>,
}

impl StateCell {
    fn advance(&self, next: ConnectionState) -> parley_core::Result<()> {
        let current = *self.tx.borrow();
        let next = current.transition(next)?;
        self.tx.send_replace(next);
        tracing::info!(unit = self.unit, from = %current, to = %next, "connection state changed");
        Ok(())
    }
}

/// A local implementation waiting for a connection.
///
/// `U` is the generated unit for the interface this side calls; `L` is the
/// local implementation of the peer interface.
pub struct Endpoint<U, L> {
    local: L,
    config: EndpointConfig,
    on_error: Option<ErrorHook>,
    on_attached: Option<AttachHook<U>>,
}

impl<U, L> Endpoint<U, L>
where
    U: GeneratedUnit + Dispatcher<L>,
    L: RemoteAware<U> + Send + 'static,
{
    pub fn new(local: L) -> Self {
        Self {
            local,
            config: EndpointConfig::default(),
            on_error: None,
            on_attached: None,
        }
    }

    pub fn with_config(mut self, config: EndpointConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs the error hook.
    pub fn on_error(mut self, hook: impl Fn(&ParleyError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Observes the proxy once the peer is attached, right after
    /// `set_remote`.
    pub fn on_attached(mut self, hook: impl Fn(&U) + Send + Sync + 'static) -> Self {
        self.on_attached = Some(Box::new(hook));
        self
    }

    /// Dials the configured address, or the default host plus `U::ROUTE`.
    ///
    /// The hello announces the dialed address's route, so an explicit
    /// address can point the peer at a route other than `U::ROUTE`.
    #[tracing::instrument(skip(self), fields(unit = U::NAME))]
    pub async fn connect(self) -> Result<EndpointHandle<U, L>> {
        let address = self.config.resolve_address(U::ROUTE)?;
        tracing::debug!(%address, "Dialing peer");
        let transport = DuplexTransport::connect(
            (address.host(), address.port()),
            self.config.max_frame_len(),
        )
        .await?;
        let route = match address.route() {
            "" => U::ROUTE.to_string(),
            route => route.to_string(),
        };
        Ok(self.spawn_routed(transport, route))
    }

    /// Serves the next inbound connection on `listener`.
    #[tracing::instrument(skip_all, fields(unit = U::NAME))]
    pub async fn accept(self, listener: &DuplexListener) -> Result<EndpointHandle<U, L>> {
        let transport = listener.accept().await?;
        Ok(self.spawn(transport))
    }

    /// Runs the endpoint over an established transport.
    ///
    /// Must be called within a Tokio runtime. Calls made on the returned
    /// proxy before the handshake completes are queued.
    pub fn spawn<T: Transport>(self, transport: T) -> EndpointHandle<U, L> {
        self.spawn_routed(transport, U::ROUTE.to_string())
    }

    fn spawn_routed<T: Transport>(self, transport: T, route: String) -> EndpointHandle<U, L> {
        let Endpoint {
            local,
            config,
            on_error,
            on_attached,
        } = self;

        let faults = Faults {
            unit: U::NAME,
            hook: on_error,
        };
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Unconnected);
        let shutdown = Arc::new(Notify::new());

        let link = Link::new(
            Arc::new(ChannelSink {
                tx: outbound_tx.clone(),
                faults: faults.clone(),
            }),
            config.wire_format(),
        );
        let remote = U::attach(link);

        let span = tracing::info_span!("endpoint", unit = U::NAME, peer = %transport.peer());
        let (sink, stream) = transport.split();
        let driver = Driver {
            local,
            remote: remote.clone(),
            route,
            config,
            faults,
            state: StateCell {
                unit: U::NAME,
                tx: state_tx,
            },
            outbound_tx,
            shutdown: Arc::clone(&shutdown),
            on_attached,
        };
        let task = tokio::spawn(driver.run(sink, stream, outbound_rx).instrument(span));

        EndpointHandle {
            remote,
            state: state_rx,
            shutdown,
            task,
        }
    }
}

/// Control surface of a running endpoint.
pub struct EndpointHandle<U, L> {
    remote: U,
    state: watch::Receiver<ConnectionState>,
    shutdown: Arc<Notify>,
    task: JoinHandle<L>,
}

impl<U: GeneratedUnit, L> EndpointHandle<U, L> {
    /// The generated proxy for the peer. Cloneable, never blocks.
    pub fn remote(&self) -> &U {
        &self.remote
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits for the handshake to complete.
    pub async fn connected(&self) -> Result<()> {
        let mut state = self.state.clone();
        let reached = state
            .wait_for(|state| *state == ConnectionState::Connected || state.is_terminal())
            .await
            .map(|state| *state)
            .unwrap_or_else(|_| self.state());
        match reached {
            ConnectionState::Connected => Ok(()),
            other => Err(ParleyError::NotConnected(other)),
        }
    }

    /// Flushes queued calls and closes the connection.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    /// Waits for the endpoint to stop and returns the local implementation.
    pub async fn join(self) -> Result<L> {
        Ok(self.task.await?)
    }
}

struct Driver<U, L> {
    local: L,
    remote: U,
    /// Route announced in our hello.
    route: String,
    config: EndpointConfig,
    faults: Faults,
    state: StateCell,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    shutdown: Arc<Notify>,
    on_attached: Option<AttachHook<U>>,
}

impl<U, L> Driver<U, L>
where
    U: GeneratedUnit + Dispatcher<L>,
    L: RemoteAware<U> + Send + 'static,
{
    async fn run<S, R>(
        mut self,
        mut sink: S,
        mut stream: R,
        outbound: mpsc::UnboundedReceiver<Outbound>,
    ) -> L
    where
        S: FrameSink,
        R: FrameStream,
    {
        self.enter(ConnectionState::Connecting);

        match self.handshake(&mut sink, &mut stream).await {
            Ok(true) => {}
            Ok(false) => {
                let _ = sink.close().await;
                self.enter(ConnectionState::Closed);
                return self.local;
            }
            Err(err) => {
                let _ = sink.close().await;
                self.fail(err);
                return self.local;
            }
        }

        self.local.set_remote(self.remote.clone());
        if let Some(hook) = &self.on_attached {
            hook(&self.remote);
        }
        self.enter(ConnectionState::Connected);

        let mut writer = tokio::spawn(
            write_loop(sink, outbound, self.config.wire_format()).in_current_span(),
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    let _ = self.outbound_tx.send(Outbound::Close);
                    match writer.await {
                        Ok(Ok(())) => self.enter(ConnectionState::Closed),
                        Ok(Err(err)) => self.fail(err),
                        Err(err) => self.fail(err.into()),
                    }
                    break;
                }
                result = &mut writer => {
                    match result {
                        Ok(Ok(())) => self.enter(ConnectionState::Closed),
                        Ok(Err(err)) => self.fail(err),
                        Err(err) => self.fail(err.into()),
                    }
                    break;
                }
                frame = stream.recv() => match frame {
                    Ok(Some(bytes)) => self.on_frame(&bytes),
                    Ok(None) => {
                        tracing::info!("Peer closed the connection");
                        let _ = self.outbound_tx.send(Outbound::Close);
                        let _ = writer.await;
                        self.enter(ConnectionState::Closed);
                        break;
                    }
                    Err(err) => {
                        writer.abort();
                        self.fail(err.into());
                        break;
                    }
                },
            }
        }

        self.local
    }

    /// Returns `Ok(false)` if the endpoint was closed before the peer answered.
    async fn handshake<S, R>(&mut self, sink: &mut S, stream: &mut R) -> Result<bool>
    where
        S: FrameSink,
        R: FrameStream,
    {
        let format = self.config.wire_format();
        sink.send(Bytes::from(Frame::hello(self.route.as_str()).encode(format)?))
            .await?;

        let frame = tokio::select! {
            _ = self.shutdown.notified() => return Ok(false),
            frame = stream.recv() => frame?,
        };
        let bytes =
            frame.ok_or_else(|| ParleyError::Handshake("peer closed before hello".to_string()))?;

        match Frame::decode(format, &bytes)? {
            Frame::Hello { protocol, route } => {
                if protocol != PROTOCOL_VERSION {
                    return Err(ParleyError::Handshake(format!(
                        "peer speaks protocol {protocol}, expected {PROTOCOL_VERSION}"
                    )));
                }
                if let Some(expected) = self.config.expect_route() {
                    if expected != route {
                        return Err(ParleyError::RouteMismatch {
                            expected: expected.to_string(),
                            actual: route,
                        });
                    }
                }
                tracing::debug!(peer_route = %route, "Handshake complete");
                Ok(true)
            }
            Frame::Call(_) => Err(ParleyError::Handshake(
                "peer sent a call before hello".to_string(),
            )),
        }
    }

    fn on_frame(&self, bytes: &[u8]) {
        let format = self.config.wire_format();
        match Frame::decode(format, bytes) {
            Ok(Frame::Call(envelope)) => {
                let call = Inbound::new(&envelope, format);
                match dispatch::<U, L>(&self.local, &call) {
                    Ok(Dispatched::Invoked(index)) => {
                        tracing::trace!(method = call.method(), index, "Dispatched inbound call");
                    }
                    Ok(Dispatched::Dropped) => {}
                    Err(err) => self.faults.report(&err.into()),
                }
            }
            Ok(Frame::Hello { .. }) => tracing::debug!("Ignoring repeated hello"),
            Err(err) => self.faults.report(&err.into()),
        }
    }

    fn enter(&self, next: ConnectionState) {
        if let Err(err) = self.state.advance(next) {
            self.faults.report(&err.into());
        }
    }

    fn fail(&self, error: ParleyError) {
        tracing::error!(unit = U::NAME, %error, "Connection failed");
        if let Some(hook) = &self.faults.hook {
            hook(&error);
        }
        self.enter(ConnectionState::Errored);
    }
}

async fn write_loop<S: FrameSink>(
    mut sink: S,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    format: parley_core::WireFormat,
) -> Result<()> {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Call(envelope) => {
                let frame = Frame::Call(envelope).encode(format)?;
                sink.send(Bytes::from(frame)).await?;
            }
            Outbound::Close => break,
        }
    }
    sink.close().await?;
    Ok(())
}
