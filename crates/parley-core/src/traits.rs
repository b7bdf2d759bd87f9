use crate::dispatch::DispatchTable;
use crate::link::Link;
use crate::serializer::WireSerializer;

/// A generated proxy/dispatcher/serializer bundle for one interface pair.
///
/// The implementing type is the proxy: it implements the proxied interface by
/// forwarding every call through its [`Link`]. It never holds any other state.
pub trait GeneratedUnit: Clone + Send + Sync + 'static {
    /// Deterministic artifact name, `<module>::<Trait>_ProxyImpl`.
    const NAME: &'static str;

    /// Routing path declared on the proxied interface.
    const ROUTE: &'static str;

    /// Methods this side can call.
    const OUTBOUND: DispatchTable;

    /// Methods the peer can call on the local implementation.
    const INBOUND: DispatchTable;

    type OutboundSerializer: WireSerializer;
    type InboundSerializer: WireSerializer;

    /// Binds a proxy to a live connection.
    fn attach(link: Link) -> Self;

    fn link(&self) -> &Link;
}

/// The two infrastructure accessors every local endpoint provides.
///
/// They are never remote-callable; the runtime calls `set_remote` once the
/// handshake completes.
pub trait RemoteAware<P> {
    fn set_remote(&mut self, remote: P);

    fn get_remote(&self) -> Option<&P>;
}
