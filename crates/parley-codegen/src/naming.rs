use quote::format_ident;
use syn::Ident;

/// Fixed suffix appended to the proxied interface's name.
pub const PROXY_SUFFIX: &str = "ProxyImpl";

/// Deterministic names for everything one unit emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitNames {
    /// Proxy struct, e.g. `WorkerProxyImpl`.
    pub unit: Ident,
    /// Module-relative artifact name, e.g. `rpc::Worker_ProxyImpl`.
    pub qualified: String,
    pub outbound_serializer: Ident,
    pub inbound_serializer: Ident,
}

impl UnitNames {
    pub fn new(module: &Ident, interface: &Ident) -> Self {
        let unit = format_ident!("{}{}", interface, PROXY_SUFFIX);
        Self {
            outbound_serializer: format_ident!("{}OutboundSerializer", unit),
            inbound_serializer: format_ident!("{}InboundSerializer", unit),
            qualified: format!("{module}::{interface}_{PROXY_SUFFIX}"),
            unit,
        }
    }

    /// Artifact name relative to the declaring module, as `module_path!()`
    /// completes it at the use site.
    pub fn artifact(&self) -> &str {
        self.qualified
            .split_once("::")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.qualified)
    }

    pub fn outbound_artifact(&self) -> String {
        format!("{}_OutboundSerializer", self.artifact())
    }

    pub fn inbound_artifact(&self) -> String {
        format!("{}_InboundSerializer", self.artifact())
    }
}
