use std::fmt;
use std::str::FromStr;

use parley_core::WireFormat;
use parley_transport::DEFAULT_MAX_FRAME_LEN;

use crate::error::{ParleyError, Result};

const SCHEME: &str = "tcp://";

/// Where a peer lives: `tcp://host:port/route`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    host: String,
    port: u16,
    route: String,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16, route: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            route: route.into().trim_start_matches('/').to_string(),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason| ParleyError::InvalidAddress {
            input: input.to_string(),
            reason,
        };

        let rest = input
            .strip_prefix(SCHEME)
            .ok_or_else(|| invalid("expected a `tcp://` address"))?;
        let (authority, route) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port.parse().map_err(|_| invalid("port is not a number"))?;

        Ok(Self::new(host, port, route))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

impl FromStr for Address {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{SCHEME}[{}]:{}/{}", self.host, self.port, self.route)
        } else {
            write!(f, "{SCHEME}{}:{}/{}", self.host, self.port, self.route)
        }
    }
}

/// Configuration for one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    address: Option<Address>,
    default_host: Option<String>,
    wire_format: WireFormat,
    max_frame_len: usize,
    expect_route: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfigBuilder::default().build()
    }
}

impl EndpointConfig {
    /// Creates a new configuration builder with default settings.
    pub fn builder() -> EndpointConfigBuilder {
        EndpointConfigBuilder::default()
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    pub fn expect_route(&self) -> Option<&str> {
        self.expect_route.as_deref()
    }

    /// Address to dial for a unit declared with `route`.
    ///
    /// An explicit address wins; otherwise the route is appended to the
    /// default host.
    pub fn resolve_address(&self, route: &str) -> Result<Address> {
        if let Some(address) = &self.address {
            return Ok(address.clone());
        }
        match &self.default_host {
            Some(host) => Address::parse(&format!(
                "{SCHEME}{host}/{}",
                route.trim_start_matches('/')
            )),
            None => Err(ParleyError::NoAddress {
                route: route.to_string(),
            }),
        }
    }
}

/// Builder for `EndpointConfig`.
#[derive(Default)]
pub struct EndpointConfigBuilder {
    address: Option<Address>,
    default_host: Option<String>,
    wire_format: Option<WireFormat>,
    max_frame_len: Option<usize>,
    expect_route: Option<String>,
}

impl EndpointConfigBuilder {
    /// Dials exactly this address. Its route, when present, replaces the
    /// unit's route in the handshake.
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// `host:port` the unit's route is appended to when no address is set.
    pub fn default_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = Some(host.into());
        self
    }

    /// Sets the wire format (default: bincode). Both peers must agree.
    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = Some(format);
        self
    }

    /// Sets the largest accepted frame (default: 16 MiB).
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = Some(len);
        self
    }

    /// Refuses peers whose handshake addresses another route.
    pub fn expect_route(mut self, route: impl Into<String>) -> Self {
        self.expect_route = Some(route.into());
        self
    }

    pub fn build(self) -> EndpointConfig {
        EndpointConfig {
            address: self.address,
            default_host: self.default_host,
            wire_format: self.wire_format.unwrap_or_default(),
            max_frame_len: self.max_frame_len.unwrap_or(DEFAULT_MAX_FRAME_LEN),
            expect_route: self.expect_route,
        }
    }
}
