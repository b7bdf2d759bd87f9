use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::serializer::Supports;
use crate::traits::GeneratedUnit;
use crate::wire::WireFormat;

/// One row of a dispatch table: the wire name and parameter count of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub arity: usize,
}

impl MethodDescriptor {
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }
}

/// Ordered `(name, arity)` lookup built once per generated unit.
///
/// Resolution is first-match-wins in declaration order. Two rows sharing a
/// key are allowed; the later one is never reachable, see [`Self::shadowed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTable {
    entries: &'static [MethodDescriptor],
}

impl DispatchTable {
    pub const fn new(entries: &'static [MethodDescriptor]) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &'static [MethodDescriptor] {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, name: &str, arity: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name == name && entry.arity == arity)
    }

    /// Indices of rows hidden behind an earlier row with the same key.
    pub fn shadowed(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(index, entry)| self.resolve(entry.name, entry.arity) != Some(*index))
            .map(|(index, _)| index)
            .collect()
    }
}

/// An inbound envelope paired with the connection's wire format.
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    envelope: &'a Envelope,
    format: WireFormat,
}

impl<'a> Inbound<'a> {
    pub fn new(envelope: &'a Envelope, format: WireFormat) -> Self {
        Self { envelope, format }
    }

    pub fn method(&self) -> &'a str {
        self.envelope.method()
    }

    pub fn arity(&self) -> usize {
        self.envelope.arity()
    }

    /// Decodes argument `index` as the declared parameter type `T`.
    pub fn arg<S, T>(&self, index: usize) -> Result<T>
    where
        S: Supports<T>,
        T: Serialize + DeserializeOwned,
    {
        let bytes = self
            .envelope
            .args()
            .get(index)
            .ok_or_else(|| Error::MissingArgument {
                method: self.method().to_string(),
                index,
            })?;
        S::decode(self.format, bytes).map_err(|source| Error::Coercion {
            method: self.method().to_string(),
            index,
            source: Box::new(source),
        })
    }
}

/// Generated inbound handler for local implementations of the peer interface.
pub trait Dispatcher<L: ?Sized> {
    /// Invokes row `index` of the unit's inbound table on `local`.
    fn invoke(local: &L, index: usize, call: &Inbound<'_>) -> Result<()>;
}

/// Outcome of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Invoked(usize),
    Dropped,
}

/// Resolves `call` against `U`'s inbound table and invokes the match on `local`.
///
/// Unmatched calls are dropped without error.
pub fn dispatch<U, L>(local: &L, call: &Inbound<'_>) -> Result<Dispatched>
where
    U: GeneratedUnit + Dispatcher<L>,
    L: ?Sized,
{
    match U::INBOUND.resolve(call.method(), call.arity()) {
        Some(index) => {
            U::invoke(local, index, call)?;
            Ok(Dispatched::Invoked(index))
        }
        None => {
            tracing::debug!(
                unit = U::NAME,
                method = call.method(),
                arity = call.arity(),
                "no inbound method matches, dropping call"
            );
            Ok(Dispatched::Dropped)
        }
    }
}
