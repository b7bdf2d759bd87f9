use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::wire::WireFormat;

/// A serializer synthesized for one direction's type closure.
///
/// The generator emits one unit struct per direction implementing this trait
/// plus [`Supports<T>`] for every type in the closure, so a proxy or dispatcher
/// can only move values its direction actually declared.
pub trait WireSerializer: Send + Sync + 'static {
    /// Fully qualified artifact name.
    const NAME: &'static str;

    /// Normalized spelling of every type in the closure, in discovery order.
    const TYPES: &'static [&'static str];

    fn supports(type_name: &str) -> bool {
        Self::TYPES.contains(&type_name)
    }
}

/// Marks `T` as a member of the serializer's closure.
pub trait Supports<T>: WireSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn encode(format: WireFormat, value: &T) -> Result<Vec<u8>> {
        format.encode(value)
    }

    fn decode(format: WireFormat, bytes: &[u8]) -> Result<T> {
        format.decode(bytes)
    }
}
