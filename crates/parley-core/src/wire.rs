use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Physical encoding of frames and arguments on one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WireFormat {
    /// Compact binary form, the default for both transports.
    #[default]
    Bincode,
    /// Text form, useful when the channel is inspected by humans.
    Json,
}

impl WireFormat {
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            WireFormat::Bincode => Ok(bincode::serialize(value)?),
            WireFormat::Json => Ok(serde_json::to_vec(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            WireFormat::Bincode => Ok(bincode::deserialize(bytes)?),
            WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Bincode => f.write_str("bincode"),
            WireFormat::Json => f.write_str("json"),
        }
    }
}
