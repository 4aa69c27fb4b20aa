//! Structured-value codecs.
//!
//! Only values written through `set_object` and read through `get_object`
//! pass through a codec. Scalars are stored in native form (see
//! [`crate::value`]).
//!
//! | Codec      | Format                     | Readable by other clients |
//! |------------|----------------------------|---------------------------|
//! | `json`     | `serde_json` text          | yes                       |
//! | `postcard` | compact binary (`postcard`)| no                        |
//!
//! JSON is the default so values written here stay readable by other
//! applications sharing the backend.

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::str::FromStr;

/// Codec used for structured values on one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    #[default]
    Json,
    Postcard,
}

impl Codec {
    /// Serialize a structured value.
    ///
    /// # Errors
    /// Returns `Error::Encode` if the value cannot be represented in this format
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Codec::Json => serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string())),
            Codec::Postcard => {
                postcard::to_allocvec(value).map_err(|e| Error::Encode(e.to_string()))
            }
        }
    }

    /// Deserialize bytes into `T`.
    ///
    /// # Errors
    /// Returns `Error::Decode` if the bytes are not a valid `T`
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            Codec::Json => serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string())),
            Codec::Postcard => {
                let (value, rest) = postcard::take_from_bytes::<T>(bytes)
                    .map_err(|e| Error::Decode(e.to_string()))?;
                if !rest.is_empty() {
                    return Err(Error::Decode(format!(
                        "{} trailing bytes after postcard payload",
                        rest.len()
                    )));
                }
                Ok(value)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Json => "json",
            Codec::Postcard => "postcard",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Codec::Json),
            "postcard" => Ok(Codec::Postcard),
            other => Err(Error::InvalidUri(format!(
                "unknown codec '{}' (supported: json, postcard)",
                other
            ))),
        }
    }
}
