//! Values accepted by `set` and their backend-native encoding.
//!
//! Writes go down one of two paths:
//!
//! - **Scalar**: text, booleans, integers of every width, floats and raw
//!   bytes. These are stored in the backend's native scalar form, the same
//!   form a Redis client would write: numbers as decimal text, booleans as
//!   `1`/`0`, text as UTF-8 and bytes verbatim.
//! - **Structured**: any other `Serialize` type, encoded by the instance
//!   [`Codec`](crate::serialization::Codec) before storage.
//!
//! Typed reads (`get_string`, `get_int`, `get_float`, `get_bool`) parse the
//! scalar form; `get_object` decodes the structured form.

use crate::error::{Error, Result, ValueType};

/// Kind of a scalar value, recorded at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Bool,
    Int,
    UInt,
    Float,
    Bytes,
}

/// A scalar value already in backend-native form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    kind: ScalarKind,
    bytes: Vec<u8>,
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Value handed to [`Cache::set_value`](crate::cache::Cache::set_value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Scalar(Scalar),
    /// Bytes produced by the instance codec.
    Structured(Vec<u8>),
}

impl CacheValue {
    /// Bytes that will be written to the backend.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            CacheValue::Scalar(scalar) => scalar.as_bytes(),
            CacheValue::Structured(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            CacheValue::Scalar(scalar) => scalar.into_bytes(),
            CacheValue::Structured(bytes) => bytes,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, CacheValue::Scalar(_))
    }
}

fn scalar(kind: ScalarKind, bytes: Vec<u8>) -> CacheValue {
    CacheValue::Scalar(Scalar { kind, bytes })
}

macro_rules! impl_from_display {
    ($kind:expr => $($t:ty),+) => {
        $(
            impl From<$t> for CacheValue {
                fn from(value: $t) -> Self {
                    scalar($kind, value.to_string().into_bytes())
                }
            }
        )+
    };
}

impl_from_display!(ScalarKind::Int => i8, i16, i32, i64, i128, isize);
impl_from_display!(ScalarKind::UInt => u8, u16, u32, u64, u128, usize);
// Display for floats is the shortest round-trip form and never uses an exponent.
impl_from_display!(ScalarKind::Float => f32, f64);

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        scalar(ScalarKind::Bool, if value { b"1".to_vec() } else { b"0".to_vec() })
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        scalar(ScalarKind::Text, value.into_bytes())
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        scalar(ScalarKind::Text, value.as_bytes().to_vec())
    }
}

impl From<&String> for CacheValue {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        scalar(ScalarKind::Bytes, value)
    }
}

impl From<&[u8]> for CacheValue {
    fn from(value: &[u8]) -> Self {
        scalar(ScalarKind::Bytes, value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for CacheValue {
    fn from(value: &[u8; N]) -> Self {
        scalar(ScalarKind::Bytes, value.to_vec())
    }
}

/// Parse stored bytes as UTF-8 text.
pub(crate) fn parse_string(key: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| mismatch(key, ValueType::String))
}

/// Parse stored bytes as a signed 64-bit integer.
pub(crate) fn parse_int(key: &str, bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| mismatch(key, ValueType::Int))
}

/// Parse stored bytes as a 64-bit float.
pub(crate) fn parse_float(key: &str, bytes: &[u8]) -> Result<f64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| mismatch(key, ValueType::Float))
}

/// Parse stored bytes as a boolean (`1`/`0`/`true`/`false`).
pub(crate) fn parse_bool(key: &str, bytes: &[u8]) -> Result<bool> {
    match bytes {
        b"1" | b"true" => Ok(true),
        b"0" | b"false" => Ok(false),
        _ => Err(mismatch(key, ValueType::Bool)),
    }
}

fn mismatch(key: &str, expected: ValueType) -> Error {
    Error::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}
