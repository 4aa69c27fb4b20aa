//! Key namespacing.

use std::fmt;

/// Prefix applied to every key of one cache instance.
///
/// The backend key is the plain concatenation `namespace + key`, with no
/// separator inserted. An empty namespace leaves keys unprefixed.
///
/// # Example
///
/// ```
/// use cache_facade::key::Namespace;
///
/// let ns = Namespace::new("orders:");
/// assert_eq!(ns.apply("42"), "orders:42");
/// assert_eq!(Namespace::default().apply("42"), "42");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Namespace(prefix.into())
    }

    /// Build the backend key for a caller-supplied key.
    pub fn apply(&self, key: &str) -> String {
        let mut full = String::with_capacity(self.0.len() + key.len());
        full.push_str(&self.0);
        full.push_str(key);
        full
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(prefix: &str) -> Self {
        Namespace::new(prefix)
    }
}

impl From<String> for Namespace {
    fn from(prefix: String) -> Self {
        Namespace(prefix)
    }
}
