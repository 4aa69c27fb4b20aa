//! Connection descriptor parsed from a cache URI.
//!
//! Format: `<scheme>://[<user>:<password>@]<host>[:<port>][/<namespace>][?<options>]`
//!
//! The path (minus its leading `/`) becomes the key namespace. Query
//! parameters are driver options such as `codec=postcard` or `pool_size=8`.

use crate::error::{Error, Result};
use crate::key::Namespace;
use crate::serialization::Codec;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Parsed connection URI handed to a driver constructor.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    url: Url,
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    namespace: Namespace,
    options: HashMap<String, String>,
}

impl ConnectionDescriptor {
    /// Parse a connection URI.
    ///
    /// # Errors
    /// Returns `Error::InvalidUri` if the URI is malformed or has no authority
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)?;

        if url.cannot_be_a_base() {
            return Err(Error::InvalidUri(format!(
                "'{}' has no '//' authority section",
                mask_uri(uri)
            )));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.to_string());
        let username = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(decode)
            .transpose()?;
        let password = url.password().map(decode).transpose()?;

        let path = url.path();
        let namespace = decode(path.strip_prefix('/').unwrap_or(path))?;

        let options = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(ConnectionDescriptor {
            scheme: url.scheme().to_string(),
            port: url.port(),
            host,
            username,
            password,
            namespace: Namespace::new(namespace),
            options,
            url,
        })
    }

    /// Driver selector, always lower-case.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `host:port`, or `host:default_port` when the URI has no port.
    ///
    /// # Errors
    /// Returns `Error::InvalidUri` if the URI has no host
    pub fn address(&self, default_port: u16) -> Result<String> {
        let host = self.host.as_deref().ok_or_else(|| {
            Error::InvalidUri(format!("{}:// URI requires a host", self.scheme))
        })?;
        Ok(format!("{}:{}", host, self.port.unwrap_or(default_port)))
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Raw query option.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// Query option parsed as `T`.
    ///
    /// # Errors
    /// Returns `Error::InvalidUri` if the option is present but does not parse
    pub fn parsed_option<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.option(name)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    Error::InvalidUri(format!("invalid value '{}' for '{}': {}", raw, name, e))
                })
            })
            .transpose()
    }

    /// Structured-value codec from the `codec` option, JSON by default.
    ///
    /// # Errors
    /// Returns `Error::InvalidUri` for an unknown codec name
    pub fn codec(&self) -> Result<Codec> {
        self.option("codec")
            .map(Codec::from_str)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// The original URI.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URI with any password replaced by `****`, for logging.
    pub fn redacted(&self) -> String {
        mask_uri(self.url.as_str())
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .finish()
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConnectionDescriptor::parse(s)
    }
}

fn decode(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| Error::InvalidUri(format!("invalid percent-encoding: {}", e)))
}

/// Mask the password in a URI for safe logging.
///
/// Only the authority (up to the first `/`, `?` or `#` after `://`) is
/// searched, and the last `@` in it ends the userinfo.
pub(crate) fn mask_uri(uri: &str) -> String {
    let scheme_end = uri.find("://").map(|p| p + 3).unwrap_or(0);
    let authority_end = uri[scheme_end..]
        .find(['/', '?', '#'])
        .map(|p| p + scheme_end)
        .unwrap_or(uri.len());
    let authority = &uri[scheme_end..authority_end];

    if let Some(at_pos) = authority.rfind('@') {
        if let Some(colon_pos) = authority[..at_pos].find(':') {
            return format!(
                "{}:****@{}",
                &uri[..scheme_end + colon_pos],
                &uri[scheme_end + at_pos + 1..]
            );
        }
    }
    uri.to_string()
}
