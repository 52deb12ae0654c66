//! Connection parameter resolution.
//!
//! Each parameter is taken from the first source that supplies a
//! non-empty value, in this order:
//!
//! 1. the explicit call-site argument
//! 2. the local configuration layer
//! 3. the shared configuration layer
//! 4. a fixed default (none for the password)
//!
//! An explicit empty string counts as "not supplied" and falls through
//! to the next source. Callers wanting the default must leave the value
//! unset in every layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Configuration key for the connecting role.
pub const KEY_USER: &str = "postgres.pguser";
/// Configuration key for the connecting role's password.
pub const KEY_PASSWORD: &str = "postgres.pgpassword";
/// Configuration key for the server host.
pub const KEY_HOST: &str = "postgres.host";
/// Configuration key for the server port.
pub const KEY_PORT: &str = "postgres.port";

/// Default connecting role.
pub const DEFAULT_USER: &str = "postgres";
/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default server port.
pub const DEFAULT_PORT: &str = "5432";

/// One layer of flat, dotted-key configuration (e.g. `postgres.host`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigLayer {
    values: BTreeMap<String, String>,
}

impl ConfigLayer {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, treating empty values as missing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Set a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Number of keys in the layer.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the layer has no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigLayer {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Connection parameters supplied at the call site.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitParams {
    /// Connecting role
    #[serde(default, alias = "pguser")]
    pub user: Option<String>,
    /// Connecting role's password
    #[serde(default, alias = "pgpassword")]
    pub password: Option<String>,
    /// Server host
    #[serde(default)]
    pub host: Option<String>,
    /// Server port
    #[serde(default)]
    pub port: Option<String>,
}

impl fmt::Debug for ExplicitParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplicitParams")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl ExplicitParams {
    /// Fill unset fields from `fallback`. An empty value counts as unset.
    pub fn or(self, fallback: &ExplicitParams) -> Self {
        let pick = |own: Option<String>, other: &Option<String>| {
            own.filter(|v| !v.is_empty())
                .or_else(|| other.clone().filter(|v| !v.is_empty()))
        };
        Self {
            user: pick(self.user, &fallback.user),
            password: pick(self.password, &fallback.password),
            host: pick(self.host, &fallback.host),
            port: pick(self.port, &fallback.port),
        }
    }
}

/// Fully resolved connection parameters.
///
/// Every field is non-empty except `password`, which is `None` when no
/// source supplied one.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Connecting role
    pub user: String,
    /// Password, passed to children as `PGPASSWORD`
    pub password: Option<String>,
    /// Server host
    pub host: String,
    /// Server port
    pub port: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        resolve(
            &ExplicitParams::default(),
            &ConfigLayer::default(),
            &ConfigLayer::default(),
        )
    }
}

/// Resolve connection parameters through the precedence chain.
pub fn resolve(
    explicit: &ExplicitParams,
    local: &ConfigLayer,
    shared: &ConfigLayer,
) -> ConnectionParams {
    let pick = |value: &Option<String>, key: &str| -> Option<String> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .or_else(|| local.get(key))
            .or_else(|| shared.get(key))
            .map(str::to_string)
    };

    ConnectionParams {
        user: pick(&explicit.user, KEY_USER).unwrap_or_else(|| DEFAULT_USER.to_string()),
        password: pick(&explicit.password, KEY_PASSWORD),
        host: pick(&explicit.host, KEY_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: pick(&explicit.port, KEY_PORT).unwrap_or_else(|| DEFAULT_PORT.to_string()),
    }
}
