//! Endpoint and credential configuration.
//!
//! Everything here is read once at construction and shared by reference
//! (`Arc`) between contract variants and providers. Loading from disk or the
//! environment is the embedding application's job; these types only describe
//! the shape.
//!
//! # Example Configuration
//!
//! ```toml
//! [opg]
//! base_url = "https://gateway.bank.example"
//! port = 8066
//! self_bank_code = "009"
//!
//! [opg.credentials]
//! username = "wallet"
//! password = "$OPG_PASSWORD"
//! api_key = "$OPG_API_KEY"
//! secret_key = "$OPG_SECRET_KEY"
//! client_name = "WALLET"
//! client_id_prefix = "ID"
//!
//! [va]
//! base_url = "https://va.bank.example"
//!
//! [va.credit]
//! client_id = "00195"
//! secret_key = "$VA_CREDIT_SECRET"
//!
//! [va.debit]
//! client_id = "00196"
//! secret_key = "$VA_DEBIT_SECRET"
//! ```

use std::fmt;
use std::time::Duration;

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RequestError;

/// Bank code of the bank this adapter talks to.
pub const DEFAULT_SELF_BANK_CODE: &str = "009";

/// Base URL, port and timeout of one bank product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Scheme and host, e.g. `https://gateway.bank.example`.
    pub base_url: String,

    /// TCP port (default: `443`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds (default: `30`).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    443
}

fn default_timeout_secs() -> u64 {
    30
}

impl Endpoint {
    /// Creates an endpoint with the default port and timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// The request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the absolute URL of `path` on this endpoint.
    ///
    /// `path` is appended to any path already in `base_url`, so a gateway
    /// mounted under a prefix keeps it.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Url`] if the base URL or path is invalid.
    pub fn url(&self, path: &str) -> Result<Url, RequestError> {
        let mut base = Url::parse(&self.base_url).map_err(|source| RequestError::Url {
            context: "failed to parse base url",
            source,
        })?;
        base.set_port(Some(self.port))
            .map_err(|()| RequestError::Url {
                context: "base url cannot carry a port",
                source: url::ParseError::InvalidPort,
            })?;
        let joined = format!(
            "{}/{}",
            base.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        base.set_path(&joined);
        Ok(base)
    }
}

/// Key pair of one virtual-account sub-product.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaCredentials {
    /// Client id issued by the bank; also the first cipher key.
    pub client_id: String,
    /// Shared secret; the second cipher key.
    pub secret_key: String,
}

impl fmt::Debug for VaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaCredentials")
            .field("client_id", &self.client_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Credentials of the token-authenticated gateway.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpgCredentials {
    /// Basic-auth user for the token endpoint.
    pub username: String,
    /// Basic-auth password for the token endpoint.
    pub password: String,
    /// Sent as `x-api-key` on every business call.
    pub api_key: String,
    /// HS256 key used to sign request bodies.
    pub secret_key: String,
    /// Registered client name; encoded into the client identifier.
    pub client_name: String,
    /// Literal prefix of the client identifier.
    #[serde(default)]
    pub client_id_prefix: String,
}

impl OpgCredentials {
    /// The `clientId` field sent with every gateway request:
    /// prefix followed by the Base64 of the client name.
    #[must_use]
    pub fn client_id(&self) -> String {
        format!(
            "{}{}",
            self.client_id_prefix,
            BASE64_STANDARD.encode(&self.client_name)
        )
    }

    /// `Basic` authorization value for the token endpoint.
    #[must_use]
    pub fn basic_auth(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", BASE64_STANDARD.encode(pair))
    }
}

impl fmt::Debug for OpgCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpgCredentials")
            .field("username", &self.username)
            .field("client_name", &self.client_name)
            .field("client_id_prefix", &self.client_id_prefix)
            .finish_non_exhaustive()
    }
}

/// Gateway product configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpgConfig {
    /// Where the gateway lives.
    #[serde(flatten)]
    pub endpoint: Endpoint,

    /// Bank code that routes a transfer in-house.
    #[serde(default = "default_self_bank_code")]
    pub self_bank_code: String,

    /// Gateway credentials.
    pub credentials: OpgCredentials,
}

fn default_self_bank_code() -> String {
    DEFAULT_SELF_BANK_CODE.to_owned()
}

/// Virtual-account product configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaConfig {
    /// Where the collection service lives.
    #[serde(flatten)]
    pub endpoint: Endpoint,

    /// Key pair of the credit (collection) sub-product.
    pub credit: VaCredentials,

    /// Key pair of the debit sub-product.
    pub debit: VaCredentials,
}

/// Full adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    /// Token-authenticated gateway.
    pub opg: OpgConfig,
    /// Encrypted virtual-account service.
    pub va: VaConfig,
}
