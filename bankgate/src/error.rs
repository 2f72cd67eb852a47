//! Error types shared by the contract model, cipher and registries.
//!
//! The layers nest from the inside out: [`CipherError`] surfaces inside
//! [`RequestError`] and [`ResponseError`], and the HTTP crate wraps both in
//! its own call and provider errors.

use std::fmt;

use http::StatusCode;
use serde_json::Value;

/// Failures of the virtual-account payload cipher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    /// The plaintext holds a byte outside 7-bit ASCII.
    #[error("cipher input is not ASCII (byte {position})")]
    NonAscii {
        /// Offset of the first offending byte.
        position: usize,
    },
    /// A key is empty or not ASCII.
    #[error("cipher key must be non-empty ASCII")]
    InvalidKey,
    /// Ciphertext is malformed, was sealed with other keys, or its embedded
    /// timestamp falls outside the replay window. These cases are not told
    /// apart.
    #[error("ciphertext is malformed or outside the replay window")]
    ReplayOrFormat,
}

/// Failures while turning a payload into its wire-ready form.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Payloads must be JSON objects.
    #[error("request payload must be a JSON object")]
    NotAnObject,
    /// JSON encoding of the payload failed.
    #[error("failed to serialize request payload: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The HS256 signature could not be produced.
    #[error("failed to sign request payload: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    /// Payload encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
    /// A header value could not be represented.
    #[error("invalid value for header {name}")]
    Header {
        /// The header being set.
        name: String,
        /// The underlying header error.
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    /// The endpoint URL could not be built.
    #[error("invalid endpoint URL: {context}: {source}")]
    Url {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The request has no payload yet.
    #[error("request payload was never set")]
    MissingPayload,
}

/// Failures while validating a bank response.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// The body could not be parsed, lacked a required field, or could not
    /// be decrypted.
    #[error("invalid response: {reason}")]
    InvalidResponse {
        /// What was wrong with the body.
        reason: String,
        /// The raw response body.
        body: String,
        /// The underlying parse or cipher error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// The HTTP status was not the one the variant accepts.
    #[error("unexpected HTTP status {status}: {body}")]
    StatusCode {
        /// The HTTP status code.
        status: StatusCode,
        /// The raw response body.
        body: String,
    },
    /// Transport and status succeeded but the bank rejected the request.
    #[error("{0}")]
    BusinessFailure(#[from] BusinessFailure),
}

impl ResponseError {
    /// Creates an [`ResponseError::InvalidResponse`] without a cause.
    #[must_use]
    pub fn invalid(reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
            body: body.into(),
            source: None,
        }
    }

    /// Creates an [`ResponseError::InvalidResponse`] caused by `source`.
    #[must_use]
    pub fn invalid_with<E>(reason: impl Into<String>, body: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InvalidResponse {
            reason: reason.into(),
            body: body.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The bank payload carried by this error, when one was parsed.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::BusinessFailure(failure) => Some(&failure.payload),
            _ => None,
        }
    }

    /// The raw response body, when this error kept one.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::InvalidResponse { body, .. } | Self::StatusCode { body, .. } => Some(body),
            Self::BusinessFailure(_) => None,
        }
    }
}

/// A bank-defined rejection of an otherwise successful exchange.
///
/// The code is kept verbatim so callers can tell rejections apart, e.g.
/// [`BusinessFailure::is_duplicate_request`].
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessFailure {
    /// The bank's response or status code.
    pub code: String,
    /// Message extracted from the envelope (`errorMessage`, `responseMessage`
    /// or `message`), if present.
    pub message: Option<String>,
    /// The full response envelope.
    pub payload: Value,
}

impl BusinessFailure {
    /// Response code the gateway uses for a repeated reference number.
    pub const DUPLICATE_REQUEST_CODE: &'static str = "0007";

    /// Creates a new business failure.
    #[must_use]
    pub fn new(code: impl Into<String>, payload: Value) -> Self {
        Self {
            code: code.into(),
            message: None,
            payload,
        }
    }

    /// Sets the human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message.filter(|m| !m.is_empty());
        self
    }

    /// Whether the bank reported this request as a duplicate.
    #[must_use]
    pub fn is_duplicate_request(&self) -> bool {
        self.code == Self::DUPLICATE_REQUEST_CODE
    }
}

impl fmt::Display for BusinessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "bank rejected request ({}): {}", self.code, msg),
            None => write!(f, "bank rejected request ({})", self.code),
        }
    }
}

impl std::error::Error for BusinessFailure {}

/// Registry lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Nothing was registered under the key.
    #[error("no resource registered under '{0}'")]
    UnknownResource(String),
}
