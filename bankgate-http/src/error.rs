//! Error types for remote calls and provider operations.
//!
//! [`CallError`] covers one HTTP exchange: transport failures plus the
//! response-layer errors from [`bankgate::error`]. [`ProviderError`] is the
//! single error a provider operation returns; it keeps the full cause chain
//! and exposes the bank's payload and message for diagnostics.

use std::fmt;

use bankgate::error::{BusinessFailure, RegistryError, RequestError, ResponseError};
use serde_json::Value;

use crate::routing::RoutingError;

/// Classification of any adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The exchange exceeded its timeout.
    Timeout,
    /// TLS handshake or certificate failure.
    Tls,
    /// Connection refused, reset or otherwise broken.
    Connection,
    /// The request could not be built, signed or encrypted.
    InvalidRequest,
    /// The body could not be parsed or decrypted.
    InvalidResponse,
    /// Non-accepted HTTP status.
    StatusCode,
    /// The bank rejected the request.
    BusinessFailure,
    /// No contract or provider registered for the resource.
    UnknownResource,
    /// The destination bank could not be routed.
    Routing,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Tls => "tls_error",
            Self::Connection => "connection_error",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidResponse => "invalid_response",
            Self::StatusCode => "status_code_error",
            Self::BusinessFailure => "business_failure",
            Self::UnknownResource => "unknown_resource",
            Self::Routing => "routing_error",
        };
        f.write_str(name)
    }
}

/// Errors of a single remote call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The exchange timed out.
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// TLS failed.
    #[error("TLS failure talking to {url}: {source}")]
    Tls {
        /// Target URL.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The connection could not be established or broke mid-exchange.
    #[error("connection to {url} failed: {source}")]
    Connection {
        /// Target URL.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be serialized.
    #[error("failed to build request: {0}")]
    Request(#[from] RequestError),
    /// The response failed validation.
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl CallError {
    /// Classifies a reqwest failure.
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_owned();
        if source.is_timeout() {
            Self::Timeout { url, source }
        } else if is_tls_failure(&source) {
            Self::Tls { url, source }
        } else {
            Self::Connection { url, source }
        }
    }

    /// The error's classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Tls { .. } => ErrorKind::Tls,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Request(_) => ErrorKind::InvalidRequest,
            Self::Response(ResponseError::InvalidResponse { .. }) => ErrorKind::InvalidResponse,
            Self::Response(ResponseError::StatusCode { .. }) => ErrorKind::StatusCode,
            Self::Response(ResponseError::BusinessFailure(_)) => ErrorKind::BusinessFailure,
        }
    }

    /// The bank's rejection, if that is what this is.
    #[must_use]
    pub const fn business_failure(&self) -> Option<&BusinessFailure> {
        match self {
            Self::Response(ResponseError::BusinessFailure(failure)) => Some(failure),
            _ => None,
        }
    }
}

/// Walks the causes of a reqwest failure looking for a TLS-level one.
///
/// The outermost error is skipped: its text carries the request URL, which
/// may itself contain words like `ssl`.
fn is_tls_failure(err: &reqwest::Error) -> bool {
    let mut current = std::error::Error::source(err);
    while let Some(e) = current {
        let text = e.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| text.contains(needle))
        {
            return true;
        }
        current = e.source();
    }
    false
}

/// What went wrong underneath a provider operation.
#[derive(Debug, thiserror::Error)]
pub enum ProviderFailure {
    /// The remote call failed.
    #[error(transparent)]
    Call(#[from] CallError),
    /// The request or response contract was not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The payload could not be prepared.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// A successful response did not have the expected shape.
    #[error(transparent)]
    Response(#[from] ResponseError),
    /// The destination bank could not be routed.
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// The one error type every provider operation returns.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct ProviderError {
    /// The operation that failed, e.g. `getBalance`.
    pub operation: &'static str,
    /// The bank's message when it sent one, otherwise the cause's message.
    pub message: String,
    /// The underlying failure.
    #[source]
    pub source: ProviderFailure,
}

impl ProviderError {
    /// Wraps `source` as a failure of `operation`.
    pub fn new(operation: &'static str, source: impl Into<ProviderFailure>) -> Self {
        let source = source.into();
        let message = match source.business_failure() {
            Some(BusinessFailure {
                message: Some(message),
                ..
            }) => message.clone(),
            _ => source.to_string(),
        };
        Self {
            operation,
            message,
            source,
        }
    }

    /// The error's classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match &self.source {
            ProviderFailure::Call(err) => err.kind(),
            ProviderFailure::Registry(_) => ErrorKind::UnknownResource,
            ProviderFailure::Request(_) => ErrorKind::InvalidRequest,
            ProviderFailure::Response(ResponseError::StatusCode { .. }) => ErrorKind::StatusCode,
            ProviderFailure::Response(ResponseError::BusinessFailure(_)) => {
                ErrorKind::BusinessFailure
            }
            ProviderFailure::Response(ResponseError::InvalidResponse { .. }) => {
                ErrorKind::InvalidResponse
            }
            ProviderFailure::Routing(_) => ErrorKind::Routing,
        }
    }

    /// The bank's rejection, if that is what this is.
    #[must_use]
    pub const fn business_failure(&self) -> Option<&BusinessFailure> {
        self.source.business_failure()
    }

    /// The bank's response envelope, when one was received and parsed.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match self.business_failure() {
            Some(failure) => Some(&failure.payload),
            None => None,
        }
    }

    /// The raw body of a response that failed validation.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match &self.source {
            ProviderFailure::Call(CallError::Response(err)) | ProviderFailure::Response(err) => {
                err.body()
            }
            _ => None,
        }
    }
}

impl ProviderFailure {
    const fn business_failure(&self) -> Option<&BusinessFailure> {
        match self {
            Self::Call(err) => err.business_failure(),
            Self::Response(ResponseError::BusinessFailure(failure)) => Some(failure),
            _ => None,
        }
    }
}
