//! Request and response contract variants.
//!
//! Every exchange with the bank is one of a closed set of variants:
//!
//! | Variant | Request wire form | Response validation |
//! |---|---|---|
//! | [`OpgAuthRequest`] / [`OpgAuthResponse`] | form body, Basic auth, signed | HTTP 200 |
//! | [`OpgGenericRequest`] / [`OpgGenericResponse`] | JSON body, `x-api-key`, signed | `parameters.responseCode == "0001"` |
//! | [`VaRequest`] / [`VaResponse`] | form `{client_id, data}`, encrypted | `status == "000"`, decrypted `data` |
//!
//! [`BankRequest`] and [`BankResponse`] tie the variants together so call
//! sites can stay agnostic of the wire format. Setting a payload always leaves
//! the request holding its wire-ready form (signed or encrypted).

mod opg;
mod va;

pub use opg::*;
pub use va::*;

use std::time::Duration;

use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use crate::config::Endpoint;
use crate::error::{RequestError, ResponseError};
use crate::resource::ResourceId;

/// Content type of form-encoded bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Content type of JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of a serialized request.
#[derive(Debug, Clone, PartialEq)]
pub enum WireBody {
    /// `application/json`.
    Json(Value),
    /// `application/x-www-form-urlencoded`, in field order.
    Form(Vec<(String, String)>),
}

impl WireBody {
    /// JSON view of the body, for audit logging.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Form(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        }
    }

    fn form(map: &Map<String, Value>) -> Self {
        Self::Form(
            map.iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect(),
        )
    }
}

/// A request serialized for one HTTP exchange.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Absolute URL.
    pub url: Url,
    /// HTTP method.
    pub method: Method,
    /// Headers, case-insensitive by name.
    pub headers: HeaderMap,
    /// Serialized body.
    pub body: WireBody,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
}

/// URL, method, headers and timeout shared by every request variant.
#[derive(Debug, Clone)]
pub struct RequestParts {
    endpoint: Endpoint,
    path: String,
    method: Method,
    headers: HeaderMap,
    timeout: Duration,
}

impl RequestParts {
    fn new(endpoint: &Endpoint, path: &str) -> Self {
        Self {
            endpoint: endpoint.clone(),
            path: path.to_owned(),
            method: Method::POST,
            headers: HeaderMap::new(),
            timeout: endpoint.timeout(),
        }
    }

    fn insert_header(&mut self, name: HeaderName, value: &str) -> Result<(), RequestError> {
        let value = HeaderValue::from_str(value).map_err(|source| RequestError::Header {
            name: name.to_string(),
            source,
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    fn wire(&self, body: WireBody) -> Result<WireRequest, RequestError> {
        Ok(WireRequest {
            url: self.endpoint.url(&self.path)?,
            method: self.method.clone(),
            headers: self.headers.clone(),
            body,
            timeout: self.timeout,
        })
    }
}

/// Any outgoing request variant.
#[derive(Debug, Clone)]
pub enum BankRequest {
    /// Gateway token request.
    OpgAuth(OpgAuthRequest),
    /// Gateway business request.
    OpgGeneric(OpgGenericRequest),
    /// Virtual-account request.
    Va(VaRequest),
}

impl BankRequest {
    /// The registry key of this variant.
    #[must_use]
    pub const fn resource(&self) -> ResourceId {
        match self {
            Self::OpgAuth(_) => ResourceId::OpgAuth,
            Self::OpgGeneric(_) => ResourceId::OpgGeneric,
            Self::Va(req) => req.product().resource(),
        }
    }

    fn parts(&self) -> &RequestParts {
        match self {
            Self::OpgAuth(req) => &req.parts,
            Self::OpgGeneric(req) => &req.parts,
            Self::Va(req) => &req.parts,
        }
    }

    fn parts_mut(&mut self) -> &mut RequestParts {
        match self {
            Self::OpgAuth(req) => &mut req.parts,
            Self::OpgGeneric(req) => &mut req.parts,
            Self::Va(req) => &mut req.parts,
        }
    }

    /// Sets the payload, converting it to its wire-ready form.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] if the payload is not an object, or signing
    /// or encryption fails.
    pub fn set_payload(&mut self, payload: Value) -> Result<(), RequestError> {
        let Value::Object(map) = payload else {
            return Err(RequestError::NotAnObject);
        };
        match self {
            Self::OpgAuth(req) => req.set_payload(map),
            Self::OpgGeneric(req) => req.set_payload(map),
            Self::Va(req) => req.set_payload(map),
        }
    }

    /// Reads the payload back, decrypting it for encrypted variants.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MissingPayload`] if nothing was set, or a
    /// cipher error if the stored ciphertext cannot be opened.
    pub fn payload(&self) -> Result<Value, RequestError> {
        match self {
            Self::OpgAuth(req) => req.payload(),
            Self::OpgGeneric(req) => req.payload(),
            Self::Va(req) => req.payload(),
        }
    }

    /// Sets the path relative to the product endpoint.
    pub fn set_path(&mut self, path: &str) {
        path.clone_into(&mut self.parts_mut().path);
    }

    /// Overrides the product's default timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.parts_mut().timeout = timeout;
    }

    /// Sets `Authorization: Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Header`] if the token is not a valid header
    /// value.
    pub fn set_bearer_token(&mut self, token: &str) -> Result<(), RequestError> {
        self.parts_mut()
            .insert_header(AUTHORIZATION, &format!("Bearer {token}"))
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts().headers
    }

    /// Serializes the request for one exchange.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] if the URL cannot be built or no payload was
    /// set.
    pub fn to_wire(&self) -> Result<WireRequest, RequestError> {
        match self {
            Self::OpgAuth(req) => req.to_wire(),
            Self::OpgGeneric(req) => req.to_wire(),
            Self::Va(req) => req.to_wire(),
        }
    }
}

/// Status and body of a received response, parsed once.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    body: String,
    json: Option<Value>,
}

impl RawResponse {
    fn new(status: StatusCode, body: String) -> Self {
        let json = serde_json::from_str(&body).ok();
        Self { status, body, json }
    }

    /// The HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The body as received.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The parsed JSON body, or the failure to report when there is none.
    /// Non-200 statuses take precedence over parse failures.
    fn require_json(&self) -> Result<&Value, ResponseError> {
        match &self.json {
            Some(json) => Ok(json),
            None => Err(self.unusable("body is not valid JSON")),
        }
    }

    fn unusable(&self, reason: &str) -> ResponseError {
        if self.status == StatusCode::OK {
            ResponseError::invalid(reason, self.body.clone())
        } else {
            ResponseError::StatusCode {
                status: self.status,
                body: self.body.clone(),
            }
        }
    }
}

fn never_set() -> ResponseError {
    ResponseError::invalid("response was never set", String::new())
}

/// Any incoming response variant.
///
/// A response is single-use: [`BankResponse::to_representation`] consumes it.
#[derive(Debug, Clone)]
pub enum BankResponse {
    /// Gateway token response.
    OpgAuth(OpgAuthResponse),
    /// Gateway business response.
    OpgGeneric(OpgGenericResponse),
    /// Virtual-account response.
    Va(VaResponse),
}

impl BankResponse {
    fn raw_mut(&mut self) -> &mut Option<RawResponse> {
        match self {
            Self::OpgAuth(res) => &mut res.raw,
            Self::OpgGeneric(res) => &mut res.raw,
            Self::Va(res) => &mut res.raw,
        }
    }

    /// Stores the transport response and parses its body.
    pub fn set(&mut self, status: StatusCode, body: impl Into<String>) {
        *self.raw_mut() = Some(RawResponse::new(status, body.into()));
    }

    /// The received status and body, if [`BankResponse::set`] was called.
    #[must_use]
    pub const fn raw(&self) -> Option<&RawResponse> {
        match self {
            Self::OpgAuth(res) => res.raw.as_ref(),
            Self::OpgGeneric(res) => res.raw.as_ref(),
            Self::Va(res) => res.raw.as_ref(),
        }
    }

    /// Validates the response and returns its business payload.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::StatusCode`], [`ResponseError::BusinessFailure`]
    /// or [`ResponseError::InvalidResponse`] depending on the variant's rules.
    pub fn to_representation(self) -> Result<Value, ResponseError> {
        match self {
            Self::OpgAuth(res) => res.to_representation(),
            Self::OpgGeneric(res) => res.to_representation(),
            Self::Va(res) => res.to_representation(),
        }
    }
}
