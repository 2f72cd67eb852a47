//! Gateway request and response variants.
//!
//! Both gateway requests are signed: the body map, with `clientId` injected,
//! is encoded as an HS256 JWT under the product secret and the token is added
//! back as `signature`.

use std::sync::Arc;

use http::StatusCode;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{
    FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, RawResponse, RequestParts, WireBody, WireRequest,
    never_set,
};
use crate::config::{OpgConfig, OpgCredentials};
use crate::error::{BusinessFailure, RequestError, ResponseError};

/// Path of the gateway token endpoint.
pub const AUTH_PATH: &str = "/api/oauth/token";

/// `responseCode` of an accepted gateway request.
pub const SUCCESS_CODE: &str = "0001";

/// Header carrying the gateway API key.
pub static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Gateway business operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpgOperation {
    /// Account balance.
    GetBalance,
    /// Name/status check of an account at this bank.
    GetInhouseInquiry,
    /// Payment instruction (in-house, RTGS or clearing).
    DoPayment,
    /// Status of an earlier payment by reference number.
    GetPaymentStatus,
    /// Name check of an account at another bank.
    GetInterbankInquiry,
    /// Online interbank transfer.
    GetInterbankPayment,
    /// Blocks funds on an account.
    HoldAmount,
    /// Releases previously blocked funds.
    HoldAmountRelease,
}

impl OpgOperation {
    /// Operation name as used in envelope keys.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetBalance => "getBalance",
            Self::GetInhouseInquiry => "getInHouseInquiry",
            Self::DoPayment => "doPayment",
            Self::GetPaymentStatus => "getPaymentStatus",
            Self::GetInterbankInquiry => "getInterbankInquiry",
            Self::GetInterbankPayment => "getInterbankPayment",
            Self::HoldAmount => "holdAmount",
            Self::HoldAmountRelease => "holdAmountRelease",
        }
    }

    /// Path relative to the gateway endpoint.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::GetBalance => "/H2H/v2/getbalance",
            Self::GetInhouseInquiry => "/H2H/v2/getinhouseinquiry",
            Self::DoPayment => "/H2H/v2/dopayment",
            Self::GetPaymentStatus => "/H2H/v2/getpaymentstatus",
            Self::GetInterbankInquiry => "/H2H/v2/getinterbankinquiry",
            Self::GetInterbankPayment => "/H2H/v2/getinterbankpayment",
            Self::HoldAmount => "/H2H/v2/holdamount",
            Self::HoldAmountRelease => "/H2H/v2/holdamountrelease",
        }
    }

    /// Top-level key of the success envelope, e.g. `getBalanceResponse`.
    #[must_use]
    pub fn response_key(&self) -> String {
        format!("{}Response", self.name())
    }
}

/// Injects `clientId` and the HS256 `signature` into `map`.
fn sign(credentials: &OpgCredentials, map: &mut Map<String, Value>) -> Result<(), RequestError> {
    map.remove("signature");
    map.insert("clientId".into(), Value::String(credentials.client_id()));
    let signature = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &map,
        &EncodingKey::from_secret(credentials.secret_key.as_bytes()),
    )?;
    map.insert("signature".into(), Value::String(signature));
    Ok(())
}

/// Token request: form body, Basic auth.
#[derive(Debug, Clone)]
pub struct OpgAuthRequest {
    config: Arc<OpgConfig>,
    pub(super) parts: RequestParts,
    payload: Option<Map<String, Value>>,
}

impl OpgAuthRequest {
    /// Creates a token request against the configured gateway.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Header`] if the credentials cannot form a
    /// header value.
    pub fn new(config: Arc<OpgConfig>) -> Result<Self, RequestError> {
        let mut parts = RequestParts::new(&config.endpoint, AUTH_PATH);
        parts.insert_header(AUTHORIZATION, &config.credentials.basic_auth())?;
        parts.insert_header(CONTENT_TYPE, FORM_CONTENT_TYPE)?;
        Ok(Self {
            config,
            parts,
            payload: None,
        })
    }

    /// The body every token request carries.
    #[must_use]
    pub fn default_payload() -> Value {
        serde_json::json!({ "grant_type": "client_credentials" })
    }

    pub(super) fn set_payload(&mut self, mut map: Map<String, Value>) -> Result<(), RequestError> {
        sign(&self.config.credentials, &mut map)?;
        self.payload = Some(map);
        Ok(())
    }

    pub(super) fn payload(&self) -> Result<Value, RequestError> {
        self.payload
            .clone()
            .map(Value::Object)
            .ok_or(RequestError::MissingPayload)
    }

    pub(super) fn to_wire(&self) -> Result<WireRequest, RequestError> {
        let map = self.payload.as_ref().ok_or(RequestError::MissingPayload)?;
        self.parts.wire(WireBody::form(map))
    }
}

/// Business request: JSON body, `x-api-key`, bearer token.
#[derive(Debug, Clone)]
pub struct OpgGenericRequest {
    config: Arc<OpgConfig>,
    pub(super) parts: RequestParts,
    payload: Option<Map<String, Value>>,
}

impl OpgGenericRequest {
    /// Creates a business request; the path is set per operation.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Header`] if the API key is not a valid header
    /// value.
    pub fn new(config: Arc<OpgConfig>) -> Result<Self, RequestError> {
        let mut parts = RequestParts::new(&config.endpoint, "/");
        parts.insert_header(X_API_KEY.clone(), &config.credentials.api_key)?;
        parts.insert_header(CONTENT_TYPE, JSON_CONTENT_TYPE)?;
        Ok(Self {
            config,
            parts,
            payload: None,
        })
    }

    pub(super) fn set_payload(&mut self, mut map: Map<String, Value>) -> Result<(), RequestError> {
        sign(&self.config.credentials, &mut map)?;
        self.payload = Some(map);
        Ok(())
    }

    pub(super) fn payload(&self) -> Result<Value, RequestError> {
        self.payload
            .clone()
            .map(Value::Object)
            .ok_or(RequestError::MissingPayload)
    }

    pub(super) fn to_wire(&self) -> Result<WireRequest, RequestError> {
        let map = self.payload.clone().ok_or(RequestError::MissingPayload)?;
        self.parts.wire(WireBody::Json(Value::Object(map)))
    }
}

/// Body of a successful token response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    /// The bearer token.
    pub access_token: String,
    /// Usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime announced by the bank, in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Token response: only the HTTP status is validated.
#[derive(Debug, Clone, Default)]
pub struct OpgAuthResponse {
    pub(super) raw: Option<RawResponse>,
}

impl OpgAuthResponse {
    /// Creates an empty response awaiting [`super::BankResponse::set`].
    #[must_use]
    pub const fn new() -> Self {
        Self { raw: None }
    }

    pub(super) fn to_representation(self) -> Result<Value, ResponseError> {
        let raw = self.raw.ok_or_else(never_set)?;
        if raw.status != StatusCode::OK {
            return Err(ResponseError::StatusCode {
                status: raw.status,
                body: raw.body,
            });
        }
        raw.require_json().cloned()
    }
}

/// The `parameters` object of a gateway envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpgParameters {
    /// `"0001"` on success.
    pub response_code: String,
    /// Human-readable outcome.
    #[serde(default)]
    pub response_message: Option<String>,
    /// Failure detail, set on rejections.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Operation-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One gateway response envelope: `{"<operation>Response": {clientId, parameters}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpgEnvelope {
    /// Echo of the request's client identifier.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Outcome and operation fields.
    pub parameters: OpgParameters,
}

impl OpgEnvelope {
    /// Reads the envelope under the response's single top-level key.
    ///
    /// Success and error envelopes use different keys, so this accepts any
    /// key as long as it is the only one.
    #[must_use]
    pub fn from_response(response: &Value) -> Option<Self> {
        let object = response.as_object()?;
        if object.len() != 1 {
            return None;
        }
        let body = object.values().next()?;
        Self::deserialize(body).ok()
    }

    /// Reads the envelope of `operation`'s success response.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::InvalidResponse`] if the key is missing or
    /// its contents do not match the envelope shape.
    pub fn for_operation(response: &Value, operation: OpgOperation) -> Result<Self, ResponseError> {
        let key = operation.response_key();
        let body = response
            .get(&key)
            .ok_or_else(|| ResponseError::invalid(format!("missing {key}"), response.to_string()))?;
        Self::deserialize(body).map_err(|e| {
            ResponseError::invalid_with(format!("malformed {key}"), response.to_string(), e)
        })
    }

    /// `errorMessage` when set, otherwise `responseMessage`.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.parameters
            .error_message
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| self.parameters.response_message.clone())
    }
}

/// Business response: validated by `parameters.responseCode`.
#[derive(Debug, Clone, Default)]
pub struct OpgGenericResponse {
    pub(super) raw: Option<RawResponse>,
}

impl OpgGenericResponse {
    /// Creates an empty response awaiting [`super::BankResponse::set`].
    #[must_use]
    pub const fn new() -> Self {
        Self { raw: None }
    }

    pub(super) fn to_representation(self) -> Result<Value, ResponseError> {
        let raw = self.raw.ok_or_else(never_set)?;
        let json = raw.require_json()?;
        let envelope = OpgEnvelope::from_response(json)
            .ok_or_else(|| raw.unusable("missing parameters.responseCode"))?;
        let code = envelope.parameters.response_code.as_str();
        if code == SUCCESS_CODE {
            return Ok(json.clone());
        }
        #[cfg(feature = "telemetry")]
        tracing::debug!(code, "gateway rejected request");
        Err(BusinessFailure::new(code, json.clone())
            .with_message(envelope.message())
            .into())
    }
}
