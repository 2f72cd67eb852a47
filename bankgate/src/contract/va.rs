//! Virtual-account request and response variants.
//!
//! Credit and debit share all logic and differ only in the key pair and the
//! billing type they carry, captured by [`VaProduct`].

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{FORM_CONTENT_TYPE, RawResponse, RequestParts, WireBody, WireRequest, never_set};
use crate::cipher;
use crate::config::{VaConfig, VaCredentials};
use crate::error::{BusinessFailure, RequestError, ResponseError};
use crate::resource::ResourceId;

/// `status` of an accepted virtual-account request.
pub const SUCCESS_STATUS: &str = "000";

/// Virtual-account sub-product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaProduct {
    /// Collection (incoming payments).
    Credit,
    /// Debit billing.
    Debit,
}

impl VaProduct {
    /// `billing_type` code sent when creating a billing.
    #[must_use]
    pub const fn billing_type(&self) -> &'static str {
        match self {
            Self::Credit => "c",
            Self::Debit => "j",
        }
    }

    /// The registry key of this sub-product.
    #[must_use]
    pub const fn resource(&self) -> ResourceId {
        match self {
            Self::Credit => ResourceId::VaCredit,
            Self::Debit => ResourceId::VaDebit,
        }
    }

    /// The key pair of this sub-product.
    #[must_use]
    pub const fn credentials<'a>(&self, config: &'a VaConfig) -> &'a VaCredentials {
        match self {
            Self::Credit => &config.credit,
            Self::Debit => &config.debit,
        }
    }
}

/// The encrypted outer body.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Sealed {
    client_id: String,
    data: String,
}

/// Encrypted request: `{client_id, data}` form body.
#[derive(Debug, Clone)]
pub struct VaRequest {
    product: VaProduct,
    config: Arc<VaConfig>,
    pub(super) parts: RequestParts,
    sealed: Option<Sealed>,
}

impl VaRequest {
    /// Creates a request for `product` posting to the service root.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Header`] if the content type header cannot be
    /// set.
    pub fn new(product: VaProduct, config: Arc<VaConfig>) -> Result<Self, RequestError> {
        let mut parts = RequestParts::new(&config.endpoint, "/");
        parts.insert_header(CONTENT_TYPE, FORM_CONTENT_TYPE)?;
        Ok(Self {
            product,
            config,
            parts,
            sealed: None,
        })
    }

    /// The sub-product this request belongs to.
    #[must_use]
    pub const fn product(&self) -> VaProduct {
        self.product
    }

    fn credentials(&self) -> &VaCredentials {
        self.product.credentials(&self.config)
    }

    /// Injects `client_id` and encrypts the whole map.
    pub(super) fn set_payload(&mut self, mut map: Map<String, Value>) -> Result<(), RequestError> {
        let credentials = self.credentials();
        map.insert(
            "client_id".into(),
            Value::String(credentials.client_id.clone()),
        );
        let data = cipher::encrypt_payload(&map, &credentials.client_id, &credentials.secret_key)?;
        self.sealed = Some(Sealed {
            client_id: credentials.client_id.clone(),
            data,
        });
        Ok(())
    }

    /// Decrypts what was last set, including the injected fields.
    pub(super) fn payload(&self) -> Result<Value, RequestError> {
        let sealed = self.sealed.as_ref().ok_or(RequestError::MissingPayload)?;
        let credentials = self.credentials();
        Ok(cipher::decrypt_payload(
            &sealed.data,
            &credentials.client_id,
            &credentials.secret_key,
        )?)
    }

    pub(super) fn to_wire(&self) -> Result<WireRequest, RequestError> {
        let sealed = self.sealed.as_ref().ok_or(RequestError::MissingPayload)?;
        self.parts.wire(WireBody::Form(vec![
            ("client_id".into(), sealed.client_id.clone()),
            ("data".into(), sealed.data.clone()),
        ]))
    }
}

/// Outer response body: `{status, message?, data?}`.
#[derive(Debug, Clone, Deserialize)]
struct VaEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

/// Encrypted response: validated by `status`, payload decrypted from `data`.
#[derive(Debug, Clone)]
pub struct VaResponse {
    product: VaProduct,
    config: Arc<VaConfig>,
    pub(super) raw: Option<RawResponse>,
}

impl VaResponse {
    /// Creates an empty response for `product`.
    #[must_use]
    pub const fn new(product: VaProduct, config: Arc<VaConfig>) -> Self {
        Self {
            product,
            config,
            raw: None,
        }
    }

    pub(super) fn to_representation(self) -> Result<Value, ResponseError> {
        let raw = self.raw.ok_or_else(never_set)?;
        let json = raw.require_json()?;
        let envelope = VaEnvelope::deserialize(json).map_err(|_| raw.unusable("missing status"))?;
        if envelope.status != SUCCESS_STATUS {
            return Err(BusinessFailure::new(envelope.status, json.clone())
                .with_message(envelope.message)
                .into());
        }
        let data = envelope
            .data
            .ok_or_else(|| ResponseError::invalid("missing data", raw.body.clone()))?;
        let credentials = self.product.credentials(&self.config);
        cipher::decrypt_payload(&data, &credentials.client_id, &credentials.secret_key)
            .map_err(|e| ResponseError::invalid_with("failed to decrypt data", raw.body.clone(), e))
    }
}
