//! Virtual-account provider: billing creation, inquiry and update.

use std::sync::Arc;

use bankgate::contract::VaProduct;
use bankgate::error::ResponseError;
use bankgate::reference::ReferenceNumber;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::instrument;

use super::Contracts;
use crate::error::{ProviderError, ProviderFailure};
use crate::remote::RemoteCall;

const CREATE_BILLING: &str = "createbilling";
const INQUIRY_BILLING: &str = "inquirybilling";
const UPDATE_BILLING: &str = "updatebilling";

/// Customer a billing is issued to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaCustomer {
    /// Name shown to the payer.
    pub name: String,
    /// Notification address.
    pub email: Option<String>,
    /// Notification phone number.
    pub phone: Option<String>,
}

/// Parameters of `createVa`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBilling {
    /// Caller's transaction id; generated when absent.
    pub trx_id: Option<String>,
    /// Amount to collect.
    pub amount: Decimal,
    /// Who pays.
    pub customer: VaCustomer,
    /// Requested account number; the bank assigns one when absent.
    pub virtual_account: Option<String>,
    /// When the billing stops accepting payments.
    pub expires_at: Option<DateTime<FixedOffset>>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Parameters of `updateVa`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingUpdate {
    /// Transaction id of the billing to change.
    pub trx_id: String,
    /// New amount.
    pub amount: Decimal,
    /// New customer details.
    pub customer: VaCustomer,
    /// New expiry.
    pub expires_at: Option<DateTime<FixedOffset>>,
    /// New description.
    pub description: Option<String>,
}

/// Result of `createVa` and `updateVa`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaBilling {
    /// Virtual account number to pay into.
    pub virtual_account: String,
    /// Transaction id of the billing.
    pub trx_id: String,
}

/// Result of `getInquiry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaBillingDetails {
    /// Transaction id of the billing.
    pub trx_id: String,
    /// Virtual account number.
    pub virtual_account: String,
    /// Billed amount.
    pub trx_amount: Decimal,
    /// Customer name.
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Customer email.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Customer phone.
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Creation time as sent by the bank.
    #[serde(default)]
    pub datetime_created: Option<String>,
    /// Expiry as sent by the bank.
    #[serde(default)]
    pub datetime_expired: Option<String>,
    /// Last payment time as sent by the bank.
    #[serde(default)]
    pub datetime_payment: Option<String>,
    /// Amount paid so far.
    #[serde(default)]
    pub payment_amount: Option<Decimal>,
    /// Bank journal number of the last payment.
    #[serde(default)]
    pub payment_ntb: Option<String>,
    /// Billing status code.
    #[serde(default)]
    pub va_status: Option<String>,
    /// Billing type code.
    #[serde(default)]
    pub billing_type: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Façade over one virtual-account sub-product.
#[derive(Debug, Clone)]
pub struct VaProvider {
    product: VaProduct,
    contracts: Arc<Contracts>,
    remote: RemoteCall,
}

impl VaProvider {
    /// Creates a provider for `product`.
    #[must_use]
    pub const fn new(product: VaProduct, contracts: Arc<Contracts>, remote: RemoteCall) -> Self {
        Self {
            product,
            contracts,
            remote,
        }
    }

    /// The sub-product this provider talks to.
    #[must_use]
    pub const fn product(&self) -> VaProduct {
        self.product
    }

    /// Issues a billing.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.va.create_va", skip(self), fields(product = ?self.product), err)]
    pub async fn create_va(&self, billing: NewBilling) -> Result<VaBilling, ProviderError> {
        let trx_id = ReferenceNumber::or_generate(billing.trx_id);
        let mut payload = billing_fields(
            CREATE_BILLING,
            trx_id.as_str(),
            billing.amount,
            &billing.customer,
            billing.expires_at,
            billing.description,
        );
        payload.insert("billing_type".into(), self.product.billing_type().into());
        if let Some(account) = billing.virtual_account {
            payload.insert("virtual_account".into(), account.into());
        }
        self.call(Value::Object(payload))
            .await
            .map_err(|e| ProviderError::new("createVa", e))
    }

    /// Reads a billing and its payment state.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.va.get_inquiry", skip(self), fields(product = ?self.product), err)]
    pub async fn get_inquiry(&self, trx_id: &str) -> Result<VaBillingDetails, ProviderError> {
        let payload = json!({ "type": INQUIRY_BILLING, "trx_id": trx_id });
        self.call(payload)
            .await
            .map_err(|e| ProviderError::new("getInquiry", e))
    }

    /// Changes an unpaid billing.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.va.update_va", skip(self), fields(product = ?self.product), err)]
    pub async fn update_va(&self, update: BillingUpdate) -> Result<VaBilling, ProviderError> {
        let payload = billing_fields(
            UPDATE_BILLING,
            &update.trx_id,
            update.amount,
            &update.customer,
            update.expires_at,
            update.description,
        );
        self.call(Value::Object(payload))
            .await
            .map_err(|e| ProviderError::new("updateVa", e))
    }

    async fn call<T: DeserializeOwned>(&self, payload: Value) -> Result<T, ProviderFailure> {
        let (mut request, response) = self.contracts.prepare(self.product.resource())?;
        request.set_payload(payload)?;
        let data = self.remote.execute(&request, response).await?;
        T::deserialize(&data).map_err(|e| {
            ResponseError::invalid_with("unexpected billing data", data.to_string(), e).into()
        })
    }
}

fn billing_fields(
    kind: &str,
    trx_id: &str,
    amount: Decimal,
    customer: &VaCustomer,
    expires_at: Option<DateTime<FixedOffset>>,
    description: Option<String>,
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("type".into(), kind.into());
    fields.insert("trx_id".into(), trx_id.into());
    fields.insert("trx_amount".into(), amount.to_string().into());
    fields.insert("customer_name".into(), customer.name.clone().into());
    if let Some(email) = &customer.email {
        fields.insert("customer_email".into(), email.clone().into());
    }
    if let Some(phone) = &customer.phone {
        fields.insert("customer_phone".into(), phone.clone().into());
    }
    if let Some(expires_at) = expires_at {
        fields.insert(
            "datetime_expired".into(),
            expires_at.format("%Y-%m-%dT%H:%M:%S%:z").to_string().into(),
        );
    }
    if let Some(description) = description {
        fields.insert("description".into(), description.into());
    }
    fields
}
