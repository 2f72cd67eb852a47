//! Gateway provider: balance, inquiry, payment, hold and transfer.

use std::fmt;
use std::sync::Arc;

use bankgate::config::OpgConfig;
use bankgate::contract::{AccessToken, OpgAuthRequest, OpgEnvelope, OpgOperation};
use bankgate::error::ResponseError;
use bankgate::reference::ReferenceNumber;
use bankgate::resource::ResourceId;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use super::Contracts;
use crate::error::{ProviderError, ProviderFailure};
use crate::remote::RemoteCall;
use crate::routing::BankRouting;
use crate::token::TokenCache;

/// Currency of every gateway payment.
pub const VALUE_CURRENCY: &str = "IDR";

/// How a payment is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Between two accounts of this bank.
    #[serde(rename = "0")]
    InHouse,
    /// Real-time gross settlement.
    #[serde(rename = "1")]
    Rtgs,
    /// Clearing (SKN).
    #[serde(rename = "2")]
    Clearing,
}

impl PaymentMethod {
    /// The `paymentMethod` code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InHouse => "0",
            Self::Rtgs => "1",
            Self::Clearing => "2",
        }
    }
}

/// Who bears the transfer fee of an interbank payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargeMode {
    /// The sender pays.
    #[default]
    Our,
    /// The beneficiary pays.
    Ben,
    /// Shared.
    Sha,
}

impl ChargeMode {
    /// The `chargingModelId` code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Our => "OUR",
            Self::Ben => "BEN",
            Self::Sha => "SHA",
        }
    }
}

/// Beneficiary details sent with a payment. Empty for in-house payments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Beneficiary {
    /// Account holder name.
    pub name: String,
    /// Notification address.
    pub email: String,
    /// First address line.
    pub address1: String,
    /// Second address line.
    pub address2: String,
}

/// Parameters of `doPayment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    /// Caller's reference number; generated when absent.
    pub reference: Option<String>,
    /// Routing of the payment.
    pub method: PaymentMethod,
    /// Source account at this bank.
    pub debit_account: String,
    /// Destination account.
    pub credit_account: String,
    /// Amount in IDR.
    pub amount: Decimal,
    /// Free-text remark.
    pub remark: String,
    /// Peer details; left empty for in-house payments.
    pub beneficiary: Beneficiary,
    /// Destination clearing code; empty for in-house payments.
    pub destination_bank_code: String,
    /// Fee bearer; `None` sends an empty code.
    pub charge_mode: Option<ChargeMode>,
}

/// Parameters of [`OpgProvider::transfer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Caller's reference number; generated when absent.
    pub reference: Option<String>,
    /// Source account at this bank.
    pub source_account: String,
    /// Bank code of the destination, e.g. `"009"` or `"014"`.
    pub destination_bank_code: String,
    /// Destination account.
    pub destination_account: String,
    /// Destination account holder.
    pub destination_name: String,
    /// Amount in IDR.
    pub amount: Decimal,
    /// Free-text remark.
    pub remark: String,
    /// Fee bearer for interbank transfers; defaults to [`ChargeMode::Our`].
    pub charge_mode: Option<ChargeMode>,
}

/// Parameters of `holdAmount` and `holdAmountRelease`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldOrder {
    /// Caller's reference number; generated when absent.
    pub reference: Option<String>,
    /// Account to block funds on.
    pub account_no: String,
    /// Amount in IDR.
    pub amount: Decimal,
    /// Free-text detail.
    pub detail: String,
}

/// Parameters of `getInterbankPayment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterbankPaymentOrder {
    /// Caller's reference number; generated when absent.
    pub reference: Option<String>,
    /// Source account at this bank.
    pub account_num: String,
    /// Amount in IDR.
    pub amount: Decimal,
    /// Destination bank code.
    pub destination_bank_code: String,
    /// Destination bank name, as returned by the inquiry.
    pub destination_bank_name: String,
    /// Destination account.
    pub destination_account_num: String,
    /// Destination account holder, as returned by the inquiry.
    pub destination_account_name: String,
    /// Retrieval reference returned by the inquiry.
    pub retrieval_reff_num: String,
}

/// Result of `getBalance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Account holder.
    #[serde(default)]
    pub customer_name: String,
    /// Account currency.
    #[serde(default)]
    pub account_currency: String,
    /// Available balance.
    pub account_balance: Decimal,
}

/// Result of `getInHouseInquiry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InhouseInquiry {
    /// Account holder.
    #[serde(default)]
    pub customer_name: String,
    /// Account currency.
    #[serde(default)]
    pub account_currency: String,
    /// Account number.
    #[serde(default)]
    pub account_number: String,
    /// Account status, e.g. `BUKA`.
    #[serde(default)]
    pub account_status: String,
    /// Product type of the account.
    #[serde(default)]
    pub account_type: String,
}

/// Result of `doPayment` and [`OpgProvider::transfer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// The reference number the payment was sent with.
    #[serde(default)]
    pub customer_reference: String,
    /// The bank's journal reference.
    #[serde(default)]
    pub bank_reference: Option<String>,
    /// Source account.
    #[serde(default)]
    pub debit_account_no: Option<String>,
    /// Destination account.
    #[serde(default)]
    pub credit_account_no: Option<String>,
    /// Amount the bank booked.
    #[serde(default)]
    pub value_amount: Option<Decimal>,
    /// Currency the bank booked.
    #[serde(default)]
    pub value_currency: Option<String>,
}

/// Result of `getPaymentStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    /// Outcome of the earlier payment, e.g. `Y`.
    #[serde(default)]
    pub transaction_status: String,
    /// Response code of the earlier payment.
    #[serde(default)]
    pub previous_response_code: Option<String>,
    /// Response message of the earlier payment.
    #[serde(default)]
    pub previous_response_message: Option<String>,
    /// When the earlier payment was answered.
    #[serde(default)]
    pub previous_response_timestamp: Option<String>,
    /// Source account.
    #[serde(default)]
    pub debit_account_no: Option<String>,
    /// Destination account.
    #[serde(default)]
    pub credit_account_no: Option<String>,
    /// Amount booked.
    #[serde(default)]
    pub value_amount: Option<Decimal>,
    /// Currency booked.
    #[serde(default)]
    pub value_currency: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviousResponse {
    previous_response: PaymentStatus,
}

/// Result of `holdAmount` and `holdAmountRelease`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldReceipt {
    /// The reference number the hold was sent with.
    #[serde(default)]
    pub customer_reference_number: String,
    /// Account the funds are blocked on.
    #[serde(default, alias = "accountNo")]
    pub account_number: Option<String>,
    /// Amount blocked or released.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Journal number; needed to release the hold.
    #[serde(default, alias = "journalNum")]
    pub journal_number: Option<String>,
}

/// Result of `getInterbankInquiry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterbankInquiry {
    /// Destination account.
    #[serde(default)]
    pub destination_account_num: String,
    /// Destination account holder.
    #[serde(default)]
    pub destination_account_name: String,
    /// Destination bank name.
    #[serde(default)]
    pub destination_bank_name: String,
    /// Reference to pass on to the payment.
    #[serde(default)]
    pub retrieval_reff_num: String,
}

/// Result of `getInterbankPayment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterbankReceipt {
    /// The bank's journal number.
    #[serde(default)]
    pub journal_num: Option<String>,
    /// Destination account.
    #[serde(default)]
    pub destination_account_num: Option<String>,
    /// Destination account holder.
    #[serde(default)]
    pub destination_account_name: Option<String>,
    /// Echo of the reference number.
    #[serde(default)]
    pub customer_reff_num: Option<String>,
    /// Source account holder.
    #[serde(default)]
    pub account_name: Option<String>,
}

/// Façade over the token-authenticated gateway.
#[derive(Clone)]
pub struct OpgProvider {
    config: Arc<OpgConfig>,
    contracts: Arc<Contracts>,
    remote: RemoteCall,
    tokens: Arc<TokenCache>,
    routing: Arc<dyn BankRouting>,
}

impl fmt::Debug for OpgProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpgProvider")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl OpgProvider {
    /// Creates a provider sharing `tokens` with every other gateway provider
    /// in the process.
    #[must_use]
    pub fn new(
        config: Arc<OpgConfig>,
        contracts: Arc<Contracts>,
        remote: RemoteCall,
        tokens: Arc<TokenCache>,
        routing: Arc<dyn BankRouting>,
    ) -> Self {
        Self {
            config,
            contracts,
            remote,
            tokens,
            routing,
        }
    }

    /// Account balance.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.opg.get_balance", skip(self), err)]
    pub async fn get_balance(&self, account_no: &str) -> Result<Balance, ProviderError> {
        let op = OpgOperation::GetBalance;
        self.call(op, json!({ "accountNo": account_no }))
            .await
            .map_err(|e| ProviderError::new(op.name(), e))
    }

    /// Holder and status of an account at this bank.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.opg.get_inhouse_inquiry", skip(self), err)]
    pub async fn get_inhouse_inquiry(&self, account_no: &str) -> Result<InhouseInquiry, ProviderError> {
        let op = OpgOperation::GetInhouseInquiry;
        self.call(op, json!({ "accountNo": account_no }))
            .await
            .map_err(|e| ProviderError::new(op.name(), e))
    }

    /// Sends a payment instruction.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    /// A rejected duplicate carries code `0007`.
    #[instrument(name = "bankgate.opg.do_payment", skip(self), err)]
    pub async fn do_payment(&self, order: PaymentOrder) -> Result<PaymentReceipt, ProviderError> {
        let op = OpgOperation::DoPayment;
        let reference = ReferenceNumber::or_generate(order.reference.clone());
        let payload = payment_payload(&order, &reference);
        let mut receipt: PaymentReceipt = self
            .call(op, payload)
            .await
            .map_err(|e| ProviderError::new(op.name(), e))?;
        if receipt.customer_reference.is_empty() {
            receipt.customer_reference = reference.into_inner();
        }
        Ok(receipt)
    }

    /// Status of an earlier payment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.opg.get_payment_status", skip(self), err)]
    pub async fn get_payment_status(&self, reference: &str) -> Result<PaymentStatus, ProviderError> {
        let op = OpgOperation::GetPaymentStatus;
        self.call::<PreviousResponse>(op, json!({ "customerReferenceNumber": reference }))
            .await
            .map(|status| status.previous_response)
            .map_err(|e| ProviderError::new(op.name(), e))
    }

    /// Blocks funds on an account.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.opg.hold_amount", skip(self), err)]
    pub async fn hold_amount(&self, order: HoldOrder) -> Result<HoldReceipt, ProviderError> {
        self.hold(OpgOperation::HoldAmount, order, None).await
    }

    /// Releases funds blocked by [`Self::hold_amount`].
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.opg.hold_amount_release", skip(self), err)]
    pub async fn hold_amount_release(
        &self,
        order: HoldOrder,
        journal_number: &str,
    ) -> Result<HoldReceipt, ProviderError> {
        self.hold(OpgOperation::HoldAmountRelease, order, Some(journal_number))
            .await
    }

    /// Holder of an account at another bank.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.opg.get_interbank_inquiry", skip(self), err)]
    pub async fn get_interbank_inquiry(
        &self,
        reference: Option<String>,
        account_num: &str,
        destination_bank_code: &str,
        destination_account_num: &str,
    ) -> Result<InterbankInquiry, ProviderError> {
        let op = OpgOperation::GetInterbankInquiry;
        let reference = ReferenceNumber::or_generate(reference);
        let payload = json!({
            "customerReferenceNumber": reference,
            "accountNum": account_num,
            "destinationBankCode": destination_bank_code,
            "destinationAccountNum": destination_account_num,
        });
        self.call(op, payload)
            .await
            .map_err(|e| ProviderError::new(op.name(), e))
    }

    /// Online interbank transfer following an interbank inquiry.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on any transport, validation or bank failure.
    #[instrument(name = "bankgate.opg.interbank_payment", skip(self), err)]
    pub async fn interbank_payment(
        &self,
        order: InterbankPaymentOrder,
    ) -> Result<InterbankReceipt, ProviderError> {
        let op = OpgOperation::GetInterbankPayment;
        let reference = ReferenceNumber::or_generate(order.reference);
        let payload = json!({
            "customerReferenceNumber": reference,
            "amount": order.amount,
            "destinationAccountNum": order.destination_account_num,
            "destinationAccountName": order.destination_account_name,
            "destinationBankCode": order.destination_bank_code,
            "destinationBankName": order.destination_bank_name,
            "accountNum": order.account_num,
            "retrievalReffNum": order.retrieval_reff_num,
        });
        self.call(op, payload)
            .await
            .map_err(|e| ProviderError::new(op.name(), e))
    }

    /// Moves funds to any bank.
    ///
    /// Transfers to this bank go in-house with empty peer fields. Any other
    /// destination is resolved to its clearing code through the routing
    /// lookup and sent as a clearing payment, sender paying by default.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the destination cannot be routed or the
    /// payment fails.
    #[instrument(name = "bankgate.opg.transfer", skip(self), err)]
    pub async fn transfer(&self, request: TransferRequest) -> Result<PaymentReceipt, ProviderError> {
        let reference = ReferenceNumber::or_generate(request.reference);
        let mut order = PaymentOrder {
            reference: Some(reference.into_inner()),
            method: PaymentMethod::InHouse,
            debit_account: request.source_account,
            credit_account: request.destination_account,
            amount: request.amount,
            remark: request.remark,
            beneficiary: Beneficiary::default(),
            destination_bank_code: String::new(),
            charge_mode: None,
        };

        if request.destination_bank_code != self.config.self_bank_code {
            let clearing_code = self
                .routing
                .clearing_code(&request.destination_bank_code)
                .await
                .map_err(|e| ProviderError::new(OpgOperation::DoPayment.name(), e))?;
            order.method = PaymentMethod::Clearing;
            order.destination_bank_code = clearing_code;
            order.beneficiary.name = request.destination_name;
            order.charge_mode = Some(request.charge_mode.unwrap_or_default());
        }

        self.do_payment(order).await
    }

    async fn hold(
        &self,
        op: OpgOperation,
        order: HoldOrder,
        journal_number: Option<&str>,
    ) -> Result<HoldReceipt, ProviderError> {
        let reference = ReferenceNumber::or_generate(order.reference);
        let mut payload = json!({
            "customerReferenceNumber": reference,
            "accountNo": order.account_no,
            "amount": order.amount,
            "detail": order.detail,
        });
        if let Some(journal_number) = journal_number {
            payload["journalNumber"] = Value::from(journal_number);
        }
        let mut receipt: HoldReceipt = self
            .call(op, payload)
            .await
            .map_err(|e| ProviderError::new(op.name(), e))?;
        if receipt.customer_reference_number.is_empty() {
            receipt.customer_reference_number = reference.into_inner();
        }
        Ok(receipt)
    }

    /// Runs `op` and reads its `parameters` into `T`.
    async fn call<T: DeserializeOwned>(
        &self,
        op: OpgOperation,
        payload: Value,
    ) -> Result<T, ProviderFailure> {
        let response = self.exchange(op, payload).await?;
        let envelope = OpgEnvelope::for_operation(&response, op)?;
        serde_json::from_value(Value::Object(envelope.parameters.fields)).map_err(|e| {
            ResponseError::invalid_with(
                format!("unexpected {} parameters", op.name()),
                response.to_string(),
                e,
            )
            .into()
        })
    }

    async fn exchange(&self, op: OpgOperation, payload: Value) -> Result<Value, ProviderFailure> {
        let token = self.access_token().await?;
        let (mut request, response) = self.contracts.prepare(ResourceId::OpgGeneric)?;
        request.set_path(op.path());
        request.set_bearer_token(&token)?;
        request.set_payload(payload)?;
        Ok(self.remote.execute(&request, response).await?)
    }

    async fn access_token(&self) -> Result<String, ProviderFailure> {
        self.tokens
            .get_or_authenticate(|| self.authenticate())
            .await
    }

    async fn authenticate(&self) -> Result<String, ProviderFailure> {
        let (mut request, response) = self.contracts.prepare(ResourceId::OpgAuth)?;
        request.set_payload(OpgAuthRequest::default_payload())?;
        let body = self.remote.execute(&request, response).await?;
        let token = AccessToken::deserialize(&body).map_err(|e| {
            ResponseError::invalid_with("malformed token response", body.to_string(), e)
        })?;
        Ok(token.access_token)
    }
}

fn payment_payload(order: &PaymentOrder, reference: &ReferenceNumber) -> Value {
    json!({
        "customerReferenceNumber": reference,
        "paymentMethod": order.method.code(),
        "debitAccountNo": order.debit_account,
        "creditAccountNo": order.credit_account,
        "valueDate": Utc::now().format("%Y%m%d%H%M%S%3f").to_string(),
        "valueCurrency": VALUE_CURRENCY,
        "valueAmount": order.amount,
        "remark": order.remark,
        "beneficiaryEmailAddress": order.beneficiary.email,
        "beneficiaryName": order.beneficiary.name,
        "beneficiaryAddress1": order.beneficiary.address1,
        "beneficiaryAddress2": order.beneficiary.address2,
        "destinationBankCode": order.destination_bank_code,
        "chargingModelId": order.charge_mode.map_or("", |mode| mode.code()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::fixtures;
    use crate::routing::StaticBankRouting;
    use std::str::FromStr;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, routing: StaticBankRouting) -> OpgProvider {
        let config = fixtures::opg_config(server);
        let contracts = Arc::new(Contracts::new(&config, &fixtures::va_config(server)));
        OpgProvider::new(
            config,
            contracts,
            RemoteCall::new(),
            Arc::new(TokenCache::new()),
            Arc::new(routing),
        )
    }

    async fn mount_auth(server: &MockServer, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gateway-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(calls)
            .mount(server)
            .await;
    }

    fn success(op: OpgOperation, parameters: Value) -> ResponseTemplate {
        let mut parameters = parameters;
        parameters["responseCode"] = json!("0001");
        parameters["responseMessage"] = json!("Request has been processed successfully");
        ResponseTemplate::new(200).set_body_json(json!({
            op.response_key(): { "clientId": "IDV0FMTEVU", "parameters": parameters }
        }))
    }

    fn receipt_template() -> ResponseTemplate {
        success(
            OpgOperation::DoPayment,
            json!({ "bankReference": "953044", "valueAmount": "150000" }),
        )
    }

    fn transfer_request(bank: &str) -> TransferRequest {
        TransferRequest {
            reference: Some("20240101120000123".into()),
            source_account: "0115476117".into(),
            destination_bank_code: bank.into(),
            destination_account: "3333333333".into(),
            destination_name: "Siti".into(),
            amount: Decimal::from(150_000),
            remark: "rent".into(),
            charge_mode: None,
        }
    }

    #[tokio::test]
    async fn test_token_is_reused_across_operations() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/getbalance"))
            .and(header("authorization", "Bearer gateway-token"))
            .and(header("x-api-key", "api-key"))
            .respond_with(success(
                OpgOperation::GetBalance,
                json!({
                    "customerName": "Budi",
                    "accountCurrency": "IDR",
                    "accountBalance": 1_500_000
                }),
            ))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server, StaticBankRouting::default());
        for _ in 0..2 {
            let balance = provider.get_balance("0115476117").await.unwrap();
            assert_eq!(balance.customer_name, "Budi");
            assert_eq!(balance.account_balance, Decimal::from(1_500_000));
        }
    }

    #[tokio::test]
    async fn test_transfer_to_self_bank_goes_in_house() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/dopayment"))
            .and(body_partial_json(json!({
                "customerReferenceNumber": "20240101120000123",
                "paymentMethod": "0",
                "creditAccountNo": "3333333333",
                "valueCurrency": "IDR",
                "beneficiaryName": "",
                "destinationBankCode": "",
                "chargingModelId": ""
            })))
            .respond_with(receipt_template())
            .expect(1)
            .mount(&server)
            .await;

        let receipt = provider(&server, StaticBankRouting::default())
            .transfer(transfer_request("009"))
            .await
            .unwrap();
        assert_eq!(receipt.customer_reference, "20240101120000123");
        assert_eq!(receipt.bank_reference.as_deref(), Some("953044"));
        assert_eq!(receipt.value_amount, Some(Decimal::from(150_000)));
    }

    #[tokio::test]
    async fn test_transfer_to_other_bank_uses_clearing_code() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/dopayment"))
            .and(body_partial_json(json!({
                "paymentMethod": "2",
                "beneficiaryName": "Siti",
                "destinationBankCode": "CENAIDJA",
                "chargingModelId": "OUR"
            })))
            .respond_with(receipt_template())
            .expect(1)
            .mount(&server)
            .await;

        let routing = StaticBankRouting::default().with("014", "CENAIDJA");
        provider(&server, routing)
            .transfer(transfer_request("014"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_bank_fails_before_paying() {
        let server = MockServer::start().await;
        mount_auth(&server, 0).await;

        let err = provider(&server, StaticBankRouting::default())
            .transfer(transfer_request("999"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Routing);
    }

    #[tokio::test]
    async fn test_generated_reference_is_numeric() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/dopayment"))
            .respond_with(receipt_template())
            .mount(&server)
            .await;

        let mut request = transfer_request("009");
        request.reference = None;
        let receipt = provider(&server, StaticBankRouting::default())
            .transfer(request)
            .await
            .unwrap();
        assert!(receipt.customer_reference.len() > 15);
        assert!(receipt.customer_reference.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_duplicate_payment_surfaces_bank_message() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/dopayment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": {
                    "parameters": {
                        "responseCode": "0007",
                        "responseMessage": "Failed",
                        "errorMessage": "Duplicate customerReferenceNumber"
                    }
                }
            })))
            .mount(&server)
            .await;

        let err = provider(&server, StaticBankRouting::default())
            .transfer(transfer_request("009"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessFailure);
        assert_eq!(err.operation, "doPayment");
        assert_eq!(err.message, "Duplicate customerReferenceNumber");
        assert!(err.business_failure().unwrap().is_duplicate_request());
        assert!(err.payload().unwrap().get("Response").is_some());
    }

    #[tokio::test]
    async fn test_failed_authentication_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let err = provider(&server, StaticBankRouting::default())
            .get_balance("1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatusCode);
        assert_eq!(err.body(), Some("bad credentials"));
    }

    #[tokio::test]
    async fn test_payment_status_reads_previous_response() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/getpaymentstatus"))
            .and(body_partial_json(json!({ "customerReferenceNumber": "REF-1" })))
            .respond_with(success(
                OpgOperation::GetPaymentStatus,
                json!({
                    "previousResponse": {
                        "transactionStatus": "Y",
                        "previousResponseCode": "0001",
                        "valueAmount": "150000.50"
                    }
                }),
            ))
            .mount(&server)
            .await;

        let status = provider(&server, StaticBankRouting::default())
            .get_payment_status("REF-1")
            .await
            .unwrap();
        assert_eq!(status.transaction_status, "Y");
        assert_eq!(status.value_amount, Some(Decimal::from_str("150000.50").unwrap()));
    }

    #[tokio::test]
    async fn test_hold_release_sends_journal_number() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/holdamountrelease"))
            .and(body_partial_json(json!({
                "customerReferenceNumber": "HOLD-1",
                "accountNo": "0115476117",
                "journalNumber": "J-77"
            })))
            .respond_with(success(
                OpgOperation::HoldAmountRelease,
                json!({ "journalNum": "J-78", "amount": "5000" }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let order = HoldOrder {
            reference: Some("HOLD-1".into()),
            account_no: "0115476117".into(),
            amount: Decimal::from(5_000),
            detail: "release".into(),
        };
        let receipt = provider(&server, StaticBankRouting::default())
            .hold_amount_release(order, "J-77")
            .await
            .unwrap();
        assert_eq!(receipt.journal_number.as_deref(), Some("J-78"));
        assert_eq!(receipt.customer_reference_number, "HOLD-1");
    }

    #[tokio::test]
    async fn test_interbank_inquiry() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/getinterbankinquiry"))
            .and(body_partial_json(json!({ "destinationBankCode": "014" })))
            .respond_with(success(
                OpgOperation::GetInterbankInquiry,
                json!({
                    "destinationAccountNum": "3333333333",
                    "destinationAccountName": "SITI",
                    "destinationBankName": "BCA",
                    "retrievalReffNum": "100000000024"
                }),
            ))
            .mount(&server)
            .await;

        let inquiry = provider(&server, StaticBankRouting::default())
            .get_interbank_inquiry(None, "0115476117", "014", "3333333333")
            .await
            .unwrap();
        assert_eq!(inquiry.destination_account_name, "SITI");
        assert_eq!(inquiry.retrieval_reff_num, "100000000024");
    }

    #[tokio::test]
    async fn test_inhouse_inquiry() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/getinhouseinquiry"))
            .and(body_partial_json(json!({ "accountNo": "0115476117" })))
            .respond_with(success(
                OpgOperation::GetInhouseInquiry,
                json!({
                    "customerName": "Budi",
                    "accountCurrency": "IDR",
                    "accountNumber": "0115476117",
                    "accountStatus": "BUKA",
                    "accountType": "SA"
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let inquiry = provider(&server, StaticBankRouting::default())
            .get_inhouse_inquiry("0115476117")
            .await
            .unwrap();
        assert_eq!(
            inquiry,
            InhouseInquiry {
                customer_name: "Budi".into(),
                account_currency: "IDR".into(),
                account_number: "0115476117".into(),
                account_status: "BUKA".into(),
                account_type: "SA".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_rtgs_payment_sends_method_and_charge_mode() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/dopayment"))
            .and(body_partial_json(json!({
                "customerReferenceNumber": "RTGS-1",
                "paymentMethod": "1",
                "debitAccountNo": "0115476117",
                "creditAccountNo": "8888888888",
                "valueCurrency": "IDR",
                "valueAmount": "250000000",
                "remark": "supplier",
                "beneficiaryEmailAddress": "ap@supplier.example",
                "beneficiaryName": "PT Supplier",
                "beneficiaryAddress1": "Jl. Sudirman 1",
                "beneficiaryAddress2": "Jakarta",
                "destinationBankCode": "CENAIDJA",
                "chargingModelId": "SHA"
            })))
            .respond_with(success(
                OpgOperation::DoPayment,
                json!({
                    "debitAccountNo": "0115476117",
                    "creditAccountNo": "8888888888",
                    "valueAmount": "250000000",
                    "valueCurrency": "IDR",
                    "bankReference": "657364"
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let order = PaymentOrder {
            reference: Some("RTGS-1".into()),
            method: PaymentMethod::Rtgs,
            debit_account: "0115476117".into(),
            credit_account: "8888888888".into(),
            amount: Decimal::from(250_000_000),
            remark: "supplier".into(),
            beneficiary: Beneficiary {
                name: "PT Supplier".into(),
                email: "ap@supplier.example".into(),
                address1: "Jl. Sudirman 1".into(),
                address2: "Jakarta".into(),
            },
            destination_bank_code: "CENAIDJA".into(),
            charge_mode: Some(ChargeMode::Sha),
        };
        let receipt = provider(&server, StaticBankRouting::default())
            .do_payment(order)
            .await
            .unwrap();
        assert_eq!(receipt.customer_reference, "RTGS-1");
        assert_eq!(receipt.bank_reference.as_deref(), Some("657364"));
        assert_eq!(receipt.debit_account_no.as_deref(), Some("0115476117"));
        assert_eq!(receipt.credit_account_no.as_deref(), Some("8888888888"));
        assert_eq!(receipt.value_amount, Some(Decimal::from(250_000_000)));
        assert_eq!(receipt.value_currency.as_deref(), Some("IDR"));

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[1].body).unwrap();
        let value_date = sent["valueDate"].as_str().unwrap();
        assert_eq!(value_date.len(), 17);
        assert!(value_date.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_hold_amount() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/holdamount"))
            .and(body_partial_json(json!({
                "customerReferenceNumber": "HOLD-9",
                "accountNo": "0115476117",
                "amount": "5000",
                "detail": "escrow"
            })))
            .respond_with(success(
                OpgOperation::HoldAmount,
                json!({
                    "accountNo": "0115476117",
                    "amount": "5000",
                    "journalNum": "J-77"
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let order = HoldOrder {
            reference: Some("HOLD-9".into()),
            account_no: "0115476117".into(),
            amount: Decimal::from(5_000),
            detail: "escrow".into(),
        };
        let receipt = provider(&server, StaticBankRouting::default())
            .hold_amount(order)
            .await
            .unwrap();
        assert_eq!(
            receipt,
            HoldReceipt {
                customer_reference_number: "HOLD-9".into(),
                account_number: Some("0115476117".into()),
                amount: Some(Decimal::from(5_000)),
                journal_number: Some("J-77".into()),
            }
        );

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert!(sent.get("journalNumber").is_none());
    }

    #[tokio::test]
    async fn test_interbank_payment() {
        let server = MockServer::start().await;
        mount_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/H2H/v2/getinterbankpayment"))
            .and(body_partial_json(json!({
                "customerReferenceNumber": "IBP-1",
                "amount": "150000",
                "destinationAccountNum": "3333333333",
                "destinationAccountName": "SITI",
                "destinationBankCode": "014",
                "destinationBankName": "BCA",
                "accountNum": "0115476117",
                "retrievalReffNum": "100000000024"
            })))
            .respond_with(success(
                OpgOperation::GetInterbankPayment,
                json!({
                    "journalNum": "J-900",
                    "destinationAccountNum": "3333333333",
                    "destinationAccountName": "SITI",
                    "customerReffNum": "IBP-1",
                    "accountName": "BUDI"
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let order = InterbankPaymentOrder {
            reference: Some("IBP-1".into()),
            account_num: "0115476117".into(),
            amount: Decimal::from(150_000),
            destination_bank_code: "014".into(),
            destination_bank_name: "BCA".into(),
            destination_account_num: "3333333333".into(),
            destination_account_name: "SITI".into(),
            retrieval_reff_num: "100000000024".into(),
        };
        let receipt = provider(&server, StaticBankRouting::default())
            .interbank_payment(order)
            .await
            .unwrap();
        assert_eq!(
            receipt,
            InterbankReceipt {
                journal_num: Some("J-900".into()),
                destination_account_num: Some("3333333333".into()),
                destination_account_name: Some("SITI".into()),
                customer_reff_num: Some("IBP-1".into()),
                account_name: Some("BUDI".into()),
            }
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(PaymentMethod::Clearing.code(), "2");
        assert_eq!(ChargeMode::default().code(), "OUR");
        assert_eq!(serde_json::to_value(ChargeMode::Sha).unwrap(), json!("SHA"));
    }
}
