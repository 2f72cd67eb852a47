//! One HTTP exchange with the bank.
//!
//! [`RemoteCall`] serializes a [`BankRequest`], performs exactly one
//! exchange (no retries: reference numbers are the caller's idempotency
//! tokens), feeds status and body into a fresh [`BankResponse`] and returns
//! its validated business payload.
//!
//! Every exchange is written to the `bankgate::audit` tracing target with
//! method, URL, headers, payload, status and body. Credentials in headers and
//! tokens in response bodies are redacted.

use std::collections::BTreeMap;

use bankgate::contract::{BankRequest, BankResponse, WireBody, WireRequest};
use http::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use crate::error::CallError;

const REDACTED_HEADERS: [&str; 2] = ["authorization", "x-api-key"];

const REDACTED_BODY_FIELDS: [&str; 1] = ["access_token"];

const REDACTED: &str = "<redacted>";

/// Executes bank requests over a shared `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct RemoteCall {
    client: Client,
}

impl RemoteCall {
    /// Creates a caller with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a pre-configured client (proxies, custom roots, pool sizes).
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Performs one exchange and validates the response.
    ///
    /// `response` must be a fresh instance of the variant matching `request`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError`] classified as a transport, request or response
    /// failure.
    #[instrument(
        name = "bankgate.remote_call",
        skip_all,
        fields(resource = %request.resource()),
        err
    )]
    pub async fn execute(
        &self,
        request: &BankRequest,
        mut response: BankResponse,
    ) -> Result<Value, CallError> {
        let wire = request.to_wire()?;
        let url = wire.url.to_string();

        let mut builder = self
            .client
            .request(wire.method.clone(), wire.url.clone())
            .headers(wire.headers.clone())
            .timeout(wire.timeout);
        builder = match &wire.body {
            WireBody::Json(value) => builder.json(value),
            WireBody::Form(fields) => builder.form(fields),
        };

        let http_response = builder.send().await.map_err(|e| {
            audit_failure(&wire, &e);
            CallError::transport(&url, e)
        })?;
        let status = http_response.status();
        let body = http_response.text().await.map_err(|e| {
            audit_failure(&wire, &e);
            CallError::transport(&url, e)
        })?;

        tracing::info!(
            target: "bankgate::audit",
            method = %wire.method,
            url = %url,
            headers = ?redact(&wire.headers),
            payload = %wire.body.to_value(),
            status = status.as_u16(),
            body = %redact_body(&body),
            "bank exchange"
        );

        response.set(status, body);
        let result = response.to_representation().map_err(CallError::from);
        if let Err(err) = &result {
            tracing::warn!(kind = %err.kind(), error = %err, "bank response rejected");
        }
        result
    }
}

fn audit_failure(wire: &WireRequest, err: &reqwest::Error) {
    tracing::error!(
        target: "bankgate::audit",
        method = %wire.method,
        url = %wire.url,
        headers = ?redact(&wire.headers),
        payload = %wire.body.to_value(),
        error = %err,
        "bank exchange failed"
    );
}

fn redact(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if REDACTED_HEADERS.contains(&name.as_str()) {
                REDACTED.to_owned()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_owned(), value)
        })
        .collect()
}

/// The body with bearer tokens masked. Bodies that are not JSON objects are
/// logged as received.
fn redact_body(body: &str) -> String {
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };
    let mut redacted = false;
    for field in REDACTED_BODY_FIELDS {
        if let Some(value) = map.get_mut(field) {
            *value = Value::from(REDACTED);
            redacted = true;
        }
    }
    if redacted {
        Value::Object(map).to_string()
    } else {
        body.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use bankgate::config::{Endpoint, OpgConfig, OpgCredentials};
    use bankgate::contract::{OpgAuthRequest, OpgAuthResponse, OpgGenericRequest, OpgGenericResponse};
    use http::HeaderValue;
    use http::header::AUTHORIZATION;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::ErrorKind;

    fn config(server: &MockServer) -> Arc<OpgConfig> {
        config_at(Endpoint::new(server.uri()).with_port(server.address().port()))
    }

    fn config_at(endpoint: Endpoint) -> Arc<OpgConfig> {
        Arc::new(OpgConfig {
            endpoint,
            self_bank_code: "009".into(),
            credentials: OpgCredentials {
                username: "user".into(),
                password: "pass".into(),
                api_key: "api-key".into(),
                secret_key: "secret".into(),
                client_name: "WALLET".into(),
                client_id_prefix: "ID".into(),
            },
        })
    }

    fn auth_request(config: Arc<OpgConfig>) -> BankRequest {
        let mut request = BankRequest::OpgAuth(OpgAuthRequest::new(config).unwrap());
        request.set_payload(OpgAuthRequest::default_payload()).unwrap();
        request
    }

    #[tokio::test]
    async fn test_form_exchange_returns_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "abc" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = auth_request(config(&server));
        let payload = RemoteCall::new()
            .execute(&request, BankResponse::OpgAuth(OpgAuthResponse::new()))
            .await
            .unwrap();
        assert_eq!(payload["access_token"], "abc");
    }

    #[tokio::test]
    async fn test_json_exchange_business_failure() {
        let server = MockServer::start().await;
        let envelope = json!({
            "getBalanceResponse": {
                "parameters": { "responseCode": "0102", "errorMessage": "Invalid account" }
            }
        });
        Mock::given(method("POST"))
            .and(path("/H2H/v2/getbalance"))
            .and(header("x-api-key", "api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
            .mount(&server)
            .await;

        let mut request = BankRequest::OpgGeneric(OpgGenericRequest::new(config(&server)).unwrap());
        request.set_path("/H2H/v2/getbalance");
        request.set_payload(json!({ "accountNo": "1" })).unwrap();
        let err = RemoteCall::new()
            .execute(&request, BankResponse::OpgGeneric(OpgGenericResponse::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessFailure);
        assert_eq!(err.business_failure().unwrap().payload, envelope);
    }

    #[tokio::test]
    async fn test_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = RemoteCall::new()
            .execute(
                &auth_request(config(&server)),
                BankResponse::OpgAuth(OpgAuthResponse::new()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatusCode);
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut request = auth_request(config(&server));
        request.set_timeout(Duration::from_millis(50));
        let err = RemoteCall::new()
            .execute(&request, BankResponse::OpgAuth(OpgAuthResponse::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    /// A local port nothing listens on.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn refused(base_path: &str) -> CallError {
        let port = closed_port();
        let endpoint = Endpoint::new(format!("http://127.0.0.1:{port}{base_path}")).with_port(port);
        RemoteCall::new()
            .execute(
                &auth_request(config_at(endpoint)),
                BankResponse::OpgAuth(OpgAuthResponse::new()),
            )
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        let err = refused("").await;
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_tls_words_in_url_do_not_make_a_tls_error() {
        let err = refused("/ssl-gateway").await;
        assert!(err.to_string().contains("/ssl-gateway/api/oauth/token"));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_redact_hides_secrets() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert("x-api-key", HeaderValue::from_static("k"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let redacted = redact(&headers);
        assert_eq!(redacted["authorization"], "<redacted>");
        assert_eq!(redacted["x-api-key"], "<redacted>");
        assert_eq!(redacted["content-type"], "application/json");
    }

    #[test]
    fn test_redact_body_hides_access_token() {
        let logged = redact_body(r#"{"access_token":"gateway-token","expires_in":3600}"#);
        assert!(!logged.contains("gateway-token"));
        let logged: Value = serde_json::from_str(&logged).unwrap();
        assert_eq!(logged["access_token"], "<redacted>");
        assert_eq!(logged["expires_in"], 3600);
    }

    #[test]
    fn test_redact_body_keeps_other_bodies() {
        let envelope = r#"{"getBalanceResponse":{"parameters":{"responseCode":"0001"}}}"#;
        assert_eq!(redact_body(envelope), envelope);
        assert_eq!(redact_body("<html>bad gateway</html>"), "<html>bad gateway</html>");
    }
}
