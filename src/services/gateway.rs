//! Client for the external payment gateway.
//!
//! Wraps the provider's two operations (initialize a transaction, verify
//! one) behind typed requests and tagged results. The client is stateless:
//! verification never mutates anything on our side, and calling it repeatedly
//! for the same reference is safe. Every non-success answer from the provider
//! is surfaced as `ApiError::Gateway` carrying the raw response payload.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use crate::config::PaymentConfig;
use crate::error::{ApiError, ApiResult};

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct PaymentGatewayClient {
    base_url: String,
    secret_key: String,
    http_client: reqwest::Client,
}

/// Payload for `POST {base}/transaction/initialize`. Amounts travel as
/// strings on the wire.
#[derive(Debug, Serialize)]
pub struct InitializePayment {
    pub amount: String,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
    pub customization: Customization,
}

#[derive(Debug, Serialize)]
pub struct Customization {
    pub title: String,
    pub description: String,
}

/// Successful `initialize` outcome: where to send the customer.
#[derive(Debug)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

/// Gateway-reported outcome of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    /// Anything the gateway reports other than `success`, with the reported
    /// status string preserved.
    Failed(String),
}

/// Successful `verify` outcome.
#[derive(Debug)]
pub struct VerifiedTransaction {
    pub status: TransactionStatus,
    pub payment_method: Option<String>,
    /// Raw transaction payload from the provider, kept for diagnostics.
    pub raw: Value,
}

impl PaymentGatewayClient {
    pub fn from_config(config: &PaymentConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
            http_client: reqwest::Client::builder()
                .timeout(GATEWAY_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// `POST {base}/transaction/initialize`. Success requires both a 2xx
    /// status and a `"status": "success"` envelope.
    pub async fn initialize(&self, request: &InitializePayment) -> ApiResult<CheckoutSession> {
        info!(
            "Initializing gateway transaction: tx_ref={}, amount={}",
            request.tx_ref, request.amount
        );

        let response = self
            .http_client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Payment initiation failed", e))?;

        let http_status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| transport_error("Payment initiation failed", e))?;

        if !http_status.is_success() || body["status"] != "success" {
            return Err(ApiError::Gateway {
                message: "Failed to initiate payment".to_string(),
                details: body,
            });
        }

        let checkout_url = body["data"]["checkout_url"]
            .as_str()
            .ok_or_else(|| ApiError::Gateway {
                message: "Gateway response is missing checkout_url".to_string(),
                details: body.clone(),
            })?
            .to_string();

        Ok(CheckoutSession { checkout_url })
    }

    /// `GET {base}/transaction/verify/{tx_ref}`. The gateway is the source of
    /// truth; this call is read-only and repeatable.
    pub async fn verify(&self, tx_ref: &str) -> ApiResult<VerifiedTransaction> {
        info!("Verifying gateway transaction: tx_ref={}", tx_ref);

        let response = self
            .http_client
            .get(format!("{}/transaction/verify/{}", self.base_url, tx_ref))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| transport_error("Payment verification failed", e))?;

        let http_status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| transport_error("Payment verification failed", e))?;

        if !http_status.is_success() || body["status"] != "success" {
            return Err(ApiError::Gateway {
                message: "Failed to verify payment".to_string(),
                details: body,
            });
        }

        let data = body["data"].clone();
        let status = match data["status"].as_str() {
            Some("success") => TransactionStatus::Success,
            Some(other) => TransactionStatus::Failed(other.to_string()),
            None => TransactionStatus::Failed("unknown".to_string()),
        };
        let payment_method = data["payment_method"].as_str().map(str::to_string);

        Ok(VerifiedTransaction {
            status,
            payment_method,
            raw: data,
        })
    }
}

fn transport_error(context: &str, e: reqwest::Error) -> ApiError {
    ApiError::Gateway {
        message: format!("{}: gateway unreachable", context),
        details: serde_json::json!({ "error": e.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PaymentGatewayClient {
        PaymentGatewayClient::from_config(&PaymentConfig {
            secret_key: "test-secret".to_string(),
            base_url: server.uri(),
            callback_url: "http://localhost/api/payments/verify".to_string(),
            return_url: "http://localhost/api/bookings".to_string(),
        })
    }

    fn init_request() -> InitializePayment {
        InitializePayment {
            amount: "200".to_string(),
            currency: "ETB".to_string(),
            email: "guest@example.com".to_string(),
            first_name: "Guest".to_string(),
            last_name: "User".to_string(),
            tx_ref: "tx-11111111-2222-3333-4444-555555555555".to_string(),
            callback_url: "http://localhost/api/payments/verify".to_string(),
            return_url: "http://localhost/api/bookings".to_string(),
            customization: Customization {
                title: "Travel Booking Payment".to_string(),
                description: "Payment for booking".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn initialize_returns_checkout_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .and(header("authorization", "Bearer test-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Hosted Link",
                "data": { "checkout_url": "https://checkout.example.com/pay/abc" }
            })))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .initialize(&init_request())
            .await
            .expect("initialize should succeed");
        assert_eq!(session.checkout_url, "https://checkout.example.com/pay/abc");
    }

    #[tokio::test]
    async fn initialize_rejects_non_success_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed",
                "message": "Invalid currency"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .initialize(&init_request())
            .await
            .expect_err("non-success envelope must fail");
        match err {
            ApiError::Gateway { details, .. } => {
                assert_eq!(details["message"], "Invalid currency");
            }
            other => panic!("expected gateway error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn initialize_rejects_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "failed",
                "message": "Invalid API key"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .initialize(&init_request())
            .await
            .expect_err("401 must fail");
        assert!(matches!(err, ApiError::Gateway { .. }));
    }

    #[tokio::test]
    async fn verify_reports_success_with_payment_method() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/tx-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "status": "success", "payment_method": "telebirr", "amount": "200" }
            })))
            .mount(&server)
            .await;

        let verified = client_for(&server)
            .verify("tx-abc")
            .await
            .expect("verify should succeed");
        assert_eq!(verified.status, TransactionStatus::Success);
        assert_eq!(verified.payment_method.as_deref(), Some("telebirr"));
        assert_eq!(verified.raw["amount"], "200");
    }

    #[tokio::test]
    async fn verify_reports_failed_transaction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/tx-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "status": "failed", "payment_method": null }
            })))
            .mount(&server)
            .await;

        let verified = client_for(&server)
            .verify("tx-abc")
            .await
            .expect("verify call itself succeeds");
        assert_eq!(
            verified.status,
            TransactionStatus::Failed("failed".to_string())
        );
        assert!(verified.payment_method.is_none());
    }

    #[tokio::test]
    async fn verify_is_repeatable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/tx-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "status": "success" }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        for _ in 0..2 {
            let verified = client.verify("tx-abc").await.expect("verify succeeds");
            assert_eq!(verified.status, TransactionStatus::Success);
        }
    }

    #[test]
    fn request_serializes_amount_as_string() {
        let body = serde_json::to_value(init_request()).expect("serializable");
        assert_eq!(body["amount"], "200");
        assert_eq!(body["customization"]["title"], "Travel Booking Payment");
        assert_eq!(body["tx_ref"], "tx-11111111-2222-3333-4444-555555555555");
    }
}
