// service/payment_gateway.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{config::Config, service::error::ServiceError};

/// Bound on every gateway HTTP call. A hung card-network call must not hang
/// the request that triggered it.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSessionStatus {
    pub payment_status: String,
    pub payment_intent_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefundResult {
    pub refund_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutResult {
    pub payout_id: String,
    pub status: String,
}

/// Client for the card-processing vendor. Card handling, signature secrets
/// and the real money ledger live on the vendor's side; this wraps the
/// four calls the engine needs. Mutating calls carry an Idempotency-Key so
/// a timed-out request can be retried without double-charging.
pub struct PaymentGatewayService {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaymentGatewayService {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .expect("failed to build gateway HTTP client");

        Self {
            client,
            base_url: config.gateway_base_url.clone(),
            secret_key: config.gateway_secret_key.clone(),
        }
    }

    /// Create a hosted checkout session for one line item. The metadata is
    /// echoed back on the session-completed webhook and drives routing
    /// (escrow vs direct) there.
    pub async fn create_checkout_session(
        &self,
        product_name: &str,
        amount_minor: i64,
        currency: &str,
        success_url: &str,
        cancel_url: &str,
        customer_email: &str,
        metadata: &serde_json::Value,
    ) -> Result<CheckoutSession, ServiceError> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("customer_email".to_string(), customer_email.to_string()),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                product_name.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][currency]".to_string(),
                currency.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
        ];
        params.extend(metadata_params(metadata));

        let response_body = self
            .post("/checkout/sessions", &params)
            .await?;

        Ok(CheckoutSession {
            session_id: required_str(&response_body, "id")?,
            url: required_str(&response_body, "url")?,
        })
    }

    /// Re-query a checkout session; the polling reconciliation path uses
    /// this when a webhook never arrived.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionStatus, ServiceError> {
        let url = format!("{}/checkout/sessions/{}", self.base_url, session_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let response_body = read_body(response).await?;

        Ok(CheckoutSessionStatus {
            payment_status: required_str(&response_body, "payment_status")?,
            payment_intent_id: response_body["payment_intent"]
                .as_str()
                .map(|s| s.to_string()),
            metadata: response_body.get("metadata").cloned(),
        })
    }

    /// Refund part or all of a captured payment. The metadata ties the
    /// vendor-side refund back to our payment/offer for traceability.
    pub async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount_minor: i64,
        metadata: &serde_json::Value,
    ) -> Result<RefundResult, ServiceError> {
        let mut params = vec![
            ("payment_intent".to_string(), payment_intent_id.to_string()),
            ("amount".to_string(), amount_minor.to_string()),
        ];
        params.extend(metadata_params(metadata));

        let response_body = self.post("/refunds", &params).await?;

        Ok(RefundResult {
            refund_id: required_str(&response_body, "id")?,
            status: required_str(&response_body, "status")?,
        })
    }

    /// Transfer settled funds to the provider's external account.
    pub async fn create_payout(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &serde_json::Value,
    ) -> Result<PayoutResult, ServiceError> {
        let mut params = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_string()),
        ];
        params.extend(metadata_params(metadata));

        let response_body = self.post("/payouts", &params).await?;

        Ok(PayoutResult {
            payout_id: required_str(&response_body, "id")?,
            status: required_str(&response_body, "status")?,
        })
    }

    async fn post(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(params)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<serde_json::Value, ServiceError> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| ServiceError::Gateway(e.to_string()))?;

    if status.is_success() {
        Ok(body)
    } else {
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("gateway request failed")
            .to_string();
        tracing::warn!("Gateway returned {}: {}", status, message);
        Err(ServiceError::Gateway(message))
    }
}

fn required_str(body: &serde_json::Value, field: &str) -> Result<String, ServiceError> {
    body[field]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ServiceError::Gateway(format!("missing '{}' in gateway response", field)))
}

fn metadata_params(metadata: &serde_json::Value) -> Vec<(String, String)> {
    let Some(object) = metadata.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (format!("metadata[{}]", key), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_flattens_to_bracketed_form_params() {
        let metadata = json!({
            "payment_type": "escrow",
            "offer_id": "8b2d1c9e-3f1a-4a76-9f51-0a4b9d6f3c21",
            "attempt": 2,
        });
        let params = metadata_params(&metadata);
        assert!(params.contains(&(
            "metadata[payment_type]".to_string(),
            "escrow".to_string()
        )));
        assert!(params.contains(&("metadata[attempt]".to_string(), "2".to_string())));
    }

    #[test]
    fn missing_response_field_is_a_gateway_error() {
        let body = json!({"url": "https://pay.example.com/x"});
        let err = required_str(&body, "id").unwrap_err();
        assert!(matches!(err, ServiceError::Gateway(_)));
    }
}
