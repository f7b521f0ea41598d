//! MercadoPago-style checkout API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{CheckoutSession, PaymentDetails, PaymentIntentContext, PaymentProvider, PaymentStatus};
use crate::config::PaymentConfig;
use crate::error::{RefugioError, RefugioResult};

#[derive(Clone, Debug)]
pub struct HttpPaymentProvider {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl HttpPaymentProvider {
    pub fn new(config: &PaymentConfig) -> RefugioResult<Self> {
        if config.access_token.trim().is_empty() {
            return Err(RefugioError::Config("payment.access_token must be set".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefugioError::Payment(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpPaymentProvider {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> RefugioResult<T> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| RefugioError::Payment(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Payment provider request failed");
            return Err(RefugioError::Payment(format!("HTTP {}", status.as_u16())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RefugioError::Payment(format!("Unexpected response: {}", e)))
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn create_checkout(&self, intent: &PaymentIntentContext) -> RefugioResult<CheckoutSession> {
        let nights = intent.quote.nights;
        let body = PreferenceRequest {
            items: vec![PreferenceItem {
                id: &intent.unit_id,
                title: format!(
                    "{} - {} {}",
                    intent.unit_name,
                    nights,
                    if nights == 1 { "noche" } else { "noches" }
                ),
                quantity: 1,
                unit_price: intent.quote.total,
                currency_id: &intent.currency,
            }],
            payer: Payer {
                name: &intent.guest.name,
                email: intent.guest.email.as_deref(),
            },
            back_urls: BackUrls {
                success: &self.config.success_url,
                failure: &self.config.failure_url,
                pending: &self.config.pending_url,
            },
            auto_return: "approved",
            notification_url: &self.config.notification_url,
            external_reference: &intent.reference,
            metadata: intent.metadata.to_map(),
        };

        let response: PreferenceResponse = self
            .send(self.client.post(self.url("checkout/preferences")).json(&body))
            .await?;

        debug!(preference = %response.id, unit = %intent.unit_id, "Checkout preference created");

        Ok(CheckoutSession {
            preference_id: response.id,
            redirect_url: response.init_point,
        })
    }

    async fn get_payment(&self, payment_id: &str) -> RefugioResult<PaymentDetails> {
        let payment: PaymentResponse = self
            .send(self.client.get(self.url(&format!("v1/payments/{}", payment_id))))
            .await?;

        Ok(PaymentDetails {
            id: value_to_string(&payment.id),
            status: PaymentStatus::from_provider(&payment.status),
            raw_status: payment.status,
            amount: payment.transaction_amount,
            metadata: payment.metadata,
            approved_at: payment
                .date_approved
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc)),
        })
    }
}

/// Payment ids arrive as JSON numbers; everything downstream keys on strings.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct PreferenceRequest<'a> {
    items: Vec<PreferenceItem<'a>>,
    payer: Payer<'a>,
    back_urls: BackUrls<'a>,
    auto_return: &'a str,
    notification_url: &'a str,
    external_reference: &'a str,
    metadata: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    id: &'a str,
    title: String,
    quantity: u32,
    unit_price: u64,
    currency_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Payer<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct BackUrls<'a> {
    success: &'a str,
    failure: &'a str,
    pending: &'a str,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: Value,
    status: String,
    #[serde(default)]
    transaction_amount: f64,
    #[serde(default)]
    metadata: Map<String, Value>,
    #[serde(default)]
    date_approved: Option<String>,
}
