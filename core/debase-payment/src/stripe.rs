//! Stripe payment intents over the REST API.

use crate::error::{PaymentError, PaymentResult};
use crate::intent::{PaymentIntent, PaymentIntentParams, PaymentProvider};
use async_trait::async_trait;
use tracing::warn;

/// Base URL of the Stripe REST API.
pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Payment provider backed by Stripe.
pub struct StripeProvider {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeProvider {
    /// Creates a provider authenticating with `secret_key`.
    #[must_use]
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, STRIPE_API_BASE)
    }

    /// Creates a provider against a different API base (used in tests).
    #[must_use]
    pub fn with_base_url(secret_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, url: String, params: &PaymentIntentParams) -> PaymentResult<PaymentIntent> {
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form_fields(params))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, %url, "payment provider request failed");
            return Err(PaymentError::Provider(format!("{status}: {body}")));
        }
        Ok(resp.json().await?)
    }
}

/// Flattens intent parameters into Stripe's bracketed form encoding.
fn form_fields(params: &PaymentIntentParams) -> Vec<(String, String)> {
    let mut fields = vec![
        ("amount".to_string(), params.amount.to_string()),
        ("currency".to_string(), params.currency.to_string()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            params.automatic_payment_methods.to_string(),
        ),
    ];
    fields.extend(
        params
            .metadata
            .iter()
            .map(|(k, v)| (format!("metadata[{k}]"), v.clone())),
    );
    fields
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_intent(&self, params: &PaymentIntentParams) -> PaymentResult<PaymentIntent> {
        self.post(format!("{}/payment_intents", self.base_url), params).await
    }

    async fn update_intent(&self, id: &str, params: &PaymentIntentParams) -> PaymentResult<PaymentIntent> {
        self.post(format!("{}/payment_intents/{id}", self.base_url), params).await
    }
}
