//! Payment intents for license purchases.

use crate::error::{PaymentError, PaymentResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Metadata key carrying the purchased license count.
pub const LICENSE_COUNT_KEY: &str = "licenseCount";

/// Price of a single license in USD cents.
pub const LICENSE_PRICE_CENTS: i64 = 1000;

/// Smallest purchasable license count.
pub const LICENSE_COUNT_MIN: i64 = 1;

/// Largest purchasable license count.
pub const LICENSE_COUNT_MAX: i64 = 10;

/// Currency used for all intents.
pub const CURRENCY_USD: &str = "usd";

/// Number of licenses in one purchase, within
/// [`LICENSE_COUNT_MIN`]..=[`LICENSE_COUNT_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseCount(u32);

impl LicenseCount {
    /// Validates a requested license count.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidLicenseCount`] if `n` is out of range.
    pub fn new(n: i64) -> PaymentResult<Self> {
        if !(LICENSE_COUNT_MIN..=LICENSE_COUNT_MAX).contains(&n) {
            return Err(PaymentError::InvalidLicenseCount(n));
        }
        u32::try_from(n)
            .map(Self)
            .map_err(|_| PaymentError::InvalidLicenseCount(n))
    }

    /// Returns the count.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Parameters sent to the provider when creating or updating an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentParams {
    /// Amount in the smallest currency unit.
    pub amount: i64,
    pub currency: &'static str,
    pub automatic_payment_methods: bool,
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntentParams {
    /// Builds the intent for `count` licenses at `unit_price` cents each.
    #[must_use]
    pub fn for_count(count: LicenseCount, unit_price: i64) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(LICENSE_COUNT_KEY.to_string(), count.get().to_string());
        Self {
            amount: i64::from(count.get()) * unit_price,
            currency: CURRENCY_USD,
            automatic_payment_methods: true,
            metadata,
        }
    }
}

/// A payment intent as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A payment provider able to create and update payment intents.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a new payment intent.
    async fn create_intent(&self, params: &PaymentIntentParams) -> PaymentResult<PaymentIntent>;

    /// Replaces the parameters of an existing payment intent.
    async fn update_intent(&self, id: &str, params: &PaymentIntentParams) -> PaymentResult<PaymentIntent>;
}

/// Client request to start or change a purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    pub license_count: i64,
}

/// Reply to a [`PaymentIntentRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Payment intent ids are provider-issued tokens such as `pi_3MtwBw...`.
fn validate_intent_id(id: &str) -> PaymentResult<&str> {
    if id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(id)
    } else {
        Err(PaymentError::InvalidPaymentIntentId)
    }
}

/// Creates a payment intent for the requested licenses, or updates the
/// client's existing intent if it sent one.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidLicenseCount`] before contacting the
/// provider if the count is out of range.
pub async fn create_or_update_intent(
    provider: &dyn PaymentProvider,
    request: &PaymentIntentRequest,
    unit_price: i64,
) -> PaymentResult<PaymentIntent> {
    let count = LicenseCount::new(request.license_count)?;
    let params = PaymentIntentParams::for_count(count, unit_price);

    match request.payment_intent_id.as_deref() {
        None | Some("") => {
            let intent = provider.create_intent(&params).await?;
            info!(intent = %intent.id, count = count.get(), "created payment intent");
            Ok(intent)
        }
        Some(id) => {
            let id = validate_intent_id(id)?;
            let intent = provider.update_intent(id, &params).await?;
            info!(intent = %intent.id, count = count.get(), "updated payment intent");
            Ok(intent)
        }
    }
}
