//! License purchase workflow for the Debase license server.
//!
//! Buying licenses happens in two steps:
//! 1. [`create_or_update_intent`] validates the requested license count and
//!    creates (or updates) a payment intent with the provider, carrying the
//!    count as metadata.
//! 2. Once the provider confirms payment, [`grant_licenses`] mints that many
//!    license codes and records them under the buyer's user id.

mod error;
mod intent;
mod mint;
#[cfg(feature = "stripe")]
mod stripe;

pub use error::{PaymentError, PaymentResult};
pub use intent::{
    create_or_update_intent, LicenseCount, PaymentIntent, PaymentIntentParams, PaymentIntentReply,
    PaymentIntentRequest, PaymentProvider, CURRENCY_USD, LICENSE_COUNT_KEY, LICENSE_COUNT_MAX,
    LICENSE_COUNT_MIN, LICENSE_PRICE_CENTS,
};
pub use mint::{grant_licenses, grant_licenses_with, mint_licenses, mint_licenses_with};

#[cfg(feature = "stripe")]
pub use stripe::{StripeProvider, STRIPE_API_BASE};
