//! Minting license codes after a confirmed purchase.

use crate::error::{PaymentError, PaymentResult};
use crate::intent::LicenseCount;
use debase_license::{DBLicense, DBLicenses, Email, LicenseCode, UserId};
use debase_store::LicenseStore;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Attempts at allocating a batch of codes that are all unused.
const MAX_MINT_ATTEMPTS: usize = 3;

/// Generates `count` distinct license codes.
///
/// # Errors
///
/// Returns [`PaymentError::License`] if the secure random source fails.
pub fn mint_licenses(count: LicenseCount) -> PaymentResult<Vec<LicenseCode>> {
    mint_licenses_with(count, &mut OsRng)
}

/// Generates `count` distinct license codes from `rng`.
///
/// A code already drawn in this batch is discarded and drawn again.
pub fn mint_licenses_with<R>(count: LicenseCount, rng: &mut R) -> PaymentResult<Vec<LicenseCode>>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let wanted = count.get() as usize;
    let mut seen = BTreeSet::new();
    let mut codes = Vec::with_capacity(wanted);
    while codes.len() < wanted {
        let code = LicenseCode::generate_with(rng)?;
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }
    Ok(codes)
}

/// Mints `count` new licenses and records them under `email`'s user id.
///
/// The whole batch is written in one store transaction. If any generated
/// code is already owned by the user the batch is discarded and a fresh one
/// generated.
///
/// # Errors
///
/// Returns [`PaymentError::CodeCollision`] if no collision-free batch was
/// found, or a storage/generation error.
pub fn grant_licenses(
    store: &dyn LicenseStore,
    domain: &str,
    email: &Email,
    count: LicenseCount,
) -> PaymentResult<Vec<LicenseCode>> {
    grant_licenses_with(store, domain, email, count, &mut OsRng)
}

/// [`grant_licenses`] drawing codes from `rng`.
pub fn grant_licenses_with<R>(
    store: &dyn LicenseStore,
    domain: &str,
    email: &Email,
    count: LicenseCount,
    rng: &mut R,
) -> PaymentResult<Vec<LicenseCode>>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let user_id = UserId::derive(domain, email);

    for _ in 0..MAX_MINT_ATTEMPTS {
        let candidates = mint_licenses_with(count, rng)?;
        let committed = store.update_or_create(&user_id, &mut |current: Option<DBLicenses>| {
            let mut licenses = current.unwrap_or_else(|| DBLicenses::new(email.clone()));
            if candidates.iter().any(|code| licenses.license(code).is_some()) {
                return Ok(None);
            }
            for code in &candidates {
                licenses.insert_license(code.clone(), DBLicense::new());
            }
            Ok(Some(licenses))
        })?;

        if committed.is_some() {
            info!(user = %user_id, count = count.get(), "granted licenses");
            return Ok(candidates);
        }
        warn!(user = %user_id, "license code collision, regenerating batch");
    }

    Err(PaymentError::CodeCollision)
}
