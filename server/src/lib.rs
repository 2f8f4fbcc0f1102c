//! HTTP API for the Debase license server.
//!
//! Every endpoint takes a JSON body over POST. Bodies are decoded by hand so
//! that a malformed payload gets the same generic reply as any other
//! internal error.

mod error;

pub use error::{
    ApiError, ErrorReply, INVALID_LICENSE_COUNT_MESSAGE, PERSISTENCE_CONFLICT_MESSAGE,
    UNKNOWN_ERROR_MESSAGE,
};

use axum::{body::Bytes, extract::State, response::Json, routing::post, Router};
use debase_license::{DBLicenses, DBTrial, Email, LicenseCode, MachineId, MachineInfo, UserId};
use debase_payment::{create_or_update_intent, PaymentIntentReply, PaymentIntentRequest, PaymentProvider};
use debase_store::LicenseStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts made at a transactional update before reporting a conflict.
const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Base delay between conflicting update attempts, doubled each retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// Deployment settings shared by all handlers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Namespace mixed into every user id.
    pub domain: String,
    /// Price of one license in USD cents.
    pub license_price_cents: i64,
    /// How long a newly granted trial lasts.
    pub trial_duration: chrono::Duration,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LicenseStore>,
    pub payments: Arc<dyn PaymentProvider>,
    pub config: Arc<ServerConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseActivateRequest {
    pub email: String,
    pub license_code: String,
    pub machine_id: String,
    #[serde(default)]
    pub machine_info: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseActivateReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_count: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrialActivateRequest {
    pub machine_id: String,
    #[serde(default)]
    pub machine_info: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrialActivateReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Unknown(format!("invalid command payload: {e}")))
}

/// Runs blocking store work off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Unknown(format!("blocking task failed: {e}")))?
}

/// Retries `op` with exponential backoff while it reports a persistence
/// conflict.
fn with_conflict_retry<T>(mut op: impl FnMut() -> Result<T, ApiError>) -> Result<T, ApiError> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(ApiError::PersistenceConflict(msg)) if attempt < MAX_UPDATE_ATTEMPTS => {
                warn!(attempt, "update conflicted, retrying: {}", msg);
                std::thread::sleep(RETRY_BACKOFF * 2u32.pow(attempt - 1));
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Binds `machine_id` to the user's license `code`, returning the new issue
/// count.
pub fn activate_license(
    store: &dyn LicenseStore,
    user_id: &UserId,
    code: &LicenseCode,
    machine_id: &MachineId,
    machine_info: &MachineInfo,
) -> Result<i64, ApiError> {
    with_conflict_retry(|| {
        let mut issued = None;
        store.update_or_create(user_id, &mut |current: Option<DBLicenses>| {
            let Some(mut licenses) = current else {
                return Ok(None);
            };
            let Some(license) = licenses.license_mut(code) else {
                return Ok(None);
            };
            issued = Some(license.activate(machine_id.clone(), machine_info.clone()).issue_count);
            Ok(Some(licenses))
        })?;
        issued.ok_or(ApiError::LicenseNotFound)
    })
}

/// Returns the machine's trial, granting one if it never had one.
///
/// Activating an existing trial re-issues it; the expiration never moves.
pub fn activate_trial(
    store: &dyn LicenseStore,
    machine_id: &MachineId,
    machine_info: &MachineInfo,
    duration: chrono::Duration,
) -> Result<DBTrial, ApiError> {
    with_conflict_retry(|| {
        let trial = store.update_or_create_trial(machine_id, &mut |current: Option<DBTrial>| {
            let trial = match current {
                Some(mut trial) => {
                    trial.machine.reissue();
                    trial
                }
                None => DBTrial::grant(machine_info.clone(), duration),
            };
            Ok(Some(trial))
        })?;
        trial.ok_or_else(|| ApiError::Unknown("trial update was not committed".into()))
    })
}

async fn payment_intent_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PaymentIntentReply>, ApiError> {
    let cmd: PaymentIntentRequest = decode(&body)?;
    let intent =
        create_or_update_intent(state.payments.as_ref(), &cmd, state.config.license_price_cents)
            .await?;
    Ok(Json(PaymentIntentReply {
        error: None,
        client_secret: Some(intent.client_secret),
    }))
}

async fn license_activate_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LicenseActivateReply>, ApiError> {
    let cmd: LicenseActivateRequest = decode(&body)?;
    let email = Email::parse(&cmd.email)?;
    let code = LicenseCode::parse(&cmd.license_code)?;
    let machine_id = MachineId::parse(&cmd.machine_id)?;
    let machine_info = MachineInfo::new(&cmd.machine_info);
    let user_id = UserId::derive(&state.config.domain, &email);

    let store = Arc::clone(&state.store);
    let issue_count = run_blocking(move || {
        activate_license(store.as_ref(), &user_id, &code, &machine_id, &machine_info)
    })
    .await?;

    info!(issue_count, "license activated");
    Ok(Json(LicenseActivateReply {
        error: None,
        issue_count: Some(issue_count),
    }))
}

async fn trial_activate_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TrialActivateReply>, ApiError> {
    let cmd: TrialActivateRequest = decode(&body)?;
    let machine_id = MachineId::parse(&cmd.machine_id)?;
    let machine_info = MachineInfo::new(&cmd.machine_info);

    let store = Arc::clone(&state.store);
    let duration = state.config.trial_duration;
    let trial = run_blocking(move || {
        activate_trial(store.as_ref(), &machine_id, &machine_info, duration)
    })
    .await?;

    debug!(expiration = trial.expiration, "trial activated");
    Ok(Json(TrialActivateReply {
        error: None,
        expiration: Some(trial.expiration),
        expired: Some(trial.is_expired()),
    }))
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/payment-intent", post(payment_intent_handler))
        .route("/api/v1/license/activate", post(license_activate_handler))
        .route("/api/v1/trial/activate", post(trial_activate_handler))
        .with_state(state)
}
