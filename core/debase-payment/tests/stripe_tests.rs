#![cfg(feature = "stripe")]

use axum::{extract::Path, http::HeaderMap, routing::post, Form, Json, Router};
use debase_payment::{
    LicenseCount, PaymentError, PaymentIntentParams, PaymentProvider, StripeProvider,
    LICENSE_PRICE_CENTS,
};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn create_handler(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "id": "pi_created",
        "client_secret": headers.get("authorization").and_then(|v| v.to_str().ok()),
        "metadata": { "licenseCount": form.get("metadata[licenseCount]") },
    }))
}

async fn update_handler(Path(id): Path<String>, Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "id": id,
        "client_secret": format!("{}_secret", form["amount"]),
    }))
}

/// Spin up a fake payment API on an OS-assigned port, returning the base URL.
async fn spawn_fake_api() -> String {
    let app = Router::new()
        .route("/payment_intents", post(create_handler))
        .route("/payment_intents/{id}", post(update_handler))
        .route(
            "/fail/payment_intents",
            post(|| async { (axum::http::StatusCode::PAYMENT_REQUIRED, "card declined") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

fn params(count: i64) -> PaymentIntentParams {
    PaymentIntentParams::for_count(LicenseCount::new(count).unwrap(), LICENSE_PRICE_CENTS)
}

#[tokio::test]
async fn create_sends_form_and_auth() {
    let base = spawn_fake_api().await;
    let provider = StripeProvider::with_base_url("sk_test_123", base);
    let intent = provider.create_intent(&params(2)).await.unwrap();

    assert_eq!(intent.id, "pi_created");
    assert!(intent.client_secret.starts_with("Basic "));
    assert_eq!(intent.metadata.get("licenseCount").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn update_posts_to_intent_path() {
    let base = spawn_fake_api().await;
    let provider = StripeProvider::with_base_url("sk_test_123", format!("{base}/"));
    let intent = provider.update_intent("pi_abc", &params(5)).await.unwrap();

    assert_eq!(intent.id, "pi_abc");
    assert_eq!(intent.client_secret, "5000_secret");
}

#[tokio::test]
async fn provider_failure_is_reported() {
    let base = spawn_fake_api().await;
    let provider = StripeProvider::with_base_url("sk_test_123", format!("{base}/fail"));
    let err = provider.create_intent(&params(1)).await.unwrap_err();

    match err {
        PaymentError::Provider(msg) => assert!(msg.contains("card declined")),
        other => panic!("unexpected error: {other}"),
    }
}
