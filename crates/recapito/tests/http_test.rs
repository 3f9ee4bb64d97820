#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Router-level tests driving the real routes without a live database.
//!
//! The pool is created lazily, so handlers that never touch the
//! database (form rendering, validation failures) run against the real
//! router; the health check observes the unreachable database instead.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::cookie::SameSite;

use recapito::form::{
    FieldDefinition, HONEYPOT_FIELD, Mailer, MessageStore, SubmissionResults, TIMESTAMP_FIELD,
    encode_timestamp,
};
use recapito::{AppState, FormSettings, routes};

struct RecordingStore {
    stored: Mutex<Vec<SubmissionResults>>,
}

#[async_trait]
impl MessageStore for RecordingStore {
    async fn store(&self, data: &SubmissionResults) -> Result<()> {
        self.stored.lock().unwrap().push(data.clone());
        Ok(())
    }
}

struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send_autoreply(&self, _data: &SubmissionResults) -> Result<()> {
        Ok(())
    }

    async fn send_notification(&self, _data: &SubmissionResults) -> Result<()> {
        Ok(())
    }
}

fn test_settings() -> FormSettings {
    let mut settings = FormSettings::empty();
    settings.form_fields = vec![
        FieldDefinition::new("name", "text")
            .label("Name")
            .autofocus()
            .rule("required"),
        FieldDefinition::new("email", "email")
            .label("Email")
            .rule("required")
            .rule("email"),
        FieldDefinition::new("message", "textarea").label("Message"),
    ];
    settings.antispam_delay = Some(5);
    settings
}

fn test_app(settings: FormSettings) -> (Router, Arc<RecordingStore>) {
    // Lazy pool: no connection is opened until a query runs.
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://postgres@127.0.0.1:1/recapito_test")
        .unwrap();

    let store = Arc::new(RecordingStore {
        stored: Mutex::new(Vec::new()),
    });

    let state = AppState::from_parts(
        pool,
        Arc::new(settings),
        tera::Tera::default(),
        Arc::clone(&store) as Arc<dyn MessageStore>,
        Arc::new(NullMailer),
    );

    (routes::app(state, SameSite::Lax), store)
}

fn urlencode(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Minimal percent-encoding for test bodies.
fn percent_encode(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn form_page_renders_fields_and_antispam() {
    let (app, _store) = test_app(test_settings());

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;

    assert!(body.contains("id=\"scf-form\""));
    assert!(body.contains("name=\"name\""));
    assert!(body.contains("name=\"email\""));
    assert!(body.contains(&format!("name=\"{TIMESTAMP_FIELD}\"")));
    assert!(body.contains(&format!("name=\"{HONEYPOT_FIELD}\"")));
    assert!(body.contains("<button type=\"submit\""));
    // Clean render: the configured field keeps its autofocus.
    assert!(body.contains("autofocus"));
}

#[tokio::test]
async fn invalid_submission_rerenders_with_errors() {
    let (app, store) = test_app(test_settings());

    let now = chrono::Utc::now().timestamp();
    let token = encode_timestamp(now - 100);
    let body = urlencode(&[
        ("name", ""),
        ("email", "not-an-email"),
        ("message", "hi"),
        (HONEYPOT_FIELD, ""),
        (TIMESTAMP_FIELD, token.as_str()),
    ]);

    let response = app
        .oneshot(
            Request::post("/contact")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;

    assert!(page.contains("scf-error"));
    assert!(page.contains("has-error"));
    // Prior input is retained, escaped.
    assert!(page.contains("value=\"not-an-email\""));
    assert!(store.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn valid_submission_redirects_and_stores() {
    let (app, store) = test_app(test_settings());

    let now = chrono::Utc::now().timestamp();
    let token = encode_timestamp(now - 100);
    let body = urlencode(&[
        ("name", "Ada"),
        ("email", "ada@example.com"),
        ("message", "hello there"),
        (HONEYPOT_FIELD, ""),
        (TIMESTAMP_FIELD, token.as_str()),
    ]);

    let response = app
        .oneshot(
            Request::post("/contact")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/"
    );

    let stored = store.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get("name").unwrap().value, "Ada");
}

#[tokio::test]
async fn asynchronous_submission_returns_json_envelope() {
    let mut settings = test_settings();
    settings.form_allow_ajax = true;
    let (app, _store) = test_app(settings);

    let now = chrono::Utc::now().timestamp();
    let token = encode_timestamp(now - 100);
    let body = urlencode(&[
        ("name", "Ada"),
        ("email", "ada@example.com"),
        ("message", "hello"),
        (HONEYPOT_FIELD, ""),
        (TIMESTAMP_FIELD, token.as_str()),
    ]);

    let response = app
        .oneshot(
            Request::post("/contact")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("x-requested-with", "XMLHttpRequest")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();

    assert_eq!(json["status"], "ok");
    // The returned fragment is an empty form.
    let form = json["form"].as_str().unwrap();
    assert!(!form.contains("value=\"Ada\""));
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let (app, _store) = test_app(test_settings());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "unhealthy");
}
