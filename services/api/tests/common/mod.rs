use api_lib::adapters::LogMailer;
use api_lib::config::Config;
use api_lib::web::{create_router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use study_tracker_core::{EmailAddress, FixedClock, InMemoryDatabase};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: Arc<InMemoryDatabase>,
    pub clock: Arc<FixedClock>,
}

/// Create a test app over the in-memory store, with the clock fixed at
/// 2025-03-10 12:00 UTC.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Arc::new(Config::test_default());
    let db = Arc::new(InMemoryDatabase::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
    ));
    let state = Arc::new(AppState::new(
        config,
        db.clone(),
        Arc::new(LogMailer::new()),
        clock.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        clock,
    }
}

impl TestApp {
    /// Signs `email` in through the auth service and returns the cookie to send.
    #[allow(dead_code)]
    pub async fn sign_in(&self, email: &str) -> String {
        let email = EmailAddress::parse(email).unwrap();
        let issued = self.state.auth.request_magic_link(&email).await.unwrap();
        let token = issued.url.split("token=").nth(1).unwrap();
        let session = self.state.auth.verify_magic_link(token).await.unwrap();
        format!("session={}", session.id)
    }

    /// Sends one request and decodes the JSON body, if any.
    #[allow(dead_code)]
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }
}

#[allow(dead_code)]
pub fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn form(method: &str, uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn json(method: &str, uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn empty(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}
