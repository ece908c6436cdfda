use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::Cookie;
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    app::build_app,
    auth::{
        memory::MemoryUserStore,
        repo::UserStore,
        repo_types::User,
        services::{create_user, UserDraft},
    },
    scores::memory::MemoryScoreStore,
    state::AppState,
};

pub fn memory_stores() -> (Arc<MemoryUserStore>, Arc<MemoryScoreStore>) {
    let users = Arc::new(MemoryUserStore::default());
    let scores = Arc::new(MemoryScoreStore::new(users.clone()));
    (users, scores)
}

/// Full router over in-memory stores. `scores` is kept concrete so tests can
/// seed rows directly.
pub struct TestApp {
    pub state: AppState,
    pub scores: Arc<MemoryScoreStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let (users, scores) = memory_stores();
        let state = AppState::fake_with(users, scores.clone());
        Self {
            router: build_app(state.clone()),
            state,
            scores,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub cookies: Vec<Cookie<'static>>,
    pub body: Value,
}

pub async fn send(app: &TestApp, req: Request<Body>) -> TestResponse {
    let res = app.router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let cookies = res
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| Cookie::parse(v.to_str().unwrap().to_owned()).unwrap())
        .collect();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse {
        status,
        cookies,
        body,
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn cookie_named<'a>(cookies: &'a [Cookie<'static>], name: &str) -> Option<&'a Cookie<'static>> {
    cookies.iter().find(|c| c.name() == name)
}

pub async fn seed_user(users: &dyn UserStore, email: &str, password: &str) -> User {
    create_user(
        users,
        UserDraft {
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
            ..UserDraft::default()
        },
    )
    .await
    .unwrap()
}
