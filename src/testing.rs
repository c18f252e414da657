//! Test support: a scripted in-memory transport and context builders.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::api::{ApiRequest, Transport};
use crate::config::AppConfig;
use crate::context::AdminContext;
use crate::db;
use crate::error::ApiError;
use crate::models::{Session, User};
use crate::storage;

pub const TEST_TOKEN: &str = "test-token";

type Route = (Method, String);

/// Transport that answers from a script and records every request.
///
/// Each route holds a queue of responses. Responses are consumed in order;
/// the last one is sticky. Unscripted routes fail with a network error.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<Route, VecDeque<Result<Value, ApiError>>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response for `method path`.
    pub fn respond(&self, method: Method, path: &str, response: Result<Value, ApiError>) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, method: &Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }

    /// Number of requests sent with `method`, any path.
    pub fn calls_with_method(&self, method: &Method) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method)
            .count()
    }

    pub fn last_body(&self, method: &Method, path: &str) -> Option<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| &r.method == method && r.path == path)
            .and_then(|r| r.body.clone())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let key = (request.method.clone(), request.path.clone());
        self.requests.lock().unwrap().push(request);
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(ApiError::Network(format!("no scripted response for {} {}", key.0, key.1))),
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        api_base: "http://localhost:8000/api".into(),
        data_dir: std::env::temp_dir().join("menu-admin-test"),
        request_timeout: Duration::from_secs(5),
        refresh_interval: Duration::from_millis(20),
        redirect_delay: Duration::from_millis(1500),
        recent_orders_limit: 15,
    }
}

/// Context with an in-memory store and no stored session.
pub fn anonymous_context() -> (AdminContext, Arc<FakeTransport>) {
    let fake = Arc::new(FakeTransport::new());
    let db = Arc::new(db::open_in_memory().unwrap());
    let ctx = AdminContext::new(test_config(), db, fake.clone());
    (ctx, fake)
}

/// Context with a stored session for an owner named "Marta".
pub fn test_context() -> (AdminContext, Arc<FakeTransport>) {
    let (ctx, fake) = anonymous_context();
    storage::save_session(
        &ctx.db,
        &Session {
            token: TEST_TOKEN.into(),
            user: Some(User {
                id: Some(1),
                name: Some("Marta".into()),
                role: Some("owner".into()),
            }),
        },
    )
    .unwrap();
    (ctx, fake)
}
