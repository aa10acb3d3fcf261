#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value as JsonValue;

/// One canned response. A queue's final entry is served repeatedly, so
/// polling tests can keep hitting the same route.
#[derive(Clone)]
pub struct MockResponse {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockResponse {
    pub fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Raw body, for responses that must not parse as JSON.
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    hits: Arc<AtomicUsize>,
}

async fn handler(State(state): State<MockState>, uri: Uri) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned());

    let response = {
        let mut routes = state
            .routes
            .lock()
            .expect("route mutex must not be poisoned");
        routes.get_mut(&key).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    let Some(response) = response else {
        return (StatusCode::NOT_FOUND, "no mock response registered").into_response();
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (
        response.status,
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
        .into_response()
}

pub struct TestServer {
    pub base_url: String,
    state: MockState,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    pub async fn spawn() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(handler).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("must bind test listener");
        let address = listener.local_addr().expect("must have local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock server must run");
        });

        Self {
            base_url: format!("http://{address}"),
            state,
            task,
        }
    }

    /// Registers canned responses for a path (including any query string).
    pub fn mount(&self, path_and_query: &str, responses: Vec<MockResponse>) {
        self.state
            .routes
            .lock()
            .expect("route mutex must not be poisoned")
            .insert(path_and_query.to_owned(), responses.into());
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.base_url)
    }

    /// Total requests served, across all routes.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

/// Polls a condition every 10 ms for up to two seconds.
pub async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
