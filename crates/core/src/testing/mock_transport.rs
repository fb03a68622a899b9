//! Mock HTTP transport for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::connector::ConnectorError;
use crate::resilience::{HttpRequest, HttpResponse, Transport};

/// A recorded request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: HttpRequest,
    /// When the request was sent (tokio clock, so paused tests see virtual time).
    pub at: Instant,
}

#[derive(Clone)]
enum Scripted {
    Response(HttpResponse),
    Failure(String),
}

#[derive(Default)]
struct Route {
    /// One-shot responses, consumed in order.
    queue: VecDeque<Scripted>,
    /// Returned once the queue is drained.
    sticky: Option<Scripted>,
}

/// Mock implementation of the Transport trait.
///
/// Routes are keyed by exact URL. Unrouted URLs answer 404.
///
/// # Example
///
/// ```rust,ignore
/// let transport = Arc::new(MockTransport::new());
/// transport.enqueue("https://site.test/a", HttpResponse::new(429, "")).await;
/// transport.respond("https://site.test/a", HttpResponse::new(200, "<html>")).await;
///
/// // ... exercise a connector ...
///
/// assert_eq!(transport.request_count("https://site.test/a").await, 2);
/// ```
#[derive(Default)]
pub struct MockTransport {
    routes: Arc<RwLock<HashMap<String, Route>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("routes", &"<routes>")
            .field("requests", &"<requests>")
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `response` (after any queued responses).
    pub async fn respond(&self, url: &str, response: HttpResponse) {
        self.routes.write().await.entry(url.to_string()).or_default().sticky =
            Some(Scripted::Response(response));
    }

    /// Shorthand for a 200 response with `body`.
    pub async fn respond_ok(&self, url: &str, body: impl Into<String>) {
        self.respond(url, HttpResponse::new(200, body)).await;
    }

    /// Answer the next request to `url` with `response`.
    pub async fn enqueue(&self, url: &str, response: HttpResponse) {
        self.routes
            .write()
            .await
            .entry(url.to_string())
            .or_default()
            .queue
            .push_back(Scripted::Response(response));
    }

    /// Fail every request to `url` at the network level.
    pub async fn fail(&self, url: &str, message: impl Into<String>) {
        self.routes.write().await.entry(url.to_string()).or_default().sticky =
            Some(Scripted::Failure(message.into()));
    }

    /// All requests in send order.
    pub async fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .read()
            .await
            .iter()
            .map(|r| r.request.clone())
            .collect()
    }

    pub async fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Number of requests sent to exactly `url`.
    pub async fn request_count(&self, url: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.request.url == url)
            .count()
    }

    pub async fn total_requests(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn clear_requests(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ConnectorError> {
        self.requests.write().await.push(RecordedRequest {
            request: request.clone(),
            at: Instant::now(),
        });

        let scripted = {
            let mut routes = self.routes.write().await;
            routes.get_mut(&request.url).and_then(|route| {
                route.queue.pop_front().or_else(|| route.sticky.clone())
            })
        };

        match scripted {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(ConnectorError::Transport(message)),
            None => Ok(HttpResponse::new(404, "not found")),
        }
    }
}
