//! HTTP seam shared by every connector.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::pacer::Pacer;
use super::retry::RetryPolicy;
use crate::connector::ConnectorError;
use crate::context::CallContext;

/// What a request expects back; selects the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
    Xml,
}

impl ContentKind {
    pub fn accept(&self) -> &'static str {
        match self {
            Self::Html => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
            }
            Self::Json => "application/json, text/plain, */*",
            Self::Xml => "application/xml,text/xml;q=0.9,*/*;q=0.8",
        }
    }
}

/// Outbound GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Fully-read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Raw HTTP transport. Implementations perform exactly one request and
/// return whatever status came back.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ConnectorError>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ConnectorError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ConnectorError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ConnectorError::Transport(format!("Timed out fetching {}", request.url))
            } else {
                ConnectorError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::Transport(format!("Failed to read body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Settings applied to every request of one fetcher.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub accept_language: String,
    pub min_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            min_interval: Duration::from_millis(750),
            retry: RetryPolicy::default(),
        }
    }
}

/// Paced, retrying GET client for one connector.
pub struct HttpFetcher {
    connector: String,
    transport: Arc<dyn Transport>,
    pacer: Pacer,
    retry: RetryPolicy,
    user_agent: String,
    accept_language: String,
    referer: Option<String>,
}

impl HttpFetcher {
    pub fn new(
        connector: impl Into<String>,
        transport: Arc<dyn Transport>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            connector: connector.into(),
            transport,
            pacer: Pacer::new(settings.min_interval),
            retry: settings.retry,
            user_agent: settings.user_agent,
            accept_language: settings.accept_language,
            referer: None,
        }
    }

    /// Send `Referer` on every request.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    fn build_request(&self, url: &str, kind: ContentKind) -> HttpRequest {
        let mut headers = vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Accept".to_string(), kind.accept().to_string()),
            ("Accept-Language".to_string(), self.accept_language.clone()),
        ];
        if let Some(referer) = &self.referer {
            headers.push(("Referer".to_string(), referer.clone()));
        }
        HttpRequest {
            url: url.to_string(),
            headers,
        }
    }

    /// GET `url`, returning the 2xx response.
    ///
    /// 429 responses are retried up to `max_retries` times; any other
    /// non-2xx status fails immediately.
    pub async fn fetch(
        &self,
        ctx: &CallContext,
        url: &str,
        kind: ContentKind,
    ) -> Result<HttpResponse, ConnectorError> {
        let request = self.build_request(url, kind);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            self.pacer.acquire(ctx).await?;

            debug!(connector = %self.connector, url = %url, attempt = attempts, "Fetching");
            let outcome = ctx.run(self.transport.get(&request)).await;
            self.pacer.complete().await;
            let response = outcome??;

            if response.status == 429 {
                if attempts > self.retry.max_retries {
                    warn!(
                        connector = %self.connector,
                        url = %url,
                        attempts,
                        "Rate limit retries exhausted"
                    );
                    return Err(ConnectorError::RateLimited {
                        url: url.to_string(),
                        attempts,
                    });
                }

                let delay = self.retry.delay_for(
                    attempts - 1,
                    response.header("retry-after"),
                    Utc::now(),
                );
                self.pacer.penalize(self.retry.penalty(delay)).await;
                warn!(
                    connector = %self.connector,
                    url = %url,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                ctx.sleep(delay).await?;
                continue;
            }

            if !response.is_success() {
                debug!(connector = %self.connector, url = %url, status = response.status, "Upstream error");
                return Err(ConnectorError::UpstreamStatus {
                    status: response.status,
                    url: url.to_string(),
                });
            }

            return Ok(response);
        }
    }

    pub async fn fetch_text(
        &self,
        ctx: &CallContext,
        url: &str,
        kind: ContentKind,
    ) -> Result<String, ConnectorError> {
        Ok(self.fetch(ctx, url, kind).await?.body)
    }

    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        url: &str,
    ) -> Result<T, ConnectorError> {
        let body = self.fetch_text(ctx, url, ContentKind::Json).await?;
        serde_json::from_str(&body)
            .map_err(|e| ConnectorError::Decode(format!("Invalid JSON from {}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use tokio::time::Instant;

    fn settings(min_interval_ms: u64) -> FetchSettings {
        FetchSettings {
            min_interval: Duration::from_millis(min_interval_ms),
            ..FetchSettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_browser_headers() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("https://site.test/page", HttpResponse::new(200, "<html></html>")).await;
        let fetcher = HttpFetcher::new("site", transport.clone(), settings(0))
            .with_referer("https://site.test/");

        let ctx = CallContext::background();
        fetcher
            .fetch_text(&ctx, "https://site.test/page", ContentKind::Html)
            .await
            .unwrap();

        let requests = transport.requests().await;
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert!(req.header("user-agent").unwrap().contains("Mozilla"));
        assert!(req.header("accept").unwrap().starts_with("text/html"));
        assert_eq!(req.header("accept-language"), Some("en-US,en;q=0.9"));
        assert_eq!(req.header("referer"), Some("https://site.test/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_429_error_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("https://site.test/x", HttpResponse::new(503, "down")).await;
        let fetcher = HttpFetcher::new("site", transport.clone(), settings(0));

        let err = fetcher
            .fetch(&CallContext::background(), "https://site.test/x", ContentKind::Html)
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::UpstreamStatus { status: 503, .. }));
        assert_eq!(transport.request_count("https://site.test/x").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_then_success() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue("https://site.test/x", HttpResponse::new(429, "")).await;
        transport.enqueue("https://site.test/x", HttpResponse::new(200, "ok")).await;
        let fetcher = HttpFetcher::new("site", transport.clone(), settings(0));

        let start = Instant::now();
        let body = fetcher
            .fetch_text(&CallContext::background(), "https://site.test/x", ContentKind::Html)
            .await
            .unwrap();

        assert_eq!(body, "ok");
        assert_eq!(transport.request_count("https://site.test/x").await, 2);
        // The pacing penalty floor outlasts the first backoff step.
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_exhausts_retries() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("https://site.test/x", HttpResponse::new(429, "")).await;
        let fetcher = HttpFetcher::new("site", transport.clone(), settings(0));

        let err = fetcher
            .fetch(&CallContext::background(), "https://site.test/x", ContentKind::Html)
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::RateLimited { attempts: 4, .. }));
        assert_eq!(transport.request_count("https://site.test/x").await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_capped() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue(
            "https://site.test/x",
            HttpResponse::new(429, "").with_header("Retry-After", "3600"),
        ).await;
        transport.enqueue("https://site.test/x", HttpResponse::new(200, "ok")).await;
        let fetcher = HttpFetcher::new("site", transport.clone(), settings(0));

        let start = Instant::now();
        fetcher
            .fetch(&CallContext::background(), "https://site.test/x", ContentKind::Html)
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_honours_deadline() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("https://site.test/x", HttpResponse::new(429, "")).await;
        let fetcher = HttpFetcher::new("site", transport.clone(), settings(0));

        let ctx = CallContext::background().with_timeout(Duration::from_millis(500));
        let err = fetcher
            .fetch(&ctx, "https://site.test/x", ContentKind::Html)
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::DeadlineExceeded));
        assert_eq!(transport.request_count("https://site.test/x").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_is_decode_error() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("https://api.test/x", HttpResponse::new(200, "<html>")).await;
        let fetcher = HttpFetcher::new("api", transport, settings(0));

        let err = fetcher
            .fetch_json::<serde_json::Value>(&CallContext::background(), "https://api.test/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Decode(_)));
    }
}
