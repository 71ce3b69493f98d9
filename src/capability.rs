//! External collaborators reached by built-in functions.
//!
//! HTTP transport, timing, output and randomness are injected through
//! [`Capabilities`] so evaluation can run against mocks in tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mockall::automock;
use rand::Rng;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::HttpConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("HTTP request failed: {0}")]
    Transport(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[automock]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, CapabilityError>;
}

#[automock]
#[async_trait]
pub trait Clock: Send + Sync {
    /// Waits for `duration` and returns the time actually elapsed.
    async fn sleep(&self, duration: Duration) -> Duration;
}

#[automock]
pub trait Printer: Send + Sync {
    fn print(&self, line: &str);
}

#[automock]
pub trait RandomSource: Send + Sync {
    /// Uniform value in `[0, 1)`
    fn next_f64(&self) -> f64;
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl ReqwestHttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, CapabilityError> {
        debug!("{} {}", request.method, request.url);
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                url: request.url,
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| CapabilityError::InvalidResponse(e.to_string()))?;
        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) -> Duration {
        let start = Instant::now();
        tokio::time::sleep(duration).await;
        start.elapsed()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutPrinter;

impl Printer for StdoutPrinter {
    fn print(&self, line: &str) {
        println!("{}", line);
    }
}

/// Collects printed lines in memory.
#[derive(Debug, Default)]
pub struct BufferPrinter {
    lines: Mutex<Vec<String>>,
}

impl BufferPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl Printer for BufferPrinter {
    fn print(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Capability set handed to an execution context.
#[derive(Clone)]
pub struct Capabilities {
    pub http: Arc<dyn HttpClient>,
    pub clock: Arc<dyn Clock>,
    pub printer: Arc<dyn Printer>,
    pub random: Arc<dyn RandomSource>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            http: Arc::new(ReqwestHttpClient::default()),
            clock: Arc::new(TokioClock),
            printer: Arc::new(StdoutPrinter),
            random: Arc::new(ThreadRandom),
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

impl Capabilities {
    pub fn from_config(config: &HttpConfig) -> Result<Self, CapabilityError> {
        Ok(Self {
            http: Arc::new(ReqwestHttpClient::new(config)?),
            ..Default::default()
        })
    }

    pub fn with_http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_printer(mut self, printer: Arc<dyn Printer>) -> Self {
        self.printer = printer;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_printer_collects_lines() {
        let printer = BufferPrinter::new();
        printer.print("a");
        printer.print("b");
        assert_eq!(printer.lines(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_thread_random_range() {
        let r = ThreadRandom;
        for _ in 0..100 {
            let v = r.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_http_method_display() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }

    #[tokio::test]
    async fn test_tokio_clock_reports_elapsed() {
        let elapsed = TokioClock.sleep(Duration::from_millis(5)).await;
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_mock_http_client() {
        let mut http = MockHttpClient::new();
        http.expect_request()
            .withf(|req| req.method == HttpMethod::Get && req.url == "http://x")
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    body: "ok".into(),
                })
            });
        let resp = http
            .request(HttpRequest::new(HttpMethod::Get, "http://x"))
            .await
            .unwrap();
        assert_eq!(resp.body, "ok");
    }
}
