use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use robot_core::{HeaderMap, Operation};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Timeout,
    RedirectLimitExceeded,
    /// The server answered with a non-2xx status.
    HttpStatus(u16),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::HttpStatus(status) => write!(f, "HTTP status {status}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure for a response that arrived with a non-success status.
    pub fn from_status(status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown status");
        Self::new(
            FailureKind::HttpStatus(status),
            format!("Server replied: {status} {reason}"),
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus(status) => Some(status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub operation: Operation,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Redirects followed before this response arrived.
    pub redirect_count: usize,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Download progress reported while a response body streams in.
pub trait TransferProgress: Send + Sync {
    fn total(&self, bytes: u64);

    /// Cumulative byte count received so far.
    fn received(&self, bytes: u64);
}

pub struct NoProgress;

impl TransferProgress for NoProgress {
    fn total(&self, _bytes: u64) {}

    fn received(&self, _bytes: u64) {}
}

/// HTTP client seam. Non-2xx answers are responses, not failures.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: TransportRequest,
        progress: &dyn TransferProgress,
    ) -> Result<TransportResponse, TransportFailure>;
}

/// Produces the transport a request job uses when none was assigned.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Arc<dyn Transport>;
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub redirect_limit: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            redirect_limit: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    settings: TransportSettings,
}

impl ReqwestTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    fn build_client(
        &self,
        redirect_counter: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, TransportFailure> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| TransportFailure::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
        progress: &dyn TransferProgress,
    ) -> Result<TransportResponse, TransportFailure> {
        let method = match request.operation {
            Operation::Head => reqwest::Method::HEAD,
            Operation::Get => reqwest::Method::GET,
            Operation::Post => reqwest::Method::POST,
            Operation::Put => reqwest::Method::PUT,
            Operation::Delete => reqwest::Method::DELETE,
        };

        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;
        let mut builder = client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        if let Some(content_len) = response.content_length() {
            progress.total(content_len);
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            body.extend_from_slice(&chunk);
            progress.received(body.len() as u64);
        }

        Ok(TransportResponse {
            status,
            headers,
            body: Bytes::from(body),
            redirect_count: redirect_counter.load(Ordering::Relaxed),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        return TransportFailure::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return TransportFailure::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    TransportFailure::new(FailureKind::Network, err.to_string())
}
