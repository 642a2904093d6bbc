use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

use crate::{Configuration, ErrorCode, JobError};

/// Scheme and host every request is sent to.
pub const API_BASE_URL: &str = "https://robot-ws.your-server.de";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u16 = 300;

pub const AUTHORIZATION: &str = "Authorization";

pub type HeaderMap = BTreeMap<String, String>;

pub type QueryParams = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Head,
    Get,
    Post,
    Put,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Head => "HEAD",
            Operation::Get => "GET",
            Operation::Post => "POST",
            Operation::Put => "PUT",
            Operation::Delete => "DELETE",
        }
    }

    /// Only POST and PUT send the payload.
    pub fn carries_body(self) -> bool {
        matches!(self, Operation::Post | Operation::Put)
    }
}

/// Response shape a job declares before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedContent {
    Empty,
    JsonObject,
    JsonArray,
}

impl ExpectedContent {
    pub fn is_json(self) -> bool {
        matches!(self, ExpectedContent::JsonObject | ExpectedContent::JsonArray)
    }

    pub fn accept_header(self) -> Option<&'static str> {
        self.is_json().then_some("application/json")
    }
}

/// Request body plus its content type. Both may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl Payload {
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(value.to_string(), "application/json")
    }

    /// `application/x-www-form-urlencoded` body, the encoding the Robot API
    /// expects for POST and PUT parameters.
    pub fn form(pairs: &[(String, String)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        Self::new(body, "application/x-www-form-urlencoded")
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Everything needed to issue one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub operation: Operation,
    pub url_path: String,
    pub query: QueryParams,
    pub headers: HeaderMap,
    pub payload: Payload,
    pub requires_auth: bool,
    pub expected_content: ExpectedContent,
    /// `0` disables the timeout.
    pub request_timeout_secs: u16,
}

impl RequestDescriptor {
    pub fn new(operation: Operation, expected_content: ExpectedContent) -> Self {
        Self {
            operation,
            url_path: String::new(),
            query: QueryParams::new(),
            headers: HeaderMap::new(),
            payload: Payload::default(),
            requires_auth: true,
            expected_content,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn url(&self) -> Result<Url, JobError> {
        build_url(API_BASE_URL, &self.url_path, &self.query)
    }
}

/// Joins base, path and query into the request URL.
///
/// A non-empty path must be absolute. The error detail is the offending URL
/// string.
pub fn build_url(base: &str, path: &str, query: &[(String, String)]) -> Result<Url, JobError> {
    let mut raw = base.trim_end_matches('/').to_string();
    raw.push_str(path);
    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter())
            .finish();
        raw.push('?');
        raw.push_str(&encoded);
    }

    if !path.is_empty() && !path.starts_with('/') {
        return Err(JobError::with_text(ErrorCode::InvalidRequestUrl, raw));
    }
    match Url::parse(&raw) {
        Ok(url) => Ok(url),
        Err(_) => Err(JobError::with_text(ErrorCode::InvalidRequestUrl, raw)),
    }
}

/// Inserts a header, replacing any existing one with the same name in any
/// letter case.
pub fn set_header(headers: &mut HeaderMap, name: &str, value: impl Into<String>) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.into());
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Final header set for a request: user agent, accept, endpoint headers,
/// content type and credentials, later entries overriding earlier ones.
pub fn assemble_headers(descriptor: &RequestDescriptor, config: &dyn Configuration) -> HeaderMap {
    let mut headers = HeaderMap::new();
    set_header(&mut headers, "User-Agent", config.user_agent());

    if let Some(accept) = descriptor.expected_content.accept_header() {
        set_header(&mut headers, "Accept", accept);
    }

    for (name, value) in &descriptor.headers {
        set_header(&mut headers, name, value.clone());
    }

    if !descriptor.payload.content_type.is_empty() {
        set_header(
            &mut headers,
            "Content-Type",
            descriptor.payload.content_type.clone(),
        );
    }

    if descriptor.requires_auth {
        set_header(
            &mut headers,
            AUTHORIZATION,
            basic_auth(&config.username(), &config.password()),
        );
    }

    headers
}
