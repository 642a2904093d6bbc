#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use bytes::Bytes;
use robot_core::{
    Configuration, ExpectedContent, HeaderMap, JobEvent, JobId, Operation, Payload, QueryParams,
    StaticConfiguration, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use robot_engine::{
    Endpoint, EventSink, GlobalRegistry, Job, RequestJob, TransferProgress, Transport,
    TransportFactory, TransportFailure, TransportRequest, TransportResponse,
};
use tokio::sync::Notify;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(robot_logging::initialize_for_tests);
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&JobEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    /// The last `n` events, oldest first.
    pub fn tail(&self, n: usize) -> Vec<JobEvent> {
        let events = self.events();
        events[events.len().saturating_sub(n)..].to_vec()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, _job_id: JobId, event: &JobEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Transport double that records requests and answers with a canned reply.
pub struct SpyTransport {
    requests: Mutex<Vec<TransportRequest>>,
    reply: Result<TransportResponse, TransportFailure>,
    delay: Option<Duration>,
    pub entered: Notify,
}

impl SpyTransport {
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reply: Ok(TransportResponse {
                status,
                headers: HeaderMap::new(),
                body: Bytes::copy_from_slice(body.as_bytes()),
                redirect_count: 0,
            }),
            delay: None,
            entered: Notify::new(),
        }
    }

    pub fn failing(failure: TransportFailure) -> Self {
        Self {
            reply: Err(failure),
            ..Self::replying(200, "")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for SpyTransport {
    async fn send(
        &self,
        request: TransportRequest,
        progress: &dyn TransferProgress,
    ) -> Result<TransportResponse, TransportFailure> {
        self.requests.lock().unwrap().push(request);
        self.entered.notify_one();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.reply.clone()?;
        progress.total(response.body.len() as u64);
        progress.received(response.body.len() as u64);
        Ok(response)
    }
}

pub struct SpyFactory {
    pub transport: Arc<SpyTransport>,
    created: AtomicUsize,
}

impl SpyFactory {
    pub fn new(transport: Arc<SpyTransport>) -> Self {
        Self {
            transport,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl TransportFactory for SpyFactory {
    fn create(&self) -> Arc<dyn Transport> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.transport.clone()
    }
}

/// Endpoint whose every hook is a plain field.
#[derive(Debug, Clone)]
pub struct TestEndpoint {
    pub operation: Operation,
    pub expected: ExpectedContent,
    pub requires_auth: bool,
    pub path: String,
    pub query: QueryParams,
    pub headers: HeaderMap,
    pub payload: Payload,
    pub timeout_secs: u16,
}

impl TestEndpoint {
    pub fn new(operation: Operation, path: &str, expected: ExpectedContent) -> Self {
        Self {
            operation,
            expected,
            requires_auth: true,
            path: path.to_string(),
            query: QueryParams::new(),
            headers: HeaderMap::new(),
            payload: Payload::default(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Endpoint for TestEndpoint {
    fn operation(&self) -> Operation {
        self.operation
    }

    fn expected_content(&self) -> ExpectedContent {
        self.expected
    }

    fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    fn request_timeout_secs(&self) -> u16 {
        self.timeout_secs
    }

    fn build_url_path(&self) -> String {
        self.path.clone()
    }

    fn build_url_query(&self) -> QueryParams {
        self.query.clone()
    }

    fn build_request_headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn build_payload(&self) -> Payload {
        self.payload.clone()
    }
}

pub fn credentials() -> Arc<dyn Configuration> {
    Arc::new(StaticConfiguration::new("robot", "secret").with_user_agent("Tests/1.0"))
}

/// A job on a private registry with credentials, the given transport and a
/// recording observer attached.
pub fn request_job(
    endpoint: impl Endpoint + 'static,
    transport: Arc<SpyTransport>,
) -> (RequestJob, Arc<RecordingSink>) {
    let job = RequestJob::with_registry(endpoint, Arc::new(GlobalRegistry::new()));
    job.set_configuration(Some(credentials()));
    job.set_transport(transport);
    let sink = RecordingSink::new();
    job.base().attach(sink.clone());
    (job, sink)
}
