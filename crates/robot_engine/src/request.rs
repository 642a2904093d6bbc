use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use robot_core::{
    assemble_headers, Capabilities, Configuration, ErrorCode, JobError, JobEvent,
    RequestDescriptor, Unit, AUTHORIZATION,
};
use robot_logging::{robot_debug, robot_error, robot_warn};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{
    BaseJob, Endpoint, GlobalRegistry, Job, ReqwestTransport, TransferProgress,
    Transport, TransportFailure, TransportRequest, TransportResponse, TransportSettings,
};

#[derive(Default)]
struct RequestState {
    configuration: Option<Arc<dyn Configuration>>,
    transport: Option<Arc<dyn Transport>>,
    timeout_override: Option<u16>,
    result: Value,
}

struct RequestInner {
    endpoint: Box<dyn Endpoint>,
    registry: Arc<GlobalRegistry>,
    cancel: CancellationToken,
    state: Mutex<RequestState>,
}

/// Job performing one authenticated HTTP request against the Robot API.
///
/// The endpoint decides what is sent and how the reply is judged; the job
/// resolves configuration and transport, applies the timeout, and turns
/// the outcome into `Succeeded` or `Failed` followed by the usual terminal
/// events.
#[derive(Clone)]
pub struct RequestJob {
    base: BaseJob,
    inner: Arc<RequestInner>,
}

impl RequestJob {
    /// A job that falls back to the process-wide registry.
    pub fn new(endpoint: impl Endpoint + 'static) -> Self {
        Self::with_registry(endpoint, GlobalRegistry::global())
    }

    pub fn with_registry(endpoint: impl Endpoint + 'static, registry: Arc<GlobalRegistry>) -> Self {
        let base = BaseJob::new();
        base.set_capabilities(Capabilities::KILLABLE);
        Self {
            base,
            inner: Arc::new(RequestInner {
                endpoint: Box::new(endpoint),
                registry,
                cancel: CancellationToken::new(),
                state: Mutex::new(RequestState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RequestState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn endpoint(&self) -> &dyn Endpoint {
        self.inner.endpoint.as_ref()
    }

    pub fn configuration(&self) -> Option<Arc<dyn Configuration>> {
        self.state().configuration.clone()
    }

    /// Overrides the registry default for this job. Observers get
    /// `ConfigurationChanged` when a different configuration is installed.
    pub fn set_configuration(&self, configuration: Option<Arc<dyn Configuration>>) {
        let changed = {
            let mut state = self.state();
            let changed = !same_configuration(&state.configuration, &configuration);
            state.configuration = configuration;
            changed
        };
        if changed {
            self.base.emit_configuration_changed();
        }
    }

    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        self.state().transport = Some(transport);
    }

    pub fn request_timeout(&self) -> u16 {
        let timeout_override = self.state().timeout_override;
        timeout_override.unwrap_or_else(|| self.inner.endpoint.request_timeout_secs())
    }

    /// `0` disables the timeout.
    pub fn set_request_timeout(&self, seconds: u16) {
        self.state().timeout_override = Some(seconds);
    }

    /// Decoded reply of a successful request; `Null` otherwise.
    pub fn result(&self) -> Value {
        self.state().result.clone()
    }

    /// The request as the endpoint currently describes it.
    pub fn descriptor(&self) -> RequestDescriptor {
        let endpoint = &self.inner.endpoint;
        RequestDescriptor {
            operation: endpoint.operation(),
            url_path: endpoint.build_url_path(),
            query: endpoint.build_url_query(),
            headers: endpoint.build_request_headers(),
            payload: endpoint.build_payload(),
            requires_auth: endpoint.requires_auth(),
            expected_content: endpoint.expected_content(),
            request_timeout_secs: self.request_timeout(),
        }
    }

    fn resolve_configuration(&self) -> Option<Arc<dyn Configuration>> {
        let (configuration, adopted) = {
            let mut state = self.state();
            let adopted = state.configuration.is_none();
            if adopted {
                state.configuration = self.inner.registry.default_configuration();
            }
            (state.configuration.clone(), adopted && state.configuration.is_some())
        };
        if adopted {
            robot_debug!("job {}: using the default configuration", self.base.id());
            self.base.emit_configuration_changed();
        }
        configuration
    }

    fn resolve_transport(&self) -> Arc<dyn Transport> {
        let mut state = self.state();
        if let Some(transport) = &state.transport {
            return transport.clone();
        }
        let transport: Arc<dyn Transport> = match self.inner.registry.transport_factory() {
            Some(factory) => factory.create(),
            None => {
                robot_debug!("job {}: no transport factory, using reqwest", self.base.id());
                Arc::new(ReqwestTransport::new(TransportSettings::default()))
            }
        };
        state.transport = Some(transport.clone());
        transport
    }

    /// Runs the request pipeline to completion. Normally spawned by
    /// [`Job::start`].
    pub async fn send_request(&self) {
        let id = self.base.id();
        if self.inner.cancel.is_cancelled() || !self.base.mark_running() {
            robot_debug!("job {id}: finished before the request was sent");
            return;
        }

        if let Some(description) = self.inner.endpoint.description() {
            self.base.emit_description(description);
        }
        self.base.emit_info_message("Setting up request");

        let Some(config) = self.resolve_configuration() else {
            robot_error!("job {id}: can not send request, no configuration set");
            self.fail(JobError::new(ErrorCode::MissingConfig));
            return;
        };

        let descriptor = self.descriptor();
        if let Err(err) = self.inner.endpoint.check_input(&descriptor, config.as_ref()) {
            robot_error!("job {id}: invalid input: {err}");
            self.fail(err);
            return;
        }

        let url = match descriptor.url() {
            Ok(url) => url,
            Err(err) => {
                robot_error!("job {id}: {err}");
                self.fail(err);
                return;
            }
        };

        let transport = self.resolve_transport();

        let timeout = (descriptor.request_timeout_secs > 0)
            .then(|| Duration::from_secs(u64::from(descriptor.request_timeout_secs)));
        let request = TransportRequest {
            operation: descriptor.operation,
            url,
            headers: assemble_headers(&descriptor, config.as_ref()),
            body: descriptor
                .operation
                .carries_body()
                .then(|| Bytes::from(descriptor.payload.body.clone())),
            timeout,
        };
        if robot_logging::debug_enabled() {
            log_request(id, &request);
        }

        self.base.emit_info_message("Sending request");
        let progress = JobTransferProgress::new(self.base.clone());
        let outcome = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => {
                robot_debug!("job {id}: request aborted");
                return;
            }
            outcome = with_deadline(transport.send(request, &progress), timeout) => outcome,
        };

        match outcome {
            Some(outcome) => self.request_finished(&descriptor, outcome),
            None => self.request_timed_out(&descriptor),
        }
    }

    fn request_timed_out(&self, descriptor: &RequestDescriptor) {
        if self.base.is_finished() {
            return;
        }
        let seconds = descriptor.request_timeout_secs;
        robot_warn!("job {}: no reply within {seconds} seconds", self.base.id());
        self.base.emit_info_message("Checking reply");
        self.fail(JobError::with_text(
            ErrorCode::RequestTimedOut,
            seconds.to_string(),
        ));
    }

    fn request_finished(
        &self,
        descriptor: &RequestDescriptor,
        outcome: Result<TransportResponse, TransportFailure>,
    ) {
        if self.base.is_finished() {
            return;
        }
        self.base.emit_info_message("Checking reply");

        let failure = match outcome {
            Ok(response) if response.is_success() => {
                robot_debug!("job {}: HTTP status {}", self.base.id(), response.status);
                match self.inner.endpoint.check_output(descriptor, &response.body) {
                    Ok(document) => self.succeed(document),
                    Err(err) => {
                        robot_error!("job {}: unusable reply: {err}", self.base.id());
                        self.fail(err);
                    }
                }
                return;
            }
            Ok(response) => TransportFailure::from_status(response.status),
            Err(failure) => failure,
        };

        let mut error = None;
        self.inner.endpoint.extract_error(&failure, &mut error);
        self.fail(
            error.unwrap_or_else(|| JobError::with_text(ErrorCode::NetworkError, failure.message)),
        );
    }

    fn succeed(&self, document: Value) {
        self.state().result = document.clone();
        self.base
            .finish_with(None, Some(JobEvent::Succeeded(document)), true);
    }

    fn fail(&self, error: JobError) {
        let message = self.message_for(&error);
        let notification = JobEvent::Failed {
            code: error.code,
            message,
        };
        self.base.finish_with(Some(error), Some(notification), true);
    }

    fn message_for(&self, error: &JobError) -> String {
        self.inner
            .endpoint
            .error_string(error)
            .unwrap_or_else(|| error.message())
    }
}

impl Job for RequestJob {
    fn base(&self) -> &BaseJob {
        &self.base
    }

    /// Spawns the request on the current tokio runtime.
    ///
    /// Without a runtime the call is logged and ignored; the job stays
    /// `Created`, so [`Job::exec`] can still run it.
    fn start(&self) {
        let Ok(runtime) = Handle::try_current() else {
            robot_error!(
                "job {}: start() needs a tokio runtime, use exec() to run it blocking",
                self.base.id()
            );
            return;
        };
        if !self.base.mark_scheduled() {
            robot_warn!("job {}: already started or finished", self.base.id());
            return;
        }
        let job = self.clone();
        runtime.spawn(async move {
            tokio::task::yield_now().await;
            job.send_request().await;
        });
    }

    fn do_kill(&self) -> bool {
        robot_debug!("job {}: aborting request", self.base.id());
        self.inner.cancel.cancel();
        true
    }

    fn error_string(&self) -> String {
        self.base
            .error()
            .map(|err| self.message_for(&err))
            .unwrap_or_default()
    }
}

/// Runs the transport call under the job's own deadline. `None` means the
/// deadline expired; a transport-level timeout is an ordinary failure.
async fn with_deadline<F>(
    call: F,
    timeout: Option<Duration>,
) -> Option<Result<TransportResponse, TransportFailure>>
where
    F: Future<Output = Result<TransportResponse, TransportFailure>>,
{
    let Some(limit) = timeout else {
        return Some(call.await);
    };
    tokio::time::timeout(limit, call).await.ok()
}

fn same_configuration(
    current: &Option<Arc<dyn Configuration>>,
    next: &Option<Arc<dyn Configuration>>,
) -> bool {
    match (current, next) {
        (None, None) => true,
        (Some(current), Some(next)) => Arc::ptr_eq(current, next),
        _ => false,
    }
}

fn log_request(id: u64, request: &TransportRequest) {
    robot_debug!("job {id}: {} {}", request.operation.as_str(), request.url);
    for (name, value) in &request.headers {
        if name.eq_ignore_ascii_case(AUTHORIZATION) {
            robot_debug!("job {id}: {name}: **************");
        } else {
            robot_debug!("job {id}: {name}: {value}");
        }
    }
    if let Some(body) = request.body.as_ref().filter(|body| !body.is_empty()) {
        robot_debug!("job {id}: payload: {}", String::from_utf8_lossy(body));
    }
}

struct JobTransferProgress {
    base: BaseJob,
    started: Instant,
}

impl JobTransferProgress {
    fn new(base: BaseJob) -> Self {
        Self {
            base,
            started: Instant::now(),
        }
    }
}

impl TransferProgress for JobTransferProgress {
    fn total(&self, bytes: u64) {
        if self.base.is_finished() {
            return;
        }
        self.base.set_total_amount(Unit::Bytes, bytes);
    }

    fn received(&self, bytes: u64) {
        // A kill from another thread may land while the body is streaming.
        if self.base.is_finished() {
            return;
        }
        self.base.set_processed_amount(Unit::Bytes, bytes);
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.base.emit_speed((bytes as f64 / elapsed) as u64);
        }
    }
}
