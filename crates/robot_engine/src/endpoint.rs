use robot_core::{
    Configuration, Description, ErrorCode, ExpectedContent, HeaderMap, JobError, Operation,
    Payload, QueryParams, RequestDescriptor, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use robot_logging::robot_error;
use serde_json::Value;

use crate::TransportFailure;

/// What a concrete API call contributes to the request pipeline.
///
/// Only the operation and the expected content are mandatory; every other
/// hook has a default matching a plain authenticated request.
pub trait Endpoint: Send + Sync {
    fn operation(&self) -> Operation;

    fn expected_content(&self) -> ExpectedContent;

    fn requires_auth(&self) -> bool {
        true
    }

    /// Seconds before the request is aborted; `0` disables the timeout.
    fn request_timeout_secs(&self) -> u16 {
        DEFAULT_REQUEST_TIMEOUT_SECS
    }

    /// Absolute path appended to the API host, e.g. `/server`.
    fn build_url_path(&self) -> String {
        String::new()
    }

    fn build_url_query(&self) -> QueryParams {
        QueryParams::new()
    }

    fn build_request_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// Body for POST and PUT. Ignored for the other operations.
    fn build_payload(&self) -> Payload {
        Payload::default()
    }

    fn check_input(
        &self,
        descriptor: &RequestDescriptor,
        config: &dyn Configuration,
    ) -> Result<(), JobError> {
        robot_core::check_input(descriptor.requires_auth, config)
    }

    fn check_output(
        &self,
        descriptor: &RequestDescriptor,
        body: &[u8],
    ) -> Result<Value, JobError> {
        robot_core::check_output(descriptor.expected_content, body)
    }

    /// Maps a transport failure to the job error. An error already placed
    /// in `error` by an override wins over the generic network error.
    fn extract_error(&self, failure: &TransportFailure, error: &mut Option<JobError>) {
        default_extract_error(failure, error);
    }

    fn description(&self) -> Option<Description> {
        None
    }

    /// Endpoint-specific wording for an error, if any.
    fn error_string(&self, _error: &JobError) -> Option<String> {
        None
    }
}

pub fn default_extract_error(failure: &TransportFailure, error: &mut Option<JobError>) {
    if error.is_some() {
        return;
    }
    robot_error!("Network error: {}", failure.message);
    *error = Some(JobError::with_text(
        ErrorCode::NetworkError,
        failure.message.clone(),
    ));
}
