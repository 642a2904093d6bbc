use robot_core::{Description, ErrorCode, ExpectedContent, JobError, Operation};
use robot_logging::robot_warn;

use crate::{default_extract_error, Endpoint, RequestJob, TransportFailure};

const NO_SERVERS: &str = "No servers found.";

/// `GET /server`: every server of the account, as a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetServers;

impl GetServers {
    pub fn job() -> RequestJob {
        RequestJob::new(GetServers)
    }
}

impl Endpoint for GetServers {
    fn operation(&self) -> Operation {
        Operation::Get
    }

    fn expected_content(&self) -> ExpectedContent {
        ExpectedContent::JsonArray
    }

    fn build_url_path(&self) -> String {
        "/server".to_string()
    }

    fn description(&self) -> Option<Description> {
        Some(Description::new("Getting servers"))
    }

    fn extract_error(&self, failure: &TransportFailure, error: &mut Option<JobError>) {
        // The API answers 404 when the account has no servers at all.
        if failure.status() == Some(404) {
            robot_warn!("{NO_SERVERS}");
            *error = Some(JobError::new(ErrorCode::NotFound));
        }
        default_extract_error(failure, error);
    }

    fn error_string(&self, error: &JobError) -> Option<String> {
        (error.code == ErrorCode::NotFound).then(|| NO_SERVERS.to_string())
    }
}
