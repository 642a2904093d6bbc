//! Robot core: pure job lifecycle, progress accounting and response validation.
//!
//! Nothing in this crate performs I/O. The engine crate drives these types
//! from its runtime and turns the returned events into notifications.
mod config;
mod error;
mod event;
mod lifecycle;
mod progress;
mod request;
mod validate;

pub use config::{default_user_agent, Configuration, StaticConfiguration};
pub use error::{ErrorCode, JobError};
pub use event::{Description, JobEvent, KillVerbosity};
pub use lifecycle::{Capabilities, JobId, JobResult, JobState, Lifecycle};
pub use progress::{percent_of, ProgressState, Unit};
pub use request::{
    assemble_headers, basic_auth, build_url, set_header, ExpectedContent, HeaderMap, Operation,
    Payload, QueryParams, RequestDescriptor, API_BASE_URL, AUTHORIZATION, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use validate::{check_input, check_output};
