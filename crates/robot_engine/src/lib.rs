//! Robot engine: runs jobs on tokio and talks HTTP to the Robot API.
mod endpoint;
mod job;
mod registry;
mod request;
mod servers;
mod transport;

pub use endpoint::{default_extract_error, Endpoint};
pub use job::{BaseJob, ChannelEventSink, EventSink, Job, SPEED_QUIET_PERIOD};
pub use registry::{
    default_configuration, set_default_configuration, set_transport_factory, transport_factory,
    GlobalRegistry,
};
pub use request::RequestJob;
pub use servers::GetServers;
pub use transport::{
    FailureKind, NoProgress, ReqwestTransport, TransferProgress, Transport, TransportFactory,
    TransportFailure, TransportRequest, TransportResponse, TransportSettings,
};
