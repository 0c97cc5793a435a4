//! HTTP plumbing: the transport seam and the retrying requester.
//!
//! All outgoing requests should go through [`BackoffRequester`] so retry and
//! backoff behave the same everywhere.

mod backoff;
mod requester;
mod transport;

pub use backoff::{
    RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_BASE_DELAY_MS,
    DEFAULT_MAX_ATTEMPTS,
};
pub use requester::BackoffRequester;
pub use transport::{
    MockReply, MockTransport, RawResponse, RecordedCall, ReqwestTransport,
    ReqwestTransportBuilder, Transport, TransportFailure,
};
