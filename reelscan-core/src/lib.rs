pub mod ai;
pub mod error;
pub mod extract;
pub mod http;
pub mod image;
pub mod session;
pub mod types;

pub use error::{IdentifyError, ImageError, RequestError};
pub use extract::{extract, no_match_message};
pub use http::{
    BackoffRequester, MockReply, MockTransport, RawResponse, RecordingSleeper, ReqwestTransport,
    RetryPolicy, Sleeper, TokioSleeper, Transport, TransportFailure,
};
pub use image::{load_image, validate_image, MAX_FILE_SIZE};
pub use session::{Session, SessionError, SessionState};
pub use types::{
    ExtractionResult, IdentificationOutcome, IdentifyRequest, ImageMime, SelectedImage, Source,
    NOT_AVAILABLE, NO_MATCH_SYNOPSIS, UNKNOWN_TITLE,
};
