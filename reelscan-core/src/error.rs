use thiserror::Error;

/// Errors produced by the backoff requester.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The transport itself failed (connection refused, timeout, ...).
    #[error("Network request failed on attempt {attempt}: {message}")]
    Transport { attempt: u32, message: String },

    /// The service answered 429 or 5xx.
    #[error("Service unavailable (HTTP {status}) on attempt {attempt}")]
    ServiceUnavailable { status: u16, attempt: u32 },

    /// Any other non-success status. `message` is taken from the error body
    /// when the service provides one.
    #[error("Service rejected the request (HTTP {status}): {message}")]
    ServiceRejected {
        status: u16,
        attempt: u32,
        message: String,
    },
}

impl RequestError {
    /// Zero-based index of the attempt that produced this error.
    pub fn attempt(&self) -> u32 {
        match self {
            RequestError::Transport { attempt, .. }
            | RequestError::ServiceUnavailable { attempt, .. }
            | RequestError::ServiceRejected { attempt, .. } => *attempt,
        }
    }

    /// HTTP status, if a response was received at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Transport { .. } => None,
            RequestError::ServiceUnavailable { status, .. }
            | RequestError::ServiceRejected { status, .. } => Some(*status),
        }
    }

    /// True for failures that may go away on their own (transport, 429, 5xx).
    pub fn is_transient(&self) -> bool {
        !matches!(self, RequestError::ServiceRejected { .. })
    }
}

/// Errors from a complete identify call.
#[derive(Error, Debug, Clone)]
pub enum IdentifyError {
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The exchange succeeded but no title could be recovered from the text.
    /// Carries the message to show the user.
    #[error("No movie match: {0}")]
    NoMatch(String),

    #[error("Failed to build request: {0}")]
    InvalidRequest(String),

    #[error("Failed to parse response: {0}")]
    MalformedResponse(String),

    #[error("Response not in cache and offline mode is enabled")]
    OfflineNotCached,
}

impl IdentifyError {
    /// The single human-readable string surfaced in a failed session.
    pub fn user_message(&self) -> String {
        match self {
            IdentifyError::NoMatch(message) => message.clone(),
            IdentifyError::Request(e) => format!("Failed to identify the movie. {}", e),
            IdentifyError::InvalidRequest(e) => format!("Could not prepare the request ({})", e),
            IdentifyError::MalformedResponse(e) => {
                format!("The identification service returned an unreadable response ({})", e)
            }
            IdentifyError::OfflineNotCached => {
                "This image has not been identified before and offline mode is enabled".to_string()
            }
        }
    }
}

/// Errors from validating a user-supplied image.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image: {0}")]
    Unreadable(String),

    #[error("Could not detect image format")]
    UnknownFormat,

    #[error("Unsupported image format: {0}. Allowed: JPEG, PNG, WebP")]
    UnsupportedFormat(String),

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}
