//! Fake vision client for testing.
//!
//! Replies are queued up front and handed out in order, so tests can run the
//! whole identify flow without network access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::client::VisionClient;
use super::types::GenerateContentResponse;
use crate::error::IdentifyError;
use crate::types::IdentifyRequest;

#[derive(Debug, Default)]
pub struct FakeVisionClient {
    replies: Mutex<VecDeque<Result<GenerateContentResponse, IdentifyError>>>,
    requests: Mutex<Vec<IdentifyRequest>>,
}

impl FakeVisionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response whose first candidate carries `text`.
    pub fn with_text(self, text: &str) -> Self {
        self.with_response(GenerateContentResponse::from_text(text))
    }

    pub fn with_response(self, response: GenerateContentResponse) -> Self {
        self.push(Ok(response))
    }

    pub fn with_error(self, error: IdentifyError) -> Self {
        self.push(Err(error))
    }

    fn push(self, reply: Result<GenerateContentResponse, IdentifyError>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<IdentifyRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VisionClient for FakeVisionClient {
    async fn generate(
        &self,
        request: &IdentifyRequest,
    ) -> Result<GenerateContentResponse, IdentifyError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(IdentifyError::MalformedResponse(
                    "FakeVisionClient: no reply configured".to_string(),
                ))
            })
    }
}
