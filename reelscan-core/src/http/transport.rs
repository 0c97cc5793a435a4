//! Transport trait and implementations.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// A response as received, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The call never produced a response (connection failure, timeout, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Trait for issuing a single HTTP request, enabling mockability in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` as JSON to `endpoint`.
    ///
    /// Any status is an `Ok`; only a missing response is an error.
    async fn post_json(
        &self,
        endpoint: &str,
        payload: &JsonValue,
    ) -> Result<RawResponse, TransportFailure>;
}

/// User agent sent with every request.
const USER_AGENT: &str = concat!("reelscan/", env!("CARGO_PKG_VERSION"));

/// Configuration for ReqwestTransport.
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl ReqwestTransportBuilder {
    /// Set the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(ReqwestTransport { inner })
    }
}

/// Production transport backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        payload: &JsonValue,
    ) -> Result<RawResponse, TransportFailure> {
        let response = self
            .inner
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportFailure(describe_reqwest_error(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportFailure(describe_reqwest_error(&e)))?;

        Ok(RawResponse { status, body })
    }
}

/// reqwest errors print the full URL, which carries the API key. Keep only the kind.
fn describe_reqwest_error(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_body() || e.is_decode() {
        "failed to read response body"
    } else {
        "request failed"
    };
    match e.status() {
        Some(status) => format!("{} (HTTP {})", kind, status.as_u16()),
        None => kind.to_string(),
    }
}

/// Scripted reply for MockTransport.
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(RawResponse),
    Failure(String),
}

/// A request seen by MockTransport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: String,
    pub payload: JsonValue,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockReply>,
    fallback: Option<MockReply>,
    calls: Vec<RecordedCall>,
}

/// Mock transport for testing.
///
/// Replies are consumed in order; once the script runs out the `always` reply
/// (if any) is repeated. Clones share the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, reply: MockReply) -> Self {
        self.lock().script.push_back(reply);
        self
    }

    /// Queue a response with the given status and body.
    pub fn with_response(self, status: u16, body: &str) -> Self {
        self.push(MockReply::Response(RawResponse::new(status, body)))
    }

    /// Queue a 200 response with a JSON body.
    pub fn with_json(self, body: &JsonValue) -> Self {
        self.with_response(200, &body.to_string())
    }

    /// Queue a transport failure.
    pub fn with_failure(self, message: &str) -> Self {
        self.push(MockReply::Failure(message.to_string()))
    }

    /// Reply used once the queued script is exhausted.
    pub fn always(self, reply: MockReply) -> Self {
        self.lock().fallback = Some(reply);
        self
    }

    /// Number of requests made so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// All requests made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        payload: &JsonValue,
    ) -> Result<RawResponse, TransportFailure> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            endpoint: endpoint.to_string(),
            payload: payload.clone(),
        });

        let reply = state.script.pop_front().or_else(|| state.fallback.clone());
        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure(message)) => Err(TransportFailure(message)),
            None => Err(TransportFailure(format!(
                "No mock reply left for {}",
                endpoint
            ))),
        }
    }
}
