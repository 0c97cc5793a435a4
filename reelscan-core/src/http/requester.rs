//! One logical request, retried with exponential backoff.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::backoff::{RetryPolicy, Sleeper, TokioSleeper};
use super::transport::{RawResponse, Transport};
use crate::error::RequestError;

/// Error body shape used by the service for non-success statuses.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    message: String,
}

/// Sends a request through a [`Transport`], retrying per [`RetryPolicy`].
///
/// Attempts run strictly one after another. Either the first success response
/// is returned or the error from the final attempt.
pub struct BackoffRequester<T, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T: Transport> BackoffRequester<T, TokioSleeper> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, TokioSleeper, policy)
    }
}

impl<T: Transport, S: Sleeper> BackoffRequester<T, S> {
    pub fn with_sleeper(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// POST `payload` to `endpoint` until it succeeds or the attempt budget
    /// runs out.
    pub async fn send(&self, endpoint: &str, payload: &JsonValue) -> Result<RawResponse, RequestError> {
        let mut attempt = 0u32;

        loop {
            let error = match self.transport.post_json(endpoint, payload).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!(attempt, status = response.status, "request succeeded");
                    return Ok(response);
                }
                Ok(response) => classify_failure(attempt, &response),
                Err(failure) => RequestError::Transport {
                    attempt,
                    message: failure.to_string(),
                },
            };

            match self.policy.next_delay(attempt, &error) {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        status = ?error.status(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "request attempt failed, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    tracing::warn!(
                        attempts = attempt + 1,
                        error = %error,
                        "request failed, giving up"
                    );
                    return Err(error);
                }
            }
        }
    }
}

/// Turn a non-success response into the matching error.
fn classify_failure(attempt: u32, response: &RawResponse) -> RequestError {
    let status = response.status;
    if status == 429 || status >= 500 {
        return RequestError::ServiceUnavailable { status, attempt };
    }

    let message = serde_json::from_str::<ServiceErrorBody>(&response.body)
        .map(|body| body.error.message)
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("API error: HTTP {}", status));

    RequestError::ServiceRejected {
        status,
        attempt,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockReply, MockTransport, RecordingSleeper};
    use serde_json::json;
    use std::time::Duration;

    const ENDPOINT: &str = "https://example.test/v1/models/test:generateContent";

    fn requester(
        transport: &MockTransport,
        sleeper: &RecordingSleeper,
        policy: RetryPolicy,
    ) -> BackoffRequester<MockTransport, RecordingSleeper> {
        BackoffRequester::with_sleeper(transport.clone(), sleeper.clone(), policy)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_does_not_sleep() {
        let transport = MockTransport::new().with_response(200, "{}");
        let sleeper = RecordingSleeper::new();

        let response = requester(&transport, &sleeper, RetryPolicy::default())
            .send(ENDPOINT, &json!({}))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.call_count(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_recovers_after_two_server_errors() {
        let transport = MockTransport::new()
            .with_response(500, "")
            .with_response(500, "")
            .with_response(200, r#"{"candidates": []}"#);
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(5, Duration::from_millis(250));

        let response = requester(&transport, &sleeper, policy)
            .send(ENDPOINT, &json!({"k": "v"}))
            .await
            .unwrap();

        assert_eq!(response.body, r#"{"candidates": []}"#);
        assert_eq!(transport.call_count(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(250), Duration::from_millis(500)]
        );
    }

    #[tokio::test]
    async fn test_exhausts_attempts_on_persistent_server_error() {
        let transport =
            MockTransport::new().always(MockReply::Response(RawResponse::new(500, "")));
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(4, Duration::from_millis(10));

        let err = requester(&transport, &sleeper, policy)
            .send(ENDPOINT, &json!({}))
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 4);
        assert_eq!(
            err,
            RequestError::ServiceUnavailable {
                status: 500,
                attempt: 3
            }
        );
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40),
            ]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let transport = MockTransport::new()
            .with_response(429, "slow down")
            .with_response(200, "{}");
        let sleeper = RecordingSleeper::new();

        let response = requester(&transport, &sleeper, RetryPolicy::default())
            .send(ENDPOINT, &json!({}))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(1000)]);
    }

    #[tokio::test]
    async fn test_transport_failure_is_retried() {
        let transport = MockTransport::new()
            .with_failure("connection refused")
            .with_response(200, "{}");
        let sleeper = RecordingSleeper::new();

        let response = requester(&transport, &sleeper, RetryPolicy::default())
            .send(ENDPOINT, &json!({}))
            .await;

        assert!(response.is_ok());
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_on_last_attempt_propagates() {
        let transport = MockTransport::new().always(MockReply::Failure("timed out".to_string()));
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(2, Duration::from_millis(1));

        let err = requester(&transport, &sleeper, policy)
            .send(ENDPOINT, &json!({}))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RequestError::Transport {
                attempt: 1,
                message: "timed out".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_request_uses_service_message_and_is_retried() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key."}}"#;
        let transport = MockTransport::new().always(MockReply::Response(RawResponse::new(400, body)));
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let err = requester(&transport, &sleeper, policy)
            .send(ENDPOINT, &json!({}))
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 3);
        assert_eq!(
            err,
            RequestError::ServiceRejected {
                status: 400,
                attempt: 2,
                message: "API key not valid. Please pass a valid API key.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_request_fails_fast_when_policy_says_so() {
        let transport = MockTransport::new().always(MockReply::Response(RawResponse::new(403, "")));
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::default().with_retry_rejected(false);

        let err = requester(&transport, &sleeper, policy)
            .send(ENDPOINT, &json!({}))
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 1);
        assert!(sleeper.delays().is_empty());
        assert_eq!(
            err,
            RequestError::ServiceRejected {
                status: 403,
                attempt: 0,
                message: "API error: HTTP 403".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_saturated_delay_is_slept_as_is() {
        let transport = MockTransport::new()
            .with_response(500, "")
            .with_response(200, "{}");
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(2, Duration::MAX);

        requester(&transport, &sleeper, policy)
            .send(ENDPOINT, &json!({}))
            .await
            .unwrap();

        assert_eq!(sleeper.delays(), vec![Duration::MAX]);
    }

    #[tokio::test]
    async fn test_same_payload_sent_on_every_attempt() {
        let transport = MockTransport::new()
            .with_response(503, "")
            .with_response(200, "{}");
        let sleeper = RecordingSleeper::new();
        let payload = json!({"contents": [{"role": "user"}]});

        requester(&transport, &sleeper, RetryPolicy::default())
            .send(ENDPOINT, &payload)
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.payload == payload && c.endpoint == ENDPOINT));
    }
}
