//! Client for the external text-to-image service.
//!
//! The provider contract is a single-field request: `POST {"prompt": ...}`
//! answered by `{"images": [base64 strings]}`. Transport failures and
//! unusable bodies are retried up to a fixed attempt cap; the first usable
//! payload wins. The transport itself sits behind an object-safe port so
//! tests can script outcomes without a server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Request body sent to the generation endpoint.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
}

/// Response body from the generation endpoint. A body without an `images`
/// field does not parse and counts as an unusable payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub images: Vec<String>,
}

/// A single attempt's failure, as seen by the retry loop.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("unusable response body: {0}")]
    Body(String),
}

/// The transport port. `HttpTransport` is the production implementation;
/// tests supply doubles that script per-attempt outcomes.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn fetch(&self, prompt: &str) -> Result<GenerateResponse, TransportError>;
}

/// reqwest-backed transport with a per-request timeout.
pub struct HttpTransport {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn fetch(&self, prompt: &str) -> Result<GenerateResponse, TransportError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt })
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

/// Cooperative cancellation flag threaded through a generation request.
/// Checked between attempts; a started HTTP call is never torn down.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no usable response after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
    #[error("request cancelled")]
    Cancelled,
}

/// Retrying wrapper around a [`GenerationTransport`].
pub struct GenerationClient {
    transport: Box<dyn GenerationTransport>,
    attempts: u32,
    retry_delay: Duration,
}

impl GenerationClient {
    /// `attempts` counts total tries, not retries. A zero value is bumped
    /// to one.
    pub fn new(
        transport: Box<dyn GenerationTransport>,
        attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            transport,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// Fetch a generation payload, retrying failed attempts sequentially.
    /// Returns on the first usable payload; never panics.
    pub async fn generate(
        &self,
        prompt: &str,
        cancel: &CancelSignal,
    ) -> Result<GenerateResponse, GenerateError> {
        for attempt in 1..=self.attempts {
            if cancel.is_set() {
                debug!(prompt, attempt, "generation cancelled");
                return Err(GenerateError::Cancelled);
            }

            debug!(prompt, attempt, "requesting generation");
            match self.transport.fetch(prompt).await {
                Ok(response) => {
                    debug!(
                        prompt,
                        attempt,
                        images = response.images.len(),
                        "generation payload received"
                    );
                    return Ok(response);
                }
                Err(err) => {
                    warn!(prompt, attempt, error = %err, "generation attempt failed");
                }
            }

            if attempt < self.attempts && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(GenerateError::AttemptsExhausted {
            attempts: self.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Scripted transport: pops one outcome per call, falls back to a 500,
    /// counts calls through a handle the test keeps.
    struct Scripted {
        calls: Arc<AtomicUsize>,
        outcomes: tokio::sync::Mutex<Vec<Result<GenerateResponse, TransportError>>>,
    }

    #[async_trait]
    impl GenerationTransport for Scripted {
        async fn fetch(&self, _prompt: &str) -> Result<GenerateResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().await;
            if outcomes.is_empty() {
                Err(TransportError::Status(500))
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn scripted(
        outcomes: Vec<Result<GenerateResponse, TransportError>>,
    ) -> (Box<dyn GenerationTransport>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Scripted {
            calls: calls.clone(),
            outcomes: tokio::sync::Mutex::new(outcomes),
        };
        (Box::new(transport), calls)
    }

    fn ok_response() -> Result<GenerateResponse, TransportError> {
        Ok(GenerateResponse {
            images: vec!["aGk=".to_string()],
        })
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let (transport, calls) = scripted(vec![ok_response()]);
        let client = GenerationClient::new(transport, 3, Duration::ZERO);

        let response = client.generate("a red fox", &CancelSignal::new()).await;
        assert!(response.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let (transport, calls) = scripted(vec![
            Err(TransportError::Request("connection reset".into())),
            Err(TransportError::Status(502)),
            ok_response(),
        ]);
        let client = GenerationClient::new(transport, 3, Duration::ZERO);

        let response = client.generate("a red fox", &CancelSignal::new()).await;
        assert!(response.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_caps_the_transport_calls() {
        let (transport, calls) = scripted(vec![]);
        let client = GenerationClient::new(transport, 3, Duration::ZERO);

        let err = client
            .generate("a red fox", &CancelSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::AttemptsExhausted { attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_images_field_counts_as_unusable() {
        let (transport, calls) = scripted(vec![
            Err(TransportError::Body("missing field `images`".into())),
            ok_response(),
        ]);
        let client = GenerationClient::new(transport, 3, Duration::ZERO);

        assert!(client.generate("x", &CancelSignal::new()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_first_call() {
        let (transport, calls) = scripted(vec![ok_response()]);
        let client = GenerationClient::new(transport, 3, Duration::ZERO);

        let cancel = CancelSignal::new();
        cancel.set();
        let err = client.generate("x", &cancel).await.unwrap_err();
        assert!(matches!(err, GenerateError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn response_parses_provider_wire_shape() {
        let body = r#"{"images": ["aGVsbG8=", "d29ybGQ="], "version": "v1"}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.images.len(), 2);

        let no_images = r#"{"detail": "overloaded"}"#;
        assert!(serde_json::from_str::<GenerateResponse>(no_images).is_err());
    }
}
