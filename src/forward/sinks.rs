use crate::config::Config;
use crate::error::{ConfigError, DeliveryError};
use crate::events::Alert;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Header carrying the collector credential (`X-API-Key` on the wire)
pub const API_KEY_HEADER: &str = "x-api-key";

/// Destination for parsed alerts
///
/// One call is one delivery attempt. Implementations must not retry: the
/// caller relies on at most one request per alert.
pub trait AlertSink: Send + Sync {
    /// Deliver `alert`, resolving to the HTTP status the collector answered with
    fn deliver<'a>(
        &'a self,
        alert: &'a Alert,
    ) -> Pin<Box<dyn Future<Output = Result<u16, DeliveryError>> + Send + 'a>>;
}

/// HTTP collector sink
///
/// POSTs each alert as a JSON body. The underlying client is built once and
/// reused, so connections to the collector are kept alive between alerts.
pub struct HttpSink {
    client: Client,
    url: String,
}

impl HttpSink {
    /// Create a sink for `url` authenticating with `api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `api_key` cannot be sent as
    /// a header value, and `ConfigError::ClientError` if the HTTP client
    /// cannot be built.
    pub fn new(url: String, api_key: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let mut key = HeaderValue::from_str(api_key).map_err(|_| {
            ConfigError::ValidationError(
                "api_key contains characters not allowed in an HTTP header".to_string(),
            )
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| ConfigError::ClientError(e.to_string()))?;

        Ok(Self { client, url })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.dashboard_url.clone(),
            &config.api_key,
            config.req_timeout,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl AlertSink for HttpSink {
    fn deliver<'a>(
        &'a self,
        alert: &'a Alert,
    ) -> Pin<Box<dyn Future<Output = Result<u16, DeliveryError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.client.post(&self.url).json(alert).send().await?;
            let status = response.status();

            // Drain the body so the connection goes back to the pool
            match response.text().await {
                Ok(body) if !status.is_success() && !body.is_empty() => {
                    debug!("Collector answered {}: {}", status, body);
                }
                Ok(_) => {}
                Err(e) => debug!("Failed to read collector response body: {}", e),
            }

            Ok(status.as_u16())
        })
    }
}

/// In-memory sink for tests and dry runs
///
/// Records every alert it receives and answers with scripted results,
/// cycling through them in order.
#[derive(Clone)]
pub struct MockSink {
    responses: Vec<Result<u16, DeliveryError>>,
    delay: Option<Duration>,
    received: Arc<Mutex<Vec<Alert>>>,
    current_index: Arc<Mutex<usize>>,
}

impl MockSink {
    /// A sink that always answers with `status`
    pub fn with_status(status: u16) -> Self {
        Self::with_responses(vec![Ok(status)])
    }

    /// A sink that always fails with `error`
    pub fn failing(error: DeliveryError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    /// A sink that answers with `responses` in order, then starts over
    pub fn with_responses(responses: Vec<Result<u16, DeliveryError>>) -> Self {
        Self {
            responses,
            delay: None,
            received: Arc::new(Mutex::new(Vec::new())),
            current_index: Arc::new(Mutex::new(0)),
        }
    }

    /// Wait `delay` before answering each delivery
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Alerts delivered so far, in delivery order
    pub fn received(&self) -> Vec<Alert> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl AlertSink for MockSink {
    fn deliver<'a>(
        &'a self,
        alert: &'a Alert,
    ) -> Pin<Box<dyn Future<Output = Result<u16, DeliveryError>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut received) = self.received.lock() {
                received.push(alert.clone());
            }

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.responses.is_empty() {
                return Ok(200);
            }

            let response_index = match self.current_index.lock() {
                Ok(mut index) => {
                    let current = *index % self.responses.len();
                    *index += 1;
                    current
                }
                Err(_) => 0,
            };
            self.responses[response_index].clone()
        })
    }
}
