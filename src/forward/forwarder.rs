use crate::config::Config;
use crate::error::ConfigError;
use crate::events::{Alert, DeliveryOutcome, FailureReason, LogLine};
use crate::forward::sinks::{AlertSink, HttpSink};
use log::{error, info, warn};
use std::sync::Arc;

/// Parses log lines and hands them to a sink, one attempt per line
///
/// `forward` never fails: malformed lines and delivery failures become a
/// [`DeliveryOutcome`], are logged, and the line is dropped. Any answer from
/// the collector counts as delivered, whatever its status code.
pub struct Forwarder {
    sink: Arc<dyn AlertSink>,
}

impl Forwarder {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    /// Forwarder posting to the collector described by `config`
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let sink = HttpSink::from_config(config)?;
        info!("Forwarding alerts to {}", sink.url());
        Ok(Self::new(Arc::new(sink)))
    }

    /// Parse and deliver `line`, reporting what happened
    pub async fn forward(&self, line: &LogLine) -> DeliveryOutcome {
        let alert = match Alert::from_json(&line.text) {
            Ok(alert) => alert,
            Err(e) => {
                warn!("Push failed: invalid JSON at offset {}: {}", line.offset, e);
                return DeliveryOutcome::ParseError(e.to_string());
            }
        };

        match self.sink.deliver(&alert).await {
            Ok(status) => {
                let label = alert.rule_id().unwrap_or("-");
                if (200..300).contains(&status) {
                    info!("Sent alert: {} (rule {})", status, label);
                } else {
                    warn!(
                        "Sent alert: {} (rule {}), collector did not accept it",
                        status, label
                    );
                }
                DeliveryOutcome::Delivered { status }
            }
            Err(e) => {
                error!("Push failed: {}", e);
                DeliveryOutcome::Failed(FailureReason::from(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::forward::sinks::MockSink;

    fn forwarder(sink: &MockSink) -> Forwarder {
        Forwarder::new(Arc::new(sink.clone()))
    }

    #[tokio::test]
    async fn test_forward_delivers_parsed_alert() {
        let sink = MockSink::with_status(200);
        let outcome = forwarder(&sink)
            .forward(&LogLine::new(r#"{"rule":{"level":5}}"#, 0))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { status: 200 });
        let received = sink.received();
        assert_eq!(received.len(), 1);
        assert_eq!(
            serde_json::to_string(&received[0]).unwrap(),
            r#"{"rule":{"level":5}}"#
        );
    }

    #[tokio::test]
    async fn test_forward_parse_error_sends_nothing() {
        let sink = MockSink::with_status(200);
        let outcome = forwarder(&sink)
            .forward(&LogLine::new("{bad json}", 0))
            .await;

        assert!(matches!(outcome, DeliveryOutcome::ParseError(_)));
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_forward_blank_line_is_parse_error() {
        let sink = MockSink::with_status(200);
        let outcome = forwarder(&sink).forward(&LogLine::new("   ", 0)).await;

        assert!(matches!(outcome, DeliveryOutcome::ParseError(_)));
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_forward_non_success_status_is_delivered() {
        let sink = MockSink::with_status(503);
        let outcome = forwarder(&sink)
            .forward(&LogLine::new(r#"{"ok":true}"#, 0))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { status: 503 });
        assert_eq!(sink.call_count(), 1);
    }

    #[tokio::test]
    async fn test_forward_failure_is_not_retried() {
        let sink = MockSink::failing(DeliveryError::Connect("refused".to_string()));
        let outcome = forwarder(&sink)
            .forward(&LogLine::new(r#"{"ok":true}"#, 0))
            .await;

        assert_eq!(
            outcome,
            DeliveryOutcome::Failed(FailureReason::Connect("refused".to_string()))
        );
        assert_eq!(sink.call_count(), 1);
    }

    #[test]
    fn test_from_config_builds_http_forwarder() {
        assert!(Forwarder::from_config(&Config::default()).is_ok());
    }
}
