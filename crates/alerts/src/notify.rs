//! Delivery of fired alerts to external sinks. Each sink executes one
//! [`AlertAction`] directive; an event only reaches the sinks its rule's
//! actions name.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sentibar_core::{AlertsConfig, PipelineError, Result};
use tracing::{info, warn};

use crate::engine::AlertEvent;
use crate::rule::AlertAction;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const WEBHOOK_ATTEMPTS: u32 = 3;

/// A sink for fired alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// The directive this sink executes.
    fn action(&self) -> AlertAction;

    /// Delivers one event.
    ///
    /// # Errors
    /// Returns an error when delivery failed after the sink's own retries.
    async fn notify(&self, event: &AlertEvent) -> Result<()>;
}

/// Writes fired alerts to the log. Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn action(&self) -> AlertAction {
        AlertAction::Log
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        info!(
            "Alert '{}' fired for {}: decision={} probability={}",
            event.rule_name,
            event.ticker,
            event.decision,
            event
                .probability
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:.4}")),
        );
        Ok(())
    }
}

/// POSTs fired alerts to a webhook URL as JSON, retrying with a linear
/// backoff. Any 2xx response counts as delivered.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// # Errors
    /// Returns [`PipelineError::SourceUnavailable`] if the HTTP client
    /// cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|err| PipelineError::source_unavailable("webhook", err.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn action(&self) -> AlertAction {
        AlertAction::Webhook
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "type": "alert",
            "alert": event,
        });
        for attempt in 1..=WEBHOOK_ATTEMPTS {
            match self.http.post(&self.url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    warn!(
                        "Webhook attempt {}/{} got status {}",
                        attempt,
                        WEBHOOK_ATTEMPTS,
                        response.status()
                    );
                }
                Err(err) => {
                    warn!(
                        "Webhook attempt {}/{} failed: {}",
                        attempt, WEBHOOK_ATTEMPTS, err
                    );
                }
            }
            if attempt < WEBHOOK_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
            }
        }
        Err(PipelineError::source_unavailable(
            "webhook",
            format!("{WEBHOOK_ATTEMPTS} attempts to {} failed", self.url),
        ))
    }
}

/// Routes each event's actions to the matching sinks, isolating failures so
/// one dead sink cannot block the others. Returns the number of successful
/// deliveries.
pub async fn notify_all(notifiers: &[Box<dyn Notifier>], events: &[AlertEvent]) -> usize {
    let mut delivered = 0;
    for event in events {
        for action in &event.actions {
            let mut routed = false;
            for notifier in notifiers.iter().filter(|n| n.action() == *action) {
                routed = true;
                match notifier.notify(event).await {
                    Ok(()) => delivered += 1,
                    Err(err) => warn!(
                        "Notifier {} failed for rule {}: {}",
                        notifier.name(),
                        event.rule_id,
                        err
                    ),
                }
            }
            if !routed {
                warn!(
                    "No sink configured for {action} alerts (rule {})",
                    event.rule_id
                );
            }
        }
    }
    delivered
}

/// Builds the configured notifier stack: the log sink always, plus a
/// webhook sink when a URL is configured.
///
/// # Errors
/// Returns an error when the webhook HTTP client cannot be constructed.
pub fn build_notifiers(config: &AlertsConfig) -> Result<Vec<Box<dyn Notifier>>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];
    if let Some(url) = &config.webhook_url {
        notifiers.push(Box::new(WebhookNotifier::new(url)?));
    }
    Ok(notifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sentibar_core::Decision;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn event(rule_id: &str) -> AlertEvent {
        AlertEvent {
            rule_id: rule_id.to_string(),
            rule_name: "spike".to_string(),
            ticker: "ACME".to_string(),
            probability: Some(0.71),
            decision: Decision::Long,
            actions: vec![AlertAction::Log],
            triggered_at: Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap(),
        }
    }

    struct CountingNotifier {
        calls: Arc<AtomicUsize>,
        action: AlertAction,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn name(&self) -> &str {
            "counting"
        }

        fn action(&self) -> AlertAction {
            self.action
        }

        async fn notify(&self, _event: &AlertEvent) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn action(&self) -> AlertAction {
            AlertAction::Log
        }

        async fn notify(&self, _event: &AlertEvent) -> Result<()> {
            Err(PipelineError::source_unavailable("stub", "always down"))
        }
    }

    #[tokio::test]
    async fn one_failing_sink_does_not_block_the_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(FailingNotifier),
            Box::new(CountingNotifier {
                calls: Arc::clone(&calls),
                action: AlertAction::Log,
            }),
        ];
        let events = vec![event("r1"), event("r2")];

        let delivered = notify_all(&notifiers, &events).await;
        assert_eq!(delivered, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn events_only_reach_sinks_their_actions_name() {
        let log_calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(CountingNotifier {
                calls: Arc::clone(&log_calls),
                action: AlertAction::Log,
            }),
            Box::new(CountingNotifier {
                calls: Arc::clone(&hook_calls),
                action: AlertAction::Webhook,
            }),
        ];

        let log_only = event("r1");
        let delivered = notify_all(&notifiers, std::slice::from_ref(&log_only)).await;
        assert_eq!(delivered, 1);
        assert_eq!(log_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 0);

        let mut both = event("r2");
        both.actions = vec![AlertAction::Log, AlertAction::Webhook];
        let delivered = notify_all(&notifiers, std::slice::from_ref(&both)).await;
        assert_eq!(delivered, 2);
        assert_eq!(log_calls.load(Ordering::SeqCst), 2);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn log_notifier_always_delivers() {
        let notifier = LogNotifier;
        assert!(notifier.notify(&event("r1")).await.is_ok());
        assert_eq!(notifier.name(), "log");
        assert_eq!(notifier.action(), AlertAction::Log);
    }

    #[test]
    fn webhook_notifier_builds_from_a_url() {
        let notifier = WebhookNotifier::new("http://localhost:9/hook").unwrap();
        assert_eq!(notifier.name(), "webhook");
        assert_eq!(notifier.action(), AlertAction::Webhook);
    }

    #[test]
    fn notifier_stack_adds_webhook_only_when_configured() {
        let log_only = build_notifiers(&AlertsConfig::default()).unwrap();
        assert_eq!(log_only.len(), 1);

        let with_hook = build_notifiers(&AlertsConfig {
            webhook_url: Some("http://localhost:9/hook".to_string()),
            ..AlertsConfig::default()
        })
        .unwrap();
        assert_eq!(with_hook.len(), 2);
    }
}
