//! Low-credit notifications.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use examprep_core::{UserId, LOW_BALANCE_THRESHOLD};

/// Receives a call each time a user's balance falls to the low-credit threshold.
///
/// Implementations must not fail the ledger operation that triggered them;
/// delivery problems are logged.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `user_id` just dropped to `balance` credits.
    async fn low_credit(&self, user_id: UserId, balance: i64);
}

/// Emits a structured log event.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn low_credit(&self, user_id: UserId, balance: i64) {
        tracing::info!(
            user_id = %user_id,
            balance,
            threshold = LOW_BALANCE_THRESHOLD,
            "Low credit balance"
        );
    }
}

#[derive(Debug, Serialize)]
struct LowCreditEvent {
    event: &'static str,
    user_id: UserId,
    balance: i64,
    threshold: i64,
}

/// POSTs a JSON event to a configured URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn low_credit(&self, user_id: UserId, balance: i64) {
        let event = LowCreditEvent {
            event: "credits.low",
            user_id,
            balance,
            threshold: LOW_BALANCE_THRESHOLD,
        };

        match self.client.post(&self.url).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(user_id = %user_id, balance, "Low credit webhook delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    user_id = %user_id,
                    status = %response.status(),
                    "Low credit webhook returned non-success status"
                );
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Low credit webhook failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn webhook_notifier_posts_event() {
        let server = MockServer::start().await;
        let user_id = UserId::generate();

        Mock::given(method("POST"))
            .and(path("/hooks/low-credit"))
            .and(body_partial_json(serde_json::json!({
                "event": "credits.low",
                "user_id": user_id.to_string(),
                "balance": 5,
                "threshold": 5
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hooks/low-credit", server.uri())).unwrap();
        notifier.low_credit(user_id, 5).await;
    }

    #[tokio::test]
    async fn webhook_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri()).unwrap();
        notifier.low_credit(UserId::generate(), 3).await;
    }
}
