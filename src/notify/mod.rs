//! Webhook delivery of newsletter update bullets.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;

use crate::mail::ParsedMail;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    HttpStatus(u16),

    #[error("Failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Builds the message for a parsed newsletter.
///
/// Returns `None` when the newsletter has no update bullets.
pub fn compose_updates_message(mail: &ParsedMail) -> Option<String> {
    if mail.updates.is_empty() {
        return None;
    }
    Some(format!("\nUpdates:\n{}", mail.updates.join("\n")))
}

/// Posts `{"text": ...}` payloads to an incoming-webhook URL.
pub struct WebhookNotifier {
    url: SecretString,
    client: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: SecretString) -> Self {
        Self {
            url,
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delivers one message. Only a 200 response counts as delivered.
    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(&serde_json::json!({ "text": text }))?;

        let response = self
            .client
            .post(self.url.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(NotifyError::HttpStatus(status.as_u16()));
        }
        tracing::debug!(chars = text.chars().count(), "Webhook message delivered");
        Ok(())
    }

    /// Sends the update bullets of `mail`, if it has any.
    ///
    /// Returns whether a message was sent.
    pub async fn notify_updates(&self, mail: &ParsedMail) -> Result<bool, NotifyError> {
        let Some(text) = compose_updates_message(mail) else {
            tracing::debug!(subject = %mail.subject, "No update bullets, nothing to send");
            return Ok(false);
        };
        self.send(&text).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mail_with(updates: &[&str]) -> ParsedMail {
        ParsedMail {
            subject: "Weekly".into(),
            updates: updates.iter().map(|s| s.to_string()).collect(),
            ..ParsedMail::default()
        }
    }

    fn notifier_for(server: &MockServer) -> WebhookNotifier {
        let url = SecretString::from(format!("{}/hook", server.uri()));
        WebhookNotifier::new(reqwest::Client::new(), url)
    }

    #[test]
    fn test_compose_message() {
        let text = compose_updates_message(&mail_with(&["업데이트 1", "업데이트 2"])).unwrap();
        assert_eq!(text, "\nUpdates:\n업데이트 1\n업데이트 2");
    }

    #[test]
    fn test_compose_without_bullets() {
        assert_eq!(compose_updates_message(&mail_with(&[])), None);
    }

    #[tokio::test]
    async fn test_send_posts_text_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({ "text": "hello" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        notifier_for(&server).send("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let err = notifier_for(&server).send("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::HttpStatus(204)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_notify_updates_skips_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sent = notifier_for(&server).notify_updates(&mail_with(&[])).await.unwrap();
        assert!(!sent);
    }

    #[test]
    fn test_debug_hides_url() {
        let notifier = WebhookNotifier::new(
            reqwest::Client::new(),
            SecretString::from("https://hooks.example.com/T000/B000/secret-token"),
        );
        let debug = format!("{:?}", notifier);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
