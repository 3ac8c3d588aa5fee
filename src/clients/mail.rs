use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::config::{MailConfig, MailTransport};

/// A rendered plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;

    /// Transport name for logs and metric labels.
    fn name(&self) -> &'static str;
}

/// Build the mailer selected by `[mail].transport`.
pub fn from_config(config: &MailConfig) -> Result<std::sync::Arc<dyn Mailer>> {
    Ok(match config.transport {
        MailTransport::Log => std::sync::Arc::new(LogMailer),
        MailTransport::Http => std::sync::Arc::new(HttpMailer::new(config)?),
    })
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: String,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Delivers mail by POSTing JSON to an HTTP relay.
pub struct HttpMailer {
    client: Client,
    relay_url: url::Url,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let relay_url = url::Url::parse(&config.relay_url)
            .with_context(|| format!("Invalid mail relay URL: {}", config.relay_url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("memberdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build mail HTTP client")?;

        let api_key = (!config.api_key.is_empty()).then(|| config.api_key.clone());

        Ok(Self {
            client,
            relay_url,
            api_key,
            from: format!("{} <{}>", config.from_name, config.from_address),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let payload = RelayPayload {
            from: self.from.clone(),
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.client.post(self.relay_url.clone()).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to reach mail relay")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Mail relay returned {status}: {body}");
        }

        debug!(to = %message.to, subject = %message.subject, "Mail accepted by relay");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Outgoing mail (log transport)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Keeps delivered messages in memory. Used by tests to read back codes.
#[derive(Default)]
pub struct MemoryMailer {
    messages: Mutex<Vec<MailMessage>>,
    delivered: Notify,
    fail: AtomicBool,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails.
    #[must_use]
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.fail.store(true, Ordering::SeqCst);
        mailer
    }

    #[must_use]
    pub fn messages(&self) -> Vec<MailMessage> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Wait until at least `count` messages arrived or `timeout` passed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<MailMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.delivered.notified();
            let current = self.messages();
            if current.len() >= count {
                return current;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.messages();
            }
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("simulated delivery failure");
        }

        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message.clone());
        }
        self.delivered.notify_waiters();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> MailMessage {
        MailMessage {
            to: to.to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer.send(&message("a@example.com")).await.unwrap();
        mailer.send(&message("b@example.com")).await.unwrap();

        let messages = mailer.wait_for(2, Duration::from_millis(50)).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].to, "b@example.com");
    }

    #[tokio::test]
    async fn test_failing_memory_mailer() {
        let mailer = MemoryMailer::failing();
        assert!(mailer.send(&message("a@example.com")).await.is_err());
        assert!(mailer.messages().is_empty());
    }

    #[test]
    fn test_http_mailer_rejects_bad_url() {
        let config = MailConfig {
            transport: MailTransport::Http,
            relay_url: "::not a url::".to_string(),
            ..MailConfig::default()
        };
        assert!(HttpMailer::new(&config).is_err());
    }

    #[test]
    fn test_from_config_picks_transport() {
        let mailer = from_config(&MailConfig::default()).unwrap();
        assert_eq!(mailer.name(), "log");
    }
}
