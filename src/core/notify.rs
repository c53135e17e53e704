//! Push notifications to cafe staff devices.
//!
//! Delivery is best-effort per token: one bad token never stops the rest of the
//! batch, and callers receive a [`Delivery`] per token instead of an error.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of pushing to a single device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Target token
    pub token: String,
    /// Failure reason, `None` when the push was accepted
    pub error: Option<String>,
}

impl Delivery {
    /// Whether the push was accepted for this token.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Sends a notification to a batch of device tokens.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Pushes `title`/`body` to every token, reporting each result.
    async fn send(&self, tokens: &[String], title: &str, body: &str) -> Vec<Delivery>;
}

/// Notifier that only writes the push to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, tokens: &[String], title: &str, body: &str) -> Vec<Delivery> {
        info!(tokens = tokens.len(), title, body, "Push notification (log only)");
        tokens
            .iter()
            .map(|token| Delivery {
                token: token.clone(),
                error: None,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    sound: &'a str,
    priority: &'a str,
    #[serde(rename = "channelId")]
    channel_id: &'a str,
}

/// Notifier backed by the Expo push HTTP API, one request per token.
#[derive(Debug, Clone)]
pub struct ExpoNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl ExpoNotifier {
    /// Creates a notifier posting to `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn push_one(&self, token: &str, title: &str, body: &str) -> Result<(), String> {
        let message = ExpoMessage {
            to: token,
            title,
            body,
            sound: "notification_sound.wav",
            priority: "high",
            channel_id: "custom_channel",
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("push rejected with status {}", response.status()))
        }
    }
}

#[async_trait]
impl Notifier for ExpoNotifier {
    async fn send(&self, tokens: &[String], title: &str, body: &str) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(tokens.len());
        for token in tokens {
            let error = match self.push_one(token, title, body).await {
                Ok(()) => {
                    debug!(token = %token, "Push accepted");
                    None
                }
                Err(e) => {
                    warn!(token = %token, error = %e, "Push failed");
                    Some(e)
                }
            };
            deliveries.push(Delivery {
                token: token.clone(),
                error,
            });
        }
        deliveries
    }
}
