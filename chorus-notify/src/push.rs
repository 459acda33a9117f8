//! Push delivery client.
//!
//! HTTP client for the mobile/web push provider. Delivery is best effort
//! per registered device token; a push failure never rolls back the
//! notification record it follows.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::notification::{Notification, NotificationKind};

/// Push delivery errors.
#[derive(Debug, Error)]
pub enum PushError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("Push API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the provider.
        message: String,
    },

    /// Invalid response from the provider.
    #[error("Invalid push API response: {0}")]
    InvalidResponse(String),
}

/// A push message addressed to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    /// Target user; the provider fans out to their registered devices.
    pub user_id: Uuid,

    /// Short title shown in the device notification.
    pub title: String,

    /// Body text.
    pub body: String,

    /// Opaque data handed to the client app.
    pub data: serde_json::Value,
}

impl PushMessage {
    /// Build the push message for a freshly written notification.
    pub fn for_notification(notification: &Notification) -> Self {
        let title = match notification.kind {
            NotificationKind::Reply => "New reply",
            NotificationKind::Mention => "You were mentioned",
            NotificationKind::Reaction => "New reaction",
            NotificationKind::TaskAssigned => "Task assigned to you",
            NotificationKind::TaskUpdated => "Task updated",
            NotificationKind::ChannelInvite => "Channel invitation",
            NotificationKind::CallStarted => "Call started",
        };

        let body = notification
            .payload
            .get("preview")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Self {
            user_id: notification.user_id,
            title: title.to_string(),
            body,
            data: serde_json::json!({
                "notification_id": notification.id,
                "event_id": notification.event_id,
                "kind": notification.kind.as_str(),
            }),
        }
    }
}

/// Best-effort delivery result for one device token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushOutcome {
    /// The device token the provider attempted.
    pub device_token: String,

    /// Whether the provider accepted the message for this token.
    pub delivered: bool,

    /// Provider error for this token, if any.
    pub error: Option<String>,
}

/// Push delivery transport.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    /// Deliver a message to all of the user's registered devices.
    ///
    /// Returns one outcome per device token the provider attempted.
    async fn deliver(&self, message: &PushMessage) -> Result<Vec<PushOutcome>, PushError>;
}

/// Push provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Base URL for the push provider (e.g., "https://push.chorus.chat").
    pub base_url: String,

    /// API key for provider authentication.
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PushConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4100".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PUSH_API_URL`: push provider URL (default: http://localhost:4100)
    /// - `PUSH_API_KEY`: provider API key
    /// - `PUSH_TIMEOUT_SECS`: request timeout in seconds (default: 10)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            base_url: std::env::var("PUSH_API_URL").unwrap_or(default.base_url),
            api_key: std::env::var("PUSH_API_KEY").ok(),
            timeout_secs: std::env::var("PUSH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
        }
    }

    /// Build a full URL by appending a path to the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
struct DeliverResponse {
    outcomes: Vec<PushOutcome>,
}

/// HTTP client for the push provider.
#[derive(Clone)]
pub struct HttpPushClient {
    /// HTTP client instance.
    client: Client,

    /// Provider configuration.
    config: PushConfig,
}

impl HttpPushClient {
    /// Create a new push client.
    pub fn new(config: PushConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config }
    }
}

#[async_trait]
impl PushDelivery for HttpPushClient {
    #[instrument(skip(self, message), fields(user_id = %message.user_id))]
    async fn deliver(&self, message: &PushMessage) -> Result<Vec<PushOutcome>, PushError> {
        debug!("Delivering push for user {}", message.user_id);

        let url = self.config.url("/v1/push");
        let mut request = self.client.post(&url).json(message);

        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PushError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: DeliverResponse = response
            .json()
            .await
            .map_err(|e| PushError::InvalidResponse(e.to_string()))?;

        Ok(body.outcomes)
    }
}

/// Push delivery that does nothing.
///
/// Used when push is disabled (local development, notification kinds that
/// should stay in-app only).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPush;

#[async_trait]
impl PushDelivery for NoopPush {
    async fn deliver(&self, _message: &PushMessage) -> Result<Vec<PushOutcome>, PushError> {
        Ok(Vec::new())
    }
}

/// Push delivery that records messages in memory.
#[derive(Default)]
pub struct MemoryPush {
    sent: Arc<RwLock<Vec<PushMessage>>>,
}

impl MemoryPush {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far.
    pub async fn sent(&self) -> Vec<PushMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl PushDelivery for MemoryPush {
    async fn deliver(&self, message: &PushMessage) -> Result<Vec<PushOutcome>, PushError> {
        let mut sent = self.sent.write().await;
        sent.push(message.clone());
        Ok(vec![PushOutcome {
            device_token: format!("memory-device-{}", message.user_id),
            delivered: true,
            error: None,
        }])
    }
}
