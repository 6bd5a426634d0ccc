//! Acceptance notifier: the fire-and-forget callback that tells the tier
//! which originated an order that its counterpart was accepted.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderNumber;
use thiserror::Error;

use crate::gateway::PEER_CALL_TIMEOUT;

/// Header carrying the static shared secret on machine-to-machine calls.
/// No user session exists for these, so a bearer JWT would be wrong here.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Errors from the acceptance notifier.
///
/// These are observed only by the service's logging: a failed notification
/// never propagates to the caller and never reverts the committed accept.
/// There is no retry, outbox, or dead-letter queue behind this trait; a
/// durable implementation can be swapped in without touching the service.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP call itself failed.
    #[error("Notification call failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The peer could not be reached (used by test doubles).
    #[error("Notification connection failed: {0}")]
    Connection(String),

    /// The peer answered with a non-success status.
    #[error("Notification rejected with status {status}")]
    Rejected { status: u16 },
}

/// Trait for the acceptance callback.
#[async_trait]
pub trait AcceptanceNotifier: Send + Sync {
    /// Tells the originating tier that the order it forwarded (identified by
    /// its own order number) has been accepted here.
    async fn order_accepted(
        &self,
        counterparty_order_number: &OrderNumber,
    ) -> Result<(), NotifyError>;
}

/// HTTP implementation: `POST {peer}/orders/{number}/accepted-notification`
/// with the shared-secret header and an empty body.
pub struct HttpAcceptanceNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAcceptanceNotifier {
    /// Creates a notifier targeting the peer at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PEER_CALL_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl AcceptanceNotifier for HttpAcceptanceNotifier {
    async fn order_accepted(
        &self,
        counterparty_order_number: &OrderNumber,
    ) -> Result<(), NotifyError> {
        let url = format!(
            "{}/orders/{}/accepted-notification",
            self.base_url, counterparty_order_number
        );
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    notified: Vec<OrderNumber>,
    fail_on_notify: bool,
}

/// In-memory notifier for testing.
#[derive(Clone, Default)]
pub struct InMemoryAcceptanceNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryAcceptanceNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to simulate a network failure.
    pub fn set_fail_on_notify(&self, fail: bool) {
        self.state.write().unwrap().fail_on_notify = fail;
    }

    /// Returns the number of delivered notifications.
    pub fn notified_count(&self) -> usize {
        self.state.read().unwrap().notified.len()
    }

    /// Returns the most recently notified counterparty number, if any.
    pub fn last_notified(&self) -> Option<OrderNumber> {
        self.state.read().unwrap().notified.last().cloned()
    }
}

#[async_trait]
impl AcceptanceNotifier for InMemoryAcceptanceNotifier {
    async fn order_accepted(
        &self,
        counterparty_order_number: &OrderNumber,
    ) -> Result<(), NotifyError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_notify {
            return Err(NotifyError::Connection("simulated network error".into()));
        }
        state.notified.push(counterparty_order_number.clone());
        Ok(())
    }
}

/// Notifier for tiers with nobody to notify (nothing downstream forwards to
/// them). Logs at debug so a misconfigured deployment is still visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl AcceptanceNotifier for DisabledNotifier {
    async fn order_accepted(
        &self,
        counterparty_order_number: &OrderNumber,
    ) -> Result<(), NotifyError> {
        tracing::debug!(
            counterparty = %counterparty_order_number,
            "acceptance notification skipped: no notifier configured"
        );
        Ok(())
    }
}
