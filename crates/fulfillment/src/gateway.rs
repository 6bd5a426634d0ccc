//! Cross-tier gateway: the single HTTP hop between one tier and the tier
//! above it.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderNumber, Tier};
use domain::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed client-side timeout for all cross-tier calls. A slow downstream
/// tier stalls the upstream request chain for at most this long.
pub const PEER_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the cross-tier gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP call itself failed (connect, timeout, ...).
    #[error("Peer call failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The peer could not be reached (used by test doubles).
    #[error("Peer connection failed: {0}")]
    Connection(String),

    /// The peer answered with a non-success status.
    #[error("Peer returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The peer's 2xx response body did not match the expected shape.
    #[error("Peer response could not be parsed: {0}")]
    InvalidResponse(String),
}

/// One line of a forwarded order. Quantities only — the receiving tier
/// prices every line from its own price list and ignores any price the
/// caller might claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Wire request for creating the counterpart order on the upstream tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardOrderRequest {
    /// The calling tier's own order number, stored by the receiver for
    /// acceptance-callback correlation.
    pub counterparty_order_number: OrderNumber,
    pub items: Vec<ForwardLine>,
    pub shipping_address: Option<String>,
}

/// Wire response from the upstream tier after it created its order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerOrderAck {
    pub order_number: OrderNumber,
    pub status: String,
    pub total_cents: i64,
}

/// Trait for the tier-to-tier forwarding call.
#[async_trait]
pub trait PeerGateway: Send + Sync {
    /// Creates the counterpart order on the peer tier.
    ///
    /// Exactly one HTTP call, no retry; any failure is the caller's to
    /// interpret (order creation treats it as fatal).
    async fn forward_order(
        &self,
        request: &ForwardOrderRequest,
    ) -> Result<PeerOrderAck, GatewayError>;
}

/// How the gateway authenticates against the peer service.
#[derive(Debug, Clone)]
pub enum ServiceAuth {
    /// Static service-account bearer token.
    Bearer(String),
    /// Static shared-secret API key header.
    ApiKey(String),
}

/// HTTP implementation of the cross-tier gateway.
pub struct HttpPeerGateway {
    client: reqwest::Client,
    base_url: String,
    auth: ServiceAuth,
}

impl HttpPeerGateway {
    /// Creates a gateway for the peer at `base_url`.
    pub fn new(base_url: impl Into<String>, auth: ServiceAuth) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PEER_CALL_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Performs a single authenticated call against the peer and returns the
    /// raw status and body. Never retries.
    pub async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(u16, String), GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        request = match &self.auth {
            ServiceAuth::Bearer(token) => request.bearer_auth(token),
            ServiceAuth::ApiKey(key) => request.header(crate::notifier::API_KEY_HEADER, key),
        };
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

#[async_trait]
impl PeerGateway for HttpPeerGateway {
    async fn forward_order(
        &self,
        request: &ForwardOrderRequest,
    ) -> Result<PeerOrderAck, GatewayError> {
        let body = serde_json::to_value(request)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let (status, body) = self
            .call(reqwest::Method::POST, "/orders/from-peer", Some(&body))
            .await?;

        if !(200..300).contains(&status) {
            return Err(GatewayError::Rejected { status, body });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    forwards: Vec<ForwardOrderRequest>,
    fail_on_forward: bool,
    reject_on_forward: bool,
}

/// In-memory gateway for testing.
///
/// Records every forwarded request and can be told to simulate transport
/// failure or peer rejection.
#[derive(Clone)]
pub struct InMemoryPeerGateway {
    peer_tier: Tier,
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPeerGateway {
    /// Creates a gateway pretending to be the given peer tier.
    pub fn new(peer_tier: Tier) -> Self {
        Self {
            peer_tier,
            state: Arc::new(RwLock::new(InMemoryGatewayState::default())),
        }
    }

    /// Configures the gateway to fail at the transport level.
    pub fn set_fail_on_forward(&self, fail: bool) {
        self.state.write().unwrap().fail_on_forward = fail;
    }

    /// Configures the gateway to answer with a non-2xx rejection.
    pub fn set_reject_on_forward(&self, reject: bool) {
        self.state.write().unwrap().reject_on_forward = reject;
    }

    /// Returns the number of forwarded orders.
    pub fn forward_count(&self) -> usize {
        self.state.read().unwrap().forwards.len()
    }

    /// Returns the most recent forwarded request, if any.
    pub fn last_forward(&self) -> Option<ForwardOrderRequest> {
        self.state.read().unwrap().forwards.last().cloned()
    }
}

#[async_trait]
impl PeerGateway for InMemoryPeerGateway {
    async fn forward_order(
        &self,
        request: &ForwardOrderRequest,
    ) -> Result<PeerOrderAck, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_forward {
            return Err(GatewayError::Connection("simulated network error".into()));
        }
        if state.reject_on_forward {
            return Err(GatewayError::Rejected {
                status: 400,
                body: "simulated rejection".into(),
            });
        }

        state.forwards.push(request.clone());
        Ok(PeerOrderAck {
            order_number: OrderNumber::generate(self.peer_tier),
            status: "Pending".to_string(),
            total_cents: 0,
        })
    }
}
