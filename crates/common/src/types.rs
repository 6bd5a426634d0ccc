use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an order row.
///
/// Wraps a UUID to provide type safety and prevent mixing up
/// order IDs with other UUID-based identifiers. The ID is local to the
/// tier that created the order; cross-tier correlation uses [`OrderNumber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OrderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// One of the three inventory-owning tiers.
///
/// Each tier runs as its own service with its own datastore; the enum is
/// carried on orders and in configuration to select peer wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Seller,
    Distributor,
    Manufacturer,
}

impl Tier {
    /// Short code used as the order-number prefix.
    pub fn code(&self) -> &'static str {
        match self {
            Tier::Seller => "SEL",
            Tier::Distributor => "DIS",
            Tier::Manufacturer => "MAN",
        }
    }

    /// Returns the tier name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Seller => "Seller",
            Tier::Distributor => "Distributor",
            Tier::Manufacturer => "Manufacturer",
        }
    }

    /// The tier this tier forwards orders to, if any.
    pub fn upstream(&self) -> Option<Tier> {
        match self {
            Tier::Seller => Some(Tier::Distributor),
            Tier::Distributor => Some(Tier::Manufacturer),
            Tier::Manufacturer => None,
        }
    }

    /// Parses a tier from its name or code, case-insensitively.
    pub fn parse(s: &str) -> Option<Tier> {
        match s.to_ascii_lowercase().as_str() {
            "seller" | "sel" => Some(Tier::Seller),
            "distributor" | "dis" => Some(Tier::Distributor),
            "manufacturer" | "man" => Some(Tier::Manufacturer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Globally unique, human-readable order number: `{TIER}-{yyyyMMdd}-{8 chars}`.
///
/// Assigned once at creation by the tier that owns the order and used for
/// cross-tier correlation (the counterparty stores it verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number for the given tier.
    pub fn generate(tier: Tier) -> Self {
        Self::generate_at(tier, Utc::now())
    }

    /// Generates an order number with an explicit timestamp (testable).
    pub fn generate_at(tier: Tier, when: DateTime<Utc>) -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_ascii_uppercase();
        Self(format!(
            "{}-{}-{}",
            tier.code(),
            when.format("%Y%m%d"),
            suffix
        ))
    }

    /// Wraps an order number received from a peer tier.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
