//! Status enums for various entities.
//!
//! The backend reports statuses as free-form lowercase strings and has added
//! values over time, so every enum here keeps an `Other` variant instead of
//! failing to deserialize an unknown status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Vendor account approval status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VendorStatus {
    /// Registered, awaiting review by the marketplace.
    Pending,
    /// Account is live.
    Active,
    /// Account was reviewed and approved.
    Approved,
    /// Account was reviewed and rejected.
    Rejected,
    /// Any status this client does not know about.
    Other(String),
}

impl VendorStatus {
    /// Whether the dashboard must be gated behind the blocked-status overlay.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }

    /// Lowercase wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for VendorStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "active" => Self::Active,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Other(s),
        }
    }
}

impl From<VendorStatus> for String {
    fn from(status: VendorStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for VendorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product listing status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ProductStatus {
    /// Saved but not listed.
    #[default]
    Draft,
    /// Listed on the marketplace.
    Published,
    /// Submitted, awaiting marketplace review.
    Pending,
    /// Any status this client does not know about.
    Other(String),
}

impl ProductStatus {
    /// Lowercase wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Pending => "pending",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ProductStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Self::Draft,
            "published" | "active" => Self::Published,
            "pending" => Self::Pending,
            _ => Self::Other(s),
        }
    }
}

impl From<ProductStatus> for String {
    fn from(status: ProductStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

/// Order fulfillment status as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    /// Lowercase wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting window for sales analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl AnalyticsPeriod {
    /// Query-string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for AnalyticsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalyticsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(format!("invalid analytics period: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_status_blocked() {
        assert!(VendorStatus::Pending.is_blocked());
        assert!(VendorStatus::Rejected.is_blocked());
        assert!(!VendorStatus::Active.is_blocked());
        assert!(!VendorStatus::Approved.is_blocked());
        assert!(!VendorStatus::Other("suspended".into()).is_blocked());
    }

    #[test]
    fn test_vendor_status_deserializes_case_insensitively() {
        let status: VendorStatus = serde_json::from_str("\"Pending\"").unwrap();
        assert_eq!(status, VendorStatus::Pending);
        let status: VendorStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(status, VendorStatus::Other("on_hold".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"on_hold\"");
    }

    #[test]
    fn test_product_status_roundtrip_known_values() {
        for status in [
            ProductStatus::Draft,
            ProductStatus::Published,
            ProductStatus::Pending,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let parsed: ProductStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_order_status_accepts_us_spelling() {
        assert_eq!(OrderStatus::from("canceled".to_string()), OrderStatus::Cancelled);
    }

    #[test]
    fn test_analytics_period_parse() {
        assert_eq!("week".parse::<AnalyticsPeriod>().unwrap(), AnalyticsPeriod::Week);
        assert!("quarter".parse::<AnalyticsPeriod>().is_err());
        assert_eq!(AnalyticsPeriod::default(), AnalyticsPeriod::Month);
    }
}
