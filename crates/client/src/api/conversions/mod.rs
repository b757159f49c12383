//! Normalization from backend wire shapes to the canonical types.
//!
//! The backend wraps most payloads in `{ status?, message?, data? }` but is
//! inconsistent about field names and number encodings. Every endpoint has
//! exactly one `convert_*` function here; nothing outside this module reads
//! raw response JSON.

pub mod dashboard;
pub mod products;
pub mod profile;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::error::ApiError;

pub use dashboard::{convert_dashboard, convert_sales_analytics};
pub use products::{convert_categories, convert_product, convert_product_page};
pub use profile::{convert_auth_session, convert_profile, convert_reset_grant};

/// The `data` member of an envelope, or the body itself when there is none.
fn payload(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Deserialize a wire struct, logging shape mismatches.
fn from_wire<T: DeserializeOwned>(what: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| {
        error!(what, error = %e, "Malformed API payload");
        ApiError::Decode(format!("{what}: {e}"))
    })
}

fn malformed(what: &str, reason: &str) -> ApiError {
    error!(what, reason, "Malformed API payload");
    ApiError::Decode(format!("{what}: {reason}"))
}

/// A number the backend may send either as JSON number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(serde_json::Number),
    Text(String),
}

impl WireNumber {
    fn to_decimal(&self) -> Option<Decimal> {
        let text = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };
        text.parse::<Decimal>()
            .ok()
            .or_else(|| Decimal::from_scientific(&text).ok())
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn to_u64(&self) -> Option<u64> {
        self.to_i64().and_then(|n| u64::try_from(n).ok())
    }
}

fn decimal_or_zero(n: Option<&WireNumber>) -> Decimal {
    n.and_then(WireNumber::to_decimal).unwrap_or_default()
}

fn count(n: Option<&WireNumber>) -> u64 {
    n.and_then(WireNumber::to_u64).unwrap_or(0)
}

/// Parse an RFC 3339 timestamp, dropping anything unparseable.
fn timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// First non-blank string among the candidates.
fn first_text(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_unwraps_envelope() {
        assert_eq!(payload(json!({"message": "ok", "data": {"a": 1}})), json!({"a": 1}));
        assert_eq!(payload(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(payload(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_wire_number_accepts_both_encodings() {
        let n: WireNumber = serde_json::from_value(json!(19.99)).unwrap();
        assert_eq!(n.to_decimal().unwrap().to_string(), "19.99");
        let n: WireNumber = serde_json::from_value(json!(" 20.50 ")).unwrap();
        assert_eq!(n.to_decimal().unwrap().to_string(), "20.50");
        let n: WireNumber = serde_json::from_value(json!("12")).unwrap();
        assert_eq!(n.to_i64(), Some(12));
        let n: WireNumber = serde_json::from_value(json!(-3)).unwrap();
        assert_eq!(n.to_u64(), None);
    }

    #[test]
    fn test_timestamp_parsing() {
        assert!(timestamp(Some("2024-03-01T10:00:00.000Z")).is_some());
        assert!(timestamp(Some("yesterday")).is_none());
        assert!(timestamp(None).is_none());
    }

    #[test]
    fn test_first_text_skips_blank() {
        assert_eq!(
            first_text([None, Some("  ".to_string()), Some("b".to_string())]),
            Some("b".to_string())
        );
    }
}
