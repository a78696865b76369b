use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an order.
///
/// Assigned once when an order is proposed, before any remote call is made,
/// and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(Uuid);

impl OrderNumber {
    /// Creates a new random order number.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order number from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderNumber {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for OrderNumber {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderNumber> for Uuid {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

/// Stock keeping unit code identifying a product in inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuCode(String);

impl SkuCode {
    /// Creates a new sku code from a string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the sku code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the code is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for SkuCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SkuCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SkuCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SkuCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SkuCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_new_creates_unique_numbers() {
        let n1 = OrderNumber::new();
        let n2 = OrderNumber::new();
        assert_ne!(n1, n2);
    }

    #[test]
    fn order_number_parses_from_display() {
        let number = OrderNumber::new();
        let parsed: OrderNumber = number.to_string().parse().unwrap();
        assert_eq!(number, parsed);
    }

    #[test]
    fn order_number_rejects_garbage() {
        assert!("not-a-uuid".parse::<OrderNumber>().is_err());
    }

    #[test]
    fn sku_code_serializes_as_plain_string() {
        let sku = SkuCode::new("iphone_13");
        assert_eq!(serde_json::to_string(&sku).unwrap(), "\"iphone_13\"");
    }

    #[test]
    fn sku_code_blank_detection() {
        assert!(SkuCode::new("   ").is_blank());
        assert!(SkuCode::new("").is_blank());
        assert!(!SkuCode::new("sku-A").is_blank());
    }

    #[test]
    fn sku_code_borrows_as_str_for_map_lookups() {
        let mut map = std::collections::HashMap::new();
        map.insert(SkuCode::new("sku-A"), true);
        assert_eq!(map.get("sku-A"), Some(&true));
    }
}
