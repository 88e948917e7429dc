//! Product record extracted from listing pages.

use serde::{Deserialize, Serialize};

use crate::domain::pricing::{self, PriceRange};

/// An extracted catalog entry. Immutable; the item ledger decides
/// emit-vs-drop by `item_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Site-provided identifier, the output dedup key.
    pub item_id: String,
    pub item_name: String,
    pub item_url: String,
    /// Current selling price; `None` when the site renders no parseable price.
    pub current_price: Option<f64>,
    /// Pre-discount price, expected >= `current_price` when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Ordered breadcrumb path of the category the record came from.
    pub category: Vec<String>,
    pub in_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Set when a strike-through price was present on the listing.
    #[serde(default)]
    pub discounted: bool,
}

impl ProductRecord {
    /// Original price below current price is a data quirk worth review,
    /// never a reason to drop the record.
    pub fn price_inverted(&self) -> bool {
        matches!(
            (self.current_price, self.original_price),
            (Some(current), Some(original)) if original < current
        )
    }

    /// Projection onto the integer price domain used for range bounds.
    /// Malformed or missing prices are excluded from range math.
    pub fn price_point(&self) -> Option<i64> {
        self.current_price.map(pricing::price_point)
    }

    pub fn in_range(&self, range: &PriceRange) -> bool {
        self.price_point().is_some_and(|p| range.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(current: Option<f64>, original: Option<f64>) -> ProductRecord {
        ProductRecord {
            item_id: "X1".into(),
            item_name: "Sample".into(),
            item_url: "https://shop.example/p/x1".into(),
            current_price: current,
            original_price: original,
            currency: Some("CZK".into()),
            category: vec!["Elektro".into()],
            in_stock: true,
            image_url: None,
            discounted: original.is_some(),
        }
    }

    #[test]
    fn test_price_inverted_flag() {
        assert!(record(Some(100.0), Some(80.0)).price_inverted());
        assert!(!record(Some(80.0), Some(100.0)).price_inverted());
        assert!(!record(Some(80.0), None).price_inverted());
        assert!(!record(None, Some(100.0)).price_inverted());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(record(Some(129.9), None)).unwrap();
        assert!(json.get("itemId").is_some());
        assert!(json.get("currentPrice").is_some());
        assert!(json.get("originalPrice").is_none());
    }

    #[test]
    fn test_in_range_uses_integer_projection() {
        let rec = record(Some(50.9), None);
        assert!(rec.in_range(&PriceRange::try_new(0, 50).unwrap()));
        assert!(!rec.in_range(&PriceRange::try_new(51, 100).unwrap()));
    }
}
