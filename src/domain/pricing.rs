//! Price domain logic centralization.
//!
//! Responsibility:
//! - `PriceRange` closed-interval arithmetic used by the range splitter
//! - bisection boundary discipline ([min, mid] / [mid + 1, max])
//! - normalization of site-formatted price strings into numbers

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Closed integer interval `[min, max]` over a price facet.
///
/// Bounds are in the site currency's consistent unit (minor or major,
/// whatever the site's filter accepts). Invariant: `min <= max`,
/// enforced by [`PriceRange::try_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
}

impl PriceRange {
    /// Build a range, rejecting inverted bounds.
    pub fn try_new(min: i64, max: i64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// Number of integer price points covered by the range.
    pub fn width(&self) -> u64 {
        (self.max - self.min) as u64 + 1
    }

    /// A single-price bucket that cannot be split further.
    pub fn is_unit(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, price: i64) -> bool {
        self.min <= price && price <= self.max
    }

    /// Bisect into two non-empty halves that exactly cover `self`.
    ///
    /// The midpoint stays in the low half; the high half starts at
    /// `mid + 1`, so the halves are disjoint with no gap. Returns
    /// `None` for a unit range.
    pub fn bisect(&self) -> Option<(Self, Self)> {
        if self.is_unit() {
            return None;
        }
        let mid = self.min + (self.max - self.min) / 2;
        Some((
            Self { min: self.min, max: mid },
            Self { min: mid + 1, max: self.max },
        ))
    }
}

impl std::fmt::Display for PriceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

static PRICE_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d,.]").expect("static pattern"));

/// Normalize a site-formatted price string into a number.
///
/// Strips currency suffixes and thousands separators (space or
/// non-breaking space), converts a decimal comma to a decimal point.
/// Returns `None` for strings with no digits; a malformed price must
/// never corrupt range bounds, the record is extracted anyway and only
/// excluded from range math.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = PRICE_JUNK.replace_all(raw, "");
    if cleaned.is_empty() {
        return None;
    }
    // "1.299,90" and "1 299,90" both mean 1299.90; a trailing comma
    // group of one or two digits is the decimal part.
    let mut s = cleaned.into_owned();
    if let Some(comma) = s.rfind(',') {
        let decimals = s.len() - comma - 1;
        if decimals <= 2 {
            s = format!("{}.{}", s[..comma].replace(['.', ','], ""), &s[comma + 1..]);
        } else {
            s = s.replace(',', "");
        }
    } else if s.matches('.').count() > 1 {
        s = s.replace('.', "");
    }
    s.parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0)
}

/// Project a parsed price onto the integer domain used for range
/// comparisons (truncation toward zero, matching the site filters).
pub fn price_point(price: f64) -> i64 {
    price.max(0.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bisect_boundary_discipline() {
        let range = PriceRange::try_new(0, 100).unwrap();
        let (lo, hi) = range.bisect().unwrap();
        assert_eq!(lo, PriceRange { min: 0, max: 50 });
        assert_eq!(hi, PriceRange { min: 51, max: 100 });
        // no overlap, no gap
        assert_eq!(lo.max + 1, hi.min);
        assert_eq!(lo.width() + hi.width(), range.width());
    }

    #[test]
    fn test_bisect_two_wide_range() {
        let range = PriceRange::try_new(7, 8).unwrap();
        let (lo, hi) = range.bisect().unwrap();
        assert!(lo.is_unit());
        assert!(hi.is_unit());
        assert_eq!(lo.min, 7);
        assert_eq!(hi.min, 8);
    }

    #[test]
    fn test_unit_range_cannot_split() {
        let range = PriceRange::try_new(50, 50).unwrap();
        assert!(range.is_unit());
        assert!(range.bisect().is_none());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(PriceRange::try_new(10, 9).is_none());
    }

    #[test]
    fn test_parse_price_czech_format() {
        assert_eq!(parse_price("1 299,90 Kč"), Some(1299.90));
        assert_eq!(parse_price("12 990 Kč"), Some(12990.0));
    }

    #[test]
    fn test_parse_price_plain_and_dot_thousands() {
        assert_eq!(parse_price("449"), Some(449.0));
        assert_eq!(parse_price("1.299.000"), Some(1_299_000.0));
        assert_eq!(parse_price("€24.99"), Some(24.99));
    }

    #[test]
    fn test_parse_price_garbage() {
        assert_eq!(parse_price("Price not defined."), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("—"), None);
    }

    #[test]
    fn test_price_point_truncates() {
        assert_eq!(price_point(1299.90), 1299);
        assert_eq!(price_point(0.4), 0);
    }
}
