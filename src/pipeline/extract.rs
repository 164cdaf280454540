//! Coordinate extraction: numeric filtering of OCR tokens and X/Y pairing.
//!
//! This is a heuristic. A qualifying number has at least five integer digits
//! and an optional fractional part, and must exceed a plausibility threshold
//! (a coordinate in the target reference system is always six digits or
//! more). Large numbers that are not coordinates pass the filter; decimals
//! the engine misreads are lost.
//!
//! Order matters: values are kept in encounter order because pairing assumes
//! the page lists coordinates as X, Y, X, Y, …

use crate::config::DEFAULT_MIN_COORDINATE;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Five or more digits with an optional fraction. A comma only counts as a
/// decimal separator before one to four digits; `245780,6812345` is a list.
static RE_COORDINATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{5,}(?:\.\d+|,\d{1,4})?\b").unwrap());

/// One (X, Y) tuple inferred from two consecutive qualifying numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePair {
    pub x: f64,
    pub y: f64,
}

/// Filters recognised text for plausible coordinate values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateFilter {
    min_value: f64,
}

impl Default for CoordinateFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_COORDINATE)
    }
}

impl CoordinateFilter {
    /// Values `<= min_value` are discarded.
    pub fn new(min_value: f64) -> Self {
        Self { min_value }
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Extract every qualifying value from `tokens`, in encounter order.
    ///
    /// Matches that fail to parse are skipped silently; they are OCR noise,
    /// not errors.
    pub fn extract<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<f64> {
        tokens
            .iter()
            .flat_map(|t| RE_COORDINATE.find_iter(t.as_ref()))
            .filter_map(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > self.min_value)
            .collect()
    }
}

/// Pair a flat value sequence into (X, Y) tuples.
///
/// Even indices become X, odd indices Y. An odd trailing value has no
/// partner and is dropped.
pub fn pair_coordinates(values: &[f64]) -> Vec<CoordinatePair> {
    values
        .chunks_exact(2)
        .map(|c| CoordinatePair { x: c[0], y: c[1] })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> CoordinateFilter {
        CoordinateFilter::default()
    }

    #[test]
    fn reference_scenario() {
        let tokens = ["123456", "654321", "99"];
        assert_eq!(filter().extract(&tokens), vec![123456.0, 654321.0]);
    }

    #[test]
    fn threshold_is_exclusive() {
        let tokens = ["100000", "100000.5", "99999.9"];
        assert_eq!(filter().extract(&tokens), vec![100000.5]);
    }

    #[test]
    fn short_digit_runs_never_match() {
        // 1234.56789 has only four integer digits.
        assert!(filter().extract(&["1234.56789", "9999"]).is_empty());
    }

    #[test]
    fn comma_decimal_is_normalised() {
        assert_eq!(filter().extract(&["X 654321,75"]), vec![654321.75]);
    }

    #[test]
    fn comma_between_coordinates_separates_values() {
        let tokens = ["245780,6812345", "245790 6812350"];
        let values = filter().extract(&tokens);
        assert_eq!(values, vec![245780.0, 6812345.0, 245790.0, 6812350.0]);
        assert_eq!(
            pair_coordinates(&values),
            vec![
                CoordinatePair { x: 245780.0, y: 6812345.0 },
                CoordinatePair { x: 245790.0, y: 6812350.0 }
            ]
        );
    }

    #[test]
    fn comma_before_long_digit_run_is_not_a_decimal() {
        // 12345 is not above the threshold, so only the first value survives.
        assert_eq!(filter().extract(&["245780,12345"]), vec![245780.0]);
        assert_eq!(filter().extract(&["245780,1234"]), vec![245780.1234]);
    }

    #[test]
    fn multiple_values_in_one_token_keep_order() {
        let tokens = ["P1 X=245780.12 Y=6812345.9", "P2 245790.5 6812350"];
        assert_eq!(
            filter().extract(&tokens),
            vec![245780.12, 6812345.9, 245790.5, 6812350.0]
        );
    }

    #[test]
    fn digits_glued_to_letters_are_ignored() {
        assert!(filter().extract(&["REF123456", "123456B"]).is_empty());
    }

    #[test]
    fn non_numeric_tokens_yield_nothing() {
        assert!(filter().extract(&["Plan de masse", "Échelle 1/500", ""]).is_empty());
    }

    #[test]
    fn retained_values_round_trip_through_text() {
        let values = filter().extract(&["245780.125", "6812345.5", "1000001"]);
        for v in values {
            assert_eq!(format!("{v:?}").parse::<f64>().unwrap(), v);
            assert!(v > 100_000.0);
        }
    }

    #[test]
    fn custom_threshold() {
        let f = CoordinateFilter::new(500_000.0);
        assert_eq!(f.extract(&["123456 654321"]), vec![654321.0]);
    }

    #[test]
    fn pairing_even_sequence() {
        let pairs = pair_coordinates(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            pairs,
            vec![
                CoordinatePair { x: 1.0, y: 2.0 },
                CoordinatePair { x: 3.0, y: 4.0 }
            ]
        );
    }

    #[test]
    fn pairing_drops_trailing_odd_value() {
        let pairs = pair_coordinates(&[1.0, 2.0, 3.0]);
        assert_eq!(pairs, vec![CoordinatePair { x: 1.0, y: 2.0 }]);
        assert!(pair_coordinates(&[7.0]).is_empty());
        assert!(pair_coordinates(&[]).is_empty());
    }
}
