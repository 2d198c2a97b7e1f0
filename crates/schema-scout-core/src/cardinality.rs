//! Heuristic distinct-value estimation from column min/max statistics.
//!
//! Only the first row group's min, max and non-null count are available, so the
//! estimate classifies the shape of the min/max pair instead of counting anything.
//! The thresholds and branch order are fixed: masking decisions downstream depend
//! on them.

/// A column whose estimated cardinality ratio is above this value is flagged as
/// masked.
pub const MASKED_RATIO_THRESHOLD: f64 = 0.25;

const IDENTIFIER_FACTOR: f64 = 0.9;
const VARYING_LENGTH_FACTOR: f64 = 0.8;
const DEFAULT_FACTOR: f64 = 0.5;
const VARYING_LENGTH_DIFF: usize = 5;

/// Min/max summary of a string column chunk.
#[derive(Debug, Clone, Copy)]
pub struct StringStats<'a> {
    pub has_min_max: bool,
    pub min: Option<&'a str>,
    pub max: Option<&'a str>,
    /// Non-null value count.
    pub num_values: u64,
}

/// Estimate the number of distinct values in a string column.
///
/// Returns `None` when min/max are missing or empty; callers must treat that as
/// "cardinality unknown".
pub fn estimate_cardinality(stats: &StringStats<'_>) -> Option<u64> {
    if !stats.has_min_max {
        return None;
    }
    let (min, max) = match (stats.min, stats.max) {
        (Some(min), Some(max)) if !min.is_empty() && !max.is_empty() => (min, max),
        _ => return None,
    };
    let n = stats.num_values;

    // Identifier-like values, e.g. "010100-5803".
    if min.chars().any(|c| c.is_ascii_digit()) && min.chars().any(|c| !c.is_alphanumeric()) {
        return Some(scale(n, IDENTIFIER_FACTOR));
    }

    if is_all_digits(min) && is_all_digits(max) {
        return Some(numeric_range(min, max).min(u128::from(n)) as u64);
    }

    if min.chars().count().abs_diff(max.chars().count()) > VARYING_LENGTH_DIFF {
        return Some(scale(n, VARYING_LENGTH_FACTOR));
    }

    Some(scale(n, DEFAULT_FACTOR))
}

/// `estimate / num_values`, or `None` for an empty column.
pub fn cardinality_ratio(estimate: u64, num_values: u64) -> Option<f64> {
    if num_values == 0 {
        return None;
    }
    Some(estimate as f64 / num_values as f64)
}

pub fn is_masked(ratio: Option<f64>) -> bool {
    ratio.is_some_and(|r| r > MASKED_RATIO_THRESHOLD)
}

fn scale(n: u64, factor: f64) -> u64 {
    (n as f64 * factor).round() as u64
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// `max - min` for two digit strings, clamped at zero. Values too long for `u128`
/// saturate, which leaves the value count as the estimate.
fn numeric_range(min: &str, max: &str) -> u128 {
    match (min.parse::<u128>(), max.parse::<u128>()) {
        (Ok(lo), Ok(hi)) => hi.saturating_sub(lo),
        (Ok(_), Err(_)) => u128::MAX,
        (Err(_), Ok(_)) => 0,
        (Err(_), Err(_)) => {
            // Both overflow: compare as decimal strings of equal digit count.
            let (lo, hi) = (min.trim_start_matches('0'), max.trim_start_matches('0'));
            if (hi.len(), hi) > (lo.len(), lo) {
                u128::MAX
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats<'a>(min: &'a str, max: &'a str, num_values: u64) -> StringStats<'a> {
        StringStats {
            has_min_max: true,
            min: Some(min),
            max: Some(max),
            num_values,
        }
    }

    #[test]
    fn test_identifier_like_values() {
        assert_eq!(estimate_cardinality(&stats("010100-5803", "999999-9999", 1000)), Some(900));
    }

    #[test]
    fn test_pure_digits_use_numeric_range() {
        assert_eq!(estimate_cardinality(&stats("1", "100", 50)), Some(50));
        assert_eq!(estimate_cardinality(&stats("10", "30", 50)), Some(20));
    }

    #[test]
    fn test_inconsistent_numeric_range_is_zero() {
        assert_eq!(estimate_cardinality(&stats("500", "20", 50)), Some(0));
    }

    #[test]
    fn test_huge_digit_strings_saturate() {
        let min = "1";
        let max = "9".repeat(60);
        assert_eq!(estimate_cardinality(&stats(min, &max, 42)), Some(42));
    }

    #[test]
    fn test_varying_lengths() {
        assert_eq!(estimate_cardinality(&stats("A", "ABCDEFGHIJKL", 200)), Some(160));
    }

    #[test]
    fn test_length_difference_of_five_is_default() {
        assert_eq!(estimate_cardinality(&stats("A", "ABCDEF", 200)), Some(100));
    }

    #[test]
    fn test_default_branch() {
        assert_eq!(estimate_cardinality(&stats("AB", "CD", 10)), Some(5));
    }

    #[test]
    fn test_branch_order_identifier_wins_over_length() {
        // Digit plus separator in min takes priority over the length rule.
        assert_eq!(estimate_cardinality(&stats("1-a", "abcdefghijklmnop", 100)), Some(90));
    }

    #[test]
    fn test_separator_only_in_max_is_not_identifier() {
        assert_eq!(estimate_cardinality(&stats("ab", "cd-9", 100)), Some(50));
    }

    #[test]
    fn test_missing_or_empty_min_max() {
        let mut s = stats("a", "b", 10);
        s.has_min_max = false;
        assert_eq!(estimate_cardinality(&s), None);

        assert_eq!(estimate_cardinality(&stats("", "b", 10)), None);
        assert_eq!(estimate_cardinality(&stats("a", "", 10)), None);

        let no_max = StringStats {
            has_min_max: true,
            min: Some("a"),
            max: None,
            num_values: 10,
        };
        assert_eq!(estimate_cardinality(&no_max), None);
    }

    #[test]
    fn test_ratio_and_masking_threshold() {
        assert_eq!(cardinality_ratio(5, 10), Some(0.5));
        assert_eq!(cardinality_ratio(0, 0), None);

        assert!(is_masked(Some(0.26)));
        assert!(!is_masked(Some(0.25)));
        assert!(!is_masked(None));
    }
}
