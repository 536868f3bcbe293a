//! Numeric field extractors: sqft, beds, baths, stories
//!
//! All of these degrade to `None` on malformed input. Numbers use the
//! en_US convention with `,` as a thousands separator.

use once_cell::sync::Lazy;
use regex::Regex;

use super::classify::STORY_FROM_STORIES;

/// Binary bucket names for bed counts, 1..=6 then overflow
pub const BED_FEATURES: [&str; 7] = [
    "1-BEDROOM",
    "2-BEDROOMS",
    "3-BEDROOMS",
    "4-BEDROOMS",
    "5-BEDROOMS",
    "6-BEDROOMS",
    "OTHER-BEDROOMS",
];

/// Binary bucket names for bath counts, 1..=6 then overflow
pub const BATH_FEATURES: [&str; 7] = [
    "1-BATHROOM",
    "2-BATHROOMS",
    "3-BATHROOMS",
    "4-BATHROOMS",
    "5-BATHROOMS",
    "6-BATHROOMS",
    "OTHER-BATHROOMS",
];

static ACRES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\W)acres($|\W)").unwrap_or_else(|e| panic!("{e}")));
static SQFT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\W)sqft($|\W)").unwrap_or_else(|e| panic!("{e}")));
static BATHROOMS_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\W)Bathrooms:($|\W)").unwrap_or_else(|e| panic!("{e}")));

/// Parse a number with `,` thousands separators
pub fn parse_locale_f64(value: &str) -> Option<f64> {
    let cleaned = value.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a living-area string (`"1,200 sqft"`) to square feet.
///
/// With several whitespace tokens the number is the one before the
/// trailing unit token; a lone token is taken as-is.
pub fn sqft_to_f64(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.trim().split(' ').collect();
    let token = if parts.len() > 1 {
        parts[parts.len() - 2]
    } else {
        *parts.first()?
    };
    parse_locale_f64(token)
}

/// First whitespace token as a rounded integer
pub fn first_word_int(value: &str) -> Option<i64> {
    let token = value.trim().split(' ').next()?;
    parse_locale_f64(token).map(|v| v.round() as i64)
}

/// Last whitespace token as a rounded integer
pub fn last_word_int(value: &str) -> Option<i64> {
    let token = value.trim().split(' ').next_back()?;
    parse_locale_f64(token).map(|v| v.round() as i64)
}

/// Reject beds values that actually carry lot area (`acres`, `sqft`)
pub fn beds_value(value: &str) -> Option<&str> {
    if ACRES_RE.is_match(value) || SQFT_RE.is_match(value) {
        None
    } else {
        Some(value)
    }
}

/// Bed count from the beds field (first word)
pub fn beds_to_int(value: &str) -> Option<i64> {
    first_word_int(beds_value(value)?)
}

/// Bath count from the baths field. A `Bathrooms:` label puts the
/// count at the end of the string, otherwise it leads.
pub fn baths_to_int(value: &str) -> Option<i64> {
    if BATHROOMS_LABEL_RE.is_match(value) {
        last_word_int(value)
    } else {
        first_word_int(value)
    }
}

/// Story count from the stories field.
///
/// A numeric value is rounded and clamped to at least 1. Otherwise the
/// text is matched against the stories vocabulary and the 1-based
/// bucket ordinal is the count.
pub fn story_count(value: &str) -> Option<i64> {
    if let Some(parsed) = parse_locale_f64(value) {
        let count = parsed.round() as i64;
        return Some(count.max(1));
    }
    STORY_FROM_STORIES.first_match_ordinal(value).map(|n| n as i64)
}

/// Flags for a 7-feature room bucket list: counts 1..=6 set their own
/// bucket, 7 and above set the overflow bucket, anything else sets
/// nothing
pub fn room_flags(count: i64) -> [u8; 7] {
    let mut flags = [0u8; 7];
    if (1..=6).contains(&count) {
        flags[(count - 1) as usize] = 1;
    } else if count >= 7 {
        flags[6] = 1;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_numbers() {
        assert_eq!(parse_locale_f64("1,200"), Some(1200.0));
        assert_eq!(parse_locale_f64(" 3.5 "), Some(3.5));
        assert_eq!(parse_locale_f64(""), None);
        assert_eq!(parse_locale_f64("n/a"), None);
    }

    #[test]
    fn sqft_takes_token_before_unit() {
        assert_eq!(sqft_to_f64("1,200 sqft"), Some(1200.0));
        assert_eq!(sqft_to_f64("Total interior livable area: 1,812 sqft"), Some(1812.0));
        assert_eq!(sqft_to_f64("1500"), Some(1500.0));
        assert_eq!(sqft_to_f64("--"), None);
    }

    #[test]
    fn beds_rejects_lot_area() {
        assert_eq!(beds_to_int("3 Beds"), Some(3));
        assert_eq!(beds_to_int("4"), Some(4));
        assert_eq!(beds_to_int("9,147 sqft"), None);
        assert_eq!(beds_to_int("0.32 acres"), None);
    }

    #[test]
    fn baths_label_moves_count_to_end() {
        assert_eq!(baths_to_int("2 Baths"), Some(2));
        assert_eq!(baths_to_int("Bathrooms: 3"), Some(3));
        assert_eq!(baths_to_int("2.5"), Some(2));
        assert_eq!(baths_to_int("none"), None);
    }

    #[test]
    fn story_numeric_and_text() {
        assert_eq!(story_count("2"), Some(2));
        assert_eq!(story_count("1.5"), Some(2));
        assert_eq!(story_count("0"), Some(1));
        assert_eq!(story_count("One Level"), Some(1));
        assert_eq!(story_count("Tri-Level"), Some(3));
        assert_eq!(story_count("Ranch"), None);
    }

    #[test]
    fn room_buckets() {
        assert_eq!(room_flags(3), [0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(room_flags(6), [0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(room_flags(9), [0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(room_flags(0), [0; 7]);
        assert_eq!(BED_FEATURES[2], "3-BEDROOMS");
        assert_eq!(BATH_FEATURES[1], "2-BATHROOMS");
    }
}
