//! School-summary extractor
//!
//! Parses the `schools` blob (a near-JSON array of school records) into
//! rating count, mean rating, served grade categories, and min/mean
//! distance in miles.

use serde_json::Value;

use super::jsonish::parse_jsonish;
use super::rooms::parse_locale_f64;

/// Coarse school grade categories, sorted order: H < K < M < PK
pub const GRADE_CATEGORIES: [&str; 4] = ["PK", "K", "M", "H"];

/// Derived summary of the nearby-schools field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchoolSummary {
    /// Number of listed ratings
    pub count: f64,
    /// Mean numeric rating (0 when no ratings)
    pub avg_rating: f64,
    /// De-duplicated, sorted grade categories (subset of PK/K/M/H)
    pub grades: Vec<String>,
    /// Minimum distance in miles (0 when no distances)
    pub min_distance: f64,
    /// Mean distance in miles (0 when no distances)
    pub avg_distance: f64,
}

/// Summarize the `schools` blob; unparsable input yields `None`
pub fn summarize(value: &str) -> Option<SchoolSummary> {
    let parsed = parse_jsonish(value)?;
    let first = parsed.as_array()?.first()?;

    let ratings = str_items(first.get("rating")?);
    let data = first.get("data")?;
    let distances = str_items(data.get("Distance")?);
    let grade_strs = str_items(data.get("Grades")?);

    let rating_values: Vec<f64> = ratings.iter().map(|r| rating_to_int(r) as f64).collect();
    let avg_rating = mean(&rating_values);

    let miles: Vec<f64> = distances.iter().filter_map(|d| distance_to_miles(d)).collect();
    let min_distance = miles.iter().copied().fold(f64::INFINITY, f64::min);

    let mut grades = Vec::new();
    for grade in &grade_strs {
        expand_grades(&preprocess_grade(grade), &mut grades);
    }
    grades.sort();
    grades.dedup();

    Some(SchoolSummary {
        count: ratings.len() as f64,
        avg_rating,
        grades,
        min_distance: if miles.is_empty() { 0.0 } else { min_distance },
        avg_distance: mean(&miles),
    })
}

fn str_items(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Convert a school rating string to an integer.
///
/// `"8/10"` takes the numerator; a non-numeric numerator with a numeric
/// denominator (letter grades such as `"A/10"`) takes the denominator —
/// full marks on the stated scale. Empty, `NA`, `NR`, or anything
/// containing `NONE` is 0, as is any other unparsable form.
pub fn rating_to_int(value: &str) -> i64 {
    let value = value.trim().to_uppercase();

    if value.is_empty() || value == "NA" || value == "NR" || value.contains("NONE") {
        return 0;
    }

    if let Some((numerator, denominator)) = value.split_once('/') {
        if let Ok(n) = numerator.trim().parse::<i64>() {
            return n;
        }
        return denominator.trim().parse::<i64>().unwrap_or(0);
    }

    value.parse::<i64>().unwrap_or(0)
}

/// Convert a distance string (`"0.6mi"`) to miles
pub fn distance_to_miles(value: &str) -> Option<f64> {
    let upper = value.trim().to_uppercase();
    parse_locale_f64(upper.trim_end_matches("MI").trim())
}

/// Prepare a grade-range string for expansion: `PK`→0, `K`→1, uniform
/// dash separators
pub fn preprocess_grade(value: &str) -> String {
    value
        .replace(" to ", "-")
        .replace("Preschool", "PK")
        .to_uppercase()
        .replace("PK", "0")
        .replace('K', "1")
        .replace('\u{2013}', "-")
}

/// Map a grade index to its coarse category
pub fn grade_category(index: i64) -> &'static str {
    if index == 0 {
        "PK"
    } else if index > 0 && index <= 5 {
        "K"
    } else if index > 5 && index <= 8 {
        "M"
    } else {
        "H"
    }
}

/// Expand a preprocessed grade string (`"1-5"`, `"0-8,9-12"`) into
/// coarse categories, walking ranges inclusive
pub fn expand_grades(value: &str, results: &mut Vec<String>) {
    let value = value.trim().to_uppercase();

    if value.is_empty() || value == "N/A" || value == "NA" {
        return;
    }

    if value.contains(',') {
        for part in value.split(',') {
            expand_grades(part, results);
        }
    } else if let Some((lo, hi)) = value.split_once('-') {
        let (Ok(lo), Ok(hi)) = (lo.trim().parse::<i64>(), hi.trim().parse::<i64>()) else {
            return;
        };
        for index in lo..=hi {
            results.push(grade_category(index).to_string());
        }
    } else if let Ok(index) = value.parse::<i64>() {
        results.push(grade_category(index).to_string());
    }
}
