//! Categorical encodings: binary encoder and ordinal range bucketing

use serde::{Deserialize, Serialize};

/// Binary encoder over a fitted category vocabulary.
///
/// Categories get ordinals 1..=k in first-appearance order; values
/// outside the vocabulary map to 0. Each ordinal is emitted as its
/// binary digits over `bit_width()` columns, most significant bit
/// first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryEncoder {
    categories: Vec<String>,
}

impl BinaryEncoder {
    /// Fit the vocabulary from values in stream order
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for value in values {
            if !categories.iter().any(|c| c == value) {
                categories.push(value.to_string());
            }
        }
        Self { categories }
    }

    /// 1-based ordinal of a category, 0 for unknown values
    pub fn ordinal(&self, value: &str) -> usize {
        self.categories
            .iter()
            .position(|c| c == value)
            .map_or(0, |i| i + 1)
    }

    /// Number of bit columns needed for the largest ordinal
    pub fn bit_width(&self) -> usize {
        let max_ordinal = self.categories.len();
        (usize::BITS - max_ordinal.leading_zeros()).max(1) as usize
    }

    /// Bit column names, most significant first
    pub fn column_names(&self, base: &str) -> Vec<String> {
        (0..self.bit_width()).map(|i| format!("{base}_{i}")).collect()
    }

    /// Encode one value as its ordinal's binary digits, MSB first
    pub fn encode(&self, value: &str) -> Vec<u8> {
        let ordinal = self.ordinal(value);
        let width = self.bit_width();
        (0..width)
            .map(|i| ((ordinal >> (width - 1 - i)) & 1) as u8)
            .collect()
    }
}

/// Bucket a value into `n_cats` equal segments of `[min_val, max_val]`.
///
/// Walks segment boundaries from the low end, so the result is 0 for
/// values at or below `min_val` and `n_cats` for values beyond
/// `max_val` or non-comparable values (NaN).
pub fn ord_cat(val: f64, min_val: f64, max_val: f64, n_cats: usize) -> usize {
    let step = (max_val - min_val) / n_cats as f64;

    let mut cur_val = min_val;
    let mut cur_cat = 0;

    while cur_cat < n_cats && cur_val < val && cur_val < max_val {
        cur_val += step;
        cur_cat += 1;
    }

    cur_cat
}
