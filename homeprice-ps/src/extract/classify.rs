//! Regex pattern-table classifiers
//!
//! A `PatternTable` is a fixed, ordered set of named binary features,
//! each defined by one or more case-insensitive word-boundary regexes.
//! The same mechanism is reused with different tables for property
//! type, story counts (two tables — the property-type vocabulary and
//! the stories-field vocabulary differ), cooling, heating, and parking.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered table of named binary regex features
pub struct PatternTable {
    features: Vec<(&'static str, Vec<Regex>)>,
}

impl PatternTable {
    fn new(defs: &[(&'static str, &[&str])]) -> Self {
        let features = defs
            .iter()
            .map(|(name, patterns)| {
                let compiled = patterns
                    .iter()
                    .map(|p| {
                        Regex::new(&format!("(?i){}", p))
                            .unwrap_or_else(|e| panic!("bad pattern for {}: {}", name, e))
                    })
                    .collect();
                (*name, compiled)
            })
            .collect();
        Self { features }
    }

    /// Feature names in table order
    pub fn feature_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Binary flags for `text`, one per feature in table order
    pub fn flags(&self, text: &str) -> Vec<u8> {
        self.features
            .iter()
            .map(|(_, patterns)| u8::from(patterns.iter().any(|p| p.is_match(text))))
            .collect()
    }

    /// 1-based ordinal of the first feature whose patterns match
    pub fn first_match_ordinal(&self, text: &str) -> Option<usize> {
        self.features
            .iter()
            .position(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
            .map(|i| i + 1)
    }
}

/// Property-type binary features
pub static PROPERTY_TYPE: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        ("SINGLE-FAMILY", &[r"(^|\W)single-family($|\W)", r"(^|\W)Single Family($|\W)"]),
        ("MULTI-FAMILY", &[r"(^|\W)multi-family($|\W)", r"(^|\W)Multi Family($|\W)"]),
        ("CONDOMINIMUM", &[r"(^|\W)condo($|\W)", r"(^|\W)Condominium($|\W)"]),
        ("LAND", &[r"(^|\W)lot/land($|\W)", r"(^|\W)Land($|\W)"]),
        ("TOWNHOUSE", &[r"(^|\W)townhouse($|\W)"]),
        ("TRADITIONAL", &[r"(^|\W)Traditional($|\W)"]),
        ("MODERN", &[r"(^|\W)Contemporary($|\W)", r"(^|\W)Modern($|\W)"]),
        ("RANCH", &[r"(^|\W)Ranch($|\W)"]),
        ("DETACHED", &[r"(^|\W)Single Detached($|\W)", r"(^|\W)Detached($|\W)"]),
    ])
});

/// Story-count features matched against the property-type text
pub static STORY_FROM_PROPERTY_TYPE: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        (
            "1-STORY",
            &[r"(^|\W)One Story($|\W)", r"(^|\W)1 Story($|\W)", r"(^|\W)Single Level($|\W)"],
        ),
        (
            "2-STORY",
            &[
                r"(^|\W)2 Story($|\W)",
                r"(^|\W)Two Story($|\W)",
                r"(^|\W)2 Stories($|\W)",
                r"(^|\W)Bi-Level($|\W)",
            ],
        ),
        (
            "3-STORY",
            &[r"(^|\W)3 Story($|\W)", r"(^|\W)3 Stories($|\W)", r"(^|\W)Tri-Level($|\W)"],
        ),
        ("OTHER-STORY", &[r"(^|\W)8\+ Stories($|\W)"]),
    ])
});

/// Story-count features matched against the dedicated stories field
/// (same buckets, different source vocabulary)
pub static STORY_FROM_STORIES: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        (
            "1-STORY",
            &[
                r"(^|\W)1 Story($|\W)",
                r"(^|\W)One Story($|\W)",
                r"(^|\W)1 Level($|\W)",
                r"(^|\W)One Level($|\W)",
                r"(^|\W)One($|\W)",
            ],
        ),
        (
            "2-STORY",
            &[
                r"(^|\W)2 Story($|\W)",
                r"(^|\W)2 Stories($|\W)",
                r"(^|\W)2 Level($|\W)",
                r"(^|\W)1.5 Story($|\W)",
                r"(^|\W)1.5 Level($|\W)",
                r"(^|\W)1.5 Stories($|\W)",
                r"(^|\W)Two($|\W)",
                r"(^|\W)Bi-Level($|\W)",
                r"(^|\W)1-2 Stories($|\W)",
            ],
        ),
        (
            "3-STORY",
            &[
                r"(^|\W)3 Story($|\W)",
                r"(^|\W)Tri-Level($|\W)",
                r"(^|\W)Tri Level($|\W)",
                r"(^|\W)2 Or More Stories($|\W)",
                r"(^|\W)3 Level($|\W)",
                r"(^|\W)3 Stories($|\W)",
            ],
        ),
        (
            "OTHER-STORY",
            &[
                r"(^|\W)4 Story($|\W)",
                r"(^|\W)Fourplex($|\W)",
                r"(^|\W)Three Or More($|\W)",
                r"(^|\W)3\+ Story($|\W)",
                r"(^|\W)3\+($|\W)",
            ],
        ),
    ])
});

/// Cooling-type binary features
pub static COOLING: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        ("CENTRAL_COOLING", &[r"(^|\W)Central($|\W)"]),
        (
            "COOLING",
            &[
                r"(^|\W)A/C($|\W)",
                r"(^|\W)AC($|\W)",
                r"(^|\W)Cooling($|\W)",
                r"(^|\W)Air Conditioning($|\W)",
                r"(^|\W)Air($|\W)",
                r"(^|\W)Refrigeration($|\W)",
            ],
        ),
        ("HEATING", &[r"(^|\W)Heating($|\W)"]),
        ("GAS", &[r"(^|\W)Gas($|\W)"]),
        ("ELECTRIC", &[r"(^|\W)Electric($|\W)"]),
        ("ZONED", &[r"(^|\W)Zoned($|\W)"]),
        ("HEAT_PUMP", &[r"(^|\W)Heat Pump($|\W)"]),
        ("WALL", &[r"(^|\W)Wall($|\W)"]),
    ])
});

/// Heating-type binary features
pub static HEATING: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        ("FORCED_AIR_HEAT", &[r"(^|\W)Forced Air($|\W)"]),
        ("OTHER_HEAT", &[r"(^|\W)Other($|\W)"]),
        ("ELECTRIC", &[r"(^|\W)Central Electric($|\W)", r"(^|\W)Electric($|\W)"]),
        ("GAS", &[r"(^|\W)Gas($|\W)"]),
        ("COOLING", &[r"(^|\W)Air Conditioning($|\W)"]),
        ("AIR_HEAT", &[r"(^|\W)Air($|\W)"]),
        ("HEAT_PUMP", &[r"(^|\W)Heat Pump($|\W)"]),
        ("CENTRAL_HEAT", &[r"(^|\W)Central($|\W)"]),
        ("BASE_BOARD", &[r"(^|\W)Baseboard($|\W)"]),
        ("WALL", &[r"(^|\W)Wall($|\W)"]),
        ("ZONED", &[r"(^|\W)Zoned($|\W)"]),
        ("HEATING", &[r"(^|\W)Heating($|\W)"]),
    ])
});

/// Parking type and place-count binary features
pub static PARKING: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        ("GARAGE", &[r"(^|\W)Garage($|\W)"]),
        ("ATTACHED", &[r"(^|\W)Attached($|\W)"]),
        ("DETACHED", &[r"(^|\W)Detached($|\W)"]),
        ("CARPOPT", &[r"(^|\W)Carport($|\W)"]),
        ("OFF_STREET", &[r"(^|\W)Off Street($|\W)"]),
        ("ON_STREET", &[r"(^|\W)On Street($|\W)"]),
        ("PARKING", &[r"(^|\W)Parking($|\W)"]),
        ("1_PLACE", &[r"(^|\W)1 space($|\W)", r"(^|\W)1 Car($|\W)", r"^1$"]),
        ("2_PLACE", &[r"(^|\W)2 spaces($|\W)", r"(^|\W)2 Car($|\W)", r"^2$"]),
        ("3_PLACE", &[r"(^|\W)3 spaces($|\W)", r"^3$"]),
        (
            "MORE_PLACES",
            &[
                r"(^|\W)4 spaces($|\W)",
                r"(^|\W)5 spaces($|\W)",
                r"(^|\W)8 spaces($|\W)",
                r"(^|\W)7 spaces($|\W)",
                r"(^|\W)9 spaces($|\W)",
                r"(^|\W)10 spaces($|\W)",
                r"^4$",
                r"^5$",
                r"^6$",
                r"^8$",
            ],
        ),
    ])
});
