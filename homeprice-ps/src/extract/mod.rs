//! Field extractors
//!
//! Pure functions that parse one semi-structured raw field each into
//! typed values or categorical flags. Malformed input always degrades
//! to a missing-value marker; extractors never fail a batch.

pub mod classify;
pub mod jsonish;
pub mod rooms;
pub mod schools;
