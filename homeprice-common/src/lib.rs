//! Shared types for the homeprice services
//!
//! Error taxonomy and configuration resolution used by the prediction
//! service and the fit CLI.

pub mod config;
pub mod error;

pub use error::{Error, Result};
