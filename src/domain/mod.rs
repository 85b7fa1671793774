//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod instrument;
pub mod ohlcv;
pub mod scan;
pub mod series;
pub mod snapshot;
pub mod strategy;
