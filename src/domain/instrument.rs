//! Instrument universe entries and code list parsing.

use std::collections::HashSet;

/// One row of the scan universe. Fundamental fields are whatever the
/// universe listing provided; absent values stay absent and are never
/// defaulted by strategies.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    pub market: String,
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub market_cap: Option<f64>,
}

impl Instrument {
    pub fn new(code: impl Into<String>, name: impl Into<String>, market: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            market: market.into(),
            pe: None,
            pb: None,
            market_cap: None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CodeListError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

/// Parse a comma-separated code list, trimming whitespace and rejecting
/// duplicates. Codes are uppercased for case-insensitive matching.
pub fn parse_codes(input: &str) -> Result<Vec<String>, CodeListError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CodeListError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if seen.contains(&code) {
            return Err(CodeListError::DuplicateCode(code));
        }
        seen.insert(code.clone());
        codes.push(code);
    }

    Ok(codes)
}
