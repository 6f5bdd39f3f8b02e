use lazy_static::lazy_static;
use regex::Regex;

use crate::error::CrewError;

lazy_static! {
    static ref TICKER_RE: Regex = Regex::new(r"^[A-Z0-9][A-Z0-9.\-]{0,11}$").expect("valid regex");
}

/// Trim and upper-case a user-supplied symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, CrewError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(CrewError::InvalidTicker("ticker is empty".to_string()));
    }
    if !TICKER_RE.is_match(&ticker) {
        return Err(CrewError::InvalidTicker(raw.trim().to_string()));
    }
    Ok(ticker)
}
