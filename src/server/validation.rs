use std::num::IntErrorKind;

use serde_json::Value;

use crate::error::RelayError;

pub const DEFAULT_RETMAX: u32 = 30;
pub const MAX_RETMAX: u32 = 100;

/// Chat body must be an object carrying a non-empty `messages` array of objects.
pub fn validate_chat_body(body: &Value) -> Result<(), RelayError> {
    let valid = body
        .get("messages")
        .and_then(Value::as_array)
        .is_some_and(|messages| !messages.is_empty() && messages.iter().all(Value::is_object));

    if valid {
        Ok(())
    } else {
        Err(RelayError::InvalidRequest("invalid request body".into()))
    }
}

/// The term is forwarded as given; only blank input is rejected.
pub fn validate_term(term: Option<&str>) -> Result<&str, RelayError> {
    match term {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(RelayError::InvalidRequest("search term is required".into())),
    }
}

fn is_pmid(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `^\d+$`
pub fn validate_pmid(id: Option<&str>) -> Result<&str, RelayError> {
    match id {
        Some(id) if is_pmid(id) => Ok(id),
        _ => Err(invalid_pmid()),
    }
}

/// `^\d+(,\d+)*$`
pub fn validate_pmid_list(id: Option<&str>) -> Result<&str, RelayError> {
    match id {
        Some(ids) if ids.split(',').all(is_pmid) => Ok(ids),
        _ => Err(invalid_pmid()),
    }
}

fn invalid_pmid() -> RelayError {
    RelayError::InvalidRequest("invalid PubMed ID".into())
}

/// Reads the leading integer (optional sign, then digits), so `"10abc"` and
/// `"10.7"` both mean 10. Absent, unparseable or non-positive values fall back
/// to the default; anything above the ceiling (including overflow) is clamped.
pub fn clamp_retmax(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim_start) else {
        return DEFAULT_RETMAX;
    };
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let digits_end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];

    if negative || digits.is_empty() {
        return DEFAULT_RETMAX;
    }
    match digits.parse::<u64>() {
        Ok(0) => DEFAULT_RETMAX,
        Ok(n) => n.min(u64::from(MAX_RETMAX)) as u32,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => MAX_RETMAX,
        Err(_) => DEFAULT_RETMAX,
    }
}
