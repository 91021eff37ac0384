//! Deterministic address normalization
//!
//! `normalize` is idempotent: applying it to its own output returns the same
//! string. The parsed-JSON form keeps whatever components could be picked out
//! of the raw input.

use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::HashMap;

/// Common street-suffix and directional abbreviations, expanded during
/// normalization. Keys are compared after lowercasing and punctuation strip.
static ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("st", "street"),
        ("ave", "avenue"),
        ("av", "avenue"),
        ("rd", "road"),
        ("dr", "drive"),
        ("blvd", "boulevard"),
        ("ln", "lane"),
        ("ct", "court"),
        ("pl", "place"),
        ("sq", "square"),
        ("hwy", "highway"),
        ("pkwy", "parkway"),
        ("rte", "route"),
        ("n", "north"),
        ("s", "south"),
        ("e", "east"),
        ("w", "west"),
        ("ne", "northeast"),
        ("nw", "northwest"),
        ("se", "southeast"),
        ("sw", "southwest"),
        ("mt", "mount"),
        ("ft", "fort"),
    ])
});

/// Full state names to USPS two-letter codes.
static STATE_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("alabama", "AL"),
        ("alaska", "AK"),
        ("arizona", "AZ"),
        ("arkansas", "AR"),
        ("california", "CA"),
        ("colorado", "CO"),
        ("connecticut", "CT"),
        ("delaware", "DE"),
        ("florida", "FL"),
        ("georgia", "GA"),
        ("hawaii", "HI"),
        ("idaho", "ID"),
        ("illinois", "IL"),
        ("indiana", "IN"),
        ("iowa", "IA"),
        ("kansas", "KS"),
        ("kentucky", "KY"),
        ("louisiana", "LA"),
        ("maine", "ME"),
        ("maryland", "MD"),
        ("massachusetts", "MA"),
        ("michigan", "MI"),
        ("minnesota", "MN"),
        ("mississippi", "MS"),
        ("missouri", "MO"),
        ("montana", "MT"),
        ("nebraska", "NE"),
        ("nevada", "NV"),
        ("new hampshire", "NH"),
        ("new jersey", "NJ"),
        ("new mexico", "NM"),
        ("new york", "NY"),
        ("north carolina", "NC"),
        ("north dakota", "ND"),
        ("ohio", "OH"),
        ("oklahoma", "OK"),
        ("oregon", "OR"),
        ("pennsylvania", "PA"),
        ("rhode island", "RI"),
        ("south carolina", "SC"),
        ("south dakota", "SD"),
        ("tennessee", "TN"),
        ("texas", "TX"),
        ("utah", "UT"),
        ("vermont", "VT"),
        ("virginia", "VA"),
        ("washington", "WA"),
        ("west virginia", "WV"),
        ("wisconsin", "WI"),
        ("wyoming", "WY"),
        ("district of columbia", "DC"),
    ])
});

/// Canonicalize a state string to its two-letter USPS code, if recognized.
pub fn canonical_state(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(trimmed.to_ascii_uppercase());
    }
    STATE_CODES
        .get(trimmed.to_ascii_lowercase().as_str())
        .map(|s| s.to_string())
}

/// Normalize a free-form address: lowercase, strip punctuation, collapse
/// whitespace, expand common abbreviations.
pub fn normalize(raw: &str) -> String {
    let mut out = Vec::new();
    let cleaned = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>();
    for token in cleaned.split_whitespace() {
        match ABBREVIATIONS.get(token) {
            Some(full) => out.push(*full),
            None => out.push(token),
        }
    }
    out.join(" ")
}

/// Best-effort parse of a raw address into components, returned as JSON.
///
/// A trailing 5-digit token is treated as a zipcode; a trailing state token
/// (code or full name) is canonicalized.
pub fn parse(raw: &str) -> serde_json::Value {
    let normalized = normalize(raw);
    let mut tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();

    let zipcode = tokens
        .last()
        .filter(|t| t.len() == 5 && t.chars().all(|c| c.is_ascii_digit()))
        .map(|t| t.to_string());
    if zipcode.is_some() {
        tokens.pop();
    }

    let state = tokens.last().and_then(|t| canonical_state(t));
    if state.is_some() {
        tokens.pop();
    }

    json!({
        "raw": raw,
        "normalized": normalized,
        "street": if tokens.is_empty() { serde_json::Value::Null } else { json!(tokens.join(" ")) },
        "state": state,
        "zipcode": zipcode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_expands_abbreviations() {
        assert_eq!(normalize("123 Main St."), "123 main street");
        assert_eq!(normalize("45 N Broad Ave"), "45 north broad avenue");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "123 Main St., Bethlehem, PA 18015",
            "Old Mill Rd",
            "  lots   of\tspace ",
            "",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn canonical_state_accepts_codes_and_names() {
        assert_eq!(canonical_state("pa"), Some("PA".into()));
        assert_eq!(canonical_state("Pennsylvania"), Some("PA".into()));
        assert_eq!(canonical_state("new york"), Some("NY".into()));
        assert_eq!(canonical_state("Atlantis"), None);
    }

    #[test]
    fn parse_extracts_zip_and_state() {
        let parsed = parse("123 Main St Bethlehem Pennsylvania 18015");
        assert_eq!(parsed["zipcode"], "18015");
        assert_eq!(parsed["state"], "PA");
    }
}
