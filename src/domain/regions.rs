//! Static region derivation
//!
//! Region fields on a location are derived from its state and county at write
//! time. The lookup tables are fixed; `cultural_region` is only auto-filled
//! when the user has not set one themselves.

/// Census region + division for a two-letter state code.
pub fn census(state: &str) -> Option<(&'static str, &'static str)> {
    let (region, division) = match state {
        "CT" | "ME" | "MA" | "NH" | "RI" | "VT" => ("Northeast", "New England"),
        "NJ" | "NY" | "PA" => ("Northeast", "Middle Atlantic"),
        "IL" | "IN" | "MI" | "OH" | "WI" => ("Midwest", "East North Central"),
        "IA" | "KS" | "MN" | "MO" | "NE" | "ND" | "SD" => ("Midwest", "West North Central"),
        "DE" | "FL" | "GA" | "MD" | "NC" | "SC" | "VA" | "DC" | "WV" => {
            ("South", "South Atlantic")
        }
        "AL" | "KY" | "MS" | "TN" => ("South", "East South Central"),
        "AR" | "LA" | "OK" | "TX" => ("South", "West South Central"),
        "AZ" | "CO" | "ID" | "MT" | "NV" | "NM" | "UT" | "WY" => ("West", "Mountain"),
        "AK" | "CA" | "HI" | "OR" | "WA" => ("West", "Pacific"),
        _ => return None,
    };
    Some((region, division))
}

/// Rough compass bucket for a state within the country.
pub fn state_direction(state: &str) -> Option<&'static str> {
    let direction = match state {
        "ME" | "NH" | "VT" | "MA" | "RI" | "CT" | "NY" | "NJ" | "PA" => "northeast",
        "DE" | "MD" | "DC" | "VA" | "WV" | "NC" | "SC" | "GA" | "FL" => "southeast",
        "OH" | "IN" | "IL" | "MI" | "WI" | "MN" | "IA" | "MO" | "ND" | "SD" | "NE" | "KS" => {
            "central"
        }
        "KY" | "TN" | "AL" | "MS" | "AR" | "LA" | "OK" | "TX" => "south",
        "MT" | "ID" | "WY" | "CO" | "UT" | "NV" | "AZ" | "NM" => "west",
        "WA" | "OR" | "CA" => "pacific",
        "AK" | "HI" => "noncontiguous",
        _ => return None,
    };
    Some(direction)
}

/// Well-known cultural regions keyed by `(state, county)`. County comparison
/// is case-insensitive and ignores a trailing "county".
pub fn cultural_region(state: &str, county: Option<&str>) -> Option<&'static str> {
    let county = county.map(normalize_county);
    let county = county.as_deref();
    let region = match (state, county) {
        ("PA", Some("luzerne" | "lackawanna" | "schuylkill" | "carbon" | "northumberland")) => {
            "Anthracite Coal Region"
        }
        ("PA", Some("allegheny" | "westmoreland" | "fayette" | "washington")) => {
            "Steel Valley"
        }
        ("PA", Some("lehigh" | "northampton")) => "Lehigh Valley",
        ("NY", Some("sullivan" | "ulster")) => "Borscht Belt",
        ("NY", Some("erie" | "niagara")) => "Rust Belt",
        ("NJ", Some("atlantic" | "burlington" | "ocean")) => "Pine Barrens",
        ("WV", _) => "Appalachia",
        ("MI", Some("wayne" | "genesee" | "saginaw")) => "Rust Belt",
        ("OH", Some("cuyahoga" | "mahoning" | "trumbull")) => "Rust Belt",
        ("NV", Some("nye" | "esmeralda" | "mineral")) => "Great Basin Mining District",
        _ => return None,
    };
    Some(region)
}

fn normalize_county(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .trim_end_matches(" county")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn census_lookup() {
        assert_eq!(census("PA"), Some(("Northeast", "Middle Atlantic")));
        assert_eq!(census("TX"), Some(("South", "West South Central")));
        assert_eq!(census("ZZ"), None);
    }

    #[test]
    fn cultural_region_ignores_county_suffix() {
        assert_eq!(
            cultural_region("PA", Some("Luzerne County")),
            Some("Anthracite Coal Region")
        );
        assert_eq!(cultural_region("PA", Some("luzerne")), cultural_region("PA", Some("Luzerne")));
        assert_eq!(cultural_region("CA", Some("Orange")), None);
    }
}
