//! Canonical team name mapping
//!
//! Historical franchise and country names collapse to one canonical code so
//! the same side is never counted twice under different spellings. Unknown
//! names pass through unchanged; the cleaner flags them for manual review.

/// Alias -> canonical code
const TEAM_ALIASES: [(&str, &str); 17] = [
    ("Royal Challengers Bangalore", "RCB"),
    ("Royal Challengers Bengaluru", "RCB"),
    ("Delhi Daredevils", "DC"),
    ("Delhi Capitals", "DC"),
    ("Deccan Chargers", "DC"),
    ("Kings XI Punjab", "PBKS"),
    ("Punjab Kings", "PBKS"),
    ("Rising Pune Supergiants", "RPS"),
    ("Rising Pune Supergiant", "RPS"),
    ("Gujarat Lions", "GL"),
    ("Pune Warriors India", "PWI"),
    ("Kochi Tuskers Kerala", "KTK"),
    ("Sunrisers Hyderabad", "SRH"),
    ("Mumbai Indians", "MI"),
    ("Chennai Super Kings", "CSK"),
    ("Kolkata Knight Riders", "KKR"),
    ("Rajasthan Royals", "RR"),
];

/// Codes already in canonical form
const CANONICAL_CODES: [&str; 19] = [
    "RCB", "DC", "PBKS", "RPS", "GL", "PWI", "KTK", "SRH", "MI", "CSK", "KKR", "RR",
    // international sides
    "IND", "AUS", "ENG", "PAK", "RSA", "NZ",
    "WI",
];

/// Outcome of canonicalizing one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    /// Already canonical, or rewritten to the canonical code
    Canonical(String),
    /// Not in the mapping table; passed through for manual review
    Unmapped(String),
}

impl Mapped {
    pub fn into_name(self) -> String {
        match self {
            Mapped::Canonical(name) | Mapped::Unmapped(name) => name,
        }
    }

    pub fn is_unmapped(&self) -> bool {
        matches!(self, Mapped::Unmapped(_))
    }
}

/// Map a raw team name to its canonical code
pub fn canonical_team(raw: &str) -> Mapped {
    let trimmed = raw.trim();
    for (alias, code) in TEAM_ALIASES {
        if alias.eq_ignore_ascii_case(trimmed) {
            return Mapped::Canonical(code.to_string());
        }
    }
    // Short all-caps codes ("SL", "BAN", "AFG") count as already canonical
    if CANONICAL_CODES.contains(&trimmed)
        || (!trimmed.is_empty()
            && trimmed.len() <= 4
            && trimmed.chars().all(|c| c.is_ascii_uppercase()))
    {
        Mapped::Canonical(trimmed.to_string())
    } else {
        Mapped::Unmapped(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_maps_to_code() {
        assert_eq!(
            canonical_team("Royal Challengers Bengaluru"),
            Mapped::Canonical("RCB".to_string())
        );
        assert_eq!(
            canonical_team("delhi daredevils"),
            Mapped::Canonical("DC".to_string())
        );
    }

    #[test]
    fn test_canonical_passes_through() {
        assert_eq!(canonical_team("CSK"), Mapped::Canonical("CSK".to_string()));
        assert_eq!(canonical_team(" IND "), Mapped::Canonical("IND".to_string()));
    }

    #[test]
    fn test_unknown_name_flagged() {
        let mapped = canonical_team("Wanderers XI");
        assert!(mapped.is_unmapped());
        assert_eq!(mapped.into_name(), "Wanderers XI");
    }
}
