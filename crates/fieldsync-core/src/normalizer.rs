//! Administrative-area name normalization
//!
//! Survey definitions, interviewer assignments, and master data frequently
//! disagree on the spelling of constituency names. This module maps
//! free-text names to the canonical master-data spelling via a hand-curated
//! alias table, falling back to the trimmed input when no alias matches.
//!
//! The table covers the known mismatches observed in the field; the cache
//! layer's three-tier fallback lookup compensates for names the table does
//! not know about.

/// Hand-curated aliases: common misspellings/variants to canonical
/// master-data spelling. Keys are compared exactly first, then
/// case-insensitively against the trimmed input.
const KNOWN_ALIASES: &[(&str, &str)] = &[
    ("Cooch Behar Uttar", "COOCHBEHAR UTTAR (SC)"),
    ("Cooch Behar Dakshin", "COOCHBEHAR DAKSHIN"),
    ("Coochbehar Uttar", "COOCHBEHAR UTTAR (SC)"),
    ("Dinhata", "DINHATA"),
    ("Sitalkuchi", "SITALKUCHI (SC)"),
    ("Sitalkhuchi", "SITALKUCHI (SC)"),
    ("Mathabhanga", "MATHABHANGA (SC)"),
    ("Natabari", "NATABARI"),
    ("Tufanganj", "TUFANGANJ"),
    ("Mekliganj", "MEKLIGANJ (SC)"),
    ("Mekhliganj", "MEKLIGANJ (SC)"),
];

/// Maps a free-text area name to its canonical master-data spelling
///
/// Policy, in order:
/// 1. Exact-match lookup in the alias table.
/// 2. Case-insensitive comparison of the trimmed input against every alias
///    key; first match wins.
/// 3. Return the trimmed input unchanged (assume it is already canonical).
///
/// Deterministic and side-effect-free. Idempotent: canonical names never
/// appear as alias keys, so a second pass is a no-op.
pub fn normalize(raw_name: &str) -> String {
    let trimmed = raw_name.trim();

    for (alias, canonical) in KNOWN_ALIASES {
        if *alias == trimmed {
            return (*canonical).to_string();
        }
    }

    for (alias, canonical) in KNOWN_ALIASES {
        if alias.eq_ignore_ascii_case(trimmed) {
            return (*canonical).to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_alias_match() {
        assert_eq!(normalize("Cooch Behar Uttar"), "COOCHBEHAR UTTAR (SC)");
        assert_eq!(normalize("Sitalkhuchi"), "SITALKUCHI (SC)");
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(normalize("cooch behar uttar"), "COOCHBEHAR UTTAR (SC)");
        assert_eq!(normalize("MEKHLIGANJ"), "MEKLIGANJ (SC)");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(normalize("  Dinhata  "), "DINHATA");
        assert_eq!(normalize(" Unknown Area "), "Unknown Area");
    }

    #[test]
    fn test_unknown_passes_through() {
        assert_eq!(normalize("Jalpaiguri Sadar"), "Jalpaiguri Sadar");
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "Cooch Behar Uttar",
            "sitalkuchi",
            "Jalpaiguri Sadar",
            "  Tufanganj ",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "normalize not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_canonical_names_unchanged() {
        // Canonical spellings must map to themselves or the table is
        // self-contradictory.
        for (_, canonical) in KNOWN_ALIASES {
            assert_eq!(normalize(canonical), *canonical);
        }
    }
}
