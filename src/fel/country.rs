//! Receiver country normalization.
//!
//! The authority accepts a fixed set of ISO 3166-1 alpha-2 codes.
//! Anything it would not accept is reported as Guatemala.

/// Fallback country code.
pub const DEFAULT_COUNTRY_CODE: &str = "GT";

/// Common country names as typed into the ledger, lower-case.
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("argentina", "AR"),
    ("brasil", "BR"),
    ("brazil", "BR"),
    ("canada", "CA"),
    ("chile", "CL"),
    ("colombia", "CO"),
    ("costa rica", "CR"),
    ("ecuador", "EC"),
    ("el salvador", "SV"),
    ("españa", "ES"),
    ("estados unidos", "US"),
    ("guatemala", "GT"),
    ("honduras", "HN"),
    ("mexico", "MX"),
    ("nicaragua", "NI"),
    ("panama", "PA"),
    ("peru", "PE"),
    ("spain", "ES"),
    ("united states", "US"),
    ("usa", "US"),
];

/// Country codes accepted by the certification authority (225 entries).
/// Sorted for binary search.
static ACCEPTED_CODES: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AZ", "BA",
    "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BR", "BS", "BT", "BW",
    "BY", "BZ", "CA", "CD", "CF", "CG", "CH", "CI", "CL", "CM", "CN", "CO", "CR", "CU", "CV", "CW",
    "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE", "EG", "EH", "ER", "ES", "ET", "FI",
    "FJ", "FM", "FR", "GA", "GB", "GD", "GE", "GF", "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ",
    "GR", "GT", "GU", "GW", "GY", "HK", "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IN", "IO", "IQ",
    "IR", "IS", "IT", "JE", "JM", "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW",
    "KZ", "LA", "LB", "LC", "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME",
    "MF", "MG", "MK", "ML", "MM", "MN", "MO", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY",
    "MZ", "NA", "NC", "NE", "NG", "NI", "NL", "NO", "NP", "NR", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW", "SA",
    "SC", "SD", "SE", "SG", "SH", "SI", "SK", "SL", "SM", "SN", "SO", "SR", "SS", "ST", "SV", "SX",
    "SY", "SZ", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO", "TR", "TT", "TV", "TW",
    "TZ", "UA", "UG", "US", "UY", "UZ", "VA", "VC", "VE", "VN", "VU", "WF", "WS", "YE", "ZA", "ZM",
    "ZW",
];

/// Check whether the authority accepts this two-letter code.
#[must_use]
pub fn is_accepted_code(code: &str) -> bool {
    ACCEPTED_CODES.binary_search(&code).is_ok()
}

/// Normalize a ledger country value to an accepted two-letter code.
///
/// Known country names map to their code, anything else is upper-cased
/// and checked against the accepted list. Unknown values give `GT`.
#[must_use]
pub fn country_code(raw: &str) -> &'static str {
    let lowered = raw.trim().to_lowercase();
    if let Some((_, code)) = COUNTRY_NAMES.iter().find(|(name, _)| *name == lowered) {
        return code;
    }
    let upper = lowered.to_uppercase();
    ACCEPTED_CODES
        .binary_search(&upper.as_str())
        .map_or(DEFAULT_COUNTRY_CODE, |index| ACCEPTED_CODES[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_codes_are_sorted_and_unique() {
        assert_eq!(ACCEPTED_CODES.len(), 225);
        assert!(ACCEPTED_CODES.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn names_map_to_codes() {
        assert_eq!(country_code("México"), "GT");
        assert_eq!(country_code("mexico"), "MX");
        assert_eq!(country_code("Estados Unidos"), "US");
        assert_eq!(country_code("  España "), "ES");
        assert_eq!(country_code("USA"), "US");
    }

    #[test]
    fn codes_are_upper_cased() {
        assert_eq!(country_code("sv"), "SV");
        assert_eq!(country_code("De"), "DE");
    }

    #[test]
    fn unknown_values_fall_back_to_guatemala() {
        assert_eq!(country_code(""), "GT");
        assert_eq!(country_code("Atlantis"), "GT");
        // Assigned but not accepted by the authority
        assert_eq!(country_code("AX"), "GT");
        assert!(!is_accepted_code("AX"));
    }
}
