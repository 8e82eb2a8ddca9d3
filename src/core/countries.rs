//! EU member state codes for cross-border document types.
//!
//! ISO 3166-1 alpha-2, plus `EL`, the prefix Greece uses on VAT numbers.

/// Country code of the declaring entity's own tax jurisdiction.
pub const DOMESTIC_COUNTRY: &str = "BG";

/// Check whether `code` is an EU member state.
pub fn is_eu_member(code: &str) -> bool {
    EU_MEMBER_STATES.binary_search(&code).is_ok()
}

/// Check whether `code` is an EU member state other than `domestic`.
pub fn is_foreign_eu_member(code: &str, domestic: &str) -> bool {
    is_eu_member(code) && !code.eq_ignore_ascii_case(domestic)
}

/// Sorted for binary search.
static EU_MEMBER_STATES: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "EL", "ES", "FI", "FR", "GR", "HR", "HU", "IE",
    "IT", "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
];
