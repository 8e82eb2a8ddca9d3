//! Format checks for VAT numbers and company identification codes.
//!
//! Checks are structural only; registry confirmation is an input flag on
//! ledger entries and never performed here.

use std::fmt;

/// Error returned when an identifier fails format validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VatFormatError {
    /// The invalid input value.
    pub value: String,
    /// Why the value failed validation.
    pub reason: String,
}

impl fmt::Display for VatFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identifier '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for VatFormatError {}

fn err(value: &str, reason: impl Into<String>) -> VatFormatError {
    VatFormatError {
        value: value.into(),
        reason: reason.into(),
    }
}

/// Validate an EU VAT number: two uppercase letters followed by 8–12 digits.
/// Returns the (country prefix, number) split on success.
pub fn validate_vat_format(vat: &str) -> Result<(&str, &str), VatFormatError> {
    let vat = vat.trim();
    if vat.len() < 2 || !vat.is_char_boundary(2) {
        return Err(err(vat, "too short, must start with a 2-letter country prefix"));
    }
    let (prefix, number) = vat.split_at(2);
    if !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(err(vat, "country prefix must be two uppercase letters"));
    }
    if !(8..=12).contains(&number.len()) || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(err(vat, "number part must be 8 to 12 digits"));
    }
    Ok((prefix, number))
}

/// Validate a domestic VAT number: `BG` followed by 9 or 10 digits.
pub fn validate_domestic_vat(vat: &str) -> Result<&str, VatFormatError> {
    let (prefix, number) = validate_vat_format(vat)?;
    if prefix != "BG" {
        return Err(err(vat, "domestic VAT number must start with BG"));
    }
    if !(9..=10).contains(&number.len()) {
        return Err(err(vat, "domestic VAT number must have 9 or 10 digits"));
    }
    Ok(number)
}

/// Validate a unified identification code (ЕИК): 9 or 13 digits.
pub fn validate_uic(uic: &str) -> Result<(), VatFormatError> {
    if !(uic.len() == 9 || uic.len() == 13) || !uic.chars().all(|c| c.is_ascii_digit()) {
        return Err(err(uic, "UIC must be 9 or 13 digits"));
    }
    Ok(())
}
