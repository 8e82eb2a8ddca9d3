use std::fmt;

use chrono::NaiveDate;

use super::types::DeclarationId;

/// Reference assigned to a declaration when it is submitted.
///
/// Format: `{prefix}{YYYYMMDD}{id}` with the declaration id zero-padded to
/// six digits, e.g. "NAP20240415000042". Ids above 999999 are written in full.
///
/// ```
/// use chrono::NaiveDate;
/// use dds::core::{DeclarationId, SubmissionReference};
///
/// let date = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
/// let r = SubmissionReference::new("NAP", date, DeclarationId(42));
/// assert_eq!(r.to_string(), "NAP20240415000042");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReference {
    prefix: String,
    date: NaiveDate,
    id: DeclarationId,
}

impl SubmissionReference {
    pub fn new(prefix: impl Into<String>, date: NaiveDate, id: DeclarationId) -> Self {
        Self {
            prefix: prefix.into(),
            date,
            id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn id(&self) -> DeclarationId {
        self.id
    }
}

impl fmt::Display for SubmissionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{:06}",
            self.prefix,
            self.date.format("%Y%m%d"),
            self.id.0
        )
    }
}

impl From<SubmissionReference> for String {
    fn from(r: SubmissionReference) -> Self {
        r.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 4, 9).unwrap()
    }

    #[test]
    fn zero_padded_id() {
        assert_eq!(
            SubmissionReference::new("NAP", date(), DeclarationId(1)).to_string(),
            "NAP20210409000001"
        );
    }

    #[test]
    fn wide_ids_are_not_truncated() {
        assert_eq!(
            SubmissionReference::new("NAP", date(), DeclarationId(12_345_678)).to_string(),
            "NAP2021040912345678"
        );
    }

    #[test]
    fn custom_prefix() {
        let r = SubmissionReference::new("TEST-", date(), DeclarationId(7));
        assert_eq!(String::from(r), "TEST-20210409000007");
    }
}
