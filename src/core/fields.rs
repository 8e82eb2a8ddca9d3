//! Labels for the numbered declaration fields.

use super::types::{Declaration, is_reserved_field};

/// Human-readable label of a declaration field, `None` for unlabelled numbers.
///
/// Reserved fields are labelled "Reserved".
pub fn field_label(field: u8) -> Option<&'static str> {
    if is_reserved_field(field) {
        return Some("Reserved");
    }
    FIELD_LABELS
        .binary_search_by_key(&field, |(n, _)| *n)
        .ok()
        .map(|i| FIELD_LABELS[i].1)
}

/// Plain-text table of every non-reserved field with its label and value,
/// one `NN  label  value` row per field.
pub fn render_field_table(declaration: &Declaration) -> String {
    let mut out = String::new();
    for (n, value) in declaration.fields() {
        if is_reserved_field(n) {
            continue;
        }
        let label = field_label(n).unwrap_or("");
        out.push_str(&format!("{n:02}  {label:<45} {value:>12.2}\n"));
    }
    out
}

/// Field labels (sorted by field number for binary search).
static FIELD_LABELS: &[(u8, &str)] = &[
    (9, "Deliveries/services taxable at 20%"),
    (10, "VAT amount for field 09"),
    (11, "Deliveries/services taxable at 0%"),
    (12, "Exempt deliveries/services"),
    (13, "Intra-community deliveries"),
    (14, "Exports"),
    (15, "Other deliveries outside Bulgaria"),
    (16, "Distance sales to Bulgaria"),
    (17, "VAT for distance sales"),
    (18, "Intra-community acquisitions"),
    (19, "VAT for intra-community acquisitions"),
    (20, "Other acquisitions subject to reverse charge"),
    (21, "VAT for other acquisitions"),
    (22, "Import VAT"),
    (23, "Corrections of previous periods"),
    (24, "VAT corrections"),
    (25, "Other corrections"),
    (41, "Total tax base"),
    (42, "Total VAT due"),
    (50, "Total sales VAT due"),
    (51, "Tax credit adjustments"),
    (60, "Total purchase VAT deductible"),
    (70, "VAT due to budget"),
    (71, "VAT refund due from budget"),
    (80, "Refund amount"),
    (81, "Amount to pay"),
    (82, "Amount to refund"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels() {
        assert_eq!(field_label(9), Some("Deliveries/services taxable at 20%"));
        assert_eq!(field_label(70), Some("VAT due to budget"));
        assert_eq!(field_label(82), Some("Amount to refund"));
        assert_eq!(field_label(33), Some("Reserved"));
    }

    #[test]
    fn unknown_numbers() {
        assert_eq!(field_label(8), None);
        assert_eq!(field_label(83), None);
    }

    #[test]
    fn every_field_has_a_label() {
        for n in 9..=82 {
            assert!(field_label(n).is_some(), "field {n}");
        }
    }

    #[test]
    fn label_list_is_sorted() {
        for window in FIELD_LABELS.windows(2) {
            assert!(
                window[0].0 < window[1].0,
                "labels not sorted: {} >= {}",
                window[0].0,
                window[1].0
            );
        }
    }

    #[test]
    fn table_has_one_line_per_unreserved_field() {
        use crate::core::calculator::calculate;
        use crate::core::period::Period;
        use crate::core::types::{CompanyId, SalesFields};
        use rust_decimal_macros::dec;

        let sales = SalesFields::default().with(10, dec!(150));
        let d = calculate(CompanyId(1), Period::parse("202403").unwrap(), &sales, dec!(0));
        let table = render_field_table(&d);
        let expected = (9..=82).filter(|n| !is_reserved_field(*n)).count();
        assert_eq!(table.lines().count(), expected);
        assert!(table.ends_with('\n'));
        let row = table.lines().find(|l| l.starts_with("70  ")).unwrap();
        assert!(row.starts_with("70  VAT due to budget"));
        assert!(row.ends_with("      150.00"));
    }
}
