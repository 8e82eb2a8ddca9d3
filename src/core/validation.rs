use rust_decimal::Decimal;

use super::config::EngineConfig;
use super::countries::is_foreign_eu_member;
use super::document_type::{AuxField, DocumentType};
use super::error::ValidationError;
use super::types::*;
use super::vat_id;

/// Validate a purchase entry: required auxiliary data, amount signs,
/// effective dates, VAT arithmetic and counterparty VAT formats.
/// Returns all findings (not just the first).
pub fn validate_purchase_entry(entry: &PurchaseEntry, config: &EngineConfig) -> Vec<ValidationError> {
    let mut errors = purchase_required_fields(entry);
    errors.extend(purchase_amount_signs(entry));
    errors.extend(document_type_effective(
        entry.document_type.into(),
        entry.period,
    ));
    errors.extend(vat_arithmetic(entry.tax_base, entry.vat_amount, config));

    for (field, value) in [
        ("supplier_vat", &entry.supplier_vat),
        ("intermediary_vat", &entry.intermediary_vat),
        ("final_customer_vat", &entry.final_customer_vat),
    ] {
        if let Some(vat) = value {
            validate_vat_format(vat, field, &mut errors);
        }
    }

    errors
}

/// Validate a sales entry. See [`validate_purchase_entry`].
pub fn validate_sales_entry(entry: &SalesEntry, config: &EngineConfig) -> Vec<ValidationError> {
    let mut errors = sales_required_fields(entry, config);
    errors.extend(sales_amount_signs(entry));
    errors.extend(document_type_effective(
        entry.document_type.into(),
        entry.period,
    ));
    errors.extend(vat_arithmetic(entry.tax_base, entry.vat_amount, config));

    if let Some(vat) = &entry.customer_vat {
        validate_vat_format(vat, "customer_vat", &mut errors);
    }

    errors
}

/// Required auxiliary data for the entry's purchase document type.
pub fn purchase_required_fields(entry: &PurchaseEntry) -> Vec<ValidationError> {
    let document_type = DocumentType::Purchase(entry.document_type);
    let rule = format!("PD-{:02}", document_type.code());
    let code = document_type.code();
    let mut errors = Vec::new();

    for field in document_type.rule().required_fields {
        let message = match field {
            AuxField::CustomsDocumentRef if is_blank(&entry.customs_document_ref) => {
                Some(format!("customs document reference is required for type {code:02}"))
            }
            AuxField::Article15aType => match entry.article_15a_type {
                None => Some(format!("Article 15a type is required for type {code:02}")),
                Some(t) if !(1..=4).contains(&t) => {
                    Some(format!("Article 15a type must be between 1 and 4, got {t}"))
                }
                Some(_) => None,
            },
            AuxField::AggregatePeriodFrom if entry.aggregate_period_from.is_none() => Some(
                format!("aggregate period start is required for type {code:02}"),
            ),
            AuxField::AggregatePeriodTo if entry.aggregate_period_to.is_none() => Some(format!(
                "aggregate period end is required for type {code:02}"
            )),
            AuxField::TriangularOperationType => match entry.triangular_operation_type {
                None => Some(format!(
                    "triangular operation type is required for type {code:02}"
                )),
                Some(t) if !(11..=13).contains(&t) => Some(format!(
                    "triangular operation type must be between 11 and 13, got {t}"
                )),
                Some(_) => None,
            },
            AuxField::ApplicationReference if is_blank(&entry.application_reference) => Some(
                format!("application reference is required for VAT application type {code:02}"),
            ),
            _ => None,
        };
        if let Some(message) = message {
            errors.push(ValidationError::with_rule(field.name(), message, rule.clone()));
        }
    }

    if let Some(t) = entry.vat_application_type {
        let message = if !(91..=94).contains(&t) {
            Some(format!("VAT application type must be between 91 and 94, got {t}"))
        } else if !entry.document_type.is_vat_application() {
            Some(format!("VAT application type {t} does not apply to type {code:02}"))
        } else if t != code {
            Some(format!("VAT application type {t} does not match type {code:02}"))
        } else {
            None
        };
        if let Some(message) = message {
            errors.push(ValidationError::with_rule("vat_application_type", message, rule.clone()));
        }
    }

    if let (Some(from), Some(to)) = (entry.aggregate_period_from, entry.aggregate_period_to) {
        if from > to {
            errors.push(ValidationError::with_rule(
                "aggregate_period_to",
                format!("aggregate period range {from}..{to} ends before it starts"),
                rule,
            ));
        }
    }

    errors
}

/// Required auxiliary data for the entry's sales document type.
pub fn sales_required_fields(entry: &SalesEntry, config: &EngineConfig) -> Vec<ValidationError> {
    let document_type = DocumentType::Sales(entry.document_type);
    let rule = format!("SD-{:02}", document_type.code());
    let mut errors = Vec::new();

    for field in document_type.rule().required_fields {
        let message = match field {
            AuxField::CustomerVat if is_blank(&entry.customer_vat) => {
                Some("customer VAT number is required for EU sales".to_string())
            }
            AuxField::CustomerCountry => match entry.customer_country.as_deref() {
                Some(c) if is_foreign_eu_member(c, &config.domestic_country) => None,
                Some(c) => Some(format!(
                    "non-domestic EU country code is required for EU sales, got '{c}'"
                )),
                None => Some("non-domestic EU country code is required for EU sales".to_string()),
            },
            AuxField::EuDistanceSelling if !entry.eu_distance_selling => Some(
                "EU distance selling flag must be set for distance selling".to_string(),
            ),
            AuxField::TriangularSalesType if entry.triangular_sales_type.is_none() => {
                Some("triangular sales type is required".to_string())
            }
            _ => None,
        };
        if let Some(message) = message {
            errors.push(ValidationError::with_rule(field.name(), message, rule.clone()));
        }
    }

    errors
}

/// Amounts must be non-negative, credit adjustments non-positive.
/// Credit notes may carry negative amounts.
pub fn purchase_amount_signs(entry: &PurchaseEntry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if entry.document_type != super::document_type::PurchaseDocumentType::CreditNote {
        for (field, value) in [
            ("tax_base", entry.tax_base),
            ("vat_amount", entry.vat_amount),
            ("total_amount", entry.total_amount),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                errors.push(ValidationError::with_rule(
                    field,
                    format!("must not be negative, got {value}"),
                    "AM-01",
                ));
            }
        }
    }

    for (field, value) in [
        ("credit_tax_base", entry.credit_tax_base),
        ("credit_vat", entry.credit_vat),
    ] {
        if value > Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                field,
                format!("must not be positive, got {value}"),
                "AM-02",
            ));
        }
    }

    errors
}

/// Amounts and fields 09–22 must be non-negative; corrections 23–25 may be negative.
pub fn sales_amount_signs(entry: &SalesEntry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("tax_base", entry.tax_base),
        ("vat_amount", entry.vat_amount),
        ("total_amount", entry.total_amount),
    ] {
        if value < Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                field,
                format!("must not be negative, got {value}"),
                "AM-01",
            ));
        }
    }

    for (n, value) in entry.fields.iter() {
        if n < FIRST_CORRECTION_FIELD && value < Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                format!("field_{n:02}"),
                format!("must not be negative, got {value}"),
                "AM-03",
            ));
        }
    }

    errors
}

fn document_type_effective(
    document_type: DocumentType,
    period: super::period::Period,
) -> Option<ValidationError> {
    let rule = document_type.rule();
    (!rule.is_effective(period)).then(|| {
        ValidationError::with_rule(
            "document_type",
            format!("{document_type} is not in effect for period {period}"),
            "DT-01",
        )
    })
}

/// Advisory check that `vat_amount` matches `tax_base × standard_rate`
/// within the configured tolerance. Skipped when either side is zero.
pub fn vat_arithmetic(
    tax_base: Decimal,
    vat_amount: Decimal,
    config: &EngineConfig,
) -> Option<ValidationError> {
    if tax_base.is_zero() || vat_amount.is_zero() {
        return None;
    }
    let expected = tax_base * config.standard_rate;
    let diff = (expected - vat_amount).abs();
    (diff > config.arithmetic_tolerance).then(|| {
        ValidationError::with_rule(
            "vat_amount",
            format!(
                "VAT calculation mismatch: expected {} ({} × {}), got {}",
                expected.round_dp(2),
                tax_base,
                config.standard_rate,
                vat_amount
            ),
            "AR-01",
        )
        .warning()
    })
}

fn validate_vat_format(vat: &str, field: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = vat_id::validate_vat_format(vat) {
        errors.push(ValidationError::with_rule(field, e.reason, "VAT-01").warning());
    }
}

impl Company {
    /// See [`validate_company`].
    pub fn validate(&self) -> Vec<ValidationError> {
        validate_company(self)
    }
}

/// Validate company master data.
pub fn validate_company(company: &Company) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(e) = vat_id::validate_uic(&company.uic) {
        errors.push(ValidationError::with_rule("uic", e.reason, "CO-01"));
    }
    if let Err(e) = vat_id::validate_domestic_vat(&company.vat_number) {
        errors.push(ValidationError::with_rule("vat_number", e.reason, "CO-02"));
    }
    if company.name.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "name",
            "company name must not be empty",
            "CO-03",
        ));
    }

    errors
}

/// Validate a declaration against the national schema rules.
///
/// Pure: never mutates the declaration and never fails. An empty list means
/// the declaration passes.
pub fn validate_declaration(declaration: &Declaration) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let f = |n: u8| declaration.field(n);

    // Payable and refundable are mutually exclusive.
    if f(70) > Decimal::ZERO && f(71) > Decimal::ZERO {
        errors.push(ValidationError::with_rule(
            "field_70",
            "both field 70 and field 71 cannot have positive values",
            "DC-01",
        ));
    }

    // Art. 73, par. 5 cross-reference: no data to check it against here.
    if f(42) > Decimal::ZERO && f(33) > Decimal::ZERO {
        errors.push(
            ValidationError::with_rule(
                "field_33",
                "field 33 requires verification per Art. 73, par. 5",
                "DC-02",
            )
            .unverified(),
        );
    }

    if f(20) - f(40) < Decimal::ZERO
        && (declaration.fields.get(70).is_none() || declaration.fields.get(71).is_none())
    {
        errors.push(ValidationError::with_rule(
            "field_70",
            "fields 70 and 71 are required when (field 20 - field 40) < 0",
            "DC-03",
        ));
    }

    for n in [70, 71, 81, 82] {
        if f(n) < Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                format!("field_{n}"),
                format!("field {n} must not be negative, got {}", f(n)),
                "DC-04",
            ));
        }
    }

    if f(81) != f(70) || f(82) != f(71) {
        errors.push(ValidationError::with_rule(
            "field_81",
            format!(
                "fields 81/82 ({}/{}) must mirror fields 70/71 ({}/{})",
                f(81),
                f(82),
                f(70),
                f(71)
            ),
            "DC-05",
        ));
    }

    if declaration.payment_due != f(70) || declaration.refund_due != f(71) {
        errors.push(ValidationError::with_rule(
            "payment_due",
            format!(
                "payment/refund due ({}/{}) must equal fields 70/71 ({}/{})",
                declaration.payment_due,
                declaration.refund_due,
                f(70),
                f(71)
            ),
            "DC-06",
        ));
    }

    if declaration.calculation_method == CalculationMethod::Automatic {
        if f(50) != f(10) {
            errors.push(ValidationError::with_rule(
                "field_50",
                format!("field 50 ({}) must equal field 10 ({})", f(50), f(10)),
                "DC-07",
            ));
        }
        if f(70) - f(71) != f(50) - f(60) {
            errors.push(ValidationError::with_rule(
                "field_70",
                format!(
                    "net position {} does not match field 50 - field 60 = {}",
                    f(70) - f(71),
                    f(50) - f(60)
                ),
                "DC-08",
            ));
        }
    }

    for (n, value) in declaration.fields() {
        if is_reserved_field(n) && !value.is_zero() {
            errors.push(
                ValidationError::with_rule(
                    format!("field_{n}"),
                    format!("reserved field {n} carries a value ({value})"),
                    "DC-09",
                )
                .warning(),
            );
        }
    }

    let expected_deadline = declaration.period.payment_deadline();
    if declaration.payment_deadline != expected_deadline {
        errors.push(
            ValidationError::with_rule(
                "payment_deadline",
                format!(
                    "payment deadline {} differs from {} for period {}",
                    declaration.payment_deadline, expected_deadline, declaration.period
                ),
                "DC-10",
            )
            .warning(),
        );
    }

    errors
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::{PurchaseEntryBuilder, SalesEntryBuilder};
    use crate::core::calculator::calculate;
    use crate::core::document_type::{PurchaseDocumentType, SalesDocumentType};
    use crate::core::error::Severity;
    use crate::core::period::Period;
    use rust_decimal_macros::dec;

    fn period() -> Period {
        Period::parse("202403").unwrap()
    }

    fn purchase(t: PurchaseDocumentType) -> PurchaseEntry {
        PurchaseEntryBuilder::new(CompanyId(1), period(), t)
            .amounts(dec!(100), dec!(20))
            .build_unchecked()
    }

    fn sales(t: SalesDocumentType) -> SalesEntry {
        SalesEntryBuilder::new(CompanyId(1), period(), t)
            .amounts(dec!(100), dec!(20))
            .build_unchecked()
    }

    fn rules(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().filter_map(|e| e.rule.as_deref()).collect()
    }

    #[test]
    fn invoice_needs_nothing_extra() {
        let errors = validate_purchase_entry(&purchase(PurchaseDocumentType::Invoice), &EngineConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn customs_requires_reference() {
        let mut e = purchase(PurchaseDocumentType::Customs);
        let errors = purchase_required_fields(&e);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "customs_document_ref");
        assert_eq!(errors[0].rule.as_deref(), Some("PD-02"));

        e.customs_document_ref = Some("   ".into());
        assert_eq!(purchase_required_fields(&e).len(), 1);

        e.customs_document_ref = Some("BG005800M0012345".into());
        assert!(purchase_required_fields(&e).is_empty());
    }

    #[test]
    fn article_15a_type_range() {
        let mut e = purchase(PurchaseDocumentType::Article15a);
        assert_eq!(purchase_required_fields(&e).len(), 1);
        e.article_15a_type = Some(5);
        assert!(purchase_required_fields(&e)[0].message.contains("between 1 and 4"));
        e.article_15a_type = Some(4);
        assert!(purchase_required_fields(&e).is_empty());
    }

    #[test]
    fn aggregate_invoice_requires_both_ends() {
        let mut e = purchase(PurchaseDocumentType::AggregateInvoice);
        let fields: Vec<String> = purchase_required_fields(&e).into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["aggregate_period_from", "aggregate_period_to"]);

        e.aggregate_period_from = Some(Period::parse("202401").unwrap());
        assert_eq!(purchase_required_fields(&e).len(), 1);

        e.aggregate_period_to = Some(Period::parse("202312").unwrap());
        let errors = purchase_required_fields(&e);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("ends before it starts"));

        e.aggregate_period_to = Some(Period::parse("202403").unwrap());
        assert!(purchase_required_fields(&e).is_empty());
    }

    #[test]
    fn triangular_types_require_operation_type() {
        for t in [
            PurchaseDocumentType::TriangularArt15,
            PurchaseDocumentType::TriangularArt14,
            PurchaseDocumentType::AcquisitionsArt14,
        ] {
            let mut e = purchase(t);
            assert_eq!(rules(&purchase_required_fields(&e)), vec![format!("PD-{:02}", t.code())]);
            e.triangular_operation_type = Some(t.code());
            assert!(purchase_required_fields(&e).is_empty());
        }
    }

    #[test]
    fn vat_applications_require_reference() {
        let mut e = purchase(PurchaseDocumentType::VatApplication3);
        assert_eq!(purchase_required_fields(&e)[0].field, "application_reference");
        e.application_reference = Some("APP-1".into());
        assert!(purchase_required_fields(&e).is_empty());
    }

    #[test]
    fn vat_application_type_checked_against_document_type() {
        let mut e = purchase(PurchaseDocumentType::VatApplication3);
        e.application_reference = Some("APP-1".into());
        assert_eq!(e.vat_application_type, Some(93));

        e.vat_application_type = Some(95);
        let errors = purchase_required_fields(&e);
        assert_eq!(errors[0].field, "vat_application_type");
        assert!(errors[0].message.contains("between 91 and 94"));

        e.vat_application_type = Some(91);
        assert!(purchase_required_fields(&e)[0].message.contains("does not match type 93"));

        let mut invoice = purchase(PurchaseDocumentType::Invoice);
        assert_eq!(invoice.vat_application_type, None);
        invoice.vat_application_type = Some(92);
        assert_eq!(rules(&purchase_required_fields(&invoice)), vec!["PD-01"]);
    }

    #[test]
    fn eu_sales_rejects_domestic_country() {
        let mut e = sales(SalesDocumentType::EuSales);
        e.customer_vat = Some("BG123456789".into());
        e.customer_country = Some("BG".into());
        let errors = sales_required_fields(&e, &EngineConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "customer_country");
        assert!(errors[0].message.contains("non-domestic"));
    }

    #[test]
    fn eu_sales_rejects_non_eu_and_missing() {
        let config = EngineConfig::default();
        let mut e = sales(SalesDocumentType::EuSales);
        assert_eq!(sales_required_fields(&e, &config).len(), 2);
        e.customer_vat = Some("US123456789".into());
        e.customer_country = Some("US".into());
        assert_eq!(sales_required_fields(&e, &config).len(), 1);
        e.customer_vat = Some("DE123456789".into());
        e.customer_country = Some("DE".into());
        assert!(sales_required_fields(&e, &config).is_empty());
    }

    #[test]
    fn distance_selling_and_triangular_sales() {
        let config = EngineConfig::default();
        let mut d = sales(SalesDocumentType::DistanceSelling);
        assert_eq!(sales_required_fields(&d, &config)[0].field, "eu_distance_selling");
        d.eu_distance_selling = true;
        assert!(sales_required_fields(&d, &config).is_empty());

        let mut t = sales(SalesDocumentType::Triangular);
        assert_eq!(sales_required_fields(&t, &config)[0].field, "triangular_sales_type");
        t.triangular_sales_type = Some(1);
        assert!(sales_required_fields(&t, &config).is_empty());
    }

    #[test]
    fn arithmetic_is_a_warning() {
        let config = EngineConfig::default();
        assert!(vat_arithmetic(dec!(100), dec!(20), &config).is_none());
        assert!(vat_arithmetic(dec!(100), dec!(20.01), &config).is_none());
        let w = vat_arithmetic(dec!(100), dec!(25), &config).unwrap();
        assert_eq!(w.severity, Severity::Warning);
        assert_eq!(w.rule.as_deref(), Some("AR-01"));
        assert!(vat_arithmetic(dec!(0), dec!(25), &config).is_none());
        assert!(vat_arithmetic(dec!(100), dec!(0), &config).is_none());
    }

    #[test]
    fn arithmetic_works_for_credit_notes() {
        let config = EngineConfig::default();
        assert!(vat_arithmetic(dec!(-100), dec!(-20), &config).is_none());
    }

    #[test]
    fn negative_amounts_flagged() {
        let mut e = purchase(PurchaseDocumentType::Invoice);
        e.vat_amount = dec!(-1);
        e.credit_vat = dec!(2);
        assert_eq!(rules(&purchase_amount_signs(&e)), vec!["AM-01", "AM-02"]);

        let mut c = purchase(PurchaseDocumentType::Invoice);
        c.convert_to_credit_note();
        assert!(purchase_amount_signs(&c).is_empty());
    }

    #[test]
    fn correction_fields_may_be_negative() {
        let mut e = sales(SalesDocumentType::Domestic);
        e.fields.set(23, dec!(-50)).unwrap();
        e.fields.set(25, dec!(-1)).unwrap();
        assert!(sales_amount_signs(&e).is_empty());
        e.fields.set(22, dec!(-1)).unwrap();
        let errors = sales_amount_signs(&e);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "field_22");
    }

    #[test]
    fn malformed_counterparty_vat_warns() {
        let mut e = purchase(PurchaseDocumentType::Invoice);
        e.supplier_vat = Some("XX12".into());
        let errors = validate_purchase_entry(&e, &EngineConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Warning);
        assert_eq!(errors[0].field, "supplier_vat");
    }

    #[test]
    fn company_master_data() {
        let ok = Company {
            id: CompanyId(1),
            uic: "123456789".into(),
            vat_number: "BG123456789".into(),
            name: "Фирма ООД".into(),
            active: true,
        };
        assert!(validate_company(&ok).is_empty());
        let bad = Company {
            uic: "12".into(),
            vat_number: "DE123456789".into(),
            name: " ".into(),
            ..ok
        };
        assert_eq!(rules(&validate_company(&bad)), vec!["CO-01", "CO-02", "CO-03"]);
    }

    fn calculated(sales_vat: Decimal, purchase_vat: Decimal) -> Declaration {
        let fields = SalesFields::default().with(9, sales_vat * dec!(5)).with(10, sales_vat);
        calculate(CompanyId(1), period(), &fields, purchase_vat)
    }

    #[test]
    fn calculated_declaration_is_clean() {
        assert!(validate_declaration(&calculated(dec!(200), dec!(50))).is_empty());
        assert!(validate_declaration(&calculated(dec!(50), dec!(200))).is_empty());
        assert!(validate_declaration(&calculated(dec!(0), dec!(0))).is_empty());
    }

    #[test]
    fn payable_and_refundable_together() {
        let mut d = calculated(dec!(200), dec!(50));
        d.fields.put(71, dec!(10));
        assert!(rules(&validate_declaration(&d)).contains(&"DC-01"));
    }

    #[test]
    fn field_33_is_flagged_unverified() {
        let mut d = calculated(dec!(200), dec!(50));
        d.fields.put(42, dec!(1));
        d.fields.put(33, dec!(1));
        let errors = validate_declaration(&d);
        let flagged = errors.iter().find(|e| e.rule.as_deref() == Some("DC-02")).unwrap();
        assert_eq!(flagged.severity, Severity::Unverified);

        d.fields.put(33, dec!(0));
        assert!(!rules(&validate_declaration(&d)).contains(&"DC-02"));
    }

    #[test]
    fn negative_section_balance_needs_70_and_71() {
        let mut d = calculated(dec!(200), dec!(50));
        d.fields.put(40, dec!(10));
        assert!(!rules(&validate_declaration(&d)).contains(&"DC-03"));
        d.fields.set(71, None).unwrap();
        assert!(rules(&validate_declaration(&d)).contains(&"DC-03"));
    }

    #[test]
    fn validation_does_not_mutate() {
        let d = calculated(dec!(200), dec!(50));
        let before = d.clone();
        let _ = validate_declaration(&d);
        assert_eq!(d, before);
    }

    #[test]
    fn reserved_field_values_warn() {
        let mut d = calculated(dec!(200), dec!(50));
        d.fields.put(30, dec!(1));
        let errors = validate_declaration(&d);
        let w = errors.iter().find(|e| e.rule.as_deref() == Some("DC-09")).unwrap();
        assert_eq!(w.severity, Severity::Warning);
        assert_eq!(w.field, "field_30");
    }
}
