use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::config::EngineConfig;
use super::document_type::{DocumentCategory, DocumentType, PurchaseDocumentType, SalesDocumentType};
use super::error::{DeclarationError, ValidationError};
use super::period::Period;
use super::types::*;
use super::validation;

/// A freshly built ledger entry plus the advisory findings it was accepted with.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryOutcome<T> {
    pub entry: T,
    /// Warnings only; anything error-level fails the build.
    pub warnings: Vec<ValidationError>,
}

impl<T> EntryOutcome<T> {
    pub fn into_entry(self) -> T {
        self.entry
    }
}

/// Builder for purchase ledger entries with creation-time validation.
///
/// ```
/// use dds::core::*;
/// use rust_decimal_macros::dec;
///
/// let period = Period::parse("202403").unwrap();
/// let outcome = PurchaseEntryBuilder::new(CompanyId(1), period, PurchaseDocumentType::Customs)
///     .amounts(dec!(1000), dec!(200))
///     .customs_document_ref("24BG005800M0012345")
///     .build()
///     .unwrap();
/// assert_eq!(outcome.entry.deductible_vat(), dec!(200));
///
/// let err = PurchaseEntryBuilder::new(CompanyId(1), period, PurchaseDocumentType::Customs)
///     .amounts(dec!(1000), dec!(200))
///     .build()
///     .unwrap_err();
/// assert!(matches!(err, DeclarationError::RequiredFieldMissing { .. }));
/// ```
#[derive(Debug, Clone)]
pub struct PurchaseEntryBuilder {
    entry: PurchaseEntry,
    total_set: bool,
}

impl PurchaseEntryBuilder {
    pub fn new(company_id: CompanyId, period: Period, document_type: PurchaseDocumentType) -> Self {
        Self {
            entry: PurchaseEntry {
                id: None,
                company_id,
                period,
                document_type,
                document_number: None,
                document_date: None,
                supplier_name: None,
                supplier_vat: None,
                supplier_country: None,
                tax_base: Decimal::ZERO,
                vat_amount: Decimal::ZERO,
                total_amount: Decimal::ZERO,
                credit_tax_base: Decimal::ZERO,
                credit_vat: Decimal::ZERO,
                customs_document_ref: None,
                customs_office: None,
                article_15a_type: None,
                aggregate_period_from: None,
                aggregate_period_to: None,
                tax_credit_excluded: document_type == PurchaseDocumentType::NoTaxCredit,
                exclusion_reason: None,
                triangular_operation_type: None,
                intermediary_vat: None,
                final_customer_vat: None,
                vat_application_type: None,
                application_reference: None,
                vies_validated: false,
                vies_company_name: None,
                notes: None,
            },
            total_set: false,
        }
    }

    /// Start from a raw document type code, failing on codes outside the registry.
    pub fn from_code(company_id: CompanyId, period: Period, code: u8) -> Result<Self, DeclarationError> {
        PurchaseDocumentType::from_code(code)
            .map(|t| Self::new(company_id, period, t))
            .ok_or(DeclarationError::UnknownDocumentType {
                category: DocumentCategory::Purchase,
                code,
            })
    }

    pub fn document(mut self, number: impl Into<String>, date: NaiveDate) -> Self {
        self.entry.document_number = Some(number.into());
        self.entry.document_date = Some(date);
        self
    }

    pub fn supplier(mut self, name: impl Into<String>, vat: impl Into<String>) -> Self {
        self.entry.supplier_name = Some(name.into());
        self.entry.supplier_vat = Some(vat.into());
        self
    }

    pub fn supplier_country(mut self, code: impl Into<String>) -> Self {
        self.entry.supplier_country = Some(code.into());
        self
    }

    /// Tax base and VAT; the total defaults to their sum.
    pub fn amounts(mut self, tax_base: Decimal, vat_amount: Decimal) -> Self {
        self.entry.tax_base = tax_base;
        self.entry.vat_amount = vat_amount;
        self
    }

    pub fn total_amount(mut self, total: Decimal) -> Self {
        self.entry.total_amount = total;
        self.total_set = true;
        self
    }

    /// Credit adjustments; both must be non-positive.
    pub fn credit(mut self, credit_tax_base: Decimal, credit_vat: Decimal) -> Self {
        self.entry.credit_tax_base = credit_tax_base;
        self.entry.credit_vat = credit_vat;
        self
    }

    pub fn customs_document_ref(mut self, reference: impl Into<String>) -> Self {
        self.entry.customs_document_ref = Some(reference.into());
        self
    }

    pub fn customs_office(mut self, office: impl Into<String>) -> Self {
        self.entry.customs_office = Some(office.into());
        self
    }

    pub fn article_15a_type(mut self, kind: u8) -> Self {
        self.entry.article_15a_type = Some(kind);
        self
    }

    pub fn aggregate_period(mut self, from: Period, to: Period) -> Self {
        self.entry.aggregate_period_from = Some(from);
        self.entry.aggregate_period_to = Some(to);
        self
    }

    /// Exclude the entry from deductible VAT.
    pub fn exclude_tax_credit(mut self, reason: impl Into<String>) -> Self {
        self.entry.tax_credit_excluded = true;
        self.entry.exclusion_reason = Some(reason.into());
        self
    }

    pub fn triangular_operation_type(mut self, kind: u8) -> Self {
        self.entry.triangular_operation_type = Some(kind);
        self
    }

    pub fn intermediary_vat(mut self, vat: impl Into<String>) -> Self {
        self.entry.intermediary_vat = Some(vat.into());
        self
    }

    pub fn final_customer_vat(mut self, vat: impl Into<String>) -> Self {
        self.entry.final_customer_vat = Some(vat.into());
        self
    }

    /// VAT application type code (91–94). Defaults to the document type code
    /// for VAT application entries.
    pub fn vat_application_type(mut self, code: u8) -> Self {
        self.entry.vat_application_type = Some(code);
        self
    }

    pub fn application_reference(mut self, reference: impl Into<String>) -> Self {
        self.entry.application_reference = Some(reference.into());
        self
    }

    /// Result of an external registry lookup made by the caller.
    pub fn vies(mut self, validated: bool, company_name: Option<String>) -> Self {
        self.entry.vies_validated = validated;
        self.entry.vies_company_name = company_name;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.entry.notes = Some(notes.into());
        self
    }

    /// Build with the default [`EngineConfig`].
    pub fn build(self) -> Result<EntryOutcome<PurchaseEntry>, DeclarationError> {
        self.build_with(&EngineConfig::default())
    }

    /// Build and run creation-time validation.
    ///
    /// Fails on an out-of-effect document type, forbidden amount signs or
    /// missing required auxiliary data. Arithmetic and VAT format findings
    /// are returned as warnings unless `config.strict_arithmetic` is set.
    pub fn build_with(self, config: &EngineConfig) -> Result<EntryOutcome<PurchaseEntry>, DeclarationError> {
        let entry = self.build_unchecked();
        let document_type = DocumentType::Purchase(entry.document_type);

        check_effective(document_type, entry.period)?;
        check_amounts(document_type, validation::purchase_amount_signs(&entry))?;

        let missing = validation::purchase_required_fields(&entry);
        if !missing.is_empty() {
            return Err(DeclarationError::RequiredFieldMissing {
                document_type,
                violations: missing,
            });
        }

        let warnings: Vec<_> = validation::validate_purchase_entry(&entry, config)
            .into_iter()
            .filter(|v| !v.is_error())
            .collect();
        finish(entry, warnings, document_type, config)
    }

    /// Assemble the entry without validation, e.g. when loading stored records.
    pub fn build_unchecked(mut self) -> PurchaseEntry {
        if self.entry.document_type == PurchaseDocumentType::NoTaxCredit {
            self.entry.tax_credit_excluded = true;
        }
        if self.entry.document_type.is_vat_application() && self.entry.vat_application_type.is_none() {
            self.entry.vat_application_type = Some(self.entry.document_type.code());
        }
        if !self.total_set {
            self.entry.total_amount = self.entry.tax_base + self.entry.vat_amount;
        }
        self.entry
    }
}

/// Builder for sales ledger entries with creation-time validation.
///
/// Unless an explicit field vector is supplied, the document type's field
/// mapping decides which of fields 09–25 the amounts land on.
///
/// ```
/// use dds::core::*;
/// use rust_decimal_macros::dec;
///
/// let period = Period::parse("202403").unwrap();
/// let entry = SalesEntryBuilder::new(CompanyId(1), period, SalesDocumentType::EuSales)
///     .customer("Kunde GmbH", "DE123456789", "DE")
///     .amounts(dec!(5000), dec!(0))
///     .build()
///     .unwrap()
///     .into_entry();
/// assert_eq!(entry.fields.value(13), dec!(5000));
/// ```
#[derive(Debug, Clone)]
pub struct SalesEntryBuilder {
    entry: SalesEntry,
    total_set: bool,
    fields_set: bool,
}

impl SalesEntryBuilder {
    pub fn new(company_id: CompanyId, period: Period, document_type: SalesDocumentType) -> Self {
        Self {
            entry: SalesEntry {
                id: None,
                company_id,
                period,
                document_type,
                document_number: None,
                document_date: None,
                customer_name: None,
                customer_vat: None,
                customer_country: None,
                tax_base: Decimal::ZERO,
                vat_amount: Decimal::ZERO,
                total_amount: Decimal::ZERO,
                fields: SalesFields::default(),
                eu_distance_selling: false,
                triangular_sales_type: None,
                vies_validated: false,
                vies_company_name: None,
                notes: None,
            },
            total_set: false,
            fields_set: false,
        }
    }

    /// Start from a raw document type code, failing on codes outside the registry.
    pub fn from_code(company_id: CompanyId, period: Period, code: u8) -> Result<Self, DeclarationError> {
        SalesDocumentType::from_code(code)
            .map(|t| Self::new(company_id, period, t))
            .ok_or(DeclarationError::UnknownDocumentType {
                category: DocumentCategory::Sales,
                code,
            })
    }

    pub fn document(mut self, number: impl Into<String>, date: NaiveDate) -> Self {
        self.entry.document_number = Some(number.into());
        self.entry.document_date = Some(date);
        self
    }

    pub fn customer(
        mut self,
        name: impl Into<String>,
        vat: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.entry.customer_name = Some(name.into());
        self.entry.customer_vat = Some(vat.into());
        self.entry.customer_country = Some(country.into());
        self
    }

    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.entry.customer_name = Some(name.into());
        self
    }

    /// Tax base and VAT; the total defaults to their sum.
    pub fn amounts(mut self, tax_base: Decimal, vat_amount: Decimal) -> Self {
        self.entry.tax_base = tax_base;
        self.entry.vat_amount = vat_amount;
        self
    }

    pub fn total_amount(mut self, total: Decimal) -> Self {
        self.entry.total_amount = total;
        self.total_set = true;
        self
    }

    /// Supply the field vector directly instead of using the type's mapping.
    pub fn fields(mut self, fields: SalesFields) -> Self {
        self.entry.fields = fields;
        self.fields_set = true;
        self
    }

    /// Set a single field, switching to an explicit field vector.
    pub fn field(mut self, field: u8, value: Decimal) -> Result<Self, DeclarationError> {
        self.entry.fields.set(field, value)?;
        self.fields_set = true;
        Ok(self)
    }

    pub fn eu_distance_selling(mut self, flag: bool) -> Self {
        self.entry.eu_distance_selling = flag;
        self
    }

    pub fn triangular_sales_type(mut self, kind: u8) -> Self {
        self.entry.triangular_sales_type = Some(kind);
        self
    }

    /// Result of an external registry lookup made by the caller.
    pub fn vies(mut self, validated: bool, company_name: Option<String>) -> Self {
        self.entry.vies_validated = validated;
        self.entry.vies_company_name = company_name;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.entry.notes = Some(notes.into());
        self
    }

    /// Build with the default [`EngineConfig`].
    pub fn build(self) -> Result<EntryOutcome<SalesEntry>, DeclarationError> {
        self.build_with(&EngineConfig::default())
    }

    /// Build and run creation-time validation. See [`PurchaseEntryBuilder::build_with`].
    pub fn build_with(self, config: &EngineConfig) -> Result<EntryOutcome<SalesEntry>, DeclarationError> {
        let entry = self.build_unchecked();
        let document_type = DocumentType::Sales(entry.document_type);

        check_effective(document_type, entry.period)?;
        check_amounts(document_type, validation::sales_amount_signs(&entry))?;

        let missing = validation::sales_required_fields(&entry, config);
        if !missing.is_empty() {
            return Err(DeclarationError::RequiredFieldMissing {
                document_type,
                violations: missing,
            });
        }

        let warnings: Vec<_> = validation::validate_sales_entry(&entry, config)
            .into_iter()
            .filter(|v| !v.is_error())
            .collect();
        finish(entry, warnings, document_type, config)
    }

    /// Assemble the entry without validation, e.g. when loading stored records.
    pub fn build_unchecked(mut self) -> SalesEntry {
        if !self.fields_set {
            self.entry.fields = self
                .entry
                .document_type
                .map_fields(self.entry.tax_base, self.entry.vat_amount);
        }
        if !self.total_set {
            self.entry.total_amount = self.entry.tax_base + self.entry.vat_amount;
        }
        self.entry
    }
}

fn check_effective(document_type: DocumentType, period: Period) -> Result<(), DeclarationError> {
    if document_type.rule().is_effective(period) {
        Ok(())
    } else {
        Err(DeclarationError::DocumentTypeNotEffective {
            document_type,
            period,
        })
    }
}

fn check_amounts(
    document_type: DocumentType,
    violations: Vec<ValidationError>,
) -> Result<(), DeclarationError> {
    match violations.into_iter().next() {
        Some(v) => Err(DeclarationError::InvalidAmount {
            document_type,
            field: v.field,
            rule: v.rule.unwrap_or_default(),
            reason: v.message,
        }),
        None => Ok(()),
    }
}

fn finish<T>(
    entry: T,
    warnings: Vec<ValidationError>,
    document_type: DocumentType,
    config: &EngineConfig,
) -> Result<EntryOutcome<T>, DeclarationError> {
    if config.strict_arithmetic && warnings.iter().any(|w| w.rule.as_deref() == Some("AR-01")) {
        return Err(DeclarationError::ValidationFailed(warnings));
    }
    for w in &warnings {
        tracing::warn!(%document_type, finding = %w, "ledger entry accepted with warning");
    }
    Ok(EntryOutcome { entry, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Severity;
    use rust_decimal_macros::dec;

    fn period() -> Period {
        Period::parse("202403").unwrap()
    }

    #[test]
    fn total_defaults_to_sum() {
        let e = PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
            .amounts(dec!(100), dec!(20))
            .build_unchecked();
        assert_eq!(e.total_amount, dec!(120));

        let e = PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
            .amounts(dec!(100), dec!(20))
            .total_amount(dec!(119.99))
            .build_unchecked();
        assert_eq!(e.total_amount, dec!(119.99));
    }

    #[test]
    fn unknown_codes_fail_fast() {
        assert!(matches!(
            PurchaseEntryBuilder::from_code(CompanyId(1), period(), 4),
            Err(DeclarationError::UnknownDocumentType { category: DocumentCategory::Purchase, code: 4 })
        ));
        assert!(matches!(
            SalesEntryBuilder::from_code(CompanyId(1), period(), 7),
            Err(DeclarationError::UnknownDocumentType { category: DocumentCategory::Sales, code: 7 })
        ));
        assert!(PurchaseEntryBuilder::from_code(CompanyId(1), period(), 94).is_ok());
    }

    #[test]
    fn no_tax_credit_is_always_excluded() {
        let e = PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::NoTaxCredit)
            .amounts(dec!(100), dec!(20))
            .build()
            .unwrap()
            .entry;
        assert!(e.tax_credit_excluded);
        assert_eq!(e.deductible_vat(), dec!(0));
    }

    #[test]
    fn negative_amount_rejected() {
        let err = PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
            .amounts(dec!(-100), dec!(-20))
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[AM-01] invalid amount on purchase 01 (Invoice) entry, tax_base: must not be negative, got -100"
        );
        match err {
            DeclarationError::InvalidAmount {
                document_type,
                field,
                rule,
                ..
            } => {
                assert_eq!(document_type, DocumentType::Purchase(PurchaseDocumentType::Invoice));
                assert_eq!(field, "tax_base");
                assert_eq!(rule, "AM-01");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn positive_credit_rejected() {
        let err = PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
            .amounts(dec!(100), dec!(20))
            .credit(dec!(0), dec!(5))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            DeclarationError::InvalidAmount { ref field, ref rule, .. }
                if field == "credit_vat" && rule == "AM-02"
        ));
    }

    #[test]
    fn article_15a_before_april_2020_not_effective() {
        let early = Period::parse("202003").unwrap();
        let err = PurchaseEntryBuilder::new(CompanyId(1), early, PurchaseDocumentType::Article15a)
            .article_15a_type(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, DeclarationError::DocumentTypeNotEffective { .. }));

        let ok = PurchaseEntryBuilder::new(CompanyId(1), Period::parse("202004").unwrap(), PurchaseDocumentType::Article15a)
            .article_15a_type(1)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn arithmetic_mismatch_is_a_warning_by_default() {
        let outcome = PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
            .amounts(dec!(100), dec!(25))
            .build()
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn strict_mode_rejects_arithmetic_mismatch() {
        let config = EngineConfig {
            strict_arithmetic: true,
            ..EngineConfig::default()
        };
        let err = SalesEntryBuilder::new(CompanyId(1), period(), SalesDocumentType::Domestic)
            .amounts(dec!(100), dec!(25))
            .build_with(&config)
            .unwrap_err();
        assert!(matches!(err, DeclarationError::ValidationFailed(ref v) if v.len() == 1));
    }

    #[test]
    fn strict_mode_ignores_format_warnings() {
        let config = EngineConfig {
            strict_arithmetic: true,
            ..EngineConfig::default()
        };
        let outcome = PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
            .supplier("Доставчик", "not-a-vat")
            .amounts(dec!(100), dec!(20))
            .build_with(&config)
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].field, "supplier_vat");
    }

    #[test]
    fn sales_mapping_by_type() {
        let cases = [
            (SalesDocumentType::Domestic, vec![(9, dec!(1000)), (10, dec!(200))]),
            (SalesDocumentType::Export, vec![(14, dec!(1000))]),
            (SalesDocumentType::IntraCommunity, vec![(15, dec!(1000))]),
            (SalesDocumentType::DistanceSelling, vec![(16, dec!(1000)), (17, dec!(200))]),
        ];
        for (t, expected) in cases {
            let e = SalesEntryBuilder::new(CompanyId(1), period(), t)
                .amounts(dec!(1000), dec!(200))
                .build_unchecked();
            let non_zero: Vec<(u8, Decimal)> = e.fields.iter().filter(|(_, v)| !v.is_zero()).collect();
            assert_eq!(non_zero, expected, "{t:?}");
        }
    }

    #[test]
    fn explicit_fields_win_over_mapping() {
        let e = SalesEntryBuilder::new(CompanyId(1), period(), SalesDocumentType::Domestic)
            .amounts(dec!(1000), dec!(200))
            .field(23, dec!(-50))
            .unwrap()
            .build()
            .unwrap()
            .entry;
        assert_eq!(e.fields.value(9), dec!(0));
        assert_eq!(e.fields.value(23), dec!(-50));
    }

    #[test]
    fn eu_sale_to_domestic_customer_rejected() {
        let err = SalesEntryBuilder::new(CompanyId(1), period(), SalesDocumentType::EuSales)
            .customer("Клиент", "BG123456789", "BG")
            .amounts(dec!(1000), dec!(0))
            .build()
            .unwrap_err();
        match err {
            DeclarationError::RequiredFieldMissing { violations, .. } => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "customer_country");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
