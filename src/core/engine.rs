use chrono::NaiveDateTime;

use super::aggregation::{self, PeriodAggregate};
use super::calculator;
use super::config::EngineConfig;
use super::document_type::DocumentType;
use super::error::{DeclarationError, Violation};
use super::numbering::SubmissionReference;
use super::period::Period;
use super::store::{DeclarationStore, LedgerStore};
use super::types::*;
use super::validation;

/// Declaration engine over a ledger and a declaration store.
///
/// Each operation reads what it needs once, computes, and writes back once.
/// The engine holds no mutable state of its own.
///
/// ```
/// use dds::core::*;
/// use rust_decimal_macros::dec;
///
/// let store = MemoryStore::new();
/// store.add_company(Company {
///     id: CompanyId(1),
///     uic: "123456789".into(),
///     vat_number: "BG123456789".into(),
///     name: "Пример ЕООД".into(),
///     active: true,
/// });
/// let period = Period::parse("202103").unwrap();
/// store.add_sales(
///     SalesEntryBuilder::new(CompanyId(1), period, SalesDocumentType::Domestic)
///         .amounts(dec!(1000), dec!(200))
///         .build()
///         .unwrap()
///         .into_entry(),
/// );
///
/// let engine = DeclarationEngine::new(&store, &store);
/// let declaration = engine.generate("123456789", "202103").unwrap();
/// assert_eq!(declaration.field(70), dec!(200));
/// assert!(engine.validate(declaration.id.unwrap()).unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct DeclarationEngine<L, D> {
    ledger: L,
    declarations: D,
    config: EngineConfig,
}

impl<L: LedgerStore, D: DeclarationStore> DeclarationEngine<L, D> {
    pub fn new(ledger: L, declarations: D) -> Self {
        Self::with_config(ledger, declarations, EngineConfig::default())
    }

    pub fn with_config(ledger: L, declarations: D, config: EngineConfig) -> Self {
        Self {
            ledger,
            declarations,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate the declaration for the company registered under `uic` and a
    /// `YYYYMM` period.
    pub fn generate(&self, uic: &str, period: &str) -> Result<Declaration, DeclarationError> {
        let period = Period::parse(period)?;
        let company = self
            .ledger
            .company_by_uic(uic)?
            .ok_or_else(|| DeclarationError::CompanyNotFound { uic: uic.to_string() })?;
        self.generate_for(company.id, period)
    }

    /// Generate, calculate and store the declaration for (company, period).
    ///
    /// Fails with `DuplicateDeclaration` if one already exists, whether found
    /// up front or reported by the store on insert.
    pub fn generate_for(&self, company: CompanyId, period: Period) -> Result<Declaration, DeclarationError> {
        if self.ledger.company(company)?.is_none() {
            return Err(DeclarationError::CompanyIdNotFound { id: company });
        }
        if self.declarations.existing(company, period)?.is_some() {
            return Err(DeclarationError::DuplicateDeclaration { company, period });
        }

        let aggregate = aggregation::aggregate(&self.ledger, company, period, None)?;
        let mut declaration = calculator::calculate_from(company, period, &aggregate);

        let id = self.declarations.insert(declaration.clone()).map_err(|e| {
            tracing::warn!(%company, %period, error = %e, "declaration insert rejected");
            DeclarationError::from(e)
        })?;
        declaration.id = Some(id);

        tracing::info!(
            %id,
            %company,
            %period,
            payment_due = %declaration.payment_due,
            refund_due = %declaration.refund_due,
            "declaration generated"
        );
        Ok(declaration)
    }

    /// Aggregate a company's ledger for a period without creating anything.
    pub fn aggregate(
        &self,
        company: CompanyId,
        period: Period,
        filter: Option<DocumentType>,
    ) -> Result<PeriodAggregate, DeclarationError> {
        aggregation::aggregate(&self.ledger, company, period, filter)
    }

    /// Re-run aggregation and calculation on a DRAFT or CALCULATED declaration.
    pub fn recalculate(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        let mut declaration = self.load(id)?;
        let aggregate = aggregation::aggregate(
            &self.ledger,
            declaration.company_id,
            declaration.period,
            None,
        )?;
        declaration.apply_calculation(calculator::calculate_from(
            declaration.company_id,
            declaration.period,
            &aggregate,
        ))?;
        self.declarations.update(&declaration)?;
        tracing::info!(%id, period = %declaration.period, "declaration recalculated");
        Ok(declaration)
    }

    /// Run declaration-level validation. An empty list means no findings.
    pub fn validate(&self, id: DeclarationId) -> Result<Vec<Violation>, DeclarationError> {
        Ok(validation::validate_declaration(&self.load(id)?))
    }

    /// Submit with the current local time.
    pub fn submit(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        self.submit_at(id, chrono::Local::now().naive_local())
    }

    /// Submit at a given time (DRAFT or CALCULATED → SUBMITTED).
    pub fn submit_at(&self, id: DeclarationId, now: NaiveDateTime) -> Result<Declaration, DeclarationError> {
        let mut declaration = self.load(id)?;
        let reference = SubmissionReference::new(&self.config.submission_prefix, now.date(), id);
        declaration.submit(now, reference.into())?;
        self.declarations.update(&declaration)?;
        tracing::info!(
            %id,
            period = %declaration.period,
            reference = declaration.submission_reference.as_deref().unwrap_or_default(),
            deadline = %declaration.payment_deadline,
            "declaration submitted"
        );
        Ok(declaration)
    }

    /// Revert a submitted declaration to DRAFT.
    pub fn revert(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        let mut declaration = self.load(id)?;
        declaration.revert()?;
        self.declarations.update(&declaration)?;
        tracing::info!(%id, period = %declaration.period, "declaration reverted to draft");
        Ok(declaration)
    }

    /// Delete a DRAFT declaration.
    pub fn delete(&self, id: DeclarationId) -> Result<(), DeclarationError> {
        self.load(id)?.ensure_deletable()?;
        self.declarations.remove(id)?;
        tracing::info!(%id, "declaration deleted");
        Ok(())
    }

    /// Manually set or clear one field; the declaration becomes MANUAL.
    pub fn override_field(
        &self,
        id: DeclarationId,
        field: u8,
        value: Option<rust_decimal::Decimal>,
    ) -> Result<Declaration, DeclarationError> {
        let mut declaration = self.load(id)?;
        declaration.override_field(field, value)?;
        self.declarations.update(&declaration)?;
        tracing::info!(%id, field, "declaration field overridden");
        Ok(declaration)
    }

    pub fn declaration(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        self.load(id)
    }

    /// The declaration for (company, period), if one exists.
    pub fn declaration_for(
        &self,
        company: CompanyId,
        period: Period,
    ) -> Result<Option<Declaration>, DeclarationError> {
        Ok(self.declarations.existing(company, period)?)
    }

    fn load(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        self.declarations
            .get(id)?
            .ok_or(DeclarationError::DeclarationNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::{PurchaseEntryBuilder, SalesEntryBuilder};
    use crate::core::document_type::{PurchaseDocumentType, SalesDocumentType};
    use crate::core::store::{MemoryStore, StoreError};
    use rust_decimal_macros::dec;

    const UIC: &str = "123456789";

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_company(Company {
            id: CompanyId(1),
            uic: UIC.into(),
            vat_number: "BG123456789".into(),
            name: "Тест ООД".into(),
            active: true,
        });
        store
    }

    fn period() -> Period {
        Period::parse("202403").unwrap()
    }

    #[test]
    fn unknown_company() {
        let s = store();
        let engine = DeclarationEngine::new(&s, &s);
        assert!(matches!(
            engine.generate("999999999", "202403"),
            Err(DeclarationError::CompanyNotFound { .. })
        ));
        assert!(matches!(
            engine.generate_for(CompanyId(2), period()),
            Err(DeclarationError::CompanyIdNotFound { .. })
        ));
    }

    #[test]
    fn invalid_period_aborts_before_lookup() {
        let s = store();
        let engine = DeclarationEngine::new(&s, &s);
        assert!(matches!(
            engine.generate(UIC, "203101"),
            Err(DeclarationError::InvalidPeriod { .. })
        ));
        assert_eq!(s.declaration_count(), 0);
    }

    #[test]
    fn generate_then_duplicate() {
        let s = store();
        s.add_sales(
            SalesEntryBuilder::new(CompanyId(1), period(), SalesDocumentType::Domestic)
                .amounts(dec!(1000), dec!(200))
                .build_unchecked(),
        );
        s.add_purchase(
            PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
                .amounts(dec!(250), dec!(50))
                .build_unchecked(),
        );
        let engine = DeclarationEngine::new(&s, &s);
        let first = engine.generate(UIC, "202403").unwrap();
        assert_eq!(first.field(70), dec!(150));

        assert!(matches!(
            engine.generate(UIC, "202403"),
            Err(DeclarationError::DuplicateDeclaration { .. })
        ));
        assert_eq!(engine.declaration(first.id.unwrap()).unwrap(), first);
    }

    /// Declaration store whose existence check always misses, so the
    /// insert-time conflict is what stops a second declaration.
    struct RacingStore<'a>(&'a MemoryStore);

    impl DeclarationStore for RacingStore<'_> {
        fn existing(&self, _: CompanyId, _: Period) -> Result<Option<Declaration>, StoreError> {
            Ok(None)
        }
        fn get(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError> {
            self.0.get(id)
        }
        fn insert(&self, d: Declaration) -> Result<DeclarationId, StoreError> {
            self.0.insert(d)
        }
        fn update(&self, d: &Declaration) -> Result<(), StoreError> {
            self.0.update(d)
        }
        fn remove(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError> {
            self.0.remove(id)
        }
    }

    #[test]
    fn insert_conflict_surfaces_as_duplicate() {
        let s = store();
        let engine = DeclarationEngine::new(&s, RacingStore(&s));
        engine.generate(UIC, "202403").unwrap();
        assert!(matches!(
            engine.generate(UIC, "202403"),
            Err(DeclarationError::DuplicateDeclaration { .. })
        ));
        assert_eq!(s.declaration_count(), 1);
    }

    #[test]
    fn submit_assigns_reference() {
        let s = store();
        let engine = DeclarationEngine::new(&s, &s);
        let d = engine.generate(UIC, "202403").unwrap();
        let now = chrono::NaiveDate::from_ymd_opt(2024, 4, 9)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let submitted = engine.submit_at(d.id.unwrap(), now).unwrap();
        assert_eq!(submitted.submission_reference.as_deref(), Some("NAP20240409000001"));
        assert_eq!(
            engine.declaration(d.id.unwrap()).unwrap().status,
            DeclarationStatus::Submitted
        );
    }

    #[test]
    fn delete_only_drafts() {
        let s = store();
        let engine = DeclarationEngine::new(&s, &s);
        let id = engine.generate(UIC, "202403").unwrap().id.unwrap();
        assert!(matches!(
            engine.delete(id),
            Err(DeclarationError::CannotDeleteNonDraft { .. })
        ));
        engine.submit(id).unwrap();
        engine.revert(id).unwrap();
        engine.delete(id).unwrap();
        assert!(matches!(
            engine.declaration(id),
            Err(DeclarationError::DeclarationNotFound { .. })
        ));
        assert!(engine.declaration_for(CompanyId(1), period()).unwrap().is_none());
    }

    #[test]
    fn recalculate_picks_up_new_entries() {
        let s = store();
        let engine = DeclarationEngine::new(&s, &s);
        let id = engine.generate(UIC, "202403").unwrap().id.unwrap();
        s.add_purchase(
            PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
                .amounts(dec!(100), dec!(20))
                .build_unchecked(),
        );
        let d = engine.recalculate(id).unwrap();
        assert_eq!(d.field(71), dec!(20));
        assert_eq!(d.refund_due, dec!(20));
    }

    #[test]
    fn override_marks_manual() {
        let s = store();
        let engine = DeclarationEngine::new(&s, &s);
        let id = engine.generate(UIC, "202403").unwrap().id.unwrap();
        let d = engine.override_field(id, 71, None).unwrap();
        assert_eq!(d.calculation_method, CalculationMethod::Manual);
        assert_eq!(d.fields.get(71), None);
        assert!(matches!(
            engine.override_field(id, 90, Some(dec!(1))),
            Err(DeclarationError::UnknownField { field: 90, .. })
        ));
    }
}
