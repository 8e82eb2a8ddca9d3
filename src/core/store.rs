//! Collaborator contracts for ledger and declaration storage, plus an
//! in-memory implementation of both.
//!
//! The engine only needs a query contract. Persistence, transactions and
//! schema are the implementor's concern; the one hard requirement is that
//! [`DeclarationStore::insert`] enforces (company, period) uniqueness
//! atomically and reports a violation as [`StoreError::Conflict`].

use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

use super::document_type::{PurchaseDocumentType, SalesDocumentType};
use super::error::DeclarationError;
use super::period::Period;
use super::types::*;

/// Failure reported by a storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A declaration for this (company, period) pair already exists.
    #[error("declaration for company {company}, period {period} already exists")]
    Conflict { company: CompanyId, period: Period },

    #[error("record not found")]
    NotFound,

    #[error("{0}")]
    Backend(String),
}

impl From<StoreError> for DeclarationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { company, period } => {
                DeclarationError::DuplicateDeclaration { company, period }
            }
            other => DeclarationError::Store(other.to_string()),
        }
    }
}

/// Read access to companies and their ledgers.
pub trait LedgerStore {
    fn company_by_uic(&self, uic: &str) -> Result<Option<Company>, StoreError>;

    fn company(&self, id: CompanyId) -> Result<Option<Company>, StoreError>;

    /// Purchase entries of one company and period in insertion order,
    /// optionally narrowed to one document type.
    fn purchase_entries(
        &self,
        company: CompanyId,
        period: Period,
        document_type: Option<PurchaseDocumentType>,
    ) -> Result<Vec<PurchaseEntry>, StoreError>;

    /// Sales entries of one company and period in insertion order,
    /// optionally narrowed to one document type.
    fn sales_entries(
        &self,
        company: CompanyId,
        period: Period,
        document_type: Option<SalesDocumentType>,
    ) -> Result<Vec<SalesEntry>, StoreError>;
}

/// Declaration persistence.
pub trait DeclarationStore {
    fn existing(&self, company: CompanyId, period: Period) -> Result<Option<Declaration>, StoreError>;

    fn get(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError>;

    /// Persist a new declaration and assign its id. Must fail with
    /// [`StoreError::Conflict`] if the (company, period) pair is taken,
    /// regardless of any earlier `existing` check by the caller.
    fn insert(&self, declaration: Declaration) -> Result<DeclarationId, StoreError>;

    /// Overwrite a stored declaration; [`StoreError::NotFound`] if it has no id
    /// or the id is unknown.
    fn update(&self, declaration: &Declaration) -> Result<(), StoreError>;

    fn remove(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError>;
}

impl<T: LedgerStore + ?Sized> LedgerStore for &T {
    fn company_by_uic(&self, uic: &str) -> Result<Option<Company>, StoreError> {
        (**self).company_by_uic(uic)
    }

    fn company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        (**self).company(id)
    }

    fn purchase_entries(
        &self,
        company: CompanyId,
        period: Period,
        document_type: Option<PurchaseDocumentType>,
    ) -> Result<Vec<PurchaseEntry>, StoreError> {
        (**self).purchase_entries(company, period, document_type)
    }

    fn sales_entries(
        &self,
        company: CompanyId,
        period: Period,
        document_type: Option<SalesDocumentType>,
    ) -> Result<Vec<SalesEntry>, StoreError> {
        (**self).sales_entries(company, period, document_type)
    }
}

impl<T: DeclarationStore + ?Sized> DeclarationStore for &T {
    fn existing(&self, company: CompanyId, period: Period) -> Result<Option<Declaration>, StoreError> {
        (**self).existing(company, period)
    }

    fn get(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError> {
        (**self).get(id)
    }

    fn insert(&self, declaration: Declaration) -> Result<DeclarationId, StoreError> {
        (**self).insert(declaration)
    }

    fn update(&self, declaration: &Declaration) -> Result<(), StoreError> {
        (**self).update(declaration)
    }

    fn remove(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError> {
        (**self).remove(id)
    }
}

#[derive(Debug, Default)]
struct Tables {
    companies: BTreeMap<CompanyId, Company>,
    purchases: Vec<PurchaseEntry>,
    sales: Vec<SalesEntry>,
    declarations: BTreeMap<DeclarationId, Declaration>,
    next_entry: u64,
    next_declaration: u64,
}

/// Thread-safe in-memory store implementing both contracts.
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
/// let period = Period::parse("202403").unwrap();
/// let entry = PurchaseEntryBuilder::new(CompanyId(1), period, PurchaseDocumentType::Invoice)
///     .amounts(dec!(100), dec!(20))
///     .build()
///     .unwrap()
///     .into_entry();
/// let id = store.add_purchase(entry);
/// assert_eq!(store.purchase_entries(CompanyId(1), period, None).unwrap()[0].id, Some(id));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock()
    }

    /// Register or replace a company.
    pub fn add_company(&self, company: Company) {
        self.tables().companies.insert(company.id, company);
    }

    /// Store a purchase entry and return its assigned id.
    pub fn add_purchase(&self, mut entry: PurchaseEntry) -> EntryId {
        let mut t = self.tables();
        t.next_entry += 1;
        let id = EntryId(t.next_entry);
        entry.id = Some(id);
        t.purchases.push(entry);
        id
    }

    /// Store a sales entry and return its assigned id.
    pub fn add_sales(&self, mut entry: SalesEntry) -> EntryId {
        let mut t = self.tables();
        t.next_entry += 1;
        let id = EntryId(t.next_entry);
        entry.id = Some(id);
        t.sales.push(entry);
        id
    }

    /// Convert a stored purchase entry into a credit note in place.
    pub fn convert_to_credit_note(&self, id: EntryId) -> Result<PurchaseEntry, DeclarationError> {
        let mut t = self.tables();
        let entry = t
            .purchases
            .iter_mut()
            .find(|e| e.id == Some(id))
            .ok_or(DeclarationError::EntryNotFound { id })?;
        entry.convert_to_credit_note();
        Ok(entry.clone())
    }

    /// Number of stored declarations.
    pub fn declaration_count(&self) -> usize {
        self.tables().declarations.len()
    }
}

impl LedgerStore for MemoryStore {
    fn company_by_uic(&self, uic: &str) -> Result<Option<Company>, StoreError> {
        Ok(self
            .tables()
            .companies
            .values()
            .find(|c| c.uic == uic)
            .cloned())
    }

    fn company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.tables().companies.get(&id).cloned())
    }

    fn purchase_entries(
        &self,
        company: CompanyId,
        period: Period,
        document_type: Option<PurchaseDocumentType>,
    ) -> Result<Vec<PurchaseEntry>, StoreError> {
        Ok(self
            .tables()
            .purchases
            .iter()
            .filter(|e| e.company_id == company && e.period == period)
            .filter(|e| document_type.is_none_or(|t| e.document_type == t))
            .cloned()
            .collect())
    }

    fn sales_entries(
        &self,
        company: CompanyId,
        period: Period,
        document_type: Option<SalesDocumentType>,
    ) -> Result<Vec<SalesEntry>, StoreError> {
        Ok(self
            .tables()
            .sales
            .iter()
            .filter(|e| e.company_id == company && e.period == period)
            .filter(|e| document_type.is_none_or(|t| e.document_type == t))
            .cloned()
            .collect())
    }
}

impl DeclarationStore for MemoryStore {
    fn existing(&self, company: CompanyId, period: Period) -> Result<Option<Declaration>, StoreError> {
        Ok(self
            .tables()
            .declarations
            .values()
            .find(|d| d.company_id == company && d.period == period)
            .cloned())
    }

    fn get(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError> {
        Ok(self.tables().declarations.get(&id).cloned())
    }

    fn insert(&self, mut declaration: Declaration) -> Result<DeclarationId, StoreError> {
        // Check and insert under one lock.
        let mut t = self.tables();
        if t.declarations
            .values()
            .any(|d| d.company_id == declaration.company_id && d.period == declaration.period)
        {
            return Err(StoreError::Conflict {
                company: declaration.company_id,
                period: declaration.period,
            });
        }
        t.next_declaration += 1;
        let id = DeclarationId(t.next_declaration);
        declaration.id = Some(id);
        t.declarations.insert(id, declaration);
        Ok(id)
    }

    fn update(&self, declaration: &Declaration) -> Result<(), StoreError> {
        let id = declaration.id.ok_or(StoreError::NotFound)?;
        let mut t = self.tables();
        let slot = t.declarations.get_mut(&id).ok_or(StoreError::NotFound)?;
        *slot = declaration.clone();
        Ok(())
    }

    fn remove(&self, id: DeclarationId) -> Result<Option<Declaration>, StoreError> {
        Ok(self.tables().declarations.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::calculate;
    use rust_decimal_macros::dec;

    fn period() -> Period {
        Period::parse("202403").unwrap()
    }

    #[test]
    fn insert_enforces_company_period_uniqueness() {
        let store = MemoryStore::new();
        let d = calculate(CompanyId(1), period(), &SalesFields::default(), dec!(0));
        let id = store.insert(d.clone()).unwrap();
        assert_eq!(id, DeclarationId(1));
        assert_eq!(
            store.insert(d.clone()),
            Err(StoreError::Conflict {
                company: CompanyId(1),
                period: period()
            })
        );
        let other = calculate(CompanyId(2), period(), &SalesFields::default(), dec!(0));
        assert_eq!(store.insert(other).unwrap(), DeclarationId(2));
    }

    #[test]
    fn conflict_maps_to_duplicate_declaration() {
        let err: DeclarationError = StoreError::Conflict {
            company: CompanyId(7),
            period: period(),
        }
        .into();
        assert!(matches!(err, DeclarationError::DuplicateDeclaration { company: CompanyId(7), .. }));
    }

    #[test]
    fn concurrent_inserts_admit_one_declaration() {
        let store = MemoryStore::new();
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        store.insert(calculate(
                            CompanyId(1),
                            period(),
                            &SalesFields::default(),
                            dec!(0),
                        ))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.declaration_count(), 1);
    }

    #[test]
    fn store_usable_after_panic_while_locked() {
        let store = MemoryStore::new();
        std::thread::scope(|scope| {
            let handle = scope.spawn(|| {
                let _guard = store.tables();
                panic!("writer failed mid-update");
            });
            assert!(handle.join().is_err());
        });
        let d = calculate(CompanyId(1), period(), &SalesFields::default(), dec!(0));
        assert_eq!(store.insert(d).unwrap(), DeclarationId(1));
    }

    #[test]
    fn update_requires_known_id() {
        let store = MemoryStore::new();
        let mut d = calculate(CompanyId(1), period(), &SalesFields::default(), dec!(0));
        assert_eq!(store.update(&d), Err(StoreError::NotFound));
        d.id = Some(store.insert(d.clone()).unwrap());
        d.status = DeclarationStatus::Submitted;
        store.update(&d).unwrap();
        assert_eq!(store.get(d.id.unwrap()).unwrap().unwrap().status, DeclarationStatus::Submitted);
    }

    #[test]
    fn entries_filtered_by_company_period_and_type() {
        use crate::core::builder::PurchaseEntryBuilder;
        let store = MemoryStore::new();
        let other = Period::parse("202404").unwrap();
        for (company, p, t) in [
            (CompanyId(1), period(), PurchaseDocumentType::Invoice),
            (CompanyId(1), period(), PurchaseDocumentType::NoTaxCredit),
            (CompanyId(1), other, PurchaseDocumentType::Invoice),
            (CompanyId(2), period(), PurchaseDocumentType::Invoice),
        ] {
            store.add_purchase(PurchaseEntryBuilder::new(company, p, t).build_unchecked());
        }
        assert_eq!(store.purchase_entries(CompanyId(1), period(), None).unwrap().len(), 2);
        let invoices = store
            .purchase_entries(CompanyId(1), period(), Some(PurchaseDocumentType::Invoice))
            .unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].id, Some(EntryId(1)));
    }

    #[test]
    fn convert_stored_entry() {
        use crate::core::builder::PurchaseEntryBuilder;
        let store = MemoryStore::new();
        let id = store.add_purchase(
            PurchaseEntryBuilder::new(CompanyId(1), period(), PurchaseDocumentType::Invoice)
                .amounts(dec!(100), dec!(20))
                .build_unchecked(),
        );
        let converted = store.convert_to_credit_note(id).unwrap();
        assert_eq!(converted.vat_amount, dec!(-20));
        assert_eq!(
            store.purchase_entries(CompanyId(1), period(), None).unwrap()[0].document_type,
            PurchaseDocumentType::CreditNote
        );
        assert!(matches!(
            store.convert_to_credit_note(EntryId(99)),
            Err(DeclarationError::EntryNotFound { .. })
        ));
    }
}
