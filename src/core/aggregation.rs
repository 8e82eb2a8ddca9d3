//! Folding ledger entries into declaration inputs.
//!
//! Sales entries carry their own field 09–25 contribution, fixed when the
//! entry was created; aggregation only sums those vectors. Purchase entries
//! contribute deductible VAT unless excluded from tax credit.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::document_type::{DocumentType, PurchaseDocumentType, SalesDocumentType};
use super::error::DeclarationError;
use super::period::Period;
use super::store::LedgerStore;
use super::types::*;

/// Aggregated inputs for one company and period.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodAggregate {
    /// Componentwise sum of every sales entry's field vector.
    pub sales: SalesFields,
    /// Σ(vat_amount − credit_vat) over purchase entries not excluded from tax credit.
    pub deductible_vat: Decimal,
    /// Field 13 contributed by triangular sales only.
    pub triangular_sales: Decimal,
    pub sales_entries: usize,
    pub purchase_entries: usize,
}

/// Sum sales field vectors componentwise.
pub fn aggregate_sales<'a>(entries: impl IntoIterator<Item = &'a SalesEntry>) -> SalesFields {
    entries
        .into_iter()
        .fold(SalesFields::default(), |mut acc, e| {
            acc += &e.fields;
            acc
        })
}

/// Total deductible purchase VAT.
///
/// `credit_vat` is stored non-positive, so subtracting it restores the VAT a
/// credit adjustment removed. Excluded entries contribute nothing.
///
/// ```
/// use dds::core::*;
/// use rust_decimal_macros::dec;
///
/// let period = Period::parse("202403").unwrap();
/// let invoice = PurchaseEntryBuilder::new(CompanyId(1), period, PurchaseDocumentType::Invoice)
///     .amounts(dec!(250), dec!(50))
///     .build_unchecked();
/// let excluded = PurchaseEntryBuilder::new(CompanyId(1), period, PurchaseDocumentType::NoTaxCredit)
///     .amounts(dec!(500), dec!(100))
///     .build_unchecked();
/// assert_eq!(deductible_purchase_vat([&invoice, &excluded]), dec!(50));
/// ```
pub fn deductible_purchase_vat<'a>(entries: impl IntoIterator<Item = &'a PurchaseEntry>) -> Decimal {
    entries.into_iter().map(PurchaseEntry::deductible_vat).sum()
}

/// Aggregate already-fetched entries.
pub fn aggregate_entries(sales: &[SalesEntry], purchases: &[PurchaseEntry]) -> PeriodAggregate {
    PeriodAggregate {
        sales: aggregate_sales(sales),
        deductible_vat: deductible_purchase_vat(purchases),
        triangular_sales: sales
            .iter()
            .filter(|e| e.document_type == SalesDocumentType::Triangular)
            .map(|e| e.fields.value(13))
            .sum(),
        sales_entries: sales.len(),
        purchase_entries: purchases.len(),
    }
}

/// Pull a company's entries for `period` from the ledger and aggregate them.
///
/// A document type filter narrows the scope to entries of exactly that type;
/// the other ledger then contributes nothing.
pub fn aggregate<L: LedgerStore>(
    ledger: &L,
    company: CompanyId,
    period: Period,
    filter: Option<DocumentType>,
) -> Result<PeriodAggregate, DeclarationError> {
    let (sales, purchases) = match filter {
        None => (
            ledger.sales_entries(company, period, None)?,
            ledger.purchase_entries(company, period, None)?,
        ),
        Some(DocumentType::Sales(t)) => (ledger.sales_entries(company, period, Some(t))?, Vec::new()),
        Some(DocumentType::Purchase(t)) => {
            (Vec::new(), ledger.purchase_entries(company, period, Some(t))?)
        }
    };

    let aggregate = aggregate_entries(&sales, &purchases);
    tracing::debug!(
        %company,
        %period,
        sales_entries = aggregate.sales_entries,
        purchase_entries = aggregate.purchase_entries,
        sales_vat = %aggregate.sales.value(10),
        deductible_vat = %aggregate.deductible_vat,
        "aggregated ledger"
    );
    Ok(aggregate)
}

/// Per-type totals over purchase entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTypeSummary {
    pub document_type: PurchaseDocumentType,
    pub count: usize,
    pub tax_base: Decimal,
    pub vat_amount: Decimal,
    pub total_amount: Decimal,
}

/// Count and sum purchase entries by document type, ordered by type code.
pub fn purchase_summary_by_type<'a>(
    entries: impl IntoIterator<Item = &'a PurchaseEntry>,
) -> Vec<PurchaseTypeSummary> {
    let mut by_type: BTreeMap<PurchaseDocumentType, PurchaseTypeSummary> = BTreeMap::new();
    for e in entries {
        let s = by_type
            .entry(e.document_type)
            .or_insert_with(|| PurchaseTypeSummary {
                document_type: e.document_type,
                count: 0,
                tax_base: Decimal::ZERO,
                vat_amount: Decimal::ZERO,
                total_amount: Decimal::ZERO,
            });
        s.count += 1;
        s.tax_base += e.tax_base;
        s.vat_amount += e.vat_amount;
        s.total_amount += e.total_amount;
    }
    by_type.into_values().collect()
}
