use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{
    CompanyId, DeclarationError, LedgerStore, Period, SalesDocumentType, SalesEntry,
};

/// One customer line: all reportable supplies to a (country, VAT number) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViesLine {
    pub country: String,
    pub vat_number: String,
    /// Customer name from the entry, else the name resolved by the registry.
    pub name: Option<String>,
    /// Sum of field 13 over the customer's entries.
    pub amount: Decimal,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViesReport {
    pub company_id: CompanyId,
    pub period: Period,
    /// Field 13 summed over every reportable entry.
    pub total_eu_sales: Decimal,
    /// Field 13 summed over triangular sales only.
    pub total_triangular: Decimal,
    /// Ordered by country code, then VAT number.
    pub lines: Vec<ViesLine>,
    /// Reportable entries considered, including ones without customer data.
    pub entry_count: usize,
}

/// Build the report from sales entries; non-reportable types are ignored.
///
/// Entries lacking a customer VAT number or country count towards the totals
/// but get no customer line.
pub fn build_report(company_id: CompanyId, period: Period, entries: &[SalesEntry]) -> ViesReport {
    let reportable: Vec<&SalesEntry> = entries
        .iter()
        .filter(|e| e.document_type.is_eu_reportable())
        .collect();

    let mut lines: BTreeMap<(String, String), ViesLine> = BTreeMap::new();
    for e in &reportable {
        let (Some(country), Some(vat)) = (non_blank(&e.customer_country), non_blank(&e.customer_vat))
        else {
            continue;
        };
        let line = lines
            .entry((country.to_string(), vat.to_string()))
            .or_insert_with(|| ViesLine {
                country: country.to_string(),
                vat_number: vat.to_string(),
                name: None,
                amount: Decimal::ZERO,
                transactions: 0,
            });
        if line.name.is_none() {
            line.name = non_blank(&e.customer_name)
                .or(non_blank(&e.vies_company_name))
                .map(str::to_string);
        }
        line.amount += e.fields.value(13);
        line.transactions += 1;
    }

    ViesReport {
        company_id,
        period,
        total_eu_sales: reportable.iter().map(|e| e.fields.value(13)).sum(),
        total_triangular: reportable
            .iter()
            .filter(|e| e.document_type == SalesDocumentType::Triangular)
            .map(|e| e.fields.value(13))
            .sum(),
        lines: lines.into_values().collect(),
        entry_count: reportable.len(),
    }
}

/// Fetch the company's sales for `period` and build the report.
pub fn vies_report<L: LedgerStore>(
    ledger: &L,
    company_id: CompanyId,
    period: Period,
) -> Result<ViesReport, DeclarationError> {
    let entries = ledger.sales_entries(company_id, period, None)?;
    let report = build_report(company_id, period, &entries);
    tracing::debug!(
        company = %company_id,
        %period,
        customers = report.lines.len(),
        total = %report.total_eu_sales,
        "built VIES report"
    );
    Ok(report)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
