use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::document_type::{PurchaseDocumentType, SalesDocumentType};
use super::error::DeclarationError;
use super::period::Period;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Store-assigned company identifier.
    CompanyId
);
id_type!(
    /// Store-assigned ledger entry identifier.
    EntryId
);
id_type!(
    /// Store-assigned declaration identifier.
    DeclarationId
);

/// The taxable entity a ledger and its declarations belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    /// Unified identification code (ЕИК), 9 or 13 digits.
    pub uic: String,
    /// Domestic VAT number, `BG` + 9–10 digits.
    pub vat_number: String,
    pub name: String,
    pub active: bool,
}

/// First sales field carried on entries.
pub const FIRST_SALES_FIELD: u8 = 9;
/// Last sales field carried on entries.
pub const LAST_SALES_FIELD: u8 = 25;
/// First correction field; fields from here to 25 may be negative.
pub const FIRST_CORRECTION_FIELD: u8 = 23;

const SALES_SLOTS: usize = (LAST_SALES_FIELD - FIRST_SALES_FIELD + 1) as usize;

/// A sales entry's contribution to declaration fields 09–25.
///
/// ```
/// use dds::core::SalesFields;
/// use rust_decimal_macros::dec;
///
/// let mut f = SalesFields::default();
/// f.set(9, dec!(1000)).unwrap();
/// f.set(10, dec!(200)).unwrap();
/// assert_eq!(f.value(10), dec!(200));
/// assert!(f.set(26, dec!(1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalesFields([Decimal; SALES_SLOTS]);

impl SalesFields {
    /// Value of `field`, zero for numbers outside 09–25.
    pub fn value(&self, field: u8) -> Decimal {
        Self::slot(field).map_or(Decimal::ZERO, |i| self.0[i])
    }

    pub fn set(&mut self, field: u8, value: Decimal) -> Result<(), DeclarationError> {
        let i = Self::slot(field).ok_or(DeclarationError::UnknownField {
            field,
            range: "sales fields 09-25",
        })?;
        self.0[i] = value;
        Ok(())
    }

    /// `(field number, value)` for 09–25 in order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Decimal)> + '_ {
        (FIRST_SALES_FIELD..=LAST_SALES_FIELD).zip(self.0.iter().copied())
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Decimal::is_zero)
    }

    pub(crate) fn with(mut self, field: u8, value: Decimal) -> Self {
        if let Some(i) = Self::slot(field) {
            self.0[i] = value;
        }
        self
    }

    fn slot(field: u8) -> Option<usize> {
        (FIRST_SALES_FIELD..=LAST_SALES_FIELD)
            .contains(&field)
            .then(|| (field - FIRST_SALES_FIELD) as usize)
    }
}

impl AddAssign<&SalesFields> for SalesFields {
    fn add_assign(&mut self, rhs: &SalesFields) {
        for (acc, v) in self.0.iter_mut().zip(rhs.0.iter()) {
            *acc += *v;
        }
    }
}

impl Add for SalesFields {
    type Output = SalesFields;

    fn add(mut self, rhs: SalesFields) -> SalesFields {
        self += &rhs;
        self
    }
}

/// First numbered declaration field.
pub const FIRST_FIELD: u8 = 9;
/// Last numbered declaration field.
pub const LAST_FIELD: u8 = 82;

/// Whether a declaration field is reserved (always zero unless a future rule
/// populates it): 26–40, 43–49, 52–59, 61–69, 72–79.
pub fn is_reserved_field(field: u8) -> bool {
    matches!(field, 26..=40 | 43..=49 | 52..=59 | 61..=69 | 72..=79)
}

/// The full numbered field set 09–82.
///
/// A field may be absent (null) on a manually edited record; every
/// automatically calculated declaration carries all 74 fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeclarationFields(BTreeMap<u8, Decimal>);

impl DeclarationFields {
    /// All 74 fields present at zero.
    pub fn zeroed() -> Self {
        Self(
            (FIRST_FIELD..=LAST_FIELD)
                .map(|n| (n, Decimal::ZERO))
                .collect(),
        )
    }

    /// `None` when the field is absent or outside 09–82.
    pub fn get(&self, field: u8) -> Option<Decimal> {
        self.0.get(&field).copied()
    }

    /// Value with absent fields read as zero.
    pub fn value(&self, field: u8) -> Decimal {
        self.get(field).unwrap_or(Decimal::ZERO)
    }

    /// Set or clear a field.
    pub fn set(&mut self, field: u8, value: Option<Decimal>) -> Result<(), DeclarationError> {
        if !(FIRST_FIELD..=LAST_FIELD).contains(&field) {
            return Err(DeclarationError::UnknownField {
                field,
                range: "declaration fields 09-82",
            });
        }
        match value {
            Some(v) => self.0.insert(field, v),
            None => self.0.remove(&field),
        };
        Ok(())
    }

    /// Every numbered field 09–82 with a numeric value; absent fields read as zero.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Decimal)> + '_ {
        (FIRST_FIELD..=LAST_FIELD).map(|n| (n, self.value(n)))
    }

    pub(crate) fn put(&mut self, field: u8, value: Decimal) {
        self.0.insert(field, value);
    }
}

/// Declaration lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeclarationStatus {
    Draft,
    Calculated,
    Submitted,
    Paid,
    Rejected,
}

impl fmt::Display for DeclarationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "DRAFT",
            Self::Calculated => "CALCULATED",
            Self::Submitted => "SUBMITTED",
            Self::Paid => "PAID",
            Self::Rejected => "REJECTED",
        })
    }
}

/// How a declaration's fields were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationMethod {
    Automatic,
    Manual,
}

/// A periodic VAT declaration for one company and one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Assigned by the declaration store on insert.
    pub id: Option<DeclarationId>,
    pub company_id: CompanyId,
    pub period: Period,
    pub fields: DeclarationFields,
    pub calculation_method: CalculationMethod,
    pub status: DeclarationStatus,
    /// Amount payable to the budget (mirrors field 70).
    pub payment_due: Decimal,
    /// Amount refundable from the budget (mirrors field 71).
    pub refund_due: Decimal,
    pub payment_deadline: NaiveDate,
    pub submission_date: Option<NaiveDateTime>,
    /// Reference assigned by the revenue agency channel on submission.
    pub submission_reference: Option<String>,
}

impl Declaration {
    /// Shorthand for `fields.value(n)`.
    pub fn field(&self, field: u8) -> Decimal {
        self.fields.value(field)
    }

    /// Every field 09–82 with a numeric value, reserved fields included.
    pub fn fields(&self) -> impl Iterator<Item = (u8, Decimal)> + '_ {
        self.fields.iter()
    }

    /// Sales fields 09–25 as carried on the declaration.
    pub fn sales_fields(&self) -> SalesFields {
        let mut out = SalesFields::default();
        for n in FIRST_SALES_FIELD..=LAST_SALES_FIELD {
            out = out.with(n, self.field(n));
        }
        out
    }

    /// Manually override a field. The declaration becomes `MANUAL`;
    /// submitted or closed declarations cannot be edited.
    pub fn override_field(
        &mut self,
        field: u8,
        value: Option<Decimal>,
    ) -> Result<(), DeclarationError> {
        if !matches!(
            self.status,
            DeclarationStatus::Draft | DeclarationStatus::Calculated
        ) {
            return Err(DeclarationError::IllegalTransition {
                id: self.id,
                operation: "override_field",
                from: self.status,
            });
        }
        self.fields.set(field, value)?;
        self.calculation_method = CalculationMethod::Manual;
        Ok(())
    }
}

/// Purchase ledger entry (дневник на покупките).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEntry {
    /// Assigned by the ledger store.
    pub id: Option<EntryId>,
    pub company_id: CompanyId,
    pub period: Period,
    pub document_type: PurchaseDocumentType,
    pub document_number: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
    pub supplier_vat: Option<String>,
    pub supplier_country: Option<String>,
    pub tax_base: Decimal,
    pub vat_amount: Decimal,
    pub total_amount: Decimal,
    /// Credit adjustment of the tax base; non-positive.
    pub credit_tax_base: Decimal,
    /// Credit adjustment of VAT; non-positive.
    pub credit_vat: Decimal,
    pub customs_document_ref: Option<String>,
    pub customs_office: Option<String>,
    /// Art. 15a sub-type, 1–4.
    pub article_15a_type: Option<u8>,
    pub aggregate_period_from: Option<Period>,
    pub aggregate_period_to: Option<Period>,
    /// Excluded from deductible VAT (always true for type 09).
    pub tax_credit_excluded: bool,
    pub exclusion_reason: Option<String>,
    /// Triangular operation code, 11–13.
    pub triangular_operation_type: Option<u8>,
    pub intermediary_vat: Option<String>,
    pub final_customer_vat: Option<String>,
    /// VAT application type, 91–94; matches the document type code.
    pub vat_application_type: Option<u8>,
    pub application_reference: Option<String>,
    /// Counterparty VAT number confirmed by the external registry.
    pub vies_validated: bool,
    pub vies_company_name: Option<String>,
    pub notes: Option<String>,
}

impl PurchaseEntry {
    /// Deductible VAT contributed by this entry: `vat_amount - credit_vat`,
    /// or zero when the entry carries no right to tax credit.
    pub fn deductible_vat(&self) -> Decimal {
        if self.tax_credit_excluded {
            Decimal::ZERO
        } else {
            self.vat_amount - self.credit_vat
        }
    }

    /// Turn this entry into a credit note: relabel it as type 03 and negate
    /// tax base, VAT and total.
    ///
    /// The credit adjustment fields are reset so the reversal is counted
    /// exactly once. Converting twice leaves the entry unchanged.
    pub fn convert_to_credit_note(&mut self) {
        const MARKER: &str = "[Converted to credit note]";
        self.document_type = PurchaseDocumentType::CreditNote;
        self.tax_base = -self.tax_base.abs();
        self.vat_amount = -self.vat_amount.abs();
        self.total_amount = -self.total_amount.abs();
        self.credit_tax_base = Decimal::ZERO;
        self.credit_vat = Decimal::ZERO;
        match &mut self.notes {
            Some(n) if n.contains(MARKER) => {}
            Some(n) => {
                n.push(' ');
                n.push_str(MARKER);
            }
            None => self.notes = Some(MARKER.to_string()),
        }
    }
}

/// Sales ledger entry (дневник на продажбите).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesEntry {
    pub id: Option<EntryId>,
    pub company_id: CompanyId,
    pub period: Period,
    pub document_type: SalesDocumentType,
    pub document_number: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub customer_name: Option<String>,
    pub customer_vat: Option<String>,
    pub customer_country: Option<String>,
    pub tax_base: Decimal,
    pub vat_amount: Decimal,
    pub total_amount: Decimal,
    /// Contribution to declaration fields 09–25, fixed at creation.
    pub fields: SalesFields,
    pub eu_distance_selling: bool,
    pub triangular_sales_type: Option<u8>,
    pub vies_validated: bool,
    pub vies_company_name: Option<String>,
    pub notes: Option<String>,
}
