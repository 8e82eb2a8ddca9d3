//! Document type registry: the closed set of purchase and sales document
//! variants, and the per-variant contract (required auxiliary data,
//! effective dates, field mapping for sales).

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DeclarationError;
use super::period::Period;
use super::types::SalesFields;

/// Which ledger a document type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    Purchase,
    Sales,
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Purchase => "purchase",
            Self::Sales => "sales",
        })
    }
}

/// Purchase ledger document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseDocumentType {
    /// 01: Invoice.
    Invoice,
    /// 02: Customs document (import).
    Customs,
    /// 03: Credit note.
    CreditNote,
    /// 05: Documents under Art. 15a (from 2020-04).
    Article15a,
    /// 07: Aggregate invoice covering a range of periods.
    AggregateInvoice,
    /// 09: Document without right to tax credit.
    NoTaxCredit,
    /// 11: Triangular operation, Art. 15.
    TriangularArt15,
    /// 12: Triangular operation, Art. 14.
    TriangularArt14,
    /// 13: Intra-community acquisition, Art. 14.
    AcquisitionsArt14,
    /// 23: Documents under Art. 126a.
    Article126a,
    /// 91: VAT application under Art. 151a, type 1.
    VatApplication1,
    /// 92: VAT application under Art. 151a, type 2.
    VatApplication2,
    /// 93: VAT application under Art. 151a, type 3.
    VatApplication3,
    /// 94: VAT application under Art. 151a, type 4.
    VatApplication4,
}

impl PurchaseDocumentType {
    /// All purchase types, in code order.
    pub const ALL: [PurchaseDocumentType; 14] = [
        Self::Invoice,
        Self::Customs,
        Self::CreditNote,
        Self::Article15a,
        Self::AggregateInvoice,
        Self::NoTaxCredit,
        Self::TriangularArt15,
        Self::TriangularArt14,
        Self::AcquisitionsArt14,
        Self::Article126a,
        Self::VatApplication1,
        Self::VatApplication2,
        Self::VatApplication3,
        Self::VatApplication4,
    ];

    /// National schema code.
    pub fn code(&self) -> u8 {
        self.rule().code
    }

    /// Parse from the national schema code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// The registry entry for this type.
    pub fn rule(&self) -> &'static DocumentTypeRule {
        &PURCHASE_RULES[*self as usize]
    }

    /// Triangular operation or intra-community acquisition (11, 12, 13).
    pub fn is_triangular(&self) -> bool {
        matches!(
            self,
            Self::TriangularArt15 | Self::TriangularArt14 | Self::AcquisitionsArt14
        )
    }

    /// VAT application types 91–94.
    pub fn is_vat_application(&self) -> bool {
        matches!(
            self,
            Self::VatApplication1
                | Self::VatApplication2
                | Self::VatApplication3
                | Self::VatApplication4
        )
    }
}

/// Sales ledger document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesDocumentType {
    /// 1: Domestic invoice.
    Domestic,
    /// 2: Supply to another EU member state.
    EuSales,
    /// 3: Export outside the EU.
    Export,
    /// 4: Triangular sale.
    Triangular,
    /// 5: Distance selling.
    DistanceSelling,
    /// 6: Other intra-community supply.
    IntraCommunity,
}

impl SalesDocumentType {
    /// All sales types, in code order.
    pub const ALL: [SalesDocumentType; 6] = [
        Self::Domestic,
        Self::EuSales,
        Self::Export,
        Self::Triangular,
        Self::DistanceSelling,
        Self::IntraCommunity,
    ];

    pub fn code(&self) -> u8 {
        self.rule().code
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn rule(&self) -> &'static DocumentTypeRule {
        &SALES_RULES[*self as usize]
    }

    /// Reportable on the EU sales (VIES) summary.
    pub fn is_eu_reportable(&self) -> bool {
        matches!(self, Self::EuSales | Self::Triangular | Self::DistanceSelling)
    }

    /// Split a tax base and VAT amount into declaration fields 09–25.
    pub fn map_fields(&self, tax_base: Decimal, vat_amount: Decimal) -> SalesFields {
        (self.rule().field_mapping.unwrap_or(map_domestic))(tax_base, vat_amount)
    }
}

/// A purchase or sales document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Purchase(PurchaseDocumentType),
    Sales(SalesDocumentType),
}

impl DocumentType {
    /// Resolve a category + code pair, failing fast on codes outside the registry.
    pub fn from_code(category: DocumentCategory, code: u8) -> Result<Self, DeclarationError> {
        let found = match category {
            DocumentCategory::Purchase => PurchaseDocumentType::from_code(code).map(Self::Purchase),
            DocumentCategory::Sales => SalesDocumentType::from_code(code).map(Self::Sales),
        };
        found.ok_or(DeclarationError::UnknownDocumentType { category, code })
    }

    pub fn rule(&self) -> &'static DocumentTypeRule {
        match self {
            Self::Purchase(t) => t.rule(),
            Self::Sales(t) => t.rule(),
        }
    }

    pub fn category(&self) -> DocumentCategory {
        self.rule().category
    }

    pub fn code(&self) -> u8 {
        self.rule().code
    }
}

impl From<PurchaseDocumentType> for DocumentType {
    fn from(t: PurchaseDocumentType) -> Self {
        Self::Purchase(t)
    }
}

impl From<SalesDocumentType> for DocumentType {
    fn from(t: SalesDocumentType) -> Self {
        Self::Sales(t)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = self.rule();
        write!(f, "{} {:02} ({})", rule.category, rule.code, rule.name_en)
    }
}

/// Auxiliary (type-specific) data a document type may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxField {
    CustomsDocumentRef,
    Article15aType,
    AggregatePeriodFrom,
    AggregatePeriodTo,
    TriangularOperationType,
    ApplicationReference,
    CustomerVat,
    CustomerCountry,
    EuDistanceSelling,
    TriangularSalesType,
}

impl AuxField {
    /// Field name as it appears on entries and in violation messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CustomsDocumentRef => "customs_document_ref",
            Self::Article15aType => "article_15a_type",
            Self::AggregatePeriodFrom => "aggregate_period_from",
            Self::AggregatePeriodTo => "aggregate_period_to",
            Self::TriangularOperationType => "triangular_operation_type",
            Self::ApplicationReference => "application_reference",
            Self::CustomerVat => "customer_vat",
            Self::CustomerCountry => "customer_country",
            Self::EuDistanceSelling => "eu_distance_selling",
            Self::TriangularSalesType => "triangular_sales_type",
        }
    }
}

impl fmt::Display for AuxField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps an entry's tax base and VAT onto sales fields 09–25.
pub type FieldMapping = fn(Decimal, Decimal) -> SalesFields;

/// Static registry entry for one document type.
#[derive(Debug)]
pub struct DocumentTypeRule {
    pub category: DocumentCategory,
    pub code: u8,
    pub name_en: &'static str,
    pub name_bg: &'static str,
    /// Auxiliary data that must be present for an entry of this type.
    pub required_fields: &'static [AuxField],
    /// First period the type may be used in.
    pub effective_from: Period,
    /// Last period the type may be used in, if retired.
    pub effective_to: Option<Period>,
    /// Sales only: how tax base and VAT land on fields 09–25.
    pub field_mapping: Option<FieldMapping>,
}

impl DocumentTypeRule {
    pub fn is_effective(&self, period: Period) -> bool {
        period >= self.effective_from && self.effective_to.is_none_or(|to| period <= to)
    }
}

/// Ordered purchase document types.
pub fn purchase_types() -> &'static [PurchaseDocumentType] {
    &PurchaseDocumentType::ALL
}

/// Ordered sales document types.
pub fn sales_types() -> &'static [SalesDocumentType] {
    &SalesDocumentType::ALL
}

/// Auxiliary fields required for `document_type`.
pub fn required_fields(document_type: DocumentType) -> &'static [AuxField] {
    document_type.rule().required_fields
}

const FROM_2020: Period = Period {
    year: 2020,
    month: 1,
};

const fn purchase(
    code: u8,
    name_en: &'static str,
    name_bg: &'static str,
    required_fields: &'static [AuxField],
) -> DocumentTypeRule {
    DocumentTypeRule {
        category: DocumentCategory::Purchase,
        code,
        name_en,
        name_bg,
        required_fields,
        effective_from: FROM_2020,
        effective_to: None,
        field_mapping: None,
    }
}

const fn sales(
    code: u8,
    name_en: &'static str,
    name_bg: &'static str,
    required_fields: &'static [AuxField],
    mapping: FieldMapping,
) -> DocumentTypeRule {
    DocumentTypeRule {
        category: DocumentCategory::Sales,
        code,
        name_en,
        name_bg,
        required_fields,
        effective_from: FROM_2020,
        effective_to: None,
        field_mapping: Some(mapping),
    }
}

const TRIANGULAR: &[AuxField] = &[AuxField::TriangularOperationType];
const APPLICATION: &[AuxField] = &[AuxField::ApplicationReference];

// Indexed by `PurchaseDocumentType as usize`.
static PURCHASE_RULES: [DocumentTypeRule; 14] = [
    purchase(1, "Invoice", "Фактура", &[]),
    purchase(
        2,
        "Customs document",
        "Митнически документ",
        &[AuxField::CustomsDocumentRef],
    ),
    purchase(3, "Credit note", "Кредитно известие", &[]),
    DocumentTypeRule {
        effective_from: Period {
            year: 2020,
            month: 4,
        },
        ..purchase(
            5,
            "Article 15a document",
            "Документ по чл. 15а",
            &[AuxField::Article15aType],
        )
    },
    purchase(
        7,
        "Aggregate invoice",
        "Обобщена фактура",
        &[AuxField::AggregatePeriodFrom, AuxField::AggregatePeriodTo],
    ),
    purchase(9, "No tax credit", "Документ без право на данъчен кредит", &[]),
    purchase(11, "Triangular operation (Art. 15)", "Тристранна операция по чл. 15", TRIANGULAR),
    purchase(12, "Triangular operation (Art. 14)", "Тристранна операция по чл. 14", TRIANGULAR),
    purchase(13, "Acquisition (Art. 14)", "Придобиване по чл. 14", TRIANGULAR),
    purchase(23, "Article 126a document", "Документ по чл. 126а", &[]),
    purchase(91, "VAT application 151a (1)", "Заявление по чл. 151а (1)", APPLICATION),
    purchase(92, "VAT application 151a (2)", "Заявление по чл. 151а (2)", APPLICATION),
    purchase(93, "VAT application 151a (3)", "Заявление по чл. 151а (3)", APPLICATION),
    purchase(94, "VAT application 151a (4)", "Заявление по чл. 151а (4)", APPLICATION),
];

// Indexed by `SalesDocumentType as usize`.
static SALES_RULES: [DocumentTypeRule; 6] = [
    sales(1, "Domestic invoice", "Вътрешна фактура", &[], map_domestic),
    sales(
        2,
        "EU sales",
        "Вътреобщностна доставка",
        &[AuxField::CustomerVat, AuxField::CustomerCountry],
        map_eu_supply,
    ),
    sales(3, "Export", "Износ", &[], map_export),
    sales(
        4,
        "Triangular sales",
        "Тристранна доставка",
        &[AuxField::TriangularSalesType],
        map_eu_supply,
    ),
    sales(
        5,
        "Distance selling",
        "Дистанционна продажба",
        &[AuxField::EuDistanceSelling],
        map_distance_selling,
    ),
    sales(
        6,
        "Intra-community supply",
        "Доставка извън страната",
        &[],
        map_outside_country,
    ),
];

fn map_domestic(tax_base: Decimal, vat_amount: Decimal) -> SalesFields {
    SalesFields::default().with(9, tax_base).with(10, vat_amount)
}

fn map_eu_supply(tax_base: Decimal, _vat_amount: Decimal) -> SalesFields {
    SalesFields::default().with(13, tax_base)
}

fn map_export(tax_base: Decimal, _vat_amount: Decimal) -> SalesFields {
    SalesFields::default().with(14, tax_base)
}

fn map_outside_country(tax_base: Decimal, _vat_amount: Decimal) -> SalesFields {
    SalesFields::default().with(15, tax_base)
}

fn map_distance_selling(tax_base: Decimal, vat_amount: Decimal) -> SalesFields {
    SalesFields::default().with(16, tax_base).with(17, vat_amount)
}
