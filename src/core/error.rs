use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::document_type::{DocumentCategory, DocumentType};
use super::period::Period;
use super::types::{CompanyId, DeclarationId, DeclarationStatus, EntryId};

/// Errors that abort a ledger or declaration operation.
///
/// Business-rule findings on a declaration are not errors: they come back as
/// a `Vec<Violation>` from the validation functions. `ValidationFailed` only
/// appears when a caller opts into strict handling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeclarationError {
    /// No company is registered under this UIC.
    #[error("company with UIC {uic} not found")]
    CompanyNotFound { uic: String },

    /// No company with this internal id.
    #[error("company {id} not found")]
    CompanyIdNotFound { id: CompanyId },

    #[error("declaration {id} not found")]
    DeclarationNotFound { id: DeclarationId },

    #[error("ledger entry {id} not found")]
    EntryNotFound { id: EntryId },

    /// Period is not a 6-digit YYYYMM value within the supported range.
    #[error("invalid period '{value}': {reason}")]
    InvalidPeriod { value: String, reason: String },

    /// A declaration already exists for this company and period.
    #[error("declaration for company {company}, period {period} already exists")]
    DuplicateDeclaration { company: CompanyId, period: Period },

    #[error("unknown {category} document type code {code}")]
    UnknownDocumentType { category: DocumentCategory, code: u8 },

    /// Field number outside the declaration schema.
    #[error("field {field} is not part of {range}")]
    UnknownField { field: u8, range: &'static str },

    /// The document type contract requires auxiliary data that is missing.
    #[error("document type {document_type}: {}", join(.violations))]
    RequiredFieldMissing {
        document_type: DocumentType,
        violations: Vec<ValidationError>,
    },

    /// An amount has a sign the schema does not allow.
    #[error("[{rule}] invalid amount on {document_type} entry, {field}: {reason}")]
    InvalidAmount {
        document_type: DocumentType,
        field: String,
        rule: String,
        reason: String,
    },

    #[error("document type {document_type} is not in effect for period {period}")]
    DocumentTypeNotEffective {
        document_type: DocumentType,
        period: Period,
    },

    /// Submission requested for a declaration outside DRAFT/CALCULATED.
    #[error("declaration {id} is already {status}; only DRAFT or CALCULATED can be submitted")]
    AlreadySubmitted {
        id: DeclarationId,
        status: DeclarationStatus,
    },

    #[error("declaration {id} is {status}; only SUBMITTED declarations can be reverted")]
    NotSubmitted {
        id: DeclarationId,
        status: DeclarationStatus,
    },

    #[error("declaration {id} is {status}; only DRAFT declarations can be deleted")]
    CannotDeleteNonDraft {
        id: DeclarationId,
        status: DeclarationStatus,
    },

    /// Lifecycle operations need a stored declaration with an id.
    #[error("declaration must be stored before '{operation}'")]
    NotPersisted { operation: &'static str },

    /// Any other lifecycle rule violation.
    #[error("illegal transition '{operation}' for declaration {} in status {from}", describe(.id))]
    IllegalTransition {
        id: Option<DeclarationId>,
        operation: &'static str,
        from: DeclarationStatus,
    },

    /// Strict mode turned advisory findings into a hard failure.
    #[error("validation failed: {}", join(.0))]
    ValidationFailed(Vec<ValidationError>),

    /// The storage collaborator failed for a reason other than a uniqueness conflict.
    #[error("store error: {0}")]
    Store(String),
}

fn describe(id: &Option<DeclarationId>) -> String {
    id.map_or_else(|| "(not stored)".to_string(), |id| id.to_string())
}

fn join(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// How much weight a finding carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// The rule is broken.
    Error,
    /// Advisory only.
    Warning,
    /// The rule applies but the engine has no data to check it; a human must.
    Unverified,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Unverified => "unverified",
        })
    }
}

/// A single validation finding with field path, message and rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field the finding refers to (e.g. "customs_document_ref", "field_70").
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// Rule identifier (e.g. "PD-02", "DC-01").
    pub rule: Option<String>,
    pub severity: Severity,
}

/// Alias used throughout the declaration engine.
pub type Violation = ValidationError;

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create an error-severity finding without a rule ID.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
            severity: Severity::Error,
        }
    }

    /// Create an error-severity finding with a rule ID.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
            severity: Severity::Error,
        }
    }

    /// Downgrade to a warning.
    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    /// Mark as a condition that applies but could not be checked.
    pub fn unverified(mut self) -> Self {
        self.severity = Severity::Unverified;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
