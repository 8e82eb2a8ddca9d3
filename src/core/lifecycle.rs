//! Declaration status transitions.
//!
//! ```text
//! DRAFT ──▶ CALCULATED ──▶ SUBMITTED ──▶ PAID | REJECTED
//!   ▲                          │
//!   └───────── revert ─────────┘
//! ```
//!
//! Each transition checks the current status first and leaves the
//! declaration untouched when it fails.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::error::DeclarationError;
use super::types::*;

impl DeclarationStatus {
    /// PAID and REJECTED: no further transitions in this engine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Rejected)
    }

    /// Fields may still be recalculated or overridden.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Calculated)
    }

    /// Statuses reachable in one step.
    pub fn next_statuses(&self) -> &'static [DeclarationStatus] {
        match self {
            Self::Draft => &[Self::Calculated, Self::Submitted],
            Self::Calculated => &[Self::Calculated, Self::Submitted],
            Self::Submitted => &[Self::Draft, Self::Paid, Self::Rejected],
            Self::Paid | Self::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, to: DeclarationStatus) -> bool {
        self.next_statuses().contains(&to)
    }
}

impl Declaration {
    fn stored_id(&self, operation: &'static str) -> Result<DeclarationId, DeclarationError> {
        self.id.ok_or(DeclarationError::NotPersisted { operation })
    }

    /// Submit (DRAFT or CALCULATED → SUBMITTED).
    ///
    /// Stamps the submission time and reference. When an amount is payable the
    /// payment deadline is recomputed from the period.
    pub fn submit(&mut self, now: NaiveDateTime, reference: String) -> Result<(), DeclarationError> {
        let id = self.stored_id("submit")?;
        if !self.status.is_editable() {
            return Err(DeclarationError::AlreadySubmitted {
                id,
                status: self.status,
            });
        }
        self.status = DeclarationStatus::Submitted;
        self.submission_date = Some(now);
        self.submission_reference = Some(reference);
        if self.payment_due > Decimal::ZERO {
            self.payment_deadline = self.period.payment_deadline();
        }
        Ok(())
    }

    /// Revert a submission (SUBMITTED → DRAFT), clearing submission metadata.
    pub fn revert(&mut self) -> Result<(), DeclarationError> {
        let id = self.stored_id("revert")?;
        if self.status != DeclarationStatus::Submitted {
            return Err(DeclarationError::NotSubmitted {
                id,
                status: self.status,
            });
        }
        self.status = DeclarationStatus::Draft;
        self.submission_date = None;
        self.submission_reference = None;
        Ok(())
    }

    /// Check that the declaration may be deleted (DRAFT only).
    pub fn ensure_deletable(&self) -> Result<(), DeclarationError> {
        let id = self.stored_id("delete")?;
        if self.status != DeclarationStatus::Draft {
            return Err(DeclarationError::CannotDeleteNonDraft {
                id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Replace the figures with a fresh calculation (DRAFT or CALCULATED → CALCULATED).
    pub fn apply_calculation(&mut self, calculated: Declaration) -> Result<(), DeclarationError> {
        if !self.status.is_editable() {
            return Err(DeclarationError::IllegalTransition {
                id: self.id,
                operation: "recalculate",
                from: self.status,
            });
        }
        self.fields = calculated.fields;
        self.calculation_method = CalculationMethod::Automatic;
        self.payment_due = calculated.payment_due;
        self.refund_due = calculated.refund_due;
        self.payment_deadline = calculated.payment_deadline;
        self.status = DeclarationStatus::Calculated;
        Ok(())
    }

    /// Record the agency's verdict on a submission (SUBMITTED → PAID or REJECTED).
    pub fn record_outcome(&mut self, outcome: DeclarationStatus) -> Result<(), DeclarationError> {
        if !matches!(outcome, DeclarationStatus::Paid | DeclarationStatus::Rejected)
            || self.status != DeclarationStatus::Submitted
        {
            return Err(DeclarationError::IllegalTransition {
                id: self.id,
                operation: "record_outcome",
                from: self.status,
            });
        }
        self.status = outcome;
        Ok(())
    }
}
