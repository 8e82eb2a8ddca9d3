//! Ledger entries, document types, declaration calculation, validation
//! and lifecycle.
//!
//! Amounts are [`rust_decimal::Decimal`] throughout. Field numbers follow
//! the national declaration schema (09–82).

mod aggregation;
mod builder;
mod calculator;
mod config;
pub mod countries;
mod document_type;
mod engine;
mod error;
mod fields;
mod lifecycle;
mod numbering;
mod period;
mod store;
mod types;
mod validation;
pub mod vat_id;

pub use aggregation::*;
pub use builder::*;
pub use calculator::*;
pub use config::*;
pub use document_type::*;
pub use engine::*;
pub use error::*;
pub use fields::*;
pub use numbering::*;
pub use period::*;
pub use store::*;
pub use types::*;
pub use validation::*;
