//! # dds
//!
//! Bulgarian VAT (ДДС) declaration engine: purchase and sales ledger
//! entries, the document type registry, aggregation into declaration
//! fields 09–25, calculation of the payable/refundable position, validation
//! and the declaration lifecycle.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Storage is abstracted behind [`core::LedgerStore`] and
//! [`core::DeclarationStore`]; [`core::MemoryStore`] implements both.
//!
//! ## Quick Start
//!
//! ```rust
//! use dds::core::*;
//! use rust_decimal_macros::dec;
//!
//! let store = MemoryStore::new();
//! store.add_company(Company {
//!     id: CompanyId(1),
//!     uic: "123456789".into(),
//!     vat_number: "BG123456789".into(),
//!     name: "Пример ЕООД".into(),
//!     active: true,
//! });
//!
//! let period = Period::parse("202103").unwrap();
//! store.add_sales(
//!     SalesEntryBuilder::new(CompanyId(1), period, SalesDocumentType::Domestic)
//!         .amounts(dec!(1000), dec!(200))
//!         .build()
//!         .unwrap()
//!         .into_entry(),
//! );
//! store.add_purchase(
//!     PurchaseEntryBuilder::new(CompanyId(1), period, PurchaseDocumentType::Invoice)
//!         .amounts(dec!(250), dec!(50))
//!         .build()
//!         .unwrap()
//!         .into_entry(),
//! );
//!
//! let engine = DeclarationEngine::new(&store, &store);
//! let declaration = engine.generate("123456789", "202103").unwrap();
//! assert_eq!(declaration.field(50), dec!(200));
//! assert_eq!(declaration.field(60), dec!(50));
//! assert_eq!(declaration.payment_due, dec!(150));
//! assert_eq!(declaration.payment_deadline.to_string(), "2021-04-14");
//! assert!(validate_declaration(&declaration).is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Entries, document types, aggregation, calculation, validation, lifecycle, stores |
//! | `vies` | EU sales (VIES) summary report |
//! | `all` | Everything |
//!
//! ## Logging
//!
//! Operations emit [`tracing`] events (generation, submission, revert,
//! deletion at `info`, aggregation totals at `debug`, accepted warnings at
//! `warn`). Installing a subscriber is left to the application.

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "vies")]
pub mod vies;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
