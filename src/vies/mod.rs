//! EU sales (VIES) summary report.
//!
//! Lists intra-community supplies per customer for one company and period,
//! from sales entries of types EU sales, triangular sales and distance
//! selling.
//!
//! # Example
//!
//! ```
//! use dds::core::*;
//! use dds::vies::build_report;
//! use rust_decimal_macros::dec;
//!
//! let period = Period::parse("202403").unwrap();
//! let sale = SalesEntryBuilder::new(CompanyId(1), period, SalesDocumentType::EuSales)
//!     .customer("Kunde GmbH", "DE123456789", "DE")
//!     .amounts(dec!(1200), dec!(0))
//!     .build()
//!     .unwrap()
//!     .into_entry();
//!
//! let report = build_report(CompanyId(1), period, &[sale]);
//! assert_eq!(report.total_eu_sales, dec!(1200));
//! assert_eq!(report.lines[0].country, "DE");
//! ```

mod report;

pub use report::{ViesLine, ViesReport, build_report, vies_report};
