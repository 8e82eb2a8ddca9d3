use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::countries::DOMESTIC_COUNTRY;

/// Tunables for entry validation and submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Country code treated as domestic (rejected on EU sales).
    pub domestic_country: String,
    /// Standard VAT rate used by the arithmetic sanity check.
    pub standard_rate: Decimal,
    /// Maximum allowed `|tax_base × rate − vat_amount|`.
    pub arithmetic_tolerance: Decimal,
    /// Treat arithmetic warnings as creation failures.
    pub strict_arithmetic: bool,
    /// Prefix of submission references (`NAP20240415000001`).
    pub submission_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domestic_country: DOMESTIC_COUNTRY.into(),
            standard_rate: dec!(0.20),
            arithmetic_tolerance: dec!(0.01),
            strict_arithmetic: false,
            submission_prefix: "NAP".into(),
        }
    }
}

/// Builder for [`EngineConfig`].
///
/// # Example
///
/// ```
/// use dds::core::EngineConfigBuilder;
///
/// let config = EngineConfigBuilder::new().strict_arithmetic(true).build();
/// assert!(config.strict_arithmetic);
/// assert_eq!(config.domestic_country, "BG");
/// ```
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domestic_country(mut self, code: impl Into<String>) -> Self {
        self.config.domestic_country = code.into();
        self
    }

    pub fn standard_rate(mut self, rate: Decimal) -> Self {
        self.config.standard_rate = rate;
        self
    }

    pub fn arithmetic_tolerance(mut self, tolerance: Decimal) -> Self {
        self.config.arithmetic_tolerance = tolerance;
        self
    }

    pub fn strict_arithmetic(mut self, strict: bool) -> Self {
        self.config.strict_arithmetic = strict;
        self
    }

    pub fn submission_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.submission_prefix = prefix.into();
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
