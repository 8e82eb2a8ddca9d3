use rust_decimal::Decimal;

use super::aggregation::PeriodAggregate;
use super::period::Period;
use super::types::*;

/// Build a calculated declaration from aggregated sales fields and
/// deductible purchase VAT.
///
/// Sales fields 09–25 are carried over as aggregated. Field 50 takes the
/// sales VAT (field 10), field 60 the deductible VAT, and the difference
/// lands on field 70 (payable) or field 71 (refundable), mirrored to 81/82.
/// Every other field is present at zero, so a period with no activity
/// yields a valid all-zero declaration.
///
/// ```
/// use dds::core::*;
/// use rust_decimal_macros::dec;
///
/// let mut sales = SalesFields::default();
/// sales.set(9, dec!(1000)).unwrap();
/// sales.set(10, dec!(200)).unwrap();
///
/// let d = calculate(CompanyId(1), Period::parse("202103").unwrap(), &sales, dec!(50));
/// assert_eq!(d.field(70), dec!(150));
/// assert_eq!(d.field(71), dec!(0));
/// assert_eq!(d.payment_due, dec!(150));
/// assert_eq!(d.payment_deadline.to_string(), "2021-04-14");
/// ```
pub fn calculate(
    company_id: CompanyId,
    period: Period,
    sales: &SalesFields,
    deductible_vat: Decimal,
) -> Declaration {
    let mut fields = DeclarationFields::zeroed();
    for (n, value) in sales.iter() {
        fields.put(n, value);
    }

    let output_vat = sales.value(10);
    fields.put(50, output_vat);
    fields.put(60, deductible_vat);

    let (payable, refundable) = if output_vat >= deductible_vat {
        (output_vat - deductible_vat, Decimal::ZERO)
    } else {
        (Decimal::ZERO, deductible_vat - output_vat)
    };
    fields.put(70, payable);
    fields.put(71, refundable);
    fields.put(81, payable);
    fields.put(82, refundable);

    Declaration {
        id: None,
        company_id,
        period,
        fields,
        calculation_method: CalculationMethod::Automatic,
        status: DeclarationStatus::Calculated,
        payment_due: payable,
        refund_due: refundable,
        payment_deadline: period.payment_deadline(),
        submission_date: None,
        submission_reference: None,
    }
}

/// [`calculate`] over a [`PeriodAggregate`].
pub fn calculate_from(company_id: CompanyId, period: Period, aggregate: &PeriodAggregate) -> Declaration {
    calculate(company_id, period, &aggregate.sales, aggregate.deductible_vat)
}
