use super::diagnostics::{Diagnostic, DiagnosticSink};
use super::types::{AllocationInputs, MarketAssumptionsInputs, PlanInputs, ValueBasis};

const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Weighted nominal portfolio return in percent.
///
/// Weights are used exactly as given; a mix that does not sum to 100% is reported
/// through `diagnostics` but is never renormalised.
pub fn weighted_nominal_return(
    allocation: &AllocationInputs,
    assumptions: &MarketAssumptionsInputs,
    diagnostics: &mut dyn DiagnosticSink,
) -> f64 {
    let total =
        allocation.stock_allocation + allocation.bond_allocation + allocation.cash_allocation;
    if (total - 100.0).abs() > ALLOCATION_TOLERANCE {
        diagnostics.report(Diagnostic::AllocationDrift { total });
    }

    let weighted = (allocation.stock_allocation / 100.0) * (assumptions.stock_return / 100.0)
        + (allocation.bond_allocation / 100.0) * (assumptions.bond_return / 100.0)
        + (allocation.cash_allocation / 100.0) * (assumptions.cash_return / 100.0);
    weighted * 100.0
}

/// Weighted inflation-adjusted return in percent. Negative when inflation outruns returns.
pub fn weighted_real_return(
    allocation: &AllocationInputs,
    assumptions: &MarketAssumptionsInputs,
    diagnostics: &mut dyn DiagnosticSink,
) -> f64 {
    let nominal = weighted_nominal_return(allocation, assumptions, diagnostics);
    real_rate(nominal, assumptions.inflation_rate)
}

/// Fisher relation on percentages.
pub fn real_rate(nominal_pct: f64, inflation_pct: f64) -> f64 {
    ((1.0 + nominal_pct / 100.0) / (1.0 + inflation_pct / 100.0) - 1.0) * 100.0
}

/// Per-year growth factor minus one (a decimal) for the plan's value basis.
pub(crate) fn portfolio_rate(inputs: &PlanInputs, diagnostics: &mut dyn DiagnosticSink) -> f64 {
    let pct = match inputs.basis {
        ValueBasis::Real => {
            weighted_real_return(&inputs.allocation, &inputs.market_assumptions, diagnostics)
        }
        ValueBasis::Nominal => {
            weighted_nominal_return(&inputs.allocation, &inputs.market_assumptions, diagnostics)
        }
    };
    pct / 100.0
}
