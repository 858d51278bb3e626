use serde::Serialize;

use super::diagnostics::{DiagnosticSink, require};
use super::error::{FireError, InputField};
use super::returns::real_rate;
use super::types::{PlanInputs, ValueBasis};

/// Age from which retirement income (pension, social security) is counted.
pub const PASSIVE_INCOME_ELIGIBILITY_AGE: f64 = 62.0;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementCashFlow {
    /// Pre-tax amount drawn from the portfolio.
    pub gross_withdrawal: f64,
    /// Net passive income left over after spending, reinvested.
    pub surplus: f64,
}

/// Net saving (income minus expenses) in the given year of accumulation.
///
/// Income and expenses compound independently from today's values. In the real basis
/// their nominal growth rates are first deflated by inflation. Year 0 is unmodified.
pub fn yearly_contribution(
    inputs: &PlanInputs,
    year_index: u32,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    let income = require(
        inputs.basics.annual_income,
        InputField::AnnualIncome,
        "yearly contribution",
        diagnostics,
    )?;
    let expenses = require(
        inputs.basics.annual_expenses,
        InputField::AnnualExpenses,
        "yearly contribution",
        diagnostics,
    )?;

    let growth = &inputs.growth_rates;
    let (income_growth, expense_growth) = match inputs.basis {
        ValueBasis::Nominal => (growth.income_growth_rate, growth.expense_growth_rate),
        ValueBasis::Real => {
            let inflation = inputs.market_assumptions.inflation_rate;
            (
                real_rate(growth.income_growth_rate, inflation),
                real_rate(growth.expense_growth_rate, inflation),
            )
        }
    };

    let years = i32::try_from(year_index).unwrap_or(i32::MAX);
    let future_income = income * (1.0 + income_growth / 100.0).powi(years);
    let future_expenses = expenses * (1.0 + expense_growth / 100.0).powi(years);
    Ok(future_income - future_expenses)
}

/// Splits one retirement year's spending between passive income and portfolio draw.
///
/// Passive income only counts from [`PASSIVE_INCOME_ELIGIBILITY_AGE`]. Any shortfall is
/// grossed up so that the after-tax draw covers it.
pub fn retirement_cash_flow(
    retirement_expenses: f64,
    retirement_income: f64,
    effective_tax_rate: f64,
    age: f64,
) -> RetirementCashFlow {
    let keep = 1.0 - effective_tax_rate / 100.0;
    let net_passive_income = if age >= PASSIVE_INCOME_ELIGIBILITY_AGE {
        retirement_income * keep
    } else {
        0.0
    };

    if net_passive_income < retirement_expenses {
        RetirementCashFlow {
            gross_withdrawal: (retirement_expenses - net_passive_income) / keep,
            surplus: 0.0,
        }
    } else {
        RetirementCashFlow {
            gross_withdrawal: 0.0,
            surplus: net_passive_income - retirement_expenses,
        }
    }
}
