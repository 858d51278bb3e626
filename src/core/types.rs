use serde::Serialize;

use super::error::InputField;

/// Whether projections are expressed in today's money or in future (nominal) money.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueBasis {
    #[default]
    Real,
    Nominal,
}

/// Asset mix in percent. Expected to sum to 100; drift is reported, not rejected.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AllocationInputs {
    pub stock_allocation: f64,
    pub bond_allocation: f64,
    pub cash_allocation: f64,
}

/// Nominal annual percentages.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MarketAssumptionsInputs {
    pub stock_return: f64,
    pub bond_return: f64,
    pub cash_return: f64,
    pub inflation_rate: f64,
}

/// Household basics. `None` means the user has not supplied the value yet.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BasicsInputs {
    pub current_age: Option<u32>,
    pub annual_income: Option<f64>,
    pub annual_expenses: Option<f64>,
    pub invested_assets: Option<f64>,
}

/// Nominal annual percentages.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GrowthRatesInputs {
    pub income_growth_rate: f64,
    pub expense_growth_rate: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct GoalsInputs {
    /// Annual after-tax spending target in today's money.
    pub retirement_expenses: Option<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RetirementFundingInputs {
    pub safe_withdrawal_rate: f64,
    /// Pension or social-security style income, counted from the eligibility age.
    pub retirement_income: f64,
    pub life_expectancy: u32,
    pub effective_tax_rate: f64,
}

/// Full snapshot of a plan. Every engine call is a pure function of one of these.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlanInputs {
    pub basics: BasicsInputs,
    pub growth_rates: GrowthRatesInputs,
    pub allocation: AllocationInputs,
    pub goals: GoalsInputs,
    pub market_assumptions: MarketAssumptionsInputs,
    pub retirement_funding: RetirementFundingInputs,
    pub basis: ValueBasis,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataPoint {
    pub age: f64,
    pub portfolio_value: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisStatus {
    AlreadyAchieved,
    Achievable,
    MissingInput { field: InputField },
    NotAchievable,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub achievable: bool,
    pub status: AnalysisStatus,
    pub years_to_fire: Option<f64>,
    pub fire_age: Option<f64>,
    pub required_portfolio: Option<f64>,
    pub current_portfolio: Option<f64>,
    pub projected_portfolio_at_fire: Option<f64>,
    pub message: String,
}

#[cfg(test)]
pub(crate) fn sample_plan() -> PlanInputs {
    PlanInputs {
        basics: BasicsInputs {
            current_age: Some(30),
            annual_income: Some(100_000.0),
            annual_expenses: Some(60_000.0),
            invested_assets: Some(100_000.0),
        },
        growth_rates: GrowthRatesInputs {
            income_growth_rate: 3.0,
            expense_growth_rate: 3.0,
        },
        allocation: AllocationInputs {
            stock_allocation: 70.0,
            bond_allocation: 30.0,
            cash_allocation: 0.0,
        },
        goals: GoalsInputs {
            retirement_expenses: Some(40_000.0),
        },
        market_assumptions: MarketAssumptionsInputs {
            stock_return: 10.0,
            bond_return: 5.0,
            cash_return: 3.0,
            inflation_rate: 3.0,
        },
        retirement_funding: RetirementFundingInputs {
            safe_withdrawal_rate: 4.0,
            retirement_income: 0.0,
            life_expectancy: 85,
            effective_tax_rate: 15.0,
        },
        basis: ValueBasis::Real,
    }
}
