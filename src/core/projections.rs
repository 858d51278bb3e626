use serde::Serialize;

use super::contributions::{retirement_cash_flow, yearly_contribution};
use super::diagnostics::{DiagnosticSink, require};
use super::error::{FireError, InputField};
use super::returns::portfolio_rate;
use super::types::PlanInputs;

/// When the year's portfolio draw happens relative to that year's growth.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WithdrawalTiming {
    /// Withdraw first, then grow what is left. A bad sequence hurts more.
    StartOfYear,
    /// Grow the full balance, then withdraw.
    EndOfYear,
}

/// Ordering used by the decumulation projector.
pub const RETIREMENT_WITHDRAWAL_TIMING: WithdrawalTiming = WithdrawalTiming::StartOfYear;

/// Portfolio size whose safe withdrawal covers `retirement_expenses` after tax.
///
/// The withdrawal rate applies to the gross draw: expenses are grossed up for tax first.
pub fn required_portfolio(
    retirement_expenses: Option<f64>,
    safe_withdrawal_rate: f64,
    effective_tax_rate: f64,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    let expenses = require(
        retirement_expenses,
        InputField::RetirementExpenses,
        "required portfolio",
        diagnostics,
    )?;
    let gross_withdrawal = expenses / (1.0 - effective_tax_rate / 100.0);
    Ok(gross_withdrawal / (safe_withdrawal_rate / 100.0))
}

/// Accumulation-phase value after `years` (fractional allowed).
///
/// Each whole year grows the balance and then adds that year's saving. A trailing
/// partial year grows by the matching fraction and adds a prorated saving.
pub fn future_portfolio_value(
    inputs: &PlanInputs,
    years: f64,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    Accumulation::new(inputs, "future portfolio value", diagnostics)?
        .value_at(years, diagnostics)
}

/// Accumulation projector with its starting balance and rate resolved up front, so
/// repeated evaluations of one plan report each diagnostic only once.
pub(crate) struct Accumulation<'a> {
    inputs: &'a PlanInputs,
    invested_assets: f64,
    rate: f64,
}

impl<'a> Accumulation<'a> {
    pub(crate) fn new(
        inputs: &'a PlanInputs,
        operation: &'static str,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Result<Self, FireError> {
        let invested_assets = require(
            inputs.basics.invested_assets,
            InputField::InvestedAssets,
            operation,
            diagnostics,
        )?;
        Ok(Self {
            inputs,
            invested_assets,
            rate: portfolio_rate(inputs, diagnostics),
        })
    }

    pub(crate) fn value_at(
        &self,
        years: f64,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Result<f64, FireError> {
        let (whole_years, fraction) = split_years(years);
        let mut balance = self.invested_assets;

        for year in 0..whole_years {
            balance = grow(balance, self.rate, 1.0);
            balance += yearly_contribution(self.inputs, year, diagnostics)?;
        }

        if fraction > 0.0 {
            balance = grow(balance, self.rate, fraction);
            balance += yearly_contribution(self.inputs, whole_years, diagnostics)? * fraction;
        }

        Ok(balance)
    }

    /// Decumulation projector for the same plan, reusing the resolved rate.
    pub(crate) fn retirement(
        &self,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Result<Decumulation<'a>, FireError> {
        Ok(Decumulation {
            inputs: self.inputs,
            expenses: retirement_expenses(self.inputs, diagnostics)?,
            rate: self.rate,
        })
    }
}

fn retirement_expenses(
    inputs: &PlanInputs,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    require(
        inputs.goals.retirement_expenses,
        InputField::RetirementExpenses,
        "retirement portfolio value",
        diagnostics,
    )
}

/// Decumulation-phase value after `years_in_retirement`, starting from `starting_value`
/// at `retirement_start_age`.
pub fn future_portfolio_value_after_retirement(
    inputs: &PlanInputs,
    starting_value: f64,
    years_in_retirement: f64,
    retirement_start_age: f64,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    future_portfolio_value_after_retirement_with_timing(
        inputs,
        starting_value,
        years_in_retirement,
        retirement_start_age,
        RETIREMENT_WITHDRAWAL_TIMING,
        diagnostics,
    )
}

pub fn future_portfolio_value_after_retirement_with_timing(
    inputs: &PlanInputs,
    starting_value: f64,
    years_in_retirement: f64,
    retirement_start_age: f64,
    timing: WithdrawalTiming,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    let decumulation = Decumulation::new(inputs, diagnostics)?;
    Ok(decumulation.value_after(
        starting_value,
        years_in_retirement,
        retirement_start_age,
        timing,
    ))
}

/// Decumulation counterpart of [`Accumulation`].
pub(crate) struct Decumulation<'a> {
    inputs: &'a PlanInputs,
    expenses: f64,
    rate: f64,
}

impl<'a> Decumulation<'a> {
    fn new(
        inputs: &'a PlanInputs,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Result<Self, FireError> {
        let expenses = retirement_expenses(inputs, diagnostics)?;
        Ok(Self {
            inputs,
            expenses,
            rate: portfolio_rate(inputs, diagnostics),
        })
    }

    pub(crate) fn value_after(
        &self,
        starting_value: f64,
        years_in_retirement: f64,
        retirement_start_age: f64,
        timing: WithdrawalTiming,
    ) -> f64 {
        let funding = &self.inputs.retirement_funding;
        let flow_at = |age: f64| {
            retirement_cash_flow(
                self.expenses,
                funding.retirement_income,
                funding.effective_tax_rate,
                age,
            )
        };
        let (whole_years, fraction) = split_years(years_in_retirement);

        let mut balance = starting_value;
        for year in 0..whole_years {
            let flow = flow_at(retirement_start_age + year as f64);
            balance = decumulation_step(
                balance,
                self.rate,
                1.0,
                flow.gross_withdrawal,
                flow.surplus,
                timing,
            );
        }

        if fraction > 0.0 {
            let flow = flow_at(retirement_start_age + whole_years as f64);
            balance = decumulation_step(
                balance,
                self.rate,
                fraction,
                flow.gross_withdrawal * fraction,
                flow.surplus * fraction,
                timing,
            );
        }

        balance
    }
}

fn decumulation_step(
    balance: f64,
    rate: f64,
    period: f64,
    withdrawal: f64,
    surplus: f64,
    timing: WithdrawalTiming,
) -> f64 {
    let after_growth = match timing {
        WithdrawalTiming::StartOfYear => grow(balance - withdrawal, rate, period),
        WithdrawalTiming::EndOfYear => grow(balance, rate, period) - withdrawal,
    };
    after_growth + surplus
}

/// A non-positive balance is left alone rather than compounded further negative.
fn grow(balance: f64, rate: f64, period: f64) -> f64 {
    if balance <= 0.0 {
        return balance;
    }
    if period == 1.0 {
        balance * (1.0 + rate)
    } else {
        balance * (1.0 + rate).powf(period)
    }
}

/// Longest horizon any projector will step through; longer spans are clamped to it.
pub const MAX_PROJECTION_YEARS: u32 = 1_000;

// NaN and negative spans project nothing.
fn split_years(years: f64) -> (u32, f64) {
    let years = years.max(0.0).min(MAX_PROJECTION_YEARS as f64);
    let whole = years.floor();
    (whole as u32, years - whole)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::{Diagnostic, DiagnosticLog, Silent};
    use crate::core::types::{AllocationInputs, sample_plan};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn assert_approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn fv(inputs: &PlanInputs, years: f64) -> f64 {
        future_portfolio_value(inputs, years, &mut Silent).expect("complete inputs")
    }

    #[test]
    fn required_portfolio_without_tax() {
        let value =
            required_portfolio(Some(40_000.0), 4.0, 0.0, &mut Silent).expect("expenses set");
        assert_approx(value, 1_000_000.0, 1e-6);
    }

    #[test]
    fn required_portfolio_grosses_up_for_tax() {
        let value =
            required_portfolio(Some(40_000.0), 4.0, 25.0, &mut Silent).expect("expenses set");
        assert_approx(value, 1_333_333.333_333, 1e-3);
    }

    #[test]
    fn required_portfolio_needs_expenses() {
        let mut log = DiagnosticLog::new();
        let err = required_portfolio(None, 4.0, 0.0, &mut log).expect_err("must fail");
        assert_eq!(err, FireError::MissingInput(InputField::RetirementExpenses));
        assert_eq!(
            log.messages(),
            vec!["Cannot calculate required portfolio: retirement expenses is required"]
        );
    }

    #[test]
    fn five_year_projection_matches_closed_form() {
        let mut inputs = sample_plan();
        inputs.basics.annual_income = Some(80_000.0);
        inputs.basics.annual_expenses = Some(50_000.0);
        assert_approx(fv(&inputs, 5.0), 296_604.652_638, 1e-3);
    }

    #[test]
    fn zero_real_return_just_accumulates_savings() {
        let mut inputs = sample_plan();
        inputs.basics.annual_income = Some(80_000.0);
        inputs.basics.annual_expenses = Some(50_000.0);
        inputs.allocation = AllocationInputs {
            stock_allocation: 0.0,
            bond_allocation: 0.0,
            cash_allocation: 100.0,
        };
        assert_approx(fv(&inputs, 5.0), 250_000.0, 1e-6);
    }

    #[test]
    fn fractional_years_interpolate_between_whole_years() {
        let inputs = sample_plan();
        let two = fv(&inputs, 2.0);
        let half = fv(&inputs, 2.5);
        let three = fv(&inputs, 3.0);
        assert_approx(half, 218_189.223_305, 1e-3);
        assert!(two < half && half < three);
    }

    #[test]
    fn negative_balance_is_not_compounded() {
        let mut inputs = sample_plan();
        inputs.basics.invested_assets = Some(10_000.0);
        inputs.basics.annual_income = Some(0.0);
        inputs.basics.annual_expenses = Some(30_000.0);
        let rate = 0.053_398_058_252_427_16;
        // year 0: grow 10k then -30k; afterwards only withdrawals accumulate
        let expected = 10_000.0 * (1.0 + rate) - 30_000.0 * 3.0;
        assert_approx(fv(&inputs, 3.0), expected, 1e-6);
    }

    #[test]
    fn missing_invested_assets_is_reported_once() {
        let mut inputs = sample_plan();
        inputs.basics.invested_assets = None;
        let mut log = DiagnosticLog::new();
        let err = future_portfolio_value(&inputs, 10.0, &mut log).expect_err("must fail");
        assert_eq!(err, FireError::MissingInput(InputField::InvestedAssets));
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn missing_income_propagates_from_contribution() {
        let mut inputs = sample_plan();
        inputs.basics.annual_income = None;
        let err = future_portfolio_value(&inputs, 1.0, &mut Silent).expect_err("must fail");
        assert_eq!(err, FireError::MissingInput(InputField::AnnualIncome));
        // no year is projected so income is never needed
        assert_approx(fv(&inputs, 0.0), 100_000.0, 1e-9);
    }

    #[test]
    fn retirement_year_withdraws_then_grows() {
        let inputs = sample_plan();
        let value =
            future_portfolio_value_after_retirement(&inputs, 1_000_000.0, 1.0, 44.0, &mut Silent)
                .expect("complete inputs");
        assert_approx(value, 1_003_826.384_923, 1e-3);

        let half =
            future_portfolio_value_after_retirement(&inputs, 1_000_000.0, 0.5, 44.0, &mut Silent)
                .expect("complete inputs");
        assert_approx(half, 1_002_202.365_333, 1e-3);
    }

    #[test]
    fn start_of_year_withdrawal_is_more_conservative() {
        let inputs = sample_plan();
        let start = future_portfolio_value_after_retirement_with_timing(
            &inputs,
            1_000_000.0,
            10.0,
            50.0,
            WithdrawalTiming::StartOfYear,
            &mut Silent,
        )
        .expect("complete inputs");
        let end = future_portfolio_value_after_retirement_with_timing(
            &inputs,
            1_000_000.0,
            10.0,
            50.0,
            WithdrawalTiming::EndOfYear,
            &mut Silent,
        )
        .expect("complete inputs");
        assert!(start < end, "start-of-year {start} should trail end-of-year {end}");
        assert_eq!(RETIREMENT_WITHDRAWAL_TIMING, WithdrawalTiming::StartOfYear);
    }

    #[test]
    fn passive_income_starts_at_eligibility_age() {
        let mut inputs = sample_plan();
        inputs.retirement_funding.retirement_income = 30_000.0;
        let before =
            future_portfolio_value_after_retirement(&inputs, 1_000_000.0, 1.0, 61.0, &mut Silent)
                .expect("complete inputs");
        let after =
            future_portfolio_value_after_retirement(&inputs, 1_000_000.0, 1.0, 62.0, &mut Silent)
                .expect("complete inputs");
        assert_approx(before, 1_003_826.384_923, 1e-3);
        assert_approx(after, 1_035_428.326_670, 1e-3);
    }

    #[test]
    fn retirement_surplus_is_reinvested_at_year_end() {
        let mut inputs = sample_plan();
        inputs.goals.retirement_expenses = Some(20_000.0);
        inputs.retirement_funding.retirement_income = 30_000.0;
        inputs.retirement_funding.effective_tax_rate = 0.0;
        let rate = 0.053_398_058_252_427_16;
        let value =
            future_portfolio_value_after_retirement(&inputs, 500_000.0, 1.0, 65.0, &mut Silent)
                .expect("complete inputs");
        assert_approx(value, 500_000.0 * (1.0 + rate) + 10_000.0, 1e-6);
    }

    #[test]
    fn oversized_horizons_are_clamped() {
        let inputs = sample_plan();
        let capped = fv(&inputs, MAX_PROJECTION_YEARS as f64);
        assert!(capped.is_finite());
        assert_eq!(fv(&inputs, 1e12).to_bits(), capped.to_bits());
        assert_eq!(fv(&inputs, f64::INFINITY).to_bits(), capped.to_bits());
        assert_eq!(fv(&inputs, f64::NAN), 100_000.0);

        let retired = |years: f64| {
            future_portfolio_value_after_retirement(&inputs, 1_000_000.0, years, 44.0, &mut Silent)
                .expect("complete inputs")
        };
        assert_eq!(
            retired(1e12).to_bits(),
            retired(MAX_PROJECTION_YEARS as f64).to_bits()
        );
    }

    #[test]
    fn allocation_drift_is_reported_once_per_projection() {
        let mut inputs = sample_plan();
        inputs.allocation.stock_allocation = 60.0;
        let mut seen: Vec<Diagnostic> = Vec::new();
        future_portfolio_value(&inputs, 25.5, &mut seen).expect("complete inputs");
        future_portfolio_value_after_retirement(&inputs, 1_000_000.0, 10.0, 50.0, &mut seen)
            .expect("complete inputs");
        assert_eq!(seen.len(), 2);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_zero_years_returns_invested_assets(
            assets in 0u32..5_000_000,
            income in 0u32..300_000,
            expenses in 0u32..300_000,
            stock_bp in -500i32..1500,
            inflation_bp in 0u32..800
        ) {
            let mut inputs = sample_plan();
            inputs.basics.invested_assets = Some(assets as f64);
            inputs.basics.annual_income = Some(income as f64);
            inputs.basics.annual_expenses = Some(expenses as f64);
            inputs.market_assumptions.stock_return = stock_bp as f64 / 100.0;
            inputs.market_assumptions.inflation_rate = inflation_bp as f64 / 100.0;
            prop_assert_eq!(fv(&inputs, 0.0), assets as f64);
        }

        #[test]
        fn prop_value_grows_with_time_when_return_and_saving_are_positive(
            assets in 0u32..2_000_000,
            saving in 1u32..100_000,
            stock_bp in 300u32..1500,
            y1 in 0u32..60,
            extra in 1u32..40,
            fraction_pct in 0u32..100
        ) {
            let mut inputs = sample_plan();
            inputs.basics.invested_assets = Some(assets as f64);
            inputs.basics.annual_income = Some(60_000.0 + saving as f64);
            inputs.basics.annual_expenses = Some(60_000.0);
            inputs.market_assumptions.stock_return = stock_bp as f64 / 100.0;

            let early = y1 as f64 + fraction_pct as f64 / 100.0;
            let late = early + extra as f64;
            prop_assert!(fv(&inputs, late) > fv(&inputs, early));
        }

        #[test]
        fn prop_projection_is_deterministic(
            years_tenths in 0u32..800,
            assets in 0u32..2_000_000
        ) {
            let mut inputs = sample_plan();
            inputs.basics.invested_assets = Some(assets as f64);
            let years = years_tenths as f64 / 10.0;
            let first = fv(&inputs, years);
            let second = fv(&inputs, years);
            prop_assert_eq!(first.to_bits(), second.to_bits());
        }
    }
}
