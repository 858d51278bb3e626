mod analysis;
mod charts;
mod contributions;
mod diagnostics;
mod error;
mod projections;
mod returns;
mod solver;
mod types;

pub use analysis::{SolvedAnalysis, analyze, analyze_with};
pub use charts::chart_data;
pub use contributions::{
    PASSIVE_INCOME_ELIGIBILITY_AGE, RetirementCashFlow, retirement_cash_flow, yearly_contribution,
};
pub use diagnostics::{Diagnostic, DiagnosticLog, DiagnosticSink, Silent};
pub use error::{FireError, InputField};
pub use projections::{
    MAX_PROJECTION_YEARS, RETIREMENT_WITHDRAWAL_TIMING, WithdrawalTiming, future_portfolio_value,
    future_portfolio_value_after_retirement, future_portfolio_value_after_retirement_with_timing,
    required_portfolio,
};
pub use returns::{real_rate, weighted_nominal_return, weighted_real_return};
pub use solver::{
    BisectionStep, DEFAULT_MAX_YEARS, FireSolve, SearchResolution, SolveConfig, fire_age,
    solve_years_to_fire, years_to_fire,
};
pub use types::{
    AllocationInputs, AnalysisResult, AnalysisStatus, BasicsInputs, ChartDataPoint, GoalsInputs,
    GrowthRatesInputs, MarketAssumptionsInputs, PlanInputs, RetirementFundingInputs, ValueBasis,
};
