use super::diagnostics::{DiagnosticSink, require};
use super::error::{FireError, InputField};
use super::projections::{Accumulation, required_portfolio};
use super::solver::{BisectionStep, SolveConfig, solve_with_target};
use super::types::{AnalysisResult, AnalysisStatus, PlanInputs};

const MISSING_DATA_MESSAGE: &str = "Missing required data to calculate FIRE goals";

/// Analysis plus the bisection steps that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedAnalysis {
    pub result: AnalysisResult,
    pub iterations: Vec<BisectionStep>,
}

/// Whole-year FIRE analysis over the default search horizon.
pub fn analyze(inputs: &PlanInputs, diagnostics: &mut dyn DiagnosticSink) -> AnalysisResult {
    analyze_with(inputs, SolveConfig::default(), diagnostics).result
}

pub fn analyze_with(
    inputs: &PlanInputs,
    config: SolveConfig,
    diagnostics: &mut dyn DiagnosticSink,
) -> SolvedAnalysis {
    let funding = &inputs.retirement_funding;
    let current_portfolio = inputs.basics.invested_assets;
    let unsolved = |err, required| SolvedAnalysis {
        result: failed(err, required, current_portfolio),
        iterations: Vec::new(),
    };

    let required = match required_portfolio(
        inputs.goals.retirement_expenses,
        funding.safe_withdrawal_rate,
        funding.effective_tax_rate,
        diagnostics,
    ) {
        Ok(required) => required,
        Err(err) => return unsolved(err, None),
    };
    let accumulation = match Accumulation::new(inputs, "years to FIRE", diagnostics) {
        Ok(accumulation) => accumulation,
        Err(err) => return unsolved(err, Some(required)),
    };
    let solve = match solve_with_target(&accumulation, required, config, diagnostics) {
        Ok(solve) => solve,
        Err(err) => return unsolved(err, Some(required)),
    };

    let years = solve.years_to_fire;
    let projected = match accumulation.value_at(years, diagnostics) {
        Ok(value) => value,
        Err(err) => return unsolved(err, Some(required)),
    };

    let current_age = require(
        inputs.basics.current_age.map(f64::from),
        InputField::CurrentAge,
        "FIRE age",
        diagnostics,
    );
    let result = match current_age {
        Ok(current_age) => {
            let fire_age = current_age + years;
            let status = if years == 0.0 {
                AnalysisStatus::AlreadyAchieved
            } else {
                AnalysisStatus::Achievable
            };
            AnalysisResult {
                achievable: true,
                status,
                years_to_fire: Some(years),
                fire_age: Some(fire_age),
                required_portfolio: Some(required),
                current_portfolio,
                projected_portfolio_at_fire: Some(projected),
                message: progress_message(years, fire_age),
            }
        }
        // The timeline is known; only the age it lands on is not.
        Err(err) => AnalysisResult {
            years_to_fire: Some(years),
            projected_portfolio_at_fire: Some(projected),
            ..failed(err, Some(required), current_portfolio)
        },
    };

    SolvedAnalysis {
        result,
        iterations: solve.iterations,
    }
}

fn failed(err: FireError, required: Option<f64>, current: Option<f64>) -> AnalysisResult {
    let (status, message) = match err {
        FireError::MissingInput(field) => (
            AnalysisStatus::MissingInput { field },
            MISSING_DATA_MESSAGE.to_string(),
        ),
        FireError::NotAchievable { max_years } => (
            AnalysisStatus::NotAchievable,
            format!("FIRE is not achievable within {max_years} years with the current plan."),
        ),
    };
    AnalysisResult {
        achievable: false,
        status,
        years_to_fire: None,
        fire_age: None,
        required_portfolio: required,
        current_portfolio: current,
        projected_portfolio_at_fire: None,
        message,
    }
}

fn progress_message(years: f64, fire_age: f64) -> String {
    let y = format_years(years);
    let age = format_years(fire_age);
    if years == 0.0 {
        "Congratulations! You have already achieved FIRE.".to_string()
    } else if years <= 10.0 {
        format!("You can achieve FIRE in {y} years at age {age}.")
    } else if years <= 30.0 {
        format!("FIRE is achievable in {y} years at age {age}.")
    } else {
        format!(
            "FIRE will take {y} years, reaching it at age {age}. \
             Consider raising your savings rate."
        )
    }
}

fn format_years(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
