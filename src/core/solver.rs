use serde::Serialize;

use super::diagnostics::{DiagnosticSink, require};
use super::error::{FireError, InputField};
use super::projections::{Accumulation, required_portfolio};
use super::types::PlanInputs;

pub const DEFAULT_MAX_YEARS: u32 = 100;
const MAX_REFINE_ITERATIONS: u32 = 64;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SearchResolution {
    #[default]
    WholeYears,
    /// Refines the whole-year answer until the bracket is no wider than `tolerance_years`.
    #[serde(rename_all = "camelCase")]
    Fractional { tolerance_years: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveConfig {
    pub max_years: u32,
    pub resolution: SearchResolution,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            max_years: DEFAULT_MAX_YEARS,
            resolution: SearchResolution::WholeYears,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BisectionStep {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_years: f64,
    pub projected_value: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FireSolve {
    pub years_to_fire: f64,
    pub required_portfolio: f64,
    pub iterations: Vec<BisectionStep>,
}

/// Smallest elapsed time at which the accumulation projection meets the required portfolio.
///
/// Searches `[0, max_years]` only; a trajectory that is still short of the target at
/// `max_years` is reported as not achievable rather than extrapolated.
pub fn solve_years_to_fire(
    inputs: &PlanInputs,
    config: SolveConfig,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<FireSolve, FireError> {
    let funding = &inputs.retirement_funding;
    let target = required_portfolio(
        inputs.goals.retirement_expenses,
        funding.safe_withdrawal_rate,
        funding.effective_tax_rate,
        diagnostics,
    )?;
    let accumulation = Accumulation::new(inputs, "years to FIRE", diagnostics)?;
    solve_with_target(&accumulation, target, config, diagnostics)
}

/// Bisection against an already resolved target and projector.
pub(crate) fn solve_with_target(
    accumulation: &Accumulation<'_>,
    target: f64,
    config: SolveConfig,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<FireSolve, FireError> {
    let mut iterations = Vec::new();
    if accumulation.value_at(0.0, diagnostics)? >= target {
        return Ok(FireSolve {
            years_to_fire: 0.0,
            required_portfolio: target,
            iterations,
        });
    }

    let mut low = 0u32;
    let mut high = config.max_years;
    let mut found = None;
    while low <= high {
        let mid = low + (high - low) / 2;
        let value = accumulation.value_at(mid as f64, diagnostics)?;
        let meets_target = value >= target;
        iterations.push(BisectionStep {
            iteration: iterations.len() as u32 + 1,
            lower_bound: low as f64,
            upper_bound: high as f64,
            candidate_years: mid as f64,
            projected_value: value,
            meets_target,
        });

        if meets_target {
            found = Some(mid);
            match mid.checked_sub(1) {
                Some(next) => high = next,
                None => break,
            }
        } else {
            low = mid + 1;
        }
    }

    let whole_years = found.ok_or(FireError::NotAchievable {
        max_years: config.max_years,
    })?;

    let years_to_fire = match config.resolution {
        SearchResolution::WholeYears => whole_years as f64,
        SearchResolution::Fractional { tolerance_years } if whole_years > 0 => refine(
            accumulation,
            target,
            whole_years,
            tolerance_years,
            &mut iterations,
            diagnostics,
        )?,
        SearchResolution::Fractional { .. } => 0.0,
    };

    Ok(FireSolve {
        years_to_fire,
        required_portfolio: target,
        iterations,
    })
}

// `whole_years` meets the target and `whole_years - 1` does not; narrow that bracket.
fn refine(
    accumulation: &Accumulation<'_>,
    target: f64,
    whole_years: u32,
    tolerance_years: f64,
    iterations: &mut Vec<BisectionStep>,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    let tolerance = if tolerance_years.is_finite() && tolerance_years > 0.0 {
        tolerance_years
    } else {
        f64::EPSILON
    };
    let mut lo = (whole_years - 1) as f64;
    let mut hi = whole_years as f64;
    let mut it = 0;
    while hi - lo > tolerance && it < MAX_REFINE_ITERATIONS {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let value = accumulation.value_at(mid, diagnostics)?;
        let meets_target = value >= target;
        iterations.push(BisectionStep {
            iteration: iterations.len() as u32 + 1,
            lower_bound: lo,
            upper_bound: hi,
            candidate_years: mid,
            projected_value: value,
            meets_target,
        });
        if meets_target {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}

/// Whole years until FIRE, searching up to `max_years`.
pub fn years_to_fire(
    inputs: &PlanInputs,
    max_years: u32,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<u32, FireError> {
    let config = SolveConfig {
        max_years,
        resolution: SearchResolution::WholeYears,
    };
    let solve = solve_years_to_fire(inputs, config, diagnostics)?;
    Ok(solve.years_to_fire as u32)
}

pub fn fire_age(
    inputs: &PlanInputs,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    let current_age = require(
        inputs.basics.current_age.map(f64::from),
        InputField::CurrentAge,
        "FIRE age",
        diagnostics,
    )?;
    let years = years_to_fire(inputs, DEFAULT_MAX_YEARS, diagnostics)?;
    Ok(current_age + years as f64)
}
