use super::diagnostics::{DiagnosticSink, require};
use super::error::{FireError, InputField};
use super::projections::{Accumulation, RETIREMENT_WITHDRAWAL_TIMING};
use super::types::{ChartDataPoint, PlanInputs};

/// Portfolio value at every whole age from the current age through life expectancy.
///
/// When `fire_age` falls inside that range it is sampled exactly as well, and every
/// age from there on follows the decumulation projector seeded with the value at
/// `fire_age` (or at the current age, if `fire_age` is already past). Ages before it
/// follow the accumulation projector.
pub fn chart_data(
    inputs: &PlanInputs,
    fire_age: Option<f64>,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<Vec<ChartDataPoint>, FireError> {
    let start_age = require(
        inputs.basics.current_age.map(f64::from),
        InputField::CurrentAge,
        "chart data",
        diagnostics,
    )?;
    let end_age = f64::from(inputs.retirement_funding.life_expectancy);
    if start_age > end_age {
        return Ok(Vec::new());
    }

    let mut ages: Vec<f64> = (0..=(end_age - start_age) as u32)
        .map(|offset| start_age + offset as f64)
        .collect();
    let fire_age = fire_age.filter(|age| age.is_finite());
    if let Some(age) = fire_age {
        if (start_age..=end_age).contains(&age) && !ages.contains(&age) {
            ages.push(age);
        }
    }
    ages.sort_by(f64::total_cmp);

    let accumulation = Accumulation::new(inputs, "chart data", diagnostics)?;
    // A fire age already behind us starts drawing down from today's balance.
    let retirement = match fire_age {
        Some(age) if age <= end_age => {
            let seed_age = age.max(start_age);
            let seed_value = accumulation.value_at(seed_age - start_age, diagnostics)?;
            let decumulation = accumulation.retirement(diagnostics)?;
            Some((age, seed_age, seed_value, decumulation))
        }
        _ => None,
    };

    let mut points = Vec::with_capacity(ages.len());
    for age in ages {
        let portfolio_value = match &retirement {
            Some((fire_age, seed_age, seed_value, decumulation)) if age >= *fire_age => {
                decumulation.value_after(
                    *seed_value,
                    age - seed_age,
                    *seed_age,
                    RETIREMENT_WITHDRAWAL_TIMING,
                )
            }
            _ => accumulation.value_at(age - start_age, diagnostics)?,
        };
        points.push(ChartDataPoint {
            age,
            portfolio_value,
        });
    }
    Ok(points)
}
