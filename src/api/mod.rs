use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AllocationInputs, AnalysisResult, BasicsInputs, BisectionStep, ChartDataPoint,
    DiagnosticLog, GoalsInputs, GrowthRatesInputs, MarketAssumptionsInputs, PlanInputs,
    RetirementFundingInputs, SearchResolution, SolveConfig, ValueBasis, analyze_with, chart_data,
};

const MAX_SEARCH_YEARS: u32 = 200;
const MAX_LIFE_EXPECTANCY: u32 = 150;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliValueBasis {
    Real,
    Nominal,
}

impl From<CliValueBasis> for ValueBasis {
    fn from(value: CliValueBasis) -> Self {
        match value {
            CliValueBasis::Real => ValueBasis::Real,
            CliValueBasis::Nominal => ValueBasis::Nominal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiValueBasis {
    #[serde(alias = "todaysDollars", alias = "inflation-adjusted")]
    Real,
    #[serde(alias = "futureDollars")]
    Nominal,
}

impl From<ApiValueBasis> for CliValueBasis {
    fn from(value: ApiValueBasis) -> Self {
        match value {
            ApiValueBasis::Real => CliValueBasis::Real,
            ApiValueBasis::Nominal => CliValueBasis::Nominal,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnalyzePayload {
    current_age: Option<u32>,
    annual_income: Option<f64>,
    annual_expenses: Option<f64>,
    invested_assets: Option<f64>,

    income_growth_rate: Option<f64>,
    expense_growth_rate: Option<f64>,

    stock_allocation: Option<f64>,
    bond_allocation: Option<f64>,
    cash_allocation: Option<f64>,

    retirement_expenses: Option<f64>,

    stock_return: Option<f64>,
    bond_return: Option<f64>,
    cash_return: Option<f64>,
    inflation_rate: Option<f64>,

    safe_withdrawal_rate: Option<f64>,
    retirement_income: Option<f64>,
    life_expectancy: Option<u32>,
    effective_tax_rate: Option<f64>,

    basis: Option<ApiValueBasis>,
    max_years: Option<u32>,
    fractional_tolerance: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "fire-plan",
    about = "Projects a portfolio forward and solves for the year it can fund retirement (FIRE)"
)]
pub struct Cli {
    #[arg(long)]
    current_age: Option<u32>,
    #[arg(long, help = "Annual income in today's money")]
    annual_income: Option<f64>,
    #[arg(long, help = "Annual expenses in today's money")]
    annual_expenses: Option<f64>,
    #[arg(long)]
    invested_assets: Option<f64>,
    #[arg(long, default_value_t = 3.0, help = "Nominal annual income growth in percent")]
    income_growth_rate: f64,
    #[arg(long, default_value_t = 3.0, help = "Nominal annual expense growth in percent")]
    expense_growth_rate: f64,
    #[arg(long, default_value_t = 70.0, help = "Stock allocation in percent")]
    stock_allocation: f64,
    #[arg(long, default_value_t = 30.0, help = "Bond allocation in percent")]
    bond_allocation: f64,
    #[arg(long, default_value_t = 0.0, help = "Cash allocation in percent")]
    cash_allocation: f64,
    #[arg(long, help = "Annual after-tax retirement spending in today's money")]
    retirement_expenses: Option<f64>,
    #[arg(long, default_value_t = 10.0, help = "Expected stock return in percent")]
    stock_return: f64,
    #[arg(long, default_value_t = 5.0, help = "Expected bond return in percent")]
    bond_return: f64,
    #[arg(long, default_value_t = 3.0, help = "Expected cash return in percent")]
    cash_return: f64,
    #[arg(long, default_value_t = 3.0, help = "Expected inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 4.0, help = "Safe withdrawal rate in percent")]
    safe_withdrawal_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Pension or social security income, counted from age 62"
    )]
    retirement_income: f64,
    #[arg(long, default_value_t = 85, help = "Age to chart through")]
    life_expectancy: u32,
    #[arg(long, default_value_t = 15.0, help = "Effective tax rate on retirement draws in percent")]
    effective_tax_rate: f64,
    #[arg(long, value_enum, default_value_t = CliValueBasis::Real)]
    basis: CliValueBasis,
    #[arg(long, default_value_t = 100, help = "Latest year offset to search for FIRE")]
    max_years: u32,
    #[arg(
        long,
        help = "Refine the FIRE timeline to within this many years; whole years when omitted"
    )]
    fractional_tolerance: Option<f64>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: PlanInputs,
    config: SolveConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanReport {
    basis: ValueBasis,
    analysis: AnalysisResult,
    chart: Vec<ChartDataPoint>,
    iterations: Vec<BisectionStep>,
    diagnostics: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<ApiRequest, String> {
    for (name, value) in [
        ("--annual-income", cli.annual_income),
        ("--annual-expenses", cli.annual_expenses),
        ("--invested-assets", cli.invested_assets),
        ("--retirement-expenses", cli.retirement_expenses),
    ] {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(format!("{name} must be a finite number"));
            }
        }
    }

    if matches!(cli.retirement_expenses, Some(v) if v < 0.0) {
        return Err("--retirement-expenses must be >= 0".to_string());
    }

    for (name, rate) in [
        ("--income-growth-rate", cli.income_growth_rate),
        ("--expense-growth-rate", cli.expense_growth_rate),
        ("--inflation-rate", cli.inflation_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    for (name, rate) in [
        ("--stock-return", cli.stock_return),
        ("--bond-return", cli.bond_return),
        ("--cash-return", cli.cash_return),
    ] {
        if !rate.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    // The sum is not checked here; drift is reported as a diagnostic instead.
    for (name, weight) in [
        ("--stock-allocation", cli.stock_allocation),
        ("--bond-allocation", cli.bond_allocation),
        ("--cash-allocation", cli.cash_allocation),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !cli.safe_withdrawal_rate.is_finite() || cli.safe_withdrawal_rate <= 0.0 {
        return Err("--safe-withdrawal-rate must be > 0".to_string());
    }

    if !(0.0..100.0).contains(&cli.effective_tax_rate) {
        return Err("--effective-tax-rate must be >= 0 and < 100".to_string());
    }

    if !cli.retirement_income.is_finite() || cli.retirement_income < 0.0 {
        return Err("--retirement-income must be >= 0".to_string());
    }

    if cli.life_expectancy > MAX_LIFE_EXPECTANCY {
        return Err(format!("--life-expectancy must be <= {MAX_LIFE_EXPECTANCY}"));
    }

    if cli.max_years == 0 || cli.max_years > MAX_SEARCH_YEARS {
        return Err(format!("--max-years must be between 1 and {MAX_SEARCH_YEARS}"));
    }

    let resolution = match cli.fractional_tolerance {
        None => SearchResolution::WholeYears,
        Some(t) if t.is_finite() && t > 0.0 && t < 1.0 => {
            SearchResolution::Fractional { tolerance_years: t }
        }
        Some(_) => {
            return Err("--fractional-tolerance must be > 0 and < 1".to_string());
        }
    };

    let inputs = PlanInputs {
        basics: BasicsInputs {
            current_age: cli.current_age,
            annual_income: cli.annual_income,
            annual_expenses: cli.annual_expenses,
            invested_assets: cli.invested_assets,
        },
        growth_rates: GrowthRatesInputs {
            income_growth_rate: cli.income_growth_rate,
            expense_growth_rate: cli.expense_growth_rate,
        },
        allocation: AllocationInputs {
            stock_allocation: cli.stock_allocation,
            bond_allocation: cli.bond_allocation,
            cash_allocation: cli.cash_allocation,
        },
        goals: GoalsInputs {
            retirement_expenses: cli.retirement_expenses,
        },
        market_assumptions: MarketAssumptionsInputs {
            stock_return: cli.stock_return,
            bond_return: cli.bond_return,
            cash_return: cli.cash_return,
            inflation_rate: cli.inflation_rate,
        },
        retirement_funding: RetirementFundingInputs {
            safe_withdrawal_rate: cli.safe_withdrawal_rate,
            retirement_income: cli.retirement_income,
            life_expectancy: cli.life_expectancy,
            effective_tax_rate: cli.effective_tax_rate,
        },
        basis: cli.basis.into(),
    };

    Ok(ApiRequest {
        inputs,
        config: SolveConfig {
            max_years: cli.max_years,
            resolution,
        },
    })
}

/// Parses command-line flags and prints one JSON report to stdout.
pub fn run_cli() -> Result<(), String> {
    let request = build_inputs(Cli::parse())?;
    let report = build_report(&request);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("Failed to render report: {e}"))?;
    println!("{json}");
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/analyze",
            get(analyze_get_handler).post(analyze_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("FIRE plan API listening on http://{addr}");
    tracing::info!("Local access: http://127.0.0.1:{port}/api/analyze");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    with_cache_control("ok")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn analyze_get_handler(Query(payload): Query<AnalyzePayload>) -> Response {
    analyze_handler_impl(payload)
}

async fn analyze_post_handler(Json(payload): Json<AnalyzePayload>) -> Response {
    analyze_handler_impl(payload)
}

fn analyze_handler_impl(payload: AnalyzePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            tracing::debug!(error = %msg, "rejected analyze payload");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };
    json_response(StatusCode::OK, build_report(&request))
}

fn build_report(request: &ApiRequest) -> PlanReport {
    let mut log = DiagnosticLog::new();
    let solved = analyze_with(&request.inputs, request.config, &mut log);
    let fire_age = if solved.result.achievable {
        solved.result.fire_age
    } else {
        None
    };
    let chart = chart_data(&request.inputs, fire_age, &mut log).unwrap_or_default();
    log.emit();

    PlanReport {
        basis: request.inputs.basis,
        analysis: solved.result,
        chart,
        iterations: solved.iterations,
        diagnostics: log.messages(),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<AnalyzePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: AnalyzePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = Some(v);
    }
    if let Some(v) = payload.annual_income {
        cli.annual_income = Some(v);
    }
    if let Some(v) = payload.annual_expenses {
        cli.annual_expenses = Some(v);
    }
    if let Some(v) = payload.invested_assets {
        cli.invested_assets = Some(v);
    }

    if let Some(v) = payload.income_growth_rate {
        cli.income_growth_rate = v;
    }
    if let Some(v) = payload.expense_growth_rate {
        cli.expense_growth_rate = v;
    }

    if let Some(v) = payload.stock_allocation {
        cli.stock_allocation = v;
    }
    if let Some(v) = payload.bond_allocation {
        cli.bond_allocation = v;
    }
    if let Some(v) = payload.cash_allocation {
        cli.cash_allocation = v;
    }

    if let Some(v) = payload.retirement_expenses {
        cli.retirement_expenses = Some(v);
    }

    if let Some(v) = payload.stock_return {
        cli.stock_return = v;
    }
    if let Some(v) = payload.bond_return {
        cli.bond_return = v;
    }
    if let Some(v) = payload.cash_return {
        cli.cash_return = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }

    if let Some(v) = payload.safe_withdrawal_rate {
        cli.safe_withdrawal_rate = v;
    }
    if let Some(v) = payload.retirement_income {
        cli.retirement_income = v;
    }
    if let Some(v) = payload.life_expectancy {
        cli.life_expectancy = v;
    }
    if let Some(v) = payload.effective_tax_rate {
        cli.effective_tax_rate = v;
    }

    if let Some(v) = payload.basis {
        cli.basis = v.into();
    }
    if let Some(v) = payload.max_years {
        cli.max_years = v;
    }
    if let Some(v) = payload.fractional_tolerance {
        cli.fractional_tolerance = Some(v);
    }

    build_inputs(cli)
}

// Basics and the spending goal start unset so an incomplete form reports what is missing.
fn default_cli_for_api() -> Cli {
    Cli {
        current_age: None,
        annual_income: None,
        annual_expenses: None,
        invested_assets: None,
        income_growth_rate: 3.0,
        expense_growth_rate: 3.0,
        stock_allocation: 70.0,
        bond_allocation: 30.0,
        cash_allocation: 0.0,
        retirement_expenses: None,
        stock_return: 10.0,
        bond_return: 5.0,
        cash_return: 3.0,
        inflation_rate: 3.0,
        safe_withdrawal_rate: 4.0,
        retirement_income: 0.0,
        life_expectancy: 85,
        effective_tax_rate: 15.0,
        basis: CliValueBasis::Real,
        max_years: 100,
        fractional_tolerance: None,
    }
}
