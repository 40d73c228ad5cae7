//! Investment projection command implementations

use std::str::FromStr;

use anyhow::{Context, Result};
use plumb_core::{
    calculate_required_contribution, AllocationWeight, AnalyticsConfig, AssetClass,
    MonteCarloSimulator, RiskProfile, SimulationParams, SimulationResult,
};
use tracing::debug;

use super::{make_rng, print_json};
use crate::cli::ProjectionArgs;

/// Parse `class=weight` pairs such as `large_cap=60`
pub fn parse_allocation(entries: &[String]) -> Result<Vec<AllocationWeight>> {
    entries
        .iter()
        .map(|entry| {
            let (class, weight) = entry
                .split_once('=')
                .with_context(|| format!("Invalid allocation '{}' (use class=weight)", entry))?;
            let asset_class = AssetClass::from_str(class.trim()).map_err(anyhow::Error::msg)?;
            let weight: f64 = weight
                .trim()
                .parse()
                .with_context(|| format!("Invalid weight in '{}'", entry))?;
            Ok(AllocationWeight {
                asset_class,
                weight,
            })
        })
        .collect()
}

fn base_params(args: &ProjectionArgs) -> SimulationParams {
    let mut params = SimulationParams::new(args.initial, args.contribution, args.months);
    params.goal = args.goal;
    params.num_simulations = args.simulations;
    params
}

pub fn cmd_simulate(
    config: &AnalyticsConfig,
    args: &ProjectionArgs,
    profile: Option<&str>,
    allocation: &[String],
    json: bool,
) -> Result<()> {
    let simulator = MonteCarloSimulator::with_config(config.simulation.clone())?;
    let mut rng = make_rng(args.seed);
    let params = base_params(args);

    let result = if !allocation.is_empty() {
        let weights = parse_allocation(allocation)?;
        simulator.simulate_allocation(&params, &weights, &mut rng)?
    } else {
        let profile = profile
            .map(RiskProfile::from_str)
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or(RiskProfile::Moderate);
        debug!("Simulating with {} profile", profile);
        let returns = simulator.profile_assumption(profile)?;
        simulator.simulate(&params.with_returns(returns), &mut rng)?
    };

    if json {
        return print_json(&result);
    }

    println!();
    println!("📊 Monte Carlo Projection");
    println!("   ─────────────────────────────────────────────────────────────");
    print_result(&result);
    println!();
    println!("   {}", result.assumptions);

    Ok(())
}

pub fn cmd_compare(config: &AnalyticsConfig, args: &ProjectionArgs, json: bool) -> Result<()> {
    let simulator = MonteCarloSimulator::with_config(config.simulation.clone())?;
    let mut rng = make_rng(args.seed);

    let scenarios = simulator.compare_scenarios(&base_params(args), &mut rng)?;

    if json {
        return print_json(&scenarios);
    }

    println!();
    println!("📊 Scenario Comparison ({} months)", args.months);
    println!("   ─────────────────────────────────────────────────────────────");
    for scenario in &scenarios {
        println!("   {}", scenario.profile);
        print_result(&scenario.result);
    }

    Ok(())
}

pub fn cmd_required(
    current: f64,
    goal: f64,
    months: u32,
    annual_return: f64,
    json: bool,
) -> Result<()> {
    let payment = calculate_required_contribution(current, goal, months, annual_return)?;

    if json {
        return print_json(&serde_json::json!({
            "current_value": current,
            "goal": goal,
            "months": months,
            "annual_return": annual_return,
            "monthly_contribution": payment,
        }));
    }

    println!(
        "🎯 Contribute ${:.2}/month for {} months to grow ${:.2} into ${:.2} at {:.1}%/year",
        payment,
        months,
        current,
        goal,
        annual_return * 100.0
    );

    Ok(())
}

fn print_result(result: &SimulationResult) {
    let p = &result.percentiles;
    println!(
        "   p10 ${:.0} │ p25 ${:.0} │ median ${:.0} │ p75 ${:.0} │ p90 ${:.0}",
        p.p10, p.p25, p.p50, p.p75, p.p90
    );
    println!(
        "   mean ${:.0} ± ${:.0} over {} paths",
        result.mean, result.std_dev, result.num_simulations
    );
    if let Some(probability) = result.goal_probability {
        println!("   🎯 {:.1}% chance of reaching the goal", probability * 100.0);
    }
}
