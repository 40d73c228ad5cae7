//! Monte Carlo investment projections
//!
//! Each path starts at the initial value and, every month, adds the
//! contribution and then applies a normally distributed return with mean
//! `annual_mean / 12` and standard deviation `annual_std_dev / sqrt(12)`.
//! Values are floored at zero. Asset classes are treated as independent.
//!
//! The random source is a caller-supplied [`rand::Rng`], so seeded runs are
//! reproducible.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::stats::{mean, percentile_sorted, round_to, standard_deviation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    LargeCap,
    SmallCap,
    International,
    Bonds,
    Cash,
    Reit,
    Balanced,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LargeCap => "large_cap",
            Self::SmallCap => "small_cap",
            Self::International => "international",
            Self::Bonds => "bonds",
            Self::Cash => "cash",
            Self::Reit => "reit",
            Self::Balanced => "balanced",
        }
    }
}

impl std::str::FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "largecap" => Ok(Self::LargeCap),
            "smallcap" => Ok(Self::SmallCap),
            "international" | "intl" => Ok(Self::International),
            "bonds" | "bond" => Ok(Self::Bonds),
            "cash" => Ok(Self::Cash),
            "reit" | "reits" => Ok(Self::Reit),
            "balanced" => Ok(Self::Balanced),
            _ => Err(format!("Unknown asset class: {}", s)),
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [Self::Conservative, Self::Moderate, Self::Aggressive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

impl std::str::FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(format!("Unknown risk profile: {}", s)),
        }
    }
}

impl std::fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Annualized return distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnAssumption {
    pub annual_mean: f64,
    pub annual_std_dev: f64,
}

impl ReturnAssumption {
    pub fn new(annual_mean: f64, annual_std_dev: f64) -> Self {
        Self {
            annual_mean,
            annual_std_dev,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAssumption {
    pub asset_class: AssetClass,
    pub annual_mean: f64,
    pub annual_std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAssumption {
    pub profile: RiskProfile,
    pub annual_mean: f64,
    pub annual_std_dev: f64,
}

fn default_asset_assumptions() -> Vec<AssetAssumption> {
    [
        (AssetClass::LargeCap, 0.10, 0.15),
        (AssetClass::SmallCap, 0.12, 0.20),
        (AssetClass::International, 0.08, 0.17),
        (AssetClass::Bonds, 0.05, 0.06),
        (AssetClass::Cash, 0.02, 0.01),
        (AssetClass::Reit, 0.09, 0.19),
        (AssetClass::Balanced, 0.07, 0.10),
    ]
    .into_iter()
    .map(|(asset_class, annual_mean, annual_std_dev)| AssetAssumption {
        asset_class,
        annual_mean,
        annual_std_dev,
    })
    .collect()
}

fn default_profile_assumptions() -> Vec<ProfileAssumption> {
    [
        (RiskProfile::Conservative, 0.05, 0.06),
        (RiskProfile::Moderate, 0.07, 0.10),
        (RiskProfile::Aggressive, 0.10, 0.16),
    ]
    .into_iter()
    .map(|(profile, annual_mean, annual_std_dev)| ProfileAssumption {
        profile,
        annual_mean,
        annual_std_dev,
    })
    .collect()
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Paths per run unless the caller asks for a different count
    pub num_simulations: usize,
    /// Upper bound on paths per run
    pub max_simulations: usize,
    /// Upper bound on the horizon
    pub max_months: u32,
    pub asset_classes: Vec<AssetAssumption>,
    pub risk_profiles: Vec<ProfileAssumption>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: 5_000,
            max_simulations: 100_000,
            max_months: 1_200,
            asset_classes: default_asset_assumptions(),
            risk_profiles: default_profile_assumptions(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 || self.num_simulations > self.max_simulations {
            return Err(Error::InvalidConfig(format!(
                "simulation.num_simulations must be between 1 and {}",
                self.max_simulations
            )));
        }
        if self.max_months == 0 {
            return Err(Error::InvalidConfig(
                "simulation.max_months must be at least 1".to_string(),
            ));
        }
        let negative_asset = self.asset_classes.iter().any(|a| a.annual_std_dev < 0.0);
        let negative_profile = self.risk_profiles.iter().any(|p| p.annual_std_dev < 0.0);
        if negative_asset || negative_profile {
            return Err(Error::InvalidConfig(
                "simulation volatility assumptions must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// One simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub initial_value: f64,
    pub monthly_contribution: f64,
    pub months: u32,
    pub annual_mean: f64,
    pub annual_std_dev: f64,
    /// Target value for the goal probability
    #[serde(default)]
    pub goal: Option<f64>,
    /// Overrides the configured path count
    #[serde(default)]
    pub num_simulations: Option<usize>,
}

impl SimulationParams {
    pub fn new(initial_value: f64, monthly_contribution: f64, months: u32) -> Self {
        let balanced = ReturnAssumption::new(0.07, 0.10);
        Self {
            initial_value,
            monthly_contribution,
            months,
            annual_mean: balanced.annual_mean,
            annual_std_dev: balanced.annual_std_dev,
            goal: None,
            num_simulations: None,
        }
    }

    pub fn with_returns(mut self, returns: ReturnAssumption) -> Self {
        self.annual_mean = returns.annual_mean;
        self.annual_std_dev = returns.annual_std_dev;
        self
    }

    pub fn with_goal(mut self, goal: f64) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn with_simulations(mut self, count: usize) -> Self {
        self.num_simulations = Some(count);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub mean: f64,
    pub std_dev: f64,
    pub percentiles: Percentiles,
    /// `[p10, p90]`
    pub confidence_interval: [f64; 2],
    /// Fraction of paths ending at or above the goal
    pub goal_probability: Option<f64>,
    pub num_simulations: usize,
    pub months: u32,
    pub assumptions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub profile: RiskProfile,
    pub result: SimulationResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationWeight {
    pub asset_class: AssetClass,
    pub weight: f64,
}

/// Box-Muller sampler that keeps the second draw of each pair
#[derive(Debug, Default)]
struct NormalSampler {
    cached: Option<f64>,
}

impl NormalSampler {
    fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if let Some(z) = self.cached.take() {
            return z;
        }

        let u1 = rng.gen::<f64>().max(1e-12);
        let u2 = rng.gen::<f64>();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached = Some(r * theta.sin());
        r * theta.cos()
    }
}

pub struct MonteCarloSimulator {
    config: SimulationConfig,
}

impl Default for MonteCarloSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MonteCarloSimulator {
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
        }
    }

    pub fn with_config(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn asset_assumption(&self, asset_class: AssetClass) -> Result<ReturnAssumption> {
        self.config
            .asset_classes
            .iter()
            .find(|a| a.asset_class == asset_class)
            .map(|a| ReturnAssumption::new(a.annual_mean, a.annual_std_dev))
            .ok_or_else(|| {
                Error::InvalidData(format!("No return assumption for asset class {}", asset_class))
            })
    }

    pub fn profile_assumption(&self, profile: RiskProfile) -> Result<ReturnAssumption> {
        self.config
            .risk_profiles
            .iter()
            .find(|p| p.profile == profile)
            .map(|p| ReturnAssumption::new(p.annual_mean, p.annual_std_dev))
            .ok_or_else(|| {
                Error::InvalidData(format!("No return assumption for risk profile {}", profile))
            })
    }

    /// Blend an allocation into one return assumption.
    ///
    /// Weights are normalized to sum to 1. The blended volatility is
    /// `sqrt(sum(w^2 * sigma^2))`, which assumes zero correlation.
    pub fn blend_allocation(&self, allocation: &[AllocationWeight]) -> Result<ReturnAssumption> {
        if allocation.iter().any(|a| !(a.weight >= 0.0) || !a.weight.is_finite()) {
            return Err(Error::InvalidConfig(
                "allocation weights must be non-negative".to_string(),
            ));
        }
        let total: f64 = allocation.iter().map(|a| a.weight).sum();
        if total <= 0.0 {
            return Err(Error::InvalidConfig(
                "allocation weights must sum to more than zero".to_string(),
            ));
        }

        let mut annual_mean = 0.0;
        let mut variance = 0.0;
        for entry in allocation {
            let assumption = self.asset_assumption(entry.asset_class)?;
            let weight = entry.weight / total;
            annual_mean += weight * assumption.annual_mean;
            variance += (weight * assumption.annual_std_dev).powi(2);
        }

        Ok(ReturnAssumption::new(annual_mean, variance.sqrt()))
    }

    /// Run the simulation and summarize the terminal values
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        params: &SimulationParams,
        rng: &mut R,
    ) -> Result<SimulationResult> {
        let count = self.validate_params(params)?;
        debug!(
            "Simulating {} paths over {} months",
            count, params.months
        );

        let monthly_mean = params.annual_mean / 12.0;
        let monthly_std_dev = params.annual_std_dev / 12_f64.sqrt();

        let mut sampler = NormalSampler::default();
        let mut outcomes: Vec<f64> = (0..count)
            .map(|_| {
                let mut value = params.initial_value;
                for _ in 0..params.months {
                    value += params.monthly_contribution;
                    let monthly_return = monthly_mean + monthly_std_dev * sampler.sample(&mut *rng);
                    value = (value * (1.0 + monthly_return)).max(0.0);
                }
                value
            })
            .collect();

        outcomes.sort_by(|a, b| a.total_cmp(b));

        let percentiles = Percentiles {
            p10: round_to(percentile_sorted(&outcomes, 10.0), 2),
            p25: round_to(percentile_sorted(&outcomes, 25.0), 2),
            p50: round_to(percentile_sorted(&outcomes, 50.0), 2),
            p75: round_to(percentile_sorted(&outcomes, 75.0), 2),
            p90: round_to(percentile_sorted(&outcomes, 90.0), 2),
        };

        let goal_probability = params.goal.map(|goal| {
            let hits = outcomes.iter().filter(|&&v| v >= goal).count();
            round_to(hits as f64 / count as f64, 3)
        });

        Ok(SimulationResult {
            mean: round_to(mean(&outcomes), 2),
            std_dev: round_to(standard_deviation(&outcomes), 2),
            percentiles,
            confidence_interval: [percentiles.p10, percentiles.p90],
            goal_probability,
            num_simulations: count,
            months: params.months,
            assumptions: describe_assumptions(params, count),
        })
    }

    /// Simulate with returns blended from an allocation
    pub fn simulate_allocation<R: Rng + ?Sized>(
        &self,
        params: &SimulationParams,
        allocation: &[AllocationWeight],
        rng: &mut R,
    ) -> Result<SimulationResult> {
        let returns = self.blend_allocation(allocation)?;
        self.simulate(&params.clone().with_returns(returns), rng)
    }

    /// Run conservative, moderate and aggressive profiles over the same horizon
    pub fn compare_scenarios<R: Rng + ?Sized>(
        &self,
        params: &SimulationParams,
        rng: &mut R,
    ) -> Result<Vec<ScenarioComparison>> {
        RiskProfile::ALL
            .iter()
            .map(|&profile| {
                let returns = self.profile_assumption(profile)?;
                let result = self.simulate(&params.clone().with_returns(returns), &mut *rng)?;
                Ok(ScenarioComparison { profile, result })
            })
            .collect()
    }

    fn validate_params(&self, params: &SimulationParams) -> Result<usize> {
        let count = params.num_simulations.unwrap_or(self.config.num_simulations);
        if count == 0 {
            return Err(Error::InvalidConfig(
                "simulation count must be at least 1".to_string(),
            ));
        }
        if count > self.config.max_simulations {
            return Err(Error::InvalidConfig(format!(
                "simulation count {} exceeds the limit of {}",
                count, self.config.max_simulations
            )));
        }
        if params.months == 0 || params.months > self.config.max_months {
            return Err(Error::InvalidConfig(format!(
                "simulation horizon must be between 1 and {} months",
                self.config.max_months
            )));
        }
        if !(params.annual_std_dev >= 0.0) {
            return Err(Error::InvalidConfig(
                "annual volatility must be non-negative".to_string(),
            ));
        }
        if !params.initial_value.is_finite() || !params.monthly_contribution.is_finite() {
            return Err(Error::InvalidConfig(
                "initial value and contribution must be finite".to_string(),
            ));
        }
        Ok(count)
    }
}

fn describe_assumptions(params: &SimulationParams, count: usize) -> String {
    format!(
        "{} simulations over {} months. Returns drawn from a normal distribution with \
         {:.1}% expected annual return and {:.1}% annual volatility. ${:.2} contributed \
         at the start of each month. Asset classes are treated as uncorrelated and \
         portfolio values cannot fall below zero.",
        count,
        params.months,
        params.annual_mean * 100.0,
        params.annual_std_dev * 100.0,
        params.monthly_contribution
    )
}

/// Monthly contribution (paid at the start of each month) needed to grow
/// `current_value` to `goal` in `months` at `annual_return`.
///
/// Solved directly from the annuity-due future value. Never negative.
pub fn calculate_required_contribution(
    current_value: f64,
    goal: f64,
    months: u32,
    annual_return: f64,
) -> Result<f64> {
    if months == 0 {
        return Err(Error::InvalidConfig(
            "months must be at least 1".to_string(),
        ));
    }
    if annual_return <= -1.0 {
        return Err(Error::InvalidConfig(
            "annual return must be greater than -100%".to_string(),
        ));
    }

    let n = months as f64;
    let rate = annual_return / 12.0;

    let payment = if rate == 0.0 {
        (goal - current_value) / n
    } else {
        let growth = (1.0 + rate).powf(n);
        let gap = goal - current_value * growth;
        let annuity_due_factor = (growth - 1.0) / rate * (1.0 + rate);
        gap / annuity_due_factor
    };

    Ok(round_to(payment.max(0.0), 2))
}
