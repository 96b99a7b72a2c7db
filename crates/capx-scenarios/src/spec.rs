//! Scenario configuration: which subproblems and stages a scenario runs,
//! which policy features are switched on, and how stage decisions link.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub scenario_id: String,
    pub description: Option<String>,
    /// Policy module tags enabled for this scenario (e.g. "carbon_cap").
    #[serde(default)]
    pub features: Vec<String>,
    pub subproblems: Vec<SubproblemSpec>,
    #[serde(default = "default_iterations")]
    pub weather_iterations: u32,
    #[serde(default = "default_iterations")]
    pub hydro_iterations: u32,
    #[serde(default = "default_iterations")]
    pub availability_iterations: u32,
    #[serde(default)]
    pub linking: Vec<LinkingRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubproblemSpec {
    pub subproblem: u32,
    pub stages: Vec<u32>,
}

/// Carries one named decision from an earlier stage into a later one.
/// `symbol` is the model variable whose solved values become the decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkingRule {
    pub decision: String,
    pub symbol: String,
    pub from_stage: u32,
    pub to_stage: u32,
}

fn default_iterations() -> u32 {
    1
}

pub fn load_config_from_path(path: &Path) -> Result<ScenarioConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario config '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario config yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario config json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario config"),
    }
}

pub fn validate_config(config: &ScenarioConfig) -> Result<()> {
    if config.scenario_id.trim().is_empty() {
        return Err(anyhow!("scenario_id cannot be empty"));
    }
    if config.subproblems.is_empty() {
        return Err(anyhow!(
            "scenario '{}' declares no subproblems",
            config.scenario_id
        ));
    }
    if config.weather_iterations == 0
        || config.hydro_iterations == 0
        || config.availability_iterations == 0
    {
        return Err(anyhow!("iteration counts must be at least 1"));
    }
    let mut seen_subproblems = HashSet::new();
    let mut all_stages = HashSet::new();
    for sub in &config.subproblems {
        if !seen_subproblems.insert(sub.subproblem) {
            return Err(anyhow!("duplicate subproblem {} in scenario", sub.subproblem));
        }
        if sub.stages.is_empty() {
            return Err(anyhow!("subproblem {} declares no stages", sub.subproblem));
        }
        let mut seen_stages = HashSet::new();
        for stage in &sub.stages {
            if !seen_stages.insert(*stage) {
                return Err(anyhow!(
                    "duplicate stage {} in subproblem {}",
                    stage,
                    sub.subproblem
                ));
            }
            all_stages.insert(*stage);
        }
    }
    let mut seen_links = HashSet::new();
    let mut decision_symbols: HashMap<&str, &str> = HashMap::new();
    for rule in &config.linking {
        if rule.decision.trim().is_empty() || rule.symbol.trim().is_empty() {
            return Err(anyhow!("linking rules need a decision name and a symbol"));
        }
        if rule.from_stage == rule.to_stage {
            return Err(anyhow!(
                "linking rule '{}' links stage {} to itself",
                rule.decision,
                rule.from_stage
            ));
        }
        for stage in [rule.from_stage, rule.to_stage] {
            if !all_stages.contains(&stage) {
                return Err(anyhow!(
                    "linking rule '{}' references stage {} which no subproblem declares",
                    rule.decision,
                    stage
                ));
            }
        }
        if !seen_links.insert((rule.decision.clone(), rule.to_stage)) {
            return Err(anyhow!(
                "decision '{}' is linked into stage {} more than once",
                rule.decision,
                rule.to_stage
            ));
        }
        // A decision names exactly one model symbol; the producing cell
        // publishes it once no matter how many stages consume it.
        if let Some(first) = decision_symbols.insert(rule.decision.as_str(), rule.symbol.as_str()) {
            if first != rule.symbol {
                return Err(anyhow!(
                    "decision '{}' is bound to both symbol '{}' and symbol '{}'",
                    rule.decision,
                    first,
                    rule.symbol
                ));
            }
        }
    }
    Ok(())
}
