//! Planner configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// In-game hard ceiling on clock speed (250%).
pub const MAX_CLOCK_SPEED: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OptimizationTarget {
    /// Minimize power draw
    PowerEfficiency,
    /// Maximize throughput per machine
    Speed,
    /// Fewest moving parts
    #[default]
    Simplicity,
    /// Least raw input per unit of output
    ResourceEfficiency,
}

impl FromStr for OptimizationTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "power" | "powerefficiency" => Ok(Self::PowerEfficiency),
            "speed" => Ok(Self::Speed),
            "simplicity" | "simple" => Ok(Self::Simplicity),
            "resource" | "resources" | "resourceefficiency" => Ok(Self::ResourceEfficiency),
            other => Err(format!(
                "unknown optimization target '{other}' (expected power, speed, simplicity or resource)"
            )),
        }
    }
}

impl fmt::Display for OptimizationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PowerEfficiency => "power-efficiency",
            Self::Speed => "speed",
            Self::Simplicity => "simplicity",
            Self::ResourceEfficiency => "resource-efficiency",
        };
        f.write_str(name)
    }
}

/// Options steering recipe/building selection and the optimizer passes.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizationOptions {
    pub optimize_for: OptimizationTarget,
    pub prefer_alternate_recipes: bool,
    pub allow_overclocking: bool,
    pub max_overclock_percentage: f64,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            optimize_for: OptimizationTarget::Simplicity,
            prefer_alternate_recipes: false,
            allow_overclocking: true,
            max_overclock_percentage: 250.0,
        }
    }
}

impl OptimizationOptions {
    /// Clock multiplier the overclock pass may use, capped at 250%.
    pub fn max_clock_speed(&self) -> f64 {
        (self.max_overclock_percentage / 100.0).min(MAX_CLOCK_SPEED)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
