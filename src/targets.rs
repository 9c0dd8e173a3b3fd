//! Production targets: what to make and how fast

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

static TARGET_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_\-]+)\s*[:=@]\s*(-?[\d.]+(?:[eE][+-]?\d+)?)\s*(?:/\s*min)?\s*$").ok()
});

/// Demand for one item, per minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub item_id: String,
    pub rate_per_minute: f64,
}

impl Target {
    pub fn new(item_id: impl Into<String>, rate_per_minute: f64) -> Self {
        Self {
            item_id: item_id.into(),
            rate_per_minute,
        }
    }
}

/// Accepts `iron_plate:30`, `iron_plate=30`, `iron_plate@30/min`.
///
/// Only the shape is checked here; sign and range are validated when the
/// graph is built so programmatic targets get the same treatment.
impl FromStr for Target {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlanError::InvalidTarget(s.to_string());
        let target_re = TARGET_RE.as_ref().ok_or_else(invalid)?;
        let cap = target_re.captures(s).ok_or_else(invalid)?;
        let rate = cap[2].parse::<f64>().map_err(|_| invalid())?;
        Ok(Self::new(&cap[1], rate))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.item_id, self.rate_per_minute)
    }
}
