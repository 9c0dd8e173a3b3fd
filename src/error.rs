//! Planner error taxonomy

/// Reasons a production plan cannot be built.
///
/// Every variant aborts the whole build; no partial graph is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("no recipe available for {item}")]
    NoRecipeAvailable { item: String },
    #[error("no building available for recipe {recipe}")]
    NoBuildingAvailable { recipe: String },
    #[error("unsatisfiable demand for {item}: production chain loops back on itself")]
    UnsatisfiableDemand { item: String },
    #[error("invalid rate {rate} for {item}: must be a positive, finite number per minute")]
    InvalidRate { item: String, rate: f64 },
    #[error("invalid target '{0}': expected ITEM:RATE")]
    InvalidTarget(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;
