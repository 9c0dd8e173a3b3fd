//! Satisfactory Production Planner
//!
//! Turns "N items per minute" targets into a graph of production steps:
//! which recipe, on which building, how many machines, at what clock.

pub mod analysis;
pub mod availability;
pub mod builder;
pub mod catalog;
pub mod db;
pub mod error;
pub mod graph;
pub mod import;
pub mod models;
pub mod optimizer;
pub mod options;
pub mod sample;
pub mod selector;
pub mod targets;

pub use analysis::{PlanReport, ProductionAnalysis, analyze, format_production_graph};
pub use availability::{AvailabilityPolicy, ResearchState, Unrestricted};
pub use builder::{GraphBuilder, build_production_graph};
pub use catalog::{BuildingCatalog, Catalog, ItemCatalog, PlanningCatalog, RecipeCatalog};
pub use error::PlanError;
pub use graph::{NodeId, ProductionGraph, ProductionNode};
pub use options::{OptimizationOptions, OptimizationTarget};
pub use targets::Target;
