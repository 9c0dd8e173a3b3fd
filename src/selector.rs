//! Recipe and building selection policy
//!
//! Each rule is a chain of comparators; [`Iterator::min_by`] returns the
//! first of several equal candidates, so a full tie always falls back to
//! catalog order and the choice is reproducible.

use std::cmp::Ordering;

use crate::error::{PlanError, Result};
use crate::models::{Building, Recipe};
use crate::options::{OptimizationOptions, OptimizationTarget};

/// Pick one recipe producing `item_id` from already-filtered candidates.
pub fn select_recipe<'a>(
    item_id: &str,
    candidates: &'a [Recipe],
    options: &OptimizationOptions,
) -> Result<&'a Recipe> {
    let compare: fn(&Recipe, &Recipe) -> Ordering = if options.prefer_alternate_recipes {
        |a, b| alternates_first(a, b).then_with(|| fewer_inputs(a, b))
    } else {
        match options.optimize_for {
            OptimizationTarget::ResourceEfficiency => {
                |a, b| alternates_first(a, b).then_with(|| less_input_per_output(a, b))
            }
            OptimizationTarget::Speed => faster_output,
            OptimizationTarget::Simplicity | OptimizationTarget::PowerEfficiency => {
                |a, b| alternates_first(b, a).then_with(|| fewer_inputs(a, b))
            }
        }
    };

    candidates
        .iter()
        .min_by(|a, b| compare(a, b))
        .ok_or_else(|| PlanError::NoRecipeAvailable {
            item: item_id.to_string(),
        })
}

/// Pick one building to run `recipe_id` from already-filtered candidates.
pub fn select_building<'a>(
    recipe_id: &str,
    candidates: &'a [Building],
    options: &OptimizationOptions,
) -> Result<&'a Building> {
    let selected = match options.optimize_for {
        OptimizationTarget::PowerEfficiency => candidates
            .iter()
            .min_by(|a, b| power_per_throughput(a).total_cmp(&power_per_throughput(b))),
        OptimizationTarget::Speed => candidates
            .iter()
            .min_by(|a, b| b.production_speed.total_cmp(&a.production_speed)),
        OptimizationTarget::Simplicity => candidates
            .iter()
            .min_by(|a, b| a.power_consumption.total_cmp(&b.power_consumption)),
        OptimizationTarget::ResourceEfficiency => candidates.first(),
    };

    selected.ok_or_else(|| PlanError::NoBuildingAvailable {
        recipe: recipe_id.to_string(),
    })
}

/// Raw input consumed per unit of output; lower is better.
pub fn resource_efficiency(recipe: &Recipe) -> f64 {
    let outputs = recipe.total_outputs();
    if outputs <= 0.0 {
        return f64::INFINITY;
    }
    recipe.total_inputs() / outputs
}

fn output_per_second(recipe: &Recipe) -> f64 {
    if recipe.production_time_seconds <= 0.0 {
        return 0.0;
    }
    recipe.total_outputs() / recipe.production_time_seconds
}

fn power_per_throughput(building: &Building) -> f64 {
    if building.production_speed <= 0.0 {
        return f64::INFINITY;
    }
    building.power_consumption / building.production_speed
}

fn alternates_first(a: &Recipe, b: &Recipe) -> Ordering {
    b.is_alternate.cmp(&a.is_alternate)
}

fn fewer_inputs(a: &Recipe, b: &Recipe) -> Ordering {
    a.inputs.len().cmp(&b.inputs.len())
}

fn less_input_per_output(a: &Recipe, b: &Recipe) -> Ordering {
    resource_efficiency(a).total_cmp(&resource_efficiency(b))
}

fn faster_output(a: &Recipe, b: &Recipe) -> Ordering {
    output_per_second(b).total_cmp(&output_per_second(a))
}
