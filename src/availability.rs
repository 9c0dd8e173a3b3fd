//! Which recipes and buildings a plan may use

use std::collections::HashSet;

use crate::models::{Building, Milestone, Recipe};

/// Opaque predicate consulted before any recipe or building is selected.
pub trait AvailabilityPolicy {
    fn is_recipe_available(&self, recipe: &Recipe) -> bool;
    fn is_building_available(&self, building: &Building) -> bool;
}

/// Everything in the catalog is usable, alternates included.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl AvailabilityPolicy for Unrestricted {
    fn is_recipe_available(&self, _recipe: &Recipe) -> bool {
        true
    }

    fn is_building_available(&self, _building: &Building) -> bool {
        true
    }
}

/// A player's research progress.
///
/// Alternate recipes must be unlocked one by one (hard drives). Standard
/// recipes and buildings follow completed milestones; while no milestone
/// has been completed the milestone system is considered unused and all
/// standard content is available.
#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    completed_milestones: HashSet<String>,
    unlocked_alternates: HashSet<String>,
    disabled_standard: HashSet<String>,
    unlocked_recipes: HashSet<String>,
    unlocked_buildings: HashSet<String>,
    gated_buildings: HashSet<String>,
}

impl ResearchState {
    /// Empty research state aware of every milestone in `milestones`.
    ///
    /// Buildings no milestone ever unlocks stay available regardless of
    /// progress.
    pub fn new<'a>(milestones: impl IntoIterator<Item = &'a Milestone>) -> Self {
        let gated_buildings = milestones
            .into_iter()
            .flat_map(|m| m.unlocked_buildings.iter().cloned())
            .collect();
        Self {
            gated_buildings,
            ..Self::default()
        }
    }

    pub fn complete_milestone(&mut self, milestone: &Milestone) {
        self.completed_milestones.insert(milestone.id.clone());
        self.unlocked_recipes
            .extend(milestone.unlocked_recipes.iter().cloned());
        self.unlocked_buildings
            .extend(milestone.unlocked_buildings.iter().cloned());
    }

    /// Complete every milestone up to and including `tier`.
    pub fn complete_through_tier<'a>(
        &mut self,
        milestones: impl IntoIterator<Item = &'a Milestone>,
        tier: u32,
    ) {
        for milestone in milestones.into_iter().filter(|m| m.tier <= tier) {
            self.complete_milestone(milestone);
        }
    }

    pub fn unlock_alternate(&mut self, recipe_id: impl Into<String>) {
        self.unlocked_alternates.insert(recipe_id.into());
    }

    pub fn disable_standard(&mut self, recipe_id: impl Into<String>) {
        self.disabled_standard.insert(recipe_id.into());
    }

    pub fn is_milestone_completed(&self, milestone_id: &str) -> bool {
        self.completed_milestones.contains(milestone_id)
    }

    fn milestones_in_use(&self) -> bool {
        !self.completed_milestones.is_empty()
    }
}

impl AvailabilityPolicy for ResearchState {
    fn is_recipe_available(&self, recipe: &Recipe) -> bool {
        if recipe.is_alternate {
            return self.unlocked_alternates.contains(&recipe.id);
        }
        if self.disabled_standard.contains(&recipe.id) {
            return false;
        }
        !self.milestones_in_use() || self.unlocked_recipes.contains(&recipe.id)
    }

    fn is_building_available(&self, building: &Building) -> bool {
        !self.milestones_in_use()
            || !self.gated_buildings.contains(&building.id)
            || self.unlocked_buildings.contains(&building.id)
    }
}
