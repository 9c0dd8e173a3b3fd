//! Read-only catalog lookups
//!
//! The planner consumes the catalog through three small traits so callers
//! can plug in their own storage. [`Catalog`] is the stock implementation:
//! immutable tables built once and shared by reference.

use std::collections::HashMap;

use crate::models::{Building, Item, Milestone, Recipe};

pub trait ItemCatalog {
    fn get(&self, item_id: &str) -> Option<Item>;
}

pub trait RecipeCatalog {
    /// Recipes listing `item_id` among their outputs, in catalog order.
    fn recipes_producing(&self, item_id: &str) -> Vec<Recipe>;
    /// Recipes listing `item_id` among their inputs, in catalog order.
    fn recipes_consuming(&self, item_id: &str) -> Vec<Recipe>;
}

pub trait BuildingCatalog {
    /// Buildings able to run `recipe_id`, in catalog order.
    fn buildings_for_recipe(&self, recipe_id: &str) -> Vec<Building>;
    fn all_extractors(&self) -> Vec<Building>;
}

/// Everything the graph builder needs to resolve a plan.
pub trait PlanningCatalog: ItemCatalog + RecipeCatalog + BuildingCatalog {}

impl<T: ItemCatalog + RecipeCatalog + BuildingCatalog + ?Sized> PlanningCatalog for T {}

/// In-memory catalog tables.
///
/// Vectors keep insertion order, which is the final tie-break of the
/// selection policy.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    recipes: Vec<Recipe>,
    buildings: Vec<Building>,
    milestones: Vec<Milestone>,
    item_index: HashMap<String, usize>,
    building_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an item.
    pub fn add_item(&mut self, item: Item) -> &mut Self {
        match self.item_index.get(&item.id) {
            Some(&idx) => self.items[idx] = item,
            None => {
                self.item_index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
        self
    }

    /// Add or replace a building.
    pub fn add_building(&mut self, building: Building) -> &mut Self {
        match self.building_index.get(&building.id) {
            Some(&idx) => self.buildings[idx] = building,
            None => {
                self.building_index
                    .insert(building.id.clone(), self.buildings.len());
                self.buildings.push(building);
            }
        }
        self
    }

    pub fn add_recipe(&mut self, recipe: Recipe) -> &mut Self {
        match self.recipes.iter().position(|r| r.id == recipe.id) {
            Some(idx) => self.recipes[idx] = recipe,
            None => self.recipes.push(recipe),
        }
        self
    }

    pub fn add_milestone(&mut self, milestone: Milestone) -> &mut Self {
        self.milestones.push(milestone);
        self
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn recipe(&self, recipe_id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == recipe_id)
    }

    pub fn building(&self, building_id: &str) -> Option<&Building> {
        self.building_index
            .get(building_id)
            .map(|&idx| &self.buildings[idx])
    }

    pub fn milestone(&self, milestone_id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }
}

impl ItemCatalog for Catalog {
    fn get(&self, item_id: &str) -> Option<Item> {
        self.item_index
            .get(item_id)
            .map(|&idx| self.items[idx].clone())
    }
}

impl RecipeCatalog for Catalog {
    fn recipes_producing(&self, item_id: &str) -> Vec<Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.produces(item_id))
            .cloned()
            .collect()
    }

    fn recipes_consuming(&self, item_id: &str) -> Vec<Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.consumes(item_id))
            .cloned()
            .collect()
    }
}

impl BuildingCatalog for Catalog {
    fn buildings_for_recipe(&self, recipe_id: &str) -> Vec<Building> {
        let Some(recipe) = self.recipe(recipe_id) else {
            return Vec::new();
        };
        // Catalog order, not the recipe's listing order.
        self.buildings
            .iter()
            .filter(|b| recipe.compatible_buildings.contains(&b.id))
            .cloned()
            .collect()
    }

    fn all_extractors(&self) -> Vec<Building> {
        self.buildings
            .iter()
            .filter(|b| b.is_extractor())
            .cloned()
            .collect()
    }
}
