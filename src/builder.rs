//! Recursive production graph construction
//!
//! Demand for a target item is expanded into a production step, then into
//! steps for each of its recipe's inputs, until raw resources are reached.
//! Every requested target is expanded independently; the optimizer's merge
//! pass later folds the repeated steps together.

use tracing::{debug, info};

use crate::availability::AvailabilityPolicy;
use crate::catalog::PlanningCatalog;
use crate::error::{PlanError, Result};
use crate::graph::{NodeId, ProductionGraph, ProductionNode, machine_count};
use crate::models::{Building, Item, ItemQuantity, Recipe};
use crate::optimizer;
use crate::options::OptimizationOptions;
use crate::selector::{select_building, select_recipe};
use crate::targets::Target;

/// Output of one extractor at 100% clock and baseline speed, per minute.
pub const EXTRACTION_RATE_PER_MINUTE: f64 = 60.0;

/// Build and optimize a production graph satisfying every target.
///
/// Fails on the first unresolvable item, recipe or building; no partial
/// graph is returned.
pub fn build_production_graph<C: PlanningCatalog + ?Sized>(
    catalog: &C,
    targets: &[Target],
    availability: &dyn AvailabilityPolicy,
    options: &OptimizationOptions,
) -> Result<ProductionGraph> {
    let mut graph = GraphBuilder::new(catalog, availability, options).build(targets)?;
    optimizer::optimize(&mut graph, options);
    Ok(graph)
}

/// Expands demand into an unoptimized graph.
pub struct GraphBuilder<'a, C: ?Sized> {
    catalog: &'a C,
    availability: &'a dyn AvailabilityPolicy,
    options: &'a OptimizationOptions,
    // Items currently being expanded, outermost first.
    in_progress: Vec<String>,
}

impl<'a, C: PlanningCatalog + ?Sized> GraphBuilder<'a, C> {
    pub fn new(
        catalog: &'a C,
        availability: &'a dyn AvailabilityPolicy,
        options: &'a OptimizationOptions,
    ) -> Self {
        Self {
            catalog,
            availability,
            options,
            in_progress: Vec::new(),
        }
    }

    /// Expand every target into a fresh graph without running the
    /// optimizer passes.
    pub fn build(&mut self, targets: &[Target]) -> Result<ProductionGraph> {
        let resolved = targets
            .iter()
            .map(|target| self.resolve_target(target))
            .collect::<Result<Vec<_>>>()?;

        let mut graph = ProductionGraph::new(resolved.clone());
        for target in &resolved {
            if target.item.is_raw_resource {
                self.add_extraction(&mut graph, &target.item, target.quantity)?;
            } else {
                self.expand(&mut graph, &target.item, target.quantity)?;
            }
        }

        info!(
            targets = resolved.len(),
            nodes = graph.len(),
            "expanded production graph"
        );
        Ok(graph)
    }

    fn resolve_target(&self, target: &Target) -> Result<ItemQuantity> {
        let item = self.resolve_item(&target.item_id)?;
        let rate = target.rate_per_minute;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlanError::InvalidRate {
                item: target.item_id.clone(),
                rate,
            });
        }
        Ok(ItemQuantity::new(item, rate))
    }

    fn resolve_item(&self, item_id: &str) -> Result<Item> {
        self.catalog
            .get(item_id)
            .ok_or_else(|| PlanError::UnknownItem(item_id.to_string()))
    }

    /// Expand demand for `item`; raw resources yield no node.
    fn expand(
        &mut self,
        graph: &mut ProductionGraph,
        item: &Item,
        rate: f64,
    ) -> Result<Option<NodeId>> {
        if item.is_raw_resource {
            return Ok(None);
        }
        if self.in_progress.iter().any(|id| *id == item.id) {
            debug!(item = %item.id, chain = ?self.in_progress, "production chain loops");
            return Err(PlanError::UnsatisfiableDemand {
                item: item.id.clone(),
            });
        }

        self.in_progress.push(item.id.clone());
        let expanded = self.expand_recipe(graph, item, rate);
        self.in_progress.pop();
        expanded.map(Some)
    }

    fn expand_recipe(
        &mut self,
        graph: &mut ProductionGraph,
        item: &Item,
        rate: f64,
    ) -> Result<NodeId> {
        let recipe = self.choose_recipe(item)?;
        let building = self.choose_building(&recipe)?;

        let per_machine = recipe.per_minute(recipe.output_quantity(&item.id).unwrap_or(0.0))
            * building.production_speed;
        if per_machine <= 0.0 {
            return Err(PlanError::UnsatisfiableDemand {
                item: item.id.clone(),
            });
        }
        let building_count = machine_count(rate / per_machine);

        debug!(
            item = %item.id,
            recipe = %recipe.id,
            building = %building.id,
            rate,
            building_count,
            "expanding production step"
        );

        // Per-cycle input quantities become per-minute demand for the
        // machines just sized.
        let demands = recipe
            .inputs
            .iter()
            .map(|input| {
                let required =
                    recipe.per_minute(input.quantity) * building.production_speed * building_count;
                (input.item.id.clone(), required)
            })
            .collect::<Vec<_>>();

        let node = graph.add_node(ProductionNode::new(
            recipe,
            building,
            item.id.clone(),
            building_count,
            rate,
        ));

        for (input_id, required) in demands {
            let input = self.resolve_item(&input_id)?;
            if let Some(supplier) = self.expand(graph, &input, required)? {
                graph.connect(supplier, node);
            }
        }

        Ok(node)
    }

    fn choose_recipe(&self, item: &Item) -> Result<Recipe> {
        let candidates: Vec<Recipe> = self
            .catalog
            .recipes_producing(&item.id)
            .into_iter()
            .filter(|r| self.availability.is_recipe_available(r))
            .collect();
        select_recipe(&item.id, &candidates, self.options).cloned()
    }

    fn choose_building(&self, recipe: &Recipe) -> Result<Building> {
        let candidates: Vec<Building> = self
            .catalog
            .buildings_for_recipe(&recipe.id)
            .into_iter()
            .filter(|b| self.availability.is_building_available(b))
            .collect();
        select_building(&recipe.id, &candidates, self.options).cloned()
    }

    /// A raw resource requested directly gets a single extraction step.
    fn add_extraction(
        &mut self,
        graph: &mut ProductionGraph,
        item: &Item,
        rate: f64,
    ) -> Result<NodeId> {
        let extractors = self.extractors_for(item);
        let recipe = extraction_recipe(item, &extractors);
        let building = select_building(&recipe.id, &extractors, self.options)?.clone();

        let per_machine = recipe.per_minute(1.0) * building.production_speed;
        if per_machine <= 0.0 {
            return Err(PlanError::UnsatisfiableDemand {
                item: item.id.clone(),
            });
        }
        let building_count = machine_count(rate / per_machine);
        debug!(item = %item.id, building = %building.id, building_count, "extraction step");

        Ok(graph.add_node(ProductionNode::new(
            recipe,
            building,
            item.id.clone(),
            building_count,
            rate,
        )))
    }

    /// Available extractors for `item`.
    ///
    /// When catalog recipes producing the item name extractors, only those
    /// can mine it. Otherwise every extractor is treated as able to extract
    /// any raw resource.
    fn extractors_for(&self, item: &Item) -> Vec<Building> {
        let extractors = self.catalog.all_extractors();
        let named: Vec<String> = self
            .catalog
            .recipes_producing(&item.id)
            .into_iter()
            .flat_map(|r| r.compatible_buildings)
            .filter(|id| extractors.iter().any(|b| b.id == *id))
            .collect();

        extractors
            .into_iter()
            .filter(|b| named.is_empty() || named.contains(&b.id))
            .filter(|b| self.availability.is_building_available(b))
            .collect()
    }
}

/// Recipe with no inputs yielding `item` at the baseline extraction rate.
pub fn extraction_recipe(item: &Item, extractors: &[Building]) -> Recipe {
    Recipe {
        id: format!("extract_{}", item.id),
        name: format!("{} Extraction", item.name),
        inputs: Vec::new(),
        outputs: vec![ItemQuantity::new(item.clone(), EXTRACTION_RATE_PER_MINUTE / 60.0)],
        production_time_seconds: 1.0,
        is_alternate: false,
        compatible_buildings: extractors.iter().map(|b| b.id.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::{ResearchState, Unrestricted};
    use crate::catalog::{Catalog, ItemCatalog};
    use crate::models::{BuildingType, ItemCategory};

    fn no_overclock() -> OptimizationOptions {
        OptimizationOptions {
            allow_overclocking: false,
            ..OptimizationOptions::default()
        }
    }

    fn ingot_catalog() -> Catalog {
        let ore = Item::new("iron_ore", "Iron Ore", ItemCategory::RawResource);
        let ingot = Item::new("iron_ingot", "Iron Ingot", ItemCategory::Ingot);
        let mut catalog = Catalog::new();
        catalog
            .add_item(ore.clone())
            .add_item(ingot.clone())
            .add_building(Building::new("miner", "Miner", BuildingType::Extractor, 5.0))
            .add_building(Building::new("smelter", "Smelter", BuildingType::Smelter, 4.0))
            .add_recipe(Recipe {
                id: "iron_ingot".into(),
                name: "Iron Ingot".into(),
                inputs: vec![ItemQuantity::new(ore, 1.0)],
                outputs: vec![ItemQuantity::new(ingot, 1.0)],
                production_time_seconds: 2.0,
                is_alternate: false,
                compatible_buildings: vec!["smelter".into()],
            });
        catalog
    }

    #[test]
    fn single_step_is_sized_by_cycle_rate() {
        let catalog = ingot_catalog();
        let graph = GraphBuilder::new(&catalog, &Unrestricted, &no_overclock())
            .build(&[Target::new("iron_ingot", 45.0)])
            .unwrap();

        assert_eq!(graph.len(), 1);
        let (_, node) = graph.nodes().next().unwrap();
        assert_eq!(node.recipe.id, "iron_ingot");
        assert_eq!(node.building_count, 2.0);
        assert_eq!(node.target_rate, 45.0);
        // Raw demand follows the machines actually built.
        assert_eq!(graph.required_resources()[0].quantity, 60.0);
    }

    #[test]
    fn raw_target_becomes_one_extraction_node() {
        let catalog = ingot_catalog();
        let graph = GraphBuilder::new(&catalog, &Unrestricted, &no_overclock())
            .build(&[Target::new("iron_ore", 150.0)])
            .unwrap();

        assert_eq!(graph.len(), 1);
        let (_, node) = graph.nodes().next().unwrap();
        assert!(node.is_extraction());
        assert!(node.input_nodes().is_empty());
        assert_eq!(node.building.id, "miner");
        assert_eq!(node.building_count, 3.0);
        assert_eq!(graph.required_resources()[0].quantity, 150.0);
    }

    #[test]
    fn extraction_uses_extractors_named_for_the_item() {
        let mut catalog = ingot_catalog();
        let mut pump = Building::new("water_extractor", "Water Extractor", BuildingType::Extractor, 1.0);
        pump.production_speed = 2.0;
        catalog.add_building(pump);

        let plan_ore = |catalog: &Catalog| {
            let graph = GraphBuilder::new(catalog, &Unrestricted, &no_overclock())
                .build(&[Target::new("iron_ore", 60.0)])
                .unwrap();
            let (_, node) = graph.nodes().next().unwrap();
            node.building.id.clone()
        };
        // Nothing says which extractor mines ore: the cheapest one wins.
        assert_eq!(plan_ore(&catalog), "water_extractor");

        let ore = catalog.get("iron_ore").unwrap();
        catalog.add_recipe(Recipe {
            id: "mine_iron_ore".into(),
            name: "Iron Ore".into(),
            inputs: vec![],
            outputs: vec![ItemQuantity::new(ore, 1.0)],
            production_time_seconds: 1.0,
            is_alternate: false,
            compatible_buildings: vec!["miner".into()],
        });
        assert_eq!(plan_ore(&catalog), "miner");
    }

    #[test]
    fn unknown_recipe_input_fails_the_whole_build() {
        let mut catalog = ingot_catalog();
        let slag = Item::new("slag", "Slag", ItemCategory::Other);
        let mut recipe = catalog.recipe("iron_ingot").unwrap().clone();
        recipe.inputs.push(ItemQuantity::new(slag, 1.0));
        catalog.add_recipe(recipe);

        let err = build_production_graph(
            &catalog,
            &[Target::new("iron_ingot", 30.0)],
            &Unrestricted,
            &OptimizationOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, PlanError::UnknownItem("slag".into()));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let catalog = ingot_catalog();
        let err = GraphBuilder::new(&catalog, &Unrestricted, &no_overclock())
            .build(&[Target::new("unobtainium", 1.0)])
            .unwrap_err();
        assert_eq!(err, PlanError::UnknownItem("unobtainium".into()));
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let catalog = ingot_catalog();
        let err = GraphBuilder::new(&catalog, &Unrestricted, &no_overclock())
            .build(&[Target::new("iron_ingot", 0.0)])
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidRate { .. }));
    }

    #[test]
    fn unavailable_recipe_fails_the_whole_build() {
        let catalog = ingot_catalog();
        let mut research = ResearchState::default();
        research.disable_standard("iron_ingot");
        let err = GraphBuilder::new(&catalog, &research, &no_overclock())
            .build(&[Target::new("iron_ingot", 30.0)])
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::NoRecipeAvailable {
                item: "iron_ingot".into()
            }
        );
    }

    #[test]
    fn recipe_without_compatible_building_fails() {
        let mut catalog = ingot_catalog();
        let mut recipe = catalog.recipe("iron_ingot").unwrap().clone();
        recipe.compatible_buildings.clear();
        catalog.add_recipe(recipe);
        let err = GraphBuilder::new(&catalog, &Unrestricted, &no_overclock())
            .build(&[Target::new("iron_ingot", 30.0)])
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::NoBuildingAvailable {
                recipe: "iron_ingot".into()
            }
        );
    }

    #[test]
    fn looping_recipes_are_unsatisfiable() {
        let a = Item::new("a", "A", ItemCategory::BasicPart);
        let b = Item::new("b", "B", ItemCategory::BasicPart);
        let mut catalog = Catalog::new();
        catalog
            .add_item(a.clone())
            .add_item(b.clone())
            .add_building(Building::new("c", "Constructor", BuildingType::Constructor, 4.0));
        for (input, output) in [(&a, &b), (&b, &a)] {
            catalog.add_recipe(Recipe {
                id: format!("make_{}", output.id),
                name: output.name.clone(),
                inputs: vec![ItemQuantity::new(input.clone(), 1.0)],
                outputs: vec![ItemQuantity::new(output.clone(), 1.0)],
                production_time_seconds: 1.0,
                is_alternate: false,
                compatible_buildings: vec!["c".into()],
            });
        }

        let err = GraphBuilder::new(&catalog, &Unrestricted, &no_overclock())
            .build(&[Target::new("a", 10.0)])
            .unwrap_err();
        assert_eq!(err, PlanError::UnsatisfiableDemand { item: "a".into() });
    }
}
