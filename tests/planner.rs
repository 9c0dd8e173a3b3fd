//! End-to-end planning against the public API.

use rusqlite::Connection;
use satisfactory_planner::models::{
    Building, BuildingType, Item, ItemCategory, ItemQuantity, Milestone, Recipe,
};
use satisfactory_planner::sample::sample_catalog;
use satisfactory_planner::*;

// ===========================================================================
// Helpers
// ===========================================================================

fn recipe(
    id: &str,
    inputs: &[(&Item, f64)],
    outputs: &[(&Item, f64)],
    seconds: f64,
    building: &str,
) -> Recipe {
    let quantities = |list: &[(&Item, f64)]| {
        list.iter()
            .map(|&(item, q)| ItemQuantity::new(item.clone(), q))
            .collect::<Vec<_>>()
    };
    Recipe {
        id: id.into(),
        name: id.into(),
        inputs: quantities(inputs),
        outputs: quantities(outputs),
        production_time_seconds: seconds,
        is_alternate: false,
        compatible_buildings: vec![building.into()],
    }
}

/// iron_ore -> iron_ingot -> iron_plate, plus two plate consumers.
fn plate_catalog() -> Catalog {
    let ore = Item::new("iron_ore", "Iron Ore", ItemCategory::RawResource);
    let ingot = Item::new("iron_ingot", "Iron Ingot", ItemCategory::Ingot);
    let plate = Item::new("iron_plate", "Iron Plate", ItemCategory::BasicPart);
    let frame_a = Item::new("frame_a", "Frame A", ItemCategory::IntermediatePart);
    let frame_b = Item::new("frame_b", "Frame B", ItemCategory::IntermediatePart);

    let mut catalog = Catalog::new();
    for item in [&ore, &ingot, &plate, &frame_a, &frame_b] {
        catalog.add_item(item.clone());
    }
    catalog
        .add_building(Building::new("miner", "Miner", BuildingType::Extractor, 5.0))
        .add_building(Building::new("smelter", "Smelter", BuildingType::Smelter, 4.0))
        .add_building(Building::new("constructor", "Constructor", BuildingType::Constructor, 4.0))
        .add_recipe(recipe("iron_ingot", &[(&ore, 1.0)], &[(&ingot, 1.0)], 2.0, "smelter"))
        .add_recipe(recipe("iron_plate", &[(&ingot, 3.0)], &[(&plate, 2.0)], 6.0, "constructor"))
        // 6/min per machine, drawing 30 plates/min
        .add_recipe(recipe("frame_a", &[(&plate, 5.0)], &[(&frame_a, 1.0)], 10.0, "constructor"))
        // 5/min per machine, drawing 20 plates/min
        .add_recipe(recipe("frame_b", &[(&plate, 4.0)], &[(&frame_b, 1.0)], 12.0, "constructor"));
    catalog
}

fn no_overclock() -> OptimizationOptions {
    OptimizationOptions {
        allow_overclocking: false,
        ..OptimizationOptions::default()
    }
}

fn plan(catalog: &Catalog, targets: &[(&str, f64)], options: &OptimizationOptions) -> ProductionGraph {
    let targets: Vec<Target> = targets.iter().map(|&(id, rate)| Target::new(id, rate)).collect();
    build_production_graph(catalog, &targets, &Unrestricted, options).unwrap()
}

fn nodes_for<'a>(graph: &'a ProductionGraph, recipe_id: &str) -> Vec<&'a ProductionNode> {
    graph
        .nodes()
        .map(|(_, n)| n)
        .filter(|n| n.recipe.id == recipe_id)
        .collect()
}

fn raw_rate(graph: &ProductionGraph, item_id: &str) -> f64 {
    graph
        .required_resources()
        .iter()
        .find(|r| r.item.id == item_id)
        .map_or(0.0, |r| r.quantity)
}

/// Every non-raw input is covered by the steps feeding it, within 2%.
fn assert_rate_sufficient(graph: &ProductionGraph) {
    for (_, node) in graph.nodes() {
        for input in node.recipe.inputs.iter().filter(|i| !i.item.is_raw_resource) {
            let supplied: f64 = node
                .input_nodes()
                .iter()
                .filter_map(|&s| graph.node(s))
                .map(|s| s.output_rate(&input.item.id))
                .sum();
            let required = node.input_rate(&input.item.id);
            assert!(
                supplied >= required * 0.98,
                "{} gets {supplied} {} of {required}",
                node.recipe.id,
                input.item.id
            );
        }
    }
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn single_recipe_target() {
    let graph = plan(&plate_catalog(), &[("iron_ingot", 30.0)], &OptimizationOptions::default());

    assert_eq!(graph.len(), 1);
    let (_, node) = graph.nodes().next().unwrap();
    assert_eq!(node.building_count, 1.0);
    assert_eq!(node.clock_speed, 1.0);
    assert_eq!(raw_rate(&graph, "iron_ore"), 30.0);
}

#[test]
fn reinforced_iron_plate_chain() {
    let catalog = sample_catalog();
    let graph = plan(&catalog, &[("reinforced_iron_plate", 10.0)], &no_overclock());

    assert!(graph.len() >= 4);
    assert!(graph.total_power_consumption() > 0.0);
    assert!(raw_rate(&graph, "iron_ore") > 0.0);

    // Ingots for plates and rods collapse into one step.
    assert_eq!(graph.len(), 5);
    assert_eq!(nodes_for(&graph, "iron_ingot").len(), 1);

    let counts = |graph: &ProductionGraph| {
        ["reinforced_iron_plate", "iron_plate", "iron_ingot", "screw", "iron_rod"]
            .map(|recipe| {
                let node = nodes_for(graph, recipe)[0];
                (node.building_count, node.clock_speed)
            })
    };
    assert_eq!(
        counts(&graph),
        [(2.0, 1.0), (3.0, 1.0), (4.0, 1.0), (3.0, 1.0), (2.0, 1.0)]
    );
    assert!((raw_rate(&graph, "iron_ore") - 120.0).abs() < 1e-9);

    assert!(graph.edges_consistent());
    assert!(graph.is_acyclic());
    assert_rate_sufficient(&graph);
    assert!(analyze(&graph).bottleneck_nodes.is_empty());
}

#[test]
fn overclocked_chain_runs_at_full_clock() {
    let catalog = sample_catalog();
    let graph = plan(&catalog, &[("reinforced_iron_plate", 10.0)], &OptimizationOptions::default());

    let counts = ["reinforced_iron_plate", "iron_plate", "iron_ingot", "screw", "iron_rod"]
        .map(|recipe| {
            let node = nodes_for(&graph, recipe)[0];
            (node.building_count, node.clock_speed)
        });
    assert_eq!(
        counts,
        [(1.0, 2.5), (2.0, 2.5), (2.0, 2.5), (2.0, 2.5), (1.0, 2.5)]
    );
    for (_, node) in graph.nodes() {
        assert!(node.actual_production_rate() >= node.target_rate);
    }
    // 2 smelters at 250% draw 150 ore/min.
    assert!((raw_rate(&graph, "iron_ore") - 150.0).abs() < 1e-9);

    // Screws at 250% want 50 rods/min from one rod machine making 37.5,
    // and plates plus rods want 187.5 ingots/min against 150.
    let analysis = analyze(&graph);
    let mut short: Vec<&str> = analysis
        .bottleneck_nodes
        .iter()
        .map(|&id| graph.node(id).unwrap().recipe.id.as_str())
        .collect();
    short.sort();
    assert_eq!(short, ["iron_ingot", "iron_rod"]);
    assert!(analysis.suggestions[0].starts_with("Consider increasing production or overclocking for:"));
}

#[test]
fn shared_intermediate_is_merged_and_summed() {
    let catalog = plate_catalog();
    let options = no_overclock();

    let plates_for = |target: &str, rate: f64| {
        let graph = plan(&catalog, &[(target, rate)], &options);
        nodes_for(&graph, "iron_plate")[0].building_count
    };
    let separate = plates_for("frame_a", 6.0) + plates_for("frame_b", 5.0);

    let graph = plan(&catalog, &[("frame_a", 6.0), ("frame_b", 5.0)], &options);
    let plates = nodes_for(&graph, "iron_plate");
    assert_eq!(plates.len(), 1);
    assert_eq!(plates[0].building_count, separate);
    assert_eq!(plates[0].output_nodes().len(), 2);
    assert_rate_sufficient(&graph);
}

#[test]
fn non_overclockable_building_keeps_full_clock() {
    let mut catalog = plate_catalog();
    let mut smelter = catalog.building("smelter").unwrap().clone();
    smelter.can_overclock = false;
    catalog.add_building(smelter);

    let graph = plan(&catalog, &[("iron_plate", 200.0)], &OptimizationOptions::default());
    let ingots = nodes_for(&graph, "iron_ingot");
    assert_eq!(ingots[0].clock_speed, 1.0);
    assert_eq!(ingots[0].building_count, 10.0);
    // The constructor is still free to overclock.
    assert!(nodes_for(&graph, "iron_plate")[0].clock_speed > 1.0);
}

#[test]
fn raw_target_is_a_single_extraction_step() {
    let catalog = sample_catalog();
    let graph = plan(&catalog, &[("iron_ore", 120.0)], &no_overclock());
    assert_eq!(graph.len(), 1);
    let (_, node) = graph.nodes().next().unwrap();
    assert!(node.is_extraction());
    assert!(node.input_nodes().is_empty());
    assert_eq!(node.building.id, "miner_mk1");
    assert_eq!(node.building_count, 2.0);

    let speed = OptimizationOptions {
        optimize_for: OptimizationTarget::Speed,
        ..no_overclock()
    };
    let graph = plan(&catalog, &[("iron_ore", 120.0)], &speed);
    let (_, node) = graph.nodes().next().unwrap();
    assert_eq!(node.building.id, "miner_mk2");
    assert_eq!(node.building_count, 1.0);
    assert_eq!(raw_rate(&graph, "iron_ore"), 120.0);
}

// ===========================================================================
// Determinism and options
// ===========================================================================

fn fingerprint(graph: &ProductionGraph) -> Vec<(String, String, f64, f64)> {
    graph
        .nodes()
        .map(|(_, n)| (n.recipe.id.clone(), n.building.id.clone(), n.building_count, n.clock_speed))
        .collect()
}

#[test]
fn identical_requests_give_identical_plans() {
    let catalog = sample_catalog();
    let targets = [("smart_plating", 4.0), ("modular_frame", 3.0), ("cable", 30.0)];
    for options in [OptimizationOptions::default(), no_overclock()] {
        let a = plan(&catalog, &targets, &options);
        let b = plan(&catalog, &targets, &options);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }
}

#[test]
fn prefer_alternates_switches_recipes() {
    let catalog = sample_catalog();
    let options = OptimizationOptions {
        prefer_alternate_recipes: true,
        ..no_overclock()
    };
    let graph = plan(&catalog, &[("reinforced_iron_plate", 3.0)], &options);
    assert_eq!(nodes_for(&graph, "bolted_iron_plate").len(), 1);
    assert_eq!(nodes_for(&graph, "cast_screw").len(), 1);
    assert!(nodes_for(&graph, "reinforced_iron_plate").is_empty());
    assert_rate_sufficient(&graph);
}

#[test]
fn catalog_from_database_plans_the_same() {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    db::store_catalog(&mut conn, &sample_catalog()).unwrap();
    let loaded = db::load_catalog(&conn).unwrap();

    let targets = [("rotor", 4.0), ("wire", 45.0)];
    let options = OptimizationOptions::default();
    assert_eq!(
        fingerprint(&plan(&loaded, &targets, &options)),
        fingerprint(&plan(&sample_catalog(), &targets, &options))
    );
}

// ===========================================================================
// Research progress
// ===========================================================================

#[test]
fn milestones_gate_recipes() {
    let catalog = sample_catalog();
    let mut research = ResearchState::new(catalog.milestones());
    research.complete_milestone(catalog.milestone("onboarding").unwrap());
    let options = no_overclock();

    let plate = [Target::new("iron_plate", 20.0)];
    assert!(build_production_graph(&catalog, &plate, &research, &options).is_ok());

    let screws = [Target::new("screw", 40.0)];
    assert_eq!(
        build_production_graph(&catalog, &screws, &research, &options).unwrap_err(),
        PlanError::NoRecipeAvailable { item: "screw".into() }
    );

    research.unlock_alternate("cast_screw");
    let graph = build_production_graph(&catalog, &screws, &research, &options).unwrap();
    assert_eq!(nodes_for(&graph, "cast_screw").len(), 1);
}

#[test]
fn locked_building_blocks_its_recipes() {
    let catalog = sample_catalog();
    let mut research = ResearchState::new(catalog.milestones());
    research.complete_milestone(catalog.milestone("onboarding").unwrap());
    // Unlocks the recipes but not the assembler that runs them.
    research.complete_milestone(&Milestone {
        id: "recipes_only".into(),
        name: "Recipes Only".into(),
        tier: 1,
        unlocked_recipes: vec!["reinforced_iron_plate".into(), "screw".into()],
        unlocked_buildings: vec![],
    });
    let targets = [Target::new("reinforced_iron_plate", 5.0)];

    let err = build_production_graph(&catalog, &targets, &research, &no_overclock()).unwrap_err();
    assert_eq!(
        err,
        PlanError::NoBuildingAvailable {
            recipe: "reinforced_iron_plate".into()
        }
    );

    research.complete_through_tier(catalog.milestones(), 2);
    let graph = build_production_graph(&catalog, &targets, &research, &no_overclock()).unwrap();
    assert_eq!(nodes_for(&graph, "reinforced_iron_plate")[0].building.id, "assembler");
}

// ===========================================================================
// Errors and reports
// ===========================================================================

#[test]
fn bad_targets_abort_the_plan() {
    let catalog = sample_catalog();
    let options = OptimizationOptions::default();

    let err = build_production_graph(&catalog, &[Target::new("nope", 1.0)], &Unrestricted, &options)
        .unwrap_err();
    assert_eq!(err, PlanError::UnknownItem("nope".into()));

    let err = build_production_graph(
        &catalog,
        &[Target::new("screw", 10.0), Target::new("rotor", -1.0)],
        &Unrestricted,
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::InvalidRate { ref item, .. } if item == "rotor"));

    assert!("rotor".parse::<Target>().is_err());
}

#[test]
fn report_and_text_output() {
    let catalog = sample_catalog();
    let graph = plan(&catalog, &[("modular_frame", 2.0)], &OptimizationOptions::default());
    let analysis = analyze(&graph);

    assert_eq!(analysis.total_buildings, graph.total_buildings());
    assert!(analysis.efficiency_score > 0.0);

    let summary = analysis.to_string();
    assert!(summary.starts_with("=== Production Summary ==="));
    assert!(summary.contains("Iron Ore @"));

    let tree = format_production_graph(&graph);
    assert!(tree.lines().next().unwrap().contains("Modular Frame"));

    let json = serde_json::to_value(PlanReport::new(&graph, &analysis)).unwrap();
    assert_eq!(json["targets"][0]["item"], "modular_frame");
    assert_eq!(json["nodes"].as_array().unwrap().len(), graph.len());
}
