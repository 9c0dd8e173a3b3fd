//! Post-construction passes: merge, balance, overclock
//!
//! None of these fail. Ratios that would divide by zero are skipped and
//! the graph stays usable when an opportunity is missed.

use tracing::{debug, info};

use crate::graph::{NodeId, ProductionGraph, machine_count};
use crate::options::OptimizationOptions;

/// Run all passes in order. Overclocking only when the options allow it.
pub fn optimize(graph: &mut ProductionGraph, options: &OptimizationOptions) {
    let merged = merge_duplicate_nodes(graph);
    let rebalanced = balance_production_rates(graph);
    let overclocked = if options.allow_overclocking {
        optimize_overclocking(graph, options)
    } else {
        0
    };
    info!(
        merged,
        rebalanced,
        overclocked,
        nodes = graph.len(),
        "optimized production graph"
    );
}

/// Collapse nodes sharing a recipe and building into the first of them.
///
/// Returns the number of nodes removed.
pub fn merge_duplicate_nodes(graph: &mut ProductionGraph) -> usize {
    let mut groups: Vec<((String, String), Vec<NodeId>)> = Vec::new();
    for (id, node) in graph.nodes() {
        let key = (node.recipe.id.clone(), node.building.id.clone());
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(id),
            None => groups.push((key, vec![id])),
        }
    }

    let mut removed = 0;
    for ((recipe, building), members) in groups {
        let Some((&survivor, duplicates)) = members.split_first() else {
            continue;
        };
        if duplicates.is_empty() {
            continue;
        }
        for &duplicate in duplicates {
            graph.merge_into(survivor, duplicate);
            removed += 1;
        }
        debug!(%recipe, %building, merged = duplicates.len(), "merged duplicate steps");
    }
    removed
}

/// Single forward sweep raising suppliers that fall short of demand.
///
/// Consumers are visited by ascending supplier count. For each supplier
/// edge, demand is what all of that supplier's consumers draw of the item
/// at their current count and clock. This does not iterate to a fixed
/// point: a supplier raised after its own suppliers were visited can leave
/// them short.
///
/// Returns the number of adjustments made.
pub fn balance_production_rates(graph: &mut ProductionGraph) -> usize {
    let mut order = graph.node_ids();
    order.sort_by_key(|&id| graph.node(id).map_or(0, |n| n.input_nodes().len()));

    let mut adjusted = 0;
    for consumer in order {
        let Some(node) = graph.node(consumer) else {
            continue;
        };
        let needs: Vec<String> = node.recipe.inputs.iter().map(|i| i.item.id.clone()).collect();
        let suppliers = node.input_nodes().to_vec();

        for supplier in suppliers {
            for item in &needs {
                let Some(scale) = shortfall(graph, supplier, item) else {
                    continue;
                };
                if let Some(node) = graph.node_mut(supplier) {
                    let before = node.building_count;
                    node.building_count = machine_count(before * scale);
                    debug!(
                        recipe = %node.recipe.id,
                        before,
                        after = node.building_count,
                        "raised supplier to meet demand"
                    );
                    adjusted += 1;
                }
            }
        }
    }
    adjusted
}

/// `required / supplied` when `supplier` under-delivers `item`.
fn shortfall(graph: &ProductionGraph, supplier: NodeId, item: &str) -> Option<f64> {
    let node = graph.node(supplier)?;
    let supplied = node.output_rate(item);
    if supplied <= 0.0 {
        return None;
    }
    let required: f64 = node
        .output_nodes()
        .iter()
        .filter_map(|&c| graph.node(c))
        .map(|c| c.input_rate(item))
        .sum();
    (supplied < required * (1.0 - 1e-9)).then(|| required / supplied)
}

/// Trade machines for clock speed where it saves whole machines.
///
/// At the highest permitted clock a node needs `ceil(count / clock)`
/// machines; when that is strictly fewer than today the node adopts the
/// reduced count at that clock. Throughput never drops, but the step may
/// now draw more input than balancing sized its suppliers for; the
/// analyzer reports such suppliers as bottlenecks.
///
/// Returns the number of nodes overclocked.
pub fn optimize_overclocking(graph: &mut ProductionGraph, options: &OptimizationOptions) -> usize {
    let max_clock = options.max_clock_speed();
    if !max_clock.is_finite() || max_clock <= 1.0 {
        return 0;
    }

    let mut overclocked = 0;
    for (_, node) in graph.nodes_mut() {
        if !node.building.can_overclock {
            continue;
        }
        let throughput = node.building_count * node.clock_speed;
        let current = machine_count(node.building_count);
        let reduced = machine_count(throughput / max_clock);
        if reduced >= 1.0 && reduced < current {
            node.building_count = reduced;
            node.clock_speed = max_clock;
            debug!(
                recipe = %node.recipe.id,
                from = current,
                to = reduced,
                clock = node.clock_speed,
                "overclocked step"
            );
            overclocked += 1;
        }
    }
    overclocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ProductionNode;
    use crate::models::{Building, BuildingType, Item, ItemCategory, ItemQuantity, Recipe};

    fn recipe(id: &str, input: (&str, f64), output: (&str, f64), time: f64) -> Recipe {
        let item = |id: &str| Item::new(id, id, ItemCategory::BasicPart);
        Recipe {
            id: id.into(),
            name: id.into(),
            inputs: vec![ItemQuantity::new(item(input.0), input.1)],
            outputs: vec![ItemQuantity::new(item(output.0), output.1)],
            production_time_seconds: time,
            is_alternate: false,
            compatible_buildings: vec![],
        }
    }

    fn constructor() -> Building {
        Building::new("constructor", "Constructor", BuildingType::Constructor, 4.0)
    }

    // 30 ingots/min per machine
    fn ingot(count: f64) -> ProductionNode {
        ProductionNode::new(
            recipe("iron_ingot", ("iron_ore", 1.0), ("iron_ingot", 1.0), 2.0),
            Building::new("smelter", "Smelter", BuildingType::Smelter, 4.0),
            "iron_ingot",
            count,
            30.0 * count,
        )
    }

    // 20 plates/min per machine, drawing 30 ingots/min
    fn plate(count: f64) -> ProductionNode {
        ProductionNode::new(
            recipe("iron_plate", ("iron_ingot", 3.0), ("iron_plate", 2.0), 6.0),
            constructor(),
            "iron_plate",
            count,
            20.0 * count,
        )
    }

    #[test]
    fn merge_collapses_same_recipe_and_building() {
        let mut graph = ProductionGraph::default();
        let p1 = graph.add_node(plate(2.0));
        let i1 = graph.add_node(ingot(2.0));
        let p2 = graph.add_node(plate(1.0));
        let i2 = graph.add_node(ingot(1.0));
        graph.connect(i1, p1);
        graph.connect(i2, p2);

        assert_eq!(merge_duplicate_nodes(&mut graph), 2);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node(p1).unwrap().building_count, 3.0);
        assert_eq!(graph.node(i1).unwrap().building_count, 3.0);
        assert_eq!(graph.node(p1).unwrap().input_nodes(), &[i1]);
        assert!(graph.edges_consistent());
    }

    #[test]
    fn merge_is_idempotent() {
        let mut graph = ProductionGraph::default();
        graph.add_node(ingot(1.0));
        graph.add_node(ingot(2.0));
        merge_duplicate_nodes(&mut graph);
        let counts: Vec<f64> = graph.nodes().map(|(_, n)| n.building_count).collect();
        assert_eq!(merge_duplicate_nodes(&mut graph), 0);
        let again: Vec<f64> = graph.nodes().map(|(_, n)| n.building_count).collect();
        assert_eq!(counts, again);
    }

    #[test]
    fn different_buildings_are_not_merged() {
        let mut graph = ProductionGraph::default();
        graph.add_node(ingot(1.0));
        let mut foundry_ingot = ingot(1.0);
        foundry_ingot.building = Building::new("foundry", "Foundry", BuildingType::Foundry, 16.0);
        graph.add_node(foundry_ingot);
        assert_eq!(merge_duplicate_nodes(&mut graph), 0);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn balance_raises_short_supplier() {
        let mut graph = ProductionGraph::default();
        let i = graph.add_node(ingot(1.0));
        let p = graph.add_node(plate(3.0));
        graph.connect(i, p);

        // 3 plate machines draw 90 ingots/min; 1 smelter makes 30.
        assert_eq!(balance_production_rates(&mut graph), 1);
        assert_eq!(graph.node(i).unwrap().building_count, 3.0);
        assert_eq!(balance_production_rates(&mut graph), 0);
    }

    #[test]
    fn balance_leaves_sufficient_supplier_alone() {
        let mut graph = ProductionGraph::default();
        let i = graph.add_node(ingot(4.0));
        let p = graph.add_node(plate(3.0));
        graph.connect(i, p);
        assert_eq!(balance_production_rates(&mut graph), 0);
        assert_eq!(graph.node(i).unwrap().building_count, 4.0);
    }

    #[test]
    fn overclock_only_when_it_saves_machines() {
        let mut graph = ProductionGraph::default();
        let one = graph.add_node(ingot(1.0));
        let five = graph.add_node(plate(5.0));

        assert_eq!(optimize_overclocking(&mut graph, &OptimizationOptions::default()), 1);
        assert_eq!(graph.node(one).unwrap().clock_speed, 1.0);
        let node = graph.node(five).unwrap();
        assert_eq!(node.building_count, 2.0);
        assert_eq!(node.clock_speed, 2.5);
        assert!((node.actual_production_rate() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn overclock_runs_at_the_highest_clock() {
        let mut graph = ProductionGraph::default();
        let id = graph.add_node(plate(3.0));
        optimize_overclocking(&mut graph, &OptimizationOptions::default());
        let node = graph.node(id).unwrap();
        assert_eq!(node.building_count, 2.0);
        assert_eq!(node.clock_speed, 2.5);
        // 2 machines at 250% outrun the 60/min the step was sized for.
        assert!((node.actual_production_rate() - 100.0).abs() < 1e-9);
        assert!(node.actual_production_rate() >= node.target_rate);
        assert!((node.total_power_consumption() - 4.0 * 2.0 * 2.5f64.powf(1.6)).abs() < 1e-9);

        let mut graph = ProductionGraph::default();
        let id = graph.add_node(plate(3.0));
        let capped = OptimizationOptions {
            max_overclock_percentage: 200.0,
            ..OptimizationOptions::default()
        };
        assert_eq!(optimize_overclocking(&mut graph, &capped), 1);
        assert_eq!(graph.node(id).unwrap().building_count, 2.0);
        assert_eq!(graph.node(id).unwrap().clock_speed, 2.0);
    }

    #[test]
    fn overclock_respects_building_and_cap() {
        let mut graph = ProductionGraph::default();
        let mut locked = plate(5.0);
        locked.building.can_overclock = false;
        let id = graph.add_node(locked);
        optimize_overclocking(&mut graph, &OptimizationOptions::default());
        assert_eq!(graph.node(id).unwrap().clock_speed, 1.0);

        let mut graph = ProductionGraph::default();
        let id = graph.add_node(plate(4.0));
        let capped = OptimizationOptions {
            max_overclock_percentage: 100.0,
            ..OptimizationOptions::default()
        };
        assert_eq!(optimize_overclocking(&mut graph, &capped), 0);
        assert_eq!(graph.node(id).unwrap().building_count, 4.0);
    }

    #[test]
    fn optimize_skips_overclock_when_disabled() {
        let mut graph = ProductionGraph::default();
        let id = graph.add_node(plate(5.0));
        let options = OptimizationOptions {
            allow_overclocking: false,
            ..OptimizationOptions::default()
        };
        optimize(&mut graph, &options);
        assert_eq!(graph.node(id).unwrap().clock_speed, 1.0);
        assert_eq!(graph.node(id).unwrap().building_count, 5.0);
    }
}
