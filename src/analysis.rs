//! Read-only reporting over a finished production graph

use std::fmt;

use serde::Serialize;

use crate::graph::{NodeId, ProductionGraph, ProductionNode};
use crate::models::ItemQuantity;

/// Supply may fall this far short of downstream demand before a step is
/// reported as a bottleneck.
pub const BOTTLENECK_TOLERANCE: f64 = 0.02;

/// Steps clocked below this are reported as underclocked.
const UNDERCLOCK_THRESHOLD: f64 = 0.8;

/// A single step drawing more than this many MW is reported.
const HIGH_POWER_MW: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct ProductionAnalysis {
    pub total_buildings: u32,
    /// MW
    pub total_power: f64,
    pub required_resources: Vec<ItemQuantity>,
    pub bottleneck_nodes: Vec<NodeId>,
    pub efficiency_score: f64,
    pub suggestions: Vec<String>,
}

pub fn analyze(graph: &ProductionGraph) -> ProductionAnalysis {
    let bottleneck_nodes = find_bottlenecks(graph);
    let suggestions = suggestions(graph, &bottleneck_nodes);
    ProductionAnalysis {
        total_buildings: graph.total_buildings(),
        total_power: graph.total_power_consumption(),
        required_resources: graph.required_resources(),
        efficiency_score: efficiency_score(graph),
        bottleneck_nodes,
        suggestions,
    }
}

/// Steps whose output of some item undershoots what their consumers draw
/// by more than [`BOTTLENECK_TOLERANCE`].
pub fn find_bottlenecks(graph: &ProductionGraph) -> Vec<NodeId> {
    graph
        .nodes()
        .filter(|(_, node)| is_bottleneck(graph, node))
        .map(|(id, _)| id)
        .collect()
}

fn is_bottleneck(graph: &ProductionGraph, node: &ProductionNode) -> bool {
    node.recipe.outputs.iter().any(|output| {
        let item = output.item.id.as_str();
        let demand: f64 = node
            .output_nodes()
            .iter()
            .filter_map(|&c| graph.node(c))
            .map(|c| c.input_rate(item))
            .sum();
        demand > 0.0 && node.output_rate(item) < demand * (1.0 - BOTTLENECK_TOLERANCE)
    })
}

/// Delivered output per MW, discounted 1% per step and floored at zero.
pub fn efficiency_score(graph: &ProductionGraph) -> f64 {
    let output: f64 = graph
        .leaf_nodes()
        .into_iter()
        .filter_map(|id| graph.node(id))
        .map(ProductionNode::actual_production_rate)
        .sum();
    let power = graph.total_power_consumption();
    if output <= 0.0 || power <= 0.0 {
        return 0.0;
    }
    let complexity_penalty = 1.0 - 0.01 * graph.len() as f64;
    (output / power * complexity_penalty).max(0.0)
}

fn suggestions(graph: &ProductionGraph, bottlenecks: &[NodeId]) -> Vec<String> {
    let mut suggestions = Vec::new();

    if !bottlenecks.is_empty() {
        let names: Vec<&str> = bottlenecks
            .iter()
            .filter_map(|&id| graph.node(id))
            .map(|n| n.recipe.name.as_str())
            .collect();
        suggestions.push(format!(
            "Consider increasing production or overclocking for: {}",
            names.join(", ")
        ));
    }
    if graph.nodes().any(|(_, n)| n.clock_speed < UNDERCLOCK_THRESHOLD) {
        suggestions.push(
            "Some machines are underclocked. Consider reducing machine count and increasing clock speed."
                .to_string(),
        );
    }
    if graph.nodes().any(|(_, n)| n.total_power_consumption() > HIGH_POWER_MW) {
        suggestions
            .push("High power consumption detected. Consider power generation capacity.".to_string());
    }

    suggestions
}

/// Render the graph as an indented tree, deliverables first, each step
/// followed by the steps feeding it.
pub fn format_production_graph(graph: &ProductionGraph) -> String {
    let mut output = String::new();
    let mut path = Vec::new();
    for id in graph.leaf_nodes() {
        format_node(graph, id, 0, &mut path, &mut output);
    }
    output
}

fn format_node(
    graph: &ProductionGraph,
    id: NodeId,
    indent: usize,
    path: &mut Vec<NodeId>,
    output: &mut String,
) {
    let Some(node) = graph.node(id) else {
        return;
    };
    let prefix = "  ".repeat(indent);

    if path.contains(&id) {
        output.push_str(&format!("{}(loops back to {})\n", prefix, node.recipe.name));
        return;
    }

    let clock = if (node.clock_speed - 1.0).abs() > 1e-9 {
        format!(" @ {:.0}%", node.clock_speed * 100.0)
    } else {
        String::new()
    };
    output.push_str(&format!(
        "{}{}x {}{} [{}] -> {} @ {:.2}/min ({:.1} MW)\n",
        prefix,
        node.building_count,
        node.building.name,
        clock,
        node.recipe.name,
        node.output_item,
        node.actual_production_rate(),
        node.total_power_consumption()
    ));

    for input in &node.recipe.inputs {
        let rate = node.input_rate(&input.item.id);
        if input.item.is_raw_resource {
            output.push_str(&format!(
                "{}  needs {} @ {:.2}/min (raw input)\n",
                prefix, input.item.id, rate
            ));
            continue;
        }
        output.push_str(&format!("{}  needs {} @ {:.2}/min\n", prefix, input.item.id, rate));

        path.push(id);
        let suppliers: Vec<NodeId> = node
            .input_nodes()
            .iter()
            .copied()
            .filter(|&s| graph.node(s).is_some_and(|n| n.recipe.produces(&input.item.id)))
            .collect();
        for supplier in suppliers {
            format_node(graph, supplier, indent + 2, path, output);
        }
        path.pop();
    }
}

impl fmt::Display for ProductionAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(f, "Buildings: {}", self.total_buildings)?;
        writeln!(f, "Power:     {:.1} MW", self.total_power)?;
        writeln!(f, "Efficiency score: {:.3}", self.efficiency_score)?;
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for resource in &self.required_resources {
            writeln!(f, "  {} @ {:.2}/min", resource.item.name, resource.quantity)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Suggestions:")?;
            for suggestion in &self.suggestions {
                writeln!(f, "  - {}", suggestion)?;
            }
        }

        Ok(())
    }
}

/// Serializable snapshot of a plan and its analysis, for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub targets: Vec<RateReport>,
    pub nodes: Vec<NodeReport>,
    pub total_buildings: u32,
    pub total_power_mw: f64,
    pub required_resources: Vec<RateReport>,
    pub bottlenecks: Vec<String>,
    pub efficiency_score: f64,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateReport {
    pub item: String,
    pub rate_per_minute: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub recipe: String,
    pub building: String,
    pub output_item: String,
    pub building_count: f64,
    pub clock_speed: f64,
    pub target_rate: f64,
    pub actual_rate: f64,
    pub power_mw: f64,
    /// Recipes of the steps feeding this one.
    pub fed_by: Vec<String>,
}

impl PlanReport {
    pub fn new(graph: &ProductionGraph, analysis: &ProductionAnalysis) -> Self {
        let rates = |quantities: &[ItemQuantity]| {
            quantities
                .iter()
                .map(|q| RateReport {
                    item: q.item.id.clone(),
                    rate_per_minute: q.quantity,
                })
                .collect::<Vec<_>>()
        };
        let recipe_of = |id: &NodeId| graph.node(*id).map(|n| n.recipe.id.clone());

        Self {
            targets: rates(graph.targets()),
            nodes: graph
                .nodes()
                .map(|(_, node)| NodeReport {
                    recipe: node.recipe.id.clone(),
                    building: node.building.id.clone(),
                    output_item: node.output_item.clone(),
                    building_count: node.building_count,
                    clock_speed: node.clock_speed,
                    target_rate: node.target_rate,
                    actual_rate: node.actual_production_rate(),
                    power_mw: node.total_power_consumption(),
                    fed_by: node.input_nodes().iter().filter_map(recipe_of).collect(),
                })
                .collect(),
            total_buildings: analysis.total_buildings,
            total_power_mw: analysis.total_power,
            required_resources: rates(&analysis.required_resources),
            bottlenecks: analysis.bottleneck_nodes.iter().filter_map(recipe_of).collect(),
            efficiency_score: analysis.efficiency_score,
            suggestions: analysis.suggestions.clone(),
        }
    }
}
