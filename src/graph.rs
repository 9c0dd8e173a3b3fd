//! Production graph: an arena of production steps wired by id
//!
//! Nodes live in a `SlotMap`; edges are `NodeId` adjacency lists kept on
//! both ends. Merging and removal are index bookkeeping, and a node that
//! lists a supplier as input is always listed as that supplier's output.

use std::collections::{HashMap, VecDeque};

use slotmap::{SlotMap, new_key_type};

use crate::models::{Building, Item, ItemQuantity, Recipe};

new_key_type! {
    /// Identifies a production step in a [`ProductionGraph`].
    pub struct NodeId;
}

/// Round a continuous machine requirement up to whole machines.
///
/// Values within 1e-9 of an integer snap to it, so 3.0000000000004
/// machines is three machines rather than four.
pub fn machine_count(required: f64) -> f64 {
    if !required.is_finite() || required <= 0.0 {
        return 0.0;
    }
    let nearest = required.round();
    if (required - nearest).abs() < 1e-9 {
        nearest
    } else {
        required.ceil()
    }
}

/// One step: `recipe` running on `building_count` copies of `building`.
#[derive(Debug, Clone)]
pub struct ProductionNode {
    pub recipe: Recipe,
    pub building: Building,
    /// Item this step was created to produce.
    pub output_item: String,
    pub building_count: f64,
    /// 1.0 = 100%
    pub clock_speed: f64,
    /// Demand (per minute) for `output_item` this step was sized for.
    pub target_rate: f64,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
}

impl ProductionNode {
    pub fn new(
        recipe: Recipe,
        building: Building,
        output_item: impl Into<String>,
        building_count: f64,
        target_rate: f64,
    ) -> Self {
        Self {
            recipe,
            building,
            output_item: output_item.into(),
            building_count,
            clock_speed: 1.0,
            target_rate,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Suppliers feeding this step.
    pub fn input_nodes(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Consumers fed by this step.
    pub fn output_nodes(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Per-minute rate of one machine for a per-cycle quantity at the
    /// current clock.
    fn per_machine(&self, quantity_per_cycle: f64) -> f64 {
        self.recipe.per_minute(quantity_per_cycle) * self.building.production_speed * self.clock_speed
    }

    /// Per-minute output of `item_id` across all machines.
    pub fn output_rate(&self, item_id: &str) -> f64 {
        self.recipe
            .output_quantity(item_id)
            .map_or(0.0, |q| self.per_machine(q) * self.building_count)
    }

    /// Per-minute consumption of `item_id` across all machines.
    pub fn input_rate(&self, item_id: &str) -> f64 {
        self.recipe
            .input_quantity(item_id)
            .map_or(0.0, |q| self.per_machine(q) * self.building_count)
    }

    pub fn actual_production_rate(&self) -> f64 {
        self.output_rate(&self.output_item)
    }

    /// MW drawn by every machine of this step; power scales with clock^1.6.
    pub fn total_power_consumption(&self) -> f64 {
        self.building.power_consumption * self.building_count * self.clock_speed.powf(1.6)
    }

    /// A synthesized raw-resource extraction step.
    pub fn is_extraction(&self) -> bool {
        self.recipe.inputs.is_empty() && self.building.is_extractor()
    }
}

/// The owning collection of production steps for one planning request.
#[derive(Debug, Clone, Default)]
pub struct ProductionGraph {
    nodes: SlotMap<NodeId, ProductionNode>,
    targets: Vec<ItemQuantity>,
}

impl ProductionGraph {
    pub fn new(targets: Vec<ItemQuantity>) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            targets,
        }
    }

    /// Requested outputs, rates per minute.
    pub fn targets(&self) -> &[ItemQuantity] {
        &self.targets
    }

    pub fn add_node(&mut self, node: ProductionNode) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&ProductionNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ProductionNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ProductionNode)> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut ProductionNode)> {
        self.nodes.iter_mut()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Wire `supplier` as an input of `consumer`. Duplicate edges and
    /// self-loops are ignored.
    pub fn connect(&mut self, supplier: NodeId, consumer: NodeId) {
        if supplier == consumer || !self.contains(supplier) || !self.contains(consumer) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(consumer) {
            if !node.inputs.contains(&supplier) {
                node.inputs.push(supplier);
            }
        }
        if let Some(node) = self.nodes.get_mut(supplier) {
            if !node.outputs.contains(&consumer) {
                node.outputs.push(consumer);
            }
        }
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<ProductionNode> {
        let node = self.nodes.remove(id)?;
        for &supplier in &node.inputs {
            if let Some(s) = self.nodes.get_mut(supplier) {
                s.outputs.retain(|&n| n != id);
            }
        }
        for &consumer in &node.outputs {
            if let Some(c) = self.nodes.get_mut(consumer) {
                c.inputs.retain(|&n| n != id);
            }
        }
        Some(node)
    }

    /// Fold `duplicate` into `survivor`: machine counts and demand add up,
    /// and every edge of the duplicate is moved onto the survivor.
    pub fn merge_into(&mut self, survivor: NodeId, duplicate: NodeId) {
        if survivor == duplicate || !self.contains(survivor) {
            return;
        }
        let Some(removed) = self.remove_node(duplicate) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(survivor) {
            node.building_count += removed.building_count;
            node.target_rate += removed.target_rate;
        }
        for supplier in removed.inputs {
            self.connect(supplier, survivor);
        }
        for consumer in removed.outputs {
            self.connect(survivor, consumer);
        }
    }

    /// Nodes with no suppliers.
    pub fn root_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.inputs.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Nodes nothing consumes from: the plan's deliverables.
    pub fn leaf_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.outputs.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Raw resources the plan draws, per minute, in first-seen order.
    ///
    /// Counts every raw-resource recipe input plus the demand served by
    /// extraction steps.
    pub fn required_resources(&self) -> Vec<ItemQuantity> {
        let mut totals: Vec<(Item, f64)> = Vec::new();
        let mut add = |item: &Item, rate: f64| match totals.iter_mut().find(|(i, _)| i == item) {
            Some((_, total)) => *total += rate,
            None => totals.push((item.clone(), rate)),
        };

        for node in self.nodes.values() {
            if node.is_extraction() {
                if let Some(output) = node.recipe.outputs.first() {
                    add(&output.item, node.target_rate);
                }
                continue;
            }
            for input in node.recipe.inputs.iter().filter(|i| i.item.is_raw_resource) {
                add(&input.item, node.input_rate(&input.item.id));
            }
        }

        totals
            .into_iter()
            .map(|(item, rate)| ItemQuantity::new(item, rate))
            .collect()
    }

    pub fn total_power_consumption(&self) -> f64 {
        self.nodes.values().map(ProductionNode::total_power_consumption).sum()
    }

    /// Whole machines across the plan.
    pub fn total_buildings(&self) -> u32 {
        self.nodes
            .values()
            .map(|n| machine_count(n.building_count) as u32)
            .sum()
    }

    /// Every edge is recorded on both of its ends.
    pub fn edges_consistent(&self) -> bool {
        self.nodes.iter().all(|(id, node)| {
            node.inputs.iter().all(|&s| {
                self.nodes.get(s).is_some_and(|sup| sup.outputs.contains(&id))
            }) && node.outputs.iter().all(|&c| {
                self.nodes.get(c).is_some_and(|con| con.inputs.contains(&id))
            })
        })
    }

    /// Suppliers before consumers, or `None` if the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let mut in_degree: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .map(|(id, n)| (id, n.inputs.len()))
            .collect();
        let mut queue: VecDeque<NodeId> = self
            .nodes
            .keys()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &consumer in &self.nodes[id].outputs {
                if let Some(degree) = in_degree.get_mut(&consumer) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(consumer);
                    }
                }
            }
        }

        (order.len() == self.nodes.len()).then_some(order)
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_some()
    }
}
