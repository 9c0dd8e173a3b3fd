//! Data models for Satisfactory items, recipes and buildings

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Broad grouping used by the catalog and the item listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemCategory {
    RawResource,
    Ingot,
    BasicPart,
    IntermediatePart,
    AdvancedPart,
    Fuel,
    Liquid,
    SpaceElevator,
    Equipment,
    #[default]
    Other,
}

impl ItemCategory {
    /// Parse a category tag, falling back to `Other` for unknown tags.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "RawResource" => Self::RawResource,
            "Ingot" => Self::Ingot,
            "BasicPart" => Self::BasicPart,
            "IntermediatePart" => Self::IntermediatePart,
            "AdvancedPart" => Self::AdvancedPart,
            "Fuel" => Self::Fuel,
            "Liquid" => Self::Liquid,
            "SpaceElevator" => Self::SpaceElevator,
            "Equipment" => Self::Equipment,
            _ => Self::Other,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::RawResource => "RawResource",
            Self::Ingot => "Ingot",
            Self::BasicPart => "BasicPart",
            Self::IntermediatePart => "IntermediatePart",
            Self::AdvancedPart => "AdvancedPart",
            Self::Fuel => "Fuel",
            Self::Liquid => "Liquid",
            Self::SpaceElevator => "SpaceElevator",
            Self::Equipment => "Equipment",
            Self::Other => "Other",
        }
    }
}

/// An item that can be extracted, produced or consumed.
///
/// Equality and hashing use `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: ItemCategory,
    /// Extractable with no recipe (ores, water, ...)
    pub is_raw_resource: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: ItemCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_raw_resource: category == ItemCategory::RawResource,
            category,
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An item paired with a quantity.
///
/// Inside a `Recipe` the quantity is per cycle; everywhere else in the
/// planner it is per minute. Convert with [`Recipe::per_minute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemQuantity {
    pub item: Item,
    pub quantity: f64,
}

impl ItemQuantity {
    pub fn new(item: Item, quantity: f64) -> Self {
        Self { item, quantity }
    }
}

impl fmt::Display for ItemQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x {}", self.quantity, self.item.name)
    }
}

/// A fixed input -> output conversion with a cycle time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub inputs: Vec<ItemQuantity>,
    pub outputs: Vec<ItemQuantity>,
    /// Cycle time for the listed quantities
    pub production_time_seconds: f64,
    pub is_alternate: bool,
    pub compatible_buildings: Vec<String>,
}

impl Recipe {
    /// Convert a per-cycle quantity into a per-minute rate for one machine
    /// at baseline speed.
    pub fn per_minute(&self, quantity_per_cycle: f64) -> f64 {
        if self.production_time_seconds <= 0.0 {
            return 0.0;
        }
        quantity_per_cycle * 60.0 / self.production_time_seconds
    }

    pub fn output_quantity(&self, item_id: &str) -> Option<f64> {
        self.outputs
            .iter()
            .find(|o| o.item.id == item_id)
            .map(|o| o.quantity)
    }

    pub fn input_quantity(&self, item_id: &str) -> Option<f64> {
        self.inputs
            .iter()
            .find(|i| i.item.id == item_id)
            .map(|i| i.quantity)
    }

    pub fn produces(&self, item_id: &str) -> bool {
        self.outputs.iter().any(|o| o.item.id == item_id)
    }

    pub fn consumes(&self, item_id: &str) -> bool {
        self.inputs.iter().any(|i| i.item.id == item_id)
    }

    pub fn total_inputs(&self) -> f64 {
        self.inputs.iter().map(|i| i.quantity).sum()
    }

    pub fn total_outputs(&self) -> f64 {
        self.outputs.iter().map(|o| o.quantity).sum()
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Recipe {}

impl Hash for Recipe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BuildingType {
    Extractor,
    Smelter,
    Foundry,
    Constructor,
    Assembler,
    Manufacturer,
    Refinery,
    Packager,
    Blender,
    #[default]
    Other,
}

impl BuildingType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Extractor" => Self::Extractor,
            "Smelter" => Self::Smelter,
            "Foundry" => Self::Foundry,
            "Constructor" => Self::Constructor,
            "Assembler" => Self::Assembler,
            "Manufacturer" => Self::Manufacturer,
            "Refinery" => Self::Refinery,
            "Packager" => Self::Packager,
            "Blender" => Self::Blender,
            _ => Self::Other,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Extractor => "Extractor",
            Self::Smelter => "Smelter",
            Self::Foundry => "Foundry",
            Self::Constructor => "Constructor",
            Self::Assembler => "Assembler",
            Self::Manufacturer => "Manufacturer",
            Self::Refinery => "Refinery",
            Self::Packager => "Packager",
            Self::Blender => "Blender",
            Self::Other => "Other",
        }
    }
}

/// A machine type that runs recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
    pub building_type: BuildingType,
    /// Throughput multiplier, 1.0 = baseline
    pub production_speed: f64,
    /// MW at 100% clock
    pub power_consumption: f64,
    pub can_overclock: bool,
    pub max_input_connections: u32,
    pub max_output_connections: u32,
}

impl Building {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        building_type: BuildingType,
        power_consumption: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            building_type,
            production_speed: 1.0,
            power_consumption,
            can_overclock: true,
            max_input_connections: 1,
            max_output_connections: 1,
        }
    }

    pub fn is_extractor(&self) -> bool {
        self.building_type == BuildingType::Extractor
    }
}

impl PartialEq for Building {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Building {}

impl Hash for Building {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Building {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A research milestone and the content it unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub tier: u32,
    pub unlocked_recipes: Vec<String>,
    pub unlocked_buildings: Vec<String>,
}
