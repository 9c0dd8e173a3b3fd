//! Built-in early-game catalog
//!
//! Enough of the iron and copper tree to plan reinforced plates, rotors,
//! modular frames and smart plating without importing game data.

use crate::catalog::{Catalog, ItemCatalog};
use crate::models::{Building, BuildingType, Item, ItemCategory, ItemQuantity, Milestone, Recipe};

const ITEMS: &[(&str, &str, ItemCategory)] = &[
    ("iron_ore", "Iron Ore", ItemCategory::RawResource),
    ("copper_ore", "Copper Ore", ItemCategory::RawResource),
    ("limestone", "Limestone", ItemCategory::RawResource),
    ("coal", "Coal", ItemCategory::RawResource),
    ("iron_ingot", "Iron Ingot", ItemCategory::Ingot),
    ("copper_ingot", "Copper Ingot", ItemCategory::Ingot),
    ("iron_plate", "Iron Plate", ItemCategory::BasicPart),
    ("iron_rod", "Iron Rod", ItemCategory::BasicPart),
    ("screw", "Screw", ItemCategory::BasicPart),
    ("wire", "Wire", ItemCategory::BasicPart),
    ("cable", "Cable", ItemCategory::BasicPart),
    ("concrete", "Concrete", ItemCategory::BasicPart),
    ("copper_sheet", "Copper Sheet", ItemCategory::BasicPart),
    ("reinforced_iron_plate", "Reinforced Iron Plate", ItemCategory::IntermediatePart),
    ("rotor", "Rotor", ItemCategory::IntermediatePart),
    ("modular_frame", "Modular Frame", ItemCategory::IntermediatePart),
    ("smart_plating", "Smart Plating", ItemCategory::SpaceElevator),
];

struct RecipeDef {
    id: &'static str,
    name: &'static str,
    inputs: &'static [(&'static str, f64)],
    outputs: &'static [(&'static str, f64)],
    seconds: f64,
    alternate: bool,
    building: &'static str,
}

const fn standard(
    id: &'static str,
    name: &'static str,
    inputs: &'static [(&'static str, f64)],
    outputs: &'static [(&'static str, f64)],
    seconds: f64,
    building: &'static str,
) -> RecipeDef {
    RecipeDef { id, name, inputs, outputs, seconds, alternate: false, building }
}

const fn alternate(
    id: &'static str,
    name: &'static str,
    inputs: &'static [(&'static str, f64)],
    outputs: &'static [(&'static str, f64)],
    seconds: f64,
    building: &'static str,
) -> RecipeDef {
    RecipeDef { id, name, inputs, outputs, seconds, alternate: true, building }
}

const RECIPES: &[RecipeDef] = &[
    standard("iron_ingot", "Iron Ingot", &[("iron_ore", 1.0)], &[("iron_ingot", 1.0)], 2.0, "smelter"),
    standard("copper_ingot", "Copper Ingot", &[("copper_ore", 1.0)], &[("copper_ingot", 1.0)], 2.0, "smelter"),
    standard("iron_plate", "Iron Plate", &[("iron_ingot", 3.0)], &[("iron_plate", 2.0)], 6.0, "constructor"),
    standard("iron_rod", "Iron Rod", &[("iron_ingot", 1.0)], &[("iron_rod", 1.0)], 4.0, "constructor"),
    standard("screw", "Screw", &[("iron_rod", 1.0)], &[("screw", 4.0)], 6.0, "constructor"),
    standard("wire", "Wire", &[("copper_ingot", 1.0)], &[("wire", 2.0)], 4.0, "constructor"),
    standard("cable", "Cable", &[("wire", 2.0)], &[("cable", 1.0)], 2.0, "constructor"),
    standard("concrete", "Concrete", &[("limestone", 3.0)], &[("concrete", 1.0)], 4.0, "constructor"),
    standard("copper_sheet", "Copper Sheet", &[("copper_ingot", 2.0)], &[("copper_sheet", 1.0)], 6.0, "constructor"),
    standard(
        "reinforced_iron_plate",
        "Reinforced Iron Plate",
        &[("iron_plate", 6.0), ("screw", 12.0)],
        &[("reinforced_iron_plate", 1.0)],
        12.0,
        "assembler",
    ),
    standard("rotor", "Rotor", &[("iron_rod", 5.0), ("screw", 25.0)], &[("rotor", 1.0)], 15.0, "assembler"),
    standard(
        "modular_frame",
        "Modular Frame",
        &[("reinforced_iron_plate", 3.0), ("iron_rod", 12.0)],
        &[("modular_frame", 2.0)],
        60.0,
        "assembler",
    ),
    standard(
        "smart_plating",
        "Smart Plating",
        &[("reinforced_iron_plate", 1.0), ("rotor", 1.0)],
        &[("smart_plating", 1.0)],
        30.0,
        "assembler",
    ),
    alternate("cast_screw", "Alternate: Cast Screw", &[("iron_ingot", 5.0)], &[("screw", 20.0)], 24.0, "constructor"),
    alternate("iron_wire", "Alternate: Iron Wire", &[("iron_ingot", 5.0)], &[("wire", 9.0)], 24.0, "constructor"),
    alternate(
        "bolted_iron_plate",
        "Alternate: Bolted Iron Plate",
        &[("iron_plate", 18.0), ("screw", 50.0)],
        &[("reinforced_iron_plate", 3.0)],
        12.0,
        "assembler",
    ),
    alternate(
        "stitched_iron_plate",
        "Alternate: Stitched Iron Plate",
        &[("iron_plate", 10.0), ("wire", 20.0)],
        &[("reinforced_iron_plate", 3.0)],
        32.0,
        "assembler",
    ),
];

fn buildings() -> Vec<Building> {
    let mut miner_mk2 = Building::new("miner_mk2", "Miner Mk.2", BuildingType::Extractor, 12.0);
    miner_mk2.production_speed = 2.0;

    let mut assembler = Building::new("assembler", "Assembler", BuildingType::Assembler, 15.0);
    assembler.max_input_connections = 2;

    vec![
        Building::new("miner_mk1", "Miner Mk.1", BuildingType::Extractor, 5.0),
        miner_mk2,
        Building::new("smelter", "Smelter", BuildingType::Smelter, 4.0),
        Building::new("constructor", "Constructor", BuildingType::Constructor, 4.0),
        assembler,
    ]
}

fn milestone(id: &str, name: &str, tier: u32, recipes: &[&str], buildings: &[&str]) -> Milestone {
    Milestone {
        id: id.to_string(),
        name: name.to_string(),
        tier,
        unlocked_recipes: recipes.iter().map(|r| r.to_string()).collect(),
        unlocked_buildings: buildings.iter().map(|b| b.to_string()).collect(),
    }
}

fn milestones() -> Vec<Milestone> {
    vec![
        milestone(
            "onboarding",
            "Onboarding",
            0,
            &["iron_ingot", "iron_plate", "iron_rod"],
            &["smelter", "constructor", "miner_mk1"],
        ),
        milestone("hub_upgrade_2", "HUB Upgrade 2", 0, &["copper_ingot", "wire", "cable"], &[]),
        milestone("hub_upgrade_3", "HUB Upgrade 3", 0, &["concrete", "screw"], &[]),
        milestone(
            "part_assembly",
            "Part Assembly",
            2,
            &["reinforced_iron_plate", "copper_sheet", "rotor", "modular_frame", "smart_plating"],
            &["assembler"],
        ),
        milestone("advanced_extraction", "Advanced Extraction", 4, &[], &["miner_mk2"]),
    ]
}

/// The built-in catalog, in a fixed order.
pub fn sample_catalog() -> Catalog {
    let mut catalog = Catalog::new();

    for &(id, name, category) in ITEMS {
        catalog.add_item(Item::new(id, name, category));
    }
    for building in buildings() {
        catalog.add_building(building);
    }

    for def in RECIPES {
        // Every id in RECIPES is listed in ITEMS.
        let quantities = |list: &[(&str, f64)]| {
            list.iter()
                .filter_map(|&(id, quantity)| catalog.get(id).map(|item| ItemQuantity::new(item, quantity)))
                .collect::<Vec<_>>()
        };
        let recipe = Recipe {
            id: def.id.to_string(),
            name: def.name.to_string(),
            inputs: quantities(def.inputs),
            outputs: quantities(def.outputs),
            production_time_seconds: def.seconds,
            is_alternate: def.alternate,
            compatible_buildings: vec![def.building.to_string()],
        };
        catalog.add_recipe(recipe);
    }

    for milestone in milestones() {
        catalog.add_milestone(milestone);
    }

    catalog
}
