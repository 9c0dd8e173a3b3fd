//! Game data import from JSON files
//!
//! Walks a directory for `*.json` files shaped like the game-data export
//! (`items`, `recipes`, `machines`, `milestones`), checks every reference
//! and writes what resolves into the catalog store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::{Catalog, ItemCatalog};
use crate::db;
use crate::models::{Building, BuildingType, Item, ItemCategory, ItemQuantity, Milestone, Recipe};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameData {
    pub items: Vec<ItemDto>,
    pub recipes: Vec<RecipeDto>,
    pub milestones: Vec<MilestoneDto>,
    #[serde(alias = "buildings")]
    pub machines: Vec<MachineDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemDto {
    pub id: String,
    pub name: String,
    pub category: String,
    pub is_raw_resource: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuantityDto {
    pub item_id: String,
    pub quantity: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecipeDto {
    pub id: String,
    pub name: String,
    pub inputs: Vec<QuantityDto>,
    pub outputs: Vec<QuantityDto>,
    pub production_time_seconds: f64,
    #[serde(alias = "compatibleBuildingIds")]
    pub compatible_machine_ids: Vec<String>,
    pub is_alternate: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MilestoneDto {
    pub id: String,
    pub name: String,
    pub tier: u32,
    pub unlocked_recipe_ids: Vec<String>,
    #[serde(alias = "unlockedBuildingIds")]
    pub unlocked_machine_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MachineDto {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub building_type: String,
    pub production_speed: f64,
    pub power_consumption: f64,
    pub max_input_connections: u32,
    pub max_output_connections: u32,
    pub can_overclock: bool,
}

impl Default for MachineDto {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            building_type: String::new(),
            production_speed: 1.0,
            power_consumption: 0.0,
            max_input_connections: 1,
            max_output_connections: 1,
            can_overclock: true,
        }
    }
}

/// Parse one game-data document. Whole-line `//` comments are allowed.
pub fn parse_game_data(content: &str) -> Result<GameData> {
    let comment_re = Regex::new(r"(?m)^\s*//.*$")?;
    let stripped = comment_re.replace_all(content, "");
    let data = serde_json::from_str(&stripped)?;
    Ok(data)
}

/// Find all `*.json` files under `dir`, sorted by path
pub fn find_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Import every data file under `dir` into the catalog store.
///
/// References are checked against what is already stored plus everything
/// in the files, so items may live in one file and recipes in another.
/// A file that fails to parse, or a record with a dangling reference, is
/// counted as an error and skipped; the rest still goes in.
pub fn import_directory(conn: &mut Connection, dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let mut documents = Vec::new();

    for path in find_data_files(dir)? {
        let parsed = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|content| parse_game_data(&content));
        match parsed {
            Ok(data) => {
                debug!(file = %path.display(), items = data.items.len(), recipes = data.recipes.len(), "parsed game data");
                stats.files += 1;
                documents.push(data);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to parse game data");
                stats.errors += 1;
            }
        }
    }

    let tx = conn.transaction()?;
    let mut catalog = db::load_catalog(&tx)?;
    import_documents(&tx, &mut catalog, documents, &mut stats)?;
    tx.commit()?;

    info!(%stats, "import finished");
    Ok(stats)
}

fn import_documents(
    conn: &Connection,
    catalog: &mut Catalog,
    documents: Vec<GameData>,
    stats: &mut ImportStats,
) -> Result<()> {
    let mut recipes = Vec::new();
    let mut milestones = Vec::new();

    // Items and buildings first so recipes in any file can refer to them.
    for data in documents {
        for dto in data.items {
            if dto.id.is_empty() {
                stats.skipped += 1;
                continue;
            }
            let item = item_from_dto(dto);
            db::upsert_item(conn, &item)?;
            catalog.add_item(item);
            stats.items += 1;
        }
        for dto in data.machines {
            if dto.id.is_empty() {
                stats.skipped += 1;
                continue;
            }
            let building = building_from_dto(dto);
            db::upsert_building(conn, &building)?;
            catalog.add_building(building);
            stats.buildings += 1;
        }
        recipes.extend(data.recipes);
        milestones.extend(data.milestones);
    }

    for dto in recipes {
        match recipe_from_dto(catalog, dto) {
            Ok(recipe) => {
                db::upsert_recipe(conn, &recipe)?;
                catalog.add_recipe(recipe);
                stats.recipes += 1;
            }
            Err(reason) => {
                warn!(%reason, "skipping recipe");
                stats.errors += 1;
            }
        }
    }

    for dto in milestones {
        let mut milestone = Milestone {
            id: dto.id,
            name: dto.name,
            tier: dto.tier,
            unlocked_recipes: Vec::new(),
            unlocked_buildings: Vec::new(),
        };
        for recipe_id in dto.unlocked_recipe_ids {
            if catalog.recipe(&recipe_id).is_some() {
                milestone.unlocked_recipes.push(recipe_id);
            } else {
                warn!(milestone = %milestone.id, recipe = %recipe_id, "milestone unlocks unknown recipe");
                stats.errors += 1;
            }
        }
        for building_id in dto.unlocked_machine_ids {
            if catalog.building(&building_id).is_some() {
                milestone.unlocked_buildings.push(building_id);
            } else {
                warn!(milestone = %milestone.id, building = %building_id, "milestone unlocks unknown building");
                stats.errors += 1;
            }
        }
        db::upsert_milestone(conn, &milestone)?;
        catalog.add_milestone(milestone);
        stats.milestones += 1;
    }

    Ok(())
}

fn item_from_dto(dto: ItemDto) -> Item {
    let category = ItemCategory::from_tag(&dto.category);
    let mut item = Item::new(dto.id, dto.name, category);
    item.is_raw_resource |= dto.is_raw_resource;
    item
}

fn building_from_dto(dto: MachineDto) -> Building {
    let mut building = Building::new(
        dto.id,
        dto.name,
        BuildingType::from_tag(&dto.building_type),
        dto.power_consumption,
    );
    building.production_speed = dto.production_speed;
    building.can_overclock = dto.can_overclock;
    building.max_input_connections = dto.max_input_connections;
    building.max_output_connections = dto.max_output_connections;
    building
}

fn recipe_from_dto(catalog: &Catalog, dto: RecipeDto) -> std::result::Result<Recipe, String> {
    let resolve = |list: Vec<QuantityDto>| {
        list.into_iter()
            .map(|q| {
                catalog
                    .get(&q.item_id)
                    .map(|item| ItemQuantity::new(item, q.quantity))
                    .ok_or_else(|| format!("recipe {} references unknown item {}", dto.id, q.item_id))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
    };
    let inputs = resolve(dto.inputs)?;
    let outputs = resolve(dto.outputs)?;

    if dto.id.is_empty() || outputs.is_empty() {
        return Err(format!("recipe '{}' has no id or no outputs", dto.id));
    }
    if let Some(unknown) = dto
        .compatible_machine_ids
        .iter()
        .find(|id| catalog.building(id).is_none())
    {
        return Err(format!("recipe {} references unknown building {}", dto.id, unknown));
    }

    Ok(Recipe {
        id: dto.id,
        name: dto.name,
        inputs,
        outputs,
        production_time_seconds: dto.production_time_seconds,
        is_alternate: dto.is_alternate,
        compatible_buildings: dto.compatible_machine_ids,
    })
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub items: usize,
    pub buildings: usize,
    pub recipes: usize,
    pub milestones: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} items, {} buildings, {} recipes, {} milestones from {} files. Skipped: {}, Errors: {}",
            self.items,
            self.buildings,
            self.recipes,
            self.milestones,
            self.files,
            self.skipped,
            self.errors
        )
    }
}
