//! Database schema and operations
//!
//! The catalog is persisted in SQLite. Every top-level table carries an
//! `ordinal` column so a catalog loaded back comes out in the order it was
//! stored, which the recipe and building selection relies on for ties.

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension};

use crate::catalog::{Catalog, ItemCatalog};
use crate::models::{
    Building, BuildingType, Item, ItemCategory, ItemQuantity, Milestone, Recipe,
};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            is_raw_resource INTEGER NOT NULL,
            ordinal INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS buildings (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            building_type TEXT NOT NULL,
            production_speed REAL NOT NULL,
            power_mw REAL NOT NULL,
            can_overclock INTEGER NOT NULL,
            max_input_connections INTEGER NOT NULL,
            max_output_connections INTEGER NOT NULL,
            ordinal INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            production_time_s REAL NOT NULL,
            is_alternate INTEGER NOT NULL,
            ordinal INTEGER NOT NULL
        );

        -- Per-cycle quantities
        CREATE TABLE IF NOT EXISTS recipe_inputs (
            recipe_id TEXT,
            item_id TEXT,
            quantity REAL NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, item_id)
        );

        CREATE TABLE IF NOT EXISTS recipe_outputs (
            recipe_id TEXT,
            item_id TEXT,
            quantity REAL NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, item_id)
        );

        CREATE TABLE IF NOT EXISTS recipe_buildings (
            recipe_id TEXT,
            building_id TEXT,
            position INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, building_id)
        );

        CREATE TABLE IF NOT EXISTS milestones (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            tier INTEGER NOT NULL,
            ordinal INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS milestone_recipes (
            milestone_id TEXT,
            recipe_id TEXT,
            PRIMARY KEY (milestone_id, recipe_id)
        );

        CREATE TABLE IF NOT EXISTS milestone_buildings (
            milestone_id TEXT,
            building_id TEXT,
            PRIMARY KEY (milestone_id, building_id)
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_outputs_item ON recipe_outputs(item_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_inputs_item ON recipe_inputs(item_id);
        "#,
    )?;
    Ok(())
}

/// Remove every catalog row (for re-import)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM milestone_buildings;
        DELETE FROM milestone_recipes;
        DELETE FROM milestones;
        DELETE FROM recipe_buildings;
        DELETE FROM recipe_outputs;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM buildings;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// Insert or update an item; an existing item keeps its position.
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT INTO items (id, name, category, is_raw_resource, ordinal)
         VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(ordinal) + 1, 0) FROM items))
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            category = excluded.category,
            is_raw_resource = excluded.is_raw_resource",
        (&item.id, &item.name, item.category.as_tag(), item.is_raw_resource),
    )?;
    Ok(())
}

/// Insert or update a building
pub fn upsert_building(conn: &Connection, building: &Building) -> Result<()> {
    conn.execute(
        "INSERT INTO buildings (id, name, building_type, production_speed, power_mw, can_overclock,
                                max_input_connections, max_output_connections, ordinal)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, (SELECT COALESCE(MAX(ordinal) + 1, 0) FROM buildings))
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            building_type = excluded.building_type,
            production_speed = excluded.production_speed,
            power_mw = excluded.power_mw,
            can_overclock = excluded.can_overclock,
            max_input_connections = excluded.max_input_connections,
            max_output_connections = excluded.max_output_connections",
        (
            &building.id,
            &building.name,
            building.building_type.as_tag(),
            building.production_speed,
            building.power_consumption,
            building.can_overclock,
            building.max_input_connections,
            building.max_output_connections,
        ),
    )?;
    Ok(())
}

/// Insert or update a recipe, replacing its inputs, outputs and buildings
pub fn upsert_recipe(conn: &Connection, recipe: &Recipe) -> Result<()> {
    conn.execute(
        "INSERT INTO recipes (id, name, production_time_s, is_alternate, ordinal)
         VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(ordinal) + 1, 0) FROM recipes))
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            production_time_s = excluded.production_time_s,
            is_alternate = excluded.is_alternate",
        (
            &recipe.id,
            &recipe.name,
            recipe.production_time_seconds,
            recipe.is_alternate,
        ),
    )?;

    conn.execute("DELETE FROM recipe_inputs WHERE recipe_id = ?1", [&recipe.id])?;
    conn.execute("DELETE FROM recipe_outputs WHERE recipe_id = ?1", [&recipe.id])?;
    conn.execute("DELETE FROM recipe_buildings WHERE recipe_id = ?1", [&recipe.id])?;

    for (position, input) in recipe.inputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_inputs (recipe_id, item_id, quantity, position) VALUES (?1, ?2, ?3, ?4)",
            (&recipe.id, &input.item.id, input.quantity, position as i64),
        )?;
    }
    for (position, output) in recipe.outputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_outputs (recipe_id, item_id, quantity, position) VALUES (?1, ?2, ?3, ?4)",
            (&recipe.id, &output.item.id, output.quantity, position as i64),
        )?;
    }
    for (position, building_id) in recipe.compatible_buildings.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO recipe_buildings (recipe_id, building_id, position) VALUES (?1, ?2, ?3)",
            (&recipe.id, building_id, position as i64),
        )?;
    }
    Ok(())
}

/// Insert or update a milestone and its unlocks
pub fn upsert_milestone(conn: &Connection, milestone: &Milestone) -> Result<()> {
    conn.execute(
        "INSERT INTO milestones (id, name, tier, ordinal)
         VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(ordinal) + 1, 0) FROM milestones))
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, tier = excluded.tier",
        (&milestone.id, &milestone.name, milestone.tier),
    )?;

    conn.execute("DELETE FROM milestone_recipes WHERE milestone_id = ?1", [&milestone.id])?;
    conn.execute("DELETE FROM milestone_buildings WHERE milestone_id = ?1", [&milestone.id])?;
    for recipe_id in &milestone.unlocked_recipes {
        conn.execute(
            "INSERT OR IGNORE INTO milestone_recipes (milestone_id, recipe_id) VALUES (?1, ?2)",
            (&milestone.id, recipe_id),
        )?;
    }
    for building_id in &milestone.unlocked_buildings {
        conn.execute(
            "INSERT OR IGNORE INTO milestone_buildings (milestone_id, building_id) VALUES (?1, ?2)",
            (&milestone.id, building_id),
        )?;
    }
    Ok(())
}

/// Write a whole catalog in one transaction
pub fn store_catalog(conn: &mut Connection, catalog: &Catalog) -> Result<()> {
    let tx = conn.transaction()?;
    for item in catalog.items() {
        upsert_item(&tx, item)?;
    }
    for building in catalog.buildings() {
        upsert_building(&tx, building)?;
    }
    for recipe in catalog.recipes() {
        upsert_recipe(&tx, recipe)?;
    }
    for milestone in catalog.milestones() {
        upsert_milestone(&tx, milestone)?;
    }
    tx.commit()?;
    Ok(())
}

/// Read the full catalog back in stored order
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let mut catalog = Catalog::new();

    for item in list_items_by(conn, "ordinal")? {
        catalog.add_item(item);
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, building_type, production_speed, power_mw, can_overclock,
                max_input_connections, max_output_connections
         FROM buildings ORDER BY ordinal",
    )?;
    let rows = stmt.query_map([], building_from_row)?;
    for row in rows {
        catalog.add_building(row?);
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, production_time_s, is_alternate FROM recipes ORDER BY ordinal",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            inputs: Vec::new(),
            outputs: Vec::new(),
            production_time_seconds: row.get(2)?,
            is_alternate: row.get(3)?,
            compatible_buildings: Vec::new(),
        })
    })?;
    let mut recipes = Vec::new();
    for row in rows {
        recipes.push(row?);
    }
    for mut recipe in recipes {
        recipe.inputs = recipe_quantities(conn, &catalog, "recipe_inputs", &recipe.id)?;
        recipe.outputs = recipe_quantities(conn, &catalog, "recipe_outputs", &recipe.id)?;
        recipe.compatible_buildings = string_column(
            conn,
            "SELECT building_id FROM recipe_buildings WHERE recipe_id = ?1 ORDER BY position",
            &recipe.id,
        )?;
        catalog.add_recipe(recipe);
    }

    let mut stmt = conn.prepare("SELECT id, name, tier FROM milestones ORDER BY ordinal")?;
    let rows = stmt.query_map([], |row| {
        Ok(Milestone {
            id: row.get(0)?,
            name: row.get(1)?,
            tier: row.get(2)?,
            unlocked_recipes: Vec::new(),
            unlocked_buildings: Vec::new(),
        })
    })?;
    let mut milestones = Vec::new();
    for row in rows {
        milestones.push(row?);
    }
    for mut milestone in milestones {
        milestone.unlocked_recipes = string_column(
            conn,
            "SELECT recipe_id FROM milestone_recipes WHERE milestone_id = ?1 ORDER BY rowid",
            &milestone.id,
        )?;
        milestone.unlocked_buildings = string_column(
            conn,
            "SELECT building_id FROM milestone_buildings WHERE milestone_id = ?1 ORDER BY rowid",
            &milestone.id,
        )?;
        catalog.add_milestone(milestone);
    }

    Ok(catalog)
}

fn building_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Building> {
    Ok(Building {
        id: row.get(0)?,
        name: row.get(1)?,
        building_type: BuildingType::from_tag(&row.get::<_, String>(2)?),
        production_speed: row.get(3)?,
        power_consumption: row.get(4)?,
        can_overclock: row.get(5)?,
        max_input_connections: row.get(6)?,
        max_output_connections: row.get(7)?,
    })
}

fn recipe_quantities(
    conn: &Connection,
    catalog: &Catalog,
    table: &str,
    recipe_id: &str,
) -> Result<Vec<ItemQuantity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT item_id, quantity FROM {table} WHERE recipe_id = ?1 ORDER BY position"
    ))?;
    let rows = stmt.query_map([recipe_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (item_id, quantity) = row?;
        let item = catalog
            .get(&item_id)
            .ok_or_else(|| anyhow!("recipe {recipe_id} references unknown item {item_id}"))?;
        results.push(ItemQuantity::new(item, quantity));
    }
    Ok(results)
}

fn string_column(conn: &Connection, sql: &str, key: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([key], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn list_items_by(conn: &Connection, order: &str) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, category, is_raw_resource FROM items ORDER BY {order}"
    ))?;

    let rows = stmt.query_map([], |row| {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
            category: ItemCategory::from_tag(&row.get::<_, String>(2)?),
            is_raw_resource: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all items by name
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    list_items_by(conn, "name")
}

/// Ids of recipes producing an item, in catalog order
pub fn recipes_producing(conn: &Connection, item_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT r.id
         FROM recipes r
         JOIN recipe_outputs ro ON r.id = ro.recipe_id
         WHERE ro.item_id = ?1
         ORDER BY r.ordinal",
    )?;

    let rows = stmt.query_map([item_id], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Look up one building
pub fn get_building(conn: &Connection, building_id: &str) -> Result<Option<Building>> {
    conn.query_row(
        "SELECT id, name, building_type, production_speed, power_mw, can_overclock,
                max_input_connections, max_output_connections
         FROM buildings WHERE id = ?1",
        [building_id],
        building_from_row,
    )
    .optional()
    .with_context(|| format!("Failed to look up building {building_id}"))
}

/// Row counts for items, recipes and buildings
pub fn catalog_counts(conn: &Connection) -> Result<(usize, usize, usize)> {
    let count = |table: &str| -> Result<usize> {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n as usize)
    };
    Ok((count("items")?, count("recipes")?, count("buildings")?))
}
