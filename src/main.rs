//! Satisfactory Production Planner
//!
//! Command-line front end: manage the catalog database and plan
//! production chains.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use satisfactory_planner::{
    AvailabilityPolicy, OptimizationOptions, OptimizationTarget, PlanReport, ResearchState,
    Target, Unrestricted, analyze, build_production_graph, db, format_production_graph, import,
    sample,
};
use satisfactory_planner::models::ItemQuantity;

#[derive(Parser)]
#[command(name = "satisfactory-planner")]
#[command(about = "Production chain planner for Satisfactory")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "planner_data.db")]
    database: PathBuf,

    /// Log planner decisions (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load the built-in early-game catalog
    LoadSample,

    /// Import game data JSON files from a directory
    Import {
        /// Directory searched recursively for *.json files
        dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },

    /// List all items in the database
    ListItems,

    /// List recipes, optionally only those producing an item
    ListRecipes {
        /// Item ID
        #[arg(short, long)]
        item: Option<String>,
    },

    /// Show details for a specific building
    Building {
        /// Building ID
        id: String,
    },

    /// Plan a production chain for one or more targets
    Plan {
        /// Targets as ITEM:RATE per minute (e.g. "reinforced_iron_plate:10")
        #[arg(required = true)]
        targets: Vec<Target>,

        /// JSON file with optimization options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// power, speed, simplicity or resource
        #[arg(long)]
        optimize_for: Option<OptimizationTarget>,

        /// Prefer alternate recipes over standard ones
        #[arg(long)]
        prefer_alternates: bool,

        /// Never overclock buildings
        #[arg(long)]
        no_overclock: bool,

        /// Highest clock speed allowed, in percent
        #[arg(long)]
        max_overclock: Option<f64>,

        /// Completed milestone (repeatable); restricts standard recipes and buildings
        #[arg(short, long)]
        milestone: Vec<String>,

        /// Unlocked alternate recipe (repeatable)
        #[arg(short, long)]
        alternate: Vec<String>,

        /// Show the production tree
        #[arg(short, long)]
        tree: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn join_quantities(quantities: &[ItemQuantity]) -> String {
    quantities
        .iter()
        .map(|q| q.to_string())
        .collect::<Vec<_>>()
        .join(" + ")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let catalog = sample::sample_catalog();
            db::clear_catalog(&conn)?;
            db::store_catalog(&mut conn, &catalog)?;
            println!(
                "Loaded {} items, {} recipes, {} buildings",
                catalog.items().len(),
                catalog.recipes().len(),
                catalog.buildings().len()
            );
        }

        Commands::Import { dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_catalog(&conn)?;
            }

            let stats = import::import_directory(&mut conn, &dir)?;
            println!("\n{}", stats);
        }

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<28} {:<28} {:<18} {:>4}", "Item", "ID", "Category", "Raw");
                println!("{}", "-".repeat(81));
                for item in items {
                    println!(
                        "{:<28} {:<28} {:<18} {:>4}",
                        item.name,
                        item.id,
                        item.category.as_tag(),
                        if item.is_raw_resource { "yes" } else { "" }
                    );
                }
            }
        }

        Commands::ListRecipes { item } => {
            let catalog = db::load_catalog(&conn)?;
            let recipes: Vec<_> = match &item {
                Some(item_id) => db::recipes_producing(&conn, item_id)?
                    .iter()
                    .filter_map(|id| catalog.recipe(id))
                    .collect(),
                None => catalog.recipes().iter().collect(),
            };

            if recipes.is_empty() {
                println!("No matching recipes. Run 'import' or 'load-sample' first.");
            }
            for recipe in recipes {
                let marker = if recipe.is_alternate { " (alternate)" } else { "" };
                println!("{}{} [{}]", recipe.name, marker, recipe.id);
                println!(
                    "  {} -> {} every {}s on {}",
                    join_quantities(&recipe.inputs),
                    join_quantities(&recipe.outputs),
                    recipe.production_time_seconds,
                    recipe.compatible_buildings.join(", ")
                );
            }
        }

        Commands::Building { id } => match db::get_building(&conn, &id)? {
            Some(b) => {
                println!("Building: {}", b.name);
                println!("  ID: {}", b.id);
                println!("  Type: {}", b.building_type.as_tag());
                println!("  Power: {} MW", b.power_consumption);
                println!("  Speed: {}x", b.production_speed);
                println!("  Overclockable: {}", if b.can_overclock { "yes" } else { "no" });

                let catalog = db::load_catalog(&conn)?;
                let runs: Vec<_> = catalog
                    .recipes()
                    .iter()
                    .filter(|r| r.compatible_buildings.contains(&b.id))
                    .collect();
                if !runs.is_empty() {
                    println!("  Recipes:");
                    for recipe in runs {
                        println!("    {} [{}]", recipe.name, recipe.id);
                    }
                }
            }
            None => println!("Building '{}' not found", id),
        },

        Commands::Plan {
            targets,
            config,
            optimize_for,
            prefer_alternates,
            no_overclock,
            max_overclock,
            milestone,
            alternate,
            tree,
            json,
        } => {
            let catalog = db::load_catalog(&conn)?;
            if catalog.items().is_empty() {
                bail!("No catalog data in database. Run 'import' or 'load-sample' first.");
            }

            let mut options = match &config {
                Some(path) => {
                    let content = fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    OptimizationOptions::from_json(&content)
                        .with_context(|| format!("Invalid options in {}", path.display()))?
                }
                None => OptimizationOptions::default(),
            };
            if let Some(target) = optimize_for {
                options.optimize_for = target;
            }
            if prefer_alternates {
                options.prefer_alternate_recipes = true;
            }
            if no_overclock {
                options.allow_overclocking = false;
            }
            if let Some(pct) = max_overclock {
                options.max_overclock_percentage = pct;
            }

            let availability: Box<dyn AvailabilityPolicy> =
                if milestone.is_empty() && alternate.is_empty() {
                    Box::new(Unrestricted)
                } else {
                    let mut research = ResearchState::new(catalog.milestones());
                    for id in &milestone {
                        let m = catalog
                            .milestone(id)
                            .ok_or_else(|| anyhow!("Unknown milestone '{}'", id))?;
                        research.complete_milestone(m);
                    }
                    for id in alternate {
                        research.unlock_alternate(id);
                    }
                    Box::new(research)
                };

            let graph = build_production_graph(&catalog, &targets, availability.as_ref(), &options)?;
            let analysis = analyze(&graph);

            if json {
                let report = PlanReport::new(&graph, &analysis);
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            if tree {
                println!("Production chain:\n");
                println!("{}", format_production_graph(&graph));
            }

            println!(
                "{:<30} {:<16} {:>6} {:>6} {:>10}",
                "Step", "Building", "Count", "Clock", "Rate/min"
            );
            println!("{}", "-".repeat(72));
            for (_, node) in graph.nodes() {
                println!(
                    "{:<30} {:<16} {:>6} {:>5.0}% {:>10.2}",
                    node.recipe.name,
                    node.building.name,
                    node.building_count,
                    node.clock_speed * 100.0,
                    node.actual_production_rate()
                );
            }
            println!();
            println!("{}", analysis);
        }
    }

    Ok(())
}
