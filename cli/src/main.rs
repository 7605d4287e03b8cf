mod commands;
mod config;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    cmd_analytics, cmd_categories, cmd_copy, cmd_copy_yesterday, cmd_day, cmd_delete, cmd_edit,
    cmd_food_add, cmd_food_import, cmd_food_list, cmd_food_show, cmd_goal, cmd_log, cmd_note,
    cmd_recent, cmd_recipe_add_ingredient, cmd_recipe_add_to_meal, cmd_recipe_create,
    cmd_recipe_delete, cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show, cmd_seed,
    cmd_week,
};
use crate::config::Config;
use nutritrack_core::service::NutritionService;

#[derive(Parser)]
#[command(
    name = "nutritrack",
    version,
    about = "A local-first meal planner and nutrition tracker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's plan, creating it if needed
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the plan for a date
    Day {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a 7-day rollup
    Week {
        /// First day of the week (default: six days ago)
        #[arg(long)]
        start: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show averages and goal adherence over the last N days
    Analytics {
        /// Number of days to include
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Last day of the window (default: today)
        #[arg(long)]
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the most recent plans
    Recent {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a food to a meal
    Log {
        /// Food id or name
        food: String,
        /// Quantity (e.g. "150g", "250ml", "2 cups", "1 serving"; plain numbers are grams)
        quantity: String,
        /// Meal slot: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the quantity or meal slot of an entry
    Edit {
        /// Entry ID to edit
        entry_id: i64,
        /// New quantity (e.g. "200g", "2 cups")
        #[arg(short, long)]
        quantity: Option<String>,
        /// New meal slot: breakfast, lunch, dinner, snack
        #[arg(long)]
        meal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by ID
    Delete {
        /// Entry ID to delete
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the calorie goal for a date
    Goal {
        /// Daily calorie goal (at least 1000)
        calories: i64,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the notes for a date (pass "" to clear)
    Note {
        /// Note text
        text: String,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy every entry from one date to another
    Copy {
        /// Source date
        from: String,
        /// Destination date (default: today)
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy yesterday's entries into today
    CopyYesterday {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage foods
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Manage recipe templates
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Load the sample food catalog
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a custom food
    Add {
        /// Food name
        name: String,
        /// Calories per 100g
        #[arg(long)]
        calories: i64,
        /// Protein per 100g
        #[arg(long)]
        protein: Option<f64>,
        /// Carbs per 100g
        #[arg(long)]
        carbs: Option<f64>,
        /// Fat per 100g
        #[arg(long)]
        fat: Option<f64>,
        /// Fiber per 100g
        #[arg(long)]
        fiber: Option<f64>,
        /// Sodium per 100g, in mg
        #[arg(long)]
        sodium: Option<f64>,
        /// Category name
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List/search foods
    List {
        /// Name fragment to filter by
        #[arg(short, long)]
        search: Option<String>,
        /// Category name to filter by
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the nutrition facts of a food
    Show {
        /// Food id or name
        food: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List categories with food counts
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import custom foods from a CSV file
    Import {
        /// CSV with header category,name,calories,protein,carbs,fats,fiber,sodium
        file: std::path::PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Short description
        #[arg(short, long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient to a recipe, or change its quantity
    AddIngredient {
        /// Recipe id or name
        recipe: String,
        /// Food id or name
        food: String,
        /// Quantity (e.g. "500g", "2 cups", "1 tbsp")
        quantity: String,
        /// Optional note (e.g. "chopped")
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe id or name
        recipe: String,
        /// Food id or name
        food: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recipe details (ingredients + totals)
    Show {
        /// Recipe id or name
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add every ingredient of a recipe to a meal
    AddToMeal {
        /// Recipe id or name
        recipe: String,
        /// Meal slot: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe
    Delete {
        /// Recipe id or name
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let not_found = e
            .downcast_ref::<nutritrack_core::Error>()
            .is_some_and(nutritrack_core::Error::is_not_found);
        eprintln!("Error: {e:#}");
        process::exit(if not_found { 2 } else { 1 });
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = NutritionService::open(&config.db_path, &config.username).with_context(|| {
        format!("Failed to open database: {}", config.db_path.display())
    })?;

    match cli.command {
        Commands::Today { json } => cmd_day(&svc, None, true, json),
        Commands::Day { date, json } => cmd_day(&svc, date, false, json),
        Commands::Week { start, json } => cmd_week(&svc, start, json),
        Commands::Analytics { days, end, json } => cmd_analytics(&svc, days, end, json),
        Commands::Recent { json } => cmd_recent(&svc, json),
        Commands::Log {
            food,
            quantity,
            meal,
            date,
            json,
        } => cmd_log(&svc, &food, &quantity, &meal, date, json),
        Commands::Edit {
            entry_id,
            quantity,
            meal,
            json,
        } => cmd_edit(&svc, entry_id, quantity, meal, json),
        Commands::Delete { entry_id, json } => cmd_delete(&svc, entry_id, json),
        Commands::Goal {
            calories,
            date,
            json,
        } => cmd_goal(&svc, calories, date, json),
        Commands::Note { text, date, json } => cmd_note(&svc, &text, date, json),
        Commands::Copy { from, to, json } => cmd_copy(&svc, &from, to, json),
        Commands::CopyYesterday { json } => cmd_copy_yesterday(&svc, json),
        Commands::Seed { json } => cmd_seed(&svc, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(svc, port, &bind, api_key, new_api_key).await
        }
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                fiber,
                sodium,
                category,
                json,
            } => cmd_food_add(
                &svc,
                &name,
                calories,
                protein,
                carbs,
                fat,
                fiber,
                sodium,
                category.as_deref(),
                json,
            ),
            FoodCommands::List {
                search,
                category,
                json,
            } => cmd_food_list(&svc, search.as_deref(), category.as_deref(), json),
            FoodCommands::Show { food, json } => cmd_food_show(&svc, &food, json),
            FoodCommands::Categories { json } => cmd_categories(&svc, json),
            FoodCommands::Import { file, json } => cmd_food_import(&svc, &file, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create {
                name,
                description,
                json,
            } => cmd_recipe_create(&svc, &name, description.as_deref(), json),
            RecipeCommands::AddIngredient {
                recipe,
                food,
                quantity,
                note,
                json,
            } => cmd_recipe_add_ingredient(&svc, &recipe, &food, &quantity, note, json),
            RecipeCommands::RemoveIngredient { recipe, food, json } => {
                cmd_recipe_remove_ingredient(&svc, &recipe, &food, json)
            }
            RecipeCommands::Show { recipe, json } => cmd_recipe_show(&svc, &recipe, json),
            RecipeCommands::List { json } => cmd_recipe_list(&svc, json),
            RecipeCommands::AddToMeal {
                recipe,
                meal,
                date,
                json,
            } => cmd_recipe_add_to_meal(&svc, &recipe, &meal, date, json),
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(&svc, &recipe, json),
        },
    }
}
