mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    MealFields, cmd_delete, cmd_edit, cmd_export, cmd_feed, cmd_import, cmd_like, cmd_mine,
    cmd_save, cmd_show, cmd_submit,
};
use crate::config::Config;
use potluck_core::feed::{CategoryFilter, SortKey};
use potluck_core::store::StoreKind;

#[derive(Parser)]
#[command(
    name = "potluck",
    version,
    about = "Share recipes and browse a meal feed",
    long_about = "Share recipes and browse a meal feed.\n\n\
        Data lives in $POTLUCK_DATA_DIR (default: the platform data directory).\n\
        Set POTLUCK_USER to act as a signed-in user."
)]
struct Cli {
    /// Storage backend: sqlite or csv (default: $POTLUCK_STORE, then sqlite)
    #[arg(long, global = true)]
    store: Option<StoreKind>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Share a new recipe (requires POTLUCK_USER)
    Submit {
        /// Meal name
        name: String,
        #[command(flatten)]
        fields: MealFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse the meal feed
    Feed {
        /// Text to look for in names, descriptions, ingredients, and tags
        #[arg(short, long, default_value = "")]
        search: String,
        /// All, Breakfast, Lunch, Dinner, Snacks, or Desserts
        #[arg(short, long, default_value = "All")]
        category: CategoryFilter,
        /// newest, oldest, most-popular, highest-protein, lowest-calories
        #[arg(long, default_value = "newest")]
        sort: SortKey,
        /// Maximum number of meals to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with similar recipes
    Show {
        /// Meal ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit one of your recipes
    Edit {
        /// Meal ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: MealFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one of your recipes
    Delete {
        /// Meal ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Like a recipe
    Like {
        /// Meal ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a recipe
    Save {
        /// Meal ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your recipes with totals
    Mine {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import meals from a CSV file or a JSON export
    Import {
        /// Path to a .csv or .json file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write every meal as JSON to stdout
    Export,
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.store)?;
    let session = config.session();
    let mut repo = config.open_repository()?;
    tracing::debug!(store = %config.store, path = %config.store_path().display(), "using meal store");

    match cli.command {
        Commands::Submit { name, fields, json } => {
            cmd_submit(&mut repo, &session, &name, fields, json)
        }
        Commands::Feed {
            search,
            category,
            sort,
            limit,
            json,
        } => cmd_feed(&repo, &search, category, sort, limit, json),
        Commands::Show { id, json } => cmd_show(&repo, &id, json),
        Commands::Edit {
            id,
            name,
            fields,
            json,
        } => cmd_edit(&mut repo, &session, &id, name, fields, json),
        Commands::Delete { id, json } => cmd_delete(&mut repo, &session, &id, json),
        Commands::Like { id, json } => cmd_like(&mut repo, &id, json),
        Commands::Save { id, json } => cmd_save(&mut repo, &id, json),
        Commands::Mine { json } => cmd_mine(&repo, &session, json),
        Commands::Import { file, json } => cmd_import(&mut repo, &file, json),
        Commands::Export => cmd_export(&repo),
    }
}
