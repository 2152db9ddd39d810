mod appwrite;
mod commands;
mod config;
mod fetch;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{SeedArgs, Stores, cmd_categories, cmd_menu, cmd_reset, cmd_seed, cmd_status};
use crate::config::Config;
use menuseed_core::importer::{DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};

#[derive(Parser)]
#[command(
    name = "menuseed",
    version,
    about = "Seed a restaurant menu into an Appwrite project",
    long_about = "Seed a restaurant menu into an Appwrite project.\n\n\
        Categories and customizations are reconciled by name, menu items are \
        imported in small concurrent groups with their images, and failed items \
        are recorded so the next run retries only those."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the menu dataset (resumes from the last run's failures if any)
    Seed {
        /// Dataset JSON file (default: the bundled sample menu)
        #[arg(long, value_name = "PATH")]
        dataset: Option<PathBuf>,
        /// Menu items imported concurrently per group
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Extra attempts per image after the first
        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
        retries: u32,
        /// Use a local SQLite backend instead of Appwrite (optional database path)
        #[arg(long, value_name = "DB")]
        local: Option<Option<PathBuf>>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all seeded documents and files
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Use a local SQLite backend instead of Appwrite (optional database path)
        #[arg(long, value_name = "DB")]
        local: Option<Option<PathBuf>>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration and pending failures
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List seeded menu items
    Menu {
        /// Only items in this category (by name)
        #[arg(long)]
        category: Option<String>,
        /// Only items whose name matches
        #[arg(short, long)]
        search: Option<String>,
        /// Use a local SQLite backend instead of Appwrite (optional database path)
        #[arg(long, value_name = "DB")]
        local: Option<Option<PathBuf>>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List seeded categories
    Categories {
        /// Use a local SQLite backend instead of Appwrite (optional database path)
        #[arg(long, value_name = "DB")]
        local: Option<Option<PathBuf>>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(logging::DEFAULT_FILTER) {
        eprintln!("Warning: {e:#}");
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Seed {
            dataset,
            concurrency,
            retries,
            local,
            json,
        } => {
            let stores = Stores::open(&config, local)?;
            let args = SeedArgs {
                dataset,
                concurrency,
                retries,
                json,
            };
            cmd_seed(&config, &stores, args).await
        }
        Commands::Reset { yes, local, json } => {
            let stores = Stores::open(&config, local)?;
            cmd_reset(&config, &stores, yes, json).await
        }
        Commands::Status { json } => cmd_status(&config, json),
        Commands::Menu {
            category,
            search,
            local,
            json,
        } => {
            let stores = Stores::open(&config, local)?;
            cmd_menu(
                &config,
                &stores,
                category.as_deref(),
                search.as_deref(),
                json,
            )
            .await
        }
        Commands::Categories { local, json } => {
            let stores = Stores::open(&config, local)?;
            cmd_categories(&config, &stores, json).await
        }
    }
}
