use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use myfcd_scrape::config::load_config;
use myfcd_scrape::tools::{self, DEFAULT_CSV_FILE};
use myfcd_scrape::{
    fetch_food_list, scrape_database, Database, ExpectedTotal, FoodStore, RendererKind,
    ScraperConfig,
};

#[derive(Parser)]
#[command(name = "myfcd-scrape")]
#[command(about = "Scrape the Malaysian Food Composition Database into JSON", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./myfcd.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every food item of a database edition
    Scrape {
        /// Database edition: current, 1997 or industry
        #[arg(short, long, default_value = "current")]
        database: Database,
        /// Output directory for the JSON files
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only scrape the first N items
        #[arg(long)]
        max_items: Option<usize>,
        /// Fetch detail pages over plain HTTP instead of headless Chrome
        #[arg(long)]
        no_browser: bool,
        /// Continue with a partial list when listing pagination fails
        #[arg(long)]
        allow_partial: bool,
    },
    /// Print the item listing as JSON lines
    List {
        #[arg(short, long, default_value = "current")]
        database: Database,
    },
    /// Show scraping progress of an output directory
    Progress {
        #[arg(short, long, default_value = "current")]
        database: Database,
        /// Directory with the JSON files
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Expected number of items (overrides the edition's default)
        #[arg(long)]
        expected: Option<usize>,
    },
    /// Flatten the JSON files into one CSV
    Csv {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// CSV path (defaults to myfcd_complete.csv inside the directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarize the JSON files into summary_analysis.json
    Analyze {
        #[arg(short, long, default_value = "current")]
        database: Database,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config: ScraperConfig = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Scrape {
            database,
            output,
            max_items,
            no_browser,
            allow_partial,
        } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            if max_items.is_some() {
                config.max_items = max_items;
            }
            if no_browser {
                config.renderer = RendererKind::Http;
            }
            config.allow_partial_listing |= allow_partial;

            let report = scrape_database(database, &config).await?;
            info!(
                "Scraping completed: {}/{} foods saved to {}",
                report.saved,
                report.attempted,
                config.output_dir.display()
            );
            if !report.failed.is_empty() {
                error!("{} items failed", report.failed.len());
                for (ndb_no, reason) in &report.failed {
                    error!("  {}: {}", ndb_no, reason);
                }
            }
        }
        Command::List { database } => {
            for item in fetch_food_list(database, &config).await? {
                println!("{}", serde_json::to_string(&item)?);
            }
        }
        Command::Progress {
            database,
            dir,
            expected,
        } => {
            let store = FoodStore::new(dir.unwrap_or(config.output_dir));
            if !store.dir().exists() {
                println!("Datasets folder not found: {}", store.dir().display());
                return Ok(());
            }
            let expected = expected
                .map(ExpectedTotal::Exact)
                .unwrap_or(database.profile().expected_total);
            let report = tools::check_progress(&store, expected)?;
            println!("{} Scraping Progress", database.profile().name);
            println!("{}", "=".repeat(40));
            print!("{}", report);
        }
        Command::Csv { dir, output } => {
            let store = FoodStore::new(dir.unwrap_or(config.output_dir));
            let output = output.unwrap_or_else(|| store.dir().join(DEFAULT_CSV_FILE));
            let export = tools::export_csv(&store, &output)?;
            if export.rows == 0 {
                return Err("No JSON files found".into());
            }
            println!("CSV created: {}", export.path.display());
            println!("Rows: {}", export.rows);
            println!("Columns: {}", export.columns);
        }
        Command::Analyze { database, dir } => {
            let settings = config.resolve(database);
            let store = FoodStore::new(dir.unwrap_or(settings.output_dir.clone()));
            let summary = tools::analyze(&store, &settings)?;
            if summary.statistics.total_files == 0 {
                return Err("No JSON files found".into());
            }
            print!("{}", summary);
            summary.write(&store)?;
        }
    }

    Ok(())
}
