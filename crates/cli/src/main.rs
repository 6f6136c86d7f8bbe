mod config;
mod error;

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use dataset::QueryEngine;
use runtime::{AzureBackend, ConversationItem, Dispatcher, Orchestrator, RunOutcome};
use sandbox::{ChartConfig, ScriptSandbox};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, Credentials};
use error::Result;

const CONFIG_FILE: &str = "tiller.toml";

const SYSTEM_PROMPT: &str = "You are a data analyst with access to tools. When you need to run \
SQL queries or Rhai scripts, call the matching tool with the raw code as input.

Important notes for Rhai scripts:
- The latest SQL tool result is provided as the csv_text constant. Always read and parse it \
(e.g. parse_csv(csv_text)) instead of hard-coding data values.
- To create charts, use the create_chart(rows, title) function. Rows must be an array of maps \
with 'label' and 'value' fields, e.g. create_chart([#{label: \"setosa\", value: 1.46}], \
\"Petal Length by Species\"). The chart is saved as iris_plot.svg.
- Use print(...) or print_table(...) to show results; everything printed is returned as the \
tool output.

You have access to an iris table with columns: sepal_length, sepal_width, petal_length, \
petal_width, species.";

const USER_PROMPT: &str = "1) Write SQL to compute the mean of sepal_length, sepal_width, \
petal_length, petal_width grouped by species.
   Return a tidy CSV with species and the four means (rounded to 2 decimals).
2) Then write a Rhai script that parses that CSV string (provided as tool output), \
pretty-prints a table, and produces a bar chart of mean petal_length by species.";

#[derive(Parser)]
#[command(name = "tiller")]
#[command(about = "A freeform tool-calling data analysis demo", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis conversation
    Run {
        /// Path to the config file
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },
    /// Print the dataset as CSV
    Dataset,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { config }) => cmd_run(&config).await,
        None => cmd_run(Path::new(CONFIG_FILE)).await,
        Some(Commands::Dataset) => cmd_dataset(),
    }
}

async fn cmd_run(config_path: &Path) -> Result<()> {
    let config = if config_path.exists() {
        info!(path = %config_path.display(), "loading config");
        Config::load(config_path)?
    } else {
        Config::default()
    };
    let credentials = Credentials::from_env()?;

    println!("tiller v{}", env!("CARGO_PKG_VERSION"));
    println!("Started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!(
        "Using deployment '{}' at {}",
        credentials.deployment, credentials.endpoint
    );

    let engine = match &config.run.dataset {
        Some(path) => {
            println!("Loading dataset from {}", path.display());
            QueryEngine::load(path)?
        }
        None => QueryEngine::embedded()?,
    };
    println!("Dataset: {} record(s)\n", engine.dataset().len());

    let sandbox = ScriptSandbox::new(ChartConfig {
        output_dir: config
            .chart
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".")),
        default_filename: config.chart.filename.clone(),
    });

    let backend = AzureBackend::new(
        &credentials.endpoint,
        &credentials.api_key,
        &credentials.deployment,
    );
    let dispatcher = Dispatcher::new(engine, sandbox);
    let mut orchestrator =
        Orchestrator::new(backend, dispatcher).with_max_iterations(config.run.max_iterations);

    orchestrator.push(ConversationItem::system(SYSTEM_PROMPT));
    orchestrator.push(ConversationItem::user(USER_PROMPT));

    match orchestrator.run().await? {
        RunOutcome::Complete { iterations } => {
            println!("Conversation complete after {iterations} iteration(s).");
        }
        RunOutcome::LimitReached => {
            println!("Stopped at the iteration limit.");
        }
    }

    println!("Demo complete.");
    Ok(())
}

fn cmd_dataset() -> Result<()> {
    let engine = QueryEngine::embedded()?;
    println!("{}", engine.query("select * from iris")?);
    Ok(())
}
