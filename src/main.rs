//! Reading Pipeline CLI
//!
//! Fetch, clean, aggregate and persist timestamped readings.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;
use reading_pipeline::{
    history::create_shared_log_with_persistence, Config, DataProcessor, MainViewModel,
    RawDataPoint, UnparsablePolicy, ViewEvent, VERSION,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "readings")]
#[command(version = VERSION)]
#[command(about = "Fetch, clean, aggregate and persist timestamped readings", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Per-invocation overrides of the stored configuration.
#[derive(Args)]
struct Overrides {
    /// Readings endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Output file for cleaned readings
    #[arg(long, global = true)]
    csv_path: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Drop unparsable values instead of recording them as zero
    #[arg(long, global = true)]
    exclude_unparsable: bool,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(endpoint) = self.endpoint {
            config.endpoint_url = endpoint;
        }
        if let Some(csv_path) = self.csv_path {
            config.csv_path = csv_path;
        }
        if let Some(database_url) = self.database_url {
            config.database_url = database_url;
        }
        if self.exclude_unparsable {
            config.unparsable = UnparsablePolicy::Exclude;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load readings from the endpoint, then process them
    Run,

    /// Load readings and print them as JSON
    Load,

    /// Process readings from a local JSON file, or from the endpoint
    Process {
        /// JSON file containing an array of readings
        #[arg(long, short)]
        input: Option<PathBuf>,
    },

    /// Show run history
    Status {
        /// Clear the stored run history
        #[arg(long)]
        reset: bool,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration (including overrides) to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load configuration, using defaults: {}", e);
        Config::default()
    });
    cli.overrides.apply(&mut config);

    match cli.command {
        Commands::Run => cmd_run(&config, None).await,
        Commands::Load => cmd_load(&config).await,
        Commands::Process { input } => cmd_run(&config, input).await,
        Commands::Status { reset } => cmd_status(&config, reset),
        Commands::Config { save } => cmd_config(&config, save),
    }
}

async fn cmd_run(config: &Config, input: Option<PathBuf>) -> anyhow::Result<()> {
    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create directories: {}", e);
    }

    let history = create_shared_log_with_persistence(config.history_path());
    let processor = DataProcessor::new(config)?.with_history(history);
    let mut view_model = MainViewModel::new(processor);
    let events = view_model.subscribe();

    match input {
        Some(path) => {
            let points = read_input(&path)?;
            view_model.set_data_points(points);
        }
        None => {
            view_model.load().await;
            print_events(&events);
        }
    }

    let report = view_model.process().await;
    print_events(&events);

    let Some(report) = report else {
        anyhow::bail!("{}", view_model.status());
    };

    println!();
    println!("{}", report.summary);
    println!();
    println!(
        "Cleaned {} of {} reading(s) ({} missing, {} unparsable)",
        report.cleaned.len(),
        view_model.data_points().len(),
        report.cleaned.dropped_missing,
        report.cleaned.unparsable
    );
    match &report.save.file {
        Ok(rows) => println!("File: {rows} row(s) -> {}", config.csv_path.display()),
        Err(e) => println!("File: failed ({e})"),
    }
    match &report.save.database {
        Ok(rows) => println!("Database: {rows} row(s)"),
        Err(e) => println!("Database: failed ({e})"),
    }

    Ok(())
}

async fn cmd_load(config: &Config) -> anyhow::Result<()> {
    let processor = DataProcessor::new(config)?;
    let points = processor
        .try_load()
        .await
        .with_context(|| format!("Error loading data from {}", config.endpoint_url))?;

    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}

fn cmd_status(config: &Config, reset: bool) -> anyhow::Result<()> {
    let history_path = config.history_path();
    if !history_path.exists() {
        println!("No previous runs found.");
        return Ok(());
    }

    let history = create_shared_log_with_persistence(history_path.clone());
    if reset {
        history.reset();
        history
            .save()
            .with_context(|| format!("Failed to reset {}", history_path.display()))?;
        println!("Run history cleared.");
        return Ok(());
    }

    println!("{}", history.summary());
    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    if save {
        config.save()?;
        println!("Saved configuration to {:?}", Config::config_path());
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<Vec<RawDataPoint>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid readings in {}", path.display()))
}

/// Mirror view-model status changes to the terminal.
fn print_events(events: &Receiver<ViewEvent>) {
    for event in events.try_iter() {
        match event {
            ViewEvent::StatusChanged(status) => println!("{status}"),
            ViewEvent::DataChanged { count } => println!("  {count} reading(s) loaded"),
        }
    }
}
