//! Histogram Search CLI
//!
//! Ranks the images of a dataset directory by color similarity to a query image.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use histo_search::{build_runtime, dataset, run_search, Config};

const DEFAULT_CONFIG: &str = "search.yaml";

#[derive(Parser)]
#[command(name = "histo-search")]
#[command(about = "Find the images most similar to a query by color histogram", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    /// Path to configuration file (defaults to search.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the number of dataset partitions
    #[arg(long, global = true)]
    partitions: Option<usize>,

    /// Override the number of results
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Override the histogram padding depth
    #[arg(long, global = true)]
    depth: Option<usize>,

    /// Query image, relative to the query root. Use `search` for an image
    /// named like a subcommand.
    #[arg(required = true)]
    query: Option<String>,

    /// Dataset directory, relative to the dataset root
    #[arg(required = true)]
    dataset: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search explicitly; accepts any image name
    Search {
        /// Query image, relative to the query root
        query: String,
        /// Dataset directory, relative to the dataset root
        dataset: String,
    },

    /// Show how a dataset would be partitioned without processing it
    Plan {
        /// Dataset directory, relative to the dataset root
        dataset: String,
    },

    /// Validate configuration
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        None => {
            let (Some(query), Some(dataset)) = (&cli.query, &cli.dataset) else {
                anyhow::bail!("Both a query image and a dataset directory are required");
            };
            search_command(&cli, query, dataset)?;
        }

        Some(Commands::Search { query, dataset }) => {
            search_command(&cli, query, dataset)?;
        }

        Some(Commands::Plan { dataset }) => {
            plan_command(&cli, dataset)?;
        }

        Some(Commands::Validate) => {
            let config = load_config(&cli)?;
            config.validate()?;
            println!("Configuration is valid");
        }

        Some(Commands::GenerateConfig { output }) => {
            generate_config_command(output)?;
        }
    }

    Ok(())
}

/// Load the configuration file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(Path::new(DEFAULT_CONFIG))?,
        None => {
            tracing::debug!("No configuration file, using defaults");
            Config::default()
        }
    };

    if let Some(p) = cli.partitions {
        config.search.partitions = p;
    }
    if let Some(k) = cli.top_k {
        config.search.top_k = k;
    }
    if let Some(d) = cli.depth {
        config.search.depth = d;
    }

    Ok(config)
}

fn search_command(cli: &Cli, query: &str, dataset: &str) -> Result<()> {
    let config = load_config(cli)?;
    config.validate()?;

    println!("=== Searching {} in {} ===", query, dataset);

    let runtime = build_runtime(config.processing.worker_threads)?;
    let outcome = runtime.block_on(run_search(&config, query, dataset))?;

    println!("\n=== Top {} ===", outcome.matches.len());
    for (rank, m) in outcome.matches.iter().enumerate() {
        let name = m
            .histogram
            .name()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| m.histogram.name().display().to_string());
        println!("{:>3}. {} ({:.4})", rank + 1, name, m.score);
    }
    println!("=== Done: {} ===", outcome.stats);

    Ok(())
}

fn plan_command(cli: &Cli, dataset_name: &str) -> Result<()> {
    let config = load_config(cli)?;
    config.validate()?;

    let dir = config.paths.dataset_path(dataset_name);
    let images = dataset::list_images(&dir, &config.paths.extensions)?;
    let sizes = dataset::partition_sizes(images.len(), config.search.partitions);

    println!("\n=== Partition Plan ===");
    println!("Dataset: {}", dir.display());
    println!("Images: {}", images.len());
    println!("Partitions: {}", config.search.partitions);

    if sizes.is_empty() {
        println!("Nothing to do");
    } else {
        let mut start = 0;
        for (i, size) in sizes.iter().enumerate() {
            let range = if *size == 0 {
                "(empty)".to_string()
            } else {
                format!("[{}..{})", start, start + size)
            };
            println!("  worker {:>2}: {:>5} images {}", i, size, range);
            start += size;
        }
    }
    println!("======================\n");

    Ok(())
}

fn generate_config_command(output: &Path) -> Result<()> {
    let yaml = r#"# Histogram Search Configuration

# === PATHS: Where images live ===
paths:
  # Query image names are resolved against this directory
  query_root: "res/queryImages"

  # Dataset directory names are resolved against this directory
  dataset_root: "res"

  # File extensions treated as dataset images (case-insensitive)
  extensions: ["jpg", "jpeg"]

# === SEARCH: Histogram and ranking ===
search:
  # Zero bins placed ahead of the pixel bins
  depth: 10

  # Number of results to keep
  top_k: 5

  # Dataset partitions, one worker per partition
  partitions: 4

  # Histograms buffered between workers and the ranker
  channel_capacity: 64

# === PROCESSING: Runtime and reporting ===
processing:
  # Tokio worker threads (null = num CPUs)
  # worker_threads: 8

  # Print progress during processing
  enable_metrics: true

  # Progress interval in seconds
  metrics_interval_secs: 5

  # Save final metrics as JSON
  # metrics_output_path: "metrics.json"
"#;

    std::fs::write(output, yaml)?;
    println!("Generated sample configuration at: {}", output.display());

    Ok(())
}
