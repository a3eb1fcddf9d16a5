use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use training_catalog::{
    config::Configuration,
    indexes::DateBound,
    service::{ResourceSummary, TrainingDataService},
    utils::{audit_resources, ResultFormat, SummaryRenderer},
};

#[derive(Parser)]
#[command(
    name = "training_catalog",
    about = "Search harvested training courses, tutorials and events",
    long_about = None,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TRAINING_CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show catalog statistics
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: StatsFormat,
    },

    /// Find resources mentioning any of the words in a query
    Keyword {
        query: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Find resources offered by a provider
    Provider {
        name: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Find resources scheduled in a country, optionally narrowed to a city
    Location {
        country: String,

        #[arg(long)]
        city: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Find resources with a course instance overlapping a date range
    Dates {
        /// Range start (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_bound)]
        from: Option<DateBound>,

        /// Range end (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_bound)]
        to: Option<DateBound>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Find resources tagged with a topic, by full IRI or short name
    Topic {
        topic: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print one resource in full
    Show {
        uri: String,
    },

    /// Validate the configuration and load every source
    Validate,

    /// Generate example configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration format (yaml or json)
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Maximum number of results (defaults to the configured limit)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: FormatArg,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum FormatArg {
    Table,
    Json,
    Csv,
}

impl From<FormatArg> for ResultFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Table => Self::Table,
            FormatArg::Json => Self::Json,
            FormatArg::Csv => Self::Csv,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum StatsFormat {
    Table,
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum ConfigFormat {
    Yaml,
    Json,
}

fn parse_date_bound(value: &str) -> Result<DateBound, String> {
    DateBound::parse(value).ok_or_else(|| format!("'{}' is not a date (expected RFC 3339 or YYYY-MM-DD)", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flags win over the configured level
    let configured_level = cli
        .config
        .as_deref()
        .and_then(|path| Configuration::from_file(path).ok())
        .map(|config| config.log_level);
    let log_level = if cli.debug {
        "debug".to_string()
    } else if cli.verbose {
        "info".to_string()
    } else {
        configured_level.unwrap_or_else(|| "warn".to_string())
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let config_path = cli.config;
    match cli.command {
        Commands::Stats { format } => stats_command(config_path, format).await,
        Commands::Keyword { query, output } => {
            let service = open_service(config_path.as_deref()).await?;
            let results = service.search_by_keyword(&query, output.limit).await;
            print_results(&format!("Keyword: {}", query), &results, output.format)
        }
        Commands::Provider { name, output } => {
            let service = open_service(config_path.as_deref()).await?;
            let results = service.search_by_provider(&name, output.limit).await;
            print_results(&format!("Provider: {}", name), &results, output.format)
        }
        Commands::Location { country, city, output } => {
            let service = open_service(config_path.as_deref()).await?;
            let results = service
                .search_by_location(&country, city.as_deref(), output.limit)
                .await;
            let heading = match &city {
                Some(city) => format!("Location: {}, {}", city, country),
                None => format!("Location: {}", country),
            };
            print_results(&heading, &results, output.format)
        }
        Commands::Dates { from, to, output } => {
            let service = open_service(config_path.as_deref()).await?;
            let results = service.search_by_date_range(from, to, output.limit).await;
            let describe = |bound: Option<DateBound>| {
                bound
                    .map(|b| b.instant().format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "open".to_string())
            };
            print_results(
                &format!("Dates: {} to {}", describe(from), describe(to)),
                &results,
                output.format,
            )
        }
        Commands::Topic { topic, output } => {
            let service = open_service(config_path.as_deref()).await?;
            let results = service.search_by_topic(&topic, output.limit).await;
            print_results(&format!("Topic: {}", topic), &results, output.format)
        }
        Commands::Show { uri } => show_command(config_path, uri).await,
        Commands::Validate => validate_command(config_path).await,
        Commands::GenerateConfig { output, format } => generate_config_command(output, format).await,
    }
}

fn load_config(config_path: Option<&Path>) -> Result<Configuration> {
    let path = config_path
        .context("No configuration given: pass --config or set TRAINING_CATALOG_CONFIG")?;
    let config = Configuration::from_file(path)?;
    config.validate()?;
    Ok(config)
}

async fn open_service(config_path: Option<&Path>) -> Result<TrainingDataService> {
    let config = load_config(config_path)?;
    let started = Instant::now();
    let service = TrainingDataService::from_config(&config).await?;
    info!(
        "Catalog '{}' ready in {:.2}s",
        config.name,
        started.elapsed().as_secs_f64()
    );
    Ok(service)
}

fn print_results(heading: &str, results: &[ResourceSummary], format: FormatArg) -> Result<()> {
    let format = ResultFormat::from(format);
    let rendered = SummaryRenderer::new(true).render(results, format)?;

    if format == ResultFormat::Table {
        println!("{}", format!(" {}", heading).bright_blue().bold());
        println!(" Matches: {}\n", results.len().to_string().bright_cyan());
    }
    println!("{}", rendered);
    Ok(())
}

async fn stats_command(config_path: Option<PathBuf>, format: StatsFormat) -> Result<()> {
    let service = open_service(config_path.as_deref()).await?;
    let stats = service.stats().await;

    match format {
        StatsFormat::Table => {
            println!("{}", " Training Catalog Statistics".bright_blue().bold());
            println!("{}", stats);
            if !stats.type_distribution.is_empty() {
                println!("\n{}", " Resource types:".bright_yellow());
                for (type_name, count) in &stats.type_distribution {
                    println!("   {}: {}", type_name, count.to_string().bright_cyan());
                }
            }
        }
        StatsFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
    }

    Ok(())
}

async fn show_command(config_path: Option<PathBuf>, uri: String) -> Result<()> {
    let service = open_service(config_path.as_deref()).await?;
    match service.resource(&uri).await {
        Some(resource) => {
            println!("{}", serde_json::to_string_pretty(&resource)?);
            Ok(())
        }
        None => anyhow::bail!("No resource with uri {}", uri),
    }
}

async fn validate_command(config_path: Option<PathBuf>) -> Result<()> {
    println!("{}", " Validating configuration...".bright_blue().bold());

    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(" Configuration validation failed: {:#}", e);
            return Err(e);
        }
    };
    println!(" Configuration is valid!");
    println!(" Name: {}", config.name.bright_green());
    println!(" Sources: {}", config.sources.len());

    let service = TrainingDataService::from_config(&config).await?;
    let store = service.snapshot().await;
    for (source, count) in store.per_source_counts() {
        println!("   {}: {} resources", source.bright_cyan(), count);
    }
    println!(" Total after deduplication: {}", store.resource_count().to_string().bright_cyan());

    let issues = audit_resources(store.resources());
    if issues.is_empty() {
        println!(" {} loaded without data issues", "Catalog".bright_green());
    } else {
        for issue in &issues {
            warn!("{}", issue);
        }
        println!(
            " {} loaded with {} data issues",
            "Catalog".bright_yellow(),
            issues.len()
        );
    }

    Ok(())
}

async fn generate_config_command(output_path: PathBuf, format: ConfigFormat) -> Result<()> {
    println!("{}", " Generating example configuration...".bright_blue().bold());

    let config = Configuration::example();

    let content = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
    };

    tokio::fs::write(&output_path, content).await?;

    println!(" Example configuration generated at: {}", output_path.display().to_string().bright_green());
    println!(" Edit the file to customize for your use case");

    Ok(())
}
