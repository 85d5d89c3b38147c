//! rusty-metrics CLI - run the metric pipeline over saved API payloads
//!
//! Reads `<FUNCTION>.json` files from a payload directory, runs the pipeline
//! and prints or writes the resulting metric map as JSON.
//!
//! ## Example Usage
//!
//! ```bash
//! # Process payloads for 2020-2023, converting EUR fundamentals to USD
//! rusty-metrics process --payloads ./ibm --start 2020-01-01 --end 2023-12-31 \
//!     --fx-rate 1.08 --currency EUR --output ibm-metrics.json
//!
//! # Inspect the built-in catalog
//! rusty-metrics catalog list
//!
//! # Check a custom catalog file
//! rusty-metrics catalog validate my-catalog.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rusty_metrics::catalog::MetricCatalog;
use rusty_metrics::fx::{detect_reported_currency, Currency, FxRate};
use rusty_metrics::pipeline::MetricPipeline;
use rusty_metrics::source::{load_payload_dir, RawPayloads};
use rusty_metrics::types::{DateWindow, MetricResultMap};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// rusty-metrics: date-aligned fundamental metrics from API payloads
#[derive(Parser)]
#[command(name = "rusty-metrics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Date-aligned fundamental metrics from API payloads", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over a payload directory
    Process {
        /// Directory holding <FUNCTION>.json payloads
        #[arg(short = 'p', long)]
        payloads: Option<PathBuf>,

        /// Start date (YYYY-MM-DD)
        #[arg(short = 's', long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(short = 'e', long)]
        end: String,

        /// Units of the target currency per unit of the reporting currency
        #[arg(short = 'f', long)]
        fx_rate: Option<f64>,

        /// Reporting currency (detected from the payloads when omitted)
        #[arg(long)]
        currency: Option<String>,

        /// Currency prices are quoted in
        #[arg(long, default_value = "USD")]
        target_currency: String,

        /// Catalog JSON file (default: built-in catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output file for the metric map (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Inspect and validate metric catalogs
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List catalog metrics
    List {
        /// Catalog JSON file (default: built-in catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Validate a catalog file
    Validate {
        /// Catalog JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write the built-in catalog as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default)]
    catalog: Option<PathBuf>,
    #[serde(default = "default_payload_dir")]
    payload_dir: PathBuf,
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    default_fx_rate: Option<f64>,
}

fn config_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rusty-metrics")
}

fn default_payload_dir() -> PathBuf {
    config_home().join("payloads")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: None,
            payload_dir: default_payload_dir(),
            output_dir: None,
            default_fx_rate: None,
        }
    }
}

impl Config {
    fn load(path: Option<&Path>) -> Self {
        let explicit = path.is_some();
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => config_home().join("config.toml"),
        };

        if !config_path.exists() {
            if explicit {
                eprintln!(
                    "{} Config file not found: {}",
                    "Warning:".yellow(),
                    config_path.display()
                );
            }
            return Config::default();
        }

        match fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => return config,
                Err(e) => {
                    eprintln!("{} Failed to parse config: {}", "Warning:".yellow(), e);
                }
            },
            Err(e) => {
                eprintln!("{} Failed to read config: {}", "Warning:".yellow(), e);
            }
        }

        Config::default()
    }

    fn load_catalog(&self, override_path: Option<&Path>) -> Result<MetricCatalog> {
        match override_path.or(self.catalog.as_deref()) {
            Some(path) => MetricCatalog::from_path(path)
                .with_context(|| format!("Failed to load catalog {}", path.display())),
            None => Ok(MetricCatalog::alpha_vantage()),
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref());

    if cli.verbose {
        println!(
            "{} v{}",
            "rusty-metrics".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "Payload dir: {}",
            config.payload_dir.display().to_string().dimmed()
        );
    }

    let result = match cli.command {
        Commands::Process {
            payloads,
            start,
            end,
            fx_rate,
            currency,
            target_currency,
            catalog,
            output,
        } => run_process(ProcessConfig {
            payloads,
            start,
            end,
            fx_rate,
            currency,
            target_currency,
            catalog,
            output,
            verbose: cli.verbose,
            config,
        }),

        Commands::Catalog { action } => handle_catalog_action(action, &config),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

struct ProcessConfig {
    payloads: Option<PathBuf>,
    start: String,
    end: String,
    fx_rate: Option<f64>,
    currency: Option<String>,
    target_currency: String,
    catalog: Option<PathBuf>,
    output: Option<PathBuf>,
    verbose: bool,
    config: Config,
}

fn run_process(cfg: ProcessConfig) -> Result<()> {
    let catalog = cfg.config.load_catalog(cfg.catalog.as_deref())?;
    let window = DateWindow::parse(&cfg.start, &cfg.end)?;

    let payload_dir = cfg
        .payloads
        .clone()
        .unwrap_or_else(|| cfg.config.payload_dir.clone());
    let payloads = load_payload_dir(&payload_dir, &catalog.source_functions())
        .with_context(|| format!("Failed to load payloads from {}", payload_dir.display()))?;

    let fx = resolve_fx(&cfg, &payloads)?;

    if cfg.verbose {
        println!("{}", "Processing payloads...".cyan().bold());
        println!("  {} {}", "Payloads:".bold(), payload_dir.display());
        println!("  {} {}", "Window:".bold(), window);
        println!("  {} {}", "FX:".bold(), fx);
        println!("  {} {} metrics", "Catalog:".bold(), catalog.len());
        println!();
    }

    let results = MetricPipeline::new(&catalog).process(&payloads, &fx, &window)?;
    let json = results.to_json_pretty()?;

    let output = cfg.output.clone().or_else(|| {
        cfg.config
            .output_dir
            .as_ref()
            .map(|dir| dir.join("metrics.json"))
    });

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_summary(&results);
            println!(
                "{} Results written to {}",
                "✓".green().bold(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Pick the run's FX rate from flags, payloads and config
fn resolve_fx(cfg: &ProcessConfig, payloads: &RawPayloads) -> Result<FxRate> {
    let target: Currency = cfg.target_currency.parse()?;
    let reported = match cfg.currency.as_deref() {
        Some(code) => code.parse::<Currency>()?,
        None => detect_reported_currency(payloads).unwrap_or(target),
    };

    if reported == target && cfg.fx_rate.is_none() {
        return Ok(FxRate::identity(target));
    }

    match cfg.fx_rate.or(cfg.config.default_fx_rate) {
        Some(rate) => Ok(FxRate::new(reported, target, rate)?),
        None => {
            eprintln!(
                "{} Fundamentals are reported in {} but no --fx-rate was given; values are left unconverted",
                "Warning:".yellow(),
                reported
            );
            Ok(FxRate::identity(target))
        }
    }
}

fn print_summary(results: &MetricResultMap) {
    println!("{}", "Metric Summary".green().bold());
    println!("{}", "==============".green());
    for (id, series) in results.iter() {
        let span = match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => format!("{} .. {}", first, last),
            _ => "-".to_string(),
        };
        let count = format!("{}/{}", series.count_values(), series.len());
        let count = if series.count_values() == 0 {
            count.red()
        } else {
            count.cyan()
        };
        println!("  {:<24} {:>9}  {}", id, count, span.dimmed());
    }
    println!();
}

fn handle_catalog_action(action: CatalogAction, config: &Config) -> Result<()> {
    match action {
        CatalogAction::List { catalog } => {
            let catalog = config.load_catalog(catalog.as_deref())?;
            println!("{}", "Catalog Metrics".cyan().bold());
            println!();
            println!(
                "  {:<24} {:<16} {:<5} {}",
                "ID".bold(),
                "KIND".bold(),
                "PLOT".bold(),
                "SOURCE".bold()
            );
            for metric in catalog.iter() {
                let source = metric
                    .calculation_formula
                    .clone()
                    .or_else(|| metric.calculation_basis.clone().map(|b| format!("ttm({})", b)))
                    .or_else(|| metric.source_function.clone())
                    .unwrap_or_default();
                let marker = if metric.id == catalog.price_metric_id() {
                    metric.id.yellow().bold()
                } else {
                    metric.id.normal()
                };
                println!(
                    "  {:<24} {:<16} {:<5} {}",
                    marker,
                    metric.kind.as_str(),
                    if metric.is_plottable { "yes" } else { "no" },
                    source.dimmed()
                );
            }
            Ok(())
        }

        CatalogAction::Validate { file } => {
            let catalog = MetricCatalog::from_path(&file)
                .with_context(|| format!("{} is not a valid catalog", file.display()))?;
            println!(
                "{} {} is valid ({} metrics, price metric '{}')",
                "✓".green().bold(),
                file.display(),
                catalog.len(),
                catalog.price_metric_id()
            );
            Ok(())
        }

        CatalogAction::Export { output } => {
            let json = MetricCatalog::alpha_vantage().to_json_pretty()?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} Catalog written to {}", "✓".green().bold(), path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
    }
}
