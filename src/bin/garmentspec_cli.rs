//! Garment Spec CLI - Bridge interface for the web front-end
//!
//! Commands: grade, price, sizes
//! Outputs JSON to stdout, logs to stderr
//! Returns 1 on bad input, 2 on a rejected computation

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use garmentspec_core::{
    payload::{load_costing_file, load_pattern_file},
    parse_costing, parse_pattern, CostingSheet, EngineError, GradeRequest, GradingConfiguration,
    GradingProfile, IngestedPattern, PricingConfiguration, QuoteRequest, Size, SizeRange,
    SpecEngine, Unit,
};

#[derive(Parser)]
#[command(name = "garmentspec-cli")]
#[command(about = "Garment Spec CLI - grading and costing engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PayloadSource {
    /// Inline JSON payload
    #[arg(short, long, conflicts_with = "payload_file")]
    payload: Option<String>,

    /// Path to a JSON payload file
    #[arg(long)]
    payload_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a measurement table
    Grade {
        #[command(flatten)]
        source: PayloadSource,

        /// Sizes to grade (repeatable)
        #[arg(short, long)]
        size: Vec<String>,

        /// Size range, used when no --size is given (XS-XXL, S-XL, OS, M)
        #[arg(short, long)]
        range: Option<String>,

        /// Grading profile (Standard, Athletic, Relaxed, Custom)
        #[arg(long, default_value = "Standard")]
        profile: String,

        /// Multiplier for the Custom profile
        #[arg(long)]
        custom_multiplier: Option<f64>,

        /// Shrinkage compensation percent (0-15)
        #[arg(long, default_value_t = 0)]
        shrinkage: u32,

        /// Add the seam allowance to every value
        #[arg(long)]
        seam_allowance: bool,

        /// Display unit (cm, in)
        #[arg(short, long, default_value = "cm")]
        unit: String,
    },

    /// Derive wholesale and retail prices from a costing sheet
    Price {
        #[command(flatten)]
        source: PayloadSource,

        /// Markup percentage (10-80)
        #[arg(short, long)]
        markup: u32,
    },

    /// List the sizes of a size range
    Sizes {
        #[arg(short, long)]
        range: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("garmentspec_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let output = serde_json::json!({
                "success": false,
                "error": e.to_string(),
            });
            println!("{}", output);
            match e {
                EngineError::InvalidConfiguration(_) | EngineError::ValidationFailed(_) => {
                    ExitCode::from(2)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(command: Commands) -> Result<String, EngineError> {
    let engine = SpecEngine::default();

    match command {
        Commands::Grade {
            source,
            size,
            range,
            profile,
            custom_multiplier,
            shrinkage,
            seam_allowance,
            unit,
        } => {
            let pattern = read_pattern(&source)?;
            let unit: Unit = unit.parse()?;
            let profile = GradingProfile::from_parts(&profile, custom_multiplier)?;
            let configuration =
                GradingConfiguration::new(profile, shrinkage as f64, seam_allowance, unit)?;

            let sizes = if size.is_empty() {
                match range {
                    Some(r) => r.parse::<SizeRange>()?.sizes(),
                    None => Size::ALL.to_vec(),
                }
            } else {
                size.iter().map(|s| s.parse()).collect::<Result<Vec<Size>, _>>()?
            };

            let request = GradeRequest { points: pattern.points, sizes, configuration };
            let table = engine.grade_table(&request)?;
            let output = serde_json::json!({
                "success": true,
                "table": table,
                "report": pattern.report,
            });
            Ok(serde_json::to_string_pretty(&output)?)
        }

        Commands::Price { source, markup } => {
            let sheet = read_costing(&source)?;
            let pricing = PricingConfiguration::new(markup as f64)?;
            let quote = engine.quote(&QuoteRequest { sheet, pricing })?;
            let output = serde_json::json!({
                "success": true,
                "quote": quote,
            });
            Ok(serde_json::to_string_pretty(&output)?)
        }

        Commands::Sizes { range } => {
            let range: SizeRange = range.parse()?;
            let output = serde_json::json!({
                "sizes": range.sizes(),
                "default": range.default_size(),
            });
            Ok(serde_json::to_string_pretty(&output)?)
        }
    }
}

fn read_pattern(source: &PayloadSource) -> Result<IngestedPattern, EngineError> {
    match (&source.payload, &source.payload_file) {
        (Some(text), _) => parse_pattern(text),
        (None, Some(path)) => load_pattern_file(path),
        (None, None) => Err(missing_source()),
    }
}

fn read_costing(source: &PayloadSource) -> Result<CostingSheet, EngineError> {
    match (&source.payload, &source.payload_file) {
        (Some(text), _) => parse_costing(text),
        (None, Some(path)) => load_costing_file(path),
        (None, None) => Err(missing_source()),
    }
}

fn missing_source() -> EngineError {
    EngineError::Payload("--payload or --payload-file is required".to_string())
}
