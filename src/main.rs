use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

use cpetrs::config::AppConfig;
use cpetrs::engines::EngineResults;
use cpetrs::import::{load_engine_results, load_profile, SignalTableImporter};
use cpetrs::kinetics::KineticPhenotypeClassifier;
use cpetrs::limiters::{Limiter, LimiterScorer};
use cpetrs::logging::{init_logging, LogLevel};
use cpetrs::models::TrainingProfile;
use cpetrs::plan::PlanGenerator;
use cpetrs::report::run_full_analysis;
use cpetrs::snapshot::PhysioSnapshotBuilder;

/// cpetrs - CPET Interpretation CLI
///
/// Turns a cardiopulmonary exercise test recording plus upstream engine
/// results into a limiter diagnosis, a kinetic phenotype, cross-signal
/// composites and a weekly training plan.
#[derive(Parser)]
#[command(name = "cpetrs")]
#[command(version = "0.1.0")]
#[command(about = "CPET interpretation and training plan generation", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis: limiters, plan, phenotype, cross-correlation
    Analyze {
        /// Signal table CSV (Time_s plus physiological channels)
        #[arg(short, long)]
        signals: PathBuf,

        /// Engine results JSON (keyed E01..E19)
        #[arg(short, long)]
        results: PathBuf,

        /// Athlete training profile JSON
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Output report path (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate only the limiter diagnosis and weekly plan
    Plan {
        /// Engine results JSON (keyed E01..E19)
        #[arg(short, long)]
        results: PathBuf,

        /// Athlete training profile JSON
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Output plan path (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify only the kinetic phenotype
    Phenotype {
        /// Engine results JSON (keyed E01..E19)
        #[arg(short, long)]
        results: PathBuf,

        /// Output report path (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Tabled)]
struct LimiterRow {
    #[tabled(rename = "Priority")]
    priority: u8,
    #[tabled(rename = "Limiter")]
    limiter: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Method")]
    method: String,
}

impl From<&Limiter> for LimiterRow {
    fn from(limiter: &Limiter) -> Self {
        Self {
            priority: limiter.priority,
            limiter: limiter.kind.to_string(),
            score: format!("{:.0}", limiter.score),
            method: limiter.method.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_default(&config_path)?;
    if cli.verbose > 0 {
        config.logging.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Analyze {
            signals,
            results,
            profile,
            output,
        } => analyze(&config, &signals, &results, profile.as_deref(), output.as_deref()),
        Commands::Plan {
            results,
            profile,
            output,
        } => plan(&config, &results, profile.as_deref(), output.as_deref()),
        Commands::Phenotype { results, output } => {
            phenotype(&config, &results, output.as_deref())
        }
    }
}

fn analyze(
    config: &AppConfig,
    signals: &Path,
    results: &Path,
    profile: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    println!("{}", "Analyzing CPET recording...".green().bold());

    let table = SignalTableImporter::from_csv_path(signals)
        .with_context(|| format!("loading signal table {}", signals.display()))?;
    let result_set = load_engine_results(results)?;
    let profile = load_profile_or_default(profile)?;

    let report = run_full_analysis(&table, &result_set, &profile);

    println!(
        "  Fitness: {} ({:.1} ml/kg/min)",
        report.snapshot.capacity.fitness_class.to_string().cyan(),
        report.snapshot.capacity.vo2max_ml_kg_min
    );
    print_limiters(&report.limiters);
    if let Some(archetype) = report.phenotype.archetype {
        println!(
            "  Phenotype: {} (confidence {:.0}%)",
            archetype.to_string().cyan(),
            report.phenotype.archetype_confidence * 100.0
        );
    } else {
        println!("  Phenotype: {:?}", report.phenotype.status);
    }
    if let Some(triangulation) = &report.cross_correlation.triangulation {
        println!(
            "  Limitation: {} ({:.0}% of weighted evidence)",
            triangulation.dominant.cyan(),
            triangulation.confidence_pct
        );
    }
    println!("  Plan: {}", report.plan.philosophy.cyan());

    write_artifact(config, output, &report)?;
    println!("{}", "✓ Analysis completed".green());
    Ok(())
}

fn plan(
    config: &AppConfig,
    results: &Path,
    profile: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    println!("{}", "Generating training plan...".blue().bold());

    let result_set = load_engine_results(results)?;
    let profile = load_profile_or_default(profile)?;
    let typed = EngineResults::from_result_set(&result_set);
    let snapshot = PhysioSnapshotBuilder::build(&typed);
    let limiters = LimiterScorer::score_limiters(&snapshot, &profile);
    let plan = PlanGenerator::generate(&snapshot, &profile, limiters);

    print_limiters(&plan.limiters);
    println!("  Philosophy: {}", plan.philosophy.cyan());
    for session in &plan.sessions {
        println!(
            "  {:<9} {:<8} Z{} {:>3} min  {}",
            session.day,
            session.session_type.to_string(),
            session.zone,
            session.duration_min,
            session.description
        );
    }

    write_artifact(config, output, &plan)?;
    println!("{}", "✓ Plan generated".blue());
    Ok(())
}

fn phenotype(config: &AppConfig, results: &Path, output: Option<&Path>) -> Result<()> {
    println!("{}", "Classifying kinetic phenotype...".cyan().bold());

    let result_set = load_engine_results(results)?;
    let typed = EngineResults::from_result_set(&result_set);
    let snapshot = PhysioSnapshotBuilder::build(&typed);
    let report = KineticPhenotypeClassifier::classify(&typed, &snapshot);

    match report.archetype {
        Some(archetype) => println!(
            "  Archetype: {} (confidence {:.0}%)",
            archetype.to_string().cyan(),
            report.archetype_confidence * 100.0
        ),
        None => println!("  Status: {:?}", report.status),
    }
    for flag in &report.flags {
        println!("  {} {}", "flag:".yellow(), flag);
    }

    write_artifact(config, output, &report)?;
    println!("{}", "✓ Phenotype classified".cyan());
    Ok(())
}

fn print_limiters(limiters: &[Limiter]) {
    if limiters.is_empty() {
        println!("  No limiter evidence; using the generic profile.");
        return;
    }
    let rows: Vec<LimiterRow> = limiters.iter().map(LimiterRow::from).collect();
    println!("{}", Table::new(rows));
}

fn load_profile_or_default(path: Option<&Path>) -> Result<TrainingProfile> {
    match path {
        Some(path) => Ok(load_profile(path)?),
        None => Ok(TrainingProfile::default()),
    }
}

fn write_artifact<T: serde::Serialize>(
    config: &AppConfig,
    output: Option<&Path>,
    artifact: &T,
) -> Result<()> {
    let Some(output) = output else {
        return Ok(());
    };
    let path = if output.is_absolute() {
        output.to_path_buf()
    } else {
        config.settings.output_dir.join(output)
    };
    let json = if config.settings.pretty_json {
        serde_json::to_string_pretty(artifact)?
    } else {
        serde_json::to_string(artifact)?
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("  Report: {}", path.display());
    Ok(())
}
