//! quest-test - runs QuEST unit test files against a compiled library

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use quest_harness::{ALL_SET, HarnessConfig, NativeBackend, Session, Summary, gen_tests};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "quest-test.toml";

#[derive(Parser)]
#[command(name = "quest-test")]
#[command(author = "QuEST Test Contributors")]
#[command(version = "2026.10.17")]
#[command(about = "Test runner for the QuEST simulator library", long_about = None)]
struct Cli {
    /// Config file (defaults to ./quest-test.toml when present)
    #[arg(short, long, value_name = "FILE", env = "QUEST_CONFIG")]
    config: Option<PathBuf>,

    /// Shared library exporting the QuEST API
    #[arg(short, long, value_name = "PATH", env = "QUEST_LIBRARY")]
    library: Option<PathBuf>,

    /// Directory holding <function>.test files
    #[arg(short, long, value_name = "DIR", env = "QUEST_UNIT_PATH")]
    unit_path: Option<PathBuf>,

    /// Result log file
    #[arg(long, value_name = "FILE", env = "QUEST_LOG")]
    log: Option<PathBuf>,

    /// Comparison tolerance
    #[arg(short, long, env = "QUEST_TOLERANCE")]
    tolerance: Option<f64>,

    /// No progress output
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the standard tests of test sets or functions
    Run {
        /// Set or function names
        #[arg(value_name = "SET", default_value = ALL_SET)]
        sets: Vec<String>,
    },

    /// Run single test files
    File {
        /// Path to a .test file, or a name under the unit path
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },

    /// Generate test files from the loaded library
    Generate {
        /// Set or function names
        #[arg(value_name = "SET", default_value = ALL_SET)]
        sets: Vec<String>,
    },

    /// List testable functions and test sets
    List,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quest_harness=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| match &cli.command {
        Commands::Run { sets } => run_command(&config, sets),
        Commands::File { files } => file_command(&config, files),
        Commands::Generate { sets } => generate_command(&config, sets),
        Commands::List => list_command(&config).map(|_| true),
    });

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => HarnessConfig::from_file(Path::new(DEFAULT_CONFIG))?,
        None => HarnessConfig::default(),
    };

    if let Some(library) = &cli.library {
        config.library = library.clone();
    }
    if let Some(unit_path) = &cli.unit_path {
        config.unit_path = unit_path.clone();
    }
    if let Some(log) = &cli.log {
        config.log_file = log.clone();
    }
    if let Some(tolerance) = cli.tolerance {
        config.tolerance = tolerance;
    }
    config.quiet |= cli.quiet;

    config.validate()?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn open_session(config: &HarnessConfig) -> Result<Session<NativeBackend>> {
    let catalogue = config.catalogue()?;
    let backend = NativeBackend::load(&config.library)
        .with_context(|| format!("cannot load QuEST from {}", config.library.display()))?;
    Ok(Session::init(config, catalogue, backend)?)
}

fn report(summary: Summary) -> bool {
    if !summary.all_passed() {
        eprintln!(
            "{} {} of {} tests failed",
            "FAILED".red().bold(),
            summary.fails,
            summary.num_tests
        );
    }
    summary.all_passed()
}

// ============================================================================
// Test commands
// ============================================================================

fn run_command(config: &HarnessConfig, sets: &[String]) -> Result<bool> {
    let mut session = open_session(config)?;
    for set in sets {
        session.run_set(set)?;
    }
    Ok(report(session.finalise()?))
}

fn file_command(config: &HarnessConfig, files: &[String]) -> Result<bool> {
    let mut session = open_session(config)?;
    for file in files {
        if let Err(e) = session.run_cust_test(file) {
            eprintln!("\n{} {}", "error:".red().bold(), e);
            session.results_mut().fail_test(file, &e.to_string())?;
        }
    }
    Ok(report(session.finalise()?))
}

fn generate_command(config: &HarnessConfig, sets: &[String]) -> Result<bool> {
    if config.unit_path.exists() && !config.unit_path.is_dir() {
        bail!("unit path {} is not a directory", config.unit_path.display());
    }
    fs::create_dir_all(&config.unit_path)?;

    let mut session = open_session(config)?;
    let written = gen_tests(&mut session, sets)?;
    session.finalise()?;

    println!(
        "{} {} test files in {}",
        "Generated".green().bold(),
        written,
        config.unit_path.display().to_string().cyan()
    );
    Ok(true)
}

// ============================================================================
// Catalogue
// ============================================================================

fn list_command(config: &HarnessConfig) -> Result<()> {
    let catalogue = config.catalogue()?;

    println!("{}", "Functions:".bold());
    for testee in catalogue.list_funcs() {
        let mut notes = Vec::new();
        if testee.density {
            notes.push("density");
        }
        if testee.defaults.is_none() || catalogue.is_generation_excluded(testee.name()) {
            notes.push("no generate");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", ")).dimmed().to_string()
        };
        println!("  {:<28} {}{}", testee.name().cyan(), testee.signature, notes);
    }

    println!();
    println!("{}", "Sets:".bold());
    for (name, members) in catalogue.sets() {
        println!("  {:<16} {}", name.green(), members.join(" "));
    }
    println!("  {:<16} {}", ALL_SET.green(), "every function".dimmed());

    Ok(())
}
