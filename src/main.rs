//! modindex - round-based module index generator
//!
//! Scans a Rust source tree for types marked with `#[index_module]`,
//! generates an aggregator referencing every library module, and then a
//! root module for the application module once the aggregator is visible.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (invalid arguments, classification conflict, I/O, etc.)

mod analysis;
mod cli;
mod codegen;
mod config;
mod error;
mod models;
mod pipeline;
mod report;
mod scanner;

use analysis::{ModuleProcessor, RoleClassifier};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use codegen::SourceFiler;
use config::{Config, CONFIG_FILE_NAME};
use models::{BuildReport, ReportMetadata, Role};
use pipeline::{RoundDriver, SourceTree};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("modindex v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_build(args) {
        error!("Build failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .modindex.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize role traits, output directory, and scanning.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run rounds until the build settles, then report.
fn run_build(args: Args) -> Result<()> {
    let start_time = Instant::now();
    let build_date = Utc::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    if config.general.verbose {
        info!("Effective config: {:?}", config);
    }

    let scan_config = scanner::ScanConfig::from(&config.scanner);
    let classifier = RoleClassifier::from_supertypes(&config.roles);
    let out_dir = config.output_dir(&args.src);

    if args.dry_run {
        return handle_dry_run(&args.src, &out_dir, &scan_config, &classifier);
    }

    println!("🔍 Scanning {}", args.src.display());
    let mut tree = SourceTree::load(
        args.src.clone(),
        out_dir.clone(),
        scan_config,
        &config.output.module_prefix,
    )?;
    info!("Generated sources go to {}", tree.output_dir().display());

    let mut processor = ModuleProcessor::new(classifier);
    let mut filer = SourceFiler::new(tree.output_dir().to_path_buf());

    let rounds = RoundDriver::new(config.general.max_rounds).run(
        &mut tree,
        &mut processor,
        &mut filer,
    )?;

    let report = BuildReport {
        metadata: ReportMetadata {
            source_dir: args.src.clone(),
            output_dir: out_dir,
            build_date,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        rounds,
    };

    if let Some(ref report_path) = args.report {
        let output = match config.output.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report),
        };

        std::fs::write(report_path, &output)
            .with_context(|| format!("Failed to write report to {}", report_path.display()))?;
        info!("Report saved to {}", report_path.display());
    }

    let artifacts = report.artifacts();
    println!("\n📊 Build Summary:");
    println!("   Rounds: {}", report.rounds.len());
    println!("   Artifacts written: {}", artifacts.len());
    for path in &artifacts {
        println!("     📄 {}", path.display());
    }
    println!("   Duration: {:.2}s", report.metadata.duration_seconds);
    println!("\n✅ Build complete!");

    Ok(())
}

/// Handle --dry-run: scan and classify, print what would be generated, exit.
fn handle_dry_run(
    src: &Path,
    out_dir: &Path,
    scan_config: &scanner::ScanConfig,
    classifier: &RoleClassifier,
) -> Result<()> {
    println!("\n🔍 Dry run: scanning {} (nothing is written)...\n", src.display());

    let mut config = scan_config.clone();
    config.excluded_dirs.push(scanner::resolve_dir(out_dir)?);

    let parsed = scanner::SourceScanner::new(scanner::resolve_dir(src)?, config, "crate").scan()?;
    let marked: Vec<_> = parsed.marked_units().collect();

    if marked.is_empty() {
        println!("   No marked modules found.");
        println!("\n✅ Dry run complete.");
        return Ok(());
    }

    let mut invalid = 0;
    for unit in &marked {
        let role = classifier.classify(unit);
        let icon = match role {
            Role::Root => "🏠",
            Role::Primary => "📦",
            Role::Invalid => {
                invalid += 1;
                "❌"
            }
        };
        println!("     {} {} ({})", icon, unit, role);
    }
    println!("\n   Total: {} marked modules", marked.len());

    if invalid > 0 {
        warn!("{} marked modules match no recognized shape", invalid);
        println!(
            "\n⚠️  {} modules would fail the build; they must implement {}.",
            invalid,
            classifier.shapes()
        );
    }

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
