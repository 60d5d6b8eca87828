//! Dataset Build Tool
//!
//! Configuration-driven tool that runs the full pipeline over a daily OHLCV
//! table: indicator computation, correlation-constrained selection, fuzzy
//! encoding, per-unit model training, and artifact export.
//!
//! # Output
//!
//! - `features_full.csv` / `features_reduced.csv` / `features_fuzzy.csv`
//! - `selection.json` - which representative each group resolved to
//! - `run_summary.json` - per-unit reports, skips, and timings
//! - `run_config.toml` - copy of the configuration for reproducibility
//!
//! # Usage
//!
//! ```bash
//! # From TOML config
//! cargo run --release --bin build_dataset -- --config configs/run.toml
//!
//! # With batch overrides
//! cargo run --release --bin build_dataset -- --config configs/run.toml --threads 8 --fail-fast
//!
//! # Generate sample config
//! cargo run --release --bin build_dataset -- --generate-config configs/run.toml
//! ```

use crypto_feature_pipeline::batch::{
    BatchConfig, BatchOutput, BatchRunner, ConsoleProgress, ErrorMode, ProgressCallback,
    ProgressInfo,
};
use crypto_feature_pipeline::config::{ExperimentMetadata, PipelineConfig};
use crypto_feature_pipeline::export::RunExporter;
use crypto_feature_pipeline::pipeline::Pipeline;
use crypto_feature_pipeline::schema::{load_ohlcv, load_sentiment};

struct CliOptions {
    threads: Option<usize>,
    fail_fast: bool,
    quiet: bool,
}

/// Progress sink for `--quiet` runs.
struct QuietProgress;

impl ProgressCallback for QuietProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a path argument");
                std::process::exit(1);
            }
            let options = match parse_options(&args[3..]) {
                Ok(options) => options,
                Err(message) => {
                    eprintln!("Error: {message}");
                    print_usage(&args[0]);
                    std::process::exit(1);
                }
            };
            run_from_config(&args[2], &options);
        }
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--help" | "-h" => {
            print_usage(&args[0]);
        }
        _ => {
            eprintln!("Unknown argument: {}", args[1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Dataset Build Tool

Usage:
    {program} --config <path.toml> [options]   Run the pipeline from a config file
    {program} --generate-config <path>         Generate sample config file
    {program} --help                           Show this help

Options (after --config <path>):
    --threads <n>    Worker threads for unit training (default: all cores)
    --fail-fast      Abort on the first unit error instead of skipping
    --quiet          Suppress per-unit progress logging

Examples:
    # Full run with the default thread pool
    {program} --config configs/run.toml

    # Single-threaded, abort on first error
    {program} --config configs/run.toml --threads 1 --fail-fast
"#
    );
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions {
        threads: None,
        fail_fast: false,
        quiet: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--threads" => {
                let value = args
                    .get(i + 1)
                    .ok_or("--threads requires a number argument")?;
                let threads: usize = value
                    .parse()
                    .map_err(|_| format!("--threads expects a number, got '{value}'"))?;
                if threads == 0 {
                    return Err("--threads must be at least 1".to_string());
                }
                options.threads = Some(threads);
                i += 2;
            }
            "--fail-fast" => {
                options.fail_fast = true;
                i += 1;
            }
            "--quiet" => {
                options.quiet = true;
                i += 1;
            }
            other => return Err(format!("unknown option '{other}'")),
        }
    }

    Ok(options)
}

/// Generate a sample configuration file
fn generate_sample_config(path: &str) {
    let sample_config = PipelineConfig::new().with_metadata(ExperimentMetadata {
        name: "crypto_trend_v1".to_string(),
        description: Some(
            "Daily trend classification over the default feature groups".to_string(),
        ),
        created_at: Some(chrono::Utc::now().to_rfc3339()),
        tags: vec!["crypto".to_string(), "daily".to_string()],
    });

    match sample_config.save_toml(path) {
        Ok(()) => {
            println!("✅ Generated sample config: {path}");
            println!("\nEdit the following fields before running:");
            println!("  - data.ohlcv: Path to the long-format OHLCV CSV");
            println!("  - data.sentiment: Optional daily sentiment CSV (delete to disable)");
            println!("  - data.output_dir: Directory for run artifacts");
            println!("  - labels.horizons: Forward-return horizons in trading days");
        }
        Err(e) => {
            eprintln!("Error generating config: {e}");
            std::process::exit(1);
        }
    }
}

/// Run the pipeline from a configuration file
fn run_from_config(config_path: &str, options: &CliOptions) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                     Dataset Build Tool                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let config = match PipelineConfig::load_toml(config_path) {
        Ok(c) => {
            println!("✅ Loaded configuration: {config_path}");
            c
        }
        Err(e) => {
            eprintln!("❌ Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    print_config_summary(&config);

    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration validation failed: {e}");
        std::process::exit(1);
    }
    println!("✅ Configuration validated");
    println!();

    if let Err(e) = run_build(config, options) {
        eprintln!("❌ Build failed: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &PipelineConfig) {
    println!("┌─ Configuration Summary ───────────────────────────────────────┐");
    if let Some(metadata) = &config.metadata {
        println!("│ Experiment: {:<49} │", metadata.name);
    }
    println!("│ OHLCV:      {:<49} │", config.data.ohlcv.display());
    match &config.data.sentiment {
        Some(path) => println!("│ Sentiment:  {:<49} │", path.display()),
        None => println!("│ Sentiment:  {:<49} │", "(none, macro group unresolved)"),
    }
    println!("│ Output:     {:<49} │", config.data.output_dir.display());
    println!("│ Benchmark:  {:<49} │", config.indicators.benchmark_ticker);
    println!("│");
    println!("│ Selection:");
    println!("│   Groups:     {}", config.selection.groups.len());
    println!("│   Threshold:  {}", config.selection.threshold);
    println!("│");
    println!("│ Labels:");
    println!("│   Horizons:       {:?}", config.labels.horizons);
    println!("│   Train fraction: {}", config.labels.train_fraction);
    println!("│");
    println!("│ Search:");
    println!("│   Candidates: {}", config.search.candidates.len());
    println!("│   CV folds:   {}", config.search.n_splits);
    println!("└────────────────────────────────────────────────────────────────┘");
    println!();
}

/// Run the build process
fn run_build(
    config: PipelineConfig,
    options: &CliOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let series = load_ohlcv(&config.data.ohlcv)?;
    let total_rows: usize = series.iter().map(|s| s.dates.len()).sum();
    println!("📅 Loaded {} tickers ({} rows)", series.len(), total_rows);

    let sentiment = match &config.data.sentiment {
        Some(path) => {
            let loaded = load_sentiment(path)?;
            println!("📅 Loaded sentiment index ({} rows)", loaded.dates.len());
            Some(loaded)
        }
        None => None,
    };
    println!();

    let output_dir = config.data.output_dir.clone();
    let config_copy = config.clone();
    let pipeline = Pipeline::from_config(config)?;

    let prepared = pipeline.prepare(&series, sentiment.as_ref())?;
    print_selection_summary(&prepared.selection.groups);
    let unit_count = prepared.unit_ids(&pipeline.config().labels).len();

    let mut batch_config = BatchConfig::new().with_progress(!options.quiet);
    if let Some(threads) = options.threads {
        batch_config = batch_config.with_num_threads(threads);
    }
    if options.fail_fast {
        batch_config = batch_config.with_error_mode(ErrorMode::FailFast);
    }

    let runner = BatchRunner::new(pipeline, batch_config);
    println!("🚀 Training {unit_count} units...");
    println!();

    let output = if options.quiet {
        runner.run_prepared(&prepared, &QuietProgress)?
    } else {
        runner.run_prepared(&prepared, &ConsoleProgress)?
    };

    let exporter = RunExporter::new(&output_dir);
    let written = exporter.export_run(&prepared, &output)?;
    let unit_tables = exporter.export_unit_tables(runner.pipeline(), &prepared)?;
    config_copy.save_toml(output_dir.join("run_config.toml"))?;

    for path in &written {
        println!("📋 Wrote {}", path.display());
    }
    println!(
        "📋 Wrote {} unit tables under {}",
        unit_tables.len(),
        output_dir.join("units").display()
    );
    println!("📋 Wrote {}", output_dir.join("run_config.toml").display());
    println!();

    print_run_summary(&output);

    Ok(())
}

fn print_selection_summary(groups: &[crypto_feature_pipeline::selection::GroupSelection]) {
    println!("━━━ Feature selection ━━━");
    for group in groups {
        match &group.chosen {
            Some(feature) if group.forced => println!("  {:<8} → {feature} (forced)", group.group),
            Some(feature) => println!("  {:<8} → {feature}", group.group),
            None => println!("  {:<8} → (unresolved)", group.group),
        }
    }
    println!();
}

fn print_run_summary(output: &BatchOutput) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                       Build Complete                          ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Units trained: {:<45} ║", output.successful_count());
    println!("║  Units skipped: {:<45} ║", output.skipped_count());
    println!("║  Threads:       {:<45} ║", output.threads_used);
    println!(
        "║  Elapsed:       {:<45} ║",
        format!("{:.1}s", output.elapsed.as_secs_f64())
    );
    println!("╚══════════════════════════════════════════════════════════════╝");

    if !output.skipped.is_empty() {
        println!();
        for skipped in &output.skipped {
            println!("⚠️  Skipped {}: {}", skipped.id, skipped.reason);
        }
    }

    if !output.outcomes.is_empty() {
        let mut ranked: Vec<_> = output.outcomes.iter().collect();
        ranked.sort_by(|a, b| {
            b.report
                .model
                .macro_f1
                .total_cmp(&a.report.model.macro_f1)
        });

        println!();
        println!("━━━ Top units by test macro-F1 ━━━");
        for outcome in ranked.iter().take(5) {
            println!(
                "  {:<24} F1 {:.3}  (majority {:.3}, persistence {:.3})",
                outcome.report.id.to_string(),
                outcome.report.model.macro_f1,
                outcome.report.majority.macro_f1,
                outcome.report.persistence.macro_f1,
            );
        }
    }
}
