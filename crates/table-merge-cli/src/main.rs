//! table-merge CLI - plan many-to-one consolidation of sharded tables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use table_merge::{
    validate, Config, HeuristicProposer, MigrationPlan, PlanError, Planner, RuleOutcome,
    SnapshotCatalog, ValidationVerdict,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "table-merge")]
#[command(about = "Reconcile sharded table structures and synthesize routing rules")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify tables and report mapping patterns
    Analyze,

    /// Build a full plan, including routing rules for consolidated shards
    Plan,

    /// Check a rule against names it must and must not match
    ValidateRule {
        /// Rule in the pattern dialect
        #[arg(long)]
        pattern: String,

        /// Comma-separated names the rule must match
        #[arg(long = "match", value_delimiter = ',', required = true)]
        must_match: Vec<String>,

        /// Comma-separated names the rule must not match
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), PlanError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(PlanError::Config)?;

    // Handle validate-rule separately (doesn't need a config file)
    if let Commands::ValidateRule {
        ref pattern,
        ref must_match,
        ref exclude,
    } = cli.command
    {
        let verdict = validate(pattern, must_match, exclude);
        if cli.output_json {
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        } else {
            print_verdict(&verdict);
        }
        if !verdict.valid {
            return Err(PlanError::Incomplete(format!("rule '{}' is not valid", pattern)));
        }
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let snapshot = config
        .catalog
        .snapshot
        .clone()
        .ok_or_else(|| PlanError::Config("catalog.snapshot is required".to_string()))?;
    let catalog = SnapshotCatalog::load(&snapshot)?;
    info!("Loaded catalog snapshot from {:?}", snapshot);

    // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler()?;

    let planner = Planner::new(config, Arc::new(catalog), Arc::new(HeuristicProposer));

    match cli.command {
        Commands::ValidateRule { .. } => unreachable!(), // Handled above

        Commands::Analyze => {
            let plan = planner.analyze(cancel_token).await?;
            if cli.output_json {
                println!("{}", plan.to_json()?);
            } else {
                print_patterns(&plan);
            }
        }

        Commands::Plan => {
            let plan = planner.plan(cancel_token).await?;
            if cli.output_json {
                println!("{}", plan.to_json()?);
            } else {
                print_plan(&plan);
            }
            if !plan.is_complete() {
                let summary = plan.summary();
                return Err(PlanError::Incomplete(format!(
                    "{} unresolved mappings, {} failed rules",
                    summary.unresolved, summary.rules_failed
                )));
            }
        }
    }

    Ok(())
}

fn print_verdict(verdict: &ValidationVerdict) {
    if verdict.valid {
        println!("Rule '{}' is valid", verdict.rule);
        return;
    }
    println!("Rule '{}' is NOT valid", verdict.rule);
    if !verdict.missed_matches.is_empty() {
        println!("  Missed matches: {}", verdict.missed_matches.join(", "));
    }
    if !verdict.false_positives.is_empty() {
        println!("  False positives: {}", verdict.false_positives.join(", "));
    }
    if let Some(ref err) = verdict.error {
        println!("  Error: {}", err);
    }
}

fn print_patterns(plan: &MigrationPlan) {
    println!("\nAnalysis completed!");
    println!("  Run ID: {}", plan.run_id);
    for (group, mappings) in plan.patterns() {
        println!("\n{} ({})", group, mappings.len());
        for m in mappings {
            println!("  {}", m.mapping);
        }
    }
    println!("\n{}", plan.summary());
}

fn print_plan(plan: &MigrationPlan) {
    let status_msg = if plan.is_complete() {
        "Plan completed!"
    } else {
        "Plan completed with unresolved items"
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", plan.run_id);
    println!("  Duration: {:.2}s", plan.duration_seconds);
    for m in &plan.mappings {
        println!("  {}", m.mapping);
        match m.rule {
            Some(RuleOutcome::Synthesized(ref rule)) => println!("    rule: {}", rule),
            Some(RuleOutcome::Failed(ref failure)) => println!("    rule failed: {}", failure),
            None => {}
        }
    }
    println!("\n{}", plan.summary());
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json stays parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().try_init().map_err(|e| e.to_string())
    } else {
        subscriber.try_init().map_err(|e| e.to_string())
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, PlanError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Cancelling planning run..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Cancelling planning run..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, PlanError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling planning run...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
