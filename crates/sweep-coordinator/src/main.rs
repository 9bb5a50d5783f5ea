//! sweep: inventory and tear down AWS resources across regions
//!
//! `sweep inspect` lists what is in scope. `sweep nuke` lists, then destroys
//! one resource type at a time in cleanup priority order. Nothing is
//! mutated without `--execute`.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use sweep_common::ResourceKind;
use sweep_common::defaults::{DEFAULT_CONCURRENCY, DEFAULT_LIST_RETRIES, DEFAULT_OLDER_THAN};
use sweep_coordinator::aws::{AwsContext, get_current_account_id};
use sweep_coordinator::config::{self, parse_older_than};
use sweep_coordinator::{
    HandlerRegistry, Inspection, Inspector, Inventory, OutcomeReport, Query, Selection, Terminator,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(about = "Multi-region AWS resource inventory and teardown")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Scope flags shared by `inspect` and `nuke`
#[derive(clap::Args, Debug)]
struct ScopeArgs {
    /// Region to scan (repeatable, or comma-separated)
    #[arg(long = "region", required = true, value_delimiter = ',')]
    regions: Vec<String>,

    /// Region to leave out, even if listed with --region
    #[arg(long = "exclude-region", value_delimiter = ',')]
    exclude_regions: Vec<String>,

    /// Resource type to include (default: all). See `sweep resource-types`
    #[arg(long = "resource-type", value_delimiter = ',')]
    resource_types: Vec<String>,

    /// Resource type to leave out, even if listed with --resource-type
    #[arg(long = "exclude-resource-type", value_delimiter = ',')]
    exclude_resource_types: Vec<String>,

    /// Only include resources at least this old (e.g. 30m, 24h, 7d)
    #[arg(long, default_value = DEFAULT_OLDER_THAN, value_parser = parse_older_than)]
    older_than: chrono::Duration,

    /// Maximum concurrent AWS calls
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

impl From<&ScopeArgs> for config::ScopeConfig {
    fn from(args: &ScopeArgs) -> Self {
        Self {
            regions: args.regions.clone(),
            exclude_regions: args.exclude_regions.clone(),
            resource_types: args.resource_types.clone(),
            exclude_resource_types: args.exclude_resource_types.clone(),
            older_than: args.older_than,
        }
    }
}

/// Arguments for the nuke command (boxed to keep the enum small)
#[derive(clap::Args, Debug)]
struct NukeArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Actually destroy resources (default is a dry run)
    #[arg(long)]
    execute: bool,

    /// Delete RDS databases without taking a final snapshot
    #[arg(long)]
    skip_final_snapshot: bool,

    /// Resource type to list but never destroy (repeatable)
    #[arg(long = "disable-type", value_delimiter = ',')]
    disable_types: Vec<String>,
}

impl From<&NukeArgs> for config::SweepConfig {
    fn from(args: &NukeArgs) -> Self {
        Self {
            scope: (&args.scope).into(),
            aws: config::AwsConfig {
                aws_profile: args.scope.aws_profile.clone(),
            },
            flags: config::TerminateFlags {
                execute: args.execute,
                skip_final_snapshot: args.skip_final_snapshot,
                disabled_types: args.disable_types.clone(),
                concurrency: args.scope.concurrency,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List resources in scope without touching them
    Inspect(ScopeArgs),

    /// Destroy resources in scope
    Nuke(Box<NukeArgs>),

    /// List supported resource types
    ResourceTypes,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn init_tracing() {
    // Reduce noise from the AWS SDK unless RUST_LOG says otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,aws_config=warn,aws_sdk=warn,aws_smithy=warn")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    match args.command {
        Command::Inspect(scope) => handle_inspect(scope).await,
        Command::Nuke(nuke) => handle_nuke(*nuke).await,
        Command::ResourceTypes => {
            println!("{:<12} {:<18} {:<8}", "TYPE", "DESCRIPTION", "PRIORITY");
            for kind in ResourceKind::ALL {
                println!(
                    "{:<12} {:<18} {:<8}",
                    kind.as_str(),
                    kind.description(),
                    kind.cleanup_priority()
                );
            }
            Ok(())
        }
    }
}

/// Load credentials, build the handler registry and validate the scope
async fn prepare(
    scope: &config::ScopeConfig,
    aws_profile: Option<&str>,
) -> Result<(AwsContext, Arc<HandlerRegistry>, Query)> {
    if let Some(profile) = aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let ctx = AwsContext::load(aws_profile, None).await;
    let registry = Arc::new(HandlerRegistry::aws(&ctx, DEFAULT_LIST_RETRIES));
    let params = scope.query_params(Utc::now())?;
    let query = Query::new(params, &registry).context("Invalid scan scope")?;

    Ok((ctx, registry, query))
}

/// Handle the inspect command
async fn handle_inspect(args: ScopeArgs) -> Result<()> {
    let scope = config::ScopeConfig::from(&args);
    let (_ctx, registry, query) = prepare(&scope, args.aws_profile.as_deref()).await?;

    let inspection = Inspector::new(registry, args.concurrency)
        .inspect(&query)
        .await;

    print_inventory(&inspection.inventory, args.format)?;
    report_listing_failures(&inspection);

    match inspection.error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Handle the nuke command
async fn handle_nuke(args: NukeArgs) -> Result<()> {
    let config = config::SweepConfig::from(&args);
    let format = args.scope.format;
    let terminator_config = config
        .flags
        .terminator_config()
        .context("Invalid --disable-type")?;

    let (ctx, registry, query) = prepare(&config.scope, config.aws_profile()).await?;

    // STS needs a region; any region in scope will do
    let home = query
        .regions()
        .next()
        .context("Query has no regions")?;
    let account = get_current_account_id(&ctx.in_region(home)).await?;

    let mode = if config.dry_run() { "DRY-RUN" } else { "EXECUTE" };
    eprintln!("\n=== sweep nuke ===");
    eprintln!("Account: {account}");
    eprintln!("Mode:    {mode}");
    eprintln!(
        "Regions: {}",
        query.regions().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
    );
    eprintln!();

    let inspection = Inspector::new(registry.clone(), config.concurrency())
        .inspect(&query)
        .await;
    report_listing_failures(&inspection);
    let inventory = &inspection.inventory;

    if inventory.is_empty() {
        println!("Nothing to destroy.");
        return match inspection.error() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        };
    }
    if format == OutputFormat::Table {
        print_inventory(inventory, format)?;
    }

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, letting in-flight calls finish");
                cancel.cancel();
            }
        }
    });

    let terminator = Terminator::new(registry, terminator_config).with_cancellation(cancel);

    // One phase per kind. Each phase waits for its deletions to settle, so
    // e.g. instances are terminated before their Elastic IPs are released.
    let mut kinds: Vec<ResourceKind> = query.kinds().collect();
    kinds.sort_by_key(|k| k.cleanup_priority());

    let mut report = OutcomeReport::new();
    for kind in kinds {
        let count = inventory
            .regions()
            .map(|r| inventory.region(r).count(kind))
            .sum::<usize>();
        if count == 0 {
            continue;
        }

        info!(resource_type = %kind, count, "Destroying {}s", kind.description());
        report.extend(
            terminator
                .terminate(inventory, &Selection::all().kind(kind))
                .await,
        );
    }
    ctrl_c.abort();

    print_report(&report, format, mode)?;

    if report.failed() > 0 {
        bail!("{} resource(s) could not be destroyed", report.failed());
    }
    if let Some(e) = inspection.error() {
        return Err(e.into());
    }
    Ok(())
}

fn report_listing_failures(inspection: &Inspection) {
    for failure in &inspection.failures {
        eprintln!(
            "\x1b[33mwarning:\x1b[0m {failure}: {:#}",
            failure.source
        );
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn print_inventory(inventory: &Inventory, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(inventory)?);
        return Ok(());
    }

    if inventory.is_empty() {
        println!("No resources found matching criteria.");
        return Ok(());
    }

    println!(
        "{:<16} {:<12} {:<40} {:<24} {:<20}",
        "REGION", "TYPE", "ID", "NAME", "CREATED_AT"
    );
    println!("{}", "-".repeat(116));
    for d in inventory.iter() {
        println!(
            "{:<16} {:<12} {:<40} {:<24} {:<20}",
            d.region.as_str(),
            d.kind.as_str(),
            truncate(&d.identifier, 40),
            truncate(d.name.as_deref().unwrap_or("-"), 24),
            d.created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    println!();
    for (kind, count) in inventory.counts_by_kind() {
        println!("  {:<18} {count}", format!("{}:", kind.description()));
    }
    println!("\nTotal: {} resources", inventory.total());
    Ok(())
}

fn print_report(report: &OutcomeReport, format: OutputFormat, mode: &str) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n=== Teardown Report ===");
    println!("Mode: {mode}");
    println!();
    for entry in report.entries() {
        let d = &entry.descriptor;
        println!(
            "{:<16} {:<12} {:<40} {}",
            d.region.as_str(),
            d.kind.as_str(),
            truncate(&d.identifier, 40),
            entry.outcome
        );
    }
    println!();
    println!("Destroyed: {}", report.destroyed());
    println!("Skipped:   {}", report.skipped());
    println!("Failed:    {}", report.failed());

    for (d, e) in report.failures() {
        if let Some(hint) = e.aws_error().and_then(|a| a.suggestion()) {
            println!("  {} {}: {hint}", d.kind, d.identifier);
        }
    }

    if mode == "DRY-RUN" {
        println!();
        println!("Run with --execute to actually delete resources.");
    }
    Ok(())
}
