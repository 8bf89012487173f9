use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use once_cell::sync::{Lazy, OnceCell};
use speedsift_protocol::{
    lock_ledger, MatchMode, ResolutionResult, ResourceKind, ResourceLedger,
};
use speedsift_resolver::DirectoryCache;
use speedsift_runner::{PackageManager, ToolOverrides};

mod config;
mod report;

use report::RunTally;

/// Every ephemeral artifact of the run ends up here; teardown drains it
/// exactly once, from whichever exit path gets there first.
static LEDGER: Lazy<Mutex<ResourceLedger>> = Lazy::new(|| Mutex::new(ResourceLedger::new()));
static PKG: OnceCell<Option<PackageManager>> = OnceCell::new();
static KEEP_WORKSPACE: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "speedsift")]
#[command(about = "Locate benchmark servers from loose hints and measure against them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Test plan file (TOML); omit to use the built-in plan
    #[arg(long, global = true)]
    plan: Option<PathBuf>,

    /// Matching semantics: 'and' (combined haystack) or 'or' (per-field)
    #[arg(long, global = true, value_parser = parse_match_mode)]
    match_mode: Option<MatchMode>,

    /// Override the primary benchmark tool program
    #[arg(long, global = true)]
    primary_bin: Option<PathBuf>,

    /// Override the fallback benchmark tool program
    #[arg(long, global = true)]
    secondary_bin: Option<PathBuf>,

    /// Leave the run workspace on disk for inspection
    #[arg(long, global = true)]
    keep_workspace: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and measure every configured query
    Run,

    /// Resolve queries against a directory snapshot without measuring
    Resolve(SnapshotArgs),

    /// Fetch (or load) the directory and print the advertised servers
    Servers(SnapshotArgs),

    /// Print the effective test plan
    Plan,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Load the directory from a snapshot file instead of fetching
    #[arg(long)]
    directory: Option<PathBuf>,
}

fn parse_match_mode(s: &str) -> std::result::Result<MatchMode, String> {
    s.parse()
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    KEEP_WORKSPACE.store(cli.keep_workspace, Ordering::SeqCst);

    // Family detection happens once, before anything can be installed, so the
    // interrupt path always knows how to uninstall.
    PKG.get_or_init(PackageManager::detect);

    ctrlc::set_handler(|| {
        log::warn!("interrupted; cleaning up");
        run_teardown();
        std::process::exit(130);
    })
    .context("Failed to register interrupt handler")?;

    let outcome = dispatch(&cli);
    run_teardown();
    outcome
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

/// Drain the ledger and undo everything it recorded.
///
/// Runs on the normal exit path and from the interrupt handler; the drain
/// itself is the idempotency guard, so whichever path arrives second finds an
/// empty ledger and does nothing.
fn run_teardown() {
    let entries = lock_ledger(&LEDGER).drain();
    if entries.is_empty() {
        return;
    }
    let pkg = PKG.get().and_then(|detected| detected.as_ref());
    speedsift_runner::teardown(entries, pkg, KEEP_WORKSPACE.load(Ordering::SeqCst));
}

fn dispatch(cli: &Cli) -> Result<()> {
    let plan = config::load_plan(cli.plan.as_deref())?;
    let mode = cli.match_mode.or(plan.match_mode).unwrap_or_default();

    match &cli.command {
        Commands::Run => run_benchmarks(cli, &plan, mode),
        Commands::Resolve(args) => run_resolve(cli, &plan, mode, args),
        Commands::Servers(args) => run_servers(cli, args),
        Commands::Plan => run_plan(&plan, mode),
    }
}

fn tool_overrides(cli: &Cli) -> ToolOverrides {
    ToolOverrides {
        primary: cli.primary_bin.clone(),
        secondary: cli.secondary_bin.clone(),
    }
}

fn detected_pkg() -> Option<&'static PackageManager> {
    PKG.get_or_init(PackageManager::detect).as_ref()
}

/// Create this run's temporary workspace and put it on the ledger before
/// anything is written into it.
fn create_workspace() -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("speedsift-")
        .tempdir()
        .context("Failed to create run workspace")?;
    // Removal is the ledger's job, not the TempDir guard's: a guard would not
    // run on the interrupt path.
    let path = dir.into_path();
    lock_ledger(&LEDGER).register(ResourceKind::TempWorkspace, path.display().to_string());
    log::debug!("run workspace at {}", path.display());
    Ok(path)
}

fn acquire_directory(cli: &Cli, snapshot: Option<&Path>) -> Result<DirectoryCache> {
    if let Some(path) = snapshot {
        return DirectoryCache::load(path)
            .with_context(|| format!("Failed to load directory snapshot {}", path.display()));
    }
    let tool = speedsift_runner::select_tool(detected_pkg(), &LEDGER, &tool_overrides(cli))?;
    let Some(mut list_command) = tool.list_command() else {
        bail!("The fallback tool cannot list servers; pass --directory <snapshot>");
    };
    let workspace = create_workspace()?;
    DirectoryCache::fetch(&mut list_command, &workspace, &LEDGER)
        .context("Failed to fetch the server directory")
}

/// The full pipeline: select tool, build the directory once, then resolve and
/// measure each configured query strictly in order. Two simultaneous
/// throughput measurements would invalidate each other, so there is exactly
/// one thread of control here.
fn run_benchmarks(cli: &Cli, plan: &config::TestPlan, mode: MatchMode) -> Result<()> {
    for warning in config::validate(plan) {
        log::warn!("plan: {warning}");
    }

    let tool = speedsift_runner::select_tool(detected_pkg(), &LEDGER, &tool_overrides(cli))?;

    let Some(mut list_command) = tool.list_command() else {
        // Degraded mode: the fallback has no server-selection capability, so
        // the per-location queries are skipped, not retried against it.
        report::degraded(plan.query_count());
        let outcome = speedsift_runner::execute(&tool, None);
        report::undirected_outcome(&outcome);
        if outcome.is_fatal() {
            bail!(
                "Fallback tool {} could not start",
                tool.program().display()
            );
        }
        report::degraded_summary(&outcome);
        return Ok(());
    };

    let workspace = create_workspace()?;
    let cache = DirectoryCache::fetch(&mut list_command, &workspace, &LEDGER)
        .context("Failed to fetch the server directory")?;

    let mut tally = RunTally::default();
    for group in &plan.groups {
        report::group(&group.name);
        for spec in &group.tests {
            let query = spec.to_query();
            report::searching(&query);

            let resolution = speedsift_resolver::resolve(cache.directory(), &query, mode);
            let outcome = match &resolution {
                ResolutionResult::Matched { server_id } => {
                    report::found(&query, server_id);
                    speedsift_runner::execute(&tool, Some(server_id.as_str()))
                }
                ResolutionResult::NoMatch => {
                    report::no_match(&query);
                    speedsift_runner::execute(&tool, None)
                }
            };
            report::outcome(&query, &outcome);
            tally.record(&outcome);

            if outcome.is_fatal() {
                report::summary(&tally);
                bail!(
                    "Benchmark tool {} could not start; aborting remaining queries",
                    tool.program().display()
                );
            }
        }
    }
    report::summary(&tally);
    Ok(())
}

fn run_resolve(
    cli: &Cli,
    plan: &config::TestPlan,
    mode: MatchMode,
    args: &SnapshotArgs,
) -> Result<()> {
    let cache = acquire_directory(cli, args.directory.as_deref())?;
    for group in &plan.groups {
        report::group(&group.name);
        for spec in &group.tests {
            let query = spec.to_query();
            let resolution = speedsift_resolver::resolve(cache.directory(), &query, mode);
            report::resolution(&query, &resolution);
        }
    }
    Ok(())
}

fn run_servers(cli: &Cli, args: &SnapshotArgs) -> Result<()> {
    let cache = acquire_directory(cli, args.directory.as_deref())?;
    for entry in cache.directory().entries() {
        report::server_entry(entry);
    }
    log::info!("{} servers advertised", cache.directory().len());
    Ok(())
}

fn run_plan(plan: &config::TestPlan, mode: MatchMode) -> Result<()> {
    println!("match mode: {mode}");
    for group in &plan.groups {
        report::group(&group.name);
        for spec in &group.tests {
            let query = spec.to_query();
            println!(
                "[{}] keyword='{}' location='{}'",
                query.label, query.keyword, query.location
            );
        }
    }
    for warning in config::validate(plan) {
        log::warn!("plan: {warning}");
    }
    Ok(())
}
