//! treetidy - duplicate consolidation planner
//!
//! Scans a messy file tree and produces a safe, auditable plan: exact
//! duplicates grouped by BLAKE3 hash, near-duplicate variants scored by line
//! similarity, files that break the directory layout flagged, and an ordered
//! list of KEEP/REMOVE/MOVE actions. Files are only touched when a reviewed
//! plan is applied.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod plan;
pub mod policy;
pub mod progress;
pub mod quality;
pub mod scanner;
pub mod signal;

use anyhow::Context;
use std::io::Write;
use std::sync::Arc;
use yansi::Paint;

use crate::cache::HashCache;
use crate::cli::{Cli, Commands, OutputFormat, TuningArgs};
use crate::config::{EngineConfig, Mode};
use crate::engine::Engine;
use crate::error::ExitCode;
use crate::output::{render_summary, DEFAULT_ACTION_LIMIT};
use crate::plan::Preflight;
use crate::progress::{Progress, ProgressCallback};

/// Run the CLI and return the exit code for a completed run.
///
/// # Errors
///
/// Returns an error for anything that stops a run before a report exists;
/// [`ExitCode::from_error`] maps it to an exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let mut config = EngineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
        Commands::Plan(args) => {
            args.tuning.apply_to(&mut config);
            config.mode = Mode::DryRun;
            run_engine(config, &args.tuning, None, cli.quiet)
        }
        Commands::Apply(args) => {
            args.tuning.apply_to(&mut config);
            config.mode = Mode::Live;
            if args.permanent {
                config.use_trash = false;
            }
            let preflight = Preflight::from_report_file(&args.preflight)?;
            run_engine(config, &args.tuning, Some(preflight), cli.quiet)
        }
    }
}

fn run_engine(
    config: EngineConfig,
    tuning: &TuningArgs,
    preflight: Option<Preflight>,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let handler = signal::install_handler()?;
    let hide_progress = quiet || tuning.output == OutputFormat::Json;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(hide_progress));

    let mut engine = Engine::new(config)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);

    if let Some(ref path) = tuning.cache_report {
        match HashCache::from_report_file(path) {
            Ok(cache) => engine = engine.with_cache(Arc::new(cache)),
            Err(e) => log::warn!("Ignoring cache report: {}", e),
        }
    }
    if let Some(preflight) = preflight {
        engine = engine.with_preflight(preflight);
    }

    let report = engine.run(&tuning.root)?;

    if let Some(ref path) = tuning.report {
        report
            .write_to_file(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    match tuning.output {
        OutputFormat::Json => {
            let mut stdout = std::io::stdout().lock();
            report.write_to(&mut stdout, true)?;
        }
        OutputFormat::Text if !quiet => {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{}", render_summary(&report, DEFAULT_ACTION_LIMIT))?;
            if report.mode == Mode::DryRun && !report.actions.is_empty() {
                writeln!(
                    stdout,
                    "{}",
                    "Dry run: nothing was changed. Save the report with --report and pass it to `apply --preflight`."
                        .dim()
                )?;
            }
        }
        OutputFormat::Text => {}
    }

    Ok(report.exit_code())
}
