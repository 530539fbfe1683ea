use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lapcheck_client::browser::parse_window_size;
use lapcheck_client::{BrowserOptions, ChromeSession};
use lapcheck_core::{
    AppError, ConsoleRunReporter, RunConfig, RunReport, Scenario, ScenarioResolver, ScenarioRunner,
    TracingRunReporter,
};

#[derive(Parser)]
#[command(
    name = "lapcheck",
    version,
    about = "Headless-browser checks for the vector racing game"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario against the game page
    Run {
        /// Built-in name, name in the scenarios directory, or path to a JSON file
        #[arg(default_value = "crash")]
        scenario: String,

        /// Page to load instead of the scenario's local page (e.g. "index.html")
        #[arg(short, long)]
        page: Option<String>,

        /// Directory pages and screenshots are resolved against (defaults to cwd)
        #[arg(short, long, env = "LAPCHECK_BASE_DIR")]
        base_dir: Option<PathBuf>,

        /// Directory searched for `<name>.json` scenario files (relative to the base directory)
        #[arg(long, env = "LAPCHECK_SCENARIOS_DIR", default_value = "scenarios")]
        scenarios_dir: PathBuf,

        /// Default wait timeout for selectors, in milliseconds
        #[arg(short, long, env = "LAPCHECK_WAIT_TIMEOUT_MS", default_value_t = 30_000)]
        timeout_ms: u64,

        /// Exit 1 when a check fails (by default the verdict is only printed)
        #[arg(long, default_value_t = false)]
        fail_on_mismatch: bool,

        /// Print the run report as JSON instead of status lines
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also write the JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Show the browser window
        #[arg(long, default_value_t = false)]
        headed: bool,

        /// Browser window size, WIDTHxHEIGHT
        #[arg(long, default_value = "1280x720")]
        window: String,

        /// Chrome/Chromium binary to launch
        #[arg(long, env = "CHROME_BIN")]
        chrome_bin: Option<PathBuf>,
    },

    /// List available scenarios
    List {
        #[arg(short, long, env = "LAPCHECK_BASE_DIR")]
        base_dir: Option<PathBuf>,

        #[arg(long, env = "LAPCHECK_SCENARIOS_DIR", default_value = "scenarios")]
        scenarios_dir: PathBuf,
    },

    /// Print a resolved scenario as JSON
    Show {
        scenario: String,

        #[arg(short, long, env = "LAPCHECK_BASE_DIR")]
        base_dir: Option<PathBuf>,

        #[arg(long, env = "LAPCHECK_SCENARIOS_DIR", default_value = "scenarios")]
        scenarios_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries status lines or the JSON report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lapcheck=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            page,
            base_dir,
            scenarios_dir,
            timeout_ms,
            fail_on_mismatch,
            json,
            report,
            headed,
            window,
            chrome_bin,
        } => {
            let run = async {
                let config = run_config(base_dir, page, timeout_ms)?;
                let options = BrowserOptions {
                    headless: !headed,
                    chrome_bin,
                    window: parse_window_size(&window)?,
                    ..BrowserOptions::default()
                };

                let root = scenarios_root(&config.base_dir, &scenarios_dir);
                let resolved = ScenarioResolver::new(root).resolve(&scenario)?;
                if let Some(path) = &resolved.path {
                    tracing::info!("Using scenario file {}", path.display());
                }

                cmd_run(&resolved.scenario, config, &options, json).await
            };

            let run_report = match run.await {
                Ok(r) => r,
                Err(e) => {
                    if e.is_page_fault() {
                        tracing::error!("The page did not behave as scenario '{scenario}' expects");
                    }
                    if json {
                        println!("{}", error_json(&e));
                    }
                    return Err(e.into());
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&run_report)?);
            }
            if let Some(path) = report {
                write_report(&run_report, &path)?;
                tracing::info!("Run report written to {}", path.display());
            }

            Ok(exit_code(&run_report, fail_on_mismatch))
        }
        Commands::List {
            base_dir,
            scenarios_dir,
        } => {
            let root = scenarios_root(&base_or_cwd(base_dir)?, &scenarios_dir);
            for name in ScenarioResolver::new(root).list()? {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Show {
            scenario,
            base_dir,
            scenarios_dir,
        } => {
            let root = scenarios_root(&base_or_cwd(base_dir)?, &scenarios_dir);
            let resolved = ScenarioResolver::new(root).resolve(&scenario)?;
            println!("{}", serde_json::to_string_pretty(&resolved.scenario)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn base_or_cwd(base_dir: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match base_dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

/// Validated run settings rooted at `base_dir` (or the cwd).
fn run_config(
    base_dir: Option<PathBuf>,
    page: Option<String>,
    timeout_ms: u64,
) -> Result<RunConfig, AppError> {
    let mut config =
        RunConfig::new(base_or_cwd(base_dir)?).with_wait_timeout(Duration::from_millis(timeout_ms));
    if let Some(page) = page {
        config = config.with_page_override(page);
    }
    config.validate()
}

/// A relative scenarios directory lives under the base directory.
fn scenarios_root(base_dir: &Path, scenarios_dir: &Path) -> PathBuf {
    if scenarios_dir.is_absolute() {
        scenarios_dir.to_path_buf()
    } else {
        base_dir.join(scenarios_dir)
    }
}

/// Launch the browser, run the scenario, and always tear the browser down.
async fn cmd_run(
    scenario: &Scenario,
    config: RunConfig,
    options: &BrowserOptions,
    json: bool,
) -> Result<RunReport, AppError> {
    let session = ChromeSession::launch(options).await?;

    let result = tokio::select! {
        r = run_in_session(&session, scenario, config, json) => r,
        _ = tokio::signal::ctrl_c() => Err(AppError::Generic("Interrupted".into())),
    };

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Browser did not shut down cleanly");
    }

    result
}

async fn run_in_session(
    session: &ChromeSession,
    scenario: &Scenario,
    config: RunConfig,
    json: bool,
) -> Result<RunReport, AppError> {
    let page = session.new_page().await?;
    let runner = ScenarioRunner::new(&page, config);

    if json {
        runner.run(scenario, &TracingRunReporter).await
    } else {
        runner.run(scenario, &ConsoleRunReporter::stdout()).await
    }
}

/// Exit status for a finished run: failed checks only exit 1 when asked to.
fn exit_code(report: &RunReport, fail_on_mismatch: bool) -> ExitCode {
    if report.passed() || !fail_on_mismatch {
        ExitCode::SUCCESS
    } else {
        for check in report.failed_checks() {
            tracing::warn!(
                "Check '{}' failed: expected {:?}, got {:?}",
                check.label,
                check.expected,
                check.actual
            );
        }
        ExitCode::FAILURE
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(report)?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

fn error_json(err: &AppError) -> serde_json::Value {
    serde_json::json!({
        "error": err.kind(),
        "message": err.to_string(),
    })
}
