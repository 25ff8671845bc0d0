//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `pan_check` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use pan_check::config::{
    DB_PATH, DEFAULT_BATCH_TIMEOUT_SECS, DEFAULT_CHECK_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_PER_PLATFORM_CONCURRENCY, DEFAULT_PER_PLATFORM_RPS,
    DEFAULT_REQUIRED_CONFIRMATIONS, DEFAULT_SCHEDULER_INTERVAL_SECS, DEFAULT_USER_AGENT,
};
use pan_check::initialization::init_logger_with;
use pan_check::{
    print_batch_summary, print_error_statistics, Config, LinkEngine, LogFormat, LogLevel,
    PlatformEndpoints, Platform,
};

/// Check cloud-storage share links and keep re-checking them.
#[derive(Debug, Parser)]
#[command(name = "pan_check", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Log level: error/warn/info/debug/trace
    #[arg(long, value_enum, default_value = "info", env = "PAN_CHECK_LOG_LEVEL", global = true)]
    log_level: LogLevel,

    /// Log format: plain/json
    #[arg(long, value_enum, default_value = "plain", env = "PAN_CHECK_LOG_FORMAT", global = true)]
    log_format: LogFormat,

    /// SQLite database path (":memory:" for a throwaway store)
    #[arg(long, default_value = DB_PATH, env = "PAN_CHECK_DB_PATH", global = true)]
    db_path: PathBuf,

    /// Maximum concurrent checks across all platforms
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY, env = "PAN_CHECK_MAX_CONCURRENCY", global = true)]
    max_concurrency: usize,

    /// Maximum concurrent checks against one platform
    #[arg(long, default_value_t = DEFAULT_PER_PLATFORM_CONCURRENCY, global = true)]
    per_platform_concurrency: usize,

    /// Requests per second per platform (0 disables)
    #[arg(long, default_value_t = DEFAULT_PER_PLATFORM_RPS, env = "PAN_CHECK_PLATFORM_RPS", global = true)]
    per_platform_rps: u32,

    /// Per-check timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CHECK_TIMEOUT_SECS, global = true)]
    check_timeout: u64,

    /// Whole-batch timeout in seconds
    #[arg(long, default_value_t = DEFAULT_BATCH_TIMEOUT_SECS, global = true)]
    batch_timeout: u64,

    /// Seconds between scheduler passes
    #[arg(long, default_value_t = DEFAULT_SCHEDULER_INTERVAL_SECS, env = "PAN_CHECK_INTERVAL", global = true)]
    interval: u64,

    /// Consecutive pending outcomes before a link expires
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, global = true)]
    max_attempts: u32,

    /// Identical outcomes needed before a link is settled
    #[arg(long, default_value_t = DEFAULT_REQUIRED_CONFIRMATIONS, global = true)]
    confirmations: u32,

    /// Re-check valid links older than this many seconds
    #[arg(long, global = true)]
    recheck_valid_after: Option<u64>,

    /// Base delay in seconds before re-checking a pending link (defaults to --interval)
    #[arg(long, global = true)]
    recheck_base_delay: Option<u64>,

    /// Default platform allowlist (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',', env = "PAN_CHECK_PLATFORMS", global = true)]
    platforms: Vec<Platform>,

    /// HTTP User-Agent header
    #[arg(long, default_value = DEFAULT_USER_AGENT, global = true)]
    user_agent: String,

    /// Point every platform at one base URL (mock servers, proxies)
    #[arg(long, hide = true, global = true)]
    endpoint_override: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check the links in a file (or stdin)
    Check(CheckArgs),
    /// Run the re-check scheduler until interrupted
    Watch(WatchArgs),
    /// List tracked links and their state
    Tasks(OutputArgs),
    /// Show recent scheduler passes
    History(HistoryArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Text file containing share links ("-" for stdin)
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Only check these platforms (comma-separated), overriding --platforms
    #[arg(long = "only", value_enum, value_delimiter = ',')]
    only: Vec<Platform>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct WatchArgs {
    /// Check the links in this file before the first pass
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    /// Number of passes to show
    #[arg(long, default_value_t = 10)]
    limit: u32,

    #[command(flatten)]
    output: OutputArgs,
}

impl GlobalArgs {
    fn to_config(&self) -> Config {
        Config {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            db_path: self.db_path.clone(),
            max_concurrency: self.max_concurrency,
            per_platform_concurrency: self.per_platform_concurrency,
            per_platform_rps: self.per_platform_rps,
            check_timeout_secs: self.check_timeout,
            batch_timeout_secs: self.batch_timeout,
            scheduler_interval_secs: self.interval,
            max_attempts: self.max_attempts,
            required_confirmations: self.confirmations,
            recheck_valid_after_secs: self.recheck_valid_after,
            recheck_base_delay_secs: self.recheck_base_delay.unwrap_or(self.interval),
            selected_platforms: (!self.platforms.is_empty()).then(|| self.platforms.clone()),
            user_agent: self.user_agent.clone(),
            endpoints: self
                .endpoint_override
                .as_deref()
                .map(PlatformEndpoints::all_at)
                .unwrap_or_default(),
        }
    }
}

async fn read_input(file: &PathBuf) -> Result<String> {
    let mut text = String::new();
    if file.as_os_str() == "-" {
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read links from stdin")?;
    } else {
        text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read links from {}", file.display()))?;
    }
    Ok(text)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

async fn run_check(engine: &LinkEngine, args: &CheckArgs) -> Result<()> {
    let text = read_input(&args.file).await?;
    let only = (!args.only.is_empty()).then_some(args.only.as_slice());
    let report = engine.check_batch(&text, only).await;

    if args.output.json {
        print_json(&report)?;
    } else {
        for result in report.results() {
            println!(
                "[{}] {} {}{}",
                result.status.as_str(),
                result.link.platform.display_name(),
                result.link.url,
                result
                    .reason
                    .as_deref()
                    .map(|r| format!(" ({r})"))
                    .unwrap_or_default()
            );
        }
        print_batch_summary(&report);
        print_error_statistics(engine.stats());
    }
    Ok(())
}

async fn run_watch(engine: &LinkEngine, args: &WatchArgs) -> Result<()> {
    if let Some(seed) = &args.seed {
        let text = read_input(seed).await?;
        let report = engine.check_batch(&text, None).await;
        print_batch_summary(&report);
    }

    let cancel = CancellationToken::new();
    let handle = engine.spawn_scheduler(cancel.clone());
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    log::info!("Interrupted, stopping scheduler");
    cancel.cancel();
    if let Err(e) = handle.await {
        log::warn!("Scheduler task ended abnormally: {e}");
    }
    print_error_statistics(engine.stats());
    Ok(())
}

async fn run_tasks(engine: &LinkEngine, args: &OutputArgs) -> Result<()> {
    let tracked = engine
        .list_scheduled_task_state()
        .await
        .context("Failed to list tracked links")?;
    if args.json {
        return print_json(&tracked);
    }
    for link in &tracked {
        println!(
            "{:<8} {:<8} attempts={} {}{}",
            link.status.as_str(),
            link.platform.as_str(),
            link.attempts,
            link.url,
            link.reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default()
        );
    }
    println!("{} tracked link{}", tracked.len(), if tracked.len() == 1 { "" } else { "s" });
    Ok(())
}

async fn run_history(engine: &LinkEngine, args: &HistoryArgs) -> Result<()> {
    let executions = engine
        .recent_executions(args.limit)
        .await
        .context("Failed to read scheduler history")?;
    if args.output.json {
        return print_json(&executions);
    }
    for execution in &executions {
        println!(
            "#{} {} {} due={} valid={} invalid={} pending={} expired={}{}",
            execution.id,
            execution.started_at.format("%Y-%m-%d %H:%M:%S"),
            execution.status,
            execution.summary.links_count,
            execution.summary.valid_count,
            execution.summary.invalid_count,
            execution.summary.pending_count,
            execution.summary.expired_count,
            execution
                .error_message
                .as_deref()
                .map(|e| format!(" error: {e}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();
    let config = cli.global.to_config();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let engine = match LinkEngine::from_config(config).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("pan_check error: {:#}", e);
            process::exit(1);
        }
    };

    let outcome = match &cli.command {
        Command::Check(args) => run_check(&engine, args).await,
        Command::Watch(args) => run_watch(&engine, args).await,
        Command::Tasks(args) => run_tasks(&engine, args).await,
        Command::History(args) => run_history(&engine, args).await,
    };
    engine.shutdown().await;

    if let Err(e) = outcome {
        eprintln!("pan_check error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["pan_check", "check"]).unwrap();
        match cli.command {
            Command::Check(args) => {
                assert_eq!(args.file, PathBuf::from("-"));
                assert!(args.only.is_empty());
                assert!(!args.output.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_check_with_platform_selection() {
        let cli = Cli::try_parse_from([
            "pan_check",
            "check",
            "links.txt",
            "--only",
            "quark,baidu,123pan",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Check(args) => {
                assert_eq!(args.file, PathBuf::from("links.txt"));
                assert_eq!(
                    args.only,
                    vec![Platform::Quark, Platform::Baidu, Platform::Pan123]
                );
                assert!(args.output.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pan_check",
            "watch",
            "--interval",
            "60",
            "--max-attempts",
            "3",
            "--db-path",
            ":memory:",
        ])
        .unwrap();
        let config = cli.global.to_config();
        assert_eq!(config.scheduler_interval_secs, 60);
        assert_eq!(config.recheck_base_delay_secs, 60);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.db_path, PathBuf::from(":memory:"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_matches_library_defaults() {
        let cli = Cli::try_parse_from(["pan_check", "tasks"]).unwrap();
        let config = cli.global.to_config();
        let defaults = Config::default();
        assert_eq!(config.max_concurrency, defaults.max_concurrency);
        assert_eq!(config.check_timeout_secs, defaults.check_timeout_secs);
        assert_eq!(config.db_path, defaults.db_path);
        assert!(config.selected_platforms.is_none());
    }

    #[test]
    fn test_platform_allowlist_and_aliases() {
        let cli = Cli::try_parse_from(["pan_check", "--platforms", "139,aliyun", "tasks"]).unwrap();
        let config = cli.global.to_config();
        assert_eq!(
            config.selected_platforms,
            Some(vec![Platform::MobileCloud, Platform::Aliyun])
        );
    }

    #[test]
    fn test_history_limit() {
        let cli = Cli::try_parse_from(["pan_check", "history", "--limit", "3", "--json"]).unwrap();
        match cli.command {
            Command::History(args) => {
                assert_eq!(args.limit, 3);
                assert!(args.output.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_platform_rejected() {
        assert!(Cli::try_parse_from(["pan_check", "check", "--only", "dropbox"]).is_err());
    }
}
